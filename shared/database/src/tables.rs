//! Persisted BOM tables
//!
//! All four tables share the persisted primary column layout; only their
//! role differs.

use anyhow::{bail, Result};
use chrono::{DateTime, Utc};

use bomflow_models::schema::{
    BOM_FILENAME, HEIGHT, LENGTH, LOAD_METHOD, MATERIAL_CATEGORY, PON, QUANTITY, SNAPSHOT_TIME_UTC,
    UPLOADED_BY, WIDTH,
};
use bomflow_models::{Cell, SemanticType, PERSISTED_PRIMARY_COLUMNS, PRIMARY_SCHEMA};

/// Primary rows of the latest run
pub const STAGING_TABLE: &str = "bom_staging";
/// Full-load results
pub const FINAL_TABLE: &str = "bom_final";
/// Every uploaded snapshot ever loaded
pub const HISTORY_TABLE: &str = "bom_final_history";
/// Latest rows per PON
pub const CURRENT_TABLE: &str = "bom_final_current";

pub const ALL_TABLES: [&str; 4] = [STAGING_TABLE, FINAL_TABLE, HISTORY_TABLE, CURRENT_TABLE];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SqlType {
    Text,
    BigInt,
    Double,
    TimestampTz,
}

impl SqlType {
    pub fn ddl(&self) -> &'static str {
        match self {
            Self::Text => "TEXT",
            Self::BigInt => "BIGINT",
            Self::Double => "DOUBLE PRECISION",
            Self::TimestampTz => "TIMESTAMPTZ",
        }
    }
}

/// Column type and nullability for a persisted column
pub fn column_type(column: &str) -> Option<(SqlType, bool)> {
    if column == SNAPSHOT_TIME_UTC {
        return Some((SqlType::TimestampTz, false));
    }
    if [PON, MATERIAL_CATEGORY, LOAD_METHOD, BOM_FILENAME, UPLOADED_BY].contains(&column) {
        return Some((SqlType::Text, false));
    }
    // dimensions are rounded to whole millimetres by the transformers
    if [QUANTITY, HEIGHT, WIDTH, LENGTH].contains(&column) {
        let nullable = PRIMARY_SCHEMA.column(column).map(|c| c.nullable).unwrap_or(true);
        return Some((SqlType::BigInt, nullable));
    }

    let spec = PRIMARY_SCHEMA.column(column)?;
    let sql_type = match spec.dtype {
        SemanticType::Integer => SqlType::BigInt,
        SemanticType::Decimal | SemanticType::Float => SqlType::Double,
        SemanticType::String => SqlType::Text,
    };
    Some((sql_type, spec.nullable))
}

/// `schema.table`, refusing anything that is not a plain identifier
pub fn qualified(schema: &str, table: &str) -> Result<String> {
    check_identifier(schema)?;
    check_identifier(table)?;
    Ok(format!("{}.{}", schema, table))
}

/// Names spliced into SQL text must be plain identifiers
pub fn check_identifier(name: &str) -> Result<()> {
    let mut chars = name.chars();
    let valid = matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_');
    if !valid {
        bail!("Invalid SQL identifier: '{}'", name);
    }
    Ok(())
}

pub fn create_table_sql(schema: &str, table: &str) -> Result<String> {
    let target = qualified(schema, table)?;
    let mut definitions = Vec::with_capacity(PERSISTED_PRIMARY_COLUMNS.len());

    for column in PERSISTED_PRIMARY_COLUMNS {
        let Some((sql_type, nullable)) = column_type(column) else {
            bail!("No SQL type for column {}", column);
        };
        let constraint = if nullable { "" } else { " NOT NULL" };
        definitions.push(format!("{} {}{}", column, sql_type.ddl(), constraint));
    }

    Ok(format!(
        "CREATE TABLE IF NOT EXISTS {} (\n    {}\n)",
        target,
        definitions.join(",\n    ")
    ))
}

/// A cell converted for binding against its column type
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Text(Option<String>),
    BigInt(Option<i64>),
    Double(Option<f64>),
    TimestampTz(Option<DateTime<Utc>>),
}

impl SqlValue {
    pub fn from_cell(cell: &Cell, sql_type: SqlType) -> Result<Self> {
        let value = match (sql_type, cell) {
            (SqlType::Text, Cell::Null) => Self::Text(None),
            (SqlType::Text, other) => Self::Text(Some(other.to_string())),

            (SqlType::BigInt, Cell::Null) => Self::BigInt(None),
            (SqlType::BigInt, Cell::Int(v)) => Self::BigInt(Some(*v)),
            (SqlType::BigInt, Cell::Float(v)) if v.fract() == 0.0 => Self::BigInt(Some(*v as i64)),

            (SqlType::Double, Cell::Null) => Self::Double(None),
            (SqlType::Double, Cell::Int(v)) => Self::Double(Some(*v as f64)),
            (SqlType::Double, Cell::Float(v)) => Self::Double(Some(*v)),

            (SqlType::TimestampTz, Cell::Null) => Self::TimestampTz(None),
            (SqlType::TimestampTz, Cell::Text(v)) => {
                let parsed = DateTime::parse_from_rfc3339(v)
                    .map_err(|e| anyhow::anyhow!("Invalid timestamp '{}': {}", v, e))?;
                Self::TimestampTz(Some(parsed.with_timezone(&Utc)))
            }

            (sql_type, other) => bail!("Cannot store {:?} as {}", other, sql_type.ddl()),
        };
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_every_persisted_column_has_a_type() {
        for column in PERSISTED_PRIMARY_COLUMNS {
            assert!(column_type(column).is_some(), "{}", column);
        }
        assert_eq!(column_type(QUANTITY), Some((SqlType::BigInt, false)));
        assert_eq!(column_type(HEIGHT), Some((SqlType::BigInt, false)));
        assert_eq!(column_type("usage_quantity"), Some((SqlType::Double, true)));
        assert_eq!(column_type("element"), Some((SqlType::Text, true)));
        assert_eq!(column_type(SNAPSHOT_TIME_UTC), Some((SqlType::TimestampTz, false)));
        assert_eq!(column_type("unknown"), None);
    }

    #[test]
    fn test_qualified_rejects_injection() {
        assert_eq!(qualified("bom", STAGING_TABLE).unwrap(), "bom.bom_staging");
        assert!(qualified("bom; DROP TABLE x", STAGING_TABLE).is_err());
        assert!(qualified("", STAGING_TABLE).is_err());
        assert!(qualified("1bom", STAGING_TABLE).is_err());
    }

    #[test]
    fn test_create_table_sql() {
        let sql = create_table_sql("bom", HISTORY_TABLE).unwrap();
        assert!(sql.starts_with("CREATE TABLE IF NOT EXISTS bom.bom_final_history ("));
        assert!(sql.contains("pon TEXT NOT NULL,"));
        assert!(sql.contains("quantity BIGINT NOT NULL,"));
        assert!(sql.contains("finish_quantity DOUBLE PRECISION,"));
        assert!(sql.contains("snapshot_time_utc TIMESTAMPTZ NOT NULL\n)"));
    }

    #[test]
    fn test_cell_conversion() {
        assert_eq!(
            SqlValue::from_cell(&Cell::Float(1200.0), SqlType::BigInt).unwrap(),
            SqlValue::BigInt(Some(1200))
        );
        assert!(SqlValue::from_cell(&Cell::Float(0.5), SqlType::BigInt).is_err());
        assert_eq!(
            SqlValue::from_cell(&Cell::Int(3), SqlType::Double).unwrap(),
            SqlValue::Double(Some(3.0))
        );
        assert_eq!(
            SqlValue::from_cell(&Cell::Float(12.0), SqlType::Text).unwrap(),
            SqlValue::Text(Some("12".to_string()))
        );
        assert_eq!(SqlValue::from_cell(&Cell::Null, SqlType::Double).unwrap(), SqlValue::Double(None));
        assert!(SqlValue::from_cell(&Cell::text("many"), SqlType::Double).is_err());
    }

    #[test]
    fn test_snapshot_conversion() {
        let value = SqlValue::from_cell(&Cell::text("2024-05-01T08:30:00+00:00"), SqlType::TimestampTz).unwrap();
        assert_eq!(
            value,
            SqlValue::TimestampTz(Some(Utc.with_ymd_and_hms(2024, 5, 1, 8, 30, 0).unwrap()))
        );
        assert!(SqlValue::from_cell(&Cell::text("yesterday"), SqlType::TimestampTz).is_err());
    }
}
