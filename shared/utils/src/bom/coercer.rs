//! BOM Type Coercer
//!
//! Converts cleaned columns to their semantic types, column by column in
//! schema order. Conversion failures either fail the column or null the
//! cell, depending on the column's [`CoercionPolicy`].

use bomflow_models::{Cell, CoercionPolicy, ColumnSpec, SchemaSpec, SemanticType, Table};

use super::validator::{original_name, RenameMap};
use crate::error::{BomError, BomResult, ValidationError};

const STAGE: &str = "type assignment";

/// Coerce every schema column of `table` to its target type.
pub fn assign_types(mut table: Table, schema: &SchemaSpec, renames: Option<&RenameMap>) -> BomResult<Table> {
    for spec in schema.columns {
        if !table.has_column(spec.name) {
            return Err(ValidationError::missing_column(STAGE, vec![original_name(spec.name, renames)]).into());
        }

        let mut failure = None;
        table.map_column(spec.name, |cell| {
            if failure.is_some() {
                return cell.clone();
            }
            match coerce_cell(cell, spec) {
                Ok(value) => value,
                Err(reason) => {
                    failure = Some(reason);
                    Cell::Null
                }
            }
        });

        if let Some(reason) = failure {
            return Err(BomError::type_conversion(
                original_name(spec.name, renames),
                spec.dtype.as_str(),
                reason,
            ));
        }
    }

    Ok(table)
}

/// Convert one cell, applying the column's error policy.
pub fn coerce_cell(cell: &Cell, spec: &ColumnSpec) -> Result<Cell, String> {
    let converted = match spec.dtype {
        SemanticType::String if spec.numeric_as_string => to_integer_text(cell),
        SemanticType::String => Ok(to_text(cell)),
        SemanticType::Integer => to_ceiling_integer(cell),
        SemanticType::Decimal | SemanticType::Float => to_float(cell),
    };

    match (converted, spec.on_error) {
        (Ok(value), _) => Ok(value),
        (Err(_), CoercionPolicy::Null) => Ok(Cell::Null),
        (Err(reason), CoercionPolicy::Fail) => Err(reason),
    }
}

fn to_text(cell: &Cell) -> Cell {
    match cell {
        Cell::Null => Cell::Null,
        Cell::Text(value) => Cell::Text(value.clone()),
        other => Cell::Text(other.to_string()),
    }
}

/// Numeric codes stored as integer text; fractional values are rejected.
fn to_integer_text(cell: &Cell) -> Result<Cell, String> {
    match cell.as_f64()? {
        None => Ok(Cell::Null),
        Some(value) => whole_number(value).map(|n| Cell::Text(n.to_string())),
    }
}

/// Rounds up: 2.1 becomes 3, 2.0 stays 2.
fn to_ceiling_integer(cell: &Cell) -> Result<Cell, String> {
    match cell.as_f64()? {
        None => Err("missing value cannot be converted to integer".to_string()),
        Some(value) => whole_number(value.ceil()).map(Cell::Int),
    }
}

fn to_float(cell: &Cell) -> Result<Cell, String> {
    Ok(cell.as_f64()?.map(Cell::Float).unwrap_or(Cell::Null))
}

/// Exact i64 for a whole float; `i64::MAX as f64` is 2^63 and already out of range.
pub(crate) fn whole_number(value: f64) -> Result<i64, String> {
    if !value.is_finite() || value.fract() != 0.0 || value >= i64::MAX as f64 || value < i64::MIN as f64 {
        return Err(format!("cannot safely cast {} to an integer", value));
    }
    Ok(value as i64)
}
