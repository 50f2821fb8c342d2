//! Column schemas per category family
//!
//! Schemas are plain constant data. Cleaning and post-transform validation
//! look them up by family instead of carrying per-category logic.

use serde::Serialize;

use crate::category::CategoryFamily;

pub const PART_TAG: &str = "part_tag";
pub const QUANTITY: &str = "quantity";
pub const MATERIAL_TYPE: &str = "material_type";
pub const MATERIAL_SUBTYPE: &str = "material_subtype";
pub const DESIGNATION: &str = "designation";
pub const HEIGHT: &str = "height";
pub const WIDTH: &str = "width";
pub const LENGTH: &str = "length";
pub const USAGE_QUANTITY: &str = "usage_quantity";
pub const FINISH_QUANTITY: &str = "finish_quantity";
pub const ELEMENT: &str = "element";
pub const ADDITIONAL_INFO: &str = "additional_info";

pub const PON: &str = "pon";
pub const MATERIAL_CATEGORY: &str = "material_category";
pub const LOAD_METHOD: &str = "load_method";
pub const BOM_FILENAME: &str = "bom_filename";
pub const UPLOADED_BY: &str = "uploaded_by";
pub const SNAPSHOT_TIME_UTC: &str = "snapshot_time_utc";

/// Semantic target type of a cleaned column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SemanticType {
    /// Whole units, rounded up
    Integer,
    /// Optional measurement; unparseable values become null
    Decimal,
    /// Required measurement; no recovery on bad input
    Float,
    String,
}

/// What the coercer does with a value it cannot convert
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CoercionPolicy {
    Fail,
    Null,
}

impl SemanticType {
    pub const fn default_policy(self) -> CoercionPolicy {
        match self {
            Self::Decimal => CoercionPolicy::Null,
            _ => CoercionPolicy::Fail,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Integer => "integer",
            Self::Decimal => "decimal",
            Self::Float => "float",
            Self::String => "string",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ColumnSpec {
    pub name: &'static str,
    pub nullable: bool,
    pub dtype: SemanticType,
    /// Identifier-like numeric codes kept as integer text
    pub numeric_as_string: bool,
    pub on_error: CoercionPolicy,
}

impl ColumnSpec {
    pub const fn new(name: &'static str, nullable: bool, dtype: SemanticType) -> Self {
        Self {
            name,
            nullable,
            dtype,
            numeric_as_string: false,
            on_error: dtype.default_policy(),
        }
    }

    pub const fn numeric_as_string(mut self) -> Self {
        self.numeric_as_string = true;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SchemaSpec {
    pub family: CategoryFamily,
    pub columns: &'static [ColumnSpec],
}

impl SchemaSpec {
    pub fn required_columns(&self) -> Vec<&'static str> {
        self.columns.iter().map(|c| c.name).collect()
    }

    /// (column, may be null) pairs in schema order
    pub fn nullability(&self) -> Vec<(&'static str, bool)> {
        self.columns.iter().map(|c| (c.name, c.nullable)).collect()
    }

    pub fn column(&self, name: &str) -> Option<&'static ColumnSpec> {
        self.columns.iter().find(|c| c.name == name)
    }
}

pub const PRIMARY_SCHEMA: SchemaSpec = SchemaSpec {
    family: CategoryFamily::Primary,
    columns: &[
        ColumnSpec::new(PART_TAG, false, SemanticType::String),
        ColumnSpec::new(QUANTITY, false, SemanticType::Integer),
        ColumnSpec::new(MATERIAL_TYPE, false, SemanticType::String),
        ColumnSpec::new(MATERIAL_SUBTYPE, true, SemanticType::String),
        ColumnSpec::new(DESIGNATION, true, SemanticType::String),
        ColumnSpec::new(HEIGHT, false, SemanticType::Float),
        ColumnSpec::new(WIDTH, false, SemanticType::Float),
        ColumnSpec::new(LENGTH, false, SemanticType::Float),
        ColumnSpec::new(USAGE_QUANTITY, true, SemanticType::Decimal),
        ColumnSpec::new(FINISH_QUANTITY, true, SemanticType::Decimal),
        ColumnSpec::new(ELEMENT, true, SemanticType::String).numeric_as_string(),
        ColumnSpec::new(ADDITIONAL_INFO, true, SemanticType::String),
    ],
};

/// Columns that mark a sheet total when all of them are empty
pub const SUMMARY_MARKER_COLUMNS: [&str; 4] = [PART_TAG, HEIGHT, WIDTH, LENGTH];

/// Business columns every transformer projects to, in output order
pub const BUSINESS_COLUMNS: [&str; 12] = [
    PART_TAG,
    QUANTITY,
    MATERIAL_TYPE,
    MATERIAL_SUBTYPE,
    DESIGNATION,
    HEIGHT,
    WIDTH,
    LENGTH,
    USAGE_QUANTITY,
    FINISH_QUANTITY,
    ELEMENT,
    ADDITIONAL_INFO,
];

/// Quantities summed during aggregation
pub const SUM_COLUMNS: [&str; 3] = [QUANTITY, USAGE_QUANTITY, FINISH_QUANTITY];

/// Duplicate-row grouping key
pub const GROUP_KEY_COLUMNS: [&str; 6] = [PART_TAG, MATERIAL_TYPE, MATERIAL_SUBTYPE, HEIGHT, WIDTH, LENGTH];

/// Provenance columns attached by the orchestrator
pub const METADATA_COLUMNS: [&str; 5] = [PON, MATERIAL_CATEGORY, LOAD_METHOD, BOM_FILENAME, UPLOADED_BY];

/// Column order of the persisted primary table
pub const PERSISTED_PRIMARY_COLUMNS: [&str; 18] = [
    PON,
    MATERIAL_CATEGORY,
    LOAD_METHOD,
    BOM_FILENAME,
    UPLOADED_BY,
    PART_TAG,
    QUANTITY,
    MATERIAL_TYPE,
    MATERIAL_SUBTYPE,
    DESIGNATION,
    HEIGHT,
    WIDTH,
    LENGTH,
    USAGE_QUANTITY,
    FINISH_QUANTITY,
    ELEMENT,
    ADDITIONAL_INFO,
    SNAPSHOT_TIME_UTC,
];

/// Schema for a family. Secondary BOMs have no cleaning schema yet.
pub fn schema_for(family: CategoryFamily) -> Option<&'static SchemaSpec> {
    match family {
        CategoryFamily::Primary => Some(&PRIMARY_SCHEMA),
        CategoryFamily::Secondary => None,
    }
}
