//! # Bomflow Core Domain Models
//!
//! Data types shared by the BOM ingestion pipeline and its collaborators.
//!
//! ## Key Models
//!
//! - **Table / Cell**: ordered, loosely typed tabular data read from spreadsheets
//! - **BomCategory**: material category decided from marker columns
//! - **SchemaSpec**: required columns, nullability and target types per family
//! - **BomRecord**: a discovered BOM file with its project and uploader
//! - **BatchResult**: the two output tables of one run plus its snapshot time
//!
//! Schemas and column names are constants so every stage agrees on them.

pub mod table;
pub mod category;
pub mod schema;
pub mod record;

pub use table::{Cell, CellKey, Table};
pub use category::{BomCategory, CategoryFamily, CATEGORY_MARKERS};
pub use schema::{
    schema_for, CoercionPolicy, ColumnSpec, SchemaSpec, SemanticType, BUSINESS_COLUMNS,
    GROUP_KEY_COLUMNS, METADATA_COLUMNS, PERSISTED_PRIMARY_COLUMNS, PRIMARY_SCHEMA,
    SUMMARY_MARKER_COLUMNS, SUM_COLUMNS,
};
pub use record::{
    format_snapshot_time, BatchResult, BatchTally, BomRecord, LoadMethod, SYSTEM_UPLOADER,
};
