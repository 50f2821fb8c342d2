//! BOM (Bill of Materials) Processing Module
//!
//! Turns heterogeneous BOM spreadsheets into two normalized tables:
//! read -> classify -> clean (rename, validate, coerce) -> transform
//! (normalize, rewrite vocabulary, aggregate) -> batch assembly.
//!
//! Discovery finds files in the design tree or the staging folder; the
//! staging module places uploaded files where discovery expects them.

pub mod parser;
pub mod classifier;
pub mod validator;
pub mod coercer;
pub mod rules;
pub mod cleaner;
pub mod extractor;
pub mod aggregate;
pub mod transformer;
pub mod orchestrator;
pub mod discovery;
pub mod staging;

#[cfg(test)]
mod testing;

pub use parser::{BomFormat, SpreadsheetReader, TableReader};
pub use classifier::classify;
pub use validator::{validate_non_null, validate_required_columns, RenameMap};
pub use coercer::{assign_types, coerce_cell};
pub use rules::{rules_for, CategoryRules};
pub use cleaner::{clean_bom, CleanedBom};
pub use extractor::{classify_and_clean, extract_bom};
pub use aggregate::aggregate_rows;
pub use transformer::transform_bom;
pub use orchestrator::{process_boms, process_boms_at, RecordStage};
pub use discovery::{parse_staging_filename, scrape_design_directory, scrape_staging_folder};
pub use staging::{stage_uploads, validate_files, ValidationReport};
