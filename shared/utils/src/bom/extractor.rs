//! BOM Extractor
//!
//! Reads a single BOM file, classifies it and cleans it.

use std::path::Path;

use bomflow_models::{BomCategory, Table};

use super::classifier::classify;
use super::cleaner::{clean_bom, CleanedBom};
use super::parser::TableReader;
use crate::error::{BomError, BomResult};

/// Read, classify and clean one BOM file.
pub fn extract_bom<R: TableReader + ?Sized>(reader: &R, path: &Path) -> BomResult<CleanedBom> {
    let filename = display_name(path);
    tracing::debug!(file = %filename, "Extracting BOM");

    let raw = reader.read_table(path)?;
    classify_and_clean(raw, &filename)
}

/// Classify and clean an already loaded table.
pub fn classify_and_clean(raw: Table, filename: &str) -> BomResult<CleanedBom> {
    match classify(&raw) {
        BomCategory::Unclassified => Err(BomError::unclassifiable(filename)),
        category => clean_bom(raw, category, filename),
    }
}

pub(crate) fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
