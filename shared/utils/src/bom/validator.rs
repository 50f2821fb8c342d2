//! BOM Schema Validator
//!
//! Column presence and nullability checks. Both report every violating
//! column at once, mapped back to the authored header when a rename map is
//! given.

use bomflow_models::Table;

use crate::error::ValidationError;

/// Raw header → canonical name pairs
pub type RenameMap = [(&'static str, &'static str)];

/// Authored header for a canonical column name
pub fn original_name(column: &str, renames: Option<&RenameMap>) -> String {
    renames
        .and_then(|map| map.iter().find(|(_, canonical)| *canonical == column))
        .map(|(raw, _)| (*raw).to_string())
        .unwrap_or_else(|| column.to_string())
}

/// Fails with every required column absent from `table`.
pub fn validate_required_columns(
    table: &Table,
    required: &[&str],
    stage: &str,
    renames: Option<&RenameMap>,
) -> Result<(), ValidationError> {
    let missing: Vec<String> = required
        .iter()
        .filter(|column| !table.has_column(column))
        .map(|column| original_name(column, renames))
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(ValidationError::missing_column(stage, missing))
    }
}

/// Fails with every non-nullable column that is absent or holds a null.
pub fn validate_non_null(
    table: &Table,
    nullability: &[(&str, bool)],
    stage: &str,
    renames: Option<&RenameMap>,
) -> Result<(), ValidationError> {
    let missing: Vec<String> = nullability
        .iter()
        .filter(|(_, nullable)| !nullable)
        .filter(|(column, _)| match table.column(column) {
            Some(mut cells) => cells.any(|cell| cell.is_null()),
            None => true,
        })
        .map(|(column, _)| original_name(column, renames))
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(ValidationError::missing_value(stage, missing))
    }
}
