//! BOM Category Classifier

use bomflow_models::{BomCategory, Table, CATEGORY_MARKERS};

/// Category of the first marker column present, in priority order.
pub fn classify(table: &Table) -> BomCategory {
    let category = CATEGORY_MARKERS
        .iter()
        .find(|(marker, _)| table.has_column(marker))
        .map(|(_, category)| *category)
        .unwrap_or(BomCategory::Unclassified);

    tracing::debug!(category = %category, "Classified BOM");
    category
}
