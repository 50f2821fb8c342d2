//! BOM Cleaners
//!
//! Rename → require columns → drop summary rows → require values → coerce.
//! A cleaner never returns a partially cleaned table.

use bomflow_models::{BomCategory, Cell, Table, SUMMARY_MARKER_COLUMNS};

use super::coercer::assign_types;
use super::rules::{rules_for, CategoryRules};
use super::validator::{validate_non_null, validate_required_columns};
use crate::error::{BomError, BomResult};

const STAGE: &str = "cleaning";

/// A cleaned table and the category it was cleaned as
#[derive(Debug, Clone, PartialEq)]
pub struct CleanedBom {
    pub category: BomCategory,
    pub table: Table,
}

/// Clean `table` according to `category`. `source` names the file in errors.
pub fn clean_bom(table: Table, category: BomCategory, source: &str) -> BomResult<CleanedBom> {
    match (category, rules_for(category)) {
        (_, Some(rules)) => clean_with_rules(table, rules),
        (BomCategory::Secondary, None) => Ok(clean_secondary(table)),
        (_, None) => Err(BomError::unclassifiable(source)),
    }
}

fn clean_with_rules(mut table: Table, rules: &CategoryRules) -> BomResult<CleanedBom> {
    let schema = rules.schema;
    table.rename_columns(rules.renames);

    validate_required_columns(&table, &schema.required_columns(), STAGE, Some(rules.renames))?;

    let before = table.row_count();
    drop_summary_rows(&mut table);
    tracing::debug!(
        category = %rules.category,
        dropped = before - table.row_count(),
        "Dropped summary rows"
    );

    validate_non_null(&table, &schema.nullability(), STAGE, Some(rules.renames))?;

    let table = assign_types(table, schema, Some(rules.renames))?;

    Ok(CleanedBom {
        category: rules.category,
        table,
    })
}

/// Secondary BOMs have no cleaning rules yet and pass through untouched.
fn clean_secondary(table: Table) -> CleanedBom {
    tracing::info!("Secondary BOM processing not yet implemented");
    CleanedBom {
        category: BomCategory::Secondary,
        table,
    }
}

/// Remove sheet totals: rows whose part tag and dimensions are all empty.
pub fn drop_summary_rows(table: &mut Table) {
    let markers: Vec<usize> = SUMMARY_MARKER_COLUMNS
        .iter()
        .filter_map(|column| table.column_index(column))
        .collect();

    if markers.is_empty() {
        return;
    }

    table.retain_rows(|row| !markers.iter().all(|&idx| is_blank(&row[idx])));
}

fn is_blank(cell: &Cell) -> bool {
    match cell {
        Cell::Null => true,
        Cell::Text(value) => value.trim().is_empty(),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ValidationError;

    const HEADERS: [&str; 12] = [
        "Part Tag",
        "Qty",
        "Material",
        "Grade",
        "Designation",
        "H [mm]",
        "W [mm]",
        "L [mm]",
        "Total Length [m]",
        "Surface [m2]",
        "Element",
        "Comment",
    ];

    fn row(tag: Option<&str>, qty: Option<f64>, dims: Option<(f64, f64, f64)>) -> Vec<Cell> {
        let (h, w, l) = match dims {
            Some((h, w, l)) => (Cell::Float(h), Cell::Float(w), Cell::Float(l)),
            None => (Cell::Null, Cell::Null, Cell::Null),
        };
        vec![
            tag.map(Cell::text).unwrap_or(Cell::Null),
            qty.map(Cell::Float).unwrap_or(Cell::Null),
            Cell::text("Glulam type-A"),
            Cell::text("GL24h"),
            Cell::text("Beam"),
            h,
            w,
            l,
            Cell::Null,
            Cell::text("n/a"),
            Cell::Float(3.0),
            Cell::Null,
        ]
    }

    fn raw(rows: Vec<Vec<Cell>>) -> Table {
        Table::new(HEADERS.iter().map(|h| h.to_string()).collect(), rows)
    }

    #[test]
    fn test_primary_a_cleaning() {
        let table = raw(vec![
            row(Some("B1"), Some(2.0), Some((200.0, 100.0, 3000.0))),
            row(Some("B2"), Some(1.2), Some((80.0, 120.0, 2400.0))),
            row(None, Some(3.2), None),
        ]);

        let cleaned = clean_bom(table, BomCategory::PrimaryA, "list.xlsx").unwrap();
        assert_eq!(cleaned.category, BomCategory::PrimaryA);
        assert_eq!(cleaned.table.row_count(), 2);
        assert_eq!(cleaned.table.cell(1, "quantity"), Some(&Cell::Int(2)));
        assert_eq!(cleaned.table.cell(0, "height"), Some(&Cell::Float(200.0)));
        assert_eq!(cleaned.table.cell(0, "finish_quantity"), Some(&Cell::Null));
        assert_eq!(cleaned.table.cell(0, "element"), Some(&Cell::text("3")));
    }

    #[test]
    fn test_missing_headers_reported_by_authored_name() {
        let table = Table::new(
            vec!["Part Tag".into(), "H [mm]".into()],
            vec![vec![Cell::text("B1"), Cell::Float(1.0)]],
        );
        let err = clean_bom(table, BomCategory::PrimaryA, "list.xlsx").unwrap_err();
        match err {
            BomError::Validation(ValidationError::MissingColumn { stage, columns }) => {
                assert_eq!(stage, "cleaning");
                assert!(columns.contains(&"Qty".to_string()));
                assert!(columns.contains(&"L [mm]".to_string()));
                assert!(!columns.contains(&"Part Tag".to_string()));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_missing_required_value() {
        let table = raw(vec![row(Some("B1"), None, Some((1.0, 2.0, 3.0)))]);
        let err = clean_bom(table, BomCategory::PrimaryA, "list.xlsx").unwrap_err();
        assert_eq!(
            err,
            BomError::Validation(ValidationError::missing_value("cleaning", vec!["Qty".into()]))
        );
    }

    #[test]
    fn test_summary_rows_need_every_marker_empty() {
        let mut table = Table::new(
            vec!["part_tag".into(), "height".into(), "width".into(), "length".into(), "quantity".into()],
            vec![
                vec![Cell::Null, Cell::Null, Cell::Null, Cell::Null, Cell::Int(12)],
                vec![Cell::Null, Cell::Null, Cell::Null, Cell::Float(100.0), Cell::Int(1)],
                vec![Cell::text("  "), Cell::Null, Cell::Null, Cell::Null, Cell::Int(4)],
                vec![Cell::text("B1"), Cell::Null, Cell::Null, Cell::Null, Cell::Int(2)],
            ],
        );

        drop_summary_rows(&mut table);
        assert_eq!(table.row_count(), 2);
        assert_eq!(table.cell(0, "quantity"), Some(&Cell::Int(1)));
        assert_eq!(table.cell(1, "part_tag"), Some(&Cell::text("B1")));
    }

    #[test]
    fn test_primary_b_uses_thickness_marker() {
        let mut headers: Vec<String> = HEADERS.iter().map(|h| h.to_string()).collect();
        headers[5] = "T [mm]".into();
        headers[8] = "Area [m2]".into();
        headers[9] = "Finish Area [m2]".into();
        let table = Table::new(headers, vec![row(Some("P1"), Some(1.0), Some((18.0, 600.0, 1200.0)))]);

        let cleaned = clean_bom(table, BomCategory::PrimaryB, "panels.xlsx").unwrap();
        assert_eq!(cleaned.table.cell(0, "height"), Some(&Cell::Float(18.0)));
    }

    // Known gap: secondary BOMs have no cleaning rules and pass through unchanged.
    #[test]
    fn test_secondary_passes_through_unchanged() {
        let table = Table::new(
            vec!["Dia [mm]".into(), "Qty".into()],
            vec![vec![Cell::Float(12.0), Cell::text("x")]],
        );
        let cleaned = clean_bom(table.clone(), BomCategory::Secondary, "rebar.xlsx").unwrap();
        assert_eq!(cleaned.table, table);
        assert_eq!(cleaned.category, BomCategory::Secondary);
    }

    #[test]
    fn test_unclassified_is_rejected() {
        let err = clean_bom(Table::default(), BomCategory::Unclassified, "misc.xlsx").unwrap_err();
        assert_eq!(err, BomError::unclassifiable("misc.xlsx"));
    }
}
