//! Test fixtures: an in-memory reader and raw BOM builders.

use std::collections::HashMap;
use std::path::Path;

use bomflow_models::{Cell, Table};

use super::extractor::display_name;
use super::parser::TableReader;
use crate::error::{BomError, BomResult};

/// Serves tables by file name instead of reading disk
#[derive(Debug, Default)]
pub struct MemoryReader {
    tables: HashMap<String, Table>,
}

impl MemoryReader {
    pub fn with(mut self, filename: &str, table: Table) -> Self {
        self.tables.insert(filename.to_string(), table);
        self
    }
}

impl TableReader for MemoryReader {
    fn read_table(&self, path: &Path) -> BomResult<Table> {
        let filename = display_name(path);
        self.tables
            .get(&filename)
            .cloned()
            .ok_or_else(|| BomError::extraction(filename, "No such file"))
    }
}

pub const PRIMARY_A_HEADERS: [&str; 12] = [
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

pub const PRIMARY_B_HEADERS: [&str; 12] = [
    "Part Tag",
    "Qty",
    "Material",
    "Grade",
    "Designation",
    "T [mm]",
    "W [mm]",
    "L [mm]",
    "Area [m2]",
    "Finish Area [m2]",
    "Element",
    "Comment",
];

/// Raw primary-A sheet from (tag, qty, material, height, width, length) rows
pub fn primary_a_table(rows: &[(&str, f64, &str, f64, f64, f64)]) -> Table {
    Table::new(
        PRIMARY_A_HEADERS.iter().map(|h| h.to_string()).collect(),
        rows.iter()
            .map(|&(tag, qty, material, h, w, l)| {
                vec![
                    Cell::text(tag),
                    Cell::Float(qty),
                    Cell::text(material),
                    Cell::Null,
                    Cell::text("Beam"),
                    Cell::Float(h),
                    Cell::Float(w),
                    Cell::Float(l),
                    Cell::Null,
                    Cell::Float(1.5),
                    Cell::Null,
                    Cell::Null,
                ]
            })
            .collect(),
    )
}

/// Raw primary-B sheet from (tag, qty, material, designation, thickness, width, length, finish) rows
pub fn primary_b_table(rows: &[(&str, f64, &str, &str, f64, f64, f64, f64)]) -> Table {
    Table::new(
        PRIMARY_B_HEADERS.iter().map(|h| h.to_string()).collect(),
        rows.iter()
            .map(|&(tag, qty, material, designation, t, w, l, finish)| {
                vec![
                    Cell::text(tag),
                    Cell::Float(qty),
                    Cell::text(material),
                    Cell::Null,
                    Cell::text(designation),
                    Cell::Float(t),
                    Cell::Float(w),
                    Cell::Float(l),
                    Cell::Float(0.72),
                    Cell::Float(finish),
                    Cell::Null,
                    Cell::Null,
                ]
            })
            .collect(),
    )
}
