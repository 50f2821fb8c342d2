//! Duplicate-row aggregation
//!
//! Rows sharing a grouping key collapse into one: quantity columns are
//! summed, every other column keeps the value of the group's first row.
//! Groups come out in order of first appearance and columns keep their
//! input order.

use std::collections::{BTreeSet, HashMap};

use bomflow_models::{Cell, CellKey, Table};

use super::validator::validate_required_columns;
use crate::error::{BomError, BomResult};

const STAGE: &str = "aggregation";

pub fn aggregate_rows(table: &Table, key_columns: &[&str], sum_columns: &[&str]) -> BomResult<Table> {
    let mut needed: Vec<&str> = key_columns.to_vec();
    needed.extend_from_slice(sum_columns);
    validate_required_columns(table, &needed, STAGE, None)?;

    let key_idx: Vec<usize> = key_columns.iter().filter_map(|c| table.column_index(c)).collect();
    let sum_idx: Vec<usize> = sum_columns.iter().filter_map(|c| table.column_index(c)).collect();
    let retained_idx: Vec<usize> = (0..table.columns().len())
        .filter(|i| !key_idx.contains(i) && !sum_idx.contains(i))
        .collect();

    let mut positions: HashMap<Vec<CellKey>, usize> = HashMap::new();
    let mut groups: Vec<Group> = Vec::new();
    let mut diverging: BTreeSet<&str> = BTreeSet::new();

    for row in table.rows() {
        let key: Vec<CellKey> = key_idx.iter().map(|&i| row[i].key()).collect();

        match positions.get(&key) {
            Some(&pos) => {
                let group = &mut groups[pos];
                for &i in &retained_idx {
                    if group.first[i] != row[i] {
                        diverging.insert(table.columns()[i].as_str());
                    }
                }
                group.add(row, &sum_idx, table)?;
            }
            None => {
                let mut group = Group::new(row.clone(), sum_idx.len());
                group.add(row, &sum_idx, table)?;
                positions.insert(key, groups.len());
                groups.push(group);
            }
        }
    }

    if !diverging.is_empty() {
        tracing::warn!(
            columns = ?diverging,
            "Rows sharing a grouping key differ outside the summed columns; keeping first values"
        );
    }

    let rows = groups
        .into_iter()
        .map(|group| group.finish(&sum_idx))
        .collect();

    Ok(Table::new(table.columns().to_vec(), rows))
}

struct Group {
    first: Vec<Cell>,
    sums: Vec<Sum>,
}

impl Group {
    fn new(first: Vec<Cell>, sum_count: usize) -> Self {
        Self {
            first,
            sums: vec![Sum::default(); sum_count],
        }
    }

    fn add(&mut self, row: &[Cell], sum_idx: &[usize], table: &Table) -> BomResult<()> {
        for (sum, &i) in self.sums.iter_mut().zip(sum_idx) {
            sum.add(table.columns()[i].as_str(), &row[i])?;
        }
        Ok(())
    }

    fn finish(mut self, sum_idx: &[usize]) -> Vec<Cell> {
        for (sum, &i) in self.sums.into_iter().zip(sum_idx) {
            self.first[i] = sum.into_cell();
        }
        self.first
    }
}

/// Null-skipping sum that stays integral while every input is
#[derive(Debug, Clone, Copy, Default)]
struct Sum {
    int: i64,
    float: f64,
    saw_int: bool,
    saw_float: bool,
}

impl Sum {
    fn add(&mut self, column: &str, cell: &Cell) -> BomResult<()> {
        match cell {
            Cell::Null => {}
            Cell::Int(value) => {
                self.int = self.int.checked_add(*value).ok_or_else(|| {
                    BomError::type_conversion(column, "integer", format!("sum overflows after adding {}", value))
                })?;
                self.saw_int = true;
            }
            other => {
                let value = other
                    .as_f64()
                    .map_err(|reason| BomError::type_conversion(column, "number", reason))?;
                if let Some(value) = value {
                    self.float += value;
                    self.saw_float = true;
                }
            }
        }
        Ok(())
    }

    fn into_cell(self) -> Cell {
        if self.saw_float || !self.saw_int {
            Cell::Float(self.int as f64 + self.float)
        } else {
            Cell::Int(self.int)
        }
    }
}
