//! Tabular BOM data
//!
//! A small row-major table with named columns and loosely typed cells. Raw
//! spreadsheets, cleaned BOMs and transformed batches all share this shape.

use serde::Serialize;
use std::fmt;

/// A single cell value
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Cell {
    Null,
    Int(i64),
    Float(f64),
    Text(String),
}

impl Cell {
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Numeric view of the cell. Text is trimmed and parsed; `None` for null.
    /// NaN and infinities are rejected, whether stored or spelled out.
    pub fn as_f64(&self) -> Result<Option<f64>, String> {
        let value = match self {
            Self::Null => return Ok(None),
            Self::Int(value) => *value as f64,
            Self::Float(value) => *value,
            Self::Text(value) => value
                .trim()
                .parse::<f64>()
                .map_err(|_| format!("unable to parse \"{}\" as a number", value))?,
        };

        if value.is_finite() {
            Ok(Some(value))
        } else {
            Err(format!("{} is not a finite number", self))
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(value) => Some(*value),
            _ => None,
        }
    }

    /// Hashable identity used when grouping rows
    pub fn key(&self) -> CellKey {
        match self {
            Self::Null => CellKey::Null,
            Self::Int(value) => CellKey::Int(*value),
            Self::Float(value) => CellKey::Float(value.to_bits()),
            Self::Text(value) => CellKey::Text(value.clone()),
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => Ok(()),
            Self::Int(value) => write!(f, "{}", value),
            Self::Float(value) if value.fract() == 0.0 && value.is_finite() => {
                write!(f, "{}", *value as i64)
            }
            Self::Float(value) => write!(f, "{}", value),
            Self::Text(value) => f.write_str(value),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CellKey {
    Null,
    Int(i64),
    Float(u64),
    Text(String),
}

/// Ordered table of named columns
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<Cell>>,
}

impl Table {
    /// Build a table; short rows are padded with nulls, long rows truncated.
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Cell>>) -> Self {
        let width = columns.len();
        let rows = rows
            .into_iter()
            .map(|mut row| {
                row.resize(width, Cell::Null);
                row
            })
            .collect();
        Self { columns, rows }
    }

    /// Empty table with the given header
    pub fn with_columns<S: AsRef<str>>(columns: &[S]) -> Self {
        Self {
            columns: columns.iter().map(|c| c.as_ref().to_string()).collect(),
            rows: Vec::new(),
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn column(&self, name: &str) -> Option<impl Iterator<Item = &Cell> + '_> {
        let idx = self.column_index(name)?;
        Some(self.rows.iter().map(move |row| &row[idx]))
    }

    pub fn cell(&self, row: usize, name: &str) -> Option<&Cell> {
        let idx = self.column_index(name)?;
        self.rows.get(row).map(|r| &r[idx])
    }

    /// Rename columns present in `mapping`; unmapped columns keep their names.
    pub fn rename_columns(&mut self, mapping: &[(&str, &str)]) {
        for column in &mut self.columns {
            if let Some((_, to)) = mapping.iter().find(|(from, _)| *from == column.as_str()) {
                *column = (*to).to_string();
            }
        }
    }

    pub fn retain_rows<F>(&mut self, mut keep: F)
    where
        F: FnMut(&[Cell]) -> bool,
    {
        self.rows.retain(|row| keep(row));
    }

    /// Project to `names`, in that order. Returns the first absent column on failure.
    pub fn select<S: AsRef<str>>(&self, names: &[S]) -> Result<Table, String> {
        let indices = names
            .iter()
            .map(|name| {
                self.column_index(name.as_ref())
                    .ok_or_else(|| name.as_ref().to_string())
            })
            .collect::<Result<Vec<_>, _>>()?;

        let rows = self
            .rows
            .iter()
            .map(|row| indices.iter().map(|&i| row[i].clone()).collect())
            .collect();

        Ok(Table {
            columns: names.iter().map(|n| n.as_ref().to_string()).collect(),
            rows,
        })
    }

    /// Apply `f` to every cell of a column. Returns `false` if the column is absent.
    pub fn map_column<F>(&mut self, name: &str, mut f: F) -> bool
    where
        F: FnMut(&Cell) -> Cell,
    {
        let Some(idx) = self.column_index(name) else {
            return false;
        };
        for row in &mut self.rows {
            row[idx] = f(&row[idx]);
        }
        true
    }

    /// Replace a column's values wholesale, one value per row.
    pub fn set_column(&mut self, name: &str, values: Vec<Cell>) -> bool {
        let Some(idx) = self.column_index(name) else {
            return false;
        };
        for (row, value) in self.rows.iter_mut().zip(values) {
            row[idx] = value;
        }
        true
    }

    /// Set (or append) a column holding the same value on every row
    pub fn set_constant(&mut self, name: &str, value: Cell) {
        match self.column_index(name) {
            Some(idx) => {
                for row in &mut self.rows {
                    row[idx] = value.clone();
                }
            }
            None => {
                self.columns.push(name.to_string());
                for row in &mut self.rows {
                    row.push(value.clone());
                }
            }
        }
    }

    pub fn rows_mut(&mut self) -> &mut [Vec<Cell>] {
        &mut self.rows
    }

    /// Stack tables vertically. Columns are the union in first-seen order;
    /// cells for columns a table lacks are null.
    pub fn concat(tables: Vec<Table>) -> Table {
        let mut columns: Vec<String> = Vec::new();
        for table in &tables {
            for column in &table.columns {
                if !columns.contains(column) {
                    columns.push(column.clone());
                }
            }
        }

        let mut rows = Vec::with_capacity(tables.iter().map(Table::row_count).sum());
        for table in tables {
            let mapping: Vec<Option<usize>> = columns
                .iter()
                .map(|c| table.column_index(c))
                .collect();
            for row in table.rows {
                rows.push(
                    mapping
                        .iter()
                        .map(|idx| idx.map(|i| row[i].clone()).unwrap_or(Cell::Null))
                        .collect(),
                );
            }
        }

        Table { columns, rows }
    }
}
