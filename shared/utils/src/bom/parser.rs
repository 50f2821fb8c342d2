//! BOM File Reader
//!
//! Loads a spreadsheet into a raw [`Table`]. Headers are kept exactly as
//! authored; blank cells become nulls. Excel (XLSX/XLS) and CSV are supported.

use calamine::{open_workbook_from_rs, DataType, Reader, Xls, Xlsx};
use std::io::{Cursor, Read, Seek};
use std::path::Path;

use bomflow_models::{Cell, Table};

use super::extractor::display_name;
use crate::error::{BomError, BomResult};

/// Supported BOM file formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BomFormat {
    Csv,
    Xlsx,
    Xls,
}

impl BomFormat {
    /// Detect format from file extension
    pub fn from_extension(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_lowercase();
        match ext.as_str() {
            "csv" => Some(Self::Csv),
            "xlsx" | "xlsm" => Some(Self::Xlsx),
            "xls" => Some(Self::Xls),
            _ => None,
        }
    }
}

/// Source of raw tables. The orchestrator only ever sees this seam.
pub trait TableReader {
    fn read_table(&self, path: &Path) -> BomResult<Table>;
}

/// Reads BOM spreadsheets from disk
#[derive(Debug, Clone, Copy, Default)]
pub struct SpreadsheetReader;

impl SpreadsheetReader {
    pub fn new() -> Self {
        Self
    }

    /// Parse BOM file from bytes
    pub fn parse_bytes(&self, filename: &str, data: Vec<u8>, format: Option<BomFormat>) -> BomResult<Table> {
        let format = format
            .or_else(|| BomFormat::from_extension(Path::new(filename)))
            .ok_or_else(|| BomError::extraction(filename, "Could not determine file format"))?;

        match format {
            BomFormat::Csv => self.parse_csv(filename, &data),
            BomFormat::Xlsx => {
                let workbook: Xlsx<_> = open_workbook_from_rs(Cursor::new(data))
                    .map_err(|e| BomError::extraction(filename, format!("Failed to open Excel workbook: {:?}", e)))?;
                read_first_sheet(workbook, filename)
            }
            BomFormat::Xls => {
                let workbook: Xls<_> = open_workbook_from_rs(Cursor::new(data))
                    .map_err(|e| BomError::extraction(filename, format!("Failed to open Excel workbook: {:?}", e)))?;
                read_first_sheet(workbook, filename)
            }
        }
    }

    /// Parse CSV format
    fn parse_csv(&self, filename: &str, data: &[u8]) -> BomResult<Table> {
        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .from_reader(data);

        let headers: Vec<String> = reader
            .headers()
            .map_err(|e| BomError::extraction(filename, format!("Failed to read CSV headers: {}", e)))?
            .iter()
            .map(str::to_string)
            .collect();

        let mut rows = Vec::new();
        for (idx, result) in reader.records().enumerate() {
            let record = result.map_err(|e| {
                BomError::extraction(filename, format!("Row {}: Parse error - {}", idx + 2, e))
            })?;
            // short rows are padded later; cells past the header have no column
            if record.len() > headers.len() {
                return Err(BomError::extraction(
                    filename,
                    format!("Row {}: {} fields, header has {}", idx + 2, record.len(), headers.len()),
                ));
            }
            rows.push(record.iter().map(text_cell).collect());
        }

        Ok(Table::new(headers, rows))
    }
}

impl TableReader for SpreadsheetReader {
    fn read_table(&self, path: &Path) -> BomResult<Table> {
        let filename = display_name(path);
        let data = std::fs::read(path)
            .map_err(|e| BomError::extraction(&filename, e.to_string()))?;

        tracing::debug!(file = %filename, bytes = data.len(), "Read BOM file");
        self.parse_bytes(&filename, data, None)
    }
}

fn read_first_sheet<RS, R>(mut workbook: R, filename: &str) -> BomResult<Table>
where
    RS: Read + Seek,
    R: Reader<RS>,
{
    let sheet_name = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or_else(|| BomError::extraction(filename, "No sheets found in workbook"))?;

    let range = workbook
        .worksheet_range(&sheet_name)
        .ok_or_else(|| BomError::extraction(filename, format!("Sheet '{}' not found", sheet_name)))?
        .map_err(|e| BomError::extraction(filename, format!("Failed to read worksheet: {:?}", e)))?;

    let mut rows_iter = range.rows();

    // First row is headers
    let headers: Vec<String> = rows_iter
        .next()
        .ok_or_else(|| BomError::extraction(filename, "Empty worksheet"))?
        .iter()
        .map(|cell| cell.to_string())
        .collect();

    let rows = rows_iter
        .map(|row| row.iter().map(excel_cell).collect())
        .collect();

    Ok(Table::new(headers, rows))
}

fn excel_cell(value: &DataType) -> Cell {
    match value {
        DataType::Empty | DataType::Error(_) => Cell::Null,
        DataType::Int(i) => Cell::Int(*i),
        DataType::Float(f) => Cell::Float(*f),
        DataType::String(s) => text_cell(s),
        other => Cell::Text(other.to_string()),
    }
}

fn text_cell(value: &str) -> Cell {
    if value.trim().is_empty() {
        Cell::Null
    } else {
        Cell::text(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_detection() {
        assert_eq!(BomFormat::from_extension(Path::new("test.csv")), Some(BomFormat::Csv));
        assert_eq!(BomFormat::from_extension(Path::new("test.XLSX")), Some(BomFormat::Xlsx));
        assert_eq!(BomFormat::from_extension(Path::new("test.xls")), Some(BomFormat::Xls));
        assert_eq!(BomFormat::from_extension(Path::new("test.txt")), None);
    }

    #[test]
    fn test_csv_parsing_keeps_headers_verbatim() {
        let csv_data = b"Part Tag,Qty,H [mm]\nB1,3,100\n,,\nB2, ,80.5".to_vec();

        let reader = SpreadsheetReader::new();
        let table = reader.parse_bytes("list.csv", csv_data, None).unwrap();

        assert_eq!(table.columns(), ["Part Tag", "Qty", "H [mm]"]);
        assert_eq!(table.row_count(), 3);
        assert_eq!(table.cell(0, "Part Tag"), Some(&Cell::text("B1")));
        assert_eq!(table.cell(1, "Qty"), Some(&Cell::Null));
        assert_eq!(table.cell(2, "Qty"), Some(&Cell::Null));
        assert_eq!(table.cell(2, "H [mm]"), Some(&Cell::text("80.5")));
    }

    #[test]
    fn test_csv_rows_wider_than_header_are_rejected() {
        let csv_data = b"Part Tag,Qty\nB1,3\nB2,4,extra".to_vec();

        let err = SpreadsheetReader::new().parse_bytes("list.csv", csv_data, None).unwrap_err();
        assert_eq!(err.error_code(), "EXTRACTION_ERROR");
        assert!(err.to_string().contains("Row 3: 3 fields, header has 2"));
    }

    #[test]
    fn test_unknown_format_is_extraction_error() {
        let reader = SpreadsheetReader::new();
        let err = reader.parse_bytes("notes.txt", Vec::new(), None).unwrap_err();
        assert_eq!(err.error_code(), "EXTRACTION_ERROR");
    }

    #[test]
    fn test_missing_file_is_extraction_error() {
        let reader = SpreadsheetReader::new();
        let err = reader
            .read_table(Path::new("/nonexistent/bomflow/123456_list.xlsx"))
            .unwrap_err();
        assert!(matches!(err, BomError::Extraction { ref filename, .. } if filename == "123456_list.xlsx"));
    }
}
