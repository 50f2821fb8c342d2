//! BOM Batch Orchestrator
//!
//! Runs extraction, cleaning and transformation over a list of discovered
//! BOMs one file at a time. A failing file is logged, counted and skipped;
//! it never aborts the batch.

use chrono::{DateTime, SubsecRound, Utc};
use std::fmt;

use bomflow_models::schema::{
    BOM_FILENAME, LOAD_METHOD, MATERIAL_CATEGORY, PON, SNAPSHOT_TIME_UTC, UPLOADED_BY,
};
use bomflow_models::{
    format_snapshot_time, BatchResult, BatchTally, BomCategory, BomRecord, Cell, CategoryFamily,
    LoadMethod, Table, METADATA_COLUMNS, PERSISTED_PRIMARY_COLUMNS,
};

use super::extractor::classify_and_clean;
use super::parser::TableReader;
use super::transformer::transform_bom;
use super::validator::validate_required_columns;
use crate::error::{BomError, BomResult, ValidationError};

/// Where a record is in the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordStage {
    Pending,
    Extracting,
    Validating,
    Transforming,
    Succeeded,
}

impl fmt::Display for RecordStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Pending => "pending",
            Self::Extracting => "extracting",
            Self::Validating => "validating",
            Self::Transforming => "transforming",
            Self::Succeeded => "succeeded",
        };
        f.write_str(name)
    }
}

/// A record that failed, and the stage it failed in
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct RecordFailure {
    pub stage: RecordStage,
    pub error: BomError,
}

/// Run the pipeline over `records`, stamping the current time on every row.
pub fn process_boms<R: TableReader + ?Sized>(
    reader: &R,
    records: &[BomRecord],
    load_method: LoadMethod,
) -> BomResult<BatchResult> {
    process_boms_at(reader, records, load_method, Utc::now().trunc_subsecs(0))
}

/// Like [`process_boms`] with an explicit snapshot time.
///
/// Errors only when the assembled primary table misses its persisted
/// columns, which means the schema constants disagree with each other.
pub fn process_boms_at<R: TableReader + ?Sized>(
    reader: &R,
    records: &[BomRecord],
    load_method: LoadMethod,
    snapshot_time: DateTime<Utc>,
) -> BomResult<BatchResult> {
    let mut primary = Vec::new();
    let mut secondary = Vec::new();
    let mut tally = BatchTally {
        total: records.len(),
        ..BatchTally::default()
    };

    tracing::info!(total = records.len(), load_method = load_method.as_str(), "Running ETL process for BOMs");

    for record in records {
        let filename = record.filename();
        tracing::info!(file = %filename, pon = %record.project_id, "Processing BOM");

        match process_record(reader, record, &filename) {
            Ok((category, family, mut table)) => {
                add_metadata(&mut table, record, category, load_method, &filename);
                tracing::info!(
                    file = %filename,
                    category = %category,
                    family = family.as_str(),
                    rows = table.row_count(),
                    "BOM processed"
                );
                match family {
                    CategoryFamily::Primary => primary.push(table),
                    CategoryFamily::Secondary => secondary.push(table),
                }
                tally.succeeded += 1;
            }
            Err(failure) => {
                tracing::warn!(
                    file = %filename,
                    stage = %failure.stage,
                    code = failure.error.error_code(),
                    error = %failure.error,
                    "Skipping BOM"
                );
                tally.failed += 1;
            }
        }
    }

    let snapshot = format_snapshot_time(&snapshot_time);
    let primary = assemble_primary(primary, &snapshot)?;
    let secondary = assemble_secondary(secondary, &snapshot);

    tracing::info!(snapshot_time = %snapshot, "BOM processing snapshot time");
    tracing::info!(
        total = tally.total,
        succeeded = tally.succeeded,
        failed = tally.failed,
        "Finished processing {} BOMs: {} succeeded, {} failed",
        tally.total,
        tally.succeeded,
        tally.failed
    );

    Ok(BatchResult {
        primary,
        secondary,
        snapshot_time,
        tally,
    })
}

fn process_record<R: TableReader + ?Sized>(
    reader: &R,
    record: &BomRecord,
    filename: &str,
) -> Result<(BomCategory, CategoryFamily, Table), RecordFailure> {
    let mut stage = RecordStage::Pending;
    let mut advance = |next: RecordStage| {
        tracing::debug!(file = %filename, from = %stage, to = %next, "BOM stage");
        stage = next;
        next
    };

    let at = advance(RecordStage::Extracting);
    let raw = reader
        .read_table(&record.path)
        .map_err(|error| RecordFailure { stage: at, error })?;

    let at = advance(RecordStage::Validating);
    let cleaned = classify_and_clean(raw, filename).map_err(|error| RecordFailure { stage: at, error })?;
    let category = cleaned.category;
    let family = category.family().ok_or_else(|| RecordFailure {
        stage: at,
        error: BomError::unclassifiable(filename),
    })?;

    let at = advance(RecordStage::Transforming);
    let table = transform_bom(cleaned).map_err(|error| RecordFailure { stage: at, error })?;

    advance(RecordStage::Succeeded);
    Ok((category, family, table))
}

/// Attach provenance columns to every row of a transformed BOM.
pub fn add_metadata(
    table: &mut Table,
    record: &BomRecord,
    category: BomCategory,
    load_method: LoadMethod,
    filename: &str,
) {
    tracing::debug!(file = %filename, pon = %record.project_id, "Adding metadata");
    table.set_constant(PON, Cell::text(record.project_id.as_str()));
    table.set_constant(MATERIAL_CATEGORY, Cell::text(category.as_str()));
    table.set_constant(LOAD_METHOD, Cell::text(load_method.as_str()));
    table.set_constant(BOM_FILENAME, Cell::text(filename));
    table.set_constant(UPLOADED_BY, Cell::text(record.uploader.as_str()));
}

fn assemble_primary(tables: Vec<Table>, snapshot: &str) -> BomResult<Table> {
    let mut primary = if tables.is_empty() {
        Table::with_columns(&PERSISTED_PRIMARY_COLUMNS)
    } else {
        Table::concat(tables)
    };
    primary.set_constant(SNAPSHOT_TIME_UTC, Cell::text(snapshot));

    validate_required_columns(&primary, &PERSISTED_PRIMARY_COLUMNS, "post transform", None)?;

    // reorder columns to match the persisted table
    primary
        .select(&PERSISTED_PRIMARY_COLUMNS)
        .map_err(|column| ValidationError::missing_column("post transform", vec![column]).into())
}

fn assemble_secondary(tables: Vec<Table>, snapshot: &str) -> Table {
    let mut secondary = if tables.is_empty() {
        Table::with_columns(&METADATA_COLUMNS)
    } else {
        Table::concat(tables)
    };
    secondary.set_constant(SNAPSHOT_TIME_UTC, Cell::text(snapshot));
    secondary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bom::testing::{primary_a_table, primary_b_table, MemoryReader};
    use bomflow_models::schema::{PART_TAG, QUANTITY};
    use chrono::TimeZone;

    fn snapshot() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 8, 30, 0).unwrap()
    }

    fn reader() -> MemoryReader {
        MemoryReader::default()
            .with(
                "123456_beams.xlsx",
                primary_a_table(&[
                    ("B1", 3.0, "type-a", 100.0, 200.0, 3000.0),
                    ("B1", 5.0, "type-a", 100.0, 200.0, 3000.0),
                    ("B2", 1.0, "type-a", 100.0, 200.0, 1000.0),
                ]),
            )
            .with(
                "123456_panels.xlsx",
                primary_b_table(&[("P1", 2.0, "plain", "Panel", 18.0, 600.0, 1200.0, 0.5)]),
            )
            .with(
                "123456_rebar.xlsx",
                Table::new(vec!["Dia [mm]".into(), "Qty".into()], vec![vec![Cell::Float(12.0), Cell::Int(4)]]),
            )
            .with("123456_notes.xlsx", Table::with_columns(&["Part Tag", "Qty"]))
            .with(
                "123456_broken.xlsx",
                primary_a_table(&[("B9", 1.0, "type-a", 1.0, 1.0, 1.0)]).select(&["Part Tag", "H [mm]"]).unwrap(),
            )
    }

    fn record(name: &str) -> BomRecord {
        BomRecord::new("123456", "jdoe", format!("/staging/{}", name))
    }

    #[test]
    fn test_batch_partitions_by_family() {
        let records = [
            record("123456_beams.xlsx"),
            record("123456_panels.xlsx"),
            record("123456_rebar.xlsx"),
        ];

        let result = process_boms_at(&reader(), &records, LoadMethod::Upload, snapshot()).unwrap();

        assert_eq!(result.tally, BatchTally { total: 3, succeeded: 3, failed: 0 });
        assert_eq!(result.primary.columns(), PERSISTED_PRIMARY_COLUMNS);
        assert_eq!(result.primary.row_count(), 3);
        assert_eq!(result.secondary.row_count(), 1);

        let b1 = result
            .primary
            .rows()
            .iter()
            .position(|row| row[result.primary.column_index(PART_TAG).unwrap()] == Cell::text("B1"))
            .unwrap();
        assert_eq!(result.primary.cell(b1, QUANTITY), Some(&Cell::Int(8)));
        assert_eq!(result.primary.cell(b1, PON), Some(&Cell::text("123456")));
        assert_eq!(result.primary.cell(b1, MATERIAL_CATEGORY), Some(&Cell::text("primary_a")));
        assert_eq!(result.primary.cell(b1, LOAD_METHOD), Some(&Cell::text("upload")));
        assert_eq!(result.primary.cell(b1, BOM_FILENAME), Some(&Cell::text("123456_beams.xlsx")));
        assert_eq!(result.primary.cell(b1, UPLOADED_BY), Some(&Cell::text("jdoe")));
        assert_eq!(result.secondary.cell(0, MATERIAL_CATEGORY), Some(&Cell::text("secondary")));
    }

    #[test]
    fn test_snapshot_time_shared_by_every_row() {
        let records = [record("123456_beams.xlsx"), record("123456_rebar.xlsx")];
        let result = process_boms_at(&reader(), &records, LoadMethod::Full, snapshot()).unwrap();

        let expected = Cell::text("2024-05-01T08:30:00+00:00");
        assert!(result.primary.column(SNAPSHOT_TIME_UTC).unwrap().all(|c| c == &expected));
        assert!(result.secondary.column(SNAPSHOT_TIME_UTC).unwrap().all(|c| c == &expected));
        assert_eq!(result.snapshot_time_string(), "2024-05-01T08:30:00+00:00");
    }

    #[test]
    fn test_failures_are_counted_not_raised() {
        let records = [
            record("123456_notes.xlsx"),
            record("123456_beams.xlsx"),
            record("123456_broken.xlsx"),
            record("123456_missing.xlsx"),
            record("123456_panels.xlsx"),
        ];

        let result = process_boms_at(&reader(), &records, LoadMethod::Full, snapshot()).unwrap();
        assert_eq!(result.tally, BatchTally { total: 5, succeeded: 2, failed: 3 });
        assert_eq!(result.primary.row_count(), 3);
        assert!(result.secondary.is_empty());
    }

    #[test]
    fn test_unclassified_file_only() {
        let records = [record("123456_notes.xlsx")];
        let result = process_boms_at(&reader(), &records, LoadMethod::Upload, snapshot()).unwrap();

        assert_eq!(result.tally.failed, 1);
        assert!(result.primary.is_empty());
        assert_eq!(result.primary.columns(), PERSISTED_PRIMARY_COLUMNS);
        assert!(result.secondary.has_column(SNAPSHOT_TIME_UTC));
    }

    #[test]
    fn test_failure_stage_is_reported() {
        let reader = reader();
        let missing = process_record(&reader, &record("nope.xlsx"), "nope.xlsx").unwrap_err();
        assert_eq!(missing.stage, RecordStage::Extracting);

        let unclassified = process_record(&reader, &record("123456_notes.xlsx"), "123456_notes.xlsx").unwrap_err();
        assert_eq!(unclassified.stage, RecordStage::Validating);
        assert_eq!(unclassified.error, BomError::unclassifiable("123456_notes.xlsx"));

        let broken = process_record(&reader, &record("123456_broken.xlsx"), "123456_broken.xlsx").unwrap_err();
        assert_eq!(broken.stage, RecordStage::Validating);
        assert_eq!(broken.error.error_code(), "MISSING_COLUMN");
    }

    #[test]
    fn test_bad_numbers_fail_only_their_record() {
        let mut nan_height = primary_a_table(&[("N1", 1.0, "type-a", 100.0, 200.0, 3000.0)]);
        nan_height.rows_mut()[0][5] = Cell::text("NaN");
        let reader = reader()
            .with("123456_nan.xlsx", nan_height)
            .with(
                "123456_huge.xlsx",
                primary_a_table(&[
                    ("H1", 6e18, "type-a", 100.0, 200.0, 3000.0),
                    ("H1", 6e18, "type-a", 100.0, 200.0, 3000.0),
                ]),
            );

        let overflow = process_record(&reader, &record("123456_huge.xlsx"), "123456_huge.xlsx").unwrap_err();
        assert_eq!(overflow.stage, RecordStage::Transforming);
        assert_eq!(overflow.error.error_code(), "TYPE_CONVERSION_ERROR");

        let records = [record("123456_nan.xlsx"), record("123456_huge.xlsx"), record("123456_beams.xlsx")];
        let result = process_boms_at(&reader, &records, LoadMethod::Upload, snapshot()).unwrap();
        assert_eq!(result.tally, BatchTally { total: 3, succeeded: 1, failed: 2 });
    }

    #[test]
    fn test_one_row_per_successful_record() {
        // N records, K failures, no collapsing duplicates: N - K rows
        let reader = MemoryReader::default()
            .with("1.xlsx", primary_a_table(&[("A", 1.0, "type-a", 1.0, 2.0, 3.0)]))
            .with("2.xlsx", primary_b_table(&[("B", 1.0, "plain", "x", 1.0, 2.0, 3.0, 0.0)]))
            .with("3.xlsx", Table::new(vec!["Dia [mm]".into()], vec![vec![Cell::Float(8.0)]]));
        let records = [record("1.xlsx"), record("2.xlsx"), record("3.xlsx"), record("4.xlsx")];

        let result = process_boms_at(&reader, &records, LoadMethod::Full, snapshot()).unwrap();
        assert_eq!(result.tally.failed, 1);
        assert_eq!(result.total_rows(), records.len() - result.tally.failed);
    }
}
