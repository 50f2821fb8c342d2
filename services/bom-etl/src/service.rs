//! ETL Service
//!
//! Wires discovery, the BOM pipeline and persistence together for each
//! command-line entry point.

use anyhow::{bail, Context, Result};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use bomflow_database::{initialize_database, BomRepository, DatabaseSettings};
use bomflow_models::{BatchResult, BatchTally, BomRecord, LoadMethod};
use bomflow_utils::{
    process_boms, scrape_design_directory, scrape_staging_folder, stage_uploads, validate_files,
    AppConfig, SpreadsheetReader, ValidationReport,
};

pub struct EtlService {
    config: AppConfig,
    reader: SpreadsheetReader,
}

impl EtlService {
    pub fn new(config: AppConfig) -> Self {
        Self {
            config,
            reader: SpreadsheetReader::new(),
        }
    }

    /// Full load from the design project tree; overwrites the final table
    pub async fn run_design(&self) -> Result<BatchTally> {
        tracing::info!("Initializing ETL process to scrape design folder");

        let root = self.config.design_project_directory()?;
        let records = scrape_design_directory(root).context("Failed to scrape design directory")?;
        let batch = self.process(records, LoadMethod::Full).await?;

        let repository = self.repository().await?;
        repository.replace_staging(&batch.primary).await?;
        repository.refresh_final().await?;

        Ok(batch.tally)
    }

    /// Upload load from the staging folder; appends history, refreshes current
    pub async fn run_staging(&self) -> Result<BatchTally> {
        tracing::info!("Initializing ETL process for staging folder");

        let records = scrape_staging_folder(&self.config.paths.staging_dir)
            .context("Failed to collect staged BOMs")?;
        let batch = self.process(records.clone(), LoadMethod::Upload).await?;

        let repository = self.repository().await?;
        repository.replace_staging(&batch.primary).await?;
        repository.insert_uploads_into_history().await?;
        remove_processed(&records);
        repository.refresh_final_current().await?;

        Ok(batch.tally)
    }

    pub fn validate(&self, files: &[PathBuf]) -> ValidationReport {
        validate_files(&self.reader, files)
    }

    /// Validate files and, when every one passes, copy them into staging
    pub fn upload(&self, pon: &str, uploader: &str, files: &[PathBuf], replace_existing: bool) -> Result<Vec<PathBuf>> {
        let report = self.validate(files);
        if !report.is_clean() {
            for (path, reason) in &report.rejected {
                tracing::error!(file = %path.display(), reason = %reason, "Rejected BOM");
            }
            bail!(
                "{} of {} files failed validation; nothing was uploaded",
                report.rejected.len(),
                files.len()
            );
        }

        let staged = stage_uploads(
            &self.config.paths.staging_dir,
            pon,
            uploader,
            &report.accepted,
            replace_existing,
        )?;
        Ok(staged)
    }

    async fn process(&self, records: Vec<BomRecord>, load_method: LoadMethod) -> Result<BatchResult> {
        let reader = self.reader;
        let batch = tokio::task::spawn_blocking(move || process_boms(&reader, &records, load_method))
            .await
            .context("BOM processing task panicked")??;
        Ok(batch)
    }

    async fn repository(&self) -> Result<BomRepository> {
        let database = &self.config.database;
        let settings = DatabaseSettings {
            postgres_url: database.url.clone(),
            schema: database.schema.clone(),
            max_connections: database.max_connections,
            connection_timeout: Duration::from_secs(database.connection_timeout_seconds),
        };

        let pool = initialize_database(&settings).await?;
        Ok(BomRepository::new(pool, settings.schema))
    }
}

/// Staged files are consumed once loaded; a failed delete is only logged
fn remove_processed(records: &[BomRecord]) {
    for record in records {
        match fs::remove_file(&record.path) {
            Ok(()) => tracing::info!(file = %record.filename(), "Deleted file from staging"),
            Err(err) => tracing::warn!(file = %record.filename(), error = %err, "Could not delete staged file"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bomflow_models::BomCategory;
    use tempfile::TempDir;

    const PRIMARY_A_CSV: &str = "Part Tag,Qty,Material,Grade,Designation,H [mm],W [mm],L [mm],Total Length [m],Surface [m2],Element,Comment\n\
        B1,2,Glulam type-a,,Beam,100,200,3000,,1.5,,\n\
        ,,,,,,,,,,,\n";

    fn service(staging_dir: PathBuf) -> EtlService {
        let mut config = AppConfig::default();
        config.paths.staging_dir = staging_dir;
        EtlService::new(config)
    }

    #[test]
    fn test_validate_reads_files_from_disk() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path();
        let good = dir.join("beams.csv");
        let bad = dir.join("notes.csv");
        fs::write(&good, PRIMARY_A_CSV).unwrap();
        fs::write(&bad, "Comment\nhello\n").unwrap();

        let report = service(dir.to_path_buf()).validate(&[good.clone(), bad.clone()]);
        assert_eq!(report.accepted, vec![(good, BomCategory::PrimaryA)]);
        assert_eq!(report.rejected.len(), 1);
        assert_eq!(report.rejected[0].0, bad);
    }

    #[test]
    fn test_upload_refuses_when_any_file_fails() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path();
        let staging = dir.join("staging");
        fs::create_dir_all(&staging).unwrap();
        let bad = dir.join("notes.xlsx");
        fs::write(&bad, b"not a workbook").unwrap();

        let err = service(staging.clone()).upload("123456", "jdoe", &[bad], false).unwrap_err();
        assert!(err.to_string().contains("1 of 1 files failed validation"));
        assert_eq!(fs::read_dir(&staging).unwrap().count(), 0);
    }

    #[test]
    fn test_remove_processed_tolerates_missing_files() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path();
        let staged = dir.join("123456_primary_a_staging_jdoe.xlsx");
        fs::write(&staged, b"x").unwrap();
        let records = vec![
            BomRecord::new("123456", "jdoe", &staged),
            BomRecord::new("123456", "jdoe", dir.join("gone.xlsx")),
        ];

        remove_processed(&records);
        assert!(!staged.exists());
    }
}
