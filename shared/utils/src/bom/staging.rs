//! Staging upload
//!
//! Validates user supplied BOMs and copies the accepted ones into the staging
//! folder under names the staging scan understands:
//! `{pon}_{category}[_{n}]_staging_{uploader}{ext}`.

use std::fs;
use std::path::{Path, PathBuf};

use bomflow_models::BomCategory;
use uuid::Uuid;

use super::extractor::{display_name, extract_bom};
use super::parser::TableReader;
use crate::error::StagingError;

/// Outcome of checking a set of files before upload
#[derive(Debug, Default)]
pub struct ValidationReport {
    pub accepted: Vec<(PathBuf, BomCategory)>,
    pub rejected: Vec<(PathBuf, String)>,
}

impl ValidationReport {
    pub fn is_clean(&self) -> bool {
        self.rejected.is_empty()
    }
}

/// Run extraction on every file and report which would load.
pub fn validate_files<R: TableReader + ?Sized>(reader: &R, paths: &[PathBuf]) -> ValidationReport {
    let mut report = ValidationReport::default();

    for path in paths {
        let filename = display_name(path);
        match extract_bom(reader, path) {
            Ok(cleaned) => {
                tracing::info!(file = %filename, category = %cleaned.category, "BOM validated");
                report.accepted.push((path.clone(), cleaned.category));
            }
            Err(err) => {
                tracing::warn!(file = %filename, code = err.error_code(), error = %err, "BOM failed validation");
                report.rejected.push((path.clone(), err.to_string()));
            }
        }
    }

    report
}

/// Copy validated BOMs into the staging folder.
///
/// Files already staged for the same PON block the upload unless
/// `replace_existing` is set, in which case they are deleted first. Files
/// are gathered in a temporary directory inside staging and moved over once
/// every copy succeeded; the temporary directory never outlives the call.
pub fn stage_uploads(
    staging_dir: &Path,
    pon: &str,
    uploader: &str,
    validated: &[(PathBuf, BomCategory)],
    replace_existing: bool,
) -> Result<Vec<PathBuf>, StagingError> {
    let pon = pon.trim();
    if !is_valid_pon(pon) {
        tracing::warn!(pon = %pon, "Invalid PON");
        return Err(StagingError::InvalidPon(pon.to_string()));
    }
    if uploader.is_empty() || !uploader.chars().all(|c| c.is_alphanumeric() || c == '_') {
        return Err(StagingError::InvalidUploader(uploader.to_string()));
    }
    if validated.is_empty() {
        return Err(StagingError::NothingToUpload);
    }
    if let Some((path, _)) = validated.iter().find(|(path, _)| !is_workbook(path)) {
        return Err(StagingError::UnsupportedFile(display_name(path)));
    }

    let existing = existing_files_for(staging_dir, pon)?;
    if !existing.is_empty() {
        if !replace_existing {
            tracing::info!(pon = %pon, "BOM upload aborted, existing files found");
            return Err(StagingError::ExistingFiles {
                pon: pon.to_string(),
                files: existing.iter().map(|p| display_name(p)).collect(),
            });
        }
        for file in &existing {
            tracing::info!(file = %file.display(), "Deleting existing file");
            fs::remove_file(file)?;
        }
    }

    let temp_dir = staging_dir.join(format!("tmp_upload_{}", Uuid::new_v4().simple()));
    let result = copy_to_temp(&temp_dir, pon, uploader, validated)
        .and_then(|_| move_into_staging(&temp_dir, staging_dir));

    if temp_dir.exists() {
        if let Err(err) = fs::remove_dir_all(&temp_dir) {
            tracing::warn!(dir = %temp_dir.display(), error = %err, "Failed to remove temporary upload directory");
        }
    }

    match &result {
        Ok(staged) => tracing::info!(count = staged.len(), pon = %pon, "BOM upload successful"),
        Err(err) => tracing::error!(error = %err, "Upload aborted"),
    }
    result
}

/// The staging scan only picks up `.xls` and `.xlsx` files
fn is_workbook(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|ext| ext.to_str()),
        Some("xls") | Some("xlsx")
    )
}

fn is_valid_pon(pon: &str) -> bool {
    (5..=7).contains(&pon.len()) && pon.chars().all(|c| c.is_ascii_digit())
}

/// Staged files matching `{pon}_*.xls*`
fn existing_files_for(staging_dir: &Path, pon: &str) -> Result<Vec<PathBuf>, StagingError> {
    let prefix = format!("{}_", pon);
    let mut files = Vec::new();

    for entry in fs::read_dir(staging_dir)? {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if let Some(rest) = name.strip_prefix(&prefix) {
            if rest.contains(".xls") && entry.path().is_file() {
                files.push(entry.path());
            }
        }
    }

    files.sort();
    Ok(files)
}

fn copy_to_temp(
    temp_dir: &Path,
    pon: &str,
    uploader: &str,
    validated: &[(PathBuf, BomCategory)],
) -> Result<(), StagingError> {
    tracing::info!(count = validated.len(), "Copying files to temporary directory");
    fs::create_dir(temp_dir)?;

    for (source, category) in validated {
        let extension = source
            .extension()
            .map(|ext| format!(".{}", ext.to_string_lossy()))
            .unwrap_or_default();

        let mut target = temp_dir.join(format!("{}_{}_staging_{}{}", pon, category, uploader, extension));
        let mut count = 1;
        while target.exists() {
            count += 1;
            target = temp_dir.join(format!("{}_{}_{}_staging_{}{}", pon, category, count, uploader, extension));
        }

        tracing::info!(file = %display_name(source), staged_as = %display_name(&target), "Copying BOM");
        fs::copy(source, &target)?;
    }
    Ok(())
}

fn move_into_staging(temp_dir: &Path, staging_dir: &Path) -> Result<Vec<PathBuf>, StagingError> {
    let mut staged = Vec::new();

    for entry in fs::read_dir(temp_dir)? {
        let entry = entry?;
        let destination = staging_dir.join(entry.file_name());
        if destination.exists() {
            fs::remove_file(&destination)?;
        }
        fs::rename(entry.path(), &destination)?;
        staged.push(destination);
    }

    staged.sort();
    Ok(staged)
}
