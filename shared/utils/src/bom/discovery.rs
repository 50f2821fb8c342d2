//! BOM discovery
//!
//! Finds BOM files either in the design project tree (full loads) or in the
//! staging folder (uploads) and turns them into [`BomRecord`]s.

use regex::Regex;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use bomflow_models::{BomRecord, SYSTEM_UPLOADER};

use crate::error::DiscoveryError;

const PROJECT_FOLDER_PATTERN: &str = r"^\d+ *- *.+";
const OUTPUT_FOLDER_PATTERN: &str = r"^\d+ *- *.+ *- *outputs";
const BOM_FILE_PATTERN: &str = r"^\d+.*.xls(x)?$";
const STAGING_FILE_PATTERN: &str = r"^(\d{5,7})_.*_staging_(\w+)\.xls[x]?$";

/// Scrape every BOM under the design projects tree.
///
/// Layout: `<root>/<pon - project>/<pon - project - Outputs>/<pon...xls[x]>`.
/// Missing or empty folders are logged and skipped.
pub fn scrape_design_directory(root: &Path) -> Result<Vec<BomRecord>, DiscoveryError> {
    tracing::info!(root = %root.display(), "Scraping BOM paths from design directory");

    let project_pattern = Regex::new(PROJECT_FOLDER_PATTERN).expect("valid project folder regex");
    let output_pattern = Regex::new(OUTPUT_FOLDER_PATTERN).expect("valid output folder regex");
    let bom_pattern = Regex::new(BOM_FILE_PATTERN).expect("valid BOM file regex");

    let projects: Vec<PathBuf> = list_entries(root)?
        .into_iter()
        .filter(|(path, name)| path.is_dir() && project_pattern.is_match(name))
        .map(|(path, _)| path)
        .collect();
    if projects.is_empty() {
        tracing::warn!(root = %root.display(), "No project folders found");
    }

    let mut output_folders = Vec::new();
    for project in &projects {
        let found: Vec<PathBuf> = list_entries(project)?
            .into_iter()
            .filter(|(path, name)| path.is_dir() && output_pattern.is_match(&name.to_lowercase()))
            .map(|(path, _)| path)
            .collect();
        if found.is_empty() {
            tracing::warn!(folder = %project.display(), "No output folders found");
        }
        output_folders.extend(found);
    }

    let mut by_pon: BTreeMap<String, Vec<PathBuf>> = BTreeMap::new();
    for folder in &output_folders {
        let (pon, files) = bom_files_in(folder, &bom_pattern)?;
        if files.is_empty() {
            continue;
        }
        let entry = by_pon.entry(pon).or_default();
        if !entry.is_empty() {
            tracing::warn!(folder = %folder.display(), "Multiple output folders for the same PON found");
        }
        entry.extend(files);
    }

    let records: Vec<BomRecord> = by_pon
        .into_iter()
        .flat_map(|(pon, files)| {
            files
                .into_iter()
                .map(move |path| BomRecord::new(pon.as_str(), SYSTEM_UPLOADER, path))
        })
        .collect();

    tracing::info!(count = records.len(), "Discovered design BOMs");
    Ok(records)
}

/// BOM files in one outputs folder, keyed by the PON prefix of the folder name
fn bom_files_in(folder: &Path, pattern: &Regex) -> Result<(String, Vec<PathBuf>), DiscoveryError> {
    let folder_name = folder
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    let pon = folder_name.split('-').next().unwrap_or_default().trim().to_string();

    let files: Vec<PathBuf> = list_entries(folder)?
        .into_iter()
        .filter(|(path, name)| path.is_file() && pattern.is_match(name))
        .map(|(path, _)| path)
        .collect();

    if files.is_empty() {
        tracing::warn!(folder = %folder_name, "No BOMs found");
    }
    Ok((pon, files))
}

/// Collect every staged upload.
///
/// All file names must follow `{pon}_..._staging_{uploader}.xls[x]`; any
/// that do not fail the whole scan so nothing is silently left behind.
pub fn scrape_staging_folder(staging_dir: &Path) -> Result<Vec<BomRecord>, DiscoveryError> {
    tracing::info!(staging_dir = %staging_dir.display(), "Collecting BOM paths from staging folder");

    let mut records = Vec::new();
    let mut unexpected = Vec::new();

    for (path, name) in list_entries(staging_dir)? {
        if !path.is_file() {
            continue;
        }
        match parse_staging_filename(&name) {
            Some((pon, uploader)) => records.push(BomRecord::new(pon, uploader, path)),
            None => {
                tracing::error!(file = %name, "Unexpected file in staging");
                unexpected.push(name);
            }
        }
    }

    if !unexpected.is_empty() {
        unexpected.sort();
        return Err(DiscoveryError::UnexpectedFilenames(unexpected));
    }

    tracing::info!(count = records.len(), "Discovered staged BOMs");
    Ok(records)
}

/// Split a staged file name into its PON and uploader
pub fn parse_staging_filename(name: &str) -> Option<(String, String)> {
    let pattern = Regex::new(STAGING_FILE_PATTERN).expect("valid staging file regex");
    let captures = pattern.captures(name)?;
    Some((captures[1].to_string(), captures[2].to_string()))
}

/// Directory entries sorted by name
fn list_entries(dir: &Path) -> Result<Vec<(PathBuf, String)>, DiscoveryError> {
    let io_error = |source| DiscoveryError::Io {
        path: dir.display().to_string(),
        source,
    };

    let mut entries = Vec::new();
    for entry in fs::read_dir(dir).map_err(io_error)? {
        let entry = entry.map_err(io_error)?;
        let name = entry.file_name().to_string_lossy().into_owned();
        entries.push((entry.path(), name));
    }
    entries.sort_by(|a, b| a.1.cmp(&b.1));
    Ok(entries)
}
