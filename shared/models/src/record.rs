use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::table::Table;

/// Uploader recorded for BOMs scraped from the design tree
pub const SYSTEM_UPLOADER: &str = "system";

/// A discovered BOM file and who it belongs to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BomRecord {
    pub project_id: String,
    pub uploader: String,
    pub path: PathBuf,
}

impl BomRecord {
    pub fn new(project_id: impl Into<String>, uploader: impl Into<String>, path: impl AsRef<Path>) -> Self {
        Self {
            project_id: project_id.into(),
            uploader: uploader.into(),
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn filename(&self) -> String {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string())
    }
}

/// How a batch reached the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadMethod {
    /// Full scrape of the design project tree
    Full,
    /// Files uploaded through the staging folder
    Upload,
}

impl LoadMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::Upload => "upload",
        }
    }
}

/// Success/failure counts for one orchestration run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BatchTally {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
}

/// Output of one orchestration run
#[derive(Debug, Clone)]
pub struct BatchResult {
    pub primary: Table,
    pub secondary: Table,
    pub snapshot_time: DateTime<Utc>,
    pub tally: BatchTally,
}

impl BatchResult {
    pub fn snapshot_time_string(&self) -> String {
        format_snapshot_time(&self.snapshot_time)
    }

    pub fn total_rows(&self) -> usize {
        self.primary.row_count() + self.secondary.row_count()
    }
}

/// ISO-8601 at second precision, e.g. `2024-05-01T08:30:00+00:00`
pub fn format_snapshot_time(time: &DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Secs, false)
}
