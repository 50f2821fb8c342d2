use thiserror::Error;

/// Schema check failures. Each variant names every offending column.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Missing columns at {stage} stage: {columns:?}")]
    MissingColumn { stage: String, columns: Vec<String> },

    #[error("Missing values at {stage} stage. The following columns are missing values: {columns:?}")]
    MissingValue { stage: String, columns: Vec<String> },
}

impl ValidationError {
    pub fn missing_column(stage: impl Into<String>, columns: Vec<String>) -> Self {
        Self::MissingColumn {
            stage: stage.into(),
            columns,
        }
    }

    pub fn missing_value(stage: impl Into<String>, columns: Vec<String>) -> Self {
        Self::MissingValue {
            stage: stage.into(),
            columns,
        }
    }

    pub fn columns(&self) -> &[String] {
        match self {
            Self::MissingColumn { columns, .. } | Self::MissingValue { columns, .. } => columns,
        }
    }
}

/// Per-file pipeline failure
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BomError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Failed to convert column '{column}' to {target}: {reason}")]
    TypeConversion {
        column: String,
        target: String,
        reason: String,
    },

    #[error("Unknown BOM category for: {filename}")]
    UnclassifiableCategory { filename: String },

    #[error("Failed to read {filename}: {message}")]
    Extraction { filename: String, message: String },
}

impl BomError {
    pub fn type_conversion(
        column: impl Into<String>,
        target: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::TypeConversion {
            column: column.into(),
            target: target.into(),
            reason: reason.into(),
        }
    }

    pub fn unclassifiable(filename: impl Into<String>) -> Self {
        Self::UnclassifiableCategory {
            filename: filename.into(),
        }
    }

    pub fn extraction(filename: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Extraction {
            filename: filename.into(),
            message: message.into(),
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Validation(ValidationError::MissingColumn { .. }) => "MISSING_COLUMN",
            Self::Validation(ValidationError::MissingValue { .. }) => "MISSING_VALUE",
            Self::TypeConversion { .. } => "TYPE_CONVERSION_ERROR",
            Self::UnclassifiableCategory { .. } => "UNCLASSIFIABLE_CATEGORY",
            Self::Extraction { .. } => "EXTRACTION_ERROR",
        }
    }
}

pub type BomResult<T> = Result<T, BomError>;

/// Discovery pass failures. A bad staging filename fails the whole pass.
#[derive(Error, Debug)]
pub enum DiscoveryError {
    #[error("Unexpected file names: {0:?}")]
    UnexpectedFilenames(Vec<String>),

    #[error("Failed to scan {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Staging upload failures
#[derive(Error, Debug)]
pub enum StagingError {
    #[error("Invalid PON '{0}': PON must be a number with 5-7 digits")]
    InvalidPon(String),

    #[error("Invalid uploader '{0}': only letters, digits and underscores are allowed")]
    InvalidUploader(String),

    #[error("There are existing files for PON {pon} waiting to be processed: {files:?}")]
    ExistingFiles { pon: String, files: Vec<String> },

    #[error("No validated BOMs to upload")]
    NothingToUpload,

    #[error("Only .xls and .xlsx files can be staged: {0}")]
    UnsupportedFile(String),

    #[error("Upload aborted: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        let err: BomError = ValidationError::missing_column("cleaning", vec!["Qty".into()]).into();
        assert_eq!(err.error_code(), "MISSING_COLUMN");
        assert_eq!(err.to_string(), "Missing columns at cleaning stage: [\"Qty\"]");

        let err = BomError::type_conversion("Qty", "integer", "bad value");
        assert_eq!(err.error_code(), "TYPE_CONVERSION_ERROR");
        assert_eq!(err.to_string(), "Failed to convert column 'Qty' to integer: bad value");
    }

    #[test]
    fn test_validation_error_columns() {
        let err = ValidationError::missing_value("cleaning", vec!["a".into(), "b".into()]);
        assert_eq!(err.columns(), ["a", "b"]);
    }
}
