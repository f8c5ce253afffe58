use thiserror::Error;

pub type Result<T> = std::result::Result<T, ConversionError>;

#[derive(Debug, Error)]
pub enum ConversionError {
    #[error("Missing columns in original file: {0:?}")]
    MissingColumns(Vec<String>),

    #[error("Error reading spreadsheet {path}: {reason}")]
    ReadFailure { path: String, reason: String },

    #[error("Invalid operation date at row {row}: '{value}'")]
    InvalidDate { row: usize, value: String },

    #[error("Error writing statement to {path}: {reason}")]
    WriteFailure { path: String, reason: String },
}

impl ConversionError {
    pub fn read(path: impl Into<String>, reason: impl ToString) -> Self {
        ConversionError::ReadFailure {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    pub fn write(path: impl Into<String>, reason: impl ToString) -> Self {
        ConversionError::WriteFailure {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}
