use thiserror::Error;

/// Failure of a curation run.
///
/// Every variant aborts the run; nothing is retried and no output is written.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum CurateError {
    /// A source file is missing, unreadable, malformed, or lacks a required column.
    #[error("load failed for '{source_id}': {message}")]
    Load { source_id: String, message: String },

    /// Inputs or configuration that cannot be curated (e.g. an empty daily table).
    #[error("validation failed: {0}")]
    Validation(String),

    /// A column does not carry enough known values to be filled.
    #[error("cannot interpolate `{column}`: {message} ({known} known of {rows} rows)")]
    Interpolation {
        column: String,
        known: usize,
        rows: usize,
        message: String,
    },

    /// An output artifact could not be written.
    #[error("failed to persist '{path}': {message}")]
    Persist { path: String, message: String },
}

impl CurateError {
    pub fn load(source_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Load {
            source_id: source_id.into(),
            message: message.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn persist(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Persist {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Pipeline stage the error originated from.
    pub fn stage(&self) -> &'static str {
        match self {
            Self::Load { .. } => "load",
            Self::Validation(_) => "validate",
            Self::Interpolation { .. } => "interpolate",
            Self::Persist { .. } => "persist",
        }
    }

    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Load { .. } => 2,
            Self::Validation(_) => 3,
            Self::Interpolation { .. } => 4,
            Self::Persist { .. } => 5,
        }
    }
}
