//! Domain error types.

/// Why a single dataset line did not become a [`Record`](super::record::Record).
#[derive(Debug, thiserror::Error)]
pub enum RecordError {
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("line is valid JSON but not an object")]
    NotAnObject,
}

/// Top-level error type for segview.
#[derive(Debug, thiserror::Error)]
pub enum SegviewError {
    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("{field} required")]
    MissingInput { field: String },

    #[error("unknown dataset kind: {0}")]
    UnknownKind(String),

    #[error("invalid file name: {0}")]
    InvalidFileName(String),

    #[error("file not found: {0}")]
    FileNotFound(String),

    #[error("failed to read {path}: {reason}")]
    FileRead { path: String, reason: String },

    #[error("render error: {reason}")]
    Render { reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl SegviewError {
    pub fn missing(field: impl Into<String>) -> Self {
        SegviewError::MissingInput {
            field: field.into(),
        }
    }
}

impl From<&SegviewError> for std::process::ExitCode {
    fn from(err: &SegviewError) -> Self {
        let code: u8 = match err {
            SegviewError::Io(_) | SegviewError::FileRead { .. } => 1,
            SegviewError::ConfigParse { .. }
            | SegviewError::ConfigMissing { .. }
            | SegviewError::ConfigInvalid { .. } => 2,
            SegviewError::MissingInput { .. }
            | SegviewError::UnknownKind(_)
            | SegviewError::InvalidFileName(_) => 3,
            SegviewError::FileNotFound(_) | SegviewError::Render { .. } => 4,
        };
        std::process::ExitCode::from(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_input_message_names_field() {
        let err = SegviewError::missing("asset and date");
        assert_eq!(err.to_string(), "asset and date required");
    }

    #[test]
    fn record_error_wraps_json_error() {
        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err = RecordError::from(json_err);
        assert!(err.to_string().starts_with("invalid JSON"));
    }
}
