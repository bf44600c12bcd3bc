//! Error types for cfpush

use thiserror::Error;

/// Main error type for a push run
///
/// The `Display` text of each variant is what the build console shows after the
/// `ERROR: ` prefix.
#[derive(Error, Debug)]
pub enum PushError {
    #[error("Could not find manifest file: {0}")]
    MissingManifest(String),

    #[error("Could not parse manifest: {0}")]
    ManifestParsing(String),

    #[error("The target URL is not valid: {0}")]
    InvalidTarget(String),

    #[error("Unknown host: {0}")]
    UnreachableTarget(String),

    #[error("Wrong username or password: {0}")]
    Authentication(String),

    #[error("Could not find application bits: {0}")]
    MissingArtifact(String),

    #[error("Platform error: {0}")]
    Platform(String),

    #[error("The application failed to start after {seconds} seconds ({detail})")]
    TimeoutExceeded { seconds: u32, detail: String },

    #[error("Push cancelled during {0}")]
    Cancelled(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl PushError {
    /// True for failures raised before any remote call could be made
    pub fn is_local(&self) -> bool {
        matches!(
            self,
            PushError::MissingManifest(_)
                | PushError::ManifestParsing(_)
                | PushError::InvalidTarget(_)
                | PushError::ConfigError(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_console_text() {
        let err = PushError::TimeoutExceeded {
            seconds: 5,
            detail: "0 running, 2 starting".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "The application failed to start after 5 seconds (0 running, 2 starting)"
        );
        assert!(PushError::Authentication("403".into())
            .to_string()
            .starts_with("Wrong username or password"));
    }

    #[test]
    fn test_is_local() {
        assert!(PushError::ManifestParsing("x".into()).is_local());
        assert!(PushError::MissingManifest("x".into()).is_local());
        assert!(!PushError::Platform("x".into()).is_local());
    }
}
