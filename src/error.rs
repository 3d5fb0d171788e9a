//! Error types for the edgequake-office2pdf library.
//!
//! A conversion either leaves a PDF at the expected path or it does not, so
//! there is a single error type, [`ConversionError`], returned as the `Err`
//! side of [`crate::output::ConversionResult`]. Every failure inside the
//! invoker (path setup, directory creation, process launch, the missing
//! artifact) is folded into one of its variants before it reaches the caller.
//!
//! The resolver never returns an error: a probe that fails just moves on to
//! the next candidate, and exhaustion is reported as
//! [`crate::engine::ResolvedCommand::NotFound`].

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// All failures returned by the conversion entry points.
#[derive(Debug, Error)]
pub enum ConversionError {
    // ── Engine errors ─────────────────────────────────────────────────────
    /// Neither the detection helper nor any candidate produced a working engine.
    #[error(
        "No working LibreOffice command found.\n\
Install LibreOffice, or put `soffice` on PATH, or set SOFFICE_PATH."
    )]
    EngineNotFound,

    /// The engine process could not be launched or waited on.
    #[error("Failed to run '{command}': {reason}")]
    ExecutionFailure { command: String, reason: String },

    /// The engine did not finish within the configured bound and was killed.
    #[error("'{command}' timed out after {:.1}s\nIncrease --convert-timeout.", .timeout.as_secs_f64())]
    Timeout { command: String, timeout: Duration },

    /// The engine finished but the expected PDF is not on disk.
    #[error("PDF file was not created: '{path}' (exit code {exit_code:?})\nEngine stderr: {stderr}")]
    ArtifactMissing {
        path: PathBuf,
        exit_code: Option<i32>,
        stderr: String,
    },

    // ── Input / I/O errors ────────────────────────────────────────────────
    /// The source document does not exist or cannot be read.
    #[error("Source file not found: '{path}'\nCheck the path exists and is readable.")]
    SourceNotFound { path: PathBuf },

    /// Filesystem failure while preparing or collecting a conversion.
    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ConversionError {
    pub(crate) fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Short machine-friendly name of the failure class, used in log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::EngineNotFound => "engine_not_found",
            Self::ExecutionFailure { .. } | Self::Timeout { .. } => "execution_failure",
            Self::ArtifactMissing { .. } => "artifact_missing",
            Self::SourceNotFound { .. } | Self::Io { .. } => "io_failure",
            Self::InvalidConfig(_) => "invalid_config",
            Self::Internal(_) => "internal",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn artifact_missing_display_includes_stderr() {
        let e = ConversionError::ArtifactMissing {
            path: PathBuf::from("/tmp/out/report.pdf"),
            exit_code: Some(0),
            stderr: "Error: source file could not be loaded".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("report.pdf"), "got: {msg}");
        assert!(msg.contains("could not be loaded"), "got: {msg}");
    }

    #[test]
    fn timeout_display() {
        let e = ConversionError::Timeout {
            command: "soffice".into(),
            timeout: Duration::from_secs(30),
        };
        assert!(e.to_string().contains("30.0s"));
        assert!(e.to_string().contains("soffice"));

        let short = ConversionError::Timeout {
            command: "soffice".into(),
            timeout: Duration::from_millis(200),
        };
        assert!(short.to_string().contains("after 0.2s"), "got: {short}");
    }

    #[test]
    fn kinds_follow_taxonomy() {
        assert_eq!(ConversionError::EngineNotFound.kind(), "engine_not_found");
        let timeout = ConversionError::Timeout {
            command: "soffice".into(),
            timeout: Duration::from_secs(1),
        };
        assert_eq!(timeout.kind(), "execution_failure");
        let io = ConversionError::io(
            "Failed to create output directory",
            std::io::Error::from(std::io::ErrorKind::PermissionDenied),
        );
        assert_eq!(io.kind(), "io_failure");
        assert!(io.to_string().starts_with("Failed to create output directory"));
    }
}
