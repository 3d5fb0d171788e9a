//! Conversion results.

use crate::error::ConversionError;
use std::path::PathBuf;

/// Outcome of one conversion attempt.
///
/// `Ok` means the PDF exists at [`ConversionOutput::pdf_path`]; `Err`
/// carries the cause. Nothing else is persisted either way.
pub type ConversionResult = Result<ConversionOutput, ConversionError>;

/// A successful conversion, with the engine diagnostics captured on the way.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionOutput {
    /// Path of the produced PDF.
    pub pdf_path: PathBuf,
    /// Engine command that produced it.
    pub command: String,
    /// Engine exit code. May be non-zero even though the PDF exists.
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
    pub duration_ms: u64,
}

/// A converted document held in memory, for callers that never see a path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConvertedPdf {
    /// Suggested download name: the source stem plus `.pdf`.
    pub file_name: String,
    pub bytes: Vec<u8>,
}
