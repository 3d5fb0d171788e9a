//! # edgequake-office2pdf
//!
//! Convert office documents (spreadsheets, word-processing files,
//! presentations, plain text) to PDF by driving an installed LibreOffice
//! engine, as a library, a CLI, or an HTTP upload service.
//!
//! ## Pipeline Overview
//!
//! ```text
//! upload / path
//!  │
//!  ├─ 1. Resolve  find a working engine command (helper, then candidates); cached
//!  ├─ 2. Filter   typed export-filter descriptor from the source kind
//!  ├─ 3. Run      <cmd> --convert-to <filter> --outdir <dir> <source>
//!  └─ 4. Verify   success iff <dir>/<stem>.pdf exists
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use edgequake_office2pdf::{Converter, ConverterConfig, ConversionRequest};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let converter = Converter::new(ConverterConfig::default());
//!     let request = ConversionRequest::new("report.xlsx", "out", true);
//!     let output = converter.convert(&request).await?;
//!     println!("{}", output.pdf_path.display());
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `office2pdf` binary (clap + anyhow + tracing-subscriber) |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod convert;
pub mod engine;
pub mod error;
pub mod output;
pub mod request;
pub mod server;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{ConverterConfig, ConverterConfigBuilder, HelperCommand, ServerConfig};
pub use convert::{convert_sync, Converter};
pub use engine::{CandidateList, CommandResolver, ExportFilter, ResolvedCommand};
pub use error::ConversionError;
pub use output::{ConversionOutput, ConversionResult, ConvertedPdf};
pub use request::{ConversionRequest, DocumentKind};
