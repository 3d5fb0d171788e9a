//! Everything that talks to the external conversion engine.
//!
//! ```text
//! resolver ──▶ runner ◀── convert
//! (which cmd?)  (spawn)    (--convert-to <filter>)
//! ```
//!
//! 1. [`runner`]: spawn a process with a bounded wait; the only place
//!    that touches `tokio::process`
//! 2. [`resolver`]: find and cache a working engine command
//! 3. [`filter`]: typed `--convert-to` descriptor

pub mod filter;
pub mod resolver;
pub mod runner;

pub use filter::{ExportFilter, FilterOptions, PdfFilter};
pub use resolver::{
    CandidateList, CommandResolver, ProbeAttempt, ProbeFailure, ProbeSource, ResolvedCommand,
    DEFAULT_CANDIDATES,
};
pub use runner::{CommandOutput, CommandRunner, Invocation, RunError, SystemRunner};
