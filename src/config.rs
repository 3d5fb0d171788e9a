//! Configuration types for engine resolution, conversion and the HTTP service.
//!
//! All converter behaviour is controlled through [`ConverterConfig`], built
//! via its [`ConverterConfigBuilder`]. The HTTP listener has its own small
//! [`ServerConfig`].

use crate::engine::{CandidateList, Invocation};
use crate::error::ConversionError;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// Substring a `--version` banner must contain for a candidate to be accepted.
pub const DEFAULT_PRODUCT_MARKER: &str = "LibreOffice";

/// Program name of the bundled detection helper.
pub const DEFAULT_HELPER_PROGRAM: &str = "soffice-locate";

/// An external detection helper: prints a working engine command on stdout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HelperCommand {
    pub program: String,
    pub args: Vec<String>,
}

impl HelperCommand {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn invocation(&self) -> Invocation {
        Invocation::new(&self.program).args(&self.args)
    }
}

impl Default for HelperCommand {
    fn default() -> Self {
        Self::new(DEFAULT_HELPER_PROGRAM)
    }
}

/// Configuration for resolving the engine and running conversions.
///
/// # Example
/// ```rust
/// use edgequake_office2pdf::ConverterConfig;
/// use std::time::Duration;
///
/// let config = ConverterConfig::builder()
///     .probe_timeout(Duration::from_secs(5))
///     .convert_timeout(Some(Duration::from_secs(60)))
///     .no_helper()
///     .build()
///     .unwrap();
/// ```
#[derive(Debug, Clone)]
pub struct ConverterConfig {
    /// Bound on each detection call (helper and every `--version` probe). Default: 10 s.
    pub probe_timeout: Duration,

    /// Bound on the conversion call itself. Default: 300 s. `None` waits forever.
    ///
    /// A hung document would otherwise pin a request worker indefinitely.
    pub convert_timeout: Option<Duration>,

    /// Fast-path detection helper. `None` goes straight to the candidate list.
    pub helper: Option<HelperCommand>,

    /// Commands probed in order when the helper is unavailable.
    pub candidates: CandidateList,

    /// Product name the `--version` output must contain. Default: `LibreOffice`.
    pub product_marker: String,

    /// Default directory for produced PDFs when the caller does not pick one.
    pub output_dir: PathBuf,

    /// Remove an existing PDF at the expected path before running. Default: true.
    ///
    /// Success is judged by the artifact existing afterwards, so a leftover
    /// from an earlier run would otherwise read as success.
    pub clear_stale_output: bool,
}

impl Default for ConverterConfig {
    fn default() -> Self {
        Self {
            probe_timeout: Duration::from_secs(10),
            convert_timeout: Some(Duration::from_secs(300)),
            helper: Some(HelperCommand::default()),
            candidates: CandidateList::default(),
            product_marker: DEFAULT_PRODUCT_MARKER.to_string(),
            output_dir: std::env::temp_dir().join("office2pdf").join("pdf"),
            clear_stale_output: true,
        }
    }
}

impl ConverterConfig {
    /// Create a new builder for `ConverterConfig`.
    pub fn builder() -> ConverterConfigBuilder {
        ConverterConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`ConverterConfig`].
#[derive(Debug)]
pub struct ConverterConfigBuilder {
    config: ConverterConfig,
}

impl ConverterConfigBuilder {
    pub fn probe_timeout(mut self, timeout: Duration) -> Self {
        self.config.probe_timeout = timeout;
        self
    }

    pub fn convert_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.config.convert_timeout = timeout;
        self
    }

    pub fn helper(mut self, helper: HelperCommand) -> Self {
        self.config.helper = Some(helper);
        self
    }

    pub fn no_helper(mut self) -> Self {
        self.config.helper = None;
        self
    }

    pub fn candidates(mut self, candidates: CandidateList) -> Self {
        self.config.candidates = candidates;
        self
    }

    pub fn product_marker(mut self, marker: impl Into<String>) -> Self {
        self.config.product_marker = marker.into();
        self
    }

    pub fn output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.output_dir = dir.into();
        self
    }

    pub fn clear_stale_output(mut self, v: bool) -> Self {
        self.config.clear_stale_output = v;
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ConverterConfig, ConversionError> {
        let c = &self.config;
        if c.probe_timeout.is_zero() {
            return Err(ConversionError::InvalidConfig(
                "probe timeout must be greater than zero".into(),
            ));
        }
        if c.convert_timeout.is_some_and(|t| t.is_zero()) {
            return Err(ConversionError::InvalidConfig(
                "convert timeout must be greater than zero (omit it to disable)".into(),
            ));
        }
        if c.candidates.is_empty() {
            return Err(ConversionError::InvalidConfig(
                "candidate list must not be empty".into(),
            ));
        }
        if c.product_marker.trim().is_empty() {
            return Err(ConversionError::InvalidConfig(
                "product marker must not be empty".into(),
            ));
        }
        if c.helper.as_ref().is_some_and(|h| h.program.trim().is_empty()) {
            return Err(ConversionError::InvalidConfig(
                "helper program must not be empty".into(),
            ));
        }
        Ok(self.config)
    }
}

/// HTTP listener settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Listen address. Default: `0.0.0.0:8000`.
    pub bind: SocketAddr,
    /// Largest accepted request body in bytes. Default: 50 MiB.
    pub max_upload_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([0, 0, 0, 0], 8000)),
            max_upload_bytes: 50 * 1024 * 1024,
        }
    }
}
