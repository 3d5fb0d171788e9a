//! Conversion entry points.
//!
//! A [`Converter`] makes exactly one engine call per request and judges the
//! result by whether the expected PDF exists afterwards. The engine's exit
//! code is logged but never trusted on its own: it has been seen to exit
//! non-zero after writing a valid PDF, and zero after writing nothing.

use crate::config::ConverterConfig;
use crate::engine::{CommandResolver, CommandRunner, Invocation, ResolvedCommand, RunError, SystemRunner};
use crate::error::ConversionError;
use crate::output::{ConversionOutput, ConversionResult, ConvertedPdf};
use crate::request::ConversionRequest;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// Runs conversions against a shared [`CommandResolver`].
///
/// Cheap to share behind an `Arc`; holds no per-request state.
pub struct Converter {
    config: ConverterConfig,
    resolver: Arc<CommandResolver>,
    runner: Arc<dyn CommandRunner>,
}

impl std::fmt::Debug for Converter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Converter")
            .field("config", &self.config)
            .field("resolver", &self.resolver)
            .field("runner", &"<dyn CommandRunner>")
            .finish()
    }
}

impl Converter {
    /// Converter with its own resolver, running real processes.
    pub fn new(config: ConverterConfig) -> Self {
        let runner: Arc<dyn CommandRunner> = Arc::new(SystemRunner);
        let resolver = Arc::new(CommandResolver::with_runner(&config, Arc::clone(&runner)));
        Self::with_parts(config, resolver, runner)
    }

    /// Converter sharing an existing resolver and runner.
    pub fn with_parts(
        config: ConverterConfig,
        resolver: Arc<CommandResolver>,
        runner: Arc<dyn CommandRunner>,
    ) -> Self {
        Self {
            config,
            resolver,
            runner,
        }
    }

    pub fn config(&self) -> &ConverterConfig {
        &self.config
    }

    pub fn resolver(&self) -> &Arc<CommandResolver> {
        &self.resolver
    }

    /// Convert `source` into the configured default output directory.
    pub async fn convert_file(&self, source: impl AsRef<Path>, single_page: bool) -> ConversionResult {
        let request = ConversionRequest::new(
            source.as_ref(),
            self.config.output_dir.clone(),
            single_page,
        );
        self.convert(&request).await
    }

    /// Run one conversion.
    ///
    /// # Returns
    /// `Ok(ConversionOutput)` when `output_dir/<source stem>.pdf` exists
    /// after the engine returns, whatever its exit code.
    ///
    /// # Errors
    /// - [`ConversionError::SourceNotFound`] / [`ConversionError::Io`]: source
    ///   unreadable, output directory not creatable, stale PDF not removable
    /// - [`ConversionError::EngineNotFound`]: nothing resolved; no process is run
    /// - [`ConversionError::ExecutionFailure`] / [`ConversionError::Timeout`]
    /// - [`ConversionError::ArtifactMissing`]: carries the engine's stderr
    pub async fn convert(&self, request: &ConversionRequest) -> ConversionResult {
        let result = self.convert_inner(request).await;
        if let Err(ref e) = result {
            error!(
                kind = e.kind(),
                "Error converting {} to PDF: {}",
                request.source.display(),
                e
            );
        }
        result
    }

    async fn convert_inner(&self, request: &ConversionRequest) -> ConversionResult {
        let started = Instant::now();
        info!("Starting conversion: {}", request.source.display());

        // ── Step 1: Paths ────────────────────────────────────────────────
        let pdf_path = request
            .expected_output()
            .ok_or_else(|| ConversionError::SourceNotFound {
                path: request.source.clone(),
            })?;
        check_source(&request.source).await?;

        tokio::fs::create_dir_all(&request.output_dir)
            .await
            .map_err(|e| {
                ConversionError::io(
                    format!(
                        "Failed to create output directory '{}'",
                        request.output_dir.display()
                    ),
                    e,
                )
            })?;

        // ── Step 2: Engine ───────────────────────────────────────────────
        let command = match self.resolver.resolve().await {
            ResolvedCommand::Found { command, .. } => command,
            ResolvedCommand::NotFound => return Err(ConversionError::EngineNotFound),
        };

        // ── Step 3: Run ──────────────────────────────────────────────────
        // Only clear a previous PDF once the engine is certain to run.
        if self.config.clear_stale_output {
            remove_stale(&pdf_path).await?;
        }

        let invocation = build_invocation(&command, request);
        debug!("Command: {}", invocation);

        let output = self
            .runner
            .run(&invocation, self.config.convert_timeout)
            .await
            .map_err(|e| match e {
                RunError::TimedOut(bound) => ConversionError::Timeout {
                    command: command.clone(),
                    timeout: bound,
                },
                other => ConversionError::ExecutionFailure {
                    command: command.clone(),
                    reason: other.to_string(),
                },
            })?;

        debug!("STDOUT: {}", output.stdout.trim_end());
        debug!("STDERR: {}", output.stderr.trim_end());

        // ── Step 4: Verify artifact ──────────────────────────────────────
        if !is_file(&pdf_path).await {
            return Err(ConversionError::ArtifactMissing {
                path: pdf_path,
                exit_code: output.exit_code,
                stderr: output.stderr.trim().to_string(),
            });
        }
        if !output.success() {
            warn!(
                "Engine exited with {:?} but produced {}",
                output.exit_code,
                pdf_path.display()
            );
        }

        let duration_ms = started.elapsed().as_millis() as u64;
        info!("Converted to {} in {}ms", pdf_path.display(), duration_ms);

        Ok(ConversionOutput {
            pdf_path,
            command,
            exit_code: output.exit_code,
            stdout: output.stdout,
            stderr: output.stderr,
            duration_ms,
        })
    }

    /// Convert an in-memory document.
    ///
    /// `file_name` supplies the extension the engine uses to pick an import
    /// filter and the stem of the returned download name; any directory part
    /// is ignored. The bytes live in a scoped [`tempfile::TempDir`] that is
    /// removed on return.
    pub async fn convert_bytes(
        &self,
        file_name: &str,
        bytes: &[u8],
        single_page: bool,
    ) -> Result<ConvertedPdf, ConversionError> {
        let safe_name = sanitize_file_name(file_name);

        let scratch = tempfile::Builder::new()
            .prefix("office2pdf-")
            .tempdir()
            .map_err(|e| ConversionError::io("Failed to create temp directory", e))?;
        let input_dir = scratch.path().join("in");
        let output_dir = scratch.path().join("out");
        tokio::fs::create_dir_all(&input_dir)
            .await
            .map_err(|e| ConversionError::io("Failed to create temp directory", e))?;

        let source = input_dir.join(&safe_name);
        tokio::fs::write(&source, bytes)
            .await
            .map_err(|e| ConversionError::io("Failed to write uploaded file", e))?;

        let request = ConversionRequest::new(&source, &output_dir, single_page);
        let output = self.convert(&request).await?;

        let pdf = tokio::fs::read(&output.pdf_path).await.map_err(|e| {
            ConversionError::io(
                format!("Failed to read '{}'", output.pdf_path.display()),
                e,
            )
        })?;

        let file_name = output
            .pdf_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "document.pdf".to_string());

        // `scratch` is dropped (and the directory deleted) here.
        Ok(ConvertedPdf {
            file_name,
            bytes: pdf,
        })
    }
}

/// Synchronous wrapper around [`Converter::convert`].
///
/// Creates a temporary tokio runtime internally.
pub fn convert_sync(converter: &Converter, request: &ConversionRequest) -> ConversionResult {
    tokio::runtime::Runtime::new()
        .map_err(|e| ConversionError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(converter.convert(request))
}

// ── Internal helpers ─────────────────────────────────────────────────────

/// `<cmd> --convert-to <filter> --outdir <dir> <source>`
fn build_invocation(command: &str, request: &ConversionRequest) -> Invocation {
    Invocation::new(command)
        .arg("--convert-to")
        .arg(request.filter.to_arg())
        .arg("--outdir")
        .arg(request.output_dir.as_os_str())
        .arg(request.source.as_os_str())
}

async fn check_source(path: &Path) -> Result<(), ConversionError> {
    match tokio::fs::File::open(path).await {
        Ok(file) => {
            let meta = file
                .metadata()
                .await
                .map_err(|e| ConversionError::io(format!("Failed to stat '{}'", path.display()), e))?;
            if meta.is_file() {
                Ok(())
            } else {
                Err(ConversionError::SourceNotFound {
                    path: path.to_path_buf(),
                })
            }
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(ConversionError::SourceNotFound {
            path: path.to_path_buf(),
        }),
        Err(e) => Err(ConversionError::io(
            format!("Failed to open '{}'", path.display()),
            e,
        )),
    }
}

async fn remove_stale(pdf_path: &Path) -> Result<(), ConversionError> {
    match tokio::fs::remove_file(pdf_path).await {
        Ok(()) => {
            debug!("Removed stale output {}", pdf_path.display());
            Ok(())
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(ConversionError::io(
            format!("Failed to remove stale output '{}'", pdf_path.display()),
            e,
        )),
    }
}

async fn is_file(path: &Path) -> bool {
    tokio::fs::metadata(path)
        .await
        .map(|m| m.is_file())
        .unwrap_or(false)
}

/// Last path component of an uploaded name, or `upload` when there is none.
fn sanitize_file_name(name: &str) -> PathBuf {
    let base = name.rsplit(['/', '\\']).next().unwrap_or_default().trim();
    if base.is_empty() || base == "." || base == ".." {
        PathBuf::from("upload")
    } else {
        PathBuf::from(base)
    }
}
