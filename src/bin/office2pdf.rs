//! CLI binary for edgequake-office2pdf.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `ConverterConfig` / `ServerConfig` and prints results.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use edgequake_office2pdf::{
    engine::ProbeSource, server, ConversionRequest, Converter, ConverterConfig, HelperCommand,
    ResolvedCommand, ServerConfig,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Run the upload service on port 8000
  office2pdf serve

  # Convert one spreadsheet, one page per sheet
  office2pdf convert --single-page report.xlsx -o out/

  # Show which engine command would be used
  office2pdf detect

  # Show every probe attempt
  office2pdf detect --all

  # Machine-readable detection result
  office2pdf detect --json

ENGINE DETECTION:
  1. The detection helper (default: soffice-locate) is run; if it prints a
     command and exits 0, that command is used.
  2. Otherwise each candidate is run with --version, in order:
       libreoffice-generic, libreoffice25.2 … libreoffice6.0, libreoffice, soffice
     The first one that exits 0 and prints "LibreOffice" wins.
  The result is cached for the life of the process.

ENVIRONMENT VARIABLES:
  OFFICE2PDF_BIND              Listen address for `serve`
  OFFICE2PDF_HELPER            Detection helper program
  OFFICE2PDF_PROBE_TIMEOUT     Seconds per detection probe
  OFFICE2PDF_CONVERT_TIMEOUT   Seconds per conversion (0 = no limit)
  SOFFICE_PATH                 Engine path reported by soffice-locate
  RUST_LOG                     Log filter (overrides -v / -q)
"#;

/// Convert office documents to PDF with LibreOffice.
#[derive(Parser, Debug)]
#[command(
    name = "office2pdf",
    version,
    about = "Convert office documents to PDF with LibreOffice",
    long_about = "Convert spreadsheets, word-processing files, presentations and plain text to \
PDF by driving an installed LibreOffice engine. Runs as a one-shot CLI or as an HTTP upload service.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    #[command(flatten)]
    engine: EngineArgs,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true, env = "OFFICE2PDF_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, global = true, env = "OFFICE2PDF_QUIET")]
    quiet: bool,
}

#[derive(Args, Debug)]
struct EngineArgs {
    /// Seconds allowed for each detection probe.
    #[arg(long, global = true, env = "OFFICE2PDF_PROBE_TIMEOUT", default_value_t = 10)]
    probe_timeout: u64,

    /// Seconds allowed for one conversion; 0 disables the limit.
    #[arg(long, global = true, env = "OFFICE2PDF_CONVERT_TIMEOUT", default_value_t = 300)]
    convert_timeout: u64,

    /// Detection helper program.
    #[arg(long, global = true, env = "OFFICE2PDF_HELPER", default_value = "soffice-locate")]
    helper: String,

    /// Skip the detection helper and probe candidates directly.
    #[arg(long, global = true)]
    no_helper: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP upload service.
    Serve {
        /// Listen address.
        #[arg(long, env = "OFFICE2PDF_BIND", default_value = "0.0.0.0:8000")]
        bind: SocketAddr,

        /// Largest accepted upload in bytes.
        #[arg(long, env = "OFFICE2PDF_MAX_UPLOAD_BYTES", default_value_t = 50 * 1024 * 1024)]
        max_upload_bytes: usize,
    },

    /// Convert a single file.
    Convert {
        /// Source document.
        input: PathBuf,

        /// Directory for the PDF (default: next to the input).
        #[arg(short, long, env = "OFFICE2PDF_OUTPUT_DIR")]
        output_dir: Option<PathBuf>,

        /// Fit each spreadsheet sheet onto one page.
        #[arg(long)]
        single_page: bool,
    },

    /// Print the engine command that conversions would use.
    Detect {
        /// Probe the helper and every candidate and print each attempt.
        #[arg(long)]
        all: bool,

        /// Print the result as JSON.
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let config = build_config(&cli.engine)?;
    let converter = Arc::new(Converter::new(config));

    match cli.command {
        Command::Serve {
            bind,
            max_upload_bytes,
        } => {
            let server_config = ServerConfig {
                bind,
                max_upload_bytes,
            };
            server::serve(converter, server_config)
                .await
                .context("HTTP server failed")?;
        }
        Command::Convert {
            input,
            output_dir,
            single_page,
        } => run_convert(&converter, input, output_dir, single_page, cli.quiet).await?,
        Command::Detect { all, json } => run_detect(&converter, all, json).await?,
    }

    Ok(())
}

/// Map CLI args to `ConverterConfig`.
fn build_config(args: &EngineArgs) -> Result<ConverterConfig> {
    let mut builder = ConverterConfig::builder()
        .probe_timeout(Duration::from_secs(args.probe_timeout))
        .convert_timeout((args.convert_timeout > 0).then(|| Duration::from_secs(args.convert_timeout)));

    builder = if args.no_helper {
        builder.no_helper()
    } else {
        builder.helper(HelperCommand::new(&args.helper))
    };

    builder.build().context("Invalid configuration")
}

async fn run_convert(
    converter: &Converter,
    input: PathBuf,
    output_dir: Option<PathBuf>,
    single_page: bool,
    quiet: bool,
) -> Result<()> {
    let output_dir = output_dir.unwrap_or_else(|| {
        input
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."))
    });
    let request = ConversionRequest::new(&input, &output_dir, single_page);

    let spinner = (!quiet).then(|| {
        let bar = ProgressBar::new_spinner();
        bar.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}  {elapsed:.dim}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]),
        );
        bar.set_prefix("Converting");
        bar.set_message(input.display().to_string());
        bar.enable_steady_tick(Duration::from_millis(80));
        bar
    });

    let result = converter.convert(&request).await;
    if let Some(bar) = spinner {
        bar.finish_and_clear();
    }

    let output = result.context("Conversion failed")?;

    if !quiet {
        eprintln!(
            "{}  {}ms  →  {}",
            green("✔"),
            output.duration_ms,
            bold(&output.pdf_path.display().to_string()),
        );
    }
    println!("{}", output.pdf_path.display());
    Ok(())
}

async fn run_detect(converter: &Converter, all: bool, json: bool) -> Result<()> {
    if all {
        let attempts = converter.resolver().diagnose().await;
        if json {
            println!("{}", serde_json::to_string_pretty(&attempts)?);
        } else {
            for attempt in &attempts {
                let source = match attempt.source {
                    ProbeSource::Helper => "helper",
                    ProbeSource::Candidate => "candidate",
                };
                println!(
                    "  {} {:<9} {:<24} {}",
                    if attempt.accepted { green("✓") } else { red("✗") },
                    source,
                    attempt.command,
                    dim(attempt.detail.as_deref().unwrap_or("")),
                );
            }
        }
        if !attempts.iter().any(|a| a.accepted) {
            anyhow::bail!("No working LibreOffice command found");
        }
        return Ok(());
    }

    let resolved = converter.resolver().resolve().await;
    if json {
        println!("{}", serde_json::to_string_pretty(&resolved)?);
        anyhow::ensure!(resolved.is_found(), "No working LibreOffice command found");
        return Ok(());
    }

    match resolved {
        ResolvedCommand::Found { command, version } => {
            match version {
                Some(v) => println!("{command} {}", dim(&v)),
                None => println!("{command}"),
            }
            Ok(())
        }
        ResolvedCommand::NotFound => anyhow::bail!("No working LibreOffice command found"),
    }
}
