//! End-to-end integration tests for edgequake-office2pdf.
//!
//! These tests drive a real LibreOffice installation. They are gated behind
//! the `E2E_ENABLED` environment variable so they do not run in CI unless
//! explicitly requested.
//!
//! Run with:
//!   E2E_ENABLED=1 cargo test --test e2e -- --nocapture
//!
//! Point at a specific engine with `SOFFICE_PATH=/path/to/soffice` and a
//! helper on `PATH` (`cargo install --path crates/soffice-locate`).

use edgequake_office2pdf::{
    ConversionError, ConversionRequest, Converter, ConverterConfig, ResolvedCommand,
};
use std::path::Path;
use tempfile::TempDir;

// ── Test helpers ─────────────────────────────────────────────────────────────

/// Skip unless E2E_ENABLED is set *and* an engine resolves.
macro_rules! e2e_converter {
    () => {{
        if std::env::var("E2E_ENABLED").is_err() {
            println!("SKIP: set E2E_ENABLED=1 to run e2e tests");
            return;
        }
        let converter = Converter::new(ConverterConfig::default());
        if let ResolvedCommand::NotFound = converter.resolver().resolve().await {
            println!("SKIP: no LibreOffice engine found");
            return;
        }
        converter
    }};
}

fn write_csv(dir: &Path, name: &str) -> std::path::PathBuf {
    let path = dir.join(name);
    let mut body = String::from("region,q1,q2,q3,q4\n");
    for i in 0..200 {
        body.push_str(&format!("r{i},{},{},{},{}\n", i, i * 2, i * 3, i * 4));
    }
    std::fs::write(&path, body).unwrap();
    path
}

fn assert_pdf(path: &Path) {
    let bytes = std::fs::read(path).unwrap();
    assert!(
        bytes.starts_with(b"%PDF"),
        "{} is not a PDF (first bytes: {:?})",
        path.display(),
        &bytes[..bytes.len().min(8)]
    );
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_detect_reports_version() {
    let converter = e2e_converter!();
    let resolved = converter.resolver().resolve().await;
    println!("engine: {resolved:?}");
    assert!(resolved.is_found());
}

#[tokio::test]
async fn test_convert_csv_default() {
    let converter = e2e_converter!();
    let dir = TempDir::new().unwrap();
    let source = write_csv(dir.path(), "data.csv");

    let output = converter
        .convert(&ConversionRequest::new(&source, dir.path().join("out"), false))
        .await
        .unwrap();

    assert_eq!(output.pdf_path, dir.path().join("out/data.pdf"));
    assert_pdf(&output.pdf_path);
    println!("converted in {}ms", output.duration_ms);
}

#[tokio::test]
async fn test_convert_csv_single_page() {
    let converter = e2e_converter!();
    let dir = TempDir::new().unwrap();
    let source = write_csv(dir.path(), "sheet.csv");

    let output = converter
        .convert(&ConversionRequest::new(&source, dir.path(), true))
        .await
        .unwrap();

    assert_pdf(&output.pdf_path);
}

#[tokio::test]
async fn test_convert_text_file() {
    let converter = e2e_converter!();
    let dir = TempDir::new().unwrap();
    let source = dir.path().join("notes.txt");
    std::fs::write(&source, "Plain text converts through Writer.\n").unwrap();

    let pdf = converter
        .convert_bytes("notes.txt", &std::fs::read(&source).unwrap(), false)
        .await
        .unwrap();

    assert_eq!(pdf.file_name, "notes.pdf");
    assert!(pdf.bytes.starts_with(b"%PDF"));
}

#[tokio::test]
async fn test_missing_source_is_reported() {
    let converter = e2e_converter!();
    let dir = TempDir::new().unwrap();

    let err = converter
        .convert(&ConversionRequest::new(
            dir.path().join("nope.xlsx"),
            dir.path(),
            false,
        ))
        .await
        .unwrap_err();

    assert!(matches!(err, ConversionError::SourceNotFound { .. }));
}
