//! Per-call conversion input.

use crate::engine::ExportFilter;
use std::path::{Path, PathBuf};

/// Broad family of a source document, used to pick the export filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Spreadsheet,
    Text,
    Presentation,
    Other,
}

impl DocumentKind {
    /// Classify by file extension (case-insensitive).
    pub fn from_path(path: &Path) -> Self {
        let ext = path
            .extension()
            .map(|e| e.to_string_lossy().to_ascii_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "xlsx" | "xls" | "xlsm" | "xlsb" | "xlt" | "xltx" | "xltm" | "ods" | "ots"
            | "fods" | "csv" | "tsv" => Self::Spreadsheet,
            "doc" | "docx" | "docm" | "dot" | "dotx" | "odt" | "ott" | "fodt" | "rtf" | "txt" => {
                Self::Text
            }
            "ppt" | "pptx" | "pps" | "ppsx" | "odp" | "otp" | "fodp" => Self::Presentation,
            _ => Self::Other,
        }
    }
}

/// A single conversion: which file, where the PDF goes, and how to export it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionRequest {
    pub source: PathBuf,
    pub output_dir: PathBuf,
    pub filter: ExportFilter,
}

impl ConversionRequest {
    pub fn new(source: impl Into<PathBuf>, output_dir: impl Into<PathBuf>, single_page: bool) -> Self {
        let source = source.into();
        let filter = ExportFilter::for_source(DocumentKind::from_path(&source), single_page);
        Self {
            source,
            output_dir: output_dir.into(),
            filter,
        }
    }

    /// `output_dir / <source stem>.pdf`, where the engine writes its result.
    ///
    /// `None` when the source path has no file name.
    pub fn expected_output(&self) -> Option<PathBuf> {
        let stem = self.source.file_stem()?;
        let mut name = stem.to_os_string();
        name.push(".pdf");
        Some(self.output_dir.join(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expected_output_uses_stem() {
        let req = ConversionRequest::new("/data/report.xlsx", "/out", false);
        assert_eq!(req.expected_output(), Some(PathBuf::from("/out/report.pdf")));
    }

    #[test]
    fn expected_output_keeps_inner_dots_and_spaces() {
        let req = ConversionRequest::new("/data/Q3 report.v2.docx", "/out", false);
        assert_eq!(
            req.expected_output(),
            Some(PathBuf::from("/out/Q3 report.v2.pdf"))
        );
    }

    #[test]
    fn expected_output_without_file_name() {
        let req = ConversionRequest::new("/", "/out", false);
        assert_eq!(req.expected_output(), None);
    }

    #[test]
    fn kind_from_extension() {
        assert_eq!(DocumentKind::from_path(Path::new("a.CSV")), DocumentKind::Spreadsheet);
        assert_eq!(DocumentKind::from_path(Path::new("a.docx")), DocumentKind::Text);
        assert_eq!(DocumentKind::from_path(Path::new("a.pptx")), DocumentKind::Presentation);
        assert_eq!(DocumentKind::from_path(Path::new("a")), DocumentKind::Other);
        assert_eq!(DocumentKind::from_path(Path::new("a.bin")), DocumentKind::Other);
    }

    #[test]
    fn spreadsheet_variants_keep_single_page() {
        for name in ["a.xlsb", "a.fods", "a.xltx", "a.ots"] {
            let req = ConversionRequest::new(name, "/out", true);
            assert_eq!(req.filter.filter, crate::engine::PdfFilter::Calc, "{name}");
            assert!(req.filter.options.single_page_sheets, "{name}");
        }
    }

    #[test]
    fn unrecognised_source_ignores_single_page() {
        for name in ["page.html", "drawing.odg"] {
            let req = ConversionRequest::new(name, "/out", true);
            assert_eq!(req.filter.to_arg(), "pdf", "{name}");
        }
    }

    #[test]
    fn request_builds_filter_from_kind() {
        let req = ConversionRequest::new("sheet.ods", "/out", true);
        assert!(req.filter.options.single_page_sheets);
        assert_eq!(req.filter.filter, crate::engine::PdfFilter::Calc);
    }
}
