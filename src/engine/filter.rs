//! Export-filter descriptor for `--convert-to`.
//!
//! The engine takes a single string of the form
//! `pdf[:<FilterName>[:<json options>]]`. It is kept as the typed
//! [`ExportFilter`] everywhere inside the crate and only rendered with
//! [`ExportFilter::to_arg`] when the invocation is built.

use crate::request::DocumentKind;
use serde::Serialize;
use std::fmt;

/// The engine's per-application PDF export filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PdfFilter {
    /// Spreadsheets (Calc).
    Calc,
    /// Text documents (Writer).
    Writer,
    /// Presentations (Impress).
    Impress,
    /// Let the engine choose from the document it loaded.
    #[default]
    Auto,
}

impl PdfFilter {
    pub fn for_kind(kind: DocumentKind) -> Self {
        match kind {
            DocumentKind::Spreadsheet => Self::Calc,
            DocumentKind::Text => Self::Writer,
            DocumentKind::Presentation => Self::Impress,
            DocumentKind::Other => Self::Auto,
        }
    }

    /// Engine filter name, `None` for [`PdfFilter::Auto`].
    pub fn name(self) -> Option<&'static str> {
        match self {
            Self::Calc => Some("calc_pdf_Export"),
            Self::Writer => Some("writer_pdf_Export"),
            Self::Impress => Some("impress_pdf_Export"),
            Self::Auto => None,
        }
    }
}

/// Format-specific options passed inside the descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FilterOptions {
    /// Fit each spreadsheet sheet onto a single printed page.
    pub single_page_sheets: bool,
}

impl FilterOptions {
    pub fn is_empty(&self) -> bool {
        !self.single_page_sheets
    }
}

/// Typed `--convert-to` descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ExportFilter {
    pub filter: PdfFilter,
    pub options: FilterOptions,
}

impl ExportFilter {
    /// Descriptor for a source of the given kind.
    ///
    /// Options can only be attached to a named filter. An unrecognised
    /// source gets the bare `pdf` format and no options, since forcing one
    /// application's filter onto it leaves the engine with no exporter.
    pub fn for_source(kind: DocumentKind, single_page: bool) -> Self {
        let filter = PdfFilter::for_kind(kind);
        let options = FilterOptions {
            single_page_sheets: single_page && filter != PdfFilter::Auto,
        };
        Self { filter, options }
    }

    /// Render the descriptor in the engine's syntax.
    pub fn to_arg(&self) -> String {
        let mut arg = String::from("pdf");
        let Some(name) = self.filter.name() else {
            return arg;
        };
        arg.push(':');
        arg.push_str(name);
        if !self.options.is_empty() {
            arg.push(':');
            arg.push_str(&FilterData::from(&self.options).to_json());
        }
        arg
    }
}

impl fmt::Display for ExportFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_arg())
    }
}

// ── Engine JSON filter-data syntax ───────────────────────────────────────

/// `{"type": "...", "value": "..."}` property as the engine expects it.
#[derive(Serialize)]
struct TypedValue {
    #[serde(rename = "type")]
    kind: &'static str,
    value: String,
}

impl TypedValue {
    fn boolean(v: bool) -> Self {
        Self {
            kind: "boolean",
            value: v.to_string(),
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct FilterData {
    #[serde(skip_serializing_if = "Option::is_none")]
    single_page_sheets: Option<TypedValue>,
}

impl FilterData {
    fn to_json(&self) -> String {
        // Serialising a struct of strings cannot fail.
        serde_json::to_string(self).unwrap_or_default()
    }
}

impl From<&FilterOptions> for FilterData {
    fn from(opts: &FilterOptions) -> Self {
        Self {
            single_page_sheets: opts
                .single_page_sheets
                .then(|| TypedValue::boolean(true)),
        }
    }
}
