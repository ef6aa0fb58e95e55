//! crates/fiche_core/src/export.rs
//!
//! The three exporters: a print-ready HTML page, a PDF through the
//! `PdfRenderer` port, and an HTML document a word processor opens as `.doc`.
//! Each one is a single attempt over the rendered preview; nothing is retried.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use tracing::{error, info};

use crate::domain::Sheet;
use crate::ports::{PdfOptions, PdfRenderer, PortError};
use crate::render::{render_preview, standalone_document};

pub const WORD_MIME: &str = "application/msword";
pub const PDF_MIME: &str = "application/pdf";
pub const HTML_MIME: &str = "text/html; charset=utf-8";

const WORD_CSS: &str = "@page WordSection1 { size: 21cm 29.7cm; margin: 1cm 1cm 1cm 1cm; } \
div.WordSection1 { page: WordSection1; } \
body { font-family: Arial, 'Times New Roman', sans-serif; font-size: 11pt; } \
table { border-collapse: collapse; width: 100%; border: 1px solid black; } \
th, td { border: 1px solid black; padding: 6px; vertical-align: top; } \
th { background: #f0f0f0; } \
.titre { text-align: center; font-size: 15pt; font-weight: bold; }";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportKind {
    Print,
    Pdf,
    Word,
}

impl ExportKind {
    /// How long to let the preview lay out after switching into it.
    pub fn settle_delay(self) -> Duration {
        match self {
            ExportKind::Print => Duration::from_millis(500),
            ExportKind::Pdf => Duration::from_millis(800),
            ExportKind::Word => Duration::ZERO,
        }
    }
}

impl fmt::Display for ExportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ExportKind::Print => "print",
            ExportKind::Pdf => "pdf",
            ExportKind::Word => "word",
        })
    }
}

impl FromStr for ExportKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "print" => Ok(ExportKind::Print),
            "pdf" => Ok(ExportKind::Pdf),
            "word" | "doc" => Ok(ExportKind::Word),
            other => Err(format!("unknown export format '{}'", other)),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("The PDF renderer is not available: {0}")]
    RendererUnavailable(String),
    #[error("PDF rendering failed: {0}")]
    RenderFailed(String),
    #[error("The PDF renderer produced no document")]
    EmptyOutput,
}

impl ExportError {
    pub fn user_message(&self) -> &'static str {
        "Échec de l'export. Utilisez l'impression PDF."
    }
}

/// A downloadable export.
#[derive(Debug, Clone)]
pub struct ExportArtifact {
    pub filename: String,
    pub content_type: &'static str,
    pub body: Bytes,
}

//=========================================================================================
// File Names
//=========================================================================================

/// Replaces characters that would split or break a file name.
fn file_safe(title: &str) -> String {
    title
        .trim()
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '-',
            _ => c,
        })
        .collect()
}

/// `CEB_SENEGAL_<grade>_<title>.pdf`, whitespace runs collapsed to `_`.
pub fn pdf_filename(sheet: &Sheet) -> String {
    let title = file_safe(&sheet.title)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_");
    format!("CEB_SENEGAL_{}_{}.pdf", sheet.grade_level, title)
}

pub fn word_filename(sheet: &Sheet) -> String {
    format!("CEB_{}.doc", file_safe(&sheet.title))
}

pub fn print_filename(sheet: &Sheet) -> String {
    format!("CEB_{}.html", file_safe(&sheet.title))
}

//=========================================================================================
// Exporters
//=========================================================================================

/// A standalone page that opens the print dialog once it has loaded.
pub fn print_document(sheet: &Sheet) -> ExportArtifact {
    let html = standalone_document(
        sheet,
        "<script>window.addEventListener('load', function () { window.print(); });</script>",
    );
    ExportArtifact {
        filename: print_filename(sheet),
        content_type: HTML_MIME,
        body: Bytes::from(html),
    }
}

/// Word-processor export: the preview markup inside an Office-flavoured HTML
/// document, prefixed with a UTF-8 byte order mark.
pub fn word_document(sheet: &Sheet) -> ExportArtifact {
    let html = format!(
        "\u{feff}<html xmlns:o='urn:schemas-microsoft-com:office:office' \
         xmlns:w='urn:schemas-microsoft-com:office:word' \
         xmlns='http://www.w3.org/TR/REC-html40'>\
         <head><meta charset='utf-8'><title>{}</title>\
         <!--[if gte mso 9]><xml><w:WordDocument><w:View>Print</w:View>\
         <w:Zoom>100</w:Zoom></w:WordDocument></xml><![endif]-->\
         <style>{}</style></head>\
         <body><div class='WordSection1'>{}</div></body></html>",
        crate::render::escape(&sheet.title),
        WORD_CSS,
        render_preview(sheet)
    );
    ExportArtifact {
        filename: word_filename(sheet),
        content_type: WORD_MIME,
        body: Bytes::from(html),
    }
}

/// Renders the preview to PDF. The bytes only ever live in memory, so a
/// failure leaves nothing behind.
pub async fn pdf_document(
    renderer: &dyn PdfRenderer,
    sheet: &Sheet,
) -> Result<ExportArtifact, ExportError> {
    let options = PdfOptions::default();
    let html = standalone_document(sheet, "");

    let bytes = renderer.render_pdf(&html, &options).await.map_err(|e| {
        error!("PDF export of sheet {} failed: {:?}", sheet.id, e);
        match e {
            PortError::Unavailable(msg) | PortError::NotFound(msg) => {
                ExportError::RendererUnavailable(msg)
            }
            other => ExportError::RenderFailed(other.to_string()),
        }
    })?;

    if bytes.is_empty() {
        return Err(ExportError::EmptyOutput);
    }
    if !bytes.starts_with(b"%PDF") {
        return Err(ExportError::RenderFailed(
            "the renderer output is not a PDF document".to_string(),
        ));
    }

    info!("Exported sheet {} as PDF ({} bytes).", sheet.id, bytes.len());
    Ok(ExportArtifact {
        filename: pdf_filename(sheet),
        content_type: PDF_MIME,
        body: Bytes::from(bytes),
    })
}

/// Runs the exporter for `kind`.
pub async fn export_sheet(
    kind: ExportKind,
    sheet: &Sheet,
    renderer: &dyn PdfRenderer,
) -> Result<ExportArtifact, ExportError> {
    match kind {
        ExportKind::Print => Ok(print_document(sheet)),
        ExportKind::Word => Ok(word_document(sheet)),
        ExportKind::Pdf => pdf_document(renderer, sheet).await,
    }
}
