//! services/api/src/adapters/pdf.rs
//!
//! This module contains the adapter for PDF rendering. It implements the
//! `PdfRenderer` port by piping HTML through an external command that follows the
//! `wkhtmltopdf` command line: HTML on stdin, PDF on stdout.

use async_trait::async_trait;
use fiche_core::ports::{PdfOptions, PdfRenderer, PortError, PortResult};
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, error};

/// CSS pixels per inch; the render scale multiplies it.
const BASE_DPI: f32 = 96.0;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A renderer that shells out to an HTML-to-PDF program.
#[derive(Clone, Debug)]
pub struct CommandPdfRenderer {
    program: String,
}

impl CommandPdfRenderer {
    /// Creates a new `CommandPdfRenderer` for the given program name or path.
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// The command-line arguments for one render.
    fn arguments(options: &PdfOptions) -> Vec<String> {
        let [top, right, bottom, left] = options.margins_mm;
        let orientation = if options.portrait {
            "Portrait"
        } else {
            "Landscape"
        };
        let quality = (options.image_quality.clamp(0.0, 1.0) * 100.0).round() as u32;
        let dpi = (BASE_DPI * options.scale).round() as u32;

        vec![
            "--quiet".to_string(),
            "--encoding".to_string(),
            "utf-8".to_string(),
            "--page-size".to_string(),
            options.page_format.to_string(),
            "--orientation".to_string(),
            orientation.to_string(),
            "--margin-top".to_string(),
            format!("{}mm", top),
            "--margin-right".to_string(),
            format!("{}mm", right),
            "--margin-bottom".to_string(),
            format!("{}mm", bottom),
            "--margin-left".to_string(),
            format!("{}mm", left),
            "--image-quality".to_string(),
            quality.to_string(),
            "--dpi".to_string(),
            dpi.to_string(),
            "-".to_string(),
            "-".to_string(),
        ]
    }
}

//=========================================================================================
// `PdfRenderer` Trait Implementation
//=========================================================================================

#[async_trait]
impl PdfRenderer for CommandPdfRenderer {
    async fn render_pdf(&self, html: &str, options: &PdfOptions) -> PortResult<Vec<u8>> {
        debug!("Rendering {} bytes of HTML with {}", html.len(), self.program);
        let mut child = Command::new(&self.program)
            .args(Self::arguments(options))
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| PortError::Unavailable(format!("{}: {}", self.program, e)))?;

        // Stdin is fed from its own task while stdout drains.
        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| PortError::Unexpected("Renderer stdin was not captured.".to_string()))?;
        let document = html.as_bytes().to_vec();
        let feeder = tokio::spawn(async move {
            stdin.write_all(&document).await?;
            stdin.shutdown().await
        });

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;
        feeder
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?
            .map_err(|e| PortError::Unexpected(format!("Writing to the renderer failed: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            error!("{} exited with {}: {}", self.program, output.status, stderr.trim());
            return Err(PortError::Unexpected(format!(
                "{} exited with {}",
                self.program, output.status
            )));
        }
        Ok(output.stdout)
    }
}
