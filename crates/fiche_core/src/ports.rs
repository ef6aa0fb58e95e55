//! crates/fiche_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the core
//! to be independent of the storage medium, the AI provider, and the PDF renderer.

use async_trait::async_trait;
use serde_json::Value;

use crate::domain::Sheet;

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (e.g., file system, network).
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("Item already exists: {0}")]
    AlreadyExists(String),
    #[error("Stored data is corrupt: {0}")]
    Corrupt(String),
    #[error("Service unavailable: {0}")]
    Unavailable(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Port Payloads
//=========================================================================================

/// Everything sent to the completion service for one call.
#[derive(Debug, Clone)]
pub struct CompletionPrompt {
    pub system_instruction: String,
    pub user_prompt: String,
    /// Name under which the response schema is registered with the provider.
    pub schema_name: &'static str,
    /// JSON Schema the response must follow.
    pub response_schema: Value,
}

/// Page layout handed to the PDF renderer.
#[derive(Debug, Clone, PartialEq)]
pub struct PdfOptions {
    pub page_format: &'static str,
    pub portrait: bool,
    /// Top, right, bottom, left, in millimetres.
    pub margins_mm: [f32; 4],
    pub image_quality: f32,
    pub scale: f32,
}

impl Default for PdfOptions {
    fn default() -> Self {
        Self {
            page_format: "A4",
            portrait: true,
            margins_mm: [0.0; 4],
            image_quality: 1.0,
            scale: 2.0,
        }
    }
}

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

/// Durable storage of the whole sheet collection as a single unit.
#[async_trait]
pub trait SheetRepository: Send + Sync {
    /// Reads every stored sheet, in stored order.
    async fn load_all(&self) -> PortResult<Vec<Sheet>>;

    /// Replaces the stored collection with `sheets`.
    async fn save_all(&self, sheets: &[Sheet]) -> PortResult<()>;
}

#[async_trait]
pub trait CompletionService: Send + Sync {
    /// Sends one prompt and returns the raw response text (possibly empty).
    async fn complete(&self, prompt: &CompletionPrompt) -> PortResult<String>;
}

#[async_trait]
pub trait PdfRenderer: Send + Sync {
    /// Renders a complete HTML document into PDF bytes.
    async fn render_pdf(&self, html: &str, options: &PdfOptions) -> PortResult<Vec<u8>>;
}
