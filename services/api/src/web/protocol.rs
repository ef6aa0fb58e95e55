//! services/api/src/web/protocol.rs
//!
//! Defines the JSON payloads exchanged between the browser client and the API
//! server. Core types travel in their own serialized shape (camelCase keys).

use fiche_core::render::render_preview;
use fiche_core::{
    Editor, EditorState, GenerationForm, SaveKind, SaveReceipt, Sheet, SheetId, ViewMode,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

//=========================================================================================
// Payloads Sent FROM the Client TO the Server
//=========================================================================================

/// Opens an editor, on a stored sheet when `sheetId` is given.
#[derive(Deserialize, Debug, Default, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OpenEditorRequest {
    #[serde(default)]
    #[schema(value_type = Option<String>)]
    pub sheet_id: Option<SheetId>,
}

/// Sets the view mode; toggles it when `mode` is absent.
#[derive(Deserialize, Debug, Default, ToSchema)]
pub struct ModeRequest {
    #[serde(default)]
    #[schema(value_type = Option<String>, example = "preview")]
    pub mode: Option<ViewMode>,
}

#[derive(Deserialize, Debug, Default)]
pub struct ListQuery {
    pub q: Option<String>,
}

#[derive(Deserialize, Debug, Default)]
pub struct DeleteQuery {
    #[serde(default)]
    pub confirm: bool,
}

//=========================================================================================
// Payloads Sent FROM the Server TO the Client
//=========================================================================================

/// The stored sheets, newest first.
#[derive(Serialize, Debug, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SheetListResponse {
    #[schema(value_type = Vec<Object>)]
    pub sheets: Vec<Sheet>,
    /// Set when the stored collection could not be read at startup.
    pub startup_issue: Option<String>,
}

/// Everything a client needs to draw one editor.
#[derive(Serialize, Debug, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EditorSnapshot {
    pub editor_id: Uuid,
    /// One of `empty`, `loading`, `ready`, `saved`.
    pub state: String,
    #[schema(value_type = Option<String>)]
    pub mode: Option<ViewMode>,
    pub busy: bool,
    pub dirty: bool,
    #[schema(value_type = Object)]
    pub form: GenerationForm,
    #[schema(value_type = Option<Object>)]
    pub sheet: Option<Sheet>,
    /// The rendered document, while the editor is in preview.
    pub preview_html: Option<String>,
    #[schema(value_type = Option<String>)]
    pub saved_sheet_id: Option<SheetId>,
    pub last_error: Option<String>,
}

impl EditorSnapshot {
    pub fn of(editor_id: Uuid, editor: &Editor) -> Self {
        let preview_html = match editor.state() {
            EditorState::Ready {
                sheet,
                mode: ViewMode::Preview,
            } => Some(render_preview(sheet)),
            _ => None,
        };
        let saved_sheet_id = match editor.state() {
            EditorState::Saved { sheet_id } => Some(sheet_id.clone()),
            _ => None,
        };

        Self {
            editor_id,
            state: editor.state().name().to_string(),
            mode: editor.mode(),
            busy: editor.is_busy(),
            dirty: editor.is_dirty(),
            form: editor.form().clone(),
            sheet: editor.sheet().cloned(),
            preview_html,
            saved_sheet_id,
            last_error: editor.last_error().map(str::to_string),
        }
    }
}

/// The outcome of a save.
#[derive(Serialize, Debug, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SaveResponse {
    #[schema(value_type = String)]
    pub sheet_id: SheetId,
    /// `added` or `updated`.
    pub kind: String,
    /// How long the confirmation shows before the client returns to the listing.
    pub redirect_after_ms: u64,
}

impl From<SaveReceipt> for SaveResponse {
    fn from(receipt: SaveReceipt) -> Self {
        Self {
            sheet_id: receipt.sheet_id,
            kind: match receipt.kind {
                SaveKind::Added => "added",
                SaveKind::Updated => "updated",
            }
            .to_string(),
            redirect_after_ms: receipt.redirect_after.as_millis() as u64,
        }
    }
}
