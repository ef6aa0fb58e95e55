//! services/api/src/web/editors.rs
//!
//! Contains the Axum handlers for editor sessions: opening an editor, driving a
//! generation, editing the sheet, saving it, and downloading its exports.

use crate::web::protocol::{EditorSnapshot, ModeRequest, OpenEditorRequest, SaveResponse};
use crate::web::rest::{editor_error, export_error, HandlerError};
use crate::web::state::{AppState, EditorSession};
use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Json},
};
use fiche_core::{
    export_sheet, Editor, ExportArtifact, ExportKind, ExportPlan, GenerationForm, SheetField,
};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{error, info};
use uuid::Uuid;

const PREVIEW_SETTLE_HEADER: HeaderName = HeaderName::from_static("x-preview-settle-ms");

async fn session(
    app_state: &AppState,
    editor_id: Uuid,
) -> Result<Arc<Mutex<EditorSession>>, HandlerError> {
    app_state.editor(editor_id).await.ok_or_else(|| {
        (
            StatusCode::NOT_FOUND,
            format!("No open editor with id {}", editor_id),
        )
    })
}

/// `Content-Disposition` value with an ASCII fallback and the UTF-8 name.
fn content_disposition(disposition: &str, filename: &str) -> String {
    let fallback: String = filename
        .chars()
        .map(|c| {
            if c.is_ascii_graphic() && c != '"' && c != '\\' || c == ' ' {
                c
            } else {
                '_'
            }
        })
        .collect();
    let mut encoded = String::with_capacity(filename.len() * 3);
    for byte in filename.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'.' | b'_' | b'~' => {
                encoded.push(byte as char)
            }
            _ => encoded.push_str(&format!("%{:02X}", byte)),
        }
    }
    format!(
        "{}; filename=\"{}\"; filename*=UTF-8''{}",
        disposition, fallback, encoded
    )
}

//=========================================================================================
// Editor Lifecycle
//=========================================================================================

/// Open an editor.
///
/// Without `sheetId` the editor starts empty (create). With it, the editor
/// opens the stored sheet in edit mode (edit).
#[utoipa::path(
    post,
    path = "/editors",
    request_body = OpenEditorRequest,
    responses(
        (status = 201, description = "Editor opened", body = EditorSnapshot),
        (status = 404, description = "No sheet with this id")
    )
)]
pub async fn open_editor_handler(
    State(app_state): State<Arc<AppState>>,
    Json(request): Json<OpenEditorRequest>,
) -> Result<impl IntoResponse, HandlerError> {
    let editor = match request.sheet_id {
        Some(sheet_id) => {
            let store = app_state.store.lock().await;
            let sheet = store.get(&sheet_id).cloned().ok_or_else(|| {
                (
                    StatusCode::NOT_FOUND,
                    format!("No sheet with id {}", sheet_id),
                )
            })?;
            Editor::open(sheet)
        }
        None => Editor::new(),
    };

    let editor_id = app_state.open_editor(editor).await;
    let session = session(&app_state, editor_id).await?;
    let snapshot = EditorSnapshot::of(editor_id, &session.lock().await.editor);
    info!("Editor {} opened ({}).", editor_id, snapshot.state);

    Ok((StatusCode::CREATED, Json(snapshot)))
}

/// Fetch the current state of an editor.
#[utoipa::path(
    get,
    path = "/editors/{id}",
    params(("id" = Uuid, Path, description = "The editor id.")),
    responses(
        (status = 200, description = "The editor", body = EditorSnapshot),
        (status = 404, description = "No open editor with this id")
    )
)]
pub async fn get_editor_handler(
    State(app_state): State<Arc<AppState>>,
    Path(editor_id): Path<Uuid>,
) -> Result<Json<EditorSnapshot>, HandlerError> {
    let session = session(&app_state, editor_id).await?;
    let session = session.lock().await;
    Ok(Json(EditorSnapshot::of(editor_id, &session.editor)))
}

/// Close an editor, cancelling any generation it is waiting on.
#[utoipa::path(
    delete,
    path = "/editors/{id}",
    params(("id" = Uuid, Path, description = "The editor id.")),
    responses(
        (status = 204, description = "Editor closed"),
        (status = 404, description = "No open editor with this id")
    )
)]
pub async fn close_editor_handler(
    State(app_state): State<Arc<AppState>>,
    Path(editor_id): Path<Uuid>,
) -> Result<StatusCode, HandlerError> {
    if app_state.close_editor(editor_id).await {
        info!("Editor {} closed.", editor_id);
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err((
            StatusCode::NOT_FOUND,
            format!("No open editor with id {}", editor_id),
        ))
    }
}

//=========================================================================================
// Form and Generation
//=========================================================================================

/// Replace the generation form.
///
/// Body: `activity`, `topic`, `gradeLevel`, `languages`, `type`; missing fields take their defaults.
#[utoipa::path(
    put,
    path = "/editors/{id}/form",
    params(("id" = Uuid, Path, description = "The editor id.")),
    request_body = Object,
    responses(
        (status = 200, description = "Form updated", body = EditorSnapshot),
        (status = 404, description = "No open editor with this id"),
        (status = 409, description = "The editor is already saved")
    )
)]
pub async fn update_form_handler(
    State(app_state): State<Arc<AppState>>,
    Path(editor_id): Path<Uuid>,
    Json(form): Json<GenerationForm>,
) -> Result<Json<EditorSnapshot>, HandlerError> {
    let session = session(&app_state, editor_id).await?;
    let mut session = session.lock().await;
    session.editor.set_form(form).map_err(editor_error)?;
    Ok(Json(EditorSnapshot::of(editor_id, &session.editor)))
}

/// Generate a sheet from the current form.
///
/// The editor is `loading` while the AI service works; a second request in
/// that window is refused. On failure the editor returns to its previous state.
#[utoipa::path(
    post,
    path = "/editors/{id}/generate",
    params(("id" = Uuid, Path, description = "The editor id.")),
    responses(
        (status = 200, description = "Sheet generated, editor in preview", body = EditorSnapshot),
        (status = 400, description = "Activity or topic missing, or invalid languages"),
        (status = 404, description = "No open editor with this id"),
        (status = 409, description = "A generation is already running"),
        (status = 502, description = "The AI service failed or answered unusably")
    )
)]
pub async fn generate_handler(
    State(app_state): State<Arc<AppState>>,
    Path(editor_id): Path<Uuid>,
) -> Result<Json<EditorSnapshot>, HandlerError> {
    let session = session(&app_state, editor_id).await?;

    // The session lock is released while the AI call is in flight.
    let (ticket, token) = {
        let mut guard = session.lock().await;
        let ticket = guard.editor.begin_generation().map_err(editor_error)?;
        (ticket, guard.cancellation_token.clone())
    };

    let result = app_state
        .generator
        .generate_cancellable(&ticket.request, &token)
        .await;

    let mut guard = session.lock().await;
    if let Err(e) = guard.editor.finish_generation(ticket, result) {
        error!("Generation for editor {} failed: {}", editor_id, e);
        return Err(editor_error(e));
    }
    Ok(Json(EditorSnapshot::of(editor_id, &guard.editor)))
}

//=========================================================================================
// Editing
//=========================================================================================

/// Edit one field of the sheet.
///
/// Body: `{"field": "contentSummary", "value": "..."}`, or for a step
/// `{"field": "step", "value": {"index": 0, "part": "objective", "value": "..."}}`.
#[utoipa::path(
    patch,
    path = "/editors/{id}/sheet",
    params(("id" = Uuid, Path, description = "The editor id.")),
    request_body = Object,
    responses(
        (status = 200, description = "Field updated", body = EditorSnapshot),
        (status = 404, description = "No open editor with this id"),
        (status = 409, description = "The editor holds no sheet"),
        (status = 422, description = "No step at this index")
    )
)]
pub async fn edit_sheet_handler(
    State(app_state): State<Arc<AppState>>,
    Path(editor_id): Path<Uuid>,
    Json(field): Json<SheetField>,
) -> Result<Json<EditorSnapshot>, HandlerError> {
    let session = session(&app_state, editor_id).await?;
    let mut session = session.lock().await;
    session.editor.edit(field).map_err(editor_error)?;
    Ok(Json(EditorSnapshot::of(editor_id, &session.editor)))
}

/// Set the view mode, or toggle it when no mode is given.
#[utoipa::path(
    post,
    path = "/editors/{id}/mode",
    params(("id" = Uuid, Path, description = "The editor id.")),
    request_body = ModeRequest,
    responses(
        (status = 200, description = "Mode changed", body = EditorSnapshot),
        (status = 404, description = "No open editor with this id"),
        (status = 409, description = "The editor holds no sheet")
    )
)]
pub async fn set_mode_handler(
    State(app_state): State<Arc<AppState>>,
    Path(editor_id): Path<Uuid>,
    Json(request): Json<ModeRequest>,
) -> Result<Json<EditorSnapshot>, HandlerError> {
    let session = session(&app_state, editor_id).await?;
    let mut session = session.lock().await;
    match request.mode {
        Some(mode) => session.editor.set_mode(mode),
        None => session.editor.toggle_mode(),
    }
    .map_err(editor_error)?;
    Ok(Json(EditorSnapshot::of(editor_id, &session.editor)))
}

//=========================================================================================
// Save and Export
//=========================================================================================

/// Save the sheet: update it when already stored, add it otherwise.
#[utoipa::path(
    post,
    path = "/editors/{id}/save",
    params(("id" = Uuid, Path, description = "The editor id.")),
    responses(
        (status = 200, description = "Saved", body = SaveResponse),
        (status = 404, description = "No open editor with this id"),
        (status = 409, description = "The editor holds no sheet"),
        (status = 500, description = "The collection could not be written")
    )
)]
pub async fn save_handler(
    State(app_state): State<Arc<AppState>>,
    Path(editor_id): Path<Uuid>,
) -> Result<Json<SaveResponse>, HandlerError> {
    let session = session(&app_state, editor_id).await?;
    let mut session = session.lock().await;
    let mut store = app_state.store.lock().await;
    let receipt = session.editor.save(&mut store).await.map_err(editor_error)?;
    Ok(Json(SaveResponse::from(receipt)))
}

/// Download the sheet as a print document, a PDF, or a word-processor file.
#[utoipa::path(
    get,
    path = "/editors/{id}/export/{kind}",
    params(
        ("id" = Uuid, Path, description = "The editor id."),
        ("kind" = String, Path, description = "print, pdf or word")
    ),
    responses(
        (status = 200, description = "The exported document; `x-preview-settle-ms` is set when the editor left edit mode"),
        (status = 400, description = "Unknown export format"),
        (status = 404, description = "No open editor with this id"),
        (status = 409, description = "The editor holds no sheet"),
        (status = 502, description = "The PDF renderer failed"),
        (status = 503, description = "No PDF renderer is available")
    )
)]
pub async fn export_handler(
    State(app_state): State<Arc<AppState>>,
    Path((editor_id, kind)): Path<(Uuid, String)>,
) -> Result<impl IntoResponse, HandlerError> {
    let kind: ExportKind = kind
        .parse()
        .map_err(|e: String| (StatusCode::BAD_REQUEST, e))?;

    let session = session(&app_state, editor_id).await?;
    let plan = {
        let mut guard = session.lock().await;
        guard.editor.prepare_export(kind).map_err(editor_error)?
    };

    let artifact = export_sheet(kind, &plan.sheet, app_state.pdf_renderer.as_ref())
        .await
        .map_err(export_error)?;
    info!(
        "Exported sheet {} as {} ({} bytes).",
        plan.sheet.id,
        kind,
        artifact.body.len()
    );

    let headers = export_headers(kind, &plan, &artifact);
    Ok((headers, artifact.body))
}

/// Response headers for an export. When the editor had to switch to the
/// preview first, `x-preview-settle-ms` tells the client how long to let it
/// render; the server itself does not wait.
fn export_headers(kind: ExportKind, plan: &ExportPlan, artifact: &ExportArtifact) -> HeaderMap {
    let disposition = match kind {
        ExportKind::Print => "inline",
        _ => "attachment",
    };
    let mut headers = HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static(artifact.content_type),
    );
    if let Ok(value) = HeaderValue::from_str(&content_disposition(disposition, &artifact.filename)) {
        headers.insert(header::CONTENT_DISPOSITION, value);
    }
    if plan.switched_to_preview {
        headers.insert(
            PREVIEW_SETTLE_HEADER,
            HeaderValue::from(plan.settle_delay.as_millis() as u64),
        );
    }
    headers
}
