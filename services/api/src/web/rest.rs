//! services/api/src/web/rest.rs
//!
//! Contains the Axum handlers for the sheet-listing endpoints, the mapping of
//! core errors onto HTTP responses, and the master definition for the OpenAPI
//! specification.

use crate::web::editors;
use crate::web::protocol::{
    DeleteQuery, EditorSnapshot, ListQuery, ModeRequest, OpenEditorRequest, SaveResponse,
    SheetListResponse,
};
use crate::web::state::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use fiche_core::{EditorError, ExportError, GenerationError, PortError, SheetId};
use std::sync::Arc;
use tracing::{error, warn};
use utoipa::OpenApi;

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        list_sheets_handler,
        get_sheet_handler,
        delete_sheet_handler,
        editors::open_editor_handler,
        editors::get_editor_handler,
        editors::update_form_handler,
        editors::generate_handler,
        editors::edit_sheet_handler,
        editors::set_mode_handler,
        editors::save_handler,
        editors::export_handler,
        editors::close_editor_handler,
    ),
    components(
        schemas(
            SheetListResponse,
            EditorSnapshot,
            OpenEditorRequest,
            ModeRequest,
            SaveResponse,
        )
    ),
    tags(
        (name = "Fiches Pédagogiques API", description = "Generate, edit and export CEB lesson-preparation sheets.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// Error Mapping
//=========================================================================================

/// The response body a handler error turns into.
pub type HandlerError = (StatusCode, String);

pub fn port_error(e: PortError) -> HandlerError {
    match e {
        PortError::NotFound(what) => (StatusCode::NOT_FOUND, what),
        PortError::AlreadyExists(what) => {
            (StatusCode::CONFLICT, format!("Sheet {} already exists", what))
        }
        other => {
            error!("Storage failure: {:?}", other);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to write the sheets".to_string(),
            )
        }
    }
}

pub fn editor_error(e: EditorError) -> HandlerError {
    match e {
        EditorError::Validation(v) => (StatusCode::BAD_REQUEST, v.to_string()),
        EditorError::Generation(g) => {
            let status = match g {
                GenerationError::Cancelled => StatusCode::CONFLICT,
                _ => StatusCode::BAD_GATEWAY,
            };
            (status, g.user_message())
        }
        EditorError::StepOutOfRange(_) => (StatusCode::UNPROCESSABLE_ENTITY, e.to_string()),
        EditorError::Busy | EditorError::StaleGeneration | EditorError::InvalidState { .. } => {
            (StatusCode::CONFLICT, e.to_string())
        }
        EditorError::Store(port) => port_error(port),
    }
}

pub fn export_error(e: ExportError) -> HandlerError {
    error!("Export failed: {}", e);
    let status = match e {
        ExportError::RendererUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        _ => StatusCode::BAD_GATEWAY,
    };
    (status, e.user_message().to_string())
}

//=========================================================================================
// Sheet Handlers
//=========================================================================================

/// List the stored sheets, newest first.
///
/// `q` keeps only the sheets whose title or subject contains it.
#[utoipa::path(
    get,
    path = "/sheets",
    params(
        ("q" = Option<String>, Query, description = "Case-insensitive filter on title and subject.")
    ),
    responses(
        (status = 200, description = "The stored sheets", body = SheetListResponse)
    )
)]
pub async fn list_sheets_handler(
    State(app_state): State<Arc<AppState>>,
    Query(query): Query<ListQuery>,
) -> Json<SheetListResponse> {
    let store = app_state.store.lock().await;
    let sheets = match query.q.as_deref().map(str::trim) {
        Some(term) if !term.is_empty() => store.search(term).into_iter().cloned().collect(),
        _ => store.list().to_vec(),
    };
    Json(SheetListResponse {
        sheets,
        startup_issue: store.startup_issue().map(str::to_string),
    })
}

/// Fetch one stored sheet.
#[utoipa::path(
    get,
    path = "/sheets/{id}",
    params(("id" = String, Path, description = "The sheet id.")),
    responses(
        (status = 200, description = "The sheet"),
        (status = 404, description = "No sheet with this id")
    )
)]
pub async fn get_sheet_handler(
    State(app_state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, HandlerError> {
    let store = app_state.store.lock().await;
    store
        .get(&SheetId::from(id.as_str()))
        .cloned()
        .map(Json)
        .ok_or_else(|| (StatusCode::NOT_FOUND, format!("No sheet with id {}", id)))
}

/// Delete a stored sheet.
///
/// Nothing is deleted unless `confirm=true`; without it the response carries
/// the confirmation prompt to show.
#[utoipa::path(
    delete,
    path = "/sheets/{id}",
    params(
        ("id" = String, Path, description = "The sheet id."),
        ("confirm" = Option<bool>, Query, description = "Must be true to delete.")
    ),
    responses(
        (status = 204, description = "Deleted"),
        (status = 404, description = "No sheet with this id"),
        (status = 428, description = "Confirmation required; the body is the prompt"),
        (status = 500, description = "The collection could not be written")
    )
)]
pub async fn delete_sheet_handler(
    State(app_state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(query): Query<DeleteQuery>,
) -> Result<StatusCode, HandlerError> {
    let id = SheetId::from(id);
    let mut store = app_state.store.lock().await;
    let title = store
        .get(&id)
        .map(|sheet| sheet.title.clone())
        .ok_or_else(|| (StatusCode::NOT_FOUND, format!("No sheet with id {}", id)))?;

    if !query.confirm {
        return Err((
            StatusCode::PRECONDITION_REQUIRED,
            format!("Êtes-vous sûr de vouloir supprimer la fiche \"{}\" ?", title),
        ));
    }

    if !store.delete(&id).await.map_err(port_error)? {
        warn!("Sheet {} vanished before deletion.", id);
    }
    Ok(StatusCode::NO_CONTENT)
}
