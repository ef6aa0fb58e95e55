pub mod editors;
pub mod protocol;
pub mod rest;
pub mod state;

use axum::{
    routing::{get, patch, post, put},
    Router,
};
use std::sync::Arc;

pub use rest::ApiDoc;
pub use state::AppState;

/// Builds the API routes over the shared state.
pub fn api_router(app_state: Arc<AppState>) -> Router {
    Router::new()
        .route("/sheets", get(rest::list_sheets_handler))
        .route(
            "/sheets/{id}",
            get(rest::get_sheet_handler).delete(rest::delete_sheet_handler),
        )
        .route("/editors", post(editors::open_editor_handler))
        .route(
            "/editors/{id}",
            get(editors::get_editor_handler).delete(editors::close_editor_handler),
        )
        .route("/editors/{id}/form", put(editors::update_form_handler))
        .route("/editors/{id}/generate", post(editors::generate_handler))
        .route("/editors/{id}/sheet", patch(editors::edit_sheet_handler))
        .route("/editors/{id}/mode", post(editors::set_mode_handler))
        .route("/editors/{id}/save", post(editors::save_handler))
        .route("/editors/{id}/export/{kind}", get(editors::export_handler))
        .with_state(app_state)
}
