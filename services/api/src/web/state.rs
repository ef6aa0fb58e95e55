//! services/api/src/web/state.rs
//!
//! Defines the application's shared state and the per-editor session state.

use fiche_core::{Editor, PdfRenderer, SheetGenerator, SheetStore};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

//=========================================================================================
// AppState (Shared Across All Requests)
//=========================================================================================

/// The shared application state, created once at startup and passed to all handlers.
pub struct AppState {
    /// The single sheet store, loaded once at startup.
    pub store: Mutex<SheetStore>,
    pub generator: SheetGenerator,
    pub pdf_renderer: Arc<dyn PdfRenderer>,
    /// Open editors by id.
    pub editors: Mutex<HashMap<Uuid, Arc<Mutex<EditorSession>>>>,
}

impl AppState {
    pub fn new(
        store: SheetStore,
        generator: SheetGenerator,
        pdf_renderer: Arc<dyn PdfRenderer>,
    ) -> Self {
        Self {
            store: Mutex::new(store),
            generator,
            pdf_renderer,
            editors: Mutex::new(HashMap::new()),
        }
    }

    /// Registers a new editor session and returns its id.
    pub async fn open_editor(&self, editor: Editor) -> Uuid {
        let editor_id = Uuid::new_v4();
        let session = Arc::new(Mutex::new(EditorSession::new(editor)));
        self.editors.lock().await.insert(editor_id, session);
        editor_id
    }

    pub async fn editor(&self, editor_id: Uuid) -> Option<Arc<Mutex<EditorSession>>> {
        self.editors.lock().await.get(&editor_id).cloned()
    }

    /// Drops the session and cancels whatever it was generating.
    pub async fn close_editor(&self, editor_id: Uuid) -> bool {
        // Release the map before waiting on the session, which a slow request may hold.
        let removed = self.editors.lock().await.remove(&editor_id);
        match removed {
            Some(session) => {
                session.lock().await.cancellation_token.cancel();
                true
            }
            None => false,
        }
    }
}

//=========================================================================================
// EditorSession (Specific to One Open Editor)
//=========================================================================================

/// The state behind one open editor.
pub struct EditorSession {
    pub editor: Editor,
    /// Cancelled when the editor is closed; in-flight generations watch it.
    pub cancellation_token: CancellationToken,
}

impl EditorSession {
    pub fn new(editor: Editor) -> Self {
        Self {
            editor,
            cancellation_token: CancellationToken::new(),
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use async_trait::async_trait;
    use fiche_core::{
        CompletionPrompt, CompletionService, MemoryRepository, PdfOptions, PortError, PortResult,
    };
    use std::time::Duration;

    struct NoCompletion;

    #[async_trait]
    impl CompletionService for NoCompletion {
        async fn complete(&self, _prompt: &CompletionPrompt) -> PortResult<String> {
            Err(PortError::Unavailable("no model in tests".to_string()))
        }
    }

    struct NoPdf;

    #[async_trait]
    impl PdfRenderer for NoPdf {
        async fn render_pdf(&self, _html: &str, _options: &PdfOptions) -> PortResult<Vec<u8>> {
            Err(PortError::Unavailable("no renderer in tests".to_string()))
        }
    }

    /// An `AppState` over an empty in-memory store and offline services.
    pub(crate) async fn offline_state() -> AppState {
        let store = SheetStore::open(Arc::new(MemoryRepository::new())).await;
        AppState::new(
            store,
            SheetGenerator::new(Arc::new(NoCompletion)),
            Arc::new(NoPdf),
        )
    }

    #[tokio::test]
    async fn closing_cancels_the_session_once() {
        let state = offline_state().await;
        let editor_id = state.open_editor(Editor::new()).await;
        let token = state
            .editor(editor_id)
            .await
            .unwrap()
            .lock()
            .await
            .cancellation_token
            .clone();

        assert!(state.close_editor(editor_id).await);
        assert!(token.is_cancelled());
        assert!(state.editor(editor_id).await.is_none());
        assert!(!state.close_editor(editor_id).await);
    }

    #[tokio::test]
    async fn closing_a_busy_editor_does_not_block_the_others() {
        let state = Arc::new(offline_state().await);
        let busy_id = state.open_editor(Editor::new()).await;
        let other_id = state.open_editor(Editor::new()).await;

        let busy = state.editor(busy_id).await.unwrap();
        let held = busy.lock().await;

        let closing = tokio::spawn({
            let state = state.clone();
            async move { state.close_editor(busy_id).await }
        });
        tokio::task::yield_now().await;

        let other = tokio::time::timeout(Duration::from_secs(1), state.editor(other_id))
            .await
            .expect("editor lookup blocked behind a closing session");
        assert!(other.is_some());
        assert!(state.editor(busy_id).await.is_none());

        let token = held.cancellation_token.clone();
        drop(held);
        assert!(closing.await.unwrap());
        assert!(token.is_cancelled());
    }
}
