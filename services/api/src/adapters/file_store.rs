//! services/api/src/adapters/file_store.rs
//!
//! This module contains the durable storage adapter, the concrete implementation
//! of the `SheetRepository` port from the `core` crate. The whole collection
//! lives as one JSON array in a single file.

use async_trait::async_trait;
use fiche_core::domain::Sheet;
use fiche_core::ports::{PortError, PortResult, SheetRepository};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::info;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A storage adapter that implements the `SheetRepository` port over one JSON file.
#[derive(Clone, Debug)]
pub struct JsonFileRepository {
    path: PathBuf,
}

impl JsonFileRepository {
    /// Creates a new `JsonFileRepository`. The file is created on first save.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Writes `contents` next to `path` and renames it into place, so readers see
/// either the old file or the new one.
fn write_atomically(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    std::fs::create_dir_all(&parent)?;

    let mut staged = tempfile::NamedTempFile::new_in(&parent)?;
    staged.write_all(contents)?;
    staged.as_file().sync_all()?;
    staged.persist(path).map_err(|e| e.error)?;
    Ok(())
}

//=========================================================================================
// `SheetRepository` Trait Implementation
//=========================================================================================

#[async_trait]
impl SheetRepository for JsonFileRepository {
    async fn load_all(&self) -> PortResult<Vec<Sheet>> {
        let contents = match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!("No sheet file at {}, starting empty.", self.path.display());
                return Ok(Vec::new());
            }
            Err(e) => return Err(PortError::Unavailable(e.to_string())),
        };

        if contents.trim().is_empty() {
            return Ok(Vec::new());
        }
        serde_json::from_str(&contents).map_err(|e| {
            PortError::Corrupt(format!("{}: {}", self.path.display(), e))
        })
    }

    async fn save_all(&self, sheets: &[Sheet]) -> PortResult<()> {
        let json =
            serde_json::to_vec_pretty(sheets).map_err(|e| PortError::Unexpected(e.to_string()))?;
        let path = self.path.clone();

        tokio::task::spawn_blocking(move || write_atomically(&path, &json))
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?
            .map_err(|e| PortError::Unavailable(e.to_string()))
    }
}
