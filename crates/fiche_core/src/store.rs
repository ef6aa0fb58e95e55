//! crates/fiche_core/src/store.rs
//!
//! The sheet store: the in-memory source of truth for saved sheets, written
//! through to a `SheetRepository` as one unit on every mutation.

use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use tracing::{error, info, warn};

use crate::domain::{Sheet, SheetId};
use crate::ports::{PortError, PortResult, SheetRepository};

/// Which branch of an upsert ran.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveKind {
    Added,
    Updated,
}

pub struct SheetStore {
    repository: Arc<dyn SheetRepository>,
    sheets: Vec<Sheet>,
    startup_issue: Option<String>,
}

impl SheetStore {
    /// Loads the collection once. Unavailable or corrupt storage yields an empty
    /// store; the failure is kept in `startup_issue`.
    pub async fn open(repository: Arc<dyn SheetRepository>) -> Self {
        let (sheets, startup_issue) = match repository.load_all().await {
            Ok(sheets) => (dedupe(sheets), None),
            Err(e) => {
                error!("Failed to load stored sheets, starting empty: {}", e);
                (Vec::new(), Some(e.to_string()))
            }
        };
        info!("Sheet store opened with {} sheet(s).", sheets.len());

        Self {
            repository,
            sheets,
            startup_issue,
        }
    }

    /// All sheets, most recently added first.
    pub fn list(&self) -> &[Sheet] {
        &self.sheets
    }

    pub fn len(&self) -> usize {
        self.sheets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sheets.is_empty()
    }

    pub fn get(&self, id: &SheetId) -> Option<&Sheet> {
        self.sheets.iter().find(|s| &s.id == id)
    }

    pub fn contains(&self, id: &SheetId) -> bool {
        self.get(id).is_some()
    }

    /// The load failure swallowed at start-up, if any.
    pub fn startup_issue(&self) -> Option<&str> {
        self.startup_issue.as_deref()
    }

    /// Case-insensitive match on title or subject. A blank term matches everything.
    pub fn search(&self, term: &str) -> Vec<&Sheet> {
        let needle = term.trim().to_lowercase();
        self.sheets
            .iter()
            .filter(|s| {
                needle.is_empty()
                    || s.title.to_lowercase().contains(&needle)
                    || s.subject.to_lowercase().contains(&needle)
            })
            .collect()
    }

    /// Prepends a new sheet.
    pub async fn add(&mut self, sheet: Sheet) -> PortResult<()> {
        if self.contains(&sheet.id) {
            return Err(PortError::AlreadyExists(format!("Sheet {}", sheet.id)));
        }
        let id = sheet.id.clone();
        let mut next = Vec::with_capacity(self.sheets.len() + 1);
        next.push(sheet);
        next.extend(self.sheets.iter().cloned());
        self.commit(next).await?;
        info!("Sheet {} added.", id);
        Ok(())
    }

    /// Replaces the sheet with the same id. Returns `false` (and writes nothing)
    /// when the id is unknown.
    pub async fn update(&mut self, sheet: Sheet) -> PortResult<bool> {
        let Some(position) = self.sheets.iter().position(|s| s.id == sheet.id) else {
            return Ok(false);
        };
        let id = sheet.id.clone();
        let mut next = self.sheets.clone();
        next[position] = sheet;
        self.commit(next).await?;
        info!("Sheet {} updated.", id);
        Ok(true)
    }

    /// Removes the sheet with this id. Returns `false` (and writes nothing)
    /// when the id is unknown.
    pub async fn delete(&mut self, id: &SheetId) -> PortResult<bool> {
        if !self.contains(id) {
            return Ok(false);
        }
        let next = self.sheets.iter().filter(|s| &s.id != id).cloned().collect();
        self.commit(next).await?;
        info!("Sheet {} deleted.", id);
        Ok(true)
    }

    /// Updates the sheet if its id is already stored, otherwise adds it.
    pub async fn upsert(&mut self, sheet: Sheet) -> PortResult<SaveKind> {
        if self.update(sheet.clone()).await? {
            Ok(SaveKind::Updated)
        } else {
            self.add(sheet).await?;
            Ok(SaveKind::Added)
        }
    }

    /// Persists `next` and only then makes it the in-memory collection.
    async fn commit(&mut self, next: Vec<Sheet>) -> PortResult<()> {
        self.repository.save_all(&next).await.map_err(|e| {
            error!("Failed to persist sheets: {}", e);
            e
        })?;
        self.sheets = next;
        Ok(())
    }
}

fn dedupe(sheets: Vec<Sheet>) -> Vec<Sheet> {
    let mut seen = HashSet::new();
    sheets
        .into_iter()
        .filter(|s| {
            let fresh = seen.insert(s.id.clone());
            if !fresh {
                warn!("Dropping stored sheet with duplicate id {}.", s.id);
            }
            fresh
        })
        .collect()
}

//=========================================================================================
// In-Memory Repository
//=========================================================================================

/// A `SheetRepository` that keeps the serialized collection in memory.
///
/// The collection goes through JSON on every write, like the durable adapters.
#[derive(Default, Clone)]
pub struct MemoryRepository {
    payload: Arc<Mutex<Option<String>>>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts from a raw payload, which may be invalid JSON.
    pub fn with_payload(payload: impl Into<String>) -> Self {
        Self {
            payload: Arc::new(Mutex::new(Some(payload.into()))),
        }
    }

    /// The last payload written, if any.
    pub fn payload(&self) -> Option<String> {
        self.payload.lock().ok().and_then(|p| p.clone())
    }
}

#[async_trait]
impl SheetRepository for MemoryRepository {
    async fn load_all(&self) -> PortResult<Vec<Sheet>> {
        let payload = self
            .payload
            .lock()
            .map_err(|e| PortError::Unexpected(e.to_string()))?
            .clone();
        match payload {
            None => Ok(Vec::new()),
            Some(json) => {
                serde_json::from_str(&json).map_err(|e| PortError::Corrupt(e.to_string()))
            }
        }
    }

    async fn save_all(&self, sheets: &[Sheet]) -> PortResult<()> {
        let json =
            serde_json::to_string(sheets).map_err(|e| PortError::Unexpected(e.to_string()))?;
        *self
            .payload
            .lock()
            .map_err(|e| PortError::Unexpected(e.to_string()))? = Some(json);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{GradeLevel, Material, SheetType, Step};
    use chrono::{SubsecRound, Utc};

    fn sheet(id: &str, title: &str, subject: &str) -> Sheet {
        Sheet {
            id: SheetId::from(id),
            title: title.to_string(),
            discipline: None,
            subject: subject.to_string(),
            domain: "LC".to_string(),
            sub_domain: "Grammaire".to_string(),
            grade_level: GradeLevel::Cm1,
            competence: String::new(),
            level: String::new(),
            oa: String::new(),
            content_summary: String::new(),
            specific_objective: String::new(),
            sheet_type: SheetType::Lesson,
            duration: "45 min".to_string(),
            material: Material::default(),
            reference: String::new(),
            steps: vec![Step::default()],
            created_at: Utc::now().trunc_subsecs(3),
        }
    }

    /// A repository whose writes always fail.
    struct BrokenRepository;

    #[async_trait]
    impl SheetRepository for BrokenRepository {
        async fn load_all(&self) -> PortResult<Vec<Sheet>> {
            Err(PortError::Unavailable("disk offline".to_string()))
        }

        async fn save_all(&self, _sheets: &[Sheet]) -> PortResult<()> {
            Err(PortError::Unavailable("disk offline".to_string()))
        }
    }

    async fn persisted(repo: &MemoryRepository) -> Vec<Sheet> {
        repo.load_all().await.unwrap()
    }

    #[tokio::test]
    async fn add_prepends_and_persists_the_whole_list() {
        let repo = MemoryRepository::new();
        let mut store = SheetStore::open(Arc::new(repo.clone())).await;

        store.add(sheet("a", "Un", "Lecture")).await.unwrap();
        store.add(sheet("b", "Deux", "Lecture")).await.unwrap();

        let ids: Vec<_> = store.list().iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, ["b", "a"]);
        assert_eq!(persisted(&repo).await, store.list());
    }

    #[tokio::test]
    async fn add_rejects_an_existing_id() {
        let repo = MemoryRepository::new();
        let mut store = SheetStore::open(Arc::new(repo.clone())).await;
        store.add(sheet("a", "Un", "Lecture")).await.unwrap();

        let err = store.add(sheet("a", "Autre", "Lecture")).await.unwrap_err();
        assert!(matches!(err, PortError::AlreadyExists(_)));
        assert_eq!(store.len(), 1);
        assert_eq!(store.list()[0].title, "Un");
    }

    #[tokio::test]
    async fn update_replaces_in_place_and_ignores_unknown_ids() {
        let repo = MemoryRepository::new();
        let mut store = SheetStore::open(Arc::new(repo.clone())).await;
        store.add(sheet("a", "Un", "Lecture")).await.unwrap();
        store.add(sheet("b", "Deux", "Lecture")).await.unwrap();

        let mut edited = sheet("a", "Un (revu)", "Lecture");
        edited.created_at = store.get(&SheetId::from("a")).unwrap().created_at;
        assert!(store.update(edited).await.unwrap());
        assert_eq!(store.list()[1].title, "Un (revu)");

        let before = repo.payload();
        assert!(!store.update(sheet("zz", "Fantôme", "Lecture")).await.unwrap());
        assert_eq!(repo.payload(), before);
        assert_eq!(persisted(&repo).await, store.list());
    }

    #[tokio::test]
    async fn delete_removes_exactly_one_and_ignores_unknown_ids() {
        let repo = MemoryRepository::new();
        let mut store = SheetStore::open(Arc::new(repo.clone())).await;
        store.add(sheet("a", "Un", "Lecture")).await.unwrap();
        store.add(sheet("b", "Deux", "Lecture")).await.unwrap();

        assert!(!store.delete(&SheetId::from("zz")).await.unwrap());
        assert_eq!(store.len(), 2);

        assert!(store.delete(&SheetId::from("a")).await.unwrap());
        assert_eq!(store.len(), 1);
        assert!(!store.contains(&SheetId::from("a")));
        assert_eq!(persisted(&repo).await, store.list());
    }

    #[tokio::test]
    async fn upsert_reports_which_branch_ran() {
        let mut store = SheetStore::open(Arc::new(MemoryRepository::new())).await;
        assert_eq!(store.upsert(sheet("a", "Un", "Lecture")).await.unwrap(), SaveKind::Added);
        assert_eq!(store.upsert(sheet("a", "Un bis", "Lecture")).await.unwrap(), SaveKind::Updated);
        assert_eq!(store.len(), 1);
        assert_eq!(store.list()[0].title, "Un bis");
    }

    #[tokio::test]
    async fn corrupt_payload_opens_empty_and_records_the_issue() {
        let repo = MemoryRepository::with_payload("[{not json");
        let store = SheetStore::open(Arc::new(repo)).await;
        assert!(store.is_empty());
        assert!(store.startup_issue().unwrap().contains("corrupt"));
    }

    #[tokio::test]
    async fn duplicate_stored_ids_keep_the_first_occurrence() {
        let payload = serde_json::to_string(&vec![
            sheet("a", "Premier", "Lecture"),
            sheet("a", "Doublon", "Lecture"),
        ])
        .unwrap();
        let store = SheetStore::open(Arc::new(MemoryRepository::with_payload(payload))).await;
        assert_eq!(store.len(), 1);
        assert_eq!(store.list()[0].title, "Premier");
    }

    #[tokio::test]
    async fn failed_write_leaves_memory_untouched() {
        let mut store = SheetStore::open(Arc::new(BrokenRepository)).await;
        assert!(store.startup_issue().is_some());

        let err = store.add(sheet("a", "Un", "Lecture")).await.unwrap_err();
        assert!(matches!(err, PortError::Unavailable(_)));
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn search_matches_title_or_subject_ignoring_case() {
        let mut store = SheetStore::open(Arc::new(MemoryRepository::new())).await;
        store.add(sheet("a", "Le pluriel des noms", "Grammaire")).await.unwrap();
        store.add(sheet("b", "Greetings", "Anglais")).await.unwrap();

        assert_eq!(store.search("").len(), 2);
        assert_eq!(store.search("PLURIEL")[0].id.as_str(), "a");
        assert_eq!(store.search("anglais")[0].id.as_str(), "b");
        assert!(store.search("géométrie").is_empty());
    }
}
