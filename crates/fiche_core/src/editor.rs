//! crates/fiche_core/src/editor.rs
//!
//! The editor state machine: the generation form, the sheet being worked on,
//! and the edit/preview toggle. It mediates between the generator and the store.
//!
//! ```text
//! Empty --begin_generation--> Loading --ok--> Ready(sheet, Preview)
//!                                    \--err--> state before the call
//! Ready --edit / set_mode--> Ready
//! Ready --begin_generation--> Loading   (unsaved edits are dropped on success)
//! Ready --save--> Saved
//! ```

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::domain::{GenerationRequest, GradeLevel, Languages, Sheet, SheetId, SheetType};
use crate::export::ExportKind;
use crate::generation::{GenerationError, SheetGenerator};
use crate::ports::PortError;
use crate::store::{SaveKind, SheetStore};

/// How long the save confirmation stays up before returning to the listing.
pub const SAVE_REDIRECT_DELAY: Duration = Duration::from_millis(1500);

//=========================================================================================
// Errors
//=========================================================================================

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Précisez l'activité et le titre pour interroger le guide.")]
    MissingActivityOrTopic,
    #[error("Langues invalides : {0}")]
    Languages(String),
}

#[derive(Debug, thiserror::Error)]
pub enum EditorError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Generation(#[from] GenerationError),
    #[error("A generation is already in progress")]
    Busy,
    #[error("This generation result is no longer awaited")]
    StaleGeneration,
    #[error("Cannot {action} while the editor is {state}")]
    InvalidState {
        action: &'static str,
        state: &'static str,
    },
    #[error("There is no step at index {0}")]
    StepOutOfRange(usize),
    #[error("Failed to save the sheet: {0}")]
    Store(#[from] PortError),
}

//=========================================================================================
// Form, Modes and Field Edits
//=========================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewMode {
    Edit,
    Preview,
}

impl ViewMode {
    pub fn toggled(self) -> Self {
        match self {
            ViewMode::Edit => ViewMode::Preview,
            ViewMode::Preview => ViewMode::Edit,
        }
    }
}

/// The generation form as the teacher fills it in. It may be incomplete;
/// it is validated when a generation starts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationForm {
    #[serde(default)]
    pub activity: String,
    #[serde(default)]
    pub topic: String,
    #[serde(default)]
    pub grade_level: GradeLevel,
    #[serde(default = "default_languages")]
    pub languages: Vec<String>,
    #[serde(default, rename = "type")]
    pub sheet_type: SheetType,
}

fn default_languages() -> Vec<String> {
    Languages::default().into()
}

impl Default for GenerationForm {
    fn default() -> Self {
        Self {
            activity: String::new(),
            topic: String::new(),
            grade_level: GradeLevel::default(),
            languages: default_languages(),
            sheet_type: SheetType::default(),
        }
    }
}

impl GenerationForm {
    /// Seeds the form from a stored sheet. Languages go back to the default.
    pub fn from_sheet(sheet: &Sheet) -> Self {
        Self {
            activity: sheet.subject.clone(),
            topic: sheet.title.clone(),
            grade_level: sheet.grade_level,
            languages: default_languages(),
            sheet_type: sheet.sheet_type,
        }
    }

    pub fn to_request(&self) -> Result<GenerationRequest, ValidationError> {
        if self.activity.trim().is_empty() || self.topic.trim().is_empty() {
            return Err(ValidationError::MissingActivityOrTopic);
        }
        let languages =
            Languages::new(self.languages.clone()).map_err(ValidationError::Languages)?;
        Ok(GenerationRequest {
            topic: self.topic.trim().to_string(),
            grade_level: self.grade_level,
            activity: self.activity.trim().to_string(),
            languages,
            sheet_type: self.sheet_type,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StepPart {
    Name,
    Objective,
    TeacherActivity,
    StudentActivity,
}

/// One in-place edit of the sheet under edition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "field", content = "value", rename_all = "camelCase")]
pub enum SheetField {
    Title(String),
    Discipline(Option<String>),
    Subject(String),
    Domain(String),
    SubDomain(String),
    Competence(String),
    Level(String),
    Oa(String),
    SpecificObjective(String),
    ContentSummary(String),
    Duration(String),
    Reference(String),
    MaterialCollective(String),
    MaterialIndividual(String),
    Step {
        index: usize,
        part: StepPart,
        value: String,
    },
}

impl SheetField {
    fn apply(self, sheet: &mut Sheet) -> Result<(), EditorError> {
        match self {
            SheetField::Title(v) => sheet.title = v,
            SheetField::Discipline(v) => sheet.discipline = v,
            SheetField::Subject(v) => sheet.subject = v,
            SheetField::Domain(v) => sheet.domain = v,
            SheetField::SubDomain(v) => sheet.sub_domain = v,
            SheetField::Competence(v) => sheet.competence = v,
            SheetField::Level(v) => sheet.level = v,
            SheetField::Oa(v) => sheet.oa = v,
            SheetField::SpecificObjective(v) => sheet.specific_objective = v,
            SheetField::ContentSummary(v) => sheet.content_summary = v,
            SheetField::Duration(v) => sheet.duration = v,
            SheetField::Reference(v) => sheet.reference = v,
            SheetField::MaterialCollective(v) => sheet.material.collective = v,
            SheetField::MaterialIndividual(v) => sheet.material.individual = v,
            SheetField::Step { index, part, value } => {
                let step = sheet
                    .steps
                    .get_mut(index)
                    .ok_or(EditorError::StepOutOfRange(index))?;
                match part {
                    StepPart::Name => step.name = value,
                    StepPart::Objective => step.objective = value,
                    StepPart::TeacherActivity => step.teacher_activity = value,
                    StepPart::StudentActivity => step.student_activity = value,
                }
            }
        }
        Ok(())
    }
}

//=========================================================================================
// States
//=========================================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum EditorState {
    Empty,
    Loading,
    Ready { sheet: Sheet, mode: ViewMode },
    Saved { sheet_id: SheetId },
}

impl EditorState {
    pub fn name(&self) -> &'static str {
        match self {
            EditorState::Empty => "empty",
            EditorState::Loading => "loading",
            EditorState::Ready { .. } => "ready",
            EditorState::Saved { .. } => "saved",
        }
    }
}

/// Handed out by `begin_generation`; must be given back to `finish_generation`.
#[derive(Debug)]
pub struct GenerationTicket {
    seq: u64,
    pub request: GenerationRequest,
}

#[derive(Debug)]
struct PendingGeneration {
    seq: u64,
    previous: Option<(Sheet, ViewMode, bool)>,
}

/// What a successful save tells the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveReceipt {
    pub sheet_id: SheetId,
    pub kind: SaveKind,
    /// Delay before navigating back to the listing.
    pub redirect_after: Duration,
}

/// What `prepare_export` decided.
#[derive(Debug, Clone)]
pub struct ExportPlan {
    pub sheet: Sheet,
    /// The editor had to leave edit mode for the preview.
    pub switched_to_preview: bool,
    /// Wait this long before exporting.
    pub settle_delay: Duration,
}

//=========================================================================================
// The Editor
//=========================================================================================

#[derive(Debug)]
pub struct Editor {
    form: GenerationForm,
    state: EditorState,
    dirty: bool,
    last_error: Option<String>,
    next_seq: u64,
    pending: Option<PendingGeneration>,
}

impl Default for Editor {
    fn default() -> Self {
        Self::new()
    }
}

impl Editor {
    /// A blank editor (create route).
    pub fn new() -> Self {
        Self {
            form: GenerationForm::default(),
            state: EditorState::Empty,
            dirty: false,
            last_error: None,
            next_seq: 0,
            pending: None,
        }
    }

    /// An editor on a stored sheet (edit route), without generation.
    pub fn open(sheet: Sheet) -> Self {
        Self {
            form: GenerationForm::from_sheet(&sheet),
            state: EditorState::Ready {
                sheet,
                mode: ViewMode::Edit,
            },
            ..Self::new()
        }
    }

    pub fn state(&self) -> &EditorState {
        &self.state
    }

    pub fn form(&self) -> &GenerationForm {
        &self.form
    }

    pub fn sheet(&self) -> Option<&Sheet> {
        match &self.state {
            EditorState::Ready { sheet, .. } => Some(sheet),
            _ => None,
        }
    }

    pub fn mode(&self) -> Option<ViewMode> {
        match &self.state {
            EditorState::Ready { mode, .. } => Some(*mode),
            _ => None,
        }
    }

    pub fn is_busy(&self) -> bool {
        matches!(self.state, EditorState::Loading)
    }

    /// Whether the sheet has edits since it was generated or opened.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// The message of the last failed generation, cleared by the next attempt.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    fn invalid(&self, action: &'static str) -> EditorError {
        EditorError::InvalidState {
            action,
            state: self.state.name(),
        }
    }

    pub fn set_form(&mut self, form: GenerationForm) -> Result<(), EditorError> {
        if matches!(self.state, EditorState::Saved { .. }) {
            return Err(self.invalid("change the form"));
        }
        self.form = form;
        Ok(())
    }

    //-------------------------------------------------------------------------------------
    // Generation
    //-------------------------------------------------------------------------------------

    /// Validates the form and enters `Loading`. A failed validation leaves the
    /// editor untouched.
    pub fn begin_generation(&mut self) -> Result<GenerationTicket, EditorError> {
        match self.state {
            EditorState::Loading => return Err(EditorError::Busy),
            EditorState::Saved { .. } => return Err(self.invalid("generate")),
            _ => {}
        }
        let request = self.form.to_request()?;

        let previous = match std::mem::replace(&mut self.state, EditorState::Loading) {
            EditorState::Ready { sheet, mode } => Some((sheet, mode, self.dirty)),
            _ => None,
        };
        self.next_seq += 1;
        let seq = self.next_seq;
        self.pending = Some(PendingGeneration { seq, previous });
        self.last_error = None;

        Ok(GenerationTicket { seq, request })
    }

    /// Applies the outcome of the generation started with `ticket`.
    ///
    /// Success shows the new sheet in preview, dropping the previous sheet and
    /// any unsaved edits to it. Failure restores the state from before the call
    /// and records the message.
    pub fn finish_generation(
        &mut self,
        ticket: GenerationTicket,
        result: Result<Sheet, GenerationError>,
    ) -> Result<(), EditorError> {
        let pending = match self.pending.take() {
            Some(pending) if pending.seq == ticket.seq => pending,
            other => {
                self.pending = other;
                return Err(EditorError::StaleGeneration);
            }
        };

        match result {
            Ok(sheet) => {
                if let Some((old, _, true)) = &pending.previous {
                    warn!("Discarding unsaved edits to sheet {} after regeneration.", old.id);
                }
                info!("Editor now holds generated sheet {}.", sheet.id);
                self.state = EditorState::Ready {
                    sheet,
                    mode: ViewMode::Preview,
                };
                self.dirty = false;
                Ok(())
            }
            Err(e) => {
                (self.state, self.dirty) = match pending.previous {
                    Some((sheet, mode, dirty)) => (EditorState::Ready { sheet, mode }, dirty),
                    None => (EditorState::Empty, false),
                };
                self.last_error = Some(e.user_message());
                Err(EditorError::Generation(e))
            }
        }
    }

    /// Runs one cancellable generation from the current form.
    pub async fn generate(
        &mut self,
        generator: &SheetGenerator,
        token: &CancellationToken,
    ) -> Result<(), EditorError> {
        let ticket = self.begin_generation()?;
        let result = generator.generate_cancellable(&ticket.request, token).await;
        self.finish_generation(ticket, result)
    }

    //-------------------------------------------------------------------------------------
    // Editing
    //-------------------------------------------------------------------------------------

    pub fn edit(&mut self, field: SheetField) -> Result<(), EditorError> {
        let EditorState::Ready { sheet, .. } = &mut self.state else {
            return Err(self.invalid("edit the sheet"));
        };
        field.apply(sheet)?;
        self.dirty = true;
        Ok(())
    }

    pub fn set_mode(&mut self, new_mode: ViewMode) -> Result<ViewMode, EditorError> {
        let EditorState::Ready { mode, .. } = &mut self.state else {
            return Err(self.invalid("change the view mode"));
        };
        *mode = new_mode;
        Ok(new_mode)
    }

    pub fn toggle_mode(&mut self) -> Result<ViewMode, EditorError> {
        let current = self.mode().ok_or_else(|| self.invalid("change the view mode"))?;
        self.set_mode(current.toggled())
    }

    //-------------------------------------------------------------------------------------
    // Save and Export
    //-------------------------------------------------------------------------------------

    /// Writes the sheet to the store (update when its id is already stored,
    /// add otherwise) and enters `Saved`. A failed write keeps the editor ready.
    pub async fn save(&mut self, store: &mut SheetStore) -> Result<SaveReceipt, EditorError> {
        let sheet = self.sheet().cloned().ok_or_else(|| self.invalid("save"))?;
        let sheet_id = sheet.id.clone();

        let kind = store.upsert(sheet).await?;
        info!("Sheet {} saved ({:?}).", sheet_id, kind);

        self.state = EditorState::Saved {
            sheet_id: sheet_id.clone(),
        };
        self.dirty = false;
        Ok(SaveReceipt {
            sheet_id,
            kind,
            redirect_after: SAVE_REDIRECT_DELAY,
        })
    }

    /// Switches to the preview if needed and says how long to wait before
    /// exporting it.
    pub fn prepare_export(&mut self, kind: ExportKind) -> Result<ExportPlan, EditorError> {
        let EditorState::Ready { sheet, mode } = &mut self.state else {
            return Err(self.invalid("export"));
        };
        let switched_to_preview = *mode == ViewMode::Edit;
        *mode = ViewMode::Preview;

        Ok(ExportPlan {
            sheet: sheet.clone(),
            switched_to_preview,
            settle_delay: if switched_to_preview {
                kind.settle_delay()
            } else {
                Duration::ZERO
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Material, Step};
    use crate::store::MemoryRepository;
    use chrono::{SubsecRound, Utc};
    use std::sync::Arc;

    fn sheet(id: &str) -> Sheet {
        Sheet {
            id: SheetId::from(id),
            title: "La prière".to_string(),
            discipline: Some("Franco-Arabe".to_string()),
            subject: "Fiqh".to_string(),
            domain: "Franco-Arabe".to_string(),
            sub_domain: "Fiqh".to_string(),
            grade_level: GradeLevel::Ce1,
            competence: "CB".to_string(),
            level: "Palier 1".to_string(),
            oa: "OA".to_string(),
            content_summary: "Résumé".to_string(),
            specific_objective: "OS".to_string(),
            sheet_type: SheetType::Exercise,
            duration: "30 min".to_string(),
            material: Material::default(),
            reference: String::new(),
            steps: vec![Step {
                name: "Mise en train".to_string(),
                ..Step::default()
            }],
            created_at: Utc::now().trunc_subsecs(3),
        }
    }

    fn filled_form() -> GenerationForm {
        GenerationForm {
            activity: "Grammaire".to_string(),
            topic: "Le pluriel des noms".to_string(),
            ..GenerationForm::default()
        }
    }

    #[test]
    fn form_defaults_match_the_create_screen() {
        let form = GenerationForm::default();
        assert_eq!(form.grade_level, GradeLevel::Cm2);
        assert_eq!(form.languages, vec!["Français".to_string()]);
        assert_eq!(form.sheet_type, SheetType::Lesson);
    }

    #[test]
    fn blank_activity_or_topic_is_rejected_without_state_change() {
        let mut editor = Editor::new();
        editor
            .set_form(GenerationForm {
                topic: "Le pluriel".to_string(),
                activity: "   ".to_string(),
                ..GenerationForm::default()
            })
            .unwrap();

        let err = editor.begin_generation().unwrap_err();
        assert!(matches!(
            err,
            EditorError::Validation(ValidationError::MissingActivityOrTopic)
        ));
        assert_eq!(editor.state(), &EditorState::Empty);
        assert!(editor.last_error().is_none());
    }

    #[test]
    fn empty_language_list_is_a_validation_error() {
        let mut editor = Editor::new();
        let mut form = filled_form();
        form.languages.clear();
        editor.set_form(form).unwrap();
        assert!(matches!(
            editor.begin_generation().unwrap_err(),
            EditorError::Validation(ValidationError::Languages(_))
        ));
    }

    #[test]
    fn success_shows_the_new_sheet_in_preview() {
        let mut editor = Editor::new();
        editor.set_form(filled_form()).unwrap();

        let ticket = editor.begin_generation().unwrap();
        assert!(editor.is_busy());
        assert!(matches!(editor.begin_generation(), Err(EditorError::Busy)));

        editor.finish_generation(ticket, Ok(sheet("new"))).unwrap();
        assert_eq!(editor.mode(), Some(ViewMode::Preview));
        assert_eq!(editor.sheet().unwrap().id.as_str(), "new");
    }

    #[test]
    fn failure_from_empty_returns_to_empty_and_keeps_the_form() {
        let mut editor = Editor::new();
        editor.set_form(filled_form()).unwrap();

        let ticket = editor.begin_generation().unwrap();
        let err = editor
            .finish_generation(ticket, Err(GenerationError::EmptyResponse))
            .unwrap_err();

        assert!(matches!(err, EditorError::Generation(GenerationError::EmptyResponse)));
        assert_eq!(editor.state(), &EditorState::Empty);
        assert_eq!(editor.form(), &filled_form());
        assert!(editor.last_error().is_some());
    }

    #[test]
    fn failed_regeneration_restores_the_previous_sheet_and_edits() {
        let mut editor = Editor::open(sheet("kept"));
        editor.edit(SheetField::Title("Titre modifié".to_string())).unwrap();

        let ticket = editor.begin_generation().unwrap();
        assert!(editor.sheet().is_none());
        let _ = editor.finish_generation(ticket, Err(GenerationError::Upstream("503".to_string())));

        assert_eq!(editor.sheet().unwrap().title, "Titre modifié");
        assert_eq!(editor.mode(), Some(ViewMode::Edit));
        assert!(editor.is_dirty());
        assert_eq!(editor.last_error(), Some("503"));
    }

    #[test]
    fn successful_regeneration_discards_unsaved_edits() {
        let mut editor = Editor::open(sheet("old"));
        editor.edit(SheetField::Title("Modifié".to_string())).unwrap();

        let ticket = editor.begin_generation().unwrap();
        editor.finish_generation(ticket, Ok(sheet("fresh"))).unwrap();

        assert_eq!(editor.sheet().unwrap().id.as_str(), "fresh");
        assert_eq!(editor.sheet().unwrap().title, "La prière");
        assert!(!editor.is_dirty());
    }

    #[test]
    fn stale_ticket_is_discarded() {
        let mut editor = Editor::new();
        editor.set_form(filled_form()).unwrap();

        let stale = editor.begin_generation().unwrap();
        let forged = GenerationTicket {
            seq: stale.seq + 1,
            request: stale.request.clone(),
        };
        assert!(matches!(
            editor.finish_generation(forged, Ok(sheet("x"))),
            Err(EditorError::StaleGeneration)
        ));
        assert!(editor.is_busy());

        editor.finish_generation(stale, Ok(sheet("y"))).unwrap();
        assert_eq!(editor.sheet().unwrap().id.as_str(), "y");
    }

    #[test]
    fn edits_apply_in_place_and_keep_the_mode() {
        let mut editor = Editor::open(sheet("s"));
        editor.set_mode(ViewMode::Preview).unwrap();

        editor.edit(SheetField::Competence("Nouvelle CB".to_string())).unwrap();
        editor
            .edit(SheetField::Step {
                index: 0,
                part: StepPart::TeacherActivity,
                value: "Fait observer".to_string(),
            })
            .unwrap();

        let sheet = editor.sheet().unwrap();
        assert_eq!(sheet.competence, "Nouvelle CB");
        assert_eq!(sheet.steps[0].teacher_activity, "Fait observer");
        assert_eq!(editor.mode(), Some(ViewMode::Preview));

        assert!(matches!(
            editor.edit(SheetField::Step {
                index: 5,
                part: StepPart::Name,
                value: String::new(),
            }),
            Err(EditorError::StepOutOfRange(5))
        ));
    }

    #[test]
    fn field_edits_decode_from_tagged_json() {
        let edit: SheetField =
            serde_json::from_str(r#"{"field": "specificObjective", "value": "OS 2"}"#).unwrap();
        assert_eq!(edit, SheetField::SpecificObjective("OS 2".to_string()));

        let edit: SheetField = serde_json::from_str(
            r#"{"field": "step", "value": {"index": 1, "part": "studentActivity", "value": "Lisent"}}"#,
        )
        .unwrap();
        assert!(matches!(edit, SheetField::Step { index: 1, part: StepPart::StudentActivity, .. }));
    }

    #[test]
    fn toggle_requires_a_sheet() {
        let mut editor = Editor::new();
        assert!(matches!(editor.toggle_mode(), Err(EditorError::InvalidState { .. })));

        let mut editor = Editor::open(sheet("s"));
        assert_eq!(editor.toggle_mode().unwrap(), ViewMode::Preview);
        assert_eq!(editor.toggle_mode().unwrap(), ViewMode::Edit);
    }

    #[test]
    fn opening_a_sheet_seeds_the_form() {
        let editor = Editor::open(sheet("s"));
        let form = editor.form();
        assert_eq!(form.activity, "Fiqh");
        assert_eq!(form.topic, "La prière");
        assert_eq!(form.grade_level, GradeLevel::Ce1);
        assert_eq!(form.sheet_type, SheetType::Exercise);
        assert_eq!(editor.mode(), Some(ViewMode::Edit));
    }

    #[test]
    fn export_from_edit_mode_switches_and_waits() {
        let mut editor = Editor::open(sheet("s"));

        let plan = editor.prepare_export(ExportKind::Print).unwrap();
        assert!(plan.switched_to_preview);
        assert_eq!(plan.settle_delay, Duration::from_millis(500));
        assert_eq!(editor.mode(), Some(ViewMode::Preview));

        let plan = editor.prepare_export(ExportKind::Pdf).unwrap();
        assert!(!plan.switched_to_preview);
        assert_eq!(plan.settle_delay, Duration::ZERO);
    }

    #[tokio::test]
    async fn save_adds_new_sheets_and_updates_stored_ones() {
        let mut store = SheetStore::open(Arc::new(MemoryRepository::new())).await;

        let mut editor = Editor::new();
        editor.set_form(filled_form()).unwrap();
        let ticket = editor.begin_generation().unwrap();
        editor.finish_generation(ticket, Ok(sheet("g1"))).unwrap();

        let receipt = editor.save(&mut store).await.unwrap();
        assert_eq!(receipt.kind, SaveKind::Added);
        assert_eq!(receipt.redirect_after, SAVE_REDIRECT_DELAY);
        assert!(matches!(editor.state(), EditorState::Saved { .. }));
        assert!(matches!(editor.edit(SheetField::Oa(String::new())), Err(EditorError::InvalidState { .. })));

        let mut editor = Editor::open(store.get(&SheetId::from("g1")).unwrap().clone());
        editor.edit(SheetField::Duration("1 h".to_string())).unwrap();
        assert_eq!(store.get(&SheetId::from("g1")).unwrap().duration, "30 min");

        let receipt = editor.save(&mut store).await.unwrap();
        assert_eq!(receipt.kind, SaveKind::Updated);
        assert_eq!(store.len(), 1);
        assert_eq!(store.get(&SheetId::from("g1")).unwrap().duration, "1 h");
    }

    #[tokio::test]
    async fn save_without_a_sheet_is_rejected() {
        let mut store = SheetStore::open(Arc::new(MemoryRepository::new())).await;
        let mut editor = Editor::new();
        assert!(matches!(
            editor.save(&mut store).await,
            Err(EditorError::InvalidState { action: "save", state: "empty" })
        ));
    }
}
