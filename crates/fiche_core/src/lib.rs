pub mod domain;
pub mod editor;
pub mod export;
pub mod generation;
pub mod ports;
pub mod render;
pub mod store;

pub use domain::{
    GenerationRequest, GradeLevel, Languages, Material, Sheet, SheetId, SheetType, Step,
};
pub use editor::{
    Editor, EditorError, EditorState, ExportPlan, GenerationForm, SaveReceipt, SheetField, StepPart,
    ValidationError, ViewMode, SAVE_REDIRECT_DELAY,
};
pub use export::{export_sheet, ExportArtifact, ExportError, ExportKind};
pub use generation::{GenerationError, SheetGenerator};
pub use ports::{
    CompletionPrompt, CompletionService, PdfOptions, PdfRenderer, PortError, PortResult,
    SheetRepository,
};
pub use store::{MemoryRepository, SaveKind, SheetStore};
