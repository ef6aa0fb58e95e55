pub mod file_store;
pub mod pdf;
pub mod sheet_llm;

pub use file_store::JsonFileRepository;
pub use pdf::CommandPdfRenderer;
pub use sheet_llm::OpenAiCompletionAdapter;
