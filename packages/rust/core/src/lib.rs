//! Import orchestration for confnotes.
//!
//! This crate ties page extraction, author aggregation and note output into
//! the session and presentation import workflows (see [`pipeline`]).

pub mod authors;
pub mod extract;
pub mod pipeline;
pub mod writer;

pub use authors::AuthorList;
pub use extract::{ChildRow, PresentationPage, extract_presentation, extract_session};
pub use pipeline::{
    FailedUrl, ImportReport, Importer, ProgressReporter, RecordingProgress, SilentProgress,
    entry_kind, import_batch,
};
pub use writer::{NoteState, NoteWriter, WriteOutcome, archive_existing};
