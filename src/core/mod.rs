//! Core module - runtime concerns: values, drafts, config and the wizard

pub mod config;
pub mod draft;
pub mod values;
pub mod wizard;

pub use config::{Config, StoreKind};
pub use draft::{
    Draft, DraftError, DraftKey, DraftStore, DraftSummary, FileDraftStore, MemoryDraftStore,
    RestoreReport, SqliteDraftStore,
};
pub use values::{AttachmentRef, FieldValue, FormValues};
pub use wizard::{
    Direction, FieldView, Finalize, FinalizeError, Navigation, OutboxFinalizer, Submission,
    SubmissionError, SubmissionStatus, Wizard, WizardError, WizardState,
};
