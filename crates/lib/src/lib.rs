//! # autoscribe
//!
//! Core library for answering fillable PDF forms with a chat-completion service.
//!
//! The library is split along the pipeline it implements:
//! - [`reconcile`] turns the completion service's free-text answer block into
//!   typed field values for a concrete document.
//! - [`fill`] applies those values one field at a time through a [`fill::FormBackend`],
//!   isolating per-field failures.
//! - [`completion`] and [`providers`] wrap the completion service itself.
//! - [`pipeline`] and [`prompts`] hold the upstream stages (question extraction,
//!   answer prediction, follow-up questions).

pub mod cache;
pub mod completion;
pub mod errors;
pub mod fill;
pub mod pipeline;
pub mod prompts;
pub mod providers;
pub mod questionnaire;
pub mod reconcile;
pub mod types;

pub use completion::{CompletionClient, CompletionOptions, COMPLETION_FAILED_SENTINEL};
pub use errors::{FormError, PromptError};
pub use fill::{FormBackend, SelectiveFormFiller};
pub use reconcile::{
    match_fields, merge_follow_up, parse_answer_block, reconcile, reconcile_with_follow_up,
};
pub use types::{
    AnswerBlock, AnswerEntry, FieldDescriptor, FieldKind, FieldWriteFailure, FillReport,
    ResolvedFieldValue,
};
