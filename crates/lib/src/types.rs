//! Shared data types for the reconciliation pipeline and provider configuration.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::path::PathBuf;

/// One parsed line of an answer block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerEntry {
    pub field_name: String,
    pub answer_text: String,
}

/// Parsed answers keyed by field name, in line order.
///
/// A name that repeats keeps its first position and takes the value of its last line.
pub type AnswerBlock = IndexMap<String, String>;

/// The kind of a form field, as declared by its `/FT` entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub enum FieldKind {
    /// Free-text field (`/Tx`).
    Text,
    /// Checkbox or radio button (`/Btn`).
    Toggle,
    /// Any other field type; carries the raw type name (empty if undeclared).
    Unsupported(String),
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldKind::Text => write!(f, "text"),
            FieldKind::Toggle => write!(f, "toggle"),
            FieldKind::Unsupported(raw) if raw.is_empty() => write!(f, "unsupported"),
            FieldKind::Unsupported(raw) => write!(f, "unsupported ({raw})"),
        }
    }
}

/// A field declared by the target document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldDescriptor {
    pub name: String,
    pub kind: FieldKind,
    /// Selectable appearance states of a toggle field, excluding `Off`.
    /// `None` when the field is not a toggle or exposes no states.
    pub allowed_values: Option<BTreeSet<String>>,
}

impl FieldDescriptor {
    pub fn text(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: FieldKind::Text,
            allowed_values: None,
        }
    }

    pub fn toggle<I, S>(name: impl Into<String>, allowed_values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            kind: FieldKind::Toggle,
            allowed_values: Some(allowed_values.into_iter().map(Into::into).collect()),
        }
    }

    /// A toggle whose states could not be determined; any answer is accepted.
    pub fn unconstrained_toggle(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: FieldKind::Toggle,
            allowed_values: None,
        }
    }
}

/// An answer that survived matching against a document field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedFieldValue {
    pub name: String,
    pub value: String,
}

impl ResolvedFieldValue {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }

    /// See [`is_unanswered`](crate::types::is_unanswered).
    pub fn is_unanswered(&self) -> bool {
        is_unanswered(&self.value)
    }
}

/// The literal the completion service is instructed to use for unanswered questions.
pub const UNANSWERED_MARKER: &str = "N/A";

/// Whether an answer carries no usable value: blank, or containing `N/A`.
///
/// A line without `:` parses to an empty answer, which must not clear a field.
pub fn is_unanswered(answer: &str) -> bool {
    answer.trim().is_empty() || answer.contains(UNANSWERED_MARKER)
}

/// A single field write that the backend rejected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldWriteFailure {
    pub field: String,
    pub reason: String,
}

/// Outcome of one selective fill pass.
#[derive(Debug, Clone, Default, Serialize)]
pub struct FillReport {
    /// The document holding every successfully written field.
    pub destination: PathBuf,
    /// Entries that were sent to the backend (everything except `N/A` answers).
    pub attempted: usize,
    /// Entries the backend accepted.
    pub applied: usize,
    /// Entries skipped because they carry the unanswered marker.
    pub skipped_unanswered: usize,
    pub failures: Vec<FieldWriteFailure>,
}

// --- Provider configuration ---

/// A reusable configuration for one completion service endpoint.
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct ProviderConfig {
    /// The type of provider ("azure", "local" or "gemini").
    pub provider: String,
    /// Endpoint base URL (Azure resource URL) or full API URL (local, gemini).
    #[serde(default)]
    pub api_url: Option<String>,
    #[serde(default)]
    pub api_key: Option<String>,
    /// Model name, or deployment name for Azure.
    #[serde(default)]
    pub model_name: Option<String>,
    /// Azure `api-version` query parameter.
    #[serde(default)]
    pub api_version: Option<String>,
}

/// Sampling parameters applied to every request a provider sends.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationSettings {
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            temperature: 0.0,
            max_tokens: 2000,
        }
    }
}
