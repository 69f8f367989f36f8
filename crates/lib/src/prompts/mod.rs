//! # Prompt Templates
//!
//! Default prompts for every pipeline stage live in [`forms`]. They can be overridden
//! per task through configuration; placeholders are written as `{name}`.

pub mod forms;

use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

static RE_PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{(\w+)\}").expect("valid placeholder regex"));

/// The system and user templates for one pipeline stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskPrompts {
    pub system: String,
    pub user: String,
}

impl TaskPrompts {
    pub fn new(system: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            user: user.into(),
        }
    }

    /// Fills `{key}` placeholders in the user template.
    pub fn render_user(&self, values: &[(&str, &str)]) -> String {
        render(&self.user, values)
    }
}

/// Replaces each `{key}` in `template` with its value in a single pass.
///
/// Substituted values are never scanned again, so braces inside an EMR or a
/// conversation reach the model verbatim.
pub fn render(template: &str, values: &[(&str, &str)]) -> String {
    RE_PLACEHOLDER
        .replace_all(template, |caps: &Captures| {
            values
                .iter()
                .find(|(key, _)| *key == &caps[1])
                .map_or_else(|| caps[0].to_string(), |(_, value)| value.to_string())
        })
        .into_owned()
}
