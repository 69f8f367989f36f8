//! # Field Matcher
//!
//! Restricts parsed answers to the fields a document actually declares and applies
//! the kind-specific validity rule.

use crate::types::{AnswerBlock, FieldDescriptor, FieldKind, ResolvedFieldValue};
use tracing::debug;

/// Matches parsed answers against the document's fields.
///
/// The output follows document field order, not answer order. Answers naming a field
/// the document lacks are dropped silently, and fields without an answer are left
/// out so they keep their current state.
///
/// Toggle answers are accepted when the field exposes no states, or when the answer
/// equals one of them exactly.
pub fn match_fields(answers: &AnswerBlock, fields: &[FieldDescriptor]) -> Vec<ResolvedFieldValue> {
    let mut resolved = Vec::new();

    for field in fields {
        let Some(answer) = answers.get(&field.name) else {
            continue;
        };

        let accepted = match &field.kind {
            FieldKind::Text => true,
            FieldKind::Toggle => match &field.allowed_values {
                None => true,
                Some(states) => states.contains(answer),
            },
            FieldKind::Unsupported(_) => false,
        };

        if accepted {
            resolved.push(ResolvedFieldValue::new(field.name.clone(), answer.clone()));
        } else {
            debug!(
                "Dropping answer '{}' for {} field '{}'.",
                answer, field.kind, field.name
            );
        }
    }

    if resolved.len() < answers.len() {
        debug!(
            "{} of {} parsed answers matched a document field.",
            resolved.len(),
            answers.len()
        );
    }

    resolved
}
