//! # Answer Reconciliation
//!
//! Maps the completion service's free-text answers onto a document's declared fields.

pub mod matcher;
pub mod parser;

pub use matcher::match_fields;
pub use parser::{parse_answer_block, parse_line, ParseAmbiguity, FIELD_DELIMITER};

use crate::types::{is_unanswered, AnswerBlock, FieldDescriptor, ResolvedFieldValue};
use tracing::{debug, info};

/// Parses an answer blob and matches it against the document's fields.
pub fn reconcile(answer_blob: &str, fields: &[FieldDescriptor]) -> Vec<ResolvedFieldValue> {
    let answers = parse_answer_block(answer_blob);
    let resolved = match_fields(&answers, fields);
    info!(
        "Reconciled {} parsed answers against {} document fields: {} matched.",
        answers.len(),
        fields.len(),
        resolved.len()
    );
    resolved
}

/// Folds follow-up answers into an earlier answer block.
///
/// An answered follow-up entry replaces the earlier answer. An unanswered one (blank
/// or `N/A`) is only added for fields the block does not mention yet, so it never
/// overwrites a real answer.
pub fn merge_follow_up(answers: &mut AnswerBlock, follow_up: AnswerBlock) {
    for (field, answer) in follow_up {
        if !is_unanswered(&answer) {
            answers.insert(field, answer);
        } else if answers.contains_key(&field) {
            debug!("Keeping earlier answer for '{}' over unanswered follow-up.", field);
        } else {
            answers.insert(field, answer);
        }
    }
}

/// Like [`reconcile`], with follow-up answers merged through [`merge_follow_up`].
pub fn reconcile_with_follow_up(
    answer_blob: &str,
    follow_up_blob: &str,
    fields: &[FieldDescriptor],
) -> Vec<ResolvedFieldValue> {
    let mut answers = parse_answer_block(answer_blob);
    merge_follow_up(&mut answers, parse_answer_block(follow_up_blob));
    let resolved = match_fields(&answers, fields);
    info!(
        "Reconciled {} answers (with follow-up) against {} document fields: {} matched.",
        answers.len(),
        fields.len(),
        resolved.len()
    );
    resolved
}
