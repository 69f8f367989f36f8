//! # Answer Block Parser
//!
//! Turns the completion service's answer output into an ordered `field name -> answer`
//! mapping. Each line follows the loose grammar
//!
//! ```text
//! <noise>* <field name> >> <question text> : <answer>
//! ```
//!
//! where `<noise>` is any run of non-letter characters (bullets, dashes, numbering)
//! the model likes to prepend.

use crate::completion::COMPLETION_FAILED_SENTINEL;
use crate::types::{AnswerBlock, AnswerEntry};
use regex::Regex;
use std::sync::LazyLock;
use thiserror::Error;
use tracing::{debug, warn};

/// The token separating a field name from the question text.
pub const FIELD_DELIMITER: &str = ">>";

static RE_LEADING_NOISE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\P{L}+").expect("valid leading noise regex"));
static RE_DELIMITED_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?P<name>.*?)>>").expect("valid field name regex"));
static RE_BARE_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?P<name>[^:]*)").expect("valid bare name regex"));
static RE_ANSWER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r":(?P<answer>[^:]*)$").expect("valid answer regex"));

/// A line that could not be split into a usable field name and answer.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseAmbiguity {
    #[error("line is empty")]
    EmptyLine,
    #[error("no field name in line '{0}'")]
    MissingFieldName(String),
}

/// Parses a single answer line.
///
/// Lines without `>>` fall back to the text before the first `:` as the field name;
/// such names rarely match a document field and are dropped by the matcher. A line
/// without any `:` yields an empty answer.
pub fn parse_line(line: &str) -> Result<AnswerEntry, ParseAmbiguity> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Err(ParseAmbiguity::EmptyLine);
    }

    let stripped = RE_LEADING_NOISE.replace(trimmed, "");

    let field_name = RE_DELIMITED_NAME
        .captures(&stripped)
        .or_else(|| RE_BARE_NAME.captures(&stripped))
        .and_then(|caps| caps.name("name"))
        .map(|m| m.as_str().trim().to_string())
        .unwrap_or_default();

    if field_name.is_empty() {
        return Err(ParseAmbiguity::MissingFieldName(trimmed.to_string()));
    }

    let answer_text = RE_ANSWER
        .captures(&stripped)
        .and_then(|caps| caps.name("answer"))
        .map(|m| m.as_str().trim().to_string())
        .unwrap_or_default();

    Ok(AnswerEntry {
        field_name,
        answer_text,
    })
}

/// Parses a whole answer block.
///
/// Ambiguous lines are dropped. When a field name appears on several lines the last
/// one wins; the name keeps the position of its first occurrence.
pub fn parse_answer_block(text: &str) -> AnswerBlock {
    let mut block = AnswerBlock::new();

    if text.trim() == COMPLETION_FAILED_SENTINEL {
        warn!("Answer block is the completion failure sentinel; nothing to reconcile.");
        return block;
    }

    for (line_no, line) in text.lines().enumerate() {
        match parse_line(line) {
            Ok(entry) => {
                if let Some(previous) = block.insert(entry.field_name.clone(), entry.answer_text) {
                    debug!(
                        "Line {}: field '{}' repeated, replacing earlier answer '{}'.",
                        line_no + 1,
                        entry.field_name,
                        previous
                    );
                }
            }
            Err(ParseAmbiguity::EmptyLine) => {}
            Err(e) => debug!("Line {}: dropped, {}", line_no + 1, e),
        }
    }

    debug!("Parsed {} answer entries.", block.len());
    block
}
