//! # Form Pipeline Stages
//!
//! The completion-backed stages that run before reconciliation:
//! 1.  **Question extraction**: one request per page, sequentially, turning page text
//!     and the form's field names into `FieldName>> Question` lines.
//! 2.  **Answer prediction**: all questions plus the EMR text, answered in one request.
//! 3.  **Unanswered follow-up**: asks which questions the prediction left open.
//! 4.  **Conversation answering**: answers follow-up questions from a conversation.
//!
//! Stages that produce answers never fail; a completion failure yields
//! [`COMPLETION_FAILED_SENTINEL`](crate::COMPLETION_FAILED_SENTINEL), which
//! reconciliation treats as an empty answer block.

use crate::{
    completion::CompletionClient,
    prompts::{forms::*, TaskPrompts},
};
use tracing::{debug, info, instrument, warn};

/// Prompts for every stage, defaulting to [`crate::prompts::forms`].
#[derive(Debug, Clone)]
pub struct PipelinePrompts {
    pub question_extraction: TaskPrompts,
    pub answer_prediction: TaskPrompts,
    pub unanswered_questions: TaskPrompts,
    pub conversation_answering: TaskPrompts,
}

impl Default for PipelinePrompts {
    fn default() -> Self {
        Self {
            question_extraction: TaskPrompts::new(
                QUESTION_EXTRACTION_SYSTEM_PROMPT,
                QUESTION_EXTRACTION_USER_PROMPT,
            ),
            answer_prediction: TaskPrompts::new(
                ANSWER_PREDICTION_SYSTEM_PROMPT,
                ANSWER_PREDICTION_USER_PROMPT,
            ),
            unanswered_questions: TaskPrompts::new(
                UNANSWERED_QUESTIONS_SYSTEM_PROMPT,
                UNANSWERED_QUESTIONS_USER_PROMPT,
            ),
            conversation_answering: TaskPrompts::new(
                CONVERSATION_ANSWERING_SYSTEM_PROMPT,
                CONVERSATION_ANSWERING_USER_PROMPT,
            ),
        }
    }
}

/// The answer prediction request together with its reply.
///
/// The rendered query is kept because the follow-up stage quotes it.
#[derive(Debug, Clone)]
pub struct Prediction {
    pub query: String,
    pub answers: String,
}

/// Extracts the questions of each page.
///
/// Returns one block of question lines per page that produced any. Pages without
/// text, and pages whose request failed, are logged and skipped.
#[instrument(skip_all, fields(pages = pages.len(), fields = field_names.len()))]
pub async fn extract_questions(
    client: &CompletionClient,
    prompts: &TaskPrompts,
    field_names: &[String],
    pages: &[String],
) -> Vec<String> {
    let names = field_names.join("|");
    let mut questions = Vec::new();

    for (index, page_text) in pages.iter().enumerate() {
        let page_number = (index + 1).to_string();
        if page_text.trim().is_empty() {
            warn!("Page {} has no extractable text; skipping.", page_number);
            continue;
        }

        let user_prompt = prompts.render_user(&[
            ("field_names", names.as_str()),
            ("page_number", page_number.as_str()),
            ("page_text", page_text.as_str()),
        ]);
        debug!("--> Extracting questions from page {}", page_number);

        match client.complete(&prompts.system, &user_prompt).await {
            Ok(text) => questions.push(text.trim().to_string()),
            Err(e) => warn!("Question extraction failed for page {}: {}", page_number, e),
        }
    }

    info!(
        "Extracted questions from {} of {} pages.",
        questions.len(),
        pages.len()
    );
    questions
}

/// Answers the extracted questions from the EMR text.
#[instrument(skip_all, fields(question_blocks = questions.len(), emr_len = emr.len()))]
pub async fn predict_answers(
    client: &CompletionClient,
    prompts: &TaskPrompts,
    questions: &[String],
    emr: &str,
) -> Prediction {
    let joined = questions.join("\n");
    let query = prompts.render_user(&[("emr", emr), ("questions", joined.as_str())]);
    let answers = client.complete_or_sentinel(&prompts.system, &query).await;
    Prediction { query, answers }
}

/// Asks which questions of `query` the `answered` text left open.
pub async fn list_unanswered_questions(
    client: &CompletionClient,
    prompts: &TaskPrompts,
    query: &str,
    answered: &str,
) -> String {
    let user_prompt = prompts.render_user(&[("query", query), ("answered", answered)]);
    client.complete_or_sentinel(&prompts.system, &user_prompt).await
}

/// Answers follow-up questions from a conversation transcript.
pub async fn answer_from_conversation(
    client: &CompletionClient,
    prompts: &TaskPrompts,
    conversation: &str,
    unanswered: &str,
) -> String {
    let user_prompt = prompts.render_user(&[
        ("conversation", conversation),
        ("unanswered", unanswered),
    ]);
    client.complete_or_sentinel(&prompts.system, &user_prompt).await
}

/// Formats the follow-up list the way it is saved for the clinician.
pub fn format_follow_up(unanswered: &str) -> String {
    format!("{UNANSWERED_QUESTIONS_HEADER}\n\n{unanswered}")
}
