//! # Form Prompts
//!
//! Default templates for the form pipeline. Answers must come back as
//! `FieldName>> Question: Answer`, one per line, with `N/A` for anything the source
//! text does not cover; the reconciliation parser depends on that shape.

// --- Question Extraction ---
pub const QUESTION_EXTRACTION_SYSTEM_PROMPT: &str = r#"You extract the questions of a fillable form. Reply with one line per question and nothing else."#;
pub const QUESTION_EXTRACTION_USER_PROMPT: &str = r#"Given the text of page {page_number} of a form and the form's field names "{field_names}" (separated by "|"):
Extract all and only the questions on this page (free fields, multiple choices, checkboxes). For each question, give the question text and the most relevant field name. If no field name matches, use "NONAME".
Use exactly these formats:
- Free field questions: "FieldName>> Question text"
- Checkbox questions: "FieldName>> Question text | Checkbox options : Option 1 , Option 2 , ..."
- Multiple choice questions: "FieldName>> Question text | Choice options : Choice A , Choice B , ..."

# Page text
{page_text}"#;

// --- Answer Prediction ---
pub const ANSWER_PREDICTION_SYSTEM_PROMPT: &str =
    r#"You answer questions about a medical form."#;
pub const ANSWER_PREDICTION_USER_PROMPT: &str = r#"Use the article below to fill in the form. There are three types of questions:
1. Free field questions: answer directly with the text.
2. Checkbox questions: answer with the option(s) that apply. For a single checkbox, answer "Yes" or "No".
3. Multiple choice questions: answer with the selected choice.
If the information needed to answer a question is not provided, answer "N/A". Include every original question in your reply, even unanswered ones, and keep the field name and question text unchanged.
Answer on one line per question, in this format: "Last name first in full>> Employee's Name (Last name first, in full): Smith, Jane"

Article:
"""
{emr}
"""

Questions:
"""
{questions}
"""
"#;

// --- Unanswered Follow-up ---
pub const UNANSWERED_QUESTIONS_SYSTEM_PROMPT: &str = r#"You are a helpful assistant."#;
pub const UNANSWERED_QUESTIONS_USER_PROMPT: &str = r#"Given the initial query:

{query}

And the response:

{answered}

List any questions that were not answered, preserving the original format of each question."#;

/// Header written above the follow-up list when it is saved to disk.
pub const UNANSWERED_QUESTIONS_HEADER: &str = "Follow-up Needed for Unanswered Questions:";

// --- Conversation Answering ---
pub const CONVERSATION_ANSWERING_SYSTEM_PROMPT: &str = r#"You are a helpful assistant capable of understanding detailed medical conversations and providing specific answers based on the context."#;
pub const CONVERSATION_ANSWERING_USER_PROMPT: &str = r#"Use the information below to answer the questions if possible.
There are three types of questions: free field, checkbox, and multiple choice.
Free field questions are followed by a long underline or have no answer choices; answer them on a new line.
Checkbox questions are followed by checkboxes; answer with the option(s) that apply.
Multiple choice questions are followed by a list of choices; answer with the correct choice on a new line.
If the answer is not provided in the conversation, answer "N/A". Include every original question in your reply, even unanswered ones, keeping the "FieldName>> Question: Answer" format.

Based on the instructions above and the following conversation, answer the unanswered questions.

Conversation:
{conversation}

Unanswered Questions:
{unanswered}"#;
