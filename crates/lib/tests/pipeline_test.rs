//! # Pipeline Stage Tests
//!
//! Runs the completion-backed stages against mock providers and feeds their output
//! through reconciliation, the way the CLI chains them.

mod common;

use autoscribe::pipeline::{
    answer_from_conversation, extract_questions, format_follow_up, list_unanswered_questions,
    predict_answers, PipelinePrompts,
};
use autoscribe::prompts::forms::UNANSWERED_QUESTIONS_HEADER;
use autoscribe::{
    reconcile, reconcile_with_follow_up, FieldDescriptor, ResolvedFieldValue,
    COMPLETION_FAILED_SENTINEL,
};
use autoscribe_test_utils::{MockAiProvider, ScriptedAiProvider};
use common::{setup_tracing, test_client};

fn names(fields: &[&str]) -> Vec<String> {
    fields.iter().map(|f| f.to_string()).collect()
}

#[tokio::test]
async fn test_extract_questions_per_page() {
    setup_tracing();
    let provider = ScriptedAiProvider::new([
        "Name>> Employee Name\nDOB>> Date of Birth\n",
        "Surgery>> Surgery performed | Checkbox options : Yes , No",
    ]);
    let client = test_client(provider.clone());
    let prompts = PipelinePrompts::default();
    let pages = vec![
        "Employee Name\nDate of Birth".to_string(),
        "   ".to_string(),
        "Surgery performed".to_string(),
    ];

    let questions = extract_questions(
        &client,
        &prompts.question_extraction,
        &names(&["Name", "DOB", "Surgery"]),
        &pages,
    )
    .await;

    assert_eq!(
        questions,
        vec![
            "Name>> Employee Name\nDOB>> Date of Birth".to_string(),
            "Surgery>> Surgery performed | Checkbox options : Yes , No".to_string(),
        ]
    );

    // The blank page never reached the provider.
    let calls = provider.get_calls();
    assert_eq!(calls.len(), 2);
    assert!(calls[0].1.contains("page 1 of a form"));
    assert!(calls[0].1.contains("\"Name|DOB|Surgery\""));
    assert!(calls[0].1.contains("Employee Name\nDate of Birth"));
    assert!(calls[1].1.contains("page 3 of a form"));
}

#[tokio::test]
async fn test_extract_questions_skips_failed_pages() {
    setup_tracing();
    let provider = ScriptedAiProvider::new(Vec::<String>::new());
    provider.push_failure(400, "bad request");
    provider.push_response("DOB>> Date of Birth");
    let client = test_client(provider.clone());

    let questions = extract_questions(
        &client,
        &PipelinePrompts::default().question_extraction,
        &names(&["DOB"]),
        &["page one".to_string(), "page two".to_string()],
    )
    .await;

    assert_eq!(questions, vec!["DOB>> Date of Birth".to_string()]);
    assert_eq!(provider.get_calls().len(), 2);
}

#[tokio::test]
async fn test_predicted_answers_reconcile_against_form() {
    setup_tracing();
    let provider = MockAiProvider::new();
    provider.add_response(
        "You answer questions about a medical form",
        "1. Name>> Employee Name: Smith, Jane\n\
         2. DOB>> Date of Birth: N/A\n\
         3. Surgery>> Surgery performed | Checkbox options : Yes , No: Yes",
    );
    let client = test_client(provider.clone());
    let questions = vec!["Name>> Employee Name\nDOB>> Date of Birth".to_string()];

    let prediction = predict_answers(
        &client,
        &PipelinePrompts::default().answer_prediction,
        &questions,
        "Jane Smith, surgery in March.",
    )
    .await;

    assert!(prediction.query.contains("Jane Smith, surgery in March."));
    assert!(prediction.query.contains("Name>> Employee Name\nDOB>> Date of Birth"));
    assert_eq!(provider.get_calls()[0].1, prediction.query);

    let fields = vec![
        FieldDescriptor::text("Name"),
        FieldDescriptor::text("DOB"),
        FieldDescriptor::toggle("Surgery", ["Yes"]),
    ];
    assert_eq!(
        reconcile(&prediction.answers, &fields),
        vec![
            ResolvedFieldValue::new("Name", "Smith, Jane"),
            ResolvedFieldValue::new("DOB", "N/A"),
            ResolvedFieldValue::new("Surgery", "Yes"),
        ]
    );
}

#[tokio::test]
async fn test_prediction_failure_yields_sentinel() {
    setup_tracing();
    let client = test_client(MockAiProvider::new());

    let prediction = predict_answers(
        &client,
        &PipelinePrompts::default().answer_prediction,
        &["Name>> Employee Name".to_string()],
        "emr",
    )
    .await;

    assert_eq!(prediction.answers, COMPLETION_FAILED_SENTINEL);
    assert!(reconcile(&prediction.answers, &[FieldDescriptor::text("Name")]).is_empty());
}

#[tokio::test]
async fn test_follow_up_answers_override_predictions() {
    setup_tracing();
    let provider = MockAiProvider::new();
    provider.add_response("You are a helpful assistant.", "DOB>> Date of Birth");
    provider.add_response(
        "detailed medical conversations",
        "DOB>> Date of Birth: 06/25/1982",
    );
    let client = test_client(provider.clone());
    let prompts = PipelinePrompts::default();
    let query = "Questions:\nName>> Employee Name\nDOB>> Date of Birth";
    let answered = "Name>> Employee Name: Smith, Jane\nDOB>> Date of Birth: N/A";

    let unanswered =
        list_unanswered_questions(&client, &prompts.unanswered_questions, query, answered).await;
    assert_eq!(unanswered, "DOB>> Date of Birth");

    let follow_up = answer_from_conversation(
        &client,
        &prompts.conversation_answering,
        "Doctor: When were you born?\nPatient: June 25, 1982.",
        &unanswered,
    )
    .await;

    let calls = provider.get_calls();
    assert_eq!(calls.len(), 2);
    assert!(calls[0].1.contains(query));
    assert!(calls[0].1.contains(answered));
    assert!(calls[1].1.contains("Patient: June 25, 1982."));
    assert!(calls[1].1.contains("Unanswered Questions:\nDOB>> Date of Birth"));

    let fields = vec![FieldDescriptor::text("Name"), FieldDescriptor::text("DOB")];
    assert_eq!(
        reconcile_with_follow_up(answered, &follow_up, &fields),
        vec![
            ResolvedFieldValue::new("Name", "Smith, Jane"),
            ResolvedFieldValue::new("DOB", "06/25/1982"),
        ]
    );
}

#[test]
fn test_follow_up_file_layout() {
    let formatted = format_follow_up("DOB>> Date of Birth");
    assert_eq!(
        formatted,
        format!("{UNANSWERED_QUESTIONS_HEADER}\n\nDOB>> Date of Birth")
    );
}
