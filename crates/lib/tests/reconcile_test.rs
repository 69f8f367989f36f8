//! # Reconciliation Integration Tests
//!
//! Exercises parse + match together on realistic completion output.

use autoscribe::{
    match_fields, parse_answer_block, reconcile, reconcile_with_follow_up, FieldDescriptor,
    ResolvedFieldValue, COMPLETION_FAILED_SENTINEL,
};

fn employee_fields() -> Vec<FieldDescriptor> {
    vec![
        FieldDescriptor::text("Name"),
        FieldDescriptor::text("DOB"),
        FieldDescriptor::text("SSN"),
    ]
}

#[test]
fn test_employee_answers_fill_only_answered_fields() {
    let blob = "Name>>Employee Name: Smith, Jane\nDOB>>Date of Birth: 06/25/1982";

    let values = reconcile(blob, &employee_fields());

    assert_eq!(
        values,
        vec![
            ResolvedFieldValue::new("Name", "Smith, Jane"),
            ResolvedFieldValue::new("DOB", "06/25/1982"),
        ]
    );
    assert!(values.iter().all(|v| v.name != "SSN"));
}

#[test]
fn test_toggle_answer_must_be_an_allowed_state() {
    let fields = vec![FieldDescriptor::toggle("Surgery", ["Yes", "No"])];

    assert_eq!(
        reconcile("Surgery>>Surgery performed: Yes", &fields),
        vec![ResolvedFieldValue::new("Surgery", "Yes")]
    );
    assert!(reconcile("Surgery>>Surgery performed: Maybe", &fields).is_empty());
}

#[test]
fn test_rematching_is_idempotent() {
    let fields = vec![
        FieldDescriptor::text("Name"),
        FieldDescriptor::toggle("Surgery", ["Yes", "No"]),
        FieldDescriptor::unconstrained_toggle("Consent"),
    ];
    let blob = "- Name>> Employee Name: Smith, Jane\n\
                * Surgery>> Surgery performed: No\n\
                Consent>> Patient consents: On";
    let block = parse_answer_block(blob);

    let first = match_fields(&block, &fields);
    let second = match_fields(&block, &fields);

    assert_eq!(first, second);
    assert_eq!(first.len(), 3);
}

#[test]
fn test_never_invents_field_names() {
    let fields = employee_fields();
    let blob = "Name>> Employee Name: Smith, Jane\n\
                Employer>> Employer name: ACME\n\
                Phone number: 555-0100\n\
                name>> lowercase variant: Someone Else\n\
                ---\n\
                12345";

    let values = reconcile(blob, &fields);

    let declared: Vec<&str> = fields.iter().map(|f| f.name.as_str()).collect();
    assert!(values.iter().all(|v| declared.contains(&v.name.as_str())));
    assert_eq!(values, vec![ResolvedFieldValue::new("Name", "Smith, Jane")]);
}

#[test]
fn test_repeated_field_takes_last_answer() {
    let blob = "Name>> Employee Name: Smith, Jane\n\
                DOB>> Date of Birth: N/A\n\
                Name>> Employee Name (corrected): Smith, Janet";

    let block = parse_answer_block(blob);
    assert_eq!(block.len(), 2);
    assert_eq!(block.get_index(0), Some((&"Name".to_string(), &"Smith, Janet".to_string())));

    let values = reconcile(blob, &employee_fields());
    assert_eq!(values[0], ResolvedFieldValue::new("Name", "Smith, Janet"));
}

#[test]
fn test_unanswered_marker_survives_reconciliation() {
    let values = reconcile("SSN>> Social Security Number: N/A", &employee_fields());

    assert_eq!(values, vec![ResolvedFieldValue::new("SSN", "N/A")]);
    assert!(values[0].is_unanswered());
}

#[test]
fn test_question_with_options_uses_answer_after_last_colon() {
    let fields = vec![FieldDescriptor::toggle("Prognosis", ["Improve", "Same", "Worse"])];
    let blob = "3. Prognosis>> Prognosis | Choice options : Improve , Same , Worse: Same";

    assert_eq!(
        reconcile(blob, &fields),
        vec![ResolvedFieldValue::new("Prognosis", "Same")]
    );
}

#[test]
fn test_failure_sentinel_resolves_nothing() {
    assert!(reconcile(COMPLETION_FAILED_SENTINEL, &employee_fields()).is_empty());
}

#[test]
fn test_unanswered_follow_up_never_replaces_answer() {
    let values = reconcile_with_follow_up(
        "Name>> Name: Smith, Jane\nDOB>> Date of Birth: N/A",
        "Name>> Name: N/A\nDOB>> Date of Birth: 06/25/1982",
        &employee_fields(),
    );

    assert_eq!(
        values,
        vec![
            ResolvedFieldValue::new("Name", "Smith, Jane"),
            ResolvedFieldValue::new("DOB", "06/25/1982"),
        ]
    );
}

#[test]
fn test_failed_follow_up_leaves_answers_untouched() {
    let blob = "Name>> Name: Smith, Jane\nSSN>> Social Security Number: N/A";
    assert_eq!(
        reconcile_with_follow_up(blob, COMPLETION_FAILED_SENTINEL, &employee_fields()),
        reconcile(blob, &employee_fields())
    );
}
