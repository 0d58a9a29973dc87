//! Destructive and Edge Case Tests
//!
//! Pathological templates, inputs and batch data. Every case must end in a
//! typed error or a sane value, never a hang or a panic.

use std::collections::HashMap;

use crate::core::automation::{
    apply_rules, AutomationRule, ConditionOperator, RuleAction, RuleActionType, RuleCondition,
};
use crate::core::batch::{BatchDataSource, BatchDriver, BatchJob, BatchJobStatus};
use crate::core::template::timing::resolve_timings;
use crate::core::template::{
    import_template, to_percent_position, to_pixel_position, validate_template, CanvasSettings,
    ElementContent, ElementDuration, ElementTiming, Interpreter, InterpreterOptions,
    PercentPosition, PlaceholderDefinition, PlaceholderInputs, PlaceholderType, Template,
    TemplateElement, TemplateTrack, TimingAnchor, TrackRole, TrackType, ValidationCode,
};
use crate::core::{CoreError, Size2D};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn text_element(id: &str, timing: ElementTiming) -> TemplateElement {
    TemplateElement::new(id, timing, ElementDuration::fixed(1.0), ElementContent::static_text(id))
        .with_id(id)
}

fn single_track(elements: Vec<TemplateElement>) -> Template {
    let mut track = TemplateTrack::new("Text", TrackType::Text, TrackRole::Overlay);
    track.elements = elements;
    Template::new("Edge", CanvasSettings::landscape_1080()).with_track(track)
}

#[test]
fn test_destructive_timing_cycle() {
    init_tracing();
    let template = single_track(vec![
        text_element("a", ElementTiming::relative("c", 0.0, TimingAnchor::End)),
        text_element("b", ElementTiming::relative("a", 0.0, TimingAnchor::End)),
        text_element("c", ElementTiming::relative("b", 0.0, TimingAnchor::End)),
    ]);

    let result = resolve_timings(&template, None, |_| Ok(1.0));
    assert!(matches!(result, Err(CoreError::UnresolvedTimingReference { .. })));

    let validation = validate_template(&template);
    assert!(validation
        .errors
        .iter()
        .any(|issue| issue.code == ValidationCode::CircularReference));
}

#[test]
fn test_destructive_self_reference() {
    let template = single_track(vec![text_element(
        "loop",
        ElementTiming::relative("loop", 1.0, TimingAnchor::Start),
    )]);
    assert!(matches!(
        resolve_timings(&template, None, |_| Ok(1.0)),
        Err(CoreError::UnresolvedTimingReference { element_id, .. }) if element_id == "loop"
    ));
}

#[test]
fn test_destructive_dangling_reference() {
    let template = single_track(vec![text_element(
        "orphan",
        ElementTiming::relative("ghost", 0.0, TimingAnchor::End),
    )]);
    assert!(resolve_timings(&template, None, |_| Ok(1.0)).is_err());
    assert!(validate_template(&template)
        .errors
        .iter()
        .any(|issue| issue.code == ValidationCode::OrphanedReference));
}

#[test]
fn test_destructive_deep_relative_chain() {
    // Long chains must not recurse.
    let depth = 10_000;
    let mut elements = vec![text_element("e0", ElementTiming::absolute(0.0))];
    for i in 1..depth {
        elements.push(text_element(
            &format!("e{}", i),
            ElementTiming::relative(format!("e{}", i - 1), 0.0, TimingAnchor::End),
        ));
    }
    // Reverse so dependencies appear after their dependents.
    elements.reverse();
    let template = single_track(elements);

    let timings = resolve_timings(&template, None, |_| Ok(1.0)).unwrap();
    assert_eq!(timings.len(), depth);
    let last = timings.get(&format!("e{}", depth - 1)).unwrap();
    assert_eq!(last.start_time, (depth - 1) as f64);
    assert!(validate_template(&template).is_valid());
}

#[test]
fn test_destructive_template_version() {
    let mut json = serde_json::to_value(single_track(Vec::new())).unwrap();
    json["version"] = serde_json::json!("2.0");
    assert!(matches!(
        import_template(&json.to_string()),
        Err(CoreError::InvalidTemplateFormat(_))
    ));

    json.as_object_mut().unwrap().remove("version");
    assert!(matches!(
        import_template(&json.to_string()),
        Err(CoreError::InvalidTemplateFormat(_))
    ));

    assert!(matches!(
        import_template("{\"version\": \"1.0\", \"tracks\": ["),
        Err(CoreError::InvalidTemplateFormat(_))
    ));
    assert!(import_template("").is_err());
}

#[test]
fn test_destructive_negative_fixed_duration() {
    let template = single_track(vec![TemplateElement::new(
        "neg",
        ElementTiming::absolute(0.0),
        ElementDuration::fixed(-3.0),
        ElementContent::static_text("neg"),
    )
    .with_id("neg")]);
    assert!(validate_template(&template)
        .errors
        .iter()
        .any(|issue| issue.code == ValidationCode::InvalidDuration));
}

#[test]
fn test_destructive_percent_round_trip_tiny_canvas() {
    // Size2D clamps zero dimensions to 1
    let size = Size2D::new(0, 0);
    let original = PercentPosition::new(37.5, -12.25);
    let back = to_percent_position(&to_pixel_position(&original, size), size);
    assert!((back.x_percent - original.x_percent).abs() < 1e-9);
    assert!((back.y_percent - original.y_percent).abs() < 1e-9);
}

#[tokio::test]
async fn test_destructive_empty_template_interprets() {
    let template = single_track(Vec::new());
    let project = Interpreter::new()
        .interpret(&template, &PlaceholderInputs::new(), &InterpreterOptions::default())
        .await
        .unwrap();
    assert_eq!(project.element_count(), 0);
    assert_eq!(project.duration, 0.0);
}

#[tokio::test]
async fn test_destructive_unknown_operator_leaves_project_untouched() {
    let template = single_track(vec![text_element("a", ElementTiming::absolute(0.0))]);
    let mut project = Interpreter::new()
        .interpret(&template, &PlaceholderInputs::new(), &InterpreterOptions::default())
        .await
        .unwrap();
    let before = project.clone();

    let rules = vec![
        AutomationRule::new("hide all").with_action(RuleAction::new(RuleActionType::SetHidden, true)),
        AutomationRule::new("fuzzy").with_condition(RuleCondition::new(
            "textContent",
            ConditionOperator::Other("matches_regex".to_string()),
            "a.*",
        )),
    ];
    assert!(matches!(
        apply_rules(&mut project, &rules),
        Err(CoreError::UnknownRuleOperator { operator, .. }) if operator == "matches_regex"
    ));
    assert_eq!(project, before);
}

#[test]
fn test_destructive_malformed_batch_rows() {
    init_tracing();
    let template = Template::new("Rows", CanvasSettings::vertical_1080())
        .with_placeholder(
            PlaceholderDefinition::new("Headline", PlaceholderType::Text)
                .with_id("headline")
                .with_required(true),
        )
        .with_placeholder(PlaceholderDefinition::new("Score", PlaceholderType::Number).with_id("score"))
        .with_track(
            TemplateTrack::new("Text", TrackType::Text, TrackRole::Title).with_element(
                TemplateElement::new(
                    "Headline",
                    ElementTiming::absolute(0.0),
                    ElementDuration::fixed(2.0),
                    ElementContent::placeholder("headline"),
                ),
            ),
        );

    let mut source = BatchDataSource::new(["headline", "score"])
        .with_row(["Fine", "3"])
        .with_row(["   ", "4"])
        .with_row(["Bad score", "three"])
        .with_mapping("Headline", "headline")
        .with_mapping("Score", "score");
    // A row with no cells at all
    source.data.push(HashMap::new());

    let mut job = BatchJob::new("Rows", template.id.clone(), source);
    let outcomes = BatchDriver::new().process_batch_job(&mut job, &template);

    assert_eq!(outcomes.len(), 4);
    assert!(outcomes[0].result.is_ok());
    assert!(matches!(outcomes[1].error(), Some(CoreError::PlaceholderValidation(_))));
    assert!(matches!(outcomes[2].error(), Some(CoreError::PlaceholderTypeMismatch { .. })));
    assert!(matches!(outcomes[3].error(), Some(CoreError::PlaceholderValidation(_))));
    assert_eq!(job.failed_rows, 3);
    assert_eq!(job.status, BatchJobStatus::CompletedWithErrors);
}

#[test]
fn test_destructive_empty_batch() {
    let template = single_track(Vec::new());
    let mut job = BatchJob::new("Empty", template.id.clone(), BatchDataSource::default());
    let outcomes = BatchDriver::new().process_batch_job(&mut job, &template);
    assert!(outcomes.is_empty());
    assert_eq!(job.status, BatchJobStatus::Completed);
    assert_eq!(job.progress(), 1.0);
}
