use pretty_assertions::assert_eq;
use text_to_action::validation::{PlanValidationError, StepErrorKind};
use text_to_action::{ActionPlan, ActionStep, RecoveryConfig, RecoveryErrorKind, Stage, validate};

fn config() -> RecoveryConfig {
    RecoveryConfig::default()
}

fn step(object: &str, action: &str, target: &str) -> ActionStep {
    ActionStep {
        object: object.into(),
        action: action.into(),
        target_position: target.into(),
        initial_position: None,
    }
}

#[test]
fn flat_and_wrapped_single_steps_are_identical() {
    let flat = r#"{"object":"red box","action":"move","target_position":"blue platform"}"#;
    let wrapped = r#"{"sequence":[{"object":"red box","action":"move","target_position":"blue platform"}]}"#;

    let expected = ActionPlan::new(vec![step("red box", "move", "blue platform")]).unwrap();
    assert_eq!(validate(flat, &config()).unwrap(), expected);
    assert_eq!(validate(wrapped, &config()).unwrap(), expected);
}

#[test]
fn canonical_form_validates_to_the_same_plan() {
    let raw = "### Response:\n{\"sequence\": [\
        {\"object\": \"red_box\", \"action\": \"Slide\", \"target_position\": \"top_shelf\", \"initial_position\": \"floor\"},\
        {\"object\": \"red box\", \"action\": \"spin\", \"target_position\": \"90 degrees\"}\
    ]}</s>";
    let first = validate(raw, &config()).unwrap();

    let canonical = serde_json::to_string(&first.to_json()).unwrap();
    let second = validate(&canonical, &config()).unwrap();
    assert_eq!(first, second);
}

#[test]
fn spin_becomes_rotate_and_dance_is_rejected() {
    let plan = validate(
        r#"{"object":"green sphere","action":"spin","target_position":"90 degrees clockwise"}"#,
        &config(),
    )
    .unwrap();
    assert_eq!(plan.steps()[0].action, "rotate");

    let err = validate(
        r#"{"object":"green sphere","action":"dance","target_position":"center"}"#,
        &config(),
    )
    .unwrap_err();
    assert_eq!(
        err.kind,
        RecoveryErrorKind::Step(PlanValidationError {
            step_index: 0,
            kind: StepErrorKind::UnknownAction("dance".into()),
        })
    );
}

#[test]
fn underscores_become_spaces_in_output() {
    let plan = validate(
        r#"{"object":"blue ball","action":"move","target_position":"top_shelf"}"#,
        &config(),
    )
    .unwrap();
    assert_eq!(plan.steps()[0].target_position, "top shelf");
}

#[test]
fn noisy_text_with_marker_and_sentinel() {
    let raw = "### Response:\n{\"object\":\"ball\",\"action\":\"move\",\"target_position\":\"left\"}<|eot_id|>";
    let plan = validate(raw, &config()).unwrap();
    assert_eq!(plan.steps(), &[step("ball", "move", "left")]);
}

#[test]
fn prompt_echo_before_marker_is_ignored() {
    let raw = "### Instruction:\nFor CHAINED actions output {\"sequence\": [...]}\n\n### Input:\nmove the cube left\n\n### Response:\n {\"object\": \"cube\", \"action\": \"move\", \"target_position\": \"left\"}";
    let plan = validate(raw, &config()).unwrap();
    assert_eq!(plan.steps(), &[step("cube", "move", "left")]);
}

#[test]
fn partial_sequence_fails_whole_plan() {
    let raw = r#"{"sequence": [
        {"object": "red box", "action": "move", "target_position": "left"},
        {"object": "red box", "action": "rotate"}
    ]}"#;
    let err = validate(raw, &config()).unwrap_err();
    assert_eq!(err.stage, Stage::Validate);
    assert_eq!(
        err.kind,
        RecoveryErrorKind::Step(PlanValidationError {
            step_index: 1,
            kind: StepErrorKind::MissingField("target_position"),
        })
    );
}

#[test]
fn inner_braces_do_not_truncate_extraction() {
    let raw = r#"The plan is {"object": "a {weird} box", "action":"move","target_position":"b"} as requested."#;
    let plan = validate(raw, &config()).unwrap();
    assert_eq!(plan.steps(), &[step("a {weird} box", "move", "b")]);
}

#[test]
fn chained_sequence_keeps_order() {
    let raw = r#"Output: {"sequence": [
        {"object": "red box", "initial_position": "floor", "action": "move", "target_position": "(200, 300)"},
        {"object": "red box", "initial_position": "(200, 300)", "action": "turn", "target_position": "45 degrees"},
        {"object": "red box", "initial_position": "(200, 300)", "action": "enlarge", "target_position": "2x original size"}
    ]}"#;
    let plan = validate(raw, &config()).unwrap();
    let actions: Vec<&str> = plan.steps().iter().map(|s| s.action.as_str()).collect();
    assert_eq!(actions, vec!["move", "rotate", "scale"]);
    assert_eq!(plan.steps()[1].initial_position.as_deref(), Some("(200, 300)"));
}

#[test]
fn extended_vocabulary_is_configuration() {
    let raw = r#"{"object":"blue ball","action":"bounce","target_position":"center"}"#;
    assert!(validate(raw, &config()).is_err());
    assert!(validate(raw, &RecoveryConfig::extended_vocabulary()).is_ok());
}

#[test]
fn each_stage_reports_its_own_failure() {
    let cases = [
        ("nothing to see here", Stage::Extract),
        ("{\"object\": \"ball\",}", Stage::Parse),
        ("{\"answer\": 42}", Stage::ResolveShape),
        ("{\"object\": \"ball\", \"action\": \"move\", \"target_position\": [1, 2]}", Stage::Validate),
    ];
    for (raw, stage) in cases {
        let err = validate(raw, &config()).unwrap_err();
        assert_eq!(err.stage, stage, "input: {raw}");
        assert_eq!(err.raw_excerpt, raw);
    }
}

#[test]
fn concurrent_callers_share_one_config() {
    let config = std::sync::Arc::new(config());
    let handles: Vec<_> = (0..8)
        .map(|i| {
            let config = std::sync::Arc::clone(&config);
            std::thread::spawn(move || {
                let raw = format!(
                    r#"{{"object":"box {i}","action":"push","target_position":"slot_{i}"}}"#
                );
                validate(&raw, &config).map(|plan| plan.steps()[0].target_position.clone())
            })
        })
        .collect();

    for (i, handle) in handles.into_iter().enumerate() {
        assert_eq!(handle.join().unwrap().unwrap(), format!("slot {i}"));
    }
}
