mod common;

use std::sync::Arc;

use common::{
    analysis_json, pipeline, reasoning_json, rule, sound, Script, ScriptedProvider,
};
use viral_predict::clock::ManualClock;
use viral_predict::store::TrendCorpus;
use viral_predict::{
    AnalysisInput, AnalyzerError, ConfidenceLabel, ContentType, InputMode, ModelError,
    PipelineError,
};

fn espresso_corpus() -> TrendCorpus {
    TrendCorpus {
        trending_sounds: vec![sound("espresso", 40.0, "rising")],
        scraped_videos: Vec::new(),
    }
}

fn hook_rules() -> Vec<viral_predict::store::RuleRecord> {
    vec![
        rule("question-hook", Some("question_hook"), 15.0),
        rule("seamless-loop", Some("loop_structure"), 15.0),
    ]
}

#[tokio::test]
async fn all_four_signals_in_agreement_give_high_confidence() {
    let primary = ScriptedProvider::always(Script::Reply(analysis_json(6.0)));
    let secondary = ScriptedProvider::always(Script::Reply(reasoning_json(60.0, 2.5, 1.5, 2.0)));
    let pipeline = pipeline(
        primary,
        Some(secondary),
        hook_rules(),
        espresso_corpus(),
        Arc::new(ManualClock::new()),
    );
    let input = AnalysisInput::text("What if your espresso is the secret?", ContentType::Reel);

    let result = pipeline.run(&input).await.unwrap();

    assert_eq!(result.gemini_score, 60);
    assert_eq!(result.behavioral_score, Some(54));
    assert_eq!(result.rule_score, 50);
    assert_eq!(result.trend_score, 48);
    // 0.45*54 + 0.25*60 + 0.20*50 + 0.10*48
    assert_eq!(result.overall_score, 54);
    assert_eq!(result.confidence_label, ConfidenceLabel::High);
    assert!((result.confidence - 0.88).abs() < 1e-9);
    assert!((result.score_weights.sum() - 1.0).abs() < 1e-9);
    assert!((result.score_weights.behavioral - 0.45).abs() < 1e-9);
    assert!(result.warnings.is_empty());
    assert_eq!(result.suggestions.len(), 3);
    assert_eq!(result.matched_rules.len(), 1);
    assert_eq!(result.matched_trends.len(), 1);
    assert!((result.cost_cents - 0.57).abs() < 1e-9);
    assert!(result.engine_version.starts_with("viral-predict/"));
    assert!(result.behavioral_predictions.is_some());
}

#[tokio::test]
async fn empty_reference_input_completes_with_low_confidence() {
    let primary = ScriptedProvider::always(Script::Reply(analysis_json(7.0)));
    let pipeline = pipeline(
        primary,
        None,
        Vec::new(),
        TrendCorpus::default(),
        Arc::new(ManualClock::new()),
    );
    let mut input = AnalysisInput::text("", ContentType::Video);
    input.input_mode = InputMode::UrlReference;
    input.video_url = Some("https://cdn.example.com/clip.mp4".to_string());

    let result = pipeline.run(&input).await.unwrap();

    assert_eq!(result.rule_score, 50);
    assert_eq!(result.trend_score, 0);
    assert!(result.matched_trends.is_empty());
    assert!(result.matched_rules.is_empty());
    assert_eq!(result.behavioral_score, None);
    assert_eq!(result.confidence_label, ConfidenceLabel::Low);
    assert!(!result.warnings.is_empty());
    assert!(result
        .warnings
        .iter()
        .any(|warning| warning == "Missing signals: [behavioral, rules, trends]"));
    assert_eq!(result.score_weights.behavioral, 0.0);
    assert!((result.score_weights.sum() - 1.0).abs() < 1e-9);
    assert_eq!(result.overall_score, 50);

    let json = serde_json::to_value(&result).unwrap();
    assert_eq!(json["matched_trends"], serde_json::json!([]));
    assert_eq!(json["confidence_label"], "LOW");
}

#[tokio::test]
async fn invalid_input_fails_before_any_model_call() {
    let primary = ScriptedProvider::always(Script::Reply(analysis_json(7.0)));
    let pipeline = pipeline(
        primary.clone(),
        None,
        Vec::new(),
        TrendCorpus::default(),
        Arc::new(ManualClock::new()),
    );

    let err = pipeline
        .run(&AnalysisInput::text("   ", ContentType::Post))
        .await
        .unwrap_err();
    match err {
        PipelineError::InvalidInput(validation) => assert_eq!(validation.field, "content_text"),
        other => panic!("expected validation error, got {:?}", other),
    }
    assert_eq!(primary.calls(), 0);
}

#[tokio::test]
async fn malformed_primary_output_is_retried_with_a_correction() {
    let primary = ScriptedProvider::new(
        vec![Script::Reply("Sure! Here is my analysis.".to_string())],
        Script::Reply(format!("```json\n{}\n```", analysis_json(8.0))),
    );
    let pipeline = pipeline(
        primary.clone(),
        None,
        Vec::new(),
        TrendCorpus::default(),
        Arc::new(ManualClock::new()),
    );

    let result = pipeline
        .run(&AnalysisInput::text("Three tips for better sleep", ContentType::Post))
        .await
        .unwrap();

    assert_eq!(result.gemini_score, 80);
    assert_eq!(primary.calls(), 2);
    assert!((result.cost_cents - 0.24).abs() < 1e-9);
    let prompts = primary.prompts();
    assert!(!prompts[0].contains("previous answer was rejected"));
    assert!(prompts[1].contains("previous answer was rejected"));
}

#[tokio::test]
async fn exhausted_primary_retries_abort_the_run() {
    let primary =
        ScriptedProvider::always(Script::Fail(ModelError::Transient("status 503".to_string())));
    let pipeline = pipeline(
        primary.clone(),
        None,
        Vec::new(),
        TrendCorpus::default(),
        Arc::new(ManualClock::new()),
    );

    let err = pipeline
        .run(&AnalysisInput::text("Three tips for better sleep", ContentType::Post))
        .await
        .unwrap_err();
    match err {
        PipelineError::Analyzer(AnalyzerError::Exhausted { attempts, last }) => {
            assert_eq!(attempts, 3);
            assert!(matches!(last, ModelError::Transient(_)));
        }
        other => panic!("expected exhausted analyzer, got {:?}", other),
    }
    assert_eq!(primary.calls(), 3);
}

#[tokio::test]
async fn rejected_primary_request_is_not_retried() {
    let primary = ScriptedProvider::always(Script::Fail(ModelError::Rejected {
        status: 400,
        detail: "bad schema".to_string(),
    }));
    let pipeline = pipeline(
        primary.clone(),
        None,
        Vec::new(),
        TrendCorpus::default(),
        Arc::new(ManualClock::new()),
    );

    let err = pipeline
        .run(&AnalysisInput::text("Three tips for better sleep", ContentType::Post))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        PipelineError::Analyzer(AnalyzerError::Exhausted { attempts: 1, .. })
    ));
    assert_eq!(primary.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn primary_timeout_fails_immediately() {
    let primary = ScriptedProvider::always(Script::Hang);
    let pipeline = pipeline(
        primary.clone(),
        None,
        Vec::new(),
        TrendCorpus::default(),
        Arc::new(ManualClock::new()),
    );

    let err = pipeline
        .run(&AnalysisInput::text("Three tips for better sleep", ContentType::Post))
        .await
        .unwrap_err();
    assert_eq!(err, PipelineError::Analyzer(AnalyzerError::TimedOut { attempt: 1 }));
    assert_eq!(primary.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn secondary_timeout_is_recorded_and_not_retried() {
    let primary = ScriptedProvider::always(Script::Reply(analysis_json(6.0)));
    let secondary = ScriptedProvider::always(Script::Hang);
    let pipeline = pipeline(
        primary,
        Some(secondary.clone()),
        hook_rules(),
        espresso_corpus(),
        Arc::new(ManualClock::new()),
    );

    let result = pipeline
        .run(&AnalysisInput::text("What if your espresso is the secret?", ContentType::Reel))
        .await
        .unwrap();

    assert!(result.reasoning.is_none());
    assert_eq!(secondary.calls(), 1);
    let breaker = pipeline.reasoner().unwrap().breaker();
    assert_eq!(breaker.consecutive_failures(), 1);
    // Three signals remain: primary 60, rules 50, trends 48.
    assert_eq!(result.confidence_label, ConfidenceLabel::Medium);
    assert!((result.score_weights.sum() - 1.0).abs() < 1e-9);
    assert!((result.cost_cents - 0.57).abs() < 1e-9);
}
