use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{info, warn};

use crate::config::RetryConfig;
use crate::error::{AnalyzerError, ModelError};
use crate::llm::{clean_json_response, ModelProvider, ModelRequest, ResponseFormat};
use crate::retry::{retry_with, Attempt, RetryPolicy};
use crate::{
    round_to, AnalyzerOutput, ContentPayload, Factor, InputMode, PrimaryAnalysis, PrimaryScores,
    FACTOR_NAMES,
};

const SCHEMA_NAME: &str = "content_analysis";

pub struct PrimaryAnalyzer {
    provider: Arc<dyn ModelProvider>,
    policy: RetryPolicy,
    cost_per_attempt_cents: f64,
}

impl PrimaryAnalyzer {
    pub fn new(provider: Arc<dyn ModelProvider>, config: &RetryConfig) -> Self {
        Self {
            provider,
            policy: RetryPolicy::from_config(config),
            cost_per_attempt_cents: config.cost_per_attempt_cents,
        }
    }

    pub async fn analyze(&self, payload: &ContentPayload) -> Result<AnalyzerOutput, AnalyzerError> {
        let base_prompt = build_prompt(payload);
        let provider = self.provider.clone();

        let outcome = retry_with(
            &self.policy,
            |attempt: Attempt| {
                let provider = provider.clone();
                let request = ModelRequest {
                    system: system_prompt(),
                    user: with_correction(&base_prompt, &attempt),
                    response_format: ResponseFormat::JsonSchema {
                        name: SCHEMA_NAME.to_string(),
                        schema: response_schema(),
                    },
                };
                async move {
                    let raw = provider.complete(&request).await?;
                    parse_analysis(&raw)
                }
            },
            |err| {
                warn!(model = %self.provider.model(), error = %err, "primary analysis attempt failed");
                true
            },
        )
        .await;

        match outcome {
            Ok(done) => {
                info!(
                    model = %self.provider.model(),
                    attempts = done.attempts,
                    score = done.value.score(),
                    "primary analysis complete"
                );
                Ok(AnalyzerOutput {
                    analysis: done.value,
                    attempts: done.attempts,
                    cost_cents: round_to(done.attempts as f64 * self.cost_per_attempt_cents, 4),
                })
            }
            Err(failure) if failure.last_error.is_timeout() => Err(AnalyzerError::TimedOut {
                attempt: failure.attempts,
            }),
            Err(failure) => Err(AnalyzerError::Exhausted {
                attempts: failure.attempts,
                last: failure.last_error,
            }),
        }
    }
}

fn system_prompt() -> String {
    let factors = FACTOR_NAMES
        .iter()
        .map(|name| format!("- {}", name))
        .collect::<Vec<_>>()
        .join("\n");
    format!(
        r#"You are an expert short-form content analyst predicting viral potential.
Return a single JSON object with:
- factors: exactly 5 entries, one per factor below, each {{name, score (0-10), description, tips (1-3 short strings)}}
- overall_impression: one or two sentences
- content_summary: one sentence
- component_scores: {{hook, retention, emotion, shareability, originality}}, each 0-10
Factors:
{}
Rules:
- Output JSON only, no markdown or commentary.
- Use the factor names exactly as written."#,
        factors
    )
}

fn build_prompt(payload: &ContentPayload) -> String {
    let mut lines = vec![format!("Content type: {}", payload.content_type.label())];
    if let Some(niche) = payload.niche.as_deref() {
        lines.push(format!("Niche: {}", niche));
    }
    if let Some(platform) = payload.platform.as_deref() {
        lines.push(format!("Platform: {}", platform));
    }
    if let Some(seconds) = payload.duration_hint {
        lines.push(format!("Stated duration: {}s", seconds));
    }
    if let Some(url) = payload.video_url.as_deref() {
        let kind = match payload.input_mode {
            InputMode::FileReference => "Uploaded video file",
            _ => "Video URL",
        };
        lines.push(format!("{}: {}", kind, url));
    }
    if !payload.hashtags.is_empty() {
        lines.push(format!("Hashtags: #{}", payload.hashtags.join(" #")));
    }
    if payload.content_text.is_empty() {
        lines.push("Caption/script: (none provided; judge from the video reference)".to_string());
    } else {
        lines.push(format!("Caption/script:\n{}", payload.content_text));
    }
    lines.join("\n")
}

fn with_correction(base: &str, attempt: &Attempt) -> String {
    match attempt.previous_error.as_ref() {
        Some(err) if attempt.is_retry() => format!(
            "{}\n\nYour previous answer was rejected ({}). Respond again with a single JSON object that matches the schema exactly: 5 factors named as instructed, scores between 0 and 10.",
            base, err
        ),
        _ => base.to_string(),
    }
}

pub fn response_schema() -> Value {
    let score = json!({ "type": "number", "minimum": 0, "maximum": 10 });
    json!({
        "type": "object",
        "additionalProperties": false,
        "required": ["factors", "overall_impression", "content_summary", "component_scores"],
        "properties": {
            "factors": {
                "type": "array",
                "minItems": 5,
                "maxItems": 5,
                "items": {
                    "type": "object",
                    "additionalProperties": false,
                    "required": ["name", "score", "description", "tips"],
                    "properties": {
                        "name": { "type": "string", "enum": FACTOR_NAMES },
                        "score": score,
                        "description": { "type": "string" },
                        "tips": { "type": "array", "items": { "type": "string" } }
                    }
                }
            },
            "overall_impression": { "type": "string" },
            "content_summary": { "type": "string" },
            "component_scores": {
                "type": "object",
                "additionalProperties": false,
                "required": ["hook", "retention", "emotion", "shareability", "originality"],
                "properties": {
                    "hook": score,
                    "retention": score,
                    "emotion": score,
                    "shareability": score,
                    "originality": score
                }
            }
        }
    })
}

pub fn parse_analysis(raw: &str) -> Result<PrimaryAnalysis, ModelError> {
    let json = clean_json_response(raw)
        .ok_or_else(|| ModelError::InvalidResponse("response missing JSON".to_string()))?;
    let mut analysis: PrimaryAnalysis = serde_json::from_str(&json)
        .map_err(|err| ModelError::InvalidResponse(format!("JSON parse failed: {}", err)))?;

    if analysis.factors.len() != FACTOR_NAMES.len() {
        return Err(ModelError::InvalidResponse(format!(
            "expected {} factors, got {}",
            FACTOR_NAMES.len(),
            analysis.factors.len()
        )));
    }

    let mut ordered: Vec<Factor> = Vec::with_capacity(FACTOR_NAMES.len());
    for name in FACTOR_NAMES {
        let position = analysis
            .factors
            .iter()
            .position(|factor| factor.name.trim().eq_ignore_ascii_case(name))
            .ok_or_else(|| ModelError::InvalidResponse(format!("missing factor {}", name)))?;
        let mut factor = analysis.factors.swap_remove(position);
        if !in_unit_range(factor.score) {
            return Err(ModelError::InvalidResponse(format!(
                "factor {} score {} outside 0-10",
                name, factor.score
            )));
        }
        factor.name = name.to_string();
        factor.tips = factor
            .tips
            .into_iter()
            .map(|tip| tip.trim().to_string())
            .filter(|tip| !tip.is_empty())
            .collect();
        ordered.push(factor);
    }
    analysis.factors = ordered;

    let PrimaryScores {
        hook,
        retention,
        emotion,
        shareability,
        originality,
    } = &analysis.component_scores;
    if ![*hook, *retention, *emotion, *shareability, *originality]
        .into_iter()
        .all(in_unit_range)
    {
        return Err(ModelError::InvalidResponse(
            "component score outside 0-10".to_string(),
        ));
    }

    if analysis.overall_impression.trim().is_empty() || analysis.content_summary.trim().is_empty() {
        return Err(ModelError::InvalidResponse(
            "summary fields must not be empty".to_string(),
        ));
    }

    Ok(analysis)
}

fn in_unit_range(score: f64) -> bool {
    score.is_finite() && (0.0..=10.0).contains(&score)
}
