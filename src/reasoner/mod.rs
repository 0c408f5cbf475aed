pub mod breaker;

use serde_json::Value;
use std::sync::Arc;
use tracing::{info, warn};

use crate::config::RetryConfig;
use crate::error::ModelError;
use crate::llm::{clean_json_response, ModelProvider, ModelRequest, ResponseFormat};
use crate::retry::{retry_with, Attempt, RetryPolicy};
use crate::{
    round_to, ContentPayload, DeepReasoning, PrimaryAnalysis, ReasonerOutput, RuleScoreResult,
    TrendEnrichment,
};

pub use breaker::{BreakerPolicy, BreakerState, CircuitBreaker};

const PERSONA_COUNT: usize = 5;

pub struct ReasoningContext<'a> {
    pub payload: &'a ContentPayload,
    pub analysis: &'a PrimaryAnalysis,
    pub rules: &'a RuleScoreResult,
    pub trends: &'a TrendEnrichment,
}

pub struct SecondaryReasoner {
    provider: Arc<dyn ModelProvider>,
    policy: RetryPolicy,
    cost_per_attempt_cents: f64,
    breaker: CircuitBreaker,
}

impl SecondaryReasoner {
    pub fn new(
        provider: Arc<dyn ModelProvider>,
        config: &RetryConfig,
        breaker: CircuitBreaker,
    ) -> Self {
        Self {
            provider,
            policy: RetryPolicy::from_config(config),
            cost_per_attempt_cents: config.cost_per_attempt_cents,
            breaker,
        }
    }

    pub fn breaker(&self) -> &CircuitBreaker {
        &self.breaker
    }

    pub async fn reason(&self, context: ReasoningContext<'_>) -> ReasonerOutput {
        if self.breaker.is_open() {
            info!("secondary reasoning skipped; circuit breaker open");
            return ReasonerOutput {
                reasoning: None,
                attempts: 0,
                cost_cents: 0.0,
            };
        }

        let base_prompt = build_prompt(&context);
        let provider = self.provider.clone();
        let breaker = &self.breaker;

        let outcome = retry_with(
            &self.policy,
            |attempt: Attempt| {
                let provider = provider.clone();
                let request = ModelRequest {
                    system: system_prompt(),
                    user: with_correction(&base_prompt, &attempt),
                    response_format: ResponseFormat::JsonObject,
                };
                async move {
                    let raw = provider.complete(&request).await?;
                    parse_reasoning(&raw)
                }
            },
            |err| {
                warn!(model = %self.provider.model(), error = %err, "secondary reasoning attempt failed");
                if counts_against_breaker(err) {
                    breaker.record_failure();
                }
                !breaker.is_open()
            },
        )
        .await;

        match outcome {
            Ok(done) => {
                self.breaker.record_success();
                ReasonerOutput {
                    reasoning: Some(done.value),
                    attempts: done.attempts,
                    cost_cents: self.cost(done.attempts),
                }
            }
            Err(failure) => {
                warn!(
                    attempts = failure.attempts,
                    error = %failure.last_error,
                    "secondary reasoning unavailable"
                );
                ReasonerOutput {
                    reasoning: None,
                    attempts: failure.attempts,
                    cost_cents: self.cost(failure.attempts),
                }
            }
        }
    }

    fn cost(&self, attempts: u32) -> f64 {
        round_to(attempts as f64 * self.cost_per_attempt_cents, 4)
    }
}

fn counts_against_breaker(err: &ModelError) -> bool {
    !matches!(err, ModelError::InvalidResponse(_))
}

fn system_prompt() -> String {
    r#"You are a senior social media strategist simulating how an audience will respond to a short-form post.
Return a single JSON object with:
- persona_reactions: exactly 5 entries {persona, reaction, would_share}
- suggestions: 3 to 5 specific, actionable improvements
- variants: 2 or 3 rewritten versions {text, rationale}
- conversation_themes: entries {theme, sentiment}
- behavioral_predictions: {completion_pct, share_pct, comment_pct, save_pct} as percentages 0-100, plus {completion_percentile, share_percentile, comment_percentile, save_percentile} labels such as "top 10%"
- component_scores: named sub-scores, each 0-10
- confidence: "low", "medium" or "high"
- warnings: list of concerns (may be empty)
Output JSON only."#
        .to_string()
}

fn build_prompt(context: &ReasoningContext<'_>) -> String {
    let payload = context.payload;
    let mut sections = vec![format!("Content type: {}", payload.content_type.label())];
    if let Some(niche) = payload.niche.as_deref() {
        sections.push(format!("Niche: {}", niche));
    }
    if let Some(url) = payload.video_url.as_deref() {
        sections.push(format!("Video reference: {}", url));
    }
    if payload.content_text.is_empty() {
        sections.push("Content: (no caption or script provided)".to_string());
    } else {
        sections.push(format!("Content:\n{}", payload.content_text));
    }

    let factors = context
        .analysis
        .factors
        .iter()
        .map(|factor| format!("- {}: {:.1}/10. {}", factor.name, factor.score, factor.description))
        .collect::<Vec<_>>()
        .join("\n");
    sections.push(format!(
        "Primary analysis ({}):\n{}\nImpression: {}",
        context.analysis.score(),
        factors,
        context.analysis.overall_impression
    ));

    let rules = if context.rules.matched_rules.is_empty() {
        "none".to_string()
    } else {
        context
            .rules
            .matched_rules
            .iter()
            .map(|rule| rule.rule_name.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    };
    sections.push(format!(
        "Rule score: {}/100 (matched: {})",
        context.rules.rule_score, rules
    ));
    sections.push(format!(
        "Trend score: {}/100. {}",
        context.trends.trend_score, context.trends.trend_context
    ));

    sections.join("\n\n")
}

fn with_correction(base: &str, attempt: &Attempt) -> String {
    match attempt.previous_error.as_ref() {
        Some(ModelError::InvalidResponse(reason)) if attempt.is_retry() => format!(
            "{}\n\nYour previous answer was invalid ({}). Reply with one JSON object containing exactly 5 persona_reactions, 3-5 suggestions and 2-3 variants.",
            base, reason
        ),
        _ => base.to_string(),
    }
}

pub fn parse_reasoning(raw: &str) -> Result<DeepReasoning, ModelError> {
    let json = clean_json_response(raw)
        .ok_or_else(|| ModelError::InvalidResponse("response missing JSON".to_string()))?;
    let mut value: Value = serde_json::from_str(&json)
        .map_err(|err| ModelError::InvalidResponse(format!("JSON parse failed: {}", err)))?;
    if let Some(confidence) = value.get_mut("confidence") {
        if let Some(text) = confidence.as_str() {
            *confidence = Value::String(text.trim().to_lowercase());
        }
    }
    let reasoning: DeepReasoning = serde_json::from_value(value)
        .map_err(|err| ModelError::InvalidResponse(format!("schema mismatch: {}", err)))?;

    if reasoning.persona_reactions.len() != PERSONA_COUNT {
        return Err(invalid(format!(
            "expected {} persona reactions, got {}",
            PERSONA_COUNT,
            reasoning.persona_reactions.len()
        )));
    }
    if !(3..=5).contains(&reasoning.suggestions.len()) {
        return Err(invalid(format!(
            "expected 3-5 suggestions, got {}",
            reasoning.suggestions.len()
        )));
    }
    if !(2..=3).contains(&reasoning.variants.len()) {
        return Err(invalid(format!(
            "expected 2-3 variants, got {}",
            reasoning.variants.len()
        )));
    }
    if let Some((name, score)) = reasoning
        .component_scores
        .iter()
        .find(|(_, score)| !(score.is_finite() && (0.0..=10.0).contains(*score)))
    {
        return Err(invalid(format!("component score {} = {} outside 0-10", name, score)));
    }
    let behavior = &reasoning.behavioral_predictions;
    let percentages = [
        behavior.completion_pct,
        behavior.share_pct,
        behavior.comment_pct,
        behavior.save_pct,
    ];
    if !percentages
        .iter()
        .all(|pct| pct.is_finite() && (0.0..=100.0).contains(pct))
    {
        return Err(invalid("behavioral percentage outside 0-100".to_string()));
    }

    Ok(reasoning)
}

fn invalid(reason: String) -> ModelError {
    ModelError::InvalidResponse(reason)
}
