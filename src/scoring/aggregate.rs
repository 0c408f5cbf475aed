use std::collections::HashSet;

use crate::config::{BehavioralBenchmarks, SignalWeights};
use crate::{
    clamp_score, normalize_text, round_to, BehavioralPredictions, ConfidenceLabel, DeepReasoning,
    PredictionResult, PrimaryAnalysis, ReasoningConfidence, RuleScoreResult, ScoreWeights,
    TrendEnrichment, ENGINE_VERSION,
};

const MAX_SUGGESTIONS: usize = 5;
const HIGH_AGREEMENT_SPREAD: f64 = 20.0;
const LOW_AGREEMENT_SPREAD: f64 = 40.0;

pub struct AggregateInputs<'a> {
    pub analysis: &'a PrimaryAnalysis,
    pub rules: &'a RuleScoreResult,
    pub trends: &'a TrendEnrichment,
    pub reasoning: Option<&'a DeepReasoning>,
    pub cost_cents: f64,
    pub latency_ms: u64,
}

#[derive(Debug, Clone)]
pub struct Aggregator {
    weights: SignalWeights,
    benchmarks: BehavioralBenchmarks,
}

impl Default for Aggregator {
    fn default() -> Self {
        Self::new(SignalWeights::default(), BehavioralBenchmarks::default())
    }
}

impl Aggregator {
    pub fn new(weights: SignalWeights, benchmarks: BehavioralBenchmarks) -> Self {
        Self {
            weights,
            benchmarks,
        }
    }

    /// Weights actually applied. Without a behavioral signal its share is spread over the
    /// other three in proportion to their base weights.
    pub fn effective_weights(&self, behavioral_available: bool) -> ScoreWeights {
        let base = sanitize(self.weights);
        let behavioral = if behavioral_available {
            base.behavioral
        } else {
            0.0
        };
        let total = behavioral + base.gemini + base.rules + base.trends;
        if total <= 0.0 {
            return ScoreWeights {
                behavioral: 0.0,
                gemini: 1.0,
                rules: 0.0,
                trends: 0.0,
            };
        }
        ScoreWeights {
            behavioral: behavioral / total,
            gemini: base.gemini / total,
            rules: base.rules / total,
            trends: base.trends / total,
        }
    }

    pub fn behavioral_score(&self, predictions: &BehavioralPredictions) -> u32 {
        let completion = bounded_pct(predictions.completion_pct);
        let share = relative_pct(predictions.share_pct, self.benchmarks.share_pct);
        let comment = relative_pct(predictions.comment_pct, self.benchmarks.comment_pct);
        let save = relative_pct(predictions.save_pct, self.benchmarks.save_pct);
        clamp_score(0.40 * completion + 0.25 * share + 0.15 * comment + 0.20 * save)
    }

    pub fn aggregate(&self, inputs: AggregateInputs<'_>) -> PredictionResult {
        let gemini_score = inputs.analysis.score();
        let rule_score = inputs.rules.rule_score.min(100);
        let trend_score = inputs.trends.trend_score.min(100);
        let behavioral_score = inputs
            .reasoning
            .map(|reasoning| self.behavioral_score(&reasoning.behavioral_predictions));

        let weights = self.effective_weights(behavioral_score.is_some());
        let weighted = weights.behavioral * behavioral_score.unwrap_or(0) as f64
            + weights.gemini * gemini_score as f64
            + weights.rules * rule_score as f64
            + weights.trends * trend_score as f64;
        let overall_score = clamp_score(weighted);

        let mut present: Vec<(&str, u32)> = vec![("primary", gemini_score)];
        let mut missing: Vec<&str> = Vec::new();
        match behavioral_score {
            Some(score) => present.push(("behavioral", score)),
            None => missing.push("behavioral"),
        }
        if inputs.rules.rules_evaluated > 0 {
            present.push(("rules", rule_score));
        } else {
            missing.push("rules");
        }
        if inputs.trends.signal_available {
            present.push(("trends", trend_score));
        } else {
            missing.push("trends");
        }

        let spread = score_spread(&present);
        let completeness = present.len() as f64 / 4.0;
        let confidence = round_to((completeness * (1.0 - spread / 100.0)).clamp(0.0, 1.0), 2);
        let model_confidence = inputs.reasoning.map(|reasoning| reasoning.confidence);
        let confidence_label = confidence_label(present.len(), spread, model_confidence);

        let mut warnings = Vec::new();
        if inputs.reasoning.is_none() {
            warnings.push(
                "Secondary reasoning unavailable; weights redistributed across remaining signals"
                    .to_string(),
            );
        }
        if !missing.is_empty() {
            warnings.push(format!("Missing signals: [{}]", missing.join(", ")));
        }
        if present.len() > 1 && spread > LOW_AGREEMENT_SPREAD {
            warnings.push(format!(
                "Signals disagree strongly (spread of {:.0} points)",
                spread
            ));
        }
        if let Some(reasoning) = inputs.reasoning {
            merge_unique(&mut warnings, &reasoning.warnings, usize::MAX);
        }

        PredictionResult {
            overall_score,
            confidence,
            confidence_label,
            behavioral_score,
            gemini_score,
            rule_score,
            trend_score,
            factors: inputs.analysis.factors.clone(),
            suggestions: build_suggestions(inputs.analysis, inputs.reasoning),
            behavioral_predictions: inputs
                .reasoning
                .map(|reasoning| reasoning.behavioral_predictions.clone()),
            warnings,
            score_weights: weights,
            cost_cents: round_to(inputs.cost_cents, 4),
            latency_ms: inputs.latency_ms,
            engine_version: ENGINE_VERSION.to_string(),
            matched_rules: inputs.rules.matched_rules.clone(),
            matched_trends: inputs.trends.matched_trends.clone(),
            hashtag_relevance: inputs.trends.hashtag_relevance,
            reasoning: inputs.reasoning.cloned(),
        }
    }
}

fn confidence_label(
    present: usize,
    spread: f64,
    model_confidence: Option<ReasoningConfidence>,
) -> ConfidenceLabel {
    if present <= 1 || spread > LOW_AGREEMENT_SPREAD {
        return ConfidenceLabel::Low;
    }
    if present == 4 && spread <= HIGH_AGREEMENT_SPREAD {
        if model_confidence == Some(ReasoningConfidence::Low) {
            return ConfidenceLabel::Medium;
        }
        return ConfidenceLabel::High;
    }
    ConfidenceLabel::Medium
}

fn score_spread(present: &[(&str, u32)]) -> f64 {
    let max = present.iter().map(|(_, score)| *score).max().unwrap_or(0);
    let min = present.iter().map(|(_, score)| *score).min().unwrap_or(0);
    (max - min) as f64
}

fn build_suggestions(analysis: &PrimaryAnalysis, reasoning: Option<&DeepReasoning>) -> Vec<String> {
    let mut suggestions = Vec::new();
    if let Some(reasoning) = reasoning {
        merge_unique(&mut suggestions, &reasoning.suggestions, MAX_SUGGESTIONS);
    }
    if suggestions.is_empty() {
        let mut factors: Vec<_> = analysis.factors.iter().collect();
        factors.sort_by(|a, b| {
            a.score
                .partial_cmp(&b.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        let tips: Vec<String> = factors
            .into_iter()
            .flat_map(|factor| factor.tips.iter().cloned())
            .collect();
        merge_unique(&mut suggestions, &tips, MAX_SUGGESTIONS);
    }
    suggestions
}

fn merge_unique(base: &mut Vec<String>, extras: &[String], limit: usize) {
    let mut seen: HashSet<String> = base.iter().map(|s| normalize_text(s)).collect();
    for item in extras {
        if base.len() >= limit {
            break;
        }
        let normalized = normalize_text(item);
        if normalized.is_empty() || seen.contains(&normalized) {
            continue;
        }
        base.push(item.trim().to_string());
        seen.insert(normalized);
    }
}

fn sanitize(weights: SignalWeights) -> SignalWeights {
    let clean = |value: f64| if value.is_finite() { value.max(0.0) } else { 0.0 };
    SignalWeights {
        behavioral: clean(weights.behavioral),
        gemini: clean(weights.gemini),
        rules: clean(weights.rules),
        trends: clean(weights.trends),
    }
}

fn bounded_pct(value: f64) -> f64 {
    if value.is_nan() {
        return 0.0;
    }
    value.clamp(0.0, 100.0)
}

fn relative_pct(value: f64, benchmark: f64) -> f64 {
    if benchmark <= 0.0 {
        return 0.0;
    }
    bounded_pct(bounded_pct(value) / benchmark * 100.0)
}
