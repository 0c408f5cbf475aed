pub mod analyzer;
pub mod cache;
pub mod clock;
pub mod config;
pub mod error;
pub mod fuzzy;
pub mod llm;
pub mod normalize;
pub mod reasoner;
pub mod retry;
pub mod scoring;
pub mod store;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub use error::{AnalyzerError, ModelError, PipelineError, StoreError, ValidationError};
pub use scoring::PredictionPipeline;

pub const ENGINE_VERSION: &str = concat!("viral-predict/", env!("CARGO_PKG_VERSION"));

pub const FACTOR_NAMES: [&str; 5] = [
    "Hook Strength",
    "Emotional Resonance",
    "Clarity & Pacing",
    "Shareability",
    "Trend Alignment",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputMode {
    Text,
    #[serde(alias = "url", alias = "url-reference")]
    UrlReference,
    #[serde(alias = "file", alias = "file-reference")]
    FileReference,
}

impl InputMode {
    pub fn from_str(value: &str) -> Option<Self> {
        match value.to_lowercase().as_str() {
            "text" => Some(InputMode::Text),
            "url" | "url_reference" | "url-reference" => Some(InputMode::UrlReference),
            "file" | "file_reference" | "file-reference" | "upload" => {
                Some(InputMode::FileReference)
            }
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            InputMode::Text => "text",
            InputMode::UrlReference => "url_reference",
            InputMode::FileReference => "file_reference",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentType {
    Post,
    Reel,
    Story,
    Video,
    Thread,
}

impl ContentType {
    pub fn from_str(value: &str) -> Option<Self> {
        match value.to_lowercase().as_str() {
            "post" => Some(ContentType::Post),
            "reel" | "reels" | "short" => Some(ContentType::Reel),
            "story" => Some(ContentType::Story),
            "video" | "vid" => Some(ContentType::Video),
            "thread" => Some(ContentType::Thread),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ContentType::Post => "post",
            ContentType::Reel => "reel",
            ContentType::Story => "story",
            ContentType::Video => "video",
            ContentType::Thread => "thread",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisInput {
    pub input_mode: InputMode,
    #[serde(default)]
    pub content_text: Option<String>,
    pub content_type: ContentType,
    #[serde(default)]
    pub niche: Option<String>,
    #[serde(default)]
    pub creator_handle: Option<String>,
    #[serde(default)]
    pub society_id: Option<String>,
    #[serde(default)]
    pub platform: Option<String>,
    #[serde(default)]
    pub video_url: Option<String>,
    #[serde(default)]
    pub file_reference: Option<String>,
}

impl AnalysisInput {
    pub fn text(content_text: impl Into<String>, content_type: ContentType) -> Self {
        Self {
            input_mode: InputMode::Text,
            content_text: Some(content_text.into()),
            content_type,
            niche: None,
            creator_handle: None,
            society_id: None,
            platform: None,
            video_url: None,
            file_reference: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentPayload {
    pub content_text: String,
    pub content_type: ContentType,
    pub input_mode: InputMode,
    pub video_url: Option<String>,
    pub hashtags: Vec<String>,
    pub duration_hint: Option<u32>,
    pub niche: Option<String>,
    pub creator_handle: Option<String>,
    pub society_id: Option<String>,
    pub platform: Option<String>,
}

impl ContentPayload {
    pub fn fingerprint(&self) -> String {
        use sha2::{Digest, Sha256};

        let mut hasher = Sha256::new();
        hasher.update(self.input_mode.label().as_bytes());
        hasher.update([0u8]);
        hasher.update(self.content_text.as_bytes());
        hasher.update([0u8]);
        hasher.update(self.video_url.as_deref().unwrap_or_default().as_bytes());
        let digest = hasher.finalize();
        digest[..8].iter().map(|byte| format!("{:02x}", byte)).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Factor {
    pub name: String,
    pub score: f64,
    pub description: String,
    #[serde(default)]
    pub tips: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrimaryScores {
    pub hook: f64,
    pub retention: f64,
    pub emotion: f64,
    pub shareability: f64,
    pub originality: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrimaryAnalysis {
    pub factors: Vec<Factor>,
    pub overall_impression: String,
    pub content_summary: String,
    pub component_scores: PrimaryScores,
}

impl PrimaryAnalysis {
    pub fn score(&self) -> u32 {
        if self.factors.is_empty() {
            return 0;
        }
        let mean = self.factors.iter().map(|factor| factor.score).sum::<f64>()
            / self.factors.len() as f64;
        clamp_score(mean * 10.0)
    }
}

#[derive(Debug, Clone)]
pub struct AnalyzerOutput {
    pub analysis: PrimaryAnalysis,
    pub attempts: u32,
    pub cost_cents: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleTier {
    Strong,
    Moderate,
    Minor,
}

impl RuleTier {
    pub fn from_modifier(score_modifier: f64) -> Self {
        if score_modifier >= 12.0 {
            RuleTier::Strong
        } else if score_modifier >= 8.0 {
            RuleTier::Moderate
        } else {
            RuleTier::Minor
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchedRule {
    pub rule_id: String,
    pub rule_name: String,
    pub score: f64,
    pub max_score: f64,
    pub tier: RuleTier,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleScoreResult {
    pub rule_score: u32,
    pub matched_rules: Vec<MatchedRule>,
    pub rules_evaluated: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendPhase {
    Emerging,
    Rising,
    Peak,
    Declining,
    #[serde(other)]
    Other,
}

impl TrendPhase {
    pub fn from_str(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "emerging" => TrendPhase::Emerging,
            "rising" => TrendPhase::Rising,
            "peak" | "peaking" => TrendPhase::Peak,
            "declining" | "fading" => TrendPhase::Declining,
            _ => TrendPhase::Other,
        }
    }

    pub fn multiplier(self) -> f64 {
        match self {
            TrendPhase::Emerging => 1.5,
            TrendPhase::Rising => 1.2,
            TrendPhase::Peak => 1.0,
            TrendPhase::Declining | TrendPhase::Other => 0.5,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            TrendPhase::Emerging => "emerging",
            TrendPhase::Rising => "rising",
            TrendPhase::Peak => "peak",
            TrendPhase::Declining => "declining",
            TrendPhase::Other => "unknown",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchedTrend {
    pub sound_name: String,
    pub velocity_score: f64,
    pub trend_phase: TrendPhase,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendEnrichment {
    pub trend_score: u32,
    pub matched_trends: Vec<MatchedTrend>,
    pub hashtag_relevance: f64,
    pub trend_context: String,
    pub relevant_hashtags: Vec<String>,
    pub saturated_hashtags: Vec<String>,
    pub signal_available: bool,
}

impl TrendEnrichment {
    pub fn empty(trend_context: impl Into<String>) -> Self {
        Self {
            trend_score: 0,
            matched_trends: Vec::new(),
            hashtag_relevance: 0.0,
            trend_context: trend_context.into(),
            relevant_hashtags: Vec::new(),
            saturated_hashtags: Vec::new(),
            signal_available: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersonaReaction {
    pub persona: String,
    pub reaction: String,
    #[serde(default)]
    pub would_share: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentVariant {
    pub text: String,
    #[serde(default)]
    pub rationale: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationTheme {
    pub theme: String,
    #[serde(default)]
    pub sentiment: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BehavioralPredictions {
    pub completion_pct: f64,
    pub share_pct: f64,
    pub comment_pct: f64,
    pub save_pct: f64,
    pub completion_percentile: String,
    pub share_percentile: String,
    pub comment_percentile: String,
    pub save_percentile: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReasoningConfidence {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeepReasoning {
    pub persona_reactions: Vec<PersonaReaction>,
    pub suggestions: Vec<String>,
    pub variants: Vec<ContentVariant>,
    pub conversation_themes: Vec<ConversationTheme>,
    pub behavioral_predictions: BehavioralPredictions,
    pub component_scores: BTreeMap<String, f64>,
    pub confidence: ReasoningConfidence,
    #[serde(default)]
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct ReasonerOutput {
    pub reasoning: Option<DeepReasoning>,
    pub attempts: u32,
    pub cost_cents: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ConfidenceLabel {
    High,
    Medium,
    Low,
}

impl ConfidenceLabel {
    pub fn label(self) -> &'static str {
        match self {
            ConfidenceLabel::High => "HIGH",
            ConfidenceLabel::Medium => "MEDIUM",
            ConfidenceLabel::Low => "LOW",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreWeights {
    pub behavioral: f64,
    pub gemini: f64,
    pub rules: f64,
    pub trends: f64,
}

impl ScoreWeights {
    pub fn sum(&self) -> f64 {
        self.behavioral + self.gemini + self.rules + self.trends
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionResult {
    pub overall_score: u32,
    pub confidence: f64,
    pub confidence_label: ConfidenceLabel,
    pub behavioral_score: Option<u32>,
    pub gemini_score: u32,
    pub rule_score: u32,
    pub trend_score: u32,
    pub factors: Vec<Factor>,
    pub suggestions: Vec<String>,
    pub behavioral_predictions: Option<BehavioralPredictions>,
    pub warnings: Vec<String>,
    pub score_weights: ScoreWeights,
    pub cost_cents: f64,
    pub latency_ms: u64,
    pub engine_version: String,
    pub matched_rules: Vec<MatchedRule>,
    pub matched_trends: Vec<MatchedTrend>,
    pub hashtag_relevance: f64,
    pub reasoning: Option<DeepReasoning>,
}

/// Rounds to the nearest integer and clamps into `[0, 100]`; NaN maps to 0.
pub fn clamp_score(value: f64) -> u32 {
    if value.is_nan() {
        return 0;
    }
    value.round().max(0.0).min(100.0) as u32
}

pub fn round_to(value: f64, digits: i32) -> f64 {
    let factor = 10f64.powi(digits);
    (value * factor).round() / factor
}

pub fn normalize_text(value: &str) -> String {
    value
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn format_float(value: f64, digits: usize) -> String {
    format!("{:.1$}", value, digits)
}

pub fn format_percent(value: f64) -> String {
    format!("{:.1}%", value)
}
