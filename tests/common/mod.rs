#![allow(dead_code)]

use async_trait::async_trait;
use serde_json::json;
use std::collections::{BTreeMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use viral_predict::clock::Clock;
use viral_predict::config::PredictorConfig;
use viral_predict::llm::{ModelProvider, ModelRequest};
use viral_predict::store::{
    MemoryRuleStore, MemoryTrendStore, RuleRecord, RuleStore, ScrapedPost, TrendCorpus,
    TrendStore, TrendingSound,
};
use viral_predict::{
    BehavioralPredictions, ContentVariant, ConversationTheme, DeepReasoning, Factor, ModelError,
    PersonaReaction, PredictionPipeline, PrimaryAnalysis, PrimaryScores, ReasoningConfidence,
    StoreError, FACTOR_NAMES,
};

/// One scripted provider response.
#[derive(Clone)]
pub enum Script {
    Reply(String),
    Fail(ModelError),
    /// Never resolves; only the per-attempt timeout ends it.
    Hang,
}

/// Provider that replays queued responses, then repeats `fallback`.
pub struct ScriptedProvider {
    queue: Mutex<VecDeque<Script>>,
    fallback: Script,
    calls: AtomicUsize,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedProvider {
    pub fn new(queue: Vec<Script>, fallback: Script) -> Arc<Self> {
        Arc::new(Self {
            queue: Mutex::new(queue.into()),
            fallback,
            calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        })
    }

    pub fn always(script: Script) -> Arc<Self> {
        Self::new(Vec::new(), script)
    }

    pub fn push(&self, script: Script) {
        self.queue.lock().unwrap().push_back(script);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl ModelProvider for ScriptedProvider {
    fn model(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, request: &ModelRequest) -> Result<String, ModelError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().unwrap().push(request.user.clone());
        let next = self
            .queue
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone());
        match next {
            Script::Reply(text) => Ok(text),
            Script::Fail(err) => Err(err),
            Script::Hang => std::future::pending().await,
        }
    }
}

pub struct CountingRuleStore {
    inner: MemoryRuleStore,
    pub fetches: AtomicUsize,
}

impl CountingRuleStore {
    pub fn new(rules: Vec<RuleRecord>) -> Arc<Self> {
        Arc::new(Self {
            inner: MemoryRuleStore::new(rules),
            fetches: AtomicUsize::new(0),
        })
    }

    pub fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RuleStore for CountingRuleStore {
    async fn fetch_active_rules(
        &self,
        platform: Option<&str>,
    ) -> Result<Vec<RuleRecord>, StoreError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        self.inner.fetch_active_rules(platform).await
    }
}

pub struct FailingRuleStore;

#[async_trait]
impl RuleStore for FailingRuleStore {
    async fn fetch_active_rules(
        &self,
        _platform: Option<&str>,
    ) -> Result<Vec<RuleRecord>, StoreError> {
        Err(StoreError::Unavailable("catalog offline".to_string()))
    }
}

pub struct FailingTrendStore;

#[async_trait]
impl TrendStore for FailingTrendStore {
    async fn fetch_trending_sounds(&self, _limit: usize) -> Result<Vec<TrendingSound>, StoreError> {
        Err(StoreError::Unavailable("trend corpus offline".to_string()))
    }

    async fn fetch_recent_posts(&self, _limit: usize) -> Result<Vec<ScrapedPost>, StoreError> {
        Err(StoreError::Unavailable("trend corpus offline".to_string()))
    }
}

pub struct CountingTrendStore {
    inner: MemoryTrendStore,
    pub sound_fetches: AtomicUsize,
    pub post_fetches: AtomicUsize,
}

impl CountingTrendStore {
    pub fn new(corpus: TrendCorpus) -> Arc<Self> {
        Arc::new(Self {
            inner: MemoryTrendStore::new(corpus),
            sound_fetches: AtomicUsize::new(0),
            post_fetches: AtomicUsize::new(0),
        })
    }

    pub fn sound_fetches(&self) -> usize {
        self.sound_fetches.load(Ordering::SeqCst)
    }

    pub fn post_fetches(&self) -> usize {
        self.post_fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TrendStore for CountingTrendStore {
    async fn fetch_trending_sounds(&self, limit: usize) -> Result<Vec<TrendingSound>, StoreError> {
        self.sound_fetches.fetch_add(1, Ordering::SeqCst);
        self.inner.fetch_trending_sounds(limit).await
    }

    async fn fetch_recent_posts(&self, limit: usize) -> Result<Vec<ScrapedPost>, StoreError> {
        self.post_fetches.fetch_add(1, Ordering::SeqCst);
        self.inner.fetch_recent_posts(limit).await
    }
}

pub fn rule(id: &str, pattern: Option<&str>, score_modifier: f64) -> RuleRecord {
    RuleRecord {
        id: id.to_string(),
        name: id.replace('-', " "),
        description: String::new(),
        category: "test".to_string(),
        pattern: pattern.map(str::to_string),
        score_modifier,
        platform: None,
        evaluation_prompt: None,
        weight: 1.0,
        max_score: 10.0,
        is_active: true,
    }
}

pub fn sound(name: &str, velocity_score: f64, phase: &str) -> TrendingSound {
    TrendingSound {
        sound_name: Some(name.to_string()),
        velocity_score,
        trend_phase: Some(phase.to_string()),
    }
}

pub fn post(hashtags: &[&str], views: u64) -> ScrapedPost {
    ScrapedPost {
        hashtags: hashtags.iter().map(|tag| tag.to_string()).collect(),
        views,
        scraped_at: 0,
    }
}

/// Primary-model JSON with every factor at `score`.
pub fn analysis_json(score: f64) -> String {
    let factors: Vec<_> = FACTOR_NAMES
        .iter()
        .map(|name| {
            json!({
                "name": name,
                "score": score,
                "description": format!("{} looks solid", name),
                "tips": [format!("Improve {}", name.to_lowercase())]
            })
        })
        .collect();
    json!({
        "factors": factors,
        "overall_impression": "Clear hook with a familiar format.",
        "content_summary": "A short routine video.",
        "component_scores": {
            "hook": score,
            "retention": score,
            "emotion": score,
            "shareability": score,
            "originality": score
        }
    })
    .to_string()
}

pub fn analysis(score: f64) -> PrimaryAnalysis {
    PrimaryAnalysis {
        factors: FACTOR_NAMES
            .iter()
            .map(|name| Factor {
                name: name.to_string(),
                score,
                description: String::new(),
                tips: vec![format!("Improve {}", name.to_lowercase())],
            })
            .collect(),
        overall_impression: "fine".to_string(),
        content_summary: "summary".to_string(),
        component_scores: PrimaryScores {
            hook: score,
            retention: score,
            emotion: score,
            shareability: score,
            originality: score,
        },
    }
}

pub fn predictions(completion: f64, share: f64, comment: f64, save: f64) -> BehavioralPredictions {
    BehavioralPredictions {
        completion_pct: completion,
        share_pct: share,
        comment_pct: comment,
        save_pct: save,
        completion_percentile: "top 40%".to_string(),
        share_percentile: "top 30%".to_string(),
        comment_percentile: "top 50%".to_string(),
        save_percentile: "top 35%".to_string(),
    }
}

pub fn reasoning(
    behavior: BehavioralPredictions,
    confidence: ReasoningConfidence,
) -> DeepReasoning {
    DeepReasoning {
        persona_reactions: (0..5)
            .map(|idx| PersonaReaction {
                persona: format!("persona {}", idx),
                reaction: "would watch".to_string(),
                would_share: idx % 2 == 0,
            })
            .collect(),
        suggestions: vec![
            "Cut the intro to one line".to_string(),
            "Show the result first".to_string(),
            "Ask viewers for their routine".to_string(),
        ],
        variants: vec![
            ContentVariant {
                text: "Variant one".to_string(),
                rationale: "shorter".to_string(),
            },
            ContentVariant {
                text: "Variant two".to_string(),
                rationale: "bolder".to_string(),
            },
        ],
        conversation_themes: vec![ConversationTheme {
            theme: "morning habits".to_string(),
            sentiment: "positive".to_string(),
        }],
        behavioral_predictions: behavior,
        component_scores: BTreeMap::from([
            ("hook".to_string(), 7.0),
            ("relatability".to_string(), 6.5),
        ]),
        confidence,
        warnings: Vec::new(),
    }
}

/// Secondary-model JSON wrapped the way reasoning models tend to answer.
pub fn reasoning_json(completion: f64, share: f64, comment: f64, save: f64) -> String {
    let mut value =
        serde_json::to_value(reasoning(
            predictions(completion, share, comment, save),
            ReasoningConfidence::High,
        ))
        .unwrap();
    value["confidence"] = json!("High");
    value.as_object_mut().unwrap().remove("warnings");
    format!(
        "<think>Five personas, then predictions.</think>\n```json\n{}\n```",
        value
    )
}

/// Defaults with no delay between retries.
pub fn test_config() -> PredictorConfig {
    let mut config = PredictorConfig::default();
    config.analyzer.retry_delay_ms = 0;
    config.reasoner.retry_delay_ms = 0;
    config
}

pub fn pipeline(
    primary: Arc<ScriptedProvider>,
    secondary: Option<Arc<ScriptedProvider>>,
    rules: Vec<RuleRecord>,
    corpus: TrendCorpus,
    clock: Arc<dyn Clock>,
) -> PredictionPipeline {
    PredictionPipeline::from_config(
        &test_config(),
        primary,
        secondary.map(|provider| provider as Arc<dyn ModelProvider>),
        Arc::new(MemoryRuleStore::new(rules)),
        Arc::new(MemoryTrendStore::new(corpus)),
        clock,
    )
}
