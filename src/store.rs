use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::path::PathBuf;

use crate::error::StoreError;
use crate::TrendPhase;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleRecord {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub pattern: Option<String>,
    pub score_modifier: f64,
    #[serde(default)]
    pub platform: Option<String>,
    #[serde(default)]
    pub evaluation_prompt: Option<String>,
    #[serde(default = "default_rule_weight")]
    pub weight: f64,
    #[serde(default = "default_rule_max_score")]
    pub max_score: f64,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_rule_weight() -> f64 {
    1.0
}

fn default_rule_max_score() -> f64 {
    10.0
}

fn default_active() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendingSound {
    #[serde(default)]
    pub sound_name: Option<String>,
    pub velocity_score: f64,
    #[serde(default)]
    pub trend_phase: Option<String>,
}

impl TrendingSound {
    pub fn phase(&self) -> TrendPhase {
        self.trend_phase
            .as_deref()
            .map(TrendPhase::from_str)
            .unwrap_or(TrendPhase::Other)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScrapedPost {
    #[serde(default)]
    pub hashtags: Vec<String>,
    #[serde(default)]
    pub views: u64,
    #[serde(default)]
    pub scraped_at: i64,
}

#[async_trait]
pub trait RuleStore: Send + Sync {
    /// Active rules for `platform` plus universal (platform-less) rules.
    async fn fetch_active_rules(&self, platform: Option<&str>)
        -> Result<Vec<RuleRecord>, StoreError>;
}

#[async_trait]
pub trait TrendStore: Send + Sync {
    async fn fetch_trending_sounds(&self, limit: usize) -> Result<Vec<TrendingSound>, StoreError>;

    async fn fetch_recent_posts(&self, limit: usize) -> Result<Vec<ScrapedPost>, StoreError>;
}

pub fn select_active_rules(rules: Vec<RuleRecord>, platform: Option<&str>) -> Vec<RuleRecord> {
    rules
        .into_iter()
        .filter(|rule| rule.is_active)
        .filter(|rule| match (rule.platform.as_deref(), platform) {
            (None, _) => true,
            (Some(rule_platform), Some(requested)) => rule_platform.eq_ignore_ascii_case(requested),
            (Some(_), None) => false,
        })
        .collect()
}

fn top_sounds(mut sounds: Vec<TrendingSound>, limit: usize) -> Vec<TrendingSound> {
    sounds.sort_by(|a, b| {
        b.velocity_score
            .partial_cmp(&a.velocity_score)
            .unwrap_or(Ordering::Equal)
    });
    sounds.truncate(limit);
    sounds
}

fn recent_posts(mut posts: Vec<ScrapedPost>, limit: usize) -> Vec<ScrapedPost> {
    posts.sort_by(|a, b| b.scraped_at.cmp(&a.scraped_at));
    posts.truncate(limit);
    posts
}

pub struct JsonRuleStore {
    path: PathBuf,
}

impl JsonRuleStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

#[async_trait]
impl RuleStore for JsonRuleStore {
    async fn fetch_active_rules(
        &self,
        platform: Option<&str>,
    ) -> Result<Vec<RuleRecord>, StoreError> {
        let data = tokio::fs::read_to_string(&self.path).await?;
        if data.trim().is_empty() {
            return Ok(Vec::new());
        }
        let rules: Vec<RuleRecord> = serde_json::from_str(&data)?;
        Ok(select_active_rules(rules, platform))
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrendCorpus {
    #[serde(default)]
    pub trending_sounds: Vec<TrendingSound>,
    #[serde(default)]
    pub scraped_videos: Vec<ScrapedPost>,
}

pub struct JsonTrendStore {
    path: PathBuf,
}

impl JsonTrendStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    async fn read_corpus(&self) -> Result<TrendCorpus, StoreError> {
        let data = tokio::fs::read_to_string(&self.path).await?;
        if data.trim().is_empty() {
            return Ok(TrendCorpus::default());
        }
        Ok(serde_json::from_str(&data)?)
    }
}

#[async_trait]
impl TrendStore for JsonTrendStore {
    async fn fetch_trending_sounds(&self, limit: usize) -> Result<Vec<TrendingSound>, StoreError> {
        let corpus = self.read_corpus().await?;
        Ok(top_sounds(corpus.trending_sounds, limit))
    }

    async fn fetch_recent_posts(&self, limit: usize) -> Result<Vec<ScrapedPost>, StoreError> {
        let corpus = self.read_corpus().await?;
        Ok(recent_posts(corpus.scraped_videos, limit))
    }
}

#[derive(Debug, Clone, Default)]
pub struct MemoryRuleStore {
    rules: Vec<RuleRecord>,
}

impl MemoryRuleStore {
    pub fn new(rules: Vec<RuleRecord>) -> Self {
        Self { rules }
    }
}

#[async_trait]
impl RuleStore for MemoryRuleStore {
    async fn fetch_active_rules(
        &self,
        platform: Option<&str>,
    ) -> Result<Vec<RuleRecord>, StoreError> {
        Ok(select_active_rules(self.rules.clone(), platform))
    }
}

#[derive(Debug, Clone, Default)]
pub struct MemoryTrendStore {
    corpus: TrendCorpus,
}

impl MemoryTrendStore {
    pub fn new(corpus: TrendCorpus) -> Self {
        Self { corpus }
    }
}

#[async_trait]
impl TrendStore for MemoryTrendStore {
    async fn fetch_trending_sounds(&self, limit: usize) -> Result<Vec<TrendingSound>, StoreError> {
        Ok(top_sounds(self.corpus.trending_sounds.clone(), limit))
    }

    async fn fetch_recent_posts(&self, limit: usize) -> Result<Vec<ScrapedPost>, StoreError> {
        Ok(recent_posts(self.corpus.scraped_videos.clone(), limit))
    }
}
