use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::cache::EngineCaches;
use crate::config::TrendConfig;
use crate::fuzzy::best_fuzzy_match;
use crate::store::{ScrapedPost, TrendStore, TrendingSound};
use crate::{clamp_score, round_to, ContentPayload, MatchedTrend, TrendEnrichment};

/// Tags common enough that their presence says nothing about reach.
pub const SATURATED_HASHTAGS: [&str; 12] = [
    "fyp",
    "foryou",
    "foryoupage",
    "fy",
    "viral",
    "trending",
    "explore",
    "explorepage",
    "reels",
    "tiktok",
    "instagram",
    "xyzbca",
];

const RELEVANCE_DIVISOR: f64 = 3.0;
const RELEVANCE_POINTS: f64 = 30.0;
const SATURATED_WEIGHT: f64 = 0.1;

const SOUNDS_KEY: &str = "sounds:top";
const POSTS_KEY: &str = "posts:recent";

pub struct TrendEngine {
    store: Arc<dyn TrendStore>,
    caches: Arc<EngineCaches>,
    config: TrendConfig,
}

impl TrendEngine {
    pub fn new(store: Arc<dyn TrendStore>, caches: Arc<EngineCaches>, config: TrendConfig) -> Self {
        Self {
            store,
            caches,
            config,
        }
    }

    pub async fn enrich(&self, payload: &ContentPayload) -> TrendEnrichment {
        self.enrich_text(&payload.content_text, &payload.hashtags).await
    }

    pub async fn enrich_text(&self, content: &str, hashtags: &[String]) -> TrendEnrichment {
        if content.trim().is_empty() {
            return TrendEnrichment::empty("No content text was provided for trend matching.");
        }

        let sounds = self.trending_sounds().await;
        let posts = if hashtags.is_empty() {
            Vec::new()
        } else {
            self.recent_posts().await
        };
        score_trends(content, hashtags, &sounds, &posts, &self.config)
    }

    async fn trending_sounds(&self) -> Vec<TrendingSound> {
        if let Some(sounds) = self.caches.sounds.get(SOUNDS_KEY).await {
            return sounds;
        }
        match self.store.fetch_trending_sounds(self.config.sound_limit).await {
            Ok(sounds) => {
                debug!(count = sounds.len(), "trending sounds loaded");
                self.caches.sounds.set(SOUNDS_KEY, sounds.clone()).await;
                sounds
            }
            Err(err) => {
                warn!(error = %err, "failed to load trending sounds");
                Vec::new()
            }
        }
    }

    async fn recent_posts(&self) -> Vec<ScrapedPost> {
        if let Some(posts) = self.caches.posts.get(POSTS_KEY).await {
            return posts;
        }
        match self.store.fetch_recent_posts(self.config.post_limit).await {
            Ok(posts) => {
                debug!(count = posts.len(), "recent posts loaded");
                self.caches.posts.set(POSTS_KEY, posts.clone()).await;
                posts
            }
            Err(err) => {
                warn!(error = %err, "failed to load recent posts");
                Vec::new()
            }
        }
    }
}

#[derive(Debug, Default, Clone, Copy)]
struct TagStats {
    count: usize,
    views: u64,
}

fn build_tag_stats(posts: &[ScrapedPost]) -> HashMap<String, TagStats> {
    let mut stats: HashMap<String, TagStats> = HashMap::new();
    for post in posts {
        let tags: HashSet<String> = post
            .hashtags
            .iter()
            .map(|tag| tag.trim().trim_start_matches('#').to_lowercase())
            .filter(|tag| !tag.is_empty())
            .collect();
        for tag in tags {
            let entry = stats.entry(tag).or_default();
            entry.count += 1;
            entry.views = entry.views.saturating_add(post.views);
        }
    }
    stats
}

pub fn score_trends(
    content: &str,
    hashtags: &[String],
    sounds: &[TrendingSound],
    posts: &[ScrapedPost],
    config: &TrendConfig,
) -> TrendEnrichment {
    if content.trim().is_empty() {
        return TrendEnrichment::empty("No content text was provided for trend matching.");
    }

    let mut total = 0.0;
    let mut matched_trends = Vec::new();
    for sound in sounds {
        let Some(name) = sound.sound_name.as_deref() else {
            continue;
        };
        let found = best_fuzzy_match(name, content, config.match_threshold);
        if !found.matched {
            continue;
        }
        let phase = sound.phase();
        total += sound.velocity_score * phase.multiplier();
        matched_trends.push(MatchedTrend {
            sound_name: name.to_string(),
            velocity_score: sound.velocity_score,
            trend_phase: phase,
        });
    }

    let mut relevance_total = 0.0;
    let mut relevant_hashtags = Vec::new();
    let mut saturated_hashtags = Vec::new();
    if !hashtags.is_empty() {
        let stats = build_tag_stats(posts);
        let corpus_size = posts.len();
        for tag in hashtags {
            let blocklisted = SATURATED_HASHTAGS.contains(&tag.as_str());
            let Some(tag_stats) = stats.get(tag).filter(|_| corpus_size > 0) else {
                if blocklisted {
                    saturated_hashtags.push(tag.clone());
                }
                continue;
            };
            let frequency = tag_stats.count as f64 / corpus_size as f64;
            let weight = (tag_stats.views.max(1) as f64).log10() * frequency;
            if blocklisted || frequency > config.saturation_ratio {
                total += weight * SATURATED_WEIGHT;
                saturated_hashtags.push(tag.clone());
            } else {
                relevance_total += weight;
                relevant_hashtags.push(tag.clone());
            }
        }
    }

    let hashtag_relevance = (relevance_total / RELEVANCE_DIVISOR).min(1.0);
    total += (hashtag_relevance * RELEVANCE_POINTS).round();

    let trend_context = describe_trends(
        &matched_trends,
        hashtags,
        &relevant_hashtags,
        &saturated_hashtags,
        hashtag_relevance,
    );

    TrendEnrichment {
        trend_score: clamp_score(total),
        matched_trends,
        hashtag_relevance: round_to(hashtag_relevance, 3),
        trend_context,
        relevant_hashtags,
        saturated_hashtags,
        signal_available: !sounds.is_empty() || (!hashtags.is_empty() && !posts.is_empty()),
    }
}

fn describe_trends(
    matched: &[MatchedTrend],
    hashtags: &[String],
    relevant: &[String],
    saturated: &[String],
    relevance: f64,
) -> String {
    let mut parts = Vec::new();

    if matched.is_empty() {
        parts.push("No trending sounds matched this content.".to_string());
    } else {
        let sounds = matched
            .iter()
            .map(|trend| {
                format!(
                    "\"{}\" ({}, velocity {:.0})",
                    trend.sound_name,
                    trend.trend_phase.label(),
                    trend.velocity_score
                )
            })
            .collect::<Vec<_>>()
            .join(", ");
        parts.push(format!("Matches trending sounds: {}.", sounds));
    }

    if hashtags.is_empty() {
        parts.push("No hashtags were provided.".to_string());
    } else {
        if !relevant.is_empty() {
            parts.push(format!(
                "Relevant hashtags: {} (relevance {:.2}).",
                hashtag_list(relevant),
                relevance
            ));
        }
        if !saturated.is_empty() {
            parts.push(format!(
                "Saturated hashtags with little reach signal: {}.",
                hashtag_list(saturated)
            ));
        }
        if relevant.is_empty() && saturated.is_empty() {
            parts.push(format!(
                "Hashtags {} do not appear in recent trending posts.",
                hashtag_list(hashtags)
            ));
        }
    }

    parts.join(" ")
}

fn hashtag_list(tags: &[String]) -> String {
    tags.iter()
        .map(|tag| format!("#{}", tag))
        .collect::<Vec<_>>()
        .join(", ")
}
