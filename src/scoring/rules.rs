use std::sync::Arc;
use tracing::{debug, warn};

use crate::cache::EngineCaches;
use crate::scoring::patterns::{ContentView, RulePattern};
use crate::store::{RuleRecord, RuleStore};
use crate::{clamp_score, round_to, MatchedRule, RuleScoreResult, RuleTier};

const MODIFIER_SCALE: f64 = 15.0;

pub struct RuleEngine {
    store: Arc<dyn RuleStore>,
    caches: Arc<EngineCaches>,
}

impl RuleEngine {
    pub fn new(store: Arc<dyn RuleStore>, caches: Arc<EngineCaches>) -> Self {
        Self { store, caches }
    }

    pub async fn load_active_rules(&self, platform: Option<&str>) -> Vec<RuleRecord> {
        let key = format!("rules:{}", platform.unwrap_or("universal"));
        if let Some(rules) = self.caches.rules.get(&key).await {
            debug!(key = %key, count = rules.len(), "rule catalog cache hit");
            return rules;
        }

        match self.store.fetch_active_rules(platform).await {
            Ok(rules) => {
                debug!(key = %key, count = rules.len(), "rule catalog loaded");
                self.caches.rules.set(&key, rules.clone()).await;
                rules
            }
            Err(err) => {
                warn!(error = %err, "failed to load rule catalog; scoring without rules");
                Vec::new()
            }
        }
    }
}

/// Scores `content` against every rule that names a pattern.
///
/// Each hit contributes `min(max_score, score_modifier / 15 * max_score) * weight`; the
/// total is expressed as a percentage of the summed `max_score * weight`. An empty (or
/// pattern-less) catalog yields the neutral 50.
pub fn score_content_against_rules(content: &str, rules: &[RuleRecord]) -> RuleScoreResult {
    let view = ContentView::new(content);
    let mut total = 0.0;
    let mut total_max = 0.0;
    let mut rules_evaluated = 0usize;
    let mut matched_rules = Vec::new();

    for rule in rules {
        let Some(pattern_name) = rule.pattern.as_deref() else {
            continue;
        };
        rules_evaluated += 1;
        total_max += rule.max_score * rule.weight;

        let Some(pattern) = RulePattern::from_name(pattern_name) else {
            debug!(rule = %rule.id, pattern = %pattern_name, "unknown rule pattern");
            continue;
        };
        if !pattern.matches(&view) {
            continue;
        }

        let earned = (rule.score_modifier / MODIFIER_SCALE * rule.max_score).min(rule.max_score);
        total += earned * rule.weight;
        matched_rules.push(MatchedRule {
            rule_id: rule.id.clone(),
            rule_name: rule.name.clone(),
            score: round_to(earned, 2),
            max_score: rule.max_score,
            tier: RuleTier::from_modifier(rule.score_modifier),
        });
    }

    if rules_evaluated == 0 || total_max == 0.0 {
        return RuleScoreResult {
            rule_score: 50,
            matched_rules,
            rules_evaluated,
        };
    }

    RuleScoreResult {
        rule_score: clamp_score(total / total_max * 100.0),
        matched_rules,
        rules_evaluated,
    }
}
