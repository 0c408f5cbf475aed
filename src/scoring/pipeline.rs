use std::sync::Arc;
use tokio::time::Instant;
use tracing::{info, info_span, Instrument};

use crate::analyzer::PrimaryAnalyzer;
use crate::cache::EngineCaches;
use crate::clock::Clock;
use crate::config::PredictorConfig;
use crate::error::PipelineError;
use crate::llm::ModelProvider;
use crate::normalize::normalize;
use crate::reasoner::{BreakerPolicy, CircuitBreaker, ReasoningContext, SecondaryReasoner};
use crate::scoring::{
    score_content_against_rules, AggregateInputs, Aggregator, RuleEngine, TrendEngine,
};
use crate::store::{RuleStore, TrendStore};
use crate::{AnalysisInput, PredictionResult, ReasonerOutput};

pub struct PredictionPipeline {
    analyzer: PrimaryAnalyzer,
    rules: RuleEngine,
    trends: TrendEngine,
    reasoner: Option<SecondaryReasoner>,
    aggregator: Aggregator,
}

impl PredictionPipeline {
    pub fn new(
        analyzer: PrimaryAnalyzer,
        rules: RuleEngine,
        trends: TrendEngine,
        reasoner: Option<SecondaryReasoner>,
        aggregator: Aggregator,
    ) -> Self {
        Self {
            analyzer,
            rules,
            trends,
            reasoner,
            aggregator,
        }
    }

    pub fn from_config(
        config: &PredictorConfig,
        primary: Arc<dyn ModelProvider>,
        secondary: Option<Arc<dyn ModelProvider>>,
        rule_store: Arc<dyn RuleStore>,
        trend_store: Arc<dyn TrendStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let caches = Arc::new(EngineCaches::with_clock(&config.cache, clock.clone()));
        let breaker = CircuitBreaker::new(BreakerPolicy::from_config(&config.breaker), clock);
        Self::new(
            PrimaryAnalyzer::new(primary, &config.analyzer),
            RuleEngine::new(rule_store, caches.clone()),
            TrendEngine::new(trend_store, caches, config.trend.clone()),
            secondary.map(|provider| SecondaryReasoner::new(provider, &config.reasoner, breaker)),
            Aggregator::new(config.weights, config.behavioral.clone()),
        )
    }

    pub fn reasoner(&self) -> Option<&SecondaryReasoner> {
        self.reasoner.as_ref()
    }

    pub async fn run(&self, input: &AnalysisInput) -> Result<PredictionResult, PipelineError> {
        let started = Instant::now();
        let payload = normalize(input)?;
        let span = info_span!(
            "predict",
            content = %payload.fingerprint(),
            mode = payload.input_mode.label()
        );

        async {
            let (analysis, rules, trends) = tokio::join!(
                self.analyzer.analyze(&payload),
                async {
                    let catalog = self.rules.load_active_rules(payload.platform.as_deref()).await;
                    score_content_against_rules(&payload.content_text, &catalog)
                },
                self.trends.enrich(&payload),
            );
            let analysis = analysis?;

            let reasoned = match self.reasoner.as_ref() {
                Some(reasoner) => {
                    reasoner
                        .reason(ReasoningContext {
                            payload: &payload,
                            analysis: &analysis.analysis,
                            rules: &rules,
                            trends: &trends,
                        })
                        .await
                }
                None => ReasonerOutput {
                    reasoning: None,
                    attempts: 0,
                    cost_cents: 0.0,
                },
            };

            let result = self.aggregator.aggregate(AggregateInputs {
                analysis: &analysis.analysis,
                rules: &rules,
                trends: &trends,
                reasoning: reasoned.reasoning.as_ref(),
                cost_cents: analysis.cost_cents + reasoned.cost_cents,
                latency_ms: started.elapsed().as_millis() as u64,
            });
            info!(
                overall = result.overall_score,
                confidence = result.confidence_label.label(),
                latency_ms = result.latency_ms,
                "prediction complete"
            );
            Ok::<_, PipelineError>(result)
        }
        .instrument(span)
        .await
    }
}
