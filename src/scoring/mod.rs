pub mod aggregate;
pub mod patterns;
pub mod pipeline;
pub mod rules;
pub mod trends;

pub use aggregate::{AggregateInputs, Aggregator};
pub use patterns::{ContentView, RulePattern};
pub use pipeline::PredictionPipeline;
pub use rules::{score_content_against_rules, RuleEngine};
pub use trends::{score_trends, TrendEngine, SATURATED_HASHTAGS};
