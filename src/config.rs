use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SignalWeights {
    pub behavioral: f64,
    pub gemini: f64,
    pub rules: f64,
    pub trends: f64,
}

impl Default for SignalWeights {
    fn default() -> Self {
        Self {
            behavioral: 0.45,
            gemini: 0.25,
            rules: 0.20,
            trends: 0.10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub attempt_timeout_ms: u64,
    pub retry_delay_ms: u64,
    pub cost_per_attempt_cents: f64,
}

impl RetryConfig {
    pub fn attempt_timeout(&self) -> Duration {
        Duration::from_millis(self.attempt_timeout_ms)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    fn analyzer_default() -> Self {
        Self {
            max_attempts: 3,
            attempt_timeout_ms: 15_000,
            retry_delay_ms: 250,
            cost_per_attempt_cents: 0.12,
        }
    }

    fn reasoner_default() -> Self {
        Self {
            max_attempts: 3,
            attempt_timeout_ms: 30_000,
            retry_delay_ms: 250,
            cost_per_attempt_cents: 0.45,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BreakerConfig {
    pub failure_threshold: u32,
    pub initial_backoff_ms: u64,
    pub backoff_multiplier: f64,
    pub max_backoff_ms: u64,
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 3,
            initial_backoff_ms: 1_000,
            backoff_multiplier: 3.0,
            max_backoff_ms: 600_000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    pub rules_ttl_secs: u64,
    pub sounds_ttl_secs: u64,
    pub posts_ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            rules_ttl_secs: 3_600,
            sounds_ttl_secs: 300,
            posts_ttl_secs: 900,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrendConfig {
    pub sound_limit: usize,
    pub post_limit: usize,
    pub match_threshold: f64,
    pub saturation_ratio: f64,
}

impl Default for TrendConfig {
    fn default() -> Self {
        Self {
            sound_limit: 50,
            post_limit: 200,
            match_threshold: 0.7,
            saturation_ratio: 0.4,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BehavioralBenchmarks {
    pub share_pct: f64,
    pub comment_pct: f64,
    pub save_pct: f64,
}

impl Default for BehavioralBenchmarks {
    fn default() -> Self {
        Self {
            share_pct: 5.0,
            comment_pct: 3.0,
            save_pct: 4.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    pub rules_path: PathBuf,
    pub trends_path: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            rules_path: PathBuf::from("data/rules.json"),
            trends_path: PathBuf::from("data/trends.json"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelEndpointConfig {
    pub api_base: String,
    pub model: String,
    pub api_key_env: String,
    pub temperature: f64,
}

impl ModelEndpointConfig {
    fn primary_default() -> Self {
        Self {
            api_base: "https://generativelanguage.googleapis.com/v1beta/openai".to_string(),
            model: "gemini-2.0-flash".to_string(),
            api_key_env: "GEMINI_API_KEY".to_string(),
            temperature: 0.3,
        }
    }

    fn secondary_default() -> Self {
        Self {
            api_base: "https://api.deepseek.com/v1".to_string(),
            model: "deepseek-reasoner".to_string(),
            api_key_env: "DEEPSEEK_API_KEY".to_string(),
            temperature: 0.4,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PredictorConfig {
    pub weights: SignalWeights,
    pub analyzer: RetryConfig,
    pub reasoner: RetryConfig,
    pub breaker: BreakerConfig,
    pub cache: CacheConfig,
    pub trend: TrendConfig,
    pub behavioral: BehavioralBenchmarks,
    pub stores: StoreConfig,
    pub primary_model: ModelEndpointConfig,
    pub secondary_model: ModelEndpointConfig,
}

impl Default for PredictorConfig {
    fn default() -> Self {
        Self {
            weights: SignalWeights::default(),
            analyzer: RetryConfig::analyzer_default(),
            reasoner: RetryConfig::reasoner_default(),
            breaker: BreakerConfig::default(),
            cache: CacheConfig::default(),
            trend: TrendConfig::default(),
            behavioral: BehavioralBenchmarks::default(),
            stores: StoreConfig::default(),
            primary_model: ModelEndpointConfig::primary_default(),
            secondary_model: ModelEndpointConfig::secondary_default(),
        }
    }
}

impl PredictorConfig {
    pub fn load(path: Option<PathBuf>) -> Result<(Self, Option<PathBuf>), String> {
        let config_path = path.or_else(default_config_path);
        let mut config = if let Some(path) = config_path.as_ref() {
            if path.exists() {
                let contents = std::fs::read_to_string(path)
                    .map_err(|err| format!("failed to read config: {}", err))?;
                toml::from_str(&contents)
                    .map_err(|err| format!("failed to parse config: {}", err))?
            } else {
                PredictorConfig::default()
            }
        } else {
            PredictorConfig::default()
        };

        config.apply_env_overrides();
        Ok((config, config_path))
    }

    pub fn write(&self, path: &Path) -> Result<(), String> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|err| format!("failed to create config dir: {}", err))?;
        }
        let payload = toml::to_string_pretty(self)
            .map_err(|err| format!("failed to serialize config: {}", err))?;
        std::fs::write(path, payload)
            .map_err(|err| format!("failed to write config: {}", err))?;
        Ok(())
    }

    fn apply_env_overrides(&mut self) {
        if let Some(model) = non_empty_var("PRIMARY_MODEL") {
            self.primary_model.model = model;
        }
        if let Some(api_base) = non_empty_var("PRIMARY_API_BASE") {
            self.primary_model.api_base = api_base;
        }
        if let Some(model) = non_empty_var("SECONDARY_MODEL") {
            self.secondary_model.model = model;
        }
        if let Some(api_base) = non_empty_var("SECONDARY_API_BASE") {
            self.secondary_model.api_base = api_base;
        }
        if let Some(path) = non_empty_var("RULES_PATH") {
            self.stores.rules_path = PathBuf::from(path);
        }
        if let Some(path) = non_empty_var("TRENDS_PATH") {
            self.stores.trends_path = PathBuf::from(path);
        }
        if let Ok(timeout) = env::var("ANALYZER_TIMEOUT_MS") {
            if let Ok(value) = timeout.parse::<u64>() {
                self.analyzer.attempt_timeout_ms = value;
            }
        }
        if let Ok(timeout) = env::var("REASONER_TIMEOUT_MS") {
            if let Ok(value) = timeout.parse::<u64>() {
                self.reasoner.attempt_timeout_ms = value;
            }
        }
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|value| !value.trim().is_empty())
}

fn default_config_path() -> Option<PathBuf> {
    env::var("PREDICTOR_CONFIG_PATH")
        .ok()
        .filter(|value| !value.trim().is_empty())
        .map(PathBuf::from)
        .or_else(|| Some(PathBuf::from("config/predictor.toml")))
}
