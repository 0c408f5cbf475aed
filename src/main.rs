mod api;
mod server;

use clap::{Args, Parser, Subcommand};
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use viral_predict::clock::SystemClock;
use viral_predict::config::PredictorConfig;
use viral_predict::llm::{HttpModelProvider, ModelProvider};
use viral_predict::store::{JsonRuleStore, JsonTrendStore};
use viral_predict::{
    format_float, format_percent, AnalysisInput, ContentType, InputMode, PredictionPipeline,
    PredictionResult,
};

#[derive(Parser)]
#[command(name = "viral-predict", about = "Short-form content viral potential predictor")]
struct Cli {
    /// Path to a TOML config file (defaults to config/predictor.toml).
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    Predict(PredictArgs),
    Serve(ServeArgs),
    /// Writes the effective configuration to a TOML file.
    InitConfig(InitConfigArgs),
}

#[derive(Args, Debug, Clone)]
struct PredictArgs {
    #[arg(long)]
    text: Option<String>,
    #[arg(long, default_value = "text")]
    mode: String,
    #[arg(long)]
    url: Option<String>,
    #[arg(long)]
    file: Option<String>,
    #[arg(long, default_value = "post")]
    content_type: String,
    #[arg(long)]
    niche: Option<String>,
    #[arg(long)]
    platform: Option<String>,
    #[arg(long)]
    creator: Option<String>,
    /// Print the full result as JSON.
    #[arg(long)]
    json: bool,
}

#[derive(Args, Debug, Clone)]
pub struct ServeArgs {
    #[arg(long, default_value = "127.0.0.1")]
    host: String,
    #[arg(long, default_value_t = 8787)]
    port: u16,
}

#[derive(Args, Debug, Clone)]
struct InitConfigArgs {
    #[arg(long, default_value = "config/predictor.toml")]
    path: PathBuf,
}

#[tokio::main]
async fn main() {
    load_dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("viral_predict=info,tower_http=info")),
        )
        .with_writer(io::stderr)
        .init();

    if let Err(err) = run().await {
        eprintln!("Error: {}", err);
        std::process::exit(1);
    }
}

async fn run() -> Result<(), String> {
    let cli = Cli::parse();
    let (config, config_path) = PredictorConfig::load(cli.config)?;
    if let Some(path) = config_path.as_ref().filter(|path| path.exists()) {
        info!(path = %path.display(), "loaded config");
    }

    match cli.command {
        Command::Predict(args) => run_predict(args, &config).await,
        Command::Serve(args) => server::serve(args, build_pipeline(&config)?).await,
        Command::InitConfig(args) => {
            config.write(&args.path)?;
            println!("Wrote {}", args.path.display());
            Ok(())
        }
    }
}

fn build_pipeline(config: &PredictorConfig) -> Result<PredictionPipeline, String> {
    let primary = HttpModelProvider::from_config(&config.primary_model).ok_or_else(|| {
        format!(
            "{} is not set; the primary model is required",
            config.primary_model.api_key_env
        )
    })?;
    let secondary = HttpModelProvider::from_config(&config.secondary_model)
        .map(|provider| Arc::new(provider) as Arc<dyn ModelProvider>);
    if secondary.is_none() {
        warn!(
            key = %config.secondary_model.api_key_env,
            "secondary model not configured; predictions will run without reasoning"
        );
    }

    Ok(PredictionPipeline::from_config(
        config,
        Arc::new(primary),
        secondary,
        Arc::new(JsonRuleStore::new(config.stores.rules_path.clone())),
        Arc::new(JsonTrendStore::new(config.stores.trends_path.clone())),
        Arc::new(SystemClock),
    ))
}

async fn run_predict(args: PredictArgs, config: &PredictorConfig) -> Result<(), String> {
    let input_mode =
        InputMode::from_str(&args.mode).ok_or_else(|| format!("invalid mode: {}", args.mode))?;
    let content_type = ContentType::from_str(&args.content_type)
        .ok_or_else(|| format!("invalid content type: {}", args.content_type))?;
    let content_text = match input_mode {
        InputMode::Text => Some(read_text(args.text)?),
        _ => args.text,
    };

    let input = AnalysisInput {
        input_mode,
        content_text,
        content_type,
        niche: args.niche,
        creator_handle: args.creator,
        society_id: None,
        platform: args.platform,
        video_url: args.url,
        file_reference: args.file,
    };

    let pipeline = build_pipeline(config)?;
    let result = pipeline.run(&input).await.map_err(|err| err.to_string())?;

    if args.json {
        let payload = serde_json::to_string_pretty(&result)
            .map_err(|err| format!("failed to serialize result: {}", err))?;
        println!("{}", payload);
        return Ok(());
    }
    print_result(&result);
    Ok(())
}

fn print_result(result: &PredictionResult) {
    println!(
        "Viral score: {} ({} confidence, {})",
        result.overall_score,
        result.confidence_label.label(),
        format_float(result.confidence, 2)
    );
    let behavioral = result
        .behavioral_score
        .map(|score| score.to_string())
        .unwrap_or_else(|| "n/a".to_string());
    println!(
        "Signals: behavioral {} | primary {} | rules {} | trends {}",
        behavioral, result.gemini_score, result.rule_score, result.trend_score
    );
    let weights = &result.score_weights;
    println!(
        "Weights: behavioral {} | primary {} | rules {} | trends {}",
        format_float(weights.behavioral, 3),
        format_float(weights.gemini, 3),
        format_float(weights.rules, 3),
        format_float(weights.trends, 3)
    );

    println!("\nFactors:");
    for factor in &result.factors {
        println!("  {}: {}/10", factor.name, format_float(factor.score, 1));
    }

    if let Some(predictions) = result.behavioral_predictions.as_ref() {
        println!(
            "\nPredicted behavior: completion {} ({}) | share {} ({}) | comment {} ({}) | save {} ({})",
            format_percent(predictions.completion_pct),
            predictions.completion_percentile,
            format_percent(predictions.share_pct),
            predictions.share_percentile,
            format_percent(predictions.comment_pct),
            predictions.comment_percentile,
            format_percent(predictions.save_pct),
            predictions.save_percentile
        );
    }

    if !result.matched_rules.is_empty() {
        let names: Vec<&str> = result
            .matched_rules
            .iter()
            .map(|rule| rule.rule_name.as_str())
            .collect();
        println!("Matched rules: {}", names.join(", "));
    }
    if !result.matched_trends.is_empty() {
        let names: Vec<&str> = result
            .matched_trends
            .iter()
            .map(|trend| trend.sound_name.as_str())
            .collect();
        println!("Matched trends: {}", names.join(", "));
    }

    if !result.suggestions.is_empty() {
        println!("\nSuggestions:");
        for suggestion in &result.suggestions {
            println!("- {}", suggestion);
        }
    }
    if !result.warnings.is_empty() {
        println!("\nWarnings:");
        for warning in &result.warnings {
            println!("- {}", warning);
        }
    }
    println!(
        "\nCost: {} cents | latency {} ms | {}",
        format_float(result.cost_cents, 2),
        result.latency_ms,
        result.engine_version
    );
}

fn read_text(arg: Option<String>) -> Result<String, String> {
    if let Some(text) = arg {
        if !text.trim().is_empty() {
            return Ok(text);
        }
    }

    let mut buffer = String::new();
    io::stdin()
        .read_to_string(&mut buffer)
        .map_err(|err| format!("failed reading stdin: {}", err))?;
    let trimmed = buffer.trim();
    if trimmed.is_empty() {
        return Err("missing content text: pass --text or pipe stdin".to_string());
    }
    Ok(trimmed.to_string())
}

fn load_dotenv() {
    let _ = dotenvy::dotenv();
    let manifest_dir = env!("CARGO_MANIFEST_DIR");
    let manifest_path = Path::new(manifest_dir).join(".env");
    let _ = dotenvy::from_path(manifest_path);
}
