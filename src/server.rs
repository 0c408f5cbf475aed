use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use std::{
    net::SocketAddr,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    time::{SystemTime, UNIX_EPOCH},
};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::api::{ApiError, ApiPredictionRequest, ApiPredictionResponse};
use viral_predict::{PipelineError, PredictionPipeline};

#[derive(Clone)]
struct AppState {
    pipeline: Arc<PredictionPipeline>,
}

static REQUEST_COUNTER: AtomicUsize = AtomicUsize::new(0);

pub async fn serve(args: crate::ServeArgs, pipeline: PredictionPipeline) -> Result<(), String> {
    let state = AppState {
        pipeline: Arc::new(pipeline),
    };

    let app = router(state);

    let addr: SocketAddr = format!("{}:{}", args.host, args.port)
        .parse()
        .map_err(|err| format!("invalid bind address: {}", err))?;
    info!(%addr, "prediction server listening");

    axum::serve(
        tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|err| format!("failed to bind server: {}", err))?,
        app,
    )
    .await
    .map_err(|err| format!("server error: {}", err))?;

    Ok(())
}

fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .route("/api/predict", post(predict_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> impl IntoResponse {
    StatusCode::OK
}

async fn predict_handler(
    State(state): State<AppState>,
    Json(request): Json<ApiPredictionRequest>,
) -> Result<Json<ApiPredictionResponse>, (StatusCode, Json<ApiError>)> {
    let request_id = request
        .request_id
        .clone()
        .unwrap_or_else(generate_request_id);
    let fail = |status: StatusCode, error: String| {
        (
            status,
            Json(ApiError {
                request_id: request_id.clone(),
                error,
            }),
        )
    };

    let input = request
        .into_input()
        .map_err(|err| fail(StatusCode::BAD_REQUEST, err))?;

    match state.pipeline.run(&input).await {
        Ok(result) => Ok(Json(ApiPredictionResponse {
            request_id: request_id.clone(),
            result,
        })),
        Err(err) => {
            warn!(request_id = %request_id, error = %err, "prediction failed");
            let status = match err {
                PipelineError::InvalidInput(_) => StatusCode::BAD_REQUEST,
                PipelineError::Analyzer(_) => StatusCode::BAD_GATEWAY,
            };
            Err(fail(status, err.to_string()))
        }
    }
}

fn generate_request_id() -> String {
    let counter = REQUEST_COUNTER.fetch_add(1, Ordering::Relaxed);
    format!("req-{}-{}", now_ms(), counter)
}

fn now_ms() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|duration| duration.as_millis())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::{json, Value};
    use viral_predict::clock::SystemClock;
    use viral_predict::config::PredictorConfig;
    use viral_predict::llm::{ModelProvider, ModelRequest};
    use viral_predict::store::{MemoryRuleStore, MemoryTrendStore, TrendCorpus};
    use viral_predict::{ContentType, InputMode, ModelError, FACTOR_NAMES};

    struct FixedProvider(Result<String, ModelError>);

    #[async_trait]
    impl ModelProvider for FixedProvider {
        fn model(&self) -> &str {
            "fixed"
        }

        async fn complete(&self, _request: &ModelRequest) -> Result<String, ModelError> {
            self.0.clone()
        }
    }

    fn analysis_reply(score: f64) -> String {
        let factors: Vec<Value> = FACTOR_NAMES
            .iter()
            .map(|name| {
                json!({
                    "name": name,
                    "score": score,
                    "description": format!("{} is fine", name),
                    "tips": [format!("Sharpen {}", name.to_lowercase())]
                })
            })
            .collect();
        json!({
            "factors": factors,
            "overall_impression": "Solid opener.",
            "content_summary": "A morning routine clip.",
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

    fn state(reply: Result<String, ModelError>) -> AppState {
        let mut config = PredictorConfig::default();
        config.analyzer.retry_delay_ms = 0;
        let pipeline = PredictionPipeline::from_config(
            &config,
            Arc::new(FixedProvider(reply)),
            None,
            Arc::new(MemoryRuleStore::new(Vec::new())),
            Arc::new(MemoryTrendStore::new(TrendCorpus::default())),
            Arc::new(SystemClock),
        );
        AppState {
            pipeline: Arc::new(pipeline),
        }
    }

    fn request(body: Value) -> ApiPredictionRequest {
        serde_json::from_value(body).unwrap()
    }

    async fn expect_error(state: AppState, body: Value) -> (StatusCode, ApiError) {
        match predict_handler(State(state), Json(request(body))).await {
            Ok(Json(response)) => panic!("expected an error, got {:?}", response.request_id),
            Err((status, Json(error))) => (status, error),
        }
    }

    #[tokio::test]
    async fn health_returns_ok() {
        assert_eq!(health().await.into_response().status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn predict_echoes_request_id() {
        let body = json!({
            "request_id": "client-42",
            "input_mode": "text",
            "content_text": "Morning routine in 30s #fitness",
            "content_type": "reel"
        });
        let state = state(Ok(analysis_reply(6.0)));
        let response = match predict_handler(State(state), Json(request(body))).await {
            Ok(Json(response)) => response,
            Err((status, Json(error))) => panic!("unexpected {}: {}", status, error.error),
        };
        assert_eq!(response.request_id, "client-42");
        assert_eq!(response.result.gemini_score, 60);
    }

    #[tokio::test]
    async fn missing_content_type_is_rejected() {
        let (status, error) = expect_error(
            state(Ok(analysis_reply(6.0))),
            json!({ "input_mode": "text", "content_text": "hello world" }),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(error.error, "content_type is required");
        assert!(error.request_id.starts_with("req-"));
    }

    #[tokio::test]
    async fn missing_mode_without_reference_is_rejected() {
        let (status, error) = expect_error(
            state(Ok(analysis_reply(6.0))),
            json!({ "request_id": "r1", "content_text": "hello world", "content_type": "post" }),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(error.error, "input_mode is required");
        assert_eq!(error.request_id, "r1");
    }

    #[test]
    fn reference_fields_imply_input_mode() {
        let input = request(json!({
            "video_url": "https://cdn.example.com/clip.mp4",
            "content_type": "video"
        }))
        .into_input()
        .unwrap();
        assert_eq!(input.input_mode, InputMode::UrlReference);
        assert_eq!(input.content_type, ContentType::Video);

        let input = request(json!({ "file_reference": "uploads/clip.mp4", "content_type": "reel" }))
            .into_input()
            .unwrap();
        assert_eq!(input.input_mode, InputMode::FileReference);
    }

    #[tokio::test]
    async fn invalid_content_is_bad_request() {
        let (status, _) = expect_error(
            state(Ok(analysis_reply(6.0))),
            json!({ "input_mode": "text", "content_text": "   ", "content_type": "post" }),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn analyzer_failure_is_bad_gateway() {
        let rejected = Err(ModelError::Rejected {
            status: 401,
            detail: "bad key".to_string(),
        });
        let (status, error) = expect_error(
            state(rejected),
            json!({
                "request_id": "r2",
                "input_mode": "text",
                "content_text": "hello world",
                "content_type": "post"
            }),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(error.request_id, "r2");
    }
}
