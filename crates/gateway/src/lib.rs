//! HTTP adapter for the StemChat assistant.
//!
//! Exposes the chat widget's inbound call, a health probe and a forced
//! knowledge refresh. The website's own CRUD routes live elsewhere.
//!
//! Built on Axum.

use axum::extract::{ConnectInfo, DefaultBodyLimit};
use axum::{
    Router,
    extract::State,
    http::{HeaderValue, Method, StatusCode, header},
    middleware::{self, Next},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use stemchat_assistant::{Assistant, ReplySource};
use stemchat_config::{AppConfig, GatewayConfig};
use stemchat_core::{ChatTurn, Error};
use stemchat_knowledge::SourceReport;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing::{error, info, warn};

/// Shared application state for the gateway.
pub struct GatewayState {
    pub assistant: Arc<Assistant>,
    pub started_at: DateTime<Utc>,
}

type SharedState = Arc<GatewayState>;

/// Requests per client per minute on the chat and refresh routes.
const RATE_LIMIT: usize = 30;
const BODY_LIMIT: usize = 64 * 1024;

/// Build the Axum router with all gateway routes.
///
/// Layers applied:
/// - CORS restricted to the configured origins
/// - Request body size limit (64 KB)
/// - In-memory rate limiting per client
/// - HTTP trace logging
pub fn build_router(state: SharedState, gateway: &GatewayConfig) -> Router {
    let rate_limiter = Arc::new(RateLimiter::new(RATE_LIMIT, Duration::from_secs(60)));
    let trust_forwarded_for = gateway.trust_forwarded_for;

    Router::new()
        .route("/health", get(health_handler))
        .route("/api/chat", post(chat_handler))
        .route("/api/knowledge/refresh", post(refresh_handler))
        .with_state(state)
        .layer(DefaultBodyLimit::max(BODY_LIMIT))
        .layer(middleware::from_fn(move |req, next| {
            let limiter = rate_limiter.clone();
            rate_limit_middleware(limiter, trust_forwarded_for, req, next)
        }))
        .layer(cors_layer(&gateway.allowed_origins))
        .layer(tower_http::trace::TraceLayer::new_for_http())
}

/// CORS for the website's origins. With none configured only same-origin
/// requests pass.
fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "Ignoring unparsable CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE])
        .max_age(Duration::from_secs(3600))
}

/// Start the gateway HTTP server.
pub async fn start(config: AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let addr = format!("{}:{}", config.gateway.host, config.gateway.port);

    let assistant = Assistant::from_config(&config).await?;
    let state = Arc::new(GatewayState {
        assistant: Arc::new(assistant),
        started_at: Utc::now(),
    });
    let app = build_router(state, &config.gateway);

    info!(addr = %addr, "Gateway starting");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}

// --- Rate Limiter ---

/// Simple in-memory sliding-window rate limiter.
///
/// Tracks request timestamps per client key.
/// Thread-safe via `std::sync::Mutex` (non-async, held briefly).
struct RateLimiter {
    max_requests: usize,
    window: Duration,
    clients: std::sync::Mutex<HashMap<String, Vec<Instant>>>,
}

impl RateLimiter {
    fn new(max_requests: usize, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            clients: std::sync::Mutex::new(HashMap::new()),
        }
    }

    /// Check if the client is within rate limits. Returns `true` if allowed.
    fn check(&self, client_key: &str) -> bool {
        let now = Instant::now();
        let mut clients = self.clients.lock().unwrap_or_else(|e| e.into_inner());

        if clients.len() > 10_000 {
            clients.retain(|_, timestamps| {
                timestamps
                    .last()
                    .is_some_and(|t| now.duration_since(*t) < self.window)
            });
        }

        let timestamps = clients.entry(client_key.to_string()).or_default();
        timestamps.retain(|t| now.duration_since(*t) < self.window);

        if timestamps.len() >= self.max_requests {
            return false;
        }

        timestamps.push(now);
        true
    }
}

/// Keys clients by peer address, or by the first `X-Forwarded-For` hop when
/// the gateway is configured to trust its proxy. `/health` is exempt.
async fn rate_limit_middleware(
    limiter: Arc<RateLimiter>,
    trust_forwarded_for: bool,
    req: axum::extract::Request,
    next: Next,
) -> Result<Response, StatusCode> {
    if req.uri().path() == "/health" {
        return Ok(next.run(req).await);
    }

    let client_key = client_key(&req, trust_forwarded_for);

    if !limiter.check(&client_key) {
        warn!(client = %client_key, "Rate limit exceeded");
        return Err(StatusCode::TOO_MANY_REQUESTS);
    }

    Ok(next.run(req).await)
}

fn client_key(req: &axum::extract::Request, trust_forwarded_for: bool) -> String {
    let forwarded = trust_forwarded_for
        .then(|| {
            req.headers()
                .get("X-Forwarded-For")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.split(',').next())
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        })
        .flatten();

    forwarded
        .or_else(|| {
            req.extensions()
                .get::<ConnectInfo<SocketAddr>>()
                .map(|ConnectInfo(addr)| addr.ip().to_string())
        })
        .unwrap_or_else(|| "unknown".to_string())
}

// --- Handlers ---

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
    llm: bool,
    knowledge_source: String,
    started_at: DateTime<Utc>,
}

async fn health_handler(State(state): State<SharedState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        llm: state.assistant.has_llm(),
        knowledge_source: state.assistant.cache().source_name().to_string(),
        started_at: state.started_at,
    })
}

#[derive(Deserialize)]
struct ChatRequest {
    #[serde(default)]
    message: String,
    #[serde(default)]
    context: Vec<ChatTurn>,
    #[serde(default)]
    language: Option<String>,
}

#[derive(Serialize)]
struct ChatResponse {
    reply: String,
    source: ReplySource,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

async fn chat_handler(
    State(state): State<SharedState>,
    Json(payload): Json<ChatRequest>,
) -> Response {
    info!(
        message_len = payload.message.len(),
        context_turns = payload.context.len(),
        "Chat message received"
    );

    match state
        .assistant
        .respond(&payload.message, &payload.context, payload.language.as_deref())
        .await
    {
        Ok(reply) => Json(ChatResponse {
            reply: reply.text,
            source: reply.source,
        })
        .into_response(),
        Err(Error::InvalidInput(message)) => (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse { error: message }),
        )
            .into_response(),
        Err(e) => {
            error!(error = %e, "Chat reply failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: "internal error".into(),
                }),
            )
                .into_response()
        }
    }
}

#[derive(Serialize)]
struct RefreshResponse {
    source: String,
    fetched_at: Option<DateTime<Utc>>,
    degraded: usize,
    report: SourceReport,
}

async fn refresh_handler(State(state): State<SharedState>) -> Json<RefreshResponse> {
    let cache = state.assistant.cache();
    let snapshot = cache.refresh().await;
    info!(
        degraded = snapshot.report.degraded_count(),
        "Knowledge refreshed on request"
    );

    Json(RefreshResponse {
        source: cache.source_name().to_string(),
        fetched_at: cache.fetched_at().await,
        degraded: snapshot.report.degraded_count(),
        report: snapshot.report.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use serde_json::{Value, json};
    use stemchat_knowledge::{
        InMemorySource, KnowledgeAggregator, KnowledgeCache, KnowledgeSource, StaticFacts,
    };
    use tower::ServiceExt;

    fn test_state() -> SharedState {
        test_state_with(InMemorySource::new())
    }

    fn test_state_with(source: InMemorySource) -> SharedState {
        let source: Arc<dyn KnowledgeSource> = Arc::new(source);
        let aggregator = KnowledgeAggregator::new(source, Arc::new(StaticFacts::default()));
        let assistant = Assistant::new(Arc::new(KnowledgeCache::new(aggregator)), "STEMpower");
        Arc::new(GatewayState {
            assistant: Arc::new(assistant),
            started_at: Utc::now(),
        })
    }

    fn app() -> Router {
        build_router(test_state(), &GatewayConfig::default())
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("Content-Type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_json(response: Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn health_endpoint() {
        let req = Request::builder()
            .uri("/health")
            .body(Body::empty())
            .unwrap();

        let response = app().oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["status"], "ok");
        assert_eq!(body["llm"], false);
        assert_eq!(body["knowledge_source"], "in_memory");
    }

    #[tokio::test]
    async fn chat_answers_from_rules_without_llm() {
        let response = app()
            .oneshot(post_json("/api/chat", json!({"message": "hello"})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        assert!(body["reply"].as_str().unwrap().starts_with("Hello! I'm the STEMpower assistant."));
        assert_eq!(body["source"]["kind"], "fallback");
        assert_eq!(body["source"]["reason"], "no_provider");
    }

    #[tokio::test]
    async fn chat_accepts_context_and_language() {
        let response = app()
            .oneshot(post_json(
                "/api/chat",
                json!({
                    "message": "How can I volunteer?",
                    "context": [
                        {"role": "user", "content": "hi"},
                        {"role": "assistant", "content": "Hello!"}
                    ],
                    "language": "en"
                }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert!(body["reply"].as_str().unwrap().contains("volunteers"));
    }

    #[tokio::test]
    async fn blank_message_is_bad_request() {
        for payload in [json!({"message": "   "}), json!({})] {
            let response = app().oneshot(post_json("/api/chat", payload)).await.unwrap();
            assert_eq!(response.status(), StatusCode::BAD_REQUEST);
            let body = body_json(response).await;
            assert!(body["error"].as_str().unwrap().contains("empty"));
        }
    }

    #[tokio::test]
    async fn refresh_reports_degraded_queries() {
        let source = InMemorySource::new();
        source.fail_query("events").await;
        let app = build_router(test_state_with(source), &GatewayConfig::default());

        let response = app
            .oneshot(post_json("/api/knowledge/refresh", json!({})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        assert_eq!(body["source"], "in_memory");
        assert_eq!(body["degraded"], 1);
        assert!(body["fetched_at"].is_string());
        let queries = body["report"]["queries"].as_array().unwrap();
        let events = queries.iter().find(|q| q["query"] == "events").unwrap();
        assert_eq!(events["status"], "degraded");
    }

    fn chat_from(peer: [u8; 4], forwarded_for: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri("/api/chat")
            .header("Content-Type", "application/json");
        if let Some(hop) = forwarded_for {
            builder = builder.header("X-Forwarded-For", hop);
        }
        let mut req = builder
            .body(Body::from(json!({"message": "hello"}).to_string()))
            .unwrap();
        req.extensions_mut()
            .insert(ConnectInfo(SocketAddr::from((peer, 40_000))));
        req
    }

    #[tokio::test]
    async fn visitors_without_forwarded_for_get_their_own_buckets() {
        let app = app();
        for _ in 0..RATE_LIMIT {
            let response = app.clone().oneshot(chat_from([10, 0, 0, 1], None)).await.unwrap();
            assert_eq!(response.status(), StatusCode::OK);
        }

        let response = app.clone().oneshot(chat_from([10, 0, 0, 1], None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);

        let response = app.oneshot(chat_from([10, 0, 0, 2], None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn forwarded_for_is_ignored_unless_trusted() {
        let app = app();
        for i in 0..RATE_LIMIT {
            let hop = format!("203.0.113.{i}");
            let response = app
                .clone()
                .oneshot(chat_from([10, 0, 0, 3], Some(&hop)))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK);
        }

        let response = app
            .oneshot(chat_from([10, 0, 0, 3], Some("198.51.100.7")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    }

    #[tokio::test]
    async fn trusted_proxy_keys_by_first_forwarded_hop() {
        let gateway = GatewayConfig {
            trust_forwarded_for: true,
            ..GatewayConfig::default()
        };
        let app = build_router(test_state(), &gateway);
        for _ in 0..RATE_LIMIT {
            let response = app
                .clone()
                .oneshot(chat_from([10, 0, 0, 9], Some("203.0.113.5, 10.0.0.9")))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK);
        }

        let response = app
            .clone()
            .oneshot(chat_from([10, 0, 0, 9], Some("203.0.113.5")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);

        let response = app
            .oneshot(chat_from([10, 0, 0, 9], Some("203.0.113.6")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[test]
    fn rate_limiter_blocks_after_limit() {
        let limiter = RateLimiter::new(2, Duration::from_secs(60));
        assert!(limiter.check("10.0.0.1"));
        assert!(limiter.check("10.0.0.1"));
        assert!(!limiter.check("10.0.0.1"));
        assert!(limiter.check("10.0.0.2"));
    }

    #[test]
    fn unparsable_origins_are_skipped() {
        // Building the layer must not panic on a bad entry.
        let _ = cors_layer(&["https://www.stempower.org".into(), "not a\norigin".into()]);
    }
}
