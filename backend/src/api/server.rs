//! HTTP server for the cinema backend.
//!
//! # API Endpoints
//!
//! | Method | Path              | Description                          |
//! |--------|-------------------|--------------------------------------|
//! | GET    | `/health`         | Health check                         |
//! | GET    | `/api/upload-url` | Signed, short-lived upload URL       |
//! | POST   | `/api/agent`      | Chat with the cinema agent           |
//! | POST   | `/api/moderate`   | Explicit-content check of a video    |
//! | GET    | `/api/logs`       | SSE stream of activity               |

use axum::{
    extract::State,
    http::{header, Method, StatusCode},
    response::{sse::Event, IntoResponse, Json, Response, Sse},
    routing::{get, post},
    Router,
};
use futures::stream::Stream;
use serde_json::{json, Value};
use std::{convert::Infallible, net::SocketAddr, sync::Arc, time::Duration};
use tokio::net::TcpListener;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt as _;
use tower_http::cors::CorsLayer;
use uuid::Uuid;

use super::logs::ActivityLog;
use super::types::{error_response, AgentRequest, AgentResponse, ModerateRequest, ModerateResponse, UploadUrlResponse};
use crate::agent::Agent;
use crate::config::Settings;
use crate::error::{AgentError, ServerError, ServerResult};
use crate::gateway::{PinataSigner, UrlIssuer};
use crate::moderation::VideoAnalyzer;

/// Shared, read-only server state.
#[derive(Clone)]
pub struct AppState {
    pub signer: Arc<dyn UrlIssuer>,
    pub agent: Option<Arc<Agent>>,
    pub analyzer: Arc<VideoAnalyzer>,
    pub activity: ActivityLog,
}

impl AppState {
    pub fn new(signer: Arc<dyn UrlIssuer>, analyzer: Arc<VideoAnalyzer>) -> Self {
        Self {
            signer,
            agent: None,
            analyzer,
            activity: ActivityLog::new(),
        }
    }

    pub fn with_agent(mut self, agent: Arc<Agent>) -> Self {
        self.agent = Some(agent);
        self
    }

    /// Wire every service from configuration. Missing credentials only
    /// disable the endpoints that need them.
    pub fn from_settings(settings: &Settings) -> Self {
        let signer = PinataSigner::from_settings(settings);
        if settings.pinata_jwt.is_none() {
            tracing::warn!("PINATA_JWT not set, /api/upload-url will answer 503");
        }

        let analyzer = Arc::new(VideoAnalyzer::new(
            settings.video_intelligence_url.clone(),
            settings.video_intelligence_token.clone(),
        ));

        let state = Self::new(Arc::new(signer), analyzer.clone());
        match Agent::from_settings(settings, analyzer) {
            Ok(agent) => state.with_agent(Arc::new(agent)),
            Err(e) => {
                tracing::warn!(error = %e, "agent disabled");
                state
            }
        }
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("agent", &self.agent.is_some())
            .finish_non_exhaustive()
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = match &self {
            ServerError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ServerError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ServerError::Upstream(_) => StatusCode::BAD_GATEWAY,
            ServerError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(error_response(&self.to_string()))).into_response()
    }
}

/// Build the router with permissive CORS for the browser front end.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
        .expose_headers([header::CONTENT_TYPE]);

    Router::new()
        .route("/", get(health))
        .route("/health", get(health))
        .route("/api/upload-url", get(upload_url))
        .route("/api/agent", post(chat))
        .route("/api/moderate", post(moderate))
        .route("/api/logs", get(sse_logs))
        .layer(cors)
        .with_state(state)
}

/// Serve on an already bound listener.
pub async fn serve(listener: TcpListener, state: AppState) -> ServerResult<()> {
    axum::serve(listener, router(state)).await?;
    Ok(())
}

/// Start the HTTP server on `0.0.0.0:port`.
pub async fn start_server(port: u16, state: AppState) -> ServerResult<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr).await?;

    tracing::info!("cinema server running on http://localhost:{}", port);
    tracing::info!("  GET  /api/upload-url - signed upload URL");
    tracing::info!("  POST /api/agent      - agent chat");
    tracing::info!("  POST /api/moderate   - video moderation");
    tracing::info!("  GET  /api/logs       - SSE activity stream");

    serve(listener, state).await
}

async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "cinema",
        "version": env!("CARGO_PKG_VERSION"),
        "agent": state.agent.is_some(),
        "endpoints": {
            "uploadUrl": "GET /api/upload-url",
            "agent": "POST /api/agent",
            "moderate": "POST /api/moderate",
            "logs": "GET /api/logs (SSE)"
        }
    }))
}

async fn upload_url(State(state): State<AppState>) -> ServerResult<Json<UploadUrlResponse>> {
    match state.signer.request_temporary_url().await {
        Ok(target) => {
            state.activity.info("Issued signed upload URL");
            Ok(Json(UploadUrlResponse { url: target.url }))
        }
        Err(e) => {
            state.activity.error(format!("Failed to sign upload URL: {}", e));
            Err(e.into())
        }
    }
}

async fn chat(State(state): State<AppState>, Json(request): Json<AgentRequest>) -> ServerResult<Json<AgentResponse>> {
    let agent = state
        .agent
        .as_ref()
        .ok_or_else(|| ServerError::Unavailable(AgentError::MissingApiKey.to_string()))?;

    let message = request.message.trim();
    if message.is_empty() {
        return Err(ServerError::BadRequest("message must not be empty".to_string()));
    }

    let thread_id = request
        .thread_id
        .filter(|t| !t.trim().is_empty())
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    let response = agent.chat(&thread_id, message).await?;
    state.activity.info(format!("Agent answered on thread {}", thread_id));

    Ok(Json(AgentResponse { response, thread_id }))
}

async fn moderate(
    State(state): State<AppState>,
    Json(request): Json<ModerateRequest>,
) -> ServerResult<Json<ModerateResponse>> {
    let uri = request.uri.trim().to_string();
    state.activity.info(format!("Moderating {}", uri));

    let verdict = state.analyzer.analyze(&uri).await.map_err(|e| {
        state.activity.error(format!("Moderation failed for {}: {}", uri, e));
        ServerError::from(e)
    })?;

    state.activity.success(format!("{} is {}", uri, verdict));
    Ok(Json(ModerateResponse { uri, verdict }))
}

/// SSE endpoint for real-time activity.
async fn sse_logs(State(state): State<AppState>) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let stream = BroadcastStream::new(state.activity.subscribe()).filter_map(|result| {
        let entry = result.ok()?;
        let json = serde_json::to_string(&entry).ok()?;
        Some(Ok(Event::default().data(json)))
    });

    Sse::new(stream).keep_alive(
        axum::response::sse::KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}
