//! HTTP boundary and process wiring

use crate::auth::{bearer_token, ResolvedAuth};
use crate::bridge::{BridgeClient, LogOutbox};
use crate::scheduler::DailySchedule;
use anyhow::Context;
use axum::{
    extract::{Path, Request, State},
    http::StatusCode,
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use teaserbot_assistant::OpenAiAssistantsClient;
use teaserbot_core::{AuthMode, ChannelId, InboundMessage, TeaserbotConfig, TickKind};
use teaserbot_engine::{ChatOutbox, HistorySource, Orchestrator, OrchestratorConfig, RunDriverConfig};
use teaserbot_tools::{create_default_registry, BrainteaserStore, MemoryStore};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

pub struct AppState {
    pub orchestrator: Arc<Orchestrator>,
    pub auth: ResolvedAuth,
    pub started_at: std::time::Instant,
}

impl AppState {
    pub fn new(orchestrator: Arc<Orchestrator>, auth: ResolvedAuth) -> Self {
        Self {
            orchestrator,
            auth,
            started_at: std::time::Instant::now(),
        }
    }
}

/// Build the orchestrator and its collaborators from configuration.
pub async fn build_orchestrator(config: &TeaserbotConfig) -> anyhow::Result<Arc<Orchestrator>> {
    config.validate()?;
    let assistant = &config.assistant;
    let api_key = assistant
        .api_key
        .as_deref()
        .context("assistant API key not set")?;
    let assistant_id = assistant
        .assistant_id
        .clone()
        .context("assistant id not set")?;

    let store: Arc<dyn BrainteaserStore> = match &config.store.path {
        Some(path) => Arc::new(
            MemoryStore::open(path)
                .await
                .with_context(|| format!("opening store {}", path.display()))?,
        ),
        None => {
            warn!("No store path configured, state will not survive restarts");
            Arc::new(MemoryStore::new())
        }
    };

    let client = Arc::new(OpenAiAssistantsClient::new(api_key).with_base_url(&assistant.base_url));
    let tools = create_default_registry(store.clone());
    info!("Registered tools: {:?}", tools.list());

    let (outbox, history): (Arc<dyn ChatOutbox>, Arc<dyn HistorySource>) =
        match &config.gateway.bridge_url {
            Some(url) => {
                let bridge = Arc::new(BridgeClient::new(url.as_str()));
                info!("Chat bridge: {}", bridge.base_url());
                (bridge.clone(), bridge)
            }
            None => {
                warn!("No chat bridge configured, outbound messages are only logged");
                let log = Arc::new(LogOutbox);
                (log.clone(), log)
            }
        };

    let orchestrator = Orchestrator::new(
        OrchestratorConfig {
            assistant_id,
            run: RunDriverConfig::from(assistant),
            replay_limit: config.history.replay_limit,
        },
        client,
        tools,
        store,
        outbox,
        history,
    );
    orchestrator.start().await?;
    Ok(Arc::new(orchestrator))
}

pub fn router(state: Arc<AppState>) -> Router {
    let protected = Router::new()
        .route("/events/message", post(message_handler))
        .route("/commands/:name", post(command_handler))
        .route("/ticks/:kind", post(tick_handler))
        .route("/channels", get(channels_handler))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth));

    Router::new()
        .route("/health", get(health_handler))
        .merge(protected)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::new().allow_origin(Any).allow_methods(Any))
        .with_state(state)
}

pub async fn start_gateway(config: TeaserbotConfig) -> anyhow::Result<()> {
    let orchestrator = build_orchestrator(&config).await?;

    let auth = ResolvedAuth::from_config(&config.gateway.auth);
    if auth.mode == AuthMode::Token && auth.token.is_none() {
        warn!("Token auth enabled but no token set (TEASERBOT_GATEWAY_TOKEN); all requests will be rejected");
    }

    let timers = if config.schedule.enabled {
        DailySchedule::from_config(&config.schedule)?.spawn(orchestrator.clone())
    } else {
        Vec::new()
    };

    let state = Arc::new(AppState::new(orchestrator, auth));
    let app = router(state);

    let bind_addr: SocketAddr = format!("{}:{}", config.gateway.bind.to_addr(), config.gateway.port)
        .parse()
        .context("invalid bind address")?;

    info!("Teaserbot Gateway v{} starting", env!("CARGO_PKG_VERSION"));
    info!("  Listening on: {}", bind_addr);
    info!("  Auth mode: {:?}", config.gateway.auth.mode);
    info!("  Scheduled broadcasts: {}", timers.len());

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    axum::serve(listener, app).await?;
    for timer in timers {
        timer.abort();
    }
    Ok(())
}

async fn require_auth(State(state): State<Arc<AppState>>, request: Request, next: Next) -> Response {
    let verdict = state.auth.verify_token(bearer_token(request.headers()));
    match verdict {
        Ok(()) => next.run(request).await,
        Err(e) => {
            warn!(path = %request.uri().path(), "rejected request: {}", e);
            error_response(StatusCode::UNAUTHORIZED, e.to_string())
        }
    }
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(json!({ "error": message.into() }))).into_response()
}

async fn health_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let orchestrator = &state.orchestrator;
    Json(json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
        "uptime_secs": state.started_at.elapsed().as_secs(),
        "conversations": orchestrator.conversations().len(),
        "subscribed": orchestrator.channels().list_subscribed().len(),
        "busy_channels": orchestrator.queue().active_keys().len(),
        "tools": orchestrator.tools().len(),
    }))
}

async fn message_handler(
    State(state): State<Arc<AppState>>,
    Json(message): Json<InboundMessage>,
) -> Response {
    match state.orchestrator.on_message(message).await {
        Ok(decision) => Json(json!({ "handled": decision.is_some(), "decision": decision })).into_response(),
        Err(e) => error_response(StatusCode::BAD_GATEWAY, e.to_string()),
    }
}

#[derive(Deserialize)]
struct CommandRequest {
    channel_id: ChannelId,
    #[serde(default)]
    args: String,
}

async fn command_handler(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
    Json(request): Json<CommandRequest>,
) -> impl IntoResponse {
    let reply = state
        .orchestrator
        .on_slash_command(&name, &request.channel_id, &request.args)
        .await;
    Json(json!({ "reply": reply }))
}

async fn tick_handler(State(state): State<Arc<AppState>>, Path(kind): Path<String>) -> Response {
    let kind: TickKind = match kind.parse() {
        Ok(kind) => kind,
        Err(e) => return error_response(StatusCode::BAD_REQUEST, e),
    };
    match state.orchestrator.on_scheduled_tick(kind).await {
        Ok(report) => Json(json!({ "kind": kind, "report": report })).into_response(),
        Err(e) => error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    }
}

async fn channels_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.orchestrator.channel_overview())
}
