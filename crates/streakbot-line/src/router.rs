use std::{net::SocketAddr, sync::Arc};

use anyhow::Context;
use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use streakbot_core::{
    completion::CompletionClient,
    composer::ReplyComposer,
    config::Config,
    dispatcher::EventDispatcher,
    gate::ResponseGate,
    messaging::ReplyPort,
    streak::{InMemoryStreakStore, StreakStore},
};

use crate::{payload::WebhookBody, LineMessenger};

#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Arc<EventDispatcher>,
}

/// Wire the pipeline for `cfg` and serve the webhook until `shutdown` fires.
pub async fn run_webhook(
    cfg: Arc<Config>,
    completion: Arc<dyn CompletionClient>,
    shutdown: CancellationToken,
) -> anyhow::Result<()> {
    let channel_secret = if cfg.channel_secret.is_some() {
        "set"
    } else {
        "unset"
    };
    tracing::info!(
        channel_access_token = "set",
        channel_secret,
        model = %cfg.openai_model,
        persona = %cfg.persona.name,
        mention = %cfg.persona.mention,
        streak_capacity = cfg.streak_capacity,
        "starting streak bot"
    );

    let replier: Arc<dyn ReplyPort> = Arc::new(LineMessenger::new(
        cfg.channel_access_token.clone(),
        cfg.line_api_base_url.clone(),
    )?);
    let streaks: Arc<dyn StreakStore> = Arc::new(InMemoryStreakStore::new(cfg.streak_capacity));
    let persona = Arc::new(cfg.persona.clone());

    let dispatcher = Arc::new(EventDispatcher::new(
        ResponseGate::new(
            persona.clone(),
            completion.clone(),
            cfg.classify_max_output_tokens,
        ),
        ReplyComposer::new(persona, completion, cfg.reply_max_output_tokens),
        streaks,
        replier,
    ));

    serve(cfg.bind_addr, Arc::new(AppState { dispatcher }), shutdown).await
}

pub async fn serve(
    bind_addr: SocketAddr,
    state: Arc<AppState>,
    shutdown: CancellationToken,
) -> anyhow::Result<()> {
    let listener = TcpListener::bind(bind_addr)
        .await
        .with_context(|| format!("failed to bind {bind_addr}"))?;
    let local_addr = listener
        .local_addr()
        .context("failed to resolve webhook bound address")?;
    tracing::info!(addr = %local_addr, "webhook server listening");

    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
        .context("webhook server exited unexpectedly")?;

    tracing::info!("webhook server stopped");
    Ok(())
}

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(handle_health))
        .route("/callback", post(handle_callback))
        .with_state(state)
}

async fn handle_health() -> &'static str {
    "OK"
}

/// Acknowledge only after every event of the delivery was attempted.
async fn handle_callback(State(state): State<Arc<AppState>>, body: String) -> impl IntoResponse {
    let delivery = match WebhookBody::parse(&body) {
        Ok(d) => d,
        Err(e) => {
            tracing::warn!(error = %e, "rejecting unparseable webhook body");
            return (StatusCode::BAD_REQUEST, "invalid webhook body");
        }
    };

    let events = delivery.into_events();
    state.dispatcher.handle_delivery(&events).await;
    (StatusCode::OK, "OK")
}
