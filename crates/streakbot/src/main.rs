use std::sync::Arc;

use streakbot_openai::OpenAiClient;
use tokio_util::sync::CancellationToken;

use streakbot_core::{completion::CompletionClient, config::Config};

#[tokio::main]
async fn main() -> Result<(), streakbot_core::Error> {
    streakbot_core::logging::init("streakbot")?;

    let cfg = Arc::new(Config::load()?);

    let completion: Arc<dyn CompletionClient> = Arc::new(
        OpenAiClient::new(
            cfg.openai_api_key.clone(),
            cfg.openai_base_url.clone(),
            cfg.openai_model.clone(),
            cfg.openai_timeout,
        )?
        .with_reasoning_effort(cfg.openai_reasoning_effort.clone()),
    );

    let shutdown = CancellationToken::new();
    {
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "failed to listen for ctrl-c");
                return;
            }
            tracing::info!("shutdown requested");
            shutdown.cancel();
        });
    }

    streakbot_line::router::run_webhook(cfg, completion, shutdown)
        .await
        .map_err(|e| streakbot_core::Error::External(format!("webhook server failed: {e:#}")))?;

    Ok(())
}
