// Solace console entry point
// Interactive chat session against the support engine

use anyhow::Context;
use solace_core::actors::orchestrator::{ChatOrchestrator, Readiness};
use solace_core::config::EngineConfig;
use solace_core::fs_manager::PortablePathManager;
use solace_core::preflight::run_preflight_checks;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{error, info, warn};
use tracing_bunyan_formatter::{BunyanFormattingLayer, JsonStorageLayer};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{EnvFilter, Registry};

const LOG_FORMAT_VAR: &str = "SOLACE_LOG_FORMAT";

fn init_tracing() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    if std::env::var(LOG_FORMAT_VAR).is_ok_and(|v| v.eq_ignore_ascii_case("json")) {
        let subscriber = Registry::default()
            .with(filter)
            .with(JsonStorageLayer)
            .with(BunyanFormattingLayer::new("solace".into(), std::io::stderr));
        tracing::subscriber::set_global_default(subscriber)
            .context("Failed to install JSON subscriber")?;
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing()?;

    // Initialize File System (Portable)
    if let Err(e) = PortablePathManager::init() {
        error!("Failed to initialize portable file system: {}", e);
    }

    let config = EngineConfig::from_env().context("Invalid configuration")?;
    let report = run_preflight_checks(&config);
    if !report.ready_to_start {
        anyhow::bail!("Preflight failed: {}", report.summary);
    }

    let orchestrator = ChatOrchestrator::start(config);
    while orchestrator.readiness() == Readiness::Initializing {
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    if let Readiness::Unavailable { reason } = orchestrator.readiness() {
        anyhow::bail!("Engine unavailable: {}", reason);
    }

    let session_id = uuid::Uuid::new_v4().to_string();
    info!("Session {} started", session_id);

    let mut stdout = tokio::io::stdout();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    stdout
        .write_all(b"Solace is listening. Commands: /summary /history /reload /health /reset /quit\n> ")
        .await?;
    stdout.flush().await?;

    while let Some(line) = lines.next_line().await? {
        let output = match line.trim() {
            "/quit" | "/exit" => break,
            "/summary" => {
                let summary = orchestrator.conversation_summary(&session_id).await?;
                serde_json::to_string_pretty(&summary)?
            }
            "/history" => {
                let history = orchestrator.history(&session_id).await?;
                serde_json::to_string_pretty(&history)?
            }
            "/health" => serde_json::to_string_pretty(&orchestrator.health().await)?,
            "/reload" => {
                if orchestrator.reload_intents().await? {
                    "Intents reloaded.".to_string()
                } else {
                    "Reload failed; previous intents kept.".to_string()
                }
            }
            "/reset" => match orchestrator.reset_session(&session_id).await? {
                Some(phase) => format!("Session phase is now {}.", phase),
                None => "Nothing to reset yet.".to_string(),
            },
            message => orchestrator.get_response(message, &session_id).await,
        };
        stdout.write_all(output.as_bytes()).await?;
        stdout.write_all(b"\n> ").await?;
        stdout.flush().await?;
    }

    if !orchestrator.end_session(&session_id) {
        warn!("Session {} ended before any message", session_id);
    }
    info!("Goodbye");
    Ok(())
}
