use anyhow::Context;
use chrono::{DateTime, Utc};
use log::{debug, info};
use std::ops::Deref;
use std::sync::{Arc, LazyLock};
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::config::AppConfig;
use crate::management::ServerManager;
use crate::protocols::v1::ProtocolV1;
use crate::protocols::Protocol;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
static START_TIME: LazyLock<DateTime<Utc>> = LazyLock::new(Utc::now);

pub struct ApplicationState {
    pub manager: Arc<ServerManager>,
    pub protocol_v1: Arc<ProtocolV1>,
}
pub type AppState = Arc<ApplicationState>;

pub fn get_start_time() -> &'static DateTime<Utc> {
    START_TIME.deref()
}

fn init_app_state(config: &AppConfig) -> anyhow::Result<AppState> {
    debug!(
        "config loaded: {}",
        serde_json::to_string_pretty(config).unwrap()
    );

    let manager = Arc::new(
        ServerManager::new(config).context("failed to initialize server manager")?,
    );
    let protocol_v1 = Arc::new(ProtocolV1::new(Arc::clone(&manager)));

    Ok(Arc::new(ApplicationState {
        manager,
        protocol_v1,
    }))
}

/// Serves v1 actions as JSON lines on stdin/stdout until ctrl+c (or stdin
/// closing with no more work to do), then stops every live server.
pub async fn run_app() -> anyhow::Result<()> {
    let _ = get_start_time();
    info!("crafthost daemon v{} starting", VERSION);

    let config = AppConfig::load("config.json").context("failed to load config.json")?;
    let state = init_app_state(&config)?;

    state.manager.restore().await?;
    state.manager.autostart().await?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;
    loop {
        tokio::select! {
            signal = tokio::signal::ctrl_c() => {
                signal.context("could not install ctrl+c signal handler")?;
                break;
            }
            line = lines.next_line(), if stdin_open => match line {
                Ok(Some(line)) => {
                    if !line.trim().is_empty() {
                        println!("{}", state.protocol_v1.process(&line).await);
                    }
                }
                Ok(None) | Err(_) => stdin_open = false,
            },
        }
    }

    info!("shutdown requested, stopping servers");
    state.manager.shutdown().await;
    info!("Bye.");
    Ok(())
}
