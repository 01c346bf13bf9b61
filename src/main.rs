//! rallybot binary.
//!
//! Runs the bot against the in-memory gateway. Inbound events are read from
//! stdin as newline-delimited JSON, for example:
//!
//! ```text
//! {"type":"command","channel":"general","actor":"u1","name":"help"}
//! {"type":"component","channel":"general","message":"<id>","actor":"u1","custom_id":"next"}
//! ```

use rallybot::bot::Bot;
use rallybot::config::{Config, ConfigError, LoggingConfig, validation};
use rallybot::gateway::{InboundEvent, Member, MemoryGateway};
use rallybot::router::EventRouter;
use rallybot::{http, metrics};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

fn init_tracing(logging: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr);
    if logging.json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "rallybot.toml".to_string());

    let loaded = Config::load(&config_path);
    let logging = loaded
        .as_ref()
        .map(|config| config.logging.clone())
        .unwrap_or_default();
    init_tracing(&logging);

    let config = match loaded {
        Ok(config) => config,
        Err(ConfigError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
            warn!(path = %config_path, "Config file not found, using defaults");
            Config::default()
        }
        Err(e) => {
            error!(path = %config_path, error = %e, "Failed to load config");
            return Err(e.into());
        }
    };

    if let Err(errors) = validation::validate(&config) {
        for e in &errors {
            error!(error = %e, "Invalid configuration");
        }
        anyhow::bail!("configuration has {} error(s)", errors.len());
    }

    info!(name = %config.bot.name, members = config.members.len(), "Starting rallybot");

    // Convention: metrics_port = 0 (or unset) disables the HTTP endpoint.
    let metrics_port = config.bot.metrics_port.unwrap_or(0);
    if metrics_port == 0 {
        info!("Metrics disabled");
    } else {
        metrics::init();
        tokio::spawn(async move {
            http::run_http_server(metrics_port).await;
        });
        info!(port = metrics_port, "Prometheus HTTP server started");
    }

    let members: Vec<Member> = config.members.iter().map(Member::from).collect();
    let (gateway, inbound) = MemoryGateway::new(members, config.bot.inbound_capacity);

    let bot = Bot::new(config, gateway.clone());
    bot.start();

    let router = EventRouter::new(Arc::clone(&bot));
    let router_task = tokio::spawn(router.run(inbound));

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted");
                break;
            }
            line = lines.next_line() => match line {
                Ok(Some(line)) if line.trim().is_empty() => {}
                Ok(Some(line)) => match serde_json::from_str::<InboundEvent>(&line) {
                    Ok(event) => {
                        if !gateway.inject(event).await {
                            warn!("Router is gone, stopping input");
                            break;
                        }
                    }
                    Err(e) => warn!(error = %e, "Ignoring malformed event"),
                },
                Ok(None) => {
                    info!("End of input");
                    break;
                }
                Err(e) => {
                    error!(error = %e, "Failed to read stdin");
                    break;
                }
            },
        }
    }

    let report = bot.shutdown().await;
    router_task.abort();
    info!(
        sessions_closed = report.sessions_closed,
        actions_dropped = report.actions_dropped,
        "Shutdown complete"
    );
    Ok(())
}
