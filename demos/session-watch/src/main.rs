//! Demo: watch autoclose eviction on a live session registry.
//!
//! Run with: cargo run -p session-watch-demo
//!
//! Connects two clients, keeps one renewing, and logs what the sweeper
//! does to the idle one.

use std::{sync::Arc, time::Duration};

use mds_status_cluster::RegistryCommandChannel;
use mds_status_core::{Clock, CommandChannel, SystemClock};
use mds_status_session::{RegistryConfig, SessionRegistry, spawn_autoclose};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let config = RegistryConfig {
        autoclose_timeout: Duration::from_secs(5),
        min_sessions_floor: 1,
    };
    let registry = Arc::new(SessionRegistry::new(
        config,
        Arc::new(SystemClock) as Arc<dyn Clock>,
    ));
    let sweeper = spawn_autoclose(Arc::clone(&registry), Duration::from_secs(1));

    registry.connect("client.fast")?;
    registry.connect("client.slow")?;

    // client.fast heartbeats; client.slow goes quiet.
    let renewer = {
        let registry = Arc::clone(&registry);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(Duration::from_secs(2));
            loop {
                ticker.tick().await;
                if registry.renew("client.fast").is_err() {
                    break;
                }
            }
        })
    };

    let mut events = registry.events().subscribe();
    let watch = tokio::time::timeout(Duration::from_secs(12), async {
        while let Ok(event) = events.recv().await {
            tracing::info!(?event, "registry event");
        }
    });
    let _ = watch.await;

    let channel = RegistryCommandChannel::new(Arc::clone(&registry));
    let sessions = channel.run("session ls", serde_json::json!({})).await?;
    tracing::info!(sessions = %serde_json::to_string_pretty(&sessions)?, "surviving sessions");

    renewer.abort();
    sweeper.stop().await;
    Ok(())
}
