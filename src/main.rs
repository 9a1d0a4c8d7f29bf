//! Replay driver: feeds newline-delimited gateway frames through the cache.
//!
//! Usage: `gateway-cache [FILE]`. Reads stdin when no file is given.

use anyhow::Context;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use gateway_cache::{Client, ClientEvent, ClientOptions, GatewayFrame};

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("gateway_cache=info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .init();

    info!("Starting gateway cache replay...");

    let options = ClientOptions::from_env()?;
    info!("Configuration loaded successfully");
    info!("User sweep interval: {}s", options.user_sweep_interval);

    let client = Client::new(options);
    let logger = tokio::spawn(log_events(client.subscribe()));

    let path = std::env::args().nth(1);
    let replayed = match path.as_deref() {
        Some(path) => {
            let file = tokio::fs::File::open(path)
                .await
                .with_context(|| format!("failed to open {path}"))?;
            replay(&client, BufReader::new(file)).await?
        }
        None => replay(&client, BufReader::new(tokio::io::stdin())).await?,
    };

    info!(
        "Replayed {} frames: {} users, {} guilds, {} channels cached",
        replayed,
        client.context().users.len(),
        client.context().guilds.len(),
        client.context().channels.len()
    );

    client.shutdown();
    drop(client);
    logger.await.ok();

    Ok(())
}

/// Dispatch every frame until end of input or Ctrl-C. Returns the number of
/// non-empty lines read.
async fn replay<R>(client: &Client, reader: R) -> anyhow::Result<usize>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = reader.lines();
    let mut count = 0;

    loop {
        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = tokio::signal::ctrl_c() => {
                info!("Received SIGINT, stopping replay");
                break;
            }
        };
        let Some(line) = line else {
            break;
        };
        if line.trim().is_empty() {
            continue;
        }
        count += 1;

        let frame: GatewayFrame = match serde_json::from_str(&line) {
            Ok(frame) => frame,
            Err(e) => {
                warn!("Skipping malformed frame {}: {}", count, e);
                continue;
            }
        };

        if let Err(e) = client.dispatch_frame(&frame) {
            warn!("Failed to handle {}: {}", frame.t, e);
        }
    }

    Ok(count)
}

async fn log_events(mut rx: tokio::sync::broadcast::Receiver<ClientEvent>) {
    loop {
        match rx.recv().await {
            Ok(ClientEvent::GuildMemberUpdate { member, .. }) => {
                let member = member.read();
                info!("Event: {} for {} in {}", ClientEvent::GUILD_MEMBER_UPDATE, member.display_name(), member.guild_id);
            }
            Ok(event) => info!("Event: {}", event.name()),
            Err(RecvError::Lagged(skipped)) => warn!("Event logger lagged, {} events skipped", skipped),
            Err(RecvError::Closed) => break,
        }
    }
}
