mod render;

use std::sync::Arc;

use anyhow::Context;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};

use haven_client::{ChannelSession, ClientConfig, GatewayHandle, GatewayLink, HttpApi};
use haven_types::{ChannelId, GatewayEvent};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "haven=info,haven_client=info,haven_threads=warn".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    // Config
    let config = ClientConfig::from_env()?;
    let mut channel = None;
    let mut follow = false;
    for arg in std::env::args().skip(1) {
        match arg.as_str() {
            "--follow" => follow = true,
            _ => channel = Some(arg),
        }
    }
    let channel_id = channel
        .or_else(|| std::env::var("HAVEN_CHANNEL_ID").ok())
        .map(ChannelId::from)
        .context("usage: haven [--follow] <channel-id> (or set HAVEN_CHANNEL_ID)")?;

    let api = Arc::new(HttpApi::new(&config)?);
    let session = ChannelSession::open_for(api, channel_id.clone(), &config.user_id).await?;
    let total = session.load().await?;
    info!(channel = %channel_id, total, "loaded");

    print!("{}", session.read(|store| render::outline(store, &config.user_id))?);

    if follow {
        // Gateway events arrive as one JSON object per line on stdin.
        let (mut handle, link) = GatewayHandle::pair();
        if let Some(token) = &config.token {
            handle.connect(token)?;
        }
        let GatewayLink { mut commands, events } = link;
        tokio::spawn(async move { while commands.recv().await.is_some() {} });

        let live = session.follow(handle);
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        while let Some(line) = lines.next_line().await? {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<GatewayEvent>(&line) {
                Ok(event) => {
                    if events.send(event).is_err() {
                        break;
                    }
                }
                Err(e) => warn!(error = %e, "skipping malformed event"),
            }
        }
        drop(events);
        live.await?;

        println!();
        print!("{}", session.read(|store| render::outline(store, &config.user_id))?);
        let stats = session.merge_stats()?;
        info!(
            applied = stats.applied,
            duplicates = stats.duplicates,
            unknown = stats.unknown_targets,
            "live events merged"
        );
    }

    session.close();
    Ok(())
}
