use tracing_subscriber::EnvFilter;

use henfight_arena::config::ArenaConfig;
use henfight_host::config::HostConfig;
use henfight_host::game_loop::{MatchBroadcast, spawn_match};

#[tokio::main]
async fn main() {
    let json = std::env::var("HENFIGHT_LOG_FORMAT").is_ok_and(|v| v == "json");
    if json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(EnvFilter::from_default_env())
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .init();
    }

    tracing::info!("Henfight host starting");

    let host = HostConfig::load();
    host.validate();
    let arena = ArenaConfig::load();
    arena.validate();

    let (cmd_tx, mut broadcast_rx, handle) = spawn_match(host, arena);

    while let Some(msg) = broadcast_rx.recv().await {
        match msg {
            MatchBroadcast::Events { tick, events } => {
                for event in events {
                    tracing::info!(tick, ?event, "match event");
                }
            },
            MatchBroadcast::State { .. } => {},
            MatchBroadcast::Ended(_) => break,
        }
    }
    drop(cmd_tx);

    match handle.await {
        Ok(summary) => {
            for score in &summary.results {
                tracing::info!(
                    player_id = score.player_id,
                    lives = score.lives,
                    eggs_laid = score.eggs_laid,
                    "final score"
                );
            }
            match summary.winner {
                Some(winner) => tracing::info!(winner, ticks = summary.ticks, "match won"),
                None => tracing::info!(ticks = summary.ticks, "match drawn"),
            }
        },
        Err(e) => tracing::error!(error = %e, "match task failed"),
    }
}
