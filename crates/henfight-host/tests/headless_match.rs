use henfight_arena::config::ArenaConfig;
use henfight_core::game_trait::GameEvent;
use henfight_core::services::PhysicsService;
use henfight_host::config::{BotConfig, HostConfig, RulesConfig};
use henfight_host::game_loop::{HostedMatch, MatchBroadcast, spawn_match};

fn brawl_config() -> HostConfig {
    HostConfig {
        realtime: false,
        max_ticks: 5_000,
        rules: RulesConfig {
            eggs_per_life: 1,
            ..RulesConfig::default()
        },
        bots: BotConfig {
            seed: Some(2024),
            attack_chance: 0.5,
            ..BotConfig::default()
        },
        ..HostConfig::default()
    }
}

fn seeded_arena() -> ArenaConfig {
    ArenaConfig {
        rng_seed: Some(2024),
        ..ArenaConfig::default()
    }
}

#[tokio::test]
async fn bots_brawl_until_someone_is_eliminated() {
    let (_cmd_tx, mut rx, handle) = spawn_match(brawl_config(), seeded_arena());

    let mut events = Vec::new();
    while let Some(msg) = rx.recv().await {
        match msg {
            MatchBroadcast::Events { events: batch, .. } => events.extend(batch),
            MatchBroadcast::State { .. } => {},
            MatchBroadcast::Ended(_) => break,
        }
    }
    let summary = handle.await.unwrap();

    assert!(summary.ticks <= 5_000);
    let eggs: u32 = summary.results.iter().map(|s| s.eggs_laid).sum();
    assert!(eggs > 0, "bots should land at least one hit");
    assert_eq!(summary.stats.eggs.len() as u32, eggs);
    assert_eq!(
        events
            .iter()
            .filter(|e| matches!(e, GameEvent::EggLaid { .. }))
            .count() as u32,
        eggs
    );

    if summary.round_complete {
        let eliminated: Vec<_> = summary.results.iter().filter(|s| s.lives < 0).collect();
        assert_eq!(eliminated.len(), 1);
        assert!(summary.stats.game_over.is_some());
        assert!(events.contains(&GameEvent::RoundComplete));
        assert!(summary.winner.is_some());
        assert_ne!(summary.winner, Some(eliminated[0].player_id));
    }
}

#[test]
fn open_door_carries_touching_player_to_target() {
    let host = HostConfig {
        realtime: false,
        rules: RulesConfig {
            door_opens_after_secs: 0.0,
            door_radius: 1_000.0,
            ..RulesConfig::default()
        },
        bots: BotConfig {
            seed: Some(5),
            attack_chance: 0.0,
            ..BotConfig::default()
        },
        ..HostConfig::default()
    };
    let mut hosted = HostedMatch::new(&host, seeded_arena());

    hosted.step();
    let events = hosted.step();

    let layout = *hosted.layout();
    assert!(hosted.game().gate(0).unwrap().is_active());
    assert!(events.contains(&GameEvent::GateActivated { gate: 0 }));
    assert!(
        events
            .iter()
            .any(|e| matches!(e, GameEvent::Teleported { gate: 0, .. }))
    );
    assert!(hosted.world().stats().fades >= 1);
    // Teleports land on the target; at most one tick of walking since.
    let body = layout.agents[0].body;
    let offset = hosted.world().position(body) - layout.target;
    assert!(offset.length() < 1.0);
}
