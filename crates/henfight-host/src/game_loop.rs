use std::sync::Arc;
use std::time::Duration;

use rand::SeedableRng;
use rand::rngs::StdRng;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use henfight_arena::config::ArenaConfig;
use henfight_arena::{ArenaMatch, scoring};
use henfight_core::game_trait::{GameEvent, HenfightGame, PlayerId, PlayerScore};
use henfight_core::player::Player;
use henfight_core::services::PhysicsService;

use crate::bot::generate_bot_input;
use crate::config::{BotConfig, HostConfig, RulesConfig};
use crate::world::{ArenaLayout, HeadlessWorld, WorldStats, build_arena};

/// Player ids assigned to the two arena slots.
pub const PLAYER_IDS: [PlayerId; 2] = [1, 2];

/// Commands sent into a running match.
#[derive(Debug)]
pub enum MatchCommand {
    PlayerInput {
        player_id: PlayerId,
        input_data: Vec<u8>,
    },
    Pause,
    Resume,
    Stop,
}

/// Messages the match loop sends out.
#[derive(Debug, Clone)]
pub enum MatchBroadcast {
    /// Msgpack-encoded `ArenaState` after a tick.
    State { tick: u64, state_data: Vec<u8> },
    Events { tick: u64, events: Vec<GameEvent> },
    /// The loop has exited.
    Ended(MatchSummary),
}

/// How a match finished.
#[derive(Debug, Clone)]
pub struct MatchSummary {
    pub ticks: u64,
    pub round_complete: bool,
    pub results: Vec<PlayerScore>,
    pub winner: Option<PlayerId>,
    pub stats: WorldStats,
}

/// An arena match plus the world, bots, and house rules around it.
pub struct HostedMatch {
    game: ArenaMatch,
    world: Arc<HeadlessWorld>,
    layout: ArenaLayout,
    rules: RulesConfig,
    bots: BotConfig,
    rng: StdRng,
    tick: u64,
    paused: bool,
    lives_charged: [u32; 2],
}

impl HostedMatch {
    /// Build the world and start the match. An unusable `tick_rate` falls
    /// back to the default rate.
    pub fn new(host: &HostConfig, mut arena: ArenaConfig) -> Self {
        if !arena.problems().is_empty() {
            let fallback = ArenaConfig::default().tick_rate;
            tracing::warn!(
                tick_rate = arena.tick_rate,
                fallback,
                "unusable arena tick rate, using default"
            );
            arena.tick_rate = fallback;
        }

        let world = Arc::new(HeadlessWorld::new(host.viewport.clone()));
        let (setup, layout) = build_arena(&world, &host.rules);

        let mut game = ArenaMatch::new(arena, setup);
        let players: Vec<Player> = PLAYER_IDS
            .iter()
            .map(|&id| Player::new(id, format!("Bot {id}")))
            .collect();
        game.init(&players);
        game.start_match();

        let rng = match host.bots.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };

        Self {
            game,
            world,
            layout,
            rules: host.rules.clone(),
            bots: host.bots.clone(),
            rng,
            tick: 0,
            paused: false,
            lives_charged: [0; 2],
        }
    }

    pub fn game(&self) -> &ArenaMatch {
        &self.game
    }

    pub fn world(&self) -> &HeadlessWorld {
        &self.world
    }

    pub fn layout(&self) -> &ArenaLayout {
        &self.layout
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Apply one command. Returns false when the loop should stop.
    pub fn apply_command(&mut self, cmd: MatchCommand) -> bool {
        match cmd {
            MatchCommand::PlayerInput {
                player_id,
                input_data,
            } => self.game.apply_input(player_id, &input_data),
            MatchCommand::Pause => {
                self.paused = true;
                self.game.pause();
            },
            MatchCommand::Resume => {
                self.paused = false;
                self.game.resume();
            },
            MatchCommand::Stop => return false,
        }
        true
    }

    /// One host tick: bot input, fixed step, frame step, then collisions
    /// and house rules.
    pub fn step(&mut self) -> Vec<GameEvent> {
        if self.paused {
            return Vec::new();
        }
        self.tick += 1;
        let dt = 1.0 / self.game.tick_rate();

        for slot in 0..2 {
            let own = self.world.position(self.layout.agents[slot].body);
            let target = self.world.position(self.layout.agents[1 - slot].body);
            let staggered = self
                .game
                .agent(slot)
                .is_some_and(|agent| agent.controls_disabled());
            let input = generate_bot_input(own, target, staggered, &self.bots, &mut self.rng);
            match rmp_serde::to_vec(&input) {
                Ok(bytes) => self.game.apply_input(PLAYER_IDS[slot], &bytes),
                Err(e) => tracing::error!(slot, error = %e, "Failed to encode bot input"),
            }
        }

        let mut events = self.game.fixed_update(dt);
        events.extend(self.game.frame_update());

        self.detect_hand_contacts();
        self.open_door_when_due();
        self.detect_door_contacts();
        self.charge_lives();

        events
    }

    fn detect_hand_contacts(&mut self) {
        for slot in 0..2 {
            let me = self.layout.agents[slot];
            let them = self.layout.agents[1 - slot];
            let Some(agent) = self.game.agent(slot) else {
                continue;
            };
            let reach = agent.config().radius * 2.0;
            if self.world.is_visible(me.hand) && self.world.distance(me.body, them.body) <= reach {
                self.game.on_hand_contact(slot);
            }
        }
    }

    fn open_door_when_due(&mut self) {
        let due = self.game.now() >= self.rules.door_opens_after_secs;
        if due && self.game.gate(0).is_some_and(|g| !g.is_active()) {
            self.game.activate_gate(0);
        }
    }

    fn detect_door_contacts(&mut self) {
        if self.game.gate(0).is_none_or(|g| !g.is_active()) {
            return;
        }
        for slot in 0..2 {
            let body = self.layout.agents[slot].body;
            let offset = self.world.position(body) - self.layout.door_position;
            if offset.length() <= self.rules.door_radius {
                self.game.on_gate_contact(0, Some(body));
            }
        }
    }

    /// Every `eggs_per_life` eggs laid costs a life.
    fn charge_lives(&mut self) {
        let per_life = self.rules.eggs_per_life.max(1);
        for slot in 0..2 {
            let Some(eggs) = self.game.agent(slot).map(|a| a.eggs_laid()) else {
                continue;
            };
            while self.lives_charged[slot] < eggs / per_life && !self.game.is_round_complete() {
                self.lives_charged[slot] += 1;
                self.game.lose_life(slot);
            }
        }
    }

    pub fn summary(&self) -> MatchSummary {
        let results = self.game.round_results();
        MatchSummary {
            ticks: self.tick,
            round_complete: self.game.is_round_complete(),
            winner: scoring::winner(&results),
            results,
            stats: self.world.stats(),
        }
    }
}

/// Spawn a match loop as a tokio task.
/// Returns the command sender, the broadcast receiver, and the task handle.
pub fn spawn_match(
    host: HostConfig,
    arena: ArenaConfig,
) -> (
    mpsc::UnboundedSender<MatchCommand>,
    mpsc::UnboundedReceiver<MatchBroadcast>,
    JoinHandle<MatchSummary>,
) {
    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
    let (broadcast_tx, broadcast_rx) = mpsc::unbounded_channel();

    let handle = tokio::spawn(async move {
        let hosted = HostedMatch::new(&host, arena);
        run_match_loop(hosted, &host, cmd_rx, broadcast_tx).await
    });

    (cmd_tx, broadcast_rx, handle)
}

async fn run_match_loop(
    mut hosted: HostedMatch,
    host: &HostConfig,
    mut cmd_rx: mpsc::UnboundedReceiver<MatchCommand>,
    broadcast_tx: mpsc::UnboundedSender<MatchBroadcast>,
) -> MatchSummary {
    let tick_interval = Duration::from_secs_f32(1.0 / hosted.game().tick_rate());
    let mut interval = tokio::time::interval(tick_interval);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    tracing::info!(
        realtime = host.realtime,
        max_ticks = host.max_ticks,
        "match loop started"
    );

    'ticks: while hosted.tick() < host.max_ticks {
        if host.realtime {
            tokio::select! {
                _ = interval.tick() => {},
                cmd = cmd_rx.recv() => {
                    let Some(cmd) = cmd else {
                        break 'ticks;
                    };
                    if !hosted.apply_command(cmd) {
                        break 'ticks;
                    }
                    continue 'ticks;
                }
            }
        } else {
            tokio::task::yield_now().await;
            while let Ok(cmd) = cmd_rx.try_recv() {
                if !hosted.apply_command(cmd) {
                    break 'ticks;
                }
            }
            if hosted.is_paused() {
                continue;
            }
        }

        let events = hosted.step();
        let tick = hosted.tick();
        if !events.is_empty() {
            for event in &events {
                tracing::debug!(tick, ?event, "game event");
            }
            let _ = broadcast_tx.send(MatchBroadcast::Events { tick, events });
        }
        let _ = broadcast_tx.send(MatchBroadcast::State {
            tick,
            state_data: hosted.game().serialize_state(),
        });

        if hosted.game().is_round_complete() {
            break;
        }
    }

    // Collision callbacks from the last tick queue events for the next one.
    let trailing = hosted.game.frame_update();
    if !trailing.is_empty() {
        let _ = broadcast_tx.send(MatchBroadcast::Events {
            tick: hosted.tick(),
            events: trailing,
        });
    }

    let summary = hosted.summary();
    tracing::info!(
        ticks = summary.ticks,
        round_complete = summary.round_complete,
        winner = ?summary.winner,
        "match loop finished"
    );
    let _ = broadcast_tx.send(MatchBroadcast::Ended(summary.clone()));
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use henfight_arena::ArenaState;

    fn fast_host(max_ticks: u64) -> HostConfig {
        HostConfig {
            realtime: false,
            max_ticks,
            bots: BotConfig {
                seed: Some(7),
                ..BotConfig::default()
            },
            ..HostConfig::default()
        }
    }

    fn seeded_arena() -> ArenaConfig {
        ArenaConfig {
            rng_seed: Some(7),
            ..ArenaConfig::default()
        }
    }

    #[test]
    fn close_bots_trade_hits_on_first_tick() {
        let host = HostConfig {
            rules: RulesConfig {
                spawn_spread: 2.0,
                eggs_per_life: 1,
                ..RulesConfig::default()
            },
            bots: BotConfig {
                seed: Some(1),
                attack_chance: 1.0,
                wander: 0.0,
                ..BotConfig::default()
            },
            ..fast_host(10)
        };
        let mut hosted = HostedMatch::new(&host, seeded_arena());
        hosted.step();

        assert_eq!(hosted.world().stats().eggs.len(), 2);
        for slot in 0..2 {
            let agent = hosted.game().agent(slot).unwrap();
            assert_eq!(agent.eggs_laid(), 1);
            assert_eq!(agent.lives(), 2);
        }
    }

    #[test]
    fn paused_match_does_not_tick() {
        let mut hosted = HostedMatch::new(&fast_host(10), seeded_arena());
        assert!(hosted.apply_command(MatchCommand::Pause));
        hosted.step();
        assert_eq!(hosted.tick(), 0);
        assert!(hosted.apply_command(MatchCommand::Resume));
        hosted.step();
        assert_eq!(hosted.tick(), 1);
        assert!(!hosted.apply_command(MatchCommand::Stop));
    }

    #[test]
    fn door_opens_on_schedule() {
        let host = HostConfig {
            rules: RulesConfig {
                door_opens_after_secs: 0.1,
                ..RulesConfig::default()
            },
            ..fast_host(10)
        };
        let mut hosted = HostedMatch::new(&host, seeded_arena());
        for _ in 0..4 {
            hosted.step();
        }
        assert!(!hosted.game().gate(0).unwrap().is_active());
        for _ in 0..2 {
            hosted.step();
        }
        assert!(hosted.game().gate(0).unwrap().is_active());
        assert_eq!(hosted.world().stats().effects_spawned, 1);
    }

    #[tokio::test]
    async fn loop_broadcasts_state_and_ends() {
        let (_cmd_tx, mut rx, handle) = spawn_match(fast_host(5), seeded_arena());

        let mut states = 0;
        let mut ended = None;
        while let Some(msg) = rx.recv().await {
            match msg {
                MatchBroadcast::State { state_data, .. } => {
                    let state: ArenaState = rmp_serde::from_slice(&state_data).unwrap();
                    assert_eq!(state.player_ids, [Some(1), Some(2)]);
                    states += 1;
                },
                MatchBroadcast::Events { .. } => {},
                MatchBroadcast::Ended(summary) => {
                    ended = Some(summary);
                    break;
                },
            }
        }

        assert_eq!(states, 5);
        let summary = ended.expect("loop should announce its end");
        assert_eq!(summary.ticks, 5);
        assert!(!summary.round_complete);
        assert_eq!(handle.await.unwrap().ticks, 5);
    }

    #[tokio::test]
    async fn zero_tick_rate_falls_back_to_default() {
        let arena = ArenaConfig {
            tick_rate: 0.0,
            ..seeded_arena()
        };
        let (_cmd_tx, _rx, handle) = spawn_match(fast_host(5), arena);
        let summary = handle.await.expect("match task must not panic");
        assert_eq!(summary.ticks, 5);
    }

    #[test]
    fn hosted_match_uses_default_rate_when_configured_rate_is_bad() {
        let arena = ArenaConfig {
            tick_rate: f32::NAN,
            ..seeded_arena()
        };
        let mut hosted = HostedMatch::new(&fast_host(10), arena);
        assert_eq!(hosted.game().tick_rate(), ArenaConfig::default().tick_rate);
        hosted.step();
        assert!(hosted.game().now() > 0.0);
    }

    #[tokio::test]
    async fn stop_command_ends_loop_early() {
        let (cmd_tx, _rx, handle) = spawn_match(fast_host(1_000_000), seeded_arena());
        cmd_tx.send(MatchCommand::Stop).unwrap();
        let summary = tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("loop should stop")
            .unwrap();
        assert!(summary.ticks < 1_000_000);
    }
}
