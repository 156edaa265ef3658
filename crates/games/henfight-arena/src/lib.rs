pub mod agent;
pub mod config;
pub mod gate;
pub mod scoring;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use henfight_core::diagnostics::Diagnostics;
use henfight_core::error::{ActionOutcome, CoreError};
use henfight_core::game_trait::{GameEvent, GameMetadata, HenfightGame, PlayerId, PlayerScore};
use henfight_core::henfight_game_boilerplate;
use henfight_core::player::Player;
use henfight_core::services::EntityId;
use henfight_core::time::{SimClock, SimTime};

use agent::{AgentBindings, AgentSnapshot, PlayerAgent};
use config::ArenaConfig;
use gate::{ContactOutcome, GateBindings, GateState, PortalGate, Teleportable};

/// Where the match is in its lifecycle. Nothing ticks outside `Playing`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchPhase {
    Menu,
    Playing,
    GameOver,
}

/// Serializable snapshot of the match.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArenaState {
    pub phase: MatchPhase,
    pub time: SimTime,
    pub player_ids: [Option<PlayerId>; 2],
    pub agents: [AgentSnapshot; 2],
    pub gates: Vec<GateState>,
    pub kills: u32,
    pub round_complete: bool,
}

/// Per-tick input from one player.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ArenaInput {
    pub move_x: f32,
    pub move_z: f32,
    pub attack: bool,
}

/// Collaborator wiring for a whole match.
pub struct ArenaSetup {
    pub agents: [AgentBindings; 2],
    pub gates: Vec<GateBindings>,
    pub diagnostics: Arc<dyn Diagnostics>,
}

/// Two agents, their portal doors, and the round around them.
pub struct ArenaMatch {
    config: ArenaConfig,
    agents: [PlayerAgent; 2],
    gates: Vec<PortalGate>,
    diagnostics: Arc<dyn Diagnostics>,
    clock: SimClock,
    state: ArenaState,
    pending_inputs: HashMap<PlayerId, ArenaInput>,
    /// Events raised by collision callbacks between ticks.
    queued_events: Vec<GameEvent>,
    paused: bool,
}

impl ArenaMatch {
    pub fn new(config: ArenaConfig, setup: ArenaSetup) -> Self {
        let ArenaSetup {
            agents: [first, second],
            gates,
            diagnostics,
        } = setup;

        let build = |bindings: AgentBindings, slot: u64| {
            let agent = PlayerAgent::new(config.agent.clone(), bindings, Arc::clone(&diagnostics));
            match config.rng_seed {
                Some(seed) => agent.with_rng_seed(seed.wrapping_add(slot)),
                None => agent,
            }
        };
        let agents = [build(first, 0), build(second, 1)];
        let gates: Vec<PortalGate> = gates
            .into_iter()
            .map(|g| PortalGate::new(g, Arc::clone(&diagnostics)))
            .collect();

        let phase = if config.start_in_menu {
            MatchPhase::Menu
        } else {
            MatchPhase::Playing
        };
        let state = ArenaState {
            phase,
            time: 0.0,
            player_ids: [None, None],
            agents: [agents[0].snapshot(), agents[1].snapshot()],
            gates: gates.iter().map(|g| g.state()).collect(),
            kills: 0,
            round_complete: false,
        };

        Self {
            config,
            agents,
            gates,
            diagnostics,
            clock: SimClock::new(),
            state,
            pending_inputs: HashMap::new(),
            queued_events: Vec::new(),
            paused: false,
        }
    }

    pub fn state(&self) -> &ArenaState {
        &self.state
    }

    pub fn config(&self) -> &ArenaConfig {
        &self.config
    }

    pub fn agent(&self, slot: usize) -> Option<&PlayerAgent> {
        self.agents.get(slot)
    }

    pub fn gate(&self, index: usize) -> Option<&PortalGate> {
        self.gates.get(index)
    }

    pub fn now(&self) -> SimTime {
        self.clock.now()
    }

    pub fn phase(&self) -> MatchPhase {
        self.state.phase
    }

    pub fn slot_of(&self, player_id: PlayerId) -> Option<usize> {
        self.state.player_ids.iter().position(|&p| p == Some(player_id))
    }

    fn running(&self) -> bool {
        !self.paused && self.state.phase == MatchPhase::Playing
    }

    fn check_slot(&self, slot: usize, action: &str) -> bool {
        if slot < self.agents.len() {
            return true;
        }
        self.diagnostics.report(&CoreError::invalid(
            "arena",
            format!("{action}: no agent in slot {slot}"),
        ));
        false
    }

    fn player_in(&self, slot: usize) -> PlayerId {
        self.state.player_ids[slot].unwrap_or(slot as PlayerId + 1)
    }

    fn sync_state(&mut self) {
        self.state.time = self.clock.now();
        self.state.agents = [self.agents[0].snapshot(), self.agents[1].snapshot()];
        self.state.gates = self.gates.iter().map(|g| g.state()).collect();
    }

    /// Leave the menu and start ticking.
    pub fn start_match(&mut self) {
        if self.state.phase == MatchPhase::Menu {
            self.state.phase = MatchPhase::Playing;
            tracing::info!("match started");
        }
    }

    /// Full restart: agents back to round start, doors closed, clock at zero.
    pub fn restart(&mut self) {
        for agent in &mut self.agents {
            agent.reset();
        }
        for gate in &mut self.gates {
            gate.reload();
        }
        self.clock = SimClock::new();
        self.pending_inputs.clear();
        self.queued_events.clear();
        self.state.kills = 0;
        self.state.round_complete = false;
        self.state.phase = MatchPhase::Playing;
        self.sync_state();
    }

    /// Host collision callback: `striker`'s hand touched the other agent.
    pub fn on_hand_contact(&mut self, striker: usize) -> ActionOutcome {
        if !self.running() || !self.check_slot(striker, "hand contact") {
            return ActionOutcome::RateLimited;
        }
        let now = self.clock.now();
        let [first, second] = &mut self.agents;
        let (attacker, victim) = if striker == 0 {
            (first, second)
        } else {
            (second, first)
        };

        let outcome = attacker.hit(victim, now);
        if outcome.performed() {
            let victim_slot = 1 - striker;
            self.queued_events.push(GameEvent::EggLaid {
                victim: self.player_in(victim_slot),
            });
        }
        self.sync_state();
        outcome
    }

    /// Take a life from the agent in `slot`. Ends the round on elimination.
    pub fn lose_life(&mut self, slot: usize) {
        if self.state.phase == MatchPhase::GameOver || !self.check_slot(slot, "lose life") {
            return;
        }
        let player_id = self.player_in(slot);
        let agent = &mut self.agents[slot];
        agent.lose_life();
        let lives = agent.lives();
        let eliminated = agent.is_eliminated();

        self.queued_events.push(GameEvent::LifeLost { player_id, lives });
        if eliminated {
            self.queued_events.push(GameEvent::Eliminated { player_id });
            self.queued_events.push(GameEvent::RoundComplete);
            self.state.phase = MatchPhase::GameOver;
            self.state.round_complete = true;
            tracing::info!(player_id, "player eliminated, round over");
        }
        self.sync_state();
    }

    /// Count a defeated enemy toward the shared tally.
    pub fn record_kill(&mut self) {
        self.state.kills += 1;
        self.queued_events.push(GameEvent::ScoreUpdate {
            kills: self.state.kills,
        });
    }

    pub fn activate_gate(&mut self, index: usize) -> bool {
        let Some(gate) = self.gates.get_mut(index) else {
            self.diagnostics.report(&CoreError::invalid(
                "arena",
                format!("activate gate: no gate {index}"),
            ));
            return false;
        };
        let activated = gate.activate_door();
        if activated {
            self.queued_events.push(GameEvent::GateActivated { gate: index });
            self.sync_state();
        }
        activated
    }

    /// Host collision callback: `contact` touched gate `index`.
    pub fn on_gate_contact(&mut self, index: usize, contact: Option<EntityId>) -> ContactOutcome {
        if !self.running() {
            return ContactOutcome::Ignored;
        }
        let Some(gate) = self.gates.get_mut(index) else {
            self.diagnostics.report(&CoreError::invalid(
                "arena",
                format!("gate contact: no gate {index}"),
            ));
            return ContactOutcome::Skipped;
        };
        let players: [&dyn Teleportable; 2] = [&self.agents[0], &self.agents[1]];
        let outcome = gate.on_player_contact(contact, &players);

        if let ContactOutcome::Teleported(entity) = outcome
            && let Some(slot) = self.agents.iter().position(|a| a.entity() == entity)
        {
            self.queued_events.push(GameEvent::Teleported {
                player_id: self.player_in(slot),
                gate: index,
            });
        }
        outcome
    }
}

impl HenfightGame for ArenaMatch {
    fn metadata(&self) -> GameMetadata {
        GameMetadata {
            name: "Henfight Arena".to_string(),
            description: "Two chickens, one arena. Make the other one lay eggs.".to_string(),
            min_players: 2,
            max_players: 2,
            estimated_round_duration: Duration::from_secs(180),
        }
    }

    fn tick_rate(&self) -> f32 {
        self.config.tick_rate
    }

    fn init(&mut self, players: &[Player]) {
        let active: Vec<&Player> = players.iter().filter(|p| !p.is_spectator).collect();
        if active.len() != 2 {
            self.diagnostics.report(&CoreError::invalid(
                "arena",
                format!("a match needs exactly 2 players, got {}", active.len()),
            ));
        }
        self.restart();
        self.state.player_ids = [active.first().map(|p| p.id), active.get(1).map(|p| p.id)];
        if self.config.start_in_menu {
            self.state.phase = MatchPhase::Menu;
        }
    }

    fn fixed_update(&mut self, dt: f32) -> Vec<GameEvent> {
        let mut events = std::mem::take(&mut self.queued_events);
        if !self.running() {
            return events;
        }
        let now = self.clock.advance(dt);

        for slot in 0..self.agents.len() {
            let Some(player_id) = self.state.player_ids[slot] else {
                continue;
            };
            let Some(input) = self.pending_inputs.remove(&player_id) else {
                continue;
            };
            let agent = &mut self.agents[slot];
            agent.move_by(input.move_x, input.move_z);
            if input.attack {
                agent.attack(now);
            }
        }

        for agent in &mut self.agents {
            agent.tick_physics(dt);
        }

        self.sync_state();
        events.append(&mut self.queued_events);
        events
    }

    fn frame_update(&mut self) -> Vec<GameEvent> {
        if self.running() {
            let now = self.clock.now();
            for agent in &mut self.agents {
                agent.tick_animation_state(now);
            }
            self.sync_state();
        }
        std::mem::take(&mut self.queued_events)
    }

    henfight_game_boilerplate!(state_type: ArenaState);

    fn apply_input(&mut self, player_id: PlayerId, input: &[u8]) {
        match rmp_serde::from_slice::<ArenaInput>(input) {
            Err(e) => {
                tracing::debug!(player_id, error = %e, "Dropped malformed arena input");
            },
            Ok(mut ai) => {
                if !ai.move_x.is_finite() {
                    ai.move_x = 0.0;
                }
                if !ai.move_z.is_finite() {
                    ai.move_z = 0.0;
                }
                // Movement is latest-wins; an attack press survives until the
                // next fixed tick consumes it.
                if let Some(existing) = self.pending_inputs.get_mut(&player_id) {
                    existing.move_x = ai.move_x;
                    existing.move_z = ai.move_z;
                    existing.attack |= ai.attack;
                } else {
                    self.pending_inputs.insert(player_id, ai);
                }
            },
        }
    }

    fn round_results(&self) -> Vec<PlayerScore> {
        self.state
            .player_ids
            .iter()
            .zip(&self.agents)
            .filter_map(|(pid, agent)| pid.map(|pid| scoring::player_score(pid, agent)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use henfight_core::math::{Pose, Vec3};
    use henfight_core::services::{
        AssetId, ClipSet, EffectHandle, PLAYER_TAG, PhysicsService, PrefabId,
    };
    use henfight_core::test_helpers::{Call, RecordingHost, make_players, run_game_ticks};

    const P1: EntityId = EntityId(1);
    const P2: EntityId = EntityId(2);
    const DOOR: EntityId = EntityId(100);

    fn agent_bindings(host: &Arc<RecordingHost>, me: EntityId, them: EntityId) -> AgentBindings {
        AgentBindings::new(format!("Player {}", me.0), me)
            .with_opponent(them)
            .with_hand(EntityId(me.0 + 10))
            .with_egg_prefab(PrefabId(1))
            .with_particles(vec![EffectHandle(me.0)])
            .with_life_icon(AssetId(1))
            .with_services(host)
    }

    fn setup(host: &Arc<RecordingHost>) -> ArenaSetup {
        host.tag(P1, PLAYER_TAG);
        host.tag(P2, PLAYER_TAG);
        host.place(P1, Vec3::planar(-10.0, 0.0));
        host.place(P2, Vec3::planar(10.0, 0.0));
        ArenaSetup {
            agents: [agent_bindings(host, P1, P2), agent_bindings(host, P2, P1)],
            gates: vec![
                GateBindings::new("Door", DOOR, Pose::at(Vec3::planar(0.0, 20.0)))
                    .with_target(Pose::at(Vec3::planar(0.0, -30.0)))
                    .with_portal_prefab(PrefabId(5))
                    .with_services(host),
            ],
            diagnostics: Arc::clone(host) as Arc<dyn Diagnostics>,
        }
    }

    fn config() -> ArenaConfig {
        ArenaConfig {
            rng_seed: Some(42),
            ..ArenaConfig::default()
        }
    }

    fn started(host: &Arc<RecordingHost>) -> ArenaMatch {
        let mut game = ArenaMatch::new(config(), setup(host));
        game.init(&make_players(2));
        game
    }

    fn input(move_x: f32, move_z: f32, attack: bool) -> Vec<u8> {
        rmp_serde::to_vec(&ArenaInput {
            move_x,
            move_z,
            attack,
        })
        .unwrap()
    }

    #[test]
    fn init_assigns_slots() {
        let host = Arc::new(RecordingHost::default());
        let game = started(&host);
        assert_eq!(game.state.player_ids, [Some(1), Some(2)]);
        assert_eq!(game.slot_of(2), Some(1));
        assert_eq!(game.phase(), MatchPhase::Playing);
        assert!(host.reports().is_empty());
    }

    #[test]
    fn init_with_wrong_player_count_is_reported() {
        let host = Arc::new(RecordingHost::default());
        let mut game = ArenaMatch::new(config(), setup(&host));
        game.init(&make_players(3));
        assert_eq!(host.reports().len(), 1);
    }

    #[test]
    fn input_moves_agent() {
        let host = Arc::new(RecordingHost::default());
        let mut game = started(&host);

        game.apply_input(1, &input(5.0, 0.0, false));
        game.fixed_update(0.02);
        game.frame_update();

        assert!(host.position(P1).x > -10.0);
        assert!(game.state.agents[0].walking);
        assert_eq!(host.position(P2), Vec3::planar(10.0, 0.0));
    }

    #[test]
    fn malformed_input_dropped() {
        let host = Arc::new(RecordingHost::default());
        let mut game = started(&host);
        game.apply_input(1, &[0xff, 0x00, 0x13]);
        assert!(game.pending_inputs.is_empty());
    }

    #[test]
    fn attack_press_survives_later_input() {
        let host = Arc::new(RecordingHost::default());
        let mut game = started(&host);
        game.apply_input(1, &input(0.0, 0.0, true));
        game.apply_input(1, &input(1.0, 0.0, false));
        assert!(game.pending_inputs[&1].attack);
        assert_eq!(game.pending_inputs[&1].move_x, 1.0);

        game.fixed_update(0.02);
        assert_eq!(host.sounds(), vec![ClipSet::Miss]);
    }

    #[test]
    fn menu_phase_freezes_everything() {
        let host = Arc::new(RecordingHost::default());
        let mut game = ArenaMatch::new(
            ArenaConfig {
                start_in_menu: true,
                ..config()
            },
            setup(&host),
        );
        game.init(&make_players(2));
        assert_eq!(game.phase(), MatchPhase::Menu);
        host.clear_calls();

        game.apply_input(1, &input(5.0, 0.0, true));
        run_game_ticks(&mut game, 10, 0.02);
        assert_eq!(game.now(), 0.0);
        assert!(host.calls().is_empty());

        game.start_match();
        game.fixed_update(0.02);
        assert!(game.now() > 0.0);
        assert!(host.position(P1).x > -10.0);
    }

    #[test]
    fn pause_freezes_clock() {
        let host = Arc::new(RecordingHost::default());
        let mut game = started(&host);
        game.pause();
        run_game_ticks(&mut game, 5, 0.02);
        assert_eq!(game.now(), 0.0);
        game.resume();
        run_game_ticks(&mut game, 5, 0.02);
        assert!(game.now() > 0.0);
    }

    #[test]
    fn hand_contact_lays_egg_on_victim() {
        let host = Arc::new(RecordingHost::default());
        let mut game = started(&host);
        game.fixed_update(0.02);

        assert!(game.on_hand_contact(0).performed());
        assert_eq!(game.on_hand_contact(0), ActionOutcome::RateLimited);

        assert!(game.agent(1).unwrap().controls_disabled());
        assert!(!game.agent(0).unwrap().controls_disabled());
        let events = game.fixed_update(0.02);
        assert!(events.contains(&GameEvent::EggLaid { victim: 2 }));
        assert_eq!(game.state.agents[1].eggs_laid, 1);
    }

    #[test]
    fn bad_slot_reported() {
        let host = Arc::new(RecordingHost::default());
        let mut game = started(&host);
        assert_eq!(game.on_hand_contact(5), ActionOutcome::RateLimited);
        assert_eq!(host.reports().len(), 1);
    }

    #[test]
    fn losing_all_lives_ends_round() {
        let host = Arc::new(RecordingHost::default());
        let mut game = started(&host);

        for _ in 0..3 {
            game.lose_life(1);
        }
        assert!(!game.is_round_complete());
        game.lose_life(1);
        assert!(game.is_round_complete());
        assert_eq!(game.phase(), MatchPhase::GameOver);
        assert_eq!(host.count(|c| *c == Call::GameOver(P2)), 1);

        let events = game.fixed_update(0.02);
        assert!(events.contains(&GameEvent::Eliminated { player_id: 2 }));
        assert!(events.contains(&GameEvent::RoundComplete));
        assert_eq!(
            events
                .iter()
                .filter(|e| matches!(e, GameEvent::LifeLost { .. }))
                .count(),
            4
        );

        let results = game.round_results();
        assert_eq!(results.len(), 2);
        assert_eq!(scoring::winner(&results), Some(1));

        // Further hits do nothing once the round is over
        assert_eq!(game.on_hand_contact(0), ActionOutcome::RateLimited);
    }

    #[test]
    fn gate_flow_teleports_contacting_player() {
        let host = Arc::new(RecordingHost::default());
        let mut game = started(&host);

        assert_eq!(game.on_gate_contact(0, Some(P1)), ContactOutcome::Ignored);
        assert!(game.activate_gate(0));
        assert!(!game.activate_gate(0));
        assert_eq!(
            game.on_gate_contact(0, Some(P1)),
            ContactOutcome::Teleported(P1)
        );
        assert_eq!(host.position(P1), Vec3::planar(0.0, -30.0));
        assert_eq!(host.position(P2), Vec3::planar(10.0, 0.0));
        assert_eq!(host.count(|c| matches!(c, Call::FadeToBlack { .. })), 1);

        let events = game.fixed_update(0.02);
        assert!(events.contains(&GameEvent::GateActivated { gate: 0 }));
        assert!(events.contains(&GameEvent::Teleported {
            player_id: 1,
            gate: 0
        }));
        assert_eq!(game.state.gates, vec![GateState::Active]);
    }

    #[test]
    fn kills_are_tallied() {
        let host = Arc::new(RecordingHost::default());
        let mut game = started(&host);
        game.record_kill();
        game.record_kill();
        let events = game.frame_update();
        assert_eq!(events.last(), Some(&GameEvent::ScoreUpdate { kills: 2 }));
        assert_eq!(game.state.kills, 2);
    }

    #[test]
    fn restart_restores_round_start() {
        let host = Arc::new(RecordingHost::default());
        let mut game = started(&host);
        game.activate_gate(0);
        for _ in 0..4 {
            game.lose_life(0);
        }
        game.restart();
        assert_eq!(game.phase(), MatchPhase::Playing);
        assert_eq!(game.agent(0).unwrap().lives(), 3);
        assert_eq!(game.gate(0).unwrap().state(), GateState::Inactive);
        assert!(!game.is_round_complete());
    }

    #[test]
    fn state_snapshot_decodes() {
        let host = Arc::new(RecordingHost::default());
        let mut game = started(&host);
        game.apply_input(2, &input(-3.0, 0.0, false));
        run_game_ticks(&mut game, 3, 0.02);

        let bytes = game.serialize_state();
        let back: ArenaState = rmp_serde::from_slice(&bytes).unwrap();
        assert_eq!(back.player_ids, [Some(1), Some(2)]);
        assert!(back.time > 0.0);
        assert!(back.agents[1].velocity.x < 0.0);
    }

    #[test]
    fn metadata_is_two_player() {
        let host = Arc::new(RecordingHost::default());
        let game = ArenaMatch::new(config(), setup(&host));
        let meta = game.metadata();
        assert_eq!((meta.min_players, meta.max_players), (2, 2));
        let json = serde_json::to_string(&meta).unwrap();
        assert!(json.contains("Henfight Arena"));
    }
}
