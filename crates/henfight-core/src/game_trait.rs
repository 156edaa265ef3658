use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Unique identifier for a player in the game.
pub type PlayerId = u64;

/// Core trait a Henfight game mode implements.
///
/// The host owns the loop: it calls [`HenfightGame::fixed_update`] once per
/// simulation tick and [`HenfightGame::frame_update`] right after it, and it
/// delivers input and collision events between ticks.
pub trait HenfightGame: Send + Sync {
    /// Game metadata for the host's selection screen.
    fn metadata(&self) -> GameMetadata;

    /// Called once when players are ready.
    fn init(&mut self, players: &[super::player::Player]);

    /// Fixed-rate step: input, movement, physics requests.
    fn fixed_update(&mut self, dt: f32) -> Vec<GameEvent>;

    /// Variable-rate step: animation state and timers.
    fn frame_update(&mut self) -> Vec<GameEvent>;

    /// Queue a player's encoded input for the next fixed step.
    fn apply_input(&mut self, player_id: PlayerId, input: &[u8]);

    /// Serialize a snapshot of the game state.
    fn serialize_state(&self) -> Vec<u8>;

    /// Simulation tick rate in Hz.
    fn tick_rate(&self) -> f32 {
        50.0
    }

    fn pause(&mut self);

    fn resume(&mut self);

    fn is_round_complete(&self) -> bool;

    fn round_results(&self) -> Vec<PlayerScore>;
}

/// Game metadata for the host's selection screen.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameMetadata {
    pub name: String,
    pub description: String,
    pub min_players: u8,
    pub max_players: u8,
    pub estimated_round_duration: Duration,
}

/// Events emitted by a game during an update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GameEvent {
    LifeLost { player_id: PlayerId, lives: i32 },
    Eliminated { player_id: PlayerId },
    EggLaid { victim: PlayerId },
    GateActivated { gate: usize },
    Teleported { player_id: PlayerId, gate: usize },
    ScoreUpdate { kills: u32 },
    RoundComplete,
}

/// Score entry for a player at the end of a round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerScore {
    pub player_id: PlayerId,
    pub lives: i32,
    pub eggs_laid: u32,
}

/// Generates the `HenfightGame` methods that only touch the snapshot and
/// pause flag: `serialize_state`, `pause`, `resume`, `is_round_complete`.
///
/// Requires the implementing struct to have `state: $StateType` and
/// `paused: bool` fields, and `$StateType` to have a `round_complete: bool`
/// field.
#[macro_export]
macro_rules! henfight_game_boilerplate {
    (state_type: $StateType:ty) => {
        fn serialize_state(&self) -> Vec<u8> {
            rmp_serde::to_vec(&self.state).expect("game state serialization must succeed")
        }

        fn pause(&mut self) {
            self.paused = true;
        }

        fn resume(&mut self) {
            self.paused = false;
        }

        fn is_round_complete(&self) -> bool {
            self.state.round_complete
        }
    };
}
