//! Collaborator contracts supplied by the host engine.
//!
//! The simulation never owns transforms, sounds, animations or particles.
//! It asks for them through these traits. Every method takes `&self`; hosts
//! that need to mutate use interior mutability.

use serde::{Deserialize, Serialize};

use crate::math::{Pose, Vec3};

/// Opaque handle to a host-side scene entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(pub u64);

/// Opaque handle to a host-side prefab (spawnable template).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PrefabId(pub u64);

/// Opaque handle to an attached particle system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EffectHandle(pub u64);

/// Opaque handle to a loaded texture or other asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AssetId(pub u64);

/// Tag carried by every player-controlled entity.
pub const PLAYER_TAG: &str = "Player";

/// Animator flag that tracks whether the agent is walking.
pub const WALKING_FLAG: &str = "Walking";

/// Animator trigger pulsed when the agent is struck.
pub const HIT_TRIGGER: &str = "Hit";

/// Named groups of sound clips; the host picks one clip at random.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ClipSet {
    Impact,
    Scream,
    Miss,
    LifeLost,
}

/// Spawn request for an egg projectile. The host owns the egg afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EggSpawn {
    pub prefab: PrefabId,
    pub position: Vec3,
    pub rotation: Vec3,
    pub direction: Vec3,
    pub owner: EntityId,
}

pub trait PhysicsService: Send + Sync {
    fn position(&self, entity: EntityId) -> Vec3;

    /// Unit forward vector of the entity.
    fn facing(&self, entity: EntityId) -> Vec3;

    fn translate(&self, entity: EntityId, delta: Vec3);

    fn orient(&self, entity: EntityId, toward: Vec3);

    fn set_position(&self, entity: EntityId, position: Vec3);

    /// Project a world point to screen pixels through the active camera.
    fn world_to_screen(&self, point: Vec3) -> (f32, f32);

    fn viewport_size(&self) -> (f32, f32);
}

pub trait AudioService: Send + Sync {
    fn play_random(&self, clips: ClipSet);
}

pub trait AnimationService: Send + Sync {
    fn set_flag(&self, entity: EntityId, name: &str, value: bool);

    fn trigger(&self, entity: EntityId, name: &str);
}

pub trait EffectService: Send + Sync {
    fn play_once(&self, effect: EffectHandle);

    fn spawn_effect(&self, prefab: PrefabId, pose: Pose) -> Option<EntityId>;

    fn spawn_egg(&self, egg: EggSpawn) -> Option<EntityId>;

    fn set_visible(&self, entity: EntityId, visible: bool);
}

pub trait MatchController: Send + Sync {
    /// The given agent's owner has run out of lives.
    fn report_game_over(&self, loser: EntityId);

    fn fade_to_black(&self, fade_in: f32, fade_out: f32);
}

pub trait ScreenShaker: Send + Sync {
    fn shake(&self, intensity: f32);
}

/// Area trigger that gates the lives display once the player reaches it.
pub trait AreaManager: Send + Sync {
    fn activated(&self) -> bool;
}

pub trait SceneQuery: Send + Sync {
    fn find_entities_by_tag(&self, tag: &str) -> Vec<EntityId>;

    /// Topmost ancestor of the entity (the entity itself when it has no parent).
    fn root_of(&self, entity: EntityId) -> EntityId;
}
