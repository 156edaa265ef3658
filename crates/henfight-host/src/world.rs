//! A minimal in-process world that stands in for a game engine.
//!
//! It keeps entity transforms, projects them through a top-down camera, and
//! logs every audio, animation and effect request instead of rendering it.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use henfight_arena::ArenaSetup;
use henfight_arena::agent::AgentBindings;
use henfight_arena::gate::GateBindings;
use henfight_core::diagnostics::{Diagnostics, TracingDiagnostics};
use henfight_core::math::{Pose, Vec3};
use henfight_core::services::{
    AnimationService, AreaManager, AssetId, AudioService, ClipSet, EffectHandle, EffectService,
    EggSpawn, EntityId, MatchController, PLAYER_TAG, PhysicsService, PrefabId, SceneQuery,
    ScreenShaker,
};

use crate::config::{RulesConfig, ViewportConfig};

const EGG_PREFAB: PrefabId = PrefabId(1);
const PORTAL_PREFAB: PrefabId = PrefabId(2);
const LIFE_ICON: AssetId = AssetId(1);

/// Counters for everything the world was asked to present.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WorldStats {
    pub sounds: HashMap<ClipSet, u32>,
    pub eggs: Vec<EggSpawn>,
    pub effects_spawned: u32,
    pub particles_played: u32,
    pub shakes: u32,
    pub fades: u32,
    pub game_over: Option<EntityId>,
}

#[derive(Debug, Clone, Copy)]
struct Body {
    position: Vec3,
    facing: Vec3,
}

pub struct HeadlessWorld {
    viewport: ViewportConfig,
    bodies: Mutex<HashMap<EntityId, Body>>,
    tags: Mutex<HashMap<EntityId, &'static str>>,
    parents: Mutex<HashMap<EntityId, EntityId>>,
    hidden: Mutex<HashSet<EntityId>>,
    stats: Mutex<WorldStats>,
    area_active: AtomicBool,
    next_entity: AtomicU64,
}

// Transforms and counters stay consistent even if a holder panicked.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

impl HeadlessWorld {
    pub fn new(viewport: ViewportConfig) -> Self {
        Self {
            viewport,
            bodies: Mutex::new(HashMap::new()),
            tags: Mutex::new(HashMap::new()),
            parents: Mutex::new(HashMap::new()),
            hidden: Mutex::new(HashSet::new()),
            stats: Mutex::new(WorldStats::default()),
            area_active: AtomicBool::new(true),
            next_entity: AtomicU64::new(1),
        }
    }

    /// Create an entity at `position`, optionally tagged and parented.
    pub fn spawn(
        &self,
        position: Vec3,
        tag: Option<&'static str>,
        parent: Option<EntityId>,
    ) -> EntityId {
        let id = EntityId(self.next_entity.fetch_add(1, Ordering::Relaxed));
        lock(&self.bodies).insert(
            id,
            Body {
                position,
                facing: Vec3::FORWARD,
            },
        );
        if let Some(tag) = tag {
            lock(&self.tags).insert(id, tag);
        }
        if let Some(parent) = parent {
            lock(&self.parents).insert(id, parent);
        }
        id
    }

    pub fn is_visible(&self, entity: EntityId) -> bool {
        !lock(&self.hidden).contains(&entity)
    }

    pub fn set_area_active(&self, active: bool) {
        self.area_active.store(active, Ordering::Relaxed);
    }

    pub fn stats(&self) -> WorldStats {
        lock(&self.stats).clone()
    }

    pub fn distance(&self, a: EntityId, b: EntityId) -> f32 {
        (self.position(a) - self.position(b)).length()
    }
}

impl PhysicsService for HeadlessWorld {
    fn position(&self, entity: EntityId) -> Vec3 {
        lock(&self.bodies)
            .get(&entity)
            .map_or(Vec3::ZERO, |b| b.position)
    }

    fn facing(&self, entity: EntityId) -> Vec3 {
        lock(&self.bodies)
            .get(&entity)
            .map_or(Vec3::FORWARD, |b| b.facing)
    }

    fn translate(&self, entity: EntityId, delta: Vec3) {
        if let Some(body) = lock(&self.bodies).get_mut(&entity) {
            body.position += delta;
        }
    }

    fn orient(&self, entity: EntityId, toward: Vec3) {
        if let Some(body) = lock(&self.bodies).get_mut(&entity) {
            let facing = (toward - body.position).normalize_or_zero();
            if facing != Vec3::ZERO {
                body.facing = facing;
            }
        }
    }

    fn set_position(&self, entity: EntityId, position: Vec3) {
        tracing::debug!(entity = entity.0, x = position.x, z = position.z, "entity moved");
        lock(&self.bodies)
            .entry(entity)
            .or_insert(Body {
                position,
                facing: Vec3::FORWARD,
            })
            .position = position;
    }

    fn world_to_screen(&self, point: Vec3) -> (f32, f32) {
        let ppu = self.viewport.pixels_per_unit;
        (
            point.x * ppu + self.viewport.width / 2.0,
            point.z * ppu + self.viewport.height / 2.0,
        )
    }

    fn viewport_size(&self) -> (f32, f32) {
        (self.viewport.width, self.viewport.height)
    }
}

impl AudioService for HeadlessWorld {
    fn play_random(&self, clips: ClipSet) {
        tracing::trace!(?clips, "sound");
        *lock(&self.stats).sounds.entry(clips).or_insert(0) += 1;
    }
}

impl AnimationService for HeadlessWorld {
    fn set_flag(&self, entity: EntityId, name: &str, value: bool) {
        tracing::trace!(entity = entity.0, name, value, "animator flag");
    }

    fn trigger(&self, entity: EntityId, name: &str) {
        tracing::trace!(entity = entity.0, name, "animator trigger");
    }
}

impl EffectService for HeadlessWorld {
    fn play_once(&self, effect: EffectHandle) {
        tracing::trace!(effect = effect.0, "particles");
        lock(&self.stats).particles_played += 1;
    }

    fn spawn_effect(&self, prefab: PrefabId, pose: Pose) -> Option<EntityId> {
        let id = self.spawn(pose.position, None, None);
        tracing::debug!(prefab = prefab.0, entity = id.0, "effect spawned");
        lock(&self.stats).effects_spawned += 1;
        Some(id)
    }

    fn spawn_egg(&self, egg: EggSpawn) -> Option<EntityId> {
        let id = self.spawn(egg.position, None, None);
        tracing::debug!(owner = egg.owner.0, entity = id.0, "egg spawned");
        lock(&self.stats).eggs.push(egg);
        Some(id)
    }

    fn set_visible(&self, entity: EntityId, visible: bool) {
        let mut hidden = lock(&self.hidden);
        if visible {
            hidden.remove(&entity);
        } else {
            hidden.insert(entity);
        }
    }
}

impl MatchController for HeadlessWorld {
    fn report_game_over(&self, loser: EntityId) {
        tracing::info!(loser = loser.0, "game over");
        let mut stats = lock(&self.stats);
        if stats.game_over.is_none() {
            stats.game_over = Some(loser);
        }
    }

    fn fade_to_black(&self, fade_in: f32, fade_out: f32) {
        tracing::debug!(fade_in, fade_out, "fade to black");
        lock(&self.stats).fades += 1;
    }
}

impl ScreenShaker for HeadlessWorld {
    fn shake(&self, intensity: f32) {
        tracing::debug!(intensity, "screen shake");
        lock(&self.stats).shakes += 1;
    }
}

impl AreaManager for HeadlessWorld {
    fn activated(&self) -> bool {
        self.area_active.load(Ordering::Relaxed)
    }
}

impl SceneQuery for HeadlessWorld {
    fn find_entities_by_tag(&self, tag: &str) -> Vec<EntityId> {
        let mut found: Vec<EntityId> = lock(&self.tags)
            .iter()
            .filter(|&(_, &t)| t == tag)
            .map(|(&e, _)| e)
            .collect();
        found.sort();
        found
    }

    fn root_of(&self, entity: EntityId) -> EntityId {
        let parents = lock(&self.parents);
        let mut current = entity;
        while let Some(&parent) = parents.get(&current) {
            current = parent;
        }
        current
    }
}

/// Entity ids for one agent's body and hand.
#[derive(Debug, Clone, Copy)]
pub struct AgentActors {
    pub body: EntityId,
    pub hand: EntityId,
}

/// Where everything in the arena was placed.
#[derive(Debug, Clone, Copy)]
pub struct ArenaLayout {
    pub agents: [AgentActors; 2],
    pub door: EntityId,
    pub door_position: Vec3,
    pub target: Vec3,
}

/// Populate `world` with two agents facing each other and one portal door,
/// and wire every collaborator to it.
pub fn build_arena(world: &Arc<HeadlessWorld>, rules: &RulesConfig) -> (ArenaSetup, ArenaLayout) {
    let spread = rules.spawn_spread;
    let spawn = |x: f32| {
        let body = world.spawn(Vec3::planar(x, 0.0), Some(PLAYER_TAG), None);
        let hand = world.spawn(Vec3::planar(x, 0.0), None, Some(body));
        AgentActors { body, hand }
    };
    let actors = [spawn(-spread), spawn(spread)];

    let door_position = Vec3::planar(0.0, spread);
    let target = Vec3::planar(0.0, -spread);
    let door = world.spawn(door_position, None, None);

    let bindings = |slot: usize| {
        let me = actors[slot];
        let them = actors[1 - slot];
        AgentBindings::new(format!("Player {}", slot + 1), me.body)
            .with_opponent(them.body)
            .with_hand(me.hand)
            .with_egg_prefab(EGG_PREFAB)
            .with_particles(vec![EffectHandle(me.body.0)])
            .with_life_icon(LIFE_ICON)
            .with_services(world)
    };

    let setup = ArenaSetup {
        agents: [bindings(0), bindings(1)],
        gates: vec![
            GateBindings::new("Portal Door", door, Pose::at(door_position))
                .with_target(Pose::at(target))
                .with_portal_prefab(PORTAL_PREFAB)
                .with_services(world),
        ],
        diagnostics: Arc::new(TracingDiagnostics) as Arc<dyn Diagnostics>,
    };
    let layout = ArenaLayout {
        agents: actors,
        door,
        door_position,
        target,
    };
    (setup, layout)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn world() -> Arc<HeadlessWorld> {
        Arc::new(HeadlessWorld::new(ViewportConfig::default()))
    }

    #[test]
    fn camera_centres_origin() {
        let w = world();
        assert_eq!(w.world_to_screen(Vec3::ZERO), (960.0, 540.0));
        assert_eq!(w.world_to_screen(Vec3::planar(1.0, -2.0)), (970.0, 520.0));
    }

    #[test]
    fn hand_roots_to_body() {
        let w = world();
        let (_, layout) = build_arena(&w, &RulesConfig::default());
        let me = layout.agents[0];
        assert_eq!(w.root_of(me.hand), me.body);
        assert_eq!(w.find_entities_by_tag(PLAYER_TAG).len(), 2);
    }

    #[test]
    fn visibility_toggles() {
        let w = world();
        let e = w.spawn(Vec3::ZERO, None, None);
        assert!(w.is_visible(e));
        w.set_visible(e, false);
        assert!(!w.is_visible(e));
        w.set_visible(e, true);
        assert!(w.is_visible(e));
    }

    #[test]
    fn first_game_over_sticks() {
        let w = world();
        w.report_game_over(EntityId(4));
        w.report_game_over(EntityId(5));
        assert_eq!(w.stats().game_over, Some(EntityId(4)));
    }

    #[test]
    fn translate_and_orient_update_body() {
        let w = world();
        let e = w.spawn(Vec3::ZERO, None, None);
        w.translate(e, Vec3::planar(3.0, 0.0));
        w.orient(e, Vec3::planar(3.0, 5.0));
        assert_eq!(w.position(e), Vec3::planar(3.0, 0.0));
        assert_eq!(w.facing(e), Vec3::planar(0.0, 1.0));
    }
}
