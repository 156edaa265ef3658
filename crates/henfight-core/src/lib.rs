pub mod diagnostics;
pub mod error;
pub mod game_trait;
pub mod math;
pub mod player;
pub mod schedule;
pub mod services;
pub mod time;

#[cfg(any(test, feature = "test-helpers"))]
pub mod test_helpers {
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

    use crate::diagnostics::Diagnostics;
    use crate::error::CoreError;
    use crate::game_trait::{GameEvent, HenfightGame, PlayerId};
    use crate::math::{Pose, Vec3};
    use crate::player::Player;
    use crate::services::{
        AnimationService, AreaManager, AudioService, ClipSet, EffectHandle, EffectService,
        EggSpawn, EntityId, MatchController, PhysicsService, PrefabId, SceneQuery, ScreenShaker,
    };

    /// Create `n` test players with sequential IDs starting at 1.
    pub fn make_players(n: usize) -> Vec<Player> {
        (0..n)
            .map(|i| Player::new(i as PlayerId + 1, format!("Player{}", i + 1)))
            .collect()
    }

    /// Run N fixed+frame steps, returning all accumulated events.
    pub fn run_game_ticks(game: &mut dyn HenfightGame, n: usize, dt: f32) -> Vec<GameEvent> {
        let mut all_events = Vec::new();
        for _ in 0..n {
            all_events.extend(game.fixed_update(dt));
            all_events.extend(game.frame_update());
        }
        all_events
    }

    /// Everything the simulation asked of its collaborators, in call order.
    #[derive(Debug, Clone, PartialEq)]
    pub enum Call {
        Translate { entity: EntityId, delta: Vec3 },
        Orient { entity: EntityId, toward: Vec3 },
        SetPosition { entity: EntityId, position: Vec3 },
        Sound(ClipSet),
        SetFlag { entity: EntityId, name: String, value: bool },
        Trigger { entity: EntityId, name: String },
        PlayOnce(EffectHandle),
        SpawnEffect { prefab: PrefabId, pose: Pose },
        SpawnEgg(EggSpawn),
        SetVisible { entity: EntityId, visible: bool },
        GameOver(EntityId),
        FadeToBlack { fade_in: f32, fade_out: f32 },
        Shake(f32),
        Report(CoreError),
    }

    /// In-memory host implementing every collaborator trait and recording
    /// the calls it receives.
    ///
    /// The camera looks straight down: world `(x, z)` maps to screen
    /// `(x * ppu + w/2, z * ppu + h/2)`.
    pub struct RecordingHost {
        calls: Mutex<Vec<Call>>,
        positions: Mutex<HashMap<EntityId, Vec3>>,
        facings: Mutex<HashMap<EntityId, Vec3>>,
        tags: Mutex<HashMap<EntityId, String>>,
        parents: Mutex<HashMap<EntityId, EntityId>>,
        viewport: (f32, f32),
        pixels_per_unit: f32,
        area_active: AtomicBool,
        next_spawn: AtomicU64,
    }

    impl Default for RecordingHost {
        fn default() -> Self {
            Self::new(1920.0, 1080.0, 10.0)
        }
    }

    impl RecordingHost {
        pub fn new(width: f32, height: f32, pixels_per_unit: f32) -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
                positions: Mutex::new(HashMap::new()),
                facings: Mutex::new(HashMap::new()),
                tags: Mutex::new(HashMap::new()),
                parents: Mutex::new(HashMap::new()),
                viewport: (width, height),
                pixels_per_unit,
                area_active: AtomicBool::new(true),
                next_spawn: AtomicU64::new(10_000),
            }
        }

        pub fn place(&self, entity: EntityId, position: Vec3) {
            self.positions.lock().unwrap().insert(entity, position);
        }

        pub fn tag(&self, entity: EntityId, tag: &str) {
            self.tags.lock().unwrap().insert(entity, tag.to_string());
        }

        pub fn parent(&self, child: EntityId, parent: EntityId) {
            self.parents.lock().unwrap().insert(child, parent);
        }

        pub fn set_area_active(&self, active: bool) {
            self.area_active.store(active, Ordering::SeqCst);
        }

        pub fn calls(&self) -> Vec<Call> {
            self.calls.lock().unwrap().clone()
        }

        pub fn clear_calls(&self) {
            self.calls.lock().unwrap().clear();
        }

        pub fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
            self.calls.lock().unwrap().iter().filter(|c| pred(c)).count()
        }

        pub fn sounds(&self) -> Vec<ClipSet> {
            self.calls
                .lock()
                .unwrap()
                .iter()
                .filter_map(|c| match c {
                    Call::Sound(set) => Some(*set),
                    _ => None,
                })
                .collect()
        }

        pub fn reports(&self) -> Vec<CoreError> {
            self.calls
                .lock()
                .unwrap()
                .iter()
                .filter_map(|c| match c {
                    Call::Report(e) => Some(e.clone()),
                    _ => None,
                })
                .collect()
        }

        fn record(&self, call: Call) {
            self.calls.lock().unwrap().push(call);
        }
    }

    impl PhysicsService for RecordingHost {
        fn position(&self, entity: EntityId) -> Vec3 {
            self.positions
                .lock()
                .unwrap()
                .get(&entity)
                .copied()
                .unwrap_or_default()
        }

        fn facing(&self, entity: EntityId) -> Vec3 {
            self.facings
                .lock()
                .unwrap()
                .get(&entity)
                .copied()
                .unwrap_or(Vec3::FORWARD)
        }

        fn translate(&self, entity: EntityId, delta: Vec3) {
            *self.positions.lock().unwrap().entry(entity).or_default() += delta;
            self.record(Call::Translate { entity, delta });
        }

        fn orient(&self, entity: EntityId, toward: Vec3) {
            let facing = (toward - self.position(entity)).normalize_or_zero();
            if facing != Vec3::ZERO {
                self.facings.lock().unwrap().insert(entity, facing);
            }
            self.record(Call::Orient { entity, toward });
        }

        fn set_position(&self, entity: EntityId, position: Vec3) {
            self.place(entity, position);
            self.record(Call::SetPosition { entity, position });
        }

        fn world_to_screen(&self, point: Vec3) -> (f32, f32) {
            let (w, h) = self.viewport;
            (
                point.x * self.pixels_per_unit + w / 2.0,
                point.z * self.pixels_per_unit + h / 2.0,
            )
        }

        fn viewport_size(&self) -> (f32, f32) {
            self.viewport
        }
    }

    impl AudioService for RecordingHost {
        fn play_random(&self, clips: ClipSet) {
            self.record(Call::Sound(clips));
        }
    }

    impl AnimationService for RecordingHost {
        fn set_flag(&self, entity: EntityId, name: &str, value: bool) {
            self.record(Call::SetFlag {
                entity,
                name: name.to_string(),
                value,
            });
        }

        fn trigger(&self, entity: EntityId, name: &str) {
            self.record(Call::Trigger {
                entity,
                name: name.to_string(),
            });
        }
    }

    impl EffectService for RecordingHost {
        fn play_once(&self, effect: EffectHandle) {
            self.record(Call::PlayOnce(effect));
        }

        fn spawn_effect(&self, prefab: PrefabId, pose: Pose) -> Option<EntityId> {
            self.record(Call::SpawnEffect { prefab, pose });
            Some(EntityId(self.next_spawn.fetch_add(1, Ordering::SeqCst)))
        }

        fn spawn_egg(&self, egg: EggSpawn) -> Option<EntityId> {
            self.record(Call::SpawnEgg(egg));
            Some(EntityId(self.next_spawn.fetch_add(1, Ordering::SeqCst)))
        }

        fn set_visible(&self, entity: EntityId, visible: bool) {
            self.record(Call::SetVisible { entity, visible });
        }
    }

    impl MatchController for RecordingHost {
        fn report_game_over(&self, loser: EntityId) {
            self.record(Call::GameOver(loser));
        }

        fn fade_to_black(&self, fade_in: f32, fade_out: f32) {
            self.record(Call::FadeToBlack { fade_in, fade_out });
        }
    }

    impl ScreenShaker for RecordingHost {
        fn shake(&self, intensity: f32) {
            self.record(Call::Shake(intensity));
        }
    }

    impl AreaManager for RecordingHost {
        fn activated(&self) -> bool {
            self.area_active.load(Ordering::SeqCst)
        }
    }

    impl SceneQuery for RecordingHost {
        fn find_entities_by_tag(&self, tag: &str) -> Vec<EntityId> {
            let mut found: Vec<EntityId> = self
                .tags
                .lock()
                .unwrap()
                .iter()
                .filter(|(_, t)| t.as_str() == tag)
                .map(|(&e, _)| e)
                .collect();
            found.sort();
            found
        }

        fn root_of(&self, entity: EntityId) -> EntityId {
            let parents = self.parents.lock().unwrap();
            let mut current = entity;
            while let Some(&parent) = parents.get(&current) {
                current = parent;
            }
            current
        }
    }

    impl Diagnostics for RecordingHost {
        fn report(&self, error: &CoreError) {
            self.record(Call::Report(error.clone()));
        }
    }
}
