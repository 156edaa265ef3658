use std::sync::Arc;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use henfight_core::diagnostics::Diagnostics;
use henfight_core::error::{ActionOutcome, CoreError};
use henfight_core::math::Vec3;
use henfight_core::schedule::{Scheduler, TaskHandle};
use henfight_core::services::{
    AnimationService, AreaManager, AssetId, AudioService, ClipSet, EffectHandle, EffectService,
    EggSpawn, EntityId, HIT_TRIGGER, MatchController, PhysicsService, PrefabId, ScreenShaker,
    WALKING_FLAG,
};
use henfight_core::time::{Cooldown, SimTime};

use crate::config::AgentConfig;
use crate::gate::Teleportable;

/// Everything an agent talks to, handed over at construction.
///
/// Any of these may be absent. [`PlayerAgent::new`] reports each missing
/// one and the agent then skips whatever needed it.
#[derive(Clone)]
pub struct AgentBindings {
    pub name: String,
    pub entity: EntityId,
    pub opponent: Option<EntityId>,
    pub hand: Option<EntityId>,
    pub egg_prefab: Option<PrefabId>,
    pub particles: Vec<EffectHandle>,
    pub life_icon: Option<AssetId>,
    pub physics: Option<Arc<dyn PhysicsService>>,
    pub audio: Option<Arc<dyn AudioService>>,
    pub animator: Option<Arc<dyn AnimationService>>,
    pub effects: Option<Arc<dyn EffectService>>,
    pub match_controller: Option<Arc<dyn MatchController>>,
    pub screen_shaker: Option<Arc<dyn ScreenShaker>>,
    pub area: Option<Arc<dyn AreaManager>>,
}

impl AgentBindings {
    pub fn new(name: impl Into<String>, entity: EntityId) -> Self {
        Self {
            name: name.into(),
            entity,
            opponent: None,
            hand: None,
            egg_prefab: None,
            particles: Vec::new(),
            life_icon: None,
            physics: None,
            audio: None,
            animator: None,
            effects: None,
            match_controller: None,
            screen_shaker: None,
            area: None,
        }
    }

    pub fn with_opponent(mut self, opponent: EntityId) -> Self {
        self.opponent = Some(opponent);
        self
    }

    pub fn with_hand(mut self, hand: EntityId) -> Self {
        self.hand = Some(hand);
        self
    }

    pub fn with_egg_prefab(mut self, prefab: PrefabId) -> Self {
        self.egg_prefab = Some(prefab);
        self
    }

    pub fn with_particles(mut self, particles: Vec<EffectHandle>) -> Self {
        self.particles = particles;
        self
    }

    pub fn with_life_icon(mut self, icon: AssetId) -> Self {
        self.life_icon = Some(icon);
        self
    }

    /// Bind every service slot to one host object.
    pub fn with_services<H>(mut self, host: &Arc<H>) -> Self
    where
        H: PhysicsService
            + AudioService
            + AnimationService
            + EffectService
            + MatchController
            + ScreenShaker
            + AreaManager
            + 'static,
    {
        self.physics = Some(Arc::clone(host) as Arc<dyn PhysicsService>);
        self.audio = Some(Arc::clone(host) as Arc<dyn AudioService>);
        self.animator = Some(Arc::clone(host) as Arc<dyn AnimationService>);
        self.effects = Some(Arc::clone(host) as Arc<dyn EffectService>);
        self.match_controller = Some(Arc::clone(host) as Arc<dyn MatchController>);
        self.screen_shaker = Some(Arc::clone(host) as Arc<dyn ScreenShaker>);
        self.area = Some(Arc::clone(host) as Arc<dyn AreaManager>);
        self
    }

    /// One entry per missing binding.
    pub fn missing(&self) -> Vec<CoreError> {
        let owner = self.name.as_str();
        let mut missing = Vec::new();
        if self.egg_prefab.is_none() {
            missing.push(CoreError::missing(owner, "egg prefab"));
        }
        if self.opponent.is_none() {
            missing.push(CoreError::missing(owner, "opponent reference"));
        }
        if self.hand.is_none() {
            missing.push(CoreError::missing(owner, "hand visual"));
        }
        if self.animator.is_none() {
            missing.push(CoreError::missing(owner, "animator"));
        }
        if self.particles.is_empty() {
            missing.push(CoreError::missing_optional(owner, "particle effects"));
        }
        if self.match_controller.is_none() {
            missing.push(CoreError::missing(owner, "match controller"));
        }
        if self.physics.is_none() {
            missing.push(CoreError::missing(owner, "camera/physics service"));
        }
        if self.effects.is_none() {
            missing.push(CoreError::missing(owner, "effect service"));
        }
        if self.audio.is_none() {
            missing.push(CoreError::missing_optional(owner, "audio service"));
        }
        if self.screen_shaker.is_none() {
            missing.push(CoreError::missing_optional(owner, "screen shaker"));
        }
        if self.life_icon.is_none() {
            missing.push(CoreError::missing(owner, "life icon"));
        }
        if self.area.is_none() {
            missing.push(CoreError::missing(owner, "area manager"));
        }
        missing
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AgentTask {
    HideHand,
}

/// Serializable view of an agent for state snapshots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentSnapshot {
    pub velocity: Vec3,
    pub lives: i32,
    pub controls_disabled: bool,
    pub walking: bool,
    pub eggs_laid: u32,
}

/// A player-controlled chicken: movement intent, swing/hit cooldowns,
/// lives, and the short stagger after being struck.
pub struct PlayerAgent {
    config: AgentConfig,
    bindings: AgentBindings,
    diagnostics: Arc<dyn Diagnostics>,
    velocity: Vec3,
    lives: i32,
    controls_disabled: bool,
    disabled_since: Option<SimTime>,
    attack_cooldown: Cooldown,
    hit_cooldown: Cooldown,
    walking: bool,
    eggs_laid: u32,
    hand_hide: Option<TaskHandle>,
    tasks: Scheduler<AgentTask>,
    rng: StdRng,
}

impl PlayerAgent {
    /// Build an agent and report every missing binding to `diagnostics`.
    pub fn new(
        config: AgentConfig,
        bindings: AgentBindings,
        diagnostics: Arc<dyn Diagnostics>,
    ) -> Self {
        for problem in config.problems() {
            diagnostics.report(&CoreError::invalid(bindings.name.as_str(), problem));
        }
        for missing in bindings.missing() {
            diagnostics.report(&missing);
        }

        if let (Some(hand), Some(effects)) = (bindings.hand, bindings.effects.as_ref()) {
            effects.set_visible(hand, false);
        }

        tracing::info!(agent = %bindings.name, entity = bindings.entity.0, "agent ready");

        Self {
            lives: config.start_lives,
            attack_cooldown: Cooldown::per_second(config.max_attacks_per_second),
            hit_cooldown: Cooldown::per_second(config.max_attacks_per_second),
            config,
            bindings,
            diagnostics,
            velocity: Vec3::ZERO,
            controls_disabled: false,
            disabled_since: None,
            walking: false,
            eggs_laid: 0,
            hand_hide: None,
            tasks: Scheduler::new(),
            rng: StdRng::from_os_rng(),
        }
    }

    /// Make screen-shake rolls reproducible.
    pub fn with_rng_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    pub fn name(&self) -> &str {
        &self.bindings.name
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    pub fn velocity(&self) -> Vec3 {
        self.velocity
    }

    pub fn lives(&self) -> i32 {
        self.lives
    }

    pub fn controls_disabled(&self) -> bool {
        self.controls_disabled
    }

    /// Earliest time at which a frame tick will hand control back.
    pub fn controls_reenable_at(&self) -> Option<SimTime> {
        if !self.controls_disabled {
            return None;
        }
        self.disabled_since
            .map(|since| since + self.config.disabled_controls_time_on_attack)
    }

    pub fn is_walking(&self) -> bool {
        self.walking
    }

    pub fn is_eliminated(&self) -> bool {
        self.lives < 0
    }

    pub fn eggs_laid(&self) -> u32 {
        self.eggs_laid
    }

    pub fn last_attack(&self) -> Option<SimTime> {
        self.attack_cooldown.last()
    }

    pub fn last_hit(&self) -> Option<SimTime> {
        self.hit_cooldown.last()
    }

    pub fn pending_tasks(&self) -> usize {
        self.tasks.len()
    }

    /// Lives should only be drawn once the area is active and an icon exists.
    pub fn hud_visible(&self) -> bool {
        self.bindings.life_icon.is_some() && self.bindings.area.as_ref().is_some_and(|a| a.activated())
    }

    pub fn snapshot(&self) -> AgentSnapshot {
        AgentSnapshot {
            velocity: self.velocity,
            lives: self.lives,
            controls_disabled: self.controls_disabled,
            walking: self.walking,
            eggs_laid: self.eggs_laid,
        }
    }

    fn moving(&self) -> bool {
        self.velocity.length_squared() > self.config.min_speed * self.config.min_speed
    }

    fn play(&self, clips: ClipSet) {
        if let Some(audio) = &self.bindings.audio {
            audio.play_random(clips);
        }
    }

    /// Accumulate movement intent on the ground plane.
    pub fn move_by(&mut self, dx: f32, dz: f32) {
        if self.controls_disabled {
            return;
        }
        let dx = if dx.is_finite() { dx } else { 0.0 };
        let dz = if dz.is_finite() { dz } else { 0.0 };

        self.velocity += Vec3::planar(dx, dz);
        self.velocity = self.velocity.clamp_length(self.config.max_speed);
    }

    /// Fixed-rate movement. Returns whether a translation was requested.
    ///
    /// A step whose destination projects into the screen-edge band is
    /// dropped whole: velocity and position stay untouched for this tick.
    /// So is a step with a non-positive or non-finite `dt`, or one the
    /// camera cannot project.
    pub fn tick_physics(&mut self, dt: f32) -> bool {
        if !(dt.is_finite() && dt > 0.0) || !self.moving() {
            return false;
        }
        let Some(physics) = self.bindings.physics.as_ref() else {
            return false;
        };
        let entity = self.bindings.entity;

        let position = physics.position(entity);
        let step = self.velocity * self.config.acceleration * dt;
        let destination = position + step;

        let (sx, sy) = physics.world_to_screen(destination);
        let (width, height) = physics.viewport_size();
        let edge = self.config.camera_edge_factor;
        if !sx.is_finite()
            || !sy.is_finite()
            || sx < edge
            || sx > width - edge
            || sy < edge
            || sy > height - edge
        {
            tracing::trace!(agent = %self.bindings.name, sx, sy, "step blocked at screen edge");
            return false;
        }

        // Drag is proportional to the step taken, not to elapsed time.
        self.velocity -= step * self.config.drag_factor;
        physics.translate(entity, step);
        physics.orient(entity, destination);
        true
    }

    /// Frame-rate bookkeeping: walking flag, stagger expiry, delayed tasks.
    pub fn tick_animation_state(&mut self, now: SimTime) {
        self.walking = self.moving();
        if let Some(animator) = &self.bindings.animator {
            animator.set_flag(self.bindings.entity, WALKING_FLAG, self.walking);
        }

        if self.controls_disabled
            && self
                .disabled_since
                .is_none_or(|since| now - since > self.config.disabled_controls_time_on_attack)
        {
            self.controls_disabled = false;
        }

        for task in self.tasks.drain_due(now) {
            match task {
                AgentTask::HideHand => {
                    self.hand_hide = None;
                    self.set_hand_visible(false);
                },
            }
        }
    }

    fn set_hand_visible(&self, visible: bool) {
        if let (Some(hand), Some(effects)) = (self.bindings.hand, self.bindings.effects.as_ref()) {
            effects.set_visible(hand, visible);
        }
    }

    /// Swing. A swing on its own always misses; landing it is reported
    /// separately by the host through [`PlayerAgent::hit`].
    pub fn attack(&mut self, now: SimTime) -> ActionOutcome {
        if !self.attack_cooldown.try_trigger(now) {
            return ActionOutcome::RateLimited;
        }

        self.set_hand_visible(true);
        if let Some(previous) = self.hand_hide.take() {
            self.tasks.cancel(previous);
        }
        self.hand_hide = Some(
            self.tasks
                .schedule_at(now + self.config.hand_visible_time, AgentTask::HideHand),
        );

        self.play(ClipSet::Miss);
        ActionOutcome::Performed
    }

    /// Confirmed contact with the opponent. Rate limited on its own clock,
    /// independent of [`PlayerAgent::attack`].
    pub fn hit(&mut self, opponent: &mut PlayerAgent, now: SimTime) -> ActionOutcome {
        if !self.hit_cooldown.try_trigger(now) {
            return ActionOutcome::RateLimited;
        }

        let (own_position, opponent_position) = match &self.bindings.physics {
            Some(physics) => (
                physics.position(self.bindings.entity),
                physics.position(opponent.bindings.entity),
            ),
            None => {
                self.diagnostics.report(&CoreError::invalid(
                    self.bindings.name.as_str(),
                    "hit without a physics service, egg placed at the origin",
                ));
                (Vec3::ZERO, Vec3::ZERO)
            },
        };
        let direction = (opponent_position - own_position).normalize_or_zero();

        opponent.make_egg(opponent_position, direction, now);
        self.play(ClipSet::Impact);
        ActionOutcome::Performed
    }

    /// React to being struck: drop an egg, face the attacker, and lose
    /// control for a moment.
    pub fn make_egg(&mut self, position: Vec3, direction: Vec3, now: SimTime) {
        self.play(ClipSet::Scream);
        let entity = self.bindings.entity;

        if let (Some(effects), Some(prefab)) = (&self.bindings.effects, self.bindings.egg_prefab) {
            let rotation = self
                .bindings
                .physics
                .as_ref()
                .map_or(Vec3::FORWARD, |p| p.facing(entity));
            effects.spawn_egg(EggSpawn {
                prefab,
                position,
                rotation,
                direction,
                owner: entity,
            });
        }

        if let (Some(physics), Some(opponent)) = (&self.bindings.physics, self.bindings.opponent) {
            physics.orient(entity, physics.position(opponent));
        }

        self.velocity = Vec3::ZERO;
        self.controls_disabled = true;
        self.disabled_since = Some(now);
        self.eggs_laid += 1;

        if let Some(animator) = &self.bindings.animator {
            animator.trigger(entity, HIT_TRIGGER);
        }

        if let Some(effects) = &self.bindings.effects {
            for &particle in &self.bindings.particles {
                effects.play_once(particle);
            }
        }

        if let Some(shaker) = &self.bindings.screen_shaker
            && self.rng.random::<f32>() < self.config.screen_shake_chance
        {
            shaker.shake(self.config.screen_shake_intensity);
        }

        tracing::debug!(agent = %self.bindings.name, eggs = self.eggs_laid, "egg laid");
    }

    /// Set the life count.
    ///
    /// Lowering it plays a life-lost clip. Dropping below zero (floored at
    /// -1) reports game over to the match controller once per crossing.
    pub fn set_lives(&mut self, value: i32) {
        let previous = self.lives;
        let value = value.max(-1);

        if value < previous {
            self.play(ClipSet::LifeLost);
        }
        self.lives = value;

        if value < 0
            && previous >= 0
            && let Some(controller) = &self.bindings.match_controller
        {
            controller.report_game_over(self.bindings.entity);
        }

        tracing::info!(agent = %self.bindings.name, lives = self.lives, "lives left");
    }

    pub fn lose_life(&mut self) {
        self.set_lives(self.lives - 1);
    }

    pub fn fade_to_black(&self) {
        if let Some(controller) = &self.bindings.match_controller {
            controller.fade_to_black(self.config.fade_in, self.config.fade_out);
        }
    }

    /// Back to round-start state. Pending delayed effects are dropped.
    pub fn reset(&mut self) {
        self.tasks.clear();
        if self.hand_hide.take().is_some() {
            self.set_hand_visible(false);
        }
        self.velocity = Vec3::ZERO;
        self.lives = self.config.start_lives;
        self.controls_disabled = false;
        self.disabled_since = None;
        self.attack_cooldown.reset();
        self.hit_cooldown.reset();
        self.walking = false;
        self.eggs_laid = 0;
    }
}

impl Teleportable for PlayerAgent {
    fn entity(&self) -> EntityId {
        self.bindings.entity
    }

    fn fade_to_black(&self) {
        PlayerAgent::fade_to_black(self);
    }
}
