use serde::{Deserialize, Serialize};

/// Tuning for a single agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Velocity magnitude cap (units/s).
    pub max_speed: f32,
    /// Below this speed the agent counts as standing still.
    pub min_speed: f32,
    /// Multiplier applied to velocity when integrating a step.
    pub acceleration: f32,
    /// How much of each step is bled off velocity.
    pub drag_factor: f32,
    /// Contact radius used by hosts for hand/body overlap checks.
    pub radius: f32,
    /// Shared rate for swings and confirmed hits.
    pub max_attacks_per_second: f32,
    /// Screen-space margin (pixels) the agent may not walk into.
    pub camera_edge_factor: f32,
    /// Seconds of lost control after being struck.
    pub disabled_controls_time_on_attack: f32,
    pub start_lives: i32,
    /// Seconds the hand visual stays up after a swing.
    pub hand_visible_time: f32,
    /// Probability (0..=1) that being struck shakes the screen.
    pub screen_shake_chance: f32,
    pub screen_shake_intensity: f32,
    pub fade_in: f32,
    pub fade_out: f32,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_speed: 10.0,
            min_speed: 1.0,
            acceleration: 2.0,
            drag_factor: 2.0,
            radius: 4.0,
            max_attacks_per_second: 2.0,
            camera_edge_factor: 10.0,
            disabled_controls_time_on_attack: 0.4,
            start_lives: 3,
            hand_visible_time: 0.4,
            screen_shake_chance: 0.05,
            screen_shake_intensity: 2.0,
            fade_in: 0.6,
            fade_out: 0.6,
        }
    }
}

impl AgentConfig {
    /// Human-readable problems with the values, empty when usable.
    pub fn problems(&self) -> Vec<String> {
        let mut problems = Vec::new();
        if self.max_speed.is_nan() || self.max_speed <= 0.0 {
            problems.push(format!("max_speed must be > 0 (got {})", self.max_speed));
        }
        if self.min_speed < 0.0 {
            problems.push(format!("min_speed must be >= 0 (got {})", self.min_speed));
        }
        if self.max_attacks_per_second.is_nan() || self.max_attacks_per_second <= 0.0 {
            problems.push(format!(
                "max_attacks_per_second must be > 0 (got {})",
                self.max_attacks_per_second
            ));
        }
        if !(0.0..=1.0).contains(&self.screen_shake_chance) {
            problems.push(format!(
                "screen_shake_chance must be within 0..=1 (got {})",
                self.screen_shake_chance
            ));
        }
        if self.start_lives < 0 {
            problems.push(format!("start_lives must be >= 0 (got {})", self.start_lives));
        }
        problems
    }
}

/// Data-driven configuration for the arena game.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ArenaConfig {
    pub agent: AgentConfig,
    /// Fixed simulation rate (Hz).
    pub tick_rate: f32,
    /// Seed for screen-shake rolls. `None` seeds from the OS.
    pub rng_seed: Option<u64>,
    /// Start in the menu phase; the host calls `start_match` to begin.
    pub start_in_menu: bool,
}

impl Default for ArenaConfig {
    fn default() -> Self {
        Self {
            agent: AgentConfig::default(),
            tick_rate: 50.0,
            rng_seed: None,
            start_in_menu: false,
        }
    }
}

impl ArenaConfig {
    /// Problems the arena cannot run with, empty when usable. Agent tuning
    /// issues are checked separately by [`AgentConfig::problems`].
    pub fn problems(&self) -> Vec<String> {
        let mut problems = Vec::new();
        if !self.tick_rate.is_finite() || self.tick_rate <= 0.0 {
            problems.push(format!("tick_rate must be > 0 (got {})", self.tick_rate));
        }
        problems
    }

    /// Validate configuration, exiting on anything fatal and logging
    /// warnings for agent tuning issues.
    pub fn validate(&self) {
        let problems = self.problems();
        for problem in &problems {
            tracing::error!(%problem, "invalid arena configuration");
        }
        if !problems.is_empty() {
            std::process::exit(1);
        }
        for problem in self.agent.problems() {
            tracing::warn!(%problem, "arena agent configuration");
        }
    }

    /// Load config from environment or TOML file, falling back to defaults.
    pub fn load() -> Self {
        if let Ok(path) = std::env::var("HENFIGHT_ARENA_CONFIG")
            && let Some(config) = Self::read(&path)
        {
            return config;
        }
        Self::read("config/arena.toml").unwrap_or_default()
    }

    fn read(path: &str) -> Option<Self> {
        let contents = std::fs::read_to_string(path).ok()?;
        match toml::from_str::<Self>(&contents) {
            Ok(config) => {
                tracing::info!(path, "Loaded arena configuration");
                Some(config)
            },
            Err(e) => {
                tracing::warn!(path, error = %e, "Failed to parse arena config, ignoring");
                None
            },
        }
    }
}
