use serde::Deserialize;

/// Top-level host configuration, loaded from `henfight.toml`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HostConfig {
    /// Pace ticks against the wall clock. When false the match runs as fast
    /// as the loop can go.
    pub realtime: bool,
    /// Hard stop for a match that never finishes.
    pub max_ticks: u64,
    pub viewport: ViewportConfig,
    pub rules: RulesConfig,
    pub bots: BotConfig,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            realtime: true,
            max_ticks: 50 * 60 * 5,
            viewport: ViewportConfig::default(),
            rules: RulesConfig::default(),
            bots: BotConfig::default(),
        }
    }
}

/// Top-down camera used to project the world onto the screen.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ViewportConfig {
    pub width: f32,
    pub height: f32,
    pub pixels_per_unit: f32,
}

impl Default for ViewportConfig {
    fn default() -> Self {
        Self {
            width: 1920.0,
            height: 1080.0,
            pixels_per_unit: 10.0,
        }
    }
}

/// House rules the headless host applies on top of the arena.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RulesConfig {
    /// Every this many eggs laid costs the layer a life.
    pub eggs_per_life: u32,
    /// Seconds into the match before the portal door opens.
    pub door_opens_after_secs: f32,
    /// Distance from the door at which a player counts as touching it.
    pub door_radius: f32,
    /// Half the distance between the two spawn points.
    pub spawn_spread: f32,
}

impl Default for RulesConfig {
    fn default() -> Self {
        Self {
            eggs_per_life: 3,
            door_opens_after_secs: 20.0,
            door_radius: 3.0,
            spawn_spread: 20.0,
        }
    }
}

/// Scripted bot behaviour.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BotConfig {
    /// Seed for bot decisions. `None` seeds from the OS.
    pub seed: Option<u64>,
    /// Chance per tick to swing while the opponent is in range.
    pub attack_chance: f32,
    /// Distance at which a bot starts swinging.
    pub attack_range: f32,
    /// Random sideways drift added to each step.
    pub wander: f32,
    /// Magnitude of the movement intent sent each tick.
    pub push: f32,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            seed: None,
            attack_chance: 0.2,
            attack_range: 8.0,
            wander: 0.3,
            push: 1.0,
        }
    }
}

impl HostConfig {
    /// Human-readable problems with the values, empty when usable.
    pub fn problems(&self) -> Vec<String> {
        let mut problems = Vec::new();
        if self.max_ticks == 0 {
            problems.push("max_ticks must be > 0".to_string());
        }
        if self.viewport.width <= 0.0 || self.viewport.height <= 0.0 {
            problems.push("viewport width and height must be > 0".to_string());
        }
        if self.viewport.pixels_per_unit <= 0.0 {
            problems.push("viewport.pixels_per_unit must be > 0".to_string());
        }
        if self.rules.eggs_per_life == 0 {
            problems.push("rules.eggs_per_life must be > 0".to_string());
        }
        if !(0.0..=1.0).contains(&self.bots.attack_chance) {
            problems.push("bots.attack_chance must be within 0..=1".to_string());
        }
        problems
    }

    /// Validate configuration, exiting on anything the host cannot run with.
    pub fn validate(&self) {
        let problems = self.problems();
        for problem in &problems {
            tracing::error!(%problem, "invalid host configuration");
        }
        if !problems.is_empty() {
            std::process::exit(1);
        }

        let half_width = self.viewport.width / 2.0 / self.viewport.pixels_per_unit;
        if self.rules.spawn_spread >= half_width {
            tracing::warn!(
                spawn_spread = self.rules.spawn_spread,
                half_width,
                "spawn points are off screen, agents will not be able to move"
            );
        }
    }

    /// Load config from `henfight.toml` if it exists, then apply env var overrides.
    pub fn load() -> Self {
        let mut config = match std::fs::read_to_string("henfight.toml") {
            Ok(content) => match toml::from_str::<HostConfig>(&content) {
                Ok(cfg) => {
                    tracing::info!("Loaded configuration from henfight.toml");
                    cfg
                },
                Err(e) => {
                    tracing::warn!("Failed to parse henfight.toml: {e}, using defaults");
                    HostConfig::default()
                },
            },
            Err(_) => {
                tracing::info!("No henfight.toml found, using defaults");
                HostConfig::default()
            },
        };

        if let Ok(val) = std::env::var("HENFIGHT_REALTIME")
            && let Ok(b) = val.parse::<bool>()
        {
            config.realtime = b;
        }
        if let Ok(val) = std::env::var("HENFIGHT_MAX_TICKS")
            && let Ok(n) = val.parse::<u64>()
        {
            config.max_ticks = n;
        }
        if let Ok(val) = std::env::var("HENFIGHT_BOT_SEED")
            && let Ok(n) = val.parse::<u64>()
        {
            config.bots.seed = Some(n);
        }
        if let Ok(val) = std::env::var("HENFIGHT_EGGS_PER_LIFE")
            && let Ok(n) = val.parse::<u32>()
        {
            config.rules.eggs_per_life = n;
        }

        config
    }
}
