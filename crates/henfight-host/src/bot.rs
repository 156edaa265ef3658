use rand::Rng;

use henfight_arena::ArenaInput;
use henfight_core::math::Vec3;

use crate::config::BotConfig;

/// Generate one tick of input for a bot at `own` chasing an opponent at
/// `target`. Stands still while staggered.
pub fn generate_bot_input(
    own: Vec3,
    target: Vec3,
    controls_disabled: bool,
    config: &BotConfig,
    rng: &mut impl Rng,
) -> ArenaInput {
    if controls_disabled {
        return ArenaInput::default();
    }

    let to_target = Vec3::planar(target.x - own.x, target.z - own.z);
    let distance = to_target.length();
    let heading = to_target.normalize_or_zero();

    // Sideways drift so two bots do not meet exactly head-on every time.
    let side = Vec3::planar(-heading.z, heading.x);
    let drift = if config.wander > 0.0 {
        rng.random_range(-config.wander..=config.wander)
    } else {
        0.0
    };
    let step = (heading + side * drift) * config.push;

    let attack = distance <= config.attack_range && rng.random::<f32>() < config.attack_chance;

    ArenaInput {
        move_x: step.x,
        move_z: step.z,
        attack,
    }
}
