use henfight_core::game_trait::{PlayerId, PlayerScore};

use crate::agent::PlayerAgent;

/// End-of-round entry for one agent.
pub fn player_score(player_id: PlayerId, agent: &PlayerAgent) -> PlayerScore {
    PlayerScore {
        player_id,
        lives: agent.lives(),
        eggs_laid: agent.eggs_laid(),
    }
}

/// The player with more lives left wins; ties go to whoever laid fewer eggs.
/// `None` on a full tie.
pub fn winner(scores: &[PlayerScore]) -> Option<PlayerId> {
    let [a, b] = scores else {
        return None;
    };
    match a.lives.cmp(&b.lives).then(b.eggs_laid.cmp(&a.eggs_laid)) {
        std::cmp::Ordering::Greater => Some(a.player_id),
        std::cmp::Ordering::Less => Some(b.player_id),
        std::cmp::Ordering::Equal => None,
    }
}
