use serde::{Deserialize, Serialize};

/// Gameplay-driven status effect tags carried alongside the multipliers so
/// observers can tell *why* a player is slowed or rooted.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum EffectKind {
    Hasted,
    Slowed,
    Rooted,
    Stunned,
    LowGravity,
}

// StatusEffects is produced by gameplay systems and consumed read-only by
// the movement simulator; it travels inside each PlayerState so both roles
// simulate with the same multipliers.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StatusEffects {
    pub speed_multiplier: f64,
    pub jump_multiplier: f64,
    pub gravity_multiplier: f64,
    pub can_move: bool,
    pub can_jump: bool,
    pub active: Vec<EffectKind>,
}

impl Default for StatusEffects {
    fn default() -> Self {
        StatusEffects {
            speed_multiplier: 1.0,
            jump_multiplier: 1.0,
            gravity_multiplier: 1.0,
            can_move: true,
            can_jump: true,
            active: Vec::new(),
        }
    }
}
