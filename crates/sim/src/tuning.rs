//! Gameplay tuning. Distances are in tiles unless the name says otherwise and
//! are multiplied by the scene's tile size where they are used.

use std::f32::consts::PI;

use crate::math::{lerp, Vec2, TWO_PI};

/// Linear upgrade curve sampled by upgrade progress (`level / MAX_LEVEL`).
/// Progress past 1.0 extrapolates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Curve {
    pub start: f32,
    pub end: f32,
}

impl Curve {
    pub const fn new(start: f32, end: f32) -> Self {
        Self { start, end }
    }

    pub fn at(self, progress: f32) -> f32 {
        lerp(self.start, self.end, progress)
    }
}

pub const MAX_LEVEL: f32 = 4.0;

pub const CHARACTER_BASE_SPEED: f32 = 4.0;
pub const CHARACTER_MAX_HP: f32 = 10.0;
pub const CHARACTER_MAX_STAMINA: f32 = 10.0;

pub const PLAYER_SPEED: Curve = Curve::new(6.25, 9.375);
pub const PLAYER_MAX_HP: Curve = Curve::new(10.0, 30.0);
pub const PLAYER_MAX_STAMINA: Curve = Curve::new(20.0, 30.0);
pub const PLAYER_HP_REGEN: f32 = 1.0;

pub const ENEMY_HP_REGEN: f32 = 0.5;
pub const ENEMY_COOLDOWN_FACTOR: f32 = 5.0;
pub const ENEMY_REACH_FACTOR: f32 = 1.5;

// Head, body, arms, legs.
pub const CHARACTER_PARTS: [Vec2; 4] = [
    Vec2::new(0.4, 0.4),
    Vec2::new(0.6, 0.8),
    Vec2::new(0.17, 0.57),
    Vec2::new(0.22, 0.44),
];
pub const HEAD_IDX: usize = 0;
pub const BODY_IDX: usize = 1;
pub const ARMS_IDX: usize = 2;
pub const LEGS_IDX: usize = 3;

pub const MIN_DAMAGE: f32 = 0.25;
pub const BASE_DEFENSE: f32 = 1.0;
pub const INVULNERABILITY_SECONDS: f32 = 0.1;
pub const HP_REGEN_DELAY_SECONDS: f32 = 1.0;
pub const STAMINA_REGEN_DELAY_SECONDS: f32 = 2.0;
pub const STAMINA_REGEN_PER_SECOND: f32 = 2.0;

pub const KNOCKBACK_SECONDS: f32 = 0.25;
pub const KNOCKBACK_DIRECTION_SCALE: f32 = 1.25;
pub const KNOCKBACK_FORCE: Curve = Curve::new(4.0, 2.0);
pub const KNOCKBACK_LEVEL_SPAN: f32 = 13.0;

pub const ROLL_COOLDOWN_SECONDS: f32 = 0.125;
pub const ROLL_STAMINA_COST: f32 = 5.0;
pub const ROLL_SPEED_FACTOR: f32 = 2.0;
pub const ROLL_ANGULAR_SPEED: f32 = TWO_PI * 2.0;

pub const BLOCK_MIN_SECONDS: f32 = 0.25;
pub const SHOOTING_SPEED_FACTOR: f32 = 0.5;
pub const SHOOT_COOLDOWN_REFUND: f32 = 0.25;

pub const DYING_SECONDS: f32 = 1.0;
pub const DYING_START_OPACITY: f32 = 0.5;

pub const SWORD_SIZE: Vec2 = Vec2::new(0.17, 1.25);
pub const SWORD_COOLDOWN: f32 = 0.125;
pub const SWORD_ATTACK_SECONDS: f32 = 0.35;
pub const SWORD_DAMAGE: Curve = Curve::new(3.0, 9.0);
pub const SWORD_SIZE_FACTOR: Curve = Curve::new(1.0, 2.0);
pub const SWORD_ARC: Curve = Curve::new(PI, PI * 2.0);

pub const BOW_SIZE: Vec2 = Vec2::new(0.13, 0.88);
pub const BOW_REACH: f32 = 6.25;
pub const BOW_DAMAGE: Curve = Curve::new(2.0, 6.0);
pub const BOW_COOLDOWN: Curve = Curve::new(0.75, 0.5);
pub const BOW_PROJECTILE_SPEED: Curve = Curve::new(20.0, 35.0);

pub const SHIELD_SIZE: Vec2 = Vec2::new(0.6, 1.3);
pub const SHIELD_COOLDOWN: f32 = 2.0;
pub const SHIELD_SPEED_FACTOR: Curve = Curve::new(0.3, 0.75);
pub const SHIELD_DEFENSE_FACTOR: Curve = Curve::new(1.0, MAX_LEVEL);

pub const PROJECTILE_SIZE: Vec2 = Vec2::new(0.8, 0.06);
pub const PROJECTILE_MAX_ATTACHMENT_SECONDS: f32 = 2.0;
pub const PROJECTILE_FADE_PER_SECOND: f32 = 4.0;

pub const INDICATOR_SECONDS: f32 = 1.0;
pub const INDICATOR_SPEED_PX: f32 = 20.0;

pub const BOSS_HP_FACTOR: f32 = 1.125;
pub const BOSS_ARCHER_COOLDOWN_FACTOR: f32 = 0.5;
pub const BOSS_ARCHER_PROJECTILE_FACTOR: f32 = 1.5;
pub const BOSS_MELEE_SPEED_BONUS: f32 = 0.25;
pub const WAVE_ENEMY_STAT_FACTOR: f32 = 0.75;
/// Wave enemies from this level on may roll and hunt the player.
pub const WAVE_VETERAN_LEVEL: u32 = 5;
/// Spawn band below the top wall, in tiles.
pub const WAVE_SPAWN_TOP: u32 = 2;
pub const WAVE_SPAWN_ROWS: u32 = 6;
/// Every n-th level upgrades the player instead of a weapon.
pub const PLAYER_LEVEL_UP_EVERY: u32 = 4;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn curve_extrapolates_past_max_level() {
        assert_eq!(PLAYER_MAX_HP.at(0.0), 10.0);
        assert_eq!(PLAYER_MAX_HP.at(1.0), 30.0);
        assert_eq!(PLAYER_MAX_HP.at(1.5), 40.0);
    }
}
