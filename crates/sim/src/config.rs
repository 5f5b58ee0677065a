use serde::{Deserialize, Serialize};

use crate::math::Vec2;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    pub map: MapConfig,
    pub progression: ProgressionConfig,
    /// Fixed RNG seed. Without one every session is seeded from entropy.
    pub seed: Option<u64>,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            map: MapConfig::default(),
            progression: ProgressionConfig::default(),
            seed: None,
        }
    }
}

impl SimConfig {
    pub fn seeded(seed: u64) -> Self {
        Self {
            seed: Some(seed),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapConfig {
    pub tiles_x: u32,
    pub tiles_y: u32,
    pub tile_size: f32,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            tiles_x: 32,
            tiles_y: 18,
            tile_size: 32.0,
        }
    }
}

impl MapConfig {
    pub fn tiles(&self) -> Vec2 {
        Vec2::new(self.tiles_x as f32, self.tiles_y as f32)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnemyCountStep {
    pub below_level: u32,
    pub count: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProgressionConfig {
    /// Level whose clearance wins the game.
    pub final_round: u32,
    /// Every `boss_every`-th level ends with a mini-boss.
    pub boss_every: u32,
    pub enemy_count_steps: Vec<EnemyCountStep>,
    pub max_enemy_count: u32,
    /// Chance that an enemy level-up goes to its weapon instead of its stats.
    pub weapon_upgrade_chance: f32,
    /// Seconds between the player's death and the PlayerDead state.
    pub player_death_grace: f32,
}

impl Default for ProgressionConfig {
    fn default() -> Self {
        Self {
            final_round: 13,
            boss_every: 4,
            enemy_count_steps: vec![
                EnemyCountStep {
                    below_level: 4,
                    count: 2,
                },
                EnemyCountStep {
                    below_level: 10,
                    count: 3,
                },
                EnemyCountStep {
                    below_level: 12,
                    count: 4,
                },
            ],
            max_enemy_count: 5,
            weapon_upgrade_chance: 0.25,
            player_death_grace: 1.1,
        }
    }
}

impl ProgressionConfig {
    pub fn enemy_count(&self, level: u32) -> u32 {
        self.enemy_count_steps
            .iter()
            .find(|step| level < step.below_level)
            .map(|step| step.count)
            .unwrap_or(self.max_enemy_count)
    }

    pub fn is_final_round(&self, level: u32) -> bool {
        level == self.final_round
    }

    pub fn has_mini_boss(&self, level: u32) -> bool {
        (level > 0 && self.boss_every > 0 && level % self.boss_every == 0)
            || self.is_final_round(level)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enemy_count_steps_by_level() {
        let progression = ProgressionConfig::default();
        assert_eq!(progression.enemy_count(0), 2);
        assert_eq!(progression.enemy_count(3), 2);
        assert_eq!(progression.enemy_count(4), 3);
        assert_eq!(progression.enemy_count(9), 3);
        assert_eq!(progression.enemy_count(10), 4);
        assert_eq!(progression.enemy_count(11), 4);
        assert_eq!(progression.enemy_count(12), 5);
        assert_eq!(progression.enemy_count(13), 5);
    }

    #[test]
    fn mini_boss_on_every_fourth_and_final_level() {
        let progression = ProgressionConfig::default();
        assert!(!progression.has_mini_boss(0));
        assert!(!progression.has_mini_boss(3));
        assert!(progression.has_mini_boss(4));
        assert!(progression.has_mini_boss(8));
        assert!(progression.has_mini_boss(13));
    }

    #[test]
    fn partial_progression_keeps_defaults() {
        let config: SimConfig =
            serde_json::from_str(r#"{"progression":{"final_round":5},"seed":7}"#)
                .expect("config");
        assert_eq!(config.progression.final_round, 5);
        assert_eq!(config.progression.boss_every, 4);
        assert_eq!(config.map.tile_size, 32.0);
        assert_eq!(config.seed, Some(7));
    }
}
