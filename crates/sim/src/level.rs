use std::collections::HashSet;
use std::fmt;

use rand::Rng;
use tracing::{debug, info};

use crate::audio::AudioCue;
use crate::character::{Character, EnemyClass};
use crate::entity::{Entity, EntityId, EntityKind, EntityType};
use crate::events::{GameStarted, SceneEvent};
use crate::indicator::TextIndicator;
use crate::math::Vec2;
use crate::render::{self, RenderSurface, BOSS_COLOR, ENEMY_COLORS};
use crate::scene::Scene;
use crate::state::CharacterState;
use crate::tuning::{
    BOSS_ARCHER_COOLDOWN_FACTOR, BOSS_ARCHER_PROJECTILE_FACTOR, BOSS_HP_FACTOR,
    BOSS_MELEE_SPEED_BONUS, PLAYER_LEVEL_UP_EVERY, WAVE_ENEMY_STAT_FACTOR, WAVE_SPAWN_ROWS,
    WAVE_SPAWN_TOP, WAVE_VETERAN_LEVEL,
};
use crate::SimError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LevelStateName {
    Lobby,
    Playing,
    PlayerDead,
    PlayerWon,
}

impl fmt::Display for LevelStateName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LevelStateName::Lobby => "Lobby",
            LevelStateName::Playing => "Playing",
            LevelStateName::PlayerDead => "PlayerDead",
            LevelStateName::PlayerWon => "PlayerWon",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum LevelState {
    /// Before the first restart.
    #[default]
    Lobby,
    Playing {
        age: f32,
        /// Level-state age at which the player was found dead.
        player_dead_at: Option<f32>,
        has_mini_boss: bool,
    },
    PlayerDead,
    PlayerWon,
}

impl LevelState {
    fn playing() -> Self {
        Self::Playing {
            age: 0.0,
            player_dead_at: None,
            has_mini_boss: false,
        }
    }

    pub fn name(&self) -> LevelStateName {
        match self {
            Self::Lobby => LevelStateName::Lobby,
            Self::Playing { .. } => LevelStateName::Playing,
            Self::PlayerDead => LevelStateName::PlayerDead,
            Self::PlayerWon => LevelStateName::PlayerWon,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::PlayerDead | Self::PlayerWon)
    }
}

/// Wave progression of one game: spawns waves and bosses, rewards the player
/// between levels and decides when the game is lost or won.
#[derive(Debug, Default)]
pub struct LevelManager {
    level: u32,
    player: Option<EntityId>,
    current_boss: Option<EntityId>,
    state: LevelState,
}

impl LevelManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn level(&self) -> u32 {
        self.level
    }

    pub fn player(&self) -> Option<EntityId> {
        self.player
    }

    pub fn current_boss(&self) -> Option<EntityId> {
        self.current_boss
    }

    pub fn state(&self) -> &LevelState {
        &self.state
    }

    fn initial_player_pos(scene: &Scene) -> Vec2 {
        let tiles = scene.config().map.tiles();
        Vec2::new(tiles.x * 0.5, tiles.y - 2.0).scale(scene.tile_size())
    }

    fn initial_boss_pos(scene: &Scene) -> Vec2 {
        let tiles = scene.config().map.tiles();
        Vec2::new(tiles.x * 0.5, 3.0).scale(scene.tile_size())
    }

    fn is_final_round(&self, scene: &Scene) -> bool {
        scene.config().progression.is_final_round(self.level)
    }

    fn change_state(&mut self, scene: &mut Scene, next: LevelState) {
        if self.state.is_terminal() {
            scene.set_paused(false);
        }
        let mut next = next;
        match &mut next {
            LevelState::Playing { has_mini_boss, .. } => {
                *has_mini_boss = scene.config().progression.has_mini_boss(self.level);
            }
            LevelState::PlayerDead | LevelState::PlayerWon => scene.set_paused(true),
            LevelState::Lobby => {}
        }
        info!(
            level = self.level,
            from = %self.state.name(),
            to = %next.name(),
            "level_state_changed"
        );
        self.state = next;
    }

    /// Starts a new game at level 0. New Game+ keeps the current player with
    /// its upgrades; otherwise a fresh player is created.
    pub fn restart(&mut self, scene: &mut Scene, game_plus: bool) -> Result<(), SimError> {
        info!(game_plus, "game_restarted");
        self.level = 0;
        self.current_boss = None;
        let kept = match self.player.filter(|_| game_plus) {
            Some(player) => scene.clear_except(player).is_some(),
            None => {
                scene.clear();
                false
            }
        };
        if kept {
            self.respawn_player(scene)?;
        } else {
            self.create_player(scene);
        }
        self.create_enemies(scene);
        self.change_state(scene, LevelState::playing());
        scene.dispatch_event(SceneEvent::GameStarted(GameStarted { game_plus }));
        Ok(())
    }

    fn create_player(&mut self, scene: &mut Scene) {
        let pos = Self::initial_player_pos(scene);
        self.player = Some(scene.spawn_character(pos, Character::player()));
    }

    fn respawn_player(&mut self, scene: &mut Scene) -> Result<(), SimError> {
        let Some(id) = self.player else {
            return Ok(());
        };
        let pos = Self::initial_player_pos(scene);
        if let Some(entity) = scene.entity_mut(id) {
            entity.body.pos = pos;
            if let Some(player) = entity.as_character_mut() {
                player.hp = player.max_hp;
            }
        }
        scene.change_state(id, CharacterState::Idle)
    }

    /// Random distinct spawn tiles in the band below the top wall.
    fn spawn_positions(scene: &mut Scene, count: u32) -> Vec<Vec2> {
        let tiles_x = scene.config().map.tiles_x;
        let columns = tiles_x.saturating_sub(WAVE_SPAWN_TOP).max(1);
        let count = count.min(columns * WAVE_SPAWN_ROWS) as usize;
        let tile_size = scene.tile_size();

        let mut seen = HashSet::new();
        let mut positions = Vec::with_capacity(count);
        while positions.len() < count {
            let rng = scene.rng();
            let tile = (
                WAVE_SPAWN_TOP + rng.gen_range(0..columns),
                WAVE_SPAWN_TOP + rng.gen_range(0..WAVE_SPAWN_ROWS),
            );
            if seen.insert(tile) {
                positions.push(Vec2::new(tile.0 as f32, tile.1 as f32).scale(tile_size));
            }
        }
        positions
    }

    fn create_enemies(&mut self, scene: &mut Scene) {
        let count = scene.config().progression.enemy_count(self.level);
        let level = self.level as f32;
        for pos in Self::spawn_positions(scene, count) {
            let rng = scene.rng();
            let enemy_level = (level * 0.5 + rng.gen::<f32>() * level * 0.25).ceil() as u32;
            let color = ENEMY_COLORS[rng.gen_range(0..ENEMY_COLORS.len())];
            let class = if rng.gen::<f32>() > 0.75 {
                EnemyClass::Melee
            } else {
                EnemyClass::Archer
            };
            let (roll_skill, aggressive) = if enemy_level >= WAVE_VETERAN_LEVEL {
                (rng.gen::<f32>() > 0.85, rng.gen::<f32>() > 0.85)
            } else {
                (false, false)
            };

            let id = scene.spawn_enemy(pos, class, enemy_level, color);
            let player = self.player;
            if let Some(enemy) = scene.entity_mut(id).and_then(Entity::as_character_mut) {
                enemy.max_hp = (enemy.max_hp * WAVE_ENEMY_STAT_FACTOR).floor();
                enemy.hp = enemy.max_hp;
                let weapon = enemy.weapon_mut();
                weapon.damage = (weapon.damage * WAVE_ENEMY_STAT_FACTOR).floor();
                if let Some(brain) = enemy.brain_mut() {
                    brain.roll_skill = roll_skill;
                    if aggressive {
                        brain.target = player;
                    }
                }
            }
        }
        debug!(level = self.level, count, "wave_spawned");
    }

    /// Spawns the boss of the current level. It always hunts the player.
    pub fn create_boss(&mut self, scene: &mut Scene) -> EntityId {
        let tier = self.level / 4;
        let class = if self.is_final_round(scene) || scene.rng().gen::<f32>() > 0.75 {
            EnemyClass::Melee
        } else {
            EnemyClass::Archer
        };
        let pos = Self::initial_boss_pos(scene);
        let id = scene.spawn_enemy(pos, class, self.level + 1, BOSS_COLOR);

        let tile_size = scene.tile_size();
        let player = self.player;
        if let Some(entity) = scene.entity_mut(id) {
            let Entity { body, kind, .. } = entity;
            if let EntityKind::Character(boss) = kind {
                boss.defense_factor = (tier / 2) as f32;
                let growth = 1.0 + tier as f32 * 0.5;
                boss.size_ratios = boss.size_ratios.map(|part| part.scale(growth));
                boss.resize(body, tile_size, 1.0);
                boss.max_hp *= BOSS_HP_FACTOR;
                boss.hp = boss.max_hp;
                match class {
                    EnemyClass::Archer => {
                        let weapon = boss.weapon_mut();
                        weapon.cool_down *= BOSS_ARCHER_COOLDOWN_FACTOR;
                        if let Some(bow) = weapon.as_bow_mut() {
                            bow.projectile_speed *= BOSS_ARCHER_PROJECTILE_FACTOR;
                        }
                    }
                    EnemyClass::Melee | EnemyClass::Mixed => {
                        boss.rest_speed_factor += BOSS_MELEE_SPEED_BONUS;
                        body.speed_factor = boss.rest_speed_factor;
                    }
                }
                if let Some(brain) = boss.brain_mut() {
                    brain.roll_skill = tier > 1;
                    brain.target = player;
                }
            }
        }
        info!(level = self.level, entity = id.0, class = ?class, "boss_spawned");
        id
    }

    /// Moves to the next level and rewards the player, or wins the game when
    /// the final round was cleared.
    pub fn advance_level(&mut self, scene: &mut Scene) {
        if self.is_final_round(scene) {
            self.change_state(scene, LevelState::PlayerWon);
            return;
        }
        let final_round = scene.config().progression.final_round;
        self.level = (self.level + 1).min(final_round);
        self.current_boss = None;
        self.create_enemies(scene);

        let tile_size = scene.tile_size();
        let level = self.level;
        let reward = self
            .player
            .and_then(|id| scene.entity_mut(id))
            .and_then(|entity| {
                let Entity { body, kind, .. } = entity;
                let EntityKind::Character(player) = kind else {
                    return None;
                };
                let text = if level % PLAYER_LEVEL_UP_EVERY == 0 {
                    player.upgrade(body, tile_size);
                    "Level Up".to_string()
                } else if player.items.is_empty() {
                    return None;
                } else {
                    let idx = (level as usize - 1) % player.items.len();
                    let weapon = &mut player.items[idx];
                    weapon.upgrade();
                    format!("{} upgraded", weapon.name())
                };
                Some((body.pos, text))
            });
        if let Some((pos, text)) = reward {
            info!(level, reward = %text, "level_advanced");
            scene.play(AudioCue::Upgrade);
            scene.spawn_indicator(pos, TextIndicator::upgrade(text));
        }
        self.change_state(scene, LevelState::playing());
    }

    pub fn update(&mut self, scene: &mut Scene, dt: f32) {
        let LevelState::Playing {
            age,
            player_dead_at,
            has_mini_boss,
        } = &mut self.state
        else {
            return;
        };
        *age += dt;
        let has_mini_boss = *has_mini_boss;

        if let Some(dead_at) = *player_dead_at {
            let grace = scene.config().progression.player_death_grace;
            if *age - dead_at > grace {
                self.change_state(scene, LevelState::PlayerDead);
            }
            return;
        }

        let player_alive = self
            .player
            .and_then(|id| scene.entity(id))
            .is_some_and(|entity| entity.body.alive);
        if !player_alive {
            debug!(level = self.level, "player_down");
            *player_dead_at = Some(*age);
            return;
        }

        let boss_defeated = self.current_boss.is_some_and(|id| {
            scene
                .entity(id)
                .map_or(true, |entity| !entity.body.alive)
        });
        if scene.count(EntityType::Enemy) == 0 {
            if has_mini_boss && !boss_defeated {
                self.current_boss = Some(self.create_boss(scene));
            } else {
                self.advance_level(scene);
            }
        }
    }

    /// Hotbar and, in debug mode, the info overlay.
    pub fn render(&self, scene: &Scene, surface: &mut dyn RenderSurface) {
        if !matches!(self.state, LevelState::Playing { .. }) {
            return;
        }
        let Some(player) = self.player.and_then(|id| scene.character(id)) else {
            return;
        };
        render::render_hotbar(
            &player.items,
            player.curr_item,
            scene.map_size(),
            scene.tile_size(),
            surface,
        );
        if scene.is_debug() {
            let map = &scene.config().map;
            let lines = [
                format!("Map: {}x{}", map.tiles_x, map.tiles_y),
                format!("Tile: {}", scene.tile_size()),
                format!("Entities: {}", scene.len()),
                format!("Level: {}", self.level),
                format!("State: {}", self.state.name()),
            ];
            render::render_debug_lines(&lines, surface);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::rc::Rc;

    use super::*;
    use crate::config::SimConfig;
    use crate::events::SceneEventKind;
    use crate::render::tests::RecordingSurface;
    use crate::weapon::WeaponName;

    fn started() -> (Scene, LevelManager) {
        let mut scene = Scene::new(SimConfig::seeded(21));
        let mut levels = LevelManager::new();
        levels.restart(&mut scene, false).expect("restart");
        (scene, levels)
    }

    fn enemies(scene: &Scene) -> Vec<EntityId> {
        scene
            .entities()
            .filter(|entity| entity.entity_type() == EntityType::Enemy)
            .map(|entity| entity.id)
            .collect()
    }

    fn clear_wave(scene: &mut Scene) {
        for id in enemies(scene) {
            scene.despawn(id);
        }
    }

    #[test]
    fn restart_spawns_player_and_first_wave() {
        let mut scene = Scene::new(SimConfig::seeded(21));
        let started = Rc::new(Cell::new(0));
        let seen = Rc::clone(&started);
        scene.add_event_listener(
            SceneEventKind::GameStarted,
            Box::new(move |_| seen.set(seen.get() + 1)),
        );
        let mut levels = LevelManager::new();
        assert_eq!(levels.state().name(), LevelStateName::Lobby);
        levels.restart(&mut scene, false).expect("restart");

        assert_eq!(levels.level(), 0);
        assert_eq!(levels.state().name(), LevelStateName::Playing);
        assert_eq!(scene.count(EntityType::Player), 1);
        assert_eq!(scene.count(EntityType::Enemy), 2);
        assert_eq!(started.get(), 1);

        let player = levels.player().and_then(|id| scene.entity(id)).expect("player");
        assert_eq!(player.body.pos, Vec2::new(512.0, 512.0));
    }

    #[test]
    fn wave_positions_are_distinct_tiles_in_the_top_band() {
        let (scene, _) = started();
        let tile = scene.tile_size();
        let positions: Vec<Vec2> = scene
            .entities()
            .filter(|entity| entity.entity_type() == EntityType::Enemy)
            .map(|entity| entity.body.pos)
            .collect();
        for (i, pos) in positions.iter().enumerate() {
            assert!(pos.x >= 2.0 * tile && pos.x < 32.0 * tile);
            assert!(pos.y >= 2.0 * tile && pos.y < 8.0 * tile);
            assert!(positions[i + 1..].iter().all(|other| other != pos));
        }
    }

    #[test]
    fn wave_enemies_carry_reduced_stats() {
        let (scene, _) = started();
        for id in enemies(&scene) {
            let enemy = scene.character(id).expect("enemy");
            assert_eq!(enemy.max_hp, 7.0);
            assert_eq!(enemy.hp, 7.0);
            let damage = match enemy.weapon().name() {
                WeaponName::Sword => 2.0,
                _ => 1.0,
            };
            assert_eq!(enemy.weapon().damage, damage);
        }
    }

    #[test]
    fn cleared_wave_advances_and_upgrades_a_weapon() {
        let (mut scene, mut levels) = started();
        clear_wave(&mut scene);
        levels.update(&mut scene, 1.0 / 60.0);

        assert_eq!(levels.level(), 1);
        assert_eq!(scene.count(EntityType::Enemy), 2);
        let player = levels.player().and_then(|id| scene.character(id)).expect("player");
        assert_eq!(player.items[0].level, 1);
        assert_eq!(player.items[0].name(), WeaponName::Sword);
        assert_eq!(scene.count(EntityType::Entity), 1);
    }

    #[test]
    fn boss_level_spawns_boss_before_advancing() {
        let (mut scene, mut levels) = started();
        for _ in 0..4 {
            clear_wave(&mut scene);
            levels.update(&mut scene, 1.0 / 60.0);
        }
        assert_eq!(levels.level(), 4);
        let player = levels.player().and_then(|id| scene.character(id)).expect("player");
        assert_eq!(player.level, 1);

        clear_wave(&mut scene);
        levels.update(&mut scene, 1.0 / 60.0);
        assert_eq!(levels.level(), 4);
        let boss_id = levels.current_boss().expect("boss");
        let boss = scene.entity(boss_id).expect("boss entity");
        let character = boss.as_character().expect("boss character");
        assert_eq!(character.color, BOSS_COLOR);
        assert_eq!(character.brain().and_then(|b| b.target), levels.player());
        assert_eq!(character.total_level(), 5);
        assert_eq!(scene.count(EntityType::Enemy), 1);

        scene.despawn(boss_id);
        levels.update(&mut scene, 1.0 / 60.0);
        assert_eq!(levels.level(), 5);
        assert_eq!(levels.current_boss(), None);
    }

    #[test]
    fn final_round_clear_wins_and_pauses() {
        let mut config = SimConfig::seeded(4);
        config.progression.final_round = 1;
        let mut scene = Scene::new(config);
        let mut levels = LevelManager::new();
        levels.restart(&mut scene, false).expect("restart");

        clear_wave(&mut scene);
        levels.update(&mut scene, 0.1);
        assert_eq!(levels.level(), 1);

        clear_wave(&mut scene);
        levels.update(&mut scene, 0.1);
        let boss = levels.current_boss().expect("final boss");
        let class = scene.character(boss).and_then(|c| c.brain()).map(|b| b.class);
        assert_eq!(class, Some(EnemyClass::Melee));

        scene.despawn(boss);
        levels.update(&mut scene, 0.1);
        assert_eq!(levels.state().name(), LevelStateName::PlayerWon);
        assert!(scene.is_paused());

        levels.restart(&mut scene, true).expect("new game plus");
        assert!(!scene.is_paused());
        assert_eq!(levels.level(), 0);
        assert_eq!(scene.count(EntityType::Player), 1);
    }

    #[test]
    fn dead_player_ends_the_game_after_grace() {
        let (mut scene, mut levels) = started();
        let player = levels.player().expect("player");
        if let Some(entity) = scene.entity_mut(player) {
            entity.body.alive = false;
        }
        levels.update(&mut scene, 0.5);
        assert_eq!(levels.state().name(), LevelStateName::Playing);
        levels.update(&mut scene, 1.0);
        assert_eq!(levels.state().name(), LevelStateName::Playing);
        levels.update(&mut scene, 0.2);
        assert_eq!(levels.state().name(), LevelStateName::PlayerDead);
        assert!(scene.is_paused());
    }

    #[test]
    fn new_game_plus_keeps_upgrades_and_heals() {
        let (mut scene, mut levels) = started();
        for _ in 0..4 {
            clear_wave(&mut scene);
            levels.update(&mut scene, 1.0 / 60.0);
        }
        let player = levels.player().expect("player");
        if let Some(character) = scene.entity_mut(player).and_then(Entity::as_character_mut) {
            character.hp = 1.0;
        }
        levels.restart(&mut scene, true).expect("restart");

        assert_eq!(levels.player(), Some(player));
        let character = scene.character(player).expect("player");
        assert_eq!(character.level, 1);
        assert_eq!(character.hp, character.max_hp);
        assert_eq!(character.state, CharacterState::Idle);
        assert_eq!(scene.count(EntityType::Enemy), 2);
    }

    #[test]
    fn hud_shows_hotbar_and_debug_lines() {
        let (mut scene, levels) = started();
        let mut surface = RecordingSurface::default();
        levels.render(&scene, &mut surface);
        assert_eq!(surface.texts, vec!["1", "2", "3"]);

        scene.set_debug(true);
        let mut surface = RecordingSurface::default();
        levels.render(&scene, &mut surface);
        assert!(surface.texts.iter().any(|text| text == "Level: 0"));
    }
}
