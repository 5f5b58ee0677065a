use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::controller::Controller;
use crate::entity::{Body, EntityId};
use crate::math::Vec2;
use crate::render::{Color, PLAYER_COLOR};
use crate::scene::Scene;
use crate::state::{self, Actor, CharacterState};
use crate::tuning::{
    BASE_DEFENSE, BODY_IDX, CHARACTER_BASE_SPEED, CHARACTER_MAX_HP, CHARACTER_MAX_STAMINA,
    CHARACTER_PARTS, ENEMY_COOLDOWN_FACTOR, ENEMY_HP_REGEN, ENEMY_REACH_FACTOR, HEAD_IDX,
    HP_REGEN_DELAY_SECONDS, INVULNERABILITY_SECONDS, KNOCKBACK_DIRECTION_SCALE, KNOCKBACK_FORCE,
    KNOCKBACK_LEVEL_SPAN, KNOCKBACK_SECONDS, LEGS_IDX, MAX_LEVEL, MIN_DAMAGE, PLAYER_HP_REGEN,
    PLAYER_MAX_HP, PLAYER_MAX_STAMINA, PLAYER_SPEED, ROLL_COOLDOWN_SECONDS, ROLL_STAMINA_COST,
    STAMINA_REGEN_DELAY_SECONDS, STAMINA_REGEN_PER_SECOND,
};
use crate::weapon::Weapon;
use crate::SimError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EnemyClass {
    Melee,
    Archer,
    Mixed,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnemyBrain {
    pub class: EnemyClass,
    pub target: Option<EntityId>,
    pub roll_skill: bool,
    /// Pixels. The enemy closes in until the target is this near.
    pub max_weapon_reach: f32,
}

impl EnemyBrain {
    /// Rebuilds the enemy's intents for this tick from its target.
    fn decide(
        &mut self,
        pos: Vec2,
        stamina_ready: bool,
        can_use_weapon: bool,
        scene: &mut Scene,
    ) -> Controller {
        let mut ctrl = Controller::idle();
        let Some(target_id) = self.target else {
            return ctrl;
        };
        let target = scene
            .entity(target_id)
            .filter(|entity| entity.body.alive)
            .and_then(|entity| {
                entity
                    .as_character()
                    .map(|character| (entity.body.pos, character.ctrl.action1))
            });
        let Some((target_pos, target_attacking)) = target else {
            self.target = None;
            return ctrl;
        };

        let to_target = target_pos - pos;
        if to_target.len() >= self.max_weapon_reach {
            ctrl.direction = to_target.norm();
            ctrl.roll = self.roll_skill
                && stamina_ready
                && self.class == EnemyClass::Melee
                && scene.rng().gen::<f32>() >= 0.975;
        } else if target_attacking && self.roll_skill && scene.rng().gen::<f32>() >= 0.75 {
            let rng = scene.rng();
            let x = if rng.gen_bool(0.5) { -1.0 } else { 1.0 };
            let y = if rng.gen_bool(0.5) { -1.0 } else { 1.0 };
            ctrl.direction = Vec2::new(x, y);
            ctrl.roll = true;
        } else if can_use_weapon {
            ctrl.action_pos = target_pos;
            ctrl.action1 = true;
        }
        ctrl
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Role {
    Player,
    Enemy(EnemyBrain),
}

/// Forced movement after a hit, overriding input for `duration` seconds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Knockback {
    pub dir: Vec2,
    pub started_at: f32,
    pub duration: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CharacterSnapshot {
    pub hp: f32,
    pub stamina: f32,
    pub level: u32,
    pub pos: Vec2,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Character {
    pub role: Role,
    pub ctrl: Controller,
    pub state: CharacterState,
    /// Seconds spent in the current state.
    pub state_age: f32,
    pub level: u32,
    pub hp: f32,
    pub max_hp: f32,
    pub hp_regen_step: f32,
    pub stamina: f32,
    pub max_stamina: f32,
    pub last_stamina_use: f32,
    pub last_damage: Option<f32>,
    pub rolling: bool,
    pub last_roll: Option<f32>,
    pub items: Vec<Weapon>,
    pub curr_item: usize,
    pub defense_factor: f32,
    pub lock_facing: bool,
    /// -1 facing left, 1 facing right.
    pub facing_dir: f32,
    /// Speed factor restored when a state lets go of the character.
    pub rest_speed_factor: f32,
    pub knockback: Option<Knockback>,
    pub color: Color,
    /// Head, body, arms and legs in tiles.
    pub size_ratios: [Vec2; 4],
    /// `size_ratios` scaled to the current tile size.
    pub part_sizes: [Vec2; 4],
}

impl Character {
    fn new(role: Role, items: Vec<Weapon>, color: Color) -> Self {
        Self {
            role,
            ctrl: Controller::idle(),
            state: CharacterState::Idle,
            state_age: 0.0,
            level: 0,
            hp: CHARACTER_MAX_HP,
            max_hp: CHARACTER_MAX_HP,
            hp_regen_step: PLAYER_HP_REGEN,
            stamina: CHARACTER_MAX_STAMINA,
            max_stamina: CHARACTER_MAX_STAMINA,
            last_stamina_use: 0.0,
            last_damage: None,
            rolling: false,
            last_roll: None,
            items,
            curr_item: 0,
            defense_factor: 0.0,
            lock_facing: false,
            facing_dir: 1.0,
            rest_speed_factor: 1.0,
            knockback: None,
            color,
            size_ratios: CHARACTER_PARTS,
            part_sizes: CHARACTER_PARTS,
        }
    }

    pub fn player() -> Self {
        let mut player = Self::new(Role::Player, Weapon::loadout(), PLAYER_COLOR);
        player.max_hp = PLAYER_MAX_HP.start;
        player.hp = player.max_hp;
        player.max_stamina = PLAYER_MAX_STAMINA.start;
        player.stamina = player.max_stamina;
        player
    }

    /// Unleveled enemy without a target. Melee and mixed enemies carry a
    /// sword, archers a bow.
    pub fn enemy(class: EnemyClass, color: Color) -> Self {
        let weapon = match class {
            EnemyClass::Melee | EnemyClass::Mixed => Weapon::sword(),
            EnemyClass::Archer => Weapon::bow(),
        };
        let mut enemy = Self::new(
            Role::Enemy(EnemyBrain {
                class,
                target: None,
                roll_skill: false,
                max_weapon_reach: 0.0,
            }),
            vec![weapon],
            color,
        );
        enemy.hp_regen_step = ENEMY_HP_REGEN;
        enemy
    }

    /// Body at `pos` sized for `tile_size`.
    pub fn body(&mut self, pos: Vec2, tile_size: f32) -> Body {
        let mut body = Body::new(pos, Vec2::ZERO);
        let speed = if self.is_player() {
            PLAYER_SPEED.at(self.level as f32 / MAX_LEVEL)
        } else {
            CHARACTER_BASE_SPEED
        };
        body.base_speed = speed * tile_size;
        self.resize(&mut body, tile_size, 1.0);
        body
    }

    pub fn is_player(&self) -> bool {
        matches!(self.role, Role::Player)
    }

    pub fn brain(&self) -> Option<&EnemyBrain> {
        match &self.role {
            Role::Enemy(brain) => Some(brain),
            Role::Player => None,
        }
    }

    pub fn brain_mut(&mut self) -> Option<&mut EnemyBrain> {
        match &mut self.role {
            Role::Enemy(brain) => Some(brain),
            Role::Player => None,
        }
    }

    pub fn weapon(&self) -> &Weapon {
        &self.items[self.curr_item]
    }

    pub fn weapon_mut(&mut self) -> &mut Weapon {
        &mut self.items[self.curr_item]
    }

    pub fn is_idle(&self, body: &Body) -> bool {
        body.speed_factor == 0.0 || self.ctrl.direction.is_zero()
    }

    pub fn can_roll(&self, body: &Body) -> bool {
        !self.is_idle(body)
            && !self.rolling
            && self.stamina >= ROLL_STAMINA_COST
            && self
                .last_roll
                .map_or(true, |at| body.age - at > ROLL_COOLDOWN_SECONDS)
    }

    pub fn can_use_weapon(&self, body: &Body) -> bool {
        self.weapon().can_use(body.age)
    }

    pub fn total_level(&self) -> u32 {
        self.items.iter().map(|weapon| weapon.level).sum::<u32>() + self.level
    }

    /// Selects hotbar slot `slot` when the character carries one.
    pub fn equip(&mut self, slot: usize) -> bool {
        if slot < self.items.len() {
            self.curr_item = slot;
            true
        } else {
            false
        }
    }

    pub fn look_at(&mut self, pos: Vec2, point: Vec2) {
        self.facing_dir = if pos.x >= point.x { -1.0 } else { 1.0 };
    }

    pub fn resize(&mut self, body: &mut Body, tile_size: f32, ratio: f32) {
        self.part_sizes = self.size_ratios.map(|part| part.scale(tile_size));
        body.base_speed *= ratio;
        body.size = Vec2::new(
            self.part_sizes[BODY_IDX].x,
            self.part_sizes[BODY_IDX].y + self.part_sizes[HEAD_IDX].y + self.part_sizes[LEGS_IDX].y,
        );
    }

    pub fn upgrade(&mut self, body: &mut Body, tile_size: f32) {
        self.level += 1;
        let progress = self.level as f32 / MAX_LEVEL;
        body.base_speed = PLAYER_SPEED.at(progress) * tile_size;
        self.max_hp = PLAYER_MAX_HP.at(progress);
        self.hp = self.max_hp;
        self.max_stamina = PLAYER_MAX_STAMINA.at(progress);
        self.stamina = self.max_stamina;
    }

    /// Applies a hit from a source at `attacker_pos`. Returns the damage dealt,
    /// or `None` when the character is already down or still invulnerable
    /// from the previous hit.
    pub fn take_damage(&mut self, body: &Body, amount: f32, attacker_pos: Vec2) -> Option<f32> {
        if self.hp <= 0.0 {
            return None;
        }
        if self
            .last_damage
            .is_some_and(|at| body.age - at <= INVULNERABILITY_SECONDS)
        {
            return None;
        }

        let defense = self.defense_factor * BASE_DEFENSE;
        let mut total = (amount - defense).max(MIN_DAMAGE);
        if total >= self.hp {
            total = self.hp.floor();
        }
        self.hp = (self.hp - total).floor().max(0.0);
        self.last_damage = Some(body.age);
        self.knockback = Some(Knockback {
            dir: (body.pos - attacker_pos)
                .norm()
                .scale(KNOCKBACK_DIRECTION_SCALE),
            started_at: body.age,
            duration: KNOCKBACK_SECONDS,
        });
        Some(total)
    }

    /// Moves the body for one tick. An active knockback replaces normal
    /// movement; a move that would leave the map is undone.
    pub fn integrate(&mut self, body: &mut Body, dt: f32, map_size: Vec2, tile_size: f32) {
        let old_pos = body.pos;
        match self.knockback {
            Some(knockback) if body.age - knockback.started_at < knockback.duration => {
                let force = KNOCKBACK_FORCE.at(self.level as f32 / KNOCKBACK_LEVEL_SPAN);
                body.pos += knockback.dir.scale(tile_size * force * dt);
            }
            Some(_) => self.knockback = None,
            None => body.integrate(dt),
        }
        if body.is_out_of_map(map_size) {
            body.pos = old_pos;
        }
    }

    pub fn regen(&mut self, body: &Body, dt: f32) {
        if !body.alive {
            return;
        }
        if self.stamina < self.max_stamina
            && body.age - self.last_stamina_use > STAMINA_REGEN_DELAY_SECONDS
        {
            self.stamina = (self.stamina + STAMINA_REGEN_PER_SECOND * dt).min(self.max_stamina);
        }
        let since_damage = self.last_damage.map_or(f32::INFINITY, |at| body.age - at);
        if self.hp < self.max_hp && since_damage > HP_REGEN_DELAY_SECONDS {
            self.hp = (self.hp + self.hp_regen_step * dt).min(self.max_hp);
        }
    }

    /// Levels a fresh enemy `levels` times, each level going to either its
    /// stats or its weapon, then applies the enemy weapon handicaps.
    pub(crate) fn level_enemy<R: Rng>(
        &mut self,
        body: &mut Body,
        levels: u32,
        weapon_upgrade_chance: f32,
        tile_size: f32,
        rng: &mut R,
    ) {
        for _ in 0..levels {
            if rng.gen::<f32>() > weapon_upgrade_chance {
                self.upgrade(body, tile_size);
            } else if let Some(weapon) = self.items.first_mut() {
                weapon.upgrade();
            }
        }
        let mut reach: f32 = 0.0;
        for weapon in &mut self.items {
            weapon.cool_down *= ENEMY_COOLDOWN_FACTOR;
            reach = reach.max(weapon.reach(tile_size));
        }
        if let Role::Enemy(brain) = &mut self.role {
            brain.max_weapon_reach = reach * ENEMY_REACH_FACTOR;
        }
    }

    fn think(&mut self, body: &Body, scene: &mut Scene) {
        let stamina_ready = self.stamina >= self.max_stamina * 0.5;
        let can_use_weapon = self.can_use_weapon(body);
        if let Role::Enemy(brain) = &mut self.role {
            self.ctrl = brain.decide(body.pos, stamina_ready, can_use_weapon, scene);
        }
    }

    pub fn snapshot(&self, body: &Body) -> CharacterSnapshot {
        CharacterSnapshot {
            hp: self.hp,
            stamina: self.stamina,
            level: self.level,
            pos: body.pos,
        }
    }

    pub fn restore(&mut self, body: &mut Body, snapshot: &CharacterSnapshot) {
        self.hp = snapshot.hp;
        self.stamina = snapshot.stamina;
        self.level = snapshot.level;
        body.pos = snapshot.pos;
    }
}

pub(crate) fn update(
    id: EntityId,
    body: &mut Body,
    character: &mut Character,
    scene: &mut Scene,
    dt: f32,
    player_input: &Controller,
) -> Result<(), SimError> {
    if character.is_player() {
        character.ctrl = *player_input;
    } else {
        character.think(body, scene);
    }
    body.age += dt;
    body.move_dir = character.ctrl.direction.norm();

    state::update_state(
        &mut Actor {
            id,
            body: &mut *body,
            character: &mut *character,
        },
        scene,
        dt,
    )?;

    if !character.lock_facing && body.move_dir.x != 0.0 {
        character.facing_dir = body.move_dir.x.signum();
    }
    character.integrate(body, dt, scene.map_size(), scene.tile_size());
    character.regen(body, dt);
    Ok(())
}
