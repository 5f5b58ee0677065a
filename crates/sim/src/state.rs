use std::fmt;
use std::mem;

use tracing::{debug, warn};

use crate::audio::AudioCue;
use crate::character::Character;
use crate::entity::{Body, EntityId};
use crate::hitbox::{HitBox, HitBoxKind};
use crate::math::{lerp, Vec2, HALF_PI, TWO_PI};
use crate::projectile;
use crate::scene::Scene;
use crate::tuning::{
    BLOCK_MIN_SECONDS, BODY_IDX, DYING_SECONDS, DYING_START_OPACITY, ROLL_ANGULAR_SPEED,
    ROLL_SPEED_FACTOR, ROLL_STAMINA_COST, SHOOTING_SPEED_FACTOR, SHOOT_COOLDOWN_REFUND,
};
use crate::weapon::WeaponName;
use crate::SimError;

/// A character taken out of the scene for the duration of its update.
pub(crate) struct Actor<'a> {
    pub id: EntityId,
    pub body: &'a mut Body,
    pub character: &'a mut Character,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StateName {
    Idle,
    Roll,
    Attacking,
    Shooting,
    Blocking,
    Dying,
}

impl fmt::Display for StateName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StateName::Idle => "Idle",
            StateName::Roll => "Roll",
            StateName::Attacking => "Attacking",
            StateName::Shooting => "Shooting",
            StateName::Blocking => "Blocking",
            StateName::Dying => "Dying",
        };
        f.write_str(name)
    }
}

/// Combat and movement state. Variant fields live only as long as the state.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum CharacterState {
    #[default]
    Idle,
    Roll {
        direction: Vec2,
        /// Radians turned so far.
        rotated: f32,
    },
    Attacking {
        min_angle: f32,
        max_angle: f32,
        hitbox: Option<EntityId>,
    },
    Shooting,
    Blocking {
        weapon_offset: f32,
        prior_defense: f32,
    },
    Dying,
}

impl CharacterState {
    pub fn roll() -> Self {
        Self::Roll {
            direction: Vec2::ZERO,
            rotated: 0.0,
        }
    }

    pub fn attacking() -> Self {
        Self::Attacking {
            min_angle: 0.0,
            max_angle: 0.0,
            hitbox: None,
        }
    }

    pub fn blocking() -> Self {
        Self::Blocking {
            weapon_offset: 0.0,
            prior_defense: 0.0,
        }
    }

    /// Action state for the equipped weapon.
    pub fn for_weapon(weapon: WeaponName) -> Self {
        match weapon {
            WeaponName::Sword => Self::attacking(),
            WeaponName::Bow => Self::Shooting,
            WeaponName::Shield => Self::blocking(),
        }
    }

    pub fn name(&self) -> StateName {
        match self {
            Self::Idle => StateName::Idle,
            Self::Roll { .. } => StateName::Roll,
            Self::Attacking { .. } => StateName::Attacking,
            Self::Shooting => StateName::Shooting,
            Self::Blocking { .. } => StateName::Blocking,
            Self::Dying => StateName::Dying,
        }
    }

    pub fn is_dying(&self) -> bool {
        matches!(self, Self::Dying)
    }

    fn required_weapon(&self) -> Option<WeaponName> {
        match self {
            Self::Attacking { .. } => Some(WeaponName::Sword),
            Self::Shooting => Some(WeaponName::Bow),
            Self::Blocking { .. } => Some(WeaponName::Shield),
            _ => None,
        }
    }

    fn enter(&mut self, actor: &mut Actor<'_>, scene: &mut Scene) {
        let Actor {
            id,
            body,
            character,
        } = actor;
        match self {
            Self::Idle => {}
            Self::Roll {
                direction,
                rotated,
            } => {
                scene.play(AudioCue::Roll);
                body.speed_factor = ROLL_SPEED_FACTOR;
                character.rolling = true;
                character.stamina -= ROLL_STAMINA_COST;
                character.last_stamina_use = body.age;
                *direction = character.ctrl.direction.norm();
                *rotated = 0.0;
            }
            Self::Attacking {
                min_angle,
                max_angle,
                hitbox,
            } => {
                let Some((arc, multi_shot)) = character
                    .weapon()
                    .as_sword()
                    .map(|sword| (sword.max_angle, sword.multi_shot))
                else {
                    return;
                };
                let action_pos = character.ctrl.action_pos;
                character.lock_facing = true;
                character.look_at(body.pos, action_pos);
                let facing = character.facing_dir;
                let aim = (action_pos - body.pos).angle() + HALF_PI;
                *max_angle = aim + arc * 0.5 * facing;
                *min_angle = aim - arc * 0.5 * facing;

                let torso_height = character.part_sizes[BODY_IDX].y;
                let weapon = character.weapon_mut();
                weapon.active = true;
                weapon.offset_angle = *min_angle;
                weapon.offset = Vec2::new(0.0, -torso_height);
                let blade = weapon.size(scene.tile_size()).y;
                let offset = weapon.offset;
                if let Some(sword) = weapon.as_sword_mut() {
                    sword.swing_range = (*max_angle, *min_angle);
                    sword.swing_dir = facing;
                }

                scene.play(AudioCue::Swing);
                *hitbox = Some(scene.spawn_hitbox(
                    body.pos + offset,
                    Vec2::new(blade, blade),
                    HitBox::swing(*id, multi_shot),
                ));
            }
            Self::Shooting => {
                let action_pos = character.ctrl.action_pos;
                let weapon = character.weapon_mut();
                weapon.active = true;
                weapon.offset = Vec2::new(0.0, -body.size.y * 0.5);
                weapon.offset_angle = -HALF_PI + (body.pos - action_pos).angle();
                weapon.angle = TWO_PI / 4.0;
                body.speed_factor = SHOOTING_SPEED_FACTOR;
                character.facing_dir = 1.0;
                character.lock_facing = true;
            }
            Self::Blocking {
                weapon_offset,
                prior_defense,
            } => {
                let Some((speed_factor, defense_factor)) = character
                    .weapon()
                    .as_shield()
                    .map(|shield| (shield.speed_factor, shield.defense_factor))
                else {
                    return;
                };
                body.speed_factor = speed_factor;
                *prior_defense = character.defense_factor;
                character.defense_factor = defense_factor;
                character.lock_facing = true;
                let weapon = character.weapon_mut();
                weapon.active = true;
                *weapon_offset = weapon.size(scene.tile_size()).x / 2.0;
            }
            Self::Dying => {
                body.speed_factor = 0.0;
                body.alive = false;
                body.solid = false;
            }
        }
    }

    fn exit(&mut self, actor: &mut Actor<'_>, scene: &mut Scene) {
        let Actor {
            body, character, ..
        } = actor;
        match self {
            Self::Idle => {}
            Self::Roll { .. } => {
                body.angle = 0.0;
                body.speed_factor = character.rest_speed_factor;
                character.rolling = false;
                character.last_roll = Some(body.age);
            }
            Self::Attacking { hitbox, .. } => {
                if let Some(hitbox) = hitbox.take() {
                    scene.despawn(hitbox);
                }
                character.lock_facing = false;
                let weapon = character.weapon_mut();
                weapon.last_use = body.age;
                weapon.stow();
            }
            Self::Shooting => {
                let weapon = character.weapon_mut();
                weapon.last_use -= weapon.cool_down * SHOOT_COOLDOWN_REFUND;
                weapon.stow();
                body.speed_factor = character.rest_speed_factor;
                character.lock_facing = false;
            }
            Self::Blocking { prior_defense, .. } => {
                body.speed_factor = character.rest_speed_factor;
                character.defense_factor = *prior_defense;
                character.lock_facing = false;
                character.weapon_mut().stow();
            }
            Self::Dying => {
                body.speed_factor = character.rest_speed_factor;
                body.solid = true;
                body.alive = true;
                body.opacity = 1.0;
            }
        }
    }

    /// Advances the state one tick and returns the state to switch to, if any.
    fn update(
        &mut self,
        actor: &mut Actor<'_>,
        scene: &mut Scene,
        dt: f32,
    ) -> Option<CharacterState> {
        let Actor {
            id,
            body,
            character,
        } = actor;
        let age = character.state_age;
        match self {
            Self::Idle => {
                if let Some(slot) = character.ctrl.equip_slot() {
                    character.equip(slot);
                }
                if character.ctrl.action1 && character.can_use_weapon(body) {
                    return Some(Self::for_weapon(character.weapon().name()));
                }
                if character.ctrl.roll && character.can_roll(body) {
                    return Some(Self::roll());
                }
                None
            }
            Self::Roll {
                direction,
                rotated,
            } => {
                body.move_dir = *direction;
                let (step, completed) = roll_step(*rotated, dt);
                *rotated += step;
                body.angle += step * character.facing_dir;
                completed.then_some(Self::Idle)
            }
            Self::Attacking {
                min_angle,
                max_angle,
                hitbox,
            } => {
                let Some((duration, auto_swing)) = character
                    .weapon()
                    .as_sword()
                    .map(|sword| (sword.attack_duration, sword.auto_swing))
                else {
                    return Some(Self::Idle);
                };
                let progress = age / duration;
                let weapon = character.weapon_mut();
                weapon.offset_angle = lerp(*min_angle, *max_angle, progress.min(1.0));
                let blade = weapon.size(scene.tile_size()).y;
                let blade_mid = (weapon.offset - Vec2::new(0.0, blade * 0.5)).rotate(weapon.offset_angle);
                if let Some(entity) = hitbox.and_then(|hitbox| scene.entity_mut(hitbox)) {
                    entity.body.pos = body.pos + blade_mid;
                }

                if progress < 1.0 {
                    return None;
                }
                if auto_swing && character.ctrl.action1 {
                    scene.play(AudioCue::Swing);
                    if let Some(HitBoxKind::Swing(strike)) = hitbox
                        .and_then(|hitbox| scene.entity_mut(hitbox))
                        .and_then(|entity| entity.as_hitbox_mut())
                        .map(|hitbox| &mut hitbox.kind)
                    {
                        strike.struck.clear();
                    }
                    character.state_age = 0.0;
                    return None;
                }
                Some(Self::Idle)
            }
            Self::Shooting => {
                let action_pos = character.ctrl.action_pos;
                character.weapon_mut().offset_angle = -HALF_PI + (body.pos - action_pos).angle();
                if character.can_use_weapon(body) {
                    fire_arrow(*id, body, character, scene);
                }
                (!character.ctrl.action1).then_some(Self::Idle)
            }
            Self::Blocking { weapon_offset, .. } => {
                let action_pos = character.ctrl.action_pos;
                character.look_at(body.pos, action_pos);
                let facing = character.facing_dir;
                character.weapon_mut().offset = Vec2::new(*weapon_offset * facing, 0.0);
                (!character.ctrl.action1 && age >= BLOCK_MIN_SECONDS).then_some(Self::Idle)
            }
            Self::Dying => {
                body.opacity = lerp(DYING_START_OPACITY, 0.0, age / DYING_SECONDS).max(0.0);
                if age >= DYING_SECONDS {
                    debug!(entity = id.0, "character_died");
                    body.alive = false;
                    scene.despawn(*id);
                }
                None
            }
        }
    }
}

/// Rotation for one roll step and whether the roll completes with it. The
/// last step is clipped so a roll turns exactly one full circle.
pub(crate) fn roll_step(rotated: f32, dt: f32) -> (f32, bool) {
    let remaining = TWO_PI - rotated;
    let step = ROLL_ANGULAR_SPEED * dt;
    if step >= remaining {
        (remaining.max(0.0), true)
    } else {
        (step, false)
    }
}

fn fire_arrow(id: EntityId, body: &Body, character: &mut Character, scene: &mut Scene) {
    let action_pos = character.ctrl.action_pos;
    let weapon = character.weapon_mut();
    let Some(speed) = weapon.as_bow().map(|bow| bow.projectile_speed) else {
        return;
    };
    weapon.last_use = body.age;
    let damage = weapon.damage;
    scene.play(AudioCue::Shoot);
    projectile::fire(
        scene,
        id,
        body.pos,
        (action_pos - body.pos).norm(),
        speed,
        damage,
    );
}

/// Exits the current state and enters `next`. Entering an action state with
/// the wrong weapon equipped is rejected and leaves the character untouched.
pub(crate) fn change_state(
    actor: &mut Actor<'_>,
    scene: &mut Scene,
    next: CharacterState,
) -> Result<(), SimError> {
    if let Some(required) = next.required_weapon() {
        let weapon = actor.character.weapon().name();
        if weapon != required {
            warn!(entity = actor.id.0, state = %next.name(), weapon = %weapon, "state_rejected");
            return Err(SimError::WeaponMismatch {
                state: next.name(),
                weapon,
            });
        }
    }

    let mut previous = mem::take(&mut actor.character.state);
    previous.exit(actor, scene);
    let mut next = next;
    next.enter(actor, scene);
    debug!(
        entity = actor.id.0,
        from = %previous.name(),
        to = %next.name(),
        "state_changed"
    );
    actor.character.state = next;
    actor.character.state_age = 0.0;
    Ok(())
}

pub(crate) fn update_state(
    actor: &mut Actor<'_>,
    scene: &mut Scene,
    dt: f32,
) -> Result<(), SimError> {
    actor.character.state_age += dt;
    let mut current = mem::take(&mut actor.character.state);
    let next = current.update(actor, scene, dt);
    actor.character.state = current;
    match next {
        Some(next) => change_state(actor, scene, next),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::character::{Character, EnemyClass};
    use crate::config::SimConfig;
    use crate::controller::Controller;
    use crate::entity::{Entity, EntityType};
    use crate::render::Color;
    use crate::weapon::WeaponName;

    const DT: f32 = 1.0 / 60.0;

    fn scene_with_player() -> (Scene, EntityId) {
        let mut scene = Scene::new(SimConfig::seeded(11));
        let player = scene.spawn_character(Vec2::new(300.0, 300.0), Character::player());
        (scene, player)
    }

    fn tick(scene: &mut Scene, input: Controller) {
        scene.update(DT, &input).expect("tick");
    }

    fn player(scene: &Scene, id: EntityId) -> (Body, Character) {
        let entity = scene.entity(id).expect("player");
        let character = entity.as_character().cloned().expect("character");
        (entity.body.clone(), character)
    }

    fn swing_right() -> Controller {
        Controller {
            action1: true,
            action_pos: Vec2::new(400.0, 300.0),
            ..Controller::idle()
        }
    }

    #[test]
    fn roll_turns_exactly_one_circle_for_any_step() {
        for dt in [1.0 / 144.0, DT, 1.0 / 30.0, 0.1, 0.3, 1.0] {
            let mut rotated = 0.0;
            let mut steps = 0;
            loop {
                let (step, completed) = roll_step(rotated, dt);
                rotated += step;
                steps += 1;
                if completed {
                    break;
                }
                assert!(steps < 10_000);
            }
            assert!((rotated - TWO_PI).abs() < 1e-4, "dt {dt} rotated {rotated}");
        }
    }

    #[test]
    fn roll_enters_spins_and_returns_to_idle() {
        let (mut scene, id) = scene_with_player();
        let moving = Controller {
            direction: Vec2::new(1.0, 0.0),
            ..Controller::idle()
        };
        tick(
            &mut scene,
            Controller {
                roll: true,
                ..moving
            },
        );
        let (body, character) = player(&scene, id);
        assert_eq!(character.state.name(), StateName::Roll);
        assert!(character.rolling);
        assert_eq!(character.stamina, 15.0);
        assert_eq!(body.speed_factor, ROLL_SPEED_FACTOR);

        let mut ticks = 0;
        while player(&scene, id).1.state.name() == StateName::Roll {
            tick(&mut scene, moving);
            ticks += 1;
            assert!(ticks <= 31, "roll did not finish");
        }
        let (body, character) = player(&scene, id);
        assert!(!character.rolling);
        assert_eq!(body.angle, 0.0);
        assert_eq!(body.speed_factor, 1.0);
        assert!(character.last_roll.is_some());
    }

    #[test]
    fn action_state_with_the_wrong_weapon_is_rejected() {
        let (mut scene, id) = scene_with_player();
        let result = scene.change_state(id, CharacterState::Shooting);
        assert!(matches!(
            result,
            Err(SimError::WeaponMismatch {
                state: StateName::Shooting,
                weapon: WeaponName::Sword,
            })
        ));
        assert_eq!(player(&scene, id).1.state, CharacterState::Idle);
    }

    #[test]
    fn attacking_spawns_a_hitbox_for_the_swing_only() {
        let (mut scene, id) = scene_with_player();
        scene.update(1.0, &swing_right()).expect("tick");
        assert_eq!(player(&scene, id).1.state.name(), StateName::Attacking);
        assert_eq!(scene.count(EntityType::HitBox), 1);
        assert!(player(&scene, id).1.weapon().active);

        for _ in 0..25 {
            tick(&mut scene, Controller::idle());
        }
        let (body, character) = player(&scene, id);
        assert_eq!(character.state, CharacterState::Idle);
        assert_eq!(scene.count(EntityType::HitBox), 0);
        assert!(!character.weapon().active);
        assert!(!character.lock_facing);
        let last_use = character.weapon().last_use;
        assert!(last_use > 1.3 && last_use < body.age);
    }

    #[test]
    fn single_shot_swing_hits_once() {
        let (mut scene, id) = scene_with_player();
        let enemy = scene.spawn_enemy(Vec2::new(345.0, 300.0), EnemyClass::Melee, 0, Color::ORANGE);
        scene.update(1.0, &swing_right()).expect("tick");

        let hitbox = scene
            .entities()
            .find(|entity| entity.entity_type() == EntityType::HitBox)
            .map(|entity| entity.id)
            .expect("swing hitbox");
        for _ in 0..20 {
            tick(&mut scene, Controller::idle());
        }

        let hp = scene.character(enemy).map(|character| character.hp);
        assert_eq!(hp, Some(7.0));
        let disabled = scene
            .entity(hitbox)
            .and_then(Entity::as_hitbox)
            .map(|hitbox| hitbox.disabled);
        assert_eq!(disabled, Some(true));
        assert_eq!(player(&scene, id).1.state.name(), StateName::Attacking);
    }

    #[test]
    fn blocking_swaps_defense_and_restores_it() {
        let (mut scene, id) = scene_with_player();
        if let Some(character) = scene.entity_mut(id).and_then(Entity::as_character_mut) {
            character.defense_factor = 0.5;
        }
        let block = Controller {
            equip3: true,
            action1: true,
            action_pos: Vec2::new(200.0, 300.0),
            ..Controller::idle()
        };
        scene.update(2.5, &block).expect("tick");
        let (body, character) = player(&scene, id);
        assert_eq!(character.state.name(), StateName::Blocking);
        assert_eq!(character.defense_factor, 1.0);
        assert_eq!(body.speed_factor, 0.3);

        scene.update(0.3, &block).expect("tick");
        assert_eq!(player(&scene, id).1.facing_dir, -1.0);
        tick(&mut scene, Controller::idle());
        let (body, character) = player(&scene, id);
        assert_eq!(character.state, CharacterState::Idle);
        assert_eq!(character.defense_factor, 0.5);
        assert_eq!(body.speed_factor, 1.0);
    }

    #[test]
    fn shooting_fires_while_held_and_refunds_cooldown() {
        let (mut scene, id) = scene_with_player();
        let shoot = Controller {
            equip2: true,
            ..swing_right()
        };
        scene.update(1.0, &shoot).expect("tick");
        assert_eq!(player(&scene, id).1.state.name(), StateName::Shooting);
        assert_eq!(player(&scene, id).0.speed_factor, SHOOTING_SPEED_FACTOR);

        tick(&mut scene, swing_right());
        assert_eq!(scene.count(EntityType::Projectile), 1);
        let fired_at = player(&scene, id).1.weapon().last_use;

        tick(&mut scene, Controller::idle());
        let (body, character) = player(&scene, id);
        assert_eq!(character.state, CharacterState::Idle);
        assert_eq!(body.speed_factor, 1.0);
        let refunded = fired_at - character.weapon().cool_down * SHOOT_COOLDOWN_REFUND;
        assert!((character.weapon().last_use - refunded).abs() < 1e-6);
    }
}
