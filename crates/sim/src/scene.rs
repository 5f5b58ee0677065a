use std::collections::{BTreeMap, HashMap};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

use crate::audio::{AudioCue, AudioSink, SilentAudio};
use crate::character::{self, Character, EnemyClass};
use crate::config::SimConfig;
use crate::controller::Controller;
use crate::entity::{
    Body, Entity, EntityId, EntityIdAllocator, EntityKind, EntityType, ENTITY_TYPE_COUNT,
};
use crate::events::{
    CharacterDamage, EventBus, EventListener, SceneEvent, SceneEventCounts, SceneEventKind,
};
use crate::hitbox::{self, HitBox};
use crate::indicator::{self, TextIndicator};
use crate::math::Vec2;
use crate::projectile;
use crate::render::{self, Color, RenderSurface};
use crate::state::{self, Actor, CharacterState};
use crate::tuning::{INDICATOR_SPEED_PX, PROJECTILE_SIZE};
use crate::SimError;

/// Source of a hit, captured when the hit lands.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Attacker {
    pub id: EntityId,
    pub pos: Vec2,
    pub is_player: bool,
}

/// Live entity counts per type. Kept in step with registry membership.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EntityCounts {
    counts: [usize; ENTITY_TYPE_COUNT],
}

impl EntityCounts {
    pub fn get(&self, entity_type: EntityType) -> usize {
        self.counts[entity_type.index()]
    }

    fn increment(&mut self, entity_type: EntityType) {
        let slot = &mut self.counts[entity_type.index()];
        *slot = slot.saturating_add(1);
    }

    fn decrement(&mut self, entity_type: EntityType) {
        let slot = &mut self.counts[entity_type.index()];
        *slot = slot.saturating_sub(1);
    }
}

/// Entity registry of one game. Entities update in registration order; an
/// entity is taken out of the registry while it updates so it can mutate the
/// rest of the scene.
#[derive(Debug)]
pub struct Scene {
    allocator: EntityIdAllocator,
    entities: BTreeMap<EntityId, Entity>,
    /// Entities currently out for update, with their type.
    detached: HashMap<EntityId, EntityType>,
    counts: EntityCounts,
    config: SimConfig,
    tile_size: f32,
    paused: bool,
    debug: bool,
    rng: StdRng,
    events: EventBus,
    audio: Box<dyn AudioSink>,
}

impl Scene {
    pub fn new(config: SimConfig) -> Self {
        Self::with_audio(config, Box::new(SilentAudio))
    }

    pub fn with_audio(config: SimConfig, audio: Box<dyn AudioSink>) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            allocator: EntityIdAllocator::default(),
            entities: BTreeMap::new(),
            detached: HashMap::new(),
            counts: EntityCounts::default(),
            tile_size: config.map.tile_size,
            config,
            paused: false,
            debug: false,
            rng,
            events: EventBus::default(),
            audio,
        }
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn tile_size(&self) -> f32 {
        self.tile_size
    }

    /// Map extent in pixels.
    pub fn map_size(&self) -> Vec2 {
        self.config.map.tiles().scale(self.tile_size)
    }

    pub fn rng(&mut self) -> &mut StdRng {
        &mut self.rng
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn set_paused(&mut self, paused: bool) {
        self.paused = paused;
    }

    pub fn is_debug(&self) -> bool {
        self.debug
    }

    pub fn set_debug(&mut self, debug: bool) {
        self.debug = debug;
    }

    pub fn play(&mut self, cue: AudioCue) {
        self.audio.play(cue);
    }

    pub fn add_event_listener(&mut self, kind: SceneEventKind, listener: EventListener) {
        self.events.add_listener(kind, listener);
    }

    pub fn dispatch_event(&mut self, event: SceneEvent) {
        self.events.dispatch(event);
    }

    pub fn event_counts(&self) -> SceneEventCounts {
        self.events.last_tick_counts()
    }

    pub(crate) fn finish_tick(&mut self) {
        self.events.finish_tick_rollover();
    }

    pub fn spawn(&mut self, body: Body, kind: EntityKind) -> EntityId {
        self.spawn_with(|_| (body, kind))
    }

    /// Registers an entity whose construction needs its own id.
    pub fn spawn_with<F>(&mut self, build: F) -> EntityId
    where
        F: FnOnce(EntityId) -> (Body, EntityKind),
    {
        let id = self.allocator.allocate();
        let (body, kind) = build(id);
        let entity = Entity { id, body, kind };
        self.counts.increment(entity.entity_type());
        self.entities.insert(id, entity);
        id
    }

    pub fn spawn_character(&mut self, pos: Vec2, mut character: Character) -> EntityId {
        let body = character.body(pos, self.tile_size);
        let id = self.spawn(body, EntityKind::Character(Box::new(character)));
        debug!(entity = id.0, x = pos.x, y = pos.y, "character_spawned");
        id
    }

    /// Spawns an enemy leveled `level` times.
    pub fn spawn_enemy(
        &mut self,
        pos: Vec2,
        class: EnemyClass,
        level: u32,
        color: Color,
    ) -> EntityId {
        let mut enemy = Character::enemy(class, color);
        let mut body = enemy.body(pos, self.tile_size);
        let chance = self.config.progression.weapon_upgrade_chance;
        enemy.level_enemy(&mut body, level, chance, self.tile_size, &mut self.rng);
        let id = self.spawn(body, EntityKind::Character(Box::new(enemy)));
        debug!(entity = id.0, class = ?class, level, "enemy_spawned");
        id
    }

    pub fn spawn_hitbox(&mut self, pos: Vec2, size: Vec2, hitbox: HitBox) -> EntityId {
        let mut body = Body::new(pos, size);
        body.solid = hitbox.is_solid();
        self.spawn(body, EntityKind::HitBox(hitbox))
    }

    pub fn spawn_indicator(&mut self, pos: Vec2, indicator: TextIndicator) -> EntityId {
        let mut body = Body::new(pos, Vec2::ZERO);
        body.solid = false;
        body.move_dir = Vec2::new(0.0, -1.0);
        body.base_speed = INDICATOR_SPEED_PX;
        self.spawn(body, EntityKind::Indicator(indicator))
    }

    /// Fires a projectile from `owner` toward `dir` at `speed` tiles per second.
    pub fn spawn_projectile(
        &mut self,
        owner: EntityId,
        origin: Vec2,
        dir: Vec2,
        speed: f32,
        damage: f32,
    ) -> EntityId {
        projectile::fire(self, owner, origin, dir, speed, damage)
    }

    /// Removes an entity. Returns false when it was already gone, so a
    /// double removal never touches the counts.
    pub fn despawn(&mut self, id: EntityId) -> bool {
        let entity_type = match self.entities.remove(&id) {
            Some(entity) => entity.entity_type(),
            None => match self.detached.remove(&id) {
                Some(entity_type) => entity_type,
                None => return false,
            },
        };
        self.counts.decrement(entity_type);
        debug!(entity = id.0, kind = ?entity_type, "entity_despawned");
        true
    }

    fn detach(&mut self, id: EntityId) -> Option<Entity> {
        let entity = self.entities.remove(&id)?;
        self.detached.insert(id, entity.entity_type());
        Some(entity)
    }

    /// Puts a detached entity back unless it was despawned meanwhile.
    fn reattach(&mut self, entity: Entity) {
        if self.detached.remove(&entity.id).is_some() {
            self.entities.insert(entity.id, entity);
        }
    }

    pub fn entity(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(&id)
    }

    pub fn entity_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.entities.get_mut(&id)
    }

    pub fn character(&self, id: EntityId) -> Option<&Character> {
        self.entity(id).and_then(Entity::as_character)
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.entities.contains_key(&id) || self.detached.contains_key(&id)
    }

    /// Ids in registration order.
    pub fn ids(&self) -> Vec<EntityId> {
        self.entities.keys().copied().collect()
    }

    pub fn entities(&self) -> impl Iterator<Item = &Entity> {
        self.entities.values()
    }

    pub fn characters(&self) -> impl Iterator<Item = (&Body, &Character)> {
        self.entities
            .values()
            .filter_map(|entity| entity.as_character().map(|character| (&entity.body, character)))
    }

    pub fn count(&self, entity_type: EntityType) -> usize {
        self.counts.get(entity_type)
    }

    pub fn counts(&self) -> EntityCounts {
        self.counts
    }

    pub fn len(&self) -> usize {
        self.entities.len() + self.detached.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&mut self) {
        self.entities.clear();
        self.detached.clear();
        self.counts = EntityCounts::default();
    }

    /// Clears the scene but keeps `keep`, if it is registered.
    pub fn clear_except(&mut self, keep: EntityId) -> Option<&mut Entity> {
        let kept = self.entities.remove(&keep);
        self.clear();
        let entity = kept?;
        self.counts.increment(entity.entity_type());
        self.entities.insert(keep, entity);
        self.entities.get_mut(&keep)
    }

    /// Rescales the scene to a tile size `ratio` times the current one.
    pub fn resize(&mut self, ratio: f32) {
        self.tile_size *= ratio;
        let tile_size = self.tile_size;
        for entity in self.entities.values_mut() {
            let body = &mut entity.body;
            body.pos = body.pos.scale(ratio);
            match &mut entity.kind {
                EntityKind::Character(character) => character.resize(body, tile_size, ratio),
                EntityKind::Projectile(_) => {
                    body.size = Vec2::new(PROJECTILE_SIZE.y, PROJECTILE_SIZE.y).scale(tile_size);
                    body.base_speed *= ratio;
                }
                EntityKind::HitBox(_) => body.size = body.size.scale(ratio),
                EntityKind::Indicator(_) => {}
            }
        }
    }

    pub fn attacker(&self, id: EntityId) -> Option<Attacker> {
        self.entity(id).map(|entity| Attacker {
            id,
            pos: entity.body.pos,
            is_player: entity.entity_type() == EntityType::Player,
        })
    }

    /// Damage of the weapon `id` is holding.
    pub fn weapon_damage(&self, id: EntityId) -> Option<f32> {
        self.character(id).map(|character| character.weapon().damage)
    }

    /// Runs `f` against a character taken out of the registry.
    fn with_actor<T>(
        &mut self,
        id: EntityId,
        f: impl FnOnce(&mut Actor<'_>, &mut Scene) -> Result<T, SimError>,
    ) -> Result<T, SimError> {
        let mut entity = self.detach(id).ok_or(SimError::UnknownEntity(id))?;
        let result = match &mut entity.kind {
            EntityKind::Character(character) => f(
                &mut Actor {
                    id,
                    body: &mut entity.body,
                    character,
                },
                self,
            ),
            _ => Err(SimError::NotACharacter(id)),
        };
        self.reattach(entity);
        result
    }

    pub fn change_state(&mut self, id: EntityId, next: CharacterState) -> Result<(), SimError> {
        self.with_actor(id, |actor, scene| state::change_state(actor, scene, next))
    }

    /// Hits character `victim` for `amount`. Returns the damage dealt, `None`
    /// when the hit was absorbed by invulnerability or the victim was down.
    pub fn apply_damage(
        &mut self,
        victim: EntityId,
        amount: f32,
        attacker: Attacker,
    ) -> Result<Option<f32>, SimError> {
        let dealt = self.with_actor(victim, |actor, scene| {
            let dealt = actor.character.take_damage(actor.body, amount, attacker.pos);
            if let Some(dealt) = dealt {
                debug!(
                    entity = victim.0,
                    attacker = attacker.id.0,
                    amount = dealt,
                    hp = actor.character.hp,
                    "damage_applied"
                );
                scene.dispatch_event(SceneEvent::CharacterDamaged(CharacterDamage {
                    entity: victim,
                    amount: dealt,
                    pos: actor.body.pos,
                }));
                scene.spawn_indicator(actor.body.pos, TextIndicator::damage(dealt));
                scene.play(AudioCue::Damage);
            }

            let killed = actor.character.hp <= 0.0 && !actor.character.state.is_dying();
            if killed {
                state::change_state(actor, scene, CharacterState::Dying)?;
            }

            if attacker.id != victim {
                if let Some(brain) = actor.character.brain_mut() {
                    if attacker.is_player || scene.rng.gen::<f32>() > 0.9 {
                        brain.target = Some(attacker.id);
                    }
                }
            }
            Ok((dealt, killed))
        })?;

        let (dealt, killed) = dealt;
        if killed {
            if let Some(brain) = self
                .entity_mut(attacker.id)
                .and_then(Entity::as_character_mut)
                .and_then(Character::brain_mut)
            {
                if brain.target == Some(victim) {
                    brain.target = None;
                }
            }
        }
        Ok(dealt)
    }

    /// Updates every entity registered before this call, in registration
    /// order. Entities spawned meanwhile wait for the next tick.
    pub fn update(&mut self, dt: f32, player_input: &Controller) -> Result<(), SimError> {
        if self.paused {
            return Ok(());
        }
        for id in self.ids() {
            let Some(mut entity) = self.detach(id) else {
                continue;
            };
            let result = self.update_entity(&mut entity, dt, player_input);
            self.reattach(entity);
            result?;
        }
        Ok(())
    }

    fn update_entity(
        &mut self,
        entity: &mut Entity,
        dt: f32,
        player_input: &Controller,
    ) -> Result<(), SimError> {
        let Entity { id, body, kind } = entity;
        match kind {
            EntityKind::Character(character) => {
                character::update(*id, body, character, self, dt, player_input)
            }
            EntityKind::HitBox(hitbox) => hitbox::update(*id, body, hitbox, self, dt),
            EntityKind::Projectile(projectile) => projectile::update(*id, body, projectile, self, dt),
            EntityKind::Indicator(indicator) => {
                indicator::update(*id, body, indicator, self, dt);
                Ok(())
            }
        }
    }

    pub fn render(&self, surface: &mut dyn RenderSurface) {
        for entity in self.entities.values() {
            render::render_entity(entity, surface, self.tile_size, self.paused);
        }
        if self.debug {
            for entity in self.entities.values() {
                render::render_collision_box(&entity.body, surface);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::render::tests::RecordingSurface;

    fn scene() -> Scene {
        Scene::new(SimConfig::seeded(5))
    }

    fn idle_tick(scene: &mut Scene, dt: f32) {
        scene.update(dt, &Controller::idle()).expect("tick");
    }

    #[test]
    fn counts_follow_spawn_and_despawn() {
        let mut scene = scene();
        let a = scene.spawn_enemy(Vec2::new(100.0, 100.0), EnemyClass::Melee, 0, Color::ORANGE);
        let b = scene.spawn_enemy(Vec2::new(200.0, 100.0), EnemyClass::Archer, 0, Color::YELLOW);
        let player = scene.spawn_character(Vec2::new(300.0, 300.0), Character::player());
        assert_eq!(scene.count(EntityType::Enemy), 2);
        assert_eq!(scene.count(EntityType::Player), 1);

        assert!(scene.despawn(a));
        assert!(!scene.despawn(a));
        assert!(scene.despawn(b));
        assert_eq!(scene.count(EntityType::Enemy), 0);
        assert!(scene.contains(player));
        assert_eq!(scene.len(), 1);
    }

    #[test]
    fn paused_scene_freezes_ages() {
        let mut scene = scene();
        let id = scene.spawn_character(Vec2::new(300.0, 300.0), Character::player());
        scene.set_paused(true);
        idle_tick(&mut scene, 1.0);
        assert_eq!(scene.entity(id).map(|e| e.body.age), Some(0.0));

        scene.set_paused(false);
        idle_tick(&mut scene, 0.5);
        assert_eq!(scene.entity(id).map(|e| e.body.age), Some(0.5));
    }

    #[test]
    fn entities_spawned_during_a_tick_wait_for_the_next() {
        let mut scene = scene();
        let player = scene.spawn_character(Vec2::new(300.0, 300.0), Character::player());
        let input = Controller {
            action1: true,
            action_pos: Vec2::new(400.0, 300.0),
            ..Controller::idle()
        };
        scene.update(1.0, &input).expect("tick");

        let hitbox = scene
            .entities()
            .find(|e| e.entity_type() == EntityType::HitBox)
            .map(|e| (e.id, e.body.age))
            .expect("swing hitbox");
        assert!(hitbox.0 > player);
        assert_eq!(hitbox.1, 0.0);
    }

    #[test]
    fn damage_event_reaches_listener_and_spawns_indicator() {
        let mut scene = scene();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        scene.add_event_listener(
            SceneEventKind::CharacterDamaged,
            Box::new(move |event| {
                if let SceneEvent::CharacterDamaged(damage) = event {
                    sink.borrow_mut().push(damage.amount);
                }
            }),
        );
        let attacker = scene.spawn_character(Vec2::new(100.0, 300.0), Character::player());
        let victim = scene.spawn_character(Vec2::new(300.0, 300.0), Character::player());
        let source = scene.attacker(attacker).expect("attacker");

        let dealt = scene.apply_damage(victim, 7.0, source).expect("damage");
        assert_eq!(dealt, Some(7.0));
        assert_eq!(seen.borrow().as_slice(), &[7.0]);
        assert_eq!(scene.count(EntityType::Entity), 1);

        scene.finish_tick();
        assert_eq!(scene.event_counts().character_damaged, 1);
    }

    #[test]
    fn fatal_damage_starts_dying_and_removes_after_fade() {
        let mut scene = scene();
        let attacker = scene.spawn_character(Vec2::new(100.0, 300.0), Character::player());
        let victim = scene.spawn_enemy(Vec2::new(300.0, 300.0), EnemyClass::Melee, 0, Color::ORANGE);
        if let Some(character) = scene.entity_mut(victim).and_then(Entity::as_character_mut) {
            character.hp = 3.0;
        }
        let source = scene.attacker(attacker).expect("attacker");
        scene.apply_damage(victim, 7.0, source).expect("damage");

        let entity = scene.entity(victim).cloned().expect("victim");
        let character = entity.as_character().expect("character");
        assert_eq!(character.hp, 0.0);
        assert_eq!(character.state, CharacterState::Dying);
        assert!(!entity.body.alive);
        assert!(!entity.body.solid);
        assert_eq!(character.brain().and_then(|b| b.target), Some(attacker));

        for _ in 0..61 {
            idle_tick(&mut scene, 1.0 / 60.0);
        }
        assert!(scene.entity(victim).is_none());
        assert_eq!(scene.count(EntityType::Enemy), 0);
    }

    #[test]
    fn killer_forgets_its_dead_target() {
        let mut scene = scene();
        let victim = scene.spawn_character(Vec2::new(100.0, 300.0), Character::player());
        let killer = scene.spawn_enemy(Vec2::new(300.0, 300.0), EnemyClass::Melee, 0, Color::ORANGE);
        if let Some(brain) = scene
            .entity_mut(killer)
            .and_then(Entity::as_character_mut)
            .and_then(Character::brain_mut)
        {
            brain.target = Some(victim);
        }
        let source = scene.attacker(killer).expect("attacker");
        scene.apply_damage(victim, 50.0, source).expect("damage");

        let target = scene.character(killer).and_then(|c| c.brain()).and_then(|b| b.target);
        assert_eq!(target, None);
    }

    #[test]
    fn damaging_a_non_character_is_an_error() {
        let mut scene = scene();
        let indicator = scene.spawn_indicator(Vec2::new(10.0, 10.0), TextIndicator::dodged());
        let source = Attacker {
            id: EntityId(999),
            pos: Vec2::ZERO,
            is_player: false,
        };
        assert!(matches!(
            scene.apply_damage(indicator, 1.0, source),
            Err(SimError::NotACharacter(id)) if id == indicator
        ));
        assert!(scene.contains(indicator));
        assert!(matches!(
            scene.apply_damage(EntityId(999), 1.0, source),
            Err(SimError::UnknownEntity(_))
        ));
    }

    #[test]
    fn clear_except_keeps_one_entity_and_its_count() {
        let mut scene = scene();
        let player = scene.spawn_character(Vec2::new(300.0, 300.0), Character::player());
        scene.spawn_enemy(Vec2::new(100.0, 100.0), EnemyClass::Melee, 0, Color::ORANGE);
        scene.spawn_indicator(Vec2::new(10.0, 10.0), TextIndicator::dodged());

        assert!(scene.clear_except(player).is_some());
        assert_eq!(scene.len(), 1);
        assert_eq!(scene.count(EntityType::Player), 1);
        assert_eq!(scene.count(EntityType::Enemy), 0);
        assert_eq!(scene.count(EntityType::Entity), 0);
    }

    #[test]
    fn resize_scales_positions_and_bodies() {
        let mut scene = scene();
        let id = scene.spawn_character(Vec2::new(320.0, 160.0), Character::player());
        let before = scene.entity(id).map(|e| e.body.clone()).expect("body");
        scene.resize(0.5);

        let after = scene.entity(id).map(|e| e.body.clone()).expect("body");
        assert_eq!(scene.tile_size(), 16.0);
        assert_eq!(scene.map_size(), Vec2::new(512.0, 288.0));
        assert_eq!(after.pos, Vec2::new(160.0, 80.0));
        assert!((after.size.x - before.size.x * 0.5).abs() < 1e-4);
        assert_eq!(after.base_speed, before.base_speed * 0.5);
    }

    #[test]
    fn debug_render_adds_collision_boxes() {
        let mut scene = scene();
        scene.spawn_character(Vec2::new(300.0, 300.0), Character::player());
        let mut plain = RecordingSurface::default();
        scene.render(&mut plain);

        scene.set_debug(true);
        let mut debug = RecordingSurface::default();
        scene.render(&mut debug);
        assert_eq!(debug.rects, plain.rects + 1);
        assert_eq!(debug.circles, plain.circles + 1);
    }
}
