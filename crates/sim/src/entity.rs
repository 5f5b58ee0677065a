use crate::character::Character;
use crate::hitbox::HitBox;
use crate::indicator::TextIndicator;
use crate::math::{Rect, Vec2};
use crate::projectile::Projectile;

/// Handle into the scene's entity arena. Ids are never reused, so a handle to
/// a removed entity simply stops resolving.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EntityId(pub u64);

#[derive(Debug, Default)]
pub struct EntityIdAllocator {
    next: u64,
}

impl EntityIdAllocator {
    pub fn allocate(&mut self) -> EntityId {
        let id = EntityId(self.next);
        self.next = self.next.saturating_add(1);
        id
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityType {
    Entity,
    Projectile,
    HitBox,
    Enemy,
    Player,
}

pub(crate) const ENTITY_TYPE_COUNT: usize = 5;

impl EntityType {
    pub(crate) const fn index(self) -> usize {
        match self {
            EntityType::Entity => 0,
            EntityType::Projectile => 1,
            EntityType::HitBox => 2,
            EntityType::Enemy => 3,
            EntityType::Player => 4,
        }
    }
}

/// State shared by everything that lives in the scene.
#[derive(Debug, Clone, PartialEq)]
pub struct Body {
    pub alive: bool,
    /// Seconds since creation, frozen while the scene is paused.
    pub age: f32,
    /// Center point.
    pub pos: Vec2,
    pub move_dir: Vec2,
    pub base_speed: f32,
    pub speed_factor: f32,
    pub angle: f32,
    /// Solid bodies are visible to hitbox scans.
    pub solid: bool,
    pub size: Vec2,
    pub opacity: f32,
}

impl Body {
    pub fn new(pos: Vec2, size: Vec2) -> Self {
        Self {
            alive: true,
            age: 0.0,
            pos,
            move_dir: Vec2::ZERO,
            base_speed: 0.0,
            speed_factor: 1.0,
            angle: 0.0,
            solid: true,
            size,
            opacity: 1.0,
        }
    }

    pub fn rect(&self) -> Rect {
        Rect::from_center(self.pos, self.size)
    }

    /// `pos += move_dir * base_speed * speed_factor * dt`. Callers normalize
    /// `move_dir` first.
    pub fn integrate(&mut self, dt: f32) {
        let speed_scale = self.base_speed * self.speed_factor * dt;
        self.pos += self.move_dir.scale(speed_scale);
    }

    /// True once the bounds touch or cross any edge of a map spanning
    /// `(0, 0)..map_size`.
    pub fn is_out_of_map(&self, map_size: Vec2) -> bool {
        let half = self.size.scale(0.5);
        self.pos.x - half.x <= 0.0
            || self.pos.x + half.x >= map_size.x
            || self.pos.y - half.y <= 0.0
            || self.pos.y + half.y >= map_size.y
    }
}

#[derive(Debug, Clone)]
pub enum EntityKind {
    Character(Box<Character>),
    HitBox(HitBox),
    Projectile(Projectile),
    Indicator(TextIndicator),
}

#[derive(Debug, Clone)]
pub struct Entity {
    pub id: EntityId,
    pub body: Body,
    pub kind: EntityKind,
}

impl Entity {
    pub fn entity_type(&self) -> EntityType {
        match &self.kind {
            EntityKind::Character(character) if character.is_player() => EntityType::Player,
            EntityKind::Character(_) => EntityType::Enemy,
            EntityKind::HitBox(_) => EntityType::HitBox,
            EntityKind::Projectile(_) => EntityType::Projectile,
            EntityKind::Indicator(_) => EntityType::Entity,
        }
    }

    pub fn as_character(&self) -> Option<&Character> {
        match &self.kind {
            EntityKind::Character(character) => Some(character),
            _ => None,
        }
    }

    pub fn as_character_mut(&mut self) -> Option<&mut Character> {
        match &mut self.kind {
            EntityKind::Character(character) => Some(character),
            _ => None,
        }
    }

    pub fn as_projectile(&self) -> Option<&Projectile> {
        match &self.kind {
            EntityKind::Projectile(projectile) => Some(projectile),
            _ => None,
        }
    }

    pub fn as_hitbox(&self) -> Option<&HitBox> {
        match &self.kind {
            EntityKind::HitBox(hitbox) => Some(hitbox),
            _ => None,
        }
    }

    pub fn as_hitbox_mut(&mut self) -> Option<&mut HitBox> {
        match &mut self.kind {
            EntityKind::HitBox(hitbox) => Some(hitbox),
            _ => None,
        }
    }
}
