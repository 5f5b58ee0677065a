//! Simulation core of a top-down arena brawler: entities, the character state
//! machine, hitbox collision and wave progression. Hosts drive it one tick at
//! a time through [`Session`] and draw it through [`RenderSurface`].

use thiserror::Error;

pub mod audio;
pub mod character;
pub mod config;
pub mod controller;
pub mod entity;
pub mod events;
pub mod hitbox;
pub mod indicator;
pub mod level;
pub mod math;
pub mod projectile;
pub mod render;
pub mod scene;
pub mod session;
pub mod state;
pub mod tuning;
pub mod weapon;

pub use audio::{AudioCue, AudioSink, SilentAudio};
pub use character::{Character, CharacterSnapshot, EnemyBrain, EnemyClass, Role};
pub use config::{EnemyCountStep, MapConfig, ProgressionConfig, SimConfig};
pub use controller::Controller;
pub use entity::{Body, Entity, EntityId, EntityKind, EntityType};
pub use events::{
    CharacterDamage, EventListener, GameStarted, SceneEvent, SceneEventCounts, SceneEventKind,
};
pub use hitbox::{HitBox, HitBoxKind};
pub use indicator::{IndicatorStyle, TextIndicator};
pub use level::{LevelManager, LevelState, LevelStateName};
pub use math::{Rect, Vec2};
pub use projectile::Projectile;
pub use render::{CircleShape, Color, ProgressBar, RectShape, RenderSurface, TextShape};
pub use scene::{Attacker, EntityCounts, Scene};
pub use session::Session;
pub use state::{CharacterState, StateName};
pub use weapon::{Weapon, WeaponKind, WeaponName};

#[derive(Debug, Error)]
pub enum SimError {
    #[error("cannot enter {state} while holding a {weapon}")]
    WeaponMismatch { state: StateName, weapon: WeaponName },
    #[error("entity {0:?} is not a character")]
    NotACharacter(EntityId),
    #[error("entity {0:?} is not in the scene")]
    UnknownEntity(EntityId),
}
