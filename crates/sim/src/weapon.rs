use std::fmt;

use crate::math::Vec2;
use crate::tuning::{
    BOW_COOLDOWN, BOW_DAMAGE, BOW_PROJECTILE_SPEED, BOW_REACH, BOW_SIZE, MAX_LEVEL,
    SHIELD_COOLDOWN, SHIELD_DEFENSE_FACTOR, SHIELD_SIZE, SHIELD_SPEED_FACTOR, SWORD_ARC,
    SWORD_ATTACK_SECONDS, SWORD_COOLDOWN, SWORD_DAMAGE, SWORD_SIZE, SWORD_SIZE_FACTOR,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WeaponName {
    Sword,
    Bow,
    Shield,
}

impl fmt::Display for WeaponName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            WeaponName::Sword => "Sword",
            WeaponName::Bow => "Bow",
            WeaponName::Shield => "Shield",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Sword {
    pub auto_swing: bool,
    pub multi_shot: bool,
    /// Full swing arc in radians.
    pub max_angle: f32,
    pub attack_duration: f32,
    pub size_factor: f32,
    /// `(start, end)` angles of the swing in progress.
    pub swing_range: (f32, f32),
    pub swing_dir: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Bow {
    /// Tiles per second.
    pub projectile_speed: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Shield {
    pub speed_factor: f32,
    pub defense_factor: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub enum WeaponKind {
    Sword(Sword),
    Bow(Bow),
    Shield(Shield),
}

/// An inventory slot owned by exactly one character. The owning character's
/// state drives `active` and the geometry fields.
#[derive(Debug, Clone, PartialEq)]
pub struct Weapon {
    pub level: u32,
    pub damage: f32,
    pub cool_down: f32,
    /// Owner age at the last use.
    pub last_use: f32,
    pub active: bool,
    pub offset: Vec2,
    pub offset_angle: f32,
    pub angle: f32,
    pub kind: WeaponKind,
}

impl Weapon {
    fn with_kind(damage: f32, cool_down: f32, kind: WeaponKind) -> Self {
        Self {
            level: 0,
            damage,
            cool_down,
            last_use: 0.0,
            active: false,
            offset: Vec2::ZERO,
            offset_angle: 0.0,
            angle: 0.0,
            kind,
        }
    }

    pub fn sword() -> Self {
        Self::with_kind(
            SWORD_DAMAGE.start,
            SWORD_COOLDOWN,
            WeaponKind::Sword(Sword {
                auto_swing: false,
                multi_shot: false,
                max_angle: SWORD_ARC.start,
                attack_duration: SWORD_ATTACK_SECONDS,
                size_factor: SWORD_SIZE_FACTOR.start,
                swing_range: (0.0, 0.0),
                swing_dir: 1.0,
            }),
        )
    }

    pub fn bow() -> Self {
        Self::with_kind(
            BOW_DAMAGE.start,
            BOW_COOLDOWN.start,
            WeaponKind::Bow(Bow {
                projectile_speed: BOW_PROJECTILE_SPEED.start,
            }),
        )
    }

    pub fn shield() -> Self {
        Self::with_kind(
            0.0,
            SHIELD_COOLDOWN,
            WeaponKind::Shield(Shield {
                speed_factor: SHIELD_SPEED_FACTOR.start,
                defense_factor: SHIELD_DEFENSE_FACTOR.start,
            }),
        )
    }

    /// Sword, bow and shield, in hotbar order.
    pub fn loadout() -> Vec<Weapon> {
        vec![Self::sword(), Self::bow(), Self::shield()]
    }

    pub fn name(&self) -> WeaponName {
        match self.kind {
            WeaponKind::Sword(_) => WeaponName::Sword,
            WeaponKind::Bow(_) => WeaponName::Bow,
            WeaponKind::Shield(_) => WeaponName::Shield,
        }
    }

    pub fn as_sword(&self) -> Option<&Sword> {
        match &self.kind {
            WeaponKind::Sword(sword) => Some(sword),
            _ => None,
        }
    }

    pub fn as_sword_mut(&mut self) -> Option<&mut Sword> {
        match &mut self.kind {
            WeaponKind::Sword(sword) => Some(sword),
            _ => None,
        }
    }

    pub fn as_bow(&self) -> Option<&Bow> {
        match &self.kind {
            WeaponKind::Bow(bow) => Some(bow),
            _ => None,
        }
    }

    pub fn as_bow_mut(&mut self) -> Option<&mut Bow> {
        match &mut self.kind {
            WeaponKind::Bow(bow) => Some(bow),
            _ => None,
        }
    }

    pub fn as_shield(&self) -> Option<&Shield> {
        match &self.kind {
            WeaponKind::Shield(shield) => Some(shield),
            _ => None,
        }
    }

    pub fn can_use(&self, owner_age: f32) -> bool {
        self.last_use + self.cool_down < owner_age
    }

    /// Size in pixels for the given tile size.
    pub fn size(&self, tile_size: f32) -> Vec2 {
        match &self.kind {
            WeaponKind::Sword(sword) => SWORD_SIZE.scale(tile_size * sword.size_factor),
            WeaponKind::Bow(_) => BOW_SIZE.scale(tile_size),
            WeaponKind::Shield(_) => SHIELD_SIZE.scale(tile_size),
        }
    }

    /// Distance in pixels from the owner's center the weapon can affect.
    pub fn reach(&self, tile_size: f32) -> f32 {
        match &self.kind {
            WeaponKind::Sword(_) => self.offset.y.abs() + self.size(tile_size).y,
            WeaponKind::Bow(_) => BOW_REACH * tile_size,
            WeaponKind::Shield(_) => 0.0,
        }
    }

    pub fn upgrade(&mut self) {
        self.level += 1;
        let progress = self.level as f32 / MAX_LEVEL;
        match &mut self.kind {
            WeaponKind::Sword(sword) => {
                sword.multi_shot = progress >= 0.5;
                sword.auto_swing = progress >= 1.0;
                if progress < 1.0 {
                    self.damage = SWORD_DAMAGE.at(progress).round();
                    sword.max_angle = SWORD_ARC.at(progress);
                    sword.size_factor = SWORD_SIZE_FACTOR.at(progress);
                } else {
                    self.damage += 0.25;
                }
            }
            WeaponKind::Bow(bow) => {
                if progress <= 1.0 {
                    self.damage = BOW_DAMAGE.at(progress).round();
                    bow.projectile_speed = BOW_PROJECTILE_SPEED.at(progress);
                    self.cool_down = BOW_COOLDOWN.at(progress);
                } else {
                    bow.projectile_speed += 2.5;
                    self.damage += 0.25;
                }
            }
            WeaponKind::Shield(shield) => {
                shield.speed_factor = SHIELD_SPEED_FACTOR.at(progress).max(1.0);
                if progress < 1.0 {
                    shield.defense_factor = SHIELD_DEFENSE_FACTOR.at(progress);
                }
            }
        }
    }

    /// Drops the geometry a state applied while the weapon was in use.
    pub(crate) fn stow(&mut self) {
        self.active = false;
        self.offset = Vec2::ZERO;
        self.offset_angle = 0.0;
        self.angle = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cooldown_gates_use_strictly() {
        let mut sword = Weapon::sword();
        sword.last_use = 1.0;
        assert!(!sword.can_use(1.0 + SWORD_COOLDOWN));
        assert!(sword.can_use(1.0 + SWORD_COOLDOWN + 0.01));
    }

    #[test]
    fn sword_gains_multi_shot_then_auto_swing() {
        let mut sword = Weapon::sword();
        sword.upgrade();
        assert_eq!(sword.damage, 5.0);
        assert!(!sword.as_sword().is_some_and(|s| s.multi_shot));

        sword.upgrade();
        assert!(sword.as_sword().is_some_and(|s| s.multi_shot && !s.auto_swing));

        sword.upgrade();
        sword.upgrade();
        let damage_at_max = sword.damage;
        assert!(sword.as_sword().is_some_and(|s| s.auto_swing));
        assert_eq!(damage_at_max, 8.0 + 0.25);
    }

    #[test]
    fn bow_upgrade_follows_curves_then_adds_speed() {
        let mut bow = Weapon::bow();
        for _ in 0..4 {
            bow.upgrade();
        }
        assert_eq!(bow.damage, 6.0);
        assert_eq!(bow.cool_down, 0.5);
        assert_eq!(bow.as_bow().map(|b| b.projectile_speed), Some(35.0));

        bow.upgrade();
        assert_eq!(bow.damage, 6.25);
        assert_eq!(bow.as_bow().map(|b| b.projectile_speed), Some(37.5));
    }

    #[test]
    fn shield_defense_grows_and_stops_slowing() {
        let mut shield = Weapon::shield();
        assert_eq!(shield.as_shield().map(|s| s.speed_factor), Some(0.3));
        shield.upgrade();
        let stats = shield.as_shield().cloned().expect("shield");
        assert_eq!(stats.speed_factor, 1.0);
        assert_eq!(stats.defense_factor, 1.75);
    }

    #[test]
    fn reach_depends_on_kind() {
        let tile = 32.0;
        assert_eq!(Weapon::bow().reach(tile), 200.0);
        assert_eq!(Weapon::shield().reach(tile), 0.0);
        assert!((Weapon::sword().reach(tile) - 40.0).abs() < 1e-4);
    }
}
