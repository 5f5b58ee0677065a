use std::collections::HashSet;

use tracing::debug;

use crate::entity::{Body, EntityId};
use crate::indicator::TextIndicator;
use crate::math::Rect;
use crate::scene::Scene;
use crate::SimError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HitBoxKind {
    /// Blade sweep of an Attacking character. Scans on its own turn.
    Swing(SwingStrike),
    /// Collision probe of an in-flight projectile. The projectile drives the
    /// scan, so the probe does nothing on its own turn.
    ProjectileProbe,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwingStrike {
    pub multi_shot: bool,
    /// Characters already hit or dodged during the current swing.
    pub struck: HashSet<EntityId>,
}

impl SwingStrike {
    pub fn new(multi_shot: bool) -> Self {
        Self {
            multi_shot,
            struck: HashSet::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HitBox {
    /// Entity the probe never collides with.
    pub owner: EntityId,
    /// Set once a collision callback asks to stop. Never cleared.
    pub disabled: bool,
    pub kind: HitBoxKind,
}

impl HitBox {
    pub fn swing(owner: EntityId, multi_shot: bool) -> Self {
        Self {
            owner,
            disabled: false,
            kind: HitBoxKind::Swing(SwingStrike::new(multi_shot)),
        }
    }

    pub fn projectile_probe(owner: EntityId) -> Self {
        Self {
            owner,
            disabled: false,
            kind: HitBoxKind::ProjectileProbe,
        }
    }

    /// Swing boxes are solid so in-flight projectiles can be deflected by them.
    pub fn is_solid(&self) -> bool {
        matches!(self.kind, HitBoxKind::Swing(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ScanOutcome {
    Active,
    Disabled,
}

/// Runs `on_collision` for every solid entity overlapping `probe`, in
/// registration order, skipping the probe itself and its owner. Stops at the
/// first callback that returns `false`.
pub(crate) fn scan<F>(
    scene: &mut Scene,
    probe_id: EntityId,
    probe: Rect,
    owner: EntityId,
    mut on_collision: F,
) -> ScanOutcome
where
    F: FnMut(&mut Scene, EntityId) -> bool,
{
    for other in scene.ids() {
        if other == probe_id || other == owner {
            continue;
        }
        let overlapping = scene
            .entity(other)
            .is_some_and(|entity| entity.body.solid && probe.overlaps(&entity.body.rect()));
        if !overlapping {
            continue;
        }
        if !on_collision(scene, other) {
            return ScanOutcome::Disabled;
        }
    }
    ScanOutcome::Active
}

pub(crate) fn update(
    id: EntityId,
    body: &mut Body,
    hitbox: &mut HitBox,
    scene: &mut Scene,
    dt: f32,
) -> Result<(), SimError> {
    body.age += dt;
    if hitbox.disabled {
        return Ok(());
    }
    let owner = hitbox.owner;
    let HitBoxKind::Swing(strike) = &mut hitbox.kind else {
        return Ok(());
    };

    let mut failure = None;
    let outcome = scan(scene, id, body.rect(), owner, |scene, other| {
        match strike_target(scene, strike, owner, other) {
            Ok(keep_scanning) => keep_scanning,
            Err(err) => {
                failure = Some(err);
                false
            }
        }
    });
    if outcome == ScanOutcome::Disabled {
        hitbox.disabled = true;
    }
    match failure {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

fn strike_target(
    scene: &mut Scene,
    strike: &mut SwingStrike,
    owner: EntityId,
    target: EntityId,
) -> Result<bool, SimError> {
    let rolling = match scene.entity(target).and_then(|entity| entity.as_character()) {
        Some(character) => character.rolling,
        None => return Ok(true),
    };
    if !strike.struck.insert(target) {
        return Ok(true);
    }

    let Some(attacker) = scene.attacker(owner) else {
        return Ok(true);
    };
    if rolling {
        debug!(entity = target.0, attacker = owner.0, "swing_dodged");
        scene.spawn_indicator(attacker.pos, TextIndicator::dodged());
    } else {
        let damage = scene.weapon_damage(owner).unwrap_or_default();
        scene.apply_damage(target, damage, attacker)?;
    }
    Ok(strike.multi_shot)
}
