use std::collections::HashSet;

use tracing::debug;

use crate::entity::{Body, EntityId, EntityKind};
use crate::hitbox::{self, HitBox, ScanOutcome};
use crate::indicator::TextIndicator;
use crate::math::Vec2;
use crate::scene::{Attacker, Scene};
use crate::tuning::{PROJECTILE_FADE_PER_SECOND, PROJECTILE_MAX_ATTACHMENT_SECONDS, PROJECTILE_SIZE};
use crate::SimError;

#[derive(Debug, Clone, PartialEq)]
pub struct Projectile {
    /// Current owner. Changes when a swing deflects the projectile.
    pub owner: EntityId,
    /// Character that fired it.
    pub og_owner: EntityId,
    pub damage: f32,
    pub ignored: HashSet<EntityId>,
    /// Collision probe while in flight.
    pub hitbox: Option<EntityId>,
    pub attached_to: Option<EntityId>,
    pub attached_at: f32,
    pub attach_offset: Vec2,
    pub max_attachment_age: f32,
}

impl Projectile {
    fn deflect(&mut self, body: &mut Body, dir: Vec2) {
        self.damage *= 2.0;
        body.move_dir = dir;
        body.angle = dir.angle();
    }

    fn attach(&mut self, body: &Body, scene: &mut Scene, target: EntityId, target_pos: Vec2) {
        self.attached_to = Some(target);
        self.attached_at = body.age;
        self.attach_offset = body.pos - target_pos;
        if let Some(hitbox) = self.hitbox.take() {
            scene.despawn(hitbox);
        }
    }

    /// Resolves one overlap found by the probe. Returns whether the probe keeps
    /// scanning.
    fn on_collision(
        &mut self,
        id: EntityId,
        body: &mut Body,
        scene: &mut Scene,
        other: EntityId,
    ) -> Result<bool, SimError> {
        if !self.ignored.insert(other) {
            return Ok(true);
        }
        let Some(contact) = scene.entity(other).map(|entity| match &entity.kind {
            EntityKind::Projectile(projectile) => Contact::Projectile {
                attached: projectile.attached_to.is_some(),
            },
            EntityKind::HitBox(hitbox) => Contact::HitBox { owner: hitbox.owner },
            EntityKind::Character(character) => Contact::Character {
                rolling: character.rolling,
                pos: entity.body.pos,
            },
            EntityKind::Indicator(_) => Contact::Other {
                pos: entity.body.pos,
            },
        }) else {
            return Ok(true);
        };

        match contact {
            Contact::Projectile { attached: true } => Ok(true),
            Contact::Projectile { attached: false } => {
                scene.spawn_indicator(body.pos, TextIndicator::deflected());
                if let Some(entity) = scene.entity_mut(other) {
                    let other_body = &mut entity.body;
                    if let EntityKind::Projectile(projectile) = &mut entity.kind {
                        projectile.ignored.insert(id);
                        projectile.deflect(other_body, Vec2::new(0.0, -1.0));
                    }
                }
                self.deflect(body, Vec2::new(0.0, 1.0));
                debug!(projectile = id.0, other = other.0, damage = self.damage, "projectiles_collided");
                Ok(false)
            }
            Contact::HitBox { owner } => {
                scene.spawn_indicator(body.pos, TextIndicator::deflected());
                self.ignored.remove(&self.owner);
                self.owner = owner;
                self.deflect(body, Vec2::new(0.0, 1.0));
                debug!(projectile = id.0, owner = owner.0, damage = self.damage, "projectile_deflected");
                Ok(true)
            }
            Contact::Character { rolling: true, .. } => {
                scene.spawn_indicator(body.pos, TextIndicator::dodged());
                debug!(projectile = id.0, entity = other.0, "projectile_dodged");
                Ok(true)
            }
            Contact::Character { rolling: false, pos } => {
                if other == self.og_owner {
                    debug!(projectile = id.0, entity = other.0, "return_to_sender");
                }
                let attacker = scene.attacker(self.owner).unwrap_or(Attacker {
                    id: self.owner,
                    pos: body.pos,
                    is_player: false,
                });
                scene.apply_damage(other, self.damage, attacker)?;
                self.attach(body, scene, other, pos);
                Ok(false)
            }
            Contact::Other { pos } => {
                self.attach(body, scene, other, pos);
                Ok(false)
            }
        }
    }
}

enum Contact {
    Projectile { attached: bool },
    HitBox { owner: EntityId },
    Character { rolling: bool, pos: Vec2 },
    Other { pos: Vec2 },
}

/// Spawns a projectile from `origin` travelling along `dir` at `speed` tiles
/// per second, together with its collision probe.
pub(crate) fn fire(
    scene: &mut Scene,
    owner: EntityId,
    origin: Vec2,
    dir: Vec2,
    speed: f32,
    damage: f32,
) -> EntityId {
    let tile_size = scene.tile_size();
    let collision_size = Vec2::new(PROJECTILE_SIZE.y, PROJECTILE_SIZE.y).scale(tile_size);
    let projectile_id = scene.spawn_with(|id| {
        let mut body = Body::new(origin, collision_size);
        body.move_dir = dir;
        body.base_speed = speed * tile_size;
        body.angle = dir.angle();
        let projectile = Projectile {
            owner,
            og_owner: owner,
            damage,
            ignored: HashSet::from([owner, id]),
            hitbox: None,
            attached_to: None,
            attached_at: 0.0,
            attach_offset: Vec2::ZERO,
            max_attachment_age: PROJECTILE_MAX_ATTACHMENT_SECONDS,
        };
        (body, EntityKind::Projectile(projectile))
    });
    let probe = scene.spawn_hitbox(origin, collision_size, HitBox::projectile_probe(projectile_id));
    if let Some(EntityKind::Projectile(projectile)) =
        scene.entity_mut(projectile_id).map(|entity| &mut entity.kind)
    {
        projectile.hitbox = Some(probe);
    }
    projectile_id
}

pub(crate) fn update(
    id: EntityId,
    body: &mut Body,
    projectile: &mut Projectile,
    scene: &mut Scene,
    dt: f32,
) -> Result<(), SimError> {
    body.age += dt;

    if let Some(target) = projectile.attached_to {
        let target_pos = scene
            .entity(target)
            .filter(|entity| entity.body.alive)
            .map(|entity| entity.body.pos);
        match target_pos {
            Some(pos) if body.age - projectile.attached_at <= projectile.max_attachment_age => {
                body.pos = pos + projectile.attach_offset;
            }
            _ => remove(id, body, scene),
        }
        return Ok(());
    }

    if let Some(probe_id) = projectile.hitbox {
        body.integrate(dt);
        if body.is_out_of_map(scene.map_size()) {
            scene.despawn(probe_id);
            projectile.hitbox = None;
            remove(id, body, scene);
            return Ok(());
        }

        let probe = scene.entity_mut(probe_id).and_then(|entity| {
            entity.body.pos = body.pos;
            let enabled = entity.as_hitbox().is_some_and(|hitbox| !hitbox.disabled);
            enabled.then(|| entity.body.rect())
        });
        let Some(probe) = probe else {
            return Ok(());
        };

        let mut failure = None;
        let outcome = hitbox::scan(scene, probe_id, probe, id, |scene, other| {
            match projectile.on_collision(id, body, scene, other) {
                Ok(keep_scanning) => keep_scanning,
                Err(err) => {
                    failure = Some(err);
                    false
                }
            }
        });
        if outcome == ScanOutcome::Disabled {
            if let Some(hitbox) = scene.entity_mut(probe_id).and_then(|entity| entity.as_hitbox_mut()) {
                hitbox.disabled = true;
            }
        }
        return match failure {
            Some(err) => Err(err),
            None => Ok(()),
        };
    }

    body.opacity -= dt * PROJECTILE_FADE_PER_SECOND;
    if body.opacity <= 0.0 {
        remove(id, body, scene);
    }
    Ok(())
}

fn remove(id: EntityId, body: &mut Body, scene: &mut Scene) {
    body.alive = false;
    scene.despawn(id);
}
