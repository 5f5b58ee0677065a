//! Geometry handed to the host's drawing surface. The core computes world
//! positions, angles and opacities; the surface owns every pixel.

use std::f32::consts::PI;

use serde::{Deserialize, Serialize};

use crate::character::Character;
use crate::entity::{Body, Entity, EntityKind};
use crate::math::{lerp, lerp_min_max_min, Vec2};
use crate::tuning::{
    ARMS_IDX, BODY_IDX, HEAD_IDX, INVULNERABILITY_SECONDS, LEGS_IDX, PROJECTILE_SIZE,
};
use crate::weapon::{Weapon, WeaponKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    pub const WHITE: Color = Color::rgb(255, 255, 255);
    pub const BLACK: Color = Color::rgb(0, 0, 0);
    pub const RED: Color = Color::rgb(255, 0, 0);
    pub const GREEN: Color = Color::rgb(0, 128, 0);
    pub const GREY: Color = Color::rgb(128, 128, 128);
    pub const LIGHT_GREEN: Color = Color::rgb(144, 238, 144);
    pub const BROWN: Color = Color::rgb(165, 42, 42);
    pub const LIME: Color = Color::rgb(0, 255, 0);
    pub const SWORD: Color = Color::rgb(192, 192, 210);
    pub const SHIELD: Color = Color::rgb(139, 90, 43);
    pub const PROJECTILE: Color = Color::rgb(222, 184, 135);
    pub const ORANGE: Color = Color::rgb(255, 165, 0);
    pub const YELLOW: Color = Color::rgb(255, 255, 0);
    pub const SALMON: Color = Color::rgb(250, 128, 114);
    pub const LIGHT_BLUE: Color = Color::rgb(173, 216, 230);
}

/// Palette wave enemies are painted from.
pub const ENEMY_COLORS: [Color; 4] = [Color::ORANGE, Color::YELLOW, Color::SALMON, Color::LIGHT_BLUE];
pub const BOSS_COLOR: Color = Color::BLACK;
pub const PLAYER_COLOR: Color = Color::WHITE;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RectShape {
    pub center: Vec2,
    pub size: Vec2,
    pub angle: f32,
    pub fill: Option<Color>,
    pub stroke: Option<Color>,
    pub stroke_width: f32,
    pub opacity: f32,
}

impl RectShape {
    fn filled(center: Vec2, size: Vec2, angle: f32, fill: Color, opacity: f32) -> Self {
        Self {
            center,
            size,
            angle,
            fill: Some(fill),
            stroke: Some(Color::BLACK),
            stroke_width: 0.5,
            opacity,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CircleShape {
    pub center: Vec2,
    pub radius: f32,
    pub fill: Option<Color>,
    pub stroke: Option<Color>,
    pub opacity: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProgressBar {
    pub center: Vec2,
    pub size: Vec2,
    /// Filled fraction in `[0, 1]`.
    pub progress: f32,
    pub color: Color,
    pub opacity: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextShape<'a> {
    pub text: &'a str,
    pub pos: Vec2,
    /// Font size in pixels.
    pub size: f32,
    pub fill: Option<Color>,
    pub stroke: Option<Color>,
    pub opacity: f32,
}

pub trait RenderSurface {
    fn rect(&mut self, shape: &RectShape);
    fn circle(&mut self, shape: &CircleShape);
    fn progress_bar(&mut self, bar: &ProgressBar);
    fn text(&mut self, text: &TextShape<'_>);
}

/// Local frame of an entity: a point rotated by `angle` around `origin`.
#[derive(Debug, Clone, Copy)]
struct Frame {
    origin: Vec2,
    angle: f32,
}

impl Frame {
    fn to_world(self, local: Vec2) -> Vec2 {
        self.origin + local.rotate(self.angle)
    }
}

pub(crate) fn render_entity(
    entity: &Entity,
    surface: &mut dyn RenderSurface,
    tile_size: f32,
    paused: bool,
) {
    match &entity.kind {
        EntityKind::Character(character) => {
            render_character(&entity.body, character, surface, tile_size, paused)
        }
        EntityKind::Projectile(_) => render_projectile(&entity.body, surface, tile_size),
        EntityKind::Indicator(indicator) => {
            crate::indicator::render(&entity.body, indicator, surface)
        }
        EntityKind::HitBox(_) => {}
    }
}

pub(crate) fn render_collision_box(body: &Body, surface: &mut dyn RenderSurface) {
    if !body.solid {
        return;
    }
    surface.rect(&RectShape {
        center: body.pos,
        size: body.size,
        angle: 0.0,
        fill: None,
        stroke: Some(Color::RED),
        stroke_width: 1.0,
        opacity: 1.0,
    });
    surface.circle(&CircleShape {
        center: body.pos,
        radius: 2.0,
        fill: Some(Color::RED),
        stroke: None,
        opacity: 1.0,
    });
}

fn render_projectile(body: &Body, surface: &mut dyn RenderSurface, tile_size: f32) {
    surface.rect(&RectShape {
        center: body.pos,
        size: PROJECTILE_SIZE.scale(tile_size),
        angle: body.angle,
        fill: Some(Color::PROJECTILE),
        stroke: Some(Color::BLACK),
        stroke_width: 0.25,
        opacity: body.opacity.max(0.0),
    });
}

fn render_character(
    body: &Body,
    character: &Character,
    surface: &mut dyn RenderSurface,
    tile_size: f32,
    paused: bool,
) {
    let opacity = body.opacity;
    if character.hp > 0.0 {
        render_status_bars(body, character, surface, tile_size);
    }

    let frame = Frame {
        origin: body.pos,
        angle: body.angle,
    };
    let parts = &character.part_sizes;
    let torso = parts[BODY_IDX];

    let arm = parts[ARMS_IDX];
    let arm_offset = lerp_min_max_min(3.0, 8.0, (body.age % 2.0) / 2.0);
    for side in [-1.0, 1.0] {
        let local = Vec2::new(
            side * (torso.x / 1.5 - arm.x * 0.5),
            -torso.y * 0.5 + arm.y * 0.5 + arm_offset,
        );
        surface.rect(&RectShape::filled(
            frame.to_world(local),
            arm,
            body.angle - side * PI / 8.0,
            Color::GREY,
            opacity,
        ));
    }

    surface.rect(&RectShape::filled(
        body.pos,
        torso,
        body.angle,
        character.color,
        opacity,
    ));
    let level_text = character.total_level().to_string();
    surface.text(&TextShape {
        text: &level_text,
        pos: body.pos,
        size: torso.x * 0.5,
        fill: Some(if character.color == Color::BLACK {
            Color::RED
        } else {
            Color::BLACK
        }),
        stroke: None,
        opacity,
    });
    let recently_hit = character
        .last_damage
        .is_some_and(|at| body.age - at < INVULNERABILITY_SECONDS);
    if body.age > 1.0 && recently_hit {
        surface.rect(&RectShape {
            center: body.pos,
            size: torso,
            angle: body.angle,
            fill: Some(Color::RED),
            stroke: None,
            stroke_width: 0.0,
            opacity: opacity * 0.5,
        });
    }

    let head = parts[HEAD_IDX];
    let head_drop = if character.rolling { head.y * 0.5 } else { 0.0 };
    surface.rect(&RectShape::filled(
        frame.to_world(Vec2::new(0.0, -torso.y * 0.5 - head.y * 0.5 + head_drop)),
        head,
        body.angle,
        Color::GREY,
        opacity,
    ));

    let leg = parts[LEGS_IDX];
    let max_leg_offset = 4.0;
    let stride = if body.speed_factor > 0.0 {
        0.55 / body.speed_factor
    } else {
        0.55
    };
    let move_legs = !character.is_idle(body) && !character.rolling && !paused;
    let leg_offset = if move_legs {
        lerp_min_max_min(0.0, max_leg_offset, (body.age % stride) / stride)
    } else {
        0.0
    };
    let leg_lift = if character.rolling { leg.y * 0.5 } else { 0.0 };
    let leg_x = torso.x * 0.5 - (leg.x - leg.y).abs() * 0.25 - leg.x * 0.5;
    for (side, offset) in [(-1.0, leg_offset), (1.0, max_leg_offset - leg_offset)] {
        let offset = if move_legs { offset } else { 0.0 };
        let local = Vec2::new(side * leg_x, torso.y * 0.5 + leg.y * 0.5 - offset - leg_lift);
        surface.rect(&RectShape::filled(
            frame.to_world(local),
            leg,
            body.angle,
            Color::GREY,
            opacity,
        ));
    }

    let weapon = character.weapon();
    if weapon.active {
        render_weapon(weapon, frame, surface, tile_size, opacity);
    }
}

fn render_status_bars(
    body: &Body,
    character: &Character,
    surface: &mut dyn RenderSurface,
    tile_size: f32,
) {
    let bar = Vec2::new(body.size.x, tile_size * 0.15);
    let mut center = Vec2::new(body.pos.x, body.pos.y + body.size.y * 0.5 + bar.y * 2.0);
    let stamina = character.stamina / character.max_stamina;
    if stamina < 1.0 {
        surface.progress_bar(&ProgressBar {
            center,
            size: bar,
            progress: stamina.clamp(0.0, 1.0),
            color: Color::GREEN,
            opacity: 0.8 * body.opacity,
        });
    }
    let health = character.hp / character.max_hp;
    if health < 1.0 {
        center.y += bar.y * 1.5;
        surface.progress_bar(&ProgressBar {
            center,
            size: bar,
            progress: health.clamp(0.0, 1.0),
            color: Color::RED,
            opacity: 0.8 * body.opacity,
        });
    }
}

fn render_weapon(
    weapon: &Weapon,
    frame: Frame,
    surface: &mut dyn RenderSurface,
    tile_size: f32,
    opacity: f32,
) {
    let size = weapon.size(tile_size);
    match &weapon.kind {
        WeaponKind::Sword(sword) => {
            let blade = weapon.offset + Vec2::new(0.0, -size.y * 0.5);
            let steps = if weapon.level == 0 { 1 } else { 10 * weapon.level };
            for step in 0..steps {
                let t = step as f32 / steps as f32;
                let trail_angle = lerp(weapon.offset_angle, sword.swing_range.1, t);
                surface.rect(&RectShape {
                    center: frame.to_world(blade.rotate(trail_angle)),
                    size: Vec2::new(size.x * 2.0, size.y),
                    angle: frame.angle + trail_angle,
                    fill: Some(Color::SWORD),
                    stroke: None,
                    stroke_width: 0.0,
                    opacity: opacity * lerp(0.125, 0.075, t),
                });
            }
            surface.rect(&RectShape {
                center: frame.to_world(blade.rotate(weapon.offset_angle)),
                size,
                angle: frame.angle + weapon.offset_angle,
                fill: Some(Color::SWORD),
                stroke: Some(Color::BLACK),
                stroke_width: 1.0,
                opacity,
            });
        }
        WeaponKind::Bow(_) => {
            let center = frame.to_world(weapon.offset.rotate(weapon.offset_angle));
            surface.rect(&RectShape {
                center,
                size,
                angle: frame.angle + weapon.offset_angle + weapon.angle,
                fill: None,
                stroke: Some(Color::BROWN),
                stroke_width: size.x,
                opacity,
            });
            surface.circle(&CircleShape {
                center,
                radius: 2.0,
                fill: Some(Color::LIME),
                stroke: None,
                opacity,
            });
        }
        WeaponKind::Shield(_) => {
            surface.rect(&RectShape {
                center: frame.to_world(weapon.offset.rotate(weapon.offset_angle)),
                size,
                angle: frame.angle + weapon.offset_angle + weapon.angle,
                fill: Some(Color::SHIELD),
                stroke: Some(Color::BLACK),
                stroke_width: 5.0,
                opacity,
            });
        }
    }
}

/// Hotbar slot outline, number and weapon icon, laid out along the bottom
/// edge of the map.
pub(crate) fn render_hotbar(
    items: &[Weapon],
    selected: usize,
    map_size: Vec2,
    tile_size: f32,
    surface: &mut dyn RenderSurface,
) {
    let slot = Vec2::new(tile_size, tile_size);
    let origin = Vec2::new(tile_size * 1.5, map_size.y - tile_size * 1.5);
    for (idx, weapon) in items.iter().enumerate() {
        let center = origin + Vec2::new((tile_size + 5.0) * idx as f32, 0.0);
        surface.rect(&RectShape {
            center,
            size: slot,
            angle: 0.0,
            fill: Some(Color::WHITE),
            stroke: (idx == selected).then_some(Color::GREEN),
            stroke_width: 4.0,
            opacity: 0.5,
        });
        let number = (idx + 1).to_string();
        surface.text(&TextShape {
            text: &number,
            pos: center - slot.scale(0.5) + Vec2::new(5.0, 12.0),
            size: 10.0,
            fill: Some(Color::BLACK),
            stroke: None,
            opacity: 1.0,
        });
        surface.rect(&RectShape {
            center,
            size: weapon.size(tile_size).scale(0.8 * 0.5),
            angle: PI * 0.25,
            fill: Some(match weapon.kind {
                WeaponKind::Sword(_) => Color::SWORD,
                WeaponKind::Bow(_) => Color::BROWN,
                WeaponKind::Shield(_) => Color::SHIELD,
            }),
            stroke: Some(Color::BLACK),
            stroke_width: 1.0,
            opacity: 1.0,
        });
    }
}

pub(crate) fn render_debug_lines(lines: &[String], surface: &mut dyn RenderSurface) {
    for (i, line) in lines.iter().enumerate() {
        surface.text(&TextShape {
            text: line,
            pos: Vec2::new(10.0, 50.0 + 16.0 * (i as f32 + 1.0)),
            size: 14.0,
            fill: Some(Color::BLACK),
            stroke: None,
            opacity: 1.0,
        });
    }
}
