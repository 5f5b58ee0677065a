use std::f32::consts::PI;
use std::ops::{Add, AddAssign, Mul, Neg, Sub};

use serde::{Deserialize, Serialize};

pub const HALF_PI: f32 = PI / 2.0;
pub const TWO_PI: f32 = PI * 2.0;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub const ZERO: Vec2 = Vec2 { x: 0.0, y: 0.0 };

    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn len(self) -> f32 {
        self.x.hypot(self.y)
    }

    /// Unit vector in the same direction. A zero vector is divided by 1 and
    /// comes back unchanged.
    pub fn norm(self) -> Self {
        let len = self.len();
        let len = if len == 0.0 { 1.0 } else { len };
        Self {
            x: self.x / len,
            y: self.y / len,
        }
    }

    pub fn scale(self, s: f32) -> Self {
        Self {
            x: self.x * s,
            y: self.y * s,
        }
    }

    /// Angle of the vector in radians, measured from +x.
    pub fn angle(self) -> f32 {
        self.y.atan2(self.x)
    }

    pub fn from_angle(angle: f32) -> Self {
        Self {
            x: angle.cos(),
            y: angle.sin(),
        }
    }

    pub fn rotate(self, angle: f32) -> Self {
        let (sin, cos) = angle.sin_cos();
        Self {
            x: self.x * cos - self.y * sin,
            y: self.x * sin + self.y * cos,
        }
    }

    pub fn is_zero(self) -> bool {
        self.x == 0.0 && self.y == 0.0
    }
}

impl Add for Vec2 {
    type Output = Vec2;

    fn add(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl AddAssign for Vec2 {
    fn add_assign(&mut self, rhs: Vec2) {
        *self = *self + rhs;
    }
}

impl Sub for Vec2 {
    type Output = Vec2;

    fn sub(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Mul<f32> for Vec2 {
    type Output = Vec2;

    fn mul(self, rhs: f32) -> Vec2 {
        self.scale(rhs)
    }
}

impl Neg for Vec2 {
    type Output = Vec2;

    fn neg(self) -> Vec2 {
        Vec2::new(-self.x, -self.y)
    }
}

/// Axis-aligned rectangle stored by its top-left corner.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl Rect {
    pub fn from_center(center: Vec2, size: Vec2) -> Self {
        Self {
            x: center.x - size.x / 2.0,
            y: center.y - size.y / 2.0,
            w: size.x,
            h: size.y,
        }
    }

    /// Strict overlap: rectangles that only share an edge do not collide.
    pub fn overlaps(&self, other: &Rect) -> bool {
        self.x < other.x + other.w
            && self.x + self.w > other.x
            && self.y < other.y + other.h
            && self.y + self.h > other.y
    }
}

pub fn clamp(value: f32, min: f32, max: f32) -> f32 {
    value.max(min).min(max)
}

pub fn lerp(min: f32, max: f32, t: f32) -> f32 {
    min + (max - min) * t
}

/// Rises from `min` to `max` over the first half of `t` and falls back over
/// the second half.
pub fn lerp_min_max_min(min: f32, max: f32, t: f32) -> f32 {
    if t <= 0.5 {
        min + (max - min) * (t * 2.0)
    } else {
        max - (max - min) * ((t - 0.5) * 2.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(actual: f32, expected: f32) {
        assert!(
            (actual - expected).abs() <= 1e-5,
            "{actual} vs {expected}"
        );
    }

    #[test]
    fn norm_of_zero_vector_stays_zero() {
        assert_eq!(Vec2::ZERO.norm(), Vec2::ZERO);
    }

    #[test]
    fn norm_produces_unit_length() {
        let v = Vec2::new(3.0, -4.0).norm();
        assert_close(v.len(), 1.0);
        assert_close(v.x, 0.6);
        assert_close(v.y, -0.8);
    }

    #[test]
    fn rotate_quarter_turn_maps_x_to_y() {
        let v = Vec2::new(1.0, 0.0).rotate(HALF_PI);
        assert_close(v.x, 0.0);
        assert_close(v.y, 1.0);
    }

    #[test]
    fn angle_and_from_angle_agree() {
        let v = Vec2::from_angle(0.75);
        assert_close(v.angle(), 0.75);
    }

    #[test]
    fn touching_rects_do_not_overlap() {
        let a = Rect::from_center(Vec2::new(0.0, 0.0), Vec2::new(2.0, 2.0));
        let b = Rect::from_center(Vec2::new(2.0, 0.0), Vec2::new(2.0, 2.0));
        let c = Rect::from_center(Vec2::new(1.9, 0.5), Vec2::new(2.0, 2.0));
        assert!(!a.overlaps(&b));
        assert!(a.overlaps(&c));
    }

    #[test]
    fn triangle_lerp_peaks_at_half() {
        assert_close(lerp_min_max_min(3.0, 8.0, 0.0), 3.0);
        assert_close(lerp_min_max_min(3.0, 8.0, 0.5), 8.0);
        assert_close(lerp_min_max_min(3.0, 8.0, 1.0), 3.0);
        assert_close(lerp(2.0, 4.0, 0.25), 2.5);
        assert_close(clamp(5.0, 0.0, 1.0), 1.0);
    }
}
