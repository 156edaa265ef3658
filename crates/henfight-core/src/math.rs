use std::ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign};

use serde::{Deserialize, Serialize};

/// World-space vector. Y is up; gameplay happens on the XZ plane.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub const ZERO: Vec3 = Vec3::new(0.0, 0.0, 0.0);
    pub const FORWARD: Vec3 = Vec3::new(0.0, 0.0, 1.0);

    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    /// Vector on the ground plane.
    pub const fn planar(x: f32, z: f32) -> Self {
        Self { x, y: 0.0, z }
    }

    pub fn dot(self, other: Vec3) -> f32 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    pub fn length_squared(self) -> f32 {
        self.dot(self)
    }

    pub fn length(self) -> f32 {
        self.length_squared().sqrt()
    }

    /// Unit vector in the same direction, or zero for a zero-length input.
    pub fn normalize_or_zero(self) -> Vec3 {
        let len = self.length();
        if len > f32::EPSILON && len.is_finite() {
            self * (1.0 / len)
        } else {
            Vec3::ZERO
        }
    }

    /// Scale down so the length does not exceed `max`. Shorter vectors pass through.
    pub fn clamp_length(self, max: f32) -> Vec3 {
        let max = max.max(0.0);
        let len_sq = self.length_squared();
        if len_sq > max * max {
            self.normalize_or_zero() * max
        } else {
            self
        }
    }

    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

impl Add for Vec3 {
    type Output = Vec3;

    fn add(self, rhs: Vec3) -> Vec3 {
        Vec3::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl AddAssign for Vec3 {
    fn add_assign(&mut self, rhs: Vec3) {
        *self = *self + rhs;
    }
}

impl Sub for Vec3 {
    type Output = Vec3;

    fn sub(self, rhs: Vec3) -> Vec3 {
        Vec3::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl SubAssign for Vec3 {
    fn sub_assign(&mut self, rhs: Vec3) {
        *self = *self - rhs;
    }
}

impl Mul<f32> for Vec3 {
    type Output = Vec3;

    fn mul(self, rhs: f32) -> Vec3 {
        Vec3::new(self.x * rhs, self.y * rhs, self.z * rhs)
    }
}

impl Neg for Vec3 {
    type Output = Vec3;

    fn neg(self) -> Vec3 {
        Vec3::new(-self.x, -self.y, -self.z)
    }
}

/// Position plus facing (unit forward vector) and uniform scale.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    pub position: Vec3,
    pub facing: Vec3,
    #[serde(default = "default_scale")]
    pub scale: f32,
}

fn default_scale() -> f32 {
    1.0
}

impl Pose {
    pub fn at(position: Vec3) -> Self {
        Self {
            position,
            facing: Vec3::FORWARD,
            scale: 1.0,
        }
    }
}

impl Default for Pose {
    fn default() -> Self {
        Self::at(Vec3::ZERO)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamp_length_scales_long_vectors() {
        let v = Vec3::planar(30.0, 40.0).clamp_length(10.0);
        assert!((v.length() - 10.0).abs() < 1e-4);
        assert!((v.x - 6.0).abs() < 1e-4);
        assert!((v.z - 8.0).abs() < 1e-4);
    }

    #[test]
    fn clamp_length_keeps_short_vectors() {
        let v = Vec3::planar(1.0, 2.0);
        assert_eq!(v.clamp_length(10.0), v);
    }

    #[test]
    fn normalize_zero_is_zero() {
        assert_eq!(Vec3::ZERO.normalize_or_zero(), Vec3::ZERO);
    }

    #[test]
    fn pose_scale_defaults_when_missing() {
        let json = r#"{"position":{"x":1.0,"y":0.0,"z":2.0},"facing":{"x":0.0,"y":0.0,"z":1.0}}"#;
        let pose: Pose = serde_json::from_str(json).unwrap();
        assert_eq!(pose.scale, 1.0);
        assert_eq!(pose.position, Vec3::planar(1.0, 2.0));
    }
}
