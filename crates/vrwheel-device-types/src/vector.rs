//! Three-component vector in tracking space (meters).

use core::ops::{Add, Mul, Sub};

use serde::{Deserialize, Serialize};

/// A point or direction in seated tracking space.
///
/// Serialized as a `[x, y, z]` array so configuration files stay compact.
///
/// # Examples
///
/// ```
/// use vrwheel_device_types::Vec3;
///
/// let a = Vec3::new(1.0, 2.0, 2.0);
/// assert!((a.length() - 3.0).abs() < 1e-12);
///
/// let b = a - Vec3::new(1.0, 0.0, 0.0);
/// assert!((b.x).abs() < 1e-12);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 3]", into = "[f64; 3]")]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vec3 {
    pub const ZERO: Vec3 = Vec3::new(0.0, 0.0, 0.0);

    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn dot(self, other: Vec3) -> f64 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    pub fn length_squared(self) -> f64 {
        self.dot(self)
    }

    pub fn length(self) -> f64 {
        self.length_squared().sqrt()
    }

    pub fn distance(self, other: Vec3) -> f64 {
        (self - other).length()
    }

    /// Length of the projection onto the XY plane.
    pub fn planar_length(self) -> f64 {
        self.x.hypot(self.y)
    }

    pub fn midpoint(self, other: Vec3) -> Vec3 {
        (self + other) * 0.5
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

impl Sub for Vec3 {
    type Output = Vec3;

    fn sub(self, rhs: Vec3) -> Vec3 {
        Vec3::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl Mul<f64> for Vec3 {
    type Output = Vec3;

    fn mul(self, rhs: f64) -> Vec3 {
        Vec3::new(self.x * rhs, self.y * rhs, self.z * rhs)
    }
}

impl From<[f64; 3]> for Vec3 {
    fn from([x, y, z]: [f64; 3]) -> Self {
        Vec3::new(x, y, z)
    }
}

impl From<Vec3> for [f64; 3] {
    fn from(v: Vec3) -> Self {
        [v.x, v.y, v.z]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arithmetic() {
        let a = Vec3::new(1.0, 2.0, 3.0);
        let b = Vec3::new(0.5, 0.5, 0.5);
        assert_eq!(a + b, Vec3::new(1.5, 2.5, 3.5));
        assert_eq!(a - b, Vec3::new(0.5, 1.5, 2.5));
        assert_eq!(b * 2.0, Vec3::new(1.0, 1.0, 1.0));
    }

    #[test]
    fn test_planar_length_ignores_z() {
        let v = Vec3::new(3.0, 4.0, 100.0);
        assert!((v.planar_length() - 5.0).abs() < 1e-12);
    }

    #[test]
    fn test_non_finite_detection() {
        assert!(Vec3::ZERO.is_finite());
        assert!(!Vec3::new(f64::NAN, 0.0, 0.0).is_finite());
        assert!(!Vec3::new(0.0, f64::INFINITY, 0.0).is_finite());
    }

    #[test]
    fn test_serializes_as_array() -> Result<(), Box<dyn std::error::Error>> {
        let json = serde_json::to_string(&Vec3::new(0.0, -0.4, -0.35))?;
        assert_eq!(json, "[0.0,-0.4,-0.35]");
        let back: Vec3 = serde_json::from_str("[0.25,-0.57,-0.15]")?;
        assert_eq!(back, Vec3::new(0.25, -0.57, -0.15));
        Ok(())
    }
}
