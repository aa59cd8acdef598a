//! Stick geometry: where the knob is for a deflection, and back

use serde::{Deserialize, Serialize};
use vrwheel_device_types::Vec3;
use vrwheel_errors::validate_range;

use crate::ShifterResult;
use crate::types::StickXz;

/// Stick length at 100% scale, meters.
pub const STICK_BASE_HEIGHT: f64 = 0.3165;

/// Radius of the grab capsule around the stick, meters.
pub const COLLISION_RADIUS: f64 = 0.07;

/// Physical layout of the shifter in tracking space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShifterGeometry {
    /// Center of the gate plate
    pub origin: Vec3,
    /// Lean of the stick at full deflection, degrees
    pub degree: f64,
    /// Stick length, percent of [`STICK_BASE_HEIGHT`]
    pub scale: f64,
    /// Width of the gate plate, meters
    pub size: f64,
    pub stick_width: f64,
}

impl Default for ShifterGeometry {
    fn default() -> Self {
        Self {
            origin: Vec3::new(0.25, -0.57, -0.15),
            degree: 15.0,
            scale: 100.0,
            size: 0.14,
            stick_width: 0.02,
        }
    }
}

impl ShifterGeometry {
    /// # Errors
    ///
    /// Returns a validation error for non-finite or out-of-range fields.
    pub fn validate(&self) -> ShifterResult<()> {
        if !self.origin.is_finite() {
            return Err(vrwheel_errors::ValidationError::not_finite("shifter.origin").into());
        }
        validate_range!("shifter.degree", self.degree, 1.0, 45.0);
        validate_range!("shifter.scale", self.scale, 10.0, 300.0);
        validate_range!("shifter.size", self.size, 0.05, 0.5);
        validate_range!("shifter.stick_width", self.stick_width, 0.001, self.size / 2.0);
        Ok(())
    }

    pub fn stick_height(&self) -> f64 {
        STICK_BASE_HEIGHT * self.scale / 100.0
    }

    /// Lane spacing at the stick base.
    pub fn unit(&self) -> f64 {
        self.size / 4.0 - self.stick_width / 2.0
    }

    /// Knob travel per grid unit: base spacing plus the lean at the top.
    pub fn knob_unit(&self) -> f64 {
        self.stick_height() * self.degree.to_radians().sin() + self.unit()
    }

    /// Deflection, in grid units, of a point relative to the plate. Height is ignored.
    pub fn normalize(&self, point: Vec3) -> StickXz {
        let unit = self.knob_unit();
        if unit <= f64::EPSILON {
            return StickXz::CENTER;
        }
        StickXz::new((point.x - self.origin.x) / unit, (point.z - self.origin.z) / unit)
    }

    pub fn stick_base(&self, xz: StickXz) -> Vec3 {
        let unit = self.unit();
        Vec3::new(
            self.origin.x + xz.x * unit,
            self.origin.y,
            self.origin.z + xz.z * unit,
        )
    }

    /// Knob position for a rendered stick deflection.
    pub fn knob(&self, xz: StickXz) -> Vec3 {
        let height = self.stick_height();
        let unit = self.unit();
        let x_rad = (self.degree * xz.x.abs()).to_radians();
        let z_rad = (self.degree * xz.z.abs()).to_radians();
        let x_lean = x_rad.sin() * height;
        let z_lean = z_rad.sin() * height;

        let y = self.origin.y + height
            - xz.z.abs() * (1.0 - z_rad.cos()) * height
            - xz.x.abs() * (1.0 - x_rad.cos()) * height;

        Vec3::new(
            self.origin.x + xz.x * unit + signed(x_lean, xz.x),
            y,
            self.origin.z + xz.z * unit + signed(z_lean, xz.z),
        )
    }

    /// True if `point` is within [`COLLISION_RADIUS`] of the stick segment.
    pub fn capsule_contains(&self, xz: StickXz, point: Vec3) -> bool {
        distance_to_segment(point, self.stick_base(xz), self.knob(xz)) <= COLLISION_RADIUS
    }
}

fn signed(magnitude: f64, direction: f64) -> f64 {
    if direction < 0.0 { -magnitude } else { magnitude }
}

fn distance_to_segment(p: Vec3, a: Vec3, b: Vec3) -> f64 {
    let ab = b - a;
    let len_sq = ab.length_squared();
    if len_sq <= f64::EPSILON {
        return p.distance(a);
    }
    let t = ((p - a).dot(ab) / len_sq).clamp(0.0, 1.0);
    p.distance(a + ab * t)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_units() {
        let geometry = ShifterGeometry::default();
        assert!((geometry.unit() - 0.025).abs() < 1e-12);
        assert!((geometry.stick_height() - 0.3165).abs() < 1e-12);
    }

    #[test]
    fn test_centered_knob_is_straight_up() {
        let geometry = ShifterGeometry::default();
        let knob = geometry.knob(StickXz::CENTER);
        assert!((knob.x - geometry.origin.x).abs() < 1e-12);
        assert!((knob.y - (geometry.origin.y + geometry.stick_height())).abs() < 1e-12);
    }

    #[test]
    fn test_full_deflection_matches_normalization() {
        let geometry = ShifterGeometry::default();
        let knob = geometry.knob(StickXz::new(1.0, 0.0));
        let back = geometry.normalize(knob);
        assert!((back.x - 1.0).abs() < 1e-9);
        assert!(back.z.abs() < 1e-9);
    }

    #[test]
    fn test_capsule() {
        let geometry = ShifterGeometry::default();
        let mid = geometry.origin + Vec3::new(0.05, 0.15, 0.0);
        assert!(geometry.capsule_contains(StickXz::CENTER, mid));
        let far = geometry.origin + Vec3::new(0.3, 0.15, 0.0);
        assert!(!geometry.capsule_contains(StickXz::CENTER, far));
        let above = geometry.knob(StickXz::CENTER) + Vec3::new(0.0, 0.069, 0.0);
        assert!(geometry.capsule_contains(StickXz::CENTER, above));
    }

    #[test]
    fn test_validate() {
        assert!(ShifterGeometry::default().validate().is_ok());
        let bad = ShifterGeometry {
            degree: f64::NAN,
            ..ShifterGeometry::default()
        };
        assert!(bad.validate().is_err());
    }
}
