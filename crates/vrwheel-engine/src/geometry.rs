//! Wheel-local coordinate frame
//!
//! The rim lies in the XY plane of its own frame, tilted about the X axis by
//! the configured pitch. Hand angles, the holding annulus and hub distances
//! are all measured in that frame relative to the hub, which may be shifted
//! by the adaptive offset while a single hand steers close to it.

use vrwheel_device_types::{HeadPose, Vec3};

/// Half-thickness of the holding annulus along the wheel axis (meters).
pub const HOLD_DEPTH: f64 = 0.075;

/// How far inside the rim a hand still counts as holding it.
pub const HOLD_INNER_MARGIN: f64 = 0.10;

/// How far outside the rim a hand still counts as holding it.
pub const HOLD_OUTER_MARGIN: f64 = 0.06;

/// Closest a single steering hand may get to the hub before the hub moves away.
pub const ADAPTIVE_CENTER_RADIUS: f64 = 0.045;

/// Substitute for zero head or hub distances.
pub const MIN_DISTANCE: f64 = 1e-6;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WheelFrame {
    center: Vec3,
    size: f64,
    pitch_degrees: f64,
    sin: f64,
    cos: f64,
    /// Hub shift in the rim plane, z is always zero
    adaptive_offset: Vec3,
}

impl WheelFrame {
    pub fn new(center: Vec3, size: f64, pitch_degrees: f64) -> Self {
        let (sin, cos) = pitch_degrees.to_radians().sin_cos();
        Self {
            center,
            size,
            pitch_degrees,
            sin,
            cos,
            adaptive_offset: Vec3::ZERO,
        }
    }

    /// Move, resize or tilt the wheel. The adaptive offset survives only if
    /// nothing changed.
    pub fn reposition(&mut self, center: Vec3, size: f64, pitch_degrees: f64) {
        let unchanged = self.center == center
            && (self.size - size).abs() < f64::EPSILON
            && (self.pitch_degrees - pitch_degrees).abs() < f64::EPSILON;
        if !unchanged {
            *self = Self::new(center, size, pitch_degrees);
        }
    }

    pub fn center(&self) -> Vec3 {
        self.center
    }

    /// Configured center plus the adaptive offset.
    pub fn hub(&self) -> Vec3 {
        self.center + self.adaptive_offset
    }

    pub fn size(&self) -> f64 {
        self.size
    }

    pub fn pitch_degrees(&self) -> f64 {
        self.pitch_degrees
    }

    pub fn adaptive_offset(&self) -> Vec3 {
        self.adaptive_offset
    }

    pub fn reset_adaptive_offset(&mut self) {
        self.adaptive_offset = Vec3::ZERO;
    }

    fn rotate(&self, v: Vec3, sin: f64) -> Vec3 {
        Vec3::new(
            v.x,
            self.cos * v.y - sin * v.z,
            sin * v.y + self.cos * v.z,
        )
    }

    pub fn to_wheel_space(&self, point: Vec3) -> Vec3 {
        let hub = self.hub();
        hub + self.rotate(point - hub, self.sin)
    }

    pub fn to_absolute_space(&self, point: Vec3) -> Vec3 {
        let hub = self.hub();
        hub + self.rotate(point - hub, -self.sin)
    }

    /// Hub-relative position in wheel space.
    pub fn local(&self, point: Vec3) -> Vec3 {
        self.to_wheel_space(point) - self.hub()
    }

    /// Angle of a single hand around the hub, in `(-π, π]`.
    pub fn raw_angle(&self, point: Vec3) -> f64 {
        let local = self.local(point);
        local.y.atan2(local.x)
    }

    /// Angle of the line from the right hand to the left hand, in `(-π, π]`.
    pub fn double_raw_angle(&self, left: Vec3, right: Vec3) -> f64 {
        let l = self.to_wheel_space(left);
        let r = self.to_wheel_space(right);
        (l.y - r.y).atan2(l.x - r.x)
    }

    /// Distance from the hub projected onto the rim plane.
    pub fn hub_distance(&self, point: Vec3) -> f64 {
        self.local(point).planar_length()
    }

    /// Whether `point` is inside the annulus a hand has to be in to hold the rim.
    pub fn in_holding_bounds(&self, point: Vec3) -> bool {
        let local = self.local(point);
        if local.z.abs() >= HOLD_DEPTH {
            return false;
        }
        let radius = self.size / 2.0;
        let distance = local.planar_length();
        distance >= radius - HOLD_INNER_MARGIN && distance < radius + HOLD_OUTER_MARGIN
    }

    /// Hands too far apart, or whose midpoint strayed too far from the hub,
    /// no longer steer together.
    pub fn ready_to_unsnap(&self, left: Vec3, right: Vec3) -> bool {
        let l = self.to_wheel_space(left);
        let r = self.to_wheel_space(right);
        let limit = self.size * self.size;
        if (l - r).length_squared() > limit {
            return true;
        }
        (self.hub() - l.midpoint(r)).length_squared() > limit
    }

    /// Slide the hub away from a hand that came within [`ADAPTIVE_CENTER_RADIUS`].
    ///
    /// Returns whether the hub moved.
    pub fn adapt_center(&mut self, point: Vec3) -> bool {
        let local = self.local(point);
        let distance = local.planar_length();
        if distance >= ADAPTIVE_CENTER_RADIUS {
            return false;
        }
        let push = if distance < MIN_DISTANCE {
            Vec3::new(ADAPTIVE_CENTER_RADIUS, 0.0, 0.0)
        } else {
            Vec3::new(local.x, local.y, 0.0) * ((ADAPTIVE_CENTER_RADIUS - distance) / distance)
        };
        self.adaptive_offset = self.adaptive_offset - push;
        true
    }

    /// Rim opacity for the current head pose.
    ///
    /// `base_alpha` is the configured opacity in `0.0..=1.0`. With a
    /// transparent center the wheel vanishes while the gaze passes inside the
    /// rim and fades back in linearly out to the full wheel size.
    pub fn transparency(&self, head: &HeadPose, base_alpha: f64, transparent_center: bool) -> f64 {
        let base_alpha = base_alpha.clamp(0.0, 1.0);
        if !transparent_center {
            return base_alpha;
        }
        let hub = self.hub();
        let distance = hub.distance(head.position).max(MIN_DISTANCE);
        let forward_length = head.forward.length();
        let forward = if forward_length < MIN_DISTANCE {
            Vec3::new(0.0, 0.0, -1.0)
        } else {
            head.forward * (1.0 / forward_length)
        };
        let gaze_point = head.position + forward * distance;
        let chord = hub.distance(gaze_point);
        let cos_angle = (1.0 - (chord / distance).powi(2) / 2.0).clamp(-1.0, 1.0);
        let angle = cos_angle.acos();
        if angle >= core::f64::consts::FRAC_PI_2 {
            return base_alpha;
        }

        let offset = angle.tan() * distance;
        let inner = self.size / 2.0;
        let outer = self.size;
        if offset <= inner {
            0.0
        } else if offset <= outer {
            base_alpha * (offset - inner) / (outer - inner)
        } else {
            base_alpha
        }
    }
}
