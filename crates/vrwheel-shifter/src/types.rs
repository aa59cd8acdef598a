//! Gear grid, reverse placement and button numbering

use core::fmt;

use serde::{Deserialize, Serialize};

use crate::{ShifterError, ShifterResult};

/// Button asserted for gear 1; gears 1-6 use consecutive ids.
pub const BUTTON_FIRST_GEAR: u8 = 43;
pub const BUTTON_SPLITTER: u8 = 49;
pub const BUTTON_RANGE: u8 = 50;
pub const BUTTON_REVERSE: u8 = 51;

/// Every button the shifter drives, gears and reverse first.
pub const SHIFT_BUTTONS: [u8; 7] = [43, 44, 45, 46, 47, 48, BUTTON_REVERSE];

/// Where the reverse gate sits on the pattern.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReverseSide {
    TopLeft,
    #[default]
    BottomLeft,
    TopRight,
    BottomRight,
}

impl ReverseSide {
    /// Column of the reverse lane, `-2` or `2`.
    pub fn column(self) -> i8 {
        match self {
            ReverseSide::TopLeft | ReverseSide::BottomLeft => -2,
            ReverseSide::TopRight | ReverseSide::BottomRight => 2,
        }
    }

    /// Row that engages reverse, `-1` (top) or `1` (bottom).
    pub fn row(self) -> i8 {
        match self {
            ReverseSide::TopLeft | ReverseSide::TopRight => -1,
            ReverseSide::BottomLeft | ReverseSide::BottomRight => 1,
        }
    }

    /// Column the stick is held in while reverse is locked out.
    pub fn guard_column(self) -> i8 {
        self.column() / 2
    }

    /// Clamp a continuous deflection to the lanes that exist on this side.
    pub fn clamp(self, xz: StickXz) -> StickXz {
        let (min_x, max_x) = if self.column() < 0 {
            (-2.0, 1.0)
        } else {
            (-1.0, 2.0)
        };
        StickXz {
            x: xz.x.clamp(min_x, max_x),
            z: xz.z.clamp(-1.0, 1.0),
        }
    }
}

/// Continuous stick deflection in grid units.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct StickXz {
    /// Lane axis, positive to the right
    pub x: f64,
    /// Row axis, negative away from the driver
    pub z: f64,
}

impl StickXz {
    pub const CENTER: StickXz = StickXz { x: 0.0, z: 0.0 };

    pub const fn new(x: f64, z: f64) -> Self {
        Self { x, z }
    }
}

impl From<GridPosition> for StickXz {
    fn from(pos: GridPosition) -> Self {
        StickXz::new(f64::from(pos.x()), f64::from(pos.z()))
    }
}

/// A quantized cell of the gear grid.
///
/// Columns run `-2..=2` and rows `-1..=1`; row `0` is the neutral lane. The
/// cell is also expressible as the half-step value `x·2 + 3 + (z+1)/2`, kept
/// here doubled so it stays integral.
///
/// # Examples
///
/// ```
/// use vrwheel_shifter::GridPosition;
///
/// let second = GridPosition::new(-1, 1)?;
/// assert_eq!(second.button(), Some(44));
/// assert_eq!(second.half_steps(), 4);
/// assert_eq!(GridPosition::from_half_steps(4), Some(second));
/// assert_eq!(GridPosition::NEUTRAL.button(), None);
/// # Ok::<(), vrwheel_shifter::ShifterError>(())
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GridPosition {
    x: i8,
    z: i8,
}

impl GridPosition {
    pub const NEUTRAL: GridPosition = GridPosition { x: 0, z: 0 };

    /// Sequential "up" cell
    pub const SEQUENTIAL_UP: GridPosition = GridPosition { x: 0, z: 1 };

    /// Sequential "down" cell
    pub const SEQUENTIAL_DOWN: GridPosition = GridPosition { x: 0, z: -1 };

    /// # Errors
    ///
    /// Returns [`ShifterError::InvalidGridPosition`] outside `-2..=2 × -1..=1`.
    pub fn new(x: i8, z: i8) -> ShifterResult<Self> {
        if (-2..=2).contains(&x) && (-1..=1).contains(&z) {
            Ok(Self { x, z })
        } else {
            Err(ShifterError::InvalidGridPosition { x, z })
        }
    }

    pub(crate) const fn from_parts(x: i8, z: i8) -> Self {
        Self { x, z }
    }

    pub fn x(self) -> i8 {
        self.x
    }

    pub fn z(self) -> i8 {
        self.z
    }

    pub fn is_neutral(self) -> bool {
        self.z == 0
    }

    /// Doubled grid value `4x + 7 + z`, `-2..=16`.
    pub fn half_steps(self) -> i8 {
        4 * self.x + 7 + self.z
    }

    pub fn from_half_steps(half: i8) -> Option<Self> {
        let half = i16::from(half);
        let x = (half - 6).div_euclid(4);
        let z = half - 7 - 4 * x;
        GridPosition::new(i8::try_from(x).ok()?, i8::try_from(z).ok()?).ok()
    }

    /// Rational grid value, `-1.0..=8.0`.
    pub fn value(self) -> f64 {
        f64::from(self.half_steps()) / 2.0
    }

    /// Gear number `1..=6` for forward cells.
    pub fn gear(self) -> Option<u8> {
        if self.z == 0 || !(-1..=1).contains(&self.x) {
            return None;
        }
        let column = u8::try_from(self.x + 1).ok()?;
        Some(column * 2 + if self.z > 0 { 2 } else { 1 })
    }

    /// Button asserted while the stick sits in this cell.
    pub fn button(self) -> Option<u8> {
        if self.z == 0 {
            None
        } else if self.x.abs() == 2 {
            Some(BUTTON_REVERSE)
        } else {
            self.gear().map(|gear| BUTTON_FIRST_GEAR + gear - 1)
        }
    }

    pub fn is_reverse(self) -> bool {
        self.z != 0 && self.x.abs() == 2
    }
}

impl fmt::Display for GridPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_reverse() {
            write!(f, "R")
        } else if let Some(gear) = self.gear() {
            write!(f, "{gear}")
        } else {
            write!(f, "N")
        }
    }
}

/// Every cell of the grid.
pub fn all_positions() -> impl Iterator<Item = GridPosition> {
    (-2i8..=2).flat_map(|x| (-1i8..=1).map(move |z| GridPosition::from_parts(x, z)))
}
