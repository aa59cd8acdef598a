//! Property-based tests for the gear grid and the position resolver.

use std::collections::HashMap;

use proptest::prelude::*;
use vrwheel_shifter::{
    BUTTON_REVERSE, GridPosition, ReverseSide, ShifterThresholds, StickXz, all_positions,
    resolve_position,
};

fn any_side() -> impl Strategy<Value = ReverseSide> {
    prop_oneof![
        Just(ReverseSide::TopLeft),
        Just(ReverseSide::BottomLeft),
        Just(ReverseSide::TopRight),
        Just(ReverseSide::BottomRight),
    ]
}

fn any_position() -> impl Strategy<Value = GridPosition> {
    (-2i8..=2, -1i8..=1).prop_filter_map("on grid", |(x, z)| GridPosition::new(x, z).ok())
}

#[test]
fn gear_lanes_have_distinct_buttons() {
    let mut owners: HashMap<u8, Vec<GridPosition>> = HashMap::new();
    for pos in all_positions() {
        if let Some(button) = pos.button() {
            owners.entry(button).or_default().push(pos);
        }
    }
    for (button, cells) in owners {
        if button == BUTTON_REVERSE {
            assert!(cells.iter().all(|cell| cell.is_reverse()));
        } else {
            assert_eq!(cells.len(), 1, "button {button} shared by {cells:?}");
        }
    }
}

#[test]
fn button_lookup_is_pure() {
    for pos in all_positions() {
        assert_eq!(pos.button(), pos.button());
        assert_eq!(pos.button().is_none(), pos.is_neutral());
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(1000))]

    #[test]
    fn resolved_position_stays_on_the_configured_side(
        previous in any_position(),
        x in -3.0f64..3.0,
        z in -1.5f64..1.5,
        side in any_side(),
        locked in any::<bool>(),
    ) {
        prop_assume!(previous.x() != -side.column());
        let thresholds = ShifterThresholds::default();
        let xz = side.clamp(StickXz::new(x, z));
        let (next, stick) = resolve_position(previous, xz, side, locked, &thresholds);
        prop_assert!(GridPosition::new(next.x(), next.z()).is_ok());
        prop_assert!(next.x() != -side.column(), "reverse lane on the wrong side: {:?}", next);
        prop_assert!(stick.x.is_finite() && stick.z.is_finite());
    }

    #[test]
    fn column_only_moves_in_middle_row(
        previous in any_position(),
        x in -2.0f64..2.0,
        z in 0.71f64..1.0,
        flip in any::<bool>(),
        side in any_side(),
    ) {
        let thresholds = ShifterThresholds::default();
        let z = if flip { -z } else { z };
        let xz = side.clamp(StickXz::new(x, z));
        let (next, _) = resolve_position(previous, xz, side, true, &thresholds);
        prop_assert_eq!(next.x(), previous.x());
    }

    #[test]
    fn middle_row_is_neutral(
        previous in any_position(),
        x in -2.0f64..2.0,
        z in -0.7f64..=0.7,
        side in any_side(),
        locked in any::<bool>(),
    ) {
        let thresholds = ShifterThresholds::default();
        let xz = side.clamp(StickXz::new(x, z));
        let (next, _) = resolve_position(previous, xz, side, locked, &thresholds);
        prop_assert!(next.is_neutral());
        prop_assert_eq!(next.button(), None);
    }

    #[test]
    fn locked_reverse_needs_previous_reverse_column(
        x in -2.0f64..2.0,
        z in -0.7f64..=0.7,
        side in any_side(),
    ) {
        let thresholds = ShifterThresholds::default();
        let xz = side.clamp(StickXz::new(x, z));
        let (next, _) = resolve_position(GridPosition::NEUTRAL, xz, side, true, &thresholds);
        prop_assert!(next.x() != side.column());
    }
}
