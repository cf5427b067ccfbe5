//! Property-based tests for the `Position` fixed-point representation.

#[cfg(test)]
mod tests {
    use crate::core::types::{Position, FIXED_POINT_SCALE};
    use proptest::prelude::*;
    use rust_decimal::Decimal;

    proptest! {
        /// decimal -> fixed -> decimal round-trips exactly for values that
        /// fit within 9 decimal places and i64 range.
        #[test]
        fn roundtrip_decimal_fixed_decimal(cents in -1_000_000_000i64..1_000_000_000i64) {
            let original = Decimal::new(cents, 2);
            let fixed = Position::decimal_to_fixed(original);
            let back = Position::fixed_to_decimal(fixed);
            prop_assert_eq!(back, original);
        }

        /// Sequential quantity updates that never cross i64 bounds always
        /// sum exactly, matching plain i64 addition.
        #[test]
        fn quantity_updates_sum_exactly(deltas in prop::collection::vec(-1000i64..1000i64, 0..200)) {
            let pos = Position::new();
            let mut expected: i64 = 0;
            for d in deltas {
                if expected.checked_add(d).is_none() {
                    continue;
                }
                expected += d;
                pos.update_quantity(d).unwrap();
            }
            prop_assert_eq!(pos.quantity(), expected);
        }

        /// update_quantity never silently wraps: any delta that would
        /// overflow i64 is rejected and leaves quantity unchanged.
        #[test]
        fn quantity_overflow_leaves_state_unchanged(seed in 0i64..FIXED_POINT_SCALE) {
            let pos = Position::new();
            pos.update_quantity(i64::MAX - seed).unwrap();
            let before = pos.quantity();
            let result = pos.update_quantity(seed + 1);
            prop_assert!(result.is_err());
            prop_assert_eq!(pos.quantity(), before);
        }
    }
}
