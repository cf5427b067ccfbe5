//! Fuzz target for fixed-point conversions.
//!
//! Exercises `Position::decimal_to_fixed`/`fixed_to_decimal` with
//! arbitrary decimals, looking for panics and checking the round trip
//! stays within one fixed-point unit for values that don't saturate.

#![no_main]

use libfuzzer_sys::fuzz_target;
use meridian_core::core::{Position, FIXED_POINT_SCALE};
use rust_decimal::Decimal;

fuzz_target!(|data: &[u8]| {
    if data.len() < 16 {
        return;
    }

    let mantissa = i64::from_le_bytes(data[0..8].try_into().unwrap());
    let scale = data[8] % 10;
    let value = Decimal::new(mantissa, scale as u32);

    let fixed = Position::decimal_to_fixed(value);
    let back = Position::fixed_to_decimal(fixed);

    let scaled = value * Decimal::new(FIXED_POINT_SCALE, 0);
    let saturated = i64::try_from(scaled).is_err();
    if !saturated {
        let error = (back - value).abs();
        assert!(
            error <= Decimal::new(1, 9),
            "round-trip error too large: {} -> {} -> {} (error: {})",
            value,
            fixed,
            back,
            error
        );
    } else {
        let expected = if value.is_sign_negative() { i64::MIN } else { i64::MAX };
        assert_eq!(fixed, expected, "out-of-range value did not saturate: {}", value);
    }
});
