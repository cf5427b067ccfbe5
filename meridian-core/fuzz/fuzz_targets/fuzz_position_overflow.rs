//! Fuzz target for Position overflow detection.
//!
//! Exercises `update_quantity`/`update_realized_pnl`/`update_daily_pnl`
//! with extreme deltas and checks the `Result` against plain
//! `checked_add` on the same starting value.

#![no_main]

use libfuzzer_sys::fuzz_target;
use meridian_core::core::Position;

fuzz_target!(|data: &[u8]| {
    if data.len() < 24 {
        return;
    }

    let initial = i64::from_le_bytes(data[0..8].try_into().unwrap());
    let delta = i64::from_le_bytes(data[8..16].try_into().unwrap());
    let pnl_delta = i64::from_le_bytes(data[16..24].try_into().unwrap());

    let position = Position::new();
    // Seed the quantity directly; a failing seed add would just mean
    // this iteration doesn't get to the interesting overflow case.
    let _ = position.update_quantity(initial);

    let result = position.update_quantity(delta);
    match initial.checked_add(delta) {
        Some(expected) => {
            let new_qty = result.expect("checked_add succeeded but update_quantity failed");
            assert_eq!(
                new_qty, expected,
                "update_quantity succeeded but math is wrong: {} + {} = {} (expected {})",
                initial, delta, new_qty, expected
            );
        }
        None => {
            assert!(
                result.is_err(),
                "update_quantity succeeded but {} + {} should overflow",
                initial,
                delta
            );
        }
    }

    let _ = position.update_realized_pnl(pnl_delta);
    let _ = position.update_daily_pnl(pnl_delta);
});
