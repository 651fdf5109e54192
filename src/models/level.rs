//! XP to level lookup.
//!
//! Levels follow a cumulative cost curve: levels 1-10 cost 10,000 XP each,
//! 11-20 cost 15,000 each, 21 and up cost 25,000 each. The table is capped
//! at level 250; any XP at or above 6,000,000 maps to the cap even though
//! the raw curve would keep going.

use std::sync::OnceLock;

/// Highest attainable level.
pub const LEVEL_CAP: u32 = 250;

/// XP at or above this value always maps to [`LEVEL_CAP`].
pub const XP_CAP: i64 = 6_000_000;

/// XP needed to advance from `level` to `level + 1`.
fn cost_for_level(level: u32) -> i64 {
    match level {
        1..=10 => 10_000,
        11..=20 => 15_000,
        _ => 25_000,
    }
}

/// Minimum cumulative XP for each level, index 0 = level 1.
fn level_floors() -> &'static [i64] {
    static FLOORS: OnceLock<Vec<i64>> = OnceLock::new();
    FLOORS.get_or_init(|| {
        let mut floors = Vec::with_capacity(LEVEL_CAP as usize);
        let mut total = 0i64;
        for level in 1..=LEVEL_CAP {
            floors.push(total);
            total += cost_for_level(level);
        }
        floors
    })
}

/// Map an XP value to a level in [1, 250].
///
/// Binary search over the precomputed floor table. Non-positive XP is
/// level 1; XP at or beyond the cap is level 250.
pub fn level_for_xp(xp: i64) -> u32 {
    if xp <= 0 {
        return 1;
    }
    if xp >= XP_CAP {
        return LEVEL_CAP;
    }

    let floors = level_floors();
    match floors.binary_search(&xp) {
        // Exact floor hit: that level has just been reached
        Ok(idx) => idx as u32 + 1,
        // Insertion point is the first floor above xp, so the level is idx
        Err(idx) => idx as u32,
    }
}
