//! Score → XP award. Completion needs 70+, partial XP starts at 50.

use crate::domain::Award;

pub fn award(score: u8, base_xp: u32) -> Award {
  // Integer tenths keep the result equal to floor(base_xp * fraction).
  let (tenths, complete) = match score {
    100.. => (10, true),
    85..=99 => (8, true),
    70..=84 => (6, true),
    50..=69 => (3, false),
    _ => (0, false),
  };
  Award { xp: base_xp * tenths / 10, complete }
}
