//! Rubric arithmetic: competency score bounds and final-score rounding.

/// Highest score a single competency can receive.
pub const COMPETENCY_MAX: u16 = 200;

/// Competency scores move in steps of this size.
pub const COMPETENCY_STEP: u16 = 20;

/// Sums below this are treated as disqualifying and round to zero.
pub const FINAL_SCORE_FLOOR: u16 = 680;

/// Every non-zero final score the rubric allows, ascending.
pub const FINAL_SCORES: [u16; 16] = [
    680, 700, 720, 740, 760, 780, 800, 820, 840, 860, 880, 900, 920, 940, 960, 980,
];

/// Returns `true` for integers in `0..=200` that are multiples of 20.
pub fn is_valid_competency_score(score: i64) -> bool {
    (0..=COMPETENCY_MAX as i64).contains(&score) && score % COMPETENCY_STEP as i64 == 0
}

/// Maps a raw competency sum onto the canonical final-score set.
///
/// Sums below [`FINAL_SCORE_FLOOR`] become `0`. Anything else snaps to the
/// nearest element of [`FINAL_SCORES`]; an exact midpoint rounds up, and sums
/// above the top of the scale clamp to it. Total over `u16` and idempotent.
pub fn round15(sum: u16) -> u16 {
    if sum < FINAL_SCORE_FLOOR {
        return 0;
    }
    let top = FINAL_SCORES[FINAL_SCORES.len() - 1];
    let offset = sum.min(top) - FINAL_SCORE_FLOOR;
    let steps = (offset + COMPETENCY_STEP / 2) / COMPETENCY_STEP;
    (FINAL_SCORE_FLOOR + steps * COMPETENCY_STEP).min(top)
}
