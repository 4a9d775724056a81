//! Score normalization
//!
//! Engines report scores relative to the side to move, either in
//! centipawns or as a mate distance. Judging needs one signed integer scale
//! from a chosen side's point of view, and comments need a readable string.

use shakmaty::Color;
use thiserror::Error;

use crate::engine::{Evaluation, PositionAnalysis};

/// Mate scores map to `MAGIC_MATE_BOUND - distance`. Ordinary evaluations
/// never come close, so any mate outranks any centipawn score.
pub const MAGIC_MATE_BOUND: i32 = 20000;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScoreError {
    #[error("engine result carries no score")]
    MissingScore,
}

/// Integer evaluation of `analysis` from `pov`'s point of view.
///
/// A missing score is an error rather than 0: 0 is a real "equal" score
/// and would corrupt every delta computed from it.
pub fn normalize(analysis: &PositionAnalysis, pov: Color) -> Result<i32, ScoreError> {
    let evaluation = analysis.evaluation.ok_or(ScoreError::MissingScore)?;
    let value = numeric(evaluation);
    Ok(if analysis.turn == pov { value } else { -value })
}

/// Integer value of an evaluation, from the side it was reported for
pub fn numeric(evaluation: Evaluation) -> i32 {
    match evaluation {
        Evaluation::Centipawns(cp) => cp,
        Evaluation::Mate(moves) if moves > 0 => MAGIC_MATE_BOUND - moves,
        Evaluation::Mate(moves) if moves < 0 => -(MAGIC_MATE_BOUND + moves),
        // side to move is already mated
        Evaluation::Mate(_) => -MAGIC_MATE_BOUND,
    }
}

/// Plies until mate for a UCI mate score in moves
pub fn mate_plies(moves: i32) -> u32 {
    if moves > 0 {
        (2 * moves - 1) as u32
    } else {
        (2 * -moves) as u32
    }
}

/// Readable evaluation, always from White's point of view: `Mate in 3`,
/// `+1.25`, `-0.40`.
pub fn to_display_string(analysis: &PositionAnalysis) -> Result<String, ScoreError> {
    let evaluation = analysis.evaluation.ok_or(ScoreError::MissingScore)?;
    Ok(match evaluation.pov(analysis.turn, Color::White) {
        Evaluation::Mate(0) => "Mate".to_string(),
        Evaluation::Mate(moves) => format!("Mate in {}", mate_plies(moves).div_ceil(2)),
        Evaluation::Centipawns(cp) => format!("{:+.2}", cp as f64 / 100.0),
    })
}

/// Estimated winning chance in percent for a centipawn evaluation.
///
/// Logistic curve: 50 at 0, bounded by 0 and 100, so large gaps between two
/// blowout evaluations shrink to small differences.
pub fn winning_chances(centipawns: i32) -> f64 {
    50.0 + 50.0 * (2.0 / (1.0 + (-0.004 * centipawns as f64).exp()) - 1.0)
}
