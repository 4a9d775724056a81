//! Move judgment: how the played move compares to the engine's best move

use shakmaty::Move;
use thiserror::Error;
use tracing::trace;

use crate::engine::{Engine, EngineError, InfoLevel};
use crate::game::position::{move_to_uci, uci_line};
use crate::game::SearchPosition;
use crate::score::{normalize, to_display_string, ScoreError};

#[derive(Error, Debug)]
pub enum JudgeError {
    /// The session is gone; nothing further can be judged
    #[error("engine terminated")]
    EngineTerminated,

    #[error("engine found no principal variation")]
    NoPrincipalVariation,

    #[error(transparent)]
    Engine(EngineError),

    #[error(transparent)]
    Score(#[from] ScoreError),

    #[error("engine suggested illegal move {0}")]
    IllegalEngineMove(String),

    #[error("played move {0} is not legal in the judged position")]
    IllegalPlayedMove(String),
}

impl JudgeError {
    /// Whether the whole run has to stop, rather than just this move
    pub fn is_fatal(&self) -> bool {
        matches!(self, JudgeError::EngineTerminated)
    }
}

impl From<EngineError> for JudgeError {
    fn from(e: EngineError) -> Self {
        match e {
            EngineError::Terminated => JudgeError::EngineTerminated,
            other => JudgeError::Engine(other),
        }
    }
}

/// Engine verdict on one played move. Both evaluations are from the
/// mover's point of view.
#[derive(Debug, Clone)]
pub struct Judgment {
    pub best_move: Move,
    pub best_eval: i32,
    pub played_eval: i32,
    /// Engine line starting with `best_move`
    pub pv: Vec<Move>,
    pub depth: Option<u32>,
    pub nodes: Option<u64>,
    /// Readable evaluation of the best line
    pub best_comment: String,
    /// Readable evaluation after the played move
    pub played_comment: String,
}

impl Judgment {
    pub fn played_best(&self, played: &Move) -> bool {
        self.best_move == *played
    }

    /// Centipawns lost by the played move; negative when it scored better
    /// than the engine's own choice
    pub fn loss(&self) -> i32 {
        self.best_eval - self.played_eval
    }
}

/// Judges `played` in `before` with about `seconds` of engine time.
///
/// The budget is split between the best-move search and the search after
/// the played move. When the engine's choice is the played move, its score
/// is reused and the second search is skipped.
pub async fn judge_move<E: Engine>(
    before: &SearchPosition,
    played: &Move,
    engine: &mut E,
    seconds: f64,
) -> Result<Judgment, JudgeError> {
    let half = seconds / 2.0;
    let mover = before.turn();
    let mode = before.castling_mode();

    let best = engine.analyze(before, half, InfoLevel::All).await?;
    if best.pv.is_empty() {
        return Err(JudgeError::NoPrincipalVariation);
    }
    let pv = uci_line(before.board(), &best.pv).map_err(JudgeError::IllegalEngineMove)?;
    let best_move = pv[0].clone();
    let best_eval = normalize(&best, mover)?;
    let best_comment = to_display_string(&best)?;

    let (played_eval, played_comment) = if best_move == *played {
        (best_eval, best_comment.clone())
    } else {
        let after = before
            .play(played)
            .ok_or_else(|| JudgeError::IllegalPlayedMove(move_to_uci(played, mode)))?;
        let reply = engine.analyze(&after, half, InfoLevel::Score).await?;
        (normalize(&reply, mover)?, to_display_string(&reply)?)
    };

    trace!(
        best = %move_to_uci(&best_move, mode),
        played = %move_to_uci(played, mode),
        best_eval,
        played_eval,
        "judged"
    );

    Ok(Judgment {
        best_move,
        best_eval,
        played_eval,
        pv,
        depth: best.depth,
        nodes: best.nodes,
        best_comment,
        played_comment,
    })
}
