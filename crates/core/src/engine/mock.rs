//! Scripted engine for tests

use std::collections::{HashMap, VecDeque};

use shakmaty::Position;

use super::{Engine, EngineError, Evaluation, InfoLevel, PositionAnalysis};
use crate::game::position::move_to_uci;
use crate::game::SearchPosition;

#[derive(Debug, Clone)]
struct Reply {
    evaluation: Option<Evaluation>,
    pv: Vec<String>,
}

/// Answers from a table keyed by FEN.
///
/// Several replies for one FEN are served in order, the last one repeating.
/// Unknown positions get `default_cp` and the first legal move as PV;
/// checkmated positions get `mate 0` and no PV.
pub struct MockEngine {
    replies: HashMap<String, VecDeque<Reply>>,
    default_cp: i32,
    terminate_after: Option<usize>,
    /// Every analyze call, successful or not
    pub calls: usize,
    /// Time limits passed to each call
    pub limits: Vec<f64>,
}

impl MockEngine {
    pub fn new() -> Self {
        MockEngine {
            replies: HashMap::new(),
            default_cp: 0,
            terminate_after: None,
            calls: 0,
            limits: Vec::new(),
        }
    }

    pub fn default_cp(mut self, cp: i32) -> Self {
        self.default_cp = cp;
        self
    }

    pub fn reply(self, fen: &str, evaluation: Evaluation, pv: &[&str]) -> Self {
        self.push(fen, Some(evaluation), pv)
    }

    pub fn no_score(self, fen: &str, pv: &[&str]) -> Self {
        self.push(fen, None, pv)
    }

    fn push(mut self, fen: &str, evaluation: Option<Evaluation>, pv: &[&str]) -> Self {
        self.replies.entry(fen.to_string()).or_default().push_back(Reply {
            evaluation,
            pv: pv.iter().map(|s| s.to_string()).collect(),
        });
        self
    }

    fn scripted(&mut self, fen: &str) -> Option<Reply> {
        let queue = self.replies.get_mut(fen)?;
        if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().cloned()
        }
    }

    /// Fails with `Terminated` once `calls` analyze calls have been served
    pub fn terminate_after(mut self, calls: usize) -> Self {
        self.terminate_after = Some(calls);
        self
    }
}

impl Engine for MockEngine {
    fn name(&self) -> &str {
        "MockFish 1.0"
    }

    async fn analyze(
        &mut self,
        position: &SearchPosition,
        seconds: f64,
        info: InfoLevel,
    ) -> Result<PositionAnalysis, EngineError> {
        self.calls += 1;
        self.limits.push(seconds);
        if self.terminate_after.is_some_and(|n| self.calls > n) {
            return Err(EngineError::Terminated);
        }

        let board = position.board();
        let reply = self.scripted(&position.fen()).unwrap_or_else(|| {
            if board.is_checkmate() {
                Reply {
                    evaluation: Some(Evaluation::Mate(0)),
                    pv: Vec::new(),
                }
            } else {
                Reply {
                    evaluation: Some(Evaluation::Centipawns(self.default_cp)),
                    pv: board
                        .legal_moves()
                        .iter()
                        .take(1)
                        .map(|m| move_to_uci(m, position.castling_mode()))
                        .collect(),
                }
            }
        });

        let mut analysis = PositionAnalysis::new(position.turn());
        analysis.evaluation = reply.evaluation;
        analysis.pv = reply.pv;
        analysis.depth = Some(12);
        analysis.nodes = Some(4096);
        Ok(analysis.restrict(info))
    }
}
