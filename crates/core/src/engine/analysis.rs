//! Types for representing engine analysis results

use shakmaty::Color;

/// Raw score reported by a UCI engine, relative to the side to move
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Evaluation {
    /// Centipawn score (positive = side to move is better)
    Centipawns(i32),
    /// Forced mate in N moves (positive = side to move mates, negative = gets mated)
    Mate(i32),
}

impl Evaluation {
    /// Returns the same evaluation seen from the other side
    pub fn flipped(self) -> Self {
        match self {
            Evaluation::Centipawns(cp) => Evaluation::Centipawns(-cp),
            Evaluation::Mate(moves) => Evaluation::Mate(-moves),
        }
    }

    /// Expresses this evaluation from `pov` when it was reported for `turn`
    pub fn pov(self, turn: Color, pov: Color) -> Self {
        if turn == pov {
            self
        } else {
            self.flipped()
        }
    }
}

/// How much of an `info` stream the caller cares about
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InfoLevel {
    /// Score only
    Score,
    /// Score, principal variation, depth and node count
    All,
}

/// Complete analysis of a position, as reported by the engine
#[derive(Debug, Clone)]
pub struct PositionAnalysis {
    /// Side to move in the analyzed position; `evaluation` is relative to it
    pub turn: Color,
    /// Last reported score
    pub evaluation: Option<Evaluation>,
    /// Analysis depth reached
    pub depth: Option<u32>,
    /// Principal variation in UCI notation
    pub pv: Vec<String>,
    /// Nodes searched
    pub nodes: Option<u64>,
}

impl PositionAnalysis {
    /// Creates an empty analysis for a position with `turn` to move
    pub fn new(turn: Color) -> Self {
        PositionAnalysis {
            turn,
            evaluation: None,
            depth: None,
            pv: Vec::new(),
            nodes: None,
        }
    }

    /// Drops everything the caller did not ask for
    pub fn restrict(mut self, info: InfoLevel) -> Self {
        if info == InfoLevel::Score {
            self.pv.clear();
            self.depth = None;
            self.nodes = None;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pov_flips_for_other_side() {
        let eval = Evaluation::Centipawns(35);
        assert_eq!(eval.pov(Color::White, Color::White), Evaluation::Centipawns(35));
        assert_eq!(eval.pov(Color::White, Color::Black), Evaluation::Centipawns(-35));
        assert_eq!(Evaluation::Mate(-2).pov(Color::Black, Color::White), Evaluation::Mate(2));
    }

    #[test]
    fn test_restrict_to_score() {
        let mut analysis = PositionAnalysis::new(Color::White);
        analysis.pv = vec!["e2e4".to_string()];
        analysis.depth = Some(12);
        analysis.evaluation = Some(Evaluation::Centipawns(20));

        let restricted = analysis.restrict(InfoLevel::Score);
        assert!(restricted.pv.is_empty());
        assert_eq!(restricted.depth, None);
        assert_eq!(restricted.evaluation, Some(Evaluation::Centipawns(20)));
    }
}
