//! Move severity classification

use crate::config::Thresholds;
use crate::judge::Judgment;
use crate::score::winning_chances;

/// How a played move compares to the engine's choice
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    None,
    Dubious,
    Mistake,
    Blunder,
    Good,
    Brilliant,
}

impl Severity {
    /// Classifies by `played - best` in centipawns, first match wins
    pub fn classify(best_eval: i32, played_eval: i32, thresholds: &Thresholds) -> Self {
        let delta = played_eval - best_eval;
        match delta {
            d if d < thresholds.blunder => Severity::Blunder,
            d if d < thresholds.mistake => Severity::Mistake,
            d if d < thresholds.dubious => Severity::Dubious,
            d if d > thresholds.brilliant_margin => Severity::Brilliant,
            d if d > 0 => Severity::Good,
            _ => Severity::None,
        }
    }

    /// Numeric annotation glyph, if the class has one
    pub fn nag(&self) -> Option<u8> {
        match self {
            Severity::None => None,
            Severity::Good => Some(1),
            Severity::Mistake => Some(2),
            Severity::Brilliant => Some(3),
            Severity::Blunder => Some(4),
            Severity::Dubious => Some(6),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::None => "none",
            Severity::Dubious => "dubious",
            Severity::Mistake => "mistake",
            Severity::Blunder => "blunder",
            Severity::Good => "good",
            Severity::Brilliant => "brilliant",
        }
    }
}

/// Whether a judged move deserves a comment and a line.
///
/// A gap in winning chances above the threshold counts either way, so a
/// move that beats the engine's own choice can earn a good or brilliant
/// glyph. Below the threshold only a strict loss counts.
pub fn needs_annotation(judgment: Option<&Judgment>, thresholds: &Thresholds) -> bool {
    let Some(judgment) = judgment else {
        return false;
    };
    let best = winning_chances(judgment.best_eval);
    let played = winning_chances(judgment.played_eval);

    (best - played).abs() > thresholds.needs_annotation || best > played
}

#[cfg(test)]
mod tests {
    use super::*;
    use shakmaty::{Chess, Position};

    fn judgment(best_eval: i32, played_eval: i32) -> Judgment {
        let start = Chess::default();
        let best_move = start.legal_moves()[0].clone();
        Judgment {
            best_move: best_move.clone(),
            best_eval,
            played_eval,
            pv: vec![best_move],
            depth: Some(10),
            nodes: Some(1000),
            best_comment: String::new(),
            played_comment: String::new(),
        }
    }

    #[test]
    fn test_blunder_example() {
        let t = Thresholds::default();
        assert_eq!(Severity::classify(100, -150, &t), Severity::Blunder);
        assert_eq!(Severity::Blunder.nag(), Some(4));
    }

    #[test]
    fn test_boundaries_are_strict() {
        let t = Thresholds::default();
        assert_eq!(Severity::classify(0, -200, &t), Severity::Mistake);
        assert_eq!(Severity::classify(0, -201, &t), Severity::Blunder);
        assert_eq!(Severity::classify(0, -100, &t), Severity::Dubious);
        assert_eq!(Severity::classify(0, -30, &t), Severity::None);
        assert_eq!(Severity::classify(0, -31, &t), Severity::Dubious);
        assert_eq!(Severity::classify(0, 0, &t), Severity::None);
        assert_eq!(Severity::classify(0, 50, &t), Severity::Good);
        assert_eq!(Severity::classify(0, 51, &t), Severity::Brilliant);
        assert_eq!(Severity::classify(40, 41, &t), Severity::Good);
    }

    #[test]
    fn test_classification_is_pure() {
        let t = Thresholds::default();
        for (best, played) in [(30, -500), (0, 0), (-20, 300), (19990, 150)] {
            assert_eq!(Severity::classify(best, played, &t), Severity::classify(best, played, &t));
        }
    }

    #[test]
    fn test_thresholds_are_tunable() {
        let t = Thresholds {
            blunder: -400,
            ..Thresholds::default()
        };
        assert_eq!(Severity::classify(0, -300, &t), Severity::Mistake);
    }

    #[test]
    fn test_needs_annotation_requires_judgment() {
        assert!(!needs_annotation(None, &Thresholds::default()));
    }

    #[test]
    fn test_needs_annotation_is_asymmetric() {
        let t = Thresholds::default();
        // small strict loss still flags
        assert!(needs_annotation(Some(&judgment(20, 15)), &t));
        // small gain stays under the threshold
        assert!(!needs_annotation(Some(&judgment(20, 25)), &t));
        // identical evals never flag
        assert!(!needs_annotation(Some(&judgment(35, 35)), &t));
        assert!(needs_annotation(Some(&judgment(300, -300)), &t));
    }

    #[test]
    fn test_large_gain_is_flagged() {
        let t = Thresholds::default();
        let j = judgment(20, 400);
        assert!(needs_annotation(Some(&j), &t));
        assert_eq!(Severity::classify(j.best_eval, j.played_eval, &t), Severity::Brilliant);
        assert_eq!(Severity::Brilliant.as_str(), "brilliant");
    }
}
