//! Opening classification by position lookup

use serde::Deserialize;
use shakmaty::Chess;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

use crate::game::position::position_signature;

#[derive(Error, Debug)]
pub enum OpeningError {
    #[error("failed to read opening book {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid opening book {path}: {source}")]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// One record of the opening dataset
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Opening {
    #[serde(rename = "c")]
    pub eco: String,
    #[serde(rename = "n")]
    pub name: String,
    /// Board, side to move and castling fields of the FEN
    #[serde(rename = "f")]
    pub signature: String,
    /// Main line of the opening, in SAN
    #[serde(rename = "m", default)]
    pub moves: String,
}

impl Opening {
    /// `C20 King's Pawn Game`
    pub fn label(&self) -> String {
        format!("{} {}", self.eco, self.name)
    }
}

/// Openings keyed by position signature
#[derive(Debug, Clone, Default)]
pub struct OpeningBook {
    by_signature: HashMap<String, Opening>,
}

impl OpeningBook {
    /// A book that never matches
    pub fn empty() -> Self {
        OpeningBook::default()
    }

    pub fn from_openings(openings: Vec<Opening>) -> Self {
        let mut by_signature = HashMap::with_capacity(openings.len());
        for opening in openings {
            // first record for a position wins
            by_signature
                .entry(opening.signature.clone())
                .or_insert(opening);
        }
        OpeningBook { by_signature }
    }

    /// Parses a JSON array of `{c, n, f, m}` records
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let openings: Vec<Opening> = serde_json::from_str(json)?;
        Ok(OpeningBook::from_openings(openings))
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, OpeningError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| OpeningError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let book = OpeningBook::from_json(&text).map_err(|source| OpeningError::Json {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(path = %path.display(), openings = book.len(), "opening book loaded");
        Ok(book)
    }

    pub fn len(&self) -> usize {
        self.by_signature.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_signature.is_empty()
    }

    /// Opening whose position matches `position`, ignoring move counters
    pub fn lookup(&self, position: &Chess) -> Option<&Opening> {
        self.by_signature.get(&position_signature(position))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::position::uci_to_move;
    use shakmaty::Position;
    use std::io::Write;

    const BOOK: &str = r#"[
        {"c": "B00", "n": "King's Pawn", "f": "rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq", "m": "1. e4"},
        {"c": "C20", "n": "King's Pawn Game", "f": "rnbqkbnr/pppp1ppp/8/4p3/4P3/8/PPPP1PPP/RNBQKBNR w KQkq", "m": "1. e4 e5"},
        {"c": "C99", "n": "Duplicate", "f": "rnbqkbnr/pppp1ppp/8/4p3/4P3/8/PPPP1PPP/RNBQKBNR w KQkq"}
    ]"#;

    fn play(moves: &[&str]) -> Chess {
        let mut position = Chess::default();
        for uci in moves {
            let mv = uci_to_move(&position, uci).unwrap();
            position = position.play(mv).unwrap();
        }
        position
    }

    #[test]
    fn test_lookup_by_signature() {
        let book = OpeningBook::from_json(BOOK).unwrap();
        assert_eq!(book.len(), 2);

        let opening = book.lookup(&play(&["e2e4", "e7e5"])).unwrap();
        assert_eq!(opening.eco, "C20");
        assert_eq!(opening.label(), "C20 King's Pawn Game");
        assert_eq!(opening.moves, "1. e4 e5");

        assert!(book.lookup(&play(&["d2d4"])).is_none());
        assert!(book.lookup(&Chess::default()).is_none());
    }

    #[test]
    fn test_empty_book_never_matches() {
        let book = OpeningBook::empty();
        assert!(book.is_empty());
        assert!(book.lookup(&play(&["e2e4"])).is_none());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{}", BOOK).unwrap();
        let book = OpeningBook::load(file.path()).unwrap();
        assert!(book.lookup(&play(&["e2e4"])).is_some());

        assert!(matches!(
            OpeningBook::load("/nonexistent/eco.json"),
            Err(OpeningError::Io { .. })
        ));
    }
}
