//! PGN input: record segmenting and game parsing

pub mod pgn;
pub mod segment;

pub use pgn::{parse_game, PgnError};
pub use segment::PgnSegments;
