//! Game tree, positions and PGN output

pub mod position;
pub mod tree;
pub mod writer;

pub use position::SearchPosition;
pub use tree::{GameTree, Node, NodeId};
pub use writer::write_game;
