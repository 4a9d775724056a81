//! PGN Annotator Core Library
//!
//! Judges every move of a chess game against a UCI engine and writes the
//! verdicts back into the PGN as comments, glyphs and engine lines.

pub mod analyzer;
pub mod batch;
pub mod classify;
pub mod config;
pub mod engine;
pub mod error;
pub mod filter;
pub mod game;
pub mod judge;
pub mod openings;
pub mod parser;
pub mod score;

pub use analyzer::{analyze_game, AnalysisError, Budget};
pub use batch::{default_output_path, run_batch, BatchOptions, BatchSummary};
pub use classify::Severity;
pub use config::{AnalysisConfig, Config, Thresholds};
pub use engine::{Engine, EngineError, UciEngine};
pub use error::{Error, Result};
pub use filter::GameFilter;
pub use game::GameTree;
pub use judge::{judge_move, Judgment};
pub use openings::OpeningBook;
