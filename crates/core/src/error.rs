//! Error types for pgn-annotator-core

use thiserror::Error;

use crate::analyzer::AnalysisError;
use crate::config::ConfigError;
use crate::engine::EngineError;
use crate::judge::JudgeError;
use crate::openings::OpeningError;
use crate::parser::PgnError;
use crate::score::ScoreError;

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error(transparent)]
    Score(#[from] ScoreError),

    #[error(transparent)]
    Judge(#[from] JudgeError),

    #[error(transparent)]
    Analysis(#[from] AnalysisError),

    #[error(transparent)]
    Pgn(#[from] PgnError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Openings(#[from] OpeningError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Whether the run has to stop: the engine is gone or never started
    pub fn is_fatal(&self) -> bool {
        match self {
            Error::Engine(_) => true,
            Error::Judge(e) => e.is_fatal(),
            Error::Analysis(e) => e.is_fatal(),
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
