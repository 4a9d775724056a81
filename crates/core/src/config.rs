//! Annotator settings loaded from a JSON file

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid config {path}: {source}")]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// Severity cut-offs, in centipawns unless noted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    /// Played minus best below this is a blunder
    pub blunder: i32,
    pub mistake: i32,
    pub dubious: i32,
    /// Played this much above best is brilliant; anything above is good
    pub brilliant_margin: i32,
    /// Winning chance gap, in percentage points, that flags a move
    pub needs_annotation: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Thresholds {
            blunder: -200,
            mistake: -100,
            dubious: -30,
            brilliant_margin: 50,
            needs_annotation: 1.0,
        }
    }
}

/// Tunables of the analysis pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub thresholds: Thresholds,
    /// Ceiling on a single move's loss when averaging
    pub max_cpl: i32,
    /// Engine lines are cut to this many plies unless they end the game
    pub short_pv_len: usize,
    /// Seconds per move when a pass has nothing to divide its budget by
    pub fallback_seconds_per_move: f64,
    /// Rating both players must reach for the `Interesting` filter
    pub interesting_rating: u32,
    /// Output column limit
    pub line_width: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        AnalysisConfig {
            thresholds: Thresholds::default(),
            max_cpl: 2000,
            short_pv_len: 10,
            fallback_seconds_per_move: 60.0,
            interesting_rating: 2650,
            line_width: 80,
        }
    }
}

/// Everything the command line can also set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Path to the UCI engine
    pub engine: Option<String>,
    pub threads: u32,
    /// Minutes to spend on each game
    pub gametime: f64,
    /// Opening dataset (JSON)
    pub eco: Option<PathBuf>,
    pub analysis: AnalysisConfig,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            engine: None,
            threads: 8,
            gametime: 1.0,
            eco: None,
            analysis: AnalysisConfig::default(),
        }
    }
}

impl Config {
    /// Loads a config file; missing fields keep their defaults
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| ConfigError::Json {
            path: path.to_path_buf(),
            source,
        })
    }
}
