//! Batch driver: every game of an input file through the analyzer

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use tracing::{error, info, warn};

use crate::analyzer::analyze_game;
use crate::config::AnalysisConfig;
use crate::engine::Engine;
use crate::error::Result;
use crate::filter::GameFilter;
use crate::game::write_game;
use crate::openings::OpeningBook;
use crate::parser::{parse_game, PgnSegments};

/// What to annotate and where to put it
#[derive(Debug, Clone)]
pub struct BatchOptions {
    pub input: PathBuf,
    pub output: PathBuf,
    pub filter: GameFilter,
    /// Minutes per game
    pub gametime: f64,
}

/// Game counts of a finished batch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    /// Records in the input
    pub found: usize,
    /// Games rejected by the filter
    pub filtered: usize,
    pub annotated: usize,
    /// Games dropped because of parse or analysis errors
    pub failed: usize,
}

/// `games.pgn` -> `games-annotated.pgn`, next to the input
pub fn default_output_path(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "games".to_string());
    input.with_file_name(format!("{}-annotated.pgn", stem))
}

/// Annotates every game of `options.input` that passes the filter.
///
/// The output file is truncated first and each annotated game is appended
/// as soon as it is done. A game that fails is logged and skipped; losing
/// the engine stops the batch.
pub async fn run_batch<E: Engine>(
    engine: &mut E,
    book: &OpeningBook,
    config: &AnalysisConfig,
    options: &BatchOptions,
) -> Result<BatchSummary> {
    let segments = PgnSegments::open(&options.input)?;
    let mut output = BufWriter::new(File::create(&options.output)?);
    let mut summary = BatchSummary::default();

    info!(
        input = %options.input.display(),
        output = %options.output.display(),
        "annotating games"
    );

    for record in segments {
        let record = record?;
        summary.found += 1;

        let tree = match parse_game(&record) {
            Ok(tree) => tree,
            Err(e) => {
                warn!(game = summary.found, error = %e, "could not read game");
                summary.failed += 1;
                continue;
            }
        };

        if !options.filter.matches(tree.headers()) {
            summary.filtered += 1;
            continue;
        }

        let name = tree.summary();
        info!(game = summary.found, "analyzing {}", name);
        match analyze_game(tree, engine, book, config, options.gametime).await {
            Ok(annotated) => {
                write!(output, "{}\n\n", write_game(&annotated, config.line_width))?;
                output.flush()?;
                summary.annotated += 1;
            }
            Err(e) if e.is_fatal() => {
                error!(game = summary.found, error = %e, "stopping batch");
                return Err(e.into());
            }
            Err(e) => {
                error!(game = summary.found, error = %e, "skipping {}", name);
                summary.failed += 1;
            }
        }
    }

    info!(
        found = summary.found,
        filtered = summary.filtered,
        annotated = summary.annotated,
        failed = summary.failed,
        "batch finished"
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::mock::MockEngine;
    use crate::error::Error;
    use crate::analyzer::AnalysisError;

    const GAMES: &str = r#"[Event "Round one"]
[White "Carlsen"]
[Black "Caruana"]
[Result "1-0"]

1. e4 { a comment

with a blank line } e5 2. Nf3 1-0

[Event "Round two"]
[White "Nepomniachtchi"]
[Black "Ding"]
[Result "0-1"]

1. d4 d5 2. Kd3 0-1

[Event "Round three"]
[White "Ding"]
[Black "Carlsen"]
[Result "1/2-1/2"]

1. c4 e5 1/2-1/2
"#;

    fn options(dir: &tempfile::TempDir, filter: &str) -> BatchOptions {
        let input = dir.path().join("games.pgn");
        std::fs::write(&input, GAMES).unwrap();
        BatchOptions {
            output: default_output_path(&input),
            input,
            filter: GameFilter::parse(filter, 2650),
            gametime: 0.1,
        }
    }

    #[test]
    fn test_default_output_path() {
        assert_eq!(
            default_output_path(Path::new("/data/games.pgn")),
            PathBuf::from("/data/games-annotated.pgn")
        );
        assert_eq!(
            default_output_path(Path::new("wch.PGN")),
            PathBuf::from("wch-annotated.pgn")
        );
    }

    #[tokio::test]
    async fn test_batch_annotates_and_skips() {
        let dir = tempfile::tempdir().unwrap();
        let options = options(&dir, "");
        let mut engine = MockEngine::new();

        let summary = run_batch(&mut engine, &OpeningBook::empty(), &AnalysisConfig::default(), &options)
            .await
            .unwrap();
        assert_eq!(
            summary,
            BatchSummary {
                found: 3,
                filtered: 0,
                annotated: 2,
                failed: 1
            }
        );

        let written = std::fs::read_to_string(&options.output).unwrap();
        assert_eq!(written.matches("[Event ").count(), 2);
        assert!(written.contains("[Annotator \"MockFish 1.0\"]"));
        assert!(written.ends_with("1/2-1/2\n\n"));
        assert!(!written.contains("Kd3"));
    }

    #[tokio::test]
    async fn test_batch_filters_games() {
        let dir = tempfile::tempdir().unwrap();
        let options = options(&dir, "Player:Carlsen;Result:1-0");
        let mut engine = MockEngine::new();

        let summary = run_batch(&mut engine, &OpeningBook::empty(), &AnalysisConfig::default(), &options)
            .await
            .unwrap();
        assert_eq!(summary.found, 3);
        assert_eq!(summary.filtered, 2);
        assert_eq!(summary.annotated, 1);

        let written = std::fs::read_to_string(&options.output).unwrap();
        assert!(written.starts_with("[Event \"Round one\"]"));
    }

    #[tokio::test]
    async fn test_output_is_truncated() {
        let dir = tempfile::tempdir().unwrap();
        let options = options(&dir, "Event:Round three");
        std::fs::write(&options.output, "stale content").unwrap();
        let mut engine = MockEngine::new();

        run_batch(&mut engine, &OpeningBook::empty(), &AnalysisConfig::default(), &options)
            .await
            .unwrap();
        let written = std::fs::read_to_string(&options.output).unwrap();
        assert!(!written.contains("stale"));
        assert_eq!(written.matches("[Event ").count(), 1);
    }

    #[tokio::test]
    async fn test_engine_loss_stops_batch() {
        let dir = tempfile::tempdir().unwrap();
        let options = options(&dir, "");
        let mut engine = MockEngine::new().terminate_after(0);

        let err = run_batch(&mut engine, &OpeningBook::empty(), &AnalysisConfig::default(), &options)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Analysis(AnalysisError::EngineTerminated)));
        assert!(err.is_fatal());
    }

    #[tokio::test]
    async fn test_latin1_names_are_annotated() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("latin1.pgn");
        let mut bytes = b"[Event \"Open\"]\n[White \"J".to_vec();
        bytes.push(0xf6);
        bytes.extend_from_slice(b"rg\"]\n[Result \"*\"]\n\n1. e4 e5 *\n");
        std::fs::write(&input, bytes).unwrap();
        let options = BatchOptions {
            output: default_output_path(&input),
            input,
            filter: GameFilter::All,
            gametime: 0.1,
        };
        let mut engine = MockEngine::new();

        let summary = run_batch(&mut engine, &OpeningBook::empty(), &AnalysisConfig::default(), &options)
            .await
            .unwrap();
        assert_eq!(summary.annotated, 1);
        assert_eq!(summary.failed, 0);
    }

    #[tokio::test]
    async fn test_missing_input() {
        let dir = tempfile::tempdir().unwrap();
        let options = BatchOptions {
            input: dir.path().join("missing.pgn"),
            output: dir.path().join("out.pgn"),
            filter: GameFilter::All,
            gametime: 0.1,
        };
        let mut engine = MockEngine::new();
        let result = run_batch(&mut engine, &OpeningBook::empty(), &AnalysisConfig::default(), &options).await;
        assert!(matches!(result, Err(Error::Io(_))));
    }
}
