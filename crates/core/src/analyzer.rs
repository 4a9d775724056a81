//! Two-pass game analysis
//!
//! A game goes through `parse check -> clean -> opening -> pass 1 -> pass 2
//! -> finalize`. Pass 1 spends a tenth of the time budget judging every move
//! after the opening; pass 2 spends the rest re-judging only the moves pass
//! 1 flagged, and annotates those that are still flagged.

use shakmaty::{Chess, Color, Move, Position};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::classify::{needs_annotation, Severity};
use crate::config::{AnalysisConfig, Thresholds};
use crate::engine::Engine;
use crate::game::position::{is_game_over, is_threefold, repetition_key, san_plus};
use crate::game::{GameTree, NodeId};
use crate::judge::{judge_move, Judgment};
use crate::openings::OpeningBook;

#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("game has parse errors: {}", .0.join("; "))]
    Parse(Vec<String>),

    #[error("game has no moves")]
    NoMoves,

    #[error("engine terminated")]
    EngineTerminated,

    #[error("analysis aborted: {0}")]
    Aborted(String),
}

impl AnalysisError {
    /// Whether the batch has to stop rather than move on to the next game
    pub fn is_fatal(&self) -> bool {
        matches!(self, AnalysisError::EngineTerminated)
    }
}

/// Time allotted to one game, in seconds
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Budget {
    pub total: f64,
    pub pass1: f64,
    pub pass2: f64,
    fallback: f64,
}

impl Budget {
    pub fn new(gametime_minutes: f64, fallback_seconds: f64) -> Self {
        let total = gametime_minutes * 60.0;
        let pass1 = total / 10.0;
        Budget {
            total,
            pass1,
            pass2: total - pass1,
            fallback: fallback_seconds,
        }
    }

    /// Seconds per move in pass 1
    pub fn pass1_per_move(&self, plies: usize) -> f64 {
        self.per_move(self.pass1, plies)
    }

    /// Seconds per flagged move in pass 2
    pub fn pass2_per_move(&self, flagged: usize) -> f64 {
        self.per_move(self.pass2, flagged)
    }

    fn per_move(&self, budget: f64, count: usize) -> f64 {
        if count == 0 {
            self.fallback
        } else {
            budget / count as f64
        }
    }
}

/// Where opening theory ends
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpeningBoundary {
    /// Last book position; moves up to and including it are not judged
    pub node: NodeId,
    /// Main line plies after `node`
    pub ply_count: usize,
}

/// Tags the game with the latest book position on its main line.
///
/// Sets the `ECO` and `Opening` headers and comments the matching move.
/// Games of other variants are not classified.
pub fn classify_opening(tree: &mut GameTree, book: &OpeningBook) -> OpeningBoundary {
    let variant = tree.header("Variant").unwrap_or("Standard");
    if !matches!(variant.to_ascii_lowercase().as_str(), "standard" | "chess" | "") {
        info!(variant, "skipping opening classification");
        return OpeningBoundary {
            node: tree.root(),
            ply_count: tree.ply_count(),
        };
    }

    let mut ply_count = 0;
    for id in tree.mainline().into_iter().skip(1).rev() {
        if let Some(opening) = book.lookup(&tree.node(id).position).cloned() {
            debug!(eco = %opening.eco, name = %opening.name, "opening classified");
            tree.set_header("ECO", opening.eco.clone());
            tree.set_header("Opening", opening.name.clone());
            tree.node_mut(id).comment = Some(opening.label());
            return OpeningBoundary { node: id, ply_count };
        }
        ply_count += 1;
    }

    OpeningBoundary {
        node: tree.root(),
        ply_count,
    }
}

/// Working notes for one judged ply
struct Ply {
    id: NodeId,
    judgment: Option<Judgment>,
    flagged: bool,
}

/// Analyzes and annotates one game.
///
/// `gametime` is the budget for the whole game in minutes. The engine is
/// used for one request at a time.
pub async fn analyze_game<E: Engine>(
    mut tree: GameTree,
    engine: &mut E,
    book: &OpeningBook,
    config: &AnalysisConfig,
    gametime: f64,
) -> Result<GameTree, AnalysisError> {
    if !tree.errors.is_empty() {
        for error in &tree.errors {
            warn!(game = %tree.summary(), error = %error, "parse error");
        }
        return Err(AnalysisError::Parse(tree.errors.clone()));
    }
    if tree.ply_count() == 0 {
        return Err(AnalysisError::NoMoves);
    }

    tree.clean();
    let boundary = classify_opening(&mut tree, book);
    let budget = Budget::new(gametime, config.fallback_seconds_per_move);
    let thresholds = &config.thresholds;

    // pass 1: every ply from the end back to the boundary
    let seconds = budget.pass1_per_move(boundary.ply_count);
    debug!(budget = budget.pass1, seconds, plies = boundary.ply_count, "pass 1");
    info!(game = %tree.summary(), "performing first pass");

    let mut plies = Vec::with_capacity(boundary.ply_count);
    let mut current = tree.end();
    while current != boundary.node {
        let judgment = judge_ply(&tree, current, engine, seconds).await?;
        let flagged = needs_annotation(judgment.as_ref(), thresholds);
        if let Some(judgment) = &judgment {
            log_judgment(&tree, current, judgment, flagged, thresholds);
        }
        plies.push(Ply {
            id: current,
            judgment,
            flagged,
        });
        current = parent_of(&tree, current)?;
    }

    // pass 2: re-judge flagged plies with the rest of the budget
    let flagged = plies.iter().filter(|p| p.flagged).count();
    let seconds = budget.pass2_per_move(flagged);
    debug!(budget = budget.pass2, seconds, flagged, "pass 2");
    info!(game = %tree.summary(), flagged, "performing second pass");

    for ply in plies.iter_mut().filter(|p| p.flagged) {
        let Some(judgment) = judge_ply(&tree, ply.id, engine, seconds).await? else {
            continue;
        };
        let still_flagged = needs_annotation(Some(&judgment), thresholds);
        log_judgment(&tree, ply.id, &judgment, still_flagged, thresholds);
        if still_flagged {
            annotate(&mut tree, ply.id, &judgment, config)?;
        }
        ply.judgment = Some(judgment);
    }

    // finalize
    let (white, black) = average_losses(&tree, &plies, config.max_cpl);
    tree.set_header("WhiteACPL", white.to_string());
    tree.set_header("BlackACPL", black.to_string());
    let annotator = engine.name().to_string();
    tree.set_header("Annotator", annotator.clone());
    let root = tree.root();
    tree.node_mut(root).comment = Some(annotator);

    Ok(tree)
}

fn parent_of(tree: &GameTree, id: NodeId) -> Result<NodeId, AnalysisError> {
    tree.parent(id)
        .ok_or_else(|| AnalysisError::Aborted(format!("node {} has no parent", id.index())))
}

/// Judges the move leading to `id`. Engine trouble other than termination
/// only skips the move.
async fn judge_ply<E: Engine>(
    tree: &GameTree,
    id: NodeId,
    engine: &mut E,
    seconds: f64,
) -> Result<Option<Judgment>, AnalysisError> {
    let parent = parent_of(tree, id)?;
    let played = tree
        .node(id)
        .mv
        .clone()
        .ok_or_else(|| AnalysisError::Aborted(format!("node {} has no move", id.index())))?;
    let before = tree.search_position(parent);

    match judge_move(&before, &played, engine, seconds).await {
        Ok(judgment) => Ok(Some(judgment)),
        Err(e) if e.is_fatal() => Err(AnalysisError::EngineTerminated),
        Err(e) => {
            warn!(
                fen = %before.fen(),
                mv = %tree.uci(id).unwrap_or_default(),
                error = %e,
                "move skipped"
            );
            Ok(None)
        }
    }
}

/// Comments the played move, adds the engine line as a variation and sets
/// the severity glyph
fn annotate(
    tree: &mut GameTree,
    id: NodeId,
    judgment: &Judgment,
    config: &AnalysisConfig,
) -> Result<(), AnalysisError> {
    let parent = parent_of(tree, id)?;
    let played_best = tree
        .node(id)
        .mv
        .as_ref()
        .is_some_and(|mv| judgment.played_best(mv));

    if !played_best {
        tree.node_mut(id).comment = Some(judgment.played_comment.clone());

        let before = tree.node(parent).position.clone();
        let mut history = tree.history(parent);
        let keep = if line_ends_game(&before, &mut history, &judgment.pv) {
            judgment.pv.len()
        } else {
            judgment.pv.len().min(config.short_pv_len)
        };

        if keep > 0 {
            let end = tree
                .add_line(parent, &judgment.pv[..keep])
                .ok_or_else(|| AnalysisError::Aborted("engine line does not fit the game".into()))?;
            let comment = line_end_comment(tree, end, judgment);
            if !comment.is_empty() {
                tree.node_mut(end).comment = Some(comment);
            }
        }
    }

    let severity = Severity::classify(judgment.best_eval, judgment.played_eval, &config.thresholds);
    tree.node_mut(id).nags = severity.nag().into_iter().collect();
    Ok(())
}

/// Whether playing `line` from `start` finishes the game, draw claims included
fn line_ends_game(start: &Chess, history: &mut Vec<String>, line: &[Move]) -> bool {
    let mut board = start.clone();
    for mv in line {
        history.push(repetition_key(&board));
        board = match board.play(mv.clone()) {
            Ok(next) => next,
            Err(_) => return false,
        };
    }
    is_game_over(&board, history)
}

/// Final comment of an engine line: why the game ended, or the evaluation
/// with search depth
fn line_end_comment(tree: &GameTree, end: NodeId, judgment: &Judgment) -> String {
    let board = &tree.node(end).position;
    if board.is_stalemate() {
        "Stalemate".to_string()
    } else if board.is_insufficient_material() {
        "Insufficient material to mate".to_string()
    } else if board.halfmoves() >= 100 {
        "Fifty move rule".to_string()
    } else if is_threefold(board, &tree.history(end)) {
        "Three-fold repetition".to_string()
    } else if board.is_checkmate() {
        String::new()
    } else {
        format!("{}/{}", judgment.best_comment, judgment.depth.unwrap_or(0))
    }
}

/// Rounded average centipawn loss per side, each loss capped at `max_cpl`.
/// Moves that beat the engine's choice count as negative losses.
fn average_losses(tree: &GameTree, plies: &[Ply], max_cpl: i32) -> (i32, i32) {
    let mut white = Vec::new();
    let mut black = Vec::new();
    for ply in plies {
        let Some(judgment) = &ply.judgment else {
            continue;
        };
        let loss = judgment.loss().min(max_cpl);
        match tree.mover(ply.id) {
            Some(Color::White) => white.push(loss),
            Some(Color::Black) => black.push(loss),
            None => {}
        }
    }

    (average(&white), average(&black))
}

fn average(losses: &[i32]) -> i32 {
    if losses.is_empty() {
        return 0;
    }
    (losses.iter().map(|&l| l as f64).sum::<f64>() / losses.len() as f64).round() as i32
}

fn log_judgment(
    tree: &GameTree,
    id: NodeId,
    judgment: &Judgment,
    flagged: bool,
    thresholds: &Thresholds,
) {
    let Some(parent) = tree.parent(id) else {
        return;
    };
    let severity = Severity::classify(judgment.best_eval, judgment.played_eval, thresholds);
    let before = &tree.node(parent).position;

    let mut board = before.clone();
    let mut pv = Vec::with_capacity(judgment.pv.len());
    for mv in &judgment.pv {
        pv.push(san_plus(&board, mv));
        board = match board.play(mv.clone()) {
            Ok(next) => next,
            Err(_) => break,
        };
    }

    debug!(
        fen = %tree.search_position(parent).fen(),
        played = %tree.node(id).san.as_deref().unwrap_or("?"),
        best = %san_plus(before, &judgment.best_move),
        best_eval = judgment.best_eval,
        best_comment = %judgment.best_comment,
        played_eval = judgment.played_eval,
        played_comment = %judgment.played_comment,
        pv = %pv.join(" "),
        delta = judgment.best_eval - judgment.played_eval,
        depth = judgment.depth.unwrap_or(0),
        nodes = judgment.nodes.unwrap_or(0),
        needs_annotation = flagged,
        severity = severity.as_str(),
        "judged move"
    );
}
