//! Board positions as handed to the engine

use shakmaty::fen::Fen;
use shakmaty::san::San;
use shakmaty::{CastlingMode, Chess, Color, EnPassantMode, Move, Position};

/// A position reached by playing `moves` from `start`.
///
/// The engine receives the start FEN plus the move list so it can see
/// repetitions; everything else in the crate only looks at `board()`.
#[derive(Debug, Clone)]
pub struct SearchPosition {
    start_fen: String,
    moves: Vec<String>,
    board: Chess,
}

impl SearchPosition {
    pub fn new(start: Chess) -> Self {
        SearchPosition {
            start_fen: fen_of(&start),
            moves: Vec::new(),
            board: start,
        }
    }

    pub fn board(&self) -> &Chess {
        &self.board
    }

    pub fn turn(&self) -> Color {
        self.board.turn()
    }

    pub fn fen(&self) -> String {
        fen_of(&self.board)
    }

    /// Chess960 positions need the engine switched to `UCI_Chess960`
    pub fn castling_mode(&self) -> CastlingMode {
        self.board.castles().mode()
    }

    /// Moves played since the start position, in UCI notation
    pub fn moves(&self) -> &[String] {
        &self.moves
    }

    /// The UCI `position` command for this position
    pub fn uci_command(&self) -> String {
        if self.moves.is_empty() {
            format!("position fen {}", self.start_fen)
        } else {
            format!("position fen {} moves {}", self.start_fen, self.moves.join(" "))
        }
    }

    /// Returns the position after `mv`, or `None` if it is illegal here
    pub fn play(&self, mv: &Move) -> Option<SearchPosition> {
        let board = self.board.clone().play(mv.clone()).ok()?;
        let mut moves = self.moves.clone();
        moves.push(move_to_uci(mv, self.castling_mode()));
        Some(SearchPosition {
            start_fen: self.start_fen.clone(),
            moves,
            board,
        })
    }
}

/// Full FEN of a position
pub fn fen_of(position: &Chess) -> String {
    Fen::from_position(position, EnPassantMode::Legal).to_string()
}

/// Board, side to move and castling fields of the FEN.
///
/// Opening datasets key their positions this way, ignoring move counters.
pub fn position_signature(position: &Chess) -> String {
    fen_of(position)
        .split(' ')
        .take(3)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Board, side to move, castling and en passant: equal keys mean a repeated position
pub fn repetition_key(position: &Chess) -> String {
    fen_of(position)
        .split(' ')
        .take(4)
        .collect::<Vec<_>>()
        .join(" ")
}

/// UCI notation of `mv`. Castling is king to destination in standard
/// chess and king takes rook in Chess960.
pub fn move_to_uci(mv: &Move, mode: CastlingMode) -> String {
    mv.clone().to_uci(mode).to_string()
}

/// Finds the legal move in `position` written as `uci`
pub fn uci_to_move(position: &Chess, uci: &str) -> Option<Move> {
    let mode = position.castles().mode();
    position
        .legal_moves()
        .iter()
        .find(|m| move_to_uci(m, mode) == uci)
        .cloned()
}

/// Converts a UCI move sequence to moves, checking each against the board.
///
/// Returns the offending UCI token when a move is not legal.
pub fn uci_line(position: &Chess, line: &[String]) -> Result<Vec<Move>, String> {
    let mut board = position.clone();
    let mut moves = Vec::with_capacity(line.len());
    for uci in line {
        let mv = uci_to_move(&board, uci).ok_or_else(|| uci.clone())?;
        board = board.play(mv.clone()).map_err(|_| uci.clone())?;
        moves.push(mv);
    }
    Ok(moves)
}

/// SAN of `mv` in `position`, with `+` or `#` suffix
pub fn san_plus(position: &Chess, mv: &Move) -> String {
    let san = San::from_move(position, mv.clone()).to_string();
    match position.clone().play(mv.clone()) {
        Ok(after) if after.is_checkmate() => format!("{}#", san),
        Ok(after) if after.is_check() => format!("{}+", san),
        _ => san,
    }
}

/// Whether the game is over in `position`, counting claimable draws.
///
/// `history` holds repetition keys of the earlier positions on the same line.
pub fn is_game_over(position: &Chess, history: &[String]) -> bool {
    position.is_checkmate()
        || position.is_stalemate()
        || position.is_insufficient_material()
        || position.halfmoves() >= 100
        || is_threefold(position, history)
}

pub fn is_threefold(position: &Chess, history: &[String]) -> bool {
    let key = repetition_key(position);
    history.iter().filter(|k| **k == key).count() >= 2
}
