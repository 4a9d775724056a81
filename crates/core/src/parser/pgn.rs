//! PGN game parsing into a [`GameTree`]

use pgn_reader::{Nag, RawComment, RawTag, SanPlus, Skip, Visitor};
use shakmaty::fen::Fen;
use shakmaty::{CastlingMode, Chess};
use std::io::{self, Cursor};
use std::ops::ControlFlow;
use thiserror::Error;

use crate::game::{GameTree, NodeId};

/// Error type for PGN parsing operations
#[derive(Error, Debug)]
pub enum PgnError {
    #[error("failed to read PGN: {0}")]
    Io(#[from] io::Error),

    #[error("no game found in PGN text")]
    NoGame,
}

/// Holds state while parsing the movetext section
struct TreeBuilder {
    tree: GameTree,
    cursor: NodeId,
    /// Where to resume, and whether that line was broken, per open variation
    stack: Vec<(NodeId, bool)>,
    /// Set once an illegal move is met; the rest of the line is ignored
    broken: bool,
}

/// Visitor implementation for parsing PGN
struct GameParser;

impl Visitor for GameParser {
    type Tags = Vec<(String, String)>;
    type Movetext = TreeBuilder;
    type Output = GameTree;

    fn begin_tags(&mut self) -> ControlFlow<Self::Output, Self::Tags> {
        ControlFlow::Continue(Vec::new())
    }

    fn tag(
        &mut self,
        tags: &mut Self::Tags,
        name: &[u8],
        value: RawTag<'_>,
    ) -> ControlFlow<Self::Output> {
        let name = String::from_utf8_lossy(name).to_string();
        let value = value.decode_utf8_lossy().to_string();
        tags.push((name, value));
        ControlFlow::Continue(())
    }

    fn begin_movetext(&mut self, tags: Self::Tags) -> ControlFlow<Self::Output, Self::Movetext> {
        let mut errors = Vec::new();
        let start = match start_position(&tags) {
            Ok(position) => position,
            Err(e) => {
                errors.push(e);
                Chess::default()
            }
        };

        let mut tree = GameTree::new(start);
        for (name, value) in tags {
            tree.set_header(&name, value);
        }
        tree.errors = errors;

        let cursor = tree.root();
        ControlFlow::Continue(TreeBuilder {
            tree,
            cursor,
            stack: Vec::new(),
            broken: false,
        })
    }

    fn san(&mut self, movetext: &mut Self::Movetext, san: SanPlus) -> ControlFlow<Self::Output> {
        if movetext.broken {
            return ControlFlow::Continue(());
        }

        let position = &movetext.tree.node(movetext.cursor).position;
        let added = san
            .san
            .to_move(position)
            .ok()
            .and_then(|m| movetext.tree.add_variation(movetext.cursor, m));

        match added {
            Some(node) => movetext.cursor = node,
            None => {
                let ply = movetext.tree.path(movetext.cursor).len();
                movetext
                    .tree
                    .errors
                    .push(format!("illegal move {} at ply {}", san, ply));
                movetext.broken = true;
            }
        }

        ControlFlow::Continue(())
    }

    fn nag(&mut self, movetext: &mut Self::Movetext, nag: Nag) -> ControlFlow<Self::Output> {
        if !movetext.broken {
            movetext.tree.node_mut(movetext.cursor).nags.push(nag.0);
        }
        ControlFlow::Continue(())
    }

    fn comment(
        &mut self,
        movetext: &mut Self::Movetext,
        comment: RawComment<'_>,
    ) -> ControlFlow<Self::Output> {
        if movetext.broken {
            return ControlFlow::Continue(());
        }
        let text = String::from_utf8_lossy(comment.as_bytes()).trim().to_string();
        let node = movetext.tree.node_mut(movetext.cursor);
        node.comment = Some(match node.comment.take() {
            Some(existing) => format!("{} {}", existing, text),
            None => text,
        });
        ControlFlow::Continue(())
    }

    fn begin_variation(
        &mut self,
        movetext: &mut Self::Movetext,
    ) -> ControlFlow<Self::Output, Skip> {
        movetext.stack.push((movetext.cursor, movetext.broken));
        match movetext.tree.parent(movetext.cursor) {
            Some(parent) if !movetext.broken => movetext.cursor = parent,
            _ => {
                // nothing to branch from
                movetext.broken = true;
            }
        }
        ControlFlow::Continue(Skip(false))
    }

    fn end_variation(&mut self, movetext: &mut Self::Movetext) -> ControlFlow<Self::Output> {
        if let Some((cursor, broken)) = movetext.stack.pop() {
            movetext.cursor = cursor;
            movetext.broken = broken;
        }
        ControlFlow::Continue(())
    }

    fn end_game(&mut self, movetext: Self::Movetext) -> Self::Output {
        movetext.tree
    }
}

/// Start position from the `FEN` tag, or the standard one
fn start_position(tags: &[(String, String)]) -> Result<Chess, String> {
    let Some((_, fen)) = tags.iter().find(|(k, _)| k == "FEN") else {
        return Ok(Chess::default());
    };
    let chess960 = tags
        .iter()
        .any(|(k, v)| k == "Variant" && v.to_ascii_lowercase().contains("960"));
    let mode = if chess960 {
        CastlingMode::Chess960
    } else {
        CastlingMode::Standard
    };
    let parsed: Fen = fen
        .parse()
        .map_err(|e| format!("invalid FEN tag {:?}: {}", fen, e))?;
    parsed
        .into_position(mode)
        .map_err(|e| format!("illegal FEN position {:?}: {}", fen, e))
}

/// Parses the first game in `pgn`.
///
/// Illegal moves do not fail the call; they are listed in
/// [`GameTree::errors`] so the caller can decide to skip the game.
pub fn parse_game(pgn: &str) -> Result<GameTree, PgnError> {
    let mut parser = GameParser;
    let mut reader = pgn_reader::Reader::new(Cursor::new(pgn.as_bytes()));
    reader.read_game(&mut parser)?.ok_or(PgnError::NoGame)
}
