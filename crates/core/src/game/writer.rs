//! PGN export for game trees

use shakmaty::{Color, Position};

use super::tree::{GameTree, NodeId};

const ROSTER: [&str; 7] = ["Event", "Site", "Date", "Round", "White", "Black", "Result"];

/// Serializes a game as PGN, re-wrapped to `width` columns
pub fn write_game(tree: &GameTree, width: usize) -> String {
    let mut out = String::new();
    for (name, value) in ordered_headers(tree) {
        out.push_str(&format!("[{} \"{}\"]\n", name, escape(value)));
    }
    out.push('\n');

    let mut tokens = Vec::new();
    if let Some(comment) = &tree.node(tree.root()).comment {
        push_comment(&mut tokens, comment);
    }
    write_line(tree, tree.root(), true, &mut tokens);
    tokens.push(tree.header("Result").unwrap_or("*").to_string());

    out.push_str(&wrap_tokens(&tokens, width).join("\n"));
    out
}

/// Seven tag roster first, then everything else in insertion order
fn ordered_headers(tree: &GameTree) -> Vec<(&str, &str)> {
    let mut headers: Vec<(&str, &str)> = ROSTER
        .iter()
        .filter_map(|name| tree.header(name).map(|v| (*name, v)))
        .collect();
    headers.extend(
        tree.headers()
            .iter()
            .filter(|(k, _)| !ROSTER.contains(&k.as_str()))
            .map(|(k, v)| (k.as_str(), v.as_str())),
    );
    headers
}

fn escape(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

fn push_comment(tokens: &mut Vec<String>, comment: &str) {
    let text = comment.replace('}', "");
    let text = text.trim();
    if text.is_empty() {
        return;
    }
    tokens.push("{".to_string());
    tokens.extend(text.split_whitespace().map(str::to_string));
    tokens.push("}".to_string());
}

/// Writes the continuation of `from`: its main child, that child's
/// siblings as variations, then onwards
fn write_line(tree: &GameTree, from: NodeId, mut numbered: bool, tokens: &mut Vec<String>) {
    let mut current = from;
    loop {
        let children: Vec<NodeId> = tree.children(current).collect();
        let Some((&main, sidelines)) = children.split_first() else {
            break;
        };

        numbered = write_move(tree, main, numbered, tokens);

        for &side in sidelines {
            tokens.push("(".to_string());
            write_move(tree, side, true, tokens);
            write_line(tree, side, false, tokens);
            tokens.push(")".to_string());
            numbered = true;
        }

        current = main;
    }
}

/// Writes one move with its number, glyphs and comment. Returns whether the
/// following move needs an explicit number.
fn write_move(tree: &GameTree, id: NodeId, numbered: bool, tokens: &mut Vec<String>) -> bool {
    let node = tree.node(id);
    let before = tree
        .parent(id)
        .map(|p| &tree.node(p).position)
        .unwrap_or(&node.position);
    let number = before.fullmoves().get();
    match before.turn() {
        Color::White => tokens.push(format!("{}.", number)),
        Color::Black if numbered => tokens.push(format!("{}...", number)),
        Color::Black => {}
    }
    tokens.push(node.san.clone().unwrap_or_default());
    for nag in &node.nags {
        tokens.push(format!("${}", nag));
    }
    match &node.comment {
        Some(comment) if !comment.trim().is_empty() => {
            push_comment(tokens, comment);
            true
        }
        _ => false,
    }
}

/// Greedy line filling that never splits a token
fn wrap_tokens(tokens: &[String], width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut line = String::new();
    for token in tokens {
        if line.is_empty() {
            line.push_str(token);
        } else if line.len() + 1 + token.len() <= width {
            line.push(' ');
            line.push_str(token);
        } else {
            lines.push(std::mem::take(&mut line));
            line.push_str(token);
        }
    }
    if !line.is_empty() {
        lines.push(line);
    }
    lines
}
