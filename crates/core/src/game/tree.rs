//! Arena-backed game tree
//!
//! Nodes live in a `Vec` and refer to each other by [`NodeId`]. Removing a
//! variation only unlinks it from its parent and marks its nodes dead; ids
//! are never reused, so ids held across mutations stay valid.

use shakmaty::{Chess, Color, Move, Position};

use super::position::{move_to_uci, repetition_key, san_plus, SearchPosition};

/// Index of a node in a [`GameTree`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// One ply of the game, or the root
#[derive(Debug, Clone)]
pub struct Node {
    pub parent: Option<NodeId>,
    /// Move that produced this node; `None` only for the root
    pub mv: Option<Move>,
    /// SAN of `mv` with check suffix
    pub san: Option<String>,
    /// Position after `mv`
    pub position: Chess,
    pub comment: Option<String>,
    pub nags: Vec<u8>,
    /// Child variations; the first one is the main continuation
    pub children: Vec<NodeId>,
    pub alive: bool,
}

/// A single game: tag pairs plus the move tree
#[derive(Debug, Clone)]
pub struct GameTree {
    headers: Vec<(String, String)>,
    nodes: Vec<Node>,
    /// Problems found while parsing; a game with errors is never analyzed
    pub errors: Vec<String>,
}

impl GameTree {
    /// Creates a tree with only a root holding `start`
    pub fn new(start: Chess) -> Self {
        GameTree {
            headers: Vec::new(),
            nodes: vec![Node {
                parent: None,
                mv: None,
                san: None,
                position: start,
                comment: None,
                nags: Vec::new(),
                children: Vec::new(),
                alive: true,
            }],
            errors: Vec::new(),
        }
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.0]
    }

    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Short description for log lines: `White vs Black (Event)`
    pub fn summary(&self) -> String {
        format!(
            "{} vs {} ({})",
            self.header("White").unwrap_or("?"),
            self.header("Black").unwrap_or("?"),
            self.header("Event").unwrap_or("?")
        )
    }

    /// Sets a tag, replacing an existing value in place
    pub fn set_header(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        match self.headers.iter_mut().find(|(k, _)| k == name) {
            Some(entry) => entry.1 = value,
            None => self.headers.push((name.to_string(), value)),
        }
    }

    /// Live children of `id`, main continuation first
    pub fn children(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes[id.0]
            .children
            .iter()
            .copied()
            .filter(move |c| self.nodes[c.0].alive)
    }

    /// Main continuation of `id`
    pub fn next(&self, id: NodeId) -> Option<NodeId> {
        self.children(id).next()
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].parent
    }

    /// Whether `id` is the first child of its parent all the way up
    pub fn is_mainline(&self, id: NodeId) -> bool {
        let mut current = id;
        while let Some(parent) = self.parent(current) {
            if self.next(parent) != Some(current) {
                return false;
            }
            current = parent;
        }
        true
    }

    /// Main line nodes from the root to the last move, root included
    pub fn mainline(&self) -> Vec<NodeId> {
        let mut line = vec![self.root()];
        let mut current = self.root();
        while let Some(next) = self.next(current) {
            line.push(next);
            current = next;
        }
        line
    }

    /// Last node of the main line
    pub fn end(&self) -> NodeId {
        self.end_of(self.root())
    }

    /// Last node reached by following main continuations from `id`
    pub fn end_of(&self, id: NodeId) -> NodeId {
        let mut current = id;
        while let Some(next) = self.next(current) {
            current = next;
        }
        current
    }

    /// Number of plies on the main line
    pub fn ply_count(&self) -> usize {
        self.mainline().len() - 1
    }

    /// Adds `mv` as a new child of `parent` and returns it.
    ///
    /// Returns `None` if the move is illegal in the parent position. An
    /// existing live child with the same move is reused.
    pub fn add_variation(&mut self, parent: NodeId, mv: Move) -> Option<NodeId> {
        if let Some(existing) = self
            .children(parent)
            .find(|c| self.nodes[c.0].mv.as_ref() == Some(&mv))
        {
            return Some(existing);
        }
        let before = &self.nodes[parent.0].position;
        let san = san_plus(before, &mv);
        let position = before.clone().play(mv.clone()).ok()?;
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            parent: Some(parent),
            mv: Some(mv),
            san: Some(san),
            position,
            comment: None,
            nags: Vec::new(),
            children: Vec::new(),
            alive: true,
        });
        self.nodes[parent.0].children.push(id);
        Some(id)
    }

    /// Adds a chain of moves starting at `parent`, returning the last node
    pub fn add_line(&mut self, parent: NodeId, moves: &[Move]) -> Option<NodeId> {
        let mut current = parent;
        for mv in moves {
            current = self.add_variation(current, mv.clone())?;
        }
        Some(current)
    }

    /// Unlinks `id` from its parent and marks its whole subtree dead.
    ///
    /// The root and main line nodes cannot be pruned.
    pub fn prune(&mut self, id: NodeId) -> bool {
        let Some(parent) = self.parent(id) else {
            return false;
        };
        if self.is_mainline(id) {
            return false;
        }
        self.nodes[parent.0].children.retain(|c| *c != id);
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            self.nodes[current.0].alive = false;
            stack.extend(self.nodes[current.0].children.iter().copied());
        }
        true
    }

    /// Number of live nodes, root included
    pub fn live_nodes(&self) -> usize {
        self.nodes.iter().filter(|n| n.alive).count()
    }

    /// Path of nodes from the root to `id`, both included
    pub fn path(&self, id: NodeId) -> Vec<NodeId> {
        let mut path = vec![id];
        let mut current = id;
        while let Some(parent) = self.parent(current) {
            path.push(parent);
            current = parent;
        }
        path.reverse();
        path
    }

    /// Engine view of the position at `id`
    pub fn search_position(&self, id: NodeId) -> SearchPosition {
        let mut search = SearchPosition::new(self.nodes[0].position.clone());
        for node in self.path(id).into_iter().skip(1) {
            if let Some(mv) = &self.nodes[node.0].mv {
                if let Some(next) = search.play(mv) {
                    search = next;
                }
            }
        }
        search
    }

    /// Repetition keys of every position strictly before `id` on its path
    pub fn history(&self, id: NodeId) -> Vec<String> {
        let mut path = self.path(id);
        path.pop();
        path.into_iter()
            .map(|n| repetition_key(&self.nodes[n.0].position))
            .collect()
    }

    /// Color that played the move leading to `id`
    pub fn mover(&self, id: NodeId) -> Option<Color> {
        self.parent(id).map(|p| self.nodes[p.0].position.turn())
    }

    /// UCI of the move leading to `id`
    pub fn uci(&self, id: NodeId) -> Option<String> {
        let node = &self.nodes[id.0];
        node.mv
            .as_ref()
            .map(|mv| move_to_uci(mv, node.position.castles().mode()))
    }

    /// Strips comments, glyphs and every non-main variation.
    ///
    /// Annotation is always computed from scratch on the bare main line.
    pub fn clean(&mut self) {
        let mainline = self.mainline();
        for id in mainline {
            let sidelines: Vec<NodeId> = self.children(id).skip(1).collect();
            for side in sidelines {
                self.prune(side);
            }
            let node = &mut self.nodes[id.0];
            node.comment = None;
            node.nags.clear();
        }
    }
}
