//! Structural and label edits on a [`Graph`].
//!
//! Every operation takes the current graph by reference and either returns the
//! edited copy or a [`MutationRejected`]; the input is never modified, so a
//! rejection leaves the caller's graph exactly as it was.

use crate::config::EdgeDefaults;
use crate::error::{MutationRejected, MindmapError, ValidationError};
use crate::ir::{Edge, Graph, Position};

pub type MutationResult = Result<Graph, MutationRejected>;

/// A connection request from the surface: drag from `source`'s handle to
/// `target`'s.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Connection {
    pub source: String,
    pub target: String,
}

impl Connection {
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum NodeChange {
    Position { id: String, position: Position },
    Remove { id: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EdgeChange {
    Remove { id: String },
}

fn ensure_unlocked(locked: bool) -> Result<(), MutationRejected> {
    if locked {
        return Err(MutationRejected::Locked);
    }
    Ok(())
}

fn ensure_node(graph: &Graph, id: &str) -> Result<(), MutationRejected> {
    if graph.contains_node(id) {
        Ok(())
    } else {
        Err(MutationRejected::UnknownNode(id.to_string()))
    }
}

/// `e<source>-<target>`, suffixed with a counter when that id is taken.
pub fn fresh_edge_id(graph: &Graph, source: &str, target: &str) -> String {
    let base = format!("e{source}-{target}");
    if !graph.contains_edge(&base) {
        return base;
    }
    let mut n = 1usize;
    loop {
        let candidate = format!("{base}-{n}");
        if !graph.contains_edge(&candidate) {
            return candidate;
        }
        n += 1;
    }
}

pub fn add_edge(connection: &Connection, graph: &Graph, locked: bool, defaults: &EdgeDefaults) -> MutationResult {
    ensure_unlocked(locked)?;
    ensure_node(graph, &connection.source)?;
    ensure_node(graph, &connection.target)?;
    if connection.source == connection.target {
        return Err(MutationRejected::SelfEdge(connection.source.clone()));
    }
    if graph.has_connection(&connection.source, &connection.target) {
        return Err(MutationRejected::DuplicateEdge {
            from: connection.source.clone(),
            to: connection.target.clone(),
        });
    }

    let mut next = graph.clone();
    let mut edge = Edge::new(
        fresh_edge_id(graph, &connection.source, &connection.target),
        connection.source.clone(),
        connection.target.clone(),
    );
    edge.style = defaults.style();
    next.edges.push(edge);
    Ok(next)
}

/// Stores a dragged position. Never triggers a re-layout.
pub fn move_node(id: &str, position: Position, graph: &Graph, locked: bool) -> MutationResult {
    ensure_unlocked(locked)?;
    ensure_node(graph, id)?;
    let mut next = graph.clone();
    if let Some(node) = next.node_mut(id) {
        node.position = position;
    }
    Ok(next)
}

/// Label edits are allowed in either lock state.
pub fn relabel_node(id: &str, label: &str, graph: &Graph) -> MutationResult {
    ensure_node(graph, id)?;
    let mut next = graph.clone();
    if let Some(node) = next.node_mut(id) {
        node.label = label.to_string();
    }
    Ok(next)
}

/// Drops a node together with every edge touching it.
pub fn remove_node(id: &str, graph: &Graph, locked: bool) -> MutationResult {
    ensure_unlocked(locked)?;
    ensure_node(graph, id)?;
    let mut next = graph.clone();
    next.nodes.retain(|node| node.id != id);
    next.edges.retain(|edge| edge.source != id && edge.target != id);
    Ok(next)
}

pub fn remove_edge(id: &str, graph: &Graph, locked: bool) -> MutationResult {
    ensure_unlocked(locked)?;
    if !graph.contains_edge(id) {
        return Err(MutationRejected::UnknownEdge(id.to_string()));
    }
    let mut next = graph.clone();
    next.edges.retain(|edge| edge.id != id);
    Ok(next)
}

/// Applies a batch of node changes. The whole batch is rejected if any change
/// is.
pub fn apply_node_changes(changes: &[NodeChange], graph: &Graph, locked: bool) -> MutationResult {
    ensure_unlocked(locked)?;
    let mut next = graph.clone();
    for change in changes {
        next = match change {
            NodeChange::Position { id, position } => move_node(id, *position, &next, locked)?,
            NodeChange::Remove { id } => remove_node(id, &next, locked)?,
        };
    }
    Ok(next)
}

pub fn apply_edge_changes(changes: &[EdgeChange], graph: &Graph, locked: bool) -> MutationResult {
    ensure_unlocked(locked)?;
    let mut next = graph.clone();
    for change in changes {
        next = match change {
            EdgeChange::Remove { id } => remove_edge(id, &next, locked)?,
        };
    }
    Ok(next)
}

/// Atomic swap to a freshly generated graph. Refuses graphs whose ids collide
/// or whose edges dangle.
pub fn replace_graph(graph: Graph) -> Result<Graph, MindmapError> {
    if graph.nodes.is_empty() {
        return Err(ValidationError::EmptyNodes.into());
    }
    graph.check_integrity()?;
    Ok(graph)
}
