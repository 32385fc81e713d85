mod layered;
mod ranking;
mod text;
mod tree;

pub use layered::layout;
pub use tree::{TreePlan, children_index, layout_tree, subtree_widths};
use ranking::*;
use text::*;

use crate::config::{LayoutConfig, TreeLayoutConfig};
use crate::ir::{Direction, Edge, Graph, Node, Position};
use std::collections::{HashMap, HashSet};
use tracing::debug;

#[derive(Debug, Clone, PartialEq)]
pub struct LayoutResult {
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
}

impl LayoutResult {
    pub fn into_graph(self) -> Graph {
        Graph::from_parts(self.nodes, self.edges)
    }
}

/// Re-runs the layered layout whenever the node or edge count differs from
/// the last graph it laid out. Position-only edits never trigger it.
#[derive(Debug, Clone)]
pub struct AutoLayout {
    pub direction: Direction,
    pub config: LayoutConfig,
    last_shape: Option<(usize, usize)>,
}

impl AutoLayout {
    pub fn new(direction: Direction, config: LayoutConfig) -> Self {
        Self {
            direction,
            config,
            last_shape: None,
        }
    }

    /// Structural-change hook. Returns true when `graph` was re-laid out.
    pub fn on_structural_change(&mut self, graph: &mut Graph) -> bool {
        let shape = graph.shape();
        if self.last_shape == Some(shape) {
            return false;
        }
        self.apply(graph);
        true
    }

    /// Lays `graph` out unconditionally.
    pub fn apply(&mut self, graph: &mut Graph) {
        let (nodes, edges) = graph.shape();
        debug!(nodes, edges, direction = ?self.direction, "auto layout");
        let result = layout(&graph.nodes, &graph.edges, self.direction, &self.config);
        graph.nodes = result.nodes;
        self.last_shape = Some(graph.shape());
    }

    pub fn reset(&mut self) {
        self.last_shape = None;
    }
}

impl Default for AutoLayout {
    fn default() -> Self {
        Self::new(Direction::Vertical, LayoutConfig::default())
    }
}

/// Initial placement of a generated map: tree placement from the root, then a
/// layered pass so ties left by the tree placement are resolved.
pub fn layout_generated(
    graph: &Graph,
    tree: &TreeLayoutConfig,
    auto: &mut AutoLayout,
) -> Graph {
    let nodes = layout_tree(&graph.nodes, &graph.edges, &tree.root_id, tree);
    let mut placed = Graph::from_parts(nodes, graph.edges.clone());
    auto.apply(&mut placed);
    placed
}
