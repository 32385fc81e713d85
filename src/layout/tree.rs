use super::*;

/// One child slot of a placed parent. `expand` is false when the child was
/// already reached through another path (cycle, self edge or shared child);
/// such a slot still reserves a leaf's footprint but is not descended into.
#[derive(Debug, Clone)]
struct ChildSlot {
    id: String,
    expand: bool,
}

/// Spanning tree of the graph as seen from the root, with every subtree
/// width resolved.
#[derive(Debug, Clone, Default)]
pub struct TreePlan {
    slots: HashMap<String, Vec<ChildSlot>>,
    widths: HashMap<String, f32>,
    min_spacing: f32,
}

impl TreePlan {
    pub fn build(edges: &[Edge], root_id: &str, min_spacing: f32) -> Self {
        let children = children_index(edges);
        let min_spacing = min_spacing.max(0.0);
        let mut plan = TreePlan {
            slots: HashMap::new(),
            widths: HashMap::new(),
            min_spacing,
        };

        let mut visited: HashSet<String> = HashSet::new();
        visited.insert(root_id.to_string());
        let mut post_order: Vec<String> = Vec::new();
        let mut stack: Vec<(String, usize)> = vec![(root_id.to_string(), 0)];
        plan.slots.insert(root_id.to_string(), Vec::new());

        while let Some((node_id, next_child)) = stack.pop() {
            let kids = children.get(&node_id).map(Vec::as_slice).unwrap_or(&[]);
            let Some(child_id) = kids.get(next_child) else {
                post_order.push(node_id);
                continue;
            };
            stack.push((node_id.clone(), next_child + 1));
            let expand = visited.insert(child_id.clone());
            if let Some(slots) = plan.slots.get_mut(&node_id) {
                slots.push(ChildSlot {
                    id: child_id.clone(),
                    expand,
                });
            }
            if expand {
                plan.slots.insert(child_id.clone(), Vec::new());
                stack.push((child_id.clone(), 0));
            }
        }

        for node_id in post_order {
            let total: f32 = plan
                .slots
                .get(&node_id)
                .map(|slots| slots.iter().map(|slot| plan.slot_width(slot)).sum::<f32>())
                .unwrap_or(0.0);
            plan.widths.insert(node_id, total.max(min_spacing));
        }

        plan
    }

    /// Horizontal footprint of `node_id`'s subtree. Nodes outside the
    /// spanning tree get a leaf's width.
    pub fn width(&self, node_id: &str) -> f32 {
        self.widths
            .get(node_id)
            .copied()
            .unwrap_or(self.min_spacing)
    }

    /// Children of `node_id` in left-to-right order, including slots that are
    /// not descended into.
    pub fn children(&self, node_id: &str) -> Vec<&str> {
        self.slots
            .get(node_id)
            .map(|slots| slots.iter().map(|slot| slot.id.as_str()).collect())
            .unwrap_or_default()
    }

    fn slot_width(&self, slot: &ChildSlot) -> f32 {
        if slot.expand {
            self.width(&slot.id)
        } else {
            self.min_spacing
        }
    }
}

/// Direct children of every node, in edge order.
pub fn children_index(edges: &[Edge]) -> HashMap<String, Vec<String>> {
    let mut children: HashMap<String, Vec<String>> = HashMap::new();
    for edge in edges {
        children
            .entry(edge.source.clone())
            .or_default()
            .push(edge.target.clone());
    }
    children
}

/// Subtree width of every node reachable from `root_id`.
pub fn subtree_widths(edges: &[Edge], root_id: &str, min_spacing: f32) -> HashMap<String, f32> {
    TreePlan::build(edges, root_id, min_spacing).widths
}

/// Places a generated tree: the root at the configured centre, each parent's
/// children side by side under it, every subtree as wide as its leaves need.
///
/// Only reachable nodes move; the rest keep their incoming positions. A
/// missing root leaves every node untouched.
pub fn layout_tree(
    nodes: &[Node],
    edges: &[Edge],
    root_id: &str,
    config: &TreeLayoutConfig,
) -> Vec<Node> {
    let mut placed = nodes.to_vec();
    if !nodes.iter().any(|node| node.id == root_id) {
        return placed;
    }

    let plan = TreePlan::build(edges, root_id, config.min_node_spacing);
    let positions = place(&plan, root_id, config);

    for node in &mut placed {
        if let Some(position) = positions.get(&node.id) {
            node.position = *position;
        }
    }
    placed
}

fn place(plan: &TreePlan, root_id: &str, config: &TreeLayoutConfig) -> HashMap<String, Position> {
    let mut positions: HashMap<String, Position> = HashMap::new();
    let mut stack: Vec<(String, f32, f32)> = vec![(root_id.to_string(), config.center_x, config.center_y)];

    while let Some((node_id, x, y)) = stack.pop() {
        positions.insert(node_id.clone(), Position::new(x, y));
        let Some(slots) = plan.slots.get(&node_id) else {
            continue;
        };
        let child_y = y + config.level_width;
        let mut cursor = x - plan.width(&node_id) / 2.0;
        for slot in slots {
            let slot_width = plan.slot_width(slot);
            if slot.expand {
                stack.push((slot.id.clone(), cursor + slot_width / 2.0, child_y));
            }
            cursor += slot_width;
        }
    }

    positions
}
