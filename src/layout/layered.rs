use super::*;

#[derive(Debug, Clone, Copy)]
struct Slot {
    rank: usize,
    /// Extent along the rank (cross) axis.
    breadth: f32,
    /// Extent along the layering (main) axis.
    depth: f32,
    center: f32,
}

/// Rank-based layered layout. Every node gets a fresh position; edges pass
/// through unchanged.
pub fn layout(nodes: &[Node], edges: &[Edge], direction: Direction, config: &LayoutConfig) -> LayoutResult {
    let mut placed = nodes.to_vec();
    if nodes.is_empty() {
        return LayoutResult {
            nodes: placed,
            edges: edges.to_vec(),
        };
    }

    let node_ids: Vec<String> = nodes.iter().map(|node| node.id.clone()).collect();
    let node_order: HashMap<String, usize> = node_ids
        .iter()
        .enumerate()
        .map(|(idx, id)| (id.clone(), idx))
        .collect();

    let ranks = compute_ranks(&node_ids, edges, &node_order);
    let max_rank = ranks.values().copied().max().unwrap_or(0);
    let mut rank_nodes: Vec<Vec<String>> = vec![Vec::new(); max_rank + 1];
    for id in &node_ids {
        let rank = ranks.get(id).copied().unwrap_or(0);
        rank_nodes[rank].push(id.clone());
    }
    order_rank_nodes(&mut rank_nodes, edges, config.order_passes);

    let mut slots: HashMap<String, Slot> = HashMap::with_capacity(nodes.len());
    for node in nodes {
        let (width, height) = node_size(&node.label, config);
        let (breadth, depth) = match direction {
            Direction::Vertical => (width, height),
            Direction::Horizontal => (height, width),
        };
        slots.insert(
            node.id.clone(),
            Slot {
                rank: ranks.get(&node.id).copied().unwrap_or(0),
                breadth,
                depth,
                center: 0.0,
            },
        );
    }

    let parents = parent_index(edges);
    for bucket in &rank_nodes {
        place_rank(bucket, &parents, &mut slots, config.node_spacing);
    }

    // Rank bands: each band is as deep as its deepest node.
    let mut band_depth = vec![0.0_f32; rank_nodes.len()];
    for slot in slots.values() {
        band_depth[slot.rank] = band_depth[slot.rank].max(slot.depth);
    }
    let mut band_center = Vec::with_capacity(band_depth.len());
    let mut cursor = 0.0_f32;
    for depth in &band_depth {
        band_center.push(cursor + depth / 2.0);
        cursor += depth + config.rank_spacing;
    }

    let min_edge = slots
        .values()
        .map(|slot| slot.center - slot.breadth / 2.0)
        .fold(f32::MAX, f32::min);

    for node in &mut placed {
        let Some(slot) = slots.get(&node.id) else {
            continue;
        };
        let cross = slot.center - min_edge;
        let main = band_center[slot.rank];
        let (cx, cy) = match direction {
            Direction::Vertical => (cross, main),
            Direction::Horizontal => (main, cross),
        };
        node.position = Position::new(cx - config.offset_x, cy - config.offset_y);
    }

    LayoutResult {
        nodes: placed,
        edges: edges.to_vec(),
    }
}

fn parent_index(edges: &[Edge]) -> HashMap<&str, Vec<&str>> {
    let mut parents: HashMap<&str, Vec<&str>> = HashMap::new();
    for edge in edges {
        if edge.source == edge.target {
            continue;
        }
        parents
            .entry(edge.target.as_str())
            .or_default()
            .push(edge.source.as_str());
    }
    parents
}

/// Packs one rank in order, pulling each node toward the mean centre of its
/// already-placed parents, then shifts the rank so the pull balances out.
fn place_rank(bucket: &[String], parents: &HashMap<&str, Vec<&str>>, slots: &mut HashMap<String, Slot>, gap: f32) {
    let Some(rank) = bucket.first().and_then(|id| slots.get(id)).map(|slot| slot.rank) else {
        return;
    };

    let mut desired: Vec<Option<f32>> = Vec::with_capacity(bucket.len());
    for id in bucket {
        let anchors: Vec<f32> = parents
            .get(id.as_str())
            .into_iter()
            .flatten()
            .filter_map(|parent| slots.get(*parent))
            .filter(|slot| slot.rank < rank)
            .map(|slot| slot.center)
            .collect();
        if anchors.is_empty() {
            desired.push(None);
        } else {
            desired.push(Some(anchors.iter().sum::<f32>() / anchors.len() as f32));
        }
    }

    let breadths: Vec<f32> = bucket
        .iter()
        .map(|id| slots.get(id).map(|slot| slot.breadth).unwrap_or(0.0))
        .collect();

    let mut centers: Vec<f32> = Vec::with_capacity(bucket.len());
    for (idx, breadth) in breadths.iter().enumerate() {
        let packed = match centers.last() {
            Some(prev) => prev + (breadths[idx - 1] + breadth) / 2.0 + gap,
            None => breadth / 2.0,
        };
        let center = match desired[idx] {
            Some(target) if idx == 0 || target > packed => target,
            _ => packed,
        };
        centers.push(center);
    }

    let pulls: Vec<f32> = desired
        .iter()
        .zip(&centers)
        .filter_map(|(target, center)| target.map(|target| target - center))
        .collect();
    let shift = if pulls.is_empty() {
        // Unanchored ranks are centred on the origin.
        let first = centers.first().copied().unwrap_or(0.0) - breadths.first().copied().unwrap_or(0.0) / 2.0;
        let last = centers.last().copied().unwrap_or(0.0) + breadths.last().copied().unwrap_or(0.0) / 2.0;
        -(first + last) / 2.0
    } else {
        pulls.iter().sum::<f32>() / pulls.len() as f32
    };

    for (id, center) in bucket.iter().zip(centers) {
        if let Some(slot) = slots.get_mut(id) {
            slot.center = center + shift;
        }
    }
}
