use crate::error::ValidationError;
use crate::ir::{Edge, Graph, Node, Position};
use serde_json::{Map, Value};

/// Checks a parsed candidate mindmap and converts it into a [`Graph`].
///
/// Nodes take the surface's shape `{ id, data: { label }, position: { x, y } }`
/// (a top-level `label` is accepted too); edges take `{ id, source, target }`.
/// Ids may be strings or numbers. Beyond field shape, node ids and edge ids
/// must be unique and every edge endpoint must name a node.
pub fn validate(candidate: &Value) -> Result<Graph, ValidationError> {
    let object = candidate.as_object().ok_or(ValidationError::NotAnObject)?;
    let raw_nodes = sequence(object, "nodes")?;
    let raw_edges = sequence(object, "edges")?;
    if raw_nodes.is_empty() {
        return Err(ValidationError::EmptyNodes);
    }

    let nodes = raw_nodes
        .iter()
        .enumerate()
        .map(|(index, raw)| parse_node(index, raw))
        .collect::<Result<Vec<_>, _>>()?;
    let edges = raw_edges
        .iter()
        .enumerate()
        .map(|(index, raw)| parse_edge(index, raw))
        .collect::<Result<Vec<_>, _>>()?;

    let graph = Graph::from_parts(nodes, edges);
    graph.check_integrity()?;
    Ok(graph)
}

fn sequence<'a>(object: &'a Map<String, Value>, key: &'static str) -> Result<&'a Vec<Value>, ValidationError> {
    object
        .get(key)
        .and_then(Value::as_array)
        .ok_or(ValidationError::MissingSequence(key))
}

fn parse_node(index: usize, raw: &Value) -> Result<Node, ValidationError> {
    let invalid = |reason| ValidationError::InvalidNode { index, reason };
    let id = identifier(raw.get("id")).ok_or_else(|| invalid("missing id"))?;
    let label = raw
        .get("data")
        .and_then(|data| data.get("label"))
        .or_else(|| raw.get("label"))
        .and_then(Value::as_str)
        .filter(|label| !label.is_empty())
        .ok_or_else(|| invalid("missing label"))?;
    let position = raw.get("position").ok_or_else(|| invalid("missing position"))?;
    let x = position
        .get("x")
        .and_then(Value::as_f64)
        .ok_or_else(|| invalid("position.x is not a number"))?;
    let y = position
        .get("y")
        .and_then(Value::as_f64)
        .ok_or_else(|| invalid("position.y is not a number"))?;

    Ok(Node {
        id,
        label: label.to_string(),
        position: Position::new(x as f32, y as f32),
    })
}

fn parse_edge(index: usize, raw: &Value) -> Result<Edge, ValidationError> {
    let invalid = |reason| ValidationError::InvalidEdge { index, reason };
    let id = identifier(raw.get("id")).ok_or_else(|| invalid("missing id"))?;
    let source = identifier(raw.get("source")).ok_or_else(|| invalid("missing source"))?;
    let target = identifier(raw.get("target")).ok_or_else(|| invalid("missing target"))?;
    Ok(Edge::new(id, source, target))
}

fn identifier(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(text) if !text.is_empty() => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn node(id: &str, label: &str) -> Value {
        json!({ "id": id, "data": { "label": label }, "position": { "x": 0, "y": 0 } })
    }

    #[test]
    fn accepts_well_formed_candidate() {
        let candidate = json!({
            "nodes": [node("1", "Root"), node("2", "Child")],
            "edges": [{ "id": "e1-2", "source": "1", "target": "2" }]
        });
        let graph = validate(&candidate).expect("valid candidate");
        assert_eq!(graph.nodes.len(), 2);
        assert_eq!(graph.nodes[1].label, "Child");
        assert_eq!(graph.edges[0].target, "2");
        assert!(graph.is_consistent());
    }

    #[test]
    fn rejects_empty_nodes() {
        let candidate = json!({ "nodes": [], "edges": [] });
        assert_eq!(validate(&candidate), Err(ValidationError::EmptyNodes));
    }

    #[test]
    fn rejects_missing_or_non_sequence_fields() {
        assert_eq!(validate(&json!([1, 2])), Err(ValidationError::NotAnObject));
        assert_eq!(
            validate(&json!({ "nodes": [node("1", "Root")] })),
            Err(ValidationError::MissingSequence("edges"))
        );
        assert_eq!(
            validate(&json!({ "nodes": {}, "edges": [] })),
            Err(ValidationError::MissingSequence("nodes"))
        );
    }

    #[test]
    fn rejects_nodes_with_missing_fields() {
        let no_label = json!({ "id": "1", "data": {}, "position": { "x": 0, "y": 0 } });
        let text_x = json!({ "id": "1", "data": { "label": "A" }, "position": { "x": "0", "y": 0 } });
        let blank_id = json!({ "id": "", "data": { "label": "A" }, "position": { "x": 0, "y": 0 } });
        for bad in [no_label, text_x, blank_id] {
            let candidate = json!({ "nodes": [bad], "edges": [] });
            assert!(matches!(
                validate(&candidate),
                Err(ValidationError::InvalidNode { index: 0, .. })
            ));
        }
    }

    #[test]
    fn rejects_incomplete_edges() {
        let candidate = json!({
            "nodes": [node("1", "Root")],
            "edges": [{ "id": "e1", "source": "1" }]
        });
        assert!(matches!(
            validate(&candidate),
            Err(ValidationError::InvalidEdge { index: 0, reason: "missing target" })
        ));
    }

    #[test]
    fn rejects_duplicates_and_dangling_edges() {
        let dup_nodes = json!({ "nodes": [node("1", "A"), node("1", "B")], "edges": [] });
        assert_eq!(validate(&dup_nodes), Err(ValidationError::DuplicateNodeId("1".to_string())));

        let dangling = json!({
            "nodes": [node("1", "A")],
            "edges": [{ "id": "e1-7", "source": "1", "target": "7" }]
        });
        assert_eq!(
            validate(&dangling),
            Err(ValidationError::DanglingEdge {
                edge: "e1-7".to_string(),
                node: "7".to_string()
            })
        );

        let dup_edges = json!({
            "nodes": [node("1", "A"), node("2", "B")],
            "edges": [
                { "id": "e", "source": "1", "target": "2" },
                { "id": "e", "source": "2", "target": "1" }
            ]
        });
        assert_eq!(validate(&dup_edges), Err(ValidationError::DuplicateEdgeId("e".to_string())));
    }

    #[test]
    fn numeric_ids_and_flat_labels_are_accepted() {
        let candidate = json!({
            "nodes": [
                { "id": 1, "label": "Root", "position": { "x": 1.5, "y": 2 } },
                { "id": 2, "data": { "label": "Child" }, "position": { "x": 0, "y": 0 } }
            ],
            "edges": [{ "id": "e1-2", "source": 1, "target": 2 }]
        });
        let graph = validate(&candidate).expect("numeric ids");
        assert_eq!(graph.nodes[0].id, "1");
        assert_eq!(graph.nodes[0].position, Position::new(1.5, 2.0));
        assert_eq!(graph.edges[0].source, "1");
    }
}
