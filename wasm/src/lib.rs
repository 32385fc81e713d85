use mindmap_canvas::config::{Config, parse_config};
use mindmap_canvas::generation::{decorate_edges, mindmap_from_response};
use mindmap_canvas::ir::{Direction, Graph};
use mindmap_canvas::layout::{AutoLayout, layout};
use mindmap_canvas::layout_dump::to_json_string;
use mindmap_canvas::parser::parse_json;
use mindmap_canvas::validate::validate;
use mindmap_canvas::MindmapError;
use wasm_bindgen::prelude::*;

fn build_config(options_json: Option<String>) -> Result<Config, String> {
    match options_json {
        Some(raw) if !raw.trim().is_empty() => parse_config(&raw).map_err(|error| error.to_string()),
        _ => Ok(Config::default()),
    }
}

fn read_graph(graph_json: &str, config: &Config) -> Result<Graph, String> {
    let candidate = parse_json(graph_json).map_err(|error| MindmapError::from(error).user_message())?;
    let mut graph = validate(&candidate).map_err(|error| MindmapError::from(error).user_message())?;
    decorate_edges(&mut graph, &config.edges);
    Ok(graph)
}

fn dump(graph: &Graph) -> Result<String, String> {
    to_json_string(graph).map_err(|error| error.to_string())
}

fn layout_mindmap_json(response: &str, options_json: Option<String>) -> Result<String, String> {
    let config = build_config(options_json)?;
    let mut auto = AutoLayout::new(Direction::Vertical, config.layout.clone());
    let graph = mindmap_from_response(response, &config, &mut auto).map_err(|error| error.user_message())?;
    dump(&graph)
}

fn auto_layout_json(graph_json: &str, direction: Option<String>) -> Result<String, String> {
    let direction = match direction.as_deref() {
        Some(token) => Direction::from_token(token).ok_or_else(|| format!("unknown direction `{token}`"))?,
        None => Direction::Vertical,
    };
    let config = Config::default();
    let graph = read_graph(graph_json, &config)?;
    dump(&layout(&graph.nodes, &graph.edges, direction, &config.layout).into_graph())
}

fn layout_tree_json(graph_json: &str, options_json: Option<String>) -> Result<String, String> {
    let config = build_config(options_json)?;
    let mut graph = read_graph(graph_json, &config)?;
    graph.nodes = mindmap_canvas::layout::layout_tree(&graph.nodes, &graph.edges, &config.tree.root_id, &config.tree);
    dump(&graph)
}

/// Full pipeline: model response text to positioned ReactFlow JSON.
#[wasm_bindgen]
pub fn layout_mindmap(response: &str, options_json: Option<String>) -> Result<String, JsValue> {
    layout_mindmap_json(response, options_json).map_err(|error| JsValue::from_str(&error))
}

#[wasm_bindgen]
pub fn auto_layout(graph_json: &str, direction: Option<String>) -> Result<String, JsValue> {
    auto_layout_json(graph_json, direction).map_err(|error| JsValue::from_str(&error))
}

#[wasm_bindgen]
pub fn layout_tree(graph_json: &str, options_json: Option<String>) -> Result<String, JsValue> {
    layout_tree_json(graph_json, options_json).map_err(|error| JsValue::from_str(&error))
}

#[cfg(test)]
mod tests {
    use serde_json::Value;

    use crate::{auto_layout_json, layout_mindmap_json, layout_tree_json};

    const GRAPH: &str = r#"{
  "nodes": [
    { "id": "1", "data": { "label": "Root" }, "position": { "x": 0, "y": 0 } },
    { "id": "2", "data": { "label": "Child" }, "position": { "x": 0, "y": 0 } }
  ],
  "edges": [{ "id": "e1-2", "source": "1", "target": "2" }]
}"#;

    fn position(json: &str, index: usize) -> (f64, f64) {
        let value: Value = serde_json::from_str(json).expect("output is JSON");
        let position = &value["nodes"][index]["position"];
        (
            position["x"].as_f64().expect("x"),
            position["y"].as_f64().expect("y"),
        )
    }

    #[test]
    fn lays_out_model_response() {
        let response = format!("```json\n{GRAPH}\n```");
        let output = layout_mindmap_json(&response, None).expect("pipeline");
        assert!(output.contains("\"markerEnd\""));
        assert!(position(&output, 1).1 > position(&output, 0).1);
    }

    #[test]
    fn tree_layout_honours_options() {
        let output = layout_tree_json(GRAPH, Some(r#"{ "tree": { "levelWidth": 120 } }"#.to_string()))
            .expect("tree layout");
        assert_eq!(position(&output, 0), (400.0, 300.0));
        assert_eq!(position(&output, 1), (400.0, 420.0));
    }

    #[test]
    fn horizontal_auto_layout_grows_along_x() {
        let output = auto_layout_json(GRAPH, Some("LR".to_string())).expect("auto layout");
        assert!(position(&output, 1).0 > position(&output, 0).0);
    }

    #[test]
    fn errors_are_user_messages() {
        let err = layout_mindmap_json("no json here", None).unwrap_err();
        assert!(err.starts_with("API Error:"));
        assert!(auto_layout_json(GRAPH, Some("up".to_string())).is_err());
    }
}
