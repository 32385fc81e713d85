use crate::ir::{EdgeKind, EdgeStyle, MarkerKind};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Options for the depth-first tree placement of a freshly generated map.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TreeLayoutConfig {
    pub center_x: f32,
    pub center_y: f32,
    pub min_node_spacing: f32,
    /// Vertical offset between a parent and its children. Zero keeps every
    /// node on the root's row and leaves depth separation to the layered pass.
    pub level_width: f32,
    pub root_id: String,
}

impl Default for TreeLayoutConfig {
    fn default() -> Self {
        Self {
            center_x: 400.0,
            center_y: 300.0,
            min_node_spacing: 100.0,
            level_width: 0.0,
            root_id: "1".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayoutConfig {
    pub node_width: f32,
    pub node_height: f32,
    pub node_spacing: f32,
    pub rank_spacing: f32,
    /// Subtracted from the layered centre to get the stored top-left position.
    pub offset_x: f32,
    pub offset_y: f32,
    pub order_passes: usize,
    /// Grow node boxes to fit long labels instead of using the fixed width.
    pub fit_labels: bool,
    pub label_font_size: f32,
    pub label_padding_x: f32,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            node_width: 200.0,
            node_height: 50.0,
            node_spacing: 50.0,
            rank_spacing: 80.0,
            offset_x: 125.0,
            offset_y: 30.0,
            order_passes: 4,
            fit_labels: false,
            label_font_size: 16.0,
            label_padding_x: 10.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EdgeDefaults {
    pub kind: EdgeKind,
    pub animated: bool,
    pub stroke: String,
    pub marker_end: MarkerKind,
}

impl Default for EdgeDefaults {
    fn default() -> Self {
        Self {
            kind: EdgeKind::Smoothstep,
            animated: true,
            stroke: "#555".to_string(),
            marker_end: MarkerKind::Arrowclosed,
        }
    }
}

impl EdgeDefaults {
    pub fn style(&self) -> EdgeStyle {
        EdgeStyle {
            kind: self.kind,
            animated: self.animated,
            stroke: Some(self.stroke.clone()),
            marker_end: Some(self.marker_end),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    pub model: String,
    pub timeout_ms: u64,
    pub temperature: f32,
    pub top_k: u32,
    pub top_p: f32,
    pub api_key_env: String,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            model: "gemini-1.5-flash".to_string(),
            timeout_ms: 30_000,
            temperature: 0.7,
            top_k: 40,
            top_p: 0.95,
            api_key_env: "GEMINI_API_KEY".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    pub tree: TreeLayoutConfig,
    pub layout: LayoutConfig,
    pub edges: EdgeDefaults,
    pub generation: GenerationConfig,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct ConfigFile {
    tree: Option<TreeConfigFile>,
    layout: Option<LayoutConfigFile>,
    edges: Option<EdgeConfigFile>,
    generation: Option<GenerationConfigFile>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TreeConfigFile {
    center_x: Option<f32>,
    center_y: Option<f32>,
    min_node_spacing: Option<f32>,
    level_width: Option<f32>,
    root_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LayoutConfigFile {
    node_width: Option<f32>,
    node_height: Option<f32>,
    #[serde(alias = "nodesep")]
    node_spacing: Option<f32>,
    #[serde(alias = "ranksep")]
    rank_spacing: Option<f32>,
    offset_x: Option<f32>,
    offset_y: Option<f32>,
    order_passes: Option<usize>,
    fit_labels: Option<bool>,
    label_font_size: Option<f32>,
    label_padding_x: Option<f32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EdgeConfigFile {
    #[serde(rename = "type")]
    kind: Option<EdgeKind>,
    animated: Option<bool>,
    stroke: Option<String>,
    marker_end: Option<MarkerKind>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfigFile {
    model: Option<String>,
    timeout_ms: Option<u64>,
    temperature: Option<f32>,
    top_k: Option<u32>,
    top_p: Option<f32>,
    api_key_env: Option<String>,
}

pub fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    let Some(path) = path else {
        return Ok(Config::default());
    };
    let contents = std::fs::read_to_string(path)?;
    parse_config(&contents)
}

/// Merges a camelCase JSON (or JSON5) override document onto the defaults.
pub fn parse_config(contents: &str) -> anyhow::Result<Config> {
    let parsed: ConfigFile = match serde_json::from_str(contents) {
        Ok(parsed) => parsed,
        Err(json_err) => json5::from_str(contents)
            .map_err(|_| anyhow::anyhow!("invalid config file: {json_err}"))?,
    };

    let mut config = Config::default();

    if let Some(tree) = parsed.tree {
        let target = &mut config.tree;
        if let Some(v) = tree.center_x {
            target.center_x = v;
        }
        if let Some(v) = tree.center_y {
            target.center_y = v;
        }
        if let Some(v) = tree.min_node_spacing {
            target.min_node_spacing = v.max(0.0);
        }
        if let Some(v) = tree.level_width {
            target.level_width = v;
        }
        if let Some(v) = tree.root_id {
            target.root_id = v;
        }
    }

    if let Some(layout) = parsed.layout {
        let target = &mut config.layout;
        if let Some(v) = layout.node_width {
            target.node_width = v.max(1.0);
        }
        if let Some(v) = layout.node_height {
            target.node_height = v.max(1.0);
        }
        if let Some(v) = layout.node_spacing {
            target.node_spacing = v;
        }
        if let Some(v) = layout.rank_spacing {
            target.rank_spacing = v;
        }
        if let Some(v) = layout.offset_x {
            target.offset_x = v;
        }
        if let Some(v) = layout.offset_y {
            target.offset_y = v;
        }
        if let Some(v) = layout.order_passes {
            target.order_passes = v;
        }
        if let Some(v) = layout.fit_labels {
            target.fit_labels = v;
        }
        if let Some(v) = layout.label_font_size {
            target.label_font_size = v;
        }
        if let Some(v) = layout.label_padding_x {
            target.label_padding_x = v;
        }
    }

    if let Some(edges) = parsed.edges {
        let target = &mut config.edges;
        if let Some(v) = edges.kind {
            target.kind = v;
        }
        if let Some(v) = edges.animated {
            target.animated = v;
        }
        if let Some(v) = edges.stroke {
            target.stroke = v;
        }
        if let Some(v) = edges.marker_end {
            target.marker_end = v;
        }
    }

    if let Some(generation) = parsed.generation {
        let target = &mut config.generation;
        if let Some(v) = generation.model {
            target.model = v;
        }
        if let Some(v) = generation.timeout_ms {
            target.timeout_ms = v;
        }
        if let Some(v) = generation.temperature {
            target.temperature = v;
        }
        if let Some(v) = generation.top_k {
            target.top_k = v;
        }
        if let Some(v) = generation.top_p {
            target.top_p = v;
        }
        if let Some(v) = generation.api_key_env {
            target.api_key_env = v;
        }
    }

    Ok(config)
}
