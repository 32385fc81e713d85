use crate::ir::{EdgeKind, Graph, MarkerKind, Position};
use serde::Serialize;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

/// The positioned graph in the shape the diagram surface consumes.
#[derive(Debug, Serialize)]
pub struct LayoutDump {
    pub nodes: Vec<NodeDump>,
    pub edges: Vec<EdgeDump>,
}

#[derive(Debug, Serialize)]
pub struct NodeDump {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub data: LabelDump,
    pub position: Position,
}

#[derive(Debug, Serialize)]
pub struct LabelDump {
    pub label: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EdgeDump {
    pub id: String,
    pub source: String,
    pub target: String,
    #[serde(rename = "type")]
    pub kind: EdgeKind,
    pub animated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub style: Option<StrokeDump>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub marker_end: Option<MarkerDump>,
}

#[derive(Debug, Serialize)]
pub struct StrokeDump {
    pub stroke: String,
}

#[derive(Debug, Serialize)]
pub struct MarkerDump {
    #[serde(rename = "type")]
    pub kind: MarkerKind,
}

impl LayoutDump {
    pub fn from_graph(graph: &Graph) -> Self {
        let nodes = graph
            .nodes
            .iter()
            .map(|node| NodeDump {
                id: node.id.clone(),
                kind: "custom",
                data: LabelDump {
                    label: node.label.clone(),
                },
                position: node.position,
            })
            .collect();

        let edges = graph
            .edges
            .iter()
            .map(|edge| EdgeDump {
                id: edge.id.clone(),
                source: edge.source.clone(),
                target: edge.target.clone(),
                kind: edge.style.kind,
                animated: edge.style.animated,
                style: edge.style.stroke.clone().map(|stroke| StrokeDump { stroke }),
                marker_end: edge.style.marker_end.map(|kind| MarkerDump { kind }),
            })
            .collect();

        LayoutDump { nodes, edges }
    }
}

pub fn to_json_string(graph: &Graph) -> serde_json::Result<String> {
    serde_json::to_string_pretty(&LayoutDump::from_graph(graph))
}

/// Writes the dump to `path`, or to stdout when no path is given.
pub fn write_layout_dump(path: Option<&Path>, graph: &Graph) -> anyhow::Result<()> {
    let dump = LayoutDump::from_graph(graph);
    match path {
        Some(path) => {
            let writer = BufWriter::new(File::create(path)?);
            serde_json::to_writer_pretty(writer, &dump)?;
        }
        None => {
            let mut stdout = io::stdout().lock();
            serde_json::to_writer_pretty(&mut stdout, &dump)?;
            writeln!(stdout)?;
        }
    }
    Ok(())
}
