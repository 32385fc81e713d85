use crate::config::{Config, load_config};
use crate::error::MindmapError;
use crate::generation::{decorate_edges, request_payload};
use crate::ir::{Direction, Graph};
use crate::layout::{AutoLayout, layout_generated, layout_tree};
use crate::layout_dump::write_layout_dump;
use crate::parser::{parse_json, parse_response};
use crate::validate::validate;
use anyhow::Result;
use clap::Parser;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "mmc", version, about = "Mindmap layout from model responses")]
pub struct Args {
    /// Input file (model response .md/.txt or graph .json) or '-' for stdin
    #[arg(short = 'i', long = "input")]
    pub input: Option<PathBuf>,

    /// Output file for the positioned graph JSON. Defaults to stdout.
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,

    /// Config JSON file (camelCase overrides)
    #[arg(short = 'c', long = "configFile")]
    pub config: Option<PathBuf>,

    /// Layered layout direction: TB or LR
    #[arg(short = 'd', long = "direction", value_parser = parse_direction, default_value = "TB")]
    pub direction: Direction,

    /// Root node id for the tree placement
    #[arg(long = "root")]
    pub root: Option<String>,

    /// Skip the layered pass and keep the tree placement
    #[arg(long = "tree-only")]
    pub tree_only: bool,

    /// Print the generation request body for this prompt instead of laying
    /// out. No API key is needed; the body never carries it.
    #[arg(long = "prompt")]
    pub prompt: Option<String>,

    /// Debug logging on stderr
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,
}

fn parse_direction(token: &str) -> std::result::Result<Direction, String> {
    Direction::from_token(token).ok_or_else(|| format!("unknown direction `{token}` (expected TB or LR)"))
}

pub fn run() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    let mut config = load_config(args.config.as_deref())?;
    if let Some(root) = &args.root {
        config.tree.root_id = root.clone();
    }

    if let Some(prompt) = &args.prompt {
        let payload = request_payload(prompt, &config.generation)
            .map_err(|err| anyhow::anyhow!(MindmapError::from(err).user_message()))?;
        println!("{}", serde_json::to_string_pretty(&payload)?);
        return Ok(());
    }

    let (input, is_markdown) = read_input(args.input.as_deref())?;
    let started = Instant::now();
    let graph = build_graph(&input, is_markdown, &config, args.direction, args.tree_only)
        .map_err(|err| anyhow::anyhow!(err.user_message()))?;
    info!(
        nodes = graph.nodes.len(),
        edges = graph.edges.len(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "layout complete"
    );
    write_layout_dump(args.output.as_deref(), &graph)
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

/// Model response or bare graph JSON to a positioned graph.
fn build_graph(
    input: &str,
    is_markdown: bool,
    config: &Config,
    direction: Direction,
    tree_only: bool,
) -> std::result::Result<Graph, MindmapError> {
    let candidate = if !is_markdown && input.trim_start().starts_with('{') {
        debug!("reading bare graph JSON");
        parse_json(input)?
    } else {
        parse_response(input)?
    };
    let mut graph = validate(&candidate)?;
    decorate_edges(&mut graph, &config.edges);

    if tree_only {
        graph.nodes = layout_tree(&graph.nodes, &graph.edges, &config.tree.root_id, &config.tree);
        return Ok(graph);
    }
    let mut auto = AutoLayout::new(direction, config.layout.clone());
    Ok(layout_generated(&graph, &config.tree, &mut auto))
}

fn read_input(path: Option<&Path>) -> Result<(String, bool)> {
    if let Some(path) = path {
        if path == Path::new("-") {
            let mut buf = String::new();
            io::stdin().read_to_string(&mut buf)?;
            return Ok((buf, false));
        }
        let content = std::fs::read_to_string(path)?;
        let is_md = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|ext| matches!(ext, "md" | "markdown" | "txt"))
            .unwrap_or(false);
        return Ok((content, is_md));
    }

    let mut buf = String::new();
    io::stdin().read_to_string(&mut buf)?;
    Ok((buf, false))
}

#[cfg(test)]
mod tests {
    use super::*;

    const GRAPH: &str = r#"{
  "nodes": [
    { "id": "1", "data": { "label": "Root" }, "position": { "x": 0, "y": 0 } },
    { "id": "2", "data": { "label": "A" }, "position": { "x": 0, "y": 0 } },
  ],
  "edges": [{ "id": "e1-2", "source": "1", "target": "2" }]
}"#;

    #[test]
    fn parses_direction_tokens() {
        assert_eq!(parse_direction("lr"), Ok(Direction::Horizontal));
        assert_eq!(parse_direction("TD"), Ok(Direction::Vertical));
        assert!(parse_direction("diagonal").is_err());
    }

    #[test]
    fn bare_json_and_fenced_reply_agree() {
        let config = Config::default();
        let fenced = format!("Here:\n```json\n{GRAPH}\n```\n");
        let bare = build_graph(GRAPH, false, &config, Direction::Vertical, false).expect("bare");
        let reply = build_graph(&fenced, true, &config, Direction::Vertical, false).expect("fenced");
        assert_eq!(bare, reply);
    }

    #[test]
    fn tree_only_keeps_tree_placement() {
        let graph = build_graph(GRAPH, false, &Config::default(), Direction::Vertical, true).expect("tree");
        let root = graph.node("1").expect("root").position;
        assert_eq!((root.x, root.y), (400.0, 300.0));
    }

    #[test]
    fn markdown_without_block_is_a_parse_error() {
        let err = build_graph("no block", true, &Config::default(), Direction::Vertical, false).unwrap_err();
        assert!(matches!(err, MindmapError::Parse(_)));
    }

    #[test]
    fn args_parse() {
        let args = Args::try_parse_from(["mmc", "-i", "reply.md", "-d", "LR", "--tree-only"]).expect("args");
        assert_eq!(args.direction, Direction::Horizontal);
        assert!(args.tree_only);
        assert_eq!(args.input.as_deref(), Some(Path::new("reply.md")));
    }

    #[test]
    fn prompt_dry_run_needs_no_key() {
        let args = Args::try_parse_from(["mmc", "--prompt", "volcanoes"]).expect("args");
        let config = Config::default();
        let prompt = args.prompt.as_deref().expect("prompt");
        let payload = request_payload(prompt, &config.generation).expect("payload without key");
        let text = payload["contents"][0]["parts"][0]["text"].as_str().expect("text");
        assert!(text.ends_with("Generate a mindmap about: volcanoes"));
    }
}
