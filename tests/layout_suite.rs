use std::collections::HashSet;
use std::path::Path;

use mindmap_canvas::config::Config;
use mindmap_canvas::error::{GenerationError, MindmapError, ParseError, ValidationError};
use mindmap_canvas::generation::{GenerationRequest, ReplayClient, generate_mindmap, mindmap_from_response};
use mindmap_canvas::layout::AutoLayout;
use mindmap_canvas::mutation::{Connection, NodeChange};
use mindmap_canvas::{Completion, Graph, Position, Session};

fn read_fixture(rel: &str) -> String {
    let path = Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(rel);
    assert!(path.exists(), "fixture missing: {rel}");
    std::fs::read_to_string(path).expect("fixture read failed")
}

fn assert_no_overlap(graph: &Graph, config: &Config, fixture: &str) {
    let (w, h) = (config.layout.node_width, config.layout.node_height);
    for (i, a) in graph.nodes.iter().enumerate() {
        for b in &graph.nodes[i + 1..] {
            let apart = (a.position.x - b.position.x).abs() >= w - 0.01
                || (a.position.y - b.position.y).abs() >= h - 0.01;
            assert!(apart, "{fixture}: `{}` overlaps `{}`", a.id, b.id);
        }
    }
}

#[test]
fn lay_out_all_valid_fixtures() {
    // Keep this list explicit so new fixtures must be added intentionally.
    let fixtures = [
        "valid/basic.md",
        "valid/chatty_trailing_commas.md",
        "valid/commented.md",
        "valid/cross_links.md",
        "valid/deep.md",
    ];
    let config = Config::default();

    for rel in fixtures {
        let response = read_fixture(rel);
        let mut auto = AutoLayout::new(Default::default(), config.layout.clone());
        let graph = mindmap_from_response(&response, &config, &mut auto)
            .unwrap_or_else(|err| panic!("{rel}: {err}"));
        assert!(!graph.nodes.is_empty(), "{rel}: no nodes");
        assert!(graph.is_consistent(), "{rel}: dangling edge or duplicate id");
        assert!(
            graph.nodes.iter().all(|n| n.position.x.is_finite() && n.position.y.is_finite()),
            "{rel}: non-finite position"
        );
        assert_no_overlap(&graph, &config, rel);

        let again = mindmap_from_response(&response, &config, &mut auto).expect("second run");
        assert_eq!(graph, again, "{rel}: layout is not deterministic");
    }
}

#[test]
fn reject_all_invalid_fixtures() {
    let cases: [(&str, fn(&MindmapError) -> bool); 5] = [
        ("invalid/empty_nodes.md", |err| {
            matches!(err, MindmapError::Validation(ValidationError::EmptyNodes))
        }),
        ("invalid/no_block.md", |err| {
            matches!(err, MindmapError::Parse(ParseError::NoJsonBlock))
        }),
        ("invalid/truncated.md", |err| {
            matches!(err, MindmapError::Parse(ParseError::InvalidJson(_)))
        }),
        ("invalid/dangling_edge.md", |err| {
            matches!(err, MindmapError::Validation(ValidationError::DanglingEdge { .. }))
        }),
        ("invalid/missing_label.md", |err| {
            matches!(err, MindmapError::Validation(ValidationError::InvalidNode { .. }))
        }),
    ];
    let config = Config::default();

    for (rel, expected) in cases {
        let response = read_fixture(rel);
        let mut auto = AutoLayout::default();
        let err = mindmap_from_response(&response, &config, &mut auto)
            .expect_err(&format!("{rel}: should be rejected"));
        assert!(expected(&err), "{rel}: unexpected error {err:?}");
        assert!(err.user_message().starts_with("API Error:"), "{rel}: {}", err.user_message());
    }
}

#[test]
fn preserves_ids_labels_and_edges() {
    let response = read_fixture("valid/basic.md");
    let config = Config::default();
    let mut auto = AutoLayout::default();
    let graph = mindmap_from_response(&response, &config, &mut auto).expect("basic");

    let ids: HashSet<&str> = graph.nodes.iter().map(|n| n.id.as_str()).collect();
    assert_eq!(ids, HashSet::from(["1", "2", "3", "4", "5", "6"]));
    assert_eq!(graph.node("5").map(|n| n.label.as_str()), Some("Classification"));
    let edges: Vec<(&str, &str)> = graph
        .edges
        .iter()
        .map(|e| (e.source.as_str(), e.target.as_str()))
        .collect();
    assert_eq!(edges, vec![("1", "2"), ("1", "3"), ("2", "4"), ("2", "5"), ("3", "6")]);
}

#[test]
fn parents_sit_above_children() {
    let response = read_fixture("valid/deep.md");
    let config = Config::default();
    let mut auto = AutoLayout::default();
    let graph = mindmap_from_response(&response, &config, &mut auto).expect("deep");
    for edge in &graph.edges {
        let parent = graph.node(&edge.source).expect("parent").position;
        let child = graph.node(&edge.target).expect("child").position;
        assert!(child.y > parent.y, "{} should be below {}", edge.target, edge.source);
    }
}

#[test]
fn session_edit_cycle_end_to_end() {
    let response = read_fixture("valid/basic.md");
    let mut session = Session::default().with_api_key(Some("test-key".to_string()));
    assert_eq!(
        session.generate(&ReplayClient::new(response.as_str()), "machine learning"),
        Ok(Completion::Applied)
    );
    assert!(session.last_debug().is_some_and(|debug| debug.raw_response == response));

    // Locked by default: structural edits bounce, graph untouched.
    let snapshot = session.graph().clone();
    assert!(session.on_connect(&Connection::new("4", "6")).is_err());
    assert_eq!(session.graph(), &snapshot);

    session.set_locked(false);
    session
        .on_nodes_change(&[NodeChange::Position {
            id: "6".to_string(),
            position: Position::new(1000.0, 1000.0),
        }])
        .expect("drag");
    assert_eq!(session.graph().node("6").map(|n| n.position), Some(Position::new(1000.0, 1000.0)));

    session.on_connect(&Connection::new("4", "6")).expect("connect");
    assert!(session.edges().iter().any(|e| e.id == "e4-6"));
    assert!(session.graph().is_consistent());
    assert_ne!(session.graph().node("6").map(|n| n.position), Some(Position::new(1000.0, 1000.0)));

    // A bad reply afterwards leaves the edited graph in place.
    let edited = session.graph().clone();
    let bad = read_fixture("invalid/empty_nodes.md");
    assert!(session.generate(&ReplayClient::new(bad), "again").is_err());
    assert_eq!(session.graph(), &edited);
}

#[test]
fn debug_record_is_returned_on_failure() {
    let request = GenerationRequest::new("anything", &Config::default().generation, Some("key")).expect("request");
    let mut auto = AutoLayout::default();
    let (result, record) = generate_mindmap(&ReplayClient::new(""), &request, &Config::default(), &mut auto);
    assert_eq!(result, Err(MindmapError::Generation(GenerationError::EmptyResponse)));
    assert_eq!(record.prompt, "anything");
    assert!(record.raw_response.is_empty());
}
