//! In-memory editor state behind the diagram surface.
//!
//! The surface forwards gestures through the `on_*` callbacks and reads the
//! graph back through [`Session::nodes`] and [`Session::edges`]. Rejected edits
//! leave the graph untouched and are only logged. Generation is split into
//! [`Session::begin_generation`] and [`Session::complete_generation`] so the
//! transport can run anywhere; at most one request is outstanding.

use crate::config::Config;
use crate::error::{GenerationError, MindmapError, MutationRejected};
use crate::generation::{
    GenerationClient, GenerationDebug, GenerationRequest, REDACTED, api_key_from_env,
    mindmap_from_response,
};
use crate::ir::{Edge, Graph, Node};
use crate::layout::AutoLayout;
use crate::mutation::{
    Connection, EdgeChange, MutationResult, NodeChange, add_edge, apply_edge_changes,
    apply_node_changes, relabel_node, replace_graph,
};
use std::fmt;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Handle for one outstanding generation request.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationTicket {
    pub id: u64,
    pub request: GenerationRequest,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Completion {
    /// The generated graph replaced the current one.
    Applied,
    /// The prompt was dismissed (or the ticket is stale); nothing changed.
    Unconsumed,
}

#[derive(Debug, Clone)]
struct Pending {
    id: u64,
    abandoned: bool,
    started: Instant,
}

#[derive(Clone)]
pub struct Session {
    graph: Graph,
    locked: bool,
    auto: AutoLayout,
    config: Config,
    api_key: Option<String>,
    pending: Option<Pending>,
    next_ticket: u64,
    last_error: Option<String>,
    last_debug: Option<GenerationDebug>,
}

impl Session {
    pub fn new(config: Config) -> Self {
        let auto = AutoLayout::new(Default::default(), config.layout.clone());
        Self {
            graph: Graph::new(),
            locked: true,
            auto,
            config,
            api_key: None,
            pending: None,
            next_ticket: 1,
            last_error: None,
            last_debug: None,
        }
    }

    /// Picks the API key up from the environment variable named in the config.
    pub fn from_env(config: Config) -> Self {
        let api_key = api_key_from_env(&config.generation);
        Self::new(config).with_api_key(api_key)
    }

    pub fn with_api_key(mut self, api_key: Option<String>) -> Self {
        self.api_key = api_key;
        self
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    pub fn nodes(&self) -> &[Node] {
        &self.graph.nodes
    }

    pub fn edges(&self) -> &[Edge] {
        &self.graph.edges
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }

    pub fn set_locked(&mut self, locked: bool) {
        self.locked = locked;
    }

    pub fn toggle_lock(&mut self) -> bool {
        self.locked = !self.locked;
        self.locked
    }

    pub fn is_generating(&self) -> bool {
        self.pending.is_some()
    }

    /// User-facing text of the last failed generation, cleared on success.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn last_debug(&self) -> Option<&GenerationDebug> {
        self.last_debug.as_ref()
    }

    pub fn on_nodes_change(&mut self, changes: &[NodeChange]) -> Result<(), MutationRejected> {
        let result = apply_node_changes(changes, &self.graph, self.locked);
        self.commit("nodes change", result)
    }

    pub fn on_edges_change(&mut self, changes: &[EdgeChange]) -> Result<(), MutationRejected> {
        let result = apply_edge_changes(changes, &self.graph, self.locked);
        self.commit("edges change", result)
    }

    pub fn on_connect(&mut self, connection: &Connection) -> Result<(), MutationRejected> {
        let result = add_edge(connection, &self.graph, self.locked, &self.config.edges);
        self.commit("connect", result)
    }

    pub fn on_label_change(&mut self, id: &str, label: &str) -> Result<(), MutationRejected> {
        let result = relabel_node(id, label, &self.graph);
        self.commit("label change", result)
    }

    /// Forces a layered pass regardless of whether the graph's shape changed.
    pub fn relayout(&mut self) {
        self.auto.apply(&mut self.graph);
    }

    fn commit(&mut self, gesture: &str, result: MutationResult) -> Result<(), MutationRejected> {
        match result {
            Ok(next) => {
                self.graph = next;
                if self.auto.on_structural_change(&mut self.graph) {
                    debug!(gesture, "structure changed, re-laid out");
                }
                Ok(())
            }
            Err(err) => {
                debug!(gesture, %err, "edit rejected");
                Err(err)
            }
        }
    }

    /// Starts a generation request. Refused while another is outstanding.
    pub fn begin_generation(&mut self, prompt: &str) -> Result<GenerationTicket, GenerationError> {
        if self.pending.is_some() {
            debug!("generation already in flight");
            return Err(GenerationError::Busy);
        }
        let request = GenerationRequest::new(prompt, &self.config.generation, self.api_key.as_deref())
            .inspect_err(|err| debug!(%err, "generation request refused"))?;
        let id = self.next_ticket;
        self.next_ticket += 1;
        self.pending = Some(Pending {
            id,
            abandoned: false,
            started: Instant::now(),
        });
        info!(ticket = id, prompt = %request.prompt, "generation started");
        Ok(GenerationTicket { id, request })
    }

    /// The prompt input was closed. A response that arrives later is ignored.
    pub fn dismiss_prompt(&mut self) {
        if let Some(pending) = &mut self.pending {
            debug!(ticket = pending.id, "prompt dismissed");
            pending.abandoned = true;
        }
    }

    /// Hands the transport's outcome back. On any failure the graph is left
    /// exactly as it was and the user message is kept in [`Session::last_error`].
    pub fn complete_generation(
        &mut self,
        ticket: &GenerationTicket,
        outcome: Result<String, GenerationError>,
    ) -> Result<Completion, MindmapError> {
        let Some(pending) = self.pending.take_if(|pending| pending.id == ticket.id) else {
            debug!(ticket = ticket.id, "stale generation ticket");
            return Ok(Completion::Unconsumed);
        };
        if pending.abandoned {
            debug!(ticket = ticket.id, "response arrived after dismissal");
            return Ok(Completion::Unconsumed);
        }

        let raw = outcome.as_ref().cloned().unwrap_or_default();
        let result = outcome
            .map_err(MindmapError::from)
            .and_then(|raw| {
                let mut auto = self.auto.clone();
                let graph = mindmap_from_response(&raw, &self.config, &mut auto)?;
                Ok((replace_graph(graph)?, auto))
            });
        self.last_debug = Some(GenerationDebug {
            prompt: ticket.request.prompt.clone(),
            raw_response: raw,
            processing_time: pending.started.elapsed(),
        });

        match result {
            Ok((graph, auto)) => {
                info!(ticket = ticket.id, nodes = graph.nodes.len(), edges = graph.edges.len(), "mindmap applied");
                self.graph = graph;
                self.auto = auto;
                self.last_error = None;
                Ok(Completion::Applied)
            }
            Err(err) => {
                warn!(ticket = ticket.id, %err, "generation failed");
                self.last_error = Some(err.user_message());
                Err(err)
            }
        }
    }

    /// Blocking convenience: begin, call `client`, complete.
    pub fn generate<C: GenerationClient + ?Sized>(
        &mut self,
        client: &C,
        prompt: &str,
    ) -> Result<Completion, MindmapError> {
        let ticket = self.begin_generation(prompt).inspect_err(|err| {
            self.last_error = Some(MindmapError::from(err.clone()).user_message());
        })?;
        let outcome = client.generate(&ticket.request);
        self.complete_generation(&ticket, outcome)
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("graph", &self.graph)
            .field("locked", &self.locked)
            .field("api_key", &self.api_key.as_ref().map(|_| REDACTED))
            .field("pending", &self.pending)
            .field("last_error", &self.last_error)
            .finish_non_exhaustive()
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new(Config::default())
    }
}
