use crate::config::{Config, EdgeDefaults, GenerationConfig};
use crate::error::{GenerationError, MindmapError};
use crate::ir::Graph;
use crate::layout::{AutoLayout, layout_generated};
use crate::parser::parse_response;
use crate::validate::validate;
use serde_json::{Value, json};
use std::fmt;
use std::sync::Arc;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

pub const SYSTEM_PROMPT: &str = r#"You are a mindmap generator. Your task is to generate detailed, multi-level mindmap data in JSON format that can be used with ReactFlow.

Requirements:
- IMPORTANT: Each topic MUST have at least 5-6 levels of depth
- Each node MUST have 2-3 child nodes minimum
- Break down each concept into its smallest components
- Main topic should be comprehensive and detailed
- Include relationships between concepts where relevant

Example hierarchy (minimum depth required):
Main Topic
├── Level 1 Topic A
│   ├── Level 2 Topic A1
│   │   ├── Level 3 Topic A1a
│   │   │   ├── Level 4 Topic A1a1
│   │   │   │   ├── Level 5 Topic A1a1a
│   │   │   │   └── Level 5 Topic A1a1b
│   │   │   └── Level 4 Topic A1a2
│   │   └── Level 3 Topic A1b
│   └── Level 2 Topic A2
└── Level 1 Topic B
    └── [similar depth structure...]

The JSON format must be:
{
  "nodes": [
    { 
      "id": "1", 
      "data": { "label": "Main Topic" }, 
      "position": { "x": 400, "y": 200 } 
    },
    { 
      "id": "2", 
      "data": { "label": "Level 1 Topic" }, 
      "position": { "x": 200, "y": 400 } 
    },
    { 
      "id": "3", 
      "data": { "label": "Level 2 Topic" }, 
      "position": { "x": 100, "y": 600 } 
    }
    // ... more nodes with deeper levels
  ],
  "edges": [
    { "id": "e1-2", "source": "1", "target": "2" },
    { "id": "e2-3", "source": "2", "target": "3" }
    // ... corresponding edges
  ]
}

Remember:
- Only return JSON data in the specified format
- Do not include any explanations or additional text
- Focus on creating deep, meaningful hierarchies"#;

/// Everything a transport needs to ask the model for one mindmap.
#[derive(Clone, PartialEq)]
pub struct GenerationRequest {
    pub prompt: String,
    pub full_prompt: String,
    pub model: String,
    pub api_key: String,
    pub timeout: Duration,
    pub temperature: f32,
    pub top_k: u32,
    pub top_p: f32,
}

impl GenerationRequest {
    pub fn new(prompt: &str, config: &GenerationConfig, api_key: Option<&str>) -> Result<Self, GenerationError> {
        let full_prompt = full_prompt(prompt)?;
        let api_key = api_key
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .ok_or(GenerationError::MissingCredential)?;
        Ok(Self {
            prompt: prompt.trim().to_string(),
            full_prompt,
            model: config.model.clone(),
            api_key: api_key.to_string(),
            timeout: Duration::from_millis(config.timeout_ms),
            temperature: config.temperature,
            top_k: config.top_k,
            top_p: config.top_p,
        })
    }

    /// Request body for the model's `generateContent` endpoint.
    pub fn payload(&self) -> Value {
        body(&self.full_prompt, self.temperature, self.top_k, self.top_p)
    }
}

impl fmt::Debug for GenerationRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GenerationRequest")
            .field("prompt", &self.prompt)
            .field("model", &self.model)
            .field("api_key", &REDACTED)
            .field("timeout", &self.timeout)
            .field("temperature", &self.temperature)
            .field("top_k", &self.top_k)
            .field("top_p", &self.top_p)
            .finish_non_exhaustive()
    }
}

pub(crate) const REDACTED: &str = "<redacted>";

/// System prompt plus the user's topic. Blank topics are rejected.
pub fn full_prompt(prompt: &str) -> Result<String, GenerationError> {
    let prompt = prompt.trim();
    if prompt.is_empty() {
        return Err(GenerationError::EmptyPrompt);
    }
    Ok(format!("{SYSTEM_PROMPT}\n\nGenerate a mindmap about: {prompt}"))
}

/// Request body for `prompt` without needing a credential; the key travels
/// in the URL, never in the body.
pub fn request_payload(prompt: &str, config: &GenerationConfig) -> Result<Value, GenerationError> {
    let full_prompt = full_prompt(prompt)?;
    Ok(body(&full_prompt, config.temperature, config.top_k, config.top_p))
}

fn body(full_prompt: &str, temperature: f32, top_k: u32, top_p: f32) -> Value {
    json!({
        "contents": [{ "parts": [{ "text": full_prompt }] }],
        "generationConfig": {
            "temperature": temperature,
            "topK": top_k,
            "topP": top_p,
        }
    })
}

/// Reads the key from the environment variable named in the config.
pub fn api_key_from_env(config: &GenerationConfig) -> Option<String> {
    std::env::var(&config.api_key_env)
        .ok()
        .filter(|key| !key.trim().is_empty())
}

/// Turns a request into the model's raw text reply.
pub trait GenerationClient {
    fn generate(&self, request: &GenerationRequest) -> Result<String, GenerationError>;
}

impl<C: GenerationClient + ?Sized> GenerationClient for Arc<C> {
    fn generate(&self, request: &GenerationRequest) -> Result<String, GenerationError> {
        (**self).generate(request)
    }
}

/// Replays a recorded model reply.
#[derive(Debug, Clone)]
pub struct ReplayClient {
    response: String,
}

impl ReplayClient {
    pub fn new(response: impl Into<String>) -> Self {
        Self {
            response: response.into(),
        }
    }
}

impl GenerationClient for ReplayClient {
    fn generate(&self, _request: &GenerationRequest) -> Result<String, GenerationError> {
        Ok(self.response.clone())
    }
}

/// Runs another client on a worker thread and gives up after the request's
/// timeout. A reply that arrives later is dropped.
#[derive(Debug)]
pub struct TimeoutClient<C> {
    inner: Arc<C>,
}

impl<C> TimeoutClient<C> {
    pub fn new(inner: C) -> Self {
        Self { inner: Arc::new(inner) }
    }
}

impl<C: GenerationClient + Send + Sync + 'static> GenerationClient for TimeoutClient<C> {
    fn generate(&self, request: &GenerationRequest) -> Result<String, GenerationError> {
        let (tx, rx) = mpsc::channel();
        let inner = Arc::clone(&self.inner);
        let owned = request.clone();
        thread::spawn(move || {
            let _ = tx.send(inner.generate(&owned));
        });
        match rx.recv_timeout(request.timeout) {
            Ok(result) => result,
            Err(RecvTimeoutError::Timeout) => {
                warn!(timeout_ms = request.timeout.as_millis() as u64, "generation timed out");
                Err(GenerationError::Timeout {
                    timeout_ms: request.timeout.as_millis() as u64,
                })
            }
            Err(RecvTimeoutError::Disconnected) => Err(GenerationError::Transport(
                "generation worker exited without a response".to_string(),
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GenerationDebug {
    pub prompt: String,
    pub raw_response: String,
    pub processing_time: Duration,
}

/// Gives every edge the fixed visual defaults.
pub fn decorate_edges(graph: &mut Graph, defaults: &EdgeDefaults) {
    let style = defaults.style();
    for edge in &mut graph.edges {
        edge.style = style.clone();
    }
}

/// Raw model text to a positioned graph: extract, validate, decorate edges,
/// tree placement, layered pass.
pub fn mindmap_from_response(raw: &str, config: &Config, auto: &mut AutoLayout) -> Result<Graph, MindmapError> {
    if raw.trim().is_empty() {
        return Err(GenerationError::EmptyResponse.into());
    }
    let candidate = parse_response(raw).inspect_err(|err| debug!(%err, "failed to extract mindmap JSON"))?;
    let mut graph = validate(&candidate).inspect_err(|err| debug!(%err, "invalid mindmap structure"))?;
    decorate_edges(&mut graph, &config.edges);
    Ok(layout_generated(&graph, &config.tree, auto))
}

/// One blocking round-trip: request, reply, pipeline. The debug record is
/// returned whether or not the pipeline succeeded.
pub fn generate_mindmap<C: GenerationClient + ?Sized>(
    client: &C,
    request: &GenerationRequest,
    config: &Config,
    auto: &mut AutoLayout,
) -> (Result<Graph, MindmapError>, GenerationDebug) {
    let started = Instant::now();
    info!(model = %request.model, prompt = %request.prompt, "generating mindmap");
    let mut record = GenerationDebug {
        prompt: request.prompt.clone(),
        raw_response: String::new(),
        processing_time: Duration::ZERO,
    };
    let result = match client.generate(request) {
        Ok(raw) => {
            debug!(bytes = raw.len(), "raw response received");
            let graph = mindmap_from_response(&raw, config, auto);
            record.raw_response = raw;
            graph
        }
        Err(err) => Err(err.into()),
    };
    record.processing_time = started.elapsed();
    if let Err(err) = &result {
        warn!(%err, elapsed_ms = record.processing_time.as_millis() as u64, "generation failed");
    }
    (result, record)
}
