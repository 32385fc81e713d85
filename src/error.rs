use thiserror::Error;

pub type Result<T> = std::result::Result<T, MindmapError>;

/// Failures on the generation side: transport, credentials, timeouts and
/// request discipline.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GenerationError {
    #[error("generation API key is not configured")]
    MissingCredential,
    #[error("prompt is empty")]
    EmptyPrompt,
    #[error("a generation request is already in progress")]
    Busy,
    #[error("request timed out after {timeout_ms} ms")]
    Timeout { timeout_ms: u64 },
    #[error("failed to get response from the model")]
    EmptyResponse,
    #[error("{0}")]
    Transport(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("no JSON content found in response")]
    NoJsonBlock,
    #[error("invalid JSON in response: {0}")]
    InvalidJson(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("mindmap must be a JSON object")]
    NotAnObject,
    #[error("`{0}` must be present and be an array")]
    MissingSequence(&'static str),
    #[error("mindmap has no nodes")]
    EmptyNodes,
    #[error("node #{index} is invalid: {reason}")]
    InvalidNode { index: usize, reason: &'static str },
    #[error("edge #{index} is invalid: {reason}")]
    InvalidEdge { index: usize, reason: &'static str },
    #[error("duplicate node id `{0}`")]
    DuplicateNodeId(String),
    #[error("duplicate edge id `{0}`")]
    DuplicateEdgeId(String),
    #[error("edge `{edge}` references unknown node `{node}`")]
    DanglingEdge { edge: String, node: String },
}

/// Structural edits refused by the mutation service. Rejection leaves the
/// graph untouched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MutationRejected {
    #[error("graph is locked")]
    Locked,
    #[error("unknown node `{0}`")]
    UnknownNode(String),
    #[error("unknown edge `{0}`")]
    UnknownEdge(String),
    #[error("node `{0}` cannot connect to itself")]
    SelfEdge(String),
    #[error("`{from}` is already connected to `{to}`")]
    DuplicateEdge { from: String, to: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MindmapError {
    #[error(transparent)]
    Generation(#[from] GenerationError),
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    MutationRejected(#[from] MutationRejected),
}

impl MindmapError {
    /// Text shown next to the prompt input.
    pub fn user_message(&self) -> String {
        match self {
            MindmapError::Generation(err) => format!("API Error: {err}"),
            MindmapError::Parse(err) => format!("API Error: {err}"),
            MindmapError::Validation(err) => {
                format!("API Error: Invalid response format from API ({err})")
            }
            MindmapError::MutationRejected(err) => err.to_string(),
        }
    }

    /// Rejected edits are expected while locked and are not surfaced.
    pub fn is_silent(&self) -> bool {
        matches!(self, MindmapError::MutationRejected(_))
    }
}
