#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod error;
pub mod generation;
pub mod ir;
pub mod layout;
pub mod layout_dump;
pub mod mutation;
pub mod parser;
pub mod session;
pub mod validate;

#[cfg(feature = "cli")]
pub use cli::run;
pub use error::{MindmapError, Result};
pub use ir::{Direction, Edge, Graph, Node, Position};
pub use session::{Completion, Session};
