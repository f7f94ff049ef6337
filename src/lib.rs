//! webrig orchestration surface.
//!
//! Wires the session/scenario registries, the per-session dispatch gate and
//! the page-driver capability behind a validated tool surface.

pub mod config;
pub mod context;
pub mod tools;

pub use config::RigConfig;
pub use context::AppContext;
pub use tools::{dispatch, ToolResponse};
