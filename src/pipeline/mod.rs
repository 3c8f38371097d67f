//! Tag-triggered release pipeline
//!
//! - **stage**: Stage catalogue, run states, and the required/best-effort wrapper
//! - **engine**: Sequential execution with injected runner, release API, and observers

pub mod engine;
pub mod stage;

pub use engine::{Pipeline, PipelineObserver, PipelineReport};
pub use stage::PipelineState;
