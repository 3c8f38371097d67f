//! CLI commands for cargo-ship
//!
//! ## Release
//! - **run**: Run the tag-triggered release pipeline end to end
//!
//! ## Inspection
//! - **plan**: Show the version, release title and assets a run would publish
//! - **version**: Resolve a reference to a version
//! - **cache_key**: Print the toolchain cache key for the workspace
//! - **doctor**: Check toolchain, plugins and configuration

pub mod cache_key;
pub mod doctor;
pub mod plan;
pub mod run;
pub mod version;

pub use cache_key::run_cache_key;
pub use doctor::run_doctor;
pub use plan::run_plan;
pub use run::run_pipeline;
pub use version::run_version;
