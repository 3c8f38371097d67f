//! Core building blocks shared by every command
//!
//! - **config**: ship.toml parsing and validation
//! - **context**: Run context (CI inputs, config, Cargo metadata) resolved once
//! - **error**: Error types with exit codes and contextual help messages

pub mod config;
pub mod context;
pub mod error;
