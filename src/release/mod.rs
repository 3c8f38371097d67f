//! Release naming and publishing
//!
//! # Invariants
//!
//! 1. **The tag is the only version source**
//!    - Resolved once from the triggering reference, never from Cargo.toml
//!    - Every asset name and the release title derive from it
//!
//! 2. **A release exists before any asset is sent**
//!    - Upload order is fixed: binary, rpm, deb
//!    - The first failed upload stops the rest and is reported as a partial publish
//!
//! # Layout
//!
//! - **version**: Reference → `ReleaseTag`
//! - **assets**: Asset names, on-disk layout, upload list
//! - **retry**: Backoff policy for remote calls
//! - **github**: REST client behind the `ReleaseApi` trait
//! - **publish**: Release creation and asset upload

pub mod assets;
pub mod github;
pub mod publish;
pub mod retry;
pub mod version;
