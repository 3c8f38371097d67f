//! Cargo toolchain integration
//!
//! This module drives cargo and its plugins for the build half of a release:
//!
//! - **runner**: Process execution seam (`CommandRunner`) shared by every toolchain call
//! - **metadata**: Load Cargo.toml metadata using cargo_metadata (package defaults, target dir)
//! - **plugins**: Best-effort install of cargo-deb and cargo-generate-rpm
//! - **build**: Release compilation
//! - **package**: Debian and RPM packaging

pub mod build;
pub mod metadata;
pub mod package;
pub mod plugins;
pub mod runner;
