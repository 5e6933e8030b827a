// Copyright 2025 Chimera Genetics Team
// SPDX-License-Identifier: Apache-2.0

//! # chimera-observability
//!
//! Logging setup shared by the Chimera binaries, with per-crate debug flags.
//!
//! ## Features
//! - `file-logging`: rolling log files in a timestamped run folder

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod cli;
pub mod config;
pub mod init;

pub use cli::*;
pub use config::*;
pub use init::*;

/// Tracing targets that accept per-crate debug flags
pub const KNOWN_CRATES: &[&str] = &[
    "chimera-genetics",
    "chimera-expression",
    "chimera-breeding",
    "chimera-config",
    "chimera",
];
