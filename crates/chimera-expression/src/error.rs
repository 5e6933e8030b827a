// Copyright 2025 Chimera Genetics Team
// SPDX-License-Identifier: Apache-2.0

//! Error types for the expression engine.
//!
//! Only backend work can fail. Every public engine method catches these and
//! degrades to a CPU path, so callers never see them directly.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExpressionError {
    #[error("Backend computation failed: {0}")]
    Backend(String),

    #[error("Accelerated backend unavailable: {0}")]
    BackendUnavailable(String),

    #[error("Invalid batch layout: {0}")]
    InvalidBatch(String),

    #[error("Maintenance runner error: {0}")]
    Maintenance(String),
}

pub type ExpressionResult<T> = Result<T, ExpressionError>;
