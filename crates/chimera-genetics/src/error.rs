// Copyright 2025 Chimera Genetics Team
// SPDX-License-Identifier: Apache-2.0

//! Error types for the genetics data model.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum GeneticsError {
    #[error("Invalid strain template '{name}': {reason}")]
    InvalidTemplate { name: String, reason: String },

    #[error("Invalid locus '{locus}': {reason}")]
    InvalidLocus { locus: String, reason: String },
}

pub type GeneticsResult<T> = Result<T, GeneticsError>;
