// Copyright 2025 Chimera Genetics Team
// SPDX-License-Identifier: Apache-2.0

use thiserror::Error;

/// Breeding errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BreedingError {
    #[error("Invalid parent '{id}': {reason}")]
    InvalidParent { id: String, reason: String },

    #[error("Offspring count must be at least 1, got {0}")]
    InvalidOffspringCount(usize),

    #[error("Breeding goal '{0}' has no trait targets")]
    EmptyGoal(String),

    #[error("Population of {actual} is too small, need at least {required}")]
    InsufficientPopulation { required: usize, actual: usize },

    #[error("Inheritance failed: {0}")]
    Inheritance(String),
}

pub type Result<T> = std::result::Result<T, BreedingError>;
