// Copyright 2024 Entanglement Contributors
// SPDX-License-Identifier: Apache-2.0, MIT

use crate::technique::Technique;

/// Error type of the erasure code plugin.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// The profile failed validation. The profile already holds the corrected values.
    #[error("invalid {technique} profile: {}", messages.join("; "))]
    InvalidProfile {
        technique: Technique,
        messages: Vec<String>,
    },

    #[error("unknown technique {0}")]
    UnknownTechnique(String),

    /// Selective repair is not available for element-matrix techniques.
    #[error("{0} does not support selective repair")]
    Unsupported(&'static str),

    #[error("engine error: {0}")]
    Engine(#[from] recall_erasure_engine::Error),

    #[error("chunk {0} is missing")]
    MissingChunk(usize),

    #[error("chunk {index} is {actual} bytes long, expected {expected}")]
    ChunkSizeMismatch {
        index: usize,
        expected: usize,
        actual: usize,
    },

    /// The placement collaborator refused the rule.
    #[error("placement failed with status {0}")]
    Placement(i32),
}

const EINVAL: i32 = 22;
const ENOENT: i32 = 2;
const EIO: i32 = 5;
const EOPNOTSUPP: i32 = 95;

impl Error {
    /// Negative status code a storage daemon reports for this error.
    pub fn code(&self) -> i32 {
        match self {
            Error::InvalidProfile { .. } | Error::ChunkSizeMismatch { .. } => -EINVAL,
            Error::UnknownTechnique(_) => -ENOENT,
            Error::Unsupported(_) => -EOPNOTSUPP,
            Error::Engine(e) => e.code(),
            Error::MissingChunk(_) => -EIO,
            Error::Placement(status) => *status,
        }
    }
}
