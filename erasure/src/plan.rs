// Copyright 2024 Entanglement Contributors
// SPDX-License-Identifier: Apache-2.0, MIT

use log::debug;
use recall_erasure_engine::{BitMatrix, Engine, Matrix, Schedule};

use crate::technique::Technique;
use crate::validator::SchemeParams;

/// The coding plan of a scheme, built once and only read afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CodingPlan {
    /// An `m x k` element coding matrix.
    Matrix(Matrix),
    /// A bit-matrix with the XOR schedule encoding it.
    Schedule {
        bitmatrix: BitMatrix,
        schedule: Schedule,
    },
}

impl CodingPlan {
    /// Requests the coding plan of `technique` from the engine.
    ///
    /// `params` must have passed validation; the engine constructions assume it.
    pub fn build<E: Engine>(engine: &E, technique: Technique, params: &SchemeParams) -> Self {
        let SchemeParams { k, m, w, .. } = *params;
        let plan = match technique {
            Technique::VandermondeRS => CodingPlan::Matrix(engine.vandermonde_matrix(k, m, w)),
            Technique::RAID6RS => CodingPlan::Matrix(engine.raid6_matrix(k, w)),
            Technique::CauchyOrig => {
                Self::from_matrix(engine, k, w, &engine.cauchy_original_matrix(k, m, w))
            }
            Technique::CauchyGood => {
                Self::from_matrix(engine, k, w, &engine.cauchy_good_matrix(k, m, w))
            }
            Technique::Liberation => {
                Self::from_bitmatrix(engine, k, w, engine.liberation_bitmatrix(k, w))
            }
            Technique::BlaumRoth => {
                Self::from_bitmatrix(engine, k, w, engine.blaum_roth_bitmatrix(k, w))
            }
            Technique::Liber8tion => {
                Self::from_bitmatrix(engine, k, w, engine.liber8tion_bitmatrix(k))
            }
        };
        if let CodingPlan::Schedule { schedule, .. } = &plan {
            debug!(
                "{technique} k={k} m={m} w={w}: schedule of {} operations, {} xors",
                schedule.len(),
                schedule.xor_count()
            );
        }
        plan
    }

    fn from_matrix<E: Engine>(engine: &E, k: usize, w: usize, matrix: &Matrix) -> Self {
        Self::from_bitmatrix(engine, k, w, engine.matrix_to_bitmatrix(matrix))
    }

    fn from_bitmatrix<E: Engine>(engine: &E, k: usize, w: usize, bitmatrix: BitMatrix) -> Self {
        let schedule = engine.bitmatrix_to_schedule(k, w, &bitmatrix);
        CodingPlan::Schedule {
            bitmatrix,
            schedule,
        }
    }

    pub fn matrix(&self) -> Option<&Matrix> {
        match self {
            CodingPlan::Matrix(matrix) => Some(matrix),
            CodingPlan::Schedule { .. } => None,
        }
    }

    pub fn bitmatrix(&self) -> Option<&BitMatrix> {
        match self {
            CodingPlan::Matrix(_) => None,
            CodingPlan::Schedule { bitmatrix, .. } => Some(bitmatrix),
        }
    }

    pub fn schedule(&self) -> Option<&Schedule> {
        match self {
            CodingPlan::Matrix(_) => None,
            CodingPlan::Schedule { schedule, .. } => Some(schedule),
        }
    }
}
