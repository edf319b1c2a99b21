// Copyright 2024 Entanglement Contributors
// SPDX-License-Identifier: Apache-2.0, MIT

use std::collections::BTreeSet;

use log::trace;
use recall_erasure_engine::{self as engine, Engine};

use crate::plan::CodingPlan;

/// Indices in `0..chunk_count` absent from `available`, in increasing order.
pub fn erasures(available: &BTreeSet<usize>, chunk_count: usize) -> Vec<usize> {
    (0..chunk_count).filter(|i| !available.contains(i)).collect()
}

/// Full-stripe encode and decode over caller owned chunk buffers.
///
/// Buffers are passed as the `k` data chunks followed by the `m` coding chunks.
pub struct ChunkCodec<'a, E: Engine> {
    engine: &'a E,
    plan: &'a CodingPlan,
    k: usize,
    m: usize,
    w: usize,
    packet_size: usize,
}

impl<'a, E: Engine> ChunkCodec<'a, E> {
    pub fn new(
        engine: &'a E,
        plan: &'a CodingPlan,
        k: usize,
        m: usize,
        w: usize,
        packet_size: usize,
    ) -> Self {
        Self {
            engine,
            plan,
            k,
            m,
            w,
            packet_size,
        }
    }

    fn check_buffers(&self, chunks: &[&mut [u8]]) {
        assert_eq!(
            chunks.len(),
            self.k + self.m,
            "expected {} chunk buffers",
            self.k + self.m
        );
        let len = chunks[0].len();
        assert!(
            chunks.iter().all(|c| c.len() == len),
            "chunk buffers must all be {len} bytes long"
        );
    }

    /// Computes the coding chunks from the data chunks in place.
    ///
    /// # Panics
    ///
    /// Panics if there are not `k + m` buffers or their lengths differ.
    pub fn encode(&self, chunks: &mut [&mut [u8]]) {
        self.check_buffers(chunks);
        match self.plan {
            CodingPlan::Matrix(matrix) => self.engine.encode_matrix(matrix, chunks),
            CodingPlan::Schedule { schedule, .. } => {
                self.engine
                    .encode_schedule(self.w, schedule, chunks, self.packet_size)
            }
        }
    }

    /// Rebuilds every chunk whose index is absent from `available`.
    ///
    /// An engine failure leaves the buffers untouched and is returned as is.
    ///
    /// # Panics
    ///
    /// Panics if nothing is erased, if there are not `k + m` buffers or their
    /// lengths differ.
    pub fn decode(
        &self,
        available: &BTreeSet<usize>,
        chunks: &mut [&mut [u8]],
    ) -> Result<(), engine::Error> {
        self.check_buffers(chunks);
        let erasures = erasures(available, self.k + self.m);
        assert!(!erasures.is_empty(), "decode called without erasures");
        trace!("decode: erasures {erasures:?}");
        match self.plan {
            CodingPlan::Matrix(matrix) => self.engine.decode_matrix(matrix, &erasures, chunks),
            CodingPlan::Schedule { bitmatrix, .. } => self.engine.decode_schedule_lazy(
                self.k,
                self.w,
                bitmatrix,
                &erasures,
                chunks,
                self.packet_size,
            ),
        }
    }
}
