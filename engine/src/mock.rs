// Copyright 2024 Entanglement Contributors
// SPDX-License-Identifier: Apache-2.0, MIT

use std::sync::{Arc, Mutex};

use crate::bitmatrix::BitMatrix;
use crate::engine::{Engine, Error, RepairControl, SelectiveDecode};
use crate::matrix::Matrix;
use crate::native::GaloisEngine;
use crate::schedule::Schedule;

/// What a [`RecordingEngine`] saw of a selective decode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectiveCall {
    pub erasures: Vec<usize>,
    pub coding: Vec<u8>,
    pub parity_selection: Vec<usize>,
    pub control: RepairControl,
}

/// Wraps an engine and records the name of every call made through it.
#[derive(Clone, Default)]
pub struct RecordingEngine<E: Engine = GaloisEngine> {
    inner: E,
    calls: Arc<Mutex<Vec<&'static str>>>,
    selective: Arc<Mutex<Option<SelectiveCall>>>,
}

impl<E: Engine> RecordingEngine<E> {
    pub fn new(inner: E) -> Self {
        Self {
            inner,
            calls: Arc::new(Mutex::new(Vec::new())),
            selective: Arc::new(Mutex::new(None)),
        }
    }

    /// Names of the calls made so far, in order.
    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().unwrap().clone()
    }

    pub fn clear(&self) {
        self.calls.lock().unwrap().clear();
    }

    /// The last selective decode request.
    pub fn last_selective(&self) -> Option<SelectiveCall> {
        self.selective.lock().unwrap().clone()
    }

    fn record(&self, name: &'static str) {
        self.calls.lock().unwrap().push(name);
    }
}

impl<E: Engine> Engine for RecordingEngine<E> {
    fn vandermonde_matrix(&self, k: usize, m: usize, w: usize) -> Matrix {
        self.record("vandermonde_matrix");
        self.inner.vandermonde_matrix(k, m, w)
    }

    fn raid6_matrix(&self, k: usize, w: usize) -> Matrix {
        self.record("raid6_matrix");
        self.inner.raid6_matrix(k, w)
    }

    fn cauchy_original_matrix(&self, k: usize, m: usize, w: usize) -> Matrix {
        self.record("cauchy_original_matrix");
        self.inner.cauchy_original_matrix(k, m, w)
    }

    fn cauchy_good_matrix(&self, k: usize, m: usize, w: usize) -> Matrix {
        self.record("cauchy_good_matrix");
        self.inner.cauchy_good_matrix(k, m, w)
    }

    fn liberation_bitmatrix(&self, k: usize, w: usize) -> BitMatrix {
        self.record("liberation_bitmatrix");
        self.inner.liberation_bitmatrix(k, w)
    }

    fn blaum_roth_bitmatrix(&self, k: usize, w: usize) -> BitMatrix {
        self.record("blaum_roth_bitmatrix");
        self.inner.blaum_roth_bitmatrix(k, w)
    }

    fn liber8tion_bitmatrix(&self, k: usize) -> BitMatrix {
        self.record("liber8tion_bitmatrix");
        self.inner.liber8tion_bitmatrix(k)
    }

    fn matrix_to_bitmatrix(&self, matrix: &Matrix) -> BitMatrix {
        self.record("matrix_to_bitmatrix");
        self.inner.matrix_to_bitmatrix(matrix)
    }

    fn bitmatrix_to_schedule(&self, k: usize, w: usize, bitmatrix: &BitMatrix) -> Schedule {
        self.record("bitmatrix_to_schedule");
        self.inner.bitmatrix_to_schedule(k, w, bitmatrix)
    }

    fn encode_matrix(&self, matrix: &Matrix, devices: &mut [&mut [u8]]) {
        self.record("encode_matrix");
        self.inner.encode_matrix(matrix, devices)
    }

    fn encode_schedule(
        &self,
        w: usize,
        schedule: &Schedule,
        devices: &mut [&mut [u8]],
        packet_size: usize,
    ) {
        self.record("encode_schedule");
        self.inner.encode_schedule(w, schedule, devices, packet_size)
    }

    fn decode_matrix(
        &self,
        matrix: &Matrix,
        erasures: &[usize],
        devices: &mut [&mut [u8]],
    ) -> Result<(), Error> {
        self.record("decode_matrix");
        self.inner.decode_matrix(matrix, erasures, devices)
    }

    fn decode_schedule_lazy(
        &self,
        k: usize,
        w: usize,
        bitmatrix: &BitMatrix,
        erasures: &[usize],
        devices: &mut [&mut [u8]],
        packet_size: usize,
    ) -> Result<(), Error> {
        self.record("decode_schedule_lazy");
        self.inner
            .decode_schedule_lazy(k, w, bitmatrix, erasures, devices, packet_size)
    }

    fn decode_selective(
        &self,
        k: usize,
        w: usize,
        bitmatrix: &BitMatrix,
        request: SelectiveDecode<'_, '_>,
    ) -> Result<(), Error> {
        self.record("decode_selective");
        *self.selective.lock().unwrap() = Some(SelectiveCall {
            erasures: request.erasures.to_vec(),
            coding: request.coding.to_vec(),
            parity_selection: request.parity_selection.to_vec(),
            control: request.control.clone(),
        });
        self.inner.decode_selective(k, w, bitmatrix, request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_records_calls_in_order() {
        let engine = RecordingEngine::new(GaloisEngine);
        let m = engine.cauchy_good_matrix(3, 2, 8);
        let bm = engine.matrix_to_bitmatrix(&m);
        engine.bitmatrix_to_schedule(3, 8, &bm);
        assert_eq!(
            engine.calls(),
            vec!["cauchy_good_matrix", "matrix_to_bitmatrix", "bitmatrix_to_schedule"]
        );
        engine.clear();
        assert!(engine.calls().is_empty());
    }
}
