// Copyright 2024 Entanglement Contributors
// SPDX-License-Identifier: Apache-2.0, MIT

use log::trace;

use crate::bitmatrix::{self, BitMatrix};
use crate::engine::{Engine, Error, SelectiveDecode};
use crate::galois;
use crate::matrix::{self, Matrix};
use crate::schedule::{self, Schedule, Symbol};

/// Pure Rust implementation of [`Engine`].
#[derive(Debug, Clone, Copy, Default)]
pub struct GaloisEngine;

impl GaloisEngine {
    pub fn new() -> Self {
        Self
    }
}

/// Splits `erasures` into a per-device flag vector after checking it is recoverable.
fn erased_flags(erasures: &[usize], k: usize, m: usize) -> Result<Vec<bool>, Error> {
    if erasures.len() > m {
        return Err(Error::TooManyErasures {
            erasures: erasures.len(),
            m,
        });
    }
    let mut erased = vec![false; k + m];
    for &e in erasures {
        erased[e] = true;
    }
    Ok(erased)
}

/// For every data device, the device whose rows stand in for it in the
/// decoding matrix: itself when alive, otherwise the next surviving coding device.
fn surviving_devices(erased: &[bool], k: usize) -> Vec<usize> {
    let mut spare = (k..erased.len()).filter(|&c| !erased[c]);
    (0..k)
        .map(|d| {
            if erased[d] {
                // erasures <= m guarantees enough coding devices survive
                spare.next().unwrap_or(d)
            } else {
                d
            }
        })
        .collect()
}

impl Engine for GaloisEngine {
    fn vandermonde_matrix(&self, k: usize, m: usize, w: usize) -> Matrix {
        matrix::vandermonde_coding_matrix(k, m, w)
    }

    fn raid6_matrix(&self, k: usize, w: usize) -> Matrix {
        matrix::raid6_coding_matrix(k, w)
    }

    fn cauchy_original_matrix(&self, k: usize, m: usize, w: usize) -> Matrix {
        matrix::cauchy_original_coding_matrix(k, m, w)
    }

    fn cauchy_good_matrix(&self, k: usize, m: usize, w: usize) -> Matrix {
        matrix::cauchy_good_coding_matrix(k, m, w)
    }

    fn liberation_bitmatrix(&self, k: usize, w: usize) -> BitMatrix {
        bitmatrix::liberation_coding_bitmatrix(k, w)
    }

    fn blaum_roth_bitmatrix(&self, k: usize, w: usize) -> BitMatrix {
        bitmatrix::blaum_roth_coding_bitmatrix(k, w)
    }

    fn liber8tion_bitmatrix(&self, k: usize) -> BitMatrix {
        bitmatrix::liber8tion_coding_bitmatrix(k)
    }

    fn matrix_to_bitmatrix(&self, matrix: &Matrix) -> BitMatrix {
        bitmatrix::matrix_to_bitmatrix(matrix)
    }

    fn bitmatrix_to_schedule(&self, k: usize, w: usize, bitmatrix: &BitMatrix) -> Schedule {
        schedule::bitmatrix_to_schedule(k, w, bitmatrix)
    }

    fn encode_matrix(&self, matrix: &Matrix, devices: &mut [&mut [u8]]) {
        let k = matrix.cols;
        let (data, coding) = devices.split_at_mut(k);
        for (i, dst) in coding.iter_mut().enumerate() {
            for (j, src) in data.iter().enumerate() {
                galois::multiply_region(src, dst, matrix.get(i, j), matrix.w, j > 0);
            }
        }
    }

    fn encode_schedule(
        &self,
        w: usize,
        schedule: &Schedule,
        devices: &mut [&mut [u8]],
        packet_size: usize,
    ) {
        schedule.apply(devices, packet_size, w);
    }

    fn decode_matrix(
        &self,
        matrix: &Matrix,
        erasures: &[usize],
        devices: &mut [&mut [u8]],
    ) -> Result<(), Error> {
        let k = matrix.cols;
        let m = matrix.rows;
        let w = matrix.w;
        let erased = erased_flags(erasures, k, m)?;
        let len = devices.first().map(|d| d.len()).unwrap_or(0);

        if erased[..k].iter().any(|&e| e) {
            let survivors = surviving_devices(&erased, k);
            let mut decoding = Matrix::zeroed(k, k, w);
            for (i, &dev) in survivors.iter().enumerate() {
                if dev < k {
                    decoding.set(i, dev, 1);
                } else {
                    for j in 0..k {
                        decoding.set(i, j, matrix.get(dev - k, j));
                    }
                }
            }
            let inverse = decoding.invert().ok_or(Error::SingularMatrix)?;
            trace!("decode_matrix: survivors {:?}", survivors);

            for d in (0..k).filter(|&d| erased[d]) {
                let mut out = vec![0u8; len];
                for (i, &dev) in survivors.iter().enumerate() {
                    galois::multiply_region(devices[dev], &mut out, inverse.get(d, i), w, true);
                }
                devices[d].copy_from_slice(&out);
            }
        }

        for c in (0..m).filter(|&c| erased[k + c]) {
            let mut out = vec![0u8; len];
            for j in 0..k {
                galois::multiply_region(devices[j], &mut out, matrix.get(c, j), w, true);
            }
            devices[k + c].copy_from_slice(&out);
        }
        Ok(())
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
        let m = bitmatrix.rows / w;
        let erased = erased_flags(erasures, k, m)?;
        let mut plan = Schedule::default();

        if erased[..k].iter().any(|&e| e) {
            let survivors = surviving_devices(&erased, k);
            let identity = BitMatrix::identity(k * w);
            let mut rows: Vec<&[u8]> = Vec::with_capacity(k * w);
            let mut sources = Vec::with_capacity(k * w);
            for (i, &dev) in survivors.iter().enumerate() {
                for x in 0..w {
                    rows.push(if dev < k {
                        identity.row(i * w + x)
                    } else {
                        bitmatrix.row((dev - k) * w + x)
                    });
                    sources.push(Symbol::new(dev, x));
                }
            }
            let inverse = BitMatrix::from_rows(k * w, rows)
                .invert()
                .ok_or(Error::SingularMatrix)?;

            let mut targets = Vec::new();
            let mut target_rows: Vec<&[u8]> = Vec::new();
            for d in (0..k).filter(|&d| erased[d]) {
                for x in 0..w {
                    targets.push(Symbol::new(d, x));
                    target_rows.push(inverse.row(d * w + x));
                }
            }
            plan.extend(schedule::rows_to_schedule(&target_rows, &sources, &targets));
        }

        let coding: Vec<usize> = (0..m).filter(|&c| erased[k + c]).collect();
        if !coding.is_empty() {
            let sources: Vec<Symbol> = (0..k * w).map(|c| Symbol::new(c / w, c % w)).collect();
            let mut targets = Vec::new();
            let mut rows: Vec<&[u8]> = Vec::new();
            for c in coding {
                for x in 0..w {
                    targets.push(Symbol::new(k + c, x));
                    rows.push(bitmatrix.row(c * w + x));
                }
            }
            plan.extend(schedule::rows_to_schedule(&rows, &sources, &targets));
        }

        trace!("decode_schedule_lazy: {} operations", plan.len());
        plan.apply(devices, packet_size, w);
        Ok(())
    }

    fn decode_selective(
        &self,
        k: usize,
        w: usize,
        bitmatrix: &BitMatrix,
        request: SelectiveDecode<'_, '_>,
    ) -> Result<(), Error> {
        let m = bitmatrix.rows / w;
        let ps = request.packet_size;
        let invalid = |msg: String| Err(Error::InvalidControl(msg));

        let target = match (request.erasures, request.control.target()) {
            ([e], Some(t)) if *e < k && t.node_id == *e => *e,
            (erasures, target) => {
                return invalid(format!(
                    "expected one erased data node matching the control target, got {:?} and {:?}",
                    erasures,
                    target.map(|t| t.node_id)
                ))
            }
        };
        let selection = request.parity_selection;
        if selection.len() != w || selection.iter().any(|&p| p >= m) {
            return invalid(format!("parity selection {selection:?} needs {w} entries below {m}"));
        }
        if request.control.target().map(|t| t.symbol_ids.len()) != Some(w) {
            return invalid(format!("the repair stream must hold {w} coding symbols"));
        }

        let rows: Vec<usize> = (0..w).map(|r| selection[r] * w + r).collect();
        let local = BitMatrix::from_rows(
            w,
            rows.iter()
                .map(|&row| &bitmatrix.row(row)[target * w..(target + 1) * w]),
        );
        let inverse = local.invert().ok_or(Error::SingularMatrix)?;

        // position of each chosen row in the stream: by parity, then by row
        let mut stream_pos = vec![0; w];
        let mut order: Vec<usize> = (0..w).collect();
        order.sort_by_key(|&r| (selection[r], r));
        for (pos, &r) in order.iter().enumerate() {
            stream_pos[r] = pos;
        }

        // helper symbols each equation needs, as (node, position in its buffer)
        let mut terms: Vec<Vec<(usize, usize)>> = Vec::with_capacity(w);
        for &row in &rows {
            let mut needed = Vec::new();
            for j in (0..k).filter(|&j| j != target) {
                for x in 0..w {
                    if !bitmatrix.get(row, j * w + x) {
                        continue;
                    }
                    let supplied = request.control.entries[j]
                        .as_ref()
                        .and_then(|e| e.symbol_ids.iter().position(|&s| s == x));
                    match supplied {
                        Some(pos) => needed.push((j, pos)),
                        None => return invalid(format!("node {j} does not supply symbol {x}")),
                    }
                }
            }
            terms.push(needed);
        }

        let window = ps * w;
        if window == 0 || request.block_size % window != 0 {
            return invalid(format!(
                "block size {} is not a multiple of {window}",
                request.block_size
            ));
        }
        let windows = request.block_size / window;
        if request.coding.len() != windows * window {
            return invalid(format!(
                "repair stream holds {} bytes, expected {}",
                request.coding.len(),
                windows * window
            ));
        }
        let supplied = |j: usize| {
            request.control.entries[j]
                .as_ref()
                .map(|e| e.symbol_ids.len())
                .unwrap_or(0)
        };
        for j in (0..k).filter(|&j| j != target && supplied(j) > 0) {
            if request.data[j].len() != windows * supplied(j) * ps {
                return invalid(format!("helper node {j} holds {} bytes", request.data[j].len()));
            }
        }
        if request.data[target].len() != request.block_size {
            return invalid(format!("node {target} needs a buffer of {}", request.block_size));
        }

        trace!("decode_selective: node {target} from rows {:?}", rows);
        for t in 0..windows {
            let mut rhs = Vec::with_capacity(w);
            for (r, needed) in terms.iter().enumerate() {
                let start = t * window + stream_pos[r] * ps;
                let mut packet = request.coding[start..start + ps].to_vec();
                for &(j, pos) in needed {
                    let start = (t * supplied(j) + pos) * ps;
                    galois::xor_region(&request.data[j][start..start + ps], &mut packet);
                }
                rhs.push(packet);
            }
            for x in 0..w {
                let start = t * window + x * ps;
                let out = &mut request.data[target][start..start + ps];
                out.fill(0);
                for (r, packet) in rhs.iter().enumerate() {
                    if inverse.get(x, r) {
                        galois::xor_region(packet, out);
                    }
                }
            }
        }
        Ok(())
    }
}
