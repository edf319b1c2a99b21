// Copyright 2024 Entanglement Contributors
// SPDX-License-Identifier: Apache-2.0, MIT

//! Selective repair of a data chunk from a subset of the symbols of the other chunks.
//!
//! A repair is described by a [`RepairSolution`]: for every helper node, the symbols it sends.
//! Helper data nodes send the listed packets of every window of their chunk. Coding nodes do the
//! same, and their packets are gathered into a single repair stream before the engine rebuilds
//! the erased node from the parity equations picked by the parity selection.

use std::collections::{BTreeMap, BTreeSet};

use log::{debug, warn};
use recall_erasure_engine::{BitMatrix, ControlEntry, Engine, RepairControl, SelectiveDecode};

use crate::error::Error;
use crate::plan::CodingPlan;
use crate::technique::Technique;

/// Node id to the ordered symbol ids that node supplies.
pub type RepairSolution = BTreeMap<usize, Vec<usize>>;

/// One selective repair.
#[derive(Debug, Clone, Copy)]
pub struct RepairRequest<'a> {
    /// Chunks to rebuild.
    pub want: &'a BTreeSet<usize>,
    /// Length of a full chunk.
    pub block_size: usize,
    pub solution: &'a RepairSolution,
    /// For every row of the erased chunk, the parity equation used to rebuild it.
    pub parity_selection: &'a [usize],
}

/// Drives selective repairs against the plan of a bit-matrix technique.
pub struct RepairPlanner<'a, E: Engine> {
    engine: &'a E,
    technique: Technique,
    plan: &'a CodingPlan,
    k: usize,
    w: usize,
    packet_size: usize,
}

impl<'a, E: Engine> RepairPlanner<'a, E> {
    pub fn new(
        engine: &'a E,
        technique: Technique,
        plan: &'a CodingPlan,
        k: usize,
        w: usize,
        packet_size: usize,
    ) -> Self {
        Self {
            engine,
            technique,
            plan,
            k,
            w,
            packet_size,
        }
    }

    /// Builds the repair control of a solution.
    ///
    /// Data nodes of the solution keep their symbol lists. The symbols of all
    /// coding nodes are renumbered from zero into one shared list, which is
    /// assigned to the first data node missing from the solution and to the
    /// last entry. Later missing data nodes get no entry.
    pub fn build_control(k: usize, w: usize, solution: &RepairSolution) -> RepairControl {
        let mut control = RepairControl::new(k);
        let mut coding_symbols = 0;
        for (&node, symbols) in solution {
            if node < k {
                control.entries[node] = Some(ControlEntry {
                    node_id: node,
                    symbol_ids: symbols.clone(),
                });
            } else {
                coding_symbols += symbols.len();
            }
        }
        if coding_symbols != w {
            warn!("coding nodes supply {coding_symbols} symbols, a repair needs {w}");
        }
        let shared: Vec<usize> = (0..coding_symbols).collect();
        if let Some(missing) = (0..k).find(|node| !solution.contains_key(node)) {
            let entry = ControlEntry {
                node_id: missing,
                symbol_ids: shared,
            };
            control.entries[missing] = Some(entry.clone());
            control.entries[k] = Some(entry);
        }
        control
    }

    /// Gathers, window by window, the packets the coding nodes of the solution
    /// sent into one contiguous stream.
    ///
    /// Coding node buffers hold only the listed symbols: `symbols.len()`
    /// packets per window.
    pub fn repair_stream(
        &self,
        block_size: usize,
        solution: &RepairSolution,
        buffers: &BTreeMap<usize, Vec<u8>>,
    ) -> Result<Vec<u8>, Error> {
        let ps = self.packet_size;
        let window = ps * self.w;
        let windows = if window == 0 { 0 } else { block_size / window };
        let coding: Vec<(usize, &Vec<usize>)> = solution
            .range(self.k..)
            .map(|(&node, symbols)| (node, symbols))
            .collect();

        for &(node, symbols) in &coding {
            let buffer = buffers.get(&node).ok_or(Error::MissingChunk(node))?;
            let expected = windows * symbols.len() * ps;
            if buffer.len() < expected {
                return Err(Error::ChunkSizeMismatch {
                    index: node,
                    expected,
                    actual: buffer.len(),
                });
            }
        }

        let mut stream = Vec::with_capacity(block_size);
        for t in 0..windows {
            for &(node, symbols) in &coding {
                let buffer = &buffers[&node];
                for i in 0..symbols.len() {
                    let start = (t * symbols.len() + i) * ps;
                    stream.extend_from_slice(&buffer[start..start + ps]);
                }
            }
        }
        Ok(stream)
    }

    /// Rebuilds the wanted chunk from the symbols of the solution.
    ///
    /// `buffers` holds the compacted chunks of the helper nodes, as produced
    /// by [`compact`](Self::compact). Wanted chunks are resized to `block_size`
    /// and overwritten; data nodes that send nothing get an empty buffer.
    ///
    /// # Errors
    ///
    /// [`Error::Unsupported`] for element-matrix techniques, [`Error::Engine`]
    /// when the engine refuses the repair. `buffers` is left as it was on error.
    ///
    /// # Panics
    ///
    /// Panics if `want` is empty.
    pub fn decode_for_xor(
        &self,
        request: RepairRequest<'_>,
        buffers: &mut BTreeMap<usize, Vec<u8>>,
    ) -> Result<(), Error> {
        let bitmatrix = match self.plan {
            CodingPlan::Schedule { bitmatrix, .. } => bitmatrix,
            CodingPlan::Matrix(_) => return Err(Error::Unsupported(self.technique.name())),
        };
        assert!(!request.want.is_empty(), "decode_for_xor called without erasures");

        let stream = self.repair_stream(request.block_size, request.solution, buffers)?;
        let erasures: Vec<usize> = request.want.iter().copied().collect();
        let control = Self::build_control(self.k, self.w, request.solution);
        debug!(
            "decode_for_xor: erasures {erasures:?}, parity selection {:?}, {} stream bytes",
            request.parity_selection,
            stream.len()
        );

        // the caller's buffers move into `data` and come back unchanged on failure
        let mut absent = BTreeSet::new();
        let mut replaced = BTreeMap::new();
        let mut data: Vec<Vec<u8>> = Vec::with_capacity(self.k);
        for node in 0..self.k {
            let buffer = buffers.remove(&node);
            if buffer.is_none() {
                absent.insert(node);
            }
            if request.want.contains(&node) {
                replaced.extend(buffer.map(|b| (node, b)));
                data.push(vec![0u8; request.block_size]);
            } else {
                data.push(buffer.unwrap_or_default());
            }
        }
        let mut refs: Vec<&mut [u8]> = data.iter_mut().map(|b| b.as_mut_slice()).collect();

        let result = self.engine.decode_selective(
            self.k,
            self.w,
            bitmatrix,
            SelectiveDecode {
                erasures: &erasures,
                data: &mut refs,
                coding: &stream,
                block_size: request.block_size,
                packet_size: self.packet_size,
                parity_selection: request.parity_selection,
                control: &control,
            },
        );

        for (node, buffer) in data.into_iter().enumerate() {
            let touched = request.want.contains(&node) || absent.contains(&node);
            if result.is_ok() || !touched {
                buffers.insert(node, buffer);
            }
        }
        if result.is_err() {
            buffers.extend(replaced);
        }
        Ok(result?)
    }

    /// The smallest solution repairing data node `erased` with the given parity selection.
    ///
    /// Every other data node is listed, possibly with no symbols, so that
    /// `erased` is the only data node missing from the solution. Coding node
    /// `k + p` lists the rows whose selection is `p`.
    pub fn solution_for(
        bitmatrix: &BitMatrix,
        k: usize,
        w: usize,
        erased: usize,
        parity_selection: &[usize],
    ) -> RepairSolution {
        let rows: Vec<usize> = parity_selection
            .iter()
            .enumerate()
            .map(|(r, &p)| p * w + r)
            .collect();
        let mut solution = RepairSolution::new();
        for node in (0..k).filter(|&node| node != erased) {
            let symbols = (0..w)
                .filter(|&x| rows.iter().any(|&row| bitmatrix.get(row, node * w + x)))
                .collect();
            solution.insert(node, symbols);
        }
        for (r, &p) in parity_selection.iter().enumerate() {
            solution.entry(k + p).or_default().push(r);
        }
        solution
    }

    /// Extracts the listed symbols of every window of a full chunk, in list order.
    pub fn compact(chunk: &[u8], symbols: &[usize], packet_size: usize, w: usize) -> Vec<u8> {
        let window = packet_size * w;
        let mut out = Vec::with_capacity(chunk.len() / window.max(1) * symbols.len() * packet_size);
        for base in (0..chunk.len()).step_by(window.max(1)) {
            for &x in symbols {
                let start = base + x * packet_size;
                out.extend_from_slice(&chunk[start..start + packet_size]);
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use recall_erasure_engine::GaloisEngine;

    use super::*;

    fn solution(pairs: &[(usize, &[usize])]) -> RepairSolution {
        pairs.iter().map(|(n, s)| (*n, s.to_vec())).collect()
    }

    #[test]
    fn test_build_control_first_missing_node() {
        // k = 4: node 1 and 3 are missing, coding nodes 4 and 5 send 2 + 3 symbols
        let s = solution(&[(0, &[0, 2]), (2, &[4]), (4, &[0, 1]), (5, &[2, 3, 4])]);
        let control = RepairPlanner::<GaloisEngine>::build_control(4, 5, &s);
        assert_eq!(control.entries.len(), 5);
        assert_eq!(control.entries[0].as_ref().unwrap().symbol_ids, vec![0, 2]);
        assert_eq!(control.entries[2].as_ref().unwrap().symbol_ids, vec![4]);
        let shared = ControlEntry {
            node_id: 1,
            symbol_ids: vec![0, 1, 2, 3, 4],
        };
        assert_eq!(control.entries[1], Some(shared.clone()));
        assert_eq!(control.entries[4], Some(shared));
        assert_eq!(control.entries[3], None, "only the first missing node is filled");
        assert_eq!(control.target().map(|t| t.node_id), Some(1));
    }

    #[test]
    fn test_build_control_without_missing_node() {
        let s = solution(&[(0, &[0]), (1, &[1]), (2, &[0, 1])]);
        let control = RepairPlanner::<GaloisEngine>::build_control(2, 2, &s);
        assert!(control.target().is_none());
    }

    #[test]
    fn test_compact() {
        let chunk: Vec<u8> = (0..24).collect();
        // 2 windows of w=3 packets of 4 bytes
        let out = RepairPlanner::<GaloisEngine>::compact(&chunk, &[2, 0], 4, 3);
        assert_eq!(
            out,
            vec![8, 9, 10, 11, 0, 1, 2, 3, 20, 21, 22, 23, 12, 13, 14, 15]
        );
    }

    #[test]
    fn test_repair_stream_interleaves_windows() {
        let plan = CodingPlan::Matrix(recall_erasure_engine::Matrix::zeroed(2, 2, 8));
        let planner = RepairPlanner::new(&GaloisEngine, Technique::CauchyGood, &plan, 2, 2, 1);
        let s = solution(&[(2, &[0]), (3, &[1])]);
        let buffers: BTreeMap<usize, Vec<u8>> =
            [(2, vec![10, 11]), (3, vec![20, 21])].into_iter().collect();
        // block of 2 windows of 2 packets
        let stream = planner.repair_stream(4, &s, &buffers).unwrap();
        assert_eq!(stream, vec![10, 20, 11, 21]);

        let short: BTreeMap<usize, Vec<u8>> = [(2, vec![10])].into_iter().collect();
        assert_eq!(
            planner.repair_stream(4, &s, &short),
            Err(Error::ChunkSizeMismatch {
                index: 2,
                expected: 2,
                actual: 1
            })
        );
        let missing: BTreeMap<usize, Vec<u8>> = [(2, vec![10, 11])].into_iter().collect();
        assert_eq!(planner.repair_stream(4, &s, &missing), Err(Error::MissingChunk(3)));
    }

    #[test]
    fn test_solution_for_liberation() {
        let (k, w) = (3, 5);
        let bitmatrix = recall_erasure_engine::bitmatrix::liberation_coding_bitmatrix(k, w);
        let selection = [0, 0, 0, 0, 0];
        let s = RepairPlanner::<GaloisEngine>::solution_for(&bitmatrix, k, w, 0, &selection);
        // P rows only: every helper sends all of its symbols
        assert_eq!(s[&1], vec![0, 1, 2, 3, 4]);
        assert_eq!(s[&2], vec![0, 1, 2, 3, 4]);
        assert_eq!(s[&3], vec![0, 1, 2, 3, 4]);
        assert!(!s.contains_key(&0));
        assert!(!s.contains_key(&4));
    }
}
