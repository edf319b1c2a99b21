// Copyright 2024 Entanglement Contributors
// SPDX-License-Identifier: Apache-2.0, MIT

use crate::bitmatrix::BitMatrix;
use crate::matrix::Matrix;
use crate::schedule::Schedule;

/// Error type for decode operations.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// More devices are erased than the code has coding devices.
    #[error("{erasures} erasures exceed the {m} coding devices")]
    TooManyErasures { erasures: usize, m: usize },

    /// The rows of the surviving devices do not form an invertible matrix.
    #[error("decoding matrix is singular")]
    SingularMatrix,

    /// The repair control, parity selection or repair stream does not
    /// describe a solvable selective repair.
    #[error("invalid selective repair: {0}")]
    InvalidControl(String),
}

impl Error {
    /// Negative status code of the failure.
    pub fn code(&self) -> i32 {
        -1
    }
}

/// One entry of a [`RepairControl`]: a node and the symbols it is addressed by.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlEntry {
    pub node_id: usize,
    pub symbol_ids: Vec<usize>,
}

/// Describes, for one selective repair, which symbols each helper data node
/// supplies (`entries[j]` for `j < k`) and which node is repaired from the
/// coding stream (`entries[k]`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepairControl {
    pub entries: Vec<Option<ControlEntry>>,
}

impl RepairControl {
    pub fn new(k: usize) -> Self {
        Self {
            entries: vec![None; k + 1],
        }
    }

    /// The node rebuilt from the coding stream, if any.
    pub fn target(&self) -> Option<&ControlEntry> {
        self.entries.last().and_then(|e| e.as_ref())
    }
}

/// Buffers of a selective repair.
pub struct SelectiveDecode<'a, 'b> {
    /// Erased devices to rebuild.
    pub erasures: &'a [usize],
    /// Data devices indexed by id. Helper devices hold only the symbols listed
    /// in their control entry, per window and in list order. The erased device
    /// receives the full block.
    pub data: &'a mut [&'b mut [u8]],
    /// Coding symbols selected by the parity selection, per window, ordered by
    /// parity and then row.
    pub coding: &'a [u8],
    pub block_size: usize,
    pub packet_size: usize,
    /// For every row `r < w` of the erased device, the parity whose bit-row
    /// `r` is used to rebuild it.
    pub parity_selection: &'a [usize],
    pub control: &'a RepairControl,
}

/// The Galois-field linear algebra used by the erasure code plugin.
///
/// Construction calls are infallible for validated parameters. Region calls
/// take the `k` data buffers followed by the `m` coding buffers, all of the
/// same length.
pub trait Engine: Send + Sync {
    /// Systematic Reed-Solomon matrix derived from a Vandermonde matrix.
    fn vandermonde_matrix(&self, k: usize, m: usize, w: usize) -> Matrix;

    /// Two-parity RAID-6 Reed-Solomon matrix.
    fn raid6_matrix(&self, k: usize, w: usize) -> Matrix;

    /// Cauchy matrix as first defined.
    fn cauchy_original_matrix(&self, k: usize, m: usize, w: usize) -> Matrix;

    /// Cauchy matrix normalized to lower the XOR count of its bit-matrix.
    fn cauchy_good_matrix(&self, k: usize, m: usize, w: usize) -> Matrix;

    fn liberation_bitmatrix(&self, k: usize, w: usize) -> BitMatrix;

    fn blaum_roth_bitmatrix(&self, k: usize, w: usize) -> BitMatrix;

    fn liber8tion_bitmatrix(&self, k: usize) -> BitMatrix;

    fn matrix_to_bitmatrix(&self, matrix: &Matrix) -> BitMatrix;

    fn bitmatrix_to_schedule(&self, k: usize, w: usize, bitmatrix: &BitMatrix) -> Schedule;

    /// Computes the coding buffers from the data buffers.
    fn encode_matrix(&self, matrix: &Matrix, devices: &mut [&mut [u8]]);

    /// Computes the coding buffers by replaying the schedule on every window.
    fn encode_schedule(
        &self,
        w: usize,
        schedule: &Schedule,
        devices: &mut [&mut [u8]],
        packet_size: usize,
    );

    /// Rebuilds the erased devices from the others.
    fn decode_matrix(
        &self,
        matrix: &Matrix,
        erasures: &[usize],
        devices: &mut [&mut [u8]],
    ) -> Result<(), Error>;

    /// Rebuilds the erased devices with a schedule derived for this erasure
    /// pattern only.
    fn decode_schedule_lazy(
        &self,
        k: usize,
        w: usize,
        bitmatrix: &BitMatrix,
        erasures: &[usize],
        devices: &mut [&mut [u8]],
        packet_size: usize,
    ) -> Result<(), Error>;

    /// Rebuilds a single data device from the selected parity equations,
    /// reading only the symbols the control lists.
    fn decode_selective(
        &self,
        k: usize,
        w: usize,
        bitmatrix: &BitMatrix,
        request: SelectiveDecode<'_, '_>,
    ) -> Result<(), Error>;
}
