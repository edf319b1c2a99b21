// Copyright 2024 Entanglement Contributors
// SPDX-License-Identifier: Apache-2.0, MIT

use serde::{Deserialize, Serialize};

use crate::galois;
use crate::matrix::Matrix;

/// A row-major matrix over GF(2). For a code with `k` data and `m` coding
/// devices it has `m * w` rows and `k * w` columns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BitMatrix {
    pub rows: usize,
    pub cols: usize,
    pub bits: Vec<u8>,
}

impl BitMatrix {
    pub fn zeroed(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            bits: vec![0; rows * cols],
        }
    }

    pub fn identity(n: usize) -> Self {
        let mut m = Self::zeroed(n, n);
        for i in 0..n {
            m.set(i, i, true);
        }
        m
    }

    pub fn get(&self, row: usize, col: usize) -> bool {
        self.bits[row * self.cols + col] != 0
    }

    pub fn set(&mut self, row: usize, col: usize, value: bool) {
        self.bits[row * self.cols + col] = value as u8;
    }

    pub fn row(&self, row: usize) -> &[u8] {
        &self.bits[row * self.cols..(row + 1) * self.cols]
    }

    /// Number of ones in the whole matrix.
    pub fn ones(&self) -> usize {
        self.bits.iter().filter(|&&b| b != 0).count()
    }

    /// Builds a matrix from arbitrary rows.
    pub fn from_rows<'a>(cols: usize, rows: impl IntoIterator<Item = &'a [u8]>) -> Self {
        let mut bits = Vec::new();
        let mut n = 0;
        for row in rows {
            debug_assert_eq!(row.len(), cols);
            bits.extend_from_slice(row);
            n += 1;
        }
        Self {
            rows: n,
            cols,
            bits,
        }
    }

    /// Gauss-Jordan inversion over GF(2). Returns `None` if singular.
    pub fn invert(&self) -> Option<BitMatrix> {
        assert_eq!(self.rows, self.cols, "only square matrices can be inverted");
        let n = self.rows;
        let mut a = self.clone();
        let mut inv = BitMatrix::identity(n);

        for col in 0..n {
            let pivot = (col..n).find(|&r| a.get(r, col))?;
            if pivot != col {
                a.swap_rows(pivot, col);
                inv.swap_rows(pivot, col);
            }
            for r in 0..n {
                if r != col && a.get(r, col) {
                    a.xor_row(col, r);
                    inv.xor_row(col, r);
                }
            }
        }
        Some(inv)
    }

    fn swap_rows(&mut self, a: usize, b: usize) {
        for c in 0..self.cols {
            self.bits.swap(a * self.cols + c, b * self.cols + c);
        }
    }

    fn xor_row(&mut self, src: usize, dst: usize) {
        for c in 0..self.cols {
            self.bits[dst * self.cols + c] ^= self.bits[src * self.cols + c];
        }
    }
}

/// Expands an element matrix into its bit-matrix. Column `x` of the block for
/// element `e` holds the bits of `e * 2^x`.
pub fn matrix_to_bitmatrix(matrix: &Matrix) -> BitMatrix {
    let w = matrix.w;
    let mut bm = BitMatrix::zeroed(matrix.rows * w, matrix.cols * w);
    for i in 0..matrix.rows {
        for j in 0..matrix.cols {
            let mut e = matrix.get(i, j);
            for x in 0..w {
                for l in 0..w {
                    bm.set(i * w + l, j * w + x, e & (1 << l) != 0);
                }
                e = galois::multiply(e, 2, w);
            }
        }
    }
    bm
}

/// Sets the identity blocks of the P device shared by every two-parity code.
fn two_parity_with_identity(k: usize, w: usize) -> BitMatrix {
    let mut bm = BitMatrix::zeroed(2 * w, k * w);
    for j in 0..k {
        for i in 0..w {
            bm.set(i, j * w + i, true);
        }
    }
    bm
}

/// Liberation code (Plank): `k <= w`, `w` prime.
pub fn liberation_coding_bitmatrix(k: usize, w: usize) -> BitMatrix {
    assert!(k <= w, "liberation needs k={k} <= w={w}");
    let mut bm = two_parity_with_identity(k, w);
    for j in 0..k {
        for i in 0..w {
            bm.set(w + i, j * w + (j + i) % w, true);
        }
        if j > 0 {
            let i = (j * ((w - 1) / 2)) % w;
            bm.set(w + i, j * w + (i + j - 1) % w, true);
        }
    }
    bm
}

/// Blaum-Roth code: `k <= w`, `w + 1` prime.
pub fn blaum_roth_coding_bitmatrix(k: usize, w: usize) -> BitMatrix {
    assert!(k <= w, "blaum-roth needs k={k} <= w={w}");
    let mut bm = two_parity_with_identity(k, w);
    let p = w + 1;
    for j in 0..k {
        if j == 0 {
            for l in 0..w {
                bm.set(w + l, l, true);
            }
            continue;
        }
        let i = j;
        for l in 1..=w {
            let row = w + l - 1;
            if l != p - i {
                let mut col = l + i;
                if col >= p {
                    col -= p;
                }
                bm.set(row, j * w + col - 1, true);
            } else {
                bm.set(row, j * w + i - 1, true);
                let col = if i % 2 == 0 { i / 2 } else { p / 2 + 1 + i / 2 };
                bm.set(row, j * w + col - 1, true);
            }
        }
    }
    bm
}

/// Two-parity code over GF(2^8) for `k <= 8`: Q weighs data device `j` by 2^j.
///
/// This is the bit expansion of the RAID-6 Q row, not the published Liber8tion
/// minimum-density table. It recovers any two devices, but its XOR count is
/// higher than Liber8tion's.
pub fn liber8tion_coding_bitmatrix(k: usize) -> BitMatrix {
    const W: usize = 8;
    assert!(k <= W, "liber8tion needs k={k} <= 8");
    let mut bm = two_parity_with_identity(k, W);
    let q = matrix_to_bitmatrix(&crate::matrix::raid6_coding_matrix(k, W));
    for r in W..2 * W {
        for c in 0..k * W {
            bm.set(r, c, q.get(r, c));
        }
    }
    bm
}
