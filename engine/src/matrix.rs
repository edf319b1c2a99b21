// Copyright 2024 Entanglement Contributors
// SPDX-License-Identifier: Apache-2.0, MIT

use serde::{Deserialize, Serialize};

use crate::galois;

/// A row-major matrix of GF(2^w) elements.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Matrix {
    pub rows: usize,
    pub cols: usize,
    pub w: usize,
    pub elements: Vec<u32>,
}

impl Matrix {
    pub fn zeroed(rows: usize, cols: usize, w: usize) -> Self {
        Self {
            rows,
            cols,
            w,
            elements: vec![0; rows * cols],
        }
    }

    pub fn identity(n: usize, w: usize) -> Self {
        let mut m = Self::zeroed(n, n, w);
        for i in 0..n {
            m.set(i, i, 1);
        }
        m
    }

    pub fn get(&self, row: usize, col: usize) -> u32 {
        self.elements[row * self.cols + col]
    }

    pub fn set(&mut self, row: usize, col: usize, value: u32) {
        self.elements[row * self.cols + col] = value;
    }

    pub fn row(&self, row: usize) -> &[u32] {
        &self.elements[row * self.cols..(row + 1) * self.cols]
    }

    /// Returns `self * other`.
    pub fn multiply(&self, other: &Matrix) -> Matrix {
        assert_eq!(self.cols, other.rows);
        let mut out = Matrix::zeroed(self.rows, other.cols, self.w);
        for i in 0..self.rows {
            for j in 0..other.cols {
                let mut acc = 0;
                for x in 0..self.cols {
                    acc ^= galois::multiply(self.get(i, x), other.get(x, j), self.w);
                }
                out.set(i, j, acc);
            }
        }
        out
    }

    /// Builds a matrix from the given rows of `self`.
    pub fn select_rows(&self, rows: &[usize]) -> Matrix {
        let mut out = Matrix::zeroed(rows.len(), self.cols, self.w);
        for (i, &r) in rows.iter().enumerate() {
            out.elements[i * self.cols..(i + 1) * self.cols].copy_from_slice(self.row(r));
        }
        out
    }

    /// Gauss-Jordan inversion. Returns `None` if the matrix is singular.
    pub fn invert(&self) -> Option<Matrix> {
        assert_eq!(self.rows, self.cols, "only square matrices can be inverted");
        let n = self.rows;
        let w = self.w;
        let mut a = self.clone();
        let mut inv = Matrix::identity(n, w);

        for col in 0..n {
            let pivot = (col..n).find(|&r| a.get(r, col) != 0)?;
            if pivot != col {
                a.swap_rows(pivot, col);
                inv.swap_rows(pivot, col);
            }
            let p = a.get(col, col);
            if p != 1 {
                let scale = galois::inverse(p, w);
                a.scale_row(col, scale);
                inv.scale_row(col, scale);
            }
            for r in 0..n {
                let factor = a.get(r, col);
                if r != col && factor != 0 {
                    a.add_scaled_row(col, r, factor);
                    inv.add_scaled_row(col, r, factor);
                }
            }
        }
        Some(inv)
    }

    fn swap_rows(&mut self, a: usize, b: usize) {
        for c in 0..self.cols {
            self.elements.swap(a * self.cols + c, b * self.cols + c);
        }
    }

    fn scale_row(&mut self, row: usize, factor: u32) {
        for c in 0..self.cols {
            let v = galois::multiply(self.get(row, c), factor, self.w);
            self.set(row, c, v);
        }
    }

    /// `dst += factor * src`
    fn add_scaled_row(&mut self, src: usize, dst: usize, factor: u32) {
        for c in 0..self.cols {
            let v = self.get(dst, c) ^ galois::multiply(self.get(src, c), factor, self.w);
            self.set(dst, c, v);
        }
    }
}

/// Systematic Reed-Solomon coding matrix (`m x k`) derived from a big
/// Vandermonde matrix. The first coding row and the first column are all ones.
pub fn vandermonde_coding_matrix(k: usize, m: usize, w: usize) -> Matrix {
    let rows = k + m;
    assert!(
        rows as u64 <= galois::field_size(w),
        "k+m={rows} does not fit in GF(2^{w})"
    );

    // extended Vandermonde: first row e0, last row e(k-1), row i = [i^j]
    let mut big = Matrix::zeroed(rows, k, w);
    big.set(0, 0, 1);
    for i in 1..rows - 1 {
        for j in 0..k {
            big.set(i, j, galois::pow(i as u32, j as u64, w));
        }
    }
    if rows > 1 {
        big.set(rows - 1, k - 1, 1);
    }

    let top: Vec<usize> = (0..k).collect();
    let top_inv = big
        .select_rows(&top)
        .invert()
        .expect("top of an extended Vandermonde matrix is invertible");
    let coding_rows: Vec<usize> = (k..rows).collect();
    let mut coding = big.select_rows(&coding_rows).multiply(&top_inv);

    // scale columns so the first coding row is all ones
    for j in 0..k {
        let e = coding.get(0, j);
        if e != 1 {
            let scale = galois::inverse(e, w);
            for i in 0..m {
                let v = galois::multiply(coding.get(i, j), scale, w);
                coding.set(i, j, v);
            }
        }
    }
    // scale the remaining rows so their first element is one
    for i in 1..m {
        let e = coding.get(i, 0);
        if e != 1 {
            coding.scale_row(i, galois::inverse(e, w));
        }
    }
    coding
}

/// RAID-6 coding matrix: P is the XOR of all data, Q weighs data `j` by 2^j.
pub fn raid6_coding_matrix(k: usize, w: usize) -> Matrix {
    let mut matrix = Matrix::zeroed(2, k, w);
    let mut q = 1u32;
    for j in 0..k {
        matrix.set(0, j, 1);
        matrix.set(1, j, q);
        q = galois::multiply(q, 2, w);
    }
    matrix
}

/// Cauchy matrix with `X = {0..m}` and `Y = {m..m+k}`.
pub fn cauchy_original_coding_matrix(k: usize, m: usize, w: usize) -> Matrix {
    assert!(
        (k + m) as u64 <= galois::field_size(w),
        "k+m={} does not fit in GF(2^{w})",
        k + m
    );
    let mut matrix = Matrix::zeroed(m, k, w);
    for i in 0..m {
        for j in 0..k {
            matrix.set(i, j, galois::inverse((i ^ (m + j)) as u32, w));
        }
    }
    matrix
}

/// Cauchy matrix normalized to reduce the number of ones in its bit-matrix:
/// the first row becomes all ones and every other row is divided by the
/// element that minimizes its ones.
pub fn cauchy_good_coding_matrix(k: usize, m: usize, w: usize) -> Matrix {
    let mut matrix = cauchy_original_coding_matrix(k, m, w);

    for j in 0..k {
        let e = matrix.get(0, j);
        if e != 1 {
            let scale = galois::inverse(e, w);
            for i in 0..m {
                let v = galois::multiply(matrix.get(i, j), scale, w);
                matrix.set(i, j, v);
            }
        }
    }

    for i in 1..m {
        let ones = |scale: u32| -> usize {
            matrix
                .row(i)
                .iter()
                .map(|&e| galois::bitmatrix_ones(galois::multiply(e, scale, w), w))
                .sum()
        };
        let mut best = ones(1);
        let mut best_scale = None;
        for j in 0..k {
            let e = matrix.get(i, j);
            if e != 1 {
                let scale = galois::inverse(e, w);
                let candidate = ones(scale);
                if candidate < best {
                    best = candidate;
                    best_scale = Some(scale);
                }
            }
        }
        if let Some(scale) = best_scale {
            matrix.scale_row(i, scale);
        }
    }
    matrix
}
