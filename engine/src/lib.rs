// Copyright 2024 Entanglement Contributors
// SPDX-License-Identifier: Apache-2.0, MIT

//! # Erasure Engine
//!
//! Galois-field linear algebra consumed by the erasure code plugin. The plugin only sees the
//! [`Engine`](engine::Engine) trait; everything below it is an implementation detail.
//!
//! ## Modules
//!
//! - [`engine`](engine): The [`Engine`](engine::Engine) trait, its error type and the repair control.
//! - [`galois`](galois): Arithmetic in GF(2^w) and region kernels.
//! - [`matrix`](matrix): Element coding matrices (Vandermonde, RAID-6, Cauchy).
//! - [`bitmatrix`](bitmatrix): Bit-matrices (Liberation, Blaum-Roth, Liber8tion) and expansion.
//! - [`schedule`](schedule): XOR schedules derived from bit-matrices.
//! - [`native`](native): [`GaloisEngine`](native::GaloisEngine), the pure Rust engine.
//! - [`mock`](mock): A recording wrapper for tests.
//!
//! ### Example
//!
//! ```rust
//! use recall_erasure_engine::{Engine, GaloisEngine};
//!
//! let engine = GaloisEngine::new();
//! let matrix = engine.vandermonde_matrix(2, 1, 8);
//! let mut devices = vec![vec![1u8, 2], vec![3u8, 4], vec![0u8, 0]];
//! let mut refs: Vec<&mut [u8]> = devices.iter_mut().map(|d| d.as_mut_slice()).collect();
//! engine.encode_matrix(&matrix, &mut refs);
//! // the first coding row of a Vandermonde matrix is all ones
//! assert_eq!(devices[2], vec![1 ^ 3, 2 ^ 4]);
//! ```

pub mod bitmatrix;
pub mod engine;
pub mod galois;
pub mod matrix;
pub mod native;
pub mod schedule;
pub use bitmatrix::BitMatrix;
pub use engine::*;
pub use matrix::Matrix;
pub use native::GaloisEngine;
pub use schedule::{Operation, Schedule, Symbol};

#[cfg(any(test, feature = "mock"))]
pub mod mock;
