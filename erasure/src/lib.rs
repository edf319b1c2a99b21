// Copyright 2024 Entanglement Contributors
// SPDX-License-Identifier: Apache-2.0, MIT

//! # Erasure
//!
//! The policy layer of an erasure coded pool: it validates the profile of one of seven coding
//! techniques, computes chunk sizes, builds the coding plan once and drives full and selective
//! chunk reconstruction through an [`Engine`](recall_erasure_engine::Engine).
//!
//! [`Scheme`] ties the pieces together and is what a storage daemon holds per pool.
//!
//! ### Example
//!
//! ```rust
//! use std::collections::BTreeSet;
//! use recall_erasure::{Profile, Scheme, Technique};
//!
//! let mut profile = Profile::new();
//! profile.insert("k".to_string(), "4".to_string());
//! profile.insert("m".to_string(), "2".to_string());
//! let scheme = Scheme::init(Technique::VandermondeRS, &mut profile).unwrap();
//!
//! let object = b"a small object spread over four data chunks".to_vec();
//! let all: BTreeSet<usize> = (0..scheme.chunk_count()).collect();
//! let mut chunks = scheme.encode(&all, &object);
//! chunks.remove(&1);
//! chunks.remove(&4);
//!
//! let decoded = scheme.decode_concat(&chunks).unwrap();
//! assert_eq!(&decoded[..object.len()], &object[..]);
//! ```

pub mod alignment;
pub mod codec;
pub mod error;
pub use error::Error;
pub mod placement;
pub use placement::Placement;
pub mod plan;
pub use plan::CodingPlan;
pub mod profile;
pub use profile::Profile;
pub mod repair;
pub use repair::{RepairPlanner, RepairRequest, RepairSolution};
pub mod scheme;
pub use scheme::*;
pub mod technique;
pub use technique::{Family, Technique};
pub mod validator;
pub use validator::{SchemeParams, Validation};
