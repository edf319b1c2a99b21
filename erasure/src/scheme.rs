// Copyright 2024 Entanglement Contributors
// SPDX-License-Identifier: Apache-2.0, MIT

use std::collections::{BTreeMap, BTreeSet};

use bytes::Bytes;
use log::{debug, trace};
use recall_erasure_engine::{BitMatrix, Engine, GaloisEngine, Matrix};

use crate::alignment;
use crate::codec::ChunkCodec;
use crate::error::Error;
use crate::placement::{Placement, INDEP};
use crate::plan::CodingPlan;
use crate::profile::{self, Profile, DEFAULT_RULESET_FAILURE_DOMAIN, DEFAULT_RULESET_ROOT};
use crate::repair::{RepairPlanner, RepairRequest, RepairSolution};
use crate::technique::Technique;
use crate::validator::{self, SchemeParams, Validation};

/// An erasure code instance for one pool: validated parameters and the coding plan built from them.
///
/// All operations take `&self`; the plan is never modified after [`init`](Scheme::init), so a
/// scheme can be shared between threads.
pub struct Scheme<E: Engine = GaloisEngine> {
    engine: E,
    technique: Technique,
    params: SchemeParams,
    profile: Profile,
    ruleset_root: String,
    ruleset_failure_domain: String,
    plan: CodingPlan,
}

impl Scheme<GaloisEngine> {
    /// Creates a scheme backed by [`GaloisEngine`]. See [`with_engine`](Scheme::with_engine).
    pub fn init(technique: Technique, profile: &mut Profile) -> Result<Self, Error> {
        Self::with_engine(GaloisEngine::new(), technique, profile)
    }

    /// Validates the profile without building a plan.
    ///
    /// The profile is corrected in place, as with [`init`](Scheme::init).
    pub fn validate(technique: Technique, profile: &mut Profile) -> Validation {
        validator::validate(technique, profile)
    }
}

impl<E: Engine> Scheme<E> {
    /// Creates a scheme from a profile.
    ///
    /// On failure the profile holds the corrected values and the error lists
    /// every correction, so calling again with the same profile succeeds.
    pub fn with_engine(
        engine: E,
        technique: Technique,
        profile: &mut Profile,
    ) -> Result<Self, Error> {
        debug!("technique={technique}");
        profile.insert("technique".to_string(), technique.to_string());
        let ruleset_root = profile::to_string(profile, "ruleset-root", DEFAULT_RULESET_ROOT);
        let ruleset_failure_domain =
            profile::to_string(profile, "ruleset-failure-domain", DEFAULT_RULESET_FAILURE_DOMAIN);

        let Validation { params, messages } = validator::validate(technique, profile);
        if !messages.is_empty() {
            return Err(Error::InvalidProfile {
                technique,
                messages,
            });
        }
        let plan = CodingPlan::build(&engine, technique, &params);
        Ok(Self {
            engine,
            technique,
            params,
            profile: profile.clone(),
            ruleset_root,
            ruleset_failure_domain,
            plan,
        })
    }

    pub fn technique(&self) -> Technique {
        self.technique
    }

    pub fn params(&self) -> &SchemeParams {
        &self.params
    }

    /// The profile as corrected by validation.
    pub fn profile(&self) -> &Profile {
        &self.profile
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn plan(&self) -> &CodingPlan {
        &self.plan
    }

    pub fn chunk_count(&self) -> usize {
        self.params.chunk_count()
    }

    pub fn data_chunk_count(&self) -> usize {
        self.params.k
    }

    pub fn coding_chunk_count(&self) -> usize {
        self.params.m
    }

    /// The word size `w`.
    pub fn symbol_count(&self) -> usize {
        self.params.w
    }

    /// `None` for element-matrix techniques.
    pub fn packet_size(&self) -> Option<usize> {
        self.params.packet_size
    }

    pub fn matrix(&self) -> Option<&Matrix> {
        self.plan.matrix()
    }

    pub fn bitmatrix(&self) -> Option<&BitMatrix> {
        self.plan.bitmatrix()
    }

    pub fn chunk_mapping(&self) -> Option<&[usize]> {
        self.params.chunk_mapping.as_deref()
    }

    /// Physical rank of logical chunk `i`.
    pub fn chunk_index(&self, i: usize) -> usize {
        self.chunk_mapping()
            .and_then(|mapping| mapping.get(i).copied())
            .unwrap_or(i)
    }

    pub fn get_alignment(&self) -> usize {
        alignment::alignment(self.technique, &self.params)
    }

    /// See [`alignment::chunk_size`].
    pub fn get_chunk_size(&self, object_size: usize) -> usize {
        alignment::chunk_size(self.technique, &self.params, object_size)
    }

    fn codec(&self) -> ChunkCodec<'_, E> {
        ChunkCodec::new(
            &self.engine,
            &self.plan,
            self.params.k,
            self.params.m,
            self.params.w,
            self.params.packet_size.unwrap_or(0),
        )
    }

    pub fn repair_planner(&self) -> RepairPlanner<'_, E> {
        RepairPlanner::new(
            &self.engine,
            self.technique,
            &self.plan,
            self.params.k,
            self.params.w,
            self.params.packet_size.unwrap_or(0),
        )
    }

    /// Computes the coding chunks in place. See [`ChunkCodec::encode`].
    pub fn encode_chunks(&self, chunks: &mut [&mut [u8]]) {
        self.codec().encode(chunks)
    }

    /// Rebuilds the chunks absent from `available` in place. See [`ChunkCodec::decode`].
    pub fn decode_chunks(
        &self,
        available: &BTreeSet<usize>,
        chunks: &mut [&mut [u8]],
    ) -> Result<(), Error> {
        Ok(self.codec().decode(available, chunks)?)
    }

    /// Splits `object` into `k` zero padded data chunks, computes the coding
    /// chunks and returns those in `want_to_encode`.
    pub fn encode(
        &self,
        want_to_encode: &BTreeSet<usize>,
        object: &[u8],
    ) -> BTreeMap<usize, Bytes> {
        let chunk_size = self.get_chunk_size(object.len());
        trace!("encode: {} bytes in chunks of {chunk_size}", object.len());
        let mut chunks = vec![vec![0u8; chunk_size]; self.chunk_count()];
        if chunk_size > 0 {
            for (chunk, piece) in chunks.iter_mut().zip(object.chunks(chunk_size)) {
                chunk[..piece.len()].copy_from_slice(piece);
            }
        }
        let mut refs: Vec<&mut [u8]> = chunks.iter_mut().map(|c| c.as_mut_slice()).collect();
        self.encode_chunks(&mut refs);

        chunks
            .into_iter()
            .enumerate()
            .filter(|(i, _)| want_to_encode.contains(i))
            .map(|(i, chunk)| (i, Bytes::from(chunk)))
            .collect()
    }

    /// Returns the chunks in `want_to_read`, rebuilding them if needed.
    ///
    /// The engine is only called when a wanted chunk is missing; every other
    /// missing chunk is rebuilt along with it.
    ///
    /// # Errors
    ///
    /// [`Error::MissingChunk`] for a wanted index outside `0..chunk_count()` or
    /// when no chunk is available, [`Error::ChunkSizeMismatch`] for chunks of
    /// unequal length, and the engine's error when the erasures are not
    /// recoverable.
    pub fn decode(
        &self,
        want_to_read: &BTreeSet<usize>,
        chunks: &BTreeMap<usize, Bytes>,
    ) -> Result<BTreeMap<usize, Bytes>, Error> {
        let n = self.chunk_count();
        if let Some(&index) = want_to_read.range(n..).next() {
            return Err(Error::MissingChunk(index));
        }
        if want_to_read.iter().all(|i| chunks.contains_key(i)) {
            return Ok(want_to_read
                .iter()
                .map(|i| (*i, chunks[i].clone()))
                .collect());
        }

        let block_size = match chunks.values().next() {
            Some(chunk) => chunk.len(),
            None => {
                let first = want_to_read.iter().next().copied().unwrap_or_default();
                return Err(Error::MissingChunk(first));
            }
        };
        if let Some((&index, chunk)) = chunks.iter().find(|(_, c)| c.len() != block_size) {
            return Err(Error::ChunkSizeMismatch {
                index,
                expected: block_size,
                actual: chunk.len(),
            });
        }

        let available: BTreeSet<usize> = chunks.keys().copied().filter(|&i| i < n).collect();
        let mut buffers: Vec<Vec<u8>> = (0..n)
            .map(|i| match chunks.get(&i) {
                Some(chunk) => chunk.to_vec(),
                None => vec![0u8; block_size],
            })
            .collect();
        let mut refs: Vec<&mut [u8]> = buffers.iter_mut().map(|b| b.as_mut_slice()).collect();
        self.decode_chunks(&available, &mut refs)?;

        Ok(buffers
            .into_iter()
            .enumerate()
            .filter(|(i, _)| want_to_read.contains(i))
            .map(|(i, buffer)| (i, Bytes::from(buffer)))
            .collect())
    }

    /// Decodes the data chunks and concatenates them, padding included.
    pub fn decode_concat(&self, chunks: &BTreeMap<usize, Bytes>) -> Result<Bytes, Error> {
        let want: BTreeSet<usize> = (0..self.params.k).collect();
        let decoded = self.decode(&want, chunks)?;
        let mut out = Vec::with_capacity(decoded.values().map(Bytes::len).sum());
        for chunk in decoded.values() {
            out.extend_from_slice(chunk);
        }
        Ok(Bytes::from(out))
    }

    /// Selective repair. See [`RepairPlanner::decode_for_xor`].
    pub fn decode_for_xor(
        &self,
        request: RepairRequest<'_>,
        buffers: &mut BTreeMap<usize, Vec<u8>>,
    ) -> Result<(), Error> {
        self.repair_planner().decode_for_xor(request, buffers)
    }

    /// The smallest repair solution for data chunk `erased`. See [`RepairPlanner::solution_for`].
    pub fn solution_for(
        &self,
        erased: usize,
        parity_selection: &[usize],
    ) -> Result<RepairSolution, Error> {
        let bitmatrix = self
            .bitmatrix()
            .ok_or(Error::Unsupported(self.technique.name()))?;
        Ok(RepairPlanner::<E>::solution_for(
            bitmatrix,
            self.params.k,
            self.params.w,
            erased,
            parity_selection,
        ))
    }

    /// Registers the placement rule of the pool and returns its ruleset id.
    pub fn create_ruleset(
        &self,
        name: &str,
        placement: &mut impl Placement,
    ) -> Result<i32, Error> {
        placement
            .add_simple_rule(
                name,
                &self.ruleset_root,
                &self.ruleset_failure_domain,
                INDEP,
                self.chunk_count(),
            )
            .map_err(Error::Placement)
    }
}
