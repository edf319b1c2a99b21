// Copyright 2024 Entanglement Contributors
// SPDX-License-Identifier: Apache-2.0, MIT

use log::{debug, trace};

use crate::technique::{Family, Technique};
use crate::validator::SchemeParams;

/// Widest vector register the region kernels use, in bytes.
pub const SIMD_WIDTH: usize = 16;
/// Size of the native word the alignment is expressed in.
pub const WORD_BYTES: usize = 4;

/// Alignment of a stripe whose chunks each hold `words` words.
fn whole_object(k: usize, words: usize) -> usize {
    if (words * WORD_BYTES) % SIMD_WIDTH != 0 {
        k * words * SIMD_WIDTH
    } else {
        k * words * WORD_BYTES
    }
}

fn round_up(value: usize, multiple: usize) -> usize {
    match value % multiple {
        0 => value,
        rem => value + multiple - rem,
    }
}

/// Byte alignment the chunk size must honor.
///
/// Under whole-object alignment this is the alignment of the object, a multiple of `k`.
/// Under per-chunk alignment it is the alignment of a single chunk.
pub fn alignment(technique: Technique, params: &SchemeParams) -> usize {
    let (k, w) = (params.k, params.w);
    let packet_size = params.packet_size.unwrap_or(0);
    let per_chunk = technique.supports_per_chunk_alignment() && params.per_chunk_alignment;
    match technique.family() {
        Family::Matrix if per_chunk => w * SIMD_WIDTH,
        Family::Matrix => whole_object(k, w),
        Family::Cauchy if per_chunk => round_up(w * packet_size, SIMD_WIDTH),
        Family::Cauchy | Family::Bitmatrix => whole_object(k, w * packet_size),
    }
}

/// Size of each of the `k` data chunks of an object of `object_size` bytes.
///
/// # Panics
///
/// Under per-chunk alignment, panics if the alignment exceeds `ceil(object_size / k)`.
pub fn chunk_size(technique: Technique, params: &SchemeParams, object_size: usize) -> usize {
    let alignment = alignment(technique, params);
    let k = params.k;
    if technique.supports_per_chunk_alignment() && params.per_chunk_alignment {
        let chunk_size = object_size.div_ceil(k);
        trace!("get_chunk_size: chunk_size {chunk_size} must be modulo {alignment}");
        assert!(
            alignment <= chunk_size,
            "alignment {alignment} exceeds the chunk size {chunk_size} \
             of a {object_size} byte object"
        );
        let padded = round_up(chunk_size, alignment);
        if padded != chunk_size {
            debug!("get_chunk_size: {chunk_size} padded to {padded}");
        }
        padded
    } else {
        let padded = round_up(object_size, alignment);
        assert_eq!(padded % k, 0, "padded length {padded} does not divide by k={k}");
        padded / k
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(k: usize, w: usize, packet_size: Option<usize>, per_chunk: bool) -> SchemeParams {
        SchemeParams {
            k,
            m: 2,
            w,
            packet_size,
            per_chunk_alignment: per_chunk,
            chunk_mapping: None,
        }
    }

    #[test]
    fn test_alignment_table() {
        let cases = [
            // technique, k, w, packetsize, per chunk, expected
            (Technique::VandermondeRS, 4, 8, None, false, 4 * 8 * 4),
            (Technique::VandermondeRS, 3, 8, None, true, 8 * 16),
            (Technique::RAID6RS, 5, 16, None, false, 5 * 16 * 4),
            (Technique::RAID6RS, 4, 8, None, true, 4 * 8 * 4),
            (Technique::CauchyGood, 7, 8, Some(2048), false, 7 * 8 * 2048 * 4),
            (Technique::CauchyOrig, 2, 3, Some(5), false, 2 * 15 * 16),
            (Technique::CauchyOrig, 2, 3, Some(5), true, 16),
            (Technique::CauchyGood, 2, 8, Some(2048), true, 8 * 2048),
            (Technique::Liberation, 2, 7, Some(8), false, 2 * 7 * 8 * 4),
            (Technique::BlaumRoth, 3, 7, Some(2), false, 3 * 14 * 16),
            (Technique::Liber8tion, 2, 8, Some(2048), true, 2 * 8 * 2048 * 4),
        ];
        for (technique, k, w, ps, per_chunk, expected) in cases {
            let p = params(k, w, ps, per_chunk);
            assert_eq!(alignment(technique, &p), expected, "{technique} k={k} w={w}");
        }
    }

    #[test]
    fn test_whole_object_chunk_size() {
        let p = params(4, 8, None, false);
        // alignment 128
        assert_eq!(chunk_size(Technique::VandermondeRS, &p, 0), 0);
        assert_eq!(chunk_size(Technique::VandermondeRS, &p, 1), 32);
        assert_eq!(chunk_size(Technique::VandermondeRS, &p, 128), 32);
        assert_eq!(chunk_size(Technique::VandermondeRS, &p, 129), 64);
    }

    #[test]
    fn test_raid6_pads_the_whole_object() {
        let p = params(4, 8, None, true);
        assert_eq!(chunk_size(Technique::RAID6RS, &p, 100), 32);
    }

    #[test]
    fn test_per_chunk_chunk_size() {
        let p = params(3, 8, None, true);
        // alignment 128
        assert_eq!(chunk_size(Technique::VandermondeRS, &p, 3 * 128), 128);
        assert_eq!(chunk_size(Technique::VandermondeRS, &p, 3 * 128 + 1), 256);
    }

    #[test]
    #[should_panic(expected = "exceeds the chunk size")]
    fn test_per_chunk_alignment_larger_than_chunk() {
        let p = params(3, 8, None, true);
        chunk_size(Technique::VandermondeRS, &p, 100);
    }
}
