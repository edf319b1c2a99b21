// Copyright 2024 Entanglement Contributors
// SPDX-License-Identifier: Apache-2.0, MIT

use serde::{Deserialize, Serialize};

use crate::alignment::SIMD_WIDTH;
use crate::profile::{self, report, Profile};
use crate::technique::{Family, Technique, Traits};

/// Parameters of a validated scheme.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemeParams {
    pub k: usize,
    pub m: usize,
    pub w: usize,
    /// Set for the bit-matrix techniques only.
    pub packet_size: Option<usize>,
    pub per_chunk_alignment: bool,
    /// Logical chunk index to physical rank, `k + m` long when present.
    pub chunk_mapping: Option<Vec<usize>>,
}

impl SchemeParams {
    pub fn chunk_count(&self) -> usize {
        self.k + self.m
    }
}

/// Outcome of a validation: the parameters to continue with and the messages
/// explaining every correction made to reach them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Validation {
    pub params: SchemeParams,
    pub messages: Vec<String>,
}

impl Validation {
    /// True when the profile was accepted as given.
    pub fn is_ok(&self) -> bool {
        self.messages.is_empty()
    }
}

const PRIMES: [usize; 55] = [
    2, 3, 5, 7, 11, 13, 17, 19, 23, 29, 31, 37, 41, 43, 47, 53, 59, 61, 67, 71, 73, 79, 83, 89,
    97, 101, 103, 107, 109, 113, 127, 131, 137, 139, 149, 151, 157, 163, 167, 173, 179, 181, 191,
    193, 197, 199, 211, 223, 227, 229, 233, 239, 241, 251, 257,
];

/// Primality over the values a word size can take.
pub fn is_prime(value: usize) -> bool {
    PRIMES.contains(&value)
}

const WORD_BYTES: usize = 4;

/// Validates the profile for `technique`, writing every corrected value back into it.
pub fn validate(technique: Technique, profile: &mut Profile) -> Validation {
    let traits = technique.traits();
    let mut messages = Vec::new();

    let k = read_count(profile, "k", traits.k, &mut messages);
    let m = if traits.forced_m {
        profile.insert("m".to_string(), traits.m.to_string());
        traits.m
    } else {
        read_count(profile, "m", traits.m, &mut messages)
    };
    let w = if traits.forced_w {
        profile.insert("w".to_string(), traits.w.to_string());
        traits.w as i64
    } else {
        profile::to_int(profile, "w", traits.w as i64, &mut messages)
    };
    let mut params = SchemeParams {
        k,
        m,
        w: traits.w,
        packet_size: None,
        per_chunk_alignment: false,
        chunk_mapping: profile::to_mapping(profile).filter(|mapping| !mapping.is_empty()),
    };

    match traits.family {
        Family::Matrix => parse_matrix(technique, w, profile, &mut params, &mut messages),
        Family::Cauchy => parse_cauchy(traits, w, profile, &mut params, &mut messages),
        Family::Bitmatrix => parse_bitmatrix(technique, w, profile, &mut params, &mut messages),
    }

    if let Some(mapping) = &params.chunk_mapping {
        if mapping.len() != params.chunk_count() {
            let message = format!(
                "mapping {} maps {} chunks instead of the expected {} and will be ignored",
                profile.get("mapping").map(String::as_str).unwrap_or_default(),
                mapping.len(),
                params.chunk_count()
            );
            report(&mut messages, message);
            params.chunk_mapping = None;
        }
    }

    Validation { params, messages }
}

/// Reads a chunk count, reverting to `default` unless it is at least one.
fn read_count(
    profile: &mut Profile,
    name: &str,
    default: usize,
    messages: &mut Vec<String>,
) -> usize {
    let value = profile::to_int(profile, name, default as i64, messages);
    if value >= 1 {
        return value as usize;
    }
    report(messages, format!("{name}={value} must be >= 1 : revert to {default}"));
    profile.insert(name.to_string(), default.to_string());
    default
}

fn revert(profile: &mut Profile, name: &str, value: usize) {
    profile.insert(name.to_string(), value.to_string());
}

/// Reverts k and m unless the field GF(2^w) has an element for every chunk.
fn check_field_size(
    traits: &Traits,
    profile: &mut Profile,
    params: &mut SchemeParams,
    messages: &mut Vec<String>,
) {
    let n = params.chunk_count() as u64;
    if n <= 1u64 << params.w {
        return;
    }
    report(
        messages,
        format!(
            "k+m={n} must be at most 2^w={} : revert to k={}, m={}",
            1u64 << params.w,
            traits.k,
            traits.m
        ),
    );
    params.k = traits.k;
    params.m = traits.m;
    revert(profile, "k", traits.k);
    revert(profile, "m", traits.m);
}

fn parse_matrix(
    technique: Technique,
    w: i64,
    profile: &mut Profile,
    params: &mut SchemeParams,
    messages: &mut Vec<String>,
) {
    let traits = technique.traits();
    if matches!(w, 8 | 16 | 32) {
        params.w = w as usize;
    } else {
        report(
            messages,
            format!("{}: w={w} must be one of {{8, 16, 32}} : revert to {}", traits.name, traits.w),
        );
        revert(profile, "w", traits.w);
    }
    if technique.supports_per_chunk_alignment() {
        params.per_chunk_alignment =
            profile::to_bool(profile, "jerasure-per-chunk-alignment", false, messages);
    }
    check_field_size(traits, profile, params, messages);
}

fn parse_cauchy(
    traits: &Traits,
    w: i64,
    profile: &mut Profile,
    params: &mut SchemeParams,
    messages: &mut Vec<String>,
) {
    if (1..=32).contains(&w) {
        params.w = w as usize;
    } else {
        report(
            messages,
            format!("{}: w={w} must be between 1 and 32 : revert to {}", traits.name, traits.w),
        );
        revert(profile, "w", traits.w);
    }
    let default = traits.packet_size.unwrap_or(crate::technique::DEFAULT_PACKETSIZE);
    let packet_size = profile::to_int(profile, "packetsize", default as i64, messages);
    params.packet_size = Some(if packet_size >= 1 {
        packet_size as usize
    } else {
        report(
            messages,
            format!("packetsize={packet_size} must be >= 1 : revert to {default}"),
        );
        revert(profile, "packetsize", default);
        default
    });
    params.per_chunk_alignment =
        profile::to_bool(profile, "jerasure-per-chunk-alignment", false, messages);
    // a per-chunk chunk must hold whole packetsize * w windows
    let window = params.w * params.packet_size.unwrap_or(default);
    if params.per_chunk_alignment && window % SIMD_WIDTH != 0 {
        report(
            messages,
            format!(
                "jerasure-per-chunk-alignment needs w * packetsize = {window} to be a multiple \
                 of {SIMD_WIDTH} : revert to false"
            ),
        );
        params.per_chunk_alignment = false;
        profile.insert("jerasure-per-chunk-alignment".to_string(), false.to_string());
    }
    check_field_size(traits, profile, params, messages);
}

fn parse_bitmatrix(
    technique: Technique,
    w: i64,
    profile: &mut Profile,
    params: &mut SchemeParams,
    messages: &mut Vec<String>,
) {
    let traits = technique.traits();
    let default = traits.packet_size.unwrap_or(crate::technique::DEFAULT_PACKETSIZE);
    let packet_size = profile::to_int(profile, "packetsize", default as i64, messages);

    if params.m != 2 {
        report(messages, format!("m={} must be 2 : revert to 2", params.m));
        params.m = 2;
        revert(profile, "m", 2);
    }

    let mut error = false;
    if w < 0 || params.k > w as usize {
        report(messages, format!("k={} must be less than or equal to w={w}", params.k));
        error = true;
    }
    let w_ok = match technique {
        Technique::Liberation => w > 2 && is_prime(w as usize),
        // w=7 was once the default and produced usable chunks
        Technique::BlaumRoth => w == 7 || (w > 2 && is_prime(w as usize + 1)),
        _ => true,
    };
    if !w_ok {
        let rule = if technique == Technique::BlaumRoth {
            "be greater than two and w+1 must be prime"
        } else {
            "be greater than two and be prime"
        };
        report(messages, format!("w={w} must {rule}"));
        error = true;
    }
    if packet_size <= 0 {
        report(messages, format!("packetsize={packet_size} must be set"));
        error = true;
    } else if technique != Technique::Liber8tion && packet_size as usize % WORD_BYTES != 0 {
        report(
            messages,
            format!("packetsize={packet_size} must be a multiple of sizeof(int) = {WORD_BYTES}"),
        );
        error = true;
    }

    if error {
        report(
            messages,
            format!("reverting to k={}, w={}, packetsize={default}", traits.k, traits.w),
        );
        params.k = traits.k;
        params.w = traits.w;
        params.packet_size = Some(default);
        revert(profile, "k", traits.k);
        revert(profile, "w", traits.w);
        revert(profile, "packetsize", default);
    } else {
        params.w = w as usize;
        params.packet_size = Some(packet_size as usize);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(pairs: &[(&str, &str)]) -> Profile {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_is_prime() {
        assert!(is_prime(2));
        assert!(is_prime(7));
        assert!(is_prime(257));
        assert!(!is_prime(1));
        assert!(!is_prime(9));
        assert!(!is_prime(263), "the table stops at 257");
    }

    #[test]
    fn test_defaults_are_accepted() {
        for t in Technique::ALL {
            let mut p = Profile::new();
            let v = validate(t, &mut p);
            assert!(v.is_ok(), "{t}: {:?}", v.messages);
            assert_eq!(v.params.k, t.traits().k, "{t}");
            assert_eq!(v.params.m, t.traits().m, "{t}");
            assert_eq!(v.params.w, t.traits().w, "{t}");
            assert_eq!(v.params.packet_size, t.traits().packet_size, "{t}");
            assert_eq!(p["k"], t.traits().k.to_string(), "{t}");
        }
    }

    #[test]
    fn test_vandermonde_rejects_w() {
        let mut p = profile(&[("k", "4"), ("m", "2"), ("w", "7")]);
        let v = validate(Technique::VandermondeRS, &mut p);
        assert!(!v.is_ok());
        assert_eq!(v.params.w, 8);
        assert_eq!(p["w"], "8");
        assert_eq!(v.params.k, 4, "k is kept");
    }

    #[test]
    fn test_zero_k_reverts() {
        let mut p = profile(&[("k", "0"), ("m", "-3")]);
        let v = validate(Technique::VandermondeRS, &mut p);
        assert_eq!(v.messages.len(), 2, "{:?}", v.messages);
        assert_eq!((v.params.k, v.params.m), (7, 3));
        assert_eq!((p["k"].as_str(), p["m"].as_str()), ("7", "3"));
    }

    #[test]
    fn test_field_too_small() {
        let mut p = profile(&[("k", "14"), ("m", "4"), ("w", "4")]);
        let v = validate(Technique::CauchyGood, &mut p);
        assert!(!v.is_ok());
        assert_eq!((v.params.k, v.params.m, v.params.w), (7, 3, 4));

        let mut p = profile(&[("k", "12"), ("m", "4"), ("w", "4")]);
        assert!(validate(Technique::CauchyGood, &mut p).is_ok());
    }

    #[test]
    fn test_cauchy_packetsize_and_flag() {
        let mut p = profile(&[
            ("packetsize", "0"),
            ("jerasure-per-chunk-alignment", "true"),
        ]);
        let v = validate(Technique::CauchyOrig, &mut p);
        assert_eq!(v.messages.len(), 1);
        assert_eq!(v.params.packet_size, Some(2048));
        assert!(v.params.per_chunk_alignment);
        assert_eq!(p["packetsize"], "2048");
    }

    #[test]
    fn test_bitmatrix_ignores_per_chunk_flag() {
        let mut p = profile(&[("jerasure-per-chunk-alignment", "true")]);
        let v = validate(Technique::Liberation, &mut p);
        assert!(v.is_ok());
        assert!(!v.params.per_chunk_alignment);
    }

    #[test]
    fn test_raid6_ignores_per_chunk_flag() {
        let mut p = profile(&[("k", "4"), ("jerasure-per-chunk-alignment", "true")]);
        let v = validate(Technique::RAID6RS, &mut p);
        assert!(v.is_ok(), "{:?}", v.messages);
        assert!(!v.params.per_chunk_alignment);

        let mut p = profile(&[("k", "4"), ("jerasure-per-chunk-alignment", "true")]);
        assert!(validate(Technique::VandermondeRS, &mut p).params.per_chunk_alignment);
    }

    #[test]
    fn test_cauchy_per_chunk_needs_aligned_window() {
        let mut p = profile(&[
            ("k", "2"),
            ("m", "2"),
            ("packetsize", "3"),
            ("jerasure-per-chunk-alignment", "true"),
        ]);
        let v = validate(Technique::CauchyGood, &mut p);
        assert_eq!(v.messages.len(), 1, "{:?}", v.messages);
        assert!(v.messages[0].contains("w * packetsize = 24"));
        assert!(!v.params.per_chunk_alignment);
        assert_eq!(v.params.packet_size, Some(3));
        assert_eq!(p["jerasure-per-chunk-alignment"], "false");

        // the corrected profile is accepted as is
        assert!(validate(Technique::CauchyGood, &mut p).is_ok());

        let mut p = profile(&[("packetsize", "2"), ("jerasure-per-chunk-alignment", "true")]);
        let v = validate(Technique::CauchyGood, &mut p);
        assert!(v.is_ok(), "{:?}", v.messages);
        assert!(v.params.per_chunk_alignment);
    }

    #[test]
    fn test_liberation_rules() {
        let cases: &[(&str, &str, &str, bool)] = &[
            // k, w, packetsize, accepted
            ("2", "7", "8", true),
            ("7", "7", "4", true),
            ("2", "7", "10", false),
            ("8", "7", "8", false),
            ("2", "9", "8", false),
            ("2", "2", "8", false),
            ("2", "7", "0", false),
        ];
        for &(k, w, ps, accepted) in cases {
            let mut p = profile(&[("k", k), ("w", w), ("packetsize", ps)]);
            let v = validate(Technique::Liberation, &mut p);
            assert_eq!(v.is_ok(), accepted, "k={k} w={w} packetsize={ps}: {:?}", v.messages);
            if !accepted {
                assert_eq!(
                    (p["k"].as_str(), p["w"].as_str(), p["packetsize"].as_str()),
                    ("2", "7", "2048"),
                    "k={k} w={w} packetsize={ps}"
                );
            }
        }
    }

    #[test]
    fn test_liberation_m_must_be_two() {
        let mut p = profile(&[("m", "3")]);
        let v = validate(Technique::Liberation, &mut p);
        assert!(!v.is_ok());
        assert_eq!(v.params.m, 2);
        assert_eq!(p["m"], "2");
    }

    #[test]
    fn test_blaum_roth_w() {
        for (w, accepted) in [("7", true), ("6", true), ("10", true), ("5", false), ("8", false)] {
            let mut p = profile(&[("k", "2"), ("w", w), ("packetsize", "8")]);
            let v = validate(Technique::BlaumRoth, &mut p);
            assert_eq!(v.is_ok(), accepted, "w={w}: {:?}", v.messages);
        }
    }

    #[test]
    fn test_liber8tion_forces_m_and_w() {
        let mut p = profile(&[("k", "6"), ("m", "3"), ("w", "16"), ("packetsize", "6")]);
        let v = validate(Technique::Liber8tion, &mut p);
        assert!(v.is_ok(), "{:?}", v.messages);
        assert_eq!((v.params.k, v.params.m, v.params.w), (6, 2, 8));
        assert_eq!(v.params.packet_size, Some(6));
        assert_eq!((p["m"].as_str(), p["w"].as_str()), ("2", "8"));

        let mut p = profile(&[("k", "9")]);
        let v = validate(Technique::Liber8tion, &mut p);
        assert!(!v.is_ok());
        assert_eq!(v.params.k, 2);
    }

    #[test]
    fn test_mapping_length() {
        let mut p = profile(&[("k", "2"), ("m", "1"), ("mapping", "_DD")]);
        let v = validate(Technique::VandermondeRS, &mut p);
        assert!(v.is_ok());
        assert_eq!(v.params.chunk_mapping, Some(vec![1, 2, 0]));

        let mut p = profile(&[("k", "2"), ("m", "1"), ("mapping", "_DD_")]);
        let v = validate(Technique::VandermondeRS, &mut p);
        assert!(!v.is_ok());
        assert_eq!(v.params.chunk_mapping, None);
    }
}
