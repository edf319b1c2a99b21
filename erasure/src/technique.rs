// Copyright 2024 Entanglement Contributors
// SPDX-License-Identifier: Apache-2.0, MIT

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// How a technique represents its code, which decides the engine calls it
/// makes and the alignment rules it follows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Family {
    /// Reed-Solomon over an element coding matrix.
    Matrix,
    /// Cauchy matrix expanded to a bit-matrix and an XOR schedule.
    Cauchy,
    /// Closed-form two-parity bit-matrix with an XOR schedule.
    Bitmatrix,
}

/// Fixed properties and profile defaults of a technique.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Traits {
    pub name: &'static str,
    pub family: Family,
    pub k: usize,
    pub m: usize,
    pub w: usize,
    /// `None` for techniques that do not read `packetsize`.
    pub packet_size: Option<usize>,
    /// `m` is not read from the profile.
    pub forced_m: bool,
    /// `w` is not read from the profile.
    pub forced_w: bool,
}

pub const DEFAULT_PACKETSIZE: usize = 2048;

static TRAITS: [Traits; 7] = [
    Traits {
        name: "reed_sol_van",
        family: Family::Matrix,
        k: 7,
        m: 3,
        w: 8,
        packet_size: None,
        forced_m: false,
        forced_w: false,
    },
    Traits {
        name: "reed_sol_r6_op",
        family: Family::Matrix,
        k: 7,
        m: 2,
        w: 8,
        packet_size: None,
        forced_m: true,
        forced_w: false,
    },
    Traits {
        name: "cauchy_orig",
        family: Family::Cauchy,
        k: 7,
        m: 3,
        w: 8,
        packet_size: Some(DEFAULT_PACKETSIZE),
        forced_m: false,
        forced_w: false,
    },
    Traits {
        name: "cauchy_good",
        family: Family::Cauchy,
        k: 7,
        m: 3,
        w: 8,
        packet_size: Some(DEFAULT_PACKETSIZE),
        forced_m: false,
        forced_w: false,
    },
    Traits {
        name: "liberation",
        family: Family::Bitmatrix,
        k: 2,
        m: 2,
        w: 7,
        packet_size: Some(DEFAULT_PACKETSIZE),
        forced_m: false,
        forced_w: false,
    },
    Traits {
        name: "blaum_roth",
        family: Family::Bitmatrix,
        k: 2,
        m: 2,
        w: 7,
        packet_size: Some(DEFAULT_PACKETSIZE),
        forced_m: false,
        forced_w: false,
    },
    Traits {
        name: "liber8tion",
        family: Family::Bitmatrix,
        k: 2,
        m: 2,
        w: 8,
        packet_size: Some(DEFAULT_PACKETSIZE),
        forced_m: true,
        forced_w: true,
    },
];

/// The coding techniques of the plugin, named in profiles by
/// [`Traits::name`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Technique {
    #[serde(rename = "reed_sol_van")]
    VandermondeRS,
    #[serde(rename = "reed_sol_r6_op")]
    RAID6RS,
    #[serde(rename = "cauchy_orig")]
    CauchyOrig,
    #[serde(rename = "cauchy_good")]
    CauchyGood,
    #[serde(rename = "liberation")]
    Liberation,
    #[serde(rename = "blaum_roth")]
    BlaumRoth,
    #[serde(rename = "liber8tion")]
    Liber8tion,
}

impl Technique {
    pub const ALL: [Technique; 7] = [
        Technique::VandermondeRS,
        Technique::RAID6RS,
        Technique::CauchyOrig,
        Technique::CauchyGood,
        Technique::Liberation,
        Technique::BlaumRoth,
        Technique::Liber8tion,
    ];

    pub fn traits(self) -> &'static Traits {
        &TRAITS[self as usize]
    }

    pub fn name(self) -> &'static str {
        self.traits().name
    }

    pub fn family(self) -> Family {
        self.traits().family
    }

    /// Whether the plan is a bit-matrix with a schedule, which selective repair needs.
    pub fn is_bitmatrix(self) -> bool {
        self.family() != Family::Matrix
    }

    /// Whether `jerasure-per-chunk-alignment` is honored. RAID-6 never reads it.
    pub fn supports_per_chunk_alignment(self) -> bool {
        self != Technique::RAID6RS && self.family() != Family::Bitmatrix
    }
}

impl fmt::Display for Technique {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Technique {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Technique::ALL
            .into_iter()
            .find(|t| t.name() == s)
            .ok_or_else(|| Error::UnknownTechnique(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_roundtrip() {
        for t in Technique::ALL {
            assert_eq!(t.to_string().parse::<Technique>().unwrap(), t);
            assert_eq!(t.traits().name, t.name(), "table order must follow the enum");
        }
        assert_eq!(
            "reed_sol_r6".parse::<Technique>(),
            Err(Error::UnknownTechnique("reed_sol_r6".to_string()))
        );
    }

    #[test]
    fn test_serde_uses_profile_names() {
        let json = serde_json::to_string(&Technique::CauchyGood).unwrap();
        assert_eq!(json, "\"cauchy_good\"");
        let t: Technique = serde_json::from_str("\"liber8tion\"").unwrap();
        assert_eq!(t, Technique::Liber8tion);
    }

    #[test]
    fn test_families() {
        assert!(!Technique::VandermondeRS.is_bitmatrix());
        assert!(!Technique::RAID6RS.is_bitmatrix());
        assert!(Technique::CauchyOrig.is_bitmatrix());
        assert!(Technique::BlaumRoth.is_bitmatrix());
        assert!(Technique::CauchyGood.supports_per_chunk_alignment());
        assert!(!Technique::Liberation.supports_per_chunk_alignment());
        assert!(Technique::VandermondeRS.supports_per_chunk_alignment());
        assert!(!Technique::RAID6RS.supports_per_chunk_alignment());
    }
}
