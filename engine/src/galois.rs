// Copyright 2024 Entanglement Contributors
// SPDX-License-Identifier: Apache-2.0, MIT

//! Arithmetic in GF(2^w) for 1 <= w <= 32 and the region kernels built on it.

/// Primitive polynomials indexed by `w`. For `w < 32` the high order bit is
/// included; for `w = 32` it is implicit.
const PRIM_POLY: [u64; 33] = [
    0,
    0o1,
    0o7,
    0o13,
    0o23,
    0o45,
    0o103,
    0o211,
    0o435,
    0o1021,
    0o2011,
    0o4005,
    0o10123,
    0o20033,
    0o42103,
    0o100003,
    0o210013,
    0o400011,
    0o1000201,
    0o2000047,
    0o4000011,
    0o10000005,
    0o20000003,
    0o40000041,
    0o100000207,
    0o200000011,
    0o400000107,
    0o1000000047,
    0o2000000011,
    0o4000000005,
    0o10040000007,
    0o20000000011,
    0o20000007,
];

/// The largest supported word size.
pub const MAX_W: usize = 32;

/// Returns the reduction polynomial for `w`, high order bit included.
fn modulus(w: usize) -> u64 {
    assert!((1..=MAX_W).contains(&w), "w={w} is out of range");
    if w == MAX_W {
        (1u64 << 32) | PRIM_POLY[32]
    } else {
        PRIM_POLY[w] | (1u64 << w)
    }
}

/// Number of elements of GF(2^w).
pub fn field_size(w: usize) -> u64 {
    1u64 << w
}

/// Multiplies two elements of GF(2^w).
pub fn multiply(a: u32, b: u32, w: usize) -> u32 {
    if w == 1 {
        return a & b & 1;
    }
    let modulus = modulus(w);
    let high = 1u64 << w;
    let mut a = a as u64;
    let mut b = b as u64;
    let mut product = 0u64;
    while b != 0 {
        if b & 1 != 0 {
            product ^= a;
        }
        b >>= 1;
        a <<= 1;
        if a & high != 0 {
            a ^= modulus;
        }
    }
    product as u32
}

/// Raises `a` to the power `exp` in GF(2^w).
pub fn pow(a: u32, mut exp: u64, w: usize) -> u32 {
    let mut base = a;
    let mut result = 1u32;
    while exp != 0 {
        if exp & 1 != 0 {
            result = multiply(result, base, w);
        }
        base = multiply(base, base, w);
        exp >>= 1;
    }
    result
}

/// Multiplicative inverse of a non-zero element.
pub fn inverse(a: u32, w: usize) -> u32 {
    assert!(a != 0, "zero has no inverse");
    // a^(2^w - 2) = a^-1 since the multiplicative group has order 2^w - 1
    pow(a, field_size(w) - 2, w)
}

/// Divides `a` by the non-zero `b`.
pub fn divide(a: u32, b: u32, w: usize) -> u32 {
    if a == 0 {
        return 0;
    }
    multiply(a, inverse(b, w), w)
}

/// Number of ones in the `w x w` bit-matrix expansion of `e`.
pub fn bitmatrix_ones(e: u32, w: usize) -> usize {
    let mut e = e;
    let mut ones = 0;
    for _ in 0..w {
        ones += e.count_ones() as usize;
        e = multiply(e, 2, w);
    }
    ones
}

/// XORs `src` into `dst`.
pub fn xor_region(src: &[u8], dst: &mut [u8]) {
    for (d, s) in dst.iter_mut().zip(src) {
        *d ^= s;
    }
}

/// Computes `dst (^)= factor * src` over little-endian `w`-bit words.
/// `w` must be one of 8, 16 or 32 and the regions a multiple of `w / 8` bytes.
pub fn multiply_region(src: &[u8], dst: &mut [u8], factor: u32, w: usize, add: bool) {
    debug_assert_eq!(src.len(), dst.len());
    if factor == 0 {
        if !add {
            dst.fill(0);
        }
        return;
    }
    if factor == 1 {
        if add {
            xor_region(src, dst);
        } else {
            dst.copy_from_slice(src);
        }
        return;
    }
    match w {
        8 => {
            let table: Vec<u8> = (0..256u32).map(|x| multiply(x, factor, 8) as u8).collect();
            for (d, s) in dst.iter_mut().zip(src) {
                let p = table[*s as usize];
                *d = if add { *d ^ p } else { p };
            }
        }
        16 => {
            for (d, s) in dst.chunks_exact_mut(2).zip(src.chunks_exact(2)) {
                let p = multiply(u16::from_le_bytes([s[0], s[1]]) as u32, factor, 16) as u16;
                let p = if add {
                    p ^ u16::from_le_bytes([d[0], d[1]])
                } else {
                    p
                };
                d.copy_from_slice(&p.to_le_bytes());
            }
        }
        32 => {
            for (d, s) in dst.chunks_exact_mut(4).zip(src.chunks_exact(4)) {
                let p = multiply(u32::from_le_bytes([s[0], s[1], s[2], s[3]]), factor, 32);
                let p = if add {
                    p ^ u32::from_le_bytes([d[0], d[1], d[2], d[3]])
                } else {
                    p
                };
                d.copy_from_slice(&p.to_le_bytes());
            }
        }
        _ => panic!("region multiply needs w in {{8, 16, 32}}, got {w}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_multiply_gf256_known_values() {
        assert_eq!(multiply(2, 0x80, 8), 0x1D);
        assert_eq!(multiply(3, 7, 8), 9);
        assert_eq!(multiply(0, 0x53, 8), 0);
        assert_eq!(multiply(1, 0x53, 8), 0x53);
    }

    #[test]
    fn test_inverse_roundtrip_for_common_word_sizes() {
        for w in [4usize, 5, 7, 8, 16, 32] {
            for a in [1u32, 2, 3, 5, 7, 11] {
                let inv = inverse(a, w);
                assert_eq!(multiply(a, inv, w), 1, "w={w} a={a}");
            }
        }
    }

    #[test]
    fn test_every_gf16_element_has_an_inverse() {
        for a in 1..16u32 {
            assert_eq!(multiply(a, inverse(a, 4), 4), 1, "a={a}");
        }
    }

    #[test]
    fn test_divide() {
        let w = 8;
        let q = divide(0x57, 0x13, w);
        assert_eq!(multiply(q, 0x13, w), 0x57);
        assert_eq!(divide(0, 0x13, w), 0);
    }

    #[test]
    fn test_bitmatrix_ones_of_identity() {
        assert_eq!(bitmatrix_ones(1, 8), 8);
    }

    #[test]
    fn test_multiply_region_matches_scalar_for_each_word_size() {
        let src: Vec<u8> = (0..64u8).map(|b| b.wrapping_mul(37).wrapping_add(11)).collect();
        for w in [8usize, 16, 32] {
            let mut dst = vec![0u8; src.len()];
            multiply_region(&src, &mut dst, 0x1D, w, false);
            let bytes = w / 8;
            for (s, d) in src.chunks(bytes).zip(dst.chunks(bytes)) {
                let mut sw = [0u8; 4];
                let mut dw = [0u8; 4];
                sw[..bytes].copy_from_slice(s);
                dw[..bytes].copy_from_slice(d);
                assert_eq!(
                    multiply(u32::from_le_bytes(sw), 0x1D, w),
                    u32::from_le_bytes(dw),
                    "w={w}"
                );
            }
        }
    }

    #[test]
    fn test_multiply_region_accumulates() {
        let src = vec![0x11u8; 8];
        let mut dst = vec![0x22u8; 8];
        multiply_region(&src, &mut dst, 1, 8, true);
        assert_eq!(dst, vec![0x33u8; 8]);
    }

    proptest! {
        #[test]
        fn prop_multiply_distributes_over_xor(a in any::<u32>(), b in any::<u32>(), c in any::<u32>()) {
            for w in [8usize, 16, 32] {
                let mask = (field_size(w) - 1) as u32;
                let (a, b, c) = (a & mask, b & mask, c & mask);
                prop_assert_eq!(multiply(a, b ^ c, w), multiply(a, b, w) ^ multiply(a, c, w));
            }
        }

        #[test]
        fn prop_divide_undoes_multiply(a in any::<u32>(), b in 1u32..=255) {
            let a = a & 0xFF;
            prop_assert_eq!(divide(multiply(a, b, 8), b, 8), a);
        }
    }
}
