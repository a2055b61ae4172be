//! Bounded discrete logarithms by baby-step giant-step.
//!
//! Two uses: the evaluator's membership test over the pairing target field
//! (does the exponent lie in `[0, bound]`?) and the client-side decoder for
//! sealed grid coordinates in G1. Both bounds are public values, so the
//! number of group operations performed here never depends on a secret.
//!
//! O(sqrt(bound)) time and space. Group elements are keyed in the hash table
//! by their compressed canonical encoding.

use std::collections::HashMap;

use ark_bls12_381::{Bls12_381, G1Projective};
use ark_ec::pairing::Pairing;
use ark_ff::Field;
use ark_serialize::CanonicalSerialize;

pub type Gt = <Bls12_381 as Pairing>::TargetField;

fn key_of<T: CanonicalSerialize>(elem: &T, scratch: &mut Vec<u8>) -> Vec<u8> {
    scratch.clear();
    elem.serialize_compressed(&mut *scratch)
        .expect("serialization into a Vec cannot fail");
    scratch.clone()
}

/// Find `z` in `[0, bound]` with `base^z == target` over the target field.
pub fn dlog_gt(base: Gt, target: Gt, bound: u64) -> Option<u64> {
    if target == Gt::ONE {
        return Some(0);
    }

    let m = ((bound + 1) as f64).sqrt().ceil() as u64;
    let mut scratch = Vec::with_capacity(576);

    // Baby steps: base^j for j = 0..=m.
    let mut baby = HashMap::with_capacity(m as usize + 1);
    let mut current = Gt::ONE;
    for j in 0..=m {
        baby.entry(key_of(&current, &mut scratch)).or_insert(j);
        if j < m {
            current *= base;
        }
    }

    // current == base^m
    let base_inv_m = current.inverse()?;

    // Giant steps: target * base^(-m*i).
    let mut gamma = target;
    for i in 0..=m {
        if let Some(&j) = baby.get(&key_of(&gamma, &mut scratch)) {
            let z = i * m + j;
            if z <= bound {
                return Some(z);
            }
        }
        if i < m {
            gamma *= base_inv_m;
        }
    }

    None
}

/// Find `z` in `[0, bound]` with `z * base == target` in G1 (additive
/// notation). Same algorithm as [`dlog_gt`], re-based for the sealed
/// coordinate decoder.
pub fn dlog_g1(base: G1Projective, target: G1Projective, bound: u64) -> Option<u64> {
    use ark_ff::Zero;

    if target.is_zero() {
        return Some(0);
    }

    let m = ((bound + 1) as f64).sqrt().ceil() as u64;
    let mut scratch = Vec::with_capacity(48);

    let mut baby = HashMap::with_capacity(m as usize + 1);
    let mut current = G1Projective::zero();
    for j in 0..=m {
        baby.entry(key_of(&current, &mut scratch)).or_insert(j);
        if j < m {
            current += base;
        }
    }

    let minus_base_m = -current;

    let mut gamma = target;
    for i in 0..=m {
        if let Some(&j) = baby.get(&key_of(&gamma, &mut scratch)) {
            let z = i * m + j;
            if z <= bound {
                return Some(z);
            }
        }
        if i < m {
            gamma += minus_base_m;
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use ark_bls12_381::{Fr, G1Affine, G2Affine};
    use ark_ec::{AffineRepr, PrimeGroup};

    fn base_gt() -> Gt {
        Bls12_381::pairing(G1Affine::generator(), G2Affine::generator()).0
    }

    #[test]
    fn gt_recovers_exponents_in_bound() {
        let g = base_gt();
        for z in [0u64, 1, 17, 255, 1000] {
            let target = g.pow([z]);
            assert_eq!(dlog_gt(g, target, 1000), Some(z));
        }
    }

    #[test]
    fn gt_rejects_exponents_out_of_bound() {
        let g = base_gt();
        let target = g.pow([1001u64]);
        assert_eq!(dlog_gt(g, target, 1000), None);

        // Negative exponents show up as huge field values and must not match.
        use ark_ff::PrimeField;
        let target = g.pow(Fr::from(-5i64).into_bigint());
        assert_eq!(dlog_gt(g, target, 1000), None);
    }

    #[test]
    fn g1_roundtrip() {
        let g = G1Projective::generator();
        for z in [0u64, 1, 42, 9999] {
            let target = g * Fr::from(z);
            assert_eq!(dlog_g1(g, target, 10_000), Some(z));
        }
        let target = g * Fr::from(10_001u64);
        assert_eq!(dlog_g1(g, target, 10_000), None);
    }
}
