use ark_bls12_381::Bls12_381;
use ark_ec::{pairing::Pairing, CurveGroup};

use crate::dlog::dlog_gt;
use crate::poe::encrypt::PredicateCiphertext;
use crate::poe::token::QueryToken;

type G1Prepared = <Bls12_381 as Pairing>::G1Prepared;
type G2Prepared = <Bls12_381 as Pairing>::G2Prepared;

/// Evaluate an encrypted predicate against a ciphertext.
///
/// Pure and secret-free: this is the one operation the untrusted server
/// runs. Computes `D1 = e(K1, C1)` and `D2 = Π_i e(K2[i], C2[i])`; by the
/// dual-basis relation `D2 = D1^z` where `z` is the encoded inner product,
/// and the predicate holds exactly when `z` falls in `[0, bound]` —
/// `bound = token.leaf_bound()` for point ciphertexts,
/// `token.node_bound(hint)` for bounding regions. A negative encoded value
/// wraps to a huge field exponent and never lands inside the bound.
///
/// Cost is one multi-Miller loop plus `O(sqrt(bound))` target-field
/// operations; the bound is public (derived from the scaled query radius
/// and the node's slack hint), so the running time is independent of any
/// plaintext coordinate.
pub fn evaluate(token: &QueryToken, ct: &PredicateCiphertext, bound: u64) -> bool {
    assert_eq!(
        token.k2.len(),
        ct.c2.len(),
        "token and ciphertext dimension mismatch"
    );

    let k1_prep = G1Prepared::from(token.k1.into_affine());
    let c1_prep = G2Prepared::from(ct.c1.into_affine());
    let ml_d1 = Bls12_381::multi_miller_loop(std::iter::once(k1_prep), std::iter::once(c1_prep));
    let d1 = Bls12_381::final_exponentiation(ml_d1).unwrap().0;

    let k2_prep: Vec<G1Prepared> = token
        .k2
        .iter()
        .map(|p| G1Prepared::from(p.into_affine()))
        .collect();
    let c2_prep: Vec<G2Prepared> = ct
        .c2
        .iter()
        .map(|p| G2Prepared::from(p.into_affine()))
        .collect();
    let ml_d2 = Bls12_381::multi_miller_loop(k2_prep, c2_prep);
    let d2 = Bls12_381::final_exponentiation(ml_d2).unwrap().0;

    dlog_gt(d1, d2, bound).is_some()
}
