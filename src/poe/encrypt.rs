use ark_bls12_381::{Fr, G2Projective};
use ark_ff::UniformRand;
use ark_serialize::{CanonicalDeserialize, CanonicalSerialize};
use rand::Rng;

use crate::geo::GridPoint;
use crate::linalg::{i128_to_field, i64_to_field, row_times_matrix};
use crate::poe::setup::MasterSecret;
use crate::poe::VECTOR_DIM;

/// Ciphertext side of the scheme: `C1 = g2^β`, `C2[i] = V_i^(β·(vB*)_i)`.
///
/// Randomized per encryption — two ciphertexts of the same location share no
/// component, yet evaluate identically against any token.
#[derive(Clone, Debug, CanonicalSerialize, CanonicalDeserialize)]
pub struct PredicateCiphertext {
    pub c1: G2Projective,
    pub c2: Vec<G2Projective>,
}

/// Inner-product encoding of a location: `(x, y, x^2 + y^2, 1)`.
pub(crate) fn point_vector(p: GridPoint) -> Vec<Fr> {
    let norm = p.dist_sq(&GridPoint { x: 0, y: 0 });
    vec![
        i64_to_field(p.x),
        i64_to_field(p.y),
        i128_to_field(norm),
        Fr::from(1u64),
    ]
}

/// Encoding of a bounding region: the circumscribed-circle center with the
/// slack `H` folded into the norm term, `(cx, cy, cx^2 + cy^2 - H, 1)`.
/// Against a query token the inner product becomes `r^2 + H - dist^2`.
pub(crate) fn node_vector(center: GridPoint, bound_hint: u64) -> Vec<Fr> {
    let norm = center.dist_sq(&GridPoint { x: 0, y: 0 }) - bound_hint as i128;
    vec![
        i64_to_field(center.x),
        i64_to_field(center.y),
        i128_to_field(norm),
        Fr::from(1u64),
    ]
}

fn encrypt_vector<R: Rng>(msk: &MasterSecret, v: &[Fr], rng: &mut R) -> PredicateCiphertext {
    assert_eq!(v.len(), VECTOR_DIM, "encoding must have dimension {}", VECTOR_DIM);

    let beta = Fr::rand(rng);
    let c1 = msk.g2 * beta;

    let v_b_star = row_times_matrix(v, &msk.b_star_matrix);
    let c2 = msk
        .v_bases
        .iter()
        .zip(v_b_star.iter())
        .map(|(base, &coeff)| *base * (beta * coeff))
        .collect();

    PredicateCiphertext { c1, c2 }
}

/// Encrypt a POI location for leaf-level (exact) evaluation.
pub fn encrypt_point<R: Rng>(
    msk: &MasterSecret,
    p: GridPoint,
    rng: &mut R,
) -> PredicateCiphertext {
    encrypt_vector(msk, &point_vector(p), rng)
}

/// Encrypt a bounding region for conservative subtree pruning.
pub fn encrypt_node<R: Rng>(
    msk: &MasterSecret,
    center: GridPoint,
    bound_hint: u64,
    rng: &mut R,
) -> PredicateCiphertext {
    encrypt_vector(msk, &node_vector(center, bound_hint), rng)
}
