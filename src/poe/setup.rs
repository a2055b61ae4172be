use ark_bls12_381::{Fr, G1Projective, G2Projective};
use ark_ff::{UniformRand, Zero};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::{EplqError, Result};
use crate::geo::GridConfig;
use crate::linalg;
use crate::poe::VECTOR_DIM;

/// Target security level for parameter selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SecurityLevel {
    /// 128-bit security, the level BLS12-381 provides.
    #[default]
    Bits128,
    /// Reserved; no supported curve at this level yet.
    Bits256,
}

/// Public parameters: domain configuration only.
///
/// Unlike a conventional public-key scheme there is no encryption key here.
/// The party that encrypts points, derives tokens and decrypts matches is
/// the same key holder; the server receives these parameters plus
/// ciphertexts and nothing else.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublicParams {
    pub security: SecurityLevel,
    pub grid: GridConfig,
}

/// Master secret: dual matrices `B`, `B* = det(B) * (B^-1)^T` and the
/// correlated pairing bases `U_i = g1^(γ_i)`, `V_i = g2^(γ_i^-1)` with
/// `e(U_i, V_i) = e(g1, g2)` for every i.
///
/// Held by the client/owner only. Never serialized by this crate.
#[derive(Clone)]
pub struct MasterSecret {
    pub(crate) g1: G1Projective,
    pub(crate) g2: G2Projective,
    pub(crate) b_matrix: Vec<Vec<Fr>>,
    pub(crate) b_star_matrix: Vec<Vec<Fr>>,
    pub(crate) det_b: Fr,
    pub(crate) u_bases: Vec<G1Projective>,
    pub(crate) v_bases: Vec<G2Projective>,
}

/// Generate scheme parameters and the master secret.
pub fn poe_setup<R: Rng>(
    level: SecurityLevel,
    grid: GridConfig,
    rng: &mut R,
) -> Result<(PublicParams, MasterSecret)> {
    if level != SecurityLevel::Bits128 {
        return Err(EplqError::Setup(
            "only 128-bit security is available on BLS12-381",
        ));
    }
    grid.validate()?;

    let g1 = G1Projective::rand(rng);
    let g2 = G2Projective::rand(rng);

    // B ← GL_n(Fr), B* = det(B) · (B^-1)^T
    let b_matrix = linalg::random_invertible_matrix(VECTOR_DIM, rng);
    let det_b = linalg::determinant(&b_matrix);
    let b_inverse = linalg::inverse(&b_matrix)?;
    let b_star_matrix = linalg::scalar_mult(&linalg::transpose(&b_inverse), det_b);

    let mut u_bases = Vec::with_capacity(VECTOR_DIM);
    let mut v_bases = Vec::with_capacity(VECTOR_DIM);
    for _ in 0..VECTOR_DIM {
        let mut gamma = Fr::rand(rng);
        while gamma.is_zero() {
            gamma = Fr::rand(rng);
        }
        u_bases.push(g1 * gamma);
        v_bases.push(g2 * linalg::inv(gamma)?);
    }

    let pp = PublicParams {
        security: level,
        grid,
    };
    let msk = MasterSecret {
        g1,
        g2,
        b_matrix,
        b_star_matrix,
        det_b,
        u_bases,
        v_bases,
    };

    Ok((pp, msk))
}
