//! Exponent ElGamal over G1: the client-decryptable half of a stored POI.
//!
//! The predicate ciphertext is evaluate-only by construction, so each
//! encrypted point also carries its grid coordinates sealed under the
//! client's key: `(c1, c2) = (g^ρ, m·g + ρ·pk)` per coordinate, with the
//! message shifted into the non-negative grid range and decoded by a
//! bounded discrete log. Coordinate domains are public, so decode cost is
//! fixed at ~2^14 group operations per coordinate.

use ark_bls12_381::{Fr, G1Projective};
use ark_ec::PrimeGroup;
use ark_ff::UniformRand;
use ark_serialize::{CanonicalDeserialize, CanonicalSerialize};
use rand::Rng;

use crate::error::EplqError;
use crate::geo::{GridPoint, X_DOMAIN, X_OFFSET, Y_DOMAIN, Y_OFFSET};

/// Sealing keypair; part of the client's secret material.
#[derive(Clone)]
pub struct SealKey {
    sk: Fr,
    pk: G1Projective,
}

/// A location sealed for the key holder: one ElGamal pair per coordinate,
/// independent randomness for each.
#[derive(Clone, Debug, CanonicalSerialize, CanonicalDeserialize)]
pub struct SealedLocation {
    pub x_c1: G1Projective,
    pub x_c2: G1Projective,
    pub y_c1: G1Projective,
    pub y_c2: G1Projective,
}

impl SealKey {
    pub fn generate<R: Rng>(rng: &mut R) -> Self {
        let g = G1Projective::generator();
        let sk = Fr::rand(rng);
        Self { sk, pk: g * sk }
    }

    /// Seal a grid coordinate pair.
    pub fn seal<R: Rng>(&self, p: GridPoint, rng: &mut R) -> SealedLocation {
        let g = G1Projective::generator();
        let mx = Fr::from((p.x + X_OFFSET) as u64);
        let my = Fr::from((p.y + Y_OFFSET) as u64);

        let rho_x = Fr::rand(rng);
        let rho_y = Fr::rand(rng);

        SealedLocation {
            x_c1: g * rho_x,
            x_c2: g * mx + self.pk * rho_x,
            y_c1: g * rho_y,
            y_c2: g * my + self.pk * rho_y,
        }
    }

    /// Recover the grid coordinates. Fails if the decoded value falls
    /// outside the coordinate domain (malformed or foreign ciphertext).
    pub fn open(&self, sealed: &SealedLocation) -> crate::error::Result<GridPoint> {
        let g = G1Projective::generator();

        let mx_point = sealed.x_c2 - sealed.x_c1 * self.sk;
        let my_point = sealed.y_c2 - sealed.y_c1 * self.sk;

        let mx = crate::dlog::dlog_g1(g, mx_point, X_DOMAIN)
            .ok_or(EplqError::Arithmetic("sealed coordinate outside domain"))?;
        let my = crate::dlog::dlog_g1(g, my_point, Y_DOMAIN)
            .ok_or(EplqError::Arithmetic("sealed coordinate outside domain"))?;

        Ok(GridPoint {
            x: mx as i64 - X_OFFSET,
            y: my as i64 - Y_OFFSET,
        })
    }
}
