use ark_bls12_381::{Fr, G1Projective};
use ark_ff::UniformRand;
use rand::Rng;

use crate::geo::GridPoint;
use crate::linalg::{i128_to_field, i64_to_field, row_times_matrix};
use crate::poe::setup::MasterSecret;

/// An encrypted circular predicate: `K1 = g1^(α·det B)`,
/// `K2[i] = U_i^(α·(tB)_i)` for the query vector
/// `t = (2qx, 2qy, -1, r^2 - qx^2 - qy^2)`.
///
/// Per-query and in-memory only: the type deliberately has no serde or
/// canonical-serialization support, so a token cannot outlive the query that
/// minted it in any persisted form. The scaled squared radius is carried in
/// the clear — it is what the evaluator's search bound derives from.
#[derive(Clone)]
pub struct QueryToken {
    pub(crate) k1: G1Projective,
    pub(crate) k2: Vec<G1Projective>,
    radius_sq: u64,
}

impl QueryToken {
    /// Exact membership bound for leaf-level evaluation: the inner product
    /// `r^2 - dist^2` lies in `[0, r^2]` exactly when the point is inside
    /// the circle, boundary included.
    pub fn leaf_bound(&self) -> u64 {
        self.radius_sq
    }

    /// Conservative bound for a bounding-region ciphertext carrying slack
    /// hint `H`: the shifted inner product lies in `[0, r^2 + H]` whenever
    /// the query circle can reach the region.
    pub fn node_bound(&self, bound_hint: u64) -> u64 {
        self.radius_sq + bound_hint
    }
}

/// Derive a token for the predicate "within `radius_units` of `center`".
pub fn generate_token<R: Rng>(
    msk: &MasterSecret,
    center: GridPoint,
    radius_units: u64,
    rng: &mut R,
) -> QueryToken {
    let radius_sq = radius_units * radius_units;
    let center_norm = center.dist_sq(&GridPoint { x: 0, y: 0 });

    // <t, (x, y, x^2+y^2, 1)> = r^2 - dist((x,y), center)^2
    let t = vec![
        i64_to_field(2 * center.x),
        i64_to_field(2 * center.y),
        -Fr::from(1u64),
        i128_to_field(radius_sq as i128 - center_norm),
    ];

    let alpha = Fr::rand(rng);
    let k1 = msk.g1 * (alpha * msk.det_b);

    let t_b = row_times_matrix(&t, &msk.b_matrix);
    let k2 = msk
        .u_bases
        .iter()
        .zip(t_b.iter())
        .map(|(base, &coeff)| *base * (alpha * coeff))
        .collect();

    QueryToken { k1, k2, radius_sq }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::GridConfig;
    use crate::poe::setup::{poe_setup, SecurityLevel};
    use crate::poe::VECTOR_DIM;
    use ark_ff::Zero;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn token_shape_and_bounds() {
        let mut rng = StdRng::seed_from_u64(9);
        let (_, msk) =
            poe_setup(SecurityLevel::Bits128, GridConfig::default(), &mut rng).unwrap();

        let token = generate_token(&msk, GridPoint { x: 100, y: -200 }, 50, &mut rng);
        assert_eq!(token.k2.len(), VECTOR_DIM);
        assert!(!token.k1.is_zero());
        assert_eq!(token.leaf_bound(), 2_500);
        assert_eq!(token.node_bound(1_024), 3_524);
    }
}
