//! The client/owner capability set: encrypt, derive tokens, decrypt.
//!
//! The trust direction is inverted relative to a typical client-server
//! scheme: this side holds every secret, the server holds none. Keep the
//! two capability sets apart — handing a [`ClientKey`] to server-side code
//! voids the entire privacy argument.

use rand::Rng;
use tracing::info;

use crate::elgamal::SealKey;
use crate::error::Result;
use crate::geo::{haversine_distance, GeoPoint, GridConfig};
use crate::poe::{generate_token, poe_setup, MasterSecret, PublicParams, QueryToken, SecurityLevel};
use crate::tree::{build_tree, EncryptedMatch, IngestReport, Poi, SpatialTree, TreeConfig};

/// A decrypted match, back in WGS84.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DecryptedPoi {
    pub id: u64,
    pub location: GeoPoint,
}

/// Encryptor + TokenGenerator + Decryptor. Never leaves the client/owner.
pub struct ClientKey {
    params: PublicParams,
    msk: MasterSecret,
    seal: SealKey,
}

/// One-time deployment setup: scheme parameters plus the client key.
pub fn setup<R: Rng>(
    level: SecurityLevel,
    grid: GridConfig,
    rng: &mut R,
) -> Result<(PublicParams, ClientKey)> {
    let (params, msk) = poe_setup(level, grid, rng)?;
    let seal = SealKey::generate(rng);
    info!(security = ?params.security, "deployment keys generated");
    Ok((
        params.clone(),
        ClientKey { params, msk, seal },
    ))
}

impl ClientKey {
    pub fn params(&self) -> &PublicParams {
        &self.params
    }

    /// Build an encrypted index from plaintext POIs (owner-only: requires
    /// the plaintext). Points that fail to encode are skipped and counted.
    pub fn ingest<R: Rng>(
        &self,
        cfg: &TreeConfig,
        pois: &[Poi],
        rng: &mut R,
    ) -> (SpatialTree, IngestReport) {
        build_tree(&self.msk, &self.seal, &self.params.grid, cfg, pois, rng)
    }

    /// Derive a single-use token for "within `radius_m` meters of `center`".
    pub fn make_query<R: Rng>(
        &self,
        center: GeoPoint,
        radius_m: f64,
        rng: &mut R,
    ) -> Result<QueryToken> {
        let grid_center = self.params.grid.encode(center)?;
        let radius_units = self.params.grid.radius_to_units(radius_m)?;
        Ok(generate_token(&self.msk, grid_center, radius_units, rng))
    }

    /// Open a sealed match returned by the server.
    pub fn decrypt(&self, m: &EncryptedMatch) -> Result<DecryptedPoi> {
        let grid_point = self.seal.open(&m.sealed)?;
        Ok(DecryptedPoi {
            id: m.id,
            location: self.params.grid.decode(grid_point),
        })
    }

    /// Display ordering by true great-circle distance. Purely client-side;
    /// the server returned candidates in discovery order.
    pub fn sort_by_distance(&self, center: GeoPoint, pois: &mut [DecryptedPoi]) {
        pois.sort_by(|a, b| {
            let da = haversine_distance(center, a.location);
            let db = haversine_distance(center, b.location);
            da.total_cmp(&db)
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn roundtrip_recovers_coordinates_at_grid_precision() {
        let mut rng = StdRng::seed_from_u64(70);
        let (_, key) = setup(SecurityLevel::Bits128, GridConfig::default(), &mut rng).unwrap();

        let poi = Poi {
            id: 7,
            location: GeoPoint::new(12.345678, -98.765432),
        };
        let (tree, report) = key.ingest(&TreeConfig::default(), &[poi], &mut rng);
        assert_eq!(report.ingested, 1);

        // Pull the sealed payload straight out of the leaf.
        let token = key.make_query(poi.location, 1.0, &mut rng).unwrap();
        let matches = crate::tree::search(
            &tree,
            &token,
            &std::sync::atomic::AtomicBool::new(false),
        )
        .unwrap();
        assert_eq!(matches.len(), 1);

        let decrypted = key.decrypt(&matches[0]).unwrap();
        assert_eq!(decrypted.id, 7);
        assert!((decrypted.location.lat - poi.location.lat).abs() < 1e-6);
        assert!((decrypted.location.lng - poi.location.lng).abs() < 1e-6);
    }

    #[test]
    fn sort_by_distance_orders_near_first() {
        let mut rng = StdRng::seed_from_u64(71);
        let (_, key) = setup(SecurityLevel::Bits128, GridConfig::default(), &mut rng).unwrap();
        let center = GeoPoint::new(0.0, 0.0);
        let mut pois = vec![
            DecryptedPoi { id: 1, location: GeoPoint::new(0.002, 0.0) },
            DecryptedPoi { id: 2, location: GeoPoint::new(0.0005, 0.0) },
            DecryptedPoi { id: 3, location: GeoPoint::new(0.001, 0.0) },
        ];
        key.sort_by_distance(center, &mut pois);
        let ids: Vec<u64> = pois.iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![2, 3, 1]);
    }

    #[test]
    fn oversized_radius_is_rejected_at_token_time() {
        let mut rng = StdRng::seed_from_u64(72);
        let (_, key) = setup(SecurityLevel::Bits128, GridConfig::default(), &mut rng).unwrap();
        let res = key.make_query(GeoPoint::new(0.0, 0.0), 10_000.0, &mut rng);
        assert!(res.is_err());
    }
}
