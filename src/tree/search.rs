//! Server-side search: walk the index, prune what the token provably cannot
//! reach, evaluate leaf points exactly. No secret material in sight.

use std::sync::atomic::{AtomicBool, Ordering};

use rayon::prelude::*;

use crate::elgamal::SealedLocation;
use crate::error::{EplqError, Result};
use crate::poe::{evaluate, QueryToken};
use crate::tree::node::{IndexNode, NodeId, SpatialTree};

/// A candidate returned to the client: identifier tag plus the sealed
/// payload only the key holder can open. Order is discovery order — the
/// server cannot rank by distance and does not try.
#[derive(Clone, Debug)]
pub struct EncryptedMatch {
    pub id: u64,
    pub sealed: SealedLocation,
}

/// Evaluate a query token against the tree.
///
/// Sibling subtrees are evaluated on parallel workers; each worker
/// accumulates locally and results are merged in child order, so the output
/// is deterministic for a given tree. The cancel flag is checked at every
/// node visit; once tripped, the walk stops and all partial results are
/// discarded — a cancelled query never reports a partial success.
pub fn search(
    tree: &SpatialTree,
    token: &QueryToken,
    cancel: &AtomicBool,
) -> Result<Vec<EncryptedMatch>> {
    visit(tree, tree.root(), token, cancel)
}

fn visit(
    tree: &SpatialTree,
    id: NodeId,
    token: &QueryToken,
    cancel: &AtomicBool,
) -> Result<Vec<EncryptedMatch>> {
    if cancel.load(Ordering::Relaxed) {
        return Err(EplqError::Cancelled);
    }

    match tree.node(id)? {
        IndexNode::Internal {
            bounding,
            bound_hint,
            children,
        } => {
            if let Some(region) = bounding {
                // Conservative: false means the circle provably cannot
                // reach this region, so the whole subtree is skipped.
                if !evaluate(token, region, token.node_bound(*bound_hint)) {
                    return Ok(Vec::new());
                }
            }

            let per_child: Vec<Vec<EncryptedMatch>> = children
                .par_iter()
                .map(|&child| visit(tree, child, token, cancel))
                .collect::<Result<_>>()?;
            Ok(per_child.into_iter().flatten().collect())
        }
        IndexNode::Leaf { points } => {
            let hits: Vec<Option<EncryptedMatch>> = points
                .par_iter()
                .map(|p| {
                    if cancel.load(Ordering::Relaxed) {
                        return Err(EplqError::Cancelled);
                    }
                    // Leaf evaluation is the exact in/out test.
                    Ok(evaluate(token, &p.predicate, token.leaf_bound()).then(|| {
                        EncryptedMatch {
                            id: p.id,
                            sealed: p.sealed.clone(),
                        }
                    }))
                })
                .collect::<Result<_>>()?;
            Ok(hits.into_iter().flatten().collect())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::elgamal::SealKey;
    use crate::geo::{GeoPoint, GridConfig};
    use crate::poe::{generate_token, poe_setup, MasterSecret, SecurityLevel};
    use crate::tree::build::{build_tree, Poi, TreeConfig};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn fixtures() -> (MasterSecret, SealKey, GridConfig) {
        let mut rng = StdRng::seed_from_u64(50);
        let grid = GridConfig::default();
        let (_, msk) = poe_setup(SecurityLevel::Bits128, grid, &mut rng).unwrap();
        let seal = SealKey::generate(&mut rng);
        (msk, seal, grid)
    }

    #[test]
    fn finds_points_inside_radius() {
        let (msk, seal, grid) = fixtures();
        let mut rng = StdRng::seed_from_u64(51);

        let pois = vec![
            Poi { id: 1, location: GeoPoint::new(0.0, 0.0) },
            Poi { id: 2, location: GeoPoint::new(0.001, 0.0) },
            Poi { id: 3, location: GeoPoint::new(1.0, 1.0) },
        ];
        let (tree, _) = build_tree(&msk, &seal, &grid, &TreeConfig::default(), &pois, &mut rng);

        let center = grid.encode(GeoPoint::new(0.0, 0.0)).unwrap();
        let radius = grid.radius_to_units(200.0).unwrap();
        let token = generate_token(&msk, center, radius, &mut rng);

        let matches = search(&tree, &token, &AtomicBool::new(false)).unwrap();
        let mut ids: Vec<u64> = matches.iter().map(|m| m.id).collect();
        ids.sort_unstable();
        assert_eq!(ids, vec![1, 2]);
    }

    #[test]
    fn cancelled_before_root_yields_cancelled() {
        let (msk, seal, grid) = fixtures();
        let mut rng = StdRng::seed_from_u64(52);
        let pois = vec![Poi { id: 1, location: GeoPoint::new(0.0, 0.0) }];
        let (tree, _) = build_tree(&msk, &seal, &grid, &TreeConfig::default(), &pois, &mut rng);

        let center = grid.encode(GeoPoint::new(0.0, 0.0)).unwrap();
        let token = generate_token(&msk, center, 10, &mut rng);

        let cancel = AtomicBool::new(true);
        assert!(matches!(
            search(&tree, &token, &cancel),
            Err(EplqError::Cancelled)
        ));
    }

    #[test]
    fn dangling_child_is_tree_corruption() {
        let (msk, seal, grid) = fixtures();
        let mut rng = StdRng::seed_from_u64(53);
        let pois = vec![Poi { id: 1, location: GeoPoint::new(0.0, 0.0) }];
        let (mut tree, _) = build_tree(&msk, &seal, &grid, &TreeConfig::default(), &pois, &mut rng);

        // Corrupt: replace the root with an internal node pointing nowhere.
        tree.nodes[0] = IndexNode::Internal {
            bounding: None,
            bound_hint: 0,
            children: vec![NodeId(7)],
        };

        let center = grid.encode(GeoPoint::new(0.0, 0.0)).unwrap();
        let token = generate_token(&msk, center, 10, &mut rng);
        assert!(matches!(
            search(&tree, &token, &AtomicBool::new(false)),
            Err(EplqError::TreeCorruption(_))
        ));
    }
}
