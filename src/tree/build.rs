//! Owner-side index construction. This is the one code path that sees
//! plaintext coordinates; everything it emits is encrypted.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use tracing::{debug, warn};

use crate::elgamal::SealKey;
use crate::geo::{GeoPoint, GridConfig, GridPoint};
use crate::poe::{encrypt_node, encrypt_point, MasterSecret};
use crate::tree::node::{EncryptedPoint, IndexNode, NodeId, SpatialTree};

/// Index construction parameters.
#[derive(Clone, Copy, Debug)]
pub struct TreeConfig {
    /// Children per internal node.
    pub fanout: usize,
    /// Maximum points per leaf.
    pub leaf_capacity: usize,
    /// Largest evaluation bound for which a bounding ciphertext is still
    /// worth storing. Regions above the cap (the top of a wide tree) cost
    /// more to evaluate than to descend and are left unbounded.
    pub node_bound_cap: u64,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            fanout: 4,
            leaf_capacity: 8,
            node_bound_cap: 1 << 30,
        }
    }
}

/// A plaintext POI record presented for ingestion.
#[derive(Clone, Copy, Debug)]
pub struct Poi {
    pub id: u64,
    pub location: GeoPoint,
}

/// Batch outcome: per-point encoding failures skip the point rather than
/// abort the batch.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct IngestReport {
    pub ingested: usize,
    pub skipped: usize,
}

/// Build an encrypted index over a plaintext POI set.
pub fn build_tree<R: Rng>(
    msk: &MasterSecret,
    seal: &SealKey,
    grid: &GridConfig,
    cfg: &TreeConfig,
    pois: &[Poi],
    rng: &mut R,
) -> (SpatialTree, IngestReport) {
    let mut encoded: Vec<(u64, GridPoint)> = Vec::with_capacity(pois.len());
    let mut skipped = 0usize;
    for poi in pois {
        match grid.encode(poi.location) {
            Ok(gp) => encoded.push((poi.id, gp)),
            Err(err) => {
                // The message is value-free; logging it does not leak the
                // coordinate that failed.
                warn!(point = poi.id, %err, "skipping point during ingestion");
                skipped += 1;
            }
        }
    }

    let report = IngestReport {
        ingested: encoded.len(),
        skipped,
    };

    let mut builder = Builder {
        msk,
        seal,
        cfg,
        max_radius_units: grid.max_radius_units(),
        nodes: Vec::new(),
        rng,
    };
    let root = builder.build(&mut encoded, 0);
    let tree = SpatialTree {
        nodes: builder.nodes,
        root,
        point_count: report.ingested,
    };

    debug!(
        nodes = tree.node_count(),
        points = tree.point_count(),
        skipped,
        "index built"
    );
    (tree, report)
}

struct Builder<'a, R: Rng> {
    msk: &'a MasterSecret,
    seal: &'a SealKey,
    cfg: &'a TreeConfig,
    max_radius_units: u64,
    nodes: Vec<IndexNode>,
    rng: &'a mut R,
}

impl<R: Rng> Builder<'_, R> {
    /// Recursive median split on the alternating axis. Parent ids are
    /// assigned before children, so child ids are always larger.
    fn build(&mut self, pts: &mut [(u64, GridPoint)], depth: usize) -> NodeId {
        if pts.len() <= self.cfg.leaf_capacity.max(1) {
            return self.build_leaf(pts);
        }

        let my_id = NodeId(self.nodes.len() as u32);
        self.nodes.push(IndexNode::Leaf { points: Vec::new() }); // reserved

        let (center, bound_hint) = self.bounding_region(pts);
        let bounding = if bound_hint <= self.cfg.node_bound_cap {
            Some(encrypt_node(self.msk, center, bound_hint, self.rng))
        } else {
            None
        };

        if depth % 2 == 0 {
            pts.sort_unstable_by_key(|(_, p)| p.x);
        } else {
            pts.sort_unstable_by_key(|(_, p)| p.y);
        }

        let chunk = pts.len().div_ceil(self.cfg.fanout.max(2));
        let mut children = Vec::with_capacity(self.cfg.fanout);
        let mut start = 0;
        while start < pts.len() {
            let end = (start + chunk).min(pts.len());
            children.push(self.build(&mut pts[start..end], depth + 1));
            start = end;
        }

        self.nodes[my_id.0 as usize] = IndexNode::Internal {
            bounding,
            bound_hint,
            children,
        };
        my_id
    }

    fn build_leaf(&mut self, pts: &[(u64, GridPoint)]) -> NodeId {
        // Point encryption is stateless and CPU-bound; fan it out with
        // per-point seeds drawn from the caller's rng.
        let seeds: Vec<u64> = pts.iter().map(|_| self.rng.gen()).collect();
        let points: Vec<EncryptedPoint> = pts
            .par_iter()
            .zip(seeds)
            .map(|(&(id, gp), seed)| {
                let mut rng = StdRng::seed_from_u64(seed);
                EncryptedPoint {
                    id,
                    predicate: encrypt_point(self.msk, gp, &mut rng),
                    sealed: self.seal.seal(gp, &mut rng),
                }
            })
            .collect();

        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(IndexNode::Leaf { points });
        id
    }

    /// Circumscribed circle of the subtree's bounding box, with the slack
    /// that keeps pruning conservative: `H >= R^2 + 2*r*R` for every
    /// admissible query radius `r`, so `dist(query, center)^2 <= r^2 + H`
    /// whenever the query circle can touch the region. Rounded up to a
    /// power of two so the stored hint only reveals the region's scale.
    fn bounding_region(&self, pts: &[(u64, GridPoint)]) -> (GridPoint, u64) {
        let min_x = pts.iter().map(|(_, p)| p.x).min().unwrap();
        let max_x = pts.iter().map(|(_, p)| p.x).max().unwrap();
        let min_y = pts.iter().map(|(_, p)| p.y).min().unwrap();
        let max_y = pts.iter().map(|(_, p)| p.y).max().unwrap();

        let center = GridPoint {
            x: (min_x + max_x) / 2,
            y: (min_y + max_y) / 2,
        };
        let radius_sq = [
            GridPoint { x: min_x, y: min_y },
            GridPoint { x: min_x, y: max_y },
            GridPoint { x: max_x, y: min_y },
            GridPoint { x: max_x, y: max_y },
        ]
        .iter()
        .map(|corner| center.dist_sq(corner))
        .max()
        .unwrap() as u128;

        let radius = (radius_sq as f64).sqrt().ceil() as u128;
        let hint = radius_sq + 2 * self.max_radius_units as u128 * radius;
        let hint = u64::try_from(hint).unwrap_or(u64::MAX);
        (center, hint.next_power_of_two())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::GridConfig;
    use crate::poe::{poe_setup, SecurityLevel};

    fn fixtures() -> (MasterSecret, SealKey, GridConfig) {
        let mut rng = StdRng::seed_from_u64(40);
        let grid = GridConfig::default();
        let (_, msk) = poe_setup(SecurityLevel::Bits128, grid, &mut rng).unwrap();
        let seal = SealKey::generate(&mut rng);
        (msk, seal, grid)
    }

    fn cluster(n: u64) -> Vec<Poi> {
        (0..n)
            .map(|i| Poi {
                id: i,
                location: GeoPoint::new(0.001 * i as f64, -0.002 * i as f64),
            })
            .collect()
    }

    #[test]
    fn small_set_becomes_single_leaf() {
        let (msk, seal, grid) = fixtures();
        let mut rng = StdRng::seed_from_u64(41);
        let (tree, report) = build_tree(
            &msk,
            &seal,
            &grid,
            &TreeConfig::default(),
            &cluster(5),
            &mut rng,
        );
        assert_eq!(report, IngestReport { ingested: 5, skipped: 0 });
        assert_eq!(tree.node_count(), 1);
        assert!(matches!(
            tree.node(tree.root()).unwrap(),
            IndexNode::Leaf { points } if points.len() == 5
        ));
    }

    #[test]
    fn larger_set_splits_and_children_follow_parents() {
        let (msk, seal, grid) = fixtures();
        let mut rng = StdRng::seed_from_u64(42);
        let (tree, report) = build_tree(
            &msk,
            &seal,
            &grid,
            &TreeConfig::default(),
            &cluster(50),
            &mut rng,
        );
        assert_eq!(report.ingested, 50);
        assert!(tree.node_count() > 1);

        let mut seen_points = 0;
        for (idx, node) in tree.nodes.iter().enumerate() {
            match node {
                IndexNode::Internal { children, .. } => {
                    assert!(!children.is_empty());
                    for c in children {
                        assert!(c.0 as usize > idx, "child id must exceed parent id");
                    }
                }
                IndexNode::Leaf { points } => seen_points += points.len(),
            }
        }
        assert_eq!(seen_points, 50);
    }

    #[test]
    fn invalid_points_are_skipped_not_fatal() {
        let (msk, seal, grid) = fixtures();
        let mut rng = StdRng::seed_from_u64(43);
        let mut pois = cluster(3);
        pois.push(Poi {
            id: 99,
            location: GeoPoint::new(91.0, 0.0),
        });
        let (tree, report) = build_tree(
            &msk,
            &seal,
            &grid,
            &TreeConfig::default(),
            &pois,
            &mut rng,
        );
        assert_eq!(report, IngestReport { ingested: 3, skipped: 1 });
        assert_eq!(tree.point_count(), 3);
    }

    #[test]
    fn bound_hint_is_a_conservative_power_of_two() {
        let (msk, seal, grid) = fixtures();
        let mut rng = StdRng::seed_from_u64(44);
        let (tree, _) = build_tree(
            &msk,
            &seal,
            &grid,
            &TreeConfig {
                leaf_capacity: 2,
                ..TreeConfig::default()
            },
            &cluster(20),
            &mut rng,
        );

        for node in &tree.nodes {
            if let IndexNode::Internal { bound_hint, .. } = node {
                assert!(bound_hint.is_power_of_two());
            }
        }
    }
}
