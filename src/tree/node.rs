use crate::elgamal::SealedLocation;
use crate::error::{EplqError, Result};
use crate::poe::PredicateCiphertext;

/// Stable arena index of a tree node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct NodeId(pub u32);

/// A stored POI: predicate ciphertext for the evaluator, sealed coordinates
/// for the key holder, and a plaintext identifier tag.
///
/// Created once at ingestion, immutable afterwards.
#[derive(Clone, Debug)]
pub struct EncryptedPoint {
    pub id: u64,
    pub predicate: PredicateCiphertext,
    pub sealed: SealedLocation,
}

/// One node of the index.
#[derive(Clone, Debug)]
pub enum IndexNode {
    /// Interior node. `bounding` is `None` when the region's evaluation
    /// bound exceeded the configured cap at build time — such nodes are
    /// always descended, which is conservative.
    Internal {
        bounding: Option<PredicateCiphertext>,
        bound_hint: u64,
        children: Vec<NodeId>,
    },
    Leaf { points: Vec<EncryptedPoint> },
}

/// The arena. Children always carry larger ids than their parent (a build
/// invariant that load-time validation re-checks), so walks terminate.
#[derive(Clone, Debug)]
pub struct SpatialTree {
    pub(crate) nodes: Vec<IndexNode>,
    pub(crate) root: NodeId,
    pub(crate) point_count: usize,
}

impl SpatialTree {
    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn node(&self, id: NodeId) -> Result<&IndexNode> {
        self.nodes.get(id.0 as usize).ok_or_else(|| {
            EplqError::TreeCorruption(format!("node {} does not exist", id.0))
        })
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn point_count(&self) -> usize {
        self.point_count
    }
}
