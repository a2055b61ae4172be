//! Versioned wire format for the encrypted index.
//!
//! Group elements travel as compressed canonical bytes inside bincode
//! records; the leading format-version field lets scheme parameters evolve
//! without silently corrupting old indexes.

use ark_serialize::{CanonicalDeserialize, CanonicalSerialize};
use serde::{Deserialize, Serialize};
use serde_bytes::ByteBuf;

use crate::elgamal::SealedLocation;
use crate::error::{EplqError, Result};
use crate::poe::{PredicateCiphertext, VECTOR_DIM};
use crate::tree::node::{EncryptedPoint, IndexNode, NodeId, SpatialTree};

/// Bump on any change to the record layout or the vector encoding.
pub const FORMAT_VERSION: u8 = 1;

#[derive(Serialize, Deserialize)]
struct WireTree {
    version: u8,
    root: u32,
    point_count: u64,
    nodes: Vec<WireNode>,
}

#[derive(Serialize, Deserialize)]
struct WireNode {
    node_id: u32,
    is_leaf: bool,
    bounding: Option<ByteBuf>,
    bound_hint: u64,
    children: Vec<u32>,
    points: Vec<WirePoint>,
}

#[derive(Serialize, Deserialize)]
struct WirePoint {
    id: u64,
    predicate: ByteBuf,
    sealed: ByteBuf,
}

fn to_bytes<T: CanonicalSerialize>(value: &T) -> ByteBuf {
    let mut buf = Vec::new();
    value
        .serialize_compressed(&mut buf)
        .expect("serialization into a Vec cannot fail");
    ByteBuf::from(buf)
}

fn ciphertext_from_bytes(bytes: &[u8]) -> Result<PredicateCiphertext> {
    let ct = PredicateCiphertext::deserialize_compressed(bytes)
        .map_err(|_| EplqError::Arithmetic("malformed predicate ciphertext"))?;
    if ct.c2.len() != VECTOR_DIM {
        return Err(EplqError::Arithmetic("predicate ciphertext dimension"));
    }
    Ok(ct)
}

fn sealed_from_bytes(bytes: &[u8]) -> Result<SealedLocation> {
    SealedLocation::deserialize_compressed(bytes)
        .map_err(|_| EplqError::Arithmetic("malformed sealed payload"))
}

/// Encode a tree into the persisted format.
pub fn serialize_tree(tree: &SpatialTree) -> Result<Vec<u8>> {
    let nodes = tree
        .nodes
        .iter()
        .enumerate()
        .map(|(idx, node)| match node {
            IndexNode::Internal {
                bounding,
                bound_hint,
                children,
            } => WireNode {
                node_id: idx as u32,
                is_leaf: false,
                bounding: bounding.as_ref().map(to_bytes),
                bound_hint: *bound_hint,
                children: children.iter().map(|c| c.0).collect(),
                points: Vec::new(),
            },
            IndexNode::Leaf { points } => WireNode {
                node_id: idx as u32,
                is_leaf: true,
                bounding: None,
                bound_hint: 0,
                children: Vec::new(),
                points: points
                    .iter()
                    .map(|p| WirePoint {
                        id: p.id,
                        predicate: to_bytes(&p.predicate),
                        sealed: to_bytes(&p.sealed),
                    })
                    .collect(),
            },
        })
        .collect();

    let wire = WireTree {
        version: FORMAT_VERSION,
        root: tree.root.0,
        point_count: tree.point_count() as u64,
        nodes,
    };
    bincode::serialize(&wire)
        .map_err(|e| EplqError::TreeCorruption(format!("encode failed: {e}")))
}

/// Decode and validate a persisted tree. Structural damage (unknown
/// version, out-of-order records, dangling children) is `TreeCorruption`;
/// malformed group encodings are `Arithmetic`.
pub fn deserialize_tree(bytes: &[u8]) -> Result<SpatialTree> {
    let wire: WireTree = bincode::deserialize(bytes)
        .map_err(|e| EplqError::TreeCorruption(format!("decode failed: {e}")))?;

    if wire.version != FORMAT_VERSION {
        return Err(EplqError::TreeCorruption(format!(
            "unsupported format version {}",
            wire.version
        )));
    }

    let n = wire.nodes.len() as u32;
    if wire.root >= n {
        return Err(EplqError::TreeCorruption("root points nowhere".into()));
    }

    let mut nodes = Vec::with_capacity(wire.nodes.len());
    for (idx, wn) in wire.nodes.iter().enumerate() {
        if wn.node_id != idx as u32 {
            return Err(EplqError::TreeCorruption(format!(
                "node record {} out of order",
                wn.node_id
            )));
        }
        if wn.is_leaf {
            let points = wn
                .points
                .iter()
                .map(|wp| {
                    Ok(EncryptedPoint {
                        id: wp.id,
                        predicate: ciphertext_from_bytes(&wp.predicate)?,
                        sealed: sealed_from_bytes(&wp.sealed)?,
                    })
                })
                .collect::<Result<Vec<_>>>()?;
            nodes.push(IndexNode::Leaf { points });
        } else {
            for child in &wn.children {
                // Children after parents keeps walks acyclic.
                if *child >= n || *child <= wn.node_id {
                    return Err(EplqError::TreeCorruption(format!(
                        "node {} references invalid child {}",
                        wn.node_id, child
                    )));
                }
            }
            let bounding = wn
                .bounding
                .as_ref()
                .map(|b| ciphertext_from_bytes(b))
                .transpose()?;
            nodes.push(IndexNode::Internal {
                bounding,
                bound_hint: wn.bound_hint,
                children: wn.children.iter().map(|&c| NodeId(c)).collect(),
            });
        }
    }

    Ok(SpatialTree {
        nodes,
        root: NodeId(wire.root),
        point_count: wire.point_count as usize,
    })
}
