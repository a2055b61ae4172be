//! Privacy-preserving spatial index.
//!
//! Built once by the owner from plaintext (the only party who has it),
//! searched by the server over ciphertexts alone. Nodes live in an arena
//! addressed by stable integer ids so the structure can be serialized,
//! swapped atomically under concurrent readers and walked by parallel
//! workers without ownership gymnastics.

pub mod build;
pub mod node;
pub mod search;
pub mod serial;

pub use build::{build_tree, IngestReport, Poi, TreeConfig};
pub use node::{EncryptedPoint, IndexNode, NodeId, SpatialTree};
pub use search::{search, EncryptedMatch};
pub use serial::{deserialize_tree, serialize_tree, FORMAT_VERSION};
