//! EPLQ: efficient privacy-preserving location-based queries.
//!
//! A predicate-only encrypted spatial range query engine: a client searches
//! for points of interest within a circular area around its location without
//! revealing that location, or the POI coordinates, to the server. The
//! circle test is encoded as an inner product and evaluated under a
//! function-hiding inner-product encryption scheme (Kim et al., ePrint
//! 2016/440) over the BLS12-381 pairing curve; an encrypted spatial tree
//! prunes subtrees the query circle provably cannot reach.
//!
//! Design choices:
//! - Pairing group: BLS12-381 via the Arkworks ecosystem
//! - Trust direction: the client holds every secret (encryption, tokens,
//!   decryption); the server only stores ciphertexts and evaluates a
//!   single-bit predicate per candidate
//! - Coordinates are fixed-point integers on a 1e-6-degree grid; floating
//!   point exists only at the client edge
//! - Not constant-time across all code paths; do not use in production
//!   without a security review
//!
//! Boundary operations:
//! - [`client::setup`]: generate parameters and the client key
//! - [`client::ClientKey::ingest`]: build an encrypted index (owner-only)
//! - [`client::ClientKey::make_query`]: derive a single-use query token
//! - [`engine::Server::search`]: evaluate a token against the index
//! - [`client::ClientKey::decrypt`]: open returned matches

pub mod client;
pub mod dlog;
pub mod elgamal;
pub mod engine;
pub mod error;
pub mod geo;
pub mod linalg;
pub mod poe;
pub mod tree;

pub use client::{setup, ClientKey, DecryptedPoi};
pub use engine::{CancelHandle, EngineConfig, QueryState, Server};
pub use error::{EplqError, Result};
pub use geo::{GeoPoint, GridConfig};
pub use poe::{PublicParams, QueryToken, SecurityLevel};
pub use tree::{IngestReport, Poi, SpatialTree, TreeConfig};
