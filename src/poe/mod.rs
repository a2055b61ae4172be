//! Predicate-only encryption for circular range predicates.
//!
//! A function-hiding inner-product scheme over BLS12-381 (dual matrices with
//! correlated bases, one aggregated multi-pairing per evaluation). Locations
//! and query circles are encoded as 4-dimensional vectors so that the inner
//! product of a token and a ciphertext equals `r^2 - dist^2` (shifted by the
//! node slack for bounding regions); the evaluator learns only whether that
//! exponent lies in a public non-negative range.

pub mod encrypt;
pub mod evaluate;
pub mod setup;
pub mod token;

pub use encrypt::{encrypt_node, encrypt_point, PredicateCiphertext};
pub use evaluate::evaluate;
pub use setup::{poe_setup, MasterSecret, PublicParams, SecurityLevel};
pub use token::{generate_token, QueryToken};

/// Dimension of the inner-product encoding: `(x, y, x^2 + y^2, 1)`.
pub const VECTOR_DIM: usize = 4;
