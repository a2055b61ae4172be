use thiserror::Error;

/// Errors surfaced by the query engine.
///
/// Messages deliberately carry no coordinates and no key material: an error
/// formatted into a log line must not undo the privacy the scheme provides.
#[derive(Debug, Error)]
pub enum EplqError {
    /// Bad security parameter or invalid deployment configuration.
    #[error("setup failed: {0}")]
    Setup(&'static str),

    /// A coordinate fell outside the representable domain, or scaling
    /// overflowed the fixed-point range.
    #[error("encoding failed: {0}")]
    Encoding(&'static str),

    /// Field inversion of zero, or a malformed group element on
    /// deserialization.
    #[error("arithmetic failed: {0}")]
    Arithmetic(&'static str),

    /// The serialized index references a missing node or uses an unknown
    /// format version. Fatal: the index must be rebuilt by the owner.
    #[error("index corrupted: {0}")]
    TreeCorruption(String),

    /// The caller aborted the search. A normal terminal state, not a fault;
    /// partial results are discarded.
    #[error("query cancelled")]
    Cancelled,
}

pub type Result<T> = std::result::Result<T, EplqError>;
