//! Error kinds for policy signing and verification.

use crate::algorithm::KeyFamily;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PolicyError {
    #[error("unsafe or invalid path specified: {}: {reason}", path.display())]
    InvalidPath { path: PathBuf, reason: String },

    #[error("{} is {size} bytes, limit is {limit} bytes", path.display())]
    InvalidSize { path: PathBuf, size: u64, limit: u64 },

    #[error(
        "unsupported algorithm: {0:?} (supported: {})",
        crate::algorithm::supported_names()
    )]
    UnsupportedAlgorithm(String),

    #[error("invalid private key: {0}")]
    InvalidKey(String),

    #[error("key family mismatch: expected {expected} key, found {found}")]
    KeyFamilyMismatch { expected: KeyFamily, found: KeyFamily },

    /// `index` is the zero-based position of the offending block.
    #[error("invalid certificate at block {index}: {reason}")]
    InvalidCertificate { index: usize, reason: String },

    #[error("certificate chain is empty")]
    EmptyChain,

    #[error("{algorithm} cannot be used with {key} key")]
    KeyAlgorithmMismatch { algorithm: String, key: KeyFamily },

    #[error("signing failed: {0}")]
    SigningFailure(String),

    #[error("malformed token: {0}")]
    MalformedToken(String),

    #[error("signature verification failed")]
    SignatureInvalid,

    #[error("certificate chain is not trusted: {0}")]
    UntrustedChain(String),

    #[error("{0}")]
    InvalidInput(String),

    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T, E = PolicyError> = std::result::Result<T, E>;
