//! Signed policy tokens: `base64url(header).base64url(payload).base64url(signature)`.
//!
//! The header carries the algorithm name and the signer's certificate chain
//! (`x5c`), so a verifier needs no shared secret. The payload is embedded
//! byte for byte; nothing is re-serialized.
//!
//! PS* algorithms use salted RSA-PSS, so signing the same input twice gives
//! different tokens. Compare tokens by verification outcome, never by bytes.

use crate::algorithm::AlgorithmSpec;
use crate::cert_chain::CertificateChain;
use crate::constants::MIN_RSA_KEY_BITS;
use crate::error::{PolicyError, Result};
use crate::key_loader::SigningKey;
use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use std::fmt;

pub(crate) const SEGMENT_SEPARATOR: char = '.';

/// Serialized with `alg` first; field order is part of the wire format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct TokenHeader {
    pub alg: String,
    pub x5c: Vec<String>,
}

/// A finished compact token. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedPolicyToken(String);

impl SignedPolicyToken {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for SignedPolicyToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The bytes covered by the signature.
pub(crate) fn signing_input(header_segment: &str, payload_segment: &str) -> String {
    format!("{header_segment}{SEGMENT_SEPARATOR}{payload_segment}")
}

/// Sign `payload` with `key`, embedding `chain` in the header.
pub fn sign(
    payload: &[u8],
    key: &SigningKey,
    chain: &CertificateChain,
    spec: &AlgorithmSpec,
) -> Result<SignedPolicyToken> {
    if key.family() != spec.key_family() {
        return Err(PolicyError::KeyAlgorithmMismatch {
            algorithm: spec.name.to_string(),
            key: key.family(),
        });
    }
    if key.bits() < MIN_RSA_KEY_BITS {
        return Err(PolicyError::SigningFailure(format!(
            "{}-bit key is too small for {}",
            key.bits(),
            spec
        )));
    }

    let header = TokenHeader {
        alg: spec.name.to_string(),
        x5c: chain.iter().map(|cert| STANDARD.encode(cert.der())).collect(),
    };
    let header_json = serde_json::to_vec(&header)
        .map_err(|e| PolicyError::SigningFailure(format!("header encoding: {e}")))?;
    let input = signing_input(
        &URL_SAFE_NO_PAD.encode(header_json),
        &URL_SAFE_NO_PAD.encode(payload),
    );

    let mut signer = spec
        .signer(key.pkey())
        .map_err(|e| PolicyError::SigningFailure(e.to_string()))?;
    signer
        .update(input.as_bytes())
        .map_err(|e| PolicyError::SigningFailure(e.to_string()))?;
    let signature = signer
        .sign_to_vec()
        .map_err(|e| PolicyError::SigningFailure(e.to_string()))?;

    tracing::debug!(
        alg = spec.name,
        hash = spec.hash_size.tag(),
        chain_len = chain.len(),
        payload_len = payload.len(),
        "policy signed"
    );
    Ok(SignedPolicyToken(format!(
        "{input}{SEGMENT_SEPARATOR}{}",
        URL_SAFE_NO_PAD.encode(signature)
    )))
}
