//! Verification of signed policy tokens against their embedded `x5c` chain.

use crate::algorithm::{self, AlgorithmSpec, KeyFamily};
use crate::cert_chain::CertificateChain;
use crate::constants::KEY_HEADER;
use crate::error::{PolicyError, Result};
use crate::token::{signing_input, TokenHeader, SEGMENT_SEPARATOR};
use crate::trust::{AcceptAnyChain, TrustAnchor};
use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use base64::Engine as _;

/// The outcome of a successful verification.
#[derive(Debug, Clone)]
pub struct VerifiedPolicy {
    pub payload: Vec<u8>,
    pub chain: CertificateChain,
    pub algorithm: &'static AlgorithmSpec,
}

/// Verify `token` cryptographically without any trust-anchor policy.
pub fn verify(token: &str) -> Result<VerifiedPolicy> {
    verify_with(token, &AcceptAnyChain)
}

/// Verify `token`, then hand the chain to `anchor` for acceptance.
pub fn verify_with(token: &str, anchor: &dyn TrustAnchor) -> Result<VerifiedPolicy> {
    let segments: Vec<&str> = token.split(SEGMENT_SEPARATOR).collect();
    let [header_segment, payload_segment, signature_segment] = segments[..] else {
        return Err(PolicyError::MalformedToken(format!(
            "expected 3 segments, found {}",
            segments.len()
        )));
    };
    if header_segment.is_empty() || signature_segment.is_empty() {
        return Err(PolicyError::MalformedToken("empty segment".to_string()));
    }

    let header_json = decode_segment("header", header_segment)?;
    let header: TokenHeader = serde_json::from_slice(&header_json)
        .map_err(|e| PolicyError::MalformedToken(format!("header: {e}")))?;
    let spec = algorithm::resolve(&header.alg)?;

    let ders = header
        .x5c
        .iter()
        .enumerate()
        .map(|(index, entry)| {
            STANDARD
                .decode(entry)
                .map_err(|e| PolicyError::InvalidCertificate {
                    index,
                    reason: format!("{KEY_HEADER} entry is not base64: {e}"),
                })
        })
        .collect::<Result<Vec<_>>>()?;
    let chain = CertificateChain::from_der(ders)?;

    let signature = decode_segment("signature", signature_segment)?;
    let leaf_key = chain
        .leaf()
        .x509()
        .public_key()
        .map_err(|e| PolicyError::InvalidCertificate {
            index: 0,
            reason: e.to_string(),
        })?;
    let leaf_family = KeyFamily::from_id(leaf_key.id());
    if leaf_family != spec.key_family() {
        return Err(PolicyError::KeyAlgorithmMismatch {
            algorithm: spec.name.to_string(),
            key: leaf_family,
        });
    }

    // The signature covers the segments exactly as received.
    let input = signing_input(header_segment, payload_segment);
    let valid = spec
        .verifier(&leaf_key)
        .and_then(|mut verifier| {
            verifier.update(input.as_bytes())?;
            verifier.verify(&signature)
        })
        .unwrap_or(false);
    if !valid {
        tracing::debug!(alg = spec.name, "signature mismatch");
        return Err(PolicyError::SignatureInvalid);
    }

    let payload = decode_segment("payload", payload_segment)?;
    anchor.check(spec, &chain)?;

    Ok(VerifiedPolicy {
        payload,
        chain,
        algorithm: spec,
    })
}

fn decode_segment(name: &str, segment: &str) -> Result<Vec<u8>> {
    URL_SAFE_NO_PAD
        .decode(segment)
        .map_err(|e| PolicyError::MalformedToken(format!("{name} is not base64url: {e}")))
}
