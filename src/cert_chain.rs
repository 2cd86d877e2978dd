//! Ordered X.509 certificate chains loaded from PEM bundles or `x5c` arrays.

use crate::constants::CERT_TYPE;
use crate::error::{PolicyError, Result};
use crate::pem_blocks;
use openssl::hash::MessageDigest;
use openssl::x509::X509;

/// One certificate, kept both as the exact DER bytes it was read from and
/// in parsed form.
#[derive(Clone)]
pub struct Certificate {
    der: Vec<u8>,
    x509: X509,
    fingerprint: String,
}

impl Certificate {
    fn from_der(index: usize, der: Vec<u8>) -> Result<Self> {
        let invalid = |reason: String| PolicyError::InvalidCertificate { index, reason };
        let x509 = X509::from_der(&der).map_err(|e| invalid(e.to_string()))?;
        // Reject trailing bytes and non-canonical encodings.
        let reencoded = x509.to_der().map_err(|e| invalid(e.to_string()))?;
        if reencoded != der {
            return Err(invalid("DER is not canonical".to_string()));
        }
        let digest = x509
            .digest(MessageDigest::sha256())
            .map_err(|e| invalid(e.to_string()))?;
        Ok(Self {
            der,
            x509,
            fingerprint: hex::encode(&*digest),
        })
    }

    pub fn der(&self) -> &[u8] {
        &self.der
    }

    pub fn x509(&self) -> &X509 {
        &self.x509
    }

    /// Subject as a comma separated list of `KEY=value` entries.
    pub fn subject(&self) -> String {
        self.x509
            .subject_name()
            .entries()
            .map(|entry| {
                let key = entry.object().nid().short_name().unwrap_or("?");
                let value = entry
                    .data()
                    .as_utf8()
                    .map(|s| s.to_string())
                    .unwrap_or_default();
                format!("{key}={value}")
            })
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Hex SHA-256 fingerprint of the DER encoding.
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }
}

impl std::fmt::Debug for Certificate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Certificate")
            .field("subject", &self.subject())
            .field("der_len", &self.der.len())
            .finish()
    }
}

impl PartialEq for Certificate {
    fn eq(&self, other: &Self) -> bool {
        self.der == other.der
    }
}

impl Eq for Certificate {}

/// Non-empty certificate chain in source order. Issuer linkage is not
/// checked here; see [`crate::trust`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificateChain {
    certs: Vec<Certificate>,
}

impl CertificateChain {
    /// Parse every PEM block in `bytes`; each must be a `CERTIFICATE`.
    pub fn load(bytes: &[u8]) -> Result<Self> {
        let blocks = pem_blocks::parse_blocks(bytes);
        if blocks.is_empty() {
            return Err(PolicyError::EmptyChain);
        }
        let mut certs = Vec::with_capacity(blocks.len());
        for (index, block) in blocks.into_iter().enumerate() {
            if block.label != CERT_TYPE {
                return Err(PolicyError::InvalidCertificate {
                    index,
                    reason: format!("expected {} block, found {}", CERT_TYPE, block.label),
                });
            }
            let der = block
                .contents
                .map_err(|reason| PolicyError::InvalidCertificate { index, reason })?;
            certs.push(Certificate::from_der(index, der)?);
        }
        Ok(Self { certs })
    }

    /// Build a chain from DER certificates, e.g. a decoded `x5c` header.
    pub fn from_der(ders: Vec<Vec<u8>>) -> Result<Self> {
        if ders.is_empty() {
            return Err(PolicyError::EmptyChain);
        }
        let certs = ders
            .into_iter()
            .enumerate()
            .map(|(index, der)| Certificate::from_der(index, der))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { certs })
    }

    pub fn leaf(&self) -> &Certificate {
        // Constructors guarantee at least one entry.
        &self.certs[0]
    }

    /// The certificate closest to the root, which may be the leaf itself.
    pub fn top(&self) -> &Certificate {
        &self.certs[self.certs.len() - 1]
    }

    pub fn len(&self) -> usize {
        self.certs.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Certificate> {
        self.certs.iter()
    }

    pub fn to_pem(&self) -> String {
        pem_blocks::encode_all(CERT_TYPE, self.certs.iter().map(Certificate::der))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{cert_pem, pem_block, rsa_key, self_signed};

    fn three_cert_bundle() -> Vec<String> {
        let key = rsa_key();
        ["leaf", "intermediate", "root"]
            .iter()
            .map(|cn| String::from_utf8(cert_pem(&self_signed(key, cn))).unwrap())
            .collect()
    }

    #[test]
    fn test_load_preserves_order() {
        let bundle = three_cert_bundle().concat();
        let chain = CertificateChain::load(bundle.as_bytes()).unwrap();

        assert_eq!(chain.len(), 3);
        let subjects: Vec<String> = chain.iter().map(|c| c.subject()).collect();
        assert_eq!(subjects, vec!["CN=leaf", "CN=intermediate", "CN=root"]);
        assert_eq!(chain.leaf().subject(), "CN=leaf");
        assert_eq!(chain.top().subject(), "CN=root");
    }

    #[test]
    fn test_empty_input_is_empty_chain() {
        assert!(matches!(
            CertificateChain::load(b""),
            Err(PolicyError::EmptyChain)
        ));
        assert!(matches!(
            CertificateChain::load(b"no pem here\n"),
            Err(PolicyError::EmptyChain)
        ));
        assert!(matches!(
            CertificateChain::from_der(Vec::new()),
            Err(PolicyError::EmptyChain)
        ));
    }

    #[test]
    fn test_malformed_block_is_identified_by_index() {
        let mut blocks = three_cert_bundle();
        // A well-formed base64 body that is not a certificate.
        blocks.insert(2, pem_block(CERT_TYPE, b"definitely not DER"));
        let bundle = blocks.concat();

        match CertificateChain::load(bundle.as_bytes()) {
            Err(PolicyError::InvalidCertificate { index, .. }) => assert_eq!(index, 2),
            other => panic!("expected InvalidCertificate, got {:?}", other),
        }
    }

    #[test]
    fn test_undecodable_block_is_identified_by_index() {
        let mut blocks = three_cert_bundle();
        blocks.insert(
            1,
            "-----BEGIN CERTIFICATE-----\n%%%%\n-----END CERTIFICATE-----\n".to_string(),
        );
        let bundle = blocks.concat();

        match CertificateChain::load(bundle.as_bytes()) {
            Err(PolicyError::InvalidCertificate { index, .. }) => assert_eq!(index, 1),
            other => panic!("expected InvalidCertificate, got {:?}", other),
        }
    }

    #[test]
    fn test_wrong_block_type_is_rejected() {
        let mut blocks = three_cert_bundle();
        blocks.push(pem_block("PUBLIC KEY", b"abc"));
        let bundle = blocks.concat();

        match CertificateChain::load(bundle.as_bytes()) {
            Err(PolicyError::InvalidCertificate { index, reason }) => {
                assert_eq!(index, 3);
                assert!(reason.contains("PUBLIC KEY"));
            }
            other => panic!("expected InvalidCertificate, got {:?}", other),
        }
    }

    #[test]
    fn test_trailing_bytes_in_der_are_rejected() {
        let cert = self_signed(rsa_key(), "leaf");
        let mut der = cert.to_der().unwrap();
        der.push(0);

        match CertificateChain::from_der(vec![der]) {
            Err(PolicyError::InvalidCertificate { index, .. }) => assert_eq!(index, 0),
            other => panic!("expected InvalidCertificate, got {:?}", other),
        }
    }

    #[test]
    fn test_pem_round_trip_keeps_der() {
        let bundle = three_cert_bundle().concat();
        let chain = CertificateChain::load(bundle.as_bytes()).unwrap();
        let reloaded = CertificateChain::load(chain.to_pem().as_bytes()).unwrap();
        assert_eq!(chain, reloaded);
        assert_eq!(chain.leaf().fingerprint().len(), 64);
    }
}
