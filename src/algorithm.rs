//! Registry of the JWS-style algorithms accepted for policy tokens.

use crate::constants::{HASH_SIZE_256, HASH_SIZE_384, PS256, PS384, RS256, RS384};
use crate::error::{PolicyError, Result};
use openssl::error::ErrorStack;
use openssl::hash::MessageDigest;
use openssl::pkey::{HasPrivate, HasPublic, Id, PKeyRef};
use openssl::rsa::Padding;
use openssl::sign::{RsaPssSaltlen, Signer, Verifier};
use std::fmt;

/// Broad family of an asymmetric key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyFamily {
    Rsa,
    Dsa,
    Ec,
    Other,
}

impl KeyFamily {
    pub fn from_id(id: Id) -> Self {
        match id {
            Id::RSA => KeyFamily::Rsa,
            Id::DSA => KeyFamily::Dsa,
            Id::EC => KeyFamily::Ec,
            _ => KeyFamily::Other,
        }
    }
}

impl fmt::Display for KeyFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            KeyFamily::Rsa => "RSA",
            KeyFamily::Dsa => "DSA",
            KeyFamily::Ec => "EC",
            KeyFamily::Other => "unknown",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureScheme {
    RsaPss,
    RsaPkcs1v15,
}

impl SignatureScheme {
    pub fn key_family(self) -> KeyFamily {
        match self {
            SignatureScheme::RsaPss | SignatureScheme::RsaPkcs1v15 => KeyFamily::Rsa,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashSize {
    Sha256,
    Sha384,
}

impl HashSize {
    /// Textual tag, matching the numeric suffix of the algorithm name.
    pub fn tag(self) -> &'static str {
        match self {
            HashSize::Sha256 => HASH_SIZE_256,
            HashSize::Sha384 => HASH_SIZE_384,
        }
    }

    pub fn message_digest(self) -> MessageDigest {
        match self {
            HashSize::Sha256 => MessageDigest::sha256(),
            HashSize::Sha384 => MessageDigest::sha384(),
        }
    }
}

/// A supported signing algorithm. The name alone determines the rest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlgorithmSpec {
    pub name: &'static str,
    pub hash_size: HashSize,
    pub scheme: SignatureScheme,
}

static REGISTRY: [AlgorithmSpec; 4] = [
    AlgorithmSpec {
        name: PS256,
        hash_size: HashSize::Sha256,
        scheme: SignatureScheme::RsaPss,
    },
    AlgorithmSpec {
        name: PS384,
        hash_size: HashSize::Sha384,
        scheme: SignatureScheme::RsaPss,
    },
    AlgorithmSpec {
        name: RS256,
        hash_size: HashSize::Sha256,
        scheme: SignatureScheme::RsaPkcs1v15,
    },
    AlgorithmSpec {
        name: RS384,
        hash_size: HashSize::Sha384,
        scheme: SignatureScheme::RsaPkcs1v15,
    },
];

/// Look up an algorithm by its exact, case-sensitive name.
pub fn resolve(name: &str) -> Result<&'static AlgorithmSpec> {
    REGISTRY
        .iter()
        .find(|spec| spec.name == name)
        .ok_or_else(|| PolicyError::UnsupportedAlgorithm(name.to_string()))
}

pub fn supported() -> &'static [AlgorithmSpec] {
    &REGISTRY
}

/// Comma separated names, for error messages.
pub fn supported_names() -> String {
    supported()
        .iter()
        .map(|spec| spec.name)
        .collect::<Vec<_>>()
        .join(", ")
}

impl AlgorithmSpec {
    pub fn key_family(&self) -> KeyFamily {
        self.scheme.key_family()
    }

    /// A signer configured with this algorithm's digest and padding.
    pub(crate) fn signer<'a, T: HasPrivate>(
        &self,
        key: &'a PKeyRef<T>,
    ) -> Result<Signer<'a>, ErrorStack> {
        let digest = self.hash_size.message_digest();
        let mut signer = Signer::new(digest, key)?;
        match self.scheme {
            SignatureScheme::RsaPss => {
                signer.set_rsa_padding(Padding::PKCS1_PSS)?;
                signer.set_rsa_pss_saltlen(RsaPssSaltlen::DIGEST_LENGTH)?;
                signer.set_rsa_mgf1_md(digest)?;
            }
            SignatureScheme::RsaPkcs1v15 => signer.set_rsa_padding(Padding::PKCS1)?,
        }
        Ok(signer)
    }

    pub(crate) fn verifier<'a, T: HasPublic>(
        &self,
        key: &'a PKeyRef<T>,
    ) -> Result<Verifier<'a>, ErrorStack> {
        let digest = self.hash_size.message_digest();
        let mut verifier = Verifier::new(digest, key)?;
        match self.scheme {
            SignatureScheme::RsaPss => {
                verifier.set_rsa_padding(Padding::PKCS1_PSS)?;
                verifier.set_rsa_pss_saltlen(RsaPssSaltlen::DIGEST_LENGTH)?;
                verifier.set_rsa_mgf1_md(digest)?;
            }
            SignatureScheme::RsaPkcs1v15 => verifier.set_rsa_padding(Padding::PKCS1)?,
        }
        Ok(verifier)
    }
}

impl fmt::Display for AlgorithmSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_suffix_matches_hash_size() {
        for spec in supported() {
            assert!(spec.name.ends_with(spec.hash_size.tag()));
            assert_eq!(
                spec.name[2..].parse::<usize>().unwrap(),
                spec.hash_size.message_digest().size() * 8
            );
            let is_pss = spec.scheme == SignatureScheme::RsaPss;
            assert_eq!(is_pss, spec.name.starts_with("PS"), "{}", spec.name);
            assert_eq!(spec.key_family(), KeyFamily::Rsa);
        }
    }

    #[test]
    fn test_resolve_every_supported_name() {
        for name in [PS256, PS384, RS256, RS384] {
            assert_eq!(resolve(name).unwrap().name, name);
        }
        assert_eq!(resolve(PS384).unwrap().hash_size, HashSize::Sha384);
        assert_eq!(resolve(RS256).unwrap().scheme, SignatureScheme::RsaPkcs1v15);
    }

    #[test]
    fn test_resolve_rejects_unknown_names() {
        for name in ["HS256", "", "ps256", "PS512", " PS256", "None"] {
            match resolve(name) {
                Err(PolicyError::UnsupportedAlgorithm(got)) => assert_eq!(got, name),
                other => panic!("{:?} resolved to {:?}", name, other),
            }
        }
    }

    #[test]
    fn test_error_lists_supported_names() {
        let message = resolve("HS256").unwrap_err().to_string();
        assert!(message.contains("PS256, PS384, RS256, RS384"), "{message}");
    }

    #[test]
    fn test_message_digest_sizes() {
        assert_eq!(HashSize::Sha256.message_digest().size(), 32);
        assert_eq!(HashSize::Sha384.message_digest().size(), 48);
    }
}
