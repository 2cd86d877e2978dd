//! Trust-anchor rules applied after a token's signature checks out.
//!
//! Signature verification only proves the token was signed by the key in
//! the embedded leaf certificate. Whether that chain is acceptable is the
//! caller's decision, expressed as a [`TrustAnchor`].

use crate::algorithm::{self, AlgorithmSpec};
use crate::cert_chain::{Certificate, CertificateChain};
use crate::constants::MAX_CERT_FILE_SIZE;
use crate::error::{PolicyError, Result};
use crate::path_guard;
use openssl::x509::X509VerifyResult;
use serde::Deserialize;
use std::path::{Path, PathBuf};

pub trait TrustAnchor {
    /// Accept or reject a chain whose leaf produced a valid signature.
    fn check(&self, algorithm: &AlgorithmSpec, chain: &CertificateChain) -> Result<()>;
}

/// Accepts every chain.
#[derive(Debug, Default, Clone, Copy)]
pub struct AcceptAnyChain;

impl TrustAnchor for AcceptAnyChain {
    fn check(&self, _algorithm: &AlgorithmSpec, _chain: &CertificateChain) -> Result<()> {
        Ok(())
    }
}

/// Requires the top of the chain to be one of the pinned roots, or to be
/// issued and signed by one.
#[derive(Debug, Clone)]
pub struct PinnedRoots {
    roots: Vec<Certificate>,
}

impl PinnedRoots {
    pub fn new(roots: CertificateChain) -> Self {
        Self {
            roots: roots.iter().cloned().collect(),
        }
    }

    /// Load pinned roots from a PEM bundle on disk.
    pub fn from_file(path: &Path) -> Result<Self> {
        let bytes = path_guard::validate(path, MAX_CERT_FILE_SIZE)?.read()?;
        Ok(Self::new(CertificateChain::load(&bytes)?))
    }

    fn anchors(&self, top: &Certificate) -> bool {
        self.roots.iter().any(|root| {
            if root == top {
                return true;
            }
            if root.x509().issued(top.x509()) != X509VerifyResult::OK {
                return false;
            }
            root.x509()
                .public_key()
                .and_then(|key| top.x509().verify(&key))
                .unwrap_or(false)
        })
    }
}

impl TrustAnchor for PinnedRoots {
    fn check(&self, _algorithm: &AlgorithmSpec, chain: &CertificateChain) -> Result<()> {
        let top = chain.top();
        if self.anchors(top) {
            Ok(())
        } else {
            Err(PolicyError::UntrustedChain(format!(
                "{} ({}) is not anchored in a pinned root",
                top.subject(),
                top.fingerprint()
            )))
        }
    }
}

#[derive(Debug, Deserialize, Default)]
struct TrustRulesFile {
    /// Algorithm names accepted; all supported algorithms when unset.
    allowed_algorithms: Option<Vec<String>>,
    /// PEM files holding pinned root certificates; any chain when empty.
    #[serde(default)]
    trusted_roots: Vec<PathBuf>,
}

/// Trust rules read from a JSON file.
#[derive(Debug, Default)]
pub struct TrustRules {
    allowed_algorithms: Option<Vec<&'static AlgorithmSpec>>,
    roots: Option<PinnedRoots>,
}

impl TrustRules {
    pub fn load(path: &Path) -> Result<Self> {
        let bytes = path_guard::validate(path, MAX_CERT_FILE_SIZE)?.read()?;
        let file: TrustRulesFile = serde_json::from_slice(&bytes).map_err(|e| {
            PolicyError::InvalidInput(format!("invalid trust rules {}: {}", path.display(), e))
        })?;

        let allowed_algorithms = file
            .allowed_algorithms
            .map(|names| {
                names
                    .iter()
                    .map(|name| algorithm::resolve(name))
                    .collect::<Result<Vec<_>>>()
            })
            .transpose()?;

        // Root bundles are resolved against, and confined to, the rules
        // file's directory.
        let base = path
            .parent()
            .filter(|dir| !dir.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let mut roots = Vec::new();
        for root_path in &file.trusted_roots {
            let bundle =
                path_guard::validate_within(&base.join(root_path), MAX_CERT_FILE_SIZE, base)?;
            roots.extend(PinnedRoots::new(CertificateChain::load(&bundle.read()?)?).roots);
        }
        let roots = (!roots.is_empty()).then_some(PinnedRoots { roots });

        Ok(Self {
            allowed_algorithms,
            roots,
        })
    }
}

impl TrustAnchor for TrustRules {
    fn check(&self, algorithm: &AlgorithmSpec, chain: &CertificateChain) -> Result<()> {
        if let Some(allowed) = &self.allowed_algorithms {
            if !allowed.iter().any(|spec| spec.name == algorithm.name) {
                return Err(PolicyError::UntrustedChain(format!(
                    "algorithm {} is not allowed by trust rules",
                    algorithm
                )));
            }
        }
        match &self.roots {
            Some(roots) => roots.check(algorithm, chain),
            None => Ok(()),
        }
    }
}
