//! Sign command: validate inputs, load key and chain, sign the policy file.

use crate::algorithm;
use crate::cert_chain::CertificateChain;
use crate::constants::{MAX_CERT_FILE_SIZE, MAX_KEY_FILE_SIZE, MAX_POLICY_FILE_SIZE};
use crate::key_loader::SigningKey;
use crate::path_guard;
use crate::token::{self, SignedPolicyToken};
use anyhow::{anyhow, Context};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// File form of a token written with `--out`.
#[derive(Debug, Serialize, Deserialize)]
pub struct TokenEnvelope {
    pub token: String,
    pub algorithm: String,
    pub signed_at: String,
}

/// Read, validate and sign a policy file. Every input is checked before
/// any cryptographic work starts.
pub fn sign_policy_file(
    policy_path: &Path,
    private_key_path: &Path,
    cert_path: &Path,
    algorithm_name: &str,
) -> anyhow::Result<SignedPolicyToken> {
    let spec = algorithm::resolve(algorithm_name)?;

    let policy = path_guard::validate(policy_path, MAX_POLICY_FILE_SIZE)?;
    let key_file = path_guard::validate(private_key_path, MAX_KEY_FILE_SIZE)?;
    let cert_file = path_guard::validate(cert_path, MAX_CERT_FILE_SIZE)?;

    let payload = policy.read()?;
    let key = SigningKey::load(&key_file.read()?, spec.key_family())
        .with_context(|| format!("Private key {}", private_key_path.display()))?;
    let chain = CertificateChain::load(&cert_file.read()?)
        .with_context(|| format!("Certificate file {}", cert_path.display()))?;

    tracing::info!(
        policy = %policy.as_path().display(),
        bytes = policy.size(),
        alg = spec.name,
        leaf = %chain.leaf().subject(),
        "signing policy"
    );
    Ok(token::sign(&payload, &key, &chain, spec)?)
}

pub fn run(
    policy_path: &Path,
    private_key_path: &Path,
    cert_path: &Path,
    algorithm_name: &str,
    out: Option<&Path>,
) -> anyhow::Result<()> {
    let token = sign_policy_file(policy_path, private_key_path, cert_path, algorithm_name)?;

    match out {
        Some(out_path) => {
            let envelope = TokenEnvelope {
                token: token.into_string(),
                algorithm: algorithm_name.to_string(),
                signed_at: chrono::Utc::now().to_rfc3339(),
            };
            std::fs::write(out_path, serde_json::to_string_pretty(&envelope)?)
                .map_err(|e| anyhow!("Failed to write token {}: {}", out_path.display(), e))?;
            tracing::info!(out = %out_path.display(), "token written");
        }
        None => println!("{}", token),
    }
    Ok(())
}
