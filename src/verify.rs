//! Verify command: load a token, check it, apply trust rules, colored verdict.

use crate::constants::MAX_TOKEN_FILE_SIZE;
use crate::path_guard;
use crate::sign::TokenEnvelope;
use crate::token_verify::{self, VerifiedPolicy};
use crate::trust::{PinnedRoots, TrustAnchor, TrustRules};
use anyhow::{anyhow, Context};
use colored::Colorize;
use std::path::Path;

/// Read a token file holding either a bare token or a JSON envelope.
fn load_token_file(path: &Path) -> anyhow::Result<String> {
    let content = path_guard::validate(path, MAX_TOKEN_FILE_SIZE)?.read()?;
    let text = String::from_utf8(content)
        .map_err(|_| anyhow!("Token file {} is not UTF-8", path.display()))?;
    let text = text.trim();
    if text.starts_with('{') {
        let envelope: TokenEnvelope =
            serde_json::from_str(text).context("Invalid token envelope JSON")?;
        Ok(envelope.token.trim().to_string())
    } else {
        Ok(text.to_string())
    }
}

/// `None` when neither option is given: any well-formed chain is accepted.
fn trust_anchor(
    trusted_root: Option<&Path>,
    trust_rules: Option<&Path>,
) -> anyhow::Result<Option<Box<dyn TrustAnchor>>> {
    let anchor: Box<dyn TrustAnchor> = match (trusted_root, trust_rules) {
        (Some(_), Some(_)) => {
            return Err(anyhow!("--trusted-root and --trust-rules are mutually exclusive"))
        }
        (Some(root), None) => Box::new(
            PinnedRoots::from_file(root)
                .with_context(|| format!("Trusted root {}", root.display()))?,
        ),
        (None, Some(rules)) => Box::new(
            TrustRules::load(rules).with_context(|| format!("Trust rules {}", rules.display()))?,
        ),
        (None, None) => return Ok(None),
    };
    Ok(Some(anchor))
}

pub fn verify_token_file(
    token_path: &Path,
    trusted_root: Option<&Path>,
    trust_rules: Option<&Path>,
) -> anyhow::Result<VerifiedPolicy> {
    let token = load_token_file(token_path)?;
    let verified = match trust_anchor(trusted_root, trust_rules)? {
        Some(anchor) => token_verify::verify_with(&token, anchor.as_ref())?,
        None => token_verify::verify(&token)?,
    };
    Ok(verified)
}

pub fn run(
    token_path: &Path,
    trusted_root: Option<&Path>,
    trust_rules: Option<&Path>,
    chain_out: Option<&Path>,
) -> anyhow::Result<()> {
    let verified = match verify_token_file(token_path, trusted_root, trust_rules) {
        Ok(verified) => verified,
        Err(e) => {
            println!("{}", "Verification Failed".red());
            return Err(e);
        }
    };

    let leaf = verified.chain.leaf();
    println!("{}", "Verified".green());
    println!("Algorithm:   {}", verified.algorithm);
    println!("Signer:      {}", leaf.subject());
    println!("Fingerprint: {}", leaf.fingerprint());
    println!("Chain:       {} certificate(s)", verified.chain.len());
    println!("{}", String::from_utf8_lossy(&verified.payload));

    if let Some(out) = chain_out {
        std::fs::write(out, verified.chain.to_pem())
            .map_err(|e| anyhow!("Failed to write chain {}: {}", out.display(), e))?;
        tracing::info!(out = %out.display(), "signer chain written");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithm::{self, KeyFamily};
    use crate::cert_chain::CertificateChain;
    use crate::constants::RS384;
    use crate::error::PolicyError;
    use crate::key_loader::SigningKey;
    use crate::test_support::{cert_pem, key_pem, other_rsa_key, rsa_key, self_signed};
    use crate::token;
    use std::fs;
    use tempfile::tempdir;

    fn signed_token() -> (String, Vec<u8>) {
        let root_pem = cert_pem(&self_signed(rsa_key(), "signer"));
        let key = SigningKey::load(&key_pem(rsa_key()), KeyFamily::Rsa).unwrap();
        let chain = CertificateChain::load(&root_pem).unwrap();
        let token = token::sign(b"{\"rule\":\"deny\"}", &key, &chain, algorithm::resolve(RS384).unwrap())
            .unwrap();
        (token.into_string(), root_pem)
    }

    #[test]
    fn test_bare_token_with_trailing_newline() {
        let dir = tempdir().unwrap();
        let (token, _) = signed_token();
        let path = dir.path().join("policy.jwt");
        fs::write(&path, format!("{token}\n")).unwrap();

        let verified = verify_token_file(&path, None, None).unwrap();
        assert_eq!(verified.payload, b"{\"rule\":\"deny\"}");
    }

    #[test]
    fn test_envelope_and_pinned_root() {
        let dir = tempdir().unwrap();
        let (token, root_pem) = signed_token();
        let path = dir.path().join("policy.token.json");
        let envelope = TokenEnvelope {
            token,
            algorithm: RS384.to_string(),
            signed_at: chrono::Utc::now().to_rfc3339(),
        };
        fs::write(&path, serde_json::to_string(&envelope).unwrap()).unwrap();
        let root_path = dir.path().join("root.pem");
        fs::write(&root_path, root_pem).unwrap();

        assert!(verify_token_file(&path, Some(root_path.as_path()), None).is_ok());

        fs::write(&root_path, cert_pem(&self_signed(other_rsa_key(), "other"))).unwrap();
        let err = verify_token_file(&path, Some(root_path.as_path()), None).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<PolicyError>(),
            Some(PolicyError::UntrustedChain(_))
        ));
    }

    #[test]
    fn test_root_and_rules_are_exclusive() {
        let dir = tempdir().unwrap();
        let (token, _) = signed_token();
        let path = dir.path().join("policy.jwt");
        fs::write(&path, token).unwrap();

        assert!(verify_token_file(&path, Some(path.as_path()), Some(path.as_path())).is_err());
    }

    #[test]
    fn test_run_reports_failure() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("policy.jwt");
        fs::write(&path, "not.a.token").unwrap();

        assert!(run(&path, None, None, None).is_err());
    }

    #[test]
    fn test_run_writes_signer_chain() {
        let dir = tempdir().unwrap();
        let (token, root_pem) = signed_token();
        let path = dir.path().join("policy.jwt");
        fs::write(&path, token).unwrap();
        let chain_path = dir.path().join("chain.pem");

        run(&path, None, None, Some(chain_path.as_path())).unwrap();
        let written = CertificateChain::load(&fs::read(&chain_path).unwrap()).unwrap();
        assert_eq!(written, CertificateChain::load(&root_pem).unwrap());
    }
}
