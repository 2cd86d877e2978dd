//! `create policy` and `get policy`: submit policies to, and fetch them from,
//! the policy management service.

use crate::api_client::{CreatePolicy, PolicyClient};
use crate::config::CliConfig;
use crate::constants::{
    ALGORITHM_PARAM_NAME, CERTIFICATE_FILE_PARAM_NAME, MAX_POLICY_FILE_SIZE,
    PRIVATE_KEY_FILE_PARAM_NAME,
};
use crate::path_guard;
use crate::sign;
use crate::validation;
use anyhow::{anyhow, Context};
use std::path::{Path, PathBuf};

/// Signing material for `--sign`.
#[derive(Debug, Clone, Default)]
pub struct SignOptions {
    pub sign: bool,
    pub private_key_file: Option<PathBuf>,
    pub cert_file: Option<PathBuf>,
    pub algorithm: Option<String>,
}

pub struct CreatePolicyArgs<'a> {
    pub policy_name: &'a str,
    pub policy_type: &'a str,
    pub attestation_type: &'a str,
    pub policy_file: &'a Path,
    pub signing: SignOptions,
}

fn required<'a, T: ?Sized>(value: Option<&'a T>, flag: &str) -> anyhow::Result<&'a T> {
    value.ok_or_else(|| anyhow!("--{} is required with --sign", flag))
}

/// Validate arguments and produce the request body, signing the policy
/// when asked to.
pub fn build_request(args: &CreatePolicyArgs<'_>) -> anyhow::Result<CreatePolicy> {
    validation::validate_policy_name(args.policy_name)?;
    validation::validate_strings([args.policy_type, args.attestation_type])?;

    let policy = if args.signing.sign {
        let key = required(args.signing.private_key_file.as_deref(), PRIVATE_KEY_FILE_PARAM_NAME)?;
        let cert = required(args.signing.cert_file.as_deref(), CERTIFICATE_FILE_PARAM_NAME)?;
        let alg = required(args.signing.algorithm.as_deref(), ALGORITHM_PARAM_NAME)?;
        sign::sign_policy_file(args.policy_file, key, cert, alg)?.into_string()
    } else {
        let bytes = path_guard::validate(args.policy_file, MAX_POLICY_FILE_SIZE)?.read()?;
        String::from_utf8(bytes).with_context(|| {
            format!("Policy file {} is not UTF-8", args.policy_file.display())
        })?
    };

    Ok(CreatePolicy {
        policy_name: args.policy_name.to_string(),
        policy_type: args.policy_type.to_string(),
        attestation_type: args.attestation_type.to_string(),
        policy,
        signed: args.signing.sign,
    })
}

pub fn create(config: &CliConfig, args: &CreatePolicyArgs<'_>) -> anyhow::Result<()> {
    let body = build_request(args)?;
    let client = PolicyClient::from_config(config)?;
    let created = client.create_policy(&body)?;
    println!("{}", serde_json::to_string_pretty(&created)?);
    Ok(())
}

pub fn get(config: &CliConfig, policy_id: &str) -> anyhow::Result<()> {
    let policy_id = validation::validate_uuid(policy_id, "Policy id")?;
    let client = PolicyClient::from_config(config)?;
    let policy = client.get_policy(&policy_id)?;
    println!("{}", serde_json::to_string_pretty(&policy)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::RS256;
    use crate::error::PolicyError;
    use crate::test_support::{cert_pem, key_pem, rsa_key, self_signed};
    use crate::token_verify;
    use std::fs;
    use tempfile::tempdir;

    fn args<'a>(policy_file: &'a Path, signing: SignOptions) -> CreatePolicyArgs<'a> {
        CreatePolicyArgs {
            policy_name: "allow-all",
            policy_type: "Appraisal",
            attestation_type: "SGX",
            policy_file,
            signing,
        }
    }

    #[test]
    fn test_unsigned_request_carries_raw_policy() {
        let dir = tempdir().unwrap();
        let policy = dir.path().join("policy.rego");
        fs::write(&policy, "default allow = true").unwrap();

        let body = build_request(&args(&policy, SignOptions::default())).unwrap();
        assert_eq!(body.policy, "default allow = true");
        assert!(!body.signed);
    }

    #[test]
    fn test_signed_request_carries_token() {
        let dir = tempdir().unwrap();
        let policy = dir.path().join("policy.rego");
        let key = dir.path().join("signer.key");
        let cert = dir.path().join("signer.pem");
        fs::write(&policy, "default allow = false").unwrap();
        fs::write(&key, key_pem(rsa_key())).unwrap();
        fs::write(&cert, cert_pem(&self_signed(rsa_key(), "signer"))).unwrap();

        let signing = SignOptions {
            sign: true,
            private_key_file: Some(key),
            cert_file: Some(cert),
            algorithm: Some(RS256.to_string()),
        };
        let body = build_request(&args(&policy, signing)).unwrap();
        assert!(body.signed);
        let verified = token_verify::verify(&body.policy).unwrap();
        assert_eq!(verified.payload, b"default allow = false");
    }

    #[test]
    fn test_sign_without_key_is_rejected() {
        let dir = tempdir().unwrap();
        let policy = dir.path().join("policy.rego");
        fs::write(&policy, "x").unwrap();

        let signing = SignOptions {
            sign: true,
            ..SignOptions::default()
        };
        let err = build_request(&args(&policy, signing)).unwrap_err();
        assert!(err.to_string().contains(PRIVATE_KEY_FILE_PARAM_NAME));
    }

    #[test]
    fn test_get_refuses_path_like_policy_id() {
        let config = CliConfig {
            trust_authority_base_url: Some("http://127.0.0.1:1".to_string()),
            api_key: Some("k".repeat(30)),
            ..CliConfig::default()
        };
        for policy_id in ["../x", "../../v1/users"] {
            let err = get(&config, policy_id).unwrap_err();
            assert!(
                matches!(
                    err.downcast_ref::<PolicyError>(),
                    Some(PolicyError::InvalidInput(_))
                ),
                "{policy_id}: {err:#}"
            );
        }
    }

    #[test]
    fn test_bad_policy_name_is_rejected() {
        let dir = tempdir().unwrap();
        let policy = dir.path().join("policy.rego");
        fs::write(&policy, "x").unwrap();

        let mut request = args(&policy, SignOptions::default());
        request.policy_name = "no spaces allowed";
        assert!(build_request(&request).is_err());
    }
}
