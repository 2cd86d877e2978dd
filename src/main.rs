//! tenantctl: admin CLI for the trust authority, with policy signing and
//! verification.

mod algorithm;
mod api_client;
mod cert_chain;
mod config;
mod constants;
mod error;
mod key_loader;
mod path_guard;
mod pem_blocks;
mod policy_cmd;
mod sign;
mod token;
mod token_verify;
mod trust;
mod validation;
mod verify;

#[cfg(test)]
mod test_support;

use clap::{Parser, Subcommand};
use config::CliConfig;
use constants::{
    ALGORITHM_PARAM_NAME, CERTIFICATE_FILE_PARAM_NAME, DEFAULT_LOG_LEVEL, POLICY_FILE_PARAM_NAME,
    PRIVATE_KEY_FILE_PARAM_NAME,
};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "tenantctl")]
#[command(about = "Trust authority admin CLI: sign, verify and manage attestation policies")]
struct Cli {
    /// Path to config.toml for the service commands (default:
    /// $TENANTCTL_CONFIG or /etc/tac/config.toml).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign a policy file into a compact token with an x5c certificate chain.
    Sign {
        #[arg(long = POLICY_FILE_PARAM_NAME, short = 'p')]
        policy_file: PathBuf,

        /// PEM private key (PKCS#8 or PKCS#1).
        #[arg(long = PRIVATE_KEY_FILE_PARAM_NAME, short = 'k')]
        private_key_file: PathBuf,

        /// PEM certificate chain, leaf first.
        #[arg(long = CERTIFICATE_FILE_PARAM_NAME, short = 'c')]
        cert_file: PathBuf,

        /// One of PS256, PS384, RS256, RS384.
        #[arg(long = ALGORITHM_PARAM_NAME, short = 'a')]
        algorithm: String,

        /// Write a JSON envelope here instead of printing the token.
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Verify a signed policy token (bare or JSON envelope).
    Verify {
        #[arg(long, short = 't')]
        token_file: PathBuf,

        /// PEM root(s) the chain must end at.
        #[arg(long)]
        trusted_root: Option<PathBuf>,

        /// JSON trust rules (allowed algorithms and trusted roots).
        #[arg(long)]
        trust_rules: Option<PathBuf>,

        /// Write the verified signer chain here as PEM.
        #[arg(long)]
        chain_out: Option<PathBuf>,
    },

    /// Create resources on the policy management service.
    Create {
        #[command(subcommand)]
        resource: CreateResource,
    },

    /// Fetch resources from the policy management service.
    Get {
        #[command(subcommand)]
        resource: GetResource,
    },
}

#[derive(Subcommand)]
enum CreateResource {
    Policy {
        #[arg(long, short = 'n')]
        policy_name: String,

        #[arg(long, short = 't')]
        policy_type: String,

        #[arg(long, short = 'a')]
        attestation_type: String,

        #[arg(long = POLICY_FILE_PARAM_NAME, short = 'f')]
        policy_file: PathBuf,

        /// Sign the policy before uploading it.
        #[arg(long, short = 's')]
        sign: bool,

        #[arg(long = PRIVATE_KEY_FILE_PARAM_NAME, short = 'k')]
        private_key_file: Option<PathBuf>,

        #[arg(long = CERTIFICATE_FILE_PARAM_NAME, short = 'c')]
        cert_file: Option<PathBuf>,

        #[arg(long = ALGORITHM_PARAM_NAME, short = 'g')]
        algorithm: Option<String>,
    },
}

#[derive(Subcommand)]
enum GetResource {
    Policy {
        #[arg(long, short = 'i')]
        policy_id: String,
    },
}

/// `RUST_LOG` wins over `level`. A subscriber that is already installed is
/// left in place.
fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Config is only needed to reach the policy service.
fn service_config(path: Option<&Path>) -> anyhow::Result<CliConfig> {
    let config = CliConfig::load(path)?;
    init_logging(&config.log_level);
    Ok(config)
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let Cli {
        config: config_path,
        command,
    } = cli;

    match command {
        Commands::Sign {
            policy_file,
            private_key_file,
            cert_file,
            algorithm,
            out,
        } => {
            init_logging(DEFAULT_LOG_LEVEL);
            sign::run(
                &policy_file,
                &private_key_file,
                &cert_file,
                &algorithm,
                out.as_deref(),
            )?;
        }
        Commands::Verify {
            token_file,
            trusted_root,
            trust_rules,
            chain_out,
        } => {
            init_logging(DEFAULT_LOG_LEVEL);
            verify::run(
                &token_file,
                trusted_root.as_deref(),
                trust_rules.as_deref(),
                chain_out.as_deref(),
            )?;
        }
        Commands::Create {
            resource:
                CreateResource::Policy {
                    policy_name,
                    policy_type,
                    attestation_type,
                    policy_file,
                    sign,
                    private_key_file,
                    cert_file,
                    algorithm,
                },
        } => {
            let config = service_config(config_path.as_deref())?;
            let args = policy_cmd::CreatePolicyArgs {
                policy_name: &policy_name,
                policy_type: &policy_type,
                attestation_type: &attestation_type,
                policy_file: &policy_file,
                signing: policy_cmd::SignOptions {
                    sign,
                    private_key_file,
                    cert_file,
                    algorithm,
                },
            };
            policy_cmd::create(&config, &args)?;
        }
        Commands::Get {
            resource: GetResource::Policy { policy_id },
        } => {
            let config = service_config(config_path.as_deref())?;
            policy_cmd::get(&config, &policy_id)?;
        }
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    run(Cli::parse())
}
