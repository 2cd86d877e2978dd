//! Fixed names, limits and endpoints shared across the CLI.

// Signing algorithms accepted by the policy service.
pub const PS256: &str = "PS256";
pub const PS384: &str = "PS384";
pub const RS256: &str = "RS256";
pub const RS384: &str = "RS384";

pub const HASH_SIZE_256: &str = "256";
pub const HASH_SIZE_384: &str = "384";

// PEM labels.
pub const CERT_TYPE: &str = "CERTIFICATE";
pub const PRIVATE_KEY_SUFFIX: &str = "PRIVATE KEY";
pub const ENCRYPTED_PRIVATE_KEY_TYPE: &str = "ENCRYPTED PRIVATE KEY";

/// Token header field carrying the base64 DER certificate chain.
pub const KEY_HEADER: &str = "x5c";

/// Smallest RSA modulus accepted for signing.
pub const MIN_RSA_KEY_BITS: u32 = 2048;

pub const MAX_POLICY_FILE_SIZE: u64 = 10 * 1024;
pub const MAX_KEY_FILE_SIZE: u64 = 64 * 1024;
pub const MAX_CERT_FILE_SIZE: u64 = 64 * 1024;
pub const MAX_TOKEN_FILE_SIZE: u64 = 64 * 1024;
pub const MAX_CONFIG_FILE_SIZE: u64 = 64 * 1024;

// Configuration.
pub const DEFAULT_CONFIG_FILE_PATH: &str = "/etc/tac/config.toml";
pub const CONFIG_PATH_ENV_VAR: &str = "TENANTCTL_CONFIG";
pub const API_KEY_ENV_VAR: &str = "TRUST_AUTHORITY_API_KEY";
pub const DEFAULT_LOG_LEVEL: &str = "info";
pub const DEFAULT_HTTP_CLIENT_TIMEOUT: u64 = 10;

// CLI parameter names.
pub const POLICY_FILE_PARAM_NAME: &str = "policy-file";
pub const PRIVATE_KEY_FILE_PARAM_NAME: &str = "privkeyfile";
pub const CERTIFICATE_FILE_PARAM_NAME: &str = "certfile";
pub const ALGORITHM_PARAM_NAME: &str = "algorithm";

// HTTP.
pub const HTTP_MEDIA_TYPE_JSON: &str = "application/json";
pub const HTTP_HEADER_KEY_CONTENT_TYPE: &str = "Content-Type";
pub const HTTP_HEADER_KEY_ACCEPT: &str = "Accept";
pub const HTTP_HEADER_KEY_API_KEY: &str = "X-API-KEY";

pub const PMS_BASE_URL: &str = "/management/v1";
pub const POLICY_API_ENDPOINT: &str = "/policies";
