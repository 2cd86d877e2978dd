//! Validators for names and identifiers supplied on the command line.

use crate::error::{PolicyError, Result};
use regex::Regex;
use std::sync::OnceLock;
use uuid::Uuid;

/// A regex compiled on first use and shared afterwards.
struct Pattern {
    source: &'static str,
    compiled: OnceLock<std::result::Result<Regex, regex::Error>>,
}

impl Pattern {
    const fn new(source: &'static str) -> Self {
        Self {
            source,
            compiled: OnceLock::new(),
        }
    }

    fn regex(&'static self) -> Result<&'static Regex> {
        self.compiled
            .get_or_init(|| Regex::new(self.source))
            .as_ref()
            .map_err(|e| PolicyError::InvalidInput(format!("bad pattern {}: {e}", self.source)))
    }
}

static STRING_PATTERN: Pattern = Pattern::new(r"^[a-zA-Z0-9_ /.-]*$");
static API_KEY_PATTERN: Pattern = Pattern::new(r"^[a-zA-Z0-9]{30,128}$");
/// 3 to 64 characters, alphanumeric at both ends, `_` or `-` inside.
static POLICY_NAME_PATTERN: Pattern =
    Pattern::new(r"^[a-zA-Z0-9][a-zA-Z0-9_-]{1,62}[a-zA-Z0-9]$");

fn require(pattern: &'static Pattern, value: &str, message: &str) -> Result<()> {
    if pattern.regex()?.is_match(value) {
        Ok(())
    } else {
        Err(PolicyError::InvalidInput(message.to_string()))
    }
}

fn require_non_empty(value: &str, what: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(PolicyError::InvalidInput(format!("{what} cannot be empty")));
    }
    Ok(())
}

pub fn validate_strings<'a>(values: impl IntoIterator<Item = &'a str>) -> Result<()> {
    for value in values {
        require(&STRING_PATTERN, value, "Invalid string formatted input")?;
    }
    Ok(())
}

pub fn validate_api_key(api_key: &str, source: &str) -> Result<()> {
    if api_key.trim().is_empty() {
        return Err(PolicyError::InvalidInput(format!(
            "{source} needs to be set with a proper API key before using the CLI"
        )));
    }
    require(
        &API_KEY_PATTERN,
        api_key,
        "Invalid API key found in configuration. Please update it with a valid API key.",
    )
}

pub fn validate_policy_name(name: &str) -> Result<()> {
    require_non_empty(name, "Policy name")?;
    require(
        &POLICY_NAME_PATTERN,
        name,
        "Policy name should be alphanumeric, at least 3 and at most 64 characters long, \
         with no spaces (use \"_\" or \"-\" as separators)",
    )
}

/// Parse an identifier the service issues as a UUID. Anything else, in
/// particular a path fragment, is refused before it can reach a URL.
pub fn validate_uuid(value: &str, what: &str) -> Result<Uuid> {
    Uuid::parse_str(value.trim())
        .map_err(|e| PolicyError::InvalidInput(format!("{what} {value:?} is not a valid UUID: {e}")))
}
