//! Blocking client for the policy management REST API.

use crate::config::CliConfig;
use crate::constants::{
    HTTP_HEADER_KEY_ACCEPT, HTTP_HEADER_KEY_API_KEY, HTTP_HEADER_KEY_CONTENT_TYPE,
    HTTP_MEDIA_TYPE_JSON, PMS_BASE_URL, POLICY_API_ENDPOINT,
};
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Body of a policy creation request.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct CreatePolicy {
    pub policy_name: String,
    pub policy_type: String,
    pub attestation_type: String,
    /// Raw policy text, or a signed token when `signed` is set.
    pub policy: String,
    pub signed: bool,
}

/// Policy as returned by the service. Unknown fields are ignored.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PolicyRecord {
    #[serde(default)]
    pub policy_id: Option<String>,
    #[serde(default)]
    pub policy_name: Option<String>,
    #[serde(default)]
    pub policy_type: Option<String>,
    #[serde(default)]
    pub attestation_type: Option<String>,
    #[serde(default)]
    pub policy: Option<String>,
}

pub struct PolicyClient {
    agent: ureq::Agent,
    base_url: String,
    api_key: String,
}

impl PolicyClient {
    pub fn new(base_url: &str, api_key: String, timeout: std::time::Duration) -> Self {
        let agent = ureq::AgentBuilder::new().timeout(timeout).build();
        Self {
            agent,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        }
    }

    pub fn from_config(config: &CliConfig) -> Result<Self> {
        let base_url = config.base_url()?;
        tracing::debug!(base_url, tenant = ?config.tenant_id, "policy service client");
        Ok(Self::new(base_url, config.api_key()?, config.timeout()))
    }

    fn policies_url(&self) -> String {
        format!("{}{}{}", self.base_url, PMS_BASE_URL, POLICY_API_ENDPOINT)
    }

    fn request(&self, method: &str, url: &str) -> ureq::Request {
        self.agent
            .request(method, url)
            .set(HTTP_HEADER_KEY_ACCEPT, HTTP_MEDIA_TYPE_JSON)
            .set(HTTP_HEADER_KEY_API_KEY, &self.api_key)
    }

    pub fn create_policy(&self, body: &CreatePolicy) -> Result<PolicyRecord> {
        let url = self.policies_url();
        tracing::info!(url = %url, policy_name = %body.policy_name, signed = body.signed, "creating policy");
        let response = self
            .request("POST", &url)
            .set(HTTP_HEADER_KEY_CONTENT_TYPE, HTTP_MEDIA_TYPE_JSON)
            .send_json(body)
            .map_err(describe_error)
            .context("Failed to create policy")?;
        response
            .into_json()
            .context("Failed to decode create policy response")
    }

    pub fn get_policy(&self, policy_id: &Uuid) -> Result<PolicyRecord> {
        let url = format!("{}/{}", self.policies_url(), policy_id);
        tracing::info!(url = %url, "fetching policy");
        let response = self
            .request("GET", &url)
            .call()
            .map_err(describe_error)
            .context("Failed to fetch policy")?;
        response
            .into_json()
            .context("Failed to decode policy response")
    }
}

fn describe_error(error: ureq::Error) -> anyhow::Error {
    match error {
        ureq::Error::Status(code, response) => {
            let body = response.into_string().unwrap_or_default();
            anyhow!("server returned {}: {}", code, body.trim())
        }
        ureq::Error::Transport(transport) => anyhow!("transport error: {}", transport),
    }
}
