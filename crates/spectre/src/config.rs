use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::Value;

const fn request_timeout_default() -> u64 {
    30
}

fn chat_endpoint_default() -> String {
    "http://localhost:8000/api/spectre/chat".to_string()
}

#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct Spectre {
    // The chat endpoint
    #[serde(default = "chat_endpoint_default")]
    pub(crate) chat_endpoint: String,
    // Seconds to wait for the remote call before giving up
    #[serde(default = "request_timeout_default")]
    pub(crate) request_timeout: u64,
    // The auth token env var name
    pub(crate) auth_token_env_var_name: Option<String>,
    // The auth token
    pub(crate) auth_token: Option<String>,
}

impl Default for Spectre {
    fn default() -> Self {
        Self {
            chat_endpoint: chat_endpoint_default(),
            request_timeout: request_timeout_default(),
            auth_token_env_var_name: None,
            auth_token: None,
        }
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct ValidConfig {
    #[serde(default)]
    pub(crate) spectre: Spectre,
}

#[derive(Clone, Debug)]
pub(crate) struct Config {
    pub(crate) config: ValidConfig,
}

impl Config {
    pub(crate) fn new(mut args: Value) -> Result<Self> {
        let configuration_args = args
            .as_object_mut()
            .context("Server configuration must be a JSON object")?
            .remove("initializationOptions");
        // The chat endpoint has a well-known default, so running without any
        // configuration is valid
        let valid_args = match configuration_args {
            Some(Value::Null) | None => ValidConfig::default(),
            Some(configuration_args) => serde_json::from_value(configuration_args)?,
        };
        Ok(Self { config: valid_args })
    }
}
