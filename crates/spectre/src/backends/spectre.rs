use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{info, instrument};

use crate::config;

use super::{QueryBackend, QueryRequest, QueryResponse};

pub(crate) struct Spectre {
    config: config::Spectre,
    client: reqwest::Client,
}

#[derive(Deserialize, Serialize)]
struct ChatError {
    detail: Value,
}

#[derive(Deserialize, Serialize)]
#[serde(untagged)]
enum ChatResponse {
    Success(QueryResponse),
    Error(ChatError),
    Other(HashMap<String, Value>),
}

impl Spectre {
    pub(crate) fn new(config: config::Spectre) -> anyhow::Result<Self> {
        // The timeout lives on the client, so build it once up front
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout))
            .build()?;
        Ok(Self { config, client })
    }

    fn get_token(&self) -> anyhow::Result<Option<String>> {
        if let Some(env_var_name) = &self.config.auth_token_env_var_name {
            Ok(Some(std::env::var(env_var_name)?))
        } else {
            Ok(self.config.auth_token.clone())
        }
    }

    async fn get_chat(&self, request: &QueryRequest) -> anyhow::Result<String> {
        let params = json!({
            "code": request.code,
            "instruction": request.instruction
        });
        info!(
            "Calling Spectre chat API with parameters:\n{}",
            serde_json::to_string_pretty(&params).unwrap()
        );
        let mut req = self
            .client
            .post(&self.config.chat_endpoint)
            .header("Content-Type", "application/json")
            .header("Accept", "application/json")
            .json(&params);
        if let Some(token) = self.get_token()? {
            req = req.bearer_auth(token);
        }
        let res: ChatResponse = req.send().await?.json().await?;
        info!(
            "Response from Spectre chat API:\n{}",
            serde_json::to_string_pretty(&res).unwrap()
        );
        match res {
            ChatResponse::Success(resp) => Ok(resp.response),
            ChatResponse::Error(error) => {
                anyhow::bail!("making Spectre request: {}", error.detail.to_string())
            }
            ChatResponse::Other(other) => {
                anyhow::bail!("unknown response while making Spectre request: {other:?}")
            }
        }
    }
}

#[async_trait::async_trait]
impl QueryBackend for Spectre {
    #[instrument(skip(self))]
    async fn chat(&self, request: &QueryRequest) -> anyhow::Result<String> {
        self.get_chat(request).await
    }
}
