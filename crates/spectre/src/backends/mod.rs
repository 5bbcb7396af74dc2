use serde::{Deserialize, Serialize};

mod spectre;

pub(crate) use spectre::Spectre;

/// Body of the chat call: the selected code and the user's instruction.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub(crate) struct QueryRequest {
    pub(crate) code: String,
    pub(crate) instruction: String,
}

#[derive(Debug, Deserialize, Serialize)]
pub(crate) struct QueryResponse {
    pub(crate) response: String,
}

/// The remote service answering (code, instruction) pairs. Opaque
/// text-in/text-out; implementors own transport and serialization.
#[async_trait::async_trait]
pub(crate) trait QueryBackend {
    async fn chat(&self, request: &QueryRequest) -> anyhow::Result<String>;
}
