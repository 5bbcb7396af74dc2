use lsp_types::{Range, TextDocumentIdentifier};
use serde::{Deserialize, Serialize};

pub(crate) enum Ask {}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct AskParams {
    pub(crate) text_document: TextDocumentIdentifier,
    // The selected range in the document
    pub(crate) range: Range,
    // The instruction the editor collected from the user. Absent or empty
    // when the user dismissed the prompt
    #[serde(default)]
    pub(crate) instruction: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct AskResult {
    // None when the invocation ended without an answer (user cancelled)
    pub(crate) content: Option<String>,
}

impl lsp_types::request::Request for Ask {
    type Params = AskParams;
    type Result = AskResult;
    const METHOD: &'static str = "textDocument/ask";
}
