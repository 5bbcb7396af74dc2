use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::Arc;

use lsp_server::{Connection, Message, RequestId, Response};
use lsp_types::{
    notification::{Notification, Progress, ShowMessage},
    request::{Request, WorkDoneProgressCreate},
    MessageType, NumberOrString, ProgressParams, ProgressParamsValue, ShowMessageParams,
    WorkDoneProgress, WorkDoneProgressBegin, WorkDoneProgressCreateParams, WorkDoneProgressEnd,
};
use parking_lot::Mutex;
use tracing::error;

use crate::custom_requests::ask::{AskParams, AskResult};
use crate::document_store::DocumentStore;
use crate::editor_host::EditorHost;

static NEXT_OUTGOING_REQUEST_ID: AtomicI32 = AtomicI32::new(1);

/// One ask invocation's view of the editor, over the protocol connection.
///
/// The request id is taken by whichever path answers the request first, so
/// an invocation sends exactly one response no matter how it ends. Paths
/// that never answer (the user dismissed the prompt) are completed by
/// [`finish`](Self::finish).
pub(crate) struct LspEditorHost {
    id: Mutex<Option<RequestId>>,
    params: AskParams,
    progress_token: String,
    connection: Arc<Connection>,
    documents: Arc<DocumentStore>,
}

impl LspEditorHost {
    pub(crate) fn new(
        id: RequestId,
        params: AskParams,
        connection: Arc<Connection>,
        documents: Arc<DocumentStore>,
    ) -> Self {
        let progress_token = format!("spectre/{id}");
        Self {
            id: Mutex::new(Some(id)),
            params,
            progress_token,
            connection,
            documents,
        }
    }

    fn send(&self, message: Message) {
        if let Err(e) = self.connection.sender.send(message) {
            error!("sending message to editor: {e}");
        }
    }

    fn notify<N: Notification>(&self, params: N::Params) {
        self.send(Message::Notification(lsp_server::Notification::new(
            N::METHOD.to_string(),
            params,
        )));
    }

    fn respond(&self, build: impl FnOnce(RequestId) -> Response) {
        if let Some(id) = self.id.lock().take() {
            self.send(Message::Response(build(id)));
        }
    }

    /// Complete the request with an empty result if nothing else answered
    /// it. Called once the invocation has run its course.
    pub(crate) fn finish(&self) {
        self.respond(|id| Response::new_ok(id, AskResult { content: None }));
    }

    fn send_progress(&self, progress: WorkDoneProgress) {
        self.notify::<Progress>(ProgressParams {
            token: NumberOrString::String(self.progress_token.clone()),
            value: ProgressParamsValue::WorkDone(progress),
        });
    }

    fn show_message(&self, typ: MessageType, message: &str) {
        self.notify::<ShowMessage>(ShowMessageParams {
            typ,
            message: message.to_string(),
        });
    }
}

#[async_trait::async_trait]
impl EditorHost for LspEditorHost {
    fn active_selection(&self) -> Option<String> {
        self.documents.selection_text(
            &self.params.text_document.uri.to_string(),
            self.params.range,
        )
    }

    async fn prompt_instruction(&self) -> Option<String> {
        // The editor shim already ran the input box and forwarded the
        // outcome in the request params
        self.params.instruction.clone()
    }

    async fn begin_progress(&self, title: &str) {
        let id = NEXT_OUTGOING_REQUEST_ID.fetch_add(1, Ordering::SeqCst);
        self.send(Message::Request(lsp_server::Request::new(
            RequestId::from(id),
            WorkDoneProgressCreate::METHOD.to_string(),
            WorkDoneProgressCreateParams {
                token: NumberOrString::String(self.progress_token.clone()),
            },
        )));
        self.send_progress(WorkDoneProgress::Begin(WorkDoneProgressBegin {
            title: title.to_string(),
            cancellable: Some(false),
            message: None,
            percentage: None,
        }));
    }

    async fn end_progress(&self) {
        self.send_progress(WorkDoneProgress::End(WorkDoneProgressEnd { message: None }));
    }

    async fn open_document(&self, content: String) {
        self.respond(|id| {
            Response::new_ok(
                id,
                AskResult {
                    content: Some(content),
                },
            )
        });
    }

    async fn show_error(&self, message: &str) {
        self.show_message(MessageType::ERROR, message);
        self.respond(|id| Response::new_err(id, -32603, message.to_string()));
    }

    async fn show_info(&self, message: &str) {
        self.show_message(MessageType::INFO, message);
    }
}
