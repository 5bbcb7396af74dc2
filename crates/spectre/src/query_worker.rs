use std::sync::mpsc::Receiver;
use std::sync::Arc;

use lsp_server::{Connection, RequestId};
use tracing::{error, instrument};

use crate::backends::{QueryBackend, QueryRequest};
use crate::custom_requests::ask::AskParams;
use crate::document_store::DocumentStore;
use crate::editor_host::{EditorHost, LspEditorHost};
use crate::error::{InvokeError, Result};
use crate::utils::TOKIO_RUNTIME;

// Prepended to every answer document, as the original extension did
pub(crate) const ANSWER_HEADER: &str = "// Spectre ANSWER:\n\n";

pub(crate) const PROGRESS_TITLE: &str = "Spectre is thinking...";

#[derive(Clone, Debug)]
pub(crate) struct AskRequest {
    id: RequestId,
    params: AskParams,
}

impl AskRequest {
    pub(crate) fn new(id: RequestId, params: AskParams) -> Self {
        Self { id, params }
    }
}

#[derive(Clone, Debug)]
pub(crate) enum WorkerRequest {
    Ask(AskRequest),
}

#[derive(Debug)]
enum QueryOutcome {
    Rendered,
    Cancelled,
}

pub(crate) fn run(
    backend: Box<dyn QueryBackend + Send + Sync>,
    documents: Arc<DocumentStore>,
    worker_rx: Receiver<WorkerRequest>,
    connection: Arc<Connection>,
) {
    if let Err(e) = do_run(backend, documents, worker_rx, connection) {
        error!("error in query worker: {e}")
    }
}

fn do_run(
    backend: Box<dyn QueryBackend + Send + Sync>,
    documents: Arc<DocumentStore>,
    worker_rx: Receiver<WorkerRequest>,
    connection: Arc<Connection>,
) -> anyhow::Result<()> {
    let backend = Arc::new(backend);
    loop {
        let request = worker_rx
            .recv()
            .map_err(|_| anyhow::anyhow!("channel disconnected"))?;
        // Every invocation is its own task; nothing throttles or orders them
        match request {
            WorkerRequest::Ask(request) => {
                let task_connection = connection.clone();
                let task_documents = documents.clone();
                let task_backend = backend.clone();
                TOKIO_RUNTIME.spawn(async move {
                    dispatch_request(request, task_connection, task_documents, task_backend).await;
                });
            }
        }
    }
}

#[instrument(skip(connection, documents, backend))]
async fn dispatch_request(
    request: AskRequest,
    connection: Arc<Connection>,
    documents: Arc<DocumentStore>,
    backend: Arc<Box<dyn QueryBackend + Send + Sync>>,
) {
    let host = LspEditorHost::new(request.id, request.params, connection, documents);
    invoke(&host, backend.as_ref().as_ref()).await;
    host.finish();
}

/// One full invocation: read the selection, collect the instruction, call
/// the remote service, hand the answer document to the editor. Every
/// failure is surfaced to the user exactly once; a dismissed prompt is a
/// silent exit, not a failure.
pub(crate) async fn invoke(host: &dyn EditorHost, backend: &(dyn QueryBackend + Send + Sync)) {
    match run_query(host, backend).await {
        Ok(_) => (),
        Err(e @ InvokeError::EmptySelection) => host.show_info(&e.to_string()).await,
        Err(e) => host.show_error(&e.to_string()).await,
    }
}

async fn run_query(
    host: &dyn EditorHost,
    backend: &(dyn QueryBackend + Send + Sync),
) -> Result<QueryOutcome> {
    let code = host.active_selection().ok_or(InvokeError::NoContext)?;
    if code.is_empty() {
        return Err(InvokeError::EmptySelection);
    }
    let instruction = match host.prompt_instruction().await {
        Some(instruction) if !instruction.is_empty() => instruction,
        _ => return Ok(QueryOutcome::Cancelled),
    };
    host.begin_progress(PROGRESS_TITLE).await;
    let answer = backend.chat(&QueryRequest { code, instruction }).await;
    host.end_progress().await;
    let answer = answer.map_err(InvokeError::Remote)?;
    host.open_document(format!("{ANSWER_HEADER}{answer}")).await;
    Ok(QueryOutcome::Rendered)
}
