use anyhow::Result;
use clap::Parser;
use directories::BaseDirs;
use lsp_server::{Connection, ExtractError, Message, Notification, Request, RequestId};
use lsp_types::{
    DidChangeTextDocumentParams, DidCloseTextDocumentParams, DidOpenTextDocumentParams,
    ServerCapabilities, TextDocumentSyncKind,
};
use std::sync::Mutex;
use std::{
    fs,
    path::Path,
    sync::{mpsc, Arc},
    thread,
};
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

mod backends;
mod config;
mod custom_requests;
mod document_store;
mod editor_host;
mod error;
mod query_worker;
mod utils;

use backends::QueryBackend;
use config::Config;
use custom_requests::ask::Ask;
use document_store::DocumentStore;
use query_worker::{AskRequest, WorkerRequest};

fn notification_is<N: lsp_types::notification::Notification>(notification: &Notification) -> bool {
    notification.method == N::METHOD
}

fn request_is<R: lsp_types::request::Request>(request: &Request) -> bool {
    request.method == R::METHOD
}

fn cast<R>(req: Request) -> Result<(RequestId, R::Params), ExtractError<Request>>
where
    R: lsp_types::request::Request,
    R::Params: serde::de::DeserializeOwned,
{
    req.extract(R::METHOD)
}

// Spectre parameters
#[derive(Parser)]
#[command(version)]
struct Args {
    // Whether to use a custom log file
    #[arg(long, default_value_t = false)]
    use_separate_log_file: bool,
}

fn create_log_file(base_path: &Path) -> anyhow::Result<fs::File> {
    let dir_path = base_path.join("spectre");
    fs::create_dir_all(&dir_path)?;
    let file_path = dir_path.join("spectre.log");
    Ok(fs::File::create(file_path)?)
}

// Builds a tracing subscriber from the `SPECTRE_LOG` environment variable
// If the variables value is malformed or missing, sets the default log level to ERROR
fn init_logger(args: &Args) {
    let builder = FmtSubscriber::builder().with_env_filter(EnvFilter::from_env("SPECTRE_LOG"));
    let base_dirs = BaseDirs::new();

    if args.use_separate_log_file && base_dirs.is_some() {
        let base_dirs = base_dirs.unwrap();
        let cache_dir = base_dirs.cache_dir();
        // Linux:   /home/alice/.cache
        // Windows: C:\Users\Alice\AppData\Local
        // macOS:   /Users/Alice/Library/Caches
        match create_log_file(cache_dir) {
            Ok(log_file) => builder.with_writer(Mutex::new(log_file)).init(),
            Err(e) => {
                eprintln!("creating log file: {e:?} - falling back to stderr");
                builder
                    .with_writer(std::io::stderr)
                    .without_time()
                    .with_ansi(false)
                    .init()
            }
        }
    } else {
        builder
            .with_writer(std::io::stderr)
            .without_time()
            .with_ansi(false)
            .init()
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logger(&args);
    info!("spectre logger initialized starting server");

    let (connection, io_threads) = Connection::stdio();
    let server_capabilities = serde_json::to_value(ServerCapabilities {
        text_document_sync: Some(lsp_types::TextDocumentSyncCapability::Kind(
            TextDocumentSyncKind::INCREMENTAL,
        )),
        ..Default::default()
    })?;
    let initialization_args = connection.initialize(server_capabilities)?;

    main_loop(connection, initialization_args)?;
    io_threads.join()?;
    Ok(())
}

fn main_loop(connection: Connection, args: serde_json::Value) -> Result<()> {
    // Build our configuration
    let config = Config::new(args)?;

    // Wrap the connection for sharing between threads
    let connection = Arc::new(connection);

    // Documents the editor has open, used to resolve selections
    let documents = Arc::new(DocumentStore::new());

    // Our channel we use to communicate with our query worker
    let (query_tx, query_rx) = mpsc::channel();

    // Setup the query worker
    let backend: Box<dyn QueryBackend + Send + Sync> =
        Box::new(backends::Spectre::new(config.config.spectre.clone())?);
    let thread_connection = connection.clone();
    let thread_documents = documents.clone();
    thread::spawn(move || query_worker::run(backend, thread_documents, query_rx, thread_connection));

    for msg in &connection.receiver {
        match msg {
            Message::Request(req) => {
                if connection.handle_shutdown(&req)? {
                    return Ok(());
                }
                if request_is::<Ask>(&req) {
                    match cast::<Ask>(req) {
                        Ok((id, params)) => {
                            query_tx.send(WorkerRequest::Ask(AskRequest::new(id, params)))?;
                        }
                        Err(err) => error!("{err:?}"),
                    }
                } else {
                    error!("Unsupported command - see the README for a list of supported commands")
                }
            }
            Message::Notification(not) => {
                if notification_is::<lsp_types::notification::DidOpenTextDocument>(&not) {
                    let params: DidOpenTextDocumentParams = serde_json::from_value(not.params)?;
                    documents.opened_text_document(params);
                } else if notification_is::<lsp_types::notification::DidChangeTextDocument>(&not) {
                    let params: DidChangeTextDocumentParams = serde_json::from_value(not.params)?;
                    if let Err(e) = documents.changed_text_document(params) {
                        error!("{e:?}")
                    }
                } else if notification_is::<lsp_types::notification::DidCloseTextDocument>(&not) {
                    let params: DidCloseTextDocumentParams = serde_json::from_value(not.params)?;
                    documents.closed_text_document(params);
                }
            }
            // Replies to our own window/workDoneProgress/create requests
            Message::Response(_) => (),
        }
    }
    Ok(())
}
