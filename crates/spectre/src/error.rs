// User-facing messages match the Engram Spectre editor extension.
#[derive(thiserror::Error, Debug)]
pub(crate) enum InvokeError {
    #[error("No active editor found! Spectre cannot see.")]
    NoContext,
    #[error("Please select some code first.")]
    EmptySelection,
    #[error("Ghost died: {0}")]
    Remote(#[source] anyhow::Error),
}

pub(crate) type Result<T> = std::result::Result<T, InvokeError>;
