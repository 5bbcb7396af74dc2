mod lsp;

pub(crate) use lsp::LspEditorHost;

/// The editor capabilities one invocation needs. Implemented over the
/// protocol connection in production and by hand in tests.
#[async_trait::async_trait]
pub(crate) trait EditorHost: Send + Sync {
    /// Text of the active selection. `None` when there is no editing
    /// context to read from.
    fn active_selection(&self) -> Option<String>;

    /// The instruction the user supplied, `None` when they dismissed the
    /// prompt.
    async fn prompt_instruction(&self) -> Option<String>;

    async fn begin_progress(&self, title: &str);

    async fn end_progress(&self);

    /// Hand a finished answer document to the editor for display.
    async fn open_document(&self, content: String);

    async fn show_error(&self, message: &str);

    async fn show_info(&self, message: &str);
}
