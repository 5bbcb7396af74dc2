use anyhow::Context;
use lsp_types::{
    DidChangeTextDocumentParams, DidCloseTextDocumentParams, DidOpenTextDocumentParams, Range,
};
use parking_lot::Mutex;
use ropey::Rope;
use std::collections::HashMap;
use tracing::{error, instrument};

/// Mirror of the documents the editor currently has open, kept in sync
/// through the standard text document notifications.
#[derive(Default)]
pub(crate) struct DocumentStore {
    file_map: Mutex<HashMap<String, Rope>>,
}

impl DocumentStore {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    #[instrument(skip(self, params))]
    pub(crate) fn opened_text_document(&self, params: DidOpenTextDocumentParams) {
        self.file_map.lock().insert(
            params.text_document.uri.to_string(),
            Rope::from_str(&params.text_document.text),
        );
    }

    #[instrument(skip(self, params))]
    pub(crate) fn changed_text_document(
        &self,
        params: DidChangeTextDocumentParams,
    ) -> anyhow::Result<()> {
        let uri = params.text_document.uri.to_string();
        let mut file_map = self.file_map.lock();
        let rope = file_map
            .get_mut(&uri)
            .with_context(|| format!("trying to change document that is not open: {uri}"))?;
        for change in params.content_changes {
            // If range is omitted, text is the new text of the document
            if let Some(range) = change.range {
                let start_index = rope.try_line_to_char(range.start.line as usize)?
                    + range.start.character as usize;
                let end_index = rope.try_line_to_char(range.end.line as usize)?
                    + range.end.character as usize;
                rope.try_remove(start_index..end_index)?;
                rope.try_insert(start_index, &change.text)?;
            } else {
                *rope = Rope::from_str(&change.text);
            }
        }
        Ok(())
    }

    #[instrument(skip(self, params))]
    pub(crate) fn closed_text_document(&self, params: DidCloseTextDocumentParams) {
        self.file_map
            .lock()
            .remove(&params.text_document.uri.to_string());
    }

    /// The text covered by `range` in the given document. `None` when the
    /// document is not open; a range outside the document resolves to the
    /// empty string.
    pub(crate) fn selection_text(&self, uri: &str, range: Range) -> Option<String> {
        let file_map = self.file_map.lock();
        let rope = file_map.get(uri)?;
        match range_to_char_indices(rope, range) {
            Ok((start, end)) => Some(rope.slice(start..end).to_string()),
            Err(e) => {
                error!("resolving selection in {uri}: {e}");
                Some(String::new())
            }
        }
    }
}

fn range_to_char_indices(rope: &Rope, range: Range) -> anyhow::Result<(usize, usize)> {
    let start =
        rope.try_line_to_char(range.start.line as usize)? + range.start.character as usize;
    let end = rope.try_line_to_char(range.end.line as usize)? + range.end.character as usize;
    if start > end || end > rope.len_chars() {
        anyhow::bail!("range {range:?} is outside the document");
    }
    Ok((start, end))
}
