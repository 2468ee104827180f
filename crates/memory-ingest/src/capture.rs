//! Shell output capture.
//!
//! Given a command line that has already run, find the file its stdout was
//! redirected into (`cmd > file`, `cmd >> file`) so that file can be
//! indexed. Nothing is executed here.

use std::path::{Path, PathBuf};

use memory_embeddings::EmbeddingModel;
use memory_vector::{InsertOutcome, StoreHandle};
use tracing::debug;

use crate::bootstrap::index_file;
use crate::error::IngestError;

/// Target of the last stdout redirect in `command`, if any.
///
/// Recognizes `>`, `>>`, `1>`, `1>>` as separate tokens or glued to the
/// file name. Stderr redirects (`2>`) and fd duplications (`>&2`) are
/// ignored. Surrounding quotes are stripped from the target.
pub fn capture_redirect_target(command: &str) -> Option<PathBuf> {
    let mut tokens = command.split_whitespace();
    let mut target = None;

    while let Some(token) = tokens.next() {
        let rest = token.strip_prefix('1').unwrap_or(token);
        let Some(rest) = rest
            .strip_prefix(">>")
            .or_else(|| rest.strip_prefix('>'))
        else {
            continue;
        };
        if rest.starts_with('&') {
            continue;
        }
        let file = if rest.is_empty() { tokens.next() } else { Some(rest) };
        if let Some(file) = file.map(unquote).filter(|f| !f.is_empty()) {
            target = Some(PathBuf::from(file));
        }
    }
    target
}

fn unquote(token: &str) -> &str {
    token.trim_matches(|c| c == '\'' || c == '"')
}

/// Index the redirect target of `command`, resolved against `cwd`.
///
/// Returns `Ok(None)` when the command has no redirect or the target does
/// not exist.
pub fn index_redirect_target<E>(
    handle: &StoreHandle,
    embedder: &E,
    command: &str,
    cwd: &Path,
    snippet_chars: usize,
) -> Result<Option<InsertOutcome>, IngestError>
where
    E: EmbeddingModel + ?Sized,
{
    let Some(target) = capture_redirect_target(command) else {
        return Ok(None);
    };
    let path = cwd.join(target);
    if !path.is_file() {
        debug!(path = ?path, "Redirect target not found");
        return Ok(None);
    }
    index_file(handle, embedder, &path, snippet_chars).map(Some)
}
