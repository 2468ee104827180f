//! File summaries built from the first characters of a file.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::error::IngestError;

// Longest UTF-8 encoding of one char
const MAX_CHAR_BYTES: usize = 4;

/// Read up to `max_chars` characters from the start of a file.
///
/// Content containing NUL bytes or invalid UTF-8 is reported as
/// [`IngestError::Binary`]. A multi-byte character cut by the read limit
/// is dropped rather than treated as invalid.
pub fn read_snippet(path: &Path, max_chars: usize) -> Result<String, IngestError> {
    let read_err = |source| IngestError::Read {
        path: path.to_path_buf(),
        source,
    };

    let file = File::open(path).map_err(read_err)?;
    if !file.metadata().map_err(read_err)?.is_file() {
        return Err(IngestError::NotAFile(path.to_path_buf()));
    }

    let limit = max_chars.saturating_mul(MAX_CHAR_BYTES) as u64;
    let mut bytes = Vec::new();
    file.take(limit).read_to_end(&mut bytes).map_err(read_err)?;

    if bytes.contains(&0) {
        return Err(IngestError::Binary(path.to_path_buf()));
    }

    let text = match std::str::from_utf8(&bytes) {
        Ok(text) => text,
        // Incomplete sequence at the very end of the read window
        Err(e) if e.error_len().is_none() => {
            std::str::from_utf8(&bytes[..e.valid_up_to()]).unwrap_or_default()
        }
        Err(_) => return Err(IngestError::Binary(path.to_path_buf())),
    };

    Ok(text.chars().take(max_chars).collect())
}

/// Summary stored for a snippet.
pub fn snippet_summary(snippet: &str) -> String {
    format!("Content Snippet: '{}...'", snippet.trim())
}

/// Read a snippet and format it as a summary.
pub fn summarize_file(path: &Path, max_chars: usize) -> Result<String, IngestError> {
    read_snippet(path, max_chars).map(|snippet| snippet_summary(&snippet))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_reads_first_chars() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("notes.txt");
        std::fs::write(&path, "héllo wörld, this is long").unwrap();

        assert_eq!(read_snippet(&path, 5).unwrap(), "héllo");
        assert_eq!(read_snippet(&path, 1000).unwrap(), "héllo wörld, this is long");
    }

    #[test]
    fn test_summary_format() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("notes.txt");
        std::fs::write(&path, "  Q3 budget review\n").unwrap();
        assert_eq!(
            summarize_file(&path, 250).unwrap(),
            "Content Snippet: 'Q3 budget review...'"
        );
    }

    #[test]
    fn test_multibyte_char_cut_by_limit() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("cjk.txt");
        // Three-byte chars; limit of 2 chars reads 8 bytes
        std::fs::write(&path, "日本語テキスト").unwrap();
        assert_eq!(read_snippet(&path, 2).unwrap(), "日本");
    }

    #[test]
    fn test_binary_rejected() {
        let temp = TempDir::new().unwrap();
        let nul = temp.path().join("image.bin");
        std::fs::write(&nul, [0x89, b'P', b'N', b'G', 0x00, 0x01]).unwrap();
        assert!(matches!(read_snippet(&nul, 250), Err(IngestError::Binary(_))));

        let invalid = temp.path().join("latin1.txt");
        std::fs::write(&invalid, [b'c', b'a', b'f', 0xe9, b'!']).unwrap();
        assert!(matches!(read_snippet(&invalid, 250), Err(IngestError::Binary(_))));
    }

    #[test]
    fn test_missing_and_directory() {
        let temp = TempDir::new().unwrap();
        assert!(matches!(
            read_snippet(&temp.path().join("missing"), 10),
            Err(IngestError::Read { .. })
        ));
        assert!(matches!(
            read_snippet(temp.path(), 10),
            Err(IngestError::NotAFile(_))
        ));
    }
}
