/*
 * This module provides the file-access seam the scanner reads documents
 * through. It defines errors that map onto the per-document skip conditions
 * of the search pipeline, a trait `DocumentAccessOperations` for abstracting
 * the access, and a concrete implementation `CoreDocumentAccess`.
 *
 * Every error here is a skip condition, never fatal to a query: a document
 * that cannot be opened or is not UTF-8 text is excluded from results and
 * counted in the batch's skipped-documents diagnostic.
 */
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

#[derive(Debug)]
pub enum DocumentAccessError {
    NotFound(PathBuf),
    PermissionDenied(PathBuf),
    NotUtf8Text(PathBuf),
    Io(io::Error),
}

impl std::fmt::Display for DocumentAccessError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DocumentAccessError::NotFound(p) => write!(f, "Document not found: {p:?}"),
            DocumentAccessError::PermissionDenied(p) => {
                write!(f, "Permission denied reading document: {p:?}")
            }
            DocumentAccessError::NotUtf8Text(p) => {
                write!(f, "Document is not UTF-8 text: {p:?}")
            }
            DocumentAccessError::Io(e) => write!(f, "Document I/O error: {e}"),
        }
    }
}

impl std::error::Error for DocumentAccessError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DocumentAccessError::Io(e) => Some(e),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, DocumentAccessError>;

/*
 * Abstracts reading document content for scanning. Implementations must be
 * shareable across the scan worker pool. Tests substitute mocks to exercise
 * skip conditions (permission failures, mid-write truncation) without
 * touching the real file system.
 */
pub trait DocumentAccessOperations: Send + Sync {
    /*
     * Reads the full UTF-8 text of the document at `path`. Errors classify
     * the failure so callers can log precisely, but every variant is a skip
     * condition for the document in question.
     */
    fn read_document(&self, path: &Path) -> Result<String>;
}

pub struct CoreDocumentAccess {}

impl CoreDocumentAccess {
    pub fn new() -> Self {
        CoreDocumentAccess {}
    }
}

impl Default for CoreDocumentAccess {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentAccessOperations for CoreDocumentAccess {
    fn read_document(&self, path: &Path) -> Result<String> {
        match fs::read(path) {
            Ok(bytes) => String::from_utf8(bytes)
                .map_err(|_| DocumentAccessError::NotUtf8Text(path.to_path_buf())),
            Err(e) => match e.kind() {
                io::ErrorKind::NotFound => {
                    Err(DocumentAccessError::NotFound(path.to_path_buf()))
                }
                io::ErrorKind::PermissionDenied => {
                    Err(DocumentAccessError::PermissionDenied(path.to_path_buf()))
                }
                _ => Err(DocumentAccessError::Io(e)),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_read_document_returns_text() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("note.md");
        fs::write(&file_path, "# Title\nhello world\n").unwrap();

        let access = CoreDocumentAccess::new();
        let text = access.read_document(&file_path).unwrap();
        assert_eq!(text, "# Title\nhello world\n");
    }

    #[test]
    fn test_read_missing_document_is_not_found() {
        let dir = tempdir().unwrap();
        let access = CoreDocumentAccess::new();

        match access.read_document(&dir.path().join("absent.md")) {
            Err(DocumentAccessError::NotFound(p)) => {
                assert!(p.ends_with("absent.md"));
            }
            other => panic!("Expected NotFound, got {other:?}"),
        }
    }

    #[test]
    fn test_read_non_utf8_document_is_classified() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("binary.md");
        fs::write(&file_path, [0xff, 0xfe, 0x00, 0x9f]).unwrap();

        let access = CoreDocumentAccess::new();
        match access.read_document(&file_path) {
            Err(DocumentAccessError::NotUtf8Text(p)) => {
                assert!(p.ends_with("binary.md"));
            }
            other => panic!("Expected NotUtf8Text, got {other:?}"),
        }
    }
}
