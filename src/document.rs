//! Document records produced by ingestion.
//!
//! A document is one PDF file flattened into a single line of text plus
//! the names of the images extracted from it.

use crate::error::Result;
use crate::persistence::{SaveFormat, load_snapshot_with_format, save_snapshot_with_format};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// A single ingested PDF.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// 1-based id assigned in file-name order.
    pub id: usize,
    /// File name of the source PDF, without directory.
    pub file_name: String,
    /// All page text joined by spaces; never contains a newline.
    pub text: String,
    /// Reserved for table extraction; always empty.
    pub tables: Vec<serde_json::Value>,
    /// Names of the image files written for this document.
    pub images: Vec<String>,
}

impl Document {
    /// Build a document from per-page texts.
    pub fn from_pages<S: AsRef<str>>(
        id: usize,
        file_name: impl Into<String>,
        pages: &[S],
        images: Vec<String>,
    ) -> Self {
        Self {
            id,
            file_name: file_name.into(),
            text: flatten_pages(pages),
            tables: Vec::new(),
            images,
        }
    }

    /// Number of whitespace-separated words in the text.
    pub fn word_count(&self) -> usize {
        self.text.split_whitespace().count()
    }
}

/// Join non-blank page texts with spaces and replace every newline with a space.
pub fn flatten_pages<S: AsRef<str>>(pages: &[S]) -> String {
    pages
        .iter()
        .map(|p| p.as_ref().trim())
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
        .replace(['\r', '\n'], " ")
}

/// Find the first document whose text contains `passage` (after trimming).
///
/// Returns `None` when nothing matches. Ties go to the earliest document.
pub fn find_source<'a>(documents: &'a [Document], passage: &str) -> Option<&'a Document> {
    let needle = passage.trim();
    documents.iter().find(|d| d.text.contains(needle))
}

/// Write the document list as pretty-printed JSON.
pub fn save_documents(documents: &[Document], path: &Path) -> Result<()> {
    save_snapshot_with_format(documents, path, SaveFormat::Json)
}

/// Read a document list written by [`save_documents`].
pub fn load_documents(path: &Path) -> Result<Vec<Document>> {
    load_snapshot_with_format(path, SaveFormat::Json)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_flatten_skips_blank_pages() {
        let pages = ["  First page\nline two ", "   \n", "Third"];
        assert_eq!(flatten_pages(&pages), "First page line two Third");
    }

    #[test]
    fn test_flatten_never_keeps_newlines() {
        let pages = ["a\nb\r\nc", "\n\nd\n"];
        let text = flatten_pages(&pages);
        assert!(!text.contains('\n'));
        assert!(!text.contains('\r'));
        assert!(text.starts_with("a b"));
        assert!(text.ends_with(" d"));
    }

    #[test]
    fn test_document_json_shape() {
        let doc = Document::from_pages(1, "doc1.pdf", &["Hello world"], Vec::new());
        let json = serde_json::to_string(&vec![doc]).unwrap();
        assert_eq!(
            json,
            r#"[{"id":1,"file_name":"doc1.pdf","text":"Hello world","tables":[],"images":[]}]"#
        );
    }

    #[test]
    fn test_find_source_first_match_wins() {
        let docs = vec![
            Document::from_pages(1, "a.pdf", &["The tower was built in 1889."], Vec::new()),
            Document::from_pages(2, "b.pdf", &["Paris. The tower was built in 1889."], Vec::new()),
        ];

        let found = find_source(&docs, "  The tower was built  ").unwrap();
        assert_eq!(found.file_name, "a.pdf");

        let found = find_source(&docs, "Paris.").unwrap();
        assert_eq!(found.id, 2);

        assert!(find_source(&docs, "Great Wall").is_none());
    }

    #[test]
    fn test_save_and_load_documents() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("docs.json");

        let docs = vec![Document::from_pages(
            1,
            "report.pdf",
            &["Qubits exploit superposition."],
            vec!["report_page1_img1.jpeg".to_string()],
        )];
        save_documents(&docs, &path).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert!(content.contains("\n  {"));

        let loaded = load_documents(&path).unwrap();
        assert_eq!(loaded, docs);
    }
}
