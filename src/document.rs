use std::path::Path;

use log::warn;

use crate::error::{IngestError, Result};

/// A raw statement document awaiting ingestion: declared name, media type,
/// and the file bytes.
#[derive(Debug, Clone)]
pub struct Document {
    pub name: String,
    pub media_type: String,
    pub bytes: Vec<u8>,
}

impl Document {
    pub fn new(name: impl Into<String>, media_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            media_type: media_type.into(),
            bytes,
        }
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)?;
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("document")
            .to_string();
        let media_type = mime_guess::from_path(path)
            .first_or_octet_stream()
            .to_string();
        Ok(Self {
            name,
            media_type,
            bytes,
        })
    }

    pub fn size(&self) -> usize {
        self.bytes.len()
    }
}

/// Turns a raw document into a plain-text transcript. Leaf component; callers
/// must treat empty output identically to a hard failure, since ingestion
/// never proceeds to the oracle with empty text.
pub trait TextExtractor: Send + Sync {
    fn extract(&self, document: &Document) -> Result<String>;
}

/// Default extractor: PDFs page-by-page with page-boundary markers so the
/// oracle's checksum reasoning can anchor to page context, flat text formats
/// decoded as UTF-8.
#[derive(Default)]
pub struct StatementTextExtractor;

impl StatementTextExtractor {
    pub fn new() -> Self {
        Self
    }
}

impl TextExtractor for StatementTextExtractor {
    fn extract(&self, document: &Document) -> Result<String> {
        let text = if is_pdf(document) {
            extract_pdf_text(&document.name, &document.bytes)?
        } else if is_text_like(&document.media_type) {
            String::from_utf8(document.bytes.clone()).map_err(|_| {
                IngestError::UnreadableDocument(format!(
                    "{} is not valid UTF-8 text",
                    document.name
                ))
            })?
        } else {
            return Err(IngestError::UnreadableDocument(format!(
                "unsupported media type '{}' for {}",
                document.media_type, document.name
            )));
        };

        if text.trim().is_empty() {
            return Err(IngestError::UnreadableDocument(format!(
                "{} yielded no text content",
                document.name
            )));
        }
        Ok(text)
    }
}

fn is_pdf(document: &Document) -> bool {
    document.media_type == "application/pdf" || document.bytes.starts_with(b"%PDF")
}

fn is_text_like(media_type: &str) -> bool {
    media_type.starts_with("text/")
        || matches!(
            media_type,
            "application/json" | "application/csv" | "application/xml"
        )
}

fn extract_pdf_text(name: &str, bytes: &[u8]) -> Result<String> {
    let doc = lopdf::Document::load_mem(bytes).map_err(|e| {
        IngestError::UnreadableDocument(format!("failed to parse PDF {name}: {e}"))
    })?;

    let mut text = String::new();
    for (page_num, _) in doc.get_pages() {
        match doc.extract_text(&[page_num]) {
            Ok(page_text) => {
                text.push_str(&format!("--- PAGE {page_num} ---\n"));
                text.push_str(&page_text);
                text.push('\n');
            }
            Err(e) => {
                warn!("skipping unextractable page {page_num} of {name}: {e}");
            }
        }
    }
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Minimal single-page PDF with a text content stream, enough for
    /// `extract_text` to find the line.
    fn text_pdf(line: &str) -> Vec<u8> {
        use lopdf::{dictionary, Object, Stream};

        let mut doc = lopdf::Document::with_version("1.5");
        let pages_id = doc.new_object_id();

        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Courier",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! { "F1" => font_id },
        });

        let content = format!("BT\n/F1 10 Tf\n50 742 Td\n({line}) Tj\nET\n");
        let content_id = doc.add_object(Object::Stream(Stream::new(
            dictionary! {},
            content.into_bytes(),
        )));

        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            "Resources" => resources_id,
            "Contents" => content_id,
        });
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => vec![page_id.into()],
                "Count" => 1,
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut buffer = Vec::new();
        doc.save_to(&mut buffer).unwrap();
        buffer
    }

    #[test]
    fn test_plain_text_is_decoded() {
        let document = Document::new("statement.txt", "text/plain", b"Balance: 100.00".to_vec());
        let text = StatementTextExtractor::new().extract(&document).unwrap();
        assert!(text.contains("Balance: 100.00"));
    }

    #[test]
    fn test_pdf_pages_carry_boundary_markers() {
        let document = Document::new("statement.pdf", "application/pdf", text_pdf("ACME BANK"));
        let text = StatementTextExtractor::new().extract(&document).unwrap();
        assert!(text.contains("--- PAGE 1 ---"));
        assert!(text.contains("ACME BANK"));
    }

    #[test]
    fn test_empty_text_is_a_hard_failure() {
        let document = Document::new("empty.txt", "text/plain", b"   \n\t".to_vec());
        let err = StatementTextExtractor::new().extract(&document).unwrap_err();
        assert!(matches!(err, IngestError::UnreadableDocument(_)));
    }

    #[test]
    fn test_unsupported_media_type_is_rejected() {
        let document = Document::new("photo.png", "image/png", vec![0x89, 0x50, 0x4e, 0x47]);
        let err = StatementTextExtractor::new().extract(&document).unwrap_err();
        assert!(matches!(err, IngestError::UnreadableDocument(_)));
    }

    #[test]
    fn test_garbage_pdf_is_rejected() {
        let document = Document::new("broken.pdf", "application/pdf", b"%PDF-not-really".to_vec());
        let err = StatementTextExtractor::new().extract(&document).unwrap_err();
        assert!(matches!(err, IngestError::UnreadableDocument(_)));
    }

    #[test]
    fn test_from_path_guesses_media_type() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("statement.txt");
        std::fs::write(&path, "hello").unwrap();

        let document = Document::from_path(&path).unwrap();
        assert_eq!(document.name, "statement.txt");
        assert_eq!(document.media_type, "text/plain");
        assert_eq!(document.size(), 5);
    }
}
