//! Document ingestion for the upload endpoint.
//!
//! Text, Markdown and HTML files are decoded in-process. Binary formats
//! (PDF, Word, scanned images) are recognized and refused with a clear
//! error rather than guessed at.

use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use verification::content::html_to_text;
use verification::TextFormat;

/// Largest upload accepted: 10 MB.
pub const MAX_DOCUMENT_BYTES: usize = 10 * 1024 * 1024;

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("uploaded file is empty")]
    Empty,

    #[error("file is too large: {size} bytes (max {max})")]
    TooLarge { size: usize, max: usize },

    #[error("unsupported document format: {0}")]
    Unsupported(String),

    #[error("file is not valid UTF-8 text")]
    Encoding,
}

/// Text pulled out of an uploaded file.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExtractedDocument {
    pub text: String,
    /// How the text was obtained: `text`, `markdown` or `html`
    pub method: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pages: Option<usize>,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Markup the text still carries, for citation segmentation.
    #[serde(skip)]
    pub format: TextFormat,
}

#[derive(Debug, Clone)]
pub struct DocumentExtractor {
    max_bytes: usize,
}

impl Default for DocumentExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentExtractor {
    pub fn new() -> Self {
        Self {
            max_bytes: MAX_DOCUMENT_BYTES,
        }
    }

    pub fn with_max_bytes(mut self, max_bytes: usize) -> Self {
        self.max_bytes = max_bytes;
        self
    }

    pub fn max_bytes(&self) -> usize {
        self.max_bytes
    }

    /// Decode `bytes` according to the extension of `filename`.
    ///
    /// `enable_ocr` only matters for scanned formats, which are refused
    /// either way.
    pub fn extract(
        &self,
        bytes: &[u8],
        filename: &str,
        enable_ocr: bool,
    ) -> Result<ExtractedDocument, DocumentError> {
        if bytes.is_empty() {
            return Err(DocumentError::Empty);
        }
        if bytes.len() > self.max_bytes {
            return Err(DocumentError::TooLarge {
                size: bytes.len(),
                max: self.max_bytes,
            });
        }

        let extension = filename
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase())
            .unwrap_or_default();
        debug!(filename = %filename, extension = %extension, enable_ocr, "extracting document");

        let (method, format) = match extension.as_str() {
            "txt" | "text" | "" => ("text", TextFormat::Plain),
            "md" | "markdown" => ("markdown", TextFormat::Markdown),
            "html" | "htm" => ("html", TextFormat::Html),
            "pdf" => return Err(DocumentError::Unsupported("PDF decoding is not available".into())),
            "docx" | "doc" => {
                return Err(DocumentError::Unsupported("Word decoding is not available".into()))
            }
            "png" | "jpg" | "jpeg" | "tif" | "tiff" | "bmp" | "gif" | "webp" => {
                return Err(DocumentError::Unsupported(
                    "image text recognition is not available".into(),
                ))
            }
            other => return Err(DocumentError::Unsupported(format!(".{}", other))),
        };

        let raw = std::str::from_utf8(bytes).map_err(|_| DocumentError::Encoding)?;
        let text = match format {
            TextFormat::Html => html_to_text(raw),
            TextFormat::Plain | TextFormat::Markdown => raw.to_string(),
        };
        let format = match format {
            // Already flattened to lines of plain text.
            TextFormat::Html => TextFormat::Plain,
            other => other,
        };

        Ok(ExtractedDocument {
            success: !text.trim().is_empty(),
            error: text
                .trim()
                .is_empty()
                .then(|| "no text found in document".to_string()),
            text,
            method,
            pages: None,
            format,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn markdown_keeps_its_markup() {
        let doc = DocumentExtractor::new()
            .extract(b"# Paper\n\nSee [x](https://doi.org/10.1/x).", "notes.MD", false)
            .unwrap();
        assert_eq!(doc.method, "markdown");
        assert_eq!(doc.format, TextFormat::Markdown);
        assert!(doc.success);
    }

    #[test]
    fn html_is_flattened() {
        let doc = DocumentExtractor::new()
            .extract(b"<html><body><p>Smith (2019)</p><script>x()</script></body></html>", "page.html", true)
            .unwrap();
        assert_eq!(doc.text, "Smith (2019)");
        assert_eq!(doc.format, TextFormat::Plain);
    }

    #[test]
    fn binary_formats_are_refused() {
        let extractor = DocumentExtractor::new();
        for name in ["paper.pdf", "paper.docx", "scan.png"] {
            assert!(matches!(
                extractor.extract(b"\x25PDF", name, true),
                Err(DocumentError::Unsupported(_))
            ));
        }
    }

    #[test]
    fn size_limits() {
        let extractor = DocumentExtractor::new().with_max_bytes(4);
        assert!(matches!(extractor.extract(b"", "a.txt", false), Err(DocumentError::Empty)));
        assert!(matches!(
            extractor.extract(b"12345", "a.txt", false),
            Err(DocumentError::TooLarge { size: 5, max: 4 })
        ));
    }

    #[test]
    fn whitespace_only_is_unsuccessful() {
        let doc = DocumentExtractor::new().extract(b"   \n", "a.txt", false).unwrap();
        assert!(!doc.success);
        assert!(doc.error.is_some());
    }
}
