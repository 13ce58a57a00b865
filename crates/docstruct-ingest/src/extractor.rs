//! Extension-dispatching content extractor

use crate::error::ReadError;
use crate::ooxml::{docx_text, xlsx_text};
use docstruct_domain::ContentExtractor;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use tracing::{debug, info};

/// Default maximum file size: 16 MiB.
pub const DEFAULT_MAX_FILE_SIZE: u64 = 16 * 1024 * 1024;

#[cfg(feature = "pdf")]
const SUPPORTED: &[&str] = &["txt", "docx", "xlsx", "pdf"];
#[cfg(not(feature = "pdf"))]
const SUPPORTED: &[&str] = &["txt", "docx", "xlsx"];

/// Reads `.txt`, `.docx`, `.xlsx` (and `.pdf` with the `pdf` feature)
#[derive(Debug, Clone)]
pub struct FileExtractor {
    /// Files larger than this are rejected before reading
    pub max_file_size: u64,
}

impl Default for FileExtractor {
    fn default() -> Self {
        Self {
            max_file_size: DEFAULT_MAX_FILE_SIZE,
        }
    }
}

impl FileExtractor {
    /// Create an extractor with a custom size limit
    pub fn new(max_file_size: u64) -> Self {
        Self { max_file_size }
    }

    /// Lower-cased extension of `path`, without the dot
    pub fn extension_of(path: &Path) -> String {
        path.extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_ascii_lowercase()
    }
}

impl ContentExtractor for FileExtractor {
    type Error = ReadError;

    fn extract(&self, path: &Path) -> Result<String, ReadError> {
        let ext = Self::extension_of(path);
        if !SUPPORTED.contains(&ext.as_str()) {
            return Err(ReadError::UnsupportedFormat(format!(".{}", ext)));
        }

        let meta = std::fs::metadata(path)?;
        if meta.len() > self.max_file_size {
            return Err(ReadError::FileTooLarge(meta.len(), self.max_file_size));
        }

        debug!("Extracting {} ({} bytes)", path.display(), meta.len());

        let text = match ext.as_str() {
            "txt" => {
                let bytes = std::fs::read(path)?;
                String::from_utf8(bytes)
                    .map_err(|e| ReadError::Malformed(format!("text is not valid UTF-8: {}", e)))?
            }
            "docx" => docx_text(BufReader::new(File::open(path)?))?,
            "xlsx" => xlsx_text(BufReader::new(File::open(path)?))?,
            #[cfg(feature = "pdf")]
            "pdf" => pdf_extract::extract_text(path).map_err(|e| ReadError::Pdf(e.to_string()))?,
            other => return Err(ReadError::UnsupportedFormat(format!(".{}", other))),
        };

        info!("Extracted {} chars from {}", text.len(), path.display());
        Ok(text)
    }

    fn supported_extensions(&self) -> &[&str] {
        SUPPORTED
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ooxml::fixtures;

    #[test]
    fn test_load_text_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("test.txt");
        std::fs::write(&file, "hello world").unwrap();

        let text = FileExtractor::default().extract(&file).unwrap();
        assert_eq!(text, "hello world");
    }

    #[test]
    fn test_extension_is_case_insensitive() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("NOTES.TXT");
        std::fs::write(&file, "upper").unwrap();

        assert_eq!(FileExtractor::default().extract(&file).unwrap(), "upper");
    }

    #[test]
    fn test_load_docx_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("report.docx");
        std::fs::write(&file, fixtures::docx(&["One.", "Two."])).unwrap();

        let text = FileExtractor::default().extract(&file).unwrap();
        assert_eq!(text, "One. Two.");
    }

    #[test]
    fn test_unsupported_extension() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("slides.pptx");
        std::fs::write(&file, "x").unwrap();

        let result = FileExtractor::default().extract(&file);
        assert!(matches!(result, Err(ReadError::UnsupportedFormat(ext)) if ext == ".pptx"));
    }

    #[test]
    fn test_nonexistent_file() {
        let result = FileExtractor::default().extract(Path::new("/nonexistent/file.txt"));
        assert!(matches!(result, Err(ReadError::Io(_))));
    }

    #[test]
    fn test_invalid_utf8_text() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("binary.txt");
        std::fs::write(&file, [0xff, 0xfe, 0x00]).unwrap();

        let result = FileExtractor::default().extract(&file);
        assert!(matches!(result, Err(ReadError::Malformed(_))));
    }

    #[test]
    fn test_file_too_large_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("big.txt");
        std::fs::write(&file, "xx").unwrap();

        let result = FileExtractor::new(1).extract(&file);
        assert!(matches!(result, Err(ReadError::FileTooLarge(2, 1))));
    }

    #[test]
    fn test_supported_extensions_list() {
        let extractor = FileExtractor::default();
        let exts = extractor.supported_extensions();
        assert!(exts.contains(&"txt"));
        assert!(exts.contains(&"docx"));
        assert!(exts.contains(&"xlsx"));
    }
}
