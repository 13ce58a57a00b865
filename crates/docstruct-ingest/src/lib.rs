//! docstruct Ingest
//!
//! Turns uploaded files into plain text for the pipeline. Office formats are
//! ZIP containers of XML parts; text is read from the relevant parts with
//! `quick_xml` events.
//!
//! | Extension | Source of text |
//! |-----------|----------------|
//! | `txt`  | the file, as UTF-8 |
//! | `docx` | paragraphs of `word/document.xml`, joined by spaces |
//! | `xlsx` | rows of the first worksheet, cells joined by spaces |
//! | `pdf`  | `pdf-extract` (feature `pdf`) |

#![warn(missing_docs)]

mod error;
mod extractor;
mod ooxml;
mod xml;

pub use error::ReadError;
pub use extractor::{FileExtractor, DEFAULT_MAX_FILE_SIZE};
