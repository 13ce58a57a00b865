//! Documents and the sections cut from them

/// Raw extracted text of one upload together with its original file name.
///
/// Created once per upload and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    /// Plain text produced by a [`ContentExtractor`](crate::ContentExtractor)
    pub text: String,

    /// File name as supplied by the uploader (e.g. "report.docx")
    pub original_file: String,
}

impl Document {
    /// Create a new document
    pub fn new(text: impl Into<String>, original_file: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            original_file: original_file.into(),
        }
    }

    /// True when the document carries no usable text (empty or whitespace only)
    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }
}

/// An ordered, 1-indexed slice of a document.
///
/// The section number is the join key for every downstream record: the
/// structured record, its file name, and any error reported for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    number: usize,
    text: String,
}

impl Section {
    /// Create a section. `number` is 1-based.
    ///
    /// # Panics
    ///
    /// Panics if `number` is zero.
    pub fn new(number: usize, text: impl Into<String>) -> Self {
        assert!(number > 0, "section numbers are 1-based");
        Self {
            number,
            text: text.into(),
        }
    }

    /// Build sections from segmenter output, numbering them from 1 in order
    ///
    /// # Examples
    ///
    /// ```
    /// use docstruct_domain::Section;
    ///
    /// let sections = Section::numbered(vec!["a".to_string(), "b".to_string()]);
    /// assert_eq!(sections[1].number(), 2);
    /// assert_eq!(sections[1].text(), "b");
    /// ```
    pub fn numbered(pieces: Vec<String>) -> Vec<Section> {
        pieces
            .into_iter()
            .enumerate()
            .map(|(idx, text)| Section::new(idx + 1, text))
            .collect()
    }

    /// 1-based position of this section in its document
    pub fn number(&self) -> usize {
        self.number
    }

    /// Section text
    pub fn text(&self) -> &str {
        &self.text
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_document() {
        assert!(Document::new("", "a.txt").is_blank());
        assert!(Document::new(" \n\t ", "a.txt").is_blank());
        assert!(!Document::new("hello", "a.txt").is_blank());
    }

    #[test]
    fn test_numbered_sections_start_at_one() {
        let sections = Section::numbered(vec!["x".into(), "y".into(), "z".into()]);
        let numbers: Vec<usize> = sections.iter().map(Section::number).collect();
        assert_eq!(numbers, vec![1, 2, 3]);
    }

    #[test]
    #[should_panic]
    fn test_zero_section_number_rejected() {
        let _ = Section::new(0, "text");
    }
}
