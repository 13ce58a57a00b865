//! Prompt construction for section structuring

use docstruct_domain::KeywordSet;

/// System message sent with every structuring request
pub const SYSTEM_PROMPT: &str =
    "You are a helpful assistant that extracts and structures information from text.";

/// Builds the user prompt for one section
pub struct PromptBuilder<'a> {
    section_text: &'a str,
    keywords: &'a KeywordSet,
}

impl<'a> PromptBuilder<'a> {
    /// Create a new prompt builder
    pub fn new(section_text: &'a str, keywords: &'a KeywordSet) -> Self {
        Self {
            section_text,
            keywords,
        }
    }

    /// Build the complete structuring prompt
    pub fn build(&self) -> String {
        let mut prompt = String::with_capacity(self.section_text.len() + 512);

        prompt.push_str(STRUCTURING_INSTRUCTIONS);
        prompt.push_str("\n\n");

        prompt.push_str("Content:\n");
        prompt.push_str("---\n");
        prompt.push_str(self.section_text);
        prompt.push_str("\n---\n\n");

        if !self.keywords.is_empty() {
            prompt.push_str(&format!("Keywords: {}\n\n", self.keywords));
        }

        prompt.push_str(OUTPUT_FORMAT_REMINDER);

        prompt
    }
}

const STRUCTURING_INSTRUCTIONS: &str = "Given the following content and keywords, \
extract and structure the main points. The keywords describe the whole document \
the content was taken from; use them to pick tags that are relevant to it.";

const OUTPUT_FORMAT_REMINDER: &str = r#"Structured output (a single JSON object, no additional text):
{
  "title": "short descriptive title",
  "body": "the main points of the content as prose",
  "tags": ["tag", "tag"]
}"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_contains_content_and_keywords() {
        let keywords = KeywordSet::new(vec!["revenue".into(), "growth".into()]);
        let prompt = PromptBuilder::new("Q3 revenue grew 12%.", &keywords).build();

        assert!(prompt.contains("Q3 revenue grew 12%."));
        assert!(prompt.contains("Keywords: revenue, growth"));
        assert!(prompt.contains("\"tags\""));
    }

    #[test]
    fn test_prompt_without_keywords_omits_line() {
        let keywords = KeywordSet::default();
        let prompt = PromptBuilder::new("text", &keywords).build();
        assert!(!prompt.contains("Keywords:"));
    }
}
