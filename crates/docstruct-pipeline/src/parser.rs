//! Tolerant parsing of structuring responses

use serde_json::{Map, Value};
use thiserror::Error;

/// Why a response could not be read as a structured payload
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResponseError {
    /// Nothing but whitespace
    #[error("Empty response from structuring service")]
    Empty,

    /// No JSON could be recovered from the text
    #[error("Response is not valid JSON: {0}")]
    InvalidJson(String),

    /// JSON, but not an object
    #[error("Expected a JSON object, got {0}")]
    NotAnObject(&'static str),
}

impl ResponseError {
    /// Failure class used in fallback titles
    pub fn class(&self) -> &'static str {
        match self {
            ResponseError::Empty => "Empty Response",
            ResponseError::InvalidJson(_) | ResponseError::NotAnObject(_) => "Invalid Response",
        }
    }
}

/// Fields recovered from a response; any of them may be missing
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedFields {
    /// `title` as text
    pub title: Option<String>,
    /// `body` as text (non-string bodies are kept as compact JSON)
    pub body: Option<String>,
    /// `tags` as a list (a comma-separated string is split)
    pub tags: Option<Vec<String>>,
}

impl ParsedFields {
    /// Names of the fields the response did not provide
    pub fn missing(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.title.is_none() {
            missing.push("title");
        }
        if self.body.is_none() {
            missing.push("body");
        }
        if self.tags.is_none() {
            missing.push("tags");
        }
        missing
    }
}

/// Parse a raw response into its `title`, `body` and `tags`
///
/// Accepts bare JSON, JSON inside a markdown code block, and JSON
/// surrounded by prose.
pub fn parse_response(response: &str) -> Result<ParsedFields, ResponseError> {
    let trimmed = response.trim();
    if trimmed.is_empty() {
        return Err(ResponseError::Empty);
    }

    let json = parse_json(strip_code_fence(trimmed))?;
    let object = match json {
        Value::Object(map) => map,
        other => return Err(ResponseError::NotAnObject(kind_of(&other))),
    };

    Ok(ParsedFields {
        title: text_field(&object, "title"),
        body: text_field(&object, "body"),
        tags: tags_field(&object),
    })
}

/// Remove a surrounding ``` or ```json block
fn strip_code_fence(text: &str) -> &str {
    if !text.starts_with("```") {
        return text;
    }
    let without_open = match text.find('\n') {
        Some(idx) => &text[idx + 1..],
        None => return text.trim_matches('`'),
    };
    without_open
        .trim_end()
        .strip_suffix("```")
        .unwrap_or(without_open)
        .trim()
}

fn parse_json(text: &str) -> Result<Value, ResponseError> {
    match serde_json::from_str(text) {
        Ok(value) => Ok(value),
        Err(e) => {
            // LLMs sometimes wrap the object in explanatory prose
            let embedded = text
                .find('{')
                .zip(text.rfind('}'))
                .filter(|(start, end)| start < end)
                .and_then(|(start, end)| serde_json::from_str(&text[start..=end]).ok());
            embedded.ok_or_else(|| ResponseError::InvalidJson(e.to_string()))
        }
    }
}

fn text_field(object: &Map<String, Value>, key: &str) -> Option<String> {
    match object.get(key)? {
        Value::Null => None,
        Value::String(s) if s.trim().is_empty() => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

fn tags_field(object: &Map<String, Value>) -> Option<Vec<String>> {
    match object.get("tags")? {
        Value::Array(items) => Some(
            items
                .iter()
                .filter_map(|item| match item {
                    Value::String(s) => Some(s.trim().to_string()),
                    Value::Null => None,
                    other => Some(other.to_string()),
                })
                .filter(|tag| !tag.is_empty())
                .collect(),
        ),
        Value::String(s) => Some(
            s.split(',')
                .map(str::trim)
                .filter(|tag| !tag.is_empty())
                .map(str::to_string)
                .collect(),
        ),
        _ => None,
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_complete_object() {
        let parsed =
            parse_response(r#"{"title": "Intro", "body": "Text", "tags": ["a", "b"]}"#).unwrap();

        assert_eq!(parsed.title.as_deref(), Some("Intro"));
        assert_eq!(parsed.body.as_deref(), Some("Text"));
        assert_eq!(parsed.tags, Some(vec!["a".to_string(), "b".to_string()]));
        assert!(parsed.missing().is_empty());
    }

    #[test]
    fn test_parse_markdown_wrapped() {
        let response = "```json\n{\"title\": \"Wrapped\", \"body\": \"x\"}\n```";
        let parsed = parse_response(response).unwrap();

        assert_eq!(parsed.title.as_deref(), Some("Wrapped"));
        assert_eq!(parsed.missing(), vec!["tags"]);
    }

    #[test]
    fn test_parse_object_inside_prose() {
        let response = "Sure! Here is the result:\n{\"title\": \"T\", \"body\": \"B\", \"tags\": []}\nHope it helps.";
        let parsed = parse_response(response).unwrap();

        assert_eq!(parsed.title.as_deref(), Some("T"));
        assert_eq!(parsed.tags, Some(vec![]));
    }

    #[test]
    fn test_comma_separated_tags() {
        let parsed = parse_response(r#"{"tags": "alpha, beta,, gamma "}"#).unwrap();

        assert_eq!(
            parsed.tags,
            Some(vec!["alpha".to_string(), "beta".to_string(), "gamma".to_string()])
        );
        assert_eq!(parsed.missing(), vec!["title", "body"]);
    }

    #[test]
    fn test_non_string_body_kept_as_json() {
        let parsed = parse_response(r#"{"title": "T", "body": {"points": [1, 2]}}"#).unwrap();
        assert_eq!(parsed.body.as_deref(), Some(r#"{"points":[1,2]}"#));
    }

    #[test]
    fn test_blank_title_counts_as_missing() {
        let parsed = parse_response(r#"{"title": "  ", "body": "B"}"#).unwrap();
        assert!(parsed.title.is_none());
    }

    #[test]
    fn test_prose_only_is_invalid() {
        let err = parse_response("I could not structure this section.").unwrap_err();
        assert!(matches!(err, ResponseError::InvalidJson(_)));
        assert_eq!(err.class(), "Invalid Response");
    }

    #[test]
    fn test_array_is_not_an_object() {
        let err = parse_response("[1, 2, 3]").unwrap_err();
        assert_eq!(err, ResponseError::NotAnObject("an array"));
    }

    #[test]
    fn test_empty_response() {
        assert_eq!(parse_response("   \n"), Err(ResponseError::Empty));
    }
}
