//! Document-wide keyword extraction

use crate::config::KeywordLanguage;
use crate::stopwords;
use std::collections::{HashMap, HashSet};

/// Picks the most frequent meaningful words of a document
///
/// Tokens are whitespace-separated words, lowercased and stripped of
/// surrounding punctuation. A token that still holds anything other than
/// alphanumeric characters (hyphenated words, URLs, abbreviations) is
/// dropped, as are stop words. Ties in frequency keep the order of first occurrence, so the
/// result is deterministic for a given input.
#[derive(Debug, Clone)]
pub struct KeywordExtractor {
    language: KeywordLanguage,
    stop_words: HashSet<&'static str>,
}

impl KeywordExtractor {
    /// Create an extractor for the given stop-word language
    pub fn new(language: KeywordLanguage) -> Self {
        Self {
            language,
            stop_words: stopwords::for_language(language).iter().copied().collect(),
        }
    }

    /// Stop-word language in use
    pub fn language(&self) -> KeywordLanguage {
        self.language
    }

    /// Up to `top_k` distinct keywords, most frequent first
    pub fn extract(&self, text: &str, top_k: usize) -> Vec<String> {
        let lowered = text.to_lowercase();

        let mut counts: HashMap<&str, (usize, usize)> = HashMap::new();
        for (position, token) in lowered
            .split_whitespace()
            .map(|t| t.trim_matches(|c: char| !c.is_alphanumeric()))
            .filter(|t| is_word(t) && !self.stop_words.contains(*t))
            .enumerate()
        {
            counts.entry(token).or_insert((0, position)).0 += 1;
        }

        let mut ranked: Vec<(&str, usize, usize)> = counts
            .into_iter()
            .map(|(word, (count, first))| (word, count, first))
            .collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.2.cmp(&b.2)));

        ranked
            .into_iter()
            .take(top_k)
            .map(|(word, _, _)| word.to_string())
            .collect()
    }
}

fn is_word(token: &str) -> bool {
    !token.is_empty() && token.chars().all(char::is_alphanumeric)
}

impl Default for KeywordExtractor {
    fn default() -> Self {
        Self::new(KeywordLanguage::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_most_frequent_first() {
        let extractor = KeywordExtractor::default();
        let keywords = extractor.extract("Rust rust RUST cargo cargo tokio", 10);

        assert_eq!(keywords, vec!["rust", "cargo", "tokio"]);
    }

    #[test]
    fn test_stop_words_and_punctuation_removed() {
        let extractor = KeywordExtractor::default();
        let keywords = extractor.extract("The cat, the hat; and THE bat!", 10);

        assert_eq!(keywords, vec!["cat", "hat", "bat"]);
    }

    #[test]
    fn test_compound_tokens_are_not_split_into_keywords() {
        let extractor = KeywordExtractor::default();
        let keywords = extractor.extract(
            "state-of-the-art see https://www.example.com e.g. state-of-the-art",
            10,
        );

        assert_eq!(keywords, vec!["see"]);
    }

    #[test]
    fn test_ties_keep_first_occurrence() {
        let extractor = KeywordExtractor::default();
        let keywords = extractor.extract("zeta alpha mid alpha zeta mid", 2);

        assert_eq!(keywords, vec!["zeta", "alpha"]);
    }

    #[test]
    fn test_bounded_and_deterministic() {
        let extractor = KeywordExtractor::default();
        let text = (0..50).map(|i| format!("term{} ", i % 17)).collect::<String>();

        let first = extractor.extract(&text, 10);
        let second = extractor.extract(&text, 10);
        assert_eq!(first.len(), 10);
        assert_eq!(first, second);

        let distinct: HashSet<&String> = first.iter().collect();
        assert_eq!(distinct.len(), first.len());
    }

    #[test]
    fn test_only_stop_words_yields_nothing() {
        let extractor = KeywordExtractor::default();
        assert!(extractor.extract("the and of to a", 10).is_empty());
        assert!(extractor.extract("", 10).is_empty());
    }

    #[test]
    fn test_norwegian_stop_words() {
        let extractor = KeywordExtractor::new(KeywordLanguage::Norwegian);
        let keywords = extractor.extract("Det er en fjord og det er en båt ved fjorden fjord", 5);

        assert_eq!(keywords, vec!["fjord", "båt", "fjorden"]);
    }
}
