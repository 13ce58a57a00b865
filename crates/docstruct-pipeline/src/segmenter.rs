//! Splitting documents into ordered sections

/// Maximum heading depth that starts a new section
const MAX_HEADING_DEPTH: usize = 3;

/// Splits document text into ordered section texts
///
/// Documents with headings (`#` to `###` at the start of a line, followed
/// by whitespace) are split so that each section starts at its heading. A
/// heading on the very first line does not create a leading empty section.
/// Documents without headings are cut into fixed windows of
/// whitespace-delimited tokens.
#[derive(Debug, Clone)]
pub struct Segmenter {
    window_tokens: usize,
}

impl Segmenter {
    /// Create a segmenter with the given fixed-window size
    pub fn new(window_tokens: usize) -> Self {
        Self {
            window_tokens: window_tokens.max(1),
        }
    }

    /// Segment text into at least one section
    ///
    /// Concatenating the tokens of all sections in order yields the tokens
    /// of the input in order.
    pub fn segment(&self, text: &str) -> Vec<String> {
        let pieces = split_on_headings(text);
        if pieces.len() > 1 {
            return pieces;
        }

        let windows = self.fixed_windows(text);
        if windows.is_empty() {
            // Empty input still yields one (empty) section
            return vec![String::new()];
        }
        windows
    }

    fn fixed_windows(&self, text: &str) -> Vec<String> {
        let tokens: Vec<&str> = text.split_whitespace().collect();
        tokens
            .chunks(self.window_tokens)
            .map(|window| window.join(" "))
            .collect()
    }
}

/// Split before every line that is a heading, dropping the separating newline
fn split_on_headings(text: &str) -> Vec<String> {
    let mut pieces = Vec::new();
    let mut start = 0;

    for (idx, _) in text.match_indices('\n') {
        if starts_with_heading(&text[idx + 1..]) {
            pieces.push(text[start..idx].to_string());
            start = idx + 1;
        }
    }
    pieces.push(text[start..].to_string());
    pieces
}

/// True when `line` opens with 1-3 `#` followed by whitespace
pub fn starts_with_heading(line: &str) -> bool {
    let depth = line.chars().take_while(|&c| c == '#').count();
    if depth == 0 || depth > MAX_HEADING_DEPTH {
        return false;
    }
    line[depth..].chars().next().is_some_and(char::is_whitespace)
}
