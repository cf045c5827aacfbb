use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref NON_WORD: Regex = Regex::new(r"\W+").expect("valid regex");
}

/// Split free text on runs of non-word characters and lowercase the pieces.
/// No stemming or stopword removal: query terms must match snapshot terms as written.
pub fn tokenize(text: &str) -> Vec<String> {
    NON_WORD
        .split(text)
        .filter(|t| !t.trim().is_empty())
        .map(|t| t.to_lowercase())
        .collect()
}

/// Whitespace normalization for boolean expressions: parentheses become
/// standalone tokens and everything is lowercased.
pub fn boolean_tokens(expr: &str) -> Vec<String> {
    expr.to_lowercase()
        .replace('(', " ( ")
        .replace(')', " ) ")
        .split_whitespace()
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_on_punctuation() {
        assert_eq!(tokenize("Rust, rust's RUN!"), vec!["rust", "rust", "s", "run"]);
    }

    #[test]
    fn blank_input_has_no_tokens() {
        assert!(tokenize("  ...  ").is_empty());
    }

    #[test]
    fn keeps_non_ascii_words() {
        assert_eq!(tokenize("Привет, мир"), vec!["привет", "мир"]);
    }

    #[test]
    fn parentheses_tokenize_independently() {
        assert_eq!(boolean_tokens("(Cat  AND\tdog)OR x"), vec!["(", "cat", "and", "dog", ")", "or", "x"]);
    }
}
