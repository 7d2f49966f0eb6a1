//! Word/punctuation tokenization.
//!
//! Tokens are either runs of word characters or runs of characters that are
//! neither word characters nor whitespace, so `c,d.` splits into `c`, `,`,
//! `d`, `.`. Tokens never span whitespace, which means a text tokenized line
//! by line yields the same tokens as the whole text tokenized at once.

use once_cell::sync::Lazy;
use regex::Regex;

/// Pattern equivalent to a word-punct tokenizer: `\w+|[^\w\s]+`.
static WORD_PUNCT_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\w+|[^\w\s]+").expect("Invalid regex pattern"));

/// Byte span of a token inside the line it was found in.
pub type TokenSpan = (usize, usize);

/// Tokenize a single line, returning the tokens and their byte spans.
pub fn tokenize_line(line: &str) -> (Vec<String>, Vec<TokenSpan>) {
    let mut tokens = Vec::new();
    let mut spans = Vec::new();

    for m in WORD_PUNCT_PATTERN.find_iter(line) {
        tokens.push(m.as_str().to_string());
        spans.push((m.start(), m.end()));
    }

    (tokens, spans)
}

/// Tokenize each line independently.
pub fn tokens_and_positions_by_line<S: AsRef<str>>(
    lines: &[S],
) -> (Vec<Vec<String>>, Vec<Vec<TokenSpan>>) {
    lines
        .iter()
        .map(|line| tokenize_line(line.as_ref()))
        .unzip()
}

/// Check whether every character of `word` is ASCII punctuation.
///
/// The empty string counts as punctuation.
pub fn is_punctuation(word: &str) -> bool {
    word.chars().all(|c| c.is_ascii_punctuation())
}
