//! Line/offset/token model shared by license templates and input documents.
//!
//! A [`TextUnit`] is immutable once built. [`Source`] is a cheap window over a
//! shared `TextUnit`: sub-ranging never copies lines, and the window start is
//! the line number of local line 0 in the original document, which is what
//! lets recursive matching report true line numbers after repeated slicing.

use std::ops::Range;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::identifier::ngram::NGramModel;
use crate::identifier::tokenize::{TokenSpan, tokens_and_positions_by_line};
use crate::utils::file::read_lines_offsets;

/// Strip line terminators from raw lines and compute cumulative byte offsets.
///
/// The returned offsets have one more entry than there are lines; entry `i`
/// is the byte length of everything before line `i`, terminators included.
pub fn lines_and_offsets<I, S>(raw_lines: I) -> (Vec<String>, Vec<usize>)
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut lines = Vec::new();
    let mut offsets = vec![0];

    for raw in raw_lines {
        let raw = raw.as_ref();
        let last = offsets.last().copied().unwrap_or(0);
        offsets.push(last + raw.len());
        lines.push(raw.trim_end_matches(['\r', '\n']).to_string());
    }

    (lines, offsets)
}

/// Lines, byte offsets and tokens of a text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextUnit {
    lines: Vec<String>,
    line_byte_offsets: Vec<usize>,
    tokens_by_line: Vec<Vec<String>>,
    token_positions_by_line: Vec<Vec<TokenSpan>>,
}

impl TextUnit {
    /// Build from raw lines. Each line's full length, terminator included if
    /// present, contributes to the byte offsets.
    pub fn from_lines<I, S>(raw_lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let (lines, offsets) = lines_and_offsets(raw_lines);
        Self::from_lines_and_offsets(lines, offsets)
    }

    /// Build from a whole text, splitting after every `\n`.
    pub fn from_text(text: &str) -> Self {
        Self::from_lines(text.split_inclusive('\n'))
    }

    /// Build from already stripped lines and their offsets.
    pub fn from_lines_and_offsets(lines: Vec<String>, line_byte_offsets: Vec<usize>) -> Self {
        assert_eq!(
            line_byte_offsets.len(),
            lines.len() + 1,
            "line offsets must have one entry per line plus the total length"
        );
        let (tokens_by_line, token_positions_by_line) = tokens_and_positions_by_line(&lines);

        Self {
            lines,
            line_byte_offsets,
            tokens_by_line,
            token_positions_by_line,
        }
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn line_byte_offsets(&self) -> &[usize] {
        &self.line_byte_offsets
    }

    pub fn tokens_by_line(&self) -> &[Vec<String>] {
        &self.tokens_by_line
    }

    pub fn token_positions_by_line(&self) -> &[Vec<TokenSpan>] {
        &self.token_positions_by_line
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Whether offsets, tokens and spans line up with the lines. Always true
    /// for a unit built here; checked on units read back from a cache.
    pub fn is_consistent(&self) -> bool {
        let n = self.lines.len();
        if self.line_byte_offsets.len() != n + 1
            || self.tokens_by_line.len() != n
            || self.token_positions_by_line.len() != n
            || self.line_byte_offsets.windows(2).any(|w| w[0] > w[1])
        {
            return false;
        }

        self.lines
            .iter()
            .zip(&self.tokens_by_line)
            .zip(&self.token_positions_by_line)
            .all(|((line, tokens), spans)| {
                tokens.len() == spans.len()
                    && spans.iter().all(|&(start, end)| {
                        start <= end
                            && end <= line.len()
                            && line.is_char_boundary(start)
                            && line.is_char_boundary(end)
                    })
            })
    }
}

/// Cursor over the text that separates tokens.
///
/// For `N` tokens it yields `N + 1` strings: the text before the first token,
/// the text after each token up to the next one, and the trailing text after
/// the last token. Every line terminator shows up as `"\n"`.
#[derive(Debug, Clone)]
pub struct IgnoredStrings<'a> {
    lines: &'a [String],
    positions: &'a [Vec<TokenSpan>],
    line: usize,
    token: usize,
    byte: usize,
    finished: bool,
}

impl<'a> IgnoredStrings<'a> {
    pub fn new(lines: &'a [String], positions: &'a [Vec<TokenSpan>]) -> Self {
        debug_assert_eq!(lines.len(), positions.len());
        Self {
            lines,
            positions,
            line: 0,
            token: 0,
            byte: 0,
            finished: false,
        }
    }

    /// Advance by `n` strings, collecting them.
    pub fn next_n(&mut self, n: usize) -> Vec<String> {
        let mut out = Vec::with_capacity(n);
        for _ in 0..n {
            match self.next() {
                Some(s) => out.push(s),
                None => break,
            }
        }
        out
    }

    /// Advance by `n` strings without keeping them.
    pub fn advance(&mut self, n: usize) {
        for _ in 0..n {
            if self.next().is_none() {
                break;
            }
        }
    }
}

impl Iterator for IgnoredStrings<'_> {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        if self.finished {
            return None;
        }

        let mut out = String::new();
        while self.line < self.lines.len() {
            let line = &self.lines[self.line];
            let spans = &self.positions[self.line];

            if let Some(&(start, end)) = spans.get(self.token) {
                out.push_str(&line[self.byte..start]);
                self.byte = end;
                self.token += 1;
                return Some(out);
            }

            out.push_str(&line[self.byte..]);
            out.push('\n');
            self.line += 1;
            self.token = 0;
            self.byte = 0;
        }

        self.finished = true;
        Some(out)
    }
}

/// A window over an input document.
///
/// Cloning and sub-ranging share the underlying text.
#[derive(Debug, Clone)]
pub struct Source {
    path: Option<PathBuf>,
    text: Arc<TextUnit>,
    range: Range<usize>,
}

impl Source {
    pub fn new(text: TextUnit, path: Option<PathBuf>) -> Self {
        let len = text.len();
        Self {
            path,
            text: Arc::new(text),
            range: 0..len,
        }
    }

    pub fn from_lines<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self::new(TextUnit::from_lines(lines), None)
    }

    pub fn from_text(text: &str) -> Self {
        Self::new(TextUnit::from_text(text), None)
    }

    /// Read and tokenize a file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let (lines, offsets) = read_lines_offsets(path)?;
        Ok(Self::new(
            TextUnit::from_lines_and_offsets(lines, offsets),
            Some(path.to_path_buf()),
        ))
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Display name used in results: the path, or `<memory>` for in-memory text.
    pub fn display_name(&self) -> String {
        self.path
            .as_ref()
            .map(|p| p.to_string_lossy().into_owned())
            .unwrap_or_else(|| "<memory>".to_string())
    }

    /// Line number, in the original document, of local line 0.
    pub fn original_line_offset(&self) -> usize {
        self.range.start
    }

    pub fn len(&self) -> usize {
        self.range.len()
    }

    pub fn is_empty(&self) -> bool {
        self.range.is_empty()
    }

    pub fn lines(&self) -> &[String] {
        &self.text.lines()[self.range.clone()]
    }

    /// Absolute byte offsets of the window's lines, plus the end of its last line.
    pub fn line_byte_offsets(&self) -> &[usize] {
        &self.text.line_byte_offsets()[self.range.start..=self.range.end]
    }

    pub fn tokens_by_line(&self) -> &[Vec<String>] {
        &self.text.tokens_by_line()[self.range.clone()]
    }

    pub fn token_positions_by_line(&self) -> &[Vec<TokenSpan>] {
        &self.text.token_positions_by_line()[self.range.clone()]
    }

    pub fn tokens_flat(&self) -> Vec<&str> {
        self.tokens_by_line()
            .iter()
            .flat_map(|tokens| tokens.iter().map(String::as_str))
            .collect()
    }

    pub fn ignored_strings(&self) -> IgnoredStrings<'_> {
        IgnoredStrings::new(self.lines(), self.token_positions_by_line())
    }

    /// Derive the window of local lines `[start, end)`.
    pub fn subset(&self, start: usize, end: usize) -> Source {
        assert!(
            start <= end && end <= self.len(),
            "invalid subset {}..{} of {} lines",
            start,
            end,
            self.len()
        );
        Source {
            path: self.path.clone(),
            text: Arc::clone(&self.text),
            range: self.range.start + start..self.range.start + end,
        }
    }

    /// Map a line number of the original document to a local index.
    pub fn relative_line_index(&self, original_line: usize) -> usize {
        original_line - self.range.start
    }

    /// Lines whose original line numbers fall in `[start, end)`.
    pub fn lines_original_indexing(&self, start: usize, end: usize) -> &[String] {
        &self.lines()[self.relative_line_index(start)..self.relative_line_index(end)]
    }
}

/// A license template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct License {
    name: String,
    path: Option<PathBuf>,
    text: TextUnit,
    tokens: Vec<String>,
    n_grams: NGramModel,
}

impl License {
    pub fn new(name: impl Into<String>, text: TextUnit, path: Option<PathBuf>) -> Self {
        let tokens = text.tokens_by_line().iter().flatten().cloned().collect();
        let n_grams = NGramModel::from_lines(text.lines());

        Self {
            name: name.into(),
            path,
            text,
            tokens,
            n_grams,
        }
    }

    pub fn from_lines<I, S>(name: impl Into<String>, lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self::new(name, TextUnit::from_lines(lines), None)
    }

    pub fn from_text(name: impl Into<String>, text: &str) -> Self {
        Self::new(name, TextUnit::from_text(text), None)
    }

    /// Load a template; its name is the file name without extension.
    pub fn from_file(path: &Path) -> Result<Self> {
        let name = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default();
        let (lines, offsets) = read_lines_offsets(path)?;

        Ok(Self::new(
            name,
            TextUnit::from_lines_and_offsets(lines, offsets),
            Some(path.to_path_buf()),
        ))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn lines(&self) -> &[String] {
        self.text.lines()
    }

    pub fn line_count(&self) -> usize {
        self.text.len()
    }

    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    pub fn n_grams(&self) -> &NGramModel {
        &self.n_grams
    }

    pub fn ignored_strings(&self) -> IgnoredStrings<'_> {
        IgnoredStrings::new(self.text.lines(), self.text.token_positions_by_line())
    }

    pub fn is_consistent(&self) -> bool {
        self.text.is_consistent()
            && self.tokens.len() == self.text.tokens_by_line().iter().map(Vec::len).sum::<usize>()
    }
}
