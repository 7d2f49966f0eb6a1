//! Locating the line range of a document that best matches one license.
//!
//! Every strategy works on local line indices of the [`Source`] window and
//! reports the first range found on ties. The chosen range is then padded
//! with context lines, converted to byte offsets and shifted into the
//! original document's numbering.

use std::sync::Arc;

use log::debug;
use serde::Serialize;

use crate::identifier::config::{IdentifierConfig, Strategy};
use crate::identifier::ngram::NGramModel;
use crate::identifier::similarity::{NgramSimilarity, Scorer, Similarity};
use crate::identifier::text::{License, Source};

const TOP_INCREMENTS: [usize; 3] = [3, 2, 1];
const BOTTOM_INCREMENTS: [usize; 5] = [5, 4, 3, 2, 1];

/// Best matching region of one license in one document.
///
/// Line numbers are half-open and refer to the original document.
/// `start_line`/`end_line` include context lines; the `_orig` pair does not.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RegionResult {
    pub start_line: usize,
    pub end_line: usize,
    pub start_offset: usize,
    pub end_offset: usize,
    pub score: f64,
    pub start_line_orig: usize,
    pub end_line_orig: usize,
}

/// Local half-open line range and its score.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Candidate {
    start: usize,
    end: usize,
    score: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Edge {
    Top,
    Bottom,
}

pub struct LocationFinder {
    scorer: Similarity,
    ngram: NgramSimilarity,
    strategy: Strategy,
    context_lines: usize,
    overshoot: usize,
}

impl LocationFinder {
    pub fn new(config: &IdentifierConfig, universe: Arc<NGramModel>) -> Self {
        Self {
            scorer: config.scorer(Arc::clone(&universe)),
            ngram: NgramSimilarity::new(universe),
            strategy: config.strategy,
            context_lines: config.context_lines,
            overshoot: config.overshoot,
        }
    }

    /// Find the best region of `license` inside `source`.
    pub fn find_region(&self, license: &License, source: &Source) -> RegionResult {
        let best = match self.strategy {
            Strategy::Exhaustive => self.exhaustive(license, source),
            Strategy::OneLineThenExpand => self.one_line_then_expand(license, source),
            Strategy::WindowThenExpand => self.window_then_expand(license, source),
            Strategy::FullTextOnly => Candidate {
                start: 0,
                end: source.len(),
                score: self.score(license, source, 0, source.len()),
            },
        };

        debug!(
            "{} in {}: lines {}-{} score {:.4}",
            license.name(),
            source.display_name(),
            best.start + source.original_line_offset(),
            best.end + source.original_line_offset(),
            best.score
        );

        let (start_line, end_line, start_offset, end_offset) = determine_offsets(
            best.start,
            best.end,
            self.context_lines,
            source.len(),
            source.line_byte_offsets(),
        );
        let shift = source.original_line_offset();

        RegionResult {
            start_line: start_line + shift,
            end_line: end_line + shift,
            start_offset,
            end_offset,
            score: best.score,
            start_line_orig: best.start + shift,
            end_line_orig: best.end + shift,
        }
    }

    fn score(&self, license: &License, source: &Source, start: usize, end: usize) -> f64 {
        self.scorer.score(license, &source.subset(start, end))
    }

    fn exhaustive(&self, license: &License, source: &Source) -> Candidate {
        let n = source.len();
        let mut best = empty_candidate();

        for start in 0..n {
            for end in start + 1..=n {
                let score = self.score(license, source, start, end);
                if is_better(score, &best) {
                    best = Candidate { start, end, score };
                }
            }
        }

        best
    }

    fn best_single_line(&self, license: &License, source: &Source) -> Candidate {
        let mut best = empty_candidate();
        for line in 0..source.len() {
            let score = self.score(license, source, line, line + 1);
            if is_better(score, &best) {
                best = Candidate {
                    start: line,
                    end: line + 1,
                    score,
                };
            }
        }
        best
    }

    fn one_line_then_expand(&self, license: &License, source: &Source) -> Candidate {
        if source.is_empty() {
            return empty_candidate();
        }

        let mut best = self.best_single_line(license, source);
        let mut previous: Option<(usize, usize)> = None;

        loop {
            best = self.expand(license, source, best, Edge::Top);
            best = self.expand(license, source, best, Edge::Bottom);

            if previous == Some((best.start, best.end)) {
                break;
            }
            previous = Some((best.start, best.end));
        }

        best
    }

    /// Extend one edge a line at a time, accepting any score not below the
    /// best so far, and give up after `overshoot + 1` consecutive misses.
    fn expand(&self, license: &License, source: &Source, from: Candidate, edge: Edge) -> Candidate {
        let mut best = from;
        let (mut start, mut end) = (from.start, from.end);
        let mut misses = 0;

        while misses <= self.overshoot {
            match edge {
                Edge::Top if start > 0 => start -= 1,
                Edge::Bottom if end < source.len() => end += 1,
                _ => break,
            }

            let score = self.score(license, source, start, end);
            if score >= best.score {
                best = Candidate { start, end, score };
                misses = 0;
            } else {
                misses += 1;
            }
        }

        best
    }

    /// Slide a license-sized window with the n-gram scorer, then adjust the
    /// edges of every top-scoring position with diminishing steps.
    fn window_then_expand(&self, license: &License, source: &Source) -> Candidate {
        let n = source.len();
        if n == 0 {
            return empty_candidate();
        }

        let window = license.line_count().clamp(1, n);
        let step = (window / 2).max(1);

        let mut positions = Vec::new();
        let mut start = 0;
        loop {
            let end = (start + window).min(n);
            let score = self.ngram.score(license, &source.subset(start, end));
            positions.push(Candidate { start, end, score });
            if end == n {
                break;
            }
            start += step;
        }

        let top_score = positions
            .iter()
            .map(|c| c.score)
            .fold(f64::NEG_INFINITY, f64::max);

        let mut best: Option<Candidate> = None;
        for position in positions.into_iter().filter(|c| c.score == top_score) {
            let refined = self.refine_edges(license, source, position);
            if best.is_none_or(|b| refined.score > b.score) {
                best = Some(refined);
            }
        }
        let best = best.unwrap_or_else(empty_candidate);

        match self.scorer {
            Similarity::Ngram(_) => best,
            Similarity::EditWeighted(_) => Candidate {
                score: self.score(license, source, best.start, best.end),
                ..best
            },
        }
    }

    fn refine_edges(&self, license: &License, source: &Source, from: Candidate) -> Candidate {
        let mut current = from;
        for increment in TOP_INCREMENTS {
            current = self.adjust_edge(license, source, current, Edge::Top, increment);
        }
        for increment in BOTTOM_INCREMENTS {
            current = self.adjust_edge(license, source, current, Edge::Bottom, increment);
        }
        current
    }

    /// Grow `edge` by `increment` while the n-gram score does not drop; if the
    /// very first grow is rejected, shrink by `increment` instead.
    fn adjust_edge(
        &self,
        license: &License,
        source: &Source,
        from: Candidate,
        edge: Edge,
        increment: usize,
    ) -> Candidate {
        debug_assert!(increment > 0, "edge increment must be positive");

        let n = source.len();
        let grow = |c: &Candidate| -> Option<(usize, usize)> {
            match edge {
                Edge::Top => c.start.checked_sub(increment).map(|s| (s, c.end)),
                Edge::Bottom => Some((c.start, c.end + increment)).filter(|&(_, e)| e <= n),
            }
        };
        let shrink = |c: &Candidate| -> Option<(usize, usize)> {
            let (start, end) = match edge {
                Edge::Top => (c.start + increment, c.end),
                Edge::Bottom => (c.start, c.end.checked_sub(increment)?),
            };
            (start < end).then_some((start, end))
        };

        let mut current = from;
        let mut grew = false;
        while let Some(next) = self.try_step(license, source, &current, grow(&current)) {
            current = next;
            grew = true;
        }
        if !grew {
            while let Some(next) = self.try_step(license, source, &current, shrink(&current)) {
                current = next;
            }
        }
        current
    }

    fn try_step(
        &self,
        license: &License,
        source: &Source,
        current: &Candidate,
        range: Option<(usize, usize)>,
    ) -> Option<Candidate> {
        let (start, end) = range?;
        let score = self.ngram.score(license, &source.subset(start, end));
        (score >= current.score).then_some(Candidate { start, end, score })
    }
}

fn empty_candidate() -> Candidate {
    Candidate {
        start: 0,
        end: 0,
        score: 0.0,
    }
}

/// Strictly better, or the first range considered when nothing was kept yet.
fn is_better(score: f64, best: &Candidate) -> bool {
    best.end == 0 || score > best.score
}

/// Pad `[start, end)` with `context_lines` on each side and look up offsets.
///
/// `offsets` has one entry per line plus the end of the last line. Returns
/// the padded local range and its byte offsets.
pub fn determine_offsets(
    start: usize,
    end: usize,
    context_lines: usize,
    line_count: usize,
    offsets: &[usize],
) -> (usize, usize, usize, usize) {
    let start = start.saturating_sub(context_lines);
    let mut end = end + context_lines;

    let end_offset = if end >= offsets.len() {
        end = line_count;
        offsets[offsets.len() - 1]
    } else {
        offsets[end]
    };

    (start, end, offsets[start], end_offset)
}
