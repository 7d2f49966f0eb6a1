//! Longest-matching-block sequence alignment.
//!
//! Finds the longest contiguous matching block between two sequences, then
//! recurses on the pieces to the left and right of it. The resulting blocks
//! are turned into opcodes that partition both sequences into `equal`,
//! `replace`, `delete` (only in `a`) and `insert` (only in `b`) spans.
//!
//! There is no junk or popularity heuristic: every element takes part in the
//! alignment, which keeps the result a pure function of the two inputs.

use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;

use serde::Serialize;

/// A maximal run of `size` equal elements at `a[a_start..]` and `b[b_start..]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct MatchingBlock {
    pub a_start: usize,
    pub b_start: usize,
    pub size: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OpTag {
    Equal,
    Replace,
    Delete,
    Insert,
}

impl fmt::Display for OpTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Equal => "equal",
            Self::Replace => "replace",
            Self::Delete => "delete",
            Self::Insert => "insert",
        };
        write!(f, "{}", name)
    }
}

/// Span pair `a[a_start..a_end]` / `b[b_start..b_end]` with its relation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Opcode {
    pub tag: OpTag,
    pub a_start: usize,
    pub a_end: usize,
    pub b_start: usize,
    pub b_end: usize,
}

impl Opcode {
    pub fn a_len(&self) -> usize {
        self.a_end - self.a_start
    }

    pub fn b_len(&self) -> usize {
        self.b_end - self.b_start
    }
}

pub struct SequenceMatcher<'a, T> {
    a: &'a [T],
    b: &'a [T],
    /// Positions of every element of `b`, ascending.
    b2j: HashMap<&'a T, Vec<usize>>,
}

impl<'a, T: Eq + Hash> SequenceMatcher<'a, T> {
    pub fn new(a: &'a [T], b: &'a [T]) -> Self {
        let mut b2j: HashMap<&T, Vec<usize>> = HashMap::new();
        for (j, elt) in b.iter().enumerate() {
            b2j.entry(elt).or_default().push(j);
        }
        Self { a, b, b2j }
    }

    /// Longest matching block inside `a[alo..ahi]` and `b[blo..bhi]`.
    ///
    /// Among equally long blocks the one starting earliest in `a` wins, and
    /// among those the one starting earliest in `b`.
    fn find_longest_match(&self, alo: usize, ahi: usize, blo: usize, bhi: usize) -> MatchingBlock {
        let mut best = MatchingBlock {
            a_start: alo,
            b_start: blo,
            size: 0,
        };
        // j2len[j] = length of the match ending at a[i - 1], b[j]
        let mut j2len: HashMap<usize, usize> = HashMap::new();

        for i in alo..ahi {
            let mut new_j2len: HashMap<usize, usize> = HashMap::new();
            if let Some(positions) = self.b2j.get(&self.a[i]) {
                for &j in positions {
                    if j < blo {
                        continue;
                    }
                    if j >= bhi {
                        break;
                    }
                    let k = j
                        .checked_sub(1)
                        .and_then(|prev| j2len.get(&prev))
                        .copied()
                        .unwrap_or(0)
                        + 1;
                    new_j2len.insert(j, k);
                    if k > best.size {
                        best = MatchingBlock {
                            a_start: i + 1 - k,
                            b_start: j + 1 - k,
                            size: k,
                        };
                    }
                }
            }
            j2len = new_j2len;
        }

        best
    }

    /// Non-adjacent matching blocks in ascending order, terminated by a
    /// zero-sized sentinel at `(a.len(), b.len())`.
    pub fn matching_blocks(&self) -> Vec<MatchingBlock> {
        let (la, lb) = (self.a.len(), self.b.len());
        let mut queue = vec![(0, la, 0, lb)];
        let mut blocks = Vec::new();

        while let Some((alo, ahi, blo, bhi)) = queue.pop() {
            let block = self.find_longest_match(alo, ahi, blo, bhi);
            if block.size == 0 {
                continue;
            }
            let (i, j, k) = (block.a_start, block.b_start, block.size);
            blocks.push(block);
            if alo < i && blo < j {
                queue.push((alo, i, blo, j));
            }
            if i + k < ahi && j + k < bhi {
                queue.push((i + k, ahi, j + k, bhi));
            }
        }
        blocks.sort();

        let mut collapsed = Vec::with_capacity(blocks.len() + 1);
        let mut current = MatchingBlock {
            a_start: 0,
            b_start: 0,
            size: 0,
        };
        for block in blocks {
            if current.a_start + current.size == block.a_start
                && current.b_start + current.size == block.b_start
            {
                current.size += block.size;
            } else {
                if current.size > 0 {
                    collapsed.push(current);
                }
                current = block;
            }
        }
        if current.size > 0 {
            collapsed.push(current);
        }

        collapsed.push(MatchingBlock {
            a_start: la,
            b_start: lb,
            size: 0,
        });
        collapsed
    }

    /// Opcodes turning `a` into `b`, covering both sequences end to end.
    pub fn opcodes(&self) -> Vec<Opcode> {
        let mut i = 0;
        let mut j = 0;
        let mut opcodes = Vec::new();

        for block in self.matching_blocks() {
            let tag = if i < block.a_start && j < block.b_start {
                Some(OpTag::Replace)
            } else if i < block.a_start {
                Some(OpTag::Delete)
            } else if j < block.b_start {
                Some(OpTag::Insert)
            } else {
                None
            };

            if let Some(tag) = tag {
                opcodes.push(Opcode {
                    tag,
                    a_start: i,
                    a_end: block.a_start,
                    b_start: j,
                    b_end: block.b_start,
                });
            }

            i = block.a_start + block.size;
            j = block.b_start + block.size;
            if block.size > 0 {
                opcodes.push(Opcode {
                    tag: OpTag::Equal,
                    a_start: block.a_start,
                    a_end: i,
                    b_start: block.b_start,
                    b_end: j,
                });
            }
        }

        opcodes
    }
}
