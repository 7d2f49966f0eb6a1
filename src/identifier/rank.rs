//! Coarse confidence buckets for whole-document n-gram scores.

use std::fmt;

use serde::{Serialize, Serializer};

use crate::identifier::error::LicenseIdError;

pub const DEFAULT_RANK_BREAKPOINTS: [f64; 5] = [0.06, 0.08, 0.1, 0.5, 1.0];

/// Bucket of a score, or the marker for scores no bucket covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rank {
    Bucket(usize),
    ScoreOutOfRange,
}

impl fmt::Display for Rank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bucket(rank) => write!(f, "{}", rank),
            Self::ScoreOutOfRange => write!(f, "ScoreOutOfRange"),
        }
    }
}

impl Serialize for Rank {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Bucket(rank) => serializer.serialize_u64(*rank as u64),
            Self::ScoreOutOfRange => serializer.serialize_str("ScoreOutOfRange"),
        }
    }
}

/// 1-based bucket `k` such that `breakpoints[k - 1] <= score < breakpoints[k]`.
///
/// A score equal to the last breakpoint falls in the top bucket. Anything
/// below the first breakpoint or above the last is out of range.
pub fn rank_for_score(score: f64, breakpoints: &[f64]) -> Result<usize, LicenseIdError> {
    for (index, pair) in breakpoints.windows(2).enumerate() {
        if pair[0] <= score && score < pair[1] {
            return Ok(index + 1);
        }
    }
    match breakpoints.last() {
        Some(&top) if score == top => Ok(breakpoints.len()),
        _ => Err(LicenseIdError::ScoreOutOfRange { score }),
    }
}

/// Like [`rank_for_score`], folding the error into [`Rank::ScoreOutOfRange`].
pub fn rank(score: f64, breakpoints: &[f64]) -> Rank {
    rank_for_score(score, breakpoints)
        .map(Rank::Bucket)
        .unwrap_or(Rank::ScoreOutOfRange)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rank_buckets() {
        let bp = DEFAULT_RANK_BREAKPOINTS;
        assert_eq!(rank_for_score(0.06, &bp), Ok(1));
        assert_eq!(rank_for_score(0.07, &bp), Ok(1));
        assert_eq!(rank_for_score(0.08, &bp), Ok(2));
        assert_eq!(rank_for_score(0.3, &bp), Ok(3));
        assert_eq!(rank_for_score(0.5, &bp), Ok(4));
        assert_eq!(rank_for_score(0.99, &bp), Ok(4));
        assert_eq!(rank_for_score(1.0, &bp), Ok(5));
    }

    #[test]
    fn test_rank_out_of_range() {
        let bp = DEFAULT_RANK_BREAKPOINTS;
        assert_eq!(
            rank_for_score(0.05, &bp),
            Err(LicenseIdError::ScoreOutOfRange { score: 0.05 })
        );
        assert!(rank_for_score(1.5, &bp).is_err());
        assert_eq!(rank(0.0, &bp), Rank::ScoreOutOfRange);
        assert_eq!(rank(0.07, &bp), Rank::Bucket(1));
    }

    #[test]
    fn test_custom_breakpoints() {
        let bp = [0.0, 0.5, 0.9];
        assert_eq!(rank_for_score(0.0, &bp), Ok(1));
        assert_eq!(rank_for_score(0.7, &bp), Ok(2));
        assert_eq!(rank_for_score(0.9, &bp), Ok(3));
    }

    #[test]
    fn test_rank_serialization() {
        assert_eq!(serde_json::to_string(&Rank::Bucket(3)).unwrap(), "3");
        assert_eq!(
            serde_json::to_string(&Rank::ScoreOutOfRange).unwrap(),
            "\"ScoreOutOfRange\""
        );
        assert_eq!(Rank::ScoreOutOfRange.to_string(), "ScoreOutOfRange");
    }
}
