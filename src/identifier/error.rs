/// Error type for conditions callers may want to catch.
///
/// I/O and decoding failures travel as `anyhow::Error`; these variants can
/// be recovered from one with `downcast_ref::<LicenseIdError>()`.
#[derive(Debug, Clone, PartialEq)]
pub enum LicenseIdError {
    /// Configuration rejected before any file was read
    InvalidConfig(String),

    /// Score outside every rank bucket
    ScoreOutOfRange { score: f64 },

    /// Library cache written by an incompatible version
    CacheVersionMismatch { found: u32, expected: u32 },

    /// Library cache that could not be decoded
    InvalidCache(String),
}

impl std::fmt::Display for LicenseIdError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidConfig(msg) => write!(f, "Invalid configuration: {}", msg),
            Self::ScoreOutOfRange { score } => {
                write!(f, "Score {} is outside every rank bucket", score)
            }
            Self::CacheVersionMismatch { found, expected } => write!(
                f,
                "License library cache has format version {}, expected {}",
                found, expected
            ),
            Self::InvalidCache(msg) => write!(f, "Invalid license library cache: {}", msg),
        }
    }
}

impl std::error::Error for LicenseIdError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_messages() {
        assert_eq!(
            LicenseIdError::CacheVersionMismatch {
                found: 1,
                expected: 2
            }
            .to_string(),
            "License library cache has format version 1, expected 2"
        );
        assert_eq!(
            LicenseIdError::InvalidConfig("bad".to_string()).to_string(),
            "Invalid configuration: bad"
        );
    }

    #[test]
    fn test_downcast_through_anyhow() {
        let err = anyhow::Error::new(LicenseIdError::ScoreOutOfRange { score: 0.01 });
        assert_eq!(
            err.downcast_ref::<LicenseIdError>(),
            Some(&LicenseIdError::ScoreOutOfRange { score: 0.01 })
        );
    }
}
