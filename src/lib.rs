pub mod cli;
pub mod identifier;
pub mod models;
pub mod output;
pub mod scanner;
pub mod utils;

pub use identifier::{
    IdentifierConfig, IdentifierConfigBuilder, LicenseIdError, LicenseIdentifier, LicenseLibrary,
    License, Source,
};
pub use models::{FileAnalysis, MatchResult, Output};
pub use scanner::{ProcessResult, process};
