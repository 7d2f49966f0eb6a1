mod process;

use std::collections::BTreeMap;

use crate::models::FileAnalysis;

pub struct ProcessResult {
    pub files: BTreeMap<String, FileAnalysis>,
}

pub use self::process::process;
