//! The corpus of license templates and its universe n-gram model.
//!
//! A library is built once from `*.txt` templates (or loaded from a cache
//! file) and then shared read-only between workers behind an `Arc`.
//!
//! Cache layout: an 8 byte magic tag, a little-endian `u32` format version,
//! then the zstd-compressed bincode encoding of the licenses and universe.

use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::identifier::error::LicenseIdError;
use crate::identifier::ngram::NGramModel;
use crate::identifier::text::License;
use crate::utils::file::files_from_path;

const CACHE_MAGIC: &[u8; 8] = b"LICIDLIB";
pub const CACHE_FORMAT_VERSION: u32 = 1;
const CACHE_HEADER_LEN: usize = CACHE_MAGIC.len() + 4;
const ZSTD_LEVEL: i32 = 19;
/// Upper bound on the decoded payload size.
const CACHE_DECODE_LIMIT: usize = 1 << 30;

const LICENSE_EXTENSION: &str = "txt";

#[derive(Serialize)]
struct CachePayloadRef<'a> {
    licenses: &'a [License],
    universe_n_grams: &'a NGramModel,
}

#[derive(Deserialize)]
struct CachePayload {
    licenses: Vec<License>,
    universe_n_grams: NGramModel,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LicenseLibrary {
    licenses: Vec<License>,
    index_by_name: HashMap<String, usize>,
    universe_n_grams: Arc<NGramModel>,
}

impl LicenseLibrary {
    /// Build a library from templates in discovery order.
    ///
    /// A template whose name was already seen replaces the earlier one in
    /// place. Every template, replaced or not, feeds the universe model.
    pub fn from_licenses(templates: impl IntoIterator<Item = License>) -> Self {
        let mut licenses: Vec<License> = Vec::new();
        let mut index_by_name = HashMap::new();
        let mut universe = NGramModel::new();

        for license in templates {
            universe.add_lines(license.lines(), None);
            match index_by_name.get(license.name()) {
                Some(&position) => {
                    warn!("Duplicate license name {}, keeping the later one", license.name());
                    licenses[position] = license;
                }
                None => {
                    index_by_name.insert(license.name().to_string(), licenses.len());
                    licenses.push(license);
                }
            }
        }

        Self {
            licenses,
            index_by_name,
            universe_n_grams: Arc::new(universe),
        }
    }

    /// Load every `*.txt` template under `path`, or the single file `path`.
    ///
    /// Templates directly in a directory come before those in its
    /// sub-directories (such as `custom/`), each level sorted by name.
    pub fn from_path(path: &Path) -> Result<Self> {
        let files = files_from_path(path, &[])
            .with_context(|| format!("Failed to list license templates in {}", path.display()))?;

        let mut templates = Vec::new();
        for file in files
            .iter()
            .filter(|f| f.extension().and_then(|e| e.to_str()) == Some(LICENSE_EXTENSION))
        {
            match License::from_file(file) {
                Ok(license) => templates.push(license),
                Err(e) => warn!("Failed to load license template {}: {:#}", file.display(), e),
            }
        }

        let library = Self::from_licenses(templates);
        info!(
            "Loaded {} license templates from {}",
            library.len(),
            path.display()
        );
        Ok(library)
    }

    pub fn get(&self, name: &str) -> Option<&License> {
        self.index_by_name.get(name).map(|&i| &self.licenses[i])
    }

    pub fn licenses(&self) -> &[License] {
        &self.licenses
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.licenses.iter().map(License::name)
    }

    pub fn universe_n_grams(&self) -> &Arc<NGramModel> {
        &self.universe_n_grams
    }

    pub fn len(&self) -> usize {
        self.licenses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.licenses.is_empty()
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        encode_cache(&CachePayloadRef {
            licenses: &self.licenses,
            universe_n_grams: &self.universe_n_grams,
        })
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < CACHE_HEADER_LEN || &bytes[..CACHE_MAGIC.len()] != CACHE_MAGIC {
            return Err(LicenseIdError::InvalidCache("missing cache header".to_string()).into());
        }

        let mut version = [0u8; 4];
        version.copy_from_slice(&bytes[CACHE_MAGIC.len()..CACHE_HEADER_LEN]);
        let found = u32::from_le_bytes(version);
        if found != CACHE_FORMAT_VERSION {
            return Err(LicenseIdError::CacheVersionMismatch {
                found,
                expected: CACHE_FORMAT_VERSION,
            }
            .into());
        }

        let decompressed = zstd::decode_all(&bytes[CACHE_HEADER_LEN..])
            .map_err(|e| LicenseIdError::InvalidCache(e.to_string()))?;
        let config = bincode::config::standard().with_limit::<CACHE_DECODE_LIMIT>();
        let (payload, _): (CachePayload, usize) =
            bincode::serde::decode_from_slice(&decompressed, config)
                .map_err(|e| LicenseIdError::InvalidCache(e.to_string()))?;

        if let Some(license) = payload.licenses.iter().find(|l| !l.is_consistent()) {
            return Err(LicenseIdError::InvalidCache(format!(
                "inconsistent license template: {}",
                license.name()
            ))
            .into());
        }

        let index_by_name = payload
            .licenses
            .iter()
            .enumerate()
            .map(|(i, license)| (license.name().to_string(), i))
            .collect();

        Ok(Self {
            licenses: payload.licenses,
            index_by_name,
            universe_n_grams: Arc::new(payload.universe_n_grams),
        })
    }

    /// Write the library to a cache file.
    pub fn serialize(&self, path: &Path) -> Result<()> {
        let bytes = self.to_bytes()?;
        fs::write(path, bytes)
            .with_context(|| format!("Failed to write license cache: {}", path.display()))?;
        info!("Saved license library to {}", path.display());
        Ok(())
    }

    /// Load a library from a cache file.
    pub fn deserialize(path: &Path) -> Result<Self> {
        let bytes = fs::read(path)
            .with_context(|| format!("Failed to read license cache: {}", path.display()))?;
        let library = Self::from_bytes(&bytes)
            .with_context(|| format!("Failed to load license cache: {}", path.display()))?;
        info!(
            "Loaded {} license templates from cache {}",
            library.len(),
            path.display()
        );
        Ok(library)
    }
}

/// Header followed by the compressed bincode encoding of `payload`.
fn encode_cache<T: Serialize>(payload: &T) -> Result<Vec<u8>> {
    let encoded = bincode::serde::encode_to_vec(payload, bincode::config::standard())
        .context("Failed to encode license library")?;
    let compressed =
        zstd::encode_all(&encoded[..], ZSTD_LEVEL).context("Failed to compress license library")?;

    let mut bytes = Vec::with_capacity(CACHE_HEADER_LEN + compressed.len());
    bytes.extend_from_slice(CACHE_MAGIC);
    bytes.extend_from_slice(&CACHE_FORMAT_VERSION.to_le_bytes());
    bytes.extend_from_slice(&compressed);
    Ok(bytes)
}
