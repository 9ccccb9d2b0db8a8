//! Content-addressed cache for static asset generation.
//!
//! Re-encoding every image on every pass is the slowest part of a build.
//! Each output file is recorded in a manifest together with two hashes:
//!
//! - **`source_hash`**: SHA-256 of the source file bytes. Content based, so
//!   it survives `git checkout` resetting modification times.
//! - **`params_hash`**: SHA-256 of what was done to the source (operation,
//!   output format, quality). Changing `images.quality` or flipping
//!   `compress_to_webp` changes it.
//!
//! Lookups go by `(source_hash, params_hash)`, not by output path, so
//! renaming a directory turns a re-encode into a file copy.
//!
//! ```text
//! lookup ──► Hit            output already on disk at the expected path
//!        ──► Moved(old)     same content was written elsewhere, copy it
//!        ──► Miss           run the operation
//! ```
//!
//! The manifest is JSON at `<output_dir>/.cache-manifest.json`. A missing,
//! corrupt or outdated manifest loads as empty.

use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::io;
use std::path::Path;

/// Name of the cache manifest file within the output directory.
pub const MANIFEST_FILENAME: &str = ".cache-manifest.json";

/// Bump to invalidate existing manifests when the key computation changes.
const MANIFEST_VERSION: u32 = 1;

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
pub struct CacheEntry {
    pub source_hash: String,
    pub params_hash: String,
}

/// Result of a cache lookup for one output file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheLookup {
    Hit,
    /// Identical output exists at another path (relative to the output dir).
    Moved(String),
    Miss,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct CacheManifest {
    pub version: u32,
    /// Output path (relative to the output dir) → hashes it was built from.
    pub entries: BTreeMap<String, CacheEntry>,
    /// `"{source_hash}:{params_hash}"` → output path. Rebuilt on load.
    #[serde(skip)]
    by_content: HashMap<String, String>,
}

impl CacheManifest {
    pub fn empty() -> Self {
        Self {
            version: MANIFEST_VERSION,
            entries: BTreeMap::new(),
            by_content: HashMap::new(),
        }
    }

    /// Load from the output directory, falling back to an empty manifest.
    pub fn load(output_dir: &Path) -> Self {
        let path = output_dir.join(MANIFEST_FILENAME);
        let Ok(content) = std::fs::read_to_string(&path) else {
            return Self::empty();
        };
        let mut manifest: Self = match serde_json::from_str(&content) {
            Ok(m) => m,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "ignoring unreadable cache manifest");
                return Self::empty();
            }
        };
        if manifest.version != MANIFEST_VERSION {
            return Self::empty();
        }
        manifest.by_content = manifest
            .entries
            .iter()
            .map(|(output, entry)| (content_key(&entry.source_hash, &entry.params_hash), output.clone()))
            .collect();
        manifest
    }

    pub fn save(&self, output_dir: &Path) -> io::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(output_dir.join(MANIFEST_FILENAME), json)
    }

    /// Decide whether `output` needs to be produced.
    pub fn lookup(
        &self,
        output: &str,
        source_hash: &str,
        params_hash: &str,
        output_dir: &Path,
    ) -> CacheLookup {
        let Some(stored) = self.by_content.get(&content_key(source_hash, params_hash)) else {
            return CacheLookup::Miss;
        };
        if !output_dir.join(stored).exists() {
            return CacheLookup::Miss;
        }
        if stored == output {
            CacheLookup::Hit
        } else {
            CacheLookup::Moved(stored.clone())
        }
    }

    /// Record an output. A previous entry for the same content under another
    /// path is dropped.
    pub fn insert(&mut self, output: String, source_hash: String, params_hash: String) {
        let key = content_key(&source_hash, &params_hash);
        if let Some(old) = self.by_content.get(&key)
            && *old != output
        {
            self.entries.remove(old.as_str());
        }
        self.by_content.insert(key, output.clone());
        self.entries.insert(
            output,
            CacheEntry {
                source_hash,
                params_hash,
            },
        );
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn content_key(source_hash: &str, params_hash: &str) -> String {
    format!("{source_hash}:{params_hash}")
}

/// SHA-256 of a file's contents as lowercase hex.
pub fn hash_file(path: &Path) -> io::Result<String> {
    let bytes = std::fs::read(path)?;
    Ok(format!("{:x}", Sha256::digest(&bytes)))
}

/// SHA-256 over a list of parameter fields, NUL separated.
pub fn hash_params(fields: &[&str]) -> String {
    let mut hasher = Sha256::new();
    for field in fields {
        hasher.update(field.as_bytes());
        hasher.update(b"\0");
    }
    format!("{:x}", hasher.finalize())
}

/// Per-pass cache counters.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u32,
    pub copies: u32,
    pub misses: u32,
}

impl CacheStats {
    pub fn record(&mut self, lookup: &CacheLookup) {
        match lookup {
            CacheLookup::Hit => self.hits += 1,
            CacheLookup::Moved(_) => self.copies += 1,
            CacheLookup::Miss => self.misses += 1,
        }
    }

    pub fn total(&self) -> u32 {
        self.hits + self.copies + self.misses
    }
}

impl fmt::Display for CacheStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.hits, self.copies) {
            (0, 0) => write!(f, "{} written", self.misses),
            (_, 0) => write!(
                f,
                "{} cached, {} written ({} total)",
                self.hits,
                self.misses,
                self.total()
            ),
            _ => write!(
                f,
                "{} cached, {} copied, {} written ({} total)",
                self.hits,
                self.copies,
                self.misses,
                self.total()
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn empty_manifest_misses() {
        let tmp = TempDir::new().unwrap();
        let m = CacheManifest::empty();
        assert!(m.is_empty());
        assert_eq!(m.lookup("static/a.webp", "s", "p", tmp.path()), CacheLookup::Miss);
    }

    #[test]
    fn hit_requires_file_on_disk() {
        let tmp = TempDir::new().unwrap();
        let mut m = CacheManifest::empty();
        m.insert("static/a.webp".into(), "s".into(), "p".into());
        assert_eq!(m.lookup("static/a.webp", "s", "p", tmp.path()), CacheLookup::Miss);

        fs::create_dir_all(tmp.path().join("static")).unwrap();
        fs::write(tmp.path().join("static/a.webp"), "x").unwrap();
        assert_eq!(m.lookup("static/a.webp", "s", "p", tmp.path()), CacheLookup::Hit);
    }

    #[test]
    fn different_hashes_miss() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("a.webp"), "x").unwrap();
        let mut m = CacheManifest::empty();
        m.insert("a.webp".into(), "s".into(), "p".into());
        assert_eq!(m.lookup("a.webp", "other", "p", tmp.path()), CacheLookup::Miss);
        assert_eq!(m.lookup("a.webp", "s", "other", tmp.path()), CacheLookup::Miss);
    }

    #[test]
    fn moved_content_reports_old_path() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("old.webp"), "x").unwrap();
        let mut m = CacheManifest::empty();
        m.insert("old.webp".into(), "s".into(), "p".into());
        assert_eq!(
            m.lookup("new.webp", "s", "p", tmp.path()),
            CacheLookup::Moved("old.webp".into())
        );
    }

    #[test]
    fn insert_replaces_stale_path() {
        let mut m = CacheManifest::empty();
        m.insert("old.webp".into(), "s".into(), "p".into());
        m.insert("new.webp".into(), "s".into(), "p".into());
        assert!(!m.entries.contains_key("old.webp"));
        assert!(m.entries.contains_key("new.webp"));
        assert_eq!(m.len(), 1);
    }

    #[test]
    fn save_and_load_roundtrip() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("a.webp"), "x").unwrap();
        let mut m = CacheManifest::empty();
        m.insert("a.webp".into(), "s".into(), "p".into());
        m.save(tmp.path()).unwrap();

        let loaded = CacheManifest::load(tmp.path());
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded.lookup("a.webp", "s", "p", tmp.path()), CacheLookup::Hit);
    }

    #[test]
    fn corrupt_or_outdated_manifest_loads_empty() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join(MANIFEST_FILENAME), "{ not json").unwrap();
        assert!(CacheManifest::load(tmp.path()).is_empty());

        fs::write(
            tmp.path().join(MANIFEST_FILENAME),
            r#"{"version": 999, "entries": {"a": {"source_hash": "s", "params_hash": "p"}}}"#,
        )
        .unwrap();
        assert!(CacheManifest::load(tmp.path()).is_empty());
    }

    #[test]
    fn hashes_are_stable_and_distinct() {
        assert_eq!(hash_params(&["webp", "90"]), hash_params(&["webp", "90"]));
        assert_ne!(hash_params(&["webp", "90"]), hash_params(&["webp", "80"]));
        assert_ne!(hash_params(&["ab", "c"]), hash_params(&["a", "bc"]));

        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("f");
        fs::write(&path, "hello").unwrap();
        assert_eq!(
            hash_file(&path).unwrap(),
            "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
        );
    }

    #[test]
    fn stats_display() {
        let mut stats = CacheStats::default();
        stats.record(&CacheLookup::Miss);
        assert_eq!(stats.to_string(), "1 written");
        stats.record(&CacheLookup::Hit);
        assert_eq!(stats.to_string(), "1 cached, 1 written (2 total)");
        stats.record(&CacheLookup::Moved("x".into()));
        assert_eq!(stats.to_string(), "1 cached, 1 copied, 1 written (3 total)");
    }
}
