//! The persisted cache database and per-module input fingerprints.
//!
//! A fingerprint records two kinds of evidence per source file: the
//! modification time and a content hash. Equal mtimes short-circuit the
//! comparison; differing mtimes fall back to hash equality, so touching a
//! file without editing it never forces a rebuild.

use std::collections::BTreeMap;
use std::hash::Hasher;
use std::path::PathBuf;
use std::time::SystemTime;

use rustc_hash::{FxHashMap, FxHasher};
use serde::{Deserialize, Serialize};
use tracing::trace;
use vela_externs::ModuleName;

/// Stable hash of raw file content.
pub fn hash_content(content: &[u8]) -> u64 {
    let mut hasher = FxHasher::default();
    hasher.write(content);
    hasher.finish()
}

/// Modification evidence for one source file.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Serialize, Deserialize)]
pub struct SourceFingerprint {
    pub modified: SystemTime,
    pub content_hash: u64,
}

impl SourceFingerprint {
    /// Create a fingerprint from known evidence.
    pub fn new(modified: SystemTime, content_hash: u64) -> Self {
        SourceFingerprint {
            modified,
            content_hash,
        }
    }

    /// Fingerprint a file's content directly.
    pub fn of_content(modified: SystemTime, content: &[u8]) -> Self {
        SourceFingerprint::new(modified, hash_content(content))
    }

    /// Same evidence: equal mtime short-circuits, otherwise hashes decide.
    fn matches(&self, stored: &SourceFingerprint) -> bool {
        self.modified == stored.modified || self.content_hash == stored.content_hash
    }
}

/// Fingerprint of a module's input source file(s).
///
/// Files are kept in a `BTreeMap` so serialization order is deterministic.
#[derive(Clone, Eq, PartialEq, Debug, Default, Serialize, Deserialize)]
pub struct CacheInfo {
    files: BTreeMap<PathBuf, SourceFingerprint>,
}

impl CacheInfo {
    /// Create an empty fingerprint set.
    pub fn new() -> Self {
        CacheInfo::default()
    }

    /// Fingerprint for a single-file module.
    pub fn single(path: impl Into<PathBuf>, fingerprint: SourceFingerprint) -> Self {
        let mut info = CacheInfo::new();
        info.insert(path, fingerprint);
        info
    }

    /// Record one file's fingerprint.
    pub fn insert(&mut self, path: impl Into<PathBuf>, fingerprint: SourceFingerprint) {
        self.files.insert(path.into(), fingerprint);
    }

    /// Number of fingerprinted files.
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Whether no files are fingerprinted.
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Up-to-date against a stored fingerprint set: same file set, every
    /// file's evidence matching.
    pub fn matches(&self, stored: &CacheInfo) -> bool {
        self.files.len() == stored.files.len()
            && self
                .files
                .iter()
                .all(|(path, fp)| stored.files.get(path).is_some_and(|old| fp.matches(old)))
    }
}

/// Persisted `ModuleName` → [`CacheInfo`] mapping.
///
/// The absence of an entry means "no history, must be checked fresh". The
/// database is read once at run start and rebuilt from the run's freshly
/// computed fingerprints, so modules under an always-rebuild policy and
/// modules that left the project simply have no entry afterwards.
#[derive(Clone, Eq, PartialEq, Debug, Default, Serialize, Deserialize)]
pub struct CacheDb {
    entries: FxHashMap<ModuleName, CacheInfo>,
}

impl CacheDb {
    /// Create an empty database.
    pub fn new() -> Self {
        CacheDb::default()
    }

    /// Stored fingerprint for a module, if any.
    pub fn get(&self, module: &ModuleName) -> Option<&CacheInfo> {
        self.entries.get(module)
    }

    /// Record a module's fingerprint, replacing any previous entry.
    pub fn insert(&mut self, module: ModuleName, info: CacheInfo) {
        self.entries.insert(module, info);
    }

    /// Whether a module has history.
    pub fn contains(&self, module: &ModuleName) -> bool {
        self.entries.contains_key(module)
    }

    /// Number of recorded modules.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the database is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// True when `fresh` matches the stored entry for `module`.
    pub fn is_up_to_date(&self, module: &ModuleName, fresh: &CacheInfo) -> bool {
        match self.get(module) {
            Some(stored) => {
                let up_to_date = fresh.matches(stored);
                trace!(module = %module, up_to_date, "cache entry compared");
                up_to_date
            }
            None => {
                trace!(module = %module, "no cache history");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::time::Duration;

    fn stamp(secs: u64) -> SystemTime {
        SystemTime::UNIX_EPOCH + Duration::from_secs(secs)
    }

    #[test]
    fn test_equal_mtime_short_circuits() {
        // Same mtime, different hash: evidence says unchanged.
        let stored = SourceFingerprint::new(stamp(100), 1);
        let fresh = SourceFingerprint::new(stamp(100), 2);
        assert!(fresh.matches(&stored));
    }

    #[test]
    fn test_touched_file_falls_back_to_hash() {
        // mtime moved but content identical: still unchanged.
        let stored = SourceFingerprint::new(stamp(100), 42);
        let fresh = SourceFingerprint::new(stamp(200), 42);
        assert!(fresh.matches(&stored));
    }

    #[test]
    fn test_edited_file_is_stale() {
        let stored = SourceFingerprint::new(stamp(100), 42);
        let fresh = SourceFingerprint::new(stamp(200), 43);
        assert!(!fresh.matches(&stored));
    }

    #[test]
    fn test_changed_file_set_is_stale() {
        let fp = SourceFingerprint::new(stamp(100), 1);
        let stored = CacheInfo::single("a.vela", fp);
        let mut fresh = CacheInfo::single("a.vela", fp);
        fresh.insert("a_ffi.vela", fp);
        assert!(!fresh.matches(&stored));
        assert_eq!(fresh.len(), 2);
    }

    #[test]
    fn test_db_missing_entry_is_not_up_to_date() {
        let db = CacheDb::new();
        let info = CacheInfo::single("m.vela", SourceFingerprint::new(stamp(1), 1));
        assert!(!db.is_up_to_date(&ModuleName::new("m"), &info));
    }

    #[test]
    fn test_db_matching_entry_is_up_to_date() {
        let module = ModuleName::new("m");
        let info = CacheInfo::single("m.vela", SourceFingerprint::new(stamp(1), 1));
        let mut db = CacheDb::new();
        db.insert(module.clone(), info.clone());
        assert!(db.is_up_to_date(&module, &info));
        assert!(db.contains(&module));
        assert_eq!(db.len(), 1);
    }

    #[test]
    fn test_db_bincode_roundtrip() {
        let mut db = CacheDb::new();
        db.insert(
            ModuleName::new("data.list"),
            CacheInfo::single("data/list.vela", SourceFingerprint::new(stamp(7), 99)),
        );
        let bytes = bincode::serialize(&db).unwrap_or_else(|e| panic!("encode: {e}"));
        let decoded: CacheDb =
            bincode::deserialize(&bytes).unwrap_or_else(|e| panic!("decode: {e}"));
        assert_eq!(decoded, db);
    }

    #[test]
    fn test_hash_content_is_stable() {
        assert_eq!(hash_content(b"module m"), hash_content(b"module m"));
        assert_ne!(hash_content(b"module m"), hash_content(b"module n"));
    }
}
