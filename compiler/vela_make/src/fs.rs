//! Filesystem-backed [`MakeActions`].
//!
//! Layout under the output directory:
//!
//! ```text
//! <output_dir>/cache-db.bin            the cache database
//! <output_dir>/<module>/externs.vex    one interface artifact per module
//! ```
//!
//! The externs file doubles as the output-timestamp anchor: its mtime is the
//! module's artifact timestamp.

use std::fs;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::SystemTime;

use rustc_hash::FxHashMap;
use tracing::trace;
use vela_externs::{Externs, ModuleName};

use crate::actions::{InputInfo, MakeActions, RebuildPolicy};
use crate::cache::{CacheDb, CacheInfo, SourceFingerprint};
use crate::error::MakeError;

/// Name of the persisted cache database inside the output directory.
const CACHE_DB_FILE: &str = "cache-db.bin";

/// Name of a module's serialized interface artifact.
const EXTERNS_FILE: &str = "externs.vex";

/// Configuration for the filesystem collaborator.
#[derive(Clone, Debug, Default)]
pub struct FsConfig {
    /// Module → source file path.
    pub sources: FxHashMap<ModuleName, PathBuf>,
    /// Directory holding per-module artifacts and the cache database.
    pub output_dir: PathBuf,
    /// Per-module policy overrides.
    pub policies: FxHashMap<ModuleName, RebuildPolicy>,
}

/// Filesystem-backed collaborator.
pub struct FsActions {
    config: FsConfig,
}

impl FsActions {
    /// Create actions over `config`.
    pub fn new(config: FsConfig) -> Self {
        FsActions { config }
    }

    fn externs_path(&self, module: &ModuleName) -> PathBuf {
        self.config
            .output_dir
            .join(module.as_str())
            .join(EXTERNS_FILE)
    }

    fn cache_db_path(&self) -> PathBuf {
        self.config.output_dir.join(CACHE_DB_FILE)
    }

    /// Serialize a module's interface under the output directory.
    ///
    /// Intended for [`ModuleCompiler`](crate::make::ModuleCompiler)
    /// implementations that persist artifacts as they compile.
    pub fn write_externs(&self, externs: &Externs) -> Result<(), MakeError> {
        let path = self.externs_path(&externs.module);
        let io_err = |source: io::Error| MakeError::ExternsWrite {
            module: externs.module.clone(),
            source,
        };
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir).map_err(io_err)?;
        }
        let bytes = bincode::serialize(externs).map_err(|source| MakeError::ExternsEncode {
            module: externs.module.clone(),
            source,
        })?;
        fs::write(&path, bytes).map_err(io_err)
    }
}

impl MakeActions for FsActions {
    fn input_info(&self, module: &ModuleName) -> Result<InputInfo, MakeError> {
        if let Some(policy) = self.config.policies.get(module) {
            return Ok(InputInfo::Policy(*policy));
        }
        let path = self
            .config
            .sources
            .get(module)
            .ok_or_else(|| MakeError::UnknownModule(module.clone()))?;
        let io_err = |source: io::Error| MakeError::InputFingerprint {
            module: module.clone(),
            path: path.clone(),
            source,
        };
        let modified = fs::metadata(path).and_then(|m| m.modified()).map_err(io_err)?;
        let content = fs::read(path).map_err(io_err)?;
        Ok(InputInfo::Fingerprint(CacheInfo::single(
            path.clone(),
            SourceFingerprint::of_content(modified, &content),
        )))
    }

    fn read_externs(&self, module: &ModuleName) -> Option<Arc<Externs>> {
        let path = self.externs_path(module);
        let bytes = fs::read(&path).ok()?;
        let externs: Externs = match bincode::deserialize(&bytes) {
            Ok(externs) => externs,
            Err(error) => {
                trace!(module = %module, %error, "unreadable externs ignored");
                return None;
            }
        };
        // A stale-format or mislabeled artifact is as good as absent.
        if !externs.is_current_version() || externs.module != *module {
            trace!(module = %module, version = externs.version, "rejected externs artifact");
            return None;
        }
        Some(Arc::new(externs))
    }

    fn output_timestamp(&self, module: &ModuleName) -> Option<SystemTime> {
        fs::metadata(self.externs_path(module))
            .and_then(|m| m.modified())
            .ok()
    }

    fn read_cache_db(&self) -> Result<CacheDb, MakeError> {
        let path = self.cache_db_path();
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(error) if error.kind() == io::ErrorKind::NotFound => {
                return Ok(CacheDb::new());
            }
            Err(source) => return Err(MakeError::CacheRead { path, source }),
        };
        bincode::deserialize(&bytes).map_err(|source| MakeError::CacheDecode { path, source })
    }

    fn write_cache_db(&self, db: &CacheDb) -> Result<(), MakeError> {
        let path = self.cache_db_path();
        let io_err = |source: io::Error| MakeError::CacheWrite {
            path: path.clone(),
            source,
        };
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir).map_err(io_err)?;
        }
        let bytes = bincode::serialize(db).map_err(MakeError::CacheEncode)?;
        fs::write(&path, bytes).map_err(io_err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use vela_externs::{DeclKind, ExternsDecl, EXTERNS_VERSION};

    fn setup(dir: &tempfile::TempDir) -> FsActions {
        let mut sources = FxHashMap::default();
        sources.insert(ModuleName::new("m"), dir.path().join("m.vela"));
        FsActions::new(FsConfig {
            sources,
            output_dir: dir.path().join("out"),
            policies: FxHashMap::default(),
        })
    }

    #[test]
    fn test_externs_roundtrip() {
        let dir = tempfile::tempdir().unwrap_or_else(|e| panic!("{e}"));
        let actions = setup(&dir);
        let externs = Externs::new("m")
            .with_declarations([ExternsDecl::new("f", DeclKind::Value, "Int -> Int")]);

        actions.write_externs(&externs).unwrap_or_else(|e| panic!("{e}"));
        let read = actions
            .read_externs(&ModuleName::new("m"))
            .unwrap_or_else(|| panic!("externs must be readable back"));
        assert_eq!(*read, externs);
        assert!(actions.output_timestamp(&ModuleName::new("m")).is_some());
    }

    #[test]
    fn test_stale_format_externs_are_ignored() {
        let dir = tempfile::tempdir().unwrap_or_else(|e| panic!("{e}"));
        let actions = setup(&dir);
        let mut externs = Externs::new("m");
        externs.version = EXTERNS_VERSION - 1;
        actions.write_externs(&externs).unwrap_or_else(|e| panic!("{e}"));
        assert!(actions.read_externs(&ModuleName::new("m")).is_none());
    }

    #[test]
    fn test_missing_externs_read_as_none() {
        let dir = tempfile::tempdir().unwrap_or_else(|e| panic!("{e}"));
        let actions = setup(&dir);
        assert!(actions.read_externs(&ModuleName::new("m")).is_none());
        assert!(actions.output_timestamp(&ModuleName::new("m")).is_none());
    }

    #[test]
    fn test_missing_cache_db_is_empty() {
        let dir = tempfile::tempdir().unwrap_or_else(|e| panic!("{e}"));
        let actions = setup(&dir);
        let db = actions.read_cache_db().unwrap_or_else(|e| panic!("{e}"));
        assert!(db.is_empty());
    }

    #[test]
    fn test_cache_db_roundtrip() {
        let dir = tempfile::tempdir().unwrap_or_else(|e| panic!("{e}"));
        let actions = setup(&dir);
        let mut db = CacheDb::new();
        db.insert(
            ModuleName::new("m"),
            CacheInfo::single("m.vela", SourceFingerprint::new(SystemTime::UNIX_EPOCH, 1)),
        );
        actions.write_cache_db(&db).unwrap_or_else(|e| panic!("{e}"));
        let read = actions.read_cache_db().unwrap_or_else(|e| panic!("{e}"));
        assert_eq!(read, db);
    }

    #[test]
    fn test_input_info_fingerprints_source_content() {
        let dir = tempfile::tempdir().unwrap_or_else(|e| panic!("{e}"));
        let actions = setup(&dir);
        std::fs::write(dir.path().join("m.vela"), "module m").unwrap_or_else(|e| panic!("{e}"));

        let info = actions
            .input_info(&ModuleName::new("m"))
            .unwrap_or_else(|e| panic!("{e}"));
        match info {
            InputInfo::Fingerprint(info) => assert_eq!(info.len(), 1),
            InputInfo::Policy(policy) => panic!("unexpected policy {policy:?}"),
        }
    }

    #[test]
    fn test_missing_source_is_an_error() {
        let dir = tempfile::tempdir().unwrap_or_else(|e| panic!("{e}"));
        let actions = setup(&dir);
        let result = actions.input_info(&ModuleName::new("m"));
        assert!(matches!(result, Err(MakeError::InputFingerprint { .. })));
    }

    #[test]
    fn test_policy_override_wins_over_source() {
        let dir = tempfile::tempdir().unwrap_or_else(|e| panic!("{e}"));
        let mut actions = setup(&dir);
        actions
            .config
            .policies
            .insert(ModuleName::new("m"), RebuildPolicy::Always);
        let info = actions
            .input_info(&ModuleName::new("m"))
            .unwrap_or_else(|e| panic!("{e}"));
        assert!(matches!(info, InputInfo::Policy(RebuildPolicy::Always)));
    }
}
