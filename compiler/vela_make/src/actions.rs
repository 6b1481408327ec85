//! The collaborator seam: everything the planner reads from the outside
//! world goes through [`MakeActions`].
//!
//! The resolver fan-out calls these methods concurrently from many threads,
//! so implementations hold no per-call mutable state.

use std::sync::Arc;
use std::time::SystemTime;

use vela_externs::{Externs, ModuleName};

use crate::cache::{CacheDb, CacheInfo};
use crate::error::MakeError;

/// Per-module override attached by external configuration.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum RebuildPolicy {
    /// Reuse the existing artifact unconditionally; never persist history.
    Never,
    /// Recompile unconditionally; never trust or persist history.
    Always,
}

/// What the collaborator knows about a module's inputs.
#[derive(Clone, Debug)]
pub enum InputInfo {
    /// The module is under a policy override.
    Policy(RebuildPolicy),
    /// Freshly computed evidence about the module's source file(s).
    Fingerprint(CacheInfo),
}

/// Filesystem and policy collaborators consumed by the planner.
pub trait MakeActions: Sync {
    /// Policy override or fresh input fingerprint for a module.
    fn input_info(&self, module: &ModuleName) -> Result<InputInfo, MakeError>;

    /// Best-effort read of the last known on-disk externs, regardless of
    /// staleness. `None` covers both "never compiled" and "unreadable".
    fn read_externs(&self, module: &ModuleName) -> Option<Arc<Externs>>;

    /// Timestamp of the last compiled artifact, if one exists.
    fn output_timestamp(&self, module: &ModuleName) -> Option<SystemTime>;

    /// Load the persisted cache database; an absent file is an empty one.
    fn read_cache_db(&self) -> Result<CacheDb, MakeError>;

    /// Persist the cache database. Called exactly once, at the end of a run,
    /// after all results are collected.
    fn write_cache_db(&self, db: &CacheDb) -> Result<(), MakeError>;
}
