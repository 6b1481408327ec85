//! Incremental build planning for the Vela compiler.
//!
//! Given a topologically sorted module list and its dependency graph, this
//! crate decides per module whether the previously produced interface
//! artifact can be reused or the module must be recompiled, and coordinates
//! concurrent workers so that "did this module's visible interface actually
//! change" propagates through the graph without cascading rebuilds.
//!
//! # Architecture
//!
//! ```text
//! MakeActions (sources, policies, cache db)
//!     │
//!     ▼  parallel fan-out, one task per module
//! RebuildStatus ──► partition() ── sequential, dependency order
//!     │                │
//!     │                ├──► Prebuilt map   (skipped at planning time)
//!     │                └──► BuildJob map   (one write-once ResultCell each)
//!     ▼
//! make() driver ── waits on dependency cells, consults is_cache_hit,
//!     │            invokes ModuleCompiler, routes success through the
//!     │            content-equality gate, merges externs into the EnvCell
//!     ▼
//! collect_results() ──► MakeOutcome
//! ```
//!
//! Skips happen at two distinct levels. A *prebuilt* module is skipped at
//! planning time and never receives a job. A *cache hit* is a job whose
//! compile step is skipped at the last moment because every direct
//! dependency finished without a visible interface change, which is what
//! stops a private edit in one module from rebuilding the world.

pub mod actions;
pub mod cache;
mod cell;
pub mod env;
pub mod error;
pub mod fs;
pub mod gate;
pub mod graph;
pub mod make;
pub mod plan;
mod status;
pub mod testing;

pub use actions::{InputInfo, MakeActions, RebuildPolicy};
pub use cache::{CacheDb, CacheInfo, SourceFingerprint};
pub use env::EnvCell;
pub use error::MakeError;
pub use fs::{FsActions, FsConfig};
pub use gate::build_job_succeeded;
pub use graph::DependencyGraph;
pub use make::{make, CompileOutcome, MakeOutcome, ModuleCompiler};
pub use plan::{BuildJob, BuildPlan, BuildResult, Prebuilt, Rebuild};
