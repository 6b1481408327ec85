//! In-memory collaborators for exercising the planner without a filesystem
//! or a compiler.
//!
//! Used by this crate's own tests and available to downstream crates that
//! need a scripted planner in theirs.

use std::sync::Arc;
use std::time::{Duration, SystemTime};

use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use vela_diagnostic::{Diagnostic, Diagnostics};
use vela_externs::{DeclKind, Externs, ExternsDecl, ModuleName};

use crate::actions::{InputInfo, MakeActions, RebuildPolicy};
use crate::cache::{CacheDb, CacheInfo};
use crate::env::EnvCell;
use crate::error::MakeError;
use crate::graph::DependencyGraph;
use crate::make::{CompileOutcome, ModuleCompiler};

/// Shorthand for building a [`ModuleName`].
pub fn module(name: impl AsRef<str>) -> ModuleName {
    ModuleName::new(name)
}

/// Deterministic timestamp, `secs` after the epoch.
pub fn stamp(secs: u64) -> SystemTime {
    SystemTime::UNIX_EPOCH + Duration::from_secs(secs)
}

/// Linear chain graph: each module depends on the one before it.
pub fn chain_graph(names: &[&str]) -> DependencyGraph {
    let mut graph = DependencyGraph::new();
    for (index, name) in names.iter().enumerate() {
        let deps = if index == 0 {
            Vec::new()
        } else {
            vec![module(names[index - 1])]
        };
        graph.insert(*name, deps);
    }
    graph
}

/// An interface with one value declaration per `(name, signature)` pair.
pub fn value_externs(name: impl AsRef<str>, decls: &[(&str, &str)]) -> Externs {
    Externs::new(name.as_ref()).with_declarations(
        decls
            .iter()
            .map(|(ident, signature)| ExternsDecl::new(*ident, DeclKind::Value, *signature)),
    )
}

/// In-memory [`MakeActions`]: fixed maps in, recorded cache database out.
#[derive(Default)]
pub struct StubActions {
    inputs: FxHashMap<ModuleName, InputInfo>,
    externs: FxHashMap<ModuleName, Arc<Externs>>,
    timestamps: FxHashMap<ModuleName, SystemTime>,
    cache_db: Mutex<CacheDb>,
}

impl StubActions {
    /// Create a stub with no modules.
    pub fn new() -> Self {
        StubActions::default()
    }

    /// Register a fresh fingerprint for a module.
    #[must_use]
    pub fn with_fingerprint(mut self, name: impl AsRef<str>, info: CacheInfo) -> Self {
        self.inputs
            .insert(module(name), InputInfo::Fingerprint(info));
        self
    }

    /// Put a module under a policy override.
    #[must_use]
    pub fn with_policy(mut self, name: impl AsRef<str>, policy: RebuildPolicy) -> Self {
        self.inputs.insert(module(name), InputInfo::Policy(policy));
        self
    }

    /// Register on-disk externs, keyed by the interface's own module name.
    #[must_use]
    pub fn with_externs(mut self, externs: Externs) -> Self {
        self.externs.insert(externs.module.clone(), Arc::new(externs));
        self
    }

    /// Register an output artifact timestamp.
    #[must_use]
    pub fn with_output_timestamp(mut self, name: impl AsRef<str>, timestamp: SystemTime) -> Self {
        self.timestamps.insert(module(name), timestamp);
        self
    }

    /// Seed the stored cache database.
    #[must_use]
    pub fn with_cache_db(self, db: CacheDb) -> Self {
        *self.cache_db.lock() = db;
        self
    }

    /// The cache database as last written (or seeded).
    pub fn stored_cache_db(&self) -> CacheDb {
        self.cache_db.lock().clone()
    }
}

impl MakeActions for StubActions {
    fn input_info(&self, module: &ModuleName) -> Result<InputInfo, MakeError> {
        self.inputs
            .get(module)
            .cloned()
            .ok_or_else(|| MakeError::UnknownModule(module.clone()))
    }

    fn read_externs(&self, module: &ModuleName) -> Option<Arc<Externs>> {
        self.externs.get(module).map(Arc::clone)
    }

    fn output_timestamp(&self, module: &ModuleName) -> Option<SystemTime> {
        self.timestamps.get(module).copied()
    }

    fn read_cache_db(&self) -> Result<CacheDb, MakeError> {
        Ok(self.cache_db.lock().clone())
    }

    fn write_cache_db(&self, db: &CacheDb) -> Result<(), MakeError> {
        *self.cache_db.lock() = db.clone();
        Ok(())
    }
}

/// Scripted [`ModuleCompiler`] that records which modules it was asked to
/// compile.
#[derive(Default)]
pub struct StubCompiler {
    outcomes: FxHashMap<ModuleName, CompileOutcome>,
    invoked: Mutex<Vec<ModuleName>>,
}

impl StubCompiler {
    /// Create a compiler with no scripted outcomes.
    pub fn new() -> Self {
        StubCompiler::default()
    }

    /// Script a successful compile producing `externs`.
    #[must_use]
    pub fn succeeds(mut self, externs: Externs) -> Self {
        self.outcomes.insert(
            externs.module.clone(),
            CompileOutcome::Success {
                externs: Arc::new(externs),
                warnings: Diagnostics::new(),
            },
        );
        self
    }

    /// Script a successful compile with warnings attached.
    #[must_use]
    pub fn succeeds_with_warnings(mut self, externs: Externs, warnings: Vec<Diagnostic>) -> Self {
        self.outcomes.insert(
            externs.module.clone(),
            CompileOutcome::Success {
                externs: Arc::new(externs),
                warnings: warnings.into(),
            },
        );
        self
    }

    /// Script a failing compile.
    #[must_use]
    pub fn fails(mut self, name: impl AsRef<str>, message: impl Into<String>) -> Self {
        let name = module(name);
        let error = Diagnostic::error(message).with_module(name.clone());
        self.outcomes.insert(
            name,
            CompileOutcome::Failure {
                errors: vec![error].into(),
            },
        );
        self
    }

    /// Modules compiled so far, in invocation order.
    pub fn invocations(&self) -> Vec<ModuleName> {
        self.invoked.lock().clone()
    }
}

impl ModuleCompiler for StubCompiler {
    fn compile(&self, module: &ModuleName, _env: &EnvCell) -> CompileOutcome {
        self.invoked.lock().push(module.clone());
        self.outcomes
            .get(module)
            .cloned()
            .unwrap_or_else(|| panic!("no scripted outcome for module {module}"))
    }
}
