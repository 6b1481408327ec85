//! The reference driver over a build plan.
//!
//! The planner decides *whether* each module compiles; the driver walks the
//! job graph and delegates *how* to the [`ModuleCompiler`] seam. Independent
//! branches of the graph compile concurrently; a module starts only after
//! every direct dependency's result cell is written.

use std::sync::Arc;

use rustc_hash::FxHashMap;
use tracing::{debug, info};
use vela_diagnostic::{Diagnostic, Diagnostics};
use vela_externs::{Environment, Externs, ModuleName};

use crate::actions::MakeActions;
use crate::env::EnvCell;
use crate::error::MakeError;
use crate::gate::build_job_succeeded;
use crate::graph::DependencyGraph;
use crate::plan::{BuildPlan, BuildResult};

/// Per-module outcome reported by the external compiler.
#[derive(Clone, Debug)]
pub enum CompileOutcome {
    /// The module compiled; `externs` is its new interface.
    Success {
        externs: Arc<Externs>,
        warnings: Diagnostics,
    },
    /// The module did not compile.
    Failure { errors: Diagnostics },
}

/// Seam to the actual compiler.
///
/// Implementations read the accumulated environment through the cell they
/// are handed and are responsible for writing whatever artifacts their
/// backend produces. Called from one thread per module.
pub trait ModuleCompiler: Sync {
    fn compile(&self, module: &ModuleName, env: &EnvCell) -> CompileOutcome;
}

/// Everything one run produced, keyed by module.
#[derive(Debug)]
pub struct MakeOutcome {
    pub results: FxHashMap<ModuleName, BuildResult>,
}

impl MakeOutcome {
    /// Modules whose compilation failed, sorted by name.
    pub fn failed(&self) -> Vec<&ModuleName> {
        let mut failed: Vec<&ModuleName> = self
            .results
            .iter()
            .filter(|(_, result)| matches!(result, BuildResult::Failed { .. }))
            .map(|(module, _)| module)
            .collect();
        failed.sort_unstable();
        failed
    }

    /// Modules never attempted because an upstream module failed.
    pub fn skipped(&self) -> Vec<&ModuleName> {
        let mut skipped: Vec<&ModuleName> = self
            .results
            .iter()
            .filter(|(_, result)| matches!(result, BuildResult::Skipped))
            .map(|(module, _)| module)
            .collect();
        skipped.sort_unstable();
        skipped
    }

    /// Whether every module reached a successful terminal state.
    pub fn is_success(&self) -> bool {
        self.results
            .values()
            .all(|result| !matches!(result, BuildResult::Failed { .. } | BuildResult::Skipped))
    }

    /// All warnings produced by succeeded modules, in per-module order.
    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.results
            .values()
            .filter_map(|result| match result {
                BuildResult::Succeeded { warnings, .. } => Some(warnings),
                _ => None,
            })
            .flatten()
    }
}

/// Run a full incremental build.
///
/// Loads the cache database, constructs the plan, drives every build job to
/// a terminal state, collects results, and persists the updated database
/// (single writer, after all results are in).
pub fn make<A, C>(
    actions: &A,
    compiler: &C,
    sorted: &[ModuleName],
    graph: &DependencyGraph,
    base_env: Environment,
) -> Result<MakeOutcome, MakeError>
where
    A: MakeActions + ?Sized,
    C: ModuleCompiler + ?Sized,
{
    let cache_db = actions.read_cache_db()?;
    let (plan, updated_db) = BuildPlan::construct(actions, &cache_db, sorted, graph, base_env)?;

    let to_build: Vec<&ModuleName> = sorted
        .iter()
        .filter(|module| plan.needs_rebuild(module))
        .collect();
    info!(
        modules = sorted.len(),
        jobs = to_build.len(),
        "starting build"
    );

    // One thread per job: a job blocks on its dependencies' cells, so jobs
    // must not share a bounded pool with the jobs they are waiting for.
    std::thread::scope(|scope| {
        for module in &to_build {
            let plan = &plan;
            scope.spawn(move || build_module(compiler, plan, graph, module));
        }
    });

    let results = plan.collect_results();
    actions.write_cache_db(&updated_db)?;
    Ok(MakeOutcome { results })
}

/// Drive one build job to a terminal state.
fn build_module<C: ModuleCompiler + ?Sized>(
    compiler: &C,
    plan: &BuildPlan,
    graph: &DependencyGraph,
    module: &ModuleName,
) {
    let deps = graph.direct_deps(module);

    // Every direct dependency must reach a terminal state first. An
    // upstream failure or skip propagates as Skipped, never as a result
    // that dependents could mistake for success.
    let mut dep_externs = Vec::with_capacity(deps.len());
    for dep in deps {
        match plan.get_result(dep) {
            Some((_, externs, _)) => dep_externs.push(externs),
            None => {
                debug!(module = %module, dep = %dep, "upstream failure, skipping");
                plan.mark_complete(module, BuildResult::Skipped);
                return;
            }
        }
    }

    // Compile-time skip: only meaningful when the module itself was up to
    // date (a candidate prior artifact exists) and a dirty interface is
    // available to republish.
    if plan.prior_artifact(module).is_some() {
        if let Some(dirty) = plan.dirty_externs(module) {
            if plan.is_cache_hit(deps, &dep_externs, Some(&dirty)) {
                debug!(module = %module, "cache hit, compile skipped");
                plan.env().merge_externs(&dirty);
                plan.mark_complete(module, BuildResult::CacheHit { externs: dirty });
                return;
            }
        }
    }

    match compiler.compile(module, plan.env()) {
        CompileOutcome::Success { externs, warnings } => {
            let dirty = plan.dirty_externs(module);
            let result = build_job_succeeded(dirty.as_deref(), warnings, externs);
            if let BuildResult::Succeeded { externs, .. } = &result {
                // Merge before publishing: dependents wake on the cell
                // write and must find this module already in the
                // environment.
                plan.env().merge_externs(externs);
            }
            plan.mark_complete(module, result);
        }
        CompileOutcome::Failure { errors } => {
            debug!(module = %module, errors = errors.len(), "compilation failed");
            plan.mark_complete(module, BuildResult::Failed { errors });
        }
    }
}
