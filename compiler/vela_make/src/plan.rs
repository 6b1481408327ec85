//! The build plan: prebuilt modules, build jobs, and their result cells.
//!
//! Construction runs in two phases. The resolver fan-out classifies every
//! module in parallel; then a single sequential pass in dependency order
//! decides which candidates survive as prebuilt. The order is load-bearing:
//! because dependencies are visited first, one forward scan propagates
//! "must rebuild" transitively to every downstream consumer.

use std::sync::Arc;
use std::time::SystemTime;

use rustc_hash::{FxHashMap, FxHashSet};
use tracing::{debug, trace};
use vela_diagnostic::Diagnostics;
use vela_externs::{Environment, Externs, ModuleName};

use crate::actions::MakeActions;
use crate::cache::CacheDb;
use crate::cell::ResultCell;
use crate::env::EnvCell;
use crate::error::MakeError;
use crate::graph::DependencyGraph;
use crate::status::{resolve_statuses, RebuildStatus};

/// A module known not to require compilation this run.
#[derive(Clone, Debug)]
pub struct Prebuilt {
    /// When the artifact was produced.
    pub timestamp: SystemTime,
    /// The reused interface.
    pub externs: Arc<Externs>,
}

/// Whether a genuine recompilation changed the module's cache-relevant
/// declarations.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum Rebuild {
    /// The visible interface changed; dependents must notice.
    Needed,
    /// The visible interface is unchanged; dependents may treat the module
    /// as if it had not been rebuilt.
    NotNeeded,
}

/// Terminal outcome of one build job.
#[derive(Clone, Debug)]
pub enum BuildResult {
    /// The module was genuinely recompiled.
    Succeeded {
        warnings: Diagnostics,
        externs: Arc<Externs>,
        rebuild: Rebuild,
    },
    /// Compilation was skipped at the last moment: every direct dependency
    /// proved unchanged, so the dirty externs are still valid.
    CacheHit { externs: Arc<Externs> },
    /// Compilation failed; the error set travels verbatim.
    Failed { errors: Diagnostics },
    /// Never attempted because an upstream module failed or was skipped.
    Skipped,
}

impl BuildResult {
    /// Whether dependents may treat this module as unchanged.
    ///
    /// Failed and skipped modules are never "unchanged": a missing result
    /// must not be mistaken for a cache hit.
    pub fn unchanged_for_dependents(&self) -> bool {
        matches!(
            self,
            BuildResult::Succeeded {
                rebuild: Rebuild::NotNeeded,
                ..
            } | BuildResult::CacheHit { .. }
        )
    }
}

/// A module requiring the driver's attention this run.
pub struct BuildJob {
    cell: ResultCell,
    /// Candidate prior artifact: present when the module itself was up to
    /// date and only a dependency forced the job.
    pub(crate) prior: Option<Prebuilt>,
    /// Last known on-disk externs, read before staleness was known.
    pub(crate) dirty_externs: Option<Arc<Externs>>,
}

impl BuildJob {
    fn new(prior: Option<Prebuilt>, dirty_externs: Option<Arc<Externs>>) -> Self {
        BuildJob {
            cell: ResultCell::new(),
            prior,
            dirty_externs,
        }
    }
}

/// The per-run build plan.
///
/// Every module of the sorted input list is present in exactly one of the
/// two maps: prebuilt (skipped at planning time) or jobs (owned by a
/// write-once result cell).
pub struct BuildPlan {
    prebuilt: FxHashMap<ModuleName, Prebuilt>,
    jobs: FxHashMap<ModuleName, BuildJob>,
    env: EnvCell,
}

impl BuildPlan {
    /// Build the plan and the updated cache database.
    ///
    /// Reads external state (disk, policies) through `actions` but mutates
    /// nothing; the updated database is returned, not persisted.
    pub fn construct<A: MakeActions + ?Sized>(
        actions: &A,
        cache_db: &CacheDb,
        sorted: &[ModuleName],
        graph: &DependencyGraph,
        base_env: Environment,
    ) -> Result<(BuildPlan, CacheDb), MakeError> {
        let statuses = resolve_statuses(actions, cache_db, sorted)?;

        // The next run's history is exactly this run's fresh fingerprints:
        // policy-governed modules contribute none and so have no entry.
        let mut updated_db = CacheDb::new();
        for status in &statuses {
            if let Some(info) = &status.new_cache_info {
                updated_db.insert(status.module.clone(), info.clone());
            }
        }

        let (prebuilt, to_build) = partition(sorted, graph, statuses);
        debug!(
            prebuilt = prebuilt.len(),
            jobs = to_build.len(),
            "build plan constructed"
        );

        let jobs = to_build
            .into_iter()
            .map(|(module, prior, dirty)| (module, BuildJob::new(prior, dirty)))
            .collect();

        let plan = BuildPlan {
            prebuilt,
            jobs,
            env: EnvCell::new(base_env),
        };
        Ok((plan, updated_db))
    }

    /// Whether the module has a build job (vs. being prebuilt).
    pub fn needs_rebuild(&self, module: &ModuleName) -> bool {
        self.jobs.contains_key(module)
    }

    /// Record the one-and-only outcome for a module's build job.
    ///
    /// # Panics
    /// Panics if the module has no build job, or if a result was already
    /// recorded; both are driver bugs that would corrupt downstream
    /// decisions if tolerated.
    pub fn mark_complete(&self, module: &ModuleName, result: BuildResult) {
        let Some(job) = self.jobs.get(module) else {
            panic!("mark_complete: module {module} has no build job");
        };
        job.cell.write(module, result);
    }

    /// Unified view of a module's outcome: `(warnings, externs, rebuild)`.
    ///
    /// Prebuilt modules report immediately as unchanged with no warnings;
    /// modules with a job block until their cell is written. `None` means
    /// the module failed or was skipped.
    ///
    /// # Panics
    /// Panics if the module is in neither map.
    pub fn get_result(
        &self,
        module: &ModuleName,
    ) -> Option<(Diagnostics, Arc<Externs>, Rebuild)> {
        if let Some(pb) = self.prebuilt.get(module) {
            return Some((
                Diagnostics::new(),
                Arc::clone(&pb.externs),
                Rebuild::NotNeeded,
            ));
        }
        let Some(job) = self.jobs.get(module) else {
            panic!("get_result: module {module} is in neither the prebuilt map nor the job map");
        };
        match job.cell.wait() {
            BuildResult::Succeeded {
                warnings,
                externs,
                rebuild,
            } => Some((warnings, externs, rebuild)),
            BuildResult::CacheHit { externs } => {
                Some((Diagnostics::new(), externs, Rebuild::NotNeeded))
            }
            BuildResult::Failed { .. } | BuildResult::Skipped => None,
        }
    }

    /// Block until every job's cell is written, then return the complete
    /// module → result mapping, prebuilt modules included.
    pub fn collect_results(&self) -> FxHashMap<ModuleName, BuildResult> {
        let mut results: FxHashMap<ModuleName, BuildResult> = self
            .prebuilt
            .iter()
            .map(|(module, pb)| {
                (
                    module.clone(),
                    BuildResult::Succeeded {
                        warnings: Diagnostics::new(),
                        externs: Arc::clone(&pb.externs),
                        rebuild: Rebuild::NotNeeded,
                    },
                )
            })
            .collect();
        for (module, job) in &self.jobs {
            results.insert(module.clone(), job.cell.wait());
        }
        results
    }

    /// Compile-time skip check for a module about to be compiled.
    ///
    /// True iff the dirty externs exist, were produced against the same
    /// direct dependencies, and every direct dependency completed without a
    /// visible interface change. Only *direct* dependencies are inspected:
    /// each dependency's recorded flag already reflects its own chain.
    /// Cells are peeked, never consumed, so concurrent callers are fine.
    pub fn is_cache_hit(
        &self,
        direct_deps: &[ModuleName],
        dep_externs: &[Arc<Externs>],
        dirty_externs: Option<&Arc<Externs>>,
    ) -> bool {
        let Some(dirty) = dirty_externs else {
            return false;
        };
        if dep_externs.len() != direct_deps.len() {
            return false;
        }
        if !direct_deps
            .iter()
            .zip(dep_externs)
            .all(|(dep, externs)| externs.module == *dep)
        {
            return false;
        }
        // The dirty artifact must not reference imports that are no longer
        // dependencies; such an artifact describes a different module shape.
        let current: FxHashSet<&ModuleName> = direct_deps.iter().collect();
        if dirty.imports.iter().any(|import| !current.contains(import)) {
            return false;
        }
        direct_deps.iter().all(|dep| {
            if self.prebuilt.contains_key(dep) {
                return true;
            }
            match self.jobs.get(dep) {
                Some(job) => job
                    .cell
                    .peek()
                    .is_some_and(|result| result.unchanged_for_dependents()),
                None => false,
            }
        })
    }

    /// The pre-read stale externs for a module with a build job.
    pub fn dirty_externs(&self, module: &ModuleName) -> Option<Arc<Externs>> {
        self.jobs
            .get(module)
            .and_then(|job| job.dirty_externs.as_ref().map(Arc::clone))
    }

    /// The candidate prior artifact for a module with a build job.
    pub fn prior_artifact(&self, module: &ModuleName) -> Option<&Prebuilt> {
        self.jobs.get(module).and_then(|job| job.prior.as_ref())
    }

    /// Modules skipped at planning time.
    pub fn prebuilt_modules(&self) -> impl Iterator<Item = &ModuleName> {
        self.prebuilt.keys()
    }

    /// Modules with a build job.
    pub fn job_modules(&self) -> impl Iterator<Item = &ModuleName> {
        self.jobs.keys()
    }

    /// The shared environment cell.
    pub fn env(&self) -> &EnvCell {
        &self.env
    }
}

/// Partition the module list into prebuilt survivors and jobs-to-be.
///
/// A single forward pass over the topologically sorted list; dependencies
/// are decided before dependents. A module survives as prebuilt when it is
/// under a never-rebuild policy, or when it has a candidate artifact, every
/// direct dependency already survived, and its artifact is not older than
/// the newest dependency artifact.
fn partition(
    sorted: &[ModuleName],
    graph: &DependencyGraph,
    statuses: Vec<RebuildStatus>,
) -> (
    FxHashMap<ModuleName, Prebuilt>,
    Vec<(ModuleName, Option<Prebuilt>, Option<Arc<Externs>>)>,
) {
    let mut by_name: FxHashMap<ModuleName, RebuildStatus> = statuses
        .into_iter()
        .map(|status| (status.module.clone(), status))
        .collect();

    let mut prebuilt: FxHashMap<ModuleName, Prebuilt> = FxHashMap::default();
    let mut to_build = Vec::new();

    for module in sorted {
        let status = by_name
            .remove(module)
            .unwrap_or_else(|| panic!("no rebuild status for module {module}"));
        let RebuildStatus {
            rebuild_never,
            prebuilt: candidate,
            dirty_externs,
            ..
        } = status;

        match candidate {
            Some(pb) if rebuild_never => {
                prebuilt.insert(module.clone(), pb);
            }
            Some(pb) if deps_admit(module, &pb, graph, &prebuilt) => {
                prebuilt.insert(module.clone(), pb);
            }
            candidate => {
                to_build.push((module.clone(), candidate, dirty_externs));
            }
        }
    }

    (prebuilt, to_build)
}

/// Admission check against already-decided dependencies.
fn deps_admit(
    module: &ModuleName,
    candidate: &Prebuilt,
    graph: &DependencyGraph,
    prebuilt: &FxHashMap<ModuleName, Prebuilt>,
) -> bool {
    let mut newest_dep: Option<SystemTime> = None;
    for dep in graph.direct_deps(module) {
        let Some(dep_pb) = prebuilt.get(dep) else {
            trace!(module = %module, dep = %dep, "dependency is scheduled for rebuild");
            return false;
        };
        newest_dep = Some(match newest_dep {
            Some(ts) => ts.max(dep_pb.timestamp),
            None => dep_pb.timestamp,
        });
    }
    match newest_dep {
        Some(ts) if candidate.timestamp < ts => {
            trace!(module = %module, "artifact is older than its newest dependency");
            false
        }
        _ => true,
    }
}
