//! Per-module rebuild classification.
//!
//! Each module is classified independently from external, module-local
//! state only (disk timestamps, the cache database, policy configuration),
//! so the whole phase runs as an unordered parallel fan-out.

use std::sync::Arc;

use rayon::prelude::*;
use tracing::{debug, trace};
use vela_externs::{Externs, ModuleName};

use crate::actions::{InputInfo, MakeActions, RebuildPolicy};
use crate::cache::{CacheDb, CacheInfo};
use crate::error::MakeError;
use crate::plan::Prebuilt;

/// What the resolver learned about one module.
#[derive(Clone, Debug)]
pub(crate) struct RebuildStatus {
    pub(crate) module: ModuleName,
    /// The module is under a never-rebuild policy.
    pub(crate) rebuild_never: bool,
    /// Fresh fingerprint to persist; `None` under a policy override.
    pub(crate) new_cache_info: Option<CacheInfo>,
    /// Candidate prior artifact, subject to the propagator's admission.
    pub(crate) prebuilt: Option<Prebuilt>,
    /// Last known on-disk externs, read before staleness is known.
    pub(crate) dirty_externs: Option<Arc<Externs>>,
}

/// Classify every module concurrently.
pub(crate) fn resolve_statuses<A: MakeActions + ?Sized>(
    actions: &A,
    cache_db: &CacheDb,
    sorted: &[ModuleName],
) -> Result<Vec<RebuildStatus>, MakeError> {
    sorted
        .par_iter()
        .map(|module| resolve_status(actions, cache_db, module))
        .collect()
}

/// Classify a single module.
pub(crate) fn resolve_status<A: MakeActions + ?Sized>(
    actions: &A,
    cache_db: &CacheDb,
    module: &ModuleName,
) -> Result<RebuildStatus, MakeError> {
    match actions.input_info(module)? {
        InputInfo::Policy(RebuildPolicy::Never) => {
            let dirty = actions.read_externs(module);
            trace!(module = %module, "policy: never rebuild");
            Ok(RebuildStatus {
                module: module.clone(),
                rebuild_never: true,
                new_cache_info: None,
                prebuilt: existing_prebuilt(actions, module, dirty.as_ref()),
                dirty_externs: dirty,
            })
        }
        InputInfo::Policy(RebuildPolicy::Always) => {
            trace!(module = %module, "policy: always rebuild");
            Ok(RebuildStatus {
                module: module.clone(),
                rebuild_never: false,
                new_cache_info: None,
                prebuilt: None,
                dirty_externs: None,
            })
        }
        InputInfo::Fingerprint(fresh) => {
            let up_to_date = cache_db.is_up_to_date(module, &fresh);
            // The dirty externs are read even when stale: the content
            // equality gate needs them after a rebuild.
            let dirty = actions.read_externs(module);
            let prebuilt = if up_to_date {
                existing_prebuilt(actions, module, dirty.as_ref())
            } else {
                None
            };
            debug!(
                module = %module,
                up_to_date,
                candidate = prebuilt.is_some(),
                "input fingerprint checked"
            );
            Ok(RebuildStatus {
                module: module.clone(),
                rebuild_never: false,
                new_cache_info: Some(fresh),
                prebuilt,
                dirty_externs: dirty,
            })
        }
    }
}

/// A candidate prior artifact needs both a readable interface and an output
/// timestamp; a timestamp alone cannot seed dependents' environments.
fn existing_prebuilt<A: MakeActions + ?Sized>(
    actions: &A,
    module: &ModuleName,
    externs: Option<&Arc<Externs>>,
) -> Option<Prebuilt> {
    let externs = externs?;
    let timestamp = actions.output_timestamp(module)?;
    Some(Prebuilt {
        timestamp,
        externs: Arc::clone(externs),
    })
}
