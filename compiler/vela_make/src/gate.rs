//! The content-equality gate.
//!
//! Timestamps and fingerprints decide *whether to compile*; this gate
//! decides *whether to propagate*. After a genuine recompilation it compares
//! the new interface's cache-relevant declarations against the previous
//! (dirty) interface and, when they are equal, lets dependents treat the
//! module as unchanged. This is what keeps a one-line private edit from
//! rebuilding every transitive dependent.

use std::sync::Arc;

use tracing::debug;
use vela_diagnostic::Diagnostics;
use vela_externs::Externs;

use crate::plan::{BuildResult, Rebuild};

/// Fold a successful recompilation into a [`BuildResult`].
///
/// Content is the only authority here: warnings, spans, docs, and timestamps
/// never influence the flag. With no prior interface to compare against the
/// change is assumed visible.
pub fn build_job_succeeded(
    prior_dirty: Option<&Externs>,
    warnings: Diagnostics,
    externs: Arc<Externs>,
) -> BuildResult {
    let rebuild = match prior_dirty {
        Some(prior) if prior.cache_equivalent(&externs) => {
            debug!(module = %externs.module, "interface unchanged after rebuild");
            Rebuild::NotNeeded
        }
        Some(_) => {
            debug!(module = %externs.module, "interface changed");
            Rebuild::Needed
        }
        None => Rebuild::Needed,
    };
    BuildResult::Succeeded {
        warnings,
        externs,
        rebuild,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vela_diagnostic::Diagnostic;
    use vela_externs::{DeclKind, ExternsDecl, Span};

    fn interface(signature: &str) -> Externs {
        Externs::new("m")
            .with_declarations([ExternsDecl::new("f", DeclKind::Value, signature)])
    }

    fn rebuild_flag(result: &BuildResult) -> Rebuild {
        match result {
            BuildResult::Succeeded { rebuild, .. } => *rebuild,
            other => panic!("expected Succeeded, got {other:?}"),
        }
    }

    #[test]
    fn test_equal_interfaces_suppress_propagation() {
        let prior = interface("Int -> Int");
        let new = Arc::new(interface("Int -> Int"));
        let result = build_job_succeeded(Some(&prior), Diagnostics::new(), new);
        assert_eq!(rebuild_flag(&result), Rebuild::NotNeeded);
    }

    #[test]
    fn test_flag_is_independent_of_warnings_and_spans() {
        let prior = interface("Int -> Int");
        let new = Arc::new(
            Externs::new("m").with_declarations([ExternsDecl::new(
                "f",
                DeclKind::Value,
                "Int -> Int",
            )
            .with_span(Span::new(500, 540))
            .with_doc("moved and documented")]),
        );
        let mut warnings = Diagnostics::new();
        warnings.push(Diagnostic::warning("unused import"));
        let result = build_job_succeeded(Some(&prior), warnings, new);
        assert_eq!(rebuild_flag(&result), Rebuild::NotNeeded);
    }

    #[test]
    fn test_changed_interface_propagates() {
        let prior = interface("Int -> Int");
        let new = Arc::new(interface("Int -> Bool"));
        let result = build_job_succeeded(Some(&prior), Diagnostics::new(), new);
        assert_eq!(rebuild_flag(&result), Rebuild::Needed);
    }

    #[test]
    fn test_missing_prior_interface_propagates() {
        let new = Arc::new(interface("Int -> Int"));
        let result = build_job_succeeded(None, Diagnostics::new(), new);
        assert_eq!(rebuild_flag(&result), Rebuild::Needed);
    }
}
