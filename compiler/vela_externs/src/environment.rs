//! The accumulated environment of exported declarations.
//!
//! One `Environment` exists per build run. It starts from a base (builtin)
//! set of declarations and grows as modules finish: each completed module's
//! externs are merged in, so later modules compile against everything their
//! dependencies exported.

use rustc_hash::FxHashMap;

use crate::externs::{DeclKind, Externs};
use crate::name::{Ident, ModuleName};

/// An exported declaration as seen by downstream modules.
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct DeclSummary {
    pub kind: DeclKind,
    pub signature: String,
}

impl DeclSummary {
    /// Create a declaration summary.
    pub fn new(kind: DeclKind, signature: impl Into<String>) -> Self {
        DeclSummary {
            kind,
            signature: signature.into(),
        }
    }
}

/// Registry of accumulated type/name information, keyed by (module, name).
#[derive(Clone, Eq, PartialEq, Debug, Default)]
pub struct Environment {
    decls: FxHashMap<(ModuleName, Ident), DeclSummary>,
}

impl Environment {
    /// Create an empty environment.
    pub fn new() -> Self {
        Environment::default()
    }

    /// Register a single declaration, replacing any previous entry.
    pub fn insert(&mut self, module: ModuleName, name: Ident, summary: DeclSummary) {
        self.decls.insert((module, name), summary);
    }

    /// Look up a declaration exported by `module`.
    pub fn lookup(&self, module: &ModuleName, name: &Ident) -> Option<&DeclSummary> {
        self.decls.get(&(module.clone(), name.clone()))
    }

    /// Merge a completed module's exports into the registry.
    ///
    /// Re-merging the same module replaces its previous entries, so applying
    /// a rebuilt interface over a stale one is safe.
    pub fn merge_externs(&mut self, externs: &Externs) {
        for decl in &externs.declarations {
            self.insert(
                externs.module.clone(),
                decl.name.clone(),
                DeclSummary::new(decl.kind, decl.signature.clone()),
            );
        }
    }

    /// Number of registered declarations.
    pub fn len(&self) -> usize {
        self.decls.len()
    }

    /// Whether no declarations are registered.
    pub fn is_empty(&self) -> bool {
        self.decls.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::externs::ExternsDecl;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_merge_externs_registers_all_declarations() {
        let externs = Externs::new("data.list").with_declarations([
            ExternsDecl::new("map", DeclKind::Value, "(a -> b, List a) -> List b"),
            ExternsDecl::new("List", DeclKind::Type, "Type -> Type"),
        ]);

        let mut env = Environment::new();
        env.merge_externs(&externs);

        assert_eq!(env.len(), 2);
        let found = env
            .lookup(&ModuleName::new("data.list"), &Ident::new("List"))
            .cloned();
        assert_eq!(found, Some(DeclSummary::new(DeclKind::Type, "Type -> Type")));
    }

    #[test]
    fn test_remerge_replaces_stale_entries() {
        let module = ModuleName::new("m");
        let stale = Externs::new("m")
            .with_declarations([ExternsDecl::new("f", DeclKind::Value, "Int -> Int")]);
        let fresh = Externs::new("m")
            .with_declarations([ExternsDecl::new("f", DeclKind::Value, "Int -> Bool")]);

        let mut env = Environment::new();
        env.merge_externs(&stale);
        env.merge_externs(&fresh);

        assert_eq!(env.len(), 1);
        let summary = env.lookup(&module, &Ident::new("f")).cloned();
        assert_eq!(summary, Some(DeclSummary::new(DeclKind::Value, "Int -> Bool")));
    }

    #[test]
    fn test_lookup_misses_other_modules() {
        let mut env = Environment::new();
        env.insert(
            ModuleName::new("a"),
            Ident::new("f"),
            DeclSummary::new(DeclKind::Value, "Int"),
        );
        assert!(env.lookup(&ModuleName::new("b"), &Ident::new("f")).is_none());
        assert!(!env.is_empty());
    }
}
