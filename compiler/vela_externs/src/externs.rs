//! The externs artifact: a module's externally visible interface.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::name::{Ident, ModuleName};
use crate::span::Span;

/// Format version stamped into every serialized externs file.
///
/// Readers must reject files from other versions: a stale-format artifact is
/// indistinguishable from a corrupt one.
pub const EXTERNS_VERSION: u32 = 3;

/// What kind of thing a declaration exports.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Serialize, Deserialize)]
pub enum DeclKind {
    /// A value binding (function or constant).
    Value,
    /// A nominal type with its constructors.
    Type,
    /// A transparent type alias.
    TypeAlias,
    /// A trait definition.
    Trait,
}

/// One exported declaration.
///
/// `name`, `kind`, and `signature` are the cache-relevant fields; `span` and
/// `doc` exist for tooling and never participate in change detection.
#[derive(Clone, Eq, PartialEq, Debug, Serialize, Deserialize)]
pub struct ExternsDecl {
    pub name: Ident,
    pub kind: DeclKind,
    /// Rendered type signature, stable under reformatting of the source.
    pub signature: String,
    /// Declaration site. Not cache-relevant.
    pub span: Span,
    /// Attached doc text. Not cache-relevant.
    pub doc: Option<String>,
}

impl ExternsDecl {
    /// Create a declaration with a dummy span and no doc text.
    pub fn new(name: impl Into<Ident>, kind: DeclKind, signature: impl Into<String>) -> Self {
        ExternsDecl {
            name: name.into(),
            kind,
            signature: signature.into(),
            span: Span::DUMMY,
            doc: None,
        }
    }

    /// Attach the declaration site.
    #[must_use]
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    /// Attach doc text.
    #[must_use]
    pub fn with_doc(mut self, doc: impl Into<String>) -> Self {
        self.doc = Some(doc.into());
        self
    }
}

/// A module's compiled interface artifact.
#[derive(Clone, Eq, PartialEq, Debug, Serialize, Deserialize)]
pub struct Externs {
    /// Format version, checked on read.
    pub version: u32,
    /// The module this interface describes.
    pub module: ModuleName,
    /// Modules this interface was compiled against.
    pub imports: Vec<ModuleName>,
    /// Exported declarations.
    pub declarations: Vec<ExternsDecl>,
}

impl Externs {
    /// Create an empty interface for `module` at the current format version.
    pub fn new(module: impl Into<ModuleName>) -> Self {
        Externs {
            version: EXTERNS_VERSION,
            module: module.into(),
            imports: Vec::new(),
            declarations: Vec::new(),
        }
    }

    /// Set the import list.
    #[must_use]
    pub fn with_imports(mut self, imports: impl IntoIterator<Item = ModuleName>) -> Self {
        self.imports = imports.into_iter().collect();
        self
    }

    /// Set the declaration list.
    #[must_use]
    pub fn with_declarations(mut self, declarations: impl IntoIterator<Item = ExternsDecl>) -> Self {
        self.declarations = declarations.into_iter().collect();
        self
    }

    /// Whether this artifact was written at the current format version.
    #[inline]
    pub fn is_current_version(&self) -> bool {
        self.version == EXTERNS_VERSION
    }

    /// The cache-relevant view: name → (kind, signature).
    ///
    /// Spans, docs, and declaration order are deliberately absent.
    fn cache_shape(&self) -> FxHashMap<&Ident, (DeclKind, &str)> {
        self.declarations
            .iter()
            .map(|decl| (&decl.name, (decl.kind, decl.signature.as_str())))
            .collect()
    }

    /// Content equality of the cache-relevant declaration subsets.
    ///
    /// This is the gate that decides whether dependents may treat the module
    /// as unchanged even after a genuine recompilation.
    pub fn cache_equivalent(&self, other: &Externs) -> bool {
        self.module == other.module && self.cache_shape() == other.cache_shape()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn interface(decls: Vec<ExternsDecl>) -> Externs {
        Externs::new("data.list")
            .with_imports([ModuleName::new("core")])
            .with_declarations(decls)
    }

    #[test]
    fn test_cache_equivalent_ignores_spans_and_docs() {
        let a = interface(vec![
            ExternsDecl::new("map", DeclKind::Value, "(a -> b, List a) -> List b")
                .with_span(Span::new(0, 40)),
        ]);
        let b = interface(vec![ExternsDecl::new(
            "map",
            DeclKind::Value,
            "(a -> b, List a) -> List b",
        )
        .with_span(Span::new(120, 160))
        .with_doc("Apply a function to every element.")]);
        assert!(a.cache_equivalent(&b));
    }

    #[test]
    fn test_cache_equivalent_ignores_declaration_order() {
        let fst = ExternsDecl::new("fst", DeclKind::Value, "Pair a b -> a");
        let snd = ExternsDecl::new("snd", DeclKind::Value, "Pair a b -> b");
        let a = interface(vec![fst.clone(), snd.clone()]);
        let b = interface(vec![snd, fst]);
        assert!(a.cache_equivalent(&b));
    }

    #[test]
    fn test_cache_equivalent_detects_signature_change() {
        let a = interface(vec![ExternsDecl::new("len", DeclKind::Value, "List a -> Int")]);
        let b = interface(vec![ExternsDecl::new("len", DeclKind::Value, "List a -> Nat")]);
        assert!(!a.cache_equivalent(&b));
    }

    #[test]
    fn test_cache_equivalent_detects_kind_change() {
        let a = interface(vec![ExternsDecl::new("Size", DeclKind::TypeAlias, "Int")]);
        let b = interface(vec![ExternsDecl::new("Size", DeclKind::Type, "Int")]);
        assert!(!a.cache_equivalent(&b));
    }

    #[test]
    fn test_cache_equivalent_detects_added_declaration() {
        let a = interface(vec![ExternsDecl::new("len", DeclKind::Value, "List a -> Int")]);
        let b = interface(vec![
            ExternsDecl::new("len", DeclKind::Value, "List a -> Int"),
            ExternsDecl::new("rev", DeclKind::Value, "List a -> List a"),
        ]);
        assert!(!a.cache_equivalent(&b));
    }

    #[test]
    fn test_cache_equivalent_requires_same_module() {
        let a = Externs::new("data.list");
        let b = Externs::new("data.map");
        assert!(!a.cache_equivalent(&b));
    }

    #[test]
    fn test_version_check() {
        let mut externs = Externs::new("m");
        assert!(externs.is_current_version());
        externs.version = EXTERNS_VERSION - 1;
        assert!(!externs.is_current_version());
    }

    #[test]
    fn test_builder_collects() {
        let externs = interface(vec![ExternsDecl::new("id", DeclKind::Value, "a -> a")]);
        assert_eq!(externs.imports.len(), 1);
        assert_eq!(externs.declarations.len(), 1);
        assert_eq!(externs.declarations[0].name.as_str(), "id");
    }
}
