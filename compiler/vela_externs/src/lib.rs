//! Interface artifacts ("externs") for the Vela compiler.
//!
//! An externs file is a module's compiled, externally visible description:
//! the declarations it exports, the modules it imports, and nothing about its
//! private implementation. Downstream modules compile against externs, never
//! against source, which is what makes per-module rebuilds possible.
//!
//! Two views of the same artifact matter to the build planner:
//!
//! - the full declaration set, merged into the [`Environment`] that later
//!   modules compile against, and
//! - the *cache-relevant* subset (name, kind, signature; no spans, no docs),
//!   whose content equality decides whether dependents must be rebuilt.
//!
//! Everything here is plain serializable data. How artifacts reach disk is
//! the build planner's concern.

mod environment;
mod externs;
mod name;
mod span;

pub use environment::{DeclSummary, Environment};
pub use externs::{DeclKind, Externs, ExternsDecl, EXTERNS_VERSION};
pub use name::{Ident, ModuleName};
pub use span::Span;
