//! Direct-dependency adjacency for the module set being built.

use rustc_hash::FxHashMap;
use smallvec::SmallVec;
use vela_externs::ModuleName;

/// `ModuleName` → ordered direct dependencies.
///
/// The graph must be consistent with the topologically sorted module list it
/// is used with: every dependency of a listed module precedes it in the
/// list. Cycle detection happens upstream, in module resolution.
#[derive(Clone, Debug, Default)]
pub struct DependencyGraph {
    edges: FxHashMap<ModuleName, SmallVec<[ModuleName; 4]>>,
}

impl DependencyGraph {
    /// Create an empty graph.
    pub fn new() -> Self {
        DependencyGraph::default()
    }

    /// Record a module's direct dependencies, replacing any previous entry.
    pub fn insert(
        &mut self,
        module: impl Into<ModuleName>,
        deps: impl IntoIterator<Item = ModuleName>,
    ) {
        self.edges.insert(module.into(), deps.into_iter().collect());
    }

    /// The module's direct dependencies; empty for unknown modules.
    pub fn direct_deps(&self, module: &ModuleName) -> &[ModuleName] {
        self.edges.get(module).map_or(&[], SmallVec::as_slice)
    }

    /// Number of modules with a recorded entry.
    pub fn len(&self) -> usize {
        self.edges.len()
    }

    /// Whether no modules are recorded.
    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }
}

impl<M, D> FromIterator<(M, D)> for DependencyGraph
where
    M: Into<ModuleName>,
    D: IntoIterator<Item = ModuleName>,
{
    fn from_iter<I: IntoIterator<Item = (M, D)>>(iter: I) -> Self {
        let mut graph = DependencyGraph::new();
        for (module, deps) in iter {
            graph.insert(module, deps);
        }
        graph
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_direct_deps_of_unknown_module_are_empty() {
        let graph = DependencyGraph::new();
        assert!(graph.direct_deps(&ModuleName::new("ghost")).is_empty());
        assert!(graph.is_empty());
    }

    #[test]
    fn test_insert_preserves_dependency_order() {
        let mut graph = DependencyGraph::new();
        graph.insert(
            "app",
            [ModuleName::new("core"), ModuleName::new("data.list")],
        );
        let deps: Vec<&str> = graph
            .direct_deps(&ModuleName::new("app"))
            .iter()
            .map(ModuleName::as_str)
            .collect();
        assert_eq!(deps, vec!["core", "data.list"]);
        assert_eq!(graph.len(), 1);
    }

    #[test]
    fn test_from_iterator() {
        let graph: DependencyGraph = [("b", vec![ModuleName::new("a")]), ("a", vec![])]
            .into_iter()
            .collect();
        assert_eq!(graph.len(), 2);
        assert_eq!(graph.direct_deps(&ModuleName::new("b")).len(), 1);
    }
}
