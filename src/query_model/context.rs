//! Per-compilation state threaded through model assembly.

use std::collections::HashMap;

use crate::expression::{ClauseId, Expression, SourceRef};

/// Identifies one node of one chain within a compilation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId {
    pub chain: u32,
    pub index: usize,
}

/// Records which clause each source-introducing node produced.
///
/// Entries are added when the main source, an additional from or a join is
/// applied, before any later node resolves a reference to it.
#[derive(Debug, Default)]
pub struct QuerySourceClauseMapping {
    clauses: HashMap<NodeId, SourceRef>,
}

impl QuerySourceClauseMapping {
    pub fn add_mapping(&mut self, node: NodeId, clause: SourceRef) {
        self.clauses.insert(node, clause);
    }

    pub fn get(&self, node: NodeId) -> Option<&SourceRef> {
        self.clauses.get(&node)
    }

    pub fn contains(&self, node: NodeId) -> bool {
        self.clauses.contains_key(&node)
    }

    pub fn len(&self) -> usize {
        self.clauses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }
}

/// Mutable state of one compilation: clause ids, chain ids, the clause
/// mapping, wrap redirects and cached node outputs.
#[derive(Debug, Default)]
pub struct CompilationContext {
    pub mapping: QuerySourceClauseMapping,
    redirects: HashMap<NodeId, SourceRef>,
    outputs: HashMap<NodeId, Expression>,
    next_clause: u32,
    next_chain: u32,
    next_generated: u32,
}

impl CompilationContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_clause_id(&mut self) -> ClauseId {
        let id = ClauseId(self.next_clause);
        self.next_clause += 1;
        id
    }

    pub fn next_chain_id(&mut self) -> u32 {
        let id = self.next_chain;
        self.next_chain += 1;
        id
    }

    /// Identifier for a node whose output no lambda ever names.
    pub fn generated_identifier(&mut self) -> String {
        let name = format!("q{}", self.next_generated);
        self.next_generated += 1;
        name
    }

    /// Route later output resolution of `node` to the main from clause of
    /// the model that wrapped it.
    pub fn redirect(&mut self, node: NodeId, clause: SourceRef) {
        self.outputs.remove(&node);
        self.redirects.insert(node, clause);
    }

    pub fn redirect_for(&self, node: NodeId) -> Option<&SourceRef> {
        self.redirects.get(&node)
    }

    pub(crate) fn cached_output(&self, node: NodeId) -> Option<&Expression> {
        self.outputs.get(&node)
    }

    pub(crate) fn cache_output(&mut self, node: NodeId, output: Expression) {
        self.outputs.insert(node, output);
    }

    /// Number of clause ids handed out so far.
    pub fn clause_count(&self) -> u32 {
        self.next_clause
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_sequential() {
        let mut ctx = CompilationContext::new();
        assert_eq!(ctx.next_clause_id(), ClauseId(0));
        assert_eq!(ctx.next_clause_id(), ClauseId(1));
        assert_eq!(ctx.generated_identifier(), "q0");
        assert_eq!(ctx.clause_count(), 2);
    }

    #[test]
    fn test_redirect_drops_cached_output() {
        let mut ctx = CompilationContext::new();
        let node = NodeId { chain: 0, index: 1 };
        ctx.cache_output(node, Expression::Constant(1.into()));

        let clause = SourceRef {
            clause: ClauseId(4),
            item_name: "x".into(),
        };
        ctx.redirect(node, clause.clone());
        assert!(ctx.cached_output(node).is_none());
        assert_eq!(ctx.redirect_for(node), Some(&clause));
    }
}
