//! Alias and join bookkeeping for one SQL command.

use std::collections::{HashMap, HashSet};

use crate::expression::ClauseId;

/// Hands out SQL aliases. One table per command, so an alias never
/// changes meaning between the outer query and its sub-queries.
#[derive(Debug, Clone, Default)]
pub struct AliasTable {
    by_clause: HashMap<ClauseId, String>,
    used: HashSet<String>,
}

impl AliasTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Alias of `clause`, binding `preferred` (or a suffixed variant of it)
    /// the first time.
    pub fn bind(&mut self, clause: ClauseId, preferred: &str) -> String {
        if let Some(alias) = self.by_clause.get(&clause) {
            return alias.clone();
        }
        let alias = self.unique(preferred);
        self.by_clause.insert(clause, alias.clone());
        alias
    }

    pub fn get(&self, clause: ClauseId) -> Option<&str> {
        self.by_clause.get(&clause).map(String::as_str)
    }

    /// Reserve an alias not tied to any clause.
    pub fn unique(&mut self, preferred: &str) -> String {
        let base = if preferred.is_empty() { "t" } else { preferred };
        let mut candidate = base.to_string();
        let mut n = 1;
        while self.used.contains(&candidate) {
            candidate = format!("{}_{}", base, n);
            n += 1;
        }
        self.used.insert(candidate.clone());
        candidate
    }
}

/// Column qualified by a table alias.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ColumnRef {
    pub alias: String,
    pub column: String,
}

impl ColumnRef {
    pub fn new(alias: &str, column: &str) -> Self {
        Self {
            alias: alias.into(),
            column: column.into(),
        }
    }
}

/// A join introduced by navigating a relation.
#[derive(Debug, Clone, PartialEq)]
pub struct ImplicitJoin {
    pub table: String,
    pub alias: String,
    pub left: ColumnRef,
    pub right: ColumnRef,
    pub outer: bool,
}

/// Implicit joins of one SELECT statement. Navigating the same property from
/// the same alias twice reuses the first join.
#[derive(Debug, Clone, Default)]
pub struct JoinScope {
    joins: Vec<ImplicitJoin>,
    by_path: HashMap<(String, String), String>,
}

impl JoinScope {
    pub fn lookup(&self, origin: &str, property: &str) -> Option<&str> {
        self.by_path
            .get(&(origin.to_string(), property.to_string()))
            .map(String::as_str)
    }

    pub fn add(&mut self, property: &str, join: ImplicitJoin) {
        self.by_path
            .insert((join.left.alias.clone(), property.to_string()), join.alias.clone());
        self.joins.push(join);
    }

    pub fn into_joins(self) -> Vec<ImplicitJoin> {
        self.joins
    }
}

/// Shape of the rows a derived table produces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DerivedShape {
    /// All columns of an entity.
    Entity(String),
    /// One scalar column named `value`.
    Value,
    /// Named scalar columns.
    Composite(Vec<String>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceKind {
    Table(String),
    Derived(DerivedShape),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoundSource {
    pub alias: String,
    pub kind: SourceKind,
}

/// Command-wide resolution state: aliases, bound sources, the implicit joins
/// of the statements being lowered, and ids for synthesized clauses.
#[derive(Debug, Clone, Default)]
pub struct ResolveScope {
    pub aliases: AliasTable,
    sources: HashMap<ClauseId, BoundSource>,
    statements: Vec<JoinScope>,
    next_clause: u32,
}

impl ResolveScope {
    /// Scope whose synthesized clause ids start after `last`.
    pub fn after(last: ClauseId) -> Self {
        Self {
            next_clause: last.0 + 1,
            ..Self::default()
        }
    }

    pub fn next_clause_id(&mut self) -> ClauseId {
        let id = ClauseId(self.next_clause);
        self.next_clause += 1;
        id
    }

    pub fn bind_source(&mut self, clause: ClauseId, alias: String, kind: SourceKind) {
        self.sources.insert(clause, BoundSource { alias, kind });
    }

    pub fn source(&self, clause: ClauseId) -> Option<&BoundSource> {
        self.sources.get(&clause)
    }

    pub fn push_statement(&mut self) {
        self.statements.push(JoinScope::default());
    }

    pub fn pop_statement(&mut self) -> Vec<ImplicitJoin> {
        self.statements
            .pop()
            .map(JoinScope::into_joins)
            .unwrap_or_default()
    }

    /// Join scope of the innermost statement being lowered.
    pub fn joins_mut(&mut self) -> &mut JoinScope {
        if self.statements.is_empty() {
            self.statements.push(JoinScope::default());
        }
        let last = self.statements.len() - 1;
        &mut self.statements[last]
    }
}
