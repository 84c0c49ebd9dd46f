//! Schema catalog contract.
//!
//! The compiler never reflects over domain types itself. Everything it needs
//! to know about tables, columns and relations comes through
//! [`SchemaCatalog`]. Implementations are shared across compilations and must
//! be safe to read concurrently.

mod mapping;

pub use mapping::{
    CatalogError, ClassMapping, CollectionMapping, IdentityMapping, MappingCatalog,
    PropertyMapping, ReferenceMapping,
};

use serde::{Deserialize, Serialize};

/// A property of a mapped type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PropertyRef {
    pub type_name: String,
    pub property: String,
}

impl PropertyRef {
    pub fn new(type_name: &str, property: &str) -> Self {
        Self {
            type_name: type_name.into(),
            property: property.into(),
        }
    }
}

/// Which side of a relation holds the foreign key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RelationKind {
    /// The declaring table holds the foreign key.
    Real,
    /// The related table holds a foreign key back to the declaring table.
    Virtual,
}

/// Join columns of a navigation property.
///
/// `left` is a column of the declaring table, `right` a column of the
/// related table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinColumns {
    pub left: String,
    pub right: String,
    pub kind: RelationKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Cardinality {
    One,
    Many,
}

/// Relation metadata of a navigation property.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationInfo {
    pub related_type: String,
    pub cardinality: Cardinality,
}

/// Primary key of a type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub property: String,
    pub column: String,
}

/// Metadata the compiler consumes.
pub trait SchemaCatalog: Send + Sync {
    /// Table of a type, `None` if the type is not mapped.
    fn table_name_for(&self, type_name: &str) -> Option<String>;

    /// Column of a scalar property. `None` means the property is not
    /// persisted.
    fn column_name_for(&self, property: &PropertyRef) -> Option<String>;

    /// Join columns of a navigation property.
    fn join_columns_for(&self, property: &PropertyRef) -> Option<JoinColumns>;

    fn is_table_type(&self, type_name: &str) -> bool {
        self.table_name_for(type_name).is_some()
    }

    /// Relation metadata, `None` for scalar properties.
    fn relation_for(&self, property: &PropertyRef) -> Option<RelationInfo>;

    fn identity_of(&self, type_name: &str) -> Option<Identity>;

    fn is_nullable(&self, property: &PropertyRef) -> bool {
        let _ = property;
        false
    }
}
