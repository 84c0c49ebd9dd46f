//! TOML-backed reference catalog.
//!
//! ```toml
//! [classes.Order]
//! table = "Orders"
//! identity = { property = "ID", column = "OrderID" }
//!
//! [classes.Order.properties]
//! Number = {}
//! Comment = { column = "Remark", nullable = true }
//! Display = { persisted = false }
//!
//! [classes.Order.references]
//! Customer = { class = "Customer", column = "CustomerID" }
//!
//! [classes.Order.collections]
//! Items = { class = "OrderItem", foreign_key = "OrderID" }
//! ```
//!
//! References are real relations (the declaring table holds the foreign
//! key); collections and one-to-one entries are virtual relations (the
//! related table holds it).

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::{
    Cardinality, Identity, JoinColumns, PropertyRef, RelationInfo, RelationKind, SchemaCatalog,
};

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("Catalog file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Failed to read catalog file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse catalog: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Invalid catalog: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityMapping {
    pub property: String,
    pub column: String,
}

impl Default for IdentityMapping {
    fn default() -> Self {
        Self {
            property: "ID".into(),
            column: "ID".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PropertyMapping {
    /// Column name; defaults to the property name.
    pub column: Option<String>,
    pub nullable: bool,
    /// Set to `false` for computed properties that have no column.
    pub persisted: bool,
}

impl Default for PropertyMapping {
    fn default() -> Self {
        Self {
            column: None,
            nullable: false,
            persisted: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceMapping {
    pub class: String,
    /// Foreign key column on the declaring table.
    pub column: Option<String>,
    #[serde(default)]
    pub nullable: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionMapping {
    pub class: String,
    /// Foreign key column on the related table.
    pub foreign_key: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassMapping {
    pub table: String,
    #[serde(default)]
    pub identity: IdentityMapping,
    #[serde(default)]
    pub properties: BTreeMap<String, PropertyMapping>,
    #[serde(default)]
    pub references: BTreeMap<String, ReferenceMapping>,
    #[serde(default)]
    pub collections: BTreeMap<String, CollectionMapping>,
    #[serde(default)]
    pub one_to_one: BTreeMap<String, CollectionMapping>,
}

impl ClassMapping {
    pub fn new(table: &str) -> Self {
        Self {
            table: table.into(),
            identity: IdentityMapping::default(),
            properties: BTreeMap::new(),
            references: BTreeMap::new(),
            collections: BTreeMap::new(),
            one_to_one: BTreeMap::new(),
        }
    }

    pub fn identity(mut self, property: &str, column: &str) -> Self {
        self.identity = IdentityMapping {
            property: property.into(),
            column: column.into(),
        };
        self
    }

    /// Scalar property stored in a column of the same name.
    pub fn property(mut self, name: &str) -> Self {
        self.properties.insert(name.into(), PropertyMapping::default());
        self
    }

    pub fn property_column(mut self, name: &str, column: &str, nullable: bool) -> Self {
        self.properties.insert(
            name.into(),
            PropertyMapping {
                column: Some(column.into()),
                nullable,
                persisted: true,
            },
        );
        self
    }

    /// Property without a column.
    pub fn transient(mut self, name: &str) -> Self {
        self.properties.insert(
            name.into(),
            PropertyMapping {
                column: None,
                nullable: false,
                persisted: false,
            },
        );
        self
    }

    pub fn reference(mut self, name: &str, class: &str, column: &str, nullable: bool) -> Self {
        self.references.insert(
            name.into(),
            ReferenceMapping {
                class: class.into(),
                column: Some(column.into()),
                nullable,
            },
        );
        self
    }

    pub fn collection(mut self, name: &str, class: &str, foreign_key: &str) -> Self {
        self.collections.insert(
            name.into(),
            CollectionMapping {
                class: class.into(),
                foreign_key: Some(foreign_key.into()),
            },
        );
        self
    }

    pub fn one_to_one(mut self, name: &str, class: &str, foreign_key: &str) -> Self {
        self.one_to_one.insert(
            name.into(),
            CollectionMapping {
                class: class.into(),
                foreign_key: Some(foreign_key.into()),
            },
        );
        self
    }
}

/// A [`SchemaCatalog`] described by a mapping file or built in code.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappingCatalog {
    #[serde(default)]
    pub classes: BTreeMap<String, ClassMapping>,
}

impl MappingCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_class(mut self, name: &str, class: ClassMapping) -> Self {
        self.classes.insert(name.into(), class);
        self
    }

    pub fn from_toml_str(content: &str) -> Result<Self, CatalogError> {
        let catalog: MappingCatalog = toml::from_str(content)?;
        catalog.validate()?;
        Ok(catalog)
    }

    pub fn from_file(path: &Path) -> Result<Self, CatalogError> {
        if !path.exists() {
            return Err(CatalogError::FileNotFound(path.to_path_buf()));
        }
        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Every relation must point at a mapped class.
    fn validate(&self) -> Result<(), CatalogError> {
        for (name, class) in &self.classes {
            let targets = class
                .references
                .iter()
                .map(|(p, r)| (p, &r.class))
                .chain(class.collections.iter().map(|(p, c)| (p, &c.class)))
                .chain(class.one_to_one.iter().map(|(p, c)| (p, &c.class)));
            for (property, target) in targets {
                if !self.classes.contains_key(target) {
                    return Err(CatalogError::Invalid(format!(
                        "{}.{} refers to unmapped class '{}'",
                        name, property, target
                    )));
                }
            }
        }
        Ok(())
    }

    fn class(&self, type_name: &str) -> Option<&ClassMapping> {
        self.classes.get(type_name)
    }
}

impl SchemaCatalog for MappingCatalog {
    fn table_name_for(&self, type_name: &str) -> Option<String> {
        self.class(type_name).map(|c| c.table.clone())
    }

    fn column_name_for(&self, property: &PropertyRef) -> Option<String> {
        let class = self.class(&property.type_name)?;
        if class.identity.property == property.property {
            return Some(class.identity.column.clone());
        }
        let mapping = class.properties.get(&property.property)?;
        if !mapping.persisted {
            return None;
        }
        Some(
            mapping
                .column
                .clone()
                .unwrap_or_else(|| property.property.clone()),
        )
    }

    fn join_columns_for(&self, property: &PropertyRef) -> Option<JoinColumns> {
        let class = self.class(&property.type_name)?;
        if let Some(reference) = class.references.get(&property.property) {
            let related = self.class(&reference.class)?;
            return Some(JoinColumns {
                left: reference.column.clone()?,
                right: related.identity.column.clone(),
                kind: RelationKind::Real,
            });
        }
        let inverse = class
            .collections
            .get(&property.property)
            .or_else(|| class.one_to_one.get(&property.property))?;
        Some(JoinColumns {
            left: class.identity.column.clone(),
            right: inverse.foreign_key.clone()?,
            kind: RelationKind::Virtual,
        })
    }

    fn relation_for(&self, property: &PropertyRef) -> Option<RelationInfo> {
        let class = self.class(&property.type_name)?;
        let (related, cardinality) = if let Some(r) = class.references.get(&property.property) {
            (&r.class, Cardinality::One)
        } else if let Some(c) = class.collections.get(&property.property) {
            (&c.class, Cardinality::Many)
        } else if let Some(o) = class.one_to_one.get(&property.property) {
            (&o.class, Cardinality::One)
        } else {
            return None;
        };
        Some(RelationInfo {
            related_type: related.clone(),
            cardinality,
        })
    }

    fn identity_of(&self, type_name: &str) -> Option<Identity> {
        self.class(type_name).map(|c| Identity {
            property: c.identity.property.clone(),
            column: c.identity.column.clone(),
        })
    }

    fn is_nullable(&self, property: &PropertyRef) -> bool {
        let Some(class) = self.class(&property.type_name) else {
            return false;
        };
        if let Some(r) = class.references.get(&property.property) {
            return r.nullable;
        }
        class
            .properties
            .get(&property.property)
            .map(|p| p.nullable)
            .unwrap_or(false)
    }
}
