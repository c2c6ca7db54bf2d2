//! Declarative per-entity field tables.
//!
//! Each searchable entity is described once: which fields exist, how each may
//! be filtered, which may be sorted on, which columns carry tenant/organization/
//! owner scope, and its page-size policy. Every other component is driven by
//! this table instead of hand-written per-entity conditionals.

pub mod field;
pub mod registry;

use std::collections::{HashMap, HashSet};

use thiserror::Error;

pub use field::{CaseRule, FieldDef, FieldKind, FilterMode};
pub use registry::EntityRegistry;

use crate::filter::types::{SortDirection, SortKey};
use crate::scope::{Role, ScopeRule};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SchemaError {
    #[error("Invalid identifier: {0}")]
    InvalidIdentifier(String),

    #[error("Duplicate field '{field}' on entity '{entity}'")]
    DuplicateField { entity: String, field: String },

    #[error("Entity '{entity}' references undeclared field '{field}'")]
    UndeclaredField { entity: String, field: String },

    #[error("Field '{field}' on entity '{entity}' cannot use filter mode {mode}")]
    IncompatibleFilter { entity: String, field: String, mode: String },

    #[error("Default sort field '{field}' on entity '{entity}' is not sortable")]
    UnsortableDefault { entity: String, field: String },

    #[error("Invalid limits on entity '{entity}': default {default}, max {max}")]
    InvalidLimits { entity: String, default: u64, max: u64 },

    #[error("Duplicate entity: {0}")]
    DuplicateEntity(String),
}

/// Page-size policy for one entity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LimitCfg {
    pub default: u64,
    pub max: u64,
}

impl Default for LimitCfg {
    fn default() -> Self {
        Self { default: 20, max: 100 }
    }
}

/// What to do with a filter key the entity does not declare
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnknownFieldPolicy {
    Reject,
    Ignore,
}

/// Columns holding the scoping identifiers of a row
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScopeColumns {
    pub tenant: Option<String>,
    pub organization: Option<String>,
    pub owner: Option<String>,
}

#[derive(Debug, Clone)]
pub struct EntitySchema {
    pub name: String,
    pub table: String,
    pub fields: Vec<FieldDef>,
    pub id_field: String,
    pub soft_delete: Option<String>,
    pub scope: ScopeColumns,
    pub default_sort: SortKey,
    pub tiebreakers: Vec<String>,
    pub limits: LimitCfg,
    pub unknown_filters: UnknownFieldPolicy,
    pub requires_auth: bool,
    pub policy_overrides: HashMap<Role, ScopeRule>,
}

impl EntitySchema {
    pub fn builder(name: impl Into<String>) -> EntitySchemaBuilder {
        EntitySchemaBuilder::new(name)
    }

    pub fn field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn kind_of(&self, name: &str) -> Option<&FieldKind> {
        self.field(name).map(|f| &f.kind)
    }

    pub fn is_sortable(&self, name: &str) -> bool {
        self.field(name).map(|f| f.sortable && f.public).unwrap_or(false)
    }

    pub fn public_fields(&self) -> impl Iterator<Item = &FieldDef> {
        self.fields.iter().filter(|f| f.public)
    }
}

pub struct EntitySchemaBuilder {
    name: String,
    table: Option<String>,
    fields: Vec<FieldDef>,
    id_field: String,
    soft_delete: Option<String>,
    scope: ScopeColumns,
    default_sort: Option<SortKey>,
    tiebreakers: Vec<String>,
    limits: LimitCfg,
    unknown_filters: UnknownFieldPolicy,
    requires_auth: bool,
    policy_overrides: HashMap<Role, ScopeRule>,
}

impl EntitySchemaBuilder {
    fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            table: None,
            fields: vec![],
            id_field: "id".to_string(),
            soft_delete: Some("deleted_at".to_string()),
            scope: ScopeColumns::default(),
            default_sort: None,
            tiebreakers: vec!["created_at".to_string(), "id".to_string()],
            limits: LimitCfg::default(),
            unknown_filters: UnknownFieldPolicy::Reject,
            requires_auth: true,
            policy_overrides: HashMap::new(),
        }
    }

    pub fn table(mut self, table: impl Into<String>) -> Self {
        self.table = Some(table.into());
        self
    }

    pub fn field(mut self, field: FieldDef) -> Self {
        self.fields.push(field);
        self
    }

    pub fn id_field(mut self, name: impl Into<String>) -> Self {
        self.id_field = name.into();
        self
    }

    pub fn soft_delete(mut self, column: Option<&str>) -> Self {
        self.soft_delete = column.map(str::to_string);
        self
    }

    pub fn tenant_scope(mut self, column: impl Into<String>) -> Self {
        self.scope.tenant = Some(column.into());
        self
    }

    pub fn organization_scope(mut self, column: impl Into<String>) -> Self {
        self.scope.organization = Some(column.into());
        self
    }

    pub fn owner_scope(mut self, column: impl Into<String>) -> Self {
        self.scope.owner = Some(column.into());
        self
    }

    pub fn default_sort(mut self, field: impl Into<String>, direction: SortDirection) -> Self {
        self.default_sort = Some(SortKey { field: field.into(), direction });
        self
    }

    pub fn tiebreakers(mut self, fields: &[&str]) -> Self {
        self.tiebreakers = fields.iter().map(|f| f.to_string()).collect();
        self
    }

    pub fn limits(mut self, default: u64, max: u64) -> Self {
        self.limits = LimitCfg { default, max };
        self
    }

    pub fn unknown_filters(mut self, policy: UnknownFieldPolicy) -> Self {
        self.unknown_filters = policy;
        self
    }

    pub fn public(mut self) -> Self {
        self.requires_auth = false;
        self
    }

    pub fn override_role(mut self, role: Role, rule: ScopeRule) -> Self {
        self.policy_overrides.insert(role, rule);
        self
    }

    pub fn build(self) -> Result<EntitySchema, SchemaError> {
        let entity = self.name.clone();
        let table = self.table.clone().unwrap_or_else(|| self.name.clone());
        validate_identifier(&entity)?;
        validate_identifier(&table)?;

        let mut seen = HashSet::new();
        for f in &self.fields {
            validate_identifier(&f.name)?;
            if !seen.insert(f.name.as_str()) {
                return Err(SchemaError::DuplicateField { entity, field: f.name.clone() });
            }
            if let Some(mode) = f.filter {
                if !f.accepts_mode(mode) {
                    return Err(SchemaError::IncompatibleFilter {
                        entity,
                        field: f.name.clone(),
                        mode: format!("{:?}", mode),
                    });
                }
            }
        }

        let declared = |name: &str| self.fields.iter().any(|f| f.name == name);
        let undeclared = |field: &str| SchemaError::UndeclaredField {
            entity: self.name.clone(),
            field: field.to_string(),
        };

        if !declared(&self.id_field) {
            return Err(undeclared(&self.id_field));
        }
        for column in [&self.scope.tenant, &self.scope.organization, &self.scope.owner]
            .into_iter()
            .flatten()
        {
            if !declared(column) {
                return Err(undeclared(column));
            }
        }
        if let Some(column) = &self.soft_delete {
            validate_identifier(column)?;
        }

        let default_sort = self.default_sort.clone().unwrap_or(SortKey {
            field: "created_at".to_string(),
            direction: SortDirection::Desc,
        });
        match self.fields.iter().find(|f| f.name == default_sort.field) {
            None => return Err(undeclared(&default_sort.field)),
            Some(f) if !f.sortable => {
                return Err(SchemaError::UnsortableDefault { entity, field: default_sort.field })
            }
            Some(_) => {}
        }

        // The id field closes every ordering so that paging is total
        let mut tiebreakers = Vec::new();
        for t in &self.tiebreakers {
            if !declared(t) {
                return Err(undeclared(t));
            }
            if !tiebreakers.contains(t) {
                tiebreakers.push(t.clone());
            }
        }
        if !tiebreakers.contains(&self.id_field) {
            tiebreakers.push(self.id_field.clone());
        }

        if self.limits.default == 0 || self.limits.max < self.limits.default {
            return Err(SchemaError::InvalidLimits {
                entity,
                default: self.limits.default,
                max: self.limits.max,
            });
        }

        Ok(EntitySchema {
            name: self.name,
            table,
            fields: self.fields,
            id_field: self.id_field,
            soft_delete: self.soft_delete,
            scope: self.scope,
            default_sort,
            tiebreakers,
            limits: self.limits,
            unknown_filters: self.unknown_filters,
            requires_auth: self.requires_auth,
            policy_overrides: self.policy_overrides,
        })
    }
}

/// Identifiers end up quoted inside SQL; keep them to `[A-Za-z_][A-Za-z0-9_]*`
pub fn validate_identifier(name: &str) -> Result<(), SchemaError> {
    let mut chars = name.chars();
    let valid = match chars.next() {
        Some(first) => {
            (first.is_ascii_alphabetic() || first == '_')
                && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        None => false,
    };
    if valid {
        Ok(())
    } else {
        Err(SchemaError::InvalidIdentifier(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> EntitySchemaBuilder {
        EntitySchema::builder("widgets")
            .field(FieldDef::id("id"))
            .field(FieldDef::text("name", CaseRule::Insensitive).sortable())
            .field(FieldDef::timestamp("created_at").sortable())
    }

    #[test]
    fn builds_with_defaults() {
        let schema = base().build().unwrap();
        assert_eq!(schema.table, "widgets");
        assert_eq!(schema.default_sort.field, "created_at");
        assert_eq!(schema.default_sort.direction, SortDirection::Desc);
        assert_eq!(schema.tiebreakers, vec!["created_at", "id"]);
        assert_eq!(schema.soft_delete.as_deref(), Some("deleted_at"));
        assert!(schema.requires_auth);
    }

    #[test]
    fn appends_id_tiebreaker() {
        let schema = base().tiebreakers(&["name"]).build().unwrap();
        assert_eq!(schema.tiebreakers, vec!["name", "id"]);
    }

    #[test]
    fn rejects_bad_declarations() {
        let err = base().field(FieldDef::id("name")).build().unwrap_err();
        assert!(matches!(err, SchemaError::DuplicateField { .. }));

        let err = base()
            .field(FieldDef::flag("active").filter_mode(FilterMode::Range))
            .build()
            .unwrap_err();
        assert!(matches!(err, SchemaError::IncompatibleFilter { .. }));

        let err = base().tenant_scope("tenant_id").build().unwrap_err();
        assert!(matches!(err, SchemaError::UndeclaredField { .. }));

        let err = base().default_sort("id", SortDirection::Asc).build().unwrap_err();
        assert!(matches!(err, SchemaError::UnsortableDefault { .. }));

        let err = base().limits(50, 10).build().unwrap_err();
        assert!(matches!(err, SchemaError::InvalidLimits { .. }));

        let err = base().table("widgets; DROP TABLE x").build().unwrap_err();
        assert!(matches!(err, SchemaError::InvalidIdentifier(_)));
    }

    #[test]
    fn validates_identifiers() {
        assert!(validate_identifier("tenant_id").is_ok());
        assert!(validate_identifier("_x1").is_ok());
        assert!(validate_identifier("1abc").is_err());
        assert!(validate_identifier("a-b").is_err());
        assert!(validate_identifier("").is_err());
    }
}
