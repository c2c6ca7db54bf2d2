use std::collections::BTreeMap;
use std::sync::Arc;

use super::{EntitySchema, SchemaError};
use crate::filter::error::{SearchError, SearchResult};

/// Name → schema lookup shared by handlers and the engine
#[derive(Debug, Clone, Default)]
pub struct EntityRegistry {
    entities: BTreeMap<String, Arc<EntitySchema>>,
}

impl EntityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every entity shipped in `crate::entities`
    pub fn builtin() -> Result<Self, SchemaError> {
        let mut registry = Self::new();
        for schema in crate::entities::all()? {
            registry.register(schema)?;
        }
        Ok(registry)
    }

    pub fn register(&mut self, schema: EntitySchema) -> Result<(), SchemaError> {
        if self.entities.contains_key(&schema.name) {
            return Err(SchemaError::DuplicateEntity(schema.name));
        }
        self.entities.insert(schema.name.clone(), Arc::new(schema));
        Ok(())
    }

    pub fn with(mut self, schema: EntitySchema) -> Result<Self, SchemaError> {
        self.register(schema)?;
        Ok(self)
    }

    pub fn get(&self, name: &str) -> SearchResult<Arc<EntitySchema>> {
        self.entities
            .get(name)
            .cloned()
            .ok_or_else(|| SearchError::UnknownEntity(name.to_string()))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entities.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::FieldDef;

    fn schema(name: &str) -> EntitySchema {
        EntitySchema::builder(name)
            .field(FieldDef::id("id"))
            .field(FieldDef::timestamp("created_at").sortable())
            .build()
            .unwrap()
    }

    #[test]
    fn looks_up_registered_entities() {
        let registry = EntityRegistry::new().with(schema("tags")).unwrap();
        assert_eq!(registry.get("tags").unwrap().name, "tags");
        assert!(matches!(registry.get("nope"), Err(SearchError::UnknownEntity(name)) if name == "nope"));
    }

    #[test]
    fn rejects_duplicates() {
        let err = EntityRegistry::new()
            .with(schema("tags"))
            .unwrap()
            .with(schema("tags"))
            .unwrap_err();
        assert_eq!(err, SchemaError::DuplicateEntity("tags".into()));
    }

    #[test]
    fn builtin_entities_are_valid() {
        let registry = EntityRegistry::builtin().unwrap();
        let names: Vec<_> = registry.names().collect();
        for expected in [
            "audit_events",
            "job_postings",
            "notification_deliveries",
            "reminders",
            "tags",
            "telemedicine_sessions",
        ] {
            assert!(names.contains(&expected), "missing {}", expected);
        }
    }
}
