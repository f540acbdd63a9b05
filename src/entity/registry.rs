//! Replacement entity storage and token resolution

use std::sync::Arc;

use chrono::Utc;
use dashmap::DashMap;
use uuid::Uuid;

use super::types::{
    CreateEntityRequest, EntityError, EntityFilter, EntityResult, ReplacementEntity,
    UpdateEntityRequest,
};

/// Delimiter wrapping tokens when none is configured
pub const DEFAULT_ESCAPE_TOKEN: &str = "###";

/// In-memory registry of replacement entities
pub struct EntityRegistry {
    entities: DashMap<Uuid, ReplacementEntity>,
    escape_token: String,
}

impl Default for EntityRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl EntityRegistry {
    /// Create a registry using the default `###` delimiter
    pub fn new() -> Self {
        Self::with_escape_token(DEFAULT_ESCAPE_TOKEN)
    }

    /// Create a registry with a deployment-specific delimiter
    pub fn with_escape_token(escape_token: impl Into<String>) -> Self {
        Self {
            entities: DashMap::new(),
            escape_token: escape_token.into(),
        }
    }

    /// Delimiter marking tokens inside a body
    pub fn escape_token(&self) -> &str {
        &self.escape_token
    }

    /// Create a new entity; the token is stored upper-cased
    pub fn create(&self, request: CreateEntityRequest) -> EntityResult<ReplacementEntity> {
        let entity: ReplacementEntity = request.into();
        entity.validate()?;

        tracing::debug!(
            entity_id = %entity.id,
            token = %entity.token,
            kind = ?entity.kind,
            "Replacement entity created"
        );

        self.entities.insert(entity.id, entity.clone());
        Ok(entity)
    }

    /// Get an entity by ID
    pub fn get(&self, id: Uuid) -> EntityResult<ReplacementEntity> {
        self.entities
            .get(&id)
            .map(|e| e.clone())
            .ok_or(EntityError::NotFound(id))
    }

    /// List all entities
    pub fn list(&self) -> Vec<ReplacementEntity> {
        self.entities
            .iter()
            .map(|entry| entry.value().clone())
            .collect()
    }

    /// Update an existing entity
    pub fn update(&self, id: Uuid, updates: UpdateEntityRequest) -> EntityResult<ReplacementEntity> {
        let mut entity = self.get(id)?;

        if let Some(token) = updates.token {
            entity.token = token.to_uppercase();
        }

        if let Some(source_name) = updates.source_name {
            entity.source_name = source_name;
        }

        if let Some(member_name) = updates.member_name {
            entity.member_name = member_name;
        }

        if let Some(kind) = updates.kind {
            entity.kind = kind;
        }

        entity.updated_at = Utc::now();
        entity.validate()?;

        self.entities.insert(id, entity.clone());

        Ok(entity)
    }

    /// Delete an entity by ID
    pub fn delete(&self, id: Uuid) -> EntityResult<()> {
        self.entities
            .remove(&id)
            .map(|_| ())
            .ok_or(EntityError::NotFound(id))
    }

    /// Get the number of entities
    pub fn count(&self) -> usize {
        self.entities.len()
    }

    /// Find the single entity registered for `token`.
    ///
    /// The comparison is case-insensitive. Every filter must match as well.
    /// Zero matches and more than one match both resolve to `None`.
    pub fn resolve_by_token(
        &self,
        token: &str,
        filters: &[EntityFilter],
    ) -> Option<ReplacementEntity> {
        let wanted = token.to_uppercase();

        let mut matches = self
            .entities
            .iter()
            .filter(|entry| entry.token == wanted)
            .filter(|entry| filters.iter().all(|f| f.matches(entry.value())))
            .map(|entry| entry.value().clone());

        let first = matches.next()?;
        if matches.next().is_some() {
            tracing::warn!(token = %wanted, "Ambiguous token, several entities match");
            return None;
        }

        Some(first)
    }
}

/// Create an Arc-wrapped entity registry
pub fn create_entity_registry(escape_token: &str) -> Arc<EntityRegistry> {
    Arc::new(EntityRegistry::with_escape_token(escape_token))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::EntityKind;

    #[test]
    fn test_registry_create_and_get() {
        let registry = EntityRegistry::new();

        let created = registry
            .create(CreateEntityRequest::new("name", "user").member("first_name"))
            .unwrap();
        assert_eq!(created.token, "NAME");

        let retrieved = registry.get(created.id).unwrap();
        assert_eq!(retrieved.source_name, "user");
        assert_eq!(retrieved.member_name.as_deref(), Some("first_name"));
    }

    #[test]
    fn test_registry_rejects_invalid() {
        let registry = EntityRegistry::new();
        assert!(registry.create(CreateEntityRequest::new("", "user")).is_err());
        assert_eq!(registry.count(), 0);
    }

    #[test]
    fn test_registry_update_uppercases_token() {
        let registry = EntityRegistry::new();
        let created = registry.create(CreateEntityRequest::new("AGE", "age")).unwrap();

        let updates = UpdateEntityRequest {
            token: Some("years".to_string()),
            kind: Some(EntityKind::Link),
            ..Default::default()
        };

        let updated = registry.update(created.id, updates).unwrap();
        assert_eq!(updated.token, "YEARS");
        assert_eq!(updated.kind, EntityKind::Link);
    }

    #[test]
    fn test_registry_update_clears_member() {
        let registry = EntityRegistry::new();
        let created = registry
            .create(CreateEntityRequest::new("NAME", "user").member("first_name"))
            .unwrap();

        let updates = UpdateEntityRequest {
            member_name: Some(None),
            ..Default::default()
        };

        let updated = registry.update(created.id, updates).unwrap();
        assert!(updated.member_name.is_none());
    }

    #[test]
    fn test_registry_delete() {
        let registry = EntityRegistry::new();
        let created = registry.create(CreateEntityRequest::new("AGE", "age")).unwrap();

        registry.delete(created.id).unwrap();
        assert!(matches!(
            registry.get(created.id),
            Err(EntityError::NotFound(_))
        ));
        assert!(registry.delete(created.id).is_err());
    }

    #[test]
    fn test_resolve_is_case_insensitive() {
        let registry = EntityRegistry::new();
        registry.create(CreateEntityRequest::new("Name", "user")).unwrap();

        assert!(registry.resolve_by_token("name", &[]).is_some());
        assert!(registry.resolve_by_token("NAME", &[]).is_some());
        assert!(registry.resolve_by_token("NAMES", &[]).is_none());
    }

    #[test]
    fn test_resolve_ambiguous_is_not_found() {
        let registry = EntityRegistry::new();
        registry.create(CreateEntityRequest::new("NAME", "user")).unwrap();
        registry
            .create(CreateEntityRequest::new("NAME", "customer").member("name"))
            .unwrap();

        assert!(registry.resolve_by_token("NAME", &[]).is_none());

        // A filter narrowing to one entity resolves again
        let resolved = registry
            .resolve_by_token("NAME", &[EntityFilter::SourceName("customer".into())])
            .unwrap();
        assert_eq!(resolved.member_name.as_deref(), Some("name"));
    }

    #[test]
    fn test_resolve_with_failing_filter() {
        let registry = EntityRegistry::new();
        registry.create(CreateEntityRequest::new("LOGO", "logo").kind(EntityKind::Image)).unwrap();

        assert!(registry
            .resolve_by_token("LOGO", &[EntityFilter::Kind(EntityKind::Link)])
            .is_none());
    }

    #[test]
    fn test_escape_token() {
        assert_eq!(EntityRegistry::new().escape_token(), "###");
        assert_eq!(EntityRegistry::with_escape_token("%%").escape_token(), "%%");
    }
}
