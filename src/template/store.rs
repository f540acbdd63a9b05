//! Template storage with CRUD operations

use std::sync::Arc;

use chrono::Utc;
use dashmap::DashMap;
use uuid::Uuid;

use crate::mail::MailFields;

use super::types::{
    CreateTemplateRequest, MailTemplate, TemplateError, TemplateResult, UpdateTemplateRequest,
};

/// In-memory template storage
pub struct TemplateStore {
    templates: DashMap<Uuid, MailTemplate>,
}

impl Default for TemplateStore {
    fn default() -> Self {
        Self::new()
    }
}

impl TemplateStore {
    /// Create a new template store
    pub fn new() -> Self {
        Self {
            templates: DashMap::new(),
        }
    }

    /// Create a new template
    pub fn create(&self, request: CreateTemplateRequest) -> TemplateResult<MailTemplate> {
        let template: MailTemplate = request.into();
        template.validate()?;

        tracing::debug!(template_id = %template.id, name = %template.name, "Template created");

        self.templates.insert(template.id, template.clone());
        Ok(template)
    }

    /// Get a template by ID
    pub fn get(&self, id: Uuid) -> TemplateResult<MailTemplate> {
        self.templates
            .get(&id)
            .map(|t| t.clone())
            .ok_or(TemplateError::NotFound(id))
    }

    /// List all templates
    pub fn list(&self) -> Vec<MailTemplate> {
        self.templates
            .iter()
            .map(|entry| entry.value().clone())
            .collect()
    }

    /// Update an existing template
    pub fn update(&self, id: Uuid, updates: UpdateTemplateRequest) -> TemplateResult<MailTemplate> {
        let mut template = self.get(id)?;

        if let Some(name) = updates.name {
            template.name = name;
        }

        if let Some(body) = updates.body {
            template.body = body;
        }

        if let Some(sender) = updates.sender {
            template.sender = sender;
        }

        if let Some(subject) = updates.subject {
            template.subject = subject;
        }

        template.updated_at = Utc::now();
        template.validate()?;

        self.templates.insert(id, template.clone());

        Ok(template)
    }

    /// Delete a template by ID
    pub fn delete(&self, id: Uuid) -> TemplateResult<()> {
        self.templates
            .remove(&id)
            .map(|_| ())
            .ok_or(TemplateError::NotFound(id))
    }

    /// Check if a template exists
    pub fn exists(&self, id: Uuid) -> bool {
        self.templates.contains_key(&id)
    }

    /// Get the number of templates
    pub fn count(&self) -> usize {
        self.templates.len()
    }

    /// Start a mail from a template: body, sender and subject are copied out.
    pub fn compose(&self, id: Uuid) -> TemplateResult<MailFields> {
        let template = self.get(id)?;
        Ok(MailFields::from_template(&template))
    }
}

/// Create an Arc-wrapped template store
pub fn create_template_store() -> Arc<TemplateStore> {
    Arc::new(TemplateStore::new())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(name: &str) -> CreateTemplateRequest {
        CreateTemplateRequest {
            name: name.to_string(),
            body: "Hello ###NAME###".to_string(),
            sender: "noreply@example.com".to_string(),
            subject: "Welcome".to_string(),
        }
    }

    #[test]
    fn test_store_create_and_get() {
        let store = TemplateStore::new();

        let created = store.create(request("welcome")).unwrap();
        let retrieved = store.get(created.id).unwrap();
        assert_eq!(retrieved.name, "welcome");
        assert_eq!(retrieved.body, "Hello ###NAME###");
    }

    #[test]
    fn test_store_create_invalid() {
        let store = TemplateStore::new();
        assert!(store.create(request("")).is_err());
        assert_eq!(store.count(), 0);
    }

    #[test]
    fn test_store_update() {
        let store = TemplateStore::new();
        let created = store.create(request("welcome")).unwrap();

        let updates = UpdateTemplateRequest {
            subject: Some("Welcome aboard".to_string()),
            ..Default::default()
        };

        let updated = store.update(created.id, updates).unwrap();
        assert_eq!(updated.subject, "Welcome aboard");
        assert_eq!(updated.name, "welcome");
    }

    #[test]
    fn test_store_update_rejects_invalid() {
        let store = TemplateStore::new();
        let created = store.create(request("welcome")).unwrap();

        let updates = UpdateTemplateRequest {
            body: Some(String::new()),
            ..Default::default()
        };
        assert!(store.update(created.id, updates).is_err());
        assert_eq!(store.get(created.id).unwrap().body, "Hello ###NAME###");
    }

    #[test]
    fn test_store_delete() {
        let store = TemplateStore::new();
        let created = store.create(request("welcome")).unwrap();
        assert!(store.exists(created.id));

        store.delete(created.id).unwrap();
        assert!(!store.exists(created.id));
        assert!(matches!(
            store.delete(created.id),
            Err(TemplateError::NotFound(_))
        ));
    }

    #[test]
    fn test_store_list() {
        let store = TemplateStore::new();
        for i in 0..3 {
            store.create(request(&format!("template-{}", i))).unwrap();
        }
        assert_eq!(store.list().len(), 3);
    }

    #[test]
    fn test_compose_copies_template() {
        let store = TemplateStore::new();
        let created = store.create(request("welcome")).unwrap();

        let fields = store.compose(created.id).unwrap();
        assert_eq!(fields.body.as_deref(), Some("Hello ###NAME###"));
        assert_eq!(fields.sender.as_deref(), Some("noreply@example.com"));
        assert_eq!(fields.subject.as_deref(), Some("Welcome"));
        assert_eq!(fields.template_id, Some(created.id));
        assert!(fields.receptor_to.is_none());
    }
}
