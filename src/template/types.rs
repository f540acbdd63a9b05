//! Template types and error definitions

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Template-specific error type
#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("Template not found: {0}")]
    NotFound(Uuid),

    #[error("Invalid template: {0}")]
    InvalidTemplate(String),
}

/// Result type for template operations
pub type TemplateResult<T> = Result<T, TemplateError>;

/// A reusable mail template
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MailTemplate {
    pub id: Uuid,

    /// Human-readable template name
    pub name: String,

    /// Body with raw, unresolved tokens
    pub body: String,

    /// Default sender address
    pub sender: String,

    pub subject: String,

    /// Creation timestamp
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,

    /// Last update timestamp
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

fn check_length(field: &str, value: &str, max: usize) -> TemplateResult<()> {
    let len = value.trim().chars().count();
    if len == 0 || len > max {
        return Err(TemplateError::InvalidTemplate(format!(
            "{} must be 1-{} characters",
            field, max
        )));
    }
    Ok(())
}

impl MailTemplate {
    /// Validate the template
    pub fn validate(&self) -> TemplateResult<()> {
        check_length("Name", &self.name, 50)?;
        check_length("Sender", &self.sender, 100)?;
        check_length("Subject", &self.subject, 150)?;

        if self.body.trim().is_empty() {
            return Err(TemplateError::InvalidTemplate(
                "Body must not be empty".to_string(),
            ));
        }

        Ok(())
    }
}

/// Request to create a new template
#[derive(Debug, Clone, Deserialize)]
pub struct CreateTemplateRequest {
    pub name: String,
    pub body: String,
    pub sender: String,
    pub subject: String,
}

impl From<CreateTemplateRequest> for MailTemplate {
    fn from(req: CreateTemplateRequest) -> Self {
        let now = Utc::now();
        MailTemplate {
            id: Uuid::new_v4(),
            name: req.name,
            body: req.body,
            sender: req.sender,
            subject: req.subject,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Request to update an existing template
#[derive(Debug, Default, Deserialize)]
pub struct UpdateTemplateRequest {
    pub name: Option<String>,
    pub body: Option<String>,
    pub sender: Option<String>,
    pub subject: Option<String>,
}
