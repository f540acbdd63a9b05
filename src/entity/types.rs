//! Replacement entity types and error definitions

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

const MAX_FIELD_LEN: usize = 25;

/// Entity-specific error type
#[derive(Debug, Error)]
pub enum EntityError {
    #[error("Replacement entity not found: {0}")]
    NotFound(Uuid),

    #[error("Invalid replacement entity: {0}")]
    InvalidEntity(String),

    #[error("Unknown entity kind code: {0}")]
    UnknownKind(i32),
}

/// Result type for entity operations
pub type EntityResult<T> = Result<T, EntityError>;

/// How a resolved value is rendered into the body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    #[default]
    Direct,
    Image,
    Date,
    Time,
    Datetime,
    Link,
}

impl EntityKind {
    /// Stable integer code used for interchange
    pub fn code(self) -> i32 {
        match self {
            EntityKind::Direct => 1,
            EntityKind::Image => 2,
            EntityKind::Date => 3,
            EntityKind::Time => 4,
            EntityKind::Datetime => 5,
            EntityKind::Link => 6,
        }
    }

    /// Whether an unbound source name may stand in as the literal value.
    pub fn accepts_literal(self) -> bool {
        matches!(
            self,
            EntityKind::Direct | EntityKind::Image | EntityKind::Link
        )
    }
}

impl TryFrom<i32> for EntityKind {
    type Error = EntityError;

    fn try_from(code: i32) -> Result<Self, Self::Error> {
        match code {
            1 => Ok(EntityKind::Direct),
            2 => Ok(EntityKind::Image),
            3 => Ok(EntityKind::Date),
            4 => Ok(EntityKind::Time),
            5 => Ok(EntityKind::Datetime),
            6 => Ok(EntityKind::Link),
            other => Err(EntityError::UnknownKind(other)),
        }
    }
}

/// A rule mapping a token to the value that replaces it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplacementEntity {
    pub id: Uuid,

    /// Token without delimiters, always upper-case
    pub token: String,

    /// Name of the bound argument to read
    pub source_name: String,

    /// Attribute read off the bound object, when set
    #[serde(skip_serializing_if = "Option::is_none")]
    pub member_name: Option<String>,

    #[serde(default)]
    pub kind: EntityKind,

    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,

    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

/// Characters allowed between the delimiters of a token.
pub fn is_token_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '_' | '.' | '+' | '-')
}

impl ReplacementEntity {
    /// Validate the entity
    pub fn validate(&self) -> EntityResult<()> {
        if self.token.is_empty() || self.token.chars().count() > MAX_FIELD_LEN {
            return Err(EntityError::InvalidEntity(format!(
                "Token must be 1-{} characters",
                MAX_FIELD_LEN
            )));
        }

        if !self.token.chars().all(is_token_char) {
            return Err(EntityError::InvalidEntity(
                "Token must contain only word characters, '.', '+' or '-'".to_string(),
            ));
        }

        if self.source_name.is_empty() || self.source_name.chars().count() > MAX_FIELD_LEN {
            return Err(EntityError::InvalidEntity(format!(
                "Source name must be 1-{} characters",
                MAX_FIELD_LEN
            )));
        }

        if let Some(member) = &self.member_name {
            if member.is_empty() || member.chars().count() > MAX_FIELD_LEN {
                return Err(EntityError::InvalidEntity(format!(
                    "Member name must be 1-{} characters",
                    MAX_FIELD_LEN
                )));
            }
        }

        Ok(())
    }
}

/// Request to create a new replacement entity
#[derive(Debug, Clone, Deserialize)]
pub struct CreateEntityRequest {
    pub token: String,
    pub source_name: String,
    pub member_name: Option<String>,
    #[serde(default)]
    pub kind: EntityKind,
}

impl CreateEntityRequest {
    pub fn new(token: impl Into<String>, source_name: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            source_name: source_name.into(),
            member_name: None,
            kind: EntityKind::Direct,
        }
    }

    pub fn member(mut self, member_name: impl Into<String>) -> Self {
        self.member_name = Some(member_name.into());
        self
    }

    pub fn kind(mut self, kind: EntityKind) -> Self {
        self.kind = kind;
        self
    }
}

impl From<CreateEntityRequest> for ReplacementEntity {
    fn from(req: CreateEntityRequest) -> Self {
        let now = Utc::now();
        ReplacementEntity {
            id: Uuid::new_v4(),
            token: req.token.to_uppercase(),
            source_name: req.source_name,
            member_name: req.member_name,
            kind: req.kind,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Request to update an existing replacement entity
#[derive(Debug, Default, Deserialize)]
pub struct UpdateEntityRequest {
    pub token: Option<String>,
    pub source_name: Option<String>,
    /// Use `Some(None)` to clear the member name
    pub member_name: Option<Option<String>>,
    pub kind: Option<EntityKind>,
}

/// Extra predicate an entity must satisfy to be resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntityFilter {
    Kind(EntityKind),
    SourceName(String),
    MemberName(Option<String>),
}

impl EntityFilter {
    pub fn matches(&self, entity: &ReplacementEntity) -> bool {
        match self {
            EntityFilter::Kind(kind) => entity.kind == *kind,
            EntityFilter::SourceName(name) => entity.source_name == *name,
            EntityFilter::MemberName(member) => entity.member_name == *member,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_request_uppercases_token() {
        let entity: ReplacementEntity = CreateEntityRequest::new("first_name", "user").into();
        assert_eq!(entity.token, "FIRST_NAME");
        assert!(entity.validate().is_ok());
    }

    #[test]
    fn test_validation_rejects_delimiter_chars() {
        let entity: ReplacementEntity = CreateEntityRequest::new("NA#ME", "user").into();
        assert!(matches!(
            entity.validate(),
            Err(EntityError::InvalidEntity(_))
        ));
    }

    #[test]
    fn test_validation_rejects_long_token() {
        let entity: ReplacementEntity =
            CreateEntityRequest::new("A".repeat(26), "user").into();
        assert!(entity.validate().is_err());
    }

    #[test]
    fn test_validation_rejects_empty_member() {
        let entity: ReplacementEntity = CreateEntityRequest::new("NAME", "user").member("").into();
        assert!(entity.validate().is_err());
    }

    #[test]
    fn test_kind_codes() {
        for code in 1..=6 {
            let kind = EntityKind::try_from(code).unwrap();
            assert_eq!(kind.code(), code);
        }
        assert!(matches!(
            EntityKind::try_from(7),
            Err(EntityError::UnknownKind(7))
        ));
    }

    #[test]
    fn test_filters() {
        let entity: ReplacementEntity = CreateEntityRequest::new("NAME", "user")
            .member("first_name")
            .into();

        assert!(EntityFilter::Kind(EntityKind::Direct).matches(&entity));
        assert!(!EntityFilter::Kind(EntityKind::Link).matches(&entity));
        assert!(EntityFilter::SourceName("user".into()).matches(&entity));
        assert!(EntityFilter::MemberName(Some("first_name".into())).matches(&entity));
        assert!(!EntityFilter::MemberName(None).matches(&entity));
    }
}
