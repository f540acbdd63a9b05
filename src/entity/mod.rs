//! Replacement entity registry.
//!
//! A replacement entity tells the populator how to fill one token:
//! - `source_name` names the bound argument to read
//! - `member_name`, when set, names an attribute read off that argument
//! - `kind` selects how the value is rendered
//!
//! Tokens are stored upper-cased, so lookups are case-insensitive.

mod registry;
mod types;

pub use registry::{create_entity_registry, EntityRegistry, DEFAULT_ESCAPE_TOKEN};
pub use types::{
    is_token_char, CreateEntityRequest, EntityError, EntityFilter, EntityKind, EntityResult,
    ReplacementEntity, UpdateEntityRequest,
};
