//! Mail template system.
//!
//! Templates hold a reusable body with raw tokens plus a default sender and
//! subject. Building a mail copies those values out; a built mail never
//! follows later template edits.
//!
//! # Example
//!
//! ```ignore
//! let store = TemplateStore::new();
//!
//! let template = store.create(CreateTemplateRequest {
//!     name: "welcome".to_string(),
//!     body: "Hello ###NAME###".to_string(),
//!     sender: "noreply@example.com".to_string(),
//!     subject: "Welcome".to_string(),
//! })?;
//!
//! let fields = store.compose(template.id)?.to("ann@example.com");
//! ```

mod store;
mod types;

pub use store::{create_template_store, TemplateStore};
pub use types::{
    CreateTemplateRequest, MailTemplate, TemplateError, TemplateResult, UpdateTemplateRequest,
};
