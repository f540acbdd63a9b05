//! Outbound mail transports.
//!
//! The dispatcher hands a fully rendered [`OutgoingEmail`] to a
//! [`MailTransport`]. Two implementations ship with the crate:
//! - [`SmtpMailTransport`]: delivers through an SMTP relay (lettre)
//! - [`MemoryTransport`]: records emails in memory, for tests and dry runs

mod memory;
mod smtp;

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use memory::MemoryTransport;
pub use smtp::SmtpMailTransport;

/// Content subtype of a dispatched mail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentMode {
    /// Single text/plain part
    Plain,
    /// text/plain + text/html alternative
    Html,
}

impl ContentMode {
    pub fn as_str(self) -> &'static str {
        match self {
            ContentMode::Plain => "plain",
            ContentMode::Html => "html",
        }
    }
}

/// Errors reported by a transport
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Invalid address '{address}': {reason}")]
    InvalidAddress { address: String, reason: String },

    #[error("Failed to read attachment {}: {source}", path.display())]
    Attachment {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to build message: {0}")]
    Build(String),

    #[error("Delivery failed: {0}")]
    Delivery(String),
}

/// A rendered email ready for delivery
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingEmail {
    pub from: String,
    pub to: String,
    pub cc: Option<String>,
    pub bcc: Option<String>,
    pub reply_to: Option<String>,
    pub subject: String,
    /// Plain text part, always present
    pub text_body: String,
    /// HTML alternative, present in `ContentMode::Html`
    pub html_body: Option<String>,
    /// Files to attach, read at send time
    pub attachments: Vec<PathBuf>,
    pub mode: ContentMode,
}

/// Delivers rendered emails.
///
/// `send` blocks until the transport accepted or rejected the email; no
/// timeout is imposed on top of the transport's own.
pub trait MailTransport: Send + Sync {
    fn send(&self, email: &OutgoingEmail) -> Result<(), TransportError>;
}
