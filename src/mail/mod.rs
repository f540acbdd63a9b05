//! Mail composition, storage, dispatch and open tracking.
//!
//! A mail goes through two independent steps:
//! 1. [`MailBuilder::build`] populates the body and persists the mail, with
//!    an error code when tokens stayed unresolved
//! 2. [`MailDispatcher::send`] renders the stored mail and hands it to a
//!    [`MailTransport`](crate::transport::MailTransport)
//!
//! Opens are stamped by [`OpenTracker`] when the tracking marker appended to
//! HTML mails is fetched.

mod builder;
mod dispatcher;
mod store;
mod tracking;
mod types;

pub use builder::MailBuilder;
pub use dispatcher::{DispatchConfig, MailDispatcher};
pub use store::{create_mail_store, MailStore};
pub use tracking::OpenTracker;
pub use types::{
    Attachment, BuildError, BuildOutcome, DeliverAt, Mail, MailErrorCode, MailFields, SendError,
};

pub use crate::transport::ContentMode;
