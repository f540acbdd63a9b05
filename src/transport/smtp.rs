//! SMTP transport using lettre

use std::path::Path;

use lettre::message::header::ContentType;
use lettre::message::{Attachment, Mailbox, MessageBuilder, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};

use crate::config::SmtpConfig;

use super::{ContentMode, MailTransport, OutgoingEmail, TransportError};

/// Blocking SMTP transport
pub struct SmtpMailTransport {
    transport: SmtpTransport,
}

impl SmtpMailTransport {
    /// Create a transport for the configured relay
    pub fn new(config: &SmtpConfig) -> Result<Self, TransportError> {
        let builder = if config.use_tls {
            SmtpTransport::relay(&config.host)
                .map_err(|e| TransportError::Build(e.to_string()))?
        } else {
            SmtpTransport::builder_dangerous(&config.host)
        };

        let builder = builder.port(config.port);
        let builder = match (&config.username, &config.password) {
            (Some(username), Some(password)) => {
                builder.credentials(Credentials::new(username.clone(), password.clone()))
            }
            _ => builder,
        };

        tracing::info!(
            host = %config.host,
            port = config.port,
            tls = config.use_tls,
            "SMTP transport configured"
        );

        Ok(Self {
            transport: builder.build(),
        })
    }
}

impl MailTransport for SmtpMailTransport {
    fn send(&self, email: &OutgoingEmail) -> Result<(), TransportError> {
        let message = build_message(email)?;

        self.transport
            .send(&message)
            .map_err(|e| TransportError::Delivery(e.to_string()))?;

        Ok(())
    }
}

fn mailbox(address: &str) -> Result<Mailbox, TransportError> {
    address
        .parse()
        .map_err(|e: lettre::address::AddressError| TransportError::InvalidAddress {
            address: address.to_string(),
            reason: e.to_string(),
        })
}

fn headers(email: &OutgoingEmail) -> Result<MessageBuilder, TransportError> {
    let mut builder = Message::builder()
        .from(mailbox(&email.from)?)
        .to(mailbox(&email.to)?)
        .subject(email.subject.clone());

    if let Some(cc) = &email.cc {
        builder = builder.cc(mailbox(cc)?);
    }
    if let Some(bcc) = &email.bcc {
        builder = builder.bcc(mailbox(bcc)?);
    }
    if let Some(reply_to) = &email.reply_to {
        builder = builder.reply_to(mailbox(reply_to)?);
    }

    Ok(builder)
}

fn attachment(path: &Path) -> Result<SinglePart, TransportError> {
    let content = std::fs::read(path).map_err(|source| TransportError::Attachment {
        path: path.to_path_buf(),
        source,
    })?;

    let filename = path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("attachment")
        .to_string();

    let content_type = ContentType::parse("application/octet-stream")
        .map_err(|e| TransportError::Build(e.to_string()))?;

    Ok(Attachment::new(filename).body(content, content_type))
}

/// Assemble the MIME structure for an outgoing email
pub(crate) fn build_message(email: &OutgoingEmail) -> Result<Message, TransportError> {
    let builder = headers(email)?;

    let alternative = match (email.mode, &email.html_body) {
        (ContentMode::Html, Some(html)) => Some(MultiPart::alternative_plain_html(
            email.text_body.clone(),
            html.clone(),
        )),
        _ => None,
    };

    let message = if email.attachments.is_empty() {
        match alternative {
            Some(parts) => builder.multipart(parts),
            None => builder
                .header(ContentType::TEXT_PLAIN)
                .body(email.text_body.clone()),
        }
    } else {
        let mut mixed = match alternative {
            Some(parts) => MultiPart::mixed().multipart(parts),
            None => MultiPart::mixed().singlepart(SinglePart::plain(email.text_body.clone())),
        };
        for path in &email.attachments {
            mixed = mixed.singlepart(attachment(path)?);
        }
        builder.multipart(mixed)
    };

    message.map_err(|e| TransportError::Build(e.to_string()))
}
