//! Hands built mails to a transport

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use chrono_tz::Tz;
use dashmap::DashSet;
use uuid::Uuid;

use crate::markup::MarkupClassifier;
use crate::metrics::DispatchMetrics;
use crate::transport::{ContentMode, MailTransport, OutgoingEmail};

use super::store::MailStore;
use super::types::{Attachment, Mail, MailErrorCode, SendError};

/// Longest transport error detail kept on a mail
const MAX_ERROR_DETAIL: usize = 199;

/// Deployment values used when rendering outgoing mail
#[derive(Debug, Clone)]
pub struct DispatchConfig {
    /// Public base URL without trailing slash
    pub site_url: String,
    pub reply_to: Option<String>,
    pub timezone: Tz,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            site_url: "http://localhost:8080".to_string(),
            reply_to: None,
            timezone: chrono_tz::UTC,
        }
    }
}

/// Removes its id from the in-flight set on drop
struct InFlightGuard<'a> {
    in_flight: &'a DashSet<Uuid>,
    id: Uuid,
}

impl<'a> InFlightGuard<'a> {
    fn acquire(in_flight: &'a DashSet<Uuid>, id: Uuid) -> Option<Self> {
        in_flight.insert(id).then(|| Self { in_flight, id })
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.in_flight.remove(&self.id);
    }
}

pub struct MailDispatcher {
    store: Arc<MailStore>,
    transport: Arc<dyn MailTransport>,
    classifier: Arc<dyn MarkupClassifier>,
    config: DispatchConfig,
    in_flight: DashSet<Uuid>,
}

impl MailDispatcher {
    pub fn new(
        store: Arc<MailStore>,
        transport: Arc<dyn MailTransport>,
        classifier: Arc<dyn MarkupClassifier>,
        config: DispatchConfig,
    ) -> Self {
        Self {
            store,
            transport,
            classifier,
            config,
            in_flight: DashSet::new(),
        }
    }

    pub fn config(&self) -> &DispatchConfig {
        &self.config
    }

    /// Invisible image whose request marks the mail as opened
    pub fn tracking_marker(&self, mail_id: Uuid) -> String {
        format!(
            "<img src='{}/track/{}' width='1' height='1' alt='' style='display:none'>",
            self.config.site_url, mail_id
        )
    }

    /// Render a stored mail into what the transport receives
    pub fn render(&self, mail: &Mail, attachments: &[Attachment]) -> OutgoingEmail {
        let markup = self.classifier.feed(&mail.body);

        let (text_body, html_body, mode) = if markup.is_markup {
            let html = format!("{}{}", mail.body, self.tracking_marker(mail.id));
            (markup.plain_text, Some(html), ContentMode::Html)
        } else {
            (mail.body.clone(), None, ContentMode::Plain)
        };

        OutgoingEmail {
            from: mail.sender.clone(),
            to: mail.receptor_to.clone(),
            cc: mail.receptor_cc.clone(),
            bcc: mail.receptor_bcc.clone(),
            reply_to: self.config.reply_to.clone(),
            subject: mail.subject.clone(),
            text_body,
            html_body,
            attachments: attachments.iter().map(|a| a.path.clone()).collect(),
            mode,
        }
    }

    /// Send a stored mail once.
    ///
    /// Mails with a build error, mails already sent and mails currently
    /// being sent are refused without touching the transport. A transport
    /// failure is recorded on the mail and may be retried by calling
    /// `send` again.
    #[tracing::instrument(skip(self), fields(mail_id = %id))]
    pub fn send(&self, id: Uuid) -> Result<Mail, SendError> {
        let Some(_guard) = InFlightGuard::acquire(&self.in_flight, id) else {
            tracing::warn!("Mail is already being sent");
            DispatchMetrics::record_refused("in_flight");
            return Err(SendError::InFlight(id));
        };

        let mail = self.store.get(id).ok_or(SendError::NotFound(id))?;

        if let Some(code) = mail.error_code.filter(|c| c.is_build_error()) {
            tracing::warn!(error_code = code.as_str(), "Refusing to send unresolved mail");
            DispatchMetrics::record_refused("unresolved");
            return Err(SendError::Unresolved { id, code });
        }

        if mail.is_sent() {
            tracing::warn!(sent_at = ?mail.sent_at, "Refusing to send mail twice");
            DispatchMetrics::record_refused("already_sent");
            return Err(SendError::AlreadySent(id));
        }

        let email = self.render(&mail, &self.store.attachments(id));

        let started = Instant::now();
        let result = self.transport.send(&email);
        DispatchMetrics::record_latency(started.elapsed().as_secs_f64());

        match result {
            Ok(()) => {
                let sent_at = Utc::now().with_timezone(&self.config.timezone).fixed_offset();
                let updated = self
                    .store
                    .update(id, |m| {
                        m.sent_at = Some(sent_at);
                        m.content_mode = Some(email.mode);
                        if m.error_code == Some(MailErrorCode::TransportError) {
                            m.error_code = None;
                            m.error_detail = None;
                        }
                    })
                    .ok_or(SendError::NotFound(id))?;

                tracing::info!(mode = email.mode.as_str(), "Mail sent");
                DispatchMetrics::record_sent(email.mode.as_str());
                Ok(updated)
            }
            Err(e) => {
                let message = e.to_string();
                let detail = truncate(&message, MAX_ERROR_DETAIL);
                self.store.update(id, |m| {
                    m.error_code = Some(MailErrorCode::TransportError);
                    m.error_detail = Some(detail);
                });

                tracing::error!(error = %message, "Transport failed to send mail");
                DispatchMetrics::record_failed();
                Err(SendError::Transport(message))
            }
        }
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}
