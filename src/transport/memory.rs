//! In-memory transport that records every email it is asked to send.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use super::{MailTransport, OutgoingEmail, TransportError};

/// Records emails instead of delivering them.
///
/// A failure message can be armed with [`MemoryTransport::fail_with`] to
/// simulate a relay rejecting mail.
#[derive(Debug, Default)]
pub struct MemoryTransport {
    sent: Mutex<Vec<OutgoingEmail>>,
    failure: Mutex<Option<String>>,
    attempts: AtomicUsize,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every following send fail with `reason`
    pub fn fail_with(&self, reason: impl Into<String>) {
        *self.failure.lock().unwrap_or_else(|e| e.into_inner()) = Some(reason.into());
    }

    /// Let following sends succeed again
    pub fn recover(&self) {
        *self.failure.lock().unwrap_or_else(|e| e.into_inner()) = None;
    }

    /// Emails accepted so far
    pub fn sent(&self) -> Vec<OutgoingEmail> {
        self.sent.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Number of send calls, failed ones included
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::Relaxed)
    }
}

impl MailTransport for MemoryTransport {
    fn send(&self, email: &OutgoingEmail) -> Result<(), TransportError> {
        self.attempts.fetch_add(1, Ordering::Relaxed);

        if let Some(reason) = self.failure.lock().unwrap_or_else(|e| e.into_inner()).clone() {
            return Err(TransportError::Delivery(reason));
        }

        self.sent
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(email.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::ContentMode;

    fn email() -> OutgoingEmail {
        OutgoingEmail {
            from: "a@example.com".into(),
            to: "b@example.com".into(),
            cc: None,
            bcc: None,
            reply_to: None,
            subject: "s".into(),
            text_body: "t".into(),
            html_body: None,
            attachments: vec![],
            mode: ContentMode::Plain,
        }
    }

    #[test]
    fn test_records_sent_emails() {
        let transport = MemoryTransport::new();
        transport.send(&email()).unwrap();
        assert_eq!(transport.sent().len(), 1);
        assert_eq!(transport.attempts(), 1);
    }

    #[test]
    fn test_armed_failure() {
        let transport = MemoryTransport::new();
        transport.fail_with("relay down");
        assert!(matches!(
            transport.send(&email()),
            Err(TransportError::Delivery(reason)) if reason == "relay down"
        ));
        assert!(transport.sent().is_empty());

        transport.recover();
        assert!(transport.send(&email()).is_ok());
        assert_eq!(transport.attempts(), 2);
    }
}
