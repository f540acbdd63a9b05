//! In-memory mail and attachment storage

use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use uuid::Uuid;

use super::types::{Attachment, Mail, MailErrorCode};

/// Stores built mails and their attachments
#[derive(Default)]
pub struct MailStore {
    mails: DashMap<Uuid, Mail>,
    attachments: DashMap<Uuid, Vec<Attachment>>,
}

impl MailStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a mail
    pub fn insert(&self, mail: Mail) {
        self.mails.insert(mail.id, mail);
    }

    pub fn get(&self, id: Uuid) -> Option<Mail> {
        self.mails.get(&id).map(|m| m.clone())
    }

    /// Apply `change` to a stored mail and bump `updated_at`.
    ///
    /// Returns the updated mail, or `None` if no mail has this id.
    pub fn update<F>(&self, id: Uuid, change: F) -> Option<Mail>
    where
        F: FnOnce(&mut Mail),
    {
        let mut entry = self.mails.get_mut(&id)?;
        change(entry.value_mut());
        entry.updated_at = Utc::now();
        Some(entry.clone())
    }

    /// All mails, oldest first
    pub fn list(&self) -> Vec<Mail> {
        let mut mails: Vec<Mail> = self.mails.iter().map(|e| e.value().clone()).collect();
        mails.sort_by_key(|m| m.created_at);
        mails
    }

    pub fn count(&self) -> usize {
        self.mails.len()
    }

    /// Attach a file to an existing mail
    pub fn add_attachment(&self, mail_id: Uuid, path: impl Into<PathBuf>) -> Option<Attachment> {
        if !self.mails.contains_key(&mail_id) {
            return None;
        }

        let attachment = Attachment {
            id: Uuid::new_v4(),
            mail_id,
            path: path.into(),
            created_at: Utc::now(),
        };

        self.attachments
            .entry(mail_id)
            .or_default()
            .push(attachment.clone());

        Some(attachment)
    }

    pub fn attachments(&self, mail_id: Uuid) -> Vec<Attachment> {
        self.attachments
            .get(&mail_id)
            .map(|a| a.clone())
            .unwrap_or_default()
    }

    /// Unsent mails without an error code whose delivery time has come
    pub fn due_for_delivery(&self, now: DateTime<Utc>) -> Vec<Mail> {
        let mut due: Vec<Mail> = self
            .mails
            .iter()
            .filter(|e| {
                let mail = e.value();
                !mail.is_sent()
                    && mail.error_code.is_none()
                    && mail
                        .deliver_at
                        .map_or(true, |at| at.with_timezone(&Utc) <= now)
            })
            .map(|e| e.value().clone())
            .collect();
        due.sort_by_key(|m| m.created_at);
        due
    }

    /// Mails carrying a given error code
    pub fn with_error(&self, code: MailErrorCode) -> Vec<Mail> {
        self.mails
            .iter()
            .filter(|e| e.value().error_code == Some(code))
            .map(|e| e.value().clone())
            .collect()
    }
}

pub fn create_mail_store() -> Arc<MailStore> {
    Arc::new(MailStore::new())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn mail() -> Mail {
        let now = Utc::now();
        Mail {
            id: Uuid::new_v4(),
            sender: "noreply@example.com".to_string(),
            receptor_to: "ann@example.com".to_string(),
            receptor_cc: None,
            receptor_bcc: None,
            body: "Hello".to_string(),
            subject: "Hi".to_string(),
            template_id: None,
            deliver_at: None,
            sent_at: None,
            opened_at: None,
            opened_at_last: None,
            content_mode: None,
            error_code: None,
            error_detail: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_insert_and_get() {
        let store = MailStore::new();
        let mail = mail();
        let id = mail.id;
        store.insert(mail);

        assert_eq!(store.count(), 1);
        assert_eq!(store.get(id).unwrap().receptor_to, "ann@example.com");
        assert!(store.get(Uuid::new_v4()).is_none());
    }

    #[test]
    fn test_update() {
        let store = MailStore::new();
        let mail = mail();
        let id = mail.id;
        store.insert(mail);

        let updated = store
            .update(id, |m| m.subject = "Changed".to_string())
            .unwrap();
        assert_eq!(updated.subject, "Changed");
        assert_eq!(store.get(id).unwrap().subject, "Changed");
        assert!(store.update(Uuid::new_v4(), |_| {}).is_none());
    }

    #[test]
    fn test_attachments() {
        let store = MailStore::new();
        let mail = mail();
        let id = mail.id;
        store.insert(mail);

        store.add_attachment(id, "/tmp/a.pdf").unwrap();
        store.add_attachment(id, "/tmp/b.pdf").unwrap();
        assert!(store.add_attachment(Uuid::new_v4(), "/tmp/c.pdf").is_none());

        let paths: Vec<PathBuf> = store.attachments(id).into_iter().map(|a| a.path).collect();
        assert_eq!(paths, vec![PathBuf::from("/tmp/a.pdf"), PathBuf::from("/tmp/b.pdf")]);
    }

    #[test]
    fn test_due_for_delivery() {
        let store = MailStore::new();
        let now = Utc::now();

        let immediate = mail();
        let past = Mail {
            deliver_at: Some((now - Duration::hours(1)).fixed_offset()),
            ..mail()
        };
        let future = Mail {
            deliver_at: Some((now + Duration::hours(1)).fixed_offset()),
            ..mail()
        };
        let sent = Mail {
            sent_at: Some(now.fixed_offset()),
            ..mail()
        };
        let errored = Mail {
            error_code: Some(MailErrorCode::TransportError),
            ..mail()
        };

        let due_ids = [immediate.id, past.id];
        for m in [immediate, past, future, sent, errored] {
            store.insert(m);
        }

        let due = store.due_for_delivery(now);
        assert_eq!(due.len(), 2);
        assert!(due.iter().all(|m| due_ids.contains(&m.id)));
    }
}
