//! Open tracking

use std::sync::Arc;

use chrono::Utc;
use chrono_tz::Tz;
use uuid::Uuid;

use crate::metrics::TrackingMetrics;

use super::store::MailStore;

/// Stamps mails as opened when their tracking marker is fetched
pub struct OpenTracker {
    store: Arc<MailStore>,
    timezone: Tz,
}

impl OpenTracker {
    pub fn new(store: Arc<MailStore>, timezone: Tz) -> Self {
        Self { store, timezone }
    }

    /// Record an open. Unknown ids are ignored; returns whether a mail was stamped.
    pub fn record_open(&self, mail_id: Uuid) -> bool {
        let now = Utc::now().with_timezone(&self.timezone).fixed_offset();

        let stamped = self.store.update(mail_id, |mail| {
            if mail.opened_at.is_none() {
                mail.opened_at = Some(now);
            }
            mail.opened_at_last = Some(now);
        });

        match stamped {
            Some(_) => {
                tracing::debug!(mail_id = %mail_id, "Mail opened");
                TrackingMetrics::record_open();
                true
            }
            None => {
                tracing::debug!(mail_id = %mail_id, "Open tracked for unknown mail");
                false
            }
        }
    }
}
