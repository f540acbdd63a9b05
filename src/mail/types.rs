//! Mail records and the fields a mail is built from

use std::path::PathBuf;

use chrono::{DateTime, Duration, FixedOffset, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::entity::EntityFilter;
use crate::formatter::{FormatError, OutputMode};
use crate::template::MailTemplate;
use crate::transport::ContentMode;

/// Why a mail cannot be, or could not be, delivered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MailErrorCode {
    /// A registered token found no value
    PopulationError,
    /// A token has no registered entity
    UnresolvedKeyError,
    /// Both of the above
    Both,
    /// The transport rejected the mail
    TransportError,
}

impl MailErrorCode {
    pub fn as_str(self) -> &'static str {
        match self {
            MailErrorCode::PopulationError => "population-error",
            MailErrorCode::UnresolvedKeyError => "unresolved-key-error",
            MailErrorCode::Both => "both",
            MailErrorCode::TransportError => "transport-error",
        }
    }

    /// Errors found while building; such a mail is never handed to a transport
    pub fn is_build_error(self) -> bool {
        !matches!(self, MailErrorCode::TransportError)
    }
}

/// A built mail
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Mail {
    pub id: Uuid,
    pub sender: String,
    pub receptor_to: String,
    pub receptor_cc: Option<String>,
    pub receptor_bcc: Option<String>,
    /// Populated body; unresolved tokens stay in place
    pub body: String,
    pub subject: String,
    pub template_id: Option<Uuid>,
    /// Earliest delivery time, `None` for as soon as possible
    pub deliver_at: Option<DateTime<FixedOffset>>,
    pub sent_at: Option<DateTime<FixedOffset>>,
    /// First open
    pub opened_at: Option<DateTime<FixedOffset>>,
    /// Most recent open
    pub opened_at_last: Option<DateTime<FixedOffset>>,
    /// Recorded at dispatch
    pub content_mode: Option<ContentMode>,
    pub error_code: Option<MailErrorCode>,
    pub error_detail: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Mail {
    pub fn is_sent(&self) -> bool {
        self.sent_at.is_some()
    }
}

/// A file attached to a mail
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Attachment {
    pub id: Uuid,
    pub mail_id: Uuid,
    pub path: PathBuf,
    pub created_at: DateTime<Utc>,
}

/// Requested delivery time of a mail
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliverAt {
    /// Wall-clock time in the deployment timezone
    Local(NaiveDateTime),
    /// An instant with its own offset
    Exact(DateTime<FixedOffset>),
}

impl DeliverAt {
    /// Express the delivery time in `tz`.
    ///
    /// A local time falling in a DST gap is moved forward by the gap,
    /// so it is never scheduled before the requested wall-clock time.
    pub fn in_zone(self, tz: Tz) -> DateTime<FixedOffset> {
        match self {
            DeliverAt::Local(naive) => tz
                .from_local_datetime(&naive)
                .earliest()
                .or_else(|| tz.from_local_datetime(&(naive + Duration::hours(1))).earliest())
                .unwrap_or_else(|| tz.from_utc_datetime(&naive))
                .fixed_offset(),
            DeliverAt::Exact(instant) => instant.with_timezone(&tz).fixed_offset(),
        }
    }
}

impl From<NaiveDateTime> for DeliverAt {
    fn from(naive: NaiveDateTime) -> Self {
        DeliverAt::Local(naive)
    }
}

impl From<DateTime<FixedOffset>> for DeliverAt {
    fn from(instant: DateTime<FixedOffset>) -> Self {
        DeliverAt::Exact(instant)
    }
}

impl From<DateTime<Utc>> for DeliverAt {
    fn from(instant: DateTime<Utc>) -> Self {
        DeliverAt::Exact(instant.fixed_offset())
    }
}

/// Everything a mail is built from.
///
/// `body`, `sender`, `receptor_to` and `subject` are required; a blank
/// value counts as missing.
#[derive(Debug, Clone, Default)]
pub struct MailFields {
    pub body: Option<String>,
    pub sender: Option<String>,
    pub receptor_to: Option<String>,
    pub subject: Option<String>,
    pub receptor_cc: Option<String>,
    pub receptor_bcc: Option<String>,
    pub deliver_at: Option<DeliverAt>,
    pub template_id: Option<Uuid>,
    /// Extra predicates narrowing token resolution
    pub entity_filters: Vec<EntityFilter>,
    /// Forced output mode; classified from the body when absent
    pub output_mode: Option<OutputMode>,
}

impl MailFields {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-fill body, sender and subject from a template
    pub fn from_template(template: &MailTemplate) -> Self {
        Self {
            body: Some(template.body.clone()),
            sender: Some(template.sender.clone()),
            subject: Some(template.subject.clone()),
            template_id: Some(template.id),
            ..Self::default()
        }
    }

    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn sender(mut self, sender: impl Into<String>) -> Self {
        self.sender = Some(sender.into());
        self
    }

    pub fn to(mut self, receptor: impl Into<String>) -> Self {
        self.receptor_to = Some(receptor.into());
        self
    }

    pub fn subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    pub fn cc(mut self, receptor: impl Into<String>) -> Self {
        self.receptor_cc = Some(receptor.into());
        self
    }

    pub fn bcc(mut self, receptor: impl Into<String>) -> Self {
        self.receptor_bcc = Some(receptor.into());
        self
    }

    pub fn deliver_at(mut self, when: impl Into<DeliverAt>) -> Self {
        self.deliver_at = Some(when.into());
        self
    }

    pub fn filter(mut self, filter: EntityFilter) -> Self {
        self.entity_filters.push(filter);
        self
    }

    pub fn output_mode(mut self, mode: OutputMode) -> Self {
        self.output_mode = Some(mode);
        self
    }

    /// Names of the required fields that are absent or blank
    pub fn missing_fields(&self) -> Vec<&'static str> {
        [
            ("body", &self.body),
            ("sender", &self.sender),
            ("receptor_to", &self.receptor_to),
            ("subject", &self.subject),
        ]
        .into_iter()
        .filter(|(_, value)| !is_present(value))
        .map(|(name, _)| name)
        .collect()
    }
}

pub(crate) fn is_present(value: &Option<String>) -> bool {
    value.as_deref().is_some_and(|v| !v.trim().is_empty())
}

/// Drop blank values
pub(crate) fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Result of a build.
///
/// `mail` is `None` only when required fields were missing; a mail with
/// unresolved tokens is still built and carries an error code.
#[derive(Debug, Clone)]
pub struct BuildOutcome {
    pub mail: Option<Mail>,
    pub unresolved_tokens: Vec<String>,
    pub unresolved_values: Vec<String>,
}

impl BuildOutcome {
    pub(crate) fn rejected() -> Self {
        Self {
            mail: None,
            unresolved_tokens: Vec::new(),
            unresolved_values: Vec::new(),
        }
    }
}

#[derive(Debug, Error)]
pub enum BuildError {
    #[error(transparent)]
    Format(#[from] FormatError),
}

#[derive(Debug, Error)]
pub enum SendError {
    #[error("Mail not found: {0}")]
    NotFound(Uuid),

    #[error("Mail {id} has unresolved content ({})", code.as_str())]
    Unresolved { id: Uuid, code: MailErrorCode },

    #[error("Mail {0} was already sent")]
    AlreadySent(Uuid),

    #[error("Mail {0} is being sent")]
    InFlight(Uuid),

    #[error("Transport error: {0}")]
    Transport(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_error_code_serialization() {
        let json = serde_json::to_string(&MailErrorCode::UnresolvedKeyError).unwrap();
        assert_eq!(json, "\"unresolved-key-error\"");
        assert_eq!(MailErrorCode::Both.as_str(), "both");
    }

    #[test]
    fn test_build_error_codes() {
        assert!(MailErrorCode::PopulationError.is_build_error());
        assert!(MailErrorCode::UnresolvedKeyError.is_build_error());
        assert!(MailErrorCode::Both.is_build_error());
        assert!(!MailErrorCode::TransportError.is_build_error());
    }

    #[test]
    fn test_missing_fields() {
        let fields = MailFields::new().body("Hi").sender("a@example.com").subject("  ");
        assert_eq!(fields.missing_fields(), vec!["receptor_to", "subject"]);

        let complete = fields.to("b@example.com").subject("Hello");
        assert!(complete.missing_fields().is_empty());
    }

    #[test]
    fn test_local_deliver_at_uses_deployment_zone() {
        let naive = NaiveDate::from_ymd_opt(2024, 1, 15)
            .unwrap()
            .and_hms_opt(9, 30, 0)
            .unwrap();
        let adjusted = DeliverAt::from(naive).in_zone(chrono_tz::America::Santiago);

        assert_eq!(adjusted.naive_local(), naive);
        assert_eq!(adjusted.offset().local_minus_utc(), -3 * 3600);
    }

    #[test]
    fn test_local_deliver_at_in_dst_gap_moves_forward() {
        // Santiago skips 00:00-01:00 local on 2024-09-08
        let naive = NaiveDate::from_ymd_opt(2024, 9, 8)
            .unwrap()
            .and_hms_opt(0, 30, 0)
            .unwrap();
        let adjusted = DeliverAt::from(naive).in_zone(chrono_tz::America::Santiago);

        assert_eq!(adjusted, Utc.with_ymd_and_hms(2024, 9, 8, 4, 30, 0).unwrap());
        assert_eq!(adjusted.offset().local_minus_utc(), -3 * 3600);
    }

    #[test]
    fn test_exact_deliver_at_keeps_instant() {
        let instant = Utc.with_ymd_and_hms(2024, 7, 1, 12, 0, 0).unwrap();
        let adjusted = DeliverAt::from(instant).in_zone(chrono_tz::Europe::Madrid);

        assert_eq!(adjusted, instant);
        assert_eq!(adjusted.offset().local_minus_utc(), 2 * 3600);
    }
}
