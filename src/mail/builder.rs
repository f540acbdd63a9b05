//! Message builder: populates a body and persists the resulting mail

use std::sync::Arc;

use chrono::Utc;
use chrono_tz::Tz;
use uuid::Uuid;

use crate::formatter::OutputMode;
use crate::markup::MarkupClassifier;
use crate::metrics::BuildMetrics;
use crate::populator::{BodyPopulator, Population};
use crate::value::BoundValues;

use super::store::MailStore;
use super::types::{non_blank, BuildError, BuildOutcome, Mail, MailErrorCode, MailFields};

/// Builds mails from fields and bound values
pub struct MailBuilder {
    populator: Arc<BodyPopulator>,
    store: Arc<MailStore>,
    classifier: Arc<dyn MarkupClassifier>,
    timezone: Tz,
}

impl MailBuilder {
    pub fn new(
        populator: Arc<BodyPopulator>,
        store: Arc<MailStore>,
        classifier: Arc<dyn MarkupClassifier>,
        timezone: Tz,
    ) -> Self {
        Self {
            populator,
            store,
            classifier,
            timezone,
        }
    }

    /// Build and persist a mail.
    ///
    /// Missing required fields yield an outcome without a mail and nothing
    /// is stored. Unresolved tokens or values still produce a stored mail,
    /// marked with the matching error code.
    #[tracing::instrument(skip_all, fields(template_id = ?fields.template_id))]
    pub fn build(
        &self,
        fields: MailFields,
        values: &BoundValues,
    ) -> Result<BuildOutcome, BuildError> {
        let missing = fields.missing_fields();
        let MailFields {
            body,
            sender,
            receptor_to,
            subject,
            receptor_cc,
            receptor_bcc,
            deliver_at,
            template_id,
            entity_filters,
            output_mode,
        } = fields;

        let (Some(body), Some(sender), Some(receptor_to), Some(subject)) = (
            non_blank(body),
            non_blank(sender),
            non_blank(receptor_to),
            non_blank(subject),
        ) else {
            tracing::warn!(missing = ?missing, "Mail not built, required fields missing");
            BuildMetrics::record_rejected();
            return Ok(BuildOutcome::rejected());
        };

        let mode = output_mode.unwrap_or_else(|| {
            if self.classifier.feed(&body).is_markup {
                OutputMode::Rich
            } else {
                OutputMode::Plain
            }
        });

        let population = self
            .populator
            .populate(&body, &entity_filters, mode, values)?;
        let (error_code, error_detail) = classify(&population);

        let now = Utc::now();
        let mail = Mail {
            id: Uuid::new_v4(),
            sender,
            receptor_to,
            receptor_cc: non_blank(receptor_cc),
            receptor_bcc: non_blank(receptor_bcc),
            body: population.body,
            subject,
            template_id,
            deliver_at: deliver_at.map(|at| at.in_zone(self.timezone)),
            sent_at: None,
            opened_at: None,
            opened_at_last: None,
            content_mode: None,
            error_code,
            error_detail,
            created_at: now,
            updated_at: now,
        };

        self.store.insert(mail.clone());

        match error_code {
            Some(code) => tracing::warn!(
                mail_id = %mail.id,
                error_code = code.as_str(),
                detail = ?mail.error_detail,
                "Mail built with unresolved content"
            ),
            None => tracing::info!(mail_id = %mail.id, "Mail built"),
        }
        BuildMetrics::record_outcome(error_code.map_or("ready", MailErrorCode::as_str));

        Ok(BuildOutcome {
            mail: Some(mail),
            unresolved_tokens: population.unresolved_tokens,
            unresolved_values: population.unresolved_values,
        })
    }
}

/// Error code and detail for a population
fn classify(population: &Population) -> (Option<MailErrorCode>, Option<String>) {
    let tokens = &population.unresolved_tokens;
    let values = &population.unresolved_values;

    match (values.is_empty(), tokens.is_empty()) {
        (true, true) => (None, None),
        (true, false) => (Some(MailErrorCode::UnresolvedKeyError), Some(tokens.join(","))),
        (false, true) => (Some(MailErrorCode::PopulationError), Some(values.join(","))),
        (false, false) => {
            let detail = values.iter().chain(tokens).cloned().collect::<Vec<_>>();
            (Some(MailErrorCode::Both), Some(detail.join(",")))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{CreateEntityRequest, EntityKind, EntityRegistry};
    use crate::formatter::ValueFormatter;
    use crate::markup::HtmlStripper;
    use crate::value::{Record, Value};
    use chrono::NaiveDate;

    fn builder() -> (MailBuilder, Arc<MailStore>) {
        let registry = Arc::new(EntityRegistry::new());
        registry
            .create(CreateEntityRequest::new("NAME", "user").member("name"))
            .unwrap();
        registry
            .create(CreateEntityRequest::new("BRAND", "Mailforge"))
            .unwrap();
        registry
            .create(
                CreateEntityRequest::new("LOGO", "https://ex.io/logo.png")
                    .kind(EntityKind::Image),
            )
            .unwrap();

        let populator = Arc::new(BodyPopulator::new(registry, ValueFormatter::default()));
        let store = Arc::new(MailStore::new());
        let builder = MailBuilder::new(
            populator,
            store.clone(),
            Arc::new(HtmlStripper::new()),
            chrono_tz::UTC,
        );
        (builder, store)
    }

    fn fields(body: &str) -> MailFields {
        MailFields::new()
            .body(body)
            .sender("noreply@example.com")
            .to("ann@example.com")
            .subject("Welcome")
    }

    fn user() -> BoundValues {
        BoundValues::new().with("user", Value::object(Record::new().with("name", "Ann")))
    }

    #[test]
    fn test_build_ready_mail() {
        let (builder, store) = builder();
        let outcome = builder
            .build(fields("Hi ###NAME###, from ###BRAND###"), &user())
            .unwrap();

        let mail = outcome.mail.unwrap();
        assert_eq!(mail.body, "Hi Ann, from Mailforge");
        assert!(mail.error_code.is_none());
        assert!(mail.error_detail.is_none());
        assert_eq!(store.count(), 1);
    }

    #[test]
    fn test_build_missing_field_persists_nothing() {
        let (builder, store) = builder();
        let outcome = builder
            .build(MailFields::new().body("Hi").sender("a@example.com").subject("s"), &user())
            .unwrap();

        assert!(outcome.mail.is_none());
        assert!(outcome.unresolved_tokens.is_empty());
        assert!(outcome.unresolved_values.is_empty());
        assert_eq!(store.count(), 0);
    }

    #[test]
    fn test_build_unresolved_key() {
        let (builder, _) = builder();
        let outcome = builder.build(fields("Hi ###NOPE###"), &user()).unwrap();

        let mail = outcome.mail.unwrap();
        assert_eq!(mail.error_code, Some(MailErrorCode::UnresolvedKeyError));
        assert_eq!(mail.error_detail.as_deref(), Some("NOPE"));
        assert_eq!(mail.body, "Hi ###NOPE###");
    }

    #[test]
    fn test_build_population_error() {
        let (builder, _) = builder();
        let outcome = builder
            .build(fields("Hi ###NAME###"), &BoundValues::new())
            .unwrap();

        let mail = outcome.mail.unwrap();
        assert_eq!(mail.error_code, Some(MailErrorCode::PopulationError));
        assert_eq!(outcome.unresolved_values, vec!["NAME"]);
    }

    #[test]
    fn test_build_both_lists_values_first() {
        let (builder, _) = builder();
        let outcome = builder
            .build(fields("###NOPE### ###NAME### ###ALSO###"), &BoundValues::new())
            .unwrap();

        let mail = outcome.mail.unwrap();
        assert_eq!(mail.error_code, Some(MailErrorCode::Both));
        assert_eq!(mail.error_detail.as_deref(), Some("NAME,NOPE,ALSO"));
    }

    #[test]
    fn test_format_error_aborts_build() {
        let (builder, store) = builder();
        builder
            .populator
            .registry()
            .create(CreateEntityRequest::new("DUE", "due").kind(EntityKind::Date))
            .unwrap();

        let values = BoundValues::new().with("due", "tomorrow");
        let result = builder.build(fields("Pay by ###DUE###"), &values);

        assert!(matches!(result, Err(BuildError::Format(_))));
        assert_eq!(store.count(), 0);
    }

    #[test]
    fn test_blank_required_field_is_missing() {
        let (builder, store) = builder();
        let outcome = builder.build(fields("Hi").subject("   "), &user()).unwrap();

        assert!(outcome.mail.is_none());
        assert_eq!(store.count(), 0);
    }

    #[test]
    fn test_output_mode_follows_body() {
        let (builder, _) = builder();

        let plain = builder.build(fields("Logo: ###LOGO###"), &user()).unwrap();
        assert_eq!(plain.mail.unwrap().body, "Logo: https://ex.io/logo.png");

        let rich = builder
            .build(fields("<p>###LOGO###</p>"), &user())
            .unwrap();
        assert_eq!(
            rich.mail.unwrap().body,
            "<p><img src='https://ex.io/logo.png' alt='https://ex.io/logo.png'></p>"
        );

        let forced = builder
            .build(fields("<p>###LOGO###</p>").output_mode(OutputMode::Plain), &user())
            .unwrap();
        assert_eq!(forced.mail.unwrap().body, "<p>https://ex.io/logo.png</p>");
    }

    #[test]
    fn test_deliver_at_is_zone_adjusted() {
        let registry = Arc::new(EntityRegistry::new());
        let populator = Arc::new(BodyPopulator::new(registry, ValueFormatter::default()));
        let builder = MailBuilder::new(
            populator,
            Arc::new(MailStore::new()),
            Arc::new(HtmlStripper::new()),
            chrono_tz::America::Santiago,
        );

        let naive = NaiveDate::from_ymd_opt(2024, 1, 15)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap();
        let outcome = builder
            .build(fields("Hi").deliver_at(naive), &BoundValues::new())
            .unwrap();

        let deliver_at = outcome.mail.unwrap().deliver_at.unwrap();
        assert_eq!(deliver_at.naive_local(), naive);
        assert_eq!(deliver_at.offset().local_minus_utc(), -3 * 3600);
    }
}
