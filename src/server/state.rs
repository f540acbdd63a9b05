use std::sync::Arc;
use std::time::Instant;

use crate::config::Settings;
use crate::entity::{create_entity_registry, EntityRegistry};
use crate::error::AppError;
use crate::formatter::ValueFormatter;
use crate::mail::{create_mail_store, MailBuilder, MailDispatcher, MailStore, OpenTracker};
use crate::markup::{HtmlStripper, MarkupClassifier};
use crate::populator::BodyPopulator;
use crate::template::{create_template_store, TemplateStore};
use crate::transport::{MailTransport, SmtpMailTransport};

#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub registry: Arc<EntityRegistry>,
    pub templates: Arc<TemplateStore>,
    pub mails: Arc<MailStore>,
    pub builder: Arc<MailBuilder>,
    pub dispatcher: Arc<MailDispatcher>,
    pub tracker: Arc<OpenTracker>,
    pub start_time: Instant,
}

impl AppState {
    /// Wire the composition pipeline with the configured SMTP relay
    pub fn new(settings: Settings) -> Result<Self, AppError> {
        let transport: Arc<dyn MailTransport> = Arc::new(SmtpMailTransport::new(&settings.smtp)?);
        Self::with_transport(settings, transport)
    }

    /// Wire the composition pipeline around an arbitrary transport
    pub fn with_transport(
        settings: Settings,
        transport: Arc<dyn MailTransport>,
    ) -> Result<Self, AppError> {
        let render_config = settings.mail.render_config()?;
        let dispatch_config = settings.mail.dispatch_config()?;
        let timezone = render_config.timezone();

        let registry = create_entity_registry(&settings.mail.escape_token);
        let templates = create_template_store();
        let mails = create_mail_store();
        let classifier: Arc<dyn MarkupClassifier> = Arc::new(HtmlStripper::new());

        let populator = Arc::new(BodyPopulator::new(
            registry.clone(),
            ValueFormatter::new(render_config),
        ));
        let builder = Arc::new(MailBuilder::new(
            populator,
            mails.clone(),
            classifier.clone(),
            timezone,
        ));
        let dispatcher = Arc::new(MailDispatcher::new(
            mails.clone(),
            transport,
            classifier,
            dispatch_config,
        ));
        let tracker = Arc::new(OpenTracker::new(mails.clone(), timezone));

        tracing::info!(
            timezone = %timezone,
            escape_token = %settings.mail.escape_token,
            "Mail pipeline initialized"
        );

        Ok(Self {
            settings: Arc::new(settings),
            registry,
            templates,
            mails,
            builder,
            dispatcher,
            tracker,
            start_time: Instant::now(),
        })
    }
}
