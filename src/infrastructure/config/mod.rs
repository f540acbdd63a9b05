mod settings;

pub use settings::{MailSettings, ServerConfig, Settings, SmtpConfig};
