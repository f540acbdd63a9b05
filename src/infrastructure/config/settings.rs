use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;

use chrono_tz::Tz;

use crate::formatter::RenderConfig;
use crate::mail::DispatchConfig;

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub mail: MailSettings,
    #[serde(default)]
    pub smtp: SmtpConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

/// Composition and dispatch settings shared by the populator, formatter and dispatcher.
#[derive(Debug, Clone, Deserialize)]
pub struct MailSettings {
    /// Delimiter wrapping tokens inside a body (`###NAME###`)
    #[serde(default = "default_escape_token")]
    pub escape_token: String,
    /// strftime pattern for Date entities
    #[serde(default = "default_date_format")]
    pub date_format: String,
    /// strftime pattern for Time entities
    #[serde(default = "default_time_format")]
    pub time_format: String,
    /// strftime pattern for Datetime entities
    #[serde(default = "default_datetime_format")]
    pub datetime_format: String,
    /// IANA timezone name of the deployment
    #[serde(default = "default_timezone")]
    pub timezone: String,
    /// Public base URL, used to build tracking pixel links
    #[serde(default = "default_site_url")]
    pub site_url: String,
    /// Optional Reply-To header for every dispatched mail
    #[serde(default)]
    pub reply_to: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SmtpConfig {
    #[serde(default = "default_smtp_host")]
    pub host: String,
    #[serde(default = "default_smtp_port")]
    pub port: u16,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub use_tls: bool,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_escape_token() -> String {
    "###".to_string()
}

fn default_date_format() -> String {
    "%d/%m/%Y".to_string()
}

fn default_time_format() -> String {
    "%H:%M".to_string()
}

fn default_datetime_format() -> String {
    "%d/%m/%Y %H:%M".to_string()
}

fn default_timezone() -> String {
    "UTC".to_string()
}

fn default_site_url() -> String {
    "http://localhost:8080".to_string()
}

fn default_smtp_host() -> String {
    "localhost".to_string()
}

fn default_smtp_port() -> u16 {
    25
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        // Load .env file if exists
        let _ = dotenvy::dotenv();

        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let builder = Config::builder()
            .set_default("server.host", default_host())?
            .set_default("server.port", 8080)?
            .set_default("mail.escape_token", default_escape_token())?
            .set_default("mail.timezone", default_timezone())?
            .set_default("smtp.host", default_smtp_host())?
            .set_default("smtp.port", 25)?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            // MAILFORGE__MAIL__ESCAPE_TOKEN, MAILFORGE__SMTP__HOST, etc.
            .add_source(
                Environment::with_prefix("MAILFORGE")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            );

        let settings: Settings = builder.build()?.try_deserialize()?;
        settings.mail.validate()?;
        Ok(settings)
    }

    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

impl MailSettings {
    /// Check every value that can only be verified after parsing.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.escape_token.is_empty() {
            return Err(ConfigError::Message(
                "mail.escape_token must not be empty".to_string(),
            ));
        }
        self.render_config()?;
        Ok(())
    }

    pub fn timezone(&self) -> Result<Tz, ConfigError> {
        self.timezone.parse::<Tz>().map_err(|e| {
            ConfigError::Message(format!("mail.timezone '{}': {}", self.timezone, e))
        })
    }

    pub fn render_config(&self) -> Result<RenderConfig, ConfigError> {
        RenderConfig::new(
            &self.date_format,
            &self.time_format,
            &self.datetime_format,
            self.timezone()?,
        )
        .map_err(|e| ConfigError::Message(e.to_string()))
    }

    pub fn dispatch_config(&self) -> Result<DispatchConfig, ConfigError> {
        Ok(DispatchConfig {
            site_url: self.site_url.trim_end_matches('/').to_string(),
            reply_to: self.reply_to.clone(),
            timezone: self.timezone()?,
        })
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for MailSettings {
    fn default() -> Self {
        Self {
            escape_token: default_escape_token(),
            date_format: default_date_format(),
            time_format: default_time_format(),
            datetime_format: default_datetime_format(),
            timezone: default_timezone(),
            site_url: default_site_url(),
            reply_to: None,
        }
    }
}

impl Default for SmtpConfig {
    fn default() -> Self {
        Self {
            host: default_smtp_host(),
            port: default_smtp_port(),
            username: None,
            password: None,
            use_tls: false,
        }
    }
}
