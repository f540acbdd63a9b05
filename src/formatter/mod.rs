//! Rendering of resolved values according to the entity kind.
//!
//! Each [`EntityKind`] has one rendering rule. Image and link values become
//! markup only in [`OutputMode::Rich`]; temporal kinds use the format strings
//! of the deployment's [`RenderConfig`].

use std::fmt::{Display, Write};

use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, FixedOffset};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::entity::{EntityKind, ReplacementEntity};
use crate::value::Value;

/// Rendering context of a body
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputMode {
    /// Markup-capable (HTML)
    #[default]
    Rich,
    /// Plain text
    Plain,
}

/// Formatting failures; these are caller errors and are never swallowed.
#[derive(Debug, Error)]
pub enum FormatError {
    #[error("Invalid {field} format string: '{format}'")]
    InvalidFormat { field: &'static str, format: String },

    #[error("Token {token}: {kind:?} entity cannot format a {found} value")]
    NotTemporal {
        token: String,
        kind: EntityKind,
        found: &'static str,
    },

    #[error("Token {token}: format '{format}' does not apply to a {found} value")]
    Unsupported {
        token: String,
        format: String,
        found: &'static str,
    },
}

/// Format strings and timezone used for temporal kinds
#[derive(Debug, Clone)]
pub struct RenderConfig {
    date_format: String,
    time_format: String,
    datetime_format: String,
    timezone: Tz,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            date_format: "%d/%m/%Y".to_string(),
            time_format: "%H:%M".to_string(),
            datetime_format: "%d/%m/%Y %H:%M".to_string(),
            timezone: Tz::UTC,
        }
    }
}

impl RenderConfig {
    /// Build a config, rejecting format strings chrono cannot parse
    pub fn new(
        date_format: &str,
        time_format: &str,
        datetime_format: &str,
        timezone: Tz,
    ) -> Result<Self, FormatError> {
        check_format("date", date_format)?;
        check_format("time", time_format)?;
        check_format("datetime", datetime_format)?;

        Ok(Self {
            date_format: date_format.to_string(),
            time_format: time_format.to_string(),
            datetime_format: datetime_format.to_string(),
            timezone,
        })
    }

    pub fn timezone(&self) -> Tz {
        self.timezone
    }
}

fn check_format(field: &'static str, format: &str) -> Result<(), FormatError> {
    if format.is_empty() || StrftimeItems::new(format).any(|item| matches!(item, Item::Error)) {
        return Err(FormatError::InvalidFormat {
            field,
            format: format.to_string(),
        });
    }
    Ok(())
}

/// Renders resolved values for substitution
#[derive(Debug, Clone, Default)]
pub struct ValueFormatter {
    config: RenderConfig,
}

impl ValueFormatter {
    pub fn new(config: RenderConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    /// Render `value` for `entity`.
    ///
    /// `Ok(None)` means the value exists but has no textual form.
    pub fn render(
        &self,
        entity: &ReplacementEntity,
        value: &Value,
        mode: OutputMode,
    ) -> Result<Option<String>, FormatError> {
        match entity.kind {
            EntityKind::Direct => Ok(value.as_text()),
            EntityKind::Image => Ok(value.as_text().map(|v| match mode {
                OutputMode::Rich => format!("<img src='{v}' alt='{v}'>"),
                OutputMode::Plain => v,
            })),
            EntityKind::Link => Ok(value.as_text().map(|v| match mode {
                OutputMode::Rich => format!("<a href='{v}' target='_blank'>{v}</a>"),
                OutputMode::Plain => v,
            })),
            EntityKind::Date => self.render_date(entity, value).map(Some),
            EntityKind::Time => self.render_time(entity, value).map(Some),
            EntityKind::Datetime => self.render_datetime(entity, value).map(Some),
        }
    }

    fn render_date(&self, entity: &ReplacementEntity, value: &Value) -> Result<String, FormatError> {
        let format = &self.config.date_format;
        match value {
            Value::Date(date) => write_formatted(entity, format, value, date.format(format)),
            Value::DateTime(dt) => {
                write_formatted(entity, format, value, self.localize(dt).format(format))
            }
            other => Err(not_temporal(entity, other)),
        }
    }

    fn render_time(&self, entity: &ReplacementEntity, value: &Value) -> Result<String, FormatError> {
        let format = &self.config.time_format;
        match value {
            Value::Time(time) => write_formatted(entity, format, value, time.format(format)),
            Value::DateTime(dt) => {
                write_formatted(entity, format, value, self.localize(dt).format(format))
            }
            other => Err(not_temporal(entity, other)),
        }
    }

    fn render_datetime(
        &self,
        entity: &ReplacementEntity,
        value: &Value,
    ) -> Result<String, FormatError> {
        let format = &self.config.datetime_format;
        match value {
            Value::DateTime(dt) => {
                write_formatted(entity, format, value, self.localize(dt).format(format))
            }
            Value::Date(date) => {
                let midnight = date.and_time(chrono::NaiveTime::MIN);
                write_formatted(entity, format, value, midnight.format(format))
            }
            other => Err(not_temporal(entity, other)),
        }
    }

    fn localize(&self, dt: &DateTime<FixedOffset>) -> DateTime<Tz> {
        dt.with_timezone(&self.config.timezone)
    }
}

fn not_temporal(entity: &ReplacementEntity, value: &Value) -> FormatError {
    FormatError::NotTemporal {
        token: entity.token.clone(),
        kind: entity.kind,
        found: value.type_name(),
    }
}

// chrono reports fields the value lacks (e.g. %H on a date) as fmt::Error
fn write_formatted(
    entity: &ReplacementEntity,
    format: &str,
    value: &Value,
    formatted: impl Display,
) -> Result<String, FormatError> {
    let mut out = String::new();
    write!(out, "{}", formatted).map_err(|_| FormatError::Unsupported {
        token: entity.token.clone(),
        format: format.to_string(),
        found: value.type_name(),
    })?;
    Ok(out)
}
