//! Token discovery and body population.
//!
//! A token is the configured escape delimiter wrapped around a run of word
//! characters, dots, plus signs or hyphens: `###NAME###`. Every distinct
//! token is resolved once through the [`EntityRegistry`]; all of its
//! occurrences are then replaced with the rendered value.
//!
//! Tokens that cannot be filled are left in the body untouched and reported
//! in one of two lists:
//! - `unresolved_tokens`: no entity is registered for the token
//! - `unresolved_values`: an entity exists but no renderable value was found

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use regex::{Captures, Regex};

use crate::entity::{EntityFilter, EntityRegistry, ReplacementEntity};
use crate::formatter::{FormatError, OutputMode, ValueFormatter};
use crate::value::{BoundValues, Value};

/// Result of populating a body
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Population {
    /// Body with every resolvable token replaced
    pub body: String,
    /// Tokens with no registered entity
    pub unresolved_tokens: Vec<String>,
    /// Tokens whose entity found no value to render
    pub unresolved_values: Vec<String>,
}

impl Population {
    /// True when no token was left behind
    pub fn is_complete(&self) -> bool {
        self.unresolved_tokens.is_empty() && self.unresolved_values.is_empty()
    }
}

/// Scans bodies for tokens and substitutes resolved values
pub struct BodyPopulator {
    registry: Arc<EntityRegistry>,
    formatter: ValueFormatter,
    pattern: Regex,
}

impl BodyPopulator {
    pub fn new(registry: Arc<EntityRegistry>, formatter: ValueFormatter) -> Self {
        let escape = regex::escape(registry.escape_token());
        // Both delimiters are escaped literals, the pattern always compiles
        let pattern = Regex::new(&format!(r"{escape}([\w.+-]+){escape}"))
            .expect("escaped token pattern is a valid regex");

        Self {
            registry,
            formatter,
            pattern,
        }
    }

    pub fn registry(&self) -> &Arc<EntityRegistry> {
        &self.registry
    }

    /// Distinct delimited tokens in order of first appearance
    pub fn tokens<'a>(&self, body: &'a str) -> Vec<(&'a str, &'a str)> {
        let mut seen = HashSet::new();
        self.pattern
            .captures_iter(body)
            .filter_map(|caps| {
                let delimited = caps.get(0)?.as_str();
                let bare = caps.get(1)?.as_str();
                seen.insert(delimited).then_some((delimited, bare))
            })
            .collect()
    }

    /// Replace every resolvable token in `body`.
    ///
    /// Formatting failures (a temporal entity bound to a non-temporal
    /// value) are returned as errors rather than classified.
    pub fn populate(
        &self,
        body: &str,
        filters: &[EntityFilter],
        mode: OutputMode,
        values: &BoundValues,
    ) -> Result<Population, FormatError> {
        let mut resolved: HashMap<&str, String> = HashMap::new();
        let mut unresolved_tokens = Vec::new();
        let mut unresolved_values = Vec::new();

        for (delimited, bare) in self.tokens(body) {
            let Some(entity) = self.registry.resolve_by_token(bare, filters) else {
                tracing::debug!(token = %bare, "No entity registered for token");
                unresolved_tokens.push(bare.to_string());
                continue;
            };

            let rendered = match raw_value(&entity, values) {
                Some(value) => self.formatter.render(&entity, &value, mode)?,
                None => None,
            };

            match rendered {
                Some(text) => {
                    resolved.insert(delimited, text);
                }
                None => {
                    tracing::debug!(
                        token = %bare,
                        source = %entity.source_name,
                        member = ?entity.member_name,
                        "No value found for token"
                    );
                    unresolved_values.push(bare.to_string());
                }
            }
        }

        // Single pass: substituted text is never scanned for tokens again
        let populated = self
            .pattern
            .replace_all(body, |caps: &Captures| match resolved.get(&caps[0]) {
                Some(text) => text.clone(),
                None => caps[0].to_string(),
            })
            .into_owned();

        Ok(Population {
            body: populated,
            unresolved_tokens,
            unresolved_values,
        })
    }
}

/// Value an entity resolves to, before rendering
fn raw_value(entity: &ReplacementEntity, values: &BoundValues) -> Option<Value> {
    match &entity.member_name {
        None => values.get(&entity.source_name).cloned().or_else(|| {
            entity
                .kind
                .accepts_literal()
                .then(|| Value::Text(entity.source_name.clone()))
        }),
        Some(member) => values
            .get(&entity.source_name)
            .and_then(|bound| bound.attribute(member)),
    }
}
