//! Markup classification and plain-text extraction.
//!
//! The dispatcher feeds every stored body through a [`MarkupClassifier`] to
//! decide between a single plain part and a plain+HTML alternative.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref COMMENT: Regex = Regex::new(r"(?s)<!--.*?-->").unwrap();
    static ref HIDDEN_BLOCK: Regex =
        Regex::new(r"(?is)<(script|style|head)\b[^>]*>.*?</(script|style|head)\s*>").unwrap();
    static ref LINE_BREAK: Regex =
        Regex::new(r"(?i)<br\s*/?>|</(p|div|li|tr|h[1-6]|table|ul|ol)\s*>").unwrap();
    static ref TAG: Regex = Regex::new(r"</?[a-zA-Z][a-zA-Z0-9-]*(\s[^<>]*)?/?>").unwrap();
    static ref BLANK_LINES: Regex = Regex::new(r"\n[ \t]*(\n[ \t]*)+").unwrap();
}

/// Outcome of feeding a body to a classifier
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Markup {
    /// Body with markup removed
    pub plain_text: String,
    /// Whether the body contained any markup at all
    pub is_markup: bool,
}

/// Splits a body into its plain text and a markup verdict.
pub trait MarkupClassifier: Send + Sync {
    fn feed(&self, html: &str) -> Markup;
}

/// Regex-based HTML stripper
#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlStripper;

impl HtmlStripper {
    pub fn new() -> Self {
        Self
    }
}

impl MarkupClassifier for HtmlStripper {
    fn feed(&self, html: &str) -> Markup {
        let is_markup = TAG.is_match(html) || COMMENT.is_match(html);
        if !is_markup {
            return Markup {
                plain_text: html.to_string(),
                is_markup,
            };
        }

        let text = COMMENT.replace_all(html, "");
        let text = HIDDEN_BLOCK.replace_all(&text, "");
        let text = LINE_BREAK.replace_all(&text, "\n");
        let text = TAG.replace_all(&text, "");
        let text = decode_entities(&text);
        let text = BLANK_LINES.replace_all(&text, "\n\n");

        Markup {
            plain_text: text.trim().to_string(),
            is_markup,
        }
    }
}

fn decode_entities(text: &str) -> String {
    text.replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&apos;", "'")
        // last, so "&amp;lt;" decodes to "&lt;" and not "<"
        .replace("&amp;", "&")
}
