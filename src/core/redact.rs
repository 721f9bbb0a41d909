//! Pattern-based scrubbing of sensitive values
//!
//! A [`Redactor`] holds an ordered list of [`RedactionRule`]s. Each rule has a
//! text matcher, an optional field-key matcher and a replacement policy. The
//! default rule set filters email-shaped and password/secret/token-shaped
//! `key=value` / `key: value` pairs, case-insensitively, keeping the quotes and
//! delimiters around the value:
//!
//! ```
//! use rust_deferred_logger::Redactor;
//!
//! let redactor = Redactor::default();
//! assert_eq!(redactor.redact(r#"{"password":"hunter2"}"#), r#"{"password":"[FILTERED]"}"#);
//! assert_eq!(redactor.redact("email: bob@example.com"), "email: [FILTERED]");
//! ```

use super::error::Result;
use super::field::{FieldValue, Fields};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use std::borrow::Cow;

/// Marker substituted for every filtered value
pub const FILTERED: &str = "[FILTERED]";

static EMAIL_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"(?i)("|')?(email|e-mail)("|')?(\s*[:=]\s*)("|')?([0-9A-Za-z\-\.]+@[0-9A-Za-z\-\.]+)("|')?"#,
    )
    .expect("email pattern is valid")
});

static EMAIL_KEY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(^|[_.-])e-?mail$").expect("email key pattern is valid"));

static PASSWORD_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)("|')?(password|secret|token|tw-?auth)("|')?(\s*[:=]\s*)("|')?([\w-]+)("|')?"#)
        .expect("password pattern is valid")
});

static PASSWORD_KEY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(^|[_.-])(password|secret|token|tw-?auth)$")
        .expect("password key pattern is valid")
});

/// How a matched span is rewritten
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Replacement {
    /// Replace only the given capture group, keeping the surrounding text
    PreserveDelimiters { secret_group: usize },
    /// Replace the whole match with [`FILTERED`]
    Whole,
    /// Expand a regex replacement template such as `${1}[FILTERED]`
    Template(String),
}

#[derive(Debug, Clone)]
pub struct RedactionRule {
    name: String,
    pattern: Regex,
    key: Option<Regex>,
    replacement: Replacement,
}

impl RedactionRule {
    /// Build a rule that replaces whole matches of `pattern`
    pub fn new(name: impl Into<String>, pattern: &str) -> Result<Self> {
        Ok(Self {
            name: name.into(),
            pattern: Regex::new(pattern)?,
            key: None,
            replacement: Replacement::Whole,
        })
    }

    /// Also filter any scalar field whose key matches `pattern`
    pub fn with_key(mut self, pattern: &str) -> Result<Self> {
        self.key = Some(Regex::new(pattern)?);
        Ok(self)
    }

    #[must_use]
    pub fn with_replacement(mut self, replacement: Replacement) -> Self {
        self.replacement = replacement;
        self
    }

    /// Email addresses following an `email`/`e-mail` key
    pub fn email() -> Self {
        Self {
            name: "email".to_string(),
            pattern: EMAIL_PATTERN.clone(),
            key: Some(EMAIL_KEY.clone()),
            replacement: Replacement::PreserveDelimiters { secret_group: 6 },
        }
    }

    /// Values following a `password`/`secret`/`token`/`tw-auth` key
    pub fn password() -> Self {
        Self {
            name: "password".to_string(),
            pattern: PASSWORD_PATTERN.clone(),
            key: Some(PASSWORD_KEY.clone()),
            replacement: Replacement::PreserveDelimiters { secret_group: 6 },
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn matches_key(&self, key: &str) -> bool {
        self.key.as_ref().is_some_and(|k| k.is_match(key))
    }

    fn apply<'a>(&self, input: &'a str) -> Cow<'a, str> {
        match &self.replacement {
            Replacement::Whole => self.pattern.replace_all(input, FILTERED),
            Replacement::Template(template) => self.pattern.replace_all(input, template.as_str()),
            Replacement::PreserveDelimiters { secret_group } => {
                let group = *secret_group;
                self.pattern.replace_all(input, |caps: &Captures<'_>| {
                    match (caps.get(0), caps.get(group)) {
                        (Some(whole), Some(secret)) => {
                            let text = whole.as_str();
                            let start = secret.start() - whole.start();
                            let end = secret.end() - whole.start();
                            format!("{}{}{}", &text[..start], FILTERED, &text[end..])
                        }
                        (Some(whole), None) => whole.as_str().to_string(),
                        (None, _) => String::new(),
                    }
                })
            }
        }
    }
}

/// Ordered set of redaction rules
#[derive(Debug, Clone)]
pub struct Redactor {
    rules: Vec<RedactionRule>,
}

impl Redactor {
    /// A redactor with no rules; every input passes through unchanged
    pub fn empty() -> Self {
        Self { rules: Vec::new() }
    }

    #[must_use]
    pub fn with_rule(mut self, rule: RedactionRule) -> Self {
        self.rules.push(rule);
        self
    }

    pub fn rules(&self) -> &[RedactionRule] {
        &self.rules
    }

    /// Scrub every rule's matches from `input`, in rule order
    pub fn redact<'a>(&self, input: &'a str) -> Cow<'a, str> {
        let mut current = Cow::Borrowed(input);
        for rule in &self.rules {
            if let Cow::Owned(replaced) = rule.apply(&current) {
                current = Cow::Owned(replaced);
            }
        }
        current
    }

    /// Scrub serialized output; invalid UTF-8 is replaced lossily
    pub fn redact_bytes(&self, input: &[u8]) -> Vec<u8> {
        let text = String::from_utf8_lossy(input);
        self.redact(&text).into_owned().into_bytes()
    }

    /// Filter a cookie header or cookie string
    pub fn filter_cookie(&self, cookies: &str) -> String {
        self.redact(cookies).into_owned()
    }

    fn key_is_sensitive(&self, key: &str) -> bool {
        self.rules.iter().any(|r| r.matches_key(key))
    }

    /// Scrub string leaves of a value, recursing into lists, maps and requests
    pub fn redact_value(&self, value: &mut FieldValue) {
        match value {
            FieldValue::String(s) => {
                if let Cow::Owned(replaced) = self.redact(s) {
                    *s = replaced;
                }
            }
            FieldValue::List(items) => items.iter_mut().for_each(|v| self.redact_value(v)),
            FieldValue::Map(map) => {
                for (key, v) in map.iter_mut() {
                    self.redact_entry(key, v);
                }
            }
            FieldValue::Request(req) => req.redact(self),
            _ => {}
        }
    }

    fn redact_entry(&self, key: &str, value: &mut FieldValue) {
        if value.is_scalar() && self.key_is_sensitive(key) {
            *value = FieldValue::String(FILTERED.to_string());
        } else {
            self.redact_value(value);
        }
    }

    /// Scrub a field map; scalars under a sensitive key are replaced wholesale
    pub fn redact_fields(&self, fields: &mut Fields) {
        for (key, value) in fields.iter_mut() {
            self.redact_entry(key, value);
        }
    }
}

impl Default for Redactor {
    fn default() -> Self {
        Self {
            rules: vec![RedactionRule::email(), RedactionRule::password()],
        }
    }
}
