//! # Dockerfile assembly
//!
//! Turns a [`DirectivePayload`] into Dockerfile text. Directives are always
//! emitted in [`Directive::ORDER`], whatever order the payload was built in,
//! and a directive keyword is never written twice when the user already typed
//! it.

use crate::config::GenerationConfig;
use crate::error::{GeneratorError, Result};
use crate::generator::command;
use log::debug;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// A Dockerfile instruction. Variant order is emission order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Directive {
    Arg,
    From,
    Label,
    User,
    Shell,
    Workdir,
    Add,
    Copy,
    Run,
    Expose,
    Env,
    Volume,
    EntryPoint,
    Onbuild,
    StopSignal,
    Healthcheck,
    Cmd,
}

impl Directive {
    pub const ORDER: [Directive; 17] = [
        Directive::Arg,
        Directive::From,
        Directive::Label,
        Directive::User,
        Directive::Shell,
        Directive::Workdir,
        Directive::Add,
        Directive::Copy,
        Directive::Run,
        Directive::Expose,
        Directive::Env,
        Directive::Volume,
        Directive::EntryPoint,
        Directive::Onbuild,
        Directive::StopSignal,
        Directive::Healthcheck,
        Directive::Cmd,
    ];

    /// Keyword written into the Dockerfile.
    ///
    /// `ENTRYPOINT` and `STOPSIGNAL` come out as `ENTRY POINT` and
    /// `STOP SIGNAL` unless `docker_keywords` is set.
    pub fn keyword(self, docker_keywords: bool) -> &'static str {
        match self {
            Directive::Arg => "ARG",
            Directive::From => "FROM",
            Directive::Label => "LABEL",
            Directive::User => "USER",
            Directive::Shell => "SHELL",
            Directive::Workdir => "WORKDIR",
            Directive::Add => "ADD",
            Directive::Copy => "COPY",
            Directive::Run => "RUN",
            Directive::Expose => "EXPOSE",
            Directive::Env => "ENV",
            Directive::Volume => "VOLUME",
            Directive::EntryPoint if docker_keywords => "ENTRYPOINT",
            Directive::EntryPoint => "ENTRY POINT",
            Directive::Onbuild => "ONBUILD",
            Directive::StopSignal if docker_keywords => "STOPSIGNAL",
            Directive::StopSignal => "STOP SIGNAL",
            Directive::Healthcheck => "HEALTHCHECK",
            Directive::Cmd => "CMD",
        }
    }

    /// Directives whose value is split into one instruction per line
    pub fn is_multiline(self) -> bool {
        matches!(
            self,
            Directive::Arg
                | Directive::Expose
                | Directive::Label
                | Directive::Add
                | Directive::Copy
                | Directive::Run
                | Directive::Env
                | Directive::Onbuild
        )
    }

    /// Look up a directive by payload key, ignoring case. Both the one-word
    /// and two-word spellings of `ENTRYPOINT`/`STOPSIGNAL` are accepted.
    pub fn from_key(key: &str) -> Option<Self> {
        let key = key.trim().to_ascii_uppercase();
        match key.as_str() {
            "ENTRY POINT" | "ENTRYPOINT" => Some(Directive::EntryPoint),
            "STOP SIGNAL" | "STOPSIGNAL" => Some(Directive::StopSignal),
            other => Directive::ORDER
                .into_iter()
                .find(|directive| directive.keyword(true) == other),
        }
    }
}

impl fmt::Display for Directive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword(false))
    }
}

/// Raw user text per directive
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirectivePayload {
    directives: BTreeMap<Directive, String>,
}

impl DirectivePayload {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, directive: Directive, value: impl Into<String>) -> &mut Self {
        self.directives.insert(directive, value.into());
        self
    }

    /// Append a line to a directive, creating it when absent
    pub fn push_line(&mut self, directive: Directive, line: &str) -> &mut Self {
        self.directives
            .entry(directive)
            .and_modify(|value| {
                value.push('\n');
                value.push_str(line);
            })
            .or_insert_with(|| line.to_string());
        self
    }

    pub fn get(&self, directive: Directive) -> Option<&str> {
        self.directives.get(&directive).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.directives.is_empty()
    }

    /// Directives to emit, in canonical order. Empty values are skipped.
    pub fn iter(&self) -> impl Iterator<Item = (Directive, &str)> {
        self.directives
            .iter()
            .filter(|(_, value)| !value.is_empty())
            .map(|(directive, value)| (*directive, value.as_str()))
    }

    /// Build a payload from a JSON object.
    ///
    /// `null`, `false`, `0` and `""` mean "absent". Other scalars are
    /// stringified; arrays and objects are rejected. Unknown keys are ignored.
    pub fn from_json(value: &Value) -> Result<Self> {
        let object = match value {
            Value::Object(object) => object,
            Value::Null => return Ok(Self::new()),
            other => {
                return Err(GeneratorError::InvalidPayload(format!(
                    "expected an object of directives, got {}",
                    other
                ))
                .into())
            }
        };

        let mut payload = Self::new();
        for (key, raw) in object {
            let Some(directive) = Directive::from_key(key) else {
                debug!("Ignoring unknown directive '{}'", key);
                continue;
            };
            let text = match raw {
                Value::Null | Value::Bool(false) => continue,
                Value::Bool(true) => "true".to_string(),
                Value::Number(n) if n.as_f64() == Some(0.0) => continue,
                Value::Number(n) => n.to_string(),
                Value::String(s) if s.is_empty() => continue,
                Value::String(s) => s.clone(),
                Value::Array(_) | Value::Object(_) => {
                    return Err(GeneratorError::InvalidPayload(format!(
                        "value of {} must be text",
                        key
                    ))
                    .into())
                }
            };
            payload.insert(directive, text);
        }
        Ok(payload)
    }
}

impl<'de> Deserialize<'de> for DirectivePayload {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        DirectivePayload::from_json(&value).map_err(serde::de::Error::custom)
    }
}

/// Generate the Dockerfile body for a payload
pub fn generate(payload: &DirectivePayload, config: &GenerationConfig) -> String {
    let mut dockerfile = String::with_capacity(config.header.len() + 64);
    dockerfile.push_str(&config.header);
    dockerfile.push('\n');

    for (directive, value) in payload.iter() {
        let keyword = directive.keyword(config.docker_keywords);
        let block = if directive.is_multiline() {
            value
                .split('\n')
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .map(|line| with_keyword(keyword, line))
                .collect::<Vec<_>>()
                .join("\n")
        } else if directive == Directive::Cmd {
            with_keyword(keyword, command::normalize(value).trim())
        } else {
            with_keyword(keyword, value.trim())
        };

        dockerfile.push_str(&block);
        dockerfile.push_str("\n\n");
    }

    dockerfile
}

/// Prefix `line` with `keyword` unless it already starts with it
fn with_keyword(keyword: &str, line: &str) -> String {
    let prefix = format!("{} ", keyword);
    let already_prefixed = line
        .get(..prefix.len())
        .is_some_and(|head| head.eq_ignore_ascii_case(&prefix));

    if already_prefixed {
        line.to_string()
    } else {
        format!("{} {}", keyword, line)
    }
}
