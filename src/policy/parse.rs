//! Pest-backed parser for policy documents.
//!
//! A document is a sequence of top-level assignments (`name = "…"`) and
//! `path "<pattern>" { … }` blocks. The parser normalizes capability and
//! policy-kind strings to their enumerations and rejects unknown keys; the
//! resulting [`ParseError`] carries the byte offset of the first fault.

use std::collections::HashMap;

use pest::Parser;
use pest::error::{InputLocation, LineColLocation};
use pest::iterators::Pair;
use pest_derive::Parser;
use serde_json::{Map, Number, Value};
use tracing::{Level, instrument};

use super::{PathRule, Policy};
use crate::capability::{Capability, PolicyKind};
use crate::error::ParseError;
use crate::permissions::Permissions;

#[derive(Parser)]
#[grammar = "policy/policy.pest"]
struct PolicyParser;

/// Parse a policy document into a [`Policy`].
#[instrument(level = Level::TRACE, skip(source), fields(len = source.len()))]
pub fn parse(source: &str) -> Result<Policy, ParseError> {
    let document = PolicyParser::parse(Rule::document, source)
        .map_err(from_pest_error)?
        .next()
        .expect("document rule produces exactly one pair");

    let mut policy = Policy::default();
    for entry in document.into_inner() {
        match entry.as_rule() {
            Rule::path_block => policy.rules.push(parse_path_block(entry)?),
            Rule::attribute => {
                let (key, key_span, value) = split_attribute(entry);
                match key.as_str() {
                    "name" => policy.name = expect_string(value)?,
                    other => {
                        return Err(error_at(key_span, format!("unknown key '{other}'")));
                    }
                }
            }
            Rule::EOI => {}
            other => unreachable!("unexpected rule {other:?} in document"),
        }
    }
    Ok(policy)
}

/// Parse one `path "<pattern>" { … }` block into a [`PathRule`].
fn parse_path_block(pair: Pair<'_, Rule>) -> Result<PathRule, ParseError> {
    let mut inner = pair.into_inner();
    let pattern_pair = inner.next().expect("path block has a pattern");
    let body = inner.next().expect("path block has a body");

    let raw_pattern = unquote(pattern_pair.as_str());
    let (pattern, is_prefix) = match raw_pattern.strip_suffix('*') {
        Some(stripped) => (stripped.to_string(), true),
        None => (raw_pattern, false),
    };

    let mut rule = PathRule {
        pattern,
        is_prefix,
        policy: None,
        capabilities: Vec::new(),
        permissions: Permissions::default(),
    };

    for attr in body.into_inner() {
        let (key, key_span, value) = split_attribute(attr);
        match key.as_str() {
            "policy" => {
                let span = value.as_span();
                let name = expect_string(value)?;
                rule.policy = Some(
                    PolicyKind::from_name(&name)
                        .ok_or_else(|| error_at(span, format!("unknown policy kind '{name}'")))?,
                );
            }
            "capabilities" => rule.capabilities = parse_capability_list(value)?,
            "permissions" => rule.permissions = parse_permissions(value)?,
            other => {
                return Err(error_at(
                    key_span,
                    format!("unknown key '{other}' in path block"),
                ));
            }
        }
    }
    Ok(rule)
}

fn parse_capability_list(pair: Pair<'_, Rule>) -> Result<Vec<Capability>, ParseError> {
    if pair.as_rule() != Rule::list {
        return Err(error_at(pair.as_span(), "capabilities must be a list"));
    }
    let mut capabilities = Vec::new();
    for element in pair.into_inner() {
        let span = element.as_span();
        let name = expect_string(element)?;
        capabilities.push(
            Capability::from_name(&name)
                .ok_or_else(|| error_at(span, format!("unknown capability '{name}'")))?,
        );
    }
    Ok(capabilities)
}

fn parse_permissions(pair: Pair<'_, Rule>) -> Result<Permissions, ParseError> {
    if pair.as_rule() != Rule::map {
        return Err(error_at(pair.as_span(), "permissions must be a map"));
    }
    let mut permissions = Permissions::default();
    for attr in pair.into_inner() {
        let (key, key_span, value) = split_attribute(attr);
        match key.as_str() {
            "allowed_parameters" => {
                permissions.allowed_parameters = parse_parameter_map(value)?;
            }
            "denied_parameters" => {
                permissions.denied_parameters = parse_parameter_map(value)?;
            }
            other => {
                return Err(error_at(
                    key_span,
                    format!("unknown key '{other}' in permissions"),
                ));
            }
        }
    }
    Ok(permissions)
}

/// Parse `{ "<name>" = [ … ] … }` into a parameter map. Names are stored
/// lowercase; lookups against them are case-insensitive.
fn parse_parameter_map(
    pair: Pair<'_, Rule>,
) -> Result<HashMap<String, Vec<Value>>, ParseError> {
    if pair.as_rule() != Rule::map {
        return Err(error_at(pair.as_span(), "parameter constraints must be a map"));
    }
    let mut parameters = HashMap::new();
    for attr in pair.into_inner() {
        let (name, name_span, value) = split_attribute(attr);
        if name.is_empty() {
            return Err(error_at(name_span, "parameter name must not be empty"));
        }
        if value.as_rule() != Rule::list {
            return Err(error_at(
                value.as_span(),
                format!("parameter '{name}' values must be a list"),
            ));
        }
        let values = value
            .into_inner()
            .map(parse_value)
            .collect::<Result<Vec<_>, _>>()?;
        parameters.entry(name.to_lowercase()).or_insert(values);
    }
    Ok(parameters)
}

/// Convert a literal value pair into a [`serde_json::Value`].
fn parse_value(pair: Pair<'_, Rule>) -> Result<Value, ParseError> {
    let span = pair.as_span();
    match pair.as_rule() {
        Rule::string => Ok(Value::String(unquote(pair.as_str()))),
        Rule::boolean => Ok(Value::Bool(pair.as_str() == "true")),
        Rule::integer => {
            let n: i64 = pair
                .as_str()
                .parse()
                .map_err(|_| error_at(span, "integer literal out of range"))?;
            Ok(Value::Number(Number::from(n)))
        }
        Rule::float => {
            let f: f64 = pair
                .as_str()
                .parse()
                .map_err(|_| error_at(span, "malformed float literal"))?;
            Number::from_f64(f)
                .map(Value::Number)
                .ok_or_else(|| error_at(span, "float literal out of range"))
        }
        Rule::list => Ok(Value::Array(
            pair.into_inner()
                .map(parse_value)
                .collect::<Result<Vec<_>, _>>()?,
        )),
        Rule::map => {
            let mut object = Map::new();
            for attr in pair.into_inner() {
                let mut inner = attr.into_inner();
                let key_pair = inner.next().expect("attribute has a key");
                let value_pair = inner.next().expect("attribute has a value");
                object.insert(key_text(&key_pair), parse_value(value_pair)?);
            }
            Ok(Value::Object(object))
        }
        other => unreachable!("unexpected value rule {other:?}"),
    }
}

/// Destructure an attribute pair into (key text, key span, value pair).
fn split_attribute(pair: Pair<'_, Rule>) -> (String, pest::Span<'_>, Pair<'_, Rule>) {
    let mut inner = pair.into_inner();
    let key_pair = inner.next().expect("attribute has a key");
    let value_pair = inner.next().expect("attribute has a value");
    let span = key_pair.as_span();
    (key_text(&key_pair), span, value_pair)
}

fn key_text(pair: &Pair<'_, Rule>) -> String {
    match pair.as_rule() {
        Rule::string => unquote(pair.as_str()),
        _ => pair.as_str().to_string(),
    }
}

fn expect_string(pair: Pair<'_, Rule>) -> Result<String, ParseError> {
    if pair.as_rule() != Rule::string {
        return Err(error_at(pair.as_span(), "expected a quoted string"));
    }
    Ok(unquote(pair.as_str()))
}

/// Strip the surrounding quotes from a string token and process escapes.
fn unquote(raw: &str) -> String {
    let inner = &raw[1..raw.len() - 1];
    if !inner.contains('\\') {
        return inner.to_string();
    }
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            out.push(ch);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some(other) => out.push(other),
            None => {}
        }
    }
    out
}

fn error_at(span: pest::Span<'_>, message: impl Into<String>) -> ParseError {
    let (line, col) = span.start_pos().line_col();
    ParseError {
        message: message.into(),
        offset: span.start(),
        line,
        col,
    }
}

fn from_pest_error(err: pest::error::Error<Rule>) -> ParseError {
    let offset = match err.location {
        InputLocation::Pos(pos) => pos,
        InputLocation::Span((start, _)) => start,
    };
    let (line, col) = match err.line_col {
        LineColLocation::Pos(pos) => pos,
        LineColLocation::Span(start, _) => start,
    };
    ParseError {
        message: err.variant.message().into_owned(),
        offset,
        line,
        col,
    }
}
