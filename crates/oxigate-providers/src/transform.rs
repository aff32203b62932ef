//! Request transforms: the ordered, per-route mutation pipeline.
//!
//! Every provider quirk is one [`Transform`] listed in that provider's route.
//! Steps run in list order over a [`Draft`] (body + headers), and each step
//! belongs to a [`Phase`]; registered pipelines are sorted by phase, so:
//!
//! 1. `Defaults`: mandated fields, operator defaults, caller include directives
//! 2. `Dialect`: provider-specific reshaping
//! 3. `PassThrough`: unrecognized caller parameters
//! 4. `Exclusions`: operator and caller field removals, always last

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde_json::{json, Map, Value};
use tracing::{debug, warn};

use oxigate_core::config::ProviderConfig;

use crate::request::CustomDirectives;

/// Separator between demoted system text and the user's own text.
const DEMOTED_TEXT_SEPARATOR: &str = "\n\n";

// ─────────────────────────────────────────────
// Draft + context
// ─────────────────────────────────────────────

/// The mutable request under construction.
#[derive(Debug, Default)]
pub struct Draft {
    pub body: Map<String, Value>,
    pub headers: HeaderMap,
}

impl Draft {
    pub fn new(body: Map<String, Value>) -> Self {
        Self {
            body,
            headers: HeaderMap::new(),
        }
    }

    /// Insert or replace a header, skipping (with a warning) invalid pairs.
    pub fn set_header(&mut self, name: &str, value: &str) {
        insert_header(&mut self.headers, name, value);
    }
}

/// Read-only inputs a transform may consult.
#[derive(Clone, Copy, Debug)]
pub struct TransformContext<'a> {
    /// Operator overrides for the selected provider.
    pub overrides: Option<&'a ProviderConfig>,
    /// Caller fields outside the capability's known set.
    pub extras: &'a Map<String, Value>,
    /// Caller YAML directives (custom provider).
    pub custom: &'a CustomDirectives,
}

// ─────────────────────────────────────────────
// Transform
// ─────────────────────────────────────────────

/// Pipeline phase; a route's steps must be in non-decreasing phase order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum Phase {
    Defaults,
    Dialect,
    PassThrough,
    Exclusions,
}

/// One pure mutation step.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Transform {
    /// Set a body field unconditionally (provider-mandated value).
    Set { field: &'static str, value: f64 },
    /// Add fixed headers (e.g. attribution headers).
    Headers(&'static [(&'static str, &'static str)]),
    /// Add the operator's `extraHeaders` for this provider.
    ConfigHeaders,
    /// Insert the operator's `defaults` for fields the body doesn't set.
    ConfigDefaults,
    /// Merge the caller's `custom_include_body` YAML, overriding existing fields.
    CallerBody,
    /// Merge the caller's `custom_include_headers` YAML.
    CallerHeaders,
    /// Turn every system turn into user text; no system role survives.
    DemoteSystemTurns,
    /// Split the image out of the last turn into a sibling `image_url` field.
    DetachImage,
    /// Copy unrecognized caller parameters into the body verbatim.
    PassThroughExtras,
    /// Remove the operator's `excludeBody` fields.
    ConfigExclusions,
    /// Remove the fields named by the caller's `custom_exclude_body` YAML.
    CallerExclusions,
}

impl Transform {
    pub fn phase(&self) -> Phase {
        match self {
            Transform::Set { .. }
            | Transform::Headers(_)
            | Transform::ConfigHeaders
            | Transform::ConfigDefaults
            | Transform::CallerBody
            | Transform::CallerHeaders => Phase::Defaults,
            Transform::DemoteSystemTurns | Transform::DetachImage => Phase::Dialect,
            Transform::PassThroughExtras => Phase::PassThrough,
            Transform::ConfigExclusions | Transform::CallerExclusions => Phase::Exclusions,
        }
    }

    pub fn apply(&self, draft: &mut Draft, ctx: &TransformContext<'_>) {
        match *self {
            Transform::Set { field, value } => {
                draft.body.insert(field.to_string(), Value::from(value));
            }
            Transform::Headers(pairs) => {
                for (name, value) in pairs {
                    draft.set_header(name, value);
                }
            }
            Transform::ConfigHeaders => {
                if let Some(headers) = ctx.overrides.and_then(|o| o.extra_headers.as_ref()) {
                    let mut pairs: Vec<_> = headers.iter().collect();
                    pairs.sort();
                    for (name, value) in pairs {
                        draft.set_header(name, value);
                    }
                }
            }
            Transform::ConfigDefaults => {
                if let Some(overrides) = ctx.overrides {
                    for (field, value) in &overrides.defaults {
                        if !draft.body.contains_key(field) {
                            draft.body.insert(field.clone(), value.clone());
                        }
                    }
                }
            }
            Transform::CallerBody => {
                for object in yaml_objects(ctx.custom.include_body.as_deref()) {
                    draft.body.extend(object);
                }
            }
            Transform::CallerHeaders => {
                for object in yaml_objects(ctx.custom.include_headers.as_deref()) {
                    for (name, value) in object {
                        draft.set_header(&name, &header_text(&value));
                    }
                }
            }
            Transform::DemoteSystemTurns => demote_system_turns(&mut draft.body),
            Transform::DetachImage => detach_image(&mut draft.body),
            Transform::PassThroughExtras => {
                for (field, value) in ctx.extras {
                    if !draft.body.contains_key(field) {
                        draft.body.insert(field.clone(), value.clone());
                    }
                }
            }
            Transform::ConfigExclusions => {
                if let Some(overrides) = ctx.overrides {
                    for field in &overrides.exclude_body {
                        draft.body.remove(field);
                    }
                }
            }
            Transform::CallerExclusions => {
                for field in yaml_keys(ctx.custom.exclude_body.as_deref()) {
                    draft.body.remove(&field);
                }
            }
        }
    }
}

/// Run a pipeline over a draft in order.
pub fn run_pipeline(pipeline: &[Transform], draft: &mut Draft, ctx: &TransformContext<'_>) {
    for step in pipeline {
        step.apply(draft, ctx);
    }
}

/// Whether a pipeline's steps are in non-decreasing phase order.
pub fn is_phase_ordered(pipeline: &[Transform]) -> bool {
    pipeline.windows(2).all(|w| w[0].phase() <= w[1].phase())
}

// ─────────────────────────────────────────────
// Dialect steps
// ─────────────────────────────────────────────

/// Remove every system turn and fold its text ahead of the first user turn's text.
fn demote_system_turns(body: &mut Map<String, Value>) {
    let Some(Value::Array(messages)) = body.get_mut("messages") else {
        return;
    };

    let mut demoted = Vec::new();
    messages.retain(|m| {
        if m.get("role").and_then(Value::as_str) == Some("system") {
            demoted.push(content_text(m.get("content")));
            false
        } else {
            true
        }
    });
    if demoted.is_empty() {
        return;
    }
    let preamble = demoted.join(DEMOTED_TEXT_SEPARATOR);

    let first_user = messages
        .iter_mut()
        .find(|m| m.get("role").and_then(Value::as_str) == Some("user"));
    match first_user {
        Some(turn) => prepend_text(turn, &preamble),
        None => messages.insert(0, json!({ "role": "user", "content": preamble })),
    }
}

/// Flatten message content (string or text parts) to plain text.
fn content_text(content: Option<&Value>) -> String {
    match content {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Array(parts)) => parts
            .iter()
            .filter_map(|p| p.get("text").and_then(Value::as_str))
            .collect::<Vec<_>>()
            .join(DEMOTED_TEXT_SEPARATOR),
        _ => String::new(),
    }
}

fn prepend_text(turn: &mut Value, preamble: &str) {
    let Some(content) = turn.get_mut("content") else {
        turn["content"] = Value::from(preamble);
        return;
    };
    match content {
        Value::String(s) => *s = join_text(preamble, s),
        Value::Array(parts) => {
            let text_part = parts
                .iter_mut()
                .find(|p| p.get("type").and_then(Value::as_str) == Some("text"));
            match text_part {
                Some(part) => {
                    let original = part.get("text").and_then(Value::as_str).unwrap_or_default();
                    part["text"] = Value::from(join_text(preamble, original));
                }
                None => parts.insert(0, json!({ "type": "text", "text": preamble })),
            }
        }
        other => *other = Value::from(preamble),
    }
}

fn join_text(preamble: &str, original: &str) -> String {
    if original.is_empty() {
        preamble.to_string()
    } else {
        format!("{preamble}{DEMOTED_TEXT_SEPARATOR}{original}")
    }
}

/// Replace the last (multipart) turn with a text turn plus a turn carrying
/// the image as a sibling `image_url` field.
fn detach_image(body: &mut Map<String, Value>) {
    let Some(Value::Array(messages)) = body.get_mut("messages") else {
        return;
    };
    let Some(last) = messages.pop() else {
        return;
    };

    let parts = last.get("content").and_then(Value::as_array);
    let text = parts
        .and_then(|ps| ps.iter().find(|p| p.get("type").and_then(Value::as_str) == Some("text")))
        .and_then(|p| p.get("text"))
        .cloned()
        .unwrap_or(Value::Null);
    let image = parts
        .and_then(|ps| {
            ps.iter()
                .find(|p| p.get("type").and_then(Value::as_str) == Some("image_url"))
        })
        .and_then(|p| p.pointer("/image_url/url"))
        .cloned()
        .unwrap_or(Value::Null);

    messages.push(json!({ "role": "user", "content": text }));
    messages.push(json!({ "role": "user", "content": [], "image_url": image }));
}

// ─────────────────────────────────────────────
// YAML directives
// ─────────────────────────────────────────────

fn parse_yaml(source: Option<&str>) -> Option<Value> {
    let source = source.map(str::trim).filter(|s| !s.is_empty())?;
    match serde_yml::from_str::<Value>(source) {
        Ok(value) => Some(value),
        Err(e) => {
            warn!(error = %e, "ignoring unparseable YAML directive");
            None
        }
    }
}

/// Objects from a YAML directive: one object, or every object in a list.
fn yaml_objects(source: Option<&str>) -> Vec<Map<String, Value>> {
    match parse_yaml(source) {
        Some(Value::Object(map)) => vec![map],
        Some(Value::Array(items)) => items
            .into_iter()
            .filter_map(|item| match item {
                Value::Object(map) => Some(map),
                _ => None,
            })
            .collect(),
        Some(other) => {
            debug!(kind = ?other, "YAML include directive is not an object");
            Vec::new()
        }
        None => Vec::new(),
    }
}

/// Field names from a YAML exclude directive: a key, a list, or an object's keys.
fn yaml_keys(source: Option<&str>) -> Vec<String> {
    match parse_yaml(source) {
        Some(Value::String(key)) => vec![key],
        Some(Value::Array(items)) => items
            .into_iter()
            .flat_map(|item| match item {
                Value::String(key) => vec![key],
                Value::Object(map) => map.into_iter().map(|(k, _)| k).collect(),
                _ => Vec::new(),
            })
            .collect(),
        Some(Value::Object(map)) => map.into_iter().map(|(k, _)| k).collect(),
        _ => Vec::new(),
    }
}

fn header_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Insert or replace a header, skipping (with a warning) invalid pairs.
pub fn insert_header(headers: &mut HeaderMap, name: &str, value: &str) {
    if let (Ok(name), Ok(val)) = (
        HeaderName::from_bytes(name.as_bytes()),
        HeaderValue::from_str(value),
    ) {
        headers.insert(name, val);
    } else {
        warn!("Invalid header: {}", name);
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
