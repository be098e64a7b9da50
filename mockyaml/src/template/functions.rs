//! Functions shared by both template engines.
//!
//! Both the interpolation engine and the block engine expose the exact
//! same function table against a [`RenderContext`] — adding a function
//! here makes it available to both.

use chrono::{DateTime, Utc};
use rand::Rng;
use serde_json::Value as JsonValue;

use crate::runtime::RenderContext;

/// `pathParam(name)` — looks up a `{param}` path placeholder; `""` if missing.
pub fn path_param(ctx: &RenderContext, name: &str) -> String {
    ctx.path_params.get(name).cloned().unwrap_or_default()
}

/// `queryParam(name)` — looks up a query string parameter; `""` if missing.
pub fn query_param(ctx: &RenderContext, name: &str) -> String {
    ctx.query_params.get(name).cloned().unwrap_or_default()
}

/// `header(name)` — case-insensitive request header lookup; `""` if missing.
pub fn header(ctx: &RenderContext, name: &str) -> String {
    ctx.headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(name))
        .map(|(_, v)| v.clone())
        .unwrap_or_default()
}

/// `body()` — the raw request body.
pub fn body(ctx: &RenderContext) -> String {
    ctx.body.clone()
}

/// `now()` — the RFC3339 timestamp captured at request time.
pub fn now(ctx: &RenderContext) -> String {
    ctx.now.clone()
}

/// `nowFormat(layout)` — reformats `now()` using a `chrono` strftime layout.
/// Falls back to the raw timestamp if parsing fails.
pub fn now_format(ctx: &RenderContext, layout: &str) -> String {
    match DateTime::parse_from_rfc3339(&ctx.now) {
        Ok(dt) => dt.with_timezone(&Utc).format(layout).to_string(),
        Err(_) => ctx.now.clone(),
    }
}

/// `uuid()` — a fresh RFC4122 v4 UUID.
pub fn uuid() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// `randomInt(min, max)` — uniform in `[min, max]`; returns `min` if `min >= max`.
pub fn random_int(min: i64, max: i64) -> i64 {
    if min >= max {
        return min;
    }
    rand::rng().random_range(min..=max)
}

/// `seq(a, b)` — `[a..=b]` inclusive; empty if `b < a`.
pub fn seq(a: i64, b: i64) -> Vec<i64> {
    if b < a {
        Vec::new()
    } else {
        (a..=b).collect()
    }
}

/// `toJSON(v)` — JSON-encodes any serializable value.
pub fn to_json(v: &JsonValue) -> String {
    v.to_string()
}

/// `jsonPath(expr)` — evaluates a JSONPath expression against the request
/// body parsed as JSON. Returns `""` on parse or evaluation failure;
/// non-string matches are JSON-encoded.
pub fn json_path(ctx: &RenderContext, expr: &str) -> String {
    let Ok(value) = serde_json::from_str::<JsonValue>(&ctx.body) else {
        return String::new();
    };
    let Ok(found) = jsonpath_lib::select(&value, expr) else {
        return String::new();
    };
    match found.into_iter().next() {
        Some(JsonValue::String(s)) => s.clone(),
        Some(other) => other.to_string(),
        None => String::new(),
    }
}
