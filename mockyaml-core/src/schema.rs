//! Declarative scenario schema.
//!
//! These types mirror the on-disk YAML shape exactly (see the `!include`
//! directive and scenario file shape described in the project docs). They
//! are deserialized with `serde_yaml` and then compiled by `mockyaml` into
//! immutable runtime forms; nothing here is executed directly.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// A single scenario loaded from YAML: a request matcher paired with a
/// response and optional policies.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    /// Unique, non-empty identifier.
    pub id: String,

    /// Human-readable name.
    #[serde(default)]
    pub name: String,

    /// Match priority; higher wins ties in the index sort order.
    #[serde(default)]
    pub priority: i64,

    /// Request matcher.
    pub when: WhenClause,

    /// Response to render on match.
    pub response: Response,

    /// Optional rate-limit / latency / pagination policies.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub policy: Option<Policy>,

    /// File this scenario was loaded from. Not part of the YAML; filled in
    /// by the repository loader for diagnostics.
    #[serde(skip)]
    pub source_file: PathBuf,

    /// Index within a sequence-document file, or `None` for a single-document file.
    #[serde(skip)]
    pub source_index: Option<usize>,
}

/// Request matcher: method, path pattern, headers, body.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WhenClause {
    /// HTTP method, uppercased at load time. Empty means "any method".
    #[serde(default)]
    pub method: String,

    /// Path pattern with `{param}` placeholders, e.g. `/users/{id}`.
    #[serde(default)]
    pub path: String,

    /// Header matchers, keyed by header name (canonicalised at load time).
    #[serde(default)]
    pub headers: indexmap::IndexMap<String, StringMatcher>,

    /// Optional body matcher tree.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<BodyClause>,
}

/// A string-level matcher: either an exact match or a regular expression.
///
/// On the wire this is a single string: a leading `=` marks an exact
/// matcher (`=foo` matches only `"foo"`); anything else is compiled as a
/// regex. An empty string is the always-true predicate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum StringMatcher {
    /// Always matches.
    Always,
    /// Matches the string exactly.
    Exact(String),
    /// Matches via the given regex source, search semantics (not anchored).
    Pattern(String),
}

impl Default for StringMatcher {
    fn default() -> Self {
        StringMatcher::Always
    }
}

impl From<StringMatcher> for String {
    fn from(m: StringMatcher) -> Self {
        match m {
            StringMatcher::Always => String::new(),
            StringMatcher::Exact(s) => format!("={s}"),
            StringMatcher::Pattern(p) => p,
        }
    }
}

impl TryFrom<String> for StringMatcher {
    type Error = std::convert::Infallible;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Ok(if value.is_empty() {
            StringMatcher::Always
        } else if let Some(rest) = value.strip_prefix('=') {
            StringMatcher::Exact(rest.to_string())
        } else {
            StringMatcher::Pattern(value)
        })
    }
}

/// Content type for a body matcher, determining which extractor strategy applies.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BodyContentType {
    /// No structured parsing; the value predicate sees the raw body bytes.
    #[default]
    #[serde(alias = "")]
    Raw,
    /// Extractors are JSONPath expressions evaluated against the parsed body.
    Json,
    /// Extractors are XPath expressions evaluated against the parsed body.
    Xml,
}

/// A single `{extractor, matcher}` condition within a body clause.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BodyCondition {
    /// JSONPath or XPath expression (interpretation depends on the parent clause's `content_type`).
    pub extractor: String,
    /// Matcher applied to the stringified extracted value.
    pub matcher: StringMatcher,
}

/// A recursive body matcher tree.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BodyClause {
    /// How to interpret the body for extraction purposes.
    #[serde(default)]
    pub content_type: BodyContentType,

    /// Conditions that must all independently be evaluated (combined with the
    /// combinator slots below via the compiler, not implicitly ANDed here).
    #[serde(default)]
    pub conditions: Vec<BodyCondition>,

    /// All of these child clauses must match.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub all: Option<Vec<BodyClause>>,

    /// At least one of these child clauses must match.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub any: Option<Vec<BodyClause>>,

    /// This child clause must not match.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub not: Option<Box<BodyClause>>,
}

/// The response to render when a scenario matches.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Response {
    /// HTTP status code. Defaults to 200.
    #[serde(default = "default_status")]
    pub status: u16,

    /// Response headers.
    #[serde(default)]
    pub headers: indexmap::IndexMap<String, String>,

    /// Inline response body source. Mutually exclusive with `body_file`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,

    /// Path (relative to the scenario's root) to a file holding the response body.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body_file: Option<String>,

    /// Explicit content type; inferred at compile time when empty.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,

    /// Template engine to compile `body`/`body_file` with. `expr` or `jinja2`;
    /// empty means the body is emitted as static bytes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub engine: Option<String>,
}

/// The template engine applied when a scenario's own `response.engine` is
/// left empty. Selectable on the command line as `--default-engine`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
#[serde(rename_all = "snake_case")]
pub enum TemplateEngine {
    /// No templating; bodies are emitted as static bytes (default).
    #[default]
    None,
    /// The `${...}` call-expression engine.
    Expr,
    /// The `{{ }}`/`{% %}` block engine.
    Jinja2,
}

impl TemplateEngine {
    /// The engine name as matched by the compiler and template dispatch;
    /// empty string for `None`.
    pub fn as_str(self) -> &'static str {
        match self {
            TemplateEngine::None => "",
            TemplateEngine::Expr => "expr",
            TemplateEngine::Jinja2 => "jinja2",
        }
    }
}

fn default_status() -> u16 {
    200
}

/// Optional behavior policies attached to a scenario.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Policy {
    /// Token-bucket rate limiting.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rate_limit: Option<RateLimitPolicy>,

    /// Artificial response latency.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latency: Option<LatencyPolicy>,

    /// Array-to-envelope pagination.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pagination: Option<PaginationPolicy>,
}

/// Token-bucket rate limit configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitPolicy {
    /// Tokens refilled per second.
    pub rate: f64,
    /// Bucket capacity.
    pub burst: u32,
    /// Key to bucket on. Defaults to the scenario id when empty.
    #[serde(default)]
    pub key: String,
}

/// Artificial latency configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LatencyPolicy {
    /// Fixed delay in milliseconds.
    #[serde(default)]
    pub fixed_ms: u64,
    /// Additional uniform jitter in `[0, jitter_ms]`.
    #[serde(default)]
    pub jitter_ms: u64,
}

/// Pagination style.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaginationStyle {
    /// `page` + `size` query params.
    #[default]
    PageSize,
    /// `offset` + `limit` query params.
    OffsetLimit,
}

/// Array-to-envelope pagination configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaginationPolicy {
    /// Which query-param scheme to read.
    #[serde(default)]
    pub style: PaginationStyle,
    /// Query param name for the page number (`page_size` style).
    #[serde(default = "default_page_param")]
    pub page_param: String,
    /// Query param name for the page size (`page_size` style).
    #[serde(default = "default_size_param")]
    pub size_param: String,
    /// Query param name for the offset (`offset_limit` style).
    #[serde(default = "default_offset_param")]
    pub offset_param: String,
    /// Query param name for the limit (`offset_limit` style).
    #[serde(default = "default_limit_param")]
    pub limit_param: String,
    /// Default page/limit size when absent or non-numeric.
    #[serde(default = "default_default_size")]
    pub default_size: u64,
    /// Maximum allowed size; larger requests are clamped.
    #[serde(default = "default_max_size")]
    pub max_size: u64,
    /// JSONPath to the array within the rendered body. `$` means the root must be an array.
    #[serde(default = "default_data_path")]
    pub data_path: String,
    /// Envelope field names.
    #[serde(default)]
    pub envelope: EnvelopeFields,
}

fn default_page_param() -> String {
    "page".to_string()
}
fn default_size_param() -> String {
    "size".to_string()
}
fn default_offset_param() -> String {
    "offset".to_string()
}
fn default_limit_param() -> String {
    "limit".to_string()
}
fn default_default_size() -> u64 {
    10
}
fn default_max_size() -> u64 {
    100
}
fn default_data_path() -> String {
    "$".to_string()
}

/// Field names used in the pagination envelope object.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnvelopeFields {
    /// Field holding the sliced array.
    #[serde(default = "field_data")]
    pub data: String,
    /// Field holding the current page number.
    #[serde(default = "field_page")]
    pub page: String,
    /// Field holding the effective page size.
    #[serde(default = "field_size")]
    pub size: String,
    /// Field holding the total item count.
    #[serde(default = "field_total_items")]
    pub total_items: String,
    /// Field holding the total page count.
    #[serde(default = "field_total_pages")]
    pub total_pages: String,
    /// Field indicating whether a next page exists.
    #[serde(default = "field_has_next")]
    pub has_next: String,
    /// Field indicating whether a previous page exists.
    #[serde(default = "field_has_previous")]
    pub has_previous: String,
}

impl Default for EnvelopeFields {
    fn default() -> Self {
        Self {
            data: field_data(),
            page: field_page(),
            size: field_size(),
            total_items: field_total_items(),
            total_pages: field_total_pages(),
            has_next: field_has_next(),
            has_previous: field_has_previous(),
        }
    }
}

fn field_data() -> String {
    "data".to_string()
}
fn field_page() -> String {
    "page".to_string()
}
fn field_size() -> String {
    "size".to_string()
}
fn field_total_items() -> String {
    "total_items".to_string()
}
fn field_total_pages() -> String {
    "total_pages".to_string()
}
fn field_has_next() -> String {
    "has_next".to_string()
}
fn field_has_previous() -> String {
    "has_previous".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn string_matcher_exact_roundtrip() {
        let m: StringMatcher = "=foo".to_string().try_into().unwrap();
        assert_eq!(m, StringMatcher::Exact("foo".to_string()));
        let back: String = m.into();
        assert_eq!(back, "=foo");
    }

    #[test]
    fn string_matcher_empty_is_always() {
        let m: StringMatcher = String::new().try_into().unwrap();
        assert_eq!(m, StringMatcher::Always);
    }

    #[test]
    fn string_matcher_plain_is_pattern() {
        let m: StringMatcher = "^foo.*".to_string().try_into().unwrap();
        assert_eq!(m, StringMatcher::Pattern("^foo.*".to_string()));
    }

    #[test]
    fn scenario_deserializes_minimal() {
        let yaml = r#"
id: a
when:
  method: GET
  path: /x
response:
  body: "hello"
"#;
        let s: Scenario = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(s.id, "a");
        assert_eq!(s.when.method, "GET");
        assert_eq!(s.response.status, 200);
    }
}
