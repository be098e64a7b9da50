//! Immutable, compiled runtime forms produced by [`crate::compiler`].
//!
//! A [`CompiledScenario`] is built once per load/reload and never mutated
//! afterwards; it is owned by exactly one [`crate::index::ScenarioIndex`]
//! and discarded once no in-flight request still holds a reference to the
//! index that owned it.

use std::sync::Arc;

use indexmap::IndexMap;
use mockyaml_core::schema::{LatencyPolicy, PaginationPolicy, RateLimitPolicy};

use crate::extract::Extractor;
use crate::predicate::Predicate;
use crate::template::Renderer;

/// A recursive, compiled body predicate tree. Unlike the declarative
/// `BodyClause`, this is already specialised to a single extractor and
/// value predicate per leaf — no content-type dispatch happens here.
#[derive(Clone)]
pub enum BodyPredicate {
    /// Extract a value and apply a predicate to it.
    Condition {
        /// Extractor baked in at compile time.
        extractor: Extractor,
        /// Value predicate applied to the extracted (or raw) string.
        predicate: Predicate,
    },
    /// All children must hold.
    All(Vec<BodyPredicate>),
    /// At least one child must hold.
    Any(Vec<BodyPredicate>),
    /// The child must not hold.
    Not(Box<BodyPredicate>),
}

impl BodyPredicate {
    /// Evaluates this predicate against the raw request body.
    pub fn eval(&self, body: &str) -> bool {
        match self {
            BodyPredicate::Condition {
                extractor,
                predicate,
            } => match extractor.extract(body) {
                Some(v) => predicate.eval(&v),
                None => false,
            },
            BodyPredicate::All(ps) => ps.iter().all(|p| p.eval(body)),
            BodyPredicate::Any(ps) => ps.iter().any(|p| p.eval(body)),
            BodyPredicate::Not(p) => !p.eval(body),
        }
    }
}

/// One predicate in a scenario's evaluation order, tagged for diagnostics.
///
/// Field tags: `method`, `header:<CanonicalName>`, `body:<extractor>`,
/// `body:all` / `body:any` / `body:not`.
#[derive(Clone)]
pub struct FieldPredicate {
    /// Diagnostic tag, stable across runs for identical input scenarios.
    pub field_tag: String,
    /// The predicate kind and the value it is evaluated against.
    pub kind: FieldPredicateKind,
}

/// Which request field a [`FieldPredicate`] consumes.
#[derive(Clone)]
pub enum FieldPredicateKind {
    /// Evaluated against the request method.
    Method(Predicate),
    /// Evaluated against a canonicalised header value (empty string if absent).
    Header(Predicate),
    /// Evaluated against the raw request body.
    Body(BodyPredicate),
}

impl FieldPredicate {
    /// Evaluates this predicate against the matching field of the request.
    pub fn eval(&self, method: &str, header_value: &str, body: &str) -> bool {
        match &self.kind {
            FieldPredicateKind::Method(p) => p.eval(method),
            FieldPredicateKind::Header(p) => p.eval(header_value),
            FieldPredicateKind::Body(p) => p.eval(body),
        }
    }
}

/// The context a [`Renderer`] is invoked with.
#[derive(Debug, Clone)]
pub struct RenderContext {
    /// Request method.
    pub method: String,
    /// Request path (as received, not the pattern).
    pub path: String,
    /// Canonicalised request headers.
    pub headers: IndexMap<String, String>,
    /// Parsed query parameters.
    pub query_params: IndexMap<String, String>,
    /// Extracted `{param}` path parameters.
    pub path_params: IndexMap<String, String>,
    /// Raw request body, as a string (lossy on invalid UTF-8).
    pub body: String,
    /// RFC3339 UTC timestamp captured at the start of request handling.
    pub now: String,
}

/// The compiled response body: either static bytes or a compiled renderer.
#[derive(Clone)]
pub enum CompiledBody {
    /// Static bytes, emitted verbatim.
    Static(Vec<u8>),
    /// A compiled template, rendered per request.
    Rendered(Arc<dyn Renderer>),
}

/// The compiled form of [`mockyaml_core::schema::Response`].
#[derive(Clone)]
pub struct CompiledResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response headers.
    pub headers: IndexMap<String, String>,
    /// Explicit content type, if set in the scenario.
    pub content_type: Option<String>,
    /// Extension of the `body_file` this response was sourced from, if
    /// any — used to infer a content type when `content_type` is unset.
    pub body_file_extension: Option<String>,
    /// The body source.
    pub body: CompiledBody,
}

/// The compiled form of [`mockyaml_core::schema::Policy`].
#[derive(Clone, Default)]
pub struct CompiledPolicy {
    /// Rate limit policy, if any.
    pub rate_limit: Option<RateLimitPolicy>,
    /// Latency policy, if any.
    pub latency: Option<LatencyPolicy>,
    /// Pagination policy, if any.
    pub pagination: Option<PaginationPolicy>,
}

/// The immutable, compiled runtime form of a scenario.
#[derive(Clone)]
pub struct CompiledScenario {
    /// Unique scenario id.
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// Match priority.
    pub priority: i64,
    /// HTTP method this scenario matches (may be empty for "any").
    pub method: String,
    /// `METHOD:pattern`, the primary index key.
    pub path_key: String,
    /// Predicates in evaluation order.
    pub predicates: Vec<FieldPredicate>,
    /// Compiled response.
    pub response: CompiledResponse,
    /// Compiled policy, if any.
    pub policy: Option<CompiledPolicy>,
    /// File this scenario was loaded from, for admin read paths.
    pub source_file: std::path::PathBuf,
    /// Index within a sequence-document file, or `None` for a single-document file.
    pub source_index: Option<usize>,
}

impl CompiledScenario {
    /// Number of predicates, used as the tiebreak in index sort order
    /// ("more specific wins"). Combinator predicates (`body:all` etc.)
    /// count as exactly one predicate each, per their single emitted tag.
    pub fn predicate_count(&self) -> usize {
        self.predicates.len()
    }
}
