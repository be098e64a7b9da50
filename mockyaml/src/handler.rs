//! The request pipeline: match → rate-limit → latency → render → paginate
//! → write, exactly as ordered in the component design.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::{HeaderMap, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use chrono::Utc;
use indexmap::IndexMap;
use rand::Rng;
use tracing::{error, warn};

use crate::compiler::canonical_header_name;
use crate::error::{MockError, Result};
use crate::evaluator::{self, IncomingRequest, TraceCandidate};
use crate::pagination;
use crate::ratelimit::RateLimiterStore;
use crate::repository;
use crate::router::Router;
use crate::runtime::{CompiledBody, CompiledScenario, RenderContext};
use crate::trace::{Entry, TraceRing};

/// Requests bodies are read up to this many bytes; the remainder is
/// silently discarded (there is no reject policy in the core).
pub const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

/// State shared across every axum handler, mock and admin alike.
pub struct AppState {
    /// The atomically-swapped scenario router.
    pub router: Router,
    /// Per-key token-bucket rate limiting.
    pub rate_limiter: Arc<RateLimiterStore>,
    /// Ring buffer of recent request outcomes.
    pub trace: TraceRing,
    /// Scenario root directory.
    pub root: PathBuf,
    /// Template engine applied when a scenario leaves `engine` empty.
    pub default_engine: String,
}

impl AppState {
    /// Creates state with an empty (not-yet-built) router.
    pub fn new(root: PathBuf, default_engine: String, trace_capacity: usize) -> Self {
        Self {
            router: Router::new(),
            rate_limiter: Arc::new(RateLimiterStore::default()),
            trace: TraceRing::new(trace_capacity),
            root,
            default_engine,
        }
    }

    /// Walks the scenario root, compiles every scenario, and installs the
    /// resulting index atomically. Returns per-scenario compile warnings;
    /// a structural load error is returned as `Err` and the prior index
    /// (if any) keeps serving.
    pub async fn reload(&self) -> Result<Vec<MockError>> {
        let root = self.root.clone();
        let engine = self.default_engine.clone();
        let (index, warnings) =
            tokio::task::spawn_blocking(move || repository::build_index(&root, &engine))
                .await
                .map_err(|e| MockError::Io(std::io::Error::other(e.to_string())))??;
        self.router.rebuild(index);
        Ok(warnings)
    }
}

/// The mock-surface fallback handler: every request not claimed by an
/// admin route flows through here.
pub async fn handle(
    State(state): State<Arc<AppState>>,
    method: Method,
    uri: Uri,
    Query(query_params): Query<IndexMap<String, String>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let Some(route) = state.router.lookup(uri.path()) else {
        if !state.router.is_ready() {
            return (StatusCode::SERVICE_UNAVAILABLE, "server not ready").into_response();
        }
        return not_found_response(method.as_str(), uri.path(), &[]);
    };

    let mut body_bytes = body;
    if body_bytes.len() > MAX_BODY_BYTES {
        body_bytes.truncate(MAX_BODY_BYTES);
    }
    let body_string = String::from_utf8_lossy(&body_bytes).into_owned();

    let mut canonical_headers = IndexMap::new();
    for (name, value) in headers.iter() {
        let canonical = canonical_header_name(name.as_str());
        canonical_headers.insert(canonical, value.to_str().unwrap_or_default().to_string());
    }

    let req = IncomingRequest {
        method: method.as_str().to_uppercase(),
        path: uri.path().to_string(),
        headers: canonical_headers.clone(),
        body: body_string.clone(),
    };

    let key = format!("{}:{}", req.method, route.pattern);
    let candidates = route.index.lookup(&key);
    let result = evaluator::evaluate(&req, candidates);

    let now = Utc::now().to_rfc3339();
    let matched = result.matched;

    state.trace.push(Entry {
        timestamp: now.clone(),
        method: req.method.clone(),
        path: req.path.clone(),
        matched_id: matched.map(|s| s.id.clone()),
        rate_limited: false,
        candidates: result.candidates.clone(),
    });

    let Some(scenario) = matched else {
        return not_found_response(&req.method, &req.path, &result.candidates);
    };

    if let Some(policy) = &scenario.policy {
        if let Some(rl) = &policy.rate_limit {
            let bucket_key = if rl.key.is_empty() { &scenario.id } else { &rl.key };
            if !state.rate_limiter.allow(bucket_key, rl.rate, rl.burst) {
                return rate_limited_response();
            }
        }
    }

    if let Some(policy) = &scenario.policy {
        if let Some(latency) = &policy.latency {
            let jitter = if latency.jitter_ms > 0 {
                rand::rng().random_range(0..=latency.jitter_ms)
            } else {
                0
            };
            tokio::time::sleep(Duration::from_millis(latency.fixed_ms + jitter)).await;
        }
    }

    let ctx = RenderContext {
        method: req.method.clone(),
        path: req.path.clone(),
        headers: canonical_headers,
        query_params: query_params.clone(),
        path_params: route.path_params.clone(),
        body: body_string,
        now,
    };

    let mut rendered = match render(scenario, &ctx) {
        Ok(bytes) => bytes,
        Err(e) => {
            error!(error = %e, scenario_id = %scenario.id, "render error");
            return (StatusCode::INTERNAL_SERVER_ERROR, "render error").into_response();
        }
    };

    if let Some(policy) = &scenario.policy {
        if let Some(pagination_cfg) = &policy.pagination {
            match pagination::paginate(&rendered, pagination_cfg, &query_params) {
                Ok(paginated) => rendered = paginated,
                Err(e) => {
                    warn!(error = %e, scenario_id = %scenario.id, "pagination error, serving unmodified body");
                }
            }
        }
    }

    build_response(scenario, rendered)
}

fn render(scenario: &CompiledScenario, ctx: &RenderContext) -> Result<Vec<u8>> {
    match &scenario.response.body {
        CompiledBody::Static(bytes) => Ok(bytes.clone()),
        CompiledBody::Rendered(renderer) => renderer.render(ctx),
    }
}

fn build_response(scenario: &CompiledScenario, body: Vec<u8>) -> Response {
    let status = StatusCode::from_u16(scenario.response.status).unwrap_or(StatusCode::OK);
    let content_type = scenario
        .response
        .content_type
        .clone()
        .or_else(|| extension_content_type(scenario.response.body_file_extension.as_deref()))
        .unwrap_or_else(|| sniff_content_type(&body));

    let mut builder = Response::builder().status(status);
    for (name, value) in &scenario.response.headers {
        builder = builder.header(name.as_str(), value.as_str());
    }
    builder = builder.header(axum::http::header::CONTENT_TYPE, content_type);

    builder
        .body(axum::body::Body::from(body))
        .unwrap_or_else(|_| (StatusCode::INTERNAL_SERVER_ERROR, "response build error").into_response())
}

fn extension_content_type(ext: Option<&str>) -> Option<String> {
    let mime = match ext?.to_ascii_lowercase().as_str() {
        "json" => "application/json",
        "xml" => "application/xml",
        "html" | "htm" => "text/html",
        "csv" => "text/csv",
        "txt" => "text/plain",
        _ => return None,
    };
    Some(mime.to_string())
}

fn sniff_content_type(body: &[u8]) -> String {
    match body.iter().find(|b| !b.is_ascii_whitespace()) {
        Some(b'{' | b'[') => "application/json".to_string(),
        Some(b'<') => "application/xml".to_string(),
        _ => "application/octet-stream".to_string(),
    }
}

fn not_found_response(method: &str, path: &str, candidates: &[TraceCandidate]) -> Response {
    let candidates_json: Vec<serde_json::Value> = candidates
        .iter()
        .map(|c| {
            serde_json::json!({
                "id": c.scenario_id,
                "name": c.scenario_name,
                "matched": c.matched,
                "failed_field": c.failed_field,
                "failed_reason": c.failed_reason,
            })
        })
        .collect();
    let body = serde_json::json!({
        "error": "no_match",
        "method": method,
        "path": path,
        "message": "no scenario matched this request",
        "candidates": candidates_json,
    });
    (StatusCode::NOT_FOUND, axum::Json(body)).into_response()
}

fn rate_limited_response() -> Response {
    let body = serde_json::json!({"error": "rate_limited", "message": "Too many requests"});
    (
        StatusCode::TOO_MANY_REQUESTS,
        [(axum::http::header::RETRY_AFTER, "1")],
        axum::Json(body),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sniff_json_body() {
        assert_eq!(sniff_content_type(b"  {\"a\":1}"), "application/json");
        assert_eq!(sniff_content_type(b"[1,2]"), "application/json");
    }

    #[test]
    fn sniff_xml_body() {
        assert_eq!(sniff_content_type(b"<root/>"), "application/xml");
    }

    #[test]
    fn sniff_falls_back_to_octet_stream() {
        assert_eq!(sniff_content_type(b"\x00\x01binary"), "application/octet-stream");
    }

    #[test]
    fn extension_maps_known_types() {
        assert_eq!(extension_content_type(Some("json")).as_deref(), Some("application/json"));
        assert_eq!(extension_content_type(Some("bin")), None);
        assert_eq!(extension_content_type(None), None);
    }
}
