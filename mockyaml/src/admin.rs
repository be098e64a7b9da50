//! Admin API: scenario CRUD (writes edit YAML on disk then reload),
//! file listing, trace inspection, and forced reload.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path as RoutePath, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Deserialize;
use tracing::error;

use crate::handler::AppState;

/// `GET /__admin/scenarios`
pub async fn list_scenarios(State(state): State<Arc<AppState>>) -> Response {
    let Some(index) = state.router.current_index() else {
        return Json(serde_json::json!([])).into_response();
    };
    Json(index.all().map(summary).collect::<Vec<_>>()).into_response()
}

#[derive(Deserialize)]
pub struct SearchQuery {
    q: Option<String>,
}

/// `GET /__admin/scenarios/search?q=`
pub async fn search_scenarios(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SearchQuery>,
) -> Response {
    let Some(index) = state.router.current_index() else {
        return Json(serde_json::json!([])).into_response();
    };
    let needle = params.q.unwrap_or_default().to_lowercase();
    let matches: Vec<_> = index
        .all()
        .filter(|s| {
            s.id.to_lowercase().contains(&needle)
                || s.name.to_lowercase().contains(&needle)
                || s.path_key.to_lowercase().contains(&needle)
        })
        .map(summary)
        .collect();
    Json(matches).into_response()
}

fn summary(s: &crate::runtime::CompiledScenario) -> serde_json::Value {
    serde_json::json!({
        "id": s.id,
        "name": s.name,
        "priority": s.priority,
        "method": s.method,
        "path_key": s.path_key,
    })
}

/// `GET /__admin/scenarios/{id}`
pub async fn get_scenario(State(state): State<Arc<AppState>>, RoutePath(id): RoutePath<String>) -> Response {
    let Some(index) = state.router.current_index() else {
        return (StatusCode::SERVICE_UNAVAILABLE, "server not ready").into_response();
    };
    let Some(scenario) = index.get(&id) else {
        return (StatusCode::NOT_FOUND, "scenario not found").into_response();
    };
    let raw_yaml = std::fs::read_to_string(&scenario.source_file).unwrap_or_default();
    Json(serde_json::json!({
        "id": scenario.id,
        "name": scenario.name,
        "priority": scenario.priority,
        "method": scenario.method,
        "path_key": scenario.path_key,
        "source_file": scenario.source_file.display().to_string(),
        "source_index": scenario.source_index,
        "raw_yaml": raw_yaml,
    }))
    .into_response()
}

/// `POST /__admin/scenarios` — body is the full scenario YAML, including `id`.
pub async fn create_scenario(State(state): State<Arc<AppState>>, body: String) -> Response {
    let doc: serde_yaml::Value = match serde_yaml::from_str(&body) {
        Ok(v) => v,
        Err(e) => return (StatusCode::BAD_REQUEST, format!("invalid YAML: {e}")).into_response(),
    };
    let Some(id) = doc.get("id").and_then(|v| v.as_str()) else {
        return (StatusCode::BAD_REQUEST, "scenario must have an 'id'").into_response();
    };
    if let Err(e) = write_scenario_file(&state.root, id, &body) {
        return (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response();
    }
    trigger_reload(&state).await
}

/// `PUT /__admin/scenarios/{id}` — body replaces the scenario's own file.
pub async fn put_scenario(
    State(state): State<Arc<AppState>>,
    RoutePath(id): RoutePath<String>,
    body: String,
) -> Response {
    if let Err(e) = write_scenario_file(&state.root, &id, &body) {
        return (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response();
    }
    trigger_reload(&state).await
}

/// `DELETE /__admin/scenarios/{id}`
pub async fn delete_scenario(State(state): State<Arc<AppState>>, RoutePath(id): RoutePath<String>) -> Response {
    let path = state.root.join(format!("{id}.yaml"));
    if path.exists() {
        if let Err(e) = std::fs::remove_file(&path) {
            return (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response();
        }
    }
    trigger_reload(&state).await
}

/// `GET /__admin/files`
pub async fn list_files(State(state): State<Arc<AppState>>) -> Response {
    let mut files: Vec<String> = walkdir::WalkDir::new(&state.root)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter_map(|e| {
            e.path()
                .strip_prefix(&state.root)
                .ok()
                .map(|p| p.to_string_lossy().into_owned())
        })
        .collect();
    files.sort();
    Json(files).into_response()
}

#[derive(Deserialize)]
pub struct TraceQuery {
    last: Option<usize>,
}

/// `GET /__admin/trace?last=N`
pub async fn get_trace(State(state): State<Arc<AppState>>, Query(params): Query<TraceQuery>) -> Response {
    let n = params.last.unwrap_or(10);
    let entries = state.trace.last(n);
    let items: Vec<serde_json::Value> = entries
        .iter()
        .map(|e| {
            serde_json::json!({
                "timestamp": e.timestamp,
                "method": e.method,
                "path": e.path,
                "matched_id": e.matched_id,
                "rate_limited": e.rate_limited,
                "candidates": e.candidates.iter().map(|c| serde_json::json!({
                    "id": c.scenario_id,
                    "name": c.scenario_name,
                    "matched": c.matched,
                    "failed_field": c.failed_field,
                    "failed_reason": c.failed_reason,
                })).collect::<Vec<_>>(),
            })
        })
        .collect();
    Json(items).into_response()
}

/// `POST /__admin/reload`
pub async fn force_reload(State(state): State<Arc<AppState>>) -> Response {
    trigger_reload(&state).await
}

async fn trigger_reload(state: &AppState) -> Response {
    match state.reload().await {
        Ok(warnings) => Json(serde_json::json!({
            "reloaded": true,
            "warnings": warnings.iter().map(ToString::to_string).collect::<Vec<_>>(),
        }))
        .into_response(),
        Err(e) => {
            error!(error = %e, "reload failed");
            (StatusCode::BAD_REQUEST, format!("reload failed: {e}")).into_response()
        }
    }
}

fn write_scenario_file(root: &std::path::Path, id: &str, content: &str) -> std::io::Result<()> {
    let target = root.join(format!("{id}.yaml"));
    let tmp = root.join(format!(".{id}.yaml.tmp"));
    std::fs::write(&tmp, content)?;
    std::fs::rename(&tmp, &target)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_scenario_file_uses_temp_then_rename() {
        let dir = tempfile::tempdir().unwrap();
        write_scenario_file(dir.path(), "a", "id: a\n").unwrap();
        assert!(dir.path().join("a.yaml").exists());
        assert!(!dir.path().join(".a.yaml.tmp").exists());
    }
}
