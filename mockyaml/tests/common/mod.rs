use std::path::Path;
use std::sync::Arc;

use axum::Router;
use mockyaml::handler::AppState;
use mockyaml::server::build_router;

/// Writes a scenario file under `dir`, creating parent directories as needed.
pub fn write_scenario(dir: &Path, rel: &str, content: &str) {
    let path = dir.join(rel);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(path, content).unwrap();
}

/// Loads every scenario under `root` and builds the full axum app, ready to
/// drive with `tower::ServiceExt::oneshot`.
pub async fn build_app(root: &Path) -> Router {
    build_app_with_engine(root, "").await
}

pub async fn build_app_with_engine(root: &Path, default_engine: &str) -> Router {
    let state = Arc::new(AppState::new(root.to_path_buf(), default_engine.to_string(), 64));
    state.reload().await.expect("initial reload should succeed");
    build_router(state)
}
