//! Server wiring: builds the shared state, does the initial scenario load,
//! spawns the watcher and rate-limiter eviction loop, and serves the axum
//! app until cancelled.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::admin;
use crate::error::Result;
use crate::handler::{self, AppState, MAX_BODY_BYTES};
use crate::watcher::ScenarioWatcher;

/// How often the watcher coalesces filesystem events before firing a reload.
const WATCH_DEBOUNCE: Duration = Duration::from_millis(300);

/// Runs the mock server until `cancel` fires.
///
/// Performs the initial scenario load before binding, so the very first
/// request sees a ready router rather than a transient 503.
pub async fn run(
    root: PathBuf,
    port: u16,
    default_engine: String,
    trace_size: usize,
    cancel: CancellationToken,
) -> Result<()> {
    let state = Arc::new(AppState::new(root.clone(), default_engine, trace_size));

    match state.reload().await {
        Ok(warnings) => {
            for w in &warnings {
                warn!(error = %w, "scenario compile warning during initial load");
            }
            info!(root = %root.display(), "initial scenario load complete");
        }
        Err(e) => {
            error!(error = %e, "initial scenario load failed, starting with an empty router");
        }
    }

    let _eviction_handle = state.rate_limiter.clone().spawn_eviction_loop();

    let (_watcher, mut changes) = ScenarioWatcher::spawn(&root, WATCH_DEBOUNCE)?;
    let reload_state = state.clone();
    let reload_cancel = cancel.clone();
    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = reload_cancel.cancelled() => break,
                signal = changes.recv() => {
                    if signal.is_none() {
                        break;
                    }
                    match reload_state.reload().await {
                        Ok(warnings) => {
                            for w in &warnings {
                                warn!(error = %w, "scenario compile warning during reload");
                            }
                            info!("scenario reload complete");
                        }
                        Err(e) => error!(error = %e, "scenario reload failed, prior index keeps serving"),
                    }
                }
            }
        }
    });

    let app = build_router(state);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "mockyaml listening");

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(async move { cancel.cancelled().await })
        .await?;

    Ok(())
}

/// Builds the axum app (mock fallback + admin routes) over `state`.
///
/// Exposed at crate visibility so integration tests can drive the full
/// pipeline via `tower::ServiceExt::oneshot` without binding a socket.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/__admin/scenarios", get(admin::list_scenarios).post(admin::create_scenario))
        .route("/__admin/scenarios/search", get(admin::search_scenarios))
        .route(
            "/__admin/scenarios/{id}",
            get(admin::get_scenario)
                .put(admin::put_scenario)
                .delete(admin::delete_scenario),
        )
        .route("/__admin/files", get(admin::list_files))
        .route("/__admin/trace", get(admin::get_trace))
        .route("/__admin/reload", post(admin::force_reload))
        .fallback(handler::handle)
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .with_state(state)
}
