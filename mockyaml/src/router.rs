//! The atomically-swapped path router and the index it was built from.
//!
//! `Rebuild` is serialized by a mutex and, in order, builds the new
//! `matchit` table, stores the index pointer, then stores the table
//! pointer. In-flight handlers that already loaded the old pair keep
//! using it; new requests observe the new pair immediately after the
//! store. Reads never take a lock.

use std::sync::{Arc, Mutex};

use arc_swap::ArcSwapOption;
use indexmap::IndexMap;

use crate::index::ScenarioIndex;

struct RouterState {
    table: matchit::Router<String>,
    index: Arc<ScenarioIndex>,
}

/// A matched scenario route: the registered pattern, extracted path
/// parameters, and the index snapshot this match was resolved against.
pub struct Matched {
    /// The route pattern the request path matched, e.g. `/users/{id}`.
    pub pattern: String,
    /// Extracted path parameters.
    pub path_params: IndexMap<String, String>,
    /// The index snapshot in effect when this match was resolved.
    pub index: Arc<ScenarioIndex>,
}

/// Holds the current (table, index) pair behind an atomic pointer swap.
#[derive(Default)]
pub struct Router {
    state: ArcSwapOption<RouterState>,
    rebuild_lock: Mutex<()>,
}

impl Router {
    /// Creates a router with no table yet loaded (`lookup` returns `None`
    /// and callers should respond 503).
    pub fn new() -> Self {
        Self {
            state: ArcSwapOption::from(None),
            rebuild_lock: Mutex::new(()),
        }
    }

    /// Builds a fresh routing table from `index` and installs it.
    pub fn rebuild(&self, index: ScenarioIndex) {
        let _guard = self.rebuild_lock.lock().expect("router rebuild mutex poisoned");
        let mut table = matchit::Router::new();
        for pattern in index.paths() {
            let _ = table.insert(pattern.as_str(), pattern.clone());
        }
        let index = Arc::new(index);
        self.state.store(Some(Arc::new(RouterState { table, index })));
    }

    /// Returns `true` once at least one `rebuild` has happened.
    pub fn is_ready(&self) -> bool {
        self.state.load().is_some()
    }

    /// Returns the current index snapshot, for admin read paths that need
    /// the whole scenario set rather than a single path match.
    pub fn current_index(&self) -> Option<Arc<ScenarioIndex>> {
        self.state.load().as_ref().map(|s| s.index.clone())
    }

    /// Matches `path` against the current table, if any.
    pub fn lookup(&self, path: &str) -> Option<Matched> {
        let guard = self.state.load();
        let state = guard.as_ref()?;
        let m = state.table.at(path).ok()?;
        let pattern = m.value.clone();
        let path_params = m
            .params
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Some(Matched {
            pattern,
            path_params,
            index: state.index.clone(),
        })
    }
}
