//! The scenario index: `path_key → sorted candidates`, built once per
//! reload and immutable thereafter.

use std::collections::HashMap;

use crate::runtime::CompiledScenario;

/// An immutable, built scenario index.
#[derive(Default)]
pub struct ScenarioIndex {
    buckets: HashMap<String, Vec<CompiledScenario>>,
    paths: Vec<String>,
}

/// A builder that accumulates scenarios before `build()` sorts and freezes
/// them into a [`ScenarioIndex`].
#[derive(Default)]
pub struct ScenarioIndexBuilder {
    buckets: HashMap<String, Vec<CompiledScenario>>,
}

impl ScenarioIndexBuilder {
    /// Creates an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a compiled scenario under its `path_key`.
    pub fn add(&mut self, cs: CompiledScenario) {
        self.buckets.entry(cs.path_key.clone()).or_default().push(cs);
    }

    /// Sorts every bucket and freezes the index.
    ///
    /// Sort order: `priority` descending, then predicate count descending
    /// (more specific wins), then `id` ascending.
    pub fn build(mut self) -> ScenarioIndex {
        for bucket in self.buckets.values_mut() {
            bucket.sort_by(|a, b| {
                b.priority
                    .cmp(&a.priority)
                    .then_with(|| b.predicate_count().cmp(&a.predicate_count()))
                    .then_with(|| a.id.cmp(&b.id))
            });
        }
        let mut paths: Vec<String> = self
            .buckets
            .keys()
            .filter_map(|key| key.split_once(':').map(|(_, pattern)| pattern.to_string()))
            .collect();
        paths.sort();
        paths.dedup();
        ScenarioIndex {
            buckets: self.buckets,
            paths,
        }
    }
}

impl ScenarioIndex {
    /// Returns the sorted candidate bucket for `key`, or an empty slice.
    pub fn lookup(&self, key: &str) -> &[CompiledScenario] {
        self.buckets.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Returns every scenario across all buckets (used by admin read paths).
    pub fn all(&self) -> impl Iterator<Item = &CompiledScenario> {
        self.buckets.values().flatten()
    }

    /// The sorted, deduplicated list of path patterns, for router registration.
    pub fn paths(&self) -> &[String] {
        &self.paths
    }

    /// Looks a single scenario up by id across all buckets.
    pub fn get(&self, id: &str) -> Option<&CompiledScenario> {
        self.all().find(|s| s.id == id)
    }
}
