//! Scenario repository: walks the scenario root, parses YAML, resolves
//! `!include` directives, and hands back a flat, provenance-tagged list of
//! scenarios — or a fatal load error.

pub mod include;

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use mockyaml_core::error::ConfigError;
use mockyaml_core::schema::Scenario;
use walkdir::WalkDir;

use crate::compiler;
use crate::error::{MockError, Result};
use crate::index::{ScenarioIndex, ScenarioIndexBuilder};

/// Loads every scenario file under `root`, flattening sequence-documents
/// and resolving `!include` directives. Structural errors (bad YAML,
/// missing/escaping includes, duplicate ids) abort the whole load.
pub fn load_scenarios(root: &Path) -> std::result::Result<Vec<Scenario>, ConfigError> {
    let mut scenarios = Vec::new();
    let mut seen: HashMap<String, PathBuf> = HashMap::new();

    let mut paths: Vec<PathBuf> = WalkDir::new(root)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|p| matches!(p.extension().and_then(|e| e.to_str()), Some("yaml" | "yml")))
        .collect();
    paths.sort();

    for path in paths {
        let content = std::fs::read_to_string(&path).map_err(|source| ConfigError::Io {
            path: path.clone(),
            source,
        })?;
        let mut doc: serde_yaml::Value =
            serde_yaml::from_str(&content).map_err(|e| ConfigError::ParseError {
                path: path.clone(),
                line: e.location().map(|l| l.line()),
                message: e.to_string(),
            })?;
        include::resolve(&mut doc, &path, root)?;

        let entries: Vec<(serde_yaml::Value, Option<usize>)> = match &doc {
            serde_yaml::Value::Sequence(items) => items
                .iter()
                .enumerate()
                .map(|(i, item)| (item.clone(), Some(i)))
                .collect(),
            _ => vec![(doc, None)],
        };

        for (entry, source_index) in entries {
            let mut scenario: Scenario =
                serde_yaml::from_value(entry).map_err(|e| ConfigError::ParseError {
                    path: path.clone(),
                    line: None,
                    message: e.to_string(),
                })?;
            scenario.source_file = path.clone();
            scenario.source_index = source_index;

            if let Some(first) = seen.get(&scenario.id) {
                return Err(ConfigError::DuplicateId {
                    id: scenario.id.clone(),
                    first: first.clone(),
                    second: path.clone(),
                });
            }
            seen.insert(scenario.id.clone(), path.clone());
            scenarios.push(scenario);
        }
    }

    Ok(scenarios)
}

/// Loads, compiles, and indexes every scenario under `root`.
///
/// A structural load error (bad YAML, duplicate id, include failure) is
/// fatal and returned immediately. A per-scenario compile error (bad
/// regex, unknown engine, unsafe `body_file`) is recorded and that
/// scenario alone is dropped — every other scenario still compiles.
pub fn build_index(root: &Path, default_engine: &str) -> Result<(ScenarioIndex, Vec<MockError>)> {
    let scenarios = load_scenarios(root)?;
    let mut builder = ScenarioIndexBuilder::new();
    let mut warnings = Vec::new();

    for scenario in &scenarios {
        match compiler::compile_scenario(scenario, root, default_engine) {
            Ok(compiled) => builder.add(compiled),
            Err(e) => warnings.push(e),
        }
    }

    Ok((builder.build(), warnings))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write(dir: &Path, rel: &str, content: &str) {
        let path = dir.join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, content).unwrap();
    }

    #[test]
    fn loads_single_mapping_file() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "a.yaml",
            "id: a\nwhen:\n  method: GET\n  path: /x\nresponse:\n  body: hi\n",
        );
        let scenarios = load_scenarios(dir.path()).unwrap();
        assert_eq!(scenarios.len(), 1);
        assert_eq!(scenarios[0].id, "a");
        assert_eq!(scenarios[0].source_index, None);
    }

    #[test]
    fn flattens_sequence_file_with_source_index() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "many.yaml",
            "- id: a\n  when: {method: GET, path: /a}\n  response: {body: x}\n\
             - id: b\n  when: {method: GET, path: /b}\n  response: {body: y}\n",
        );
        let scenarios = load_scenarios(dir.path()).unwrap();
        assert_eq!(scenarios.len(), 2);
        assert_eq!(scenarios[0].source_index, Some(0));
        assert_eq!(scenarios[1].source_index, Some(1));
    }

    #[test]
    fn duplicate_id_across_files_aborts_load() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "a.yaml",
            "id: dup\nwhen: {method: GET, path: /a}\nresponse: {body: x}\n",
        );
        write(
            dir.path(),
            "b.yaml",
            "id: dup\nwhen: {method: GET, path: /b}\nresponse: {body: y}\n",
        );
        let result = load_scenarios(dir.path());
        assert!(matches!(result, Err(ConfigError::DuplicateId { .. })));
    }

    #[test]
    fn build_index_drops_bad_scenario_but_keeps_others() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "good.yaml",
            "id: good\nwhen: {method: GET, path: /x}\nresponse: {body: hi}\n",
        );
        write(
            dir.path(),
            "bad.yaml",
            "id: bad\nwhen:\n  method: GET\n  path: /y\n  headers: {x: '(['}\nresponse: {body: hi}\n",
        );
        let (index, warnings) = build_index(dir.path(), "").unwrap();
        assert_eq!(warnings.len(), 1);
        assert!(index.get("good").is_some());
        assert!(index.get("bad").is_none());
    }
}
