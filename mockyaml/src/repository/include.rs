//! `!include` directive resolution.
//!
//! Three operand forms: bare (relative to the file containing the
//! directive), `@root/…` (relative to the configured scenario root), and
//! `@here/…` (explicitly relative to the current file — same resolution as
//! bare, spelled out for clarity in scenario files). `.yaml`/`.yml` targets
//! are parsed and recursively resolved in place; any other extension is
//! inlined as a raw string scalar.

use std::path::{Path, PathBuf};

use mockyaml_core::error::ConfigError;
use serde_yaml::Value;

const TAG_NAME: &str = "!include";
const MAX_DEPTH: usize = 10;

/// Resolves every `!include` directive reachable from `value`, in place.
pub fn resolve(value: &mut Value, current_file: &Path, root: &Path) -> Result<(), ConfigError> {
    resolve_at_depth(value, current_file, root, 0)
}

fn resolve_at_depth(
    value: &mut Value,
    current_file: &Path,
    root: &Path,
    depth: usize,
) -> Result<(), ConfigError> {
    match value {
        Value::Tagged(tagged) if tagged.tag == TAG_NAME => {
            if depth >= MAX_DEPTH {
                return Err(ConfigError::IncludeDepthExceeded {
                    path: current_file.to_path_buf(),
                    max: MAX_DEPTH,
                });
            }
            let operand = tagged
                .value
                .as_str()
                .ok_or_else(|| ConfigError::InvalidValue {
                    field: "!include".to_string(),
                    value: format!("{:?}", tagged.value),
                    expected: "string path".to_string(),
                })?;
            let target = resolve_operand(operand, current_file, root)?;
            let mut loaded = load_target(&target)?;
            if is_yaml_path(&target) {
                resolve_at_depth(&mut loaded, &target, root, depth + 1)?;
            }
            *value = loaded;
        }
        Value::Mapping(map) => {
            for (_, v) in map.iter_mut() {
                resolve_at_depth(v, current_file, root, depth)?;
            }
        }
        Value::Sequence(seq) => {
            for item in seq.iter_mut() {
                resolve_at_depth(item, current_file, root, depth)?;
            }
        }
        Value::Tagged(tagged) => {
            resolve_at_depth(&mut tagged.value, current_file, root, depth)?;
        }
        _ => {}
    }
    Ok(())
}

fn is_yaml_path(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yaml" | "yml")
    )
}

fn resolve_operand(operand: &str, current_file: &Path, root: &Path) -> Result<PathBuf, ConfigError> {
    if Path::new(operand).is_absolute() {
        return Err(ConfigError::InvalidValue {
            field: "!include".to_string(),
            value: operand.to_string(),
            expected: "relative path".to_string(),
        });
    }

    let unresolved = if let Some(rel) = operand.strip_prefix("@root/") {
        root.join(rel)
    } else if let Some(rel) = operand.strip_prefix("@here/") {
        current_file
            .parent()
            .unwrap_or_else(|| Path::new("."))
            .join(rel)
    } else {
        current_file
            .parent()
            .unwrap_or_else(|| Path::new("."))
            .join(operand)
    };

    if !unresolved.exists() {
        return Err(ConfigError::MissingFile { path: unresolved });
    }

    let canonical_root = root.canonicalize().map_err(|source| ConfigError::Io {
        path: root.to_path_buf(),
        source,
    })?;
    let canonical = unresolved.canonicalize().map_err(|source| ConfigError::Io {
        path: unresolved.clone(),
        source,
    })?;
    if !canonical.starts_with(&canonical_root) {
        return Err(ConfigError::IncludeEscapesRoot { path: unresolved });
    }
    Ok(canonical)
}

fn load_target(path: &Path) -> Result<Value, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    if is_yaml_path(path) {
        serde_yaml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            line: e.location().map(|l| l.line()),
            message: e.to_string(),
        })
    } else {
        Ok(Value::String(content))
    }
}
