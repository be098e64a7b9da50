//! The compiler: turns a declarative [`mockyaml_core::schema::Scenario`]
//! into an immutable [`CompiledScenario`], or an error.

pub mod body;

use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use mockyaml_core::schema::Scenario;

use crate::error::{MockError, Result};
use crate::predicate::Predicate;
use crate::runtime::{
    CompiledBody, CompiledPolicy, CompiledResponse, CompiledScenario, FieldPredicate,
    FieldPredicateKind,
};
use crate::template;

/// Canonicalises an HTTP header name to `Title-Case` so header lookups and
/// index keys agree regardless of how the request or the YAML wrote it.
pub fn canonical_header_name(name: &str) -> String {
    name.split('-')
        .map(|segment| {
            let mut chars = segment.chars();
            match chars.next() {
                Some(first) => {
                    first.to_ascii_uppercase().to_string() + &chars.as_str().to_ascii_lowercase()
                }
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join("-")
}

/// Compiles a single scenario against the given scenario root (used for
/// `body_file` path-safety checks) and default template engine (applied
/// when `response.engine` is empty).
pub fn compile_scenario(
    scenario: &Scenario,
    root: &Path,
    default_engine: &str,
) -> Result<CompiledScenario> {
    let method = scenario.when.method.to_uppercase();
    let mut predicates: Vec<FieldPredicate> = Vec::new();

    if !method.is_empty() {
        predicates.push(FieldPredicate {
            field_tag: "method".to_string(),
            kind: FieldPredicateKind::Method(Predicate::Exact(method.clone())),
        });
    }

    let mut header_names: Vec<&String> = scenario.when.headers.keys().collect();
    header_names.sort();
    for name in header_names {
        let matcher = &scenario.when.headers[name];
        let predicate = Predicate::compile(matcher).map_err(|_| MockError::Compile {
            id: scenario.id.clone(),
            message: format!("invalid header matcher for '{name}'"),
        })?;
        predicates.push(FieldPredicate {
            field_tag: format!("header:{}", canonical_header_name(name)),
            kind: FieldPredicateKind::Header(predicate),
        });
    }

    if let Some(body_clause) = &scenario.when.body {
        let body_preds = body::compile_top(body_clause).map_err(|e| MockError::Compile {
            id: scenario.id.clone(),
            message: e.to_string(),
        })?;
        predicates.extend(body_preds);
    }

    let response = compile_response(scenario, root, default_engine)?;
    let policy = scenario.policy.clone().map(|p| CompiledPolicy {
        rate_limit: p.rate_limit,
        latency: p.latency,
        pagination: p.pagination,
    });

    Ok(CompiledScenario {
        id: scenario.id.clone(),
        name: scenario.name.clone(),
        priority: scenario.priority,
        method: method.clone(),
        path_key: format!("{method}:{}", scenario.when.path),
        predicates,
        response,
        policy,
        source_file: scenario.source_file.clone(),
        source_index: scenario.source_index,
    })
}

fn compile_response(
    scenario: &Scenario,
    root: &Path,
    default_engine: &str,
) -> Result<CompiledResponse> {
    let resp = &scenario.response;

    let source = match (&resp.body, &resp.body_file) {
        (Some(inline), _) => inline.clone(),
        (None, Some(rel)) => {
            let path = resolve_safe_path(root, rel).map_err(|e| MockError::Compile {
                id: scenario.id.clone(),
                message: e.to_string(),
            })?;
            std::fs::read_to_string(&path).map_err(|e| MockError::Compile {
                id: scenario.id.clone(),
                message: format!("reading body_file '{rel}': {e}"),
            })?
        }
        (None, None) => String::new(),
    };

    let body_file_extension = resp
        .body_file
        .as_ref()
        .and_then(|rel| Path::new(rel).extension())
        .and_then(|e| e.to_str())
        .map(str::to_string);

    let engine = resp
        .engine
        .clone()
        .filter(|e| !e.is_empty())
        .unwrap_or_else(|| default_engine.to_string());

    let body = if engine.is_empty() {
        CompiledBody::Static(source.into_bytes())
    } else {
        let renderer = template::compile(&engine, &scenario.id, &source)?;
        CompiledBody::Rendered(renderer)
    };

    let mut headers = IndexMap::new();
    for (k, v) in &resp.headers {
        headers.insert(k.clone(), v.clone());
    }

    Ok(CompiledResponse {
        status: resp.status,
        headers,
        content_type: resp.content_type.clone(),
        body_file_extension,
        body,
    })
}

/// Resolves `candidate` relative to `root`, rejecting absolute paths and
/// any path whose canonicalised real location escapes `root`.
pub fn resolve_safe_path(root: &Path, candidate: &str) -> Result<PathBuf> {
    let candidate_path = Path::new(candidate);
    if candidate_path.is_absolute() {
        return Err(MockError::Compile {
            id: String::new(),
            message: format!("body_file path must be relative: '{candidate}'"),
        });
    }
    let joined = root.join(candidate_path);
    let canonical_root = root
        .canonicalize()
        .map_err(|e| MockError::Compile {
            id: String::new(),
            message: format!("canonicalising root: {e}"),
        })?;
    let canonical = joined.canonicalize().map_err(|e| MockError::Compile {
        id: String::new(),
        message: format!("resolving '{candidate}': {e}"),
    })?;
    if !canonical.starts_with(&canonical_root) {
        return Err(MockError::Compile {
            id: String::new(),
            message: format!("'{candidate}' escapes root"),
        });
    }
    Ok(canonical)
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockyaml_core::schema::{Response, Scenario, WhenClause};

    #[test]
    fn canonical_header_name_titlecases_segments() {
        assert_eq!(canonical_header_name("x-trace-id"), "X-Trace-Id");
        assert_eq!(canonical_header_name("CONTENT-TYPE"), "Content-Type");
    }

    #[test]
    fn compiles_minimal_scenario() {
        let scenario = Scenario {
            id: "a".to_string(),
            name: "a".to_string(),
            priority: 0,
            when: WhenClause {
                method: "get".to_string(),
                path: "/x".to_string(),
                headers: IndexMap::new(),
                body: None,
            },
            response: Response {
                status: 200,
                headers: IndexMap::new(),
                body: Some("hi".to_string()),
                body_file: None,
                content_type: None,
                engine: None,
            },
            policy: None,
            source_file: PathBuf::new(),
            source_index: None,
        };
        let compiled = compile_scenario(&scenario, Path::new("."), "").unwrap();
        assert_eq!(compiled.method, "GET");
        assert_eq!(compiled.path_key, "GET:/x");
        assert_eq!(compiled.predicates.len(), 1);
    }
}
