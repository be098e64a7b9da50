//! The evaluator: given a request and an ordered candidate list, returns
//! the first fully-matching scenario and a per-candidate failure trace.

use indexmap::IndexMap;

use crate::runtime::CompiledScenario;

/// A canonicalised incoming request, as seen by the evaluator.
#[derive(Debug, Clone)]
pub struct IncomingRequest {
    /// Request method, uppercased.
    pub method: String,
    /// Request path.
    pub path: String,
    /// Headers with canonicalised names.
    pub headers: IndexMap<String, String>,
    /// Raw request body.
    pub body: String,
}

impl IncomingRequest {
    /// Looks up a header by its canonical name; `""` if absent.
    fn header(&self, canonical_name: &str) -> String {
        self.headers
            .get(canonical_name)
            .cloned()
            .unwrap_or_default()
    }
}

/// The per-candidate outcome recorded in a trace entry.
#[derive(Debug, Clone)]
pub struct TraceCandidate {
    /// Scenario id.
    pub scenario_id: String,
    /// Scenario name.
    pub scenario_name: String,
    /// Whether every predicate held.
    pub matched: bool,
    /// The tag of the first predicate that failed, if any.
    pub failed_field: Option<String>,
    /// Human-readable reason, mirroring `failed_field`.
    pub failed_reason: Option<String>,
}

/// The result of evaluating a candidate list against a request.
pub struct EvaluationResult<'a> {
    /// The matched scenario, if any.
    pub matched: Option<&'a CompiledScenario>,
    /// Trace entries for every candidate evaluated.
    pub candidates: Vec<TraceCandidate>,
}

/// Evaluates candidates in order, returning the first fully-matching
/// scenario (if any) and failure diagnostics for the candidates visited.
///
/// Predicate order within a candidate is exactly the order the compiler
/// emitted them in, so `failed_field` is stable across runs for identical
/// inputs.
pub fn evaluate<'a>(req: &IncomingRequest, candidates: &'a [CompiledScenario]) -> EvaluationResult<'a> {
    let mut trace = Vec::with_capacity(candidates.len());
    for candidate in candidates {
        let mut failed: Option<(&str, &str)> = None;
        for predicate in &candidate.predicates {
            // Header names are embedded in the tag as `header:<Name>`, already
            // canonicalised by the compiler.
            let header_name = predicate
                .field_tag
                .strip_prefix("header:")
                .unwrap_or(&predicate.field_tag);
            let ok = predicate.eval(&req.method, &req.header(header_name), &req.body);
            if !ok {
                failed = Some((predicate.field_tag.as_str(), "predicate failed"));
                break;
            }
        }
        let matched = failed.is_none();
        trace.push(TraceCandidate {
            scenario_id: candidate.id.clone(),
            scenario_name: candidate.name.clone(),
            matched,
            failed_field: failed.map(|(f, _)| f.to_string()),
            failed_reason: failed.map(|(_, r)| r.to_string()),
        });
        if matched {
            return EvaluationResult {
                matched: Some(candidate),
                candidates: trace,
            };
        }
    }
    EvaluationResult {
        matched: None,
        candidates: trace,
    }
}
