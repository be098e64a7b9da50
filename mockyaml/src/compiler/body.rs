//! Recursive compilation of [`BodyClause`] into [`BodyPredicate`] trees and
//! the top-level [`FieldPredicate`]s the scenario compiler emits for them.

use mockyaml_core::schema::{BodyClause, BodyContentType};

use crate::error::Result;
use crate::extract::Extractor;
use crate::predicate::Predicate;
use crate::runtime::{BodyPredicate, FieldPredicate, FieldPredicateKind};

/// Compiles the top-level body clause of a `when:` block into the ordered
/// field predicates the evaluator will run. Order: one `body:<extractor>`
/// tag per condition (in declaration order), then `body:all`, `body:any`,
/// `body:not` if present.
pub fn compile_top(clause: &BodyClause) -> Result<Vec<FieldPredicate>> {
    let mut preds = Vec::new();
    for cond in &clause.conditions {
        let extractor = make_extractor(clause.content_type, &cond.extractor);
        let predicate = Predicate::compile(&cond.matcher)?;
        preds.push(FieldPredicate {
            field_tag: format!("body:{}", cond.extractor),
            kind: FieldPredicateKind::Body(BodyPredicate::Condition {
                extractor,
                predicate,
            }),
        });
    }
    if let Some(all) = &clause.all {
        let mut flat = Vec::new();
        for child in all {
            flatten_into(&mut flat, compile_inner(child)?);
        }
        preds.push(FieldPredicate {
            field_tag: "body:all".to_string(),
            kind: FieldPredicateKind::Body(BodyPredicate::All(flat)),
        });
    }
    if let Some(any) = &clause.any {
        let mut items = Vec::new();
        for child in any {
            items.push(compile_inner(child)?);
        }
        preds.push(FieldPredicate {
            field_tag: "body:any".to_string(),
            kind: FieldPredicateKind::Body(BodyPredicate::Any(items)),
        });
    }
    if let Some(not) = &clause.not {
        let inner = compile_inner(not)?;
        preds.push(FieldPredicate {
            field_tag: "body:not".to_string(),
            kind: FieldPredicateKind::Body(BodyPredicate::Not(Box::new(inner))),
        });
    }
    Ok(preds)
}

/// Compiles a nested body clause into a single predicate representing the
/// conjunction of its own conditions and combinator groups.
fn compile_inner(clause: &BodyClause) -> Result<BodyPredicate> {
    let mut parts = Vec::new();
    for cond in &clause.conditions {
        let extractor = make_extractor(clause.content_type, &cond.extractor);
        let predicate = Predicate::compile(&cond.matcher)?;
        parts.push(BodyPredicate::Condition {
            extractor,
            predicate,
        });
    }
    if let Some(all) = &clause.all {
        let mut flat = Vec::new();
        for child in all {
            flatten_into(&mut flat, compile_inner(child)?);
        }
        parts.push(BodyPredicate::All(flat));
    }
    if let Some(any) = &clause.any {
        let mut items = Vec::new();
        for child in any {
            items.push(compile_inner(child)?);
        }
        parts.push(BodyPredicate::Any(items));
    }
    if let Some(not) = &clause.not {
        parts.push(BodyPredicate::Not(Box::new(compile_inner(not)?)));
    }
    Ok(if parts.len() == 1 {
        parts.pop().expect("len checked above")
    } else {
        BodyPredicate::All(parts)
    })
}

/// Inlines a nested `All` so repeated flattening doesn't build deep chains
/// of single-member `All` wrappers.
fn flatten_into(target: &mut Vec<BodyPredicate>, item: BodyPredicate) {
    match item {
        BodyPredicate::All(children) => target.extend(children),
        other => target.push(other),
    }
}

fn make_extractor(content_type: BodyContentType, extractor_path: &str) -> Extractor {
    match content_type {
        BodyContentType::Raw => Extractor::Raw,
        BodyContentType::Json => Extractor::Json(extractor_path.to_string()),
        BodyContentType::Xml => Extractor::Xml(extractor_path.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockyaml_core::schema::{BodyCondition, StringMatcher};

    #[test]
    fn single_condition_emits_one_tagged_predicate() {
        let clause = BodyClause {
            content_type: BodyContentType::Json,
            conditions: vec![BodyCondition {
                extractor: "$.method".to_string(),
                matcher: StringMatcher::Exact("paypal".to_string()),
            }],
            ..Default::default()
        };
        let preds = compile_top(&clause).unwrap();
        assert_eq!(preds.len(), 1);
        assert_eq!(preds[0].field_tag, "body:$.method");
    }

    #[test]
    fn any_combinator_matches_when_one_child_matches() {
        let clause = BodyClause {
            content_type: BodyContentType::Json,
            any: Some(vec![
                BodyClause {
                    content_type: BodyContentType::Json,
                    conditions: vec![BodyCondition {
                        extractor: "$.method".to_string(),
                        matcher: StringMatcher::Exact("credit_card".to_string()),
                    }],
                    ..Default::default()
                },
                BodyClause {
                    content_type: BodyContentType::Json,
                    conditions: vec![BodyCondition {
                        extractor: "$.method".to_string(),
                        matcher: StringMatcher::Exact("paypal".to_string()),
                    }],
                    ..Default::default()
                },
            ]),
            ..Default::default()
        };
        let preds = compile_top(&clause).unwrap();
        assert_eq!(preds.len(), 1);
        assert_eq!(preds[0].field_tag, "body:any");
        let FieldPredicateKind::Body(bp) = &preds[0].kind else {
            panic!("expected body predicate")
        };
        assert!(bp.eval(r#"{"method":"paypal"}"#));
        assert!(bp.eval(r#"{"method":"credit_card"}"#));
        assert!(!bp.eval(r#"{"method":"cash"}"#));
    }
}
