//! String-level predicate algebra.
//!
//! A predicate is a total function from `&str` to `bool`. Predicates are
//! modeled as plain data (an enum of variants) rather than trait objects:
//! composition (`And`/`Or`/`Not`) is then just building a bigger value,
//! with no dynamic dispatch on the request path.

use mockyaml_core::schema::StringMatcher;
use regex::Regex;

use crate::error::{MockError, Result};

/// A compiled string predicate.
#[derive(Debug, Clone)]
pub enum Predicate {
    /// True for any input.
    Always,
    /// True iff the input equals the given string exactly.
    Exact(String),
    /// True iff the compiled regex finds a match anywhere in the input.
    Regex(Regex),
    /// True iff every child predicate is true. Empty is true.
    And(Vec<Predicate>),
    /// True iff any child predicate is true. Empty is false.
    Or(Vec<Predicate>),
    /// Negation of the child predicate.
    Not(Box<Predicate>),
}

impl Predicate {
    /// Evaluates the predicate against a string, short-circuiting `And`/`Or`
    /// left to right.
    pub fn eval(&self, input: &str) -> bool {
        match self {
            Predicate::Always => true,
            Predicate::Exact(s) => input == s,
            Predicate::Regex(re) => re.is_match(input),
            Predicate::And(ps) => ps.iter().all(|p| p.eval(input)),
            Predicate::Or(ps) => ps.iter().any(|p| p.eval(input)),
            Predicate::Not(p) => !p.eval(input),
        }
    }

    /// Compiles a declarative `StringMatcher` into a `Predicate`.
    ///
    /// Regex compilation failure is a load-time error surfaced to the
    /// caller with the offending pattern.
    pub fn compile(matcher: &StringMatcher) -> Result<Predicate> {
        Ok(match matcher {
            StringMatcher::Always => Predicate::Always,
            StringMatcher::Exact(s) => Predicate::Exact(s.clone()),
            StringMatcher::Pattern(p) => {
                let re = Regex::new(p).map_err(|e| MockError::Compile {
                    id: String::new(),
                    message: format!("invalid regex '{p}': {e}"),
                })?;
                Predicate::Regex(re)
            }
        })
    }
}
