//! mockyaml-core — shared scenario schema and configuration error types.
//!
//! This crate holds the declarative, serde-deserializable scenario schema
//! (the YAML-facing types) and the error types produced while loading and
//! validating it. The `mockyaml` crate depends on this one for the schema
//! and compiles it into the runtime (`CompiledScenario`) forms.

pub mod error;
pub mod schema;
