//! Content extractors: pull a scalar string out of a request body so a
//! [`crate::predicate::Predicate`] can be applied to it.
//!
//! Extraction strategy is chosen once at compile time from the clause's
//! `content_type` and baked into the extractor value — there is no runtime
//! if-ladder on content type on the request path.

use serde_json::Value as JsonValue;

/// A compiled content extractor.
#[derive(Debug, Clone)]
pub enum Extractor {
    /// No structured parsing; the raw body bytes are the value.
    Raw,
    /// JSONPath expression evaluated against the body parsed as JSON.
    Json(String),
    /// XPath expression evaluated against the body parsed as XML.
    Xml(String),
}

impl Extractor {
    /// Extracts a value from the given raw body.
    ///
    /// Returns `None` on parse failure or extractor miss; callers treat a
    /// miss as a failed predicate, never a crash.
    pub fn extract(&self, body: &str) -> Option<String> {
        match self {
            Extractor::Raw => Some(body.to_string()),
            Extractor::Json(path) => extract_json(body, path),
            Extractor::Xml(path) => extract_xml(body, path),
        }
    }
}

fn extract_json(body: &str, path: &str) -> Option<String> {
    let value: JsonValue = serde_json::from_str(body).ok()?;
    let found = jsonpath_lib::select(&value, path).ok()?;
    let first = found.into_iter().next()?;
    Some(stringify_json(first))
}

fn stringify_json(v: &JsonValue) -> String {
    match v {
        JsonValue::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn extract_xml(body: &str, path: &str) -> Option<String> {
    let package = sxd_document::parser::parse(body).ok()?;
    let document = package.as_document();
    let value = sxd_xpath::evaluate_xpath(&document, path).ok()?;
    Some(value.string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_returns_body_unchanged() {
        assert_eq!(Extractor::Raw.extract("hello").as_deref(), Some("hello"));
    }

    #[test]
    fn json_extracts_scalar_string() {
        let body = r#"{"method":"credit_card"}"#;
        let v = Extractor::Json("$.method".to_string()).extract(body);
        assert_eq!(v.as_deref(), Some("credit_card"));
    }

    #[test]
    fn json_extracts_nested_number_as_string() {
        let body = r#"{"method":{"params":{"contract_id":"100100"}}}"#;
        let v = Extractor::Json("$.method.params.contract_id".to_string()).extract(body);
        assert_eq!(v.as_deref(), Some("100100"));
    }

    #[test]
    fn json_parse_failure_returns_none() {
        let v = Extractor::Json("$.x".to_string()).extract("not json");
        assert_eq!(v, None);
    }

    #[test]
    fn json_missing_path_returns_none() {
        let v = Extractor::Json("$.nope".to_string()).extract(r#"{"a":1}"#);
        assert_eq!(v, None);
    }

    #[test]
    fn xml_extracts_text() {
        let body = "<root><method>paypal</method></root>";
        let v = Extractor::Xml("/root/method/text()".to_string()).extract(body);
        assert_eq!(v.as_deref(), Some("paypal"));
    }
}
