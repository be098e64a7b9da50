//! Pagination service: a pure function from rendered body bytes, policy,
//! and query params to an envelope-wrapped JSON slice.

use indexmap::IndexMap;
use mockyaml_core::schema::{PaginationPolicy, PaginationStyle};
use serde_json::{Map, Value};

use crate::error::{MockError, Result};

/// Post-processes rendered response bytes into a pagination envelope.
///
/// Pure: identical inputs always produce identical output bytes (modulo
/// unspecified JSON object key ordering).
pub fn paginate(
    body_bytes: &[u8],
    cfg: &PaginationPolicy,
    query_params: &IndexMap<String, String>,
) -> Result<Vec<u8>> {
    let body: Value = serde_json::from_slice(body_bytes)
        .map_err(|e| MockError::Pagination(format!("body is not valid JSON: {e}")))?;

    let array = resolve_array(&body, &cfg.data_path)?;
    let total_items = array.len() as u64;

    let (offset, limit) = derive_offset_limit(cfg, query_params);

    let offset = offset.min(total_items);
    let end = (offset + limit).min(total_items);
    let data: Vec<Value> = array[offset as usize..end as usize].to_vec();

    let total_pages = if limit == 0 {
        1
    } else {
        total_items.div_ceil(limit).max(1)
    };
    let current_page = if limit == 0 { 1 } else { offset / limit + 1 };
    let has_next = end < total_items;
    let has_previous = offset > 0;

    let mut envelope = Map::new();
    envelope.insert(cfg.envelope.data.clone(), Value::Array(data));
    envelope.insert(cfg.envelope.page.clone(), Value::from(current_page));
    envelope.insert(cfg.envelope.size.clone(), Value::from(limit));
    envelope.insert(cfg.envelope.total_items.clone(), Value::from(total_items));
    envelope.insert(cfg.envelope.total_pages.clone(), Value::from(total_pages));
    envelope.insert(cfg.envelope.has_next.clone(), Value::from(has_next));
    envelope.insert(
        cfg.envelope.has_previous.clone(),
        Value::from(has_previous),
    );

    serde_json::to_vec(&Value::Object(envelope))
        .map_err(|e| MockError::Pagination(format!("encoding envelope: {e}")))
}

fn resolve_array<'a>(body: &'a Value, data_path: &str) -> Result<&'a Vec<Value>> {
    if data_path == "$" {
        return body
            .as_array()
            .ok_or_else(|| MockError::Pagination("root is not an array".to_string()));
    }
    let found = jsonpath_lib::select(body, data_path)
        .map_err(|e| MockError::Pagination(format!("evaluating data_path '{data_path}': {e}")))?;
    let first = found
        .into_iter()
        .next()
        .ok_or_else(|| MockError::Pagination(format!("data_path '{data_path}' found nothing")))?;
    first
        .as_array()
        .ok_or_else(|| MockError::Pagination(format!("data_path '{data_path}' is not an array")))
}

fn derive_offset_limit(cfg: &PaginationPolicy, query: &IndexMap<String, String>) -> (u64, u64) {
    let mut limit = query
        .get(&cfg.size_param)
        .and_then(|v| v.parse::<u64>().ok())
        .filter(|v| *v > 0)
        .unwrap_or(cfg.default_size);
    if cfg.max_size == 0 || limit > cfg.max_size {
        limit = if cfg.max_size == 0 { 10 } else { cfg.max_size };
    }
    if limit == 0 {
        limit = 10;
    }

    let offset = match cfg.style {
        PaginationStyle::PageSize => {
            let page = query
                .get(&cfg.page_param)
                .and_then(|v| v.parse::<u64>().ok())
                .filter(|v| *v > 0)
                .unwrap_or(1)
                .max(1);
            (page - 1) * limit
        }
        PaginationStyle::OffsetLimit => query
            .get(&cfg.offset_param)
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(0),
    };
    (offset, limit)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg() -> PaginationPolicy {
        PaginationPolicy {
            style: PaginationStyle::PageSize,
            page_param: "page".to_string(),
            size_param: "size".to_string(),
            offset_param: "offset".to_string(),
            limit_param: "limit".to_string(),
            default_size: 5,
            max_size: 100,
            data_path: "$.items".to_string(),
            envelope: Default::default(),
        }
    }

    fn body_with_n_items(n: usize) -> Vec<u8> {
        let items: Vec<Value> = (1..=n as i64).map(Value::from).collect();
        serde_json::to_vec(&serde_json::json!({ "items": items })).unwrap()
    }

    #[test]
    fn page_2_size_5_of_20_items() {
        let body = body_with_n_items(20);
        let mut q = IndexMap::new();
        q.insert("page".to_string(), "2".to_string());
        q.insert("size".to_string(), "5".to_string());
        let out = paginate(&body, &cfg(), &q).unwrap();
        let v: Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(v["page"], 2);
        assert_eq!(v["size"], 5);
        assert_eq!(v["total_items"], 20);
        assert_eq!(v["total_pages"], 4);
        assert_eq!(v["has_next"], true);
        assert_eq!(v["has_previous"], true);
        assert_eq!(v["data"], serde_json::json!([6, 7, 8, 9, 10]));
    }

    #[test]
    fn page_beyond_last_is_empty_but_total_items_correct() {
        let body = body_with_n_items(3);
        let mut q = IndexMap::new();
        q.insert("page".to_string(), "5".to_string());
        let out = paginate(&body, &cfg(), &q).unwrap();
        let v: Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(v["data"], serde_json::json!([]));
        assert_eq!(v["has_next"], false);
        assert_eq!(v["total_items"], 3);
    }

    #[test]
    fn limit_clamps_to_max_size() {
        let mut c = cfg();
        c.max_size = 2;
        let body = body_with_n_items(10);
        let mut q = IndexMap::new();
        q.insert("size".to_string(), "9".to_string());
        let out = paginate(&body, &c, &q).unwrap();
        let v: Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(v["size"], 2);
    }

    #[test]
    fn non_numeric_query_params_fall_back_to_defaults() {
        let body = body_with_n_items(10);
        let mut q = IndexMap::new();
        q.insert("page".to_string(), "not-a-number".to_string());
        let out = paginate(&body, &cfg(), &q).unwrap();
        let v: Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(v["page"], 1);
    }

    #[test]
    fn empty_array_has_total_pages_one() {
        let body = body_with_n_items(0);
        let q = IndexMap::new();
        let out = paginate(&body, &cfg(), &q).unwrap();
        let v: Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(v["total_pages"], 1);
        assert_eq!(v["data"], serde_json::json!([]));
    }

    #[test]
    fn offset_limit_style() {
        let mut c = cfg();
        c.style = PaginationStyle::OffsetLimit;
        let body = body_with_n_items(10);
        let mut q = IndexMap::new();
        q.insert("offset".to_string(), "3".to_string());
        // Per the spec, limit is always derived from `size_param`
        // regardless of style ("limit as above").
        q.insert("size".to_string(), "4".to_string());
        let out = paginate(&body, &c, &q).unwrap();
        let v: Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(v["data"], serde_json::json!([4, 5, 6, 7]));
    }
}
