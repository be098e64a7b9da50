mod common;

use axum::body::{self, Body};
use axum::http::Request;
use serde_json::Value;
use tower::ServiceExt;

#[tokio::test]
async fn page_size_pagination_slices_and_wraps_in_envelope() {
    let dir = tempfile::tempdir().unwrap();
    common::write_scenario(
        dir.path(),
        "list.yaml",
        r#"
id: list
when: {method: GET, path: /items}
response:
  body: '[1,2,3,4,5]'
  content_type: application/json
policy:
  pagination: {}
"#,
    );
    let app = common::build_app(dir.path()).await;

    let resp = app
        .oneshot(Request::get("/items?page=1&size=2").body(Body::empty()).unwrap())
        .await
        .unwrap();
    let bytes = body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let envelope: Value = serde_json::from_slice(&bytes).unwrap();

    assert_eq!(envelope["data"], serde_json::json!([1, 2]));
    assert_eq!(envelope["page"], 1);
    assert_eq!(envelope["size"], 2);
    assert_eq!(envelope["total_items"], 5);
    assert_eq!(envelope["total_pages"], 3);
    assert_eq!(envelope["has_next"], true);
    assert_eq!(envelope["has_previous"], false);
}

#[tokio::test]
async fn offset_limit_pagination_honors_style() {
    let dir = tempfile::tempdir().unwrap();
    common::write_scenario(
        dir.path(),
        "list.yaml",
        r#"
id: list
when: {method: GET, path: /items}
response:
  body: '[10,20,30,40]'
  content_type: application/json
policy:
  pagination: {style: offset_limit}
"#,
    );
    let app = common::build_app(dir.path()).await;

    let resp = app
        .oneshot(
            Request::get("/items?offset=1&limit=2")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let bytes = body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let envelope: Value = serde_json::from_slice(&bytes).unwrap();

    assert_eq!(envelope["data"], serde_json::json!([20, 30]));
    assert_eq!(envelope["has_previous"], true);
}
