mod common;

use axum::body::{self, Body};
use axum::http::{Request, StatusCode};
use serde_json::Value;
use tower::ServiceExt;

#[tokio::test]
async fn list_scenarios_returns_every_loaded_scenario() {
    let dir = tempfile::tempdir().unwrap();
    common::write_scenario(
        dir.path(),
        "a.yaml",
        "id: a\nname: Scenario A\nwhen: {method: GET, path: /a}\nresponse: {body: x}\n",
    );
    common::write_scenario(
        dir.path(),
        "b.yaml",
        "id: b\nname: Scenario B\nwhen: {method: POST, path: /b}\nresponse: {body: y}\n",
    );
    let app = common::build_app(dir.path()).await;

    let resp = app
        .oneshot(Request::get("/__admin/scenarios").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let bytes = body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let list: Value = serde_json::from_slice(&bytes).unwrap();
    let ids: Vec<&str> = list.as_array().unwrap().iter().map(|v| v["id"].as_str().unwrap()).collect();
    assert!(ids.contains(&"a"));
    assert!(ids.contains(&"b"));
}

#[tokio::test]
async fn search_filters_by_substring_case_insensitively() {
    let dir = tempfile::tempdir().unwrap();
    common::write_scenario(
        dir.path(),
        "a.yaml",
        "id: login-flow\nname: Login Flow\nwhen: {method: GET, path: /a}\nresponse: {body: x}\n",
    );
    common::write_scenario(
        dir.path(),
        "b.yaml",
        "id: logout-flow\nname: Logout Flow\nwhen: {method: GET, path: /b}\nresponse: {body: y}\n",
    );
    let app = common::build_app(dir.path()).await;

    let resp = app
        .oneshot(
            Request::get("/__admin/scenarios/search?q=LOGIN")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let bytes = body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let list: Value = serde_json::from_slice(&bytes).unwrap();
    let ids: Vec<&str> = list.as_array().unwrap().iter().map(|v| v["id"].as_str().unwrap()).collect();
    assert_eq!(ids, vec!["login-flow"]);
}

#[tokio::test]
async fn scenario_detail_includes_raw_yaml() {
    let dir = tempfile::tempdir().unwrap();
    common::write_scenario(
        dir.path(),
        "a.yaml",
        "id: a\nwhen: {method: GET, path: /a}\nresponse: {body: x}\n",
    );
    let app = common::build_app(dir.path()).await;

    let resp = app
        .oneshot(Request::get("/__admin/scenarios/a").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let bytes = body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let detail: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(detail["id"], "a");
    assert!(detail["raw_yaml"].as_str().unwrap().contains("id: a"));
}

#[tokio::test]
async fn trace_records_requests_and_reports_the_last_n() {
    let dir = tempfile::tempdir().unwrap();
    common::write_scenario(
        dir.path(),
        "a.yaml",
        "id: a\nwhen: {method: GET, path: /a}\nresponse: {body: x}\n",
    );
    let app = common::build_app(dir.path()).await;

    for _ in 0..3 {
        let _ = app
            .clone()
            .oneshot(Request::get("/a").body(Body::empty()).unwrap())
            .await
            .unwrap();
    }

    let resp = app
        .oneshot(Request::get("/__admin/trace?last=2").body(Body::empty()).unwrap())
        .await
        .unwrap();
    let bytes = body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let entries: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(entries.as_array().unwrap().len(), 2);
    assert_eq!(entries[1]["matched_id"], "a");
}
