mod common;

use std::time::Duration;

use axum::body::{self, Body};
use axum::http::{Request, StatusCode};
use tower::ServiceExt;

#[tokio::test]
async fn admin_reload_picks_up_a_newly_written_scenario() {
    let dir = tempfile::tempdir().unwrap();
    common::write_scenario(
        dir.path(),
        "a.yaml",
        "id: a\nwhen: {method: GET, path: /x}\nresponse: {body: before}\n",
    );
    let app = common::build_app(dir.path()).await;

    let before = app
        .clone()
        .oneshot(Request::get("/x").body(Body::empty()).unwrap())
        .await
        .unwrap();
    let bytes = body::to_bytes(before.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&bytes[..], b"before");

    common::write_scenario(
        dir.path(),
        "b.yaml",
        "id: b\npriority: 5\nwhen: {method: GET, path: /x}\nresponse: {body: after}\n",
    );

    let reload = app
        .clone()
        .oneshot(Request::post("/__admin/reload").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(reload.status(), StatusCode::OK);

    let after = app
        .oneshot(Request::get("/x").body(Body::empty()).unwrap())
        .await
        .unwrap();
    let bytes = body::to_bytes(after.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&bytes[..], b"after");
}

#[tokio::test]
async fn in_flight_requests_are_unaffected_by_a_concurrent_reload() {
    let dir = tempfile::tempdir().unwrap();
    common::write_scenario(
        dir.path(),
        "slow.yaml",
        r#"
id: slow
when: {method: GET, path: /slow}
response: {body: original}
policy:
  latency: {fixed_ms: 50}
"#,
    );
    let app = common::build_app(dir.path()).await;

    let app_for_request = app.clone();
    let in_flight = tokio::spawn(async move {
        app_for_request
            .oneshot(Request::get("/slow").body(Body::empty()).unwrap())
            .await
            .unwrap()
    });

    // Give the spawned request time to resolve its candidate and enter the
    // latency sleep before the reload below swaps the router out from
    // under it.
    tokio::time::sleep(Duration::from_millis(10)).await;

    // Overwrite the scenario file and force a reload while the first
    // request's latency sleep is still in progress; the router swap must
    // not affect a request that already resolved its candidate list.
    common::write_scenario(
        dir.path(),
        "slow.yaml",
        "id: slow\nwhen: {method: GET, path: /slow}\nresponse: {body: replaced}\n",
    );
    let _ = app
        .clone()
        .oneshot(Request::post("/__admin/reload").body(Body::empty()).unwrap())
        .await
        .unwrap();

    let resp = in_flight.await.unwrap();
    let bytes = body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&bytes[..], b"original");
}
