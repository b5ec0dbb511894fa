//! HTTP router tests

mod common;

use std::io::{Cursor, Read};
use std::sync::Arc;

use axum::body::Body;
use axum::Router;
use http::{header, Method, Request, StatusCode};
use openapi_server::models::{ApiReturn, ApiStatus};
use tower::ServiceExt;

use cloudbridge::server::serve::router;
use cloudbridge::server::state::ServerState;

use common::{valid_params_json, Fixture, WAIT_LIMIT};

fn app(fixture: &Fixture) -> Router {
    router(Arc::new(ServerState::new(Arc::new(fixture.coordinator()))))
}

async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    body: Option<serde_json::Value>,
) -> (StatusCode, Vec<u8>) {
    let mut request = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(json) => {
            request = request.header(header::CONTENT_TYPE, "application/json");
            Body::from(json.to_string())
        }
        None => Body::empty(),
    };

    let response = app
        .clone()
        .oneshot(request.body(body).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, bytes.to_vec())
}

async fn send_json(
    app: &Router,
    method: Method,
    uri: &str,
    body: Option<serde_json::Value>,
) -> ApiReturn {
    let (status, bytes) = send(app, method, uri, body).await;
    assert_eq!(status, StatusCode::OK);
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_health() {
    let fixture = Fixture::new(0);
    let (status, bytes) = send(&app(&fixture), Method::GET, "/health", None).await;

    assert_eq!(status, StatusCode::OK);
    let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(json["status"], "healthy");
}

#[tokio::test]
async fn test_status_without_deployment() {
    let fixture = Fixture::new(0);
    let (status, bytes) = send(&app(&fixture), Method::GET, "/v1/deployment", None).await;

    assert_eq!(status, StatusCode::OK);
    let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(
        json,
        serde_json::json!({ "status": "STATUS_SUCCESS", "message": "", "data": {} })
    );
}

#[tokio::test]
async fn test_deployment_lifecycle_over_http() {
    let fixture = Fixture::new(0);
    let app = app(&fixture);

    let ret = send_json(&app, Method::POST, "/v1/deployment", Some(valid_params_json())).await;
    assert_eq!(ret.status, ApiStatus::Success);
    assert_eq!(ret.message, "Deployment Started Successfully");

    let ret = send_json(&app, Method::DELETE, "/v1/deployment", Some(valid_params_json())).await;
    assert_eq!(ret.status, ApiStatus::Fail);
    assert_eq!(ret.message, "Another deployment is in progress");

    fixture.open_gate();
    let halted = tokio::time::timeout(WAIT_LIMIT, async {
        loop {
            let ret = send_json(&app, Method::GET, "/v1/deployment", None).await;
            let data = ret.data.clone().unwrap_or_default();
            if data.state.as_deref() == Some("STATE_HALTED") {
                return ret;
            }
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        }
    })
    .await
    .unwrap();
    assert_eq!(halted.data.unwrap().exit_value, Some(0));

    let ret = send_json(&app, Method::GET, "/v1/deployment", None).await;
    assert_eq!(ret.message, "");
    assert_eq!(ret.data.unwrap().state, None);
}

#[tokio::test]
async fn test_invalid_params_rejected_with_reason() {
    let fixture = Fixture::new(0);
    let mut params = valid_params_json();
    params["vpcId"] = serde_json::json!("");

    let ret = send_json(&app(&fixture), Method::POST, "/v1/deployment", Some(params)).await;
    assert_eq!(ret.status, ApiStatus::Fail);
    assert_eq!(ret.message, "Invalid VPC ID");
}

#[tokio::test]
async fn test_malformed_body_is_error_envelope() {
    let fixture = Fixture::new(0);
    let app = app(&fixture);

    let ret = send_json(
        &app,
        Method::POST,
        "/v1/deployment",
        Some(serde_json::json!({ "region": 42 })),
    )
    .await;
    assert_eq!(ret.status, ApiStatus::Error);
    assert!(!ret.message.is_empty());

    // Nothing was admitted
    let ret = send_json(&app, Method::POST, "/v1/deployment", Some(valid_params_json())).await;
    assert_eq!(ret.status, ApiStatus::Success);
    fixture.open_gate();
}

#[tokio::test]
async fn test_logs_download_bundles_existing_files() {
    let fixture = Fixture::new(0);
    let app = app(&fixture);

    let (status, bytes) = send(&app, Method::GET, "/v1/deployment/logs", None).await;
    assert_eq!(status, StatusCode::OK);
    let zip = zip::ZipArchive::new(Cursor::new(&bytes)).unwrap();
    assert_eq!(zip.len(), 0);

    std::fs::create_dir_all(fixture.logs_dir()).unwrap();
    std::fs::write(fixture.logs_dir().join("deploy.log"), "tool deploy\n").unwrap();

    let (_, bytes) = send(&app, Method::GET, "/v1/deployment/logs", None).await;
    let mut zip = zip::ZipArchive::new(Cursor::new(&bytes)).unwrap();
    assert_eq!(zip.len(), 1);
    let mut contents = String::new();
    zip.by_name("deploy.log")
        .unwrap()
        .read_to_string(&mut contents)
        .unwrap();
    assert_eq!(contents, "tool deploy\n");
}
