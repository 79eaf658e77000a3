//! Router harness: the real app wired to offline collaborators.

use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use serde_json::Value;
use server_core::server::{build_app, AppState};
use tower::ServiceExt;
use verification::clients::PreprintRecord;
use verification::testing::{
    MockMetadataSource, MockNetworkSource, MockPageFetcher, MockPreprintSource, MockUrlChecker,
};
use verification::Verifier;

pub const BOUNDARY: &str = "test-boundary-7MA4YWxkTrZu0gW";

/// App whose registries know only the GPT-3 preprint.
pub fn test_app() -> Router {
    let gpt3 = PreprintRecord {
        arxiv_id: "2005.14165".into(),
        title: "Language Models are Few-Shot Learners".into(),
        authors: vec!["Tom B. Brown".into(), "Benjamin Mann".into()],
        year: Some(2020),
    };
    let verifier = Verifier::builder()
        .crossref(Arc::new(MockMetadataSource::new()))
        .arxiv(Arc::new(MockPreprintSource::new().with_preprint(gpt3)))
        .openalex(Arc::new(MockNetworkSource::new()))
        .url_check(Arc::new(MockUrlChecker::new()))
        .fetcher(Arc::new(MockPageFetcher::new()))
        .current_year(2025)
        .build();
    build_app(AppState::new(verifier), &[])
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

pub async fn post_json(app: Router, path: &str, body: Value) -> (StatusCode, Value) {
    let request = Request::post(path)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    send(app, request).await
}

pub async fn get_json(app: Router, path: &str) -> (StatusCode, Value) {
    let request = Request::get(path).body(Body::empty()).unwrap();
    send(app, request).await
}

/// Multipart upload of one file plus plain form fields.
pub async fn post_file(
    app: Router,
    path: &str,
    filename: &str,
    contents: &[u8],
    fields: &[(&str, &str)],
) -> (StatusCode, Value) {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
    }
    body.extend_from_slice(
        format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{filename}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(contents);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

    let request = Request::post(path)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap();
    send(app, request).await
}
