//! HTTP API tests, driven through the router without binding a socket.

#![cfg(feature = "server")]

mod common;

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use common::{orchestrator, pdf_bytes, ScriptedConverter, FAIL_MARKER, FAIL_MESSAGE};
use drop2md::server::{build_router, AppState, ErrorBody};
use drop2md::{AppConfig, BatchOrchestrator, ConversionGateway, ConversionStats};
use std::io::Read;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

const BOUNDARY: &str = "drop2md-test-boundary";

fn router(root: &Path, converter: Arc<ScriptedConverter>) -> Router {
    build_router(AppState::new(orchestrator(root, converter)))
}

/// multipart/form-data body with one `files` field per upload.
fn multipart(files: Vec<(&str, Vec<u8>)>) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, bytes) in files {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\n\
                 Content-Disposition: form-data; name=\"files\"; filename=\"{name}\"\r\n\
                 Content-Type: application/octet-stream\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(&bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

fn post(uri: &str, files: Vec<(&str, Vec<u8>)>) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(multipart(files)))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn body_bytes(response: axum::response::Response) -> Vec<u8> {
    to_bytes(response.into_body(), usize::MAX).await.unwrap().to_vec()
}

async fn json<T: serde::de::DeserializeOwned>(response: axum::response::Response) -> T {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

fn header_str<'a>(response: &'a axum::response::Response, name: &str) -> &'a str {
    response.headers()[name].to_str().unwrap()
}

#[tokio::test]
async fn index_serves_the_drop_page() {
    let dir = tempfile::tempdir().unwrap();
    let response = router(dir.path(), ScriptedConverter::new())
        .oneshot(get("/"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let html = String::from_utf8(body_bytes(response).await).unwrap();
    assert!(html.contains("/api/convert"));
}

#[tokio::test]
async fn health_and_config() {
    let dir = tempfile::tempdir().unwrap();
    let app = router(dir.path(), ScriptedConverter::new());

    let health: serde_json::Value = json(app.clone().oneshot(get("/health")).await.unwrap()).await;
    assert_eq!(health["status"], "ok");

    let config: serde_json::Value = json(app.oneshot(get("/api/config")).await.unwrap()).await;
    let extensions = config["supported_extensions"].as_array().unwrap();
    assert!(extensions.iter().any(|e| e == "pdf"));
    assert_eq!(config["max_file_size_bytes"], 1024 * 1024);
    assert_eq!(config["max_file_size_display"], "1.0 MB");
}

#[tokio::test]
async fn file_info_describes_and_flags_uploads() {
    let dir = tempfile::tempdir().unwrap();
    let converter = ScriptedConverter::new();
    let app = router(dir.path(), converter.clone());

    let response = app
        .oneshot(post(
            "/api/file-info",
            vec![("report.pdf", pdf_bytes(2048)), ("setup.exe", b"MZ".to_vec())],
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let entries: Vec<serde_json::Value> = json(response).await;
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0]["name"], "report.pdf");
    assert_eq!(entries[0]["size_display"], "2.0 KB");
    assert_eq!(entries[0]["type_label"], "📄 PDF Document");
    assert!(entries[0]["rejection"].is_null());
    assert!(entries[1]["rejection"].as_str().unwrap().contains("exe"));
    assert_eq!(converter.calls(), 0);
}

#[tokio::test]
async fn convert_single_file_returns_markdown_with_stats() {
    let dir = tempfile::tempdir().unwrap();
    let app = router(dir.path(), ScriptedConverter::new());

    let response = app
        .clone()
        .oneshot(post("/api/convert", vec![("report.pdf", pdf_bytes(12_345))]))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        header_str(&response, "content-type"),
        "text/markdown; charset=utf-8"
    );
    assert!(header_str(&response, "content-disposition").contains("filename=\"report.md\""));
    assert_eq!(header_str(&response, "x-drop2md-files"), "1");
    assert_eq!(header_str(&response, "x-drop2md-chars"), "2000");
    assert_eq!(header_str(&response, "x-drop2md-words"), "300");

    let markdown = String::from_utf8(body_bytes(response).await).unwrap();
    assert_eq!(markdown.chars().count(), 2000);

    let stats: ConversionStats =
        json(app.oneshot(get("/api/history/stats")).await.unwrap()).await;
    assert_eq!(stats.total_conversions, 1);
    assert_eq!(stats.most_common_format, "pdf");
}

#[tokio::test]
async fn convert_batch_returns_zip() {
    let dir = tempfile::tempdir().unwrap();
    let app = router(dir.path(), ScriptedConverter::new());

    let response = app
        .oneshot(post(
            "/api/convert",
            vec![("a.docx", b"alpha".to_vec()), ("b.png", b"beta".to_vec())],
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(header_str(&response, "content-type"), "application/zip");
    assert!(header_str(&response, "content-disposition").contains("drop2md_results.zip"));
    assert_eq!(header_str(&response, "x-drop2md-files"), "2");

    let bytes = body_bytes(response).await;
    let mut archive = zip::ZipArchive::new(std::io::Cursor::new(bytes)).unwrap();
    let mut names: Vec<String> = archive.file_names().map(str::to_string).collect();
    names.sort();
    assert_eq!(names, ["a.md", "b.md"]);

    let mut text = String::new();
    archive
        .by_name("b.md")
        .unwrap()
        .read_to_string(&mut text)
        .unwrap();
    assert!(text.contains("beta"));
}

#[tokio::test]
async fn converter_failure_is_unprocessable() {
    let dir = tempfile::tempdir().unwrap();
    let converter = ScriptedConverter::new();
    let app = router(dir.path(), converter.clone());

    let response = app
        .clone()
        .oneshot(post(
            "/api/convert",
            vec![
                ("a.txt", b"ok".to_vec()),
                ("b.pdf", FAIL_MARKER.to_vec()),
                ("c.txt", b"skipped".to_vec()),
            ],
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let body: ErrorBody = json(response).await;
    assert_eq!(body.error, "conversion_failed");
    assert!(body.detail.contains("b.pdf"));
    assert!(body.detail.contains(FAIL_MESSAGE));
    assert_eq!(converter.calls(), 2);

    let stats: ConversionStats =
        json(app.oneshot(get("/api/history/stats")).await.unwrap()).await;
    assert_eq!(stats.total_conversions, 0);
    assert_eq!(stats.most_common_format, "None");
}

#[tokio::test]
async fn unsupported_upload_is_rejected_before_conversion() {
    let dir = tempfile::tempdir().unwrap();
    let converter = ScriptedConverter::new();
    let app = router(dir.path(), converter.clone());

    let response = app
        .oneshot(post(
            "/api/convert",
            vec![("a.txt", b"ok".to_vec()), ("setup.exe", b"MZ".to_vec())],
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
    let body: ErrorBody = json(response).await;
    assert_eq!(body.error, "unsupported_format");
    assert_eq!(converter.calls(), 0);
}

#[tokio::test]
async fn oversized_upload_is_too_large() {
    let dir = tempfile::tempdir().unwrap();
    let app = router(dir.path(), ScriptedConverter::new());

    let big = pdf_bytes(1024 * 1024 + 1);
    let response = app
        .oneshot(post("/api/convert", vec![("big.pdf", big)]))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    let body: ErrorBody = json(response).await;
    assert_eq!(body.error, "file_too_large");
}

#[tokio::test]
async fn empty_form_is_bad_request() {
    let dir = tempfile::tempdir().unwrap();
    let app = router(dir.path(), ScriptedConverter::new());

    let response = app.oneshot(post("/api/convert", vec![])).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: ErrorBody = json(response).await;
    assert_eq!(body.error, "empty_batch");
}

#[tokio::test]
async fn request_body_over_cap_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let config = AppConfig::builder()
        .temp_dir(dir.path().join("temp"))
        .output_dir(dir.path().join("output"))
        .max_file_size_bytes(1024)
        .max_request_bytes(2048)
        .build()
        .unwrap();
    let converter = ScriptedConverter::new();
    let gateway = ConversionGateway::new(converter.clone(), Duration::from_secs(10));
    let app = build_router(AppState::new(BatchOrchestrator::new(config, gateway)));

    // Every file is under the per-file limit; together they exceed the cap.
    let files = ["a.pdf", "b.pdf", "c.pdf", "d.pdf"]
        .into_iter()
        .map(|name| (name, pdf_bytes(1000)))
        .collect();
    let response = app.oneshot(post("/api/convert", files)).await.unwrap();
    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    let body: ErrorBody = json(response).await;
    assert_eq!(body.error, "invalid_upload");
    assert_eq!(converter.calls(), 0);
}
