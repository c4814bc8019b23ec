//! # Integration Tests for bootimg-server
//!
//! Drives the full router with `tower::ServiceExt::oneshot`: image downloads
//! (full, ranged, HEAD), 404s for unknown and removed images, health probes,
//! and the metrics endpoint.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, Response, StatusCode};
use bootimg_core::{
    BaseTemplate, ComposeError, ImageFormat, ImageSource, MemoryImage, Naming, TemplateStore,
};
use bootimg_handler::ImageHandler;
use bootimg_server::state::AppState;
use http_body_util::BodyExt;
use metrics_exporter_prometheus::PrometheusBuilder;
use tower::ServiceExt;

const BASE: &str = "http://localhost:8080";

fn templates() -> TemplateStore {
    TemplateStore::new(
        BaseTemplate::from_bytes(ImageFormat::Iso, b"ISO-TEMPLATE".to_vec()),
        BaseTemplate::from_bytes(ImageFormat::Initrd, b"INITRD-TEMPLATE".to_vec()),
    )
    .unwrap()
}

/// Helper: handler whose composer serves the payload bytes verbatim.
fn verbatim_handler() -> ImageHandler {
    ImageHandler::new(
        BASE,
        templates(),
        Arc::new(|_: &Arc<BaseTemplate>, config: &[u8]| {
            Ok::<_, ComposeError>(Arc::new(MemoryImage::new(config.to_vec())) as Arc<dyn ImageSource>)
        }),
    )
    .unwrap()
}

/// Helper: handler using the default cpio composer.
fn cpio_handler() -> ImageHandler {
    ImageHandler::with_default_composer(BASE, templates()).unwrap()
}

fn path_of(url: &str) -> String {
    url.strip_prefix(BASE).unwrap().to_string()
}

async fn get(app: axum::Router, uri: &str) -> Response<Body> {
    app.oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap()
}

async fn get_range(app: axum::Router, uri: &str, range: &str) -> Response<Body> {
    app.oneshot(
        Request::builder()
            .uri(uri)
            .header(header::RANGE, range)
            .body(Body::empty())
            .unwrap(),
    )
    .await
    .unwrap()
}

/// Helper: read response body as bytes.
async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    response
        .into_body()
        .collect()
        .await
        .unwrap()
        .to_bytes()
        .to_vec()
}

async fn body_string(response: Response<Body>) -> String {
    String::from_utf8(body_bytes(response).await).unwrap()
}

fn header_str<'a>(response: &'a Response<Body>, name: header::HeaderName) -> &'a str {
    response.headers().get(name).unwrap().to_str().unwrap()
}

// -- Health Probes ------------------------------------------------------------

#[tokio::test]
async fn test_liveness_probe() {
    let app = bootimg_server::app(AppState::new(cpio_handler()));
    let response = get(app, "/health/liveness").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_string(response).await, "ok");
}

#[tokio::test]
async fn test_readiness_probe() {
    let app = bootimg_server::app(AppState::new(cpio_handler()));
    let response = get(app, "/health/readiness").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_string(response).await, "ready");
}

// -- Image Downloads ----------------------------------------------------------

#[tokio::test]
async fn test_get_dynamic_image_returns_content() {
    let images = verbatim_handler();
    let url = images
        .serve_image("host-xyz-45", b"aiosetnarsetin", ImageFormat::Iso, Naming::Dynamic)
        .unwrap();
    let app = bootimg_server::app(AppState::new(images));

    let response = get(app, &path_of(&url)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(header_str(&response, header::CONTENT_LENGTH), "14");
    assert_eq!(header_str(&response, header::ACCEPT_RANGES), "bytes");
    assert_eq!(
        header_str(&response, header::CONTENT_TYPE),
        "application/octet-stream"
    );
    assert!(response.headers().contains_key(header::LAST_MODIFIED));
    assert_eq!(body_string(response).await, "aiosetnarsetin");
}

#[tokio::test]
async fn test_get_composed_image_starts_with_template() {
    let images = cpio_handler();
    let url = images
        .serve_image("host-a", b"{\"ignition\":{}}", ImageFormat::Initrd, Naming::Dynamic)
        .unwrap();
    let size = images
        .registry()
        .lookup(path_of(&url).trim_start_matches('/'))
        .unwrap()
        .size();
    let app = bootimg_server::app(AppState::new(images));

    let response = get(app, &path_of(&url)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_bytes(response).await;
    assert_eq!(body.len() as u64, size);
    assert!(body.starts_with(b"INITRD-TEMPLATE\0070701"));
    assert!(body
        .windows(b"config.ign".len())
        .any(|w| w == b"config.ign"));
}

#[tokio::test]
async fn test_static_image_served_at_literal_name() {
    let images = verbatim_handler();
    let url = images
        .serve_image("worker-0.iso", b"static-payload", ImageFormat::Iso, Naming::Static)
        .unwrap();
    assert_eq!(url, "http://localhost:8080/worker-0.iso");
    let app = bootimg_server::app(AppState::new(images));

    let response = get(app, "/worker-0.iso").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_string(response).await, "static-payload");
}

#[tokio::test]
async fn test_dynamic_image_not_served_by_name() {
    let images = verbatim_handler();
    images
        .serve_image("secret-host", b"x", ImageFormat::Iso, Naming::Dynamic)
        .unwrap();
    let app = bootimg_server::app(AppState::new(images));

    let response = get(app, "/secret-host").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_head_returns_headers_only() {
    let images = verbatim_handler();
    let url = images
        .serve_image("host-h", b"0123456789", ImageFormat::Iso, Naming::Dynamic)
        .unwrap();
    let app = bootimg_server::app(AppState::new(images));

    let response = app
        .oneshot(
            Request::builder()
                .method("HEAD")
                .uri(path_of(&url))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(header_str(&response, header::CONTENT_LENGTH), "10");
    assert!(body_bytes(response).await.is_empty());
}

// -- Range Requests -----------------------------------------------------------

#[tokio::test]
async fn test_single_range_returns_partial_content() {
    let images = verbatim_handler();
    let url = images
        .serve_image("host-r", b"0123456789", ImageFormat::Iso, Naming::Dynamic)
        .unwrap();
    let app = bootimg_server::app(AppState::new(images));

    let response = get_range(app, &path_of(&url), "bytes=2-5").await;
    assert_eq!(response.status(), StatusCode::PARTIAL_CONTENT);
    assert_eq!(header_str(&response, header::CONTENT_RANGE), "bytes 2-5/10");
    assert_eq!(header_str(&response, header::CONTENT_LENGTH), "4");
    assert_eq!(body_string(response).await, "2345");
}

#[tokio::test]
async fn test_suffix_range_returns_tail() {
    let images = verbatim_handler();
    let url = images
        .serve_image("host-s", b"0123456789", ImageFormat::Iso, Naming::Dynamic)
        .unwrap();
    let app = bootimg_server::app(AppState::new(images));

    let response = get_range(app, &path_of(&url), "bytes=-3").await;
    assert_eq!(response.status(), StatusCode::PARTIAL_CONTENT);
    assert_eq!(body_string(response).await, "789");
}

#[tokio::test]
async fn test_suffix_range_longer_than_image_returns_whole_image() {
    let images = verbatim_handler();
    let url = images
        .serve_image("host-t", b"0123456789", ImageFormat::Iso, Naming::Dynamic)
        .unwrap();
    let app = bootimg_server::app(AppState::new(images));

    let response = get_range(app, &path_of(&url), "bytes=-100").await;
    assert_eq!(response.status(), StatusCode::PARTIAL_CONTENT);
    assert_eq!(header_str(&response, header::CONTENT_RANGE), "bytes 0-9/10");
    assert_eq!(header_str(&response, header::CONTENT_LENGTH), "10");
    assert_eq!(body_string(response).await, "0123456789");
}

#[tokio::test]
async fn test_zero_length_suffix_returns_416() {
    let images = verbatim_handler();
    let url = images
        .serve_image("host-z", b"0123456789", ImageFormat::Iso, Naming::Dynamic)
        .unwrap();
    let app = bootimg_server::app(AppState::new(images));

    let response = get_range(app, &path_of(&url), "bytes=-0").await;
    assert_eq!(response.status(), StatusCode::RANGE_NOT_SATISFIABLE);
}

#[tokio::test]
async fn test_unsatisfiable_range_returns_416() {
    let images = verbatim_handler();
    let url = images
        .serve_image("host-u", b"0123456789", ImageFormat::Iso, Naming::Dynamic)
        .unwrap();
    let app = bootimg_server::app(AppState::new(images));

    let response = get_range(app, &path_of(&url), "bytes=50-60").await;
    assert_eq!(response.status(), StatusCode::RANGE_NOT_SATISFIABLE);
    assert_eq!(header_str(&response, header::CONTENT_RANGE), "bytes */10");
}

#[tokio::test]
async fn test_multiple_ranges_return_whole_image() {
    let images = verbatim_handler();
    let url = images
        .serve_image("host-m", b"0123456789", ImageFormat::Iso, Naming::Dynamic)
        .unwrap();
    let app = bootimg_server::app(AppState::new(images));

    let response = get_range(app, &path_of(&url), "bytes=0-1,4-5").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_string(response).await, "0123456789");
}

#[tokio::test]
async fn test_large_image_streams_completely() {
    let payload: Vec<u8> = (0..300_000u32).map(|i| (i % 251) as u8).collect();
    let images = verbatim_handler();
    let url = images
        .serve_image("host-big", &payload, ImageFormat::Iso, Naming::Dynamic)
        .unwrap();
    let app = bootimg_server::app(AppState::new(images));

    let response = get_range(app, &path_of(&url), "bytes=70000-").await;
    assert_eq!(response.status(), StatusCode::PARTIAL_CONTENT);
    assert_eq!(body_bytes(response).await, &payload[70_000..]);
}

// -- Not Found ----------------------------------------------------------------

#[tokio::test]
async fn test_unknown_token_returns_404_json() {
    let app = bootimg_server::app(AppState::new(cpio_handler()));
    let response = get(app, "/0123456789abcdef").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let body: serde_json::Value = serde_json::from_slice(&body_bytes(response).await).unwrap();
    assert_eq!(body["error"]["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_root_and_nested_paths_return_404() {
    let images = verbatim_handler();
    images
        .serve_image("a.iso", b"x", ImageFormat::Iso, Naming::Static)
        .unwrap();
    let state = AppState::new(images);

    for uri in ["/", "/a.iso/extra", "/dir/a.iso"] {
        let response = get(bootimg_server::app(state.clone()), uri).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND, "{uri}");
    }
}

#[tokio::test]
async fn test_removed_image_returns_404() {
    let images = verbatim_handler();
    let url = images
        .serve_image("host-gone", b"bytes", ImageFormat::Iso, Naming::Dynamic)
        .unwrap();
    let app = bootimg_server::app(AppState::new(images.clone()));

    let response = get(app.clone(), &path_of(&url)).await;
    assert_eq!(response.status(), StatusCode::OK);

    images.remove_image("host-gone");
    let response = get(app, &path_of(&url)).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// -- Metrics ------------------------------------------------------------------

#[tokio::test]
async fn test_metrics_endpoint_enabled() {
    let handle = PrometheusBuilder::new().build_recorder().handle();
    let state = AppState::new(cpio_handler()).with_metrics(handle);
    let response = get(bootimg_server::app(state), "/metrics").await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_metrics_endpoint_disabled() {
    let app = bootimg_server::app(AppState::new(cpio_handler()));
    let response = get(app, "/metrics").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
