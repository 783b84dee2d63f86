use crate::config::test_helpers::setup_test_app;
use crate::test_helpers::{get, json_request, send};
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode, header};
use base64::{Engine, engine::general_purpose::STANDARD};
use serde_json::json;
use tower::ServiceExt;

const BOUNDARY: &str = "reference-test-boundary";

fn multipart_request(ref_number: Option<&str>, document: Option<(&str, &[u8])>) -> Request<Body> {
    let mut body: Vec<u8> = Vec::new();
    if let Some(ref_number) = ref_number {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"refNumber\"\r\n\r\n{ref_number}\r\n"
            )
            .as_bytes(),
        );
    }
    if let Some((file_name, bytes)) = document {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"document\"; filename=\"{file_name}\"\r\nContent-Type: text/plain\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

    Request::builder()
        .method("POST")
        .uri("/api/reference/add")
        .header(
            "content-type",
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

#[tokio::test]
async fn test_add_reference_with_document_and_download() {
    let app = setup_test_app().await;

    let (status, body) = send(
        &app,
        multipart_request(Some("REF-001"), Some(("notes.txt", b"hello lab"))),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["refNumber"], "REF-001");
    assert_eq!(body["fileName"], "notes.txt");
    assert_eq!(body["fileData"], STANDARD.encode(b"hello lab"));
    assert_eq!(body["sampleOut"], false);

    let id = body["_id"].as_str().unwrap();
    let response = app
        .clone()
        .oneshot(get(&format!("/api/reference/{id}/document"), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "text/plain");
    assert_eq!(
        response.headers()[header::CONTENT_DISPOSITION],
        "attachment; filename=\"notes.txt\"; filename*=UTF-8''notes.txt"
    );
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&bytes[..], b"hello lab");
}

#[tokio::test]
async fn test_document_download_encodes_uploaded_file_name() {
    let app = setup_test_app().await;

    let (status, body) = send(
        &app,
        multipart_request(Some("REF-003"), Some(("lab notes; v2.txt", b"v2"))),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let id = body["_id"].as_str().unwrap();
    let response = app
        .clone()
        .oneshot(get(&format!("/api/reference/{id}/document"), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_DISPOSITION],
        "attachment; filename=\"lab notes; v2.txt\"; filename*=UTF-8''lab%20notes%3B%20v2.txt"
    );
}

#[tokio::test]
async fn test_add_reference_without_document() {
    let app = setup_test_app().await;

    let (status, body) = send(&app, multipart_request(Some("REF-002"), None)).await;
    assert_eq!(status, StatusCode::CREATED);
    assert!(body["fileData"].is_null());

    let id = body["_id"].as_str().unwrap();
    let (status, _) = send(&app, get(&format!("/api/reference/{id}/document"), None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = send(&app, get("/api/reference", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_add_reference_requires_ref_number() {
    let app = setup_test_app().await;
    let (status, body) = send(&app, multipart_request(None, Some(("a.txt", b"x")))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].as_str().unwrap().contains("reference number"));
}

#[tokio::test]
async fn test_sample_out_is_one_way() {
    let app = setup_test_app().await;
    let (_, created) = send(&app, multipart_request(Some("REF-OUT"), None)).await;
    let id = created["_id"].as_str().unwrap();

    let (status, body) = send(
        &app,
        json_request("POST", "/api/reference/sample-out", None, &json!({"id": id})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["reference"]["refNumber"], "REF-OUT");
    assert_eq!(body["reference"]["sampleOut"], true);
    let first_stamp = body["reference"]["sampleOutAt"].clone();
    assert!(first_stamp.is_string());

    let (status, body) = send(
        &app,
        json_request("POST", "/api/reference/sample-out", None, &json!({"id": id})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["reference"]["sampleOutAt"], first_stamp);

    let (status, _) = send(
        &app,
        json_request(
            "POST",
            "/api/reference/sample-out",
            None,
            &json!({"id": uuid::Uuid::new_v4()}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
