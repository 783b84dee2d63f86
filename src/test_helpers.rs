/// Shared helpers for the HTTP-level tests: request builders, login and
/// standard fixtures for samples.
use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::{Value, json};
use tower::ServiceExt;

pub const ADMIN_EMAIL: &str = "admin@example.test";
pub const ADMIN_PASSWORD: &str = "admin-password";

/// Extract response body as JSON for testing
pub async fn extract_response_body(response: axum::response::Response) -> (StatusCode, Value) {
    use axum::body::to_bytes;

    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("Failed to read response body");
    let body: Value = serde_json::from_slice(&bytes)
        .unwrap_or_else(|_| json!({"error": "Invalid JSON response"}));
    (status, body)
}

pub fn get(uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    builder.body(Body::empty()).unwrap()
}

pub fn delete(uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("DELETE").uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    builder.body(Body::empty()).unwrap()
}

pub fn json_request(method: &str, uri: &str, token: Option<&str>, body: &Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

/// Send a request against a clone of the router and decode the JSON answer
pub async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    extract_response_body(response).await
}

/// Log in and return the bearer token
pub async fn login(app: &Router, email: &str, password: &str) -> String {
    let (status, body) = send(
        app,
        json_request(
            "POST",
            "/api/users/login",
            None,
            &json!({"email": email, "password": password}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "Login failed: {body}");
    body["token"].as_str().unwrap().to_string()
}

pub async fn admin_token(app: &Router) -> String {
    login(app, ADMIN_EMAIL, ADMIN_PASSWORD).await
}

/// Register a user through the admin and return their token
pub async fn create_user_with_role(app: &Router, role: &str) -> String {
    let admin = admin_token(app).await;
    let email = format!("{role}-{}@example.test", uuid::Uuid::new_v4().simple());
    let (status, body) = send(
        app,
        json_request(
            "POST",
            "/api/users/register",
            Some(&admin),
            &json!({
                "name": format!("Test {role}"),
                "email": email,
                "password": "password123",
                "role": role,
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "Register failed: {body}");
    login(app, &email, "password123").await
}

/// Create a sample with the given request reference; returns `(id, body)`
pub async fn create_test_sample(app: &Router, token: &str, request_ref_no: &str) -> (String, Value) {
    let (status, body) = send(
        app,
        json_request(
            "POST",
            "/api/samples",
            Some(token),
            &json!({
                "requestRefNo": request_ref_no,
                "sampleRefNo": "SR-100",
                "from": ["Plant A", "Plant B"],
                "to": "Central Lab",
                "sampleRoute": "Truck",
                "testMethod": "ICP-MS",
                "remarks": "Handle with care",
                "sampleInDate": "2025-01-10",
                "sampleInTime": "08:30",
                "gatePassNo": "GP-77",
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "Sample creation failed: {body}");
    (body["_id"].as_str().unwrap().to_string(), body)
}
