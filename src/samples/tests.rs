use crate::config::test_helpers::{setup_test_app, setup_test_context};
use crate::test_helpers::{
    admin_token, create_test_sample, create_user_with_role, delete, get, json_request, send,
};
use axum::body::to_bytes;
use axum::http::{StatusCode, header};
use serde_json::{Value, json};
use tower::ServiceExt;

fn results_payload() -> Value {
    json!([
        {"As_ppb": "1.2", "Sb_ppb": 0.4, "Al_ppb": "15"},
        {"As_ppb": 3, "Sb_ppb": "", "Al_ppb": null}
    ])
}

#[tokio::test]
async fn test_create_assigns_sequential_ids_and_ignores_lifecycle_fields() {
    let app = setup_test_app().await;
    let token = admin_token(&app).await;

    let (_, first) = create_test_sample(&app, &token, "REQ-1").await;
    assert_eq!(first["sampleId"], "SMP-00001");
    assert_eq!(first["from"], "Plant A, Plant B");
    assert_eq!(first["status"], "created");
    assert_eq!(first["received"], false);
    assert_eq!(first["isFinalized"], false);
    assert_eq!(first["notification"]["attempts"], 0);

    let (status, second) = send(
        &app,
        json_request(
            "POST",
            "/api/samples",
            Some(&token),
            &json!({
                "requestRefNo": "REQ-2",
                "from": "Plant C",
                "received": true,
                "isFinalized": true,
                "results": results_payload(),
                "analysedBy": "Sneaky"
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(second["sampleId"], "SMP-00002");
    assert_eq!(second["received"], false);
    assert_eq!(second["isFinalized"], false);
    assert_eq!(second["results"], json!([]));
    assert!(second["analysedBy"].is_null());
}

#[tokio::test]
async fn test_create_requires_request_ref_no() {
    let app = setup_test_app().await;
    let token = admin_token(&app).await;

    for body in [json!({"sampleRefNo": "SR-1"}), json!({"requestRefNo": "   "})] {
        let (status, response) =
            send(&app, json_request("POST", "/api/samples", Some(&token), &body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(response["error"]["code"], "VALIDATION_ERROR");
    }
}

#[tokio::test]
async fn test_sample_endpoints_require_authentication() {
    let app = setup_test_app().await;
    let token = admin_token(&app).await;
    let (id, _) = create_test_sample(&app, &token, "REQ-AUTH").await;

    let (status, _) = send(&app, get("/api/samples", None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, _) = send(&app, get(&format!("/api/samples/{id}"), Some("garbage"))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, _) = send(
        &app,
        json_request("POST", "/api/samples", None, &json!({"requestRefNo": "REQ-X"})),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_received_is_one_way_and_idempotent() {
    let app = setup_test_app().await;
    let token = admin_token(&app).await;
    let (id, _) = create_test_sample(&app, &token, "REQ-RCV").await;
    let received_uri = format!("/api/samples/samples/{id}/received");

    let (status, body) = send(
        &app,
        json_request("PUT", &received_uri, Some(&token), &json!({"received": true})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["received"], true);
    assert_eq!(body["status"], "received");
    let stamped_date = body["sampleReceivedDate"].as_str().unwrap().to_string();
    assert_eq!(stamped_date.len(), 10);
    assert_eq!(body["receivedDate"], body["sampleReceivedDate"]);
    assert_eq!(body["sampleReceivedTime"].as_str().unwrap().len(), 5);

    // Repeating keeps the original receipt stamp
    let (status, body) = send(
        &app,
        json_request("PUT", &received_uri, Some(&token), &json!({"received": true})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["sampleReceivedDate"], stamped_date.as_str());

    let (status, body) = send(
        &app,
        json_request("PUT", &received_uri, Some(&token), &json!({"received": false})),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"]["code"], "BUSINESS_RULE_VIOLATION");

    // A general update leaves the flag alone
    let (status, body) = send(
        &app,
        json_request(
            "PUT",
            &format!("/api/samples/{id}"),
            Some(&token),
            &json!({"remarks": "checked"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["received"], true);
    assert_eq!(body["remarks"], "checked");
}

#[tokio::test]
async fn test_received_accepts_supplied_date_aliases() {
    let app = setup_test_app().await;
    let token = admin_token(&app).await;
    let (id, _) = create_test_sample(&app, &token, "REQ-ALIAS").await;

    let (status, body) = send(
        &app,
        json_request(
            "PUT",
            &format!("/api/samples/{id}"),
            Some(&token),
            &json!({"received": true, "receivedDate": "2025-02-01", "receivedTime": "14:05"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["sampleReceivedDate"], "2025-02-01");
    assert_eq!(body["receivedTime"], "14:05");
}

#[tokio::test]
async fn test_results_put_replaces_full_list() {
    let app = setup_test_app().await;
    let token = admin_token(&app).await;
    let (id, _) = create_test_sample(&app, &token, "REQ-RES").await;
    let uri = format!("/api/samples/{id}");

    let (status, body) = send(
        &app,
        json_request("PUT", &uri, Some(&token), &json!({"results": results_payload()})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body["results"],
        json!([
            {"As_ppb": "1.2", "Sb_ppb": "0.4", "Al_ppb": "15"},
            {"As_ppb": "3", "Sb_ppb": "", "Al_ppb": ""}
        ])
    );
    assert_eq!(body["status"], "results_entered");

    let (status, body) = send(
        &app,
        json_request(
            "PUT",
            &uri,
            Some(&token),
            &json!({"results": [{"As_ppb": "9", "Sb_ppb": "8", "Al_ppb": "7"}]}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body["results"],
        json!([{"As_ppb": "9", "Sb_ppb": "8", "Al_ppb": "7"}])
    );

    let (_, body) = send(&app, get(&uri, Some(&token))).await;
    assert_eq!(body["results"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_finalize_without_results_is_rejected() {
    let ctx = setup_test_context().await;
    let token = admin_token(&ctx.router).await;
    let (id, _) = create_test_sample(&ctx.router, &token, "REQ-EMPTY").await;

    let (status, body) = send(
        &ctx.router,
        json_request(
            "PUT",
            &format!("/api/samples/{id}"),
            Some(&token),
            &json!({"isFinalized": true}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["message"].as_str().unwrap().contains("results_required"));
    assert!(ctx.notifier.sent().is_empty());
}

#[tokio::test]
async fn test_full_lifecycle_sends_exactly_one_email() {
    let ctx = setup_test_context().await;
    let app = &ctx.router;
    let token = create_user_with_role(app, "tester").await;
    let (id, _) = create_test_sample(app, &token, "REQ-1").await;
    let uri = format!("/api/samples/{id}");

    let (status, _) = send(
        app,
        json_request(
            "PUT",
            &format!("/api/samples/samples/{id}/received"),
            Some(&token),
            &json!({"received": true}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(
        app,
        json_request(
            "PUT",
            &uri,
            Some(&token),
            &json!({
                "results": [{"As_ppb": "1", "Sb_ppb": "2", "Al_ppb": "3"}],
                "analysedBy": "Dr. Analyst",
                "completedDate": "2025-03-01",
                "completedTime": "16:00"
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(
        app,
        json_request("PUT", &uri, Some(&token), &json!({"isFinalized": true})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["isFinalized"], true);
    assert_eq!(body["status"], "finalized");
    assert!(body["finalizedAt"].is_string());
    assert!(body["notification"]["sentAt"].is_string());
    assert_eq!(body["notification"]["attempts"], 1);

    let (_, body) = send(app, get(&uri, Some(&token))).await;
    assert_eq!(body["isFinalized"], true);
    assert_eq!(body["results"].as_array().unwrap().len(), 1);
    assert_eq!(body["analysedBy"], "Dr. Analyst");

    for rejected in [
        json!({"results": []}),
        json!({"received": true}),
        json!({"isFinalized": false}),
        json!({"remarks": "too late"}),
    ] {
        let (status, body) = send(app, json_request("PUT", &uri, Some(&token), &rejected)).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY, "{rejected} was accepted");
        assert!(body["message"].as_str().unwrap().contains("sample_finalized"));
    }
    let (status, _) = send(
        app,
        json_request(
            "PUT",
            &format!("/api/samples/samples/{id}/received"),
            Some(&token),
            &json!({"received": true}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    // Finalizing again is accepted but sends nothing
    let (status, _) = send(
        app,
        json_request("PUT", &uri, Some(&token), &json!({"isFinalized": true})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let sent = ctx.notifier.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].sample_id, "SMP-00001");
    assert_eq!(sent[0].recipient, "reports@example.test");
    assert_eq!(sent[0].attachment_name, "Sample_Report_SMP-00001.pdf");
    assert!(sent[0].pdf.starts_with(b"%PDF"));
}

#[tokio::test]
async fn test_failed_notification_keeps_finalization_and_can_be_retried() {
    let ctx = setup_test_context().await;
    let app = &ctx.router;
    let token = admin_token(app).await;
    let (id, _) = create_test_sample(app, &token, "REQ-MAIL").await;

    // Not finalized yet: nothing to send
    let (status, _) = send(
        app,
        json_request("POST", &format!("/api/samples/{id}/notify"), Some(&token), &json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    ctx.notifier.set_failing(true);
    let (status, body) = send(
        app,
        json_request(
            "PUT",
            &format!("/api/samples/{id}"),
            Some(&token),
            &json!({
                "results": [{"As_ppb": "1", "Sb_ppb": "1", "Al_ppb": "1"}],
                "isFinalized": true
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["isFinalized"], true);
    assert!(body["notification"]["sentAt"].is_null());
    assert!(body["notification"]["lastError"].as_str().unwrap().contains("simulated outage"));
    assert_eq!(body["notification"]["attempts"], 1);

    // Still failing: the retry reports the provider error
    let notify_uri = format!("/api/samples/{id}/notify");
    let (status, _) = send(app, json_request("POST", &notify_uri, Some(&token), &json!({}))).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);

    ctx.notifier.set_failing(false);
    let (status, body) = send(app, json_request("POST", &notify_uri, Some(&token), &json!({}))).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["notification"]["sentAt"].is_string());
    assert!(body["notification"]["lastError"].is_null());
    assert_eq!(body["notification"]["attempts"], 3);

    let (status, body) = send(app, json_request("POST", &notify_uri, Some(&token), &json!({}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["notification"]["attempts"], 3);
    assert_eq!(ctx.notifier.sent().len(), 1);
}

async fn finalize_with_failing_notifier(ctx: &crate::config::test_helpers::TestApp, token: &str) -> String {
    let (id, _) = create_test_sample(&ctx.router, token, "REQ-RACE").await;
    ctx.notifier.set_failing(true);
    let (status, body) = send(
        &ctx.router,
        json_request(
            "PUT",
            &format!("/api/samples/{id}"),
            Some(token),
            &json!({
                "results": [{"As_ppb": "1", "Sb_ppb": "1", "Al_ppb": "1"}],
                "isFinalized": true
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["notification"]["sentAt"].is_null());
    ctx.notifier.set_failing(false);
    id
}

#[tokio::test]
async fn test_concurrent_notify_sends_report_once() {
    let ctx = setup_test_context().await;
    let token = admin_token(&ctx.router).await;
    let id = finalize_with_failing_notifier(&ctx, &token).await;

    let notify_uri = format!("/api/samples/{id}/notify");
    let ((first, _), (second, _)) = tokio::join!(
        send(&ctx.router, json_request("POST", &notify_uri, Some(&token), &json!({}))),
        send(&ctx.router, json_request("POST", &notify_uri, Some(&token), &json!({}))),
    );
    assert_eq!(first, StatusCode::OK);
    assert_eq!(second, StatusCode::OK);
    assert_eq!(ctx.notifier.sent().len(), 1);

    let (_, body) = send(&ctx.router, get(&format!("/api/samples/{id}"), Some(&token))).await;
    assert!(body["notification"]["sentAt"].is_string());
    assert_eq!(body["notification"]["attempts"], 2);
}

#[tokio::test]
async fn test_notify_skips_delivery_already_in_flight() {
    use crate::samples::models as samples;
    use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, sea_query::Expr};

    let ctx = setup_test_context().await;
    let token = admin_token(&ctx.router).await;
    let id = finalize_with_failing_notifier(&ctx, &token).await;
    let sample_id: uuid::Uuid = id.parse().unwrap();

    samples::Entity::update_many()
        .col_expr(samples::Column::NotificationInFlight, Expr::value(true))
        .filter(samples::Column::Id.eq(sample_id))
        .exec(&ctx.db)
        .await
        .unwrap();

    let notify_uri = format!("/api/samples/{id}/notify");
    let (status, body) = send(&ctx.router, json_request("POST", &notify_uri, Some(&token), &json!({}))).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["notification"]["sentAt"].is_null());
    assert_eq!(body["notification"]["attempts"], 1);
    assert!(ctx.notifier.sent().is_empty());

    let released = crate::samples::services::release_stale_deliveries(&ctx.db)
        .await
        .unwrap();
    assert_eq!(released, 1);

    let (status, body) = send(&ctx.router, json_request("POST", &notify_uri, Some(&token), &json!({}))).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["notification"]["sentAt"].is_string());
    assert_eq!(ctx.notifier.sent().len(), 1);
}

#[tokio::test]
async fn test_public_view_is_redacted_copy() {
    let app = setup_test_app().await;
    let token = admin_token(&app).await;
    let (id, _) = create_test_sample(&app, &token, "REQ-PUB").await;
    send(
        &app,
        json_request(
            "PUT",
            &format!("/api/samples/{id}"),
            Some(&token),
            &json!({"received": true, "results": results_payload()}),
        ),
    )
    .await;

    let (_, private) = send(&app, get(&format!("/api/samples/{id}"), Some(&token))).await;
    let (status, public) = send(&app, get(&format!("/api/samples/public/{id}"), None)).await;
    assert_eq!(status, StatusCode::OK);

    for hidden in [
        "gatePassNo",
        "sampleInDate",
        "sampleInTime",
        "createdBy",
        "finalizedAt",
        "lastUpdated",
        "notification",
    ] {
        assert!(public.get(hidden).is_none(), "{hidden} leaked");
    }
    for shown in [
        "_id",
        "received",
        "status",
        "sampleReceivedDate",
        "sampleReceivedTime",
        "receivedDate",
        "receivedTime",
    ] {
        assert_eq!(public[shown], private[shown], "{shown} differs");
    }
    assert!(public["receivedDate"].is_string());
    for (key, value) in public.as_object().unwrap() {
        assert_eq!(&private[key], value, "{key} differs");
    }
    assert_eq!(public["sampleId"], private["sampleId"]);

    let (status, _) = send(
        &app,
        get("/api/samples/public/00000000-0000-0000-0000-000000000000", None),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_list_orders_by_creation_and_filters() {
    let app = setup_test_app().await;
    let token = admin_token(&app).await;
    let (first, _) = create_test_sample(&app, &token, "REQ-A").await;
    create_test_sample(&app, &token, "REQ-B").await;
    send(
        &app,
        json_request(
            "PUT",
            &format!("/api/samples/samples/{first}/received"),
            Some(&token),
            &json!({"received": true}),
        ),
    )
    .await;

    let (status, body) = send(&app, get("/api/samples", Some(&token))).await;
    assert_eq!(status, StatusCode::OK);
    let ids: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["sampleId"].as_str().unwrap())
        .collect();
    assert_eq!(ids, ["SMP-00001", "SMP-00002"]);

    let (_, body) = send(&app, get("/api/samples?received=true", Some(&token))).await;
    assert_eq!(body.as_array().unwrap().len(), 1);
    assert_eq!(body[0]["requestRefNo"], "REQ-A");

    let (_, body) = send(&app, get("/api/samples?finalized=true", Some(&token))).await;
    assert!(body.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_delete_finalized_sample_requires_labadmin() {
    let app = setup_test_app().await;
    let admin = admin_token(&app).await;
    let factory = create_user_with_role(&app, "factory").await;

    let (open_id, _) = create_test_sample(&app, &factory, "REQ-OPEN").await;
    let (status, _) = send(&app, delete(&format!("/api/samples/{open_id}"), Some(&factory))).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = send(&app, get(&format!("/api/samples/{open_id}"), Some(&factory))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (final_id, _) = create_test_sample(&app, &factory, "REQ-FINAL").await;
    send(
        &app,
        json_request(
            "PUT",
            &format!("/api/samples/{final_id}"),
            Some(&factory),
            &json!({"results": [{"As_ppb": "1"}], "isFinalized": true}),
        ),
    )
    .await;

    let (status, _) = send(&app, delete(&format!("/api/samples/{final_id}"), Some(&factory))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = send(&app, delete(&format!("/api/samples/{final_id}"), Some(&admin))).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = send(&app, delete(&format!("/api/samples/{final_id}"), Some(&admin))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_qr_code_points_at_public_page() {
    let app = setup_test_app().await;
    let token = admin_token(&app).await;
    let (id, _) = create_test_sample(&app, &token, "REQ-QR").await;

    let (status, body) = send(&app, get(&format!("/api/samples/{id}/qr"), Some(&token))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body["url"],
        format!("https://lab.example.test/samples/public/{id}")
    );
    assert!(
        body["qrCode"]
            .as_str()
            .unwrap()
            .starts_with("data:image/png;base64,")
    );
}

#[tokio::test]
async fn test_report_download() {
    let app = setup_test_app().await;
    let token = admin_token(&app).await;
    let (id, created) = create_test_sample(&app, &token, "REQ-PDF").await;

    let response = app
        .clone()
        .oneshot(get(&format!("/api/samples/{id}/report"), Some(&token)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "application/pdf");
    let disposition = response.headers()[header::CONTENT_DISPOSITION]
        .to_str()
        .unwrap()
        .to_string();
    assert!(disposition.contains(&format!(
        "Sample_Report_{}.pdf",
        created["sampleId"].as_str().unwrap()
    )));

    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert!(bytes.starts_with(b"%PDF"));
}

#[tokio::test]
async fn test_unknown_sample_is_not_found() {
    let app = setup_test_app().await;
    let token = admin_token(&app).await;
    let missing = uuid::Uuid::new_v4();

    for uri in [
        format!("/api/samples/{missing}"),
        format!("/api/samples/{missing}/qr"),
        format!("/api/samples/{missing}/report"),
    ] {
        let (status, _) = send(&app, get(&uri, Some(&token))).await;
        assert_eq!(status, StatusCode::NOT_FOUND, "{uri}");
    }
    let (status, _) = send(
        &app,
        json_request(
            "PUT",
            &format!("/api/samples/{missing}"),
            Some(&token),
            &json!({"remarks": "x"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
