use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::response::Response;
use serde_json::{json, Value};
use tower::ServiceExt;

use super::common::*;
use crate::marketplace::router::marketplace_router;

fn router(ctx: &TestContext) -> axum::Router {
    marketplace_router(ctx.state.clone())
}

fn request(method: &str, uri: &str, token: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_vec(&body).expect("serialize")))
            .expect("request builds"),
        None => builder.body(Body::empty()).expect("request builds"),
    }
}

async fn dispatch(
    router: &axum::Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> Response {
    router
        .clone()
        .oneshot(request(method, uri, token, body))
        .await
        .expect("router dispatch")
}

async fn register(router: &axum::Router, name: &str, email: &str, role: &str) -> (u64, String) {
    let response = dispatch(
        router,
        "POST",
        "/api/register",
        None,
        Some(json!({ "name": name, "email": email, "role": role })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let payload = read_json_body(response).await;
    let id = payload["user"]["id"].as_u64().expect("user id");
    let token = payload["token"].as_str().expect("token").to_string();
    (id, token)
}

#[tokio::test]
async fn register_issues_a_bearer_token() {
    let ctx = setup();
    let router = router(&ctx);
    let (id, token) = register(&router, "Acme", "ops@acme.example", "company").await;
    assert!(id > 0);
    assert!(!token.is_empty());
}

#[tokio::test]
async fn missing_token_is_rejected() {
    let ctx = setup();
    let router = router(&ctx);

    let response = dispatch(&router, "GET", "/api/jobs", None, None).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let payload = read_json_body(response).await;
    assert_eq!(payload["error"]["code"], json!("unauthenticated"));
}

#[tokio::test]
async fn job_creation_requires_the_company_role() {
    let ctx = setup();
    let router = router(&ctx);
    let (_, token) = register(&router, "Dana", "dana@example.com", "freelancer").await;

    let response = dispatch(
        &router,
        "POST",
        "/api/jobs",
        Some(&token),
        Some(json!({
            "title": "Build a billing service",
            "description": "Invoicing",
            "requirements": "Rust",
            "status": "published",
        })),
    )
    .await;

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let payload = read_json_body(response).await;
    assert_eq!(payload["error"]["code"], json!("company_required"));
    assert_eq!(
        payload["error"]["message"],
        json!("Only companies can post jobs")
    );
}

#[tokio::test]
async fn job_creation_reports_validation_errors() {
    let ctx = setup();
    let router = router(&ctx);
    let (_, token) = register(&router, "Acme", "ops@acme.example", "company").await;

    let response = dispatch(
        &router,
        "POST",
        "/api/jobs",
        Some(&token),
        Some(json!({
            "title": "",
            "description": "Invoicing",
            "requirements": "Rust",
            "status": "published",
        })),
    )
    .await;

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let payload = read_json_body(response).await;
    assert_eq!(payload["error"]["code"], json!("validation_error"));
}

#[tokio::test]
async fn drafts_of_other_companies_read_as_not_found() {
    let ctx = setup();
    let router = router(&ctx);
    let (_, company_token) = register(&router, "Acme", "ops@acme.example", "company").await;
    let (_, freelancer_token) = register(&router, "Dana", "dana@example.com", "freelancer").await;

    let created = dispatch(
        &router,
        "POST",
        "/api/jobs",
        Some(&company_token),
        Some(json!({
            "title": "Quiet draft",
            "description": "Not yet announced",
            "requirements": "Rust",
            "status": "draft",
        })),
    )
    .await;
    assert_eq!(created.status(), StatusCode::CREATED);
    let payload = read_json_body(created).await;
    let job_id = payload["data"]["id"].as_u64().expect("job id");

    let response = dispatch(
        &router,
        "GET",
        &format!("/api/jobs/{job_id}"),
        Some(&freelancer_token),
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let payload = read_json_body(response).await;
    assert_eq!(payload["error"]["code"], json!("not_found"));

    let owner_view = dispatch(
        &router,
        "GET",
        &format!("/api/jobs/{job_id}"),
        Some(&company_token),
        None,
    )
    .await;
    assert_eq!(owner_view.status(), StatusCode::OK);
}

#[tokio::test]
async fn publish_apply_complete_flow_over_http() {
    let ctx = setup();
    let router = router(&ctx);
    let (_, company_token) = register(&router, "Acme", "ops@acme.example", "company").await;
    let (freelancer_id, freelancer_token) =
        register(&router, "Dana", "dana@example.com", "freelancer").await;

    let created = dispatch(
        &router,
        "POST",
        "/api/jobs",
        Some(&company_token),
        Some(json!({
            "title": "Build a billing service",
            "description": "Subscription invoicing with proration",
            "requirements": "Rust, payment APIs",
            "status": "published",
        })),
    )
    .await;
    assert_eq!(created.status(), StatusCode::CREATED);
    let payload = read_json_body(created).await;
    assert_eq!(payload["message"], json!("Job created successfully"));
    let job_id = payload["data"]["id"].as_u64().expect("job id");

    let cv = sample_cv();
    let applied = dispatch(
        &router,
        "POST",
        &format!("/api/jobs/{job_id}/applications"),
        Some(&freelancer_token),
        Some(json!({
            "cover_letter": "I shipped a very similar system last year.",
            "cv": { "filename": cv.filename, "content_base64": cv.content_base64 },
        })),
    )
    .await;
    assert_eq!(applied.status(), StatusCode::CREATED);
    let application = read_json_body(applied).await;
    assert_eq!(application["status"], json!("pending"));

    let completed = dispatch(
        &router,
        "POST",
        &format!("/api/jobs/{job_id}/complete"),
        Some(&company_token),
        Some(json!({
            "freelancer_id": freelancer_id,
            "points": 10,
            "completion_notes": "delivered on time",
        })),
    )
    .await;
    assert_eq!(completed.status(), StatusCode::OK);
    let payload = read_json_body(completed).await;
    assert_eq!(
        payload["message"],
        json!("Job marked as completed and honor points awarded")
    );
    assert_eq!(payload["job"]["status"], json!("completed"));
    assert_eq!(payload["awarded_points"], json!(10));
    assert_eq!(payload["freelancer"]["total_points"], json!(10));

    // The completed job is no longer published, so a second completion
    // must be refused.
    let repeated = dispatch(
        &router,
        "POST",
        &format!("/api/jobs/{job_id}/complete"),
        Some(&company_token),
        Some(json!({ "freelancer_id": freelancer_id, "points": 10 })),
    )
    .await;
    assert_eq!(repeated.status(), StatusCode::CONFLICT);
    let payload = read_json_body(repeated).await;
    assert_eq!(payload["error"]["code"], json!("conflict"));

    let profile = dispatch(&router, "GET", "/api/profile", Some(&freelancer_token), None).await;
    assert_eq!(profile.status(), StatusCode::OK);
    let payload = read_json_body(profile).await;
    assert_eq!(payload["role"], json!("freelancer"));
    assert_eq!(payload["total_points"], json!(10));
}

#[tokio::test]
async fn duplicate_application_conflicts_over_http() {
    let ctx = setup();
    let router = router(&ctx);
    let (_, company_token) = register(&router, "Acme", "ops@acme.example", "company").await;
    let (_, freelancer_token) = register(&router, "Dana", "dana@example.com", "freelancer").await;

    let created = dispatch(
        &router,
        "POST",
        "/api/jobs",
        Some(&company_token),
        Some(json!({
            "title": "Build a billing service",
            "description": "Invoicing",
            "requirements": "Rust",
            "status": "published",
        })),
    )
    .await;
    let payload = read_json_body(created).await;
    let job_id = payload["data"]["id"].as_u64().expect("job id");

    let cv = sample_cv();
    let body = json!({
        "cover_letter": "Pick me.",
        "cv": { "filename": cv.filename, "content_base64": cv.content_base64 },
    });
    let first = dispatch(
        &router,
        "POST",
        &format!("/api/jobs/{job_id}/applications"),
        Some(&freelancer_token),
        Some(body.clone()),
    )
    .await;
    assert_eq!(first.status(), StatusCode::CREATED);

    let second = dispatch(
        &router,
        "POST",
        &format!("/api/jobs/{job_id}/applications"),
        Some(&freelancer_token),
        Some(body),
    )
    .await;
    assert_eq!(second.status(), StatusCode::CONFLICT);
    let payload = read_json_body(second).await;
    assert_eq!(
        payload["error"]["message"],
        json!("You have already applied to this job")
    );
}

#[tokio::test]
async fn logout_revokes_the_token() {
    let ctx = setup();
    let router = router(&ctx);
    let (_, token) = register(&router, "Acme", "ops@acme.example", "company").await;

    let logout = dispatch(&router, "POST", "/api/logout", Some(&token), None).await;
    assert_eq!(logout.status(), StatusCode::OK);

    let after = dispatch(&router, "GET", "/api/jobs", Some(&token), None).await;
    assert_eq!(after.status(), StatusCode::UNAUTHORIZED);
}
