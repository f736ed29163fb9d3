use std::sync::Arc;

use axum::response::Response;
use base64::Engine;
use serde_json::Value;

use crate::marketplace::applications::{ApplyRequest, CvUpload};
use crate::marketplace::blob::InMemoryBlobStore;
use crate::marketplace::domain::{Application, Caller, Job, JobId};
use crate::marketplace::identity::{RegisterRequest, Session, TokenRegistry};
use crate::marketplace::jobs::CreateJobRequest;
use crate::marketplace::router::MarketplaceState;
use crate::marketplace::store::InMemoryMarketplace;

pub(super) struct TestContext {
    pub(super) repository: Arc<InMemoryMarketplace>,
    pub(super) blobs: Arc<InMemoryBlobStore>,
    pub(super) state: Arc<MarketplaceState<InMemoryMarketplace, InMemoryBlobStore>>,
}

pub(super) fn setup() -> TestContext {
    let repository = Arc::new(InMemoryMarketplace::new());
    let blobs = Arc::new(InMemoryBlobStore::new());
    let tokens = Arc::new(TokenRegistry::new());
    let state = Arc::new(MarketplaceState::new(
        repository.clone(),
        blobs.clone(),
        tokens,
    ));
    TestContext {
        repository,
        blobs,
        state,
    }
}

pub(super) fn register_company(ctx: &TestContext, name: &str, email: &str) -> Session {
    ctx.state
        .identity
        .register(RegisterRequest {
            name: name.to_string(),
            email: email.to_string(),
            role: "company".to_string(),
            company_name: Some(format!("{name} GmbH")),
        })
        .expect("company registers")
}

pub(super) fn register_freelancer(ctx: &TestContext, name: &str, email: &str) -> Session {
    ctx.state
        .identity
        .register(RegisterRequest {
            name: name.to_string(),
            email: email.to_string(),
            role: "freelancer".to_string(),
            company_name: None,
        })
        .expect("freelancer registers")
}

pub(super) fn caller(session: &Session) -> Caller {
    Caller {
        id: session.user.id,
        role: session.user.role,
    }
}

pub(super) fn post_job(ctx: &TestContext, company: &Caller, status: &str) -> Job {
    ctx.state
        .jobs
        .create(
            company,
            CreateJobRequest {
                title: "Build a billing service".to_string(),
                description: "Subscription invoicing with proration".to_string(),
                requirements: "Rust, payment APIs".to_string(),
                status: status.to_string(),
            },
        )
        .expect("job creates")
}

pub(super) fn sample_cv() -> CvUpload {
    let content = b"%PDF-1.4 sample resume";
    CvUpload {
        filename: "resume.pdf".to_string(),
        content_base64: base64::engine::general_purpose::STANDARD.encode(content),
    }
}

pub(super) fn apply_request() -> ApplyRequest {
    ApplyRequest {
        cover_letter: "I shipped a very similar system last year.".to_string(),
        cv: sample_cv(),
    }
}

pub(super) fn apply(ctx: &TestContext, freelancer: &Caller, job_id: JobId) -> Application {
    ctx.state
        .applications
        .apply(freelancer, job_id, apply_request())
        .expect("application submits")
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 1024 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
