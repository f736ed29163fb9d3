use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, patch, post};
use axum::{Json, Router};
use serde_json::json;

use super::applications::{
    ApplicationListing, ApplicationService, ApplyRequest, UpdateStatusRequest,
};
use super::blob::BlobStore;
use super::completion::{CompleteJobRequest, CompletionService};
use super::domain::{ApplicationId, Caller, HonorPointId, JobId};
use super::error::MarketplaceError;
use super::honor::{AwardRequest, HonorService};
use super::identity::{IdentityService, LoginRequest, RegisterRequest, TokenRegistry};
use super::jobs::{CreateJobRequest, JobService, UpdateJobRequest};
use super::profile::ProfileService;
use super::repository::MarketplaceRepository;

/// Shared handler state bundling the lifecycle services.
pub struct MarketplaceState<R, B> {
    pub identity: IdentityService<R>,
    pub profile: ProfileService<R>,
    pub jobs: JobService<R>,
    pub applications: ApplicationService<R, B>,
    pub honor: HonorService<R>,
    pub completion: CompletionService<R>,
}

impl<R, B> MarketplaceState<R, B>
where
    R: MarketplaceRepository,
    B: BlobStore,
{
    pub fn new(repository: Arc<R>, blobs: Arc<B>, tokens: Arc<TokenRegistry>) -> Self {
        Self {
            identity: IdentityService::new(repository.clone(), tokens),
            profile: ProfileService::new(repository.clone()),
            jobs: JobService::new(repository.clone()),
            applications: ApplicationService::new(repository.clone(), blobs),
            honor: HonorService::new(repository.clone()),
            completion: CompletionService::new(repository),
        }
    }

    fn caller(&self, headers: &HeaderMap) -> Result<Caller, MarketplaceError> {
        self.identity.authenticate(bearer_token(headers)?)
    }
}

/// Router builder exposing the full marketplace API.
pub fn marketplace_router<R, B>(state: Arc<MarketplaceState<R, B>>) -> Router
where
    R: MarketplaceRepository + 'static,
    B: BlobStore + 'static,
{
    Router::new()
        .route("/api/register", post(register_handler::<R, B>))
        .route("/api/login", post(login_handler::<R, B>))
        .route("/api/logout", post(logout_handler::<R, B>))
        .route("/api/profile", get(profile_handler::<R, B>))
        .route(
            "/api/jobs",
            get(list_jobs_handler::<R, B>).post(create_job_handler::<R, B>),
        )
        .route(
            "/api/jobs/:job_id",
            get(show_job_handler::<R, B>)
                .put(update_job_handler::<R, B>)
                .delete(delete_job_handler::<R, B>),
        )
        .route(
            "/api/jobs/:job_id/applications",
            get(job_applications_handler::<R, B>).post(apply_handler::<R, B>),
        )
        .route(
            "/api/jobs/:job_id/applicants",
            get(job_applicants_handler::<R, B>),
        )
        .route("/api/jobs/:job_id/complete", post(complete_job_handler::<R, B>))
        .route(
            "/api/jobs/:job_id/honor-points",
            post(award_honor_points_handler::<R, B>),
        )
        .route("/api/applications", get(list_applications_handler::<R, B>))
        .route(
            "/api/applications/:application_id",
            get(show_application_handler::<R, B>),
        )
        .route(
            "/api/applications/:application_id/status",
            patch(update_application_status_handler::<R, B>),
        )
        .route(
            "/api/applications/:application_id/cv",
            get(download_cv_handler::<R, B>),
        )
        .route("/api/company/cvs", get(company_cvs_handler::<R, B>))
        .route("/api/honor-points", get(list_honor_points_handler::<R, B>))
        .route(
            "/api/honor-points/:honor_point_id",
            get(show_honor_point_handler::<R, B>),
        )
        .with_state(state)
}

fn bearer_token(headers: &HeaderMap) -> Result<&str, MarketplaceError> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .ok_or(MarketplaceError::Unauthenticated)
}

async fn register_handler<R, B>(
    State(state): State<Arc<MarketplaceState<R, B>>>,
    Json(request): Json<RegisterRequest>,
) -> Result<Response, MarketplaceError>
where
    R: MarketplaceRepository + 'static,
    B: BlobStore + 'static,
{
    let session = state.identity.register(request)?;
    Ok((StatusCode::CREATED, Json(session)).into_response())
}

async fn login_handler<R, B>(
    State(state): State<Arc<MarketplaceState<R, B>>>,
    Json(request): Json<LoginRequest>,
) -> Result<Response, MarketplaceError>
where
    R: MarketplaceRepository + 'static,
    B: BlobStore + 'static,
{
    let session = state.identity.login(request)?;
    Ok(Json(session).into_response())
}

async fn logout_handler<R, B>(
    State(state): State<Arc<MarketplaceState<R, B>>>,
    headers: HeaderMap,
) -> Result<Response, MarketplaceError>
where
    R: MarketplaceRepository + 'static,
    B: BlobStore + 'static,
{
    state.identity.logout(bearer_token(&headers)?)?;
    Ok(Json(json!({ "message": "Logged out" })).into_response())
}

async fn profile_handler<R, B>(
    State(state): State<Arc<MarketplaceState<R, B>>>,
    headers: HeaderMap,
) -> Result<Response, MarketplaceError>
where
    R: MarketplaceRepository + 'static,
    B: BlobStore + 'static,
{
    let caller = state.caller(&headers)?;
    let profile = state.profile.profile(&caller)?;
    Ok(Json(profile).into_response())
}

async fn list_jobs_handler<R, B>(
    State(state): State<Arc<MarketplaceState<R, B>>>,
    headers: HeaderMap,
) -> Result<Response, MarketplaceError>
where
    R: MarketplaceRepository + 'static,
    B: BlobStore + 'static,
{
    let caller = state.caller(&headers)?;
    let jobs = state.jobs.list_visible(&caller)?;
    Ok(Json(jobs).into_response())
}

async fn create_job_handler<R, B>(
    State(state): State<Arc<MarketplaceState<R, B>>>,
    headers: HeaderMap,
    Json(request): Json<CreateJobRequest>,
) -> Result<Response, MarketplaceError>
where
    R: MarketplaceRepository + 'static,
    B: BlobStore + 'static,
{
    let caller = state.caller(&headers)?;
    let job = state.jobs.create(&caller, request)?;
    let body = Json(json!({
        "message": "Job created successfully",
        "data": job,
    }));
    Ok((StatusCode::CREATED, body).into_response())
}

async fn show_job_handler<R, B>(
    State(state): State<Arc<MarketplaceState<R, B>>>,
    headers: HeaderMap,
    Path(job_id): Path<u64>,
) -> Result<Response, MarketplaceError>
where
    R: MarketplaceRepository + 'static,
    B: BlobStore + 'static,
{
    let caller = state.caller(&headers)?;
    let job = state.jobs.get(&caller, JobId(job_id))?;
    Ok(Json(job).into_response())
}

async fn update_job_handler<R, B>(
    State(state): State<Arc<MarketplaceState<R, B>>>,
    headers: HeaderMap,
    Path(job_id): Path<u64>,
    Json(request): Json<UpdateJobRequest>,
) -> Result<Response, MarketplaceError>
where
    R: MarketplaceRepository + 'static,
    B: BlobStore + 'static,
{
    let caller = state.caller(&headers)?;
    let job = state.jobs.update(&caller, JobId(job_id), request)?;
    Ok(Json(job).into_response())
}

async fn delete_job_handler<R, B>(
    State(state): State<Arc<MarketplaceState<R, B>>>,
    headers: HeaderMap,
    Path(job_id): Path<u64>,
) -> Result<Response, MarketplaceError>
where
    R: MarketplaceRepository + 'static,
    B: BlobStore + 'static,
{
    let caller = state.caller(&headers)?;
    state.jobs.delete(&caller, JobId(job_id))?;
    Ok(StatusCode::NO_CONTENT.into_response())
}

async fn job_applications_handler<R, B>(
    State(state): State<Arc<MarketplaceState<R, B>>>,
    headers: HeaderMap,
    Path(job_id): Path<u64>,
) -> Result<Response, MarketplaceError>
where
    R: MarketplaceRepository + 'static,
    B: BlobStore + 'static,
{
    let caller = state.caller(&headers)?;
    let applications = state.jobs.applications(&caller, JobId(job_id))?;
    Ok(Json(applications).into_response())
}

async fn job_applicants_handler<R, B>(
    State(state): State<Arc<MarketplaceState<R, B>>>,
    headers: HeaderMap,
    Path(job_id): Path<u64>,
) -> Result<Response, MarketplaceError>
where
    R: MarketplaceRepository + 'static,
    B: BlobStore + 'static,
{
    let caller = state.caller(&headers)?;
    let listing = state.jobs.applicants(&caller, JobId(job_id))?;
    Ok(Json(listing).into_response())
}

async fn complete_job_handler<R, B>(
    State(state): State<Arc<MarketplaceState<R, B>>>,
    headers: HeaderMap,
    Path(job_id): Path<u64>,
    Json(request): Json<CompleteJobRequest>,
) -> Result<Response, MarketplaceError>
where
    R: MarketplaceRepository + 'static,
    B: BlobStore + 'static,
{
    let caller = state.caller(&headers)?;
    let outcome = state.completion.complete(&caller, JobId(job_id), request)?;
    let body = Json(json!({
        "message": "Job marked as completed and honor points awarded",
        "job": outcome.job,
        "awarded_points": outcome.awarded_points,
        "freelancer": outcome.freelancer,
    }));
    Ok(body.into_response())
}

async fn apply_handler<R, B>(
    State(state): State<Arc<MarketplaceState<R, B>>>,
    headers: HeaderMap,
    Path(job_id): Path<u64>,
    Json(request): Json<ApplyRequest>,
) -> Result<Response, MarketplaceError>
where
    R: MarketplaceRepository + 'static,
    B: BlobStore + 'static,
{
    let caller = state.caller(&headers)?;
    let application = state.applications.apply(&caller, JobId(job_id), request)?;
    Ok((StatusCode::CREATED, Json(application)).into_response())
}

async fn list_applications_handler<R, B>(
    State(state): State<Arc<MarketplaceState<R, B>>>,
    headers: HeaderMap,
) -> Result<Response, MarketplaceError>
where
    R: MarketplaceRepository + 'static,
    B: BlobStore + 'static,
{
    let caller = state.caller(&headers)?;
    match state.applications.list_visible(&caller)? {
        ApplicationListing::Company(entries) => Ok(Json(entries).into_response()),
        ApplicationListing::Freelancer(entries) => Ok(Json(entries).into_response()),
    }
}

async fn show_application_handler<R, B>(
    State(state): State<Arc<MarketplaceState<R, B>>>,
    headers: HeaderMap,
    Path(application_id): Path<u64>,
) -> Result<Response, MarketplaceError>
where
    R: MarketplaceRepository + 'static,
    B: BlobStore + 'static,
{
    let caller = state.caller(&headers)?;
    let detail = state
        .applications
        .get(&caller, ApplicationId(application_id))?;
    Ok(Json(detail).into_response())
}

async fn update_application_status_handler<R, B>(
    State(state): State<Arc<MarketplaceState<R, B>>>,
    headers: HeaderMap,
    Path(application_id): Path<u64>,
    Json(request): Json<UpdateStatusRequest>,
) -> Result<Response, MarketplaceError>
where
    R: MarketplaceRepository + 'static,
    B: BlobStore + 'static,
{
    let caller = state.caller(&headers)?;
    let application =
        state
            .applications
            .update_status(&caller, ApplicationId(application_id), request)?;
    let body = Json(json!({
        "message": "Application status updated",
        "application": application,
    }));
    Ok(body.into_response())
}

async fn download_cv_handler<R, B>(
    State(state): State<Arc<MarketplaceState<R, B>>>,
    headers: HeaderMap,
    Path(application_id): Path<u64>,
) -> Result<Response, MarketplaceError>
where
    R: MarketplaceRepository + 'static,
    B: BlobStore + 'static,
{
    let caller = state.caller(&headers)?;
    let download = state
        .applications
        .download_cv(&caller, ApplicationId(application_id))?;
    let disposition = format!("attachment; filename=\"{}\"", download.filename);
    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, download.mime_type),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        download.bytes,
    )
        .into_response())
}

async fn company_cvs_handler<R, B>(
    State(state): State<Arc<MarketplaceState<R, B>>>,
    headers: HeaderMap,
) -> Result<Response, MarketplaceError>
where
    R: MarketplaceRepository + 'static,
    B: BlobStore + 'static,
{
    let caller = state.caller(&headers)?;
    let listing = state.applications.list_company_cvs(&caller)?;
    Ok(Json(listing).into_response())
}

async fn list_honor_points_handler<R, B>(
    State(state): State<Arc<MarketplaceState<R, B>>>,
    headers: HeaderMap,
) -> Result<Response, MarketplaceError>
where
    R: MarketplaceRepository + 'static,
    B: BlobStore + 'static,
{
    let caller = state.caller(&headers)?;
    let entries = state.honor.list_for_freelancer(&caller)?;
    Ok(Json(entries).into_response())
}

async fn show_honor_point_handler<R, B>(
    State(state): State<Arc<MarketplaceState<R, B>>>,
    headers: HeaderMap,
    Path(honor_point_id): Path<u64>,
) -> Result<Response, MarketplaceError>
where
    R: MarketplaceRepository + 'static,
    B: BlobStore + 'static,
{
    let caller = state.caller(&headers)?;
    let detail = state.honor.get(&caller, HonorPointId(honor_point_id))?;
    Ok(Json(detail).into_response())
}

async fn award_honor_points_handler<R, B>(
    State(state): State<Arc<MarketplaceState<R, B>>>,
    headers: HeaderMap,
    Path(job_id): Path<u64>,
    Json(request): Json<AwardRequest>,
) -> Result<Response, MarketplaceError>
where
    R: MarketplaceRepository + 'static,
    B: BlobStore + 'static,
{
    let caller = state.caller(&headers)?;
    let award = state.honor.award(&caller, JobId(job_id), request)?;
    Ok((StatusCode::CREATED, Json(award)).into_response())
}
