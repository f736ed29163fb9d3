use std::sync::Arc;

use serde::Deserialize;
use tracing::info;

use super::domain::{
    ApplicantListing, ApplicantView, ApplicationWithUser, Caller, Job, JobId, JobStatus,
    UserView,
};
use super::error::MarketplaceError;
use super::repository::{MarketplaceRepository, NewJob};

const MAX_TITLE_LEN: usize = 255;

/// Creation payload. `status` is parsed here rather than by serde so unknown
/// values surface as validation errors instead of body rejections.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateJobRequest {
    pub title: String,
    pub description: String,
    pub requirements: String,
    pub status: String,
}

/// Partial-update payload over the mutable job fields.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateJobRequest {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub requirements: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

/// Job lifecycle operations. Every method takes the authenticated caller
/// explicitly; nothing reads ambient identity.
pub struct JobService<R> {
    repository: Arc<R>,
}

impl<R> JobService<R>
where
    R: MarketplaceRepository,
{
    pub fn new(repository: Arc<R>) -> Self {
        Self { repository }
    }

    pub fn create(&self, caller: &Caller, request: CreateJobRequest) -> Result<Job, MarketplaceError> {
        if !caller.is_company() {
            return Err(MarketplaceError::CompanyRequired);
        }

        let status = parse_creation_status(&request.status)?;
        require_text("title", &request.title)?;
        if request.title.len() > MAX_TITLE_LEN {
            return Err(MarketplaceError::Validation(
                "title must be at most 255 characters".to_string(),
            ));
        }
        require_text("description", &request.description)?;
        require_text("requirements", &request.requirements)?;

        let job = self.repository.insert_job(NewJob {
            owner: caller.id,
            title: request.title,
            description: request.description,
            requirements: request.requirements,
            status,
        })?;

        info!(job_id = job.id.0, owner = caller.id.0, status = job.status.label(), "job created");
        Ok(job)
    }

    pub fn update(
        &self,
        caller: &Caller,
        job_id: JobId,
        request: UpdateJobRequest,
    ) -> Result<Job, MarketplaceError> {
        let mut job = self.owned_job(caller, job_id)?;

        if let Some(status) = request.status.as_deref() {
            job.status = parse_creation_status(status)?;
        }
        if let Some(title) = request.title {
            require_text("title", &title)?;
            if title.len() > MAX_TITLE_LEN {
                return Err(MarketplaceError::Validation(
                    "title must be at most 255 characters".to_string(),
                ));
            }
            job.title = title;
        }
        if let Some(description) = request.description {
            require_text("description", &description)?;
            job.description = description;
        }
        if let Some(requirements) = request.requirements {
            require_text("requirements", &requirements)?;
            job.requirements = requirements;
        }

        self.repository.update_job(job.clone())?;
        Ok(job)
    }

    pub fn delete(&self, caller: &Caller, job_id: JobId) -> Result<(), MarketplaceError> {
        let job = self.owned_job(caller, job_id)?;
        self.repository.delete_job(job.id)?;
        info!(job_id = job.id.0, owner = caller.id.0, "job deleted");
        Ok(())
    }

    /// Companies see all of their own jobs; freelancers see published jobs
    /// from every company.
    pub fn list_visible(&self, caller: &Caller) -> Result<Vec<Job>, MarketplaceError> {
        let jobs = if caller.is_company() {
            self.repository.jobs_owned_by(caller.id)?
        } else {
            self.repository.published_jobs()?
        };
        Ok(jobs)
    }

    /// A draft job is visible only to its owner. Everyone else gets
    /// `NotFound` rather than `Forbidden` so its existence does not leak.
    pub fn get(&self, caller: &Caller, job_id: JobId) -> Result<Job, MarketplaceError> {
        let job = self
            .repository
            .job(job_id)?
            .ok_or_else(|| MarketplaceError::NotFound("Not found".to_string()))?;
        if job.status == JobStatus::Draft && job.user_id != caller.id {
            return Err(MarketplaceError::NotFound("Not found".to_string()));
        }
        Ok(job)
    }

    pub fn applications(
        &self,
        caller: &Caller,
        job_id: JobId,
    ) -> Result<Vec<ApplicationWithUser>, MarketplaceError> {
        let job = self.owned_job(caller, job_id)?;
        let mut entries = Vec::new();
        for application in self.repository.applications_for_job(job.id)? {
            let user = self
                .repository
                .user(application.user_id)?
                .ok_or_else(|| MarketplaceError::Internal("Internal server error".to_string()))?;
            entries.push(ApplicationWithUser {
                application,
                user: UserView::from(&user),
            });
        }
        Ok(entries)
    }

    /// Owner-only applicant listing, enriched with a CV download URL for
    /// applicants that have one stored.
    pub fn applicants(
        &self,
        caller: &Caller,
        job_id: JobId,
    ) -> Result<ApplicantListing, MarketplaceError> {
        let job = self.owned_job_for_applicants(caller, job_id)?;
        let mut applicants = Vec::new();
        for application in self.repository.applications_for_job(job.id)? {
            let user = self
                .repository
                .user(application.user_id)?
                .ok_or_else(|| MarketplaceError::Internal("Internal server error".to_string()))?;
            let cv_download_url = user
                .cv_path
                .as_ref()
                .map(|_| format!("/api/applications/{}/cv", application.id.0));
            applicants.push(ApplicantView {
                application_id: application.id,
                status: application.status,
                applied_at: application.created_at,
                freelancer: UserView::from(&user),
                cover_letter: application.cover_letter,
                cv_download_url,
            });
        }
        Ok(ApplicantListing {
            job_id: job.id,
            job_title: job.title,
            total_applicants: applicants.len(),
            applicants,
        })
    }

    fn owned_job(&self, caller: &Caller, job_id: JobId) -> Result<Job, MarketplaceError> {
        let job = self
            .repository
            .job(job_id)?
            .ok_or_else(|| MarketplaceError::NotFound("Not found".to_string()))?;
        if job.user_id != caller.id {
            return Err(MarketplaceError::Forbidden("Unauthorized".to_string()));
        }
        Ok(job)
    }

    fn owned_job_for_applicants(
        &self,
        caller: &Caller,
        job_id: JobId,
    ) -> Result<Job, MarketplaceError> {
        let job = self
            .repository
            .job(job_id)?
            .ok_or_else(|| MarketplaceError::NotFound("Not found".to_string()))?;
        if job.user_id != caller.id {
            return Err(MarketplaceError::Forbidden(
                "Unauthorized - You can only view applicants for your own jobs".to_string(),
            ));
        }
        Ok(job)
    }
}

fn parse_creation_status(value: &str) -> Result<JobStatus, MarketplaceError> {
    match JobStatus::parse(value) {
        Some(JobStatus::Draft) => Ok(JobStatus::Draft),
        Some(JobStatus::Published) => Ok(JobStatus::Published),
        // `completed` is reachable only through the completion transaction.
        _ => Err(MarketplaceError::Validation(
            "status must be 'draft' or 'published'".to_string(),
        )),
    }
}

fn require_text(field: &str, value: &str) -> Result<(), MarketplaceError> {
    if value.trim().is_empty() {
        return Err(MarketplaceError::Validation(format!("{field} is required")));
    }
    Ok(())
}
