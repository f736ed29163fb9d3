use std::sync::Arc;

use base64::Engine;
use serde::Deserialize;
use tracing::{error, info};
use uuid::Uuid;

use super::blob::{BlobError, BlobStore};
use super::domain::{
    Application, ApplicationDetail, ApplicationId, ApplicationStatus, ApplicationWithJob, Caller,
    CvData, CvDescriptor, CvListing, JobId, JobStatus, UserView,
};
use super::error::MarketplaceError;
use super::repository::{MarketplaceRepository, NewApplication, RepositoryError};

/// CV upload policy: document types only, capped at 2 MiB.
const MAX_CV_BYTES: usize = 2 * 1024 * 1024;
const ALLOWED_CV_EXTENSIONS: [&str; 3] = ["pdf", "doc", "docx"];
const MAX_NOTES_LEN: usize = 500;
const MAX_RATING: u8 = 100;

/// Apply payload. The CV rides the JSON body as base64.
#[derive(Debug, Clone, Deserialize)]
pub struct ApplyRequest {
    pub cover_letter: String,
    pub cv: CvUpload,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CvUpload {
    pub filename: String,
    pub content_base64: String,
}

/// Status-update payload for the free-form review path.
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: String,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub rating: Option<u8>,
}

/// Either listing shape, depending on the caller's role.
pub enum ApplicationListing {
    Company(Vec<ApplicationDetail>),
    Freelancer(Vec<ApplicationWithJob>),
}

/// A CV ready to stream back to the owning company.
#[derive(Debug)]
pub struct CvDownload {
    pub filename: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

/// Application lifecycle operations: intake with CV storage, the permissive
/// status-update path, and the CV read endpoints.
pub struct ApplicationService<R, B> {
    repository: Arc<R>,
    blobs: Arc<B>,
}

impl<R, B> ApplicationService<R, B>
where
    R: MarketplaceRepository,
    B: BlobStore,
{
    pub fn new(repository: Arc<R>, blobs: Arc<B>) -> Self {
        Self { repository, blobs }
    }

    pub fn apply(
        &self,
        caller: &Caller,
        job_id: JobId,
        request: ApplyRequest,
    ) -> Result<Application, MarketplaceError> {
        if !caller.is_freelancer() {
            return Err(MarketplaceError::Forbidden(
                "Only freelancers can apply".to_string(),
            ));
        }

        let job = self
            .repository
            .job(job_id)?
            .ok_or_else(|| MarketplaceError::NotFound("Not found".to_string()))?;
        if job.status != JobStatus::Published {
            return Err(MarketplaceError::Conflict(
                "Job is not published".to_string(),
            ));
        }

        if self.repository.application_for(job.id, caller.id)?.is_some() {
            return Err(MarketplaceError::Conflict(
                "You have already applied to this job".to_string(),
            ));
        }

        if request.cover_letter.trim().is_empty() {
            return Err(MarketplaceError::Validation(
                "cover_letter is required".to_string(),
            ));
        }
        let (extension, bytes) = validate_cv(&request.cv)?;

        let path = format!("cvs/{}.{extension}", Uuid::new_v4());
        self.blobs.put(&path, bytes).map_err(internal_blob_error)?;

        let application = self
            .repository
            .insert_application(NewApplication {
                job_id: job.id,
                user_id: caller.id,
                cover_letter: request.cover_letter,
            })
            .map_err(|err| match err {
                // The store's uniqueness constraint closes the apply race.
                RepositoryError::Conflict => MarketplaceError::Conflict(
                    "You have already applied to this job".to_string(),
                ),
                other => other.into(),
            })?;

        // One CV per user: the latest upload replaces the recorded path for
        // every prior application.
        self.repository.record_cv_path(caller.id, path)?;

        info!(
            application_id = application.id.0,
            job_id = job.id.0,
            applicant = caller.id.0,
            "application submitted"
        );
        Ok(application)
    }

    /// Free-form status update: any status is reachable from any status, and
    /// the completion notes are overwritten (or cleared) on every call.
    pub fn update_status(
        &self,
        caller: &Caller,
        application_id: ApplicationId,
        request: UpdateStatusRequest,
    ) -> Result<Application, MarketplaceError> {
        let mut application = self
            .repository
            .application(application_id)?
            .ok_or_else(|| MarketplaceError::NotFound("Not found".to_string()))?;
        let job = self
            .repository
            .job(application.job_id)?
            .ok_or_else(|| MarketplaceError::NotFound("Not found".to_string()))?;
        if job.user_id != caller.id {
            return Err(MarketplaceError::Forbidden(
                "Unauthorized - You can only update applications for your own jobs".to_string(),
            ));
        }

        let status = ApplicationStatus::parse(&request.status).ok_or_else(|| {
            MarketplaceError::Validation(
                "status must be one of pending, reviewed, hired, rejected, completed".to_string(),
            )
        })?;
        if let Some(notes) = request.notes.as_deref() {
            if notes.len() > MAX_NOTES_LEN {
                return Err(MarketplaceError::Validation(
                    "notes must be at most 500 characters".to_string(),
                ));
            }
        }
        if let Some(rating) = request.rating {
            if rating > MAX_RATING {
                return Err(MarketplaceError::Validation(
                    "rating must be at most 100".to_string(),
                ));
            }
            application.rating = Some(rating);
        }

        application.status = status;
        application.completion_notes = request.notes;
        self.repository.update_application(application.clone())?;
        Ok(application)
    }

    /// Visible only to the applicant and the owning company.
    pub fn get(
        &self,
        caller: &Caller,
        application_id: ApplicationId,
    ) -> Result<ApplicationDetail, MarketplaceError> {
        let application = self
            .repository
            .application(application_id)?
            .ok_or_else(|| MarketplaceError::NotFound("Not found".to_string()))?;
        let job = self
            .repository
            .job(application.job_id)?
            .ok_or_else(|| MarketplaceError::NotFound("Not found".to_string()))?;
        if application.user_id != caller.id && job.user_id != caller.id {
            return Err(MarketplaceError::Forbidden("Unauthorized".to_string()));
        }
        let user = self
            .repository
            .user(application.user_id)?
            .ok_or_else(|| MarketplaceError::Internal("Internal server error".to_string()))?;
        Ok(ApplicationDetail {
            application,
            user: UserView::from(&user),
            job,
        })
    }

    /// Companies list applications across their jobs; freelancers list their
    /// own, with job context.
    pub fn list_visible(&self, caller: &Caller) -> Result<ApplicationListing, MarketplaceError> {
        if caller.is_company() {
            let mut entries = Vec::new();
            for job in self.repository.jobs_owned_by(caller.id)? {
                for application in self.repository.applications_for_job(job.id)? {
                    let user = self.repository.user(application.user_id)?.ok_or_else(|| {
                        MarketplaceError::Internal("Internal server error".to_string())
                    })?;
                    entries.push(ApplicationDetail {
                        application,
                        user: UserView::from(&user),
                        job: job.clone(),
                    });
                }
            }
            return Ok(ApplicationListing::Company(entries));
        }

        let mut entries = Vec::new();
        for application in self.repository.applications_for_applicant(caller.id)? {
            let job = self
                .repository
                .job(application.job_id)?
                .ok_or_else(|| MarketplaceError::Internal("Internal server error".to_string()))?;
            entries.push(ApplicationWithJob { application, job });
        }
        Ok(ApplicationListing::Freelancer(entries))
    }

    /// Streams the applicant's recorded CV to the owning company.
    pub fn download_cv(
        &self,
        caller: &Caller,
        application_id: ApplicationId,
    ) -> Result<CvDownload, MarketplaceError> {
        let application = self
            .repository
            .application(application_id)?
            .ok_or_else(|| MarketplaceError::NotFound("Not found".to_string()))?;
        let job = self
            .repository
            .job(application.job_id)?
            .ok_or_else(|| MarketplaceError::NotFound("Not found".to_string()))?;
        if job.user_id != caller.id {
            return Err(MarketplaceError::Forbidden("Unauthorized".to_string()));
        }

        let user = self
            .repository
            .user(application.user_id)?
            .ok_or_else(|| MarketplaceError::Internal("Internal server error".to_string()))?;
        let path = user
            .cv_path
            .ok_or_else(|| MarketplaceError::NotFound("CV not found".to_string()))?;

        let bytes = match self.blobs.read(&path) {
            Ok(bytes) => bytes,
            Err(BlobError::NotFound) => {
                return Err(MarketplaceError::NotFound("CV not found".to_string()))
            }
            Err(err) => return Err(internal_blob_error(err)),
        };
        let metadata = self.blobs.metadata(&path).map_err(internal_blob_error)?;

        Ok(CvDownload {
            filename: metadata.filename,
            mime_type: metadata.mime_type,
            bytes,
        })
    }

    /// Company-wide CV listing. Empty result sets are structured `NotFound`
    /// responses ("no applications" and "no CVs" each have their own
    /// message), never an internal error.
    pub fn list_company_cvs(&self, caller: &Caller) -> Result<CvListing, MarketplaceError> {
        let mut applications = Vec::new();
        for job in self.repository.jobs_owned_by(caller.id)? {
            for application in self.repository.applications_for_job(job.id)? {
                applications.push((job.clone(), application));
            }
        }
        if applications.is_empty() {
            return Err(MarketplaceError::NotFound(
                "No applications found for your jobs".to_string(),
            ));
        }

        let mut cvs = Vec::new();
        for (job, application) in applications {
            let user = self
                .repository
                .user(application.user_id)?
                .ok_or_else(|| MarketplaceError::Internal("Internal server error".to_string()))?;
            let Some(path) = user.cv_path.as_deref() else {
                continue;
            };
            match self.blobs.exists(path) {
                Ok(true) => {}
                Ok(false) => continue,
                Err(err) => {
                    error!(%err, path, "CV listing failed");
                    return Err(MarketplaceError::Internal(
                        "Failed to retrieve CVs".to_string(),
                    ));
                }
            }
            let metadata = match self.blobs.metadata(path) {
                Ok(metadata) => metadata,
                Err(err) => {
                    error!(%err, path, "CV listing failed");
                    return Err(MarketplaceError::Internal(
                        "Failed to retrieve CVs".to_string(),
                    ));
                }
            };
            cvs.push(CvDescriptor {
                application_id: application.id,
                job_id: job.id,
                job_title: job.title,
                applicant_name: user.name,
                applicant_email: user.email,
                cv_data: CvData {
                    filename: metadata.filename,
                    mime_type: metadata.mime_type,
                    size: metadata.size,
                    last_updated: metadata.last_modified,
                    download_url: format!("/api/applications/{}/cv", application.id.0),
                },
                application_status: application.status,
                applied_at: application.created_at,
            });
        }

        if cvs.is_empty() {
            return Err(MarketplaceError::NotFound(
                "No CVs found for your job applicants".to_string(),
            ));
        }

        Ok(CvListing {
            count: cvs.len(),
            cvs,
        })
    }
}

fn validate_cv(upload: &CvUpload) -> Result<(String, Vec<u8>), MarketplaceError> {
    let extension = upload
        .filename
        .rsplit('.')
        .next()
        .map(str::to_ascii_lowercase)
        .filter(|ext| ALLOWED_CV_EXTENSIONS.contains(&ext.as_str()))
        .ok_or_else(|| {
            MarketplaceError::Validation("cv must be a pdf, doc, or docx file".to_string())
        })?;

    let bytes = base64::engine::general_purpose::STANDARD
        .decode(upload.content_base64.as_bytes())
        .map_err(|_| {
            MarketplaceError::Validation("cv payload is not valid base64".to_string())
        })?;
    if bytes.is_empty() {
        return Err(MarketplaceError::Validation("cv file is empty".to_string()));
    }
    if bytes.len() > MAX_CV_BYTES {
        return Err(MarketplaceError::Validation(
            "cv must be at most 2 MiB".to_string(),
        ));
    }
    Ok((extension, bytes))
}

fn internal_blob_error(err: BlobError) -> MarketplaceError {
    error!(%err, "blob store operation failed");
    MarketplaceError::Internal("Internal server error".to_string())
}
