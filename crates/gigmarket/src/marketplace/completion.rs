use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::info;

use super::domain::{Caller, FreelancerSummary, Job, JobId, UserId};
use super::error::MarketplaceError;
use super::honor::validate_points;
use super::repository::{CompletionCommand, MarketplaceRepository, RepositoryError};

const MAX_NOTES_LEN: usize = 500;

/// Completion payload.
#[derive(Debug, Clone, Deserialize)]
pub struct CompleteJobRequest {
    pub freelancer_id: u64,
    pub points: u32,
    #[serde(default)]
    pub completion_notes: Option<String>,
}

/// What the coordinator hands back: the refreshed job, the awarded points,
/// and a minimal freelancer projection.
#[derive(Debug, Clone, Serialize)]
pub struct CompletionOutcome {
    pub job: Job,
    pub awarded_points: u32,
    pub freelancer: FreelancerSummary,
}

/// The completion transaction coordinator. Preconditions are checked in a
/// fixed order, fail-fast, before the store applies the four writes as one
/// atomic unit.
pub struct CompletionService<R> {
    repository: Arc<R>,
}

impl<R> CompletionService<R>
where
    R: MarketplaceRepository,
{
    pub fn new(repository: Arc<R>) -> Self {
        Self { repository }
    }

    pub fn complete(
        &self,
        caller: &Caller,
        job_id: JobId,
        request: CompleteJobRequest,
    ) -> Result<CompletionOutcome, MarketplaceError> {
        let freelancer_id = UserId(request.freelancer_id);

        // 1. Ownership.
        let job = self
            .repository
            .job(job_id)?
            .ok_or_else(|| MarketplaceError::NotFound("Not found".to_string()))?;
        if job.user_id != caller.id {
            return Err(MarketplaceError::Forbidden(
                "Unauthorized - You can only complete your own jobs".to_string(),
            ));
        }

        // 2. The freelancer actually applied.
        if self
            .repository
            .application_for(job.id, freelancer_id)?
            .is_none()
        {
            return Err(MarketplaceError::Conflict(
                "This freelancer did not apply to this job".to_string(),
            ));
        }

        // 3. Point bounds.
        validate_points(request.points)?;
        if let Some(notes) = request.completion_notes.as_deref() {
            if notes.len() > MAX_NOTES_LEN {
                return Err(MarketplaceError::Validation(
                    "completion_notes must be at most 500 characters".to_string(),
                ));
            }
        }

        let record = self
            .repository
            .complete_job(CompletionCommand {
                job_id: job.id,
                freelancer: freelancer_id,
                points: request.points,
                completed_by: caller.id,
                completion_notes: request.completion_notes,
            })
            .map_err(|err| match err {
                // The commit-time status re-check: the job was not (or is no
                // longer) published, e.g. a concurrent completion won.
                RepositoryError::Conflict => {
                    MarketplaceError::Conflict("Job is not published".to_string())
                }
                other => other.into(),
            })?;

        info!(
            job_id = record.job.id.0,
            freelancer = record.freelancer.id.0,
            points = record.award.points,
            "job completed and honor points awarded"
        );

        Ok(CompletionOutcome {
            job: record.job,
            awarded_points: record.award.points,
            freelancer: FreelancerSummary::from(&record.freelancer),
        })
    }
}
