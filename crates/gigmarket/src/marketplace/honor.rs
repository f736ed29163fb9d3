use std::sync::Arc;

use serde::Deserialize;
use tracing::info;

use super::domain::{
    Caller, HonorPoint, HonorPointDetail, HonorPointId, HonorPointWithJob, JobId, UserView,
};
use super::error::MarketplaceError;
use super::repository::{AwardCommand, MarketplaceRepository};

pub(crate) const MIN_POINTS: u32 = 1;
pub(crate) const MAX_POINTS: u32 = 100;

/// Direct-award payload.
#[derive(Debug, Clone, Deserialize)]
pub struct AwardRequest {
    pub user_id: u64,
    pub points: u32,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Honor-point ledger operations. Rows are append-only; the award path and
/// the completion transaction are the only writers.
pub struct HonorService<R> {
    repository: Arc<R>,
}

impl<R> HonorService<R>
where
    R: MarketplaceRepository,
{
    pub fn new(repository: Arc<R>) -> Self {
        Self { repository }
    }

    /// Awards points outside a completion: ledger row plus running-total
    /// increment, committed together by the store.
    pub fn award(
        &self,
        caller: &Caller,
        job_id: JobId,
        request: AwardRequest,
    ) -> Result<HonorPoint, MarketplaceError> {
        let job = self
            .repository
            .job(job_id)?
            .ok_or_else(|| MarketplaceError::NotFound("Not found".to_string()))?;
        if job.user_id != caller.id {
            return Err(MarketplaceError::Forbidden("Unauthorized".to_string()));
        }

        let recipient = self
            .repository
            .user(super::domain::UserId(request.user_id))?
            .ok_or_else(|| MarketplaceError::Validation("no such user".to_string()))?;
        if !recipient.is_freelancer() {
            return Err(MarketplaceError::Validation(
                "User is not a freelancer".to_string(),
            ));
        }
        validate_points(request.points)?;

        let award = self.repository.award_points(AwardCommand {
            recipient: recipient.id,
            job_id: job.id,
            points: request.points,
            awarded_by: caller.id,
            notes: request.notes,
        })?;

        info!(
            honor_point_id = award.id.0,
            recipient = recipient.id.0,
            job_id = job.id.0,
            points = award.points,
            "honor points awarded"
        );
        Ok(award)
    }

    /// Freelancers list their own ledger with job context; companies are
    /// turned away.
    pub fn list_for_freelancer(
        &self,
        caller: &Caller,
    ) -> Result<Vec<HonorPointWithJob>, MarketplaceError> {
        if !caller.is_freelancer() {
            return Err(MarketplaceError::Forbidden(
                "Only freelancers have honor points".to_string(),
            ));
        }

        let mut entries = Vec::new();
        for honor_point in self.repository.honor_points_for_user(caller.id)? {
            // Ledger rows outlive deleted jobs, so the context is optional.
            let job = self.repository.job(honor_point.job_id)?;
            entries.push(HonorPointWithJob { honor_point, job });
        }
        Ok(entries)
    }

    /// Visible to the recipient and the owner of the referenced job.
    pub fn get(
        &self,
        caller: &Caller,
        honor_point_id: HonorPointId,
    ) -> Result<HonorPointDetail, MarketplaceError> {
        let honor_point = self
            .repository
            .honor_point(honor_point_id)?
            .ok_or_else(|| MarketplaceError::NotFound("Not found".to_string()))?;
        let job = self.repository.job(honor_point.job_id)?;

        let owns_job = job
            .as_ref()
            .map(|job| job.user_id == caller.id)
            .unwrap_or(false);
        if honor_point.user_id != caller.id && !owns_job {
            return Err(MarketplaceError::Forbidden("Unauthorized".to_string()));
        }

        let user = self
            .repository
            .user(honor_point.user_id)?
            .ok_or_else(|| MarketplaceError::Internal("Internal server error".to_string()))?;
        Ok(HonorPointDetail {
            honor_point,
            user: UserView::from(&user),
            job,
        })
    }
}

pub(crate) fn validate_points(points: u32) -> Result<(), MarketplaceError> {
    if !(MIN_POINTS..=MAX_POINTS).contains(&points) {
        return Err(MarketplaceError::Validation(
            "points must be between 1 and 100".to_string(),
        ));
    }
    Ok(())
}
