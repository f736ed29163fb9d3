use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::domain::{Caller, Role, UserId};
use super::error::MarketplaceError;
use super::repository::MarketplaceRepository;

/// Role-specific profile projection.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum ProfileView {
    Freelancer(FreelancerProfile),
    Company(CompanyProfile),
}

#[derive(Debug, Clone, Serialize)]
pub struct FreelancerProfile {
    pub role: Role,
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub total_points: i64,
    pub cv_url: Option<String>,
    pub member_since: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CompanyProfile {
    pub role: Role,
    pub id: UserId,
    pub company_name: Option<String>,
    pub email: String,
    pub total_jobs_posted: usize,
    pub member_since: DateTime<Utc>,
}

/// Builds the role-specific `/profile` projection.
pub struct ProfileService<R> {
    repository: Arc<R>,
}

impl<R> ProfileService<R>
where
    R: MarketplaceRepository,
{
    pub fn new(repository: Arc<R>) -> Self {
        Self { repository }
    }

    pub fn profile(&self, caller: &Caller) -> Result<ProfileView, MarketplaceError> {
        let user = self
            .repository
            .user(caller.id)?
            .ok_or(MarketplaceError::Unauthenticated)?;

        if user.is_freelancer() {
            return Ok(ProfileView::Freelancer(FreelancerProfile {
                role: user.role,
                id: user.id,
                name: user.name,
                email: user.email,
                total_points: user.total_points,
                cv_url: user.cv_path.map(|path| format!("/storage/{path}")),
                member_since: user.created_at,
            }));
        }

        let total_jobs_posted = self.repository.job_count_for_owner(user.id)?;
        Ok(ProfileView::Company(CompanyProfile {
            role: user.role,
            id: user.id,
            company_name: user.company_name,
            email: user.email,
            total_jobs_posted,
            member_since: user.created_at,
        }))
    }
}
