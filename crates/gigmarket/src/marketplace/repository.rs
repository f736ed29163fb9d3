use super::domain::{
    Application, ApplicationId, HonorPoint, HonorPointId, Job, JobId, JobStatus, Role, User,
    UserId,
};

/// Storage abstraction over the four tables so the services can be exercised
/// in isolation. The two command methods (`award_points`, `complete_job`) are
/// the only multi-row mutations and must be all-or-nothing.
pub trait MarketplaceRepository: Send + Sync {
    fn insert_user(&self, user: NewUser) -> Result<User, RepositoryError>;
    fn user(&self, id: UserId) -> Result<Option<User>, RepositoryError>;
    fn user_by_email(&self, email: &str) -> Result<Option<User>, RepositoryError>;
    /// Records the blob path of the user's CV. Last upload wins.
    fn record_cv_path(&self, user: UserId, path: String) -> Result<(), RepositoryError>;

    fn insert_job(&self, job: NewJob) -> Result<Job, RepositoryError>;
    fn job(&self, id: JobId) -> Result<Option<Job>, RepositoryError>;
    fn update_job(&self, job: Job) -> Result<(), RepositoryError>;
    /// Hard delete; cascades to the job's applications. Honor-point rows are
    /// append-only and survive.
    fn delete_job(&self, id: JobId) -> Result<(), RepositoryError>;
    fn jobs_owned_by(&self, owner: UserId) -> Result<Vec<Job>, RepositoryError>;
    fn published_jobs(&self) -> Result<Vec<Job>, RepositoryError>;
    fn job_count_for_owner(&self, owner: UserId) -> Result<usize, RepositoryError>;

    /// Inserts a new application. The (job_id, user_id) uniqueness constraint
    /// is enforced here, under the store's own lock, so concurrent applies
    /// for the same pair yield exactly one success.
    fn insert_application(
        &self,
        application: NewApplication,
    ) -> Result<Application, RepositoryError>;
    fn application(&self, id: ApplicationId) -> Result<Option<Application>, RepositoryError>;
    fn update_application(&self, application: Application) -> Result<(), RepositoryError>;
    fn applications_for_job(&self, job: JobId) -> Result<Vec<Application>, RepositoryError>;
    fn applications_for_applicant(
        &self,
        user: UserId,
    ) -> Result<Vec<Application>, RepositoryError>;
    fn application_for(
        &self,
        job: JobId,
        user: UserId,
    ) -> Result<Option<Application>, RepositoryError>;

    fn honor_point(&self, id: HonorPointId) -> Result<Option<HonorPoint>, RepositoryError>;
    fn honor_points_for_user(&self, user: UserId) -> Result<Vec<HonorPoint>, RepositoryError>;

    /// Appends a ledger row and increments the recipient's `total_points` as
    /// one atomic unit.
    fn award_points(&self, command: AwardCommand) -> Result<HonorPoint, RepositoryError>;

    /// The completion transaction. Re-verifies `job.status == Published` at
    /// commit time, then applies all four writes (job completed, application
    /// hired, ledger row, total increment) or none of them.
    fn complete_job(&self, command: CompletionCommand)
        -> Result<CompletionRecord, RepositoryError>;
}

/// Insert payload for a user account.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub role: Role,
    pub company_name: Option<String>,
}

/// Insert payload for a job posting.
#[derive(Debug, Clone)]
pub struct NewJob {
    pub owner: UserId,
    pub title: String,
    pub description: String,
    pub requirements: String,
    pub status: JobStatus,
}

/// Insert payload for an application.
#[derive(Debug, Clone)]
pub struct NewApplication {
    pub job_id: JobId,
    pub user_id: UserId,
    pub cover_letter: String,
}

/// Payload for the atomic award-plus-increment pair.
#[derive(Debug, Clone)]
pub struct AwardCommand {
    pub recipient: UserId,
    pub job_id: JobId,
    pub points: u32,
    pub awarded_by: UserId,
    pub notes: Option<String>,
}

/// Payload for the completion transaction.
#[derive(Debug, Clone)]
pub struct CompletionCommand {
    pub job_id: JobId,
    pub freelancer: UserId,
    pub points: u32,
    pub completed_by: UserId,
    pub completion_notes: Option<String>,
}

/// Everything the completion transaction touched, refreshed post-commit.
#[derive(Debug, Clone)]
pub struct CompletionRecord {
    pub job: Job,
    pub application: Application,
    pub award: HonorPoint,
    pub freelancer: User,
}

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists or is in a conflicting state")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}
