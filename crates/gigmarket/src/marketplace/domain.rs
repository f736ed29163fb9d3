use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identifier wrapper for user accounts.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct UserId(pub u64);

/// Identifier wrapper for posted jobs.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct JobId(pub u64);

/// Identifier wrapper for job applications.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct ApplicationId(pub u64);

/// Identifier wrapper for honor-point ledger entries.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct HonorPointId(pub u64);

/// The two mutually exclusive account roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Company,
    Freelancer,
}

impl Role {
    pub const fn label(self) -> &'static str {
        match self {
            Role::Company => "company",
            Role::Freelancer => "freelancer",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "company" => Some(Role::Company),
            "freelancer" => Some(Role::Freelancer),
            _ => None,
        }
    }
}

/// Job lifecycle states. The `completed` edge is owned by the completion
/// transaction; job updates accept only `draft` and `published`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Draft,
    Published,
    Completed,
}

impl JobStatus {
    pub const fn label(self) -> &'static str {
        match self {
            JobStatus::Draft => "draft",
            JobStatus::Published => "published",
            JobStatus::Completed => "completed",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "draft" => Some(JobStatus::Draft),
            "published" => Some(JobStatus::Published),
            "completed" => Some(JobStatus::Completed),
            _ => None,
        }
    }
}

/// Application review states. Any status is reachable from any status via the
/// free-form update path; `hired` is additionally set by the completion
/// transaction as the terminal "won" marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationStatus {
    Pending,
    Reviewed,
    Hired,
    Rejected,
    Completed,
}

impl ApplicationStatus {
    pub const fn label(self) -> &'static str {
        match self {
            ApplicationStatus::Pending => "pending",
            ApplicationStatus::Reviewed => "reviewed",
            ApplicationStatus::Hired => "hired",
            ApplicationStatus::Rejected => "rejected",
            ApplicationStatus::Completed => "completed",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(ApplicationStatus::Pending),
            "reviewed" => Some(ApplicationStatus::Reviewed),
            "hired" => Some(ApplicationStatus::Hired),
            "rejected" => Some(ApplicationStatus::Rejected),
            "completed" => Some(ApplicationStatus::Completed),
            _ => None,
        }
    }
}

/// A user account. `total_points` is the denormalized sum of the user's
/// honor-point rows, maintained incrementally by the storage layer; `cv_path`
/// is the blob path of the freelancer's last uploaded CV.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub role: Role,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company_name: Option<String>,
    pub total_points: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cv_path: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn is_company(&self) -> bool {
        self.role == Role::Company
    }

    pub fn is_freelancer(&self) -> bool {
        self.role == Role::Freelancer
    }
}

/// A posted work opportunity owned by a company account.
///
/// Invariant: `completed_at` is `Some` iff `status == Completed`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    pub user_id: UserId,
    pub title: String,
    pub description: String,
    pub requirements: String,
    pub status: JobStatus,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// A freelancer's bid to perform a job. At most one row exists per
/// (job, applicant) pair; the store enforces the constraint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Application {
    pub id: ApplicationId,
    pub job_id: JobId,
    pub user_id: UserId,
    pub cover_letter: String,
    pub status: ApplicationStatus,
    pub completion_notes: Option<String>,
    pub completed_at: Option<DateTime<Utc>>,
    pub rating: Option<u8>,
    pub completed_by: Option<UserId>,
    pub created_at: DateTime<Utc>,
}

/// An immutable award record reflecting completed-work credit. Rows are
/// append-only and survive deletion of the referenced job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HonorPoint {
    pub id: HonorPointId,
    pub user_id: UserId,
    pub job_id: JobId,
    pub points: u32,
    pub awarded_by: UserId,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Authenticated caller identity, passed explicitly to every operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Caller {
    pub id: UserId,
    pub role: Role,
}

impl Caller {
    pub fn is_company(&self) -> bool {
        self.role == Role::Company
    }

    pub fn is_freelancer(&self) -> bool {
        self.role == Role::Freelancer
    }
}

/// Public projection of a user embedded in application listings.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserView {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

impl From<&User> for UserView {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
            created_at: user.created_at,
        }
    }
}

/// Minimal freelancer projection returned by the completion transaction.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FreelancerSummary {
    pub id: UserId,
    pub name: String,
    pub total_points: i64,
}

impl From<&User> for FreelancerSummary {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            total_points: user.total_points,
        }
    }
}

/// Application enriched with its applicant, as served to the owning company.
#[derive(Debug, Clone, Serialize)]
pub struct ApplicationWithUser {
    #[serde(flatten)]
    pub application: Application,
    pub user: UserView,
}

/// Application enriched with its parent job, as served to the applicant.
#[derive(Debug, Clone, Serialize)]
pub struct ApplicationWithJob {
    #[serde(flatten)]
    pub application: Application,
    pub job: Job,
}

/// Fully loaded application for the detail endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct ApplicationDetail {
    #[serde(flatten)]
    pub application: Application,
    pub user: UserView,
    pub job: Job,
}

/// One applicant entry in the owner-facing listing for a job.
#[derive(Debug, Clone, Serialize)]
pub struct ApplicantView {
    pub application_id: ApplicationId,
    pub status: ApplicationStatus,
    pub applied_at: DateTime<Utc>,
    pub freelancer: UserView,
    pub cover_letter: String,
    pub cv_download_url: Option<String>,
}

/// Owner-facing applicant listing for a single job.
#[derive(Debug, Clone, Serialize)]
pub struct ApplicantListing {
    pub job_id: JobId,
    pub job_title: String,
    pub total_applicants: usize,
    pub applicants: Vec<ApplicantView>,
}

/// Blob metadata block inside a CV descriptor.
#[derive(Debug, Clone, Serialize)]
pub struct CvData {
    pub filename: String,
    pub mime_type: String,
    pub size: u64,
    pub last_updated: DateTime<Utc>,
    pub download_url: String,
}

/// One entry in the company-wide CV listing.
#[derive(Debug, Clone, Serialize)]
pub struct CvDescriptor {
    pub application_id: ApplicationId,
    pub job_id: JobId,
    pub job_title: String,
    pub applicant_name: String,
    pub applicant_email: String,
    pub cv_data: CvData,
    pub application_status: ApplicationStatus,
    pub applied_at: DateTime<Utc>,
}

/// Company-wide CV listing.
#[derive(Debug, Clone, Serialize)]
pub struct CvListing {
    pub count: usize,
    pub cvs: Vec<CvDescriptor>,
}

/// Honor-point row with job context. The job is optional because ledger rows
/// outlive deleted jobs.
#[derive(Debug, Clone, Serialize)]
pub struct HonorPointWithJob {
    #[serde(flatten)]
    pub honor_point: HonorPoint,
    pub job: Option<Job>,
}

/// Fully loaded honor-point row for the detail endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct HonorPointDetail {
    #[serde(flatten)]
    pub honor_point: HonorPoint,
    pub user: UserView,
    pub job: Option<Job>,
}
