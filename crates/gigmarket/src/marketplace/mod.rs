//! Marketplace core: job/application/honor-point lifecycles, the completion
//! transaction coordinator, and the HTTP surface over them.

pub mod applications;
pub mod blob;
pub mod completion;
pub mod domain;
pub mod error;
pub mod honor;
pub mod identity;
pub mod jobs;
pub mod profile;
pub mod repository;
pub mod router;
pub mod store;

#[cfg(test)]
mod tests;

pub use applications::{
    ApplicationListing, ApplicationService, ApplyRequest, CvDownload, CvUpload,
    UpdateStatusRequest,
};
pub use blob::{BlobError, BlobMetadata, BlobStore, InMemoryBlobStore};
pub use completion::{CompleteJobRequest, CompletionOutcome, CompletionService};
pub use domain::{
    ApplicantListing, ApplicantView, Application, ApplicationDetail, ApplicationId,
    ApplicationStatus, ApplicationWithJob, ApplicationWithUser, Caller, CvData, CvDescriptor,
    CvListing, FreelancerSummary, HonorPoint, HonorPointDetail, HonorPointId, HonorPointWithJob,
    Job, JobId, JobStatus, Role, User, UserId, UserView,
};
pub use error::MarketplaceError;
pub use honor::{AwardRequest, HonorService};
pub use identity::{IdentityService, LoginRequest, RegisterRequest, Session, TokenRegistry};
pub use jobs::{CreateJobRequest, JobService, UpdateJobRequest};
pub use profile::{CompanyProfile, FreelancerProfile, ProfileService, ProfileView};
pub use repository::{
    AwardCommand, CompletionCommand, CompletionRecord, MarketplaceRepository, NewApplication,
    NewJob, NewUser, RepositoryError,
};
pub use router::{marketplace_router, MarketplaceState};
pub use store::InMemoryMarketplace;
