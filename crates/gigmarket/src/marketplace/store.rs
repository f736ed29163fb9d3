use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};

use chrono::Utc;

use super::domain::{
    Application, ApplicationId, ApplicationStatus, HonorPoint, HonorPointId, Job, JobId,
    JobStatus, User, UserId,
};
use super::repository::{
    AwardCommand, CompletionCommand, CompletionRecord, MarketplaceRepository, NewApplication,
    NewJob, NewUser, RepositoryError,
};

/// In-memory storage engine. All four tables live behind one mutex, so every
/// repository call observes and produces a consistent snapshot; the two
/// command methods validate every precondition before touching a row, which
/// makes them all-or-nothing without an undo log.
#[derive(Default)]
pub struct InMemoryMarketplace {
    tables: Mutex<Tables>,
}

#[derive(Default)]
struct Tables {
    users: HashMap<UserId, User>,
    jobs: HashMap<JobId, Job>,
    applications: HashMap<ApplicationId, Application>,
    honor_points: HashMap<HonorPointId, HonorPoint>,
    // Unique index backing the one-application-per-(job, applicant) rule.
    application_keys: HashSet<(JobId, UserId)>,
    user_seq: u64,
    job_seq: u64,
    application_seq: u64,
    honor_point_seq: u64,
}

impl InMemoryMarketplace {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Tables>, RepositoryError> {
        self.tables
            .lock()
            .map_err(|_| RepositoryError::Unavailable("storage mutex poisoned".to_string()))
    }
}

impl MarketplaceRepository for InMemoryMarketplace {
    fn insert_user(&self, user: NewUser) -> Result<User, RepositoryError> {
        let mut tables = self.lock()?;
        if tables
            .users
            .values()
            .any(|existing| existing.email == user.email)
        {
            return Err(RepositoryError::Conflict);
        }

        tables.user_seq += 1;
        let record = User {
            id: UserId(tables.user_seq),
            name: user.name,
            email: user.email,
            role: user.role,
            company_name: user.company_name,
            total_points: 0,
            cv_path: None,
            created_at: Utc::now(),
        };
        tables.users.insert(record.id, record.clone());
        Ok(record)
    }

    fn user(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        Ok(self.lock()?.users.get(&id).cloned())
    }

    fn user_by_email(&self, email: &str) -> Result<Option<User>, RepositoryError> {
        Ok(self
            .lock()?
            .users
            .values()
            .find(|user| user.email == email)
            .cloned())
    }

    fn record_cv_path(&self, user: UserId, path: String) -> Result<(), RepositoryError> {
        let mut tables = self.lock()?;
        let record = tables.users.get_mut(&user).ok_or(RepositoryError::NotFound)?;
        record.cv_path = Some(path);
        Ok(())
    }

    fn insert_job(&self, job: NewJob) -> Result<Job, RepositoryError> {
        let mut tables = self.lock()?;
        if !tables.users.contains_key(&job.owner) {
            return Err(RepositoryError::NotFound);
        }

        tables.job_seq += 1;
        let record = Job {
            id: JobId(tables.job_seq),
            user_id: job.owner,
            title: job.title,
            description: job.description,
            requirements: job.requirements,
            status: job.status,
            completed_at: None,
            created_at: Utc::now(),
        };
        tables.jobs.insert(record.id, record.clone());
        Ok(record)
    }

    fn job(&self, id: JobId) -> Result<Option<Job>, RepositoryError> {
        Ok(self.lock()?.jobs.get(&id).cloned())
    }

    fn update_job(&self, job: Job) -> Result<(), RepositoryError> {
        let mut tables = self.lock()?;
        if !tables.jobs.contains_key(&job.id) {
            return Err(RepositoryError::NotFound);
        }
        tables.jobs.insert(job.id, job);
        Ok(())
    }

    fn delete_job(&self, id: JobId) -> Result<(), RepositoryError> {
        let mut tables = self.lock()?;
        if tables.jobs.remove(&id).is_none() {
            return Err(RepositoryError::NotFound);
        }

        let doomed: Vec<ApplicationId> = tables
            .applications
            .values()
            .filter(|application| application.job_id == id)
            .map(|application| application.id)
            .collect();
        for application_id in doomed {
            if let Some(application) = tables.applications.remove(&application_id) {
                tables
                    .application_keys
                    .remove(&(application.job_id, application.user_id));
            }
        }
        Ok(())
    }

    fn jobs_owned_by(&self, owner: UserId) -> Result<Vec<Job>, RepositoryError> {
        let tables = self.lock()?;
        let mut jobs: Vec<Job> = tables
            .jobs
            .values()
            .filter(|job| job.user_id == owner)
            .cloned()
            .collect();
        jobs.sort_by_key(|job| job.id);
        Ok(jobs)
    }

    fn published_jobs(&self) -> Result<Vec<Job>, RepositoryError> {
        let tables = self.lock()?;
        let mut jobs: Vec<Job> = tables
            .jobs
            .values()
            .filter(|job| job.status == JobStatus::Published)
            .cloned()
            .collect();
        jobs.sort_by_key(|job| job.id);
        Ok(jobs)
    }

    fn job_count_for_owner(&self, owner: UserId) -> Result<usize, RepositoryError> {
        Ok(self
            .lock()?
            .jobs
            .values()
            .filter(|job| job.user_id == owner)
            .count())
    }

    fn insert_application(
        &self,
        application: NewApplication,
    ) -> Result<Application, RepositoryError> {
        let mut tables = self.lock()?;
        if !tables.jobs.contains_key(&application.job_id) {
            return Err(RepositoryError::NotFound);
        }

        let key = (application.job_id, application.user_id);
        if tables.application_keys.contains(&key) {
            return Err(RepositoryError::Conflict);
        }

        tables.application_seq += 1;
        let record = Application {
            id: ApplicationId(tables.application_seq),
            job_id: application.job_id,
            user_id: application.user_id,
            cover_letter: application.cover_letter,
            status: ApplicationStatus::Pending,
            completion_notes: None,
            completed_at: None,
            rating: None,
            completed_by: None,
            created_at: Utc::now(),
        };
        tables.application_keys.insert(key);
        tables.applications.insert(record.id, record.clone());
        Ok(record)
    }

    fn application(&self, id: ApplicationId) -> Result<Option<Application>, RepositoryError> {
        Ok(self.lock()?.applications.get(&id).cloned())
    }

    fn update_application(&self, application: Application) -> Result<(), RepositoryError> {
        let mut tables = self.lock()?;
        if !tables.applications.contains_key(&application.id) {
            return Err(RepositoryError::NotFound);
        }
        tables.applications.insert(application.id, application);
        Ok(())
    }

    fn applications_for_job(&self, job: JobId) -> Result<Vec<Application>, RepositoryError> {
        let tables = self.lock()?;
        let mut applications: Vec<Application> = tables
            .applications
            .values()
            .filter(|application| application.job_id == job)
            .cloned()
            .collect();
        applications.sort_by_key(|application| application.id);
        Ok(applications)
    }

    fn applications_for_applicant(
        &self,
        user: UserId,
    ) -> Result<Vec<Application>, RepositoryError> {
        let tables = self.lock()?;
        let mut applications: Vec<Application> = tables
            .applications
            .values()
            .filter(|application| application.user_id == user)
            .cloned()
            .collect();
        applications.sort_by_key(|application| application.id);
        Ok(applications)
    }

    fn application_for(
        &self,
        job: JobId,
        user: UserId,
    ) -> Result<Option<Application>, RepositoryError> {
        Ok(self
            .lock()?
            .applications
            .values()
            .find(|application| application.job_id == job && application.user_id == user)
            .cloned())
    }

    fn honor_point(&self, id: HonorPointId) -> Result<Option<HonorPoint>, RepositoryError> {
        Ok(self.lock()?.honor_points.get(&id).cloned())
    }

    fn honor_points_for_user(&self, user: UserId) -> Result<Vec<HonorPoint>, RepositoryError> {
        let tables = self.lock()?;
        let mut points: Vec<HonorPoint> = tables
            .honor_points
            .values()
            .filter(|point| point.user_id == user)
            .cloned()
            .collect();
        points.sort_by_key(|point| point.id);
        Ok(points)
    }

    fn award_points(&self, command: AwardCommand) -> Result<HonorPoint, RepositoryError> {
        let mut tables = self.lock()?;
        if !tables.jobs.contains_key(&command.job_id) {
            return Err(RepositoryError::NotFound);
        }
        if !tables.users.contains_key(&command.recipient) {
            return Err(RepositoryError::NotFound);
        }

        tables.honor_point_seq += 1;
        let record = HonorPoint {
            id: HonorPointId(tables.honor_point_seq),
            user_id: command.recipient,
            job_id: command.job_id,
            points: command.points,
            awarded_by: command.awarded_by,
            notes: command.notes,
            created_at: Utc::now(),
        };
        tables.honor_points.insert(record.id, record.clone());

        let recipient = tables
            .users
            .get_mut(&command.recipient)
            .expect("recipient checked above");
        recipient.total_points += i64::from(command.points);

        Ok(record)
    }

    fn complete_job(
        &self,
        command: CompletionCommand,
    ) -> Result<CompletionRecord, RepositoryError> {
        let mut tables = self.lock()?;

        // Validate everything first; the writes below cannot fail, so the
        // transaction commits fully or not at all.
        let job = tables
            .jobs
            .get(&command.job_id)
            .ok_or(RepositoryError::NotFound)?;
        if job.status != JobStatus::Published {
            return Err(RepositoryError::Conflict);
        }
        let application_id = tables
            .applications
            .values()
            .find(|application| {
                application.job_id == command.job_id && application.user_id == command.freelancer
            })
            .map(|application| application.id)
            .ok_or(RepositoryError::NotFound)?;
        if !tables.users.contains_key(&command.freelancer) {
            return Err(RepositoryError::NotFound);
        }

        let now = Utc::now();

        let job = tables
            .jobs
            .get_mut(&command.job_id)
            .expect("job checked above");
        job.status = JobStatus::Completed;
        job.completed_at = Some(now);
        let job = job.clone();

        let application = tables
            .applications
            .get_mut(&application_id)
            .expect("application checked above");
        application.status = ApplicationStatus::Hired;
        application.completion_notes = command.completion_notes.clone();
        application.completed_at = Some(now);
        application.completed_by = Some(command.completed_by);
        let application = application.clone();

        tables.honor_point_seq += 1;
        let award = HonorPoint {
            id: HonorPointId(tables.honor_point_seq),
            user_id: command.freelancer,
            job_id: command.job_id,
            points: command.points,
            awarded_by: command.completed_by,
            notes: command.completion_notes,
            created_at: now,
        };
        tables.honor_points.insert(award.id, award.clone());

        let freelancer = tables
            .users
            .get_mut(&command.freelancer)
            .expect("freelancer checked above");
        freelancer.total_points += i64::from(command.points);
        let freelancer = freelancer.clone();

        Ok(CompletionRecord {
            job,
            application,
            award,
            freelancer,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;

    use super::*;
    use crate::marketplace::domain::Role;

    fn store_with_pair() -> (InMemoryMarketplace, User, User, Job) {
        let store = InMemoryMarketplace::new();
        let company = store
            .insert_user(NewUser {
                name: "Acme".to_string(),
                email: "ops@acme.example".to_string(),
                role: Role::Company,
                company_name: Some("Acme GmbH".to_string()),
            })
            .expect("company inserts");
        let freelancer = store
            .insert_user(NewUser {
                name: "Dana".to_string(),
                email: "dana@example.com".to_string(),
                role: Role::Freelancer,
                company_name: None,
            })
            .expect("freelancer inserts");
        let job = store
            .insert_job(NewJob {
                owner: company.id,
                title: "Build the thing".to_string(),
                description: "All of it".to_string(),
                requirements: "Rust".to_string(),
                status: JobStatus::Published,
            })
            .expect("job inserts");
        (store, company, freelancer, job)
    }

    #[test]
    fn duplicate_application_key_conflicts() {
        let (store, _, freelancer, job) = store_with_pair();
        store
            .insert_application(NewApplication {
                job_id: job.id,
                user_id: freelancer.id,
                cover_letter: "hello".to_string(),
            })
            .expect("first apply succeeds");

        match store.insert_application(NewApplication {
            job_id: job.id,
            user_id: freelancer.id,
            cover_letter: "hello again".to_string(),
        }) {
            Err(RepositoryError::Conflict) => {}
            other => panic!("expected conflict, got {other:?}"),
        }
    }

    #[test]
    fn concurrent_applies_yield_one_success() {
        let (store, _, freelancer, job) = store_with_pair();
        let store = Arc::new(store);

        let handles: Vec<_> = (0..2)
            .map(|attempt| {
                let store = store.clone();
                let job_id = job.id;
                let user_id = freelancer.id;
                thread::spawn(move || {
                    store.insert_application(NewApplication {
                        job_id,
                        user_id,
                        cover_letter: format!("attempt {attempt}"),
                    })
                })
            })
            .collect();

        let results: Vec<_> = handles
            .into_iter()
            .map(|handle| handle.join().expect("thread joins"))
            .collect();

        let successes = results.iter().filter(|result| result.is_ok()).count();
        let conflicts = results
            .iter()
            .filter(|result| matches!(result, Err(RepositoryError::Conflict)))
            .count();
        assert_eq!(successes, 1);
        assert_eq!(conflicts, 1);
    }

    #[test]
    fn complete_job_applies_all_four_writes() {
        let (store, company, freelancer, job) = store_with_pair();
        store
            .insert_application(NewApplication {
                job_id: job.id,
                user_id: freelancer.id,
                cover_letter: "pick me".to_string(),
            })
            .expect("apply succeeds");

        let record = store
            .complete_job(CompletionCommand {
                job_id: job.id,
                freelancer: freelancer.id,
                points: 10,
                completed_by: company.id,
                completion_notes: Some("great work".to_string()),
            })
            .expect("completion commits");

        assert_eq!(record.job.status, JobStatus::Completed);
        assert!(record.job.completed_at.is_some());
        assert_eq!(record.application.status, ApplicationStatus::Hired);
        assert_eq!(record.application.completed_by, Some(company.id));
        assert_eq!(record.award.points, 10);
        assert_eq!(record.freelancer.total_points, 10);

        let stored = store
            .user(freelancer.id)
            .expect("fetch succeeds")
            .expect("user present");
        assert_eq!(stored.total_points, 10);
    }

    #[test]
    fn second_completion_conflicts_and_mutates_nothing() {
        let (store, company, freelancer, job) = store_with_pair();
        store
            .insert_application(NewApplication {
                job_id: job.id,
                user_id: freelancer.id,
                cover_letter: "pick me".to_string(),
            })
            .expect("apply succeeds");

        let command = CompletionCommand {
            job_id: job.id,
            freelancer: freelancer.id,
            points: 10,
            completed_by: company.id,
            completion_notes: None,
        };
        store
            .complete_job(command.clone())
            .expect("first completion commits");

        match store.complete_job(command) {
            Err(RepositoryError::Conflict) => {}
            other => panic!("expected conflict, got {other:?}"),
        }

        let ledger = store
            .honor_points_for_user(freelancer.id)
            .expect("ledger reads");
        assert_eq!(ledger.len(), 1);
        let stored = store
            .user(freelancer.id)
            .expect("fetch succeeds")
            .expect("user present");
        assert_eq!(stored.total_points, 10);
    }

    #[test]
    fn failed_completion_leaves_no_partial_state() {
        let (store, company, freelancer, job) = store_with_pair();
        // No application exists, so the transaction must refuse to commit.
        match store.complete_job(CompletionCommand {
            job_id: job.id,
            freelancer: freelancer.id,
            points: 10,
            completed_by: company.id,
            completion_notes: None,
        }) {
            Err(RepositoryError::NotFound) => {}
            other => panic!("expected not found, got {other:?}"),
        }

        let stored_job = store.job(job.id).expect("fetch succeeds").expect("present");
        assert_eq!(stored_job.status, JobStatus::Published);
        assert!(stored_job.completed_at.is_none());
        assert!(store
            .honor_points_for_user(freelancer.id)
            .expect("ledger reads")
            .is_empty());
        let stored = store
            .user(freelancer.id)
            .expect("fetch succeeds")
            .expect("user present");
        assert_eq!(stored.total_points, 0);
    }

    #[test]
    fn delete_job_cascades_to_applications_but_not_ledger() {
        let (store, company, freelancer, job) = store_with_pair();
        store
            .insert_application(NewApplication {
                job_id: job.id,
                user_id: freelancer.id,
                cover_letter: "pick me".to_string(),
            })
            .expect("apply succeeds");
        store
            .complete_job(CompletionCommand {
                job_id: job.id,
                freelancer: freelancer.id,
                points: 7,
                completed_by: company.id,
                completion_notes: None,
            })
            .expect("completion commits");

        store.delete_job(job.id).expect("delete succeeds");

        assert!(store
            .applications_for_applicant(freelancer.id)
            .expect("reads")
            .is_empty());
        assert_eq!(
            store
                .honor_points_for_user(freelancer.id)
                .expect("ledger reads")
                .len(),
            1
        );
    }
}
