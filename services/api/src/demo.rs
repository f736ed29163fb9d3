use base64::Engine;
use clap::Args;
use gigmarket::error::AppError;
use gigmarket::marketplace::{
    ApplyRequest, Caller, CompleteJobRequest, CreateJobRequest, CvUpload, InMemoryBlobStore,
    InMemoryMarketplace, MarketplaceState, RegisterRequest, Session, TokenRegistry,
};
use std::sync::Arc;

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Honor points awarded during the completion step (1-100)
    #[arg(long)]
    pub(crate) points: Option<u32>,
    /// Skip the completion transaction and stop after the application step
    #[arg(long)]
    pub(crate) skip_completion: bool,
}

fn caller(session: &Session) -> Caller {
    Caller {
        id: session.user.id,
        role: session.user.role,
    }
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs {
        points,
        skip_completion,
    } = args;
    let points = points.unwrap_or(10);

    let repository = Arc::new(InMemoryMarketplace::new());
    let blobs = Arc::new(InMemoryBlobStore::new());
    let tokens = Arc::new(TokenRegistry::new());
    let state = MarketplaceState::new(repository, blobs, tokens);

    println!("Marketplace demo");

    let company_session = state.identity.register(RegisterRequest {
        name: "Northwind Studio".to_string(),
        email: "hiring@northwind.example".to_string(),
        role: "company".to_string(),
        company_name: Some("Northwind Studio GmbH".to_string()),
    })?;
    let freelancer_session = state.identity.register(RegisterRequest {
        name: "Dana Fields".to_string(),
        email: "dana@fields.example".to_string(),
        role: "freelancer".to_string(),
        company_name: None,
    })?;
    let company = caller(&company_session);
    let freelancer = caller(&freelancer_session);
    println!(
        "Registered company '{}' and freelancer '{}'",
        company_session.user.name, freelancer_session.user.name
    );

    let job = state.jobs.create(
        &company,
        CreateJobRequest {
            title: "Port the invoicing service to Rust".to_string(),
            description: "Replace the legacy nightly batch with a streaming pipeline".to_string(),
            requirements: "Rust, PostgreSQL, payment APIs".to_string(),
            status: "published".to_string(),
        },
    )?;
    println!(
        "\nPosted job #{} '{}' ({})",
        job.id.0,
        job.title,
        job.status.label()
    );

    let application = state.applications.apply(
        &freelancer,
        job.id,
        ApplyRequest {
            cover_letter: "I ported two billing systems to Rust last year.".to_string(),
            cv: CvUpload {
                filename: "dana-fields.pdf".to_string(),
                content_base64: base64::engine::general_purpose::STANDARD
                    .encode(b"%PDF-1.4 demo resume"),
            },
        },
    )?;
    println!(
        "Application #{} submitted ({})",
        application.id.0,
        application.status.label()
    );

    let applicants = state.jobs.applicants(&company, job.id)?;
    println!("\nApplicants for '{}'", applicants.job_title);
    for entry in &applicants.applicants {
        let cv_note = match &entry.cv_download_url {
            Some(url) => format!(" (cv: {url})"),
            None => String::new(),
        };
        println!(
            "- {} <{}> applied {} [{}]{}",
            entry.freelancer.name,
            entry.freelancer.email,
            entry.applied_at.format("%Y-%m-%d"),
            entry.status.label(),
            cv_note
        );
    }

    if skip_completion {
        println!("\nSkipping the completion transaction as requested");
        return Ok(());
    }

    let outcome = state.completion.complete(
        &company,
        job.id,
        CompleteJobRequest {
            freelancer_id: freelancer.id.0,
            points,
            completion_notes: Some("Delivered ahead of schedule".to_string()),
        },
    )?;
    println!(
        "\nCompleted job #{}: {} points awarded to {}",
        outcome.job.id.0, outcome.awarded_points, outcome.freelancer.name
    );

    let ledger = state.honor.list_for_freelancer(&freelancer)?;
    println!("\nHonor-point ledger for {}", outcome.freelancer.name);
    for entry in &ledger {
        let job_title = entry
            .job
            .as_ref()
            .map(|job| job.title.as_str())
            .unwrap_or("(job deleted)");
        println!(
            "- {} points for '{}' on {}",
            entry.honor_point.points,
            job_title,
            entry.honor_point.created_at.format("%Y-%m-%d")
        );
    }
    println!("Running total: {} points", outcome.freelancer.total_points);

    Ok(())
}
