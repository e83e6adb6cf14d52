use crate::commands::print_listing;
use crate::infra;
use chrono::{Duration, Utc};
use clap::Args;
use lcq::error::AppError;
use lcq::workflows::questionnaire::{
    ApplicationStatus, ApplicationType, AuthStore, MemoryStore, QuestionnaireService, ServiceError,
    StepAccess,
};
use serde_json::{json, Value};
use std::sync::Arc;

const CANDIDATE_EMAIL: &str = "avery.quinn@example.com";
const REVIEWER_EMAIL: &str = "recruiting@harlowpike.com";

#[derive(Args, Debug)]
pub(crate) struct DemoArgs {
    /// Questionnaire to walk through
    #[arg(
        long = "type",
        value_parser = infra::parse_application_type,
        default_value = "individual"
    )]
    pub(crate) application_type: ApplicationType,
    /// Stop after submission instead of running the review cycle
    #[arg(long)]
    pub(crate) skip_review: bool,
}

impl Default for DemoArgs {
    fn default() -> Self {
        Self {
            application_type: ApplicationType::Individual,
            skip_review: false,
        }
    }
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs {
        application_type,
        skip_review,
    } = args;

    let storage = Arc::new(MemoryStore::new());
    let auth = AuthStore::new(Arc::clone(&storage), Duration::hours(1));
    auth.set_admin_emails(&[REVIEWER_EMAIL.to_string()])?;
    auth.register(CANDIDATE_EMAIL, "demo-candidate")?;
    auth.register(REVIEWER_EMAIL, "demo-reviewer")?;

    let now = Utc::now();
    let candidate = auth.sign_in(CANDIDATE_EMAIL, "demo-candidate", now)?;
    let reviewer = auth.sign_in(REVIEWER_EMAIL, "demo-reviewer", now)?;

    println!("Lateral candidate questionnaire demo ({})", application_type.label());
    let mut service = QuestionnaireService::new(Arc::clone(&storage));
    let id = service.start(&candidate, application_type)?;
    println!("- Started application {id}");

    let steps = application_type.steps();
    if let Some(locked) = steps.get(2) {
        if let StepAccess::Redirect { path, .. } = service.access(locked.path)? {
            println!("- Jumping to {} is refused; guard redirects to {path}", locked.path);
        }
    }

    match service.advance(steps[0].path) {
        Err(ServiceError::Validation(errors)) => {
            println!(
                "- Empty {} step blocked with {} field error(s), e.g. {}: {}",
                steps[0].short_label,
                errors.len(),
                errors[0].field,
                errors[0].message
            );
        }
        Ok(_) => println!("- Unexpectedly advanced an empty step"),
        Err(err) => return Err(err.into()),
    }

    for (step, (section, value)) in steps.iter().zip(demo_sections(application_type)) {
        service.store_mut().update_section(section, value)?;
        service.advance(step.path)?;
        let percent = service
            .store()
            .active()
            .map(|application| application.data.completion_percent())
            .unwrap_or_default();
        println!("  completed {:<12} {percent:>3}%", step.short_label);
    }

    let submitted = service.submit(&candidate)?;
    println!("- Submitted; status {}", submitted.status);
    if skip_review {
        return Ok(());
    }

    println!("\nReview queue");
    print_listing(&service.review_queue(&reviewer, Some(ApplicationStatus::Submitted))?);

    service.review(&reviewer, &id, ApplicationStatus::UnderReview, None)?;
    service.review(
        &reviewer,
        &id,
        ApplicationStatus::AdditionalInfoRequired,
        Some("Please confirm references are available next week".to_string()),
    )?;
    service.store_mut().set_field(
        "references.availability_note",
        json!("Both references are available from Monday."),
    )?;
    service.submit(&candidate)?;
    service.review(&reviewer, &id, ApplicationStatus::UnderReview, None)?;
    let decided = service.review(
        &reviewer,
        &id,
        ApplicationStatus::Approved,
        Some("Approved by the lateral hiring committee".to_string()),
    )?;

    println!("\nStatus history");
    for entry in &decided.status_history {
        let from = entry
            .from
            .map(|status| status.label())
            .unwrap_or("(created)");
        println!(
            "- {from} -> {}{}",
            entry.to,
            entry
                .comment
                .as_deref()
                .map(|comment| format!(" ({comment})"))
                .unwrap_or_default()
        );
    }
    Ok(())
}

fn demo_sections(application_type: ApplicationType) -> Vec<(&'static str, Value)> {
    let references = json!({
        "references": [
            { "name": "Jordan Lee", "email": "jlee@example.com", "relationship": "Co-counsel" },
            { "name": "Sam Ortiz", "email": "sortiz@example.com", "relationship": "Client" }
        ]
    });
    let review = json!({ "attestation": true });

    match application_type {
        ApplicationType::Individual => vec![
            (
                "bio",
                json!({
                    "first_name": "Avery",
                    "last_name": "Quinn",
                    "email": CANDIDATE_EMAIL,
                    "phone": "+1 (312) 555-0142",
                    "current_firm": "Bennett Grove LLP"
                }),
            ),
            (
                "education",
                json!({
                    "degrees": [
                        { "institution": "Northwestern University", "degree": "JD", "year": 2011 }
                    ]
                }),
            ),
            (
                "admissions",
                json!({
                    "admissions": [
                        { "jurisdiction": "Illinois", "year": 2011, "status": "active" }
                    ],
                    "disciplinary_history": false
                }),
            ),
            (
                "employment",
                json!({
                    "positions": [
                        { "firm": "Bennett Grove LLP", "title": "Partner", "start_date": "2018-02-01" }
                    ]
                }),
            ),
            (
                "practice",
                json!({
                    "practice_areas": ["Commercial Litigation", "Arbitration"],
                    "annual_hours": 1875,
                    "portable_revenue": 1800000
                }),
            ),
            (
                "conflicts",
                json!({
                    "has_potential_conflicts": false,
                    "has_restrictive_covenants": false
                }),
            ),
            ("references", references),
            ("review", review),
        ],
        ApplicationType::Group => vec![
            (
                "overview",
                json!({
                    "group_name": "Bennett Grove Antitrust",
                    "current_firm": "Bennett Grove LLP",
                    "lead_partner_email": CANDIDATE_EMAIL,
                    "member_count": 3
                }),
            ),
            (
                "members",
                json!({
                    "members": [
                        { "name": "Avery Quinn", "title": "Partner", "email": "aq@example.com" },
                        { "name": "Riley Chen", "title": "Partner", "email": "rc@example.com" },
                        { "name": "Morgan Diaz", "title": "Associate", "email": "md@example.com" }
                    ]
                }),
            ),
            ("practice", json!({ "practice_areas": ["Antitrust", "Merger Control"] })),
            (
                "financials",
                json!({
                    "collections_last_year": 6200000,
                    "collections_prior_year": 5900000,
                    "expected_portable_percent": 75
                }),
            ),
            (
                "conflicts",
                json!({
                    "has_potential_conflicts": false,
                    "has_restrictive_covenants": true,
                    "covenant_details": "Twelve-month client non-solicit for two institutional clients."
                }),
            ),
            ("references", references),
            ("review", review),
        ],
    }
}
