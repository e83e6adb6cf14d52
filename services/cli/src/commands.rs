use crate::cli::CredentialArgs;
use crate::infra::{self, Workspace};
use chrono::Utc;
use clap::Args;
use lcq::error::AppError;
use lcq::workflows::questionnaire::{
    available_transitions, ApplicationId, ApplicationListItem, ApplicationStatus,
    ApplicationType, ServiceError, StepAccess,
};
use serde::Serialize;

#[derive(Args, Debug)]
pub(crate) struct StepArgs {
    #[arg(value_parser = infra::parse_application_id)]
    pub(crate) id: ApplicationId,
    /// Step path, e.g. /application/bio
    pub(crate) step: String,
}

#[derive(Args, Debug)]
pub(crate) struct FieldArgs {
    #[arg(value_parser = infra::parse_application_id)]
    pub(crate) id: ApplicationId,
    /// Dotted field path, e.g. bio.first_name
    pub(crate) field: String,
    /// JSON value; anything that is not valid JSON is stored as a string
    pub(crate) value: String,
}

#[derive(Args, Debug)]
pub(crate) struct SectionArgs {
    #[arg(value_parser = infra::parse_application_id)]
    pub(crate) id: ApplicationId,
    /// Section key, e.g. bio or references
    pub(crate) section: String,
    /// JSON document for the whole section
    pub(crate) json: String,
}

#[derive(Args, Debug)]
pub(crate) struct TransitionArgs {
    #[arg(value_parser = infra::parse_application_id)]
    pub(crate) id: ApplicationId,
    #[arg(value_parser = infra::parse_status)]
    pub(crate) to: ApplicationStatus,
    #[arg(long)]
    pub(crate) comment: Option<String>,
}

pub(crate) fn print_steps(application_type: ApplicationType) {
    println!("{} questionnaire", application_type.label());
    for (index, step) in application_type.steps().iter().enumerate() {
        println!(
            "{:>2}. {:<12} {:<24} {}",
            index + 1,
            step.short_label,
            step.path,
            step.label
        );
    }
}

pub(crate) fn register(workspace: &Workspace, args: &CredentialArgs) -> Result<(), AppError> {
    let credentials = workspace.auth.register(&args.email, &args.password)?;
    println!(
        "Registered {} (user {})",
        credentials.email, credentials.user_id
    );
    Ok(())
}

pub(crate) fn login(workspace: &Workspace, args: &CredentialArgs) -> Result<(), AppError> {
    let session = workspace
        .auth
        .sign_in(&args.email, &args.password, Utc::now())?;
    println!(
        "Signed in as {} ({}) until {}",
        session.email,
        session.role.label(),
        session.expires_at.format("%Y-%m-%d %H:%M UTC")
    );
    Ok(())
}

pub(crate) fn logout(workspace: &Workspace) -> Result<(), AppError> {
    workspace.auth.sign_out()?;
    println!("Signed out");
    Ok(())
}

pub(crate) fn whoami(workspace: &Workspace) -> Result<(), AppError> {
    match workspace.auth.current_session(Utc::now())? {
        Some(session) => println!(
            "{} | role {} | user {} | expires {}",
            session.email,
            session.role.label(),
            session.user_id,
            session.expires_at.format("%Y-%m-%d %H:%M UTC")
        ),
        None => println!("Not signed in"),
    }
    Ok(())
}

pub(crate) fn start(
    workspace: &Workspace,
    application_type: ApplicationType,
) -> Result<(), AppError> {
    let session = workspace.require_session()?;
    let mut service = workspace.service();
    let id = service.start(&session, application_type)?;
    println!("Started {} application {id}", application_type.label());
    println!("Begin at {}", application_type.steps()[0].path);
    Ok(())
}

pub(crate) fn set_field(workspace: &Workspace, args: FieldArgs) -> Result<(), AppError> {
    let session = workspace.require_session()?;
    let mut service = workspace.service();
    service.resume(&session, &args.id)?;
    service
        .store_mut()
        .set_field(&args.field, infra::parse_json_value(&args.value))?;
    service.save_draft()?;
    println!("Saved {}", args.field);
    Ok(())
}

pub(crate) fn save_section(workspace: &Workspace, args: SectionArgs) -> Result<(), AppError> {
    let value = serde_json::from_str(&args.json)
        .map_err(|err| AppError::Usage(format!("section body is not valid JSON ({err})")))?;

    let session = workspace.require_session()?;
    let mut service = workspace.service();
    service.resume(&session, &args.id)?;
    service.store_mut().update_section(&args.section, value)?;
    let application = service.save_draft()?;
    println!(
        "Saved section {} ({}% complete)",
        args.section,
        application.data.completion_percent()
    );
    Ok(())
}

pub(crate) fn access(workspace: &Workspace, args: &StepArgs) -> Result<(), AppError> {
    let session = workspace.require_session()?;
    let mut service = workspace.service();
    service.resume(&session, &args.id)?;
    match service.access(&args.step)? {
        StepAccess::Granted => println!("{} is open", args.step),
        StepAccess::Redirect { index, path } => {
            println!("{} is locked; continue at step {} ({path})", args.step, index + 1)
        }
    }
    Ok(())
}

pub(crate) fn next(workspace: &Workspace, args: &StepArgs) -> Result<(), AppError> {
    let session = workspace.require_session()?;
    let mut service = workspace.service();
    service.resume(&session, &args.id)?;

    let advance = match service.advance(&args.step) {
        Ok(advance) => advance,
        Err(ServiceError::Validation(errors)) => {
            println!("{} has problems:", args.step);
            for error in &errors {
                println!("  - {}: {}", error.field, error.message);
            }
            return Err(ServiceError::Validation(errors).into());
        }
        Err(err) => return Err(err.into()),
    };

    println!("Completed {}", advance.completed);
    match advance.next {
        Some(step) => println!("Next: {} ({})", step.label, step.path),
        None => println!("Every step is complete; run `lcq submit {}`", args.id),
    }
    Ok(())
}

pub(crate) fn submit(workspace: &Workspace, id: &ApplicationId) -> Result<(), AppError> {
    let session = workspace.require_session()?;
    let mut service = workspace.service();
    service.resume(&session, id)?;
    let application = service.submit(&session)?;
    println!("Application {} is {}", application.id, application.status);
    Ok(())
}

pub(crate) fn withdraw(
    workspace: &Workspace,
    id: &ApplicationId,
    comment: Option<String>,
) -> Result<(), AppError> {
    let session = workspace.require_session()?;
    let mut service = workspace.service();
    service.resume(&session, id)?;
    let application = service.withdraw(&session, comment)?;
    println!("Application {} is {}", application.id, application.status);
    Ok(())
}

pub(crate) fn show(workspace: &Workspace, id: Option<&ApplicationId>) -> Result<(), AppError> {
    let session = workspace.require_session()?;
    let mut service = workspace.service();

    let Some(id) = id else {
        let items = service.my_applications(&session)?;
        print_listing(&items);
        return Ok(());
    };

    service.resume(&session, id)?;
    let store = service.store();
    if let Some(application) = store.active() {
        print_json(application)?;
        let next: Vec<&str> = available_transitions(application.status)
            .iter()
            .map(|status| status.label())
            .collect();
        if !next.is_empty() {
            println!("Possible next statuses: {}", next.join(", "));
        }
    }
    Ok(())
}

pub(crate) fn history(workspace: &Workspace, id: &ApplicationId) -> Result<(), AppError> {
    let session = workspace.require_session()?;
    let mut service = workspace.service();
    service.resume(&session, id)?;
    for entry in service.store().history(id)? {
        let from = entry
            .from
            .map(|status| status.label())
            .unwrap_or("(created)");
        print!(
            "{} {} -> {} by {}",
            entry.timestamp.format("%Y-%m-%d %H:%M:%S"),
            from,
            entry.to,
            entry.changed_by
        );
        match entry.comment {
            Some(comment) => println!(" ({comment})"),
            None => println!(),
        }
    }
    Ok(())
}

pub(crate) fn review_list(
    workspace: &Workspace,
    status: Option<ApplicationStatus>,
) -> Result<(), AppError> {
    let session = workspace.require_session()?;
    let items = workspace.service().review_queue(&session, status)?;
    print_listing(&items);
    Ok(())
}

pub(crate) fn review_transition(
    workspace: &Workspace,
    args: TransitionArgs,
) -> Result<(), AppError> {
    let session = workspace.require_session()?;
    let application = workspace
        .service()
        .review(&session, &args.id, args.to, args.comment)?;
    println!("Application {} is {}", application.id, application.status);
    Ok(())
}

pub(crate) fn print_listing(items: &[ApplicationListItem]) {
    if items.is_empty() {
        println!("No applications");
        return;
    }
    for item in items {
        println!(
            "{} | {:<28} | {:<10} | {:<24} | {:>3}% | updated {}",
            item.id,
            item.candidate_name,
            item.application_type,
            item.status,
            item.completion_percent,
            item.updated_at.format("%Y-%m-%d %H:%M")
        );
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<(), AppError> {
    let rendered = serde_json::to_string_pretty(value).map_err(std::io::Error::from)?;
    println!("{rendered}");
    Ok(())
}
