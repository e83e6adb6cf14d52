use std::sync::Arc;

use serde_json::json;

use super::common::*;
use crate::workflows::questionnaire::guard::StepAccess;
use crate::workflows::questionnaire::service::{QuestionnaireService, ServiceError};
use crate::workflows::questionnaire::persistence::MemoryStore;
use crate::workflows::questionnaire::status::ApplicationStatus;
use crate::workflows::questionnaire::steps::{
    steps_for, ApplicationType, GROUP_STEPS, INDIVIDUAL_STEPS,
};
use crate::workflows::questionnaire::store::StoreError;

fn fill_and_advance_all(
    service: &mut QuestionnaireService<MemoryStore>,
    application_type: ApplicationType,
) {
    let sections = sections_for(application_type);
    for (step, (section, value)) in steps_for(application_type).iter().zip(sections) {
        assert_eq!(step.section(), section);
        service
            .store_mut()
            .update_section(section, value)
            .expect("section saved");
        service.advance(step.path).expect("step advances");
    }
}

#[test]
fn advance_completes_the_step_and_moves_forward() {
    let mut service = memory_service();
    let session = candidate();
    service
        .start(&session, ApplicationType::Individual)
        .expect("started");

    let (section, value) = individual_sections().remove(0);
    service
        .store_mut()
        .update_section(section, value)
        .expect("bio saved");
    assert!(service.store().is_dirty());

    let advance = service.advance(INDIVIDUAL_STEPS[0].path).expect("advances");
    assert_eq!(advance.completed, INDIVIDUAL_STEPS[0].path);
    assert_eq!(advance.next.map(|step| step.path), Some(INDIVIDUAL_STEPS[1].path));

    let active = service.store().active().expect("active");
    assert!(active.data.completed_steps.contains(INDIVIDUAL_STEPS[0].path));
    assert_eq!(active.data.current_step, INDIVIDUAL_STEPS[1].path);
    assert!(!service.store().is_dirty());

    let persisted = service.store().get(&active.id).expect("persisted");
    assert_eq!(persisted.data, active.data);
    assert!(service
        .access(INDIVIDUAL_STEPS[1].path)
        .expect("guard")
        .is_granted());
}

#[test]
fn invalid_steps_block_forward_navigation_without_side_effects() {
    let mut service = memory_service();
    service
        .start(&candidate(), ApplicationType::Individual)
        .expect("started");
    service
        .store_mut()
        .set_field("bio.first_name", json!("Avery"))
        .expect("field");

    match service.advance(INDIVIDUAL_STEPS[0].path) {
        Err(ServiceError::Validation(errors)) => {
            assert!(errors.iter().any(|error| error.field == "bio.email"));
            assert!(errors.iter().all(|error| error.field != "bio.first_name"));
        }
        other => panic!("expected validation errors, got {other:?}"),
    }

    let active = service.store().active().expect("active");
    assert!(active.data.completed_steps.is_empty());
    assert_eq!(active.data.current_step, INDIVIDUAL_STEPS[0].path);
    assert!(service.store().is_dirty());
}

#[test]
fn advancing_a_locked_step_reports_the_redirect() {
    let mut service = memory_service();
    service
        .start(&candidate(), ApplicationType::Group)
        .expect("started");

    match service.advance(GROUP_STEPS[2].path) {
        Err(ServiceError::StepLocked { requested, redirect }) => {
            assert_eq!(requested, GROUP_STEPS[2].path);
            assert_eq!(redirect, GROUP_STEPS[0].path);
        }
        other => panic!("expected locked step, got {other:?}"),
    }

    assert_eq!(
        service.access(GROUP_STEPS[2].path).expect("guard"),
        StepAccess::Redirect {
            index: 0,
            path: GROUP_STEPS[0].path
        }
    );
}

#[test]
fn submit_requires_every_step() {
    let mut service = memory_service();
    let session = candidate();
    service
        .start(&session, ApplicationType::Individual)
        .expect("started");

    match service.submit(&session) {
        Err(ServiceError::Incomplete { missing }) => {
            assert_eq!(missing.len(), INDIVIDUAL_STEPS.len());
        }
        other => panic!("expected incomplete, got {other:?}"),
    }
    assert_eq!(
        service.store().active().expect("active").status,
        ApplicationStatus::Draft
    );
}

#[test]
fn full_individual_walkthrough_submits_and_is_reviewed() {
    let mut service = memory_service();
    let session = candidate();
    let id = service
        .start(&session, ApplicationType::Individual)
        .expect("started");

    fill_and_advance_all(&mut service, ApplicationType::Individual);
    let submitted = service.submit(&session).expect("submits");
    assert_eq!(submitted.status, ApplicationStatus::Submitted);
    assert_eq!(submitted.data.completion_percent(), 100);

    let admin = reviewer();
    let queue = service
        .review_queue(&admin, Some(ApplicationStatus::Submitted))
        .expect("queue");
    assert_eq!(queue.len(), 1);
    assert_eq!(queue[0].candidate_name, "Avery Quinn");

    service
        .review(&admin, &id, ApplicationStatus::UnderReview, None)
        .expect("under review");
    let decided = service
        .review(
            &admin,
            &id,
            ApplicationStatus::Approved,
            Some("Committee approved".to_string()),
        )
        .expect("approved");

    let statuses: Vec<_> = decided
        .status_history
        .iter()
        .map(|entry| entry.to)
        .collect();
    assert_eq!(
        statuses,
        vec![
            ApplicationStatus::Draft,
            ApplicationStatus::Submitted,
            ApplicationStatus::UnderReview,
            ApplicationStatus::Approved
        ]
    );

    match service.review(&admin, &id, ApplicationStatus::UnderReview, None) {
        Err(ServiceError::Store(StoreError::IllegalTransition { from, .. })) => {
            assert_eq!(from, ApplicationStatus::Approved)
        }
        other => panic!("expected illegal transition, got {other:?}"),
    }
}

#[test]
fn additional_info_round_trip_allows_edits_and_resubmission() {
    let mut service = memory_service();
    let session = candidate();
    let admin = reviewer();
    let id = service
        .start(&session, ApplicationType::Group)
        .expect("started");
    fill_and_advance_all(&mut service, ApplicationType::Group);
    service.submit(&session).expect("submits");

    service
        .review(&admin, &id, ApplicationStatus::UnderReview, None)
        .expect("under review");
    service
        .review(
            &admin,
            &id,
            ApplicationStatus::AdditionalInfoRequired,
            Some("Add prior-year collections detail".to_string()),
        )
        .expect("info requested");

    service
        .store_mut()
        .set_field("financials.notes", json!("Prior year included a contingency fee."))
        .expect("editable again");
    let resubmitted = service.submit(&session).expect("resubmits");
    assert_eq!(resubmitted.status, ApplicationStatus::Submitted);
    assert_eq!(
        resubmitted.data.form.get_str("financials.notes"),
        Some("Prior year included a contingency fee.")
    );
}

#[test]
fn review_actions_require_an_admin_session() {
    let mut service = memory_service();
    let session = candidate();
    let id = service
        .start(&session, ApplicationType::Individual)
        .expect("started");

    assert!(matches!(
        service.review(&session, &id, ApplicationStatus::Withdrawn, None),
        Err(ServiceError::Forbidden(_))
    ));
    assert!(matches!(
        service.review_queue(&session, None),
        Err(ServiceError::Forbidden(_))
    ));
}

#[test]
fn resume_returns_the_saved_step_for_the_owner_only() {
    let mut service = memory_service();
    let owner = candidate();
    let id = service
        .start(&owner, ApplicationType::Individual)
        .expect("started");
    fill_and_advance_all_until(&mut service, 2);
    service.store_mut().close();

    let resumed = service.resume(&owner, &id).expect("resumes");
    assert_eq!(resumed.path, INDIVIDUAL_STEPS[2].path);

    let stranger = session("candidate-2", crate::workflows::questionnaire::auth::Role::Candidate);
    assert!(matches!(
        service.resume(&stranger, &id),
        Err(ServiceError::Forbidden(_))
    ));
    assert!(service.store().active().is_none());

    assert!(service.resume(&reviewer(), &id).is_ok());
}

#[test]
fn withdraw_is_terminal() {
    let mut service = memory_service();
    let session = candidate();
    service
        .start(&session, ApplicationType::Individual)
        .expect("started");

    let withdrawn = service
        .withdraw(&session, Some("Accepted another offer".to_string()))
        .expect("withdraws");
    assert_eq!(withdrawn.status, ApplicationStatus::Withdrawn);
    assert!(matches!(
        service.submit(&session),
        Err(ServiceError::Incomplete { .. })
    ));
    assert!(matches!(
        service.withdraw(&session, None),
        Err(ServiceError::Store(StoreError::IllegalTransition { .. }))
    ));

    let mine = service.my_applications(&session).expect("lists");
    assert_eq!(mine.len(), 1);
    assert_eq!(mine[0].status, ApplicationStatus::Withdrawn);
}

fn fill_and_advance_all_until(service: &mut QuestionnaireService<MemoryStore>, count: usize) {
    let sections = individual_sections();
    for (step, (section, value)) in INDIVIDUAL_STEPS.iter().zip(sections).take(count) {
        service
            .store_mut()
            .update_section(section, value)
            .expect("section saved");
        service.advance(step.path).expect("step advances");
    }
}

#[test]
fn reviewers_cannot_submit_for_the_applicant() {
    let mut service = memory_service();
    let id = service
        .start(&candidate(), ApplicationType::Individual)
        .expect("started");

    assert!(matches!(
        service.review(&reviewer(), &id, ApplicationStatus::Submitted, None),
        Err(ServiceError::Forbidden(_))
    ));

    let stored = service.store().get(&id).expect("persisted");
    assert_eq!(stored.status, ApplicationStatus::Draft);
    assert_eq!(stored.status_history.len(), 1);
}

#[test]
fn reviewers_cannot_resubmit_after_requesting_information() {
    let mut service = memory_service();
    let session = candidate();
    let admin = reviewer();
    let id = service
        .start(&session, ApplicationType::Individual)
        .expect("started");
    fill_and_advance_all(&mut service, ApplicationType::Individual);
    service.submit(&session).expect("submits");
    service
        .review(&admin, &id, ApplicationStatus::UnderReview, None)
        .expect("under review");
    service
        .review(&admin, &id, ApplicationStatus::AdditionalInfoRequired, None)
        .expect("info requested");

    assert!(matches!(
        service.review(&admin, &id, ApplicationStatus::Submitted, None),
        Err(ServiceError::Forbidden(_))
    ));
    assert_eq!(
        service.store().get(&id).expect("persisted").status,
        ApplicationStatus::AdditionalInfoRequired
    );
}

#[test]
fn reviewers_open_other_drafts_read_only() {
    let mut owner_service = memory_service();
    let owner = candidate();
    let id = owner_service
        .start(&owner, ApplicationType::Individual)
        .expect("started");
    owner_service
        .store_mut()
        .set_field("bio.first_name", json!("Avery"))
        .expect("owner edits");
    owner_service.save_draft().expect("owner saves");

    let storage = Arc::clone(owner_service.store().storage());
    let mut review_service = QuestionnaireService::new(storage);
    let admin = reviewer();
    review_service.resume(&admin, &id).expect("reviewer opens");
    assert!(review_service.store().is_read_only());

    assert!(matches!(
        review_service
            .store_mut()
            .set_field("bio.first_name", json!("Mallory")),
        Err(StoreError::ReadOnly(_))
    ));
    assert!(matches!(
        review_service
            .store_mut()
            .update_section("bio", json!({ "first_name": "Mallory" })),
        Err(StoreError::ReadOnly(_))
    ));
    assert!(matches!(
        review_service.advance(INDIVIDUAL_STEPS[0].path),
        Err(ServiceError::Forbidden(_))
    ));
    assert!(matches!(
        review_service.save_draft(),
        Err(ServiceError::Forbidden(_))
    ));

    let stored = owner_service.store().get(&id).expect("persisted");
    assert_eq!(stored.data.form.get_str("bio.first_name"), Some("Avery"));
    assert!(stored.data.completed_steps.is_empty());

    owner_service.resume(&owner, &id).expect("owner reopens");
    assert!(!owner_service.store().is_read_only());
}

#[test]
fn failed_resume_leaves_nothing_active() {
    let mut service = memory_service();
    let session = candidate();
    service
        .start(&session, ApplicationType::Group)
        .expect("started");

    let missing = crate::workflows::questionnaire::domain::ApplicationId("missing".to_string());
    assert!(matches!(
        service.resume(&session, &missing),
        Err(ServiceError::Store(StoreError::NotFound(_)))
    ));
    assert!(service.store().active().is_none());
    assert!(matches!(
        service.store_mut().set_field("overview.group_name", json!("Stale")),
        Err(StoreError::NoActiveApplication)
    ));
}
