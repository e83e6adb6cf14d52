use std::sync::Arc;

use chrono::{Duration, Utc};
use serde_json::{json, Value};

use crate::workflows::questionnaire::auth::{Role, Session};
use crate::workflows::questionnaire::domain::{FormDocument, UserId};
use crate::workflows::questionnaire::persistence::MemoryStore;
use crate::workflows::questionnaire::service::QuestionnaireService;
use crate::workflows::questionnaire::steps::{ApplicationType, Step};
use crate::workflows::questionnaire::store::ApplicationStore;

pub(super) fn memory_store() -> ApplicationStore<MemoryStore> {
    ApplicationStore::new(Arc::new(MemoryStore::new()))
}

pub(super) fn memory_service() -> QuestionnaireService<MemoryStore> {
    QuestionnaireService::new(Arc::new(MemoryStore::new()))
}

pub(super) fn session(user: &str, role: Role) -> Session {
    let now = Utc::now();
    Session {
        user_id: UserId(user.to_string()),
        email: format!("{user}@example.com"),
        role,
        issued_at: now,
        expires_at: now + Duration::hours(1),
    }
}

pub(super) fn candidate() -> Session {
    session("candidate-1", Role::Candidate)
}

pub(super) fn reviewer() -> Session {
    session("reviewer-1", Role::Admin)
}

pub(super) fn completed(steps: &[Step], indices: &[usize]) -> std::collections::BTreeSet<String> {
    indices
        .iter()
        .map(|&index| steps[index].path.to_string())
        .collect()
}

/// Valid answers for every section of the individual questionnaire.
pub(super) fn individual_sections() -> Vec<(&'static str, Value)> {
    vec![
        (
            "bio",
            json!({
                "first_name": "Avery",
                "last_name": "Quinn",
                "email": "avery.quinn@example.com",
                "phone": "+1 (312) 555-0142",
                "current_firm": "Harlow & Pike LLP"
            }),
        ),
        (
            "education",
            json!({
                "degrees": [
                    { "institution": "University of Chicago", "degree": "JD", "year": 2012 }
                ]
            }),
        ),
        (
            "admissions",
            json!({
                "admissions": [
                    { "jurisdiction": "Illinois", "year": 2012, "status": "active" }
                ],
                "disciplinary_history": false
            }),
        ),
        (
            "employment",
            json!({
                "positions": [
                    {
                        "firm": "Harlow & Pike LLP",
                        "title": "Partner",
                        "start_date": "2019-01-07"
                    },
                    {
                        "firm": "Bennett Grove",
                        "title": "Associate",
                        "start_date": "2012-09-04",
                        "end_date": "2018-12-21"
                    }
                ]
            }),
        ),
        (
            "practice",
            json!({
                "practice_areas": ["Commercial Litigation"],
                "annual_hours": 1950,
                "portable_revenue": 2400000
            }),
        ),
        (
            "conflicts",
            json!({
                "has_potential_conflicts": false,
                "has_restrictive_covenants": false
            }),
        ),
        (
            "references",
            json!({
                "references": [
                    { "name": "Jordan Lee", "email": "jlee@example.com", "relationship": "Co-counsel" },
                    { "name": "Sam Ortiz", "email": "sortiz@example.com", "relationship": "Client" }
                ]
            }),
        ),
        ("review", json!({ "attestation": true })),
    ]
}

pub(super) fn group_sections() -> Vec<(&'static str, Value)> {
    vec![
        (
            "overview",
            json!({
                "group_name": "Harlow Antitrust Group",
                "current_firm": "Harlow & Pike LLP",
                "lead_partner_email": "lead@example.com",
                "member_count": 2
            }),
        ),
        (
            "members",
            json!({
                "members": [
                    { "name": "Avery Quinn", "title": "Partner", "email": "aq@example.com" },
                    { "name": "Riley Chen", "title": "Counsel", "email": "rc@example.com" }
                ]
            }),
        ),
        ("practice", json!({ "practice_areas": ["Antitrust"] })),
        (
            "financials",
            json!({
                "collections_last_year": 5100000,
                "collections_prior_year": 4700000,
                "expected_portable_percent": 80
            }),
        ),
        (
            "conflicts",
            json!({
                "has_potential_conflicts": true,
                "details": "Adverse to a current firm client in one matter.",
                "has_restrictive_covenants": false
            }),
        ),
        (
            "references",
            json!({
                "references": [
                    { "name": "Jordan Lee", "email": "jlee@example.com", "relationship": "Co-counsel" },
                    { "name": "Sam Ortiz", "email": "sortiz@example.com", "relationship": "Client" }
                ]
            }),
        ),
        ("review", json!({ "attestation": true })),
    ]
}

pub(super) fn sections_for(application_type: ApplicationType) -> Vec<(&'static str, Value)> {
    match application_type {
        ApplicationType::Individual => individual_sections(),
        ApplicationType::Group => group_sections(),
    }
}

pub(super) fn document(application_type: ApplicationType) -> FormDocument {
    let mut form = FormDocument::new();
    for (section, value) in sections_for(application_type) {
        form.replace_section(section, value);
    }
    form
}
