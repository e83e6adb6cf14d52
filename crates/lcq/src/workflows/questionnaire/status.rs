use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::domain::UserId;

/// Review lifecycle of an application, independent of wizard progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationStatus {
    Draft,
    Submitted,
    UnderReview,
    AdditionalInfoRequired,
    Approved,
    Rejected,
    Withdrawn,
}

impl ApplicationStatus {
    pub const fn ordered() -> [Self; 7] {
        [
            Self::Draft,
            Self::Submitted,
            Self::UnderReview,
            Self::AdditionalInfoRequired,
            Self::Approved,
            Self::Rejected,
            Self::Withdrawn,
        ]
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Submitted => "submitted",
            Self::UnderReview => "under_review",
            Self::AdditionalInfoRequired => "additional_info_required",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::Withdrawn => "withdrawn",
        }
    }

    pub fn is_terminal(self) -> bool {
        available_transitions(self).is_empty()
    }

    /// Candidates may only change answers while drafting or when reviewers asked for more.
    pub const fn is_editable(self) -> bool {
        matches!(self, Self::Draft | Self::AdditionalInfoRequired)
    }
}

impl fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.label())
    }
}

impl FromStr for ApplicationStatus {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_lowercase().replace('-', "_");
        Self::ordered()
            .into_iter()
            .find(|status| status.label() == normalized)
            .ok_or_else(|| format!("unknown application status '{value}'"))
    }
}

const FROM_DRAFT: &[ApplicationStatus] =
    &[ApplicationStatus::Submitted, ApplicationStatus::Withdrawn];
const FROM_SUBMITTED: &[ApplicationStatus] =
    &[ApplicationStatus::UnderReview, ApplicationStatus::Withdrawn];
const FROM_UNDER_REVIEW: &[ApplicationStatus] = &[
    ApplicationStatus::AdditionalInfoRequired,
    ApplicationStatus::Approved,
    ApplicationStatus::Rejected,
];
const FROM_ADDITIONAL_INFO: &[ApplicationStatus] =
    &[ApplicationStatus::Submitted, ApplicationStatus::Withdrawn];

/// Row of the transition table for `status`; terminal statuses yield an empty slice.
pub fn available_transitions(status: ApplicationStatus) -> &'static [ApplicationStatus] {
    match status {
        ApplicationStatus::Draft => FROM_DRAFT,
        ApplicationStatus::Submitted => FROM_SUBMITTED,
        ApplicationStatus::UnderReview => FROM_UNDER_REVIEW,
        ApplicationStatus::AdditionalInfoRequired => FROM_ADDITIONAL_INFO,
        ApplicationStatus::Approved
        | ApplicationStatus::Rejected
        | ApplicationStatus::Withdrawn => &[],
    }
}

/// Sole legality check for status changes. Payload completeness is the caller's concern.
pub fn can_transition_to(from: ApplicationStatus, to: ApplicationStatus) -> bool {
    available_transitions(from).contains(&to)
}

/// Audit trail entry; append-only once attached to an application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusHistoryEntry {
    pub from: Option<ApplicationStatus>,
    pub to: ApplicationStatus,
    pub timestamp: DateTime<Utc>,
    pub changed_by: UserId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

/// Build a history entry stamped with the current time. Does not touch any application.
pub fn create_status_history(
    from: Option<ApplicationStatus>,
    to: ApplicationStatus,
    changed_by: &UserId,
    comment: Option<String>,
) -> StatusHistoryEntry {
    StatusHistoryEntry {
        from,
        to,
        timestamp: Utc::now(),
        changed_by: changed_by.clone(),
        comment: comment.filter(|text| !text.trim().is_empty()),
    }
}
