//! Lateral candidate questionnaire: wizard catalog, step gating, draft state,
//! validation, and the review lifecycle.

pub mod auth;
pub mod domain;
pub mod guard;
pub mod persistence;
pub mod service;
pub mod status;
pub mod steps;
pub mod store;
pub mod validation;

#[cfg(test)]
mod tests;

pub use auth::{AuthError, AuthStore, Role, Session, UserCredentials};
pub use domain::{
    Application, ApplicationData, ApplicationId, ApplicationListItem, FieldPathError,
    FormDocument, UserId,
};
pub use guard::{can_access, check_access, furthest_accessible, StepAccess};
pub use persistence::{JsonFileStore, KeyValueStore, MemoryStore, StorageError};
pub use service::{QuestionnaireService, ServiceError, StepAdvance};
pub use status::{
    available_transitions, can_transition_to, create_status_history, ApplicationStatus,
    StatusHistoryEntry,
};
pub use steps::{
    index_of, next_step, step_at, steps_for, ApplicationType, Step, GROUP_STEPS,
    INDIVIDUAL_STEPS,
};
pub use store::{ApplicationStore, ListFilter, StoreError};
pub use validation::{validate, validate_step, FieldError};
