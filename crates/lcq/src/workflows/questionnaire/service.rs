use std::sync::Arc;

use super::auth::Session;
use super::domain::{Application, ApplicationId, ApplicationListItem};
use super::guard::{check_access, furthest_accessible, StepAccess};
use super::persistence::KeyValueStore;
use super::status::ApplicationStatus;
use super::steps::{next_step, steps_for, ApplicationType, Step};
use super::store::{ApplicationStore, ListFilter, StoreError};
use super::validation::{validate_step, FieldError};

/// Wizard and review facade composing the step guard, validation, store, and
/// status machine.
pub struct QuestionnaireService<S> {
    store: ApplicationStore<S>,
}

/// Outcome of a successful "Next" action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepAdvance {
    pub completed: &'static str,
    pub next: Option<&'static Step>,
}

impl<S> QuestionnaireService<S>
where
    S: KeyValueStore,
{
    pub fn new(storage: Arc<S>) -> Self {
        Self {
            store: ApplicationStore::new(storage),
        }
    }

    pub fn store(&self) -> &ApplicationStore<S> {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut ApplicationStore<S> {
        &mut self.store
    }

    pub fn start(
        &mut self,
        session: &Session,
        application_type: ApplicationType,
    ) -> Result<ApplicationId, ServiceError> {
        Ok(self
            .store
            .initialize_application(session.user_id.clone(), application_type)?)
    }

    /// Load an application and return the step to resume on.
    ///
    /// The owner gets an editable copy; a reviewer opening someone else's
    /// application gets a read-only one.
    pub fn resume(
        &mut self,
        session: &Session,
        id: &ApplicationId,
    ) -> Result<&'static Step, ServiceError> {
        let owner = match self.store.get(id) {
            Ok(application) => application.user_id,
            Err(err) => {
                self.store.close();
                return Err(err.into());
            }
        };
        let application = if owner == session.user_id {
            self.store.load_application(id)?
        } else if session.is_admin() {
            self.store.load_read_only(id)?
        } else {
            self.store.close();
            return Err(ServiceError::Forbidden("application belongs to another user"));
        };

        let steps = steps_for(application.data.application_type);
        let resume_at = match check_access(
            steps,
            &application.data.current_step,
            &application.data.completed_steps,
        ) {
            StepAccess::Granted => steps
                .iter()
                .find(|step| step.path == application.data.current_step)
                .unwrap_or_else(|| furthest_accessible(steps, &application.data.completed_steps)),
            StepAccess::Redirect { index, .. } => &steps[index],
        };
        Ok(resume_at)
    }

    /// Guard check against the active application's completed steps.
    pub fn access(&self, step_path: &str) -> Result<StepAccess, ServiceError> {
        let application = self.active()?;
        let steps = steps_for(application.data.application_type);
        Ok(check_access(
            steps,
            step_path,
            &application.data.completed_steps,
        ))
    }

    /// "Next": validate the step, record it complete, move forward, and save the draft.
    ///
    /// Validation failures leave the application untouched.
    pub fn advance(&mut self, step_path: &str) -> Result<StepAdvance, ServiceError> {
        let application = self.editable()?;
        let application_type = application.data.application_type;
        let steps = steps_for(application_type);

        let Some(step) = steps.iter().find(|step| step.path == step_path) else {
            return Err(StoreError::UnknownStep {
                path: step_path.to_string(),
                application_type,
            }
            .into());
        };

        if let StepAccess::Redirect { path, .. } =
            check_access(steps, step_path, &application.data.completed_steps)
        {
            return Err(ServiceError::StepLocked {
                requested: step.path,
                redirect: path,
            });
        }

        let errors = validate_step(step.path, &application.data.form);
        if !errors.is_empty() {
            return Err(ServiceError::Validation(errors));
        }

        self.store.mark_step_complete(step.path)?;
        let next = next_step(application_type, step.path);
        if let Some(next) = next {
            self.store.set_current_step(next.path)?;
        }
        self.store.save_as_draft()?;
        self.store.mark_clean();

        Ok(StepAdvance {
            completed: step.path,
            next,
        })
    }

    pub fn save_draft(&mut self) -> Result<&Application, ServiceError> {
        self.editable()?;
        self.store.save_as_draft()?;
        self.store.mark_clean();
        Ok(self.active()?)
    }

    /// Submit the active application once every step is complete.
    ///
    /// Completeness is checked here; transition legality is left to the status machine.
    pub fn submit(&mut self, session: &Session) -> Result<Application, ServiceError> {
        let application = self.active()?;
        ensure_owner(session, application)?;

        let missing = application.data.missing_steps();
        if !missing.is_empty() {
            return Err(ServiceError::Incomplete { missing });
        }

        let id = application.id.clone();
        self.store.save_as_draft()?;
        self.store.mark_clean();
        Ok(self.store.transition_status(
            &id,
            ApplicationStatus::Submitted,
            &session.user_id,
            None,
        )?)
    }

    pub fn withdraw(
        &mut self,
        session: &Session,
        comment: Option<String>,
    ) -> Result<Application, ServiceError> {
        let application = self.active()?;
        ensure_owner(session, application)?;
        let id = application.id.clone();
        Ok(self.store.transition_status(
            &id,
            ApplicationStatus::Withdrawn,
            &session.user_id,
            comment,
        )?)
    }

    /// Reviewer decision on any application.
    ///
    /// Submission is left to the applicant, since only `submit` checks that
    /// every step is complete.
    pub fn review(
        &mut self,
        session: &Session,
        id: &ApplicationId,
        to: ApplicationStatus,
        comment: Option<String>,
    ) -> Result<Application, ServiceError> {
        ensure_admin(session)?;
        if to == ApplicationStatus::Submitted {
            return Err(ServiceError::Forbidden("only the applicant may submit"));
        }
        Ok(self
            .store
            .transition_status(id, to, &session.user_id, comment)?)
    }

    pub fn review_queue(
        &self,
        session: &Session,
        status: Option<ApplicationStatus>,
    ) -> Result<Vec<ApplicationListItem>, ServiceError> {
        ensure_admin(session)?;
        let filter = ListFilter {
            user_id: None,
            status,
        };
        Ok(self.store.list_applications(&filter)?)
    }

    /// The signed-in candidate's own applications.
    pub fn my_applications(
        &self,
        session: &Session,
    ) -> Result<Vec<ApplicationListItem>, ServiceError> {
        let filter = ListFilter {
            user_id: Some(session.user_id.clone()),
            status: None,
        };
        Ok(self.store.list_applications(&filter)?)
    }

    fn active(&self) -> Result<&Application, ServiceError> {
        self.store
            .active()
            .ok_or(ServiceError::Store(StoreError::NoActiveApplication))
    }

    fn editable(&self) -> Result<&Application, ServiceError> {
        let application = self.active()?;
        if self.store.is_read_only() {
            return Err(ServiceError::Forbidden("reviewers cannot edit an applicant's draft"));
        }
        Ok(application)
    }
}

fn ensure_owner(session: &Session, application: &Application) -> Result<(), ServiceError> {
    if application.user_id == session.user_id {
        Ok(())
    } else {
        Err(ServiceError::Forbidden("only the applicant may do this"))
    }
}

fn ensure_admin(session: &Session) -> Result<(), ServiceError> {
    if session.is_admin() {
        Ok(())
    } else {
        Err(ServiceError::Forbidden("reviewer access required"))
    }
}

/// Error raised by the questionnaire service.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("step {requested} is locked; continue at {redirect}")]
    StepLocked {
        requested: &'static str,
        redirect: &'static str,
    },
    #[error("{} field(s) need attention", .0.len())]
    Validation(Vec<FieldError>),
    #[error("application is incomplete; unfinished steps: {}", .missing.join(", "))]
    Incomplete { missing: Vec<&'static str> },
    #[error("forbidden: {0}")]
    Forbidden(&'static str),
    #[error(transparent)]
    Store(#[from] StoreError),
}
