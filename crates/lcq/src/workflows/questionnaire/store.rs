use std::sync::Arc;

use chrono::Utc;
use serde_json::Value;

use super::domain::{
    Application, ApplicationData, ApplicationId, ApplicationListItem, FieldPathError, UserId,
};
use super::persistence::{read_json, write_json, KeyValueStore, StorageError};
use super::status::{
    can_transition_to, create_status_history, ApplicationStatus, StatusHistoryEntry,
};
use super::steps::{index_of, ApplicationType};

const APPLICATION_INDEX_KEY: &str = "lcq:applications";

pub(crate) fn application_key(id: &ApplicationId) -> String {
    format!("lcq:application:{id}")
}

/// Error enumeration for store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("application {0} not found")]
    NotFound(ApplicationId),
    #[error("no application is loaded")]
    NoActiveApplication,
    #[error("'{path}' is not a step of the {application_type} questionnaire")]
    UnknownStep {
        path: String,
        application_type: ApplicationType,
    },
    #[error("application is {0} and can no longer be edited")]
    NotEditable(ApplicationStatus),
    #[error("application {0} is open read-only")]
    ReadOnly(ApplicationId),
    #[error("cannot move application from {from} to {to}")]
    IllegalTransition {
        from: ApplicationStatus,
        to: ApplicationStatus,
    },
    #[error(transparent)]
    FieldPath(#[from] FieldPathError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Narrowing applied to application listings.
#[derive(Debug, Clone, Default)]
pub struct ListFilter {
    pub user_id: Option<UserId>,
    pub status: Option<ApplicationStatus>,
}

/// Explicit state container for the application currently being drafted.
///
/// Holds at most one active application in memory, plus the dirty flag used for
/// unsaved-change warnings. Every persisted write goes through the injected store.
/// An application opened with `load_read_only` rejects edits and draft saves.
pub struct ApplicationStore<S> {
    storage: Arc<S>,
    active: Option<Application>,
    dirty: bool,
    read_only: bool,
}

impl<S> ApplicationStore<S>
where
    S: KeyValueStore,
{
    pub fn new(storage: Arc<S>) -> Self {
        Self {
            storage,
            active: None,
            dirty: false,
            read_only: false,
        }
    }

    pub fn storage(&self) -> &Arc<S> {
        &self.storage
    }

    pub fn active(&self) -> Option<&Application> {
        self.active.as_ref()
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    /// Create and persist a fresh draft, making it the active application.
    ///
    /// Does not deduplicate: each call creates a new application.
    pub fn initialize_application(
        &mut self,
        user_id: UserId,
        application_type: ApplicationType,
    ) -> Result<ApplicationId, StoreError> {
        let now = Utc::now();
        let id = ApplicationId::generate();
        let created = create_status_history(None, ApplicationStatus::Draft, &user_id, None);

        let application = Application {
            id: id.clone(),
            user_id,
            status: ApplicationStatus::Draft,
            status_history: vec![created],
            data: ApplicationData::new(application_type),
            created_at: now,
            updated_at: now,
        };

        self.persist(&application)?;
        self.append_to_index(&id)?;

        tracing::info!(application_id = %id, %application_type, "application initialized");
        self.active = Some(application);
        self.dirty = false;
        self.read_only = false;
        Ok(id)
    }

    /// Hydrate the active application from storage for editing.
    ///
    /// A failed load leaves no application active.
    pub fn load_application(&mut self, id: &ApplicationId) -> Result<&Application, StoreError> {
        self.hydrate(id, false)
    }

    /// Hydrate the active application for inspection only.
    pub fn load_read_only(&mut self, id: &ApplicationId) -> Result<&Application, StoreError> {
        self.hydrate(id, true)
    }

    /// Add `step_path` to the completed set. Returns whether it was newly added.
    pub fn mark_step_complete(&mut self, step_path: &str) -> Result<bool, StoreError> {
        let application = self.editable_mut()?;
        ensure_known_step(application.data.application_type, step_path)?;

        let added = application
            .data
            .completed_steps
            .insert(step_path.to_string());
        if added {
            self.dirty = true;
        }
        Ok(added)
    }

    pub fn set_current_step(&mut self, step_path: &str) -> Result<(), StoreError> {
        let application = self.active_mut()?;
        ensure_known_step(application.data.application_type, step_path)?;

        if application.data.current_step != step_path {
            application.data.current_step = step_path.to_string();
            self.dirty = true;
        }
        Ok(())
    }

    pub fn set_field(&mut self, path: &str, value: Value) -> Result<(), StoreError> {
        self.editable_mut()?.data.form.set(path, value)?;
        self.dirty = true;
        Ok(())
    }

    pub fn update_section(&mut self, section: &str, value: Value) -> Result<(), StoreError> {
        self.editable_mut()?.data.form.replace_section(section, value);
        self.dirty = true;
        Ok(())
    }

    /// Write in-memory form data and progress back to storage.
    ///
    /// Status and history always come from the persisted record so a stale
    /// in-memory copy never rolls back a review decision.
    pub fn save_as_draft(&mut self) -> Result<&Application, StoreError> {
        let storage = Arc::clone(&self.storage);
        let read_only = self.read_only;
        let application = self.active.as_mut().ok_or(StoreError::NoActiveApplication)?;
        if read_only {
            return Err(StoreError::ReadOnly(application.id.clone()));
        }
        let key = application_key(&application.id);

        if let Some(persisted) = read_json::<Application, _>(storage.as_ref(), &key)? {
            application.status = persisted.status;
            application.status_history = persisted.status_history;
        }
        application.updated_at = Utc::now();
        write_json(storage.as_ref(), &key, &*application)?;

        tracing::debug!(application_id = %application.id, "draft saved");
        Ok(&*application)
    }

    /// Clear the unsaved-changes flag. Nothing is persisted.
    pub fn mark_clean(&mut self) {
        self.dirty = false;
    }

    /// Forget the active application without saving.
    pub fn close(&mut self) {
        self.active = None;
        self.dirty = false;
        self.read_only = false;
    }

    /// Move a persisted application to `to`, appending the history entry and the
    /// new status in a single write.
    pub fn transition_status(
        &mut self,
        id: &ApplicationId,
        to: ApplicationStatus,
        changed_by: &UserId,
        comment: Option<String>,
    ) -> Result<Application, StoreError> {
        let mut application = self.fetch(id)?;
        let from = application.status;
        if !can_transition_to(from, to) {
            return Err(StoreError::IllegalTransition { from, to });
        }

        let entry = create_status_history(Some(from), to, changed_by, comment);
        application.updated_at = entry.timestamp;
        application.status = to;
        application.status_history.push(entry);
        self.persist(&application)?;

        tracing::info!(
            application_id = %id,
            from = from.label(),
            to = to.label(),
            changed_by = %changed_by,
            "application status changed"
        );

        if let Some(active) = self.active.as_mut().filter(|active| active.id == *id) {
            active.status = application.status;
            active.status_history = application.status_history.clone();
            active.updated_at = application.updated_at;
        }
        Ok(application)
    }

    pub fn get(&self, id: &ApplicationId) -> Result<Application, StoreError> {
        self.fetch(id)
    }

    pub fn history(&self, id: &ApplicationId) -> Result<Vec<StatusHistoryEntry>, StoreError> {
        Ok(self.fetch(id)?.status_history)
    }

    /// Projection of every indexed application matching `filter`, newest first.
    pub fn list_applications(
        &self,
        filter: &ListFilter,
    ) -> Result<Vec<ApplicationListItem>, StoreError> {
        let mut items = Vec::new();
        for id in self.index()? {
            let Some(application) =
                read_json::<Application, _>(self.storage.as_ref(), &application_key(&id))?
            else {
                continue;
            };

            if filter
                .user_id
                .as_ref()
                .is_some_and(|user| *user != application.user_id)
            {
                continue;
            }
            if filter
                .status
                .is_some_and(|status| status != application.status)
            {
                continue;
            }
            items.push(application.list_item());
        }

        items.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(items)
    }

    fn hydrate(
        &mut self,
        id: &ApplicationId,
        read_only: bool,
    ) -> Result<&Application, StoreError> {
        let application = match self.fetch(id) {
            Ok(application) => application,
            Err(err) => {
                self.close();
                return Err(err);
            }
        };
        self.dirty = false;
        self.read_only = read_only;
        Ok(&*self.active.insert(application))
    }

    fn fetch(&self, id: &ApplicationId) -> Result<Application, StoreError> {
        read_json(self.storage.as_ref(), &application_key(id))?
            .ok_or_else(|| StoreError::NotFound(id.clone()))
    }

    fn persist(&self, application: &Application) -> Result<(), StoreError> {
        write_json(
            self.storage.as_ref(),
            &application_key(&application.id),
            application,
        )?;
        Ok(())
    }

    fn index(&self) -> Result<Vec<ApplicationId>, StoreError> {
        Ok(read_json(self.storage.as_ref(), APPLICATION_INDEX_KEY)?.unwrap_or_default())
    }

    fn append_to_index(&self, id: &ApplicationId) -> Result<(), StoreError> {
        let mut ids = self.index()?;
        if !ids.contains(id) {
            ids.push(id.clone());
            write_json(self.storage.as_ref(), APPLICATION_INDEX_KEY, &ids)?;
        }
        Ok(())
    }

    fn active_mut(&mut self) -> Result<&mut Application, StoreError> {
        let application = self.active.as_mut().ok_or(StoreError::NoActiveApplication)?;
        if self.read_only {
            return Err(StoreError::ReadOnly(application.id.clone()));
        }
        Ok(application)
    }

    fn editable_mut(&mut self) -> Result<&mut Application, StoreError> {
        let application = self.active_mut()?;
        if !application.status.is_editable() {
            return Err(StoreError::NotEditable(application.status));
        }
        Ok(application)
    }
}

fn ensure_known_step(application_type: ApplicationType, path: &str) -> Result<(), StoreError> {
    match index_of(application_type, path) {
        Some(_) => Ok(()),
        None => Err(StoreError::UnknownStep {
            path: path.to_string(),
            application_type,
        }),
    }
}

