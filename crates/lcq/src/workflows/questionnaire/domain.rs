use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::status::{ApplicationStatus, StatusHistoryEntry};
use super::steps::{steps_for, ApplicationType};

/// Identifier wrapper for questionnaire applications.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ApplicationId(pub String);

impl ApplicationId {
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ApplicationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier of a registered candidate or reviewer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub String);

impl UserId {
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Nested answers document addressed with dotted paths (`bio.first_name`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FormDocument(Map<String, Value>);

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FieldPathError {
    #[error("field path must not be empty")]
    Empty,
    #[error("'{segment}' in '{path}' is not an object")]
    NotAnObject { path: String, segment: String },
}

impl FormDocument {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, path: &str) -> Option<&Value> {
        let mut segments = path.split('.');
        let first = segments.next()?;
        let mut current = self.0.get(first)?;
        for segment in segments {
            current = current.as_object()?.get(segment)?;
        }
        Some(current)
    }

    pub fn get_str(&self, path: &str) -> Option<&str> {
        self.get(path).and_then(Value::as_str)
    }

    /// Write `value` at `path`, creating intermediate objects as needed.
    pub fn set(&mut self, path: &str, value: Value) -> Result<(), FieldPathError> {
        let segments: Vec<&str> = path.split('.').collect();
        if segments.iter().any(|segment| segment.is_empty()) {
            return Err(FieldPathError::Empty);
        }

        let (last, parents) = segments.split_last().ok_or(FieldPathError::Empty)?;
        let mut current = &mut self.0;
        for segment in parents {
            let entry = current
                .entry(segment.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            current = entry
                .as_object_mut()
                .ok_or_else(|| FieldPathError::NotAnObject {
                    path: path.to_string(),
                    segment: segment.to_string(),
                })?;
        }
        current.insert(last.to_string(), value);
        Ok(())
    }

    pub fn remove(&mut self, path: &str) -> Option<Value> {
        match path.rsplit_once('.') {
            None => self.0.remove(path),
            Some((parent, last)) => self.get_mut(parent)?.as_object_mut()?.remove(last),
        }
    }

    pub fn section(&self, name: &str) -> Option<&Map<String, Value>> {
        self.0.get(name).and_then(Value::as_object)
    }

    pub fn replace_section(&mut self, name: &str, value: Value) {
        self.0.insert(name.to_string(), value);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn get_mut(&mut self, path: &str) -> Option<&mut Value> {
        let mut segments = path.split('.');
        let first = segments.next()?;
        let mut current = self.0.get_mut(first)?;
        for segment in segments {
            current = current.as_object_mut()?.get_mut(segment)?;
        }
        Some(current)
    }
}

impl From<Map<String, Value>> for FormDocument {
    fn from(value: Map<String, Value>) -> Self {
        Self(value)
    }
}

/// In-progress wizard data carried by an application.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplicationData {
    pub application_type: ApplicationType,
    pub current_step: String,
    #[serde(default)]
    pub completed_steps: BTreeSet<String>,
    #[serde(default)]
    pub form: FormDocument,
}

impl ApplicationData {
    pub fn new(application_type: ApplicationType) -> Self {
        let first = steps_for(application_type)
            .first()
            .map(|step| step.path.to_string())
            .unwrap_or_default();
        Self {
            application_type,
            current_step: first,
            completed_steps: BTreeSet::new(),
            form: FormDocument::new(),
        }
    }

    /// True when every step of the catalog is marked complete.
    pub fn is_complete(&self) -> bool {
        self.missing_steps().is_empty()
    }

    pub fn missing_steps(&self) -> Vec<&'static str> {
        steps_for(self.application_type)
            .iter()
            .filter(|step| !self.completed_steps.contains(step.path))
            .map(|step| step.path)
            .collect()
    }

    pub fn completion_percent(&self) -> u8 {
        let steps = steps_for(self.application_type);
        if steps.is_empty() {
            return 0;
        }
        let done = steps
            .iter()
            .filter(|step| self.completed_steps.contains(step.path))
            .count();
        ((done * 100) / steps.len()) as u8
    }
}

/// Persisted questionnaire application.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Application {
    pub id: ApplicationId,
    pub user_id: UserId,
    pub status: ApplicationStatus,
    #[serde(default)]
    pub status_history: Vec<StatusHistoryEntry>,
    pub data: ApplicationData,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Application {
    pub fn application_type(&self) -> ApplicationType {
        self.data.application_type
    }

    pub fn candidate_name(&self) -> String {
        let form = &self.data.form;
        let name = match self.data.application_type {
            ApplicationType::Individual => {
                let parts: Vec<&str> = ["bio.first_name", "bio.last_name"]
                    .iter()
                    .filter_map(|path| form.get_str(path))
                    .map(str::trim)
                    .filter(|part| !part.is_empty())
                    .collect();
                parts.join(" ")
            }
            ApplicationType::Group => form
                .get_str("overview.group_name")
                .map(|name| name.trim().to_string())
                .unwrap_or_default(),
        };

        if name.is_empty() {
            "(unnamed candidate)".to_string()
        } else {
            name
        }
    }

    pub fn list_item(&self) -> ApplicationListItem {
        ApplicationListItem {
            id: self.id.clone(),
            candidate_name: self.candidate_name(),
            application_type: self.data.application_type,
            status: self.status,
            completion_percent: self.data.completion_percent(),
            updated_at: self.updated_at,
        }
    }
}

/// Read-only projection used by list views; never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApplicationListItem {
    pub id: ApplicationId,
    pub candidate_name: String,
    pub application_type: ApplicationType,
    pub status: ApplicationStatus,
    pub completion_percent: u8,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn set_creates_intermediate_objects() {
        let mut form = FormDocument::new();
        form.set("bio.first_name", json!("Ada")).expect("path is valid");
        form.set("bio.address.city", json!("Chicago"))
            .expect("path is valid");

        assert_eq!(form.get_str("bio.first_name"), Some("Ada"));
        assert_eq!(form.get_str("bio.address.city"), Some("Chicago"));
        assert!(form.section("bio").is_some());
    }

    #[test]
    fn set_rejects_paths_through_scalars() {
        let mut form = FormDocument::new();
        form.set("bio.first_name", json!("Ada")).expect("path is valid");

        let err = form
            .set("bio.first_name.initial", json!("A"))
            .expect_err("scalar cannot hold children");
        assert!(matches!(err, FieldPathError::NotAnObject { .. }));
        assert_eq!(form.set("bio..x", json!(1)), Err(FieldPathError::Empty));
    }

    #[test]
    fn remove_drops_nested_values() {
        let mut form = FormDocument::new();
        form.set("conflicts.details", json!("none")).expect("valid");
        assert_eq!(form.remove("conflicts.details"), Some(json!("none")));
        assert!(form.get("conflicts.details").is_none());
    }

    #[test]
    fn completion_percent_counts_catalog_steps_only() {
        let mut data = ApplicationData::new(ApplicationType::Group);
        data.completed_steps.insert("/group/overview".to_string());
        data.completed_steps.insert("/application/bio".to_string());
        assert_eq!(data.completion_percent(), 14);
        assert_eq!(data.missing_steps().len(), 6);
        assert!(!data.is_complete());
    }
}
