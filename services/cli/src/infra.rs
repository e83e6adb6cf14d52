use chrono::Utc;
use lcq::config::AppConfig;
use lcq::error::AppError;
use lcq::workflows::questionnaire::{
    ApplicationId, ApplicationStatus, ApplicationType, AuthStore, JsonFileStore,
    QuestionnaireService, Session,
};
use serde_json::Value;
use std::sync::Arc;

/// Storage and auth handles opened from configuration for a single command.
pub(crate) struct Workspace {
    storage: Arc<JsonFileStore>,
    pub(crate) auth: AuthStore<JsonFileStore>,
}

impl Workspace {
    pub(crate) fn open(config: &AppConfig) -> Result<Self, AppError> {
        let storage = Arc::new(JsonFileStore::open(&config.storage.data_path)?);
        let auth = AuthStore::new(Arc::clone(&storage), config.session.ttl());

        let configured = &config.session.admin_emails;
        if !configured.is_empty() && auth.admin_emails()? != *configured {
            auth.set_admin_emails(configured)?;
            tracing::info!(count = configured.len(), "admin list refreshed from configuration");
        }

        Ok(Self { storage, auth })
    }

    pub(crate) fn service(&self) -> QuestionnaireService<JsonFileStore> {
        QuestionnaireService::new(Arc::clone(&self.storage))
    }

    pub(crate) fn require_session(&self) -> Result<Session, AppError> {
        self.auth
            .current_session(Utc::now())?
            .ok_or_else(|| AppError::Usage("not signed in; run `lcq login` first".to_string()))
    }
}

pub(crate) fn parse_application_type(raw: &str) -> Result<ApplicationType, String> {
    raw.parse()
}

pub(crate) fn parse_status(raw: &str) -> Result<ApplicationStatus, String> {
    raw.parse()
}

pub(crate) fn parse_application_id(raw: &str) -> Result<ApplicationId, String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        Err("application id must not be empty".to_string())
    } else {
        Ok(ApplicationId(trimmed.to_string()))
    }
}

/// Parse a command-line value as JSON, falling back to a plain string.
pub(crate) fn parse_json_value(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use lcq::config::{AppEnvironment, SessionConfig, StorageConfig, TelemetryConfig};
    use serde_json::json;

    fn config(dir: &tempfile::TempDir, admin_emails: Vec<String>) -> AppConfig {
        AppConfig {
            environment: AppEnvironment::Test,
            storage: StorageConfig {
                data_path: dir.path().join("store.json"),
            },
            session: SessionConfig {
                ttl_hours: 1,
                admin_emails,
            },
            telemetry: TelemetryConfig {
                log_level: "warn".to_string(),
            },
        }
    }

    #[test]
    fn json_values_fall_back_to_strings() {
        assert_eq!(parse_json_value("42"), json!(42));
        assert_eq!(parse_json_value("true"), json!(true));
        assert_eq!(parse_json_value("[\"Antitrust\"]"), json!(["Antitrust"]));
        assert_eq!(parse_json_value("Harlow & Pike"), json!("Harlow & Pike"));
    }

    #[test]
    fn blank_application_ids_are_rejected() {
        assert!(parse_application_id("  ").is_err());
        assert_eq!(
            parse_application_id(" abc ").expect("id"),
            ApplicationId("abc".to_string())
        );
    }

    #[test]
    fn workspace_seeds_admins_and_requires_a_session() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = config(&dir, vec!["partner@firm.com".to_string()]);

        let workspace = Workspace::open(&config).expect("workspace opens");
        assert_eq!(
            workspace.auth.admin_emails().expect("admins"),
            vec!["partner@firm.com".to_string()]
        );
        assert!(matches!(
            workspace.require_session(),
            Err(AppError::Usage(_))
        ));

        workspace
            .auth
            .register("partner@firm.com", "pw")
            .expect("register");
        workspace
            .auth
            .sign_in("partner@firm.com", "pw", Utc::now())
            .expect("sign in");

        let reopened = Workspace::open(&config).expect("reopens");
        assert!(reopened.require_session().expect("session").is_admin());
    }
}
