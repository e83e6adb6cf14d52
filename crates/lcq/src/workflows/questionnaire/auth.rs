//! Local credential and session gate.
//!
//! Credentials, the admin e-mail list, and the current session are plain
//! documents in the key-value store. Expiry is a local timestamp comparison;
//! nothing here is a security boundary.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::domain::UserId;
use super::persistence::{read_json, write_json, KeyValueStore, StorageError};

const CREDENTIALS_KEY: &str = "lcq:credentials";
const ADMIN_EMAILS_KEY: &str = "lcq:admin-emails";
const SESSION_KEY: &str = "lcq:session";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Candidate,
    Admin,
}

impl Role {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Candidate => "candidate",
            Self::Admin => "admin",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserCredentials {
    pub user_id: UserId,
    pub email: String,
    pub password_digest: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub user_id: UserId,
    pub email: String,
    pub role: Role,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("an account already exists for {0}")]
    AlreadyRegistered(String),
    #[error("invalid email or password")]
    InvalidCredentials,
    #[error("email address '{0}' is not valid")]
    InvalidEmail(String),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

pub struct AuthStore<S> {
    storage: Arc<S>,
    session_ttl: Duration,
}

impl<S> AuthStore<S>
where
    S: KeyValueStore,
{
    pub fn new(storage: Arc<S>, session_ttl: Duration) -> Self {
        Self {
            storage,
            session_ttl,
        }
    }

    pub fn register(&self, email: &str, password: &str) -> Result<UserCredentials, AuthError> {
        let email = normalize_email(email)?;
        let mut credentials = self.credentials()?;
        if credentials.contains_key(&email) {
            return Err(AuthError::AlreadyRegistered(email));
        }

        let record = UserCredentials {
            user_id: UserId::generate(),
            email: email.clone(),
            password_digest: digest_password(&email, password),
            created_at: Utc::now(),
        };
        credentials.insert(email, record.clone());
        write_json(self.storage.as_ref(), CREDENTIALS_KEY, &credentials)?;

        tracing::info!(user_id = %record.user_id, "user registered");
        Ok(record)
    }

    /// Verify credentials and persist a session valid for the configured TTL.
    pub fn sign_in(
        &self,
        email: &str,
        password: &str,
        now: DateTime<Utc>,
    ) -> Result<Session, AuthError> {
        let email = normalize_email(email)?;
        let credentials = self.credentials()?;
        let record = credentials
            .get(&email)
            .filter(|record| record.password_digest == digest_password(&email, password))
            .ok_or(AuthError::InvalidCredentials)?;

        let role = if self.admin_emails()?.contains(&email) {
            Role::Admin
        } else {
            Role::Candidate
        };

        let session = Session {
            user_id: record.user_id.clone(),
            email,
            role,
            issued_at: now,
            expires_at: now + self.session_ttl,
        };
        write_json(self.storage.as_ref(), SESSION_KEY, &session)?;

        tracing::info!(user_id = %session.user_id, role = role.label(), "session started");
        Ok(session)
    }

    /// Current session, if any. Expired sessions are removed and reported as absent.
    pub fn current_session(&self, now: DateTime<Utc>) -> Result<Option<Session>, AuthError> {
        let Some(session) = read_json::<Session, _>(self.storage.as_ref(), SESSION_KEY)? else {
            return Ok(None);
        };

        if session.is_expired(now) {
            tracing::info!(user_id = %session.user_id, "session expired");
            self.storage.remove(SESSION_KEY)?;
            return Ok(None);
        }
        Ok(Some(session))
    }

    pub fn sign_out(&self) -> Result<(), AuthError> {
        self.storage.remove(SESSION_KEY)?;
        Ok(())
    }

    pub fn set_admin_emails(&self, emails: &[String]) -> Result<(), AuthError> {
        let mut normalized = emails
            .iter()
            .map(|email| normalize_email(email))
            .collect::<Result<Vec<_>, _>>()?;
        normalized.sort();
        normalized.dedup();
        write_json(self.storage.as_ref(), ADMIN_EMAILS_KEY, &normalized)?;
        Ok(())
    }

    pub fn admin_emails(&self) -> Result<Vec<String>, AuthError> {
        Ok(read_json(self.storage.as_ref(), ADMIN_EMAILS_KEY)?.unwrap_or_default())
    }

    fn credentials(&self) -> Result<BTreeMap<String, UserCredentials>, AuthError> {
        Ok(read_json(self.storage.as_ref(), CREDENTIALS_KEY)?.unwrap_or_default())
    }
}

fn normalize_email(email: &str) -> Result<String, AuthError> {
    let normalized = email.trim().to_ascii_lowercase();
    match normalized.split_once('@') {
        Some((local, domain)) if !local.is_empty() && domain.contains('.') => Ok(normalized),
        _ => Err(AuthError::InvalidEmail(email.to_string())),
    }
}

fn digest_password(email: &str, password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(email.as_bytes());
    hasher.update(b":");
    hasher.update(password.as_bytes());
    hasher
        .finalize()
        .iter()
        .fold(String::with_capacity(64), |mut hex, byte| {
            let _ = write!(hex, "{byte:02x}");
            hex
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflows::questionnaire::persistence::MemoryStore;

    fn auth() -> AuthStore<MemoryStore> {
        AuthStore::new(Arc::new(MemoryStore::new()), Duration::hours(2))
    }

    #[test]
    fn sign_in_assigns_admin_role_from_admin_list() {
        let auth = auth();
        auth.set_admin_emails(&["Recruiting@Firm.com".to_string()])
            .expect("admins stored");
        auth.register("recruiting@firm.com", "secret").expect("register admin");
        auth.register("candidate@example.com", "pw").expect("register candidate");

        let now = Utc::now();
        let admin = auth
            .sign_in("recruiting@firm.com", "secret", now)
            .expect("admin signs in");
        assert!(admin.is_admin());

        let candidate = auth
            .sign_in("candidate@example.com", "pw", now)
            .expect("candidate signs in");
        assert_eq!(candidate.role, Role::Candidate);
    }

    #[test]
    fn wrong_password_is_rejected() {
        let auth = auth();
        auth.register("a@example.com", "right").expect("register");
        assert!(matches!(
            auth.sign_in("a@example.com", "wrong", Utc::now()),
            Err(AuthError::InvalidCredentials)
        ));
        assert!(matches!(
            auth.register("A@example.com", "again"),
            Err(AuthError::AlreadyRegistered(_))
        ));
    }

    #[test]
    fn expired_sessions_are_dropped() {
        let auth = auth();
        auth.register("a@example.com", "pw").expect("register");
        let issued = Utc::now();
        auth.sign_in("a@example.com", "pw", issued).expect("sign in");

        let within = auth
            .current_session(issued + Duration::minutes(30))
            .expect("read session");
        assert!(within.is_some());

        let after = auth
            .current_session(issued + Duration::hours(3))
            .expect("read session");
        assert!(after.is_none());
        assert!(auth
            .current_session(issued)
            .expect("read session")
            .is_none());
    }
}
