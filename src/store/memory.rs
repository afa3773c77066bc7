use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::crypto::SecretString;
use crate::session::Session;
use crate::validators::ValidationError;
use crate::AuthError;

use super::user::{AuthUser, LogoutScope, NewUser, UserStore};

/// In-memory [`UserStore`] for tests and examples.
///
/// Clones share the underlying vector. The store counts its reads, session
/// writes, and touches so tests can assert how often the resolver actually
/// hit persistence.
#[derive(Clone)]
pub struct MemoryUserStore {
    users: Arc<Mutex<Vec<AuthUser>>>,
    next_id: Arc<AtomicI64>,
    user_reads: Arc<AtomicUsize>,
    session_writes: Arc<AtomicUsize>,
    touches: Arc<AtomicUsize>,
}

impl MemoryUserStore {
    #[must_use]
    pub fn new() -> Self {
        Self {
            users: Arc::new(Mutex::new(Vec::new())),
            next_id: Arc::new(AtomicI64::new(1)),
            user_reads: Arc::new(AtomicUsize::new(0)),
            session_writes: Arc::new(AtomicUsize::new(0)),
            touches: Arc::new(AtomicUsize::new(0)),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, Vec<AuthUser>>, AuthError> {
        self.users
            .lock()
            .map_err(|_| AuthError::Server("user store lock poisoned".to_owned()))
    }

    /// Number of `find_user_by_*` calls so far.
    pub fn user_reads(&self) -> usize {
        self.user_reads.load(Ordering::SeqCst)
    }

    /// Number of `replace_sessions` calls so far.
    pub fn session_writes(&self) -> usize {
        self.session_writes.load(Ordering::SeqCst)
    }

    /// Number of `touch_session` calls so far.
    pub fn touches(&self) -> usize {
        self.touches.load(Ordering::SeqCst)
    }

    /// Reads a user without bumping the read counter, for assertions.
    pub fn snapshot(&self, user_id: i64) -> Option<AuthUser> {
        self.users
            .lock()
            .ok()?
            .iter()
            .find(|u| u.id == user_id)
            .cloned()
    }
}

impl Default for MemoryUserStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn find_user_by_id(&self, id: i64) -> Result<Option<AuthUser>, AuthError> {
        self.user_reads.fetch_add(1, Ordering::SeqCst);
        let users = self.lock()?;
        Ok(users.iter().find(|u| u.id == id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<AuthUser>, AuthError> {
        self.user_reads.fetch_add(1, Ordering::SeqCst);
        let users = self.lock()?;
        Ok(users.iter().find(|u| u.email == email).cloned())
    }

    async fn create_user(&self, new_user: NewUser) -> Result<AuthUser, AuthError> {
        let mut users = self.lock()?;
        if users.iter().any(|u| u.email == new_user.email) {
            return Err(ValidationError::EmailTaken.into());
        }

        let now = Utc::now();
        let user = AuthUser {
            id: self.next_id.fetch_add(1, Ordering::SeqCst),
            email: new_user.email,
            name: new_user.name,
            variant: new_user.variant,
            admin: false,
            email_verified_at: None,
            reset_code: None,
            verification_code: None,
            sessions: Vec::new(),
            created_at: now,
            updated_at: now,
        };
        users.push(user.clone());
        Ok(user)
    }

    async fn replace_sessions(
        &self,
        user_id: i64,
        sessions: Vec<Session>,
    ) -> Result<(), AuthError> {
        self.session_writes.fetch_add(1, Ordering::SeqCst);
        let mut users = self.lock()?;
        if let Some(user) = users.iter_mut().find(|u| u.id == user_id) {
            user.sessions = sessions;
        }
        Ok(())
    }

    async fn touch_session(
        &self,
        user_id: i64,
        session_id: i64,
        at: DateTime<Utc>,
    ) -> Result<(), AuthError> {
        self.touches.fetch_add(1, Ordering::SeqCst);
        let mut users = self.lock()?;
        if let Some(user) = users.iter_mut().find(|u| u.id == user_id) {
            if let Some(session) = user.sessions.iter_mut().find(|s| s.id == session_id) {
                session.accessed_at = at;
            }
        }
        Ok(())
    }

    async fn remove_sessions(&self, user_id: i64, scope: LogoutScope) -> Result<(), AuthError> {
        let mut users = self.lock()?;
        if let Some(user) = users.iter_mut().find(|u| u.id == user_id) {
            match scope {
                LogoutScope::Session(session_id) => {
                    user.sessions.retain(|s| s.id != session_id);
                }
                LogoutScope::All => user.sessions.clear(),
            }
        }
        Ok(())
    }

    async fn update_password(&self, user_id: i64, password_hash: &str) -> Result<(), AuthError> {
        let mut users = self.lock()?;
        let Some(user) = users.iter_mut().find(|u| u.id == user_id) else {
            return Err(AuthError::NotFound);
        };
        match &mut user.variant {
            super::UserVariant::Native {
                password_hash: stored,
            } => {
                password_hash.clone_into(stored);
                user.updated_at = Utc::now();
                Ok(())
            }
            super::UserVariant::OAuth { .. } => Err(AuthError::Server(
                "password update on non-native account".to_owned(),
            )),
        }
    }

    async fn mark_email_verified(&self, user_id: i64) -> Result<(), AuthError> {
        let mut users = self.lock()?;
        if let Some(user) = users.iter_mut().find(|u| u.id == user_id) {
            user.email_verified_at = Some(Utc::now());
            user.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn set_reset_code(&self, user_id: i64, code: Option<&str>) -> Result<(), AuthError> {
        let mut users = self.lock()?;
        if let Some(user) = users.iter_mut().find(|u| u.id == user_id) {
            user.reset_code = code.map(SecretString::new);
        }
        Ok(())
    }

    async fn set_verification_code(
        &self,
        user_id: i64,
        code: Option<&str>,
    ) -> Result<(), AuthError> {
        let mut users = self.lock()?;
        if let Some(user) = users.iter_mut().find(|u| u.id == user_id) {
            user.verification_code = code.map(SecretString::new);
        }
        Ok(())
    }
}
