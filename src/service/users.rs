use std::sync::Arc;
use std::time::Duration;

use chrono::{SubsecRound, Utc};
use moka::future::Cache;
use tracing::{debug, error, info};

use crate::auth::password::{hash_password, verify_password};
use crate::error::PortalError;
use crate::model::role::Role;
use crate::model::user::{NewUser, User};
use crate::store::UserStore;

const USER_CACHE_CAPACITY: u64 = 50_000;

/// User lookups with a read-through cache. Role and signup time never
/// change after registration, so cached rows cannot go stale.
#[derive(Clone)]
pub struct UserDirectory {
    store: Arc<dyn UserStore>,
    cache: Cache<u64, User>,
}

impl UserDirectory {
    pub fn new(store: Arc<dyn UserStore>, ttl: Duration) -> Self {
        Self {
            store,
            cache: Cache::builder()
                .max_capacity(USER_CACHE_CAPACITY)
                .time_to_live(ttl)
                .build(),
        }
    }

    pub async fn get(&self, id: u64) -> Result<User, PortalError> {
        if let Some(user) = self.cache.get(&id).await {
            return Ok(user);
        }

        let user = self
            .store
            .find_user(id)
            .await
            .map_err(|e| {
                error!(error = %e, user_id = id, "Failed to fetch user");
                PortalError::from(e)
            })?
            .ok_or_else(|| PortalError::NotFound(format!("User {id} not found")))?;

        self.cache.insert(id, user.clone()).await;
        Ok(user)
    }

    pub async fn require_intern(&self, id: u64) -> Result<User, PortalError> {
        let user = self.get(id).await?;
        if user.role != Role::Intern {
            return Err(PortalError::Validation(format!("User {id} is not an intern")));
        }
        Ok(user)
    }

    pub async fn register(
        &self,
        username: &str,
        password: &str,
        role: Role,
    ) -> Result<User, PortalError> {
        let username = username.trim();
        if username.is_empty() || password.is_empty() {
            return Err(PortalError::Validation(
                "Username and password must not be empty".into(),
            ));
        }

        let password_hash = hash_password(password).map_err(|e| {
            error!(error = %e, "Failed to hash password");
            PortalError::Validation("Password cannot be used".into())
        })?;

        let user = self
            .store
            .insert_user(NewUser {
                username: username.to_string(),
                password_hash,
                role,
                // column precision, so the cached row matches the stored one
                created_at: Utc::now().trunc_subsecs(3),
            })
            .await
            .map_err(|e| {
                error!(error = %e, username, "Failed to register user");
                PortalError::from(e)
            })?;

        self.cache.insert(user.id, user.clone()).await;
        info!(user_id = user.id, role = %user.role, "User registered");
        Ok(user)
    }

    pub async fn authenticate(&self, username: &str, password: &str) -> Result<User, PortalError> {
        let credentials = self
            .store
            .find_credentials(username.trim())
            .await
            .map_err(|e| {
                error!(error = %e, "Database error while fetching user");
                PortalError::from(e)
            })?
            .ok_or_else(|| {
                debug!("Invalid credentials: user not found");
                PortalError::Unauthorized("Invalid credentials".into())
            })?;

        if let Err(e) = verify_password(password, &credentials.password_hash) {
            debug!(error = %e, "Invalid credentials: password mismatch");
            return Err(PortalError::Unauthorized("Invalid credentials".into()));
        }
        Ok(credentials.user)
    }

    pub async fn interns_without_tasks(&self) -> Result<Vec<User>, PortalError> {
        self.store.interns_without_tasks().await.map_err(|e| {
            error!(error = %e, "Failed to list interns without tasks");
            PortalError::from(e)
        })
    }

    /// Create the bootstrap super admin unless that username already exists.
    pub async fn ensure_super_admin(&self, username: &str, password: &str) -> Result<(), PortalError> {
        let existing = self.store.find_credentials(username).await?;
        if existing.is_some() {
            debug!(username, "Super admin already present");
            return Ok(());
        }
        self.register(username, password, Role::Sadmin).await?;
        Ok(())
    }
}
