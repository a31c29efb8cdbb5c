use std::sync::Arc;

use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::config::AdminBootstrap;
use crate::models::{Role, StaffAccount, StaffProfile};
use crate::services::auth_service;
use crate::stores::{StaffStore, StoreError};

const MIN_USERNAME_LEN: usize = 3;
const MIN_PASSWORD_LEN: usize = 6;

#[derive(Debug, Error)]
pub enum StaffError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    NotFound(String),

    #[error("invalid username or password")]
    InvalidCredentials,

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("password hashing failed: {0}")]
    Hashing(String),

    #[error("no numeric account id left after {0}")]
    IdsExhausted(u64),
}

/// Raw account fields as submitted by a client.
#[derive(Debug, Clone, Default)]
pub struct AccountInput {
    pub username: String,
    pub password: String,
    pub name: String,
    pub role: String,
}

/// Staff accounts on top of a [`StaffStore`]. Every read-modify-write cycle
/// runs under one lock so concurrent admin edits do not drop each other.
pub struct StaffDirectory {
    store: Arc<dyn StaffStore>,
    write_lock: Mutex<()>,
}

impl StaffDirectory {
    pub fn new(store: Arc<dyn StaffStore>) -> Self {
        Self {
            store,
            write_lock: Mutex::new(()),
        }
    }

    pub fn backend_tag(&self) -> &'static str {
        self.store.backend_tag()
    }

    pub async fn list(&self) -> Result<Vec<StaffProfile>, StaffError> {
        let accounts = self.store.load().await?;
        Ok(accounts.iter().map(StaffAccount::profile).collect())
    }

    pub async fn create(&self, input: AccountInput) -> Result<StaffProfile, StaffError> {
        let username = validate_username(&input.username)?;
        let password = validate_password(&input.password)?;
        let name = validate_name(&input.name)?;
        let role = validate_role(&input.role)?;

        let _guard = self.write_lock.lock().await;
        let mut accounts = self.store.load().await?;
        if accounts.iter().any(|a| a.username.eq_ignore_ascii_case(&username)) {
            return Err(StaffError::Conflict("Username already taken".to_string()));
        }

        let account = StaffAccount {
            id: next_id(&accounts)?,
            username,
            password_hash: Some(hash(password).await?),
            password: None,
            name,
            role,
        };
        let profile = account.profile();
        accounts.push(account);
        self.store.save(&accounts).await?;

        info!(
            id = %profile.id,
            username = %profile.username,
            role = profile.role.as_str(),
            "staff account created"
        );
        Ok(profile)
    }

    /// Self-registration always yields a plain `user` account.
    pub async fn register(
        &self,
        username: &str,
        password: &str,
        name: &str,
    ) -> Result<StaffProfile, StaffError> {
        self.create(AccountInput {
            username: username.to_string(),
            password: password.to_string(),
            name: name.to_string(),
            role: Role::User.as_str().to_string(),
        })
        .await
    }

    /// An empty password leaves the stored credential untouched.
    pub async fn update(&self, id: &str, input: AccountInput) -> Result<StaffProfile, StaffError> {
        let username = validate_username(&input.username)?;
        let password = match input.password.trim() {
            "" => None,
            _ => Some(validate_password(&input.password)?),
        };
        let name = validate_name(&input.name)?;
        let role = validate_role(&input.role)?;

        let _guard = self.write_lock.lock().await;
        let mut accounts = self.store.load().await?;
        let Some(idx) = accounts.iter().position(|a| a.id == id) else {
            return Err(StaffError::NotFound("User not found".to_string()));
        };
        if accounts
            .iter()
            .any(|a| a.id != id && a.username.eq_ignore_ascii_case(&username))
        {
            return Err(StaffError::Conflict("Username already taken".to_string()));
        }

        let new_hash = match password {
            Some(p) => Some(hash(p).await?),
            None => None,
        };

        let account = &mut accounts[idx];
        account.username = username;
        account.name = name;
        account.role = role;
        if let Some(h) = new_hash {
            account.password_hash = Some(h);
            account.password = None;
        }
        let profile = account.profile();
        self.store.save(&accounts).await?;

        info!(id = %profile.id, username = %profile.username, "staff account updated");
        Ok(profile)
    }

    pub async fn delete(&self, actor_id: &str, id: &str) -> Result<StaffProfile, StaffError> {
        let _guard = self.write_lock.lock().await;
        let mut accounts = self.store.load().await?;
        let Some(idx) = accounts.iter().position(|a| a.id == id) else {
            return Err(StaffError::NotFound("User not found".to_string()));
        };
        if accounts[idx].id == actor_id {
            return Err(StaffError::Validation(
                "You cannot delete your own account".to_string(),
            ));
        }

        let removed = accounts.remove(idx);
        self.store.save(&accounts).await?;

        info!(id = %removed.id, username = %removed.username, actor_id, "staff account deleted");
        Ok(removed.profile())
    }

    pub async fn authenticate(
        &self,
        username: &str,
        password: &str,
    ) -> Result<StaffProfile, StaffError> {
        let username = username.trim().to_lowercase();
        let password = password.trim();
        let accounts = self.store.load().await?;
        // Older users files may hold mixed-case usernames.
        let Some(account) = accounts
            .iter()
            .find(|a| a.username.trim().to_lowercase() == username)
        else {
            return Err(StaffError::InvalidCredentials);
        };

        if let Some(stored) = account.password_hash.clone() {
            let candidate = password.to_string();
            let ok = tokio::task::spawn_blocking(move || {
                auth_service::verify_password(&candidate, &stored)
            })
            .await
            .map_err(|e| StaffError::Hashing(e.to_string()))?;
            return if ok {
                Ok(account.profile())
            } else {
                Err(StaffError::InvalidCredentials)
            };
        }

        match account.password.as_deref() {
            Some(legacy) if legacy == password => {
                if let Err(e) = self.upgrade_legacy(&account.id, password).await {
                    warn!(id = %account.id, error = %e, "could not hash legacy password");
                }
                Ok(account.profile())
            }
            _ => Err(StaffError::InvalidCredentials),
        }
    }

    async fn upgrade_legacy(&self, id: &str, password: &str) -> Result<(), StaffError> {
        let new_hash = hash(password.to_string()).await?;
        let _guard = self.write_lock.lock().await;
        let mut accounts = self.store.load().await?;
        let Some(account) = accounts.iter_mut().find(|a| a.id == id) else {
            return Ok(());
        };
        if account.password.is_none() {
            return Ok(());
        }
        account.password_hash = Some(new_hash);
        account.password = None;
        self.store.save(&accounts).await?;
        info!(id, "legacy plaintext password replaced with hash");
        Ok(())
    }

    /// Creates the configured admin when the store has no admin yet.
    pub async fn ensure_admin(
        &self,
        bootstrap: &AdminBootstrap,
    ) -> Result<Option<StaffProfile>, StaffError> {
        {
            let accounts = self.store.load().await?;
            if accounts.iter().any(|a| a.role == Role::Admin) {
                return Ok(None);
            }
        }
        let created = self
            .create(AccountInput {
                username: bootstrap.username.clone(),
                password: bootstrap.password.clone(),
                name: bootstrap.name.clone(),
                role: Role::Admin.as_str().to_string(),
            })
            .await?;
        Ok(Some(created))
    }
}

async fn hash(password: String) -> Result<String, StaffError> {
    tokio::task::spawn_blocking(move || auth_service::hash_password(&password))
        .await
        .map_err(|e| StaffError::Hashing(e.to_string()))?
        .map_err(|e| StaffError::Hashing(e.to_string()))
}

fn next_id(accounts: &[StaffAccount]) -> Result<String, StaffError> {
    let max = accounts
        .iter()
        .filter_map(|a| a.id.trim().parse::<u64>().ok())
        .max()
        .unwrap_or(0);
    max.checked_add(1)
        .map(|id| id.to_string())
        .ok_or(StaffError::IdsExhausted(max))
}

fn validate_username(raw: &str) -> Result<String, StaffError> {
    let username = raw.trim().to_lowercase();
    if username.chars().count() < MIN_USERNAME_LEN {
        return Err(StaffError::Validation(format!(
            "Username must be at least {MIN_USERNAME_LEN} characters"
        )));
    }
    Ok(username)
}

fn validate_password(raw: &str) -> Result<String, StaffError> {
    let password = raw.trim();
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(StaffError::Validation(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    Ok(password.to_string())
}

fn validate_name(raw: &str) -> Result<String, StaffError> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(StaffError::Validation("Name is required".to_string()));
    }
    Ok(name.to_string())
}

fn validate_role(raw: &str) -> Result<Role, StaffError> {
    Role::parse(raw).ok_or_else(|| StaffError::Validation("Role must be admin or user".to_string()))
}
