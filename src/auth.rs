//! Identity provider.
//!
//! The tracker only needs three things from an identity provider: sign in,
//! register, sign out. Each successful call yields a [`User`] whose `uid` is
//! stamped on every task the user creates.

use std::{
    cell::RefCell,
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::AuthError;

pub const MIN_PASSWORD_LEN: usize = 6;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub uid: String,
    pub email: String,
}

pub trait IdentityProvider {
    fn sign_in(&self, email: &str, password: &str) -> Result<User, AuthError>;
    fn register(&self, email: &str, password: &str) -> Result<User, AuthError>;
    fn sign_out(&self, user: &User) -> Result<(), AuthError>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Account {
    uid: String,
    email: String,
    salt: String,
    password_hash: String,
}

impl Account {
    fn matches(&self, password: &str) -> bool {
        let expected = hash_password(&self.salt, password);
        expected
            .as_bytes()
            .ct_eq(self.password_hash.as_bytes())
            .into()
    }

    fn user(&self) -> User {
        User {
            uid: self.uid.clone(),
            email: self.email.clone(),
        }
    }
}

/// Email/password accounts kept in memory or in a JSON file.
#[derive(Debug)]
pub struct LocalIdentity {
    path: Option<PathBuf>,
    /// Keyed by normalized (lowercased) email.
    accounts: RefCell<BTreeMap<String, Account>>,
}

impl LocalIdentity {
    pub fn in_memory() -> Self {
        Self {
            path: None,
            accounts: RefCell::new(BTreeMap::new()),
        }
    }

    pub fn open(path: impl Into<PathBuf>) -> Result<Self, AuthError> {
        let path = path.into();
        let accounts = load_accounts(&path)?;
        info!(path = %path.display(), count = accounts.len(), "Opened account store");
        Ok(Self {
            path: Some(path),
            accounts: RefCell::new(accounts),
        })
    }
}

impl IdentityProvider for LocalIdentity {
    fn sign_in(&self, email: &str, password: &str) -> Result<User, AuthError> {
        let key = normalize_email(email)?;
        let accounts = self.accounts.borrow();
        match accounts.get(&key) {
            Some(account) if account.matches(password) => {
                info!(uid = %account.uid, "Signed in");
                Ok(account.user())
            }
            _ => {
                warn!(email = %key, "Rejected sign-in");
                Err(AuthError::InvalidCredentials)
            }
        }
    }

    fn register(&self, email: &str, password: &str) -> Result<User, AuthError> {
        let key = normalize_email(email)?;
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(AuthError::WeakPassword);
        }
        if self.accounts.borrow().contains_key(&key) {
            return Err(AuthError::EmailInUse);
        }

        let salt = Uuid::new_v4().simple().to_string();
        let account = Account {
            uid: Uuid::new_v4().to_string(),
            email: email.trim().to_string(),
            password_hash: hash_password(&salt, password),
            salt,
        };

        let mut next = self.accounts.borrow().clone();
        next.insert(key, account.clone());
        if let Some(path) = &self.path {
            save_accounts(path, &next)?;
        }
        *self.accounts.borrow_mut() = next;

        info!(uid = %account.uid, "Registered account");
        Ok(account.user())
    }

    fn sign_out(&self, user: &User) -> Result<(), AuthError> {
        debug!(uid = %user.uid, "Signed out");
        Ok(())
    }
}

fn normalize_email(email: &str) -> Result<String, AuthError> {
    let email = email.trim();
    let (local, domain) = email.split_once('@').ok_or(AuthError::InvalidEmail)?;
    if local.is_empty()
        || domain.is_empty()
        || domain.contains('@')
        || email.chars().any(char::is_whitespace)
    {
        return Err(AuthError::InvalidEmail);
    }
    Ok(email.to_lowercase())
}

fn hash_password(salt: &str, password: &str) -> String {
    let mut hasher = blake3::Hasher::new();
    hasher.update(salt.as_bytes());
    hasher.update(password.as_bytes());
    hasher.finalize().to_hex().to_string()
}

fn load_accounts(path: &Path) -> Result<BTreeMap<String, Account>, AuthError> {
    if !path.exists() {
        return Ok(BTreeMap::new());
    }
    let data = fs::read_to_string(path).map_err(|source| AuthError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    if data.trim().is_empty() {
        return Ok(BTreeMap::new());
    }
    let accounts: Vec<Account> = serde_json::from_str(&data)?;
    Ok(accounts
        .into_iter()
        .map(|account| (account.email.to_lowercase(), account))
        .collect())
}

fn save_accounts(path: &Path, accounts: &BTreeMap<String, Account>) -> Result<(), AuthError> {
    let accounts: Vec<&Account> = accounts.values().collect();
    let data = serde_json::to_string_pretty(&accounts)?;
    fs::write(path, data).map_err(|source| AuthError::Io {
        path: path.to_path_buf(),
        source,
    })
}
