// Credential model and cache operations.
// Reads, writes and purges the three credential keys, and derives auth state.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::Result;

use super::store::CredentialStore;

pub const ACCESS_TOKEN_KEY: &str = "access_token";
pub const REFRESH_TOKEN_KEY: &str = "refresh_token";
pub const EXPIRES_IN_KEY: &str = "expires_in";

/// All keys owned by the credential cache.
pub const CREDENTIAL_KEYS: [&str; 3] = [ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY, EXPIRES_IN_KEY];

/// Token artifacts delivered by the OAuth flow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_in: Option<u64>,
}

impl Credential {
    /// Build a credential, normalizing an empty refresh token to absent.
    pub fn new(
        access_token: impl Into<String>,
        refresh_token: Option<String>,
        expires_in: Option<u64>,
    ) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: refresh_token.filter(|t| !t.is_empty()),
            expires_in,
        }
    }

    /// Request headers carrying this credential.
    /// Absent auxiliary values are omitted rather than sent empty.
    pub fn request_headers(&self) -> Vec<(&'static str, String)> {
        let mut headers = vec![("Authorization", format!("Bearer {}", self.access_token))];

        if let Some(refresh) = self.refresh_token.as_deref().filter(|t| !t.is_empty()) {
            headers.push((REFRESH_TOKEN_KEY, refresh.to_string()));
        }
        if let Some(expires_in) = self.expires_in {
            headers.push((EXPIRES_IN_KEY, expires_in.to_string()));
        }

        headers
    }
}

/// Authentication state, always recomputed from the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthState {
    Authenticated(Credential),
    Anonymous,
}

impl AuthState {
    pub fn is_authenticated(&self) -> bool {
        matches!(self, AuthState::Authenticated(_))
    }
}

/// Read the cached credential, if an access token is present.
pub fn load(store: &dyn CredentialStore) -> Result<Option<Credential>> {
    let Some(access_token) = store.get(ACCESS_TOKEN_KEY)?.filter(|t| !t.is_empty()) else {
        return Ok(None);
    };

    let refresh_token = store.get(REFRESH_TOKEN_KEY)?;
    let expires_in = match store.get(EXPIRES_IN_KEY)? {
        Some(raw) => match raw.trim().parse::<u64>() {
            Ok(secs) => Some(secs),
            Err(_) => {
                debug!(value = %raw, "ignoring non-numeric expires_in");
                None
            }
        },
        None => None,
    };

    Ok(Some(Credential::new(access_token, refresh_token, expires_in)))
}

/// Persist a credential. Optional fields that are absent are removed so a
/// previous session's values never leak into the new one.
pub fn save(store: &dyn CredentialStore, credential: &Credential) -> Result<()> {
    store.set(ACCESS_TOKEN_KEY, &credential.access_token)?;

    match credential.refresh_token.as_deref().filter(|t| !t.is_empty()) {
        Some(refresh) => store.set(REFRESH_TOKEN_KEY, refresh)?,
        None => store.remove(REFRESH_TOKEN_KEY)?,
    }
    match credential.expires_in {
        Some(secs) => store.set(EXPIRES_IN_KEY, &secs.to_string())?,
        None => store.remove(EXPIRES_IN_KEY)?,
    }

    debug!(
        refresh_token = if credential.refresh_token.is_some() { "present" } else { "missing" },
        expires_in = ?credential.expires_in,
        "credential saved"
    );
    Ok(())
}

/// Remove all credential keys. Safe to call repeatedly.
pub fn purge(store: &dyn CredentialStore) -> Result<()> {
    store.remove_all(&CREDENTIAL_KEYS)?;
    debug!("credential cache purged");
    Ok(())
}

/// Derive the authentication state from the cache.
/// A store that cannot be read counts as anonymous.
pub fn derive_auth_state(store: &dyn CredentialStore) -> AuthState {
    match load(store) {
        Ok(Some(credential)) => AuthState::Authenticated(credential),
        Ok(None) => AuthState::Anonymous,
        Err(e) => {
            warn!(error = %e, "failed to read credential cache");
            AuthState::Anonymous
        }
    }
}
