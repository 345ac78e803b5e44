// Feed backend client.
// Bundles the config, credential store and authenticated fetcher behind one handle.

use std::sync::Arc;

use crate::config::Config;
use crate::credentials::{self, AuthState, CredentialStore};
use crate::error::Result;

use super::fetcher::{AuthenticatedFetcher, RetryPolicy};
use super::transport::{ReqwestTransport, Transport};

/// Client for the subscription feed backend.
#[derive(Clone)]
pub struct FeedClient {
    config: Arc<Config>,
    fetcher: AuthenticatedFetcher,
}

impl FeedClient {
    /// Create a client over an explicit transport.
    pub fn new(
        config: Config,
        store: Arc<dyn CredentialStore>,
        transport: Arc<dyn Transport>,
    ) -> Self {
        let policy = RetryPolicy::from(&config.retry);
        Self {
            config: Arc::new(config),
            fetcher: AuthenticatedFetcher::new(store, transport, policy),
        }
    }

    /// Create a client that talks HTTP through reqwest.
    pub fn from_config(config: Config, store: Arc<dyn CredentialStore>) -> Result<Self> {
        let transport = Arc::new(ReqwestTransport::new()?);
        Ok(Self::new(config, store, transport))
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn fetcher(&self) -> &AuthenticatedFetcher {
        &self.fetcher
    }

    pub fn store(&self) -> &Arc<dyn CredentialStore> {
        self.fetcher.store()
    }

    pub fn transport(&self) -> &Arc<dyn Transport> {
        self.fetcher.transport()
    }

    /// Current authentication state, derived from the store.
    pub fn auth_state(&self) -> AuthState {
        credentials::derive_auth_state(self.store().as_ref())
    }
}
