// Login and logout flow.
// Turns an OAuth redirect into a cached credential and clears it again on logout.

pub mod callback;
pub mod exchange;

use tracing::info;

use crate::credentials::{self, Credential, CredentialStore};
use crate::error::Result;
use crate::feed::{FeedClient, endpoints};

pub use callback::{CallbackParams, parse_callback};
pub use exchange::exchange_code;

/// Complete a login from the URL the OAuth flow redirected to.
/// Tokens are saved directly; a code is exchanged first.
pub async fn complete_login(client: &FeedClient, redirect: &str) -> Result<Credential> {
    let credential = match parse_callback(redirect)? {
        CallbackParams::Tokens(credential) => credential,
        CallbackParams::Code(code) => {
            let url = endpoints::exchange_url(client.config())?;
            exchange_code(
                client.transport().as_ref(),
                &url,
                &code,
                client.config().retry.timeout(),
            )
            .await?
        }
    };

    credentials::save(client.store().as_ref(), &credential)?;
    info!(
        refresh_token = if credential.refresh_token.is_some() { "present" } else { "missing" },
        "login complete"
    );
    Ok(credential)
}

/// Forget the cached credential.
pub fn logout(store: &dyn CredentialStore) -> Result<()> {
    info!("logging out");
    credentials::purge(store)
}
