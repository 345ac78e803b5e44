// Authorization code exchange.
// Trades the code from a redirect for the three credential fields via the backend.

use std::time::Duration;

use reqwest::Url;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{debug, warn};

use crate::credentials::Credential;
use crate::error::{Result, SubfeedError};
use crate::feed::Transport;

/// Token reply from the exchange endpoint.
#[derive(Debug, Deserialize)]
struct TokenReply {
    #[serde(default)]
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    /// Number or numeric string, depending on the backend.
    #[serde(default)]
    expires_in: Option<Value>,
}

fn expires_in_secs(value: Option<Value>) -> Option<u64> {
    match value? {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// POST the code to the exchange endpoint and return the credential it yields.
pub async fn exchange_code(
    transport: &dyn Transport,
    url: &Url,
    code: &str,
    timeout: Duration,
) -> Result<Credential> {
    debug!(%url, "exchanging authorization code");
    let response = transport
        .post_json(url, &json!({ "code": code }), timeout)
        .await?;

    if !response.status.is_success() {
        warn!(status = %response.status, "code exchange rejected");
        return Err(SubfeedError::Exchange(format!("HTTP {}", response.status)));
    }

    let reply: TokenReply = serde_json::from_str(&response.body)?;
    if reply.access_token.is_empty() {
        return Err(SubfeedError::Exchange(
            "reply carries no access token".to_string(),
        ));
    }

    Ok(Credential::new(
        reply.access_token,
        reply.refresh_token,
        expires_in_secs(reply.expires_in),
    ))
}
