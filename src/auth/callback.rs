// OAuth redirect parsing.
// Extracts tokens, an authorization code, or the provider's error from a redirect URL.

use reqwest::Url;

use crate::credentials::Credential;
use crate::error::{Result, SubfeedError};

/// What a redirect back from the login flow carries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackParams {
    /// The backend already exchanged the code and forwarded the tokens.
    Tokens(Credential),
    /// An authorization code still to be exchanged.
    Code(String),
}

/// Parse a redirect URL, or just its query string.
///
/// An `error` parameter wins over anything else in the redirect.
pub fn parse_callback(input: &str) -> Result<CallbackParams> {
    let url = parse_redirect(input.trim())?;

    let mut error = None;
    let mut error_description = None;
    let mut access_token = None;
    let mut refresh_token = None;
    let mut expires_in = None;
    let mut code = None;

    for (key, value) in url.query_pairs() {
        let value = value.into_owned();
        match key.as_ref() {
            "error" => error = Some(value),
            "error_description" => error_description = Some(value),
            "access_token" => access_token = Some(value),
            "refresh_token" => refresh_token = Some(value),
            "expires_in" => expires_in = Some(value),
            "code" => code = Some(value),
            _ => {}
        }
    }

    if let Some(error) = error {
        let reason = match error_description.filter(|d| !d.is_empty()) {
            Some(description) => format!("{} ({})", error, description),
            None => error,
        };
        return Err(SubfeedError::CallbackDenied(reason));
    }

    if let Some(access_token) = access_token.filter(|t| !t.is_empty()) {
        let expires_in = expires_in.and_then(|raw| raw.trim().parse::<u64>().ok());
        return Ok(CallbackParams::Tokens(Credential::new(
            access_token,
            refresh_token,
            expires_in,
        )));
    }

    match code.filter(|c| !c.is_empty()) {
        Some(code) => Ok(CallbackParams::Code(code)),
        None => Err(SubfeedError::NoCredentials),
    }
}

fn parse_redirect(input: &str) -> Result<Url> {
    if let Ok(url) = Url::parse(input) {
        return Ok(url);
    }

    // Bare query string, with or without the leading '?'
    let query = input.trim_start_matches('?');
    Url::parse(&format!("http://localhost/?{}", query))
        .map_err(|e| SubfeedError::InvalidUrl(format!("{}: {}", input, e)))
}
