//! Login form auto-fill from link parameters.
//!
//! A shared link carries `username` plus either an encoded `token` or, from
//! older links, the `password` in the clear. The token wins when both are
//! present. After a successful fill the UI swaps the address for the
//! scrubbed one so the credential does not linger in history.

use std::time::Duration;

use reqwest::Url;
use serde::{Deserialize, Serialize};

use crate::token;

pub const FILLED_MESSAGE: &str = "Welcome! Your credentials have been auto-filled. Just click Sign In!";
pub const INVALID_TOKEN_MESSAGE: &str = "Invalid secure link. Please enter credentials manually.";

/// Raw link parameters.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PrefillParams {
    pub username: Option<String>,
    pub token: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PrefillSource {
    SecureToken,
    LegacyPassword,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum PrefillOutcome {
    #[serde(rename_all = "camelCase")]
    Filled {
        username: String,
        password: String,
        source: PrefillSource,
        message: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        scrubbed_url: Option<String>,
        scrub_after_ms: u64,
    },
    /// The form stays usable with just the username filled in.
    #[serde(rename_all = "camelCase")]
    InvalidToken {
        username: String,
        message: String,
        error: String,
    },
}

#[derive(Debug, Clone)]
pub struct CredentialPrefill {
    scrub_delay: Duration,
}

impl CredentialPrefill {
    pub fn new(scrub_delay: Duration) -> Self {
        Self { scrub_delay }
    }

    /// `None` when the parameters carry nothing to fill.
    pub fn resolve(&self, params: &PrefillParams) -> Option<PrefillOutcome> {
        let username = present(&params.username)?;

        if let Some(token) = present(&params.token) {
            let password = match token::decode(token) {
                Ok(password) if !password.is_empty() => password,
                Ok(_) => return Some(invalid(username, "token decodes to an empty password".to_string())),
                Err(e) => {
                    tracing::warn!("Ignoring undecodable login token for {}: {}", username, e);
                    return Some(invalid(username, e.to_string()));
                }
            };
            return Some(self.filled(username, password, PrefillSource::SecureToken));
        }

        let password = present(&params.password)?;
        Some(self.filled(username, password.to_string(), PrefillSource::LegacyPassword))
    }

    /// Read the parameters from a full address and attach the scrubbed
    /// address to a successful fill.
    pub fn from_url(&self, url: &Url) -> Option<PrefillOutcome> {
        let mut params = PrefillParams::default();
        for (key, value) in url.query_pairs() {
            match key.as_ref() {
                "username" => params.username = Some(value.into_owned()),
                "token" => params.token = Some(value.into_owned()),
                "password" => params.password = Some(value.into_owned()),
                _ => {}
            }
        }

        let mut outcome = self.resolve(&params)?;
        if let PrefillOutcome::Filled { scrubbed_url, .. } = &mut outcome {
            *scrubbed_url = Some(Self::scrubbed(url));
        }
        Some(outcome)
    }

    /// A login link that fills `username` and `password` when opened.
    pub fn build_link(base: &Url, username: &str, password: &str) -> Url {
        let mut link = base.clone();
        link.set_query(None);
        link.set_fragment(None);
        link.query_pairs_mut()
            .append_pair("username", username)
            .append_pair("token", &token::encode(password));
        link
    }

    /// The address without query or fragment.
    pub fn scrubbed(url: &Url) -> String {
        let mut clean = url.clone();
        clean.set_query(None);
        clean.set_fragment(None);
        clean.to_string()
    }

    fn filled(&self, username: &str, password: String, source: PrefillSource) -> PrefillOutcome {
        PrefillOutcome::Filled {
            username: username.to_string(),
            password,
            source,
            message: FILLED_MESSAGE.to_string(),
            scrubbed_url: None,
            scrub_after_ms: self.scrub_delay.as_millis() as u64,
        }
    }
}

fn invalid(username: &str, error: String) -> PrefillOutcome {
    PrefillOutcome::InvalidToken {
        username: username.to_string(),
        message: INVALID_TOKEN_MESSAGE.to_string(),
        error,
    }
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}
