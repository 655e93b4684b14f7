use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use wagerwave_common::protocol::{AUTHENTICATE_RPC, REGISTER_RPC};
use wagerwave_common::{AuthenticateParams, CanonicalUser, RegisterParams, RpcErrorBody};

use super::authority::{Authority, AuthorityError};

/// Client for the authority's PostgREST RPC endpoint.
pub struct SupabaseAuthority {
    http_client: Client,
    base_url: String,
    api_key: String,
}

/// RPCs return a set, but a scalar-returning function yields a bare object.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Rows {
    Many(Vec<CanonicalUser>),
    One(CanonicalUser),
}

impl Rows {
    fn into_first(self) -> Option<CanonicalUser> {
        match self {
            Rows::Many(rows) => rows.into_iter().next(),
            Rows::One(row) => Some(row),
        }
    }
}

impl SupabaseAuthority {
    pub fn new(base_url: &str, api_key: &str, timeout: Duration) -> Result<Self, AuthorityError> {
        let http_client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AuthorityError::Transport(e.to_string()))?;

        Ok(Self {
            http_client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        })
    }

    async fn call_rpc<P, R>(&self, name: &str, params: &P) -> Result<R, AuthorityError>
    where
        P: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let url = format!("{}/rest/v1/rpc/{}", self.base_url, name);

        tracing::debug!("Calling authority RPC: {}", url);

        let response = self
            .http_client
            .post(&url)
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
            .json(params)
            .send()
            .await
            .map_err(|e| AuthorityError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            tracing::warn!("Authority RPC {} failed with {}", name, status);
            return Err(match serde_json::from_str::<RpcErrorBody>(&body) {
                Ok(error) if !error.message.is_empty() => AuthorityError::Rejected {
                    code: error.code,
                    message: error.message,
                },
                _ => AuthorityError::Rejected {
                    code: None,
                    message: format!("{}: {}", status, body),
                },
            });
        }

        response
            .json()
            .await
            .map_err(|e| AuthorityError::InvalidResponse(e.to_string()))
    }
}

#[async_trait]
impl Authority for SupabaseAuthority {
    async fn authenticate_user(
        &self,
        username: &str,
        password: &str,
    ) -> Result<Option<CanonicalUser>, AuthorityError> {
        let params = AuthenticateParams {
            username_input: username.to_string(),
            password_input: password.to_string(),
        };
        let rows: Option<Rows> = self.call_rpc(AUTHENTICATE_RPC, &params).await?;
        Ok(rows.and_then(Rows::into_first))
    }

    async fn register_user(
        &self,
        username: &str,
        password: &str,
        phone: Option<&str>,
    ) -> Result<CanonicalUser, AuthorityError> {
        let params = RegisterParams {
            username_input: username.to_string(),
            password_input: password.to_string(),
            phone_input: phone.map(str::to_string),
        };
        let rows: Option<Rows> = self.call_rpc(REGISTER_RPC, &params).await?;
        rows.and_then(Rows::into_first).ok_or_else(|| {
            AuthorityError::InvalidResponse("registration returned no record".to_string())
        })
    }
}
