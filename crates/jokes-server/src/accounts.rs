//! Accounts service client
//!
//! Authorizes bearer tokens with one `GET {base}/admin` per privileged
//! request. There is no caching and no retry.

use async_trait::async_trait;
use jokes_core::{AccountsConfig, AuthDecision, AuthError, Authorizer};

/// HTTP authorizer backed by the accounts service
#[derive(Debug, Clone)]
pub struct AccountsClient {
    client: reqwest::Client,
    admin_url: String,
}

impl AccountsClient {
    /// Build a client for the configured accounts service
    ///
    /// Redirects are not followed: only a direct `200` from the admin
    /// endpoint authorizes.
    ///
    /// # Errors
    /// Returns the reqwest error if the HTTP client cannot be initialized.
    pub fn new(config: &AccountsConfig) -> Result<Self, reqwest::Error> {
        let mut builder = reqwest::Client::builder().redirect(reqwest::redirect::Policy::none());
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            client: builder.build()?,
            admin_url: config.admin_url(),
        })
    }

    /// Admin check endpoint
    #[inline]
    #[must_use]
    pub fn admin_url(&self) -> &str {
        &self.admin_url
    }
}

#[async_trait]
impl Authorizer for AccountsClient {
    async fn authorize(&self, token: &str) -> Result<AuthDecision, AuthError> {
        let response = self
            .client
            .get(&self.admin_url)
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| AuthError::UpstreamUnavailable { source: e.into() })?;

        let decision = AuthDecision::from_status(response.status().as_u16());
        tracing::debug!(?decision, "accounts service answered");
        Ok(decision)
    }
}
