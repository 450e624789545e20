use crate::core::models::Credentials;
use crate::core::types::AccessToken;

use tracing::{event, Level};

use super::error::{classify, ApiError};

#[derive(Debug, thiserror::Error)]
pub enum RequestError {
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

/// Calls the provider's API with a stored access token.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    token: AccessToken,
}

impl ApiClient {
    pub fn new(token: AccessToken, verify_tls: bool) -> Result<Self, RequestError> {
        let http = reqwest::Client::builder()
            .danger_accept_invalid_certs(!verify_tls)
            .build()?;
        Ok(Self { http, token })
    }

    pub fn from_credentials(credentials: &Credentials, verify_tls: bool) -> Result<Self, RequestError> {
        Self::new(credentials.access_token.clone(), verify_tls)
    }

    #[tracing::instrument(skip(self))]
    pub async fn get(&self, url: &str) -> Result<String, RequestError> {
        let response = self
            .http
            .get(url)
            .bearer_auth(self.token.as_ref())
            .send()
            .await?;

        let status = response.status();
        let body = response.bytes().await?;
        event!(Level::DEBUG, status = status.as_u16(), "API responded");

        if status.is_success() {
            Ok(String::from_utf8_lossy(&body).into_owned())
        } else {
            Err(classify(status.as_u16(), &body).into())
        }
    }
}
