use crate::core::models::{AuthorizationRequest, TokenResult};
use crate::core::types::{AccessToken, AuthCode, ClientId, ClientSecret, GrantType, RedirectUri};
use crate::http::error::classify;

use async_trait::async_trait;
use tracing::{event, Level};

use super::TokenExchangeError;

/// Form body of the `authorization_code` grant, client credentials in the body.
#[derive(Debug)]
#[derive(serde::Serialize)]
pub struct TokenRequest<'r> {
    pub grant_type: GrantType,
    pub code: &'r AuthCode,
    pub redirect_uri: &'r RedirectUri,
    pub client_id: &'r ClientId,
    pub client_secret: &'r ClientSecret,
}

impl<'r> TokenRequest<'r> {
    pub fn new(request: &'r AuthorizationRequest, code: &'r AuthCode) -> Self {
        Self {
            grant_type: GrantType::AuthorizationCode,
            code,
            redirect_uri: &request.redirect_uri,
            client_id: &request.client_id,
            client_secret: &request.client_secret,
        }
    }
}

/// Trades an authorization code for a token at the provider's token endpoint.
#[async_trait]
pub trait TokenExchange: Send + Sync {
    async fn exchange(
        &self,
        request: &AuthorizationRequest,
        code: &AuthCode,
    ) -> Result<TokenResult, TokenExchangeError>;
}

#[derive(Debug, Clone)]
pub struct HttpTokenExchange {
    client: reqwest::Client,
}

impl HttpTokenExchange {
    pub fn new(verify_tls: bool) -> Result<Self, TokenExchangeError> {
        if !verify_tls {
            event!(Level::WARN, "TLS certificate verification disabled for token endpoint");
        }
        let client = reqwest::Client::builder()
            .danger_accept_invalid_certs(!verify_tls)
            .build()
            .map_err(|e| TokenExchangeError::Transport(e.to_string()))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl TokenExchange for HttpTokenExchange {
    #[tracing::instrument(skip_all, fields(token_endpoint = %request.token_endpoint))]
    async fn exchange(
        &self,
        request: &AuthorizationRequest,
        code: &AuthCode,
    ) -> Result<TokenResult, TokenExchangeError> {
        event!(Level::DEBUG, "Exchanging authorization code");
        let response = self
            .client
            .post(&request.token_endpoint)
            .header(reqwest::header::ACCEPT, "application/json")
            .form(&TokenRequest::new(request, code))
            .send()
            .await
            .map_err(|e| TokenExchangeError::Transport(e.to_string()))?;

        let status = response.status().as_u16();
        let body = response
            .bytes()
            .await
            .map_err(|e| TokenExchangeError::Transport(e.to_string()))?;

        event!(Level::DEBUG, status, "Token endpoint responded");
        parse_token_response(status, &body)
    }
}

/// Reads a token endpoint response. An `error` field wins over everything else,
/// including on a 2xx status.
pub fn parse_token_response(status: u16, body: &[u8]) -> Result<TokenResult, TokenExchangeError> {
    let success = (200..300).contains(&status);

    let json = match serde_json::from_slice::<serde_json::Value>(body) {
        Ok(serde_json::Value::Object(json)) => json,
        Ok(_) | Err(_) if !success => {
            let err = classify(status, body);
            return Err(TokenExchangeError::Provider {
                code: err.code.to_string(),
                message: err.message,
            });
        }
        Ok(other) => {
            return Err(TokenExchangeError::InvalidResponse(format!(
                "expected a JSON object, got {}",
                other
            )))
        }
        Err(e) => return Err(TokenExchangeError::InvalidResponse(e.to_string())),
    };

    let text = |key: &str| json.get(key).and_then(|v| v.as_str()).map(ToString::to_string);

    if let Some(code) = text("error") {
        let message = text("error_description").unwrap_or_else(|| code.clone());
        return Err(TokenExchangeError::Provider { code, message });
    }

    if !success {
        let err = classify(status, body);
        return Err(TokenExchangeError::Provider {
            code: err.code.to_string(),
            message: err.message,
        });
    }

    let access_token = text("access_token").ok_or(TokenExchangeError::MissingToken)?;

    Ok(TokenResult {
        access_token: AccessToken(access_token),
        token_type: text("token_type"),
        expires_in: json.get("expires_in").and_then(|v| {
            v.as_u64()
                .or_else(|| v.as_str().and_then(|s| s.parse().ok()))
        }),
        refresh_token: text("refresh_token"),
        scope: text("scope"),
    })
}
