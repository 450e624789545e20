use super::types::*;

/// Everything the client knows about one authorization attempt, fixed for the session.
#[derive(Debug, Clone)]
pub struct AuthorizationRequest {
    pub client_id: ClientId,
    pub client_secret: ClientSecret,
    pub authorize_endpoint: String,
    pub token_endpoint: String,
    pub scope: Scope,
    pub redirect_uri: RedirectUri,
}

/// Provider fields beyond `access_token` are kept as given and not acted upon.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenResult {
    pub access_token: AccessToken,
    pub token_type: Option<String>,
    pub expires_in: Option<u64>,
    pub refresh_token: Option<String>,
    pub scope: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[derive(serde::Serialize, serde::Deserialize)]
pub struct Credentials {
    pub client_id: ClientId,
    pub client_secret: ClientSecret,
    pub access_token: AccessToken,
}
