use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
#[derive(thiserror::Error)]
pub enum FlowError {
    #[error("authorization denied: {0}")]
    AuthorizationDenied(String),
    #[error("CSRF Warning! Mismatching state")]
    StateMismatch,
    #[error("token exchange failed: {0}")]
    TokenExchange(#[from] TokenExchangeError),
    #[error("no callback received within {0:?}")]
    Timeout(Duration),
    #[error("invalid authorization request: {0}")]
    InvalidRequest(String),
    #[error("invalid flow state: {0}")]
    InvalidState(&'static str),
    #[error("callback listener failed: {0}")]
    Listener(String),
}

impl FlowError {
    /// Plain-text message shown to the user in the browser.
    pub fn user_message(&self) -> String {
        match self {
            Self::AuthorizationDenied(reason) => reason.clone(),
            Self::StateMismatch => "CSRF Warning! Mismatching state".to_string(),
            Self::TokenExchange(TokenExchangeError::MissingToken) => {
                "Missing access token parameter.\nPlease check that you are using the correct client_secret"
                    .to_string()
            }
            other => other.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[derive(thiserror::Error)]
pub enum TokenExchangeError {
    #[error("missing access token in provider response")]
    MissingToken,
    #[error("provider returned {code}: {message}")]
    Provider { code: String, message: String },
    #[error("could not reach token endpoint: {0}")]
    Transport(String),
    #[error("unreadable provider response: {0}")]
    InvalidResponse(String),
}
