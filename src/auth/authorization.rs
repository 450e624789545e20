use crate::core::types::{AuthCode, ClientId, CsrfState, RedirectUri, ResponseType, Scope};

use url::Url;

use super::FlowError;

#[derive(Debug)]
#[derive(serde::Serialize)]
pub struct AuthorizationParams<'r> {
    pub response_type: ResponseType,
    pub client_id: &'r ClientId,
    pub redirect_uri: &'r RedirectUri,
    pub scope: &'r Scope,
    pub state: &'r CsrfState,
}

/// Appends `params` to the query already present on `endpoint`.
pub fn append_params(endpoint: &str, params: impl serde::Serialize) -> Result<Url, FlowError> {
    let mut url = Url::parse(endpoint)
        .map_err(|e| FlowError::InvalidRequest(format!("bad authorize endpoint {}: {}", endpoint, e)))?;
    let new_qs = serde_urlencoded::to_string(params)
        .map_err(|e| FlowError::InvalidRequest(e.to_string()))?;
    let pairs = form_urlencoded::parse(new_qs.as_bytes());
    url.query_pairs_mut().extend_pairs(pairs);
    Ok(url)
}

/// Query parameters of the redirect back from the authorization server.
#[derive(Debug, Clone, Default)]
#[derive(serde::Deserialize)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackOutcome {
    Success { code: AuthCode, state: CsrfState },
    Error(String),
    Missing,
}

impl From<CallbackParams> for CallbackOutcome {
    fn from(params: CallbackParams) -> Self {
        match params {
            CallbackParams {
                code: Some(code),
                state,
                ..
            } => Self::Success {
                code: AuthCode(code),
                state: CsrfState(state.unwrap_or_default()),
            },
            CallbackParams {
                error: Some(error),
                error_description,
                ..
            } => match error_description {
                Some(description) => Self::Error(format!("{}: {}", error, description)),
                None => Self::Error(error),
            },
            _ => Self::Missing,
        }
    }
}
