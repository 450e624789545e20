use std::time::Duration;

use crate::core::models::{AuthorizationRequest, TokenResult};
use crate::core::types::{CsrfState, ResponseType};
use crate::util::random::FromRandom;

pub mod access_token;
pub mod authorization;
pub mod error;

pub use access_token::{HttpTokenExchange, TokenExchange};
pub use authorization::{CallbackOutcome, CallbackParams};
pub use error::{FlowError, TokenExchangeError};

use authorization::AuthorizationParams;
use tracing::{event, Level};
use url::Url;

/// `Idle -> UrlBuilt -> Exchanging -> {Completed | Failed}`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlowState {
    Idle,
    UrlBuilt(CsrfState),
    Exchanging,
    Completed(TokenResult),
    Failed(FlowError),
}

impl FlowState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed(_) | Self::Failed(_))
    }
}

/// Client side of a single authorization code grant.
///
/// Holds the only live `state` value of the attempt and consumes it on the
/// first callback, so replays are refused without touching the network.
#[derive(Debug)]
pub struct AuthorizationFlow<E> {
    request: AuthorizationRequest,
    exchange: E,
    preset_state: Option<CsrfState>,
    state: FlowState,
}

impl<E: TokenExchange> AuthorizationFlow<E> {
    pub fn new(request: AuthorizationRequest, exchange: E) -> Self {
        Self {
            request,
            exchange,
            preset_state: None,
            state: FlowState::Idle,
        }
    }

    /// Use `state` for the next authorization URL instead of a random one.
    pub fn with_state(mut self, state: CsrfState) -> Self {
        self.preset_state = Some(state);
        self
    }

    pub fn request(&self) -> &AuthorizationRequest {
        &self.request
    }

    pub fn state(&self) -> &FlowState {
        &self.state
    }

    /// Builds the URL to send the user to. Calling it again before a callback
    /// arrives replaces the previous `state`.
    #[tracing::instrument(skip_all, fields(client_id = %self.request.client_id))]
    pub fn build_authorization_url(&mut self) -> Result<Url, FlowError> {
        match self.state {
            FlowState::Idle | FlowState::UrlBuilt(_) => (),
            _ => return Err(FlowError::InvalidState("authorization already in progress")),
        }

        let state = self
            .preset_state
            .take()
            .unwrap_or_else(CsrfState::from_random);

        let url = authorization::append_params(
            &self.request.authorize_endpoint,
            AuthorizationParams {
                response_type: ResponseType::Code,
                client_id: &self.request.client_id,
                redirect_uri: &self.request.redirect_uri,
                scope: &self.request.scope,
                state: &state,
            },
        )?;

        event!(Level::DEBUG, scope = %self.request.scope.as_joined(), "Built authorization URL");
        self.state = FlowState::UrlBuilt(state);
        Ok(url)
    }

    /// Handles the redirect back from the authorization server. Only valid once
    /// per URL; anything after that is refused with [`FlowError::InvalidState`]
    /// and leaves the recorded outcome untouched.
    #[tracing::instrument(skip_all)]
    pub async fn handle_callback(
        &mut self,
        outcome: CallbackOutcome,
    ) -> Result<TokenResult, FlowError> {
        let expected = match std::mem::replace(&mut self.state, FlowState::Exchanging) {
            FlowState::UrlBuilt(state) => state,
            other => {
                event!(Level::WARN, "Refusing callback outside of an authorization attempt");
                let err = if other.is_terminal() {
                    FlowError::InvalidState("callback already handled")
                } else {
                    FlowError::InvalidState("no authorization URL issued")
                };
                self.state = other;
                return Err(err);
            }
        };

        let result = match outcome {
            CallbackOutcome::Error(reason) => {
                event!(Level::INFO, %reason, "Authorization denied by provider");
                Err(FlowError::AuthorizationDenied(reason))
            }
            CallbackOutcome::Missing => {
                event!(Level::INFO, "Callback carried neither code nor error");
                Err(FlowError::AuthorizationDenied(
                    "Unknown error while authenticating".to_string(),
                ))
            }
            CallbackOutcome::Success { state, .. } if state != expected => {
                event!(Level::WARN, "Callback state does not match, possible CSRF");
                Err(FlowError::StateMismatch)
            }
            CallbackOutcome::Success { code, .. } => self
                .exchange
                .exchange(&self.request, &code)
                .await
                .map_err(FlowError::from),
        };

        self.state = match &result {
            Ok(token) => {
                event!(Level::INFO, "Authorization completed");
                FlowState::Completed(token.clone())
            }
            Err(err) => {
                event!(Level::INFO, error = %err, "Authorization failed");
                FlowState::Failed(err.clone())
            }
        };
        result
    }

    /// Gives up waiting for the callback. Has no effect once the flow has an outcome.
    pub fn expire(&mut self, after: Duration) {
        if let FlowState::UrlBuilt(_) | FlowState::Idle = self.state {
            event!(Level::INFO, ?after, "Authorization timed out");
            self.state = FlowState::Failed(FlowError::Timeout(after));
        }
    }

    pub fn result(&self) -> Result<TokenResult, FlowError> {
        match &self.state {
            FlowState::Completed(token) => Ok(token.clone()),
            FlowState::Failed(err) => Err(err.clone()),
            _ => Err(FlowError::InvalidState("authorization has not finished")),
        }
    }
}
