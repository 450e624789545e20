use std::net::SocketAddr;
use std::time::Duration;

use tracing::{event, Level};
use url::Url;

use crate::auth::{AuthorizationFlow, FlowError, HttpTokenExchange, TokenExchange};
use crate::core::models::{AuthorizationRequest, TokenResult};
use crate::core::types::RedirectUri;
use crate::http::response::Pages;
use crate::http::server::{BoundListener, CallbackListener, ListenerConfig, SharedFlow};
use crate::util::browser;

#[derive(Debug, Clone)]
pub struct FlowSettings {
    pub verify_tls: bool,
    pub timeout: Duration,
    pub shutdown_delay: Duration,
    pub browser_delay: Duration,
    pub open_browser: bool,
    pub success_html: Option<String>,
    pub failure_html: Option<String>,
}

impl Default for FlowSettings {
    fn default() -> Self {
        Self {
            verify_tls: true,
            timeout: Duration::from_secs(5 * 60),
            shutdown_delay: Duration::from_secs(1),
            browser_delay: Duration::from_secs(1),
            open_browser: true,
            success_html: None,
            failure_html: None,
        }
    }
}

impl FlowSettings {
    pub fn listener_config(&self, redirect_uri: &RedirectUri) -> Result<ListenerConfig, FlowError> {
        let url = Url::parse(&redirect_uri.0)
            .map_err(|e| FlowError::InvalidRequest(format!("bad redirect URI {}: {}", redirect_uri.0, e)))?;
        let path = redirect_uri
            .path()
            .map_err(|e| FlowError::InvalidRequest(e.to_string()))?;

        let mut config = ListenerConfig::new(bind_address(&url)?, path);
        config.timeout = self.timeout;
        config.shutdown_delay = self.shutdown_delay;
        Ok(config)
    }

    pub fn pages(&self) -> Pages {
        Pages::new(self.success_html.clone(), self.failure_html.clone())
    }
}

/// Browsers resolve `localhost` to IPv4 first, so an IPv4 address wins when
/// the host has both.
fn bind_address(url: &Url) -> Result<SocketAddr, FlowError> {
    let addrs = url
        .socket_addrs(|| None)
        .map_err(|e| FlowError::InvalidRequest(format!("cannot listen on {}: {}", url, e)))?;

    addrs
        .iter()
        .find(|addr| addr.is_ipv4())
        .or_else(|| addrs.first())
        .copied()
        .ok_or_else(|| FlowError::InvalidRequest(format!("{} resolves to no address", url)))
}

/// An authorization URL whose callback listener is already bound.
pub struct PendingAuthorization<E> {
    url: Url,
    listener: BoundListener<E>,
}

impl<E: TokenExchange + 'static> PendingAuthorization<E> {
    /// Builds the authorization URL and binds the redirect listener for it.
    pub fn prepare(
        mut flow: AuthorizationFlow<E>,
        settings: &FlowSettings,
    ) -> Result<Self, FlowError> {
        let config = settings.listener_config(&flow.request().redirect_uri)?;
        let url = flow.build_authorization_url()?;
        let listener = CallbackListener::new(flow, settings.pages(), config).bind()?;
        Ok(Self { url, listener })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.listener.local_addr()
    }

    pub fn flow(&self) -> SharedFlow<E> {
        self.listener.flow()
    }

    pub async fn complete(self) -> Result<TokenResult, FlowError> {
        self.listener.wait().await
    }
}

/// Runs the whole grant: listener up, browser pointed at the provider, token back.
///
/// `on_url` sees the authorization URL before the browser is launched.
pub async fn browser_authorize(
    request: AuthorizationRequest,
    settings: &FlowSettings,
    on_url: impl FnOnce(&Url),
) -> Result<TokenResult, FlowError> {
    let exchange = HttpTokenExchange::new(settings.verify_tls)?;
    let pending = PendingAuthorization::prepare(AuthorizationFlow::new(request, exchange), settings)?;

    on_url(pending.url());
    if settings.open_browser {
        browser::open_later(pending.url().clone(), settings.browser_delay);
    } else {
        event!(Level::DEBUG, "Browser launch disabled");
    }

    pending.complete().await
}
