use std::future::Future;
use std::net::SocketAddr;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{watch, Mutex};
use tracing::{event, Level};
use warp::http::StatusCode;
use warp::path::FullPath;
use warp::reply::{Reply, Response};
use warp::Filter;

use crate::auth::{AuthorizationFlow, CallbackParams, FlowError, TokenExchange};
use crate::core::models::TokenResult;

use super::response::Pages;

#[derive(Debug, Clone)]
pub struct ListenerConfig {
    pub bind: SocketAddr,
    /// Path of the redirect URI; requests anywhere else get a 404.
    pub path: String,
    pub timeout: Duration,
    /// How long the server keeps running after answering the callback.
    pub shutdown_delay: Duration,
}

impl ListenerConfig {
    pub fn new(bind: SocketAddr, path: impl Into<String>) -> Self {
        Self {
            bind,
            path: path.into(),
            timeout: Duration::from_secs(5 * 60),
            shutdown_delay: Duration::from_secs(1),
        }
    }
}

pub type SharedFlow<E> = Arc<Mutex<AuthorizationFlow<E>>>;

/// Extra time granted to in-flight connections before they are dropped.
const DRAIN_GRACE: Duration = Duration::from_millis(500);

struct CallbackContext<E> {
    flow: SharedFlow<E>,
    pages: Pages,
    path: String,
    answered: watch::Sender<bool>,
}

impl<E> CallbackContext<E> {
    /// Lets the server wind down once the current response is on its way.
    fn schedule_shutdown(&self) {
        let _ = self.answered.send(true);
    }
}

/// Resolves `delay` after the callback was answered, or at once if the server is gone.
async fn after_answer(mut answered: watch::Receiver<bool>, delay: Duration) {
    loop {
        let done = *answered.borrow_and_update();
        if done {
            break;
        }
        if answered.changed().await.is_err() {
            return;
        }
    }
    tokio::time::sleep(delay).await;
}

/// One-shot local HTTP server receiving the authorization redirect.
#[derive(Debug)]
pub struct CallbackListener<E> {
    flow: SharedFlow<E>,
    pages: Pages,
    config: ListenerConfig,
}

impl<E: TokenExchange + 'static> CallbackListener<E> {
    pub fn new(flow: AuthorizationFlow<E>, pages: Pages, config: ListenerConfig) -> Self {
        Self {
            flow: Arc::new(Mutex::new(flow)),
            pages,
            config,
        }
    }

    pub fn flow(&self) -> SharedFlow<E> {
        Arc::clone(&self.flow)
    }

    /// Binds and serves until the callback was answered or the timeout elapsed.
    pub async fn start(self) -> Result<TokenResult, FlowError> {
        self.bind()?.wait().await
    }

    #[tracing::instrument(skip_all, fields(bind = %self.config.bind, path = %self.config.path))]
    pub fn bind(self) -> Result<BoundListener<E>, FlowError> {
        let CallbackListener { flow, pages, config } = self;

        let (answered_tx, answered_rx) = watch::channel(false);
        let context = Arc::new(CallbackContext {
            flow: Arc::clone(&flow),
            pages,
            path: config.path.clone(),
            answered: answered_tx,
        });

        let with_context = warp::any().map(move || Arc::clone(&context));
        let callback = warp::get()
            .and(warp::path::full())
            .and(warp::query::<CallbackParams>())
            .and(with_context)
            .and_then(handle_callback::<E>)
            .with(warp::log("simple-oauthclient::callback"));

        let shutdown_delay = config.shutdown_delay;
        let shutdown = {
            let answered = answered_rx.clone();
            async move {
                after_answer(answered, shutdown_delay).await;
                event!(Level::DEBUG, "Stopping callback listener");
            }
        };

        let bind = config.bind;
        let (addr, server) = warp::serve(callback)
            .try_bind_with_graceful_shutdown(bind, shutdown)
            .map_err(|e| FlowError::Listener(format!("{}: {}", bind, e)))?;

        event!(Level::INFO, %addr, "Callback listener bound");
        Ok(BoundListener {
            addr,
            server: Box::pin(server),
            flow,
            answered: answered_rx,
            timeout: config.timeout,
            shutdown_delay,
        })
    }
}

pub struct BoundListener<E> {
    addr: SocketAddr,
    server: Pin<Box<dyn Future<Output = ()> + Send>>,
    flow: SharedFlow<E>,
    answered: watch::Receiver<bool>,
    timeout: Duration,
    shutdown_delay: Duration,
}

impl<E: TokenExchange> BoundListener<E> {
    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn flow(&self) -> SharedFlow<E> {
        Arc::clone(&self.flow)
    }

    /// Blocks until the server stopped, then reports the flow's outcome.
    ///
    /// Connections still open once the callback was answered and the shutdown
    /// delay has passed are dropped along with the server.
    pub async fn wait(self) -> Result<TokenResult, FlowError> {
        let BoundListener {
            server,
            flow,
            answered,
            timeout,
            shutdown_delay,
            ..
        } = self;

        tokio::select! {
            _ = server => (),
            _ = after_answer(answered, shutdown_delay + DRAIN_GRACE) => {
                event!(Level::DEBUG, "Dropping connections left open after the callback");
            }
            _ = tokio::time::sleep(timeout) => {
                event!(Level::WARN, ?timeout, "No callback received, giving up");
                flow.lock().await.expire(timeout);
            }
        }

        let flow = flow.lock().await;
        flow.result()
    }
}

async fn handle_callback<E: TokenExchange>(
    path: FullPath,
    params: CallbackParams,
    context: Arc<CallbackContext<E>>,
) -> Result<Response, warp::Rejection> {
    if path.as_str() != context.path {
        return Ok(StatusCode::NOT_FOUND.into_response());
    }

    let mut flow = context.flow.lock().await;
    let response = match flow.handle_callback(params.into()).await {
        Err(FlowError::InvalidState(reason)) => {
            event!(Level::DEBUG, reason, "Rejecting extra callback request");
            let body = warp::reply::html(context.pages.already_handled());
            return Ok(warp::reply::with_status(body, StatusCode::CONFLICT).into_response());
        }
        _ => warp::reply::html(context.pages.render(flow.state())).into_response(),
    };
    drop(flow);

    context.schedule_shutdown();
    Ok(response)
}
