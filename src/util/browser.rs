use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{event, Level};
use url::Url;

/// Opens `url` in the default browser after `delay`, without waiting for it.
///
/// Failing to find a browser is only logged; the caller prints the URL so the
/// user can open it by hand.
pub fn open_later(url: Url, delay: Duration) -> JoinHandle<bool> {
    tokio::spawn(async move {
        tokio::time::sleep(delay).await;

        let opened = tokio::task::spawn_blocking(move || webbrowser::open(url.as_str())).await;
        match opened {
            Ok(Ok(())) => {
                event!(Level::DEBUG, "Opened browser");
                true
            }
            Ok(Err(e)) => {
                event!(Level::WARN, error = %e, "Could not open a browser");
                false
            }
            Err(e) => {
                event!(Level::WARN, error = %e, "Browser launcher task failed");
                false
            }
        }
    })
}
