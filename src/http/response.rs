use std::error::Error as _;

use crate::auth::{FlowError, FlowState};
use crate::core::models::TokenResult;

const SUCCESS_HTML: &str = r#"
            <h1>You are now authorized to access the API!</h1>
            <h3>Access Token: {access_token}</h3>
            <h4>You can close this window</h4>"#;

const FAILURE_HTML: &str = r#"
            <h1>ERROR: {message}</h1><br/><h3>You can close this window</h3>{trace}"#;

const HANDLED_HTML: &str = r#"
            <h1>This authorization has already been handled</h1>
            <h3>You can close this window</h3>"#;

/// HTML shown in the browser once the callback has been handled.
///
/// Templates substitute `{access_token}`, `{message}` and `{trace}`; every
/// substituted value is HTML-escaped.
#[derive(Debug, Clone)]
pub struct Pages {
    success: String,
    failure: String,
}

impl Default for Pages {
    fn default() -> Self {
        Self {
            success: SUCCESS_HTML.to_string(),
            failure: FAILURE_HTML.to_string(),
        }
    }
}

impl Pages {
    pub fn new(success: Option<String>, failure: Option<String>) -> Self {
        let default = Self::default();
        Self {
            success: success.unwrap_or(default.success),
            failure: failure.unwrap_or(default.failure),
        }
    }

    pub fn render(&self, state: &FlowState) -> String {
        match state {
            FlowState::Completed(token) => self.success(token),
            FlowState::Failed(err) => self.failure(err),
            _ => self.failure(&FlowError::InvalidState("authorization has not finished")),
        }
    }

    pub fn success(&self, token: &TokenResult) -> String {
        self.success
            .replace("{access_token}", &escape(token.access_token.as_ref()))
    }

    pub fn failure(&self, err: &FlowError) -> String {
        let message = escape(&err.user_message()).replace('\n', "</br>");
        self.failure
            .replace("{message}", &message)
            .replace("{trace}", &trace(err))
    }

    pub fn already_handled(&self) -> String {
        HANDLED_HTML.to_string()
    }
}

/// The error's source chain as a `<pre>` block, empty when there is none.
fn trace(err: &FlowError) -> String {
    let mut lines = Vec::new();
    let mut source = err.source();
    while let Some(cause) = source {
        lines.push(escape(&cause.to_string()));
        source = cause.source();
    }

    if lines.is_empty() {
        String::new()
    } else {
        format!("<pre>{}</pre>", lines.join("\n"))
    }
}

fn escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            c => out.push(c),
        }
    }
    out
}
