pub mod auth;
pub mod core;
pub mod flow;
pub mod http;
pub mod store;
pub mod util;

pub use crate::auth::{AuthorizationFlow, FlowError, FlowState};
pub use crate::flow::{browser_authorize, FlowSettings, PendingAuthorization};
