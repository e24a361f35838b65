//! UI effect types.
//!
//! Effects are commands returned by the reducer that the runtime executes.
//! They represent I/O only; the reducer never performs I/O itself.

use kcview_core::api::RequestConfig;

use crate::common::RequestId;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiEffect {
    /// Quit the application.
    Quit,

    /// Initialize the identity client with a silent session check.
    InitIdentity,

    /// Issue a GET to `url` with `config`; the result is tagged with `req`.
    CallApi {
        req: RequestId,
        url: String,
        config: RequestConfig,
    },

    /// Start an interactive login.
    Login,

    /// End the provider session.
    Logout,
}
