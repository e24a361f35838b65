//! UI event types.
//!
//! All inputs (terminal, identity results, backend results) are converted to
//! `UiEvent` before the reducer sees them. Async results arrive through the
//! runtime inbox.

use crossterm::event::Event as CrosstermEvent;
use kcview_core::api::{ApiError, ApiResponse};

use crate::common::RequestId;
use crate::state::Button;

/// Result of the identity initialization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InitOutcome {
    pub authenticated: bool,
    /// Token read from the identity client; only meaningful when authenticated.
    pub token: Option<String>,
}

#[derive(Debug)]
pub enum UiEvent {
    /// Per-frame event carrying the terminal size.
    Frame { width: u16, height: u16 },

    /// Terminal input (key, mouse, resize).
    Terminal(CrosstermEvent),

    /// The view was mounted.
    Mounted,

    /// A button was activated by any input method.
    Press(Button),

    /// Call an arbitrary endpoint, as the buttons do for fixed ones.
    CallApi { endpoint: String },

    /// Identity initialization finished. `Err` carries the failure text.
    InitFinished(Result<InitOutcome, String>),

    /// A backend call finished.
    ApiFinished {
        req: RequestId,
        result: Result<ApiResponse, ApiError>,
    },

    /// Interactive login finished.
    LoginFinished(Result<(), String>),

    /// Provider logout finished.
    LogoutFinished(Result<(), String>),
}
