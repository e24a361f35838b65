//! View state.
//!
//! ```text
//! ViewState
//! ├── authenticated: bool      (sticky once an init succeeds)
//! ├── token: Option<String>    (cleared by logout)
//! ├── message: String          (latest applied call outcome)
//! ├── initialized: bool        (init runs at most once per mount)
//! ├── calls: LatestOnly        (stale response gate)
//! └── focus / viewport / should_quit (terminal surface only)
//! ```
//!
//! The reducer consumes one `ViewState` and returns the next; nothing else
//! mutates it.

use crate::common::LatestOnly;

/// Default origin prefixed to every endpoint.
pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8080";

/// Notice shown when the backend answers 401.
pub const ACCESS_DENIED_MESSAGE: &str = "Access Denied. Redirecting to login...";

/// The four actions the view offers, in display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Button {
    #[default]
    Public,
    Private,
    Admin,
    Logout,
}

impl Button {
    pub const ALL: [Button; 4] = [
        Button::Public,
        Button::Private,
        Button::Admin,
        Button::Logout,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Button::Public => "Call Public API",
            Button::Private => "Call Private API",
            Button::Admin => "Call Admin API",
            Button::Logout => "Logout",
        }
    }

    /// Backend path the button calls; `None` for logout.
    pub fn endpoint(self) -> Option<&'static str> {
        match self {
            Button::Public => Some("/public"),
            Button::Private => Some("/private"),
            Button::Admin => Some("/admin"),
            Button::Logout => None,
        }
    }

    pub fn hotkey(self) -> char {
        match self {
            Button::Public => '1',
            Button::Private => '2',
            Button::Admin => '3',
            Button::Logout => '4',
        }
    }

    pub fn from_hotkey(c: char) -> Option<Button> {
        Button::ALL.into_iter().find(|b| b.hotkey() == c)
    }

    fn index(self) -> usize {
        match self {
            Button::Public => 0,
            Button::Private => 1,
            Button::Admin => 2,
            Button::Logout => 3,
        }
    }

    #[must_use]
    pub fn next(self) -> Button {
        Button::ALL[(self.index() + 1) % Button::ALL.len()]
    }

    #[must_use]
    pub fn prev(self) -> Button {
        Button::ALL[(self.index() + Button::ALL.len() - 1) % Button::ALL.len()]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Viewport {
    pub width: u16,
    pub height: u16,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewState {
    pub authenticated: bool,
    pub token: Option<String>,
    pub message: String,
    pub initialized: bool,

    /// Origin the view prefixes to endpoints, concatenated without validation.
    pub api_base_url: String,
    pub calls: LatestOnly,
    /// An interactive login is running; further 401s don't start another.
    pub login_pending: bool,

    pub focus: Button,
    pub viewport: Viewport,
    pub should_quit: bool,
}

impl Default for ViewState {
    fn default() -> Self {
        Self::new(DEFAULT_API_BASE_URL)
    }
}

impl ViewState {
    pub fn new(api_base_url: impl Into<String>) -> Self {
        Self {
            authenticated: false,
            token: None,
            message: String::new(),
            initialized: false,
            api_base_url: api_base_url.into(),
            calls: LatestOnly::default(),
            login_pending: false,
            focus: Button::default(),
            viewport: Viewport::default(),
            should_quit: false,
        }
    }

    /// State of a freshly mounted view, as after returning from a login redirect.
    ///
    /// Session fields start over. The request gate is carried so in-flight
    /// calls from before the remount are recognised as stale.
    #[must_use]
    pub fn remounted(&self) -> Self {
        let mut calls = self.calls.clone();
        calls.cancel();
        Self {
            calls,
            focus: self.focus,
            viewport: self.viewport,
            should_quit: self.should_quit,
            ..Self::new(self.api_base_url.clone())
        }
    }

    pub fn url_for(&self, endpoint: &str) -> String {
        format!("{}{endpoint}", self.api_base_url)
    }
}
