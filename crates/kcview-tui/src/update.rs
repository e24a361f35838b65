//! View reducer (update function).
//!
//! `update` consumes the current snapshot and an event and returns the next
//! snapshot plus the effects the runtime must execute. It performs no I/O.

use crossterm::event::{
    Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers, MouseButton, MouseEventKind,
};
use kcview_core::api::{ApiError, ApiResponse, RequestConfig};
use ratatui::layout::Rect;
use tracing::debug;

use crate::common::RequestId;
use crate::effects::UiEffect;
use crate::events::{InitOutcome, UiEvent};
use crate::render;
use crate::state::{ACCESS_DENIED_MESSAGE, Button, ViewState, Viewport};

pub fn update(mut state: ViewState, event: UiEvent) -> (ViewState, Vec<UiEffect>) {
    let effects = match event {
        UiEvent::Frame { width, height } => {
            state.viewport = Viewport { width, height };
            vec![]
        }
        UiEvent::Terminal(term_event) => handle_terminal_event(&mut state, &term_event),
        UiEvent::Mounted => mount(&mut state),
        UiEvent::Press(button) => press(&mut state, button),
        UiEvent::CallApi { endpoint } => call_api(&mut state, &endpoint),
        UiEvent::InitFinished(result) => {
            apply_init(&mut state, result);
            vec![]
        }
        UiEvent::ApiFinished { req, result } => apply_api_result(&mut state, req, result),
        UiEvent::LoginFinished(Ok(())) => {
            // The provider hands control back to a fresh view, which checks the session again.
            let mut fresh = state.remounted();
            let effects = mount(&mut fresh);
            state = fresh;
            effects
        }
        UiEvent::LoginFinished(Err(_)) => {
            state.login_pending = false;
            vec![]
        }
        UiEvent::LogoutFinished(_) => vec![],
    };
    (state, effects)
}

/// Emits the identity init exactly once per mounted view.
fn mount(state: &mut ViewState) -> Vec<UiEffect> {
    if state.initialized {
        return vec![];
    }
    state.initialized = true;
    vec![UiEffect::InitIdentity]
}

/// Only a successful, authenticated init changes state; failures were logged by the runtime.
fn apply_init(state: &mut ViewState, result: Result<InitOutcome, String>) {
    if let Ok(InitOutcome {
        authenticated: true,
        token,
    }) = result
    {
        state.authenticated = true;
        state.token = token;
    }
}

fn press(state: &mut ViewState, button: Button) -> Vec<UiEffect> {
    state.focus = button;
    match button.endpoint() {
        Some(endpoint) => call_api(state, endpoint),
        None => handle_logout(state),
    }
}

fn call_api(state: &mut ViewState, endpoint: &str) -> Vec<UiEffect> {
    let req = state.calls.begin();
    vec![UiEffect::CallApi {
        req,
        url: state.url_for(endpoint),
        config: RequestConfig::bearer(state.token.as_deref()),
    }]
}

fn apply_api_result(
    state: &mut ViewState,
    req: RequestId,
    result: Result<ApiResponse, ApiError>,
) -> Vec<UiEffect> {
    if !state.calls.finish_if_active(req) {
        debug!(?req, "discarding stale api response");
        return vec![];
    }

    match result {
        Ok(response) => {
            state.message = format!("Success: {}", response.data);
            vec![]
        }
        Err(err) if err.status() == Some(401) => {
            state.message = ACCESS_DENIED_MESSAGE.to_string();
            if state.login_pending {
                debug!("login already in progress");
                return vec![];
            }
            state.login_pending = true;
            vec![UiEffect::Login]
        }
        Err(err) => {
            state.message = format!("Error: {err}");
            vec![]
        }
    }
}

/// Drops the local token and asks the provider to end the session.
///
/// `authenticated` and `message` are left as they are.
fn handle_logout(state: &mut ViewState) -> Vec<UiEffect> {
    state.token = None;
    vec![UiEffect::Logout]
}

// ============================================================================
// Terminal input
// ============================================================================

fn handle_terminal_event(state: &mut ViewState, event: &Event) -> Vec<UiEffect> {
    match event {
        Event::Key(key) if key.kind != KeyEventKind::Release => handle_key(state, *key),
        Event::Mouse(mouse) if mouse.kind == MouseEventKind::Down(MouseButton::Left) => {
            let area = Rect::new(0, 0, state.viewport.width, state.viewport.height);
            match render::button_at(area, state.authenticated, mouse.column, mouse.row) {
                Some(button) => press(state, button),
                None => vec![],
            }
        }
        Event::Resize(width, height) => {
            state.viewport = Viewport {
                width: *width,
                height: *height,
            };
            vec![]
        }
        _ => vec![],
    }
}

fn handle_key(state: &mut ViewState, key: KeyEvent) -> Vec<UiEffect> {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    match key.code {
        KeyCode::Char('c') if ctrl => quit(state),
        KeyCode::Char('q') | KeyCode::Esc => quit(state),
        KeyCode::Char(c) => match Button::from_hotkey(c) {
            Some(button) => press(state, button),
            None => vec![],
        },
        KeyCode::Right | KeyCode::Tab => {
            state.focus = state.focus.next();
            vec![]
        }
        KeyCode::Left | KeyCode::BackTab => {
            state.focus = state.focus.prev();
            vec![]
        }
        KeyCode::Enter => {
            let focused = state.focus;
            press(state, focused)
        }
        _ => vec![],
    }
}

fn quit(state: &mut ViewState) -> Vec<UiEffect> {
    state.should_quit = true;
    vec![UiEffect::Quit]
}
