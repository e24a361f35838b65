//! Headless driver: the same reducer and handlers without a terminal.
//!
//! Used by `kcview call`. Effects run one at a time and in order, so a run is
//! deterministic: mount, wait for init, issue the call, wait for its result.
//! Login redirects are reported instead of followed.

use std::mem;

use tracing::info;

use crate::effects::UiEffect;
use crate::events::UiEvent;
use crate::runtime::Services;
use crate::state::ViewState;
use crate::update::update;

/// Final view state of a headless run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeadlessRun {
    pub state: ViewState,
    /// The view asked for an interactive login (backend answered 401).
    pub login_requested: bool,
}

/// Mounts a view, lets it initialize, then calls `endpoint` once.
pub async fn run_call(services: &Services, state: ViewState, endpoint: &str) -> HeadlessRun {
    let mut driver = Driver {
        services,
        state,
        login_requested: false,
    };
    driver.dispatch(UiEvent::Mounted).await;
    driver
        .dispatch(UiEvent::CallApi {
            endpoint: endpoint.to_string(),
        })
        .await;

    HeadlessRun {
        state: driver.state,
        login_requested: driver.login_requested,
    }
}

struct Driver<'a> {
    services: &'a Services,
    state: ViewState,
    login_requested: bool,
}

impl Driver<'_> {
    async fn dispatch(&mut self, event: UiEvent) {
        let mut pending = vec![event];
        while let Some(event) = pending.pop() {
            let (next, effects) = update(mem::take(&mut self.state), event);
            self.state = next;

            for effect in effects {
                if matches!(effect, UiEffect::Login) {
                    info!("backend requires login; run `kcview login` or pass --token");
                    self.login_requested = true;
                    continue;
                }
                if let Some(task) = self.services.task_for(effect) {
                    pending.push(task.await);
                }
            }
        }
    }
}
