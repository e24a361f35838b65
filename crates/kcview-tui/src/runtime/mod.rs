//! View runtime: owns the terminal, runs the event loop, executes effects.
//!
//! All side effects happen here. The reducer stays pure and produces
//! effects; this module turns them into tasks.
//!
//! ## Inbox Pattern
//!
//! - Handlers send their result `UiEvent` to `inbox_tx`
//! - The loop drains `inbox_rx` every frame, before polling the terminal
//! - A `Frame` event with the terminal size always goes first

pub mod handlers;

use std::future::Future;
use std::io::Stdout;
use std::mem;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use crossterm::event;
use kcview_core::api::ApiClient;
use kcview_core::identity::IdentityClient;
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use tokio::sync::mpsc;

use crate::effects::UiEffect;
use crate::events::UiEvent;
use crate::state::ViewState;
use crate::{render, terminal, update};

/// Poll duration while waiting for input or async results.
pub const POLL_DURATION: Duration = Duration::from_millis(50);

type UiEventSender = mpsc::UnboundedSender<UiEvent>;
type UiEventReceiver = mpsc::UnboundedReceiver<UiEvent>;

/// Async work produced for one effect.
pub(crate) type EffectTask = Pin<Box<dyn Future<Output = UiEvent> + Send + 'static>>;

/// Collaborators the view talks to, injected by the caller.
#[derive(Clone)]
pub struct Services {
    pub identity: Arc<dyn IdentityClient>,
    pub api: Arc<dyn ApiClient>,
}

impl Services {
    pub fn new(identity: Arc<dyn IdentityClient>, api: Arc<dyn ApiClient>) -> Self {
        Self { identity, api }
    }

    /// Builds the async work for an effect, or `None` for effects with no I/O.
    pub(crate) fn task_for(&self, effect: UiEffect) -> Option<EffectTask> {
        match effect {
            UiEffect::Quit => None,
            UiEffect::InitIdentity => Some(Box::pin(handlers::init_identity(Arc::clone(
                &self.identity,
            )))),
            UiEffect::CallApi { req, url, config } => Some(Box::pin(handlers::call_api(
                Arc::clone(&self.api),
                req,
                url,
                config,
            ))),
            UiEffect::Login => Some(Box::pin(handlers::login(Arc::clone(&self.identity)))),
            UiEffect::Logout => Some(Box::pin(handlers::logout(Arc::clone(&self.identity)))),
        }
    }
}

/// Full-screen runtime.
///
/// Terminal state is restored on normal exit and on panic.
pub struct TuiRuntime {
    terminal: Terminal<CrosstermBackend<Stdout>>,
    pub state: ViewState,
    services: Services,
    inbox_tx: UiEventSender,
    inbox_rx: UiEventReceiver,
}

impl TuiRuntime {
    /// Enters the alternate screen. Must be called inside a multi-threaded tokio runtime.
    pub fn new(state: ViewState, services: Services) -> Result<Self> {
        // Panic hook goes in before the alternate screen.
        terminal::install_panic_hook();
        let terminal = terminal::setup_terminal().context("Failed to setup terminal")?;
        let (inbox_tx, inbox_rx) = mpsc::unbounded_channel();

        Ok(Self {
            terminal,
            state,
            services,
            inbox_tx,
            inbox_rx,
        })
    }

    /// Runs the event loop until the user quits, then restores the terminal.
    pub fn run(&mut self) -> Result<()> {
        terminal::enable_input_features()?;
        let result = self.event_loop();
        let _ = terminal::disable_input_features();
        let restored = terminal::restore_terminal();
        result.and(restored)
    }

    fn event_loop(&mut self) -> Result<()> {
        self.dispatch_event(UiEvent::Mounted);

        while !self.state.should_quit {
            let size = self.terminal.size()?;
            let mut events = vec![UiEvent::Frame {
                width: size.width,
                height: size.height,
            }];
            self.collect_events(&mut events)?;

            for event in events {
                self.dispatch_event(event);
            }

            self.terminal.draw(|frame| render::render(&self.state, frame))?;
        }

        Ok(())
    }

    fn collect_events(&mut self, events: &mut Vec<UiEvent>) -> Result<()> {
        while let Ok(ev) = self.inbox_rx.try_recv() {
            events.push(ev);
        }

        // Don't delay results that are already waiting.
        let poll_duration = if events.len() > 1 {
            Duration::ZERO
        } else {
            POLL_DURATION
        };
        if event::poll(poll_duration)? {
            events.push(UiEvent::Terminal(event::read()?));
            while event::poll(Duration::ZERO)? {
                events.push(UiEvent::Terminal(event::read()?));
            }
        }
        Ok(())
    }

    fn dispatch_event(&mut self, event: UiEvent) {
        let (next, effects) = update::update(mem::take(&mut self.state), event);
        self.state = next;
        for effect in effects {
            self.execute_effect(effect);
        }
    }

    fn execute_effect(&mut self, effect: UiEffect) {
        if matches!(effect, UiEffect::Quit) {
            self.state.should_quit = true;
            return;
        }
        if let Some(task) = self.services.task_for(effect) {
            self.spawn_effect(task);
        }
    }

    /// Spawns the async work and sends its result to the inbox.
    fn spawn_effect<Fut>(&self, task: Fut)
    where
        Fut: Future<Output = UiEvent> + Send + 'static,
    {
        let tx = self.inbox_tx.clone();
        tokio::spawn(async move {
            let _ = tx.send(task.await);
        });
    }
}
