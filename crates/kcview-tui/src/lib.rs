//! Full-screen session inspector view.
//!
//! Elm-style split: `state` (snapshot), `events` (inputs), `effects`
//! (requested I/O), `update` (pure reducer), `render` (pure view) and
//! `runtime` (executes effects and drives the loop).

pub mod common;
pub mod effects;
pub mod events;
pub mod headless;
pub mod render;
pub mod runtime;
pub mod state;
pub mod terminal;
pub mod update;

use std::io::{IsTerminal, stderr};

use anyhow::Result;
pub use runtime::{Services, TuiRuntime};
pub use state::ViewState;

/// Runs the interactive view until the user quits.
pub fn run_interactive(state: ViewState, services: Services) -> Result<()> {
    if !stderr().is_terminal() {
        anyhow::bail!(
            "The interactive view requires a terminal.\n\
             Use `kcview call <ENDPOINT>` for non-interactive use."
        );
    }

    let mut runtime = TuiRuntime::new(state, services)?;
    runtime.run()
}
