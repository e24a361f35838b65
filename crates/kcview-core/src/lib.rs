//! Core kcview library (config, logging, identity, backend client).

pub mod api;
pub mod config;
pub mod identity;
pub mod logging;
