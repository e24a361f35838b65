//! Shared leaf types for the view.
//!
//! Must not import `UiEvent` or view state to avoid circular dependencies.

pub mod request_id;

pub use request_id::{LatestOnly, RequestId};
