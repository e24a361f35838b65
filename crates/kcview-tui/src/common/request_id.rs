//! Request identifiers for latest-only async results.

/// Opaque id attached to every issued backend call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RequestId(u64);

/// Tracks the most recently issued request and rejects the rest.
///
/// Ordering is by issue time: once a newer request begins, completions of
/// older ones are stale even if they resolve later.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct LatestOnly {
    next: u64,
    active: Option<RequestId>,
}

impl LatestOnly {
    /// Starts a new request and marks it as the only active one.
    pub fn begin(&mut self) -> RequestId {
        let id = RequestId(self.next);
        self.next = self.next.wrapping_add(1);
        self.active = Some(id);
        id
    }

    /// Forgets the active request; its completion will be treated as stale.
    pub fn cancel(&mut self) {
        self.active = None;
    }

    pub fn is_active(&self, id: RequestId) -> bool {
        self.active == Some(id)
    }

    /// Finishes the request if it is still the active one.
    pub fn finish_if_active(&mut self, id: RequestId) -> bool {
        if self.is_active(id) {
            self.active = None;
            true
        } else {
            false
        }
    }
}
