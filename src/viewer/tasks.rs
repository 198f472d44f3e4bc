//! Deferred work between input events and the next render.
//!
//! Scroll events arrive faster than windows need recomputing. Each event
//! takes a ticket from a monotonically increasing counter and schedules a
//! recompute; a flush performs at most one recompute for the newest
//! ticket, then runs the after-render callbacks that were queued before
//! the flush started.

use std::fmt;
use std::ops::Range;

use serde::Serialize;

/// Windows handed to after-render callbacks
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WindowSnapshot {
    /// Ticket of the recompute these windows came from
    pub ticket: u64,
    /// Materialized flat row positions
    pub rows: Range<usize>,
    /// Materialized scrollable column positions
    pub columns: Range<usize>,
}

/// Callback run once after the next flush
pub type AfterRender = Box<dyn FnOnce(&WindowSnapshot)>;

/// What a flush did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FlushReport {
    /// Ticket the recompute ran for, if one was pending
    pub recomputed: Option<u64>,
    /// Number of scheduled recomputes folded into this one
    pub coalesced: usize,
    pub callbacks_run: usize,
}

#[derive(Default)]
pub struct TaskQueue {
    next_ticket: u64,
    pending: Option<u64>,
    coalesced: usize,
    after_render: Vec<AfterRender>,
}

impl fmt::Debug for TaskQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskQueue")
            .field("next_ticket", &self.next_ticket)
            .field("pending", &self.pending)
            .field("after_render", &self.after_render.len())
            .finish()
    }
}

impl TaskQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take a new ticket and schedule a recompute for it.
    ///
    /// Tickets only grow, so a stale event can never overwrite a newer one.
    pub fn schedule_recompute(&mut self) -> u64 {
        self.next_ticket = self.next_ticket.wrapping_add(1);
        if self.pending.replace(self.next_ticket).is_some() {
            self.coalesced += 1;
        }
        self.next_ticket
    }

    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Latest ticket handed out
    pub fn ticket(&self) -> u64 {
        self.next_ticket
    }

    /// Queue a callback for after the next flush.
    ///
    /// A callback registered while a flush is running waits for the
    /// following one.
    pub fn after_render(&mut self, callback: AfterRender) {
        self.after_render.push(callback);
    }

    pub fn pending_callbacks(&self) -> usize {
        self.after_render.len()
    }

    /// Start a flush: hand out the pending recompute ticket and the
    /// callbacks queued so far.
    pub(crate) fn begin_flush(&mut self) -> (Option<u64>, usize, Vec<AfterRender>) {
        let coalesced = std::mem::take(&mut self.coalesced);
        (
            self.pending.take(),
            coalesced,
            std::mem::take(&mut self.after_render),
        )
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::panic
)]
mod tests {
    use super::*;

    #[test]
    fn test_tickets_increase_and_coalesce() {
        let mut queue = TaskQueue::new();
        let a = queue.schedule_recompute();
        let b = queue.schedule_recompute();
        let c = queue.schedule_recompute();
        assert!(a < b && b < c);
        let (pending, coalesced, callbacks) = queue.begin_flush();
        assert_eq!(pending, Some(c));
        assert_eq!(coalesced, 2);
        assert!(callbacks.is_empty());
        assert!(!queue.has_pending());
    }

    #[test]
    fn test_callbacks_taken_once() {
        let mut queue = TaskQueue::new();
        queue.after_render(Box::new(|_| {}));
        assert_eq!(queue.pending_callbacks(), 1);
        let (_, _, callbacks) = queue.begin_flush();
        assert_eq!(callbacks.len(), 1);
        queue.after_render(Box::new(|_| {}));
        assert_eq!(queue.pending_callbacks(), 1);
    }
}
