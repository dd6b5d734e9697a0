//! Optional structured logging.
//!
//! A `tracing` Cargo feature gates real spans/events; a stub module keeps
//! call sites unconditional when the feature is off. A pool is
//! single-threaded and its collections are already strictly ordered, so the
//! span opened around each cycle is the correlation unit — no separate ID
//! needs to be minted.

#[cfg(feature = "tracing")]
pub(crate) mod internal {
    use tracing::{span, Level};

    /// Open a span for one mark/sweep collection cycle.
    pub(crate) fn trace_collection(kind: &'static str) -> span::EnteredSpan {
        span!(Level::DEBUG, "cellpool_collect", kind).entered()
    }

    /// Record the outcome of a mark phase.
    pub(crate) fn log_mark_done(count: usize, marked: usize) {
        tracing::debug!(count, marked, "mark phase complete");
    }

    /// Record a grow decision.
    pub(crate) fn log_grow(old_count: usize, new_count: usize) {
        tracing::debug!(old_count, new_count, "grew pool");
    }

    /// Record a sweep outcome.
    pub(crate) fn log_sweep_result(found: bool, id: usize) {
        if found {
            tracing::trace!(id, "swept unmarked cell");
        } else {
            tracing::trace!("sweep exhausted with no unmarked cell");
        }
    }
}

#[cfg(not(feature = "tracing"))]
pub(crate) mod internal {
    pub(crate) struct NoopSpan;

    pub(crate) fn trace_collection(_kind: &'static str) -> NoopSpan {
        NoopSpan
    }

    pub(crate) fn log_mark_done(_count: usize, _marked: usize) {}
    pub(crate) fn log_grow(_old_count: usize, _new_count: usize) {}
    pub(crate) fn log_sweep_result(_found: bool, _id: usize) {}
}
