//! Process-wide identity registry.
//!
//! Every node gets its [`NodeId`] from here. The counter is a single atomic
//! shared by the whole process, so identifiers are unique across every
//! [`crate::graph::Graph`] in it.
//!
//! Issued identifiers are `0..i64::MAX`. The counter never wraps: once it
//! reaches `i64::MAX` nothing more is issued.

use std::sync::atomic::{AtomicI64, Ordering};

use crate::id::NodeId;

static NEXT_ID: AtomicI64 = AtomicI64::new(0);

/// Issues a fresh identifier, or `None` once the identifier space is used up.
/// Strictly monotonic.
pub fn try_new_id() -> Option<NodeId> {
    NEXT_ID
        .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |next| next.checked_add(1))
        .ok()
        .map(NodeId)
}

/// Issues a fresh identifier.
///
/// # Panics
///
/// When the identifier space is exhausted, which only happens after an
/// identifier just below `i64::MAX` was restored. Callers that restore ids
/// from untrusted input use [`try_new_id`].
pub fn new_id() -> NodeId {
    match try_new_id() {
        Some(id) => id,
        None => exhausted(),
    }
}

#[cold]
fn exhausted() -> ! {
    panic!("node identifier space exhausted")
}

/// Advances the counter past `id` so that [`new_id`] can never return it.
///
/// Called when an identifier is restored from a store rather than issued.
/// Negative identifiers and `i64::MAX` are never issued, so they leave the
/// counter alone.
pub fn observe(id: NodeId) {
    if id.0 < 0 {
        return;
    }
    if let Some(next) = id.0.checked_add(1) {
        NEXT_ID.fetch_max(next, Ordering::Relaxed);
    }
}

/// Rewinds the counter so the next issued identifier is `next`.
///
/// Identifiers already live may be issued again afterwards; [`crate::Graph`]
/// skips those when it creates nodes. Used for bulk re-identification
/// tooling.
pub fn reset(next: i64) {
    NEXT_ID.store(next.max(0), Ordering::Relaxed);
}
