use std::sync::Arc;

use crate::signal::WeakSignal;

/// The callable stored for a slot. Shared so an invocation can run it outside the signal's lock.
pub(crate) type SlotFn<A, R> = Arc<dyn Fn(A) -> R + Send + Sync + 'static>;

/// Process-unique identifier of a signal.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct SignalId(pub(crate) u64);

impl std::fmt::Display for SignalId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result { write!(f, "{}", self.0) }
}

/// Identifier of a slot within its signal. Assigned in increasing order and never reused, so
/// ordering by id is subscription order.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) struct SlotId(pub(crate) u64);

impl std::fmt::Display for SlotId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result { write!(f, "{}", self.0) }
}

pub(crate) struct SlotRecord<A, R> {
    pub(crate) enabled: bool,
    pub(crate) callable: SlotFn<A, R>,
}

/// Identifies one connected slot of one signal.
///
/// Returned by `connect` and used to disconnect, query or toggle that slot later. A handle stays
/// valid to hold after its slot is gone (or its signal is dropped); operations on it then behave as
/// if the slot was never found. Handles of one signal are never found by another.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq)]
pub struct SlotHandle {
    pub(crate) signal: SignalId,
    pub(crate) slot: SlotId,
}

impl SlotHandle {
    /// The signal this slot was connected to
    pub fn signal_id(&self) -> SignalId { self.signal }
}

/// A connected slot that is disconnected when the guard is dropped.
///
/// The guard holds the signal weakly: it does not keep the signal alive, and dropping it after the
/// signal is gone does nothing.
#[must_use = "the slot is disconnected as soon as the guard is dropped"]
pub struct SlotGuard<A, R = ()> {
    // None once detached
    signal: Option<WeakSignal<A, R>>,
    handle: SlotHandle,
}

impl<A, R> SlotGuard<A, R> {
    pub(crate) fn new(signal: WeakSignal<A, R>, handle: SlotHandle) -> Self { Self { signal: Some(signal), handle } }

    pub fn handle(&self) -> SlotHandle { self.handle }

    /// Keep the slot connected and return its plain handle
    pub fn detach(mut self) -> SlotHandle {
        self.signal = None;
        self.handle
    }
}

impl<A, R> Drop for SlotGuard<A, R> {
    fn drop(&mut self) {
        if let Some(signal) = self.signal.take().and_then(|weak| weak.upgrade()) {
            signal.disconnect(self.handle);
        }
    }
}

impl<A, R> std::fmt::Debug for SlotGuard<A, R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result { f.debug_struct("SlotGuard").field("handle", &self.handle).finish() }
}
