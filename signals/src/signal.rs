use std::collections::BTreeMap;
use std::marker::PhantomData;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Weak};

use tracing::{debug, error, trace, warn};

use crate::launcher::{Job, Launcher, ThreadLauncher};
use crate::result::{Dispatch, ResultHandle, result_pair};
use crate::slot::{SignalId, SlotFn, SlotGuard, SlotHandle, SlotId, SlotRecord};
use crate::SlotError;

static NEXT_SIGNAL: AtomicU64 = AtomicU64::new(0);

/// A thread-safe signal that calls every connected slot with the invocation's arguments.
///
/// `A` is the argument passed to each slot (a tuple for several arguments, `()` for none) and `R`
/// is what each slot returns. Every enabled slot runs as its own unit of work, concurrently with
/// the other slots and with the caller, and reports through its own [`ResultHandle`].
///
/// `R` must be `Clone` since every clone of a result handle reads the same result. Wrap other
/// result types in an `Arc`.
///
/// Cloning a signal is cheap and every clone addresses the same slots.
pub struct Signal<A, R = ()>(Arc<Inner<A, R>>);

/// A weak reference to a [`Signal`], for slots that need to reach their own signal.
pub struct WeakSignal<A, R = ()>(Weak<Inner<A, R>>);

struct Inner<A, R> {
    id: SignalId,
    state: Mutex<State<A, R>>,
    launcher: Box<dyn Launcher>,
}

struct State<A, R> {
    slots: BTreeMap<SlotId, SlotRecord<A, R>>,
    next_slot: u64,
    enabled: bool,
    asynchronous: bool,
}

/// Configures a [`Signal`] before it is created.
pub struct SignalBuilder<A, R = ()> {
    enabled: bool,
    asynchronous: bool,
    launcher: Option<Box<dyn Launcher>>,
    _marker: PhantomData<fn(A) -> R>,
}

impl<A, R> Default for SignalBuilder<A, R> {
    fn default() -> Self { Self { enabled: true, asynchronous: true, launcher: None, _marker: PhantomData } }
}

impl<A, R> SignalBuilder<A, R> {
    /// Whether the signal starts enabled (default `true`)
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Whether invocations return without waiting for their slots (default `true`)
    pub fn asynchronous(mut self, asynchronous: bool) -> Self {
        self.asynchronous = asynchronous;
        self
    }

    /// How slots are run (default [`ThreadLauncher`])
    pub fn launcher(mut self, launcher: impl Launcher) -> Self {
        self.launcher = Some(Box::new(launcher));
        self
    }

    pub fn build(self) -> Signal<A, R> {
        let id = SignalId(NEXT_SIGNAL.fetch_add(1, Ordering::Relaxed));
        let launcher = self.launcher.unwrap_or_else(|| Box::new(ThreadLauncher::default()));
        Signal(Arc::new(Inner {
            id,
            state: Mutex::new(State { slots: BTreeMap::new(), next_slot: 0, enabled: self.enabled, asynchronous: self.asynchronous }),
            launcher,
        }))
    }
}

impl<A, R> Signal<A, R> {
    /// An enabled, asynchronous signal without slots, running slots on their own threads
    pub fn new() -> Self { Self::builder().build() }

    pub fn builder() -> SignalBuilder<A, R> { SignalBuilder::default() }

    pub fn id(&self) -> SignalId { self.0.id }

    pub fn downgrade(&self) -> WeakSignal<A, R> { WeakSignal(Arc::downgrade(&self.0)) }

    fn lock(&self) -> MutexGuard<'_, State<A, R>> { self.0.state.lock().expect("signal state lock is poisoned") }

    fn record<'a>(&self, state: &'a mut State<A, R>, handle: SlotHandle) -> Option<&'a mut SlotRecord<A, R>> {
        if handle.signal != self.0.id {
            return None;
        }
        state.slots.get_mut(&handle.slot)
    }

    /// Remove every slot. Handles given out earlier stay harmless to use.
    pub fn disconnect_all(&self) {
        let removed = std::mem::take(&mut self.lock().slots);
        debug!(signal = %self.0.id, count = removed.len(), "disconnected all slots");
        // slot callables are dropped outside the lock
        drop(removed);
    }

    /// Remove the slot of `handle`. Does nothing if it is not connected.
    pub fn disconnect(&self, handle: SlotHandle) {
        let removed = {
            let mut state = self.lock();
            if handle.signal != self.0.id { None } else { state.slots.remove(&handle.slot) }
        };
        if removed.is_some() {
            debug!(signal = %self.0.id, slot = %handle.slot, "disconnected slot");
        }
    }

    /// Whether the signal as a whole is enabled
    pub fn state(&self) -> bool { self.lock().enabled }

    /// Whether the slot of `handle` is enabled. `false` if it is not connected, see
    /// [`is_connected`](Self::is_connected) to tell the two apart.
    pub fn slot_state(&self, handle: SlotHandle) -> bool {
        let mut state = self.lock();
        self.record(&mut state, handle).is_some_and(|record| record.enabled)
    }

    /// Flip whether the signal as a whole is enabled and return the new state.
    pub fn toggle(&self) -> bool {
        let mut state = self.lock();
        state.enabled = !state.enabled;
        debug!(signal = %self.0.id, enabled = state.enabled, "toggled signal");
        state.enabled
    }

    /// Flip whether the slot of `handle` is enabled and return the new state.
    /// Returns `false` without effect if the slot is not connected.
    pub fn toggle_slot(&self, handle: SlotHandle) -> bool {
        let mut state = self.lock();
        match self.record(&mut state, handle) {
            Some(record) => {
                record.enabled = !record.enabled;
                debug!(signal = %self.0.id, slot = %handle.slot, enabled = record.enabled, "toggled slot");
                record.enabled
            }
            None => false,
        }
    }

    /// Enable or disable the signal as a whole and return the new state.
    pub fn set_enabled(&self, enabled: bool) -> bool {
        self.lock().enabled = enabled;
        enabled
    }

    /// Whether invocations return without waiting for their slots
    pub fn is_async(&self) -> bool { self.lock().asynchronous }

    /// Set whether invocations return without waiting for their slots and return the new mode.
    pub fn set_async(&self, asynchronous: bool) -> bool {
        self.lock().asynchronous = asynchronous;
        asynchronous
    }

    pub fn is_connected(&self, handle: SlotHandle) -> bool {
        let mut state = self.lock();
        self.record(&mut state, handle).is_some()
    }

    /// Every connected slot with its enabled state, in subscription order
    pub fn slots(&self) -> Vec<(SlotHandle, bool)> {
        let state = self.lock();
        state.slots.iter().map(|(slot, record)| (SlotHandle { signal: self.0.id, slot: *slot }, record.enabled)).collect()
    }

    pub fn len(&self) -> usize { self.lock().slots.len() }

    pub fn is_empty(&self) -> bool { self.lock().slots.is_empty() }
}

impl<A, R> Signal<A, R>
where
    A: Clone + Send + 'static,
    R: Clone + Send + Sync + 'static,
{
    /// Connect a slot. It starts out enabled and is called by every later invocation.
    ///
    /// Each call creates a new slot, even when the same callable is connected twice.
    pub fn connect<F>(&self, slot: F) -> SlotHandle
    where F: Fn(A) -> R + Send + Sync + 'static {
        let callable: SlotFn<A, R> = Arc::new(slot);
        let mut state = self.lock();
        let slot = SlotId(state.next_slot);
        state.next_slot += 1;
        state.slots.insert(slot, SlotRecord { enabled: true, callable });
        debug!(signal = %self.0.id, %slot, "connected slot");
        SlotHandle { signal: self.0.id, slot }
    }

    /// Connect `method` bound to `target`. The target is moved into the slot and lives as long as
    /// the slot does.
    pub fn connect_bound<T, M>(&self, target: T, method: M) -> SlotHandle
    where
        T: Send + Sync + 'static,
        M: Fn(&T, A) -> R + Send + Sync + 'static,
    {
        self.connect(move |args| method(&target, args))
    }

    /// Connect a slot that is disconnected again when the returned guard is dropped.
    pub fn connect_scoped<F>(&self, slot: F) -> SlotGuard<A, R>
    where F: Fn(A) -> R + Send + Sync + 'static {
        SlotGuard::new(self.downgrade(), self.connect(slot))
    }

    /// Call every enabled slot with `args`.
    ///
    /// Returns one result handle per slot that was enabled at the time of the call, in subscription
    /// order, or none if the signal is disabled. In asynchronous mode this returns as soon as the
    /// slots are launched; otherwise it returns once all of them have finished.
    ///
    /// Slots run without the signal locked, so they may connect, disconnect, toggle or invoke this
    /// same signal. A slot that panics or cannot be launched reports that through its own handle
    /// only.
    pub fn invoke(&self, args: A) -> Dispatch<R> {
        let (slots, asynchronous) = {
            let state = self.lock();
            if !state.enabled {
                trace!(signal = %self.0.id, "signal disabled, nothing to invoke");
                return Dispatch::empty();
            }
            let slots: Vec<(SlotId, SlotFn<A, R>)> =
                state.slots.iter().filter(|(_, record)| record.enabled).map(|(slot, record)| (*slot, record.callable.clone())).collect();
            (slots, state.asynchronous)
        };
        trace!(signal = %self.0.id, slots = slots.len(), asynchronous, "invoking");

        let mut handles = Vec::with_capacity(slots.len());
        // clone the arguments for each slot except the last one
        if let Some(((last_slot, last), rest)) = slots.split_last() {
            for (slot, callable) in rest {
                handles.push(self.launch(*slot, callable.clone(), args.clone()));
            }
            handles.push(self.launch(*last_slot, last.clone(), args));
        }

        let dispatch = Dispatch::new(handles);
        if !asynchronous {
            dispatch.wait_ready();
        }
        dispatch
    }

    fn launch(&self, slot: SlotId, callable: SlotFn<A, R>, args: A) -> ResultHandle<R> {
        let (resolver, handle) = result_pair();
        let signal = self.0.id;
        let job: Job = Box::new(move || {
            let result = std::panic::catch_unwind(AssertUnwindSafe(|| callable(args))).map_err(|payload| {
                let error = SlotError::from_panic(payload);
                warn!(%signal, %slot, %error, "slot panicked");
                error
            });
            resolver.resolve(result);
        });

        match self.0.launcher.launch(job) {
            Ok(()) => handle,
            Err(e) => {
                error!(%signal, %slot, error = %e, "failed to launch slot");
                ResultHandle::ready(Err(e.into()))
            }
        }
    }
}

impl<A, R> WeakSignal<A, R> {
    pub fn upgrade(&self) -> Option<Signal<A, R>> { self.0.upgrade().map(Signal) }
}

impl<A, R> Clone for Signal<A, R> {
    fn clone(&self) -> Self { Self(self.0.clone()) }
}

impl<A, R> Clone for WeakSignal<A, R> {
    fn clone(&self) -> Self { Self(self.0.clone()) }
}

impl<A, R> Default for Signal<A, R> {
    fn default() -> Self { Self::new() }
}

impl<A, R> std::fmt::Debug for Signal<A, R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.lock();
        f.debug_struct("Signal")
            .field("id", &self.0.id)
            .field("slots", &state.slots.len())
            .field("enabled", &state.enabled)
            .field("asynchronous", &state.asynchronous)
            .finish()
    }
}
