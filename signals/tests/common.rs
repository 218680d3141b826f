use std::sync::{Arc, Mutex};
use tracing::Level;

// Initialize tracing for tests
#[ctor::ctor]
fn init_tracing() { let _ = tracing_subscriber::fmt().with_max_level(Level::DEBUG).with_test_writer().try_init(); }

/// Collects what labelled slots receive. Slots of one invocation finish in no particular order,
/// so `take` returns the calls grouped by label, each label's calls in arrival order.
#[allow(unused)]
pub struct Recorder<T>(Arc<Mutex<Vec<(&'static str, T)>>>);

#[allow(unused)]
impl<T: Send + 'static> Recorder<T> {
    pub fn new() -> Self { Self(Arc::new(Mutex::new(Vec::new()))) }

    /// A slot that records every value it is called with under `label`
    pub fn slot(&self, label: &'static str) -> impl Fn(T) + Clone + Send + Sync + 'static {
        let calls = self.0.clone();
        move |value: T| calls.lock().unwrap().push((label, value))
    }

    pub fn take(&self) -> Vec<(&'static str, T)> {
        let mut calls: Vec<_> = self.0.lock().unwrap().drain(..).collect();
        calls.sort_by_key(|(label, _)| *label);
        calls
    }
}
