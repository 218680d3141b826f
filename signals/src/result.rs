use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::{Duration, Instant};

use futures::channel::oneshot;
use futures::future::{FutureExt, Shared};
use futures::task::ArcWake;

use crate::SlotError;

type Received<R> = Result<Result<R, SlotError>, oneshot::Canceled>;

fn settled<R: Clone>(received: &Received<R>) -> Result<R, SlotError> {
    match received {
        Ok(result) => result.clone(),
        // the unit of work was dropped without sending
        Err(oneshot::Canceled) => Err(SlotError::Abandoned),
    }
}

/// Write side of a [`ResultHandle`], owned by the unit of work running the slot.
///
/// Dropping it unresolved resolves the handle to [`SlotError::Abandoned`].
pub(crate) struct Resolver<R>(oneshot::Sender<Result<R, SlotError>>);

impl<R> Resolver<R> {
    pub(crate) fn resolve(self, result: Result<R, SlotError>) {
        // every handle may already be gone, nobody is left to tell then
        let _ = self.0.send(result);
    }
}

/// The eventual result of one slot for one invocation.
///
/// Write-once: the value (or the slot's error) is stored exactly once and every clone of the
/// handle observes the same outcome, which is why reading it clones `R`. Results that are not
/// `Clone` can be returned wrapped in an `Arc`. Waiting blocks only the waiter. There is no
/// cancellation; the slot runs to completion whether or not anybody waits on it.
///
/// For async callers the handle is also a `Future`, resolving to the same outcome.
pub struct ResultHandle<R>(Shared<oneshot::Receiver<Result<R, SlotError>>>);

pub(crate) fn result_pair<R: Clone>() -> (Resolver<R>, ResultHandle<R>) {
    let (tx, rx) = oneshot::channel();
    (Resolver(tx), ResultHandle(rx.shared()))
}

impl<R> Clone for ResultHandle<R> {
    fn clone(&self) -> Self { Self(self.0.clone()) }
}

impl<R: Clone> std::fmt::Debug for ResultHandle<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResultHandle").field("ready", &self.is_ready()).finish()
    }
}

/// Unparks the waiting thread, for polling with a deadline.
struct Unpark(std::thread::Thread);

impl ArcWake for Unpark {
    fn wake_by_ref(arc_self: &Arc<Self>) { arc_self.0.unpark(); }
}

impl<R: Clone> ResultHandle<R> {
    /// An already resolved handle
    pub fn ready(result: Result<R, SlotError>) -> Self {
        let (resolver, handle) = result_pair();
        resolver.resolve(result);
        handle
    }

    pub fn is_ready(&self) -> bool { self.0.peek().is_some() }

    /// The result if the slot has finished, without blocking.
    pub fn try_get(&self) -> Option<Result<R, SlotError>> { self.0.peek().map(settled) }

    /// Block until the slot has finished and return its result.
    pub fn wait(&self) -> Result<R, SlotError> { settled(&futures::executor::block_on(self.0.clone())) }

    /// Block until the slot has finished, without retrieving the result.
    pub fn wait_ready(&self) {
        if !self.is_ready() {
            let _ = futures::executor::block_on(self.0.clone());
        }
    }

    /// Block for at most `timeout`. Returns `None` if the slot is still running.
    pub fn wait_timeout(&self, timeout: Duration) -> Option<Result<R, SlotError>> {
        let deadline = Instant::now() + timeout;
        let waker = futures::task::waker(Arc::new(Unpark(std::thread::current())));
        let mut cx = Context::from_waker(&waker);
        let mut pending = self.0.clone();
        loop {
            if let Poll::Ready(received) = pending.poll_unpin(&mut cx) {
                return Some(settled(&received));
            }
            let now = Instant::now();
            if now >= deadline {
                return None;
            }
            std::thread::park_timeout(deadline - now);
        }
    }
}

impl<R: Clone> Future for ResultHandle<R> {
    type Output = Result<R, SlotError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> { self.0.poll_unpin(cx).map(|received| settled(&received)) }
}

/// The result handles produced by one invocation, in subscription order.
///
/// Contains one handle per slot that was enabled when the signal was invoked, and nothing if the
/// signal itself was disabled.
pub struct Dispatch<R>(Vec<ResultHandle<R>>);

impl<R> Dispatch<R> {
    pub(crate) fn new(handles: Vec<ResultHandle<R>>) -> Self { Self(handles) }

    pub fn empty() -> Self { Self(Vec::new()) }

    pub fn into_handles(self) -> Vec<ResultHandle<R>> { self.0 }
}

impl<R: Clone> Dispatch<R> {
    /// Block until every slot of this invocation has finished.
    pub fn wait_ready(&self) {
        for handle in &self.0 {
            handle.wait_ready();
        }
    }

    /// Wait for every slot and collect the results in subscription order.
    pub fn wait_all(&self) -> Vec<Result<R, SlotError>> { self.0.iter().map(ResultHandle::wait).collect() }
}

impl<R> Default for Dispatch<R> {
    fn default() -> Self { Self::empty() }
}

impl<R> Clone for Dispatch<R> {
    fn clone(&self) -> Self { Self(self.0.clone()) }
}

impl<R: Clone> std::fmt::Debug for Dispatch<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result { f.debug_list().entries(self.0.iter()).finish() }
}

impl<R> std::ops::Deref for Dispatch<R> {
    type Target = [ResultHandle<R>];
    fn deref(&self) -> &Self::Target { &self.0 }
}

impl<R> IntoIterator for Dispatch<R> {
    type Item = ResultHandle<R>;
    type IntoIter = std::vec::IntoIter<ResultHandle<R>>;
    fn into_iter(self) -> Self::IntoIter { self.0.into_iter() }
}

impl<'a, R> IntoIterator for &'a Dispatch<R> {
    type Item = &'a ResultHandle<R>;
    type IntoIter = std::slice::Iter<'a, ResultHandle<R>>;
    fn into_iter(self) -> Self::IntoIter { self.0.iter() }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::{assert_pending, assert_ready};

    #[test]
    fn test_resolve_is_shared_by_clones() {
        let (resolver, handle) = result_pair::<i32>();
        let other = handle.clone();
        assert!(handle.try_get().is_none());
        assert!(!other.is_ready());

        resolver.resolve(Ok(7));
        assert_eq!(handle.wait().unwrap(), 7);
        assert_eq!(other.try_get().unwrap().unwrap(), 7);
        // reading does not consume
        assert_eq!(other.wait().unwrap(), 7);
    }

    #[test]
    fn test_dropped_resolver_abandons() {
        let (resolver, handle) = result_pair::<i32>();
        drop(resolver);
        assert!(matches!(handle.wait(), Err(SlotError::Abandoned)));
        assert!(matches!(handle.try_get(), Some(Err(SlotError::Abandoned))));
    }

    #[test]
    fn test_resolve_after_handles_dropped() {
        let (resolver, handle) = result_pair::<i32>();
        drop(handle);
        resolver.resolve(Ok(1));
    }

    #[test]
    fn test_wait_timeout_while_pending() {
        let (resolver, handle) = result_pair::<i32>();
        let started = Instant::now();
        assert!(handle.wait_timeout(Duration::from_millis(20)).is_none());
        assert!(started.elapsed() >= Duration::from_millis(20));

        resolver.resolve(Err(SlotError::Panicked("nope".into())));
        assert!(matches!(handle.wait_timeout(Duration::from_millis(10)), Some(Err(SlotError::Panicked(_)))));
    }

    #[test]
    fn test_wait_timeout_wakes_on_resolve() {
        let (resolver, handle) = result_pair::<u8>();
        let worker = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(20));
            resolver.resolve(Ok(5));
        });
        assert_eq!(handle.wait_timeout(Duration::from_secs(10)).unwrap().unwrap(), 5);
        worker.join().unwrap();
    }

    #[test]
    fn test_wait_blocks_until_resolved_from_other_thread() {
        let (resolver, handle) = result_pair::<String>();
        let worker = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(20));
            resolver.resolve(Ok("done".to_string()));
        });
        handle.wait_ready();
        assert!(handle.is_ready());
        assert_eq!(handle.wait().unwrap(), "done");
        worker.join().unwrap();
    }

    #[test]
    fn test_future_wakes_on_resolve() {
        let (resolver, handle) = result_pair::<u8>();
        let mut task = tokio_test::task::spawn(handle.clone());
        assert_pending!(task.poll());

        resolver.resolve(Ok(3));
        assert!(task.is_woken());
        assert_eq!(assert_ready!(task.poll()).unwrap(), 3);
    }

    #[test]
    fn test_non_clone_result_behind_arc() {
        #[derive(Debug, PartialEq)]
        struct Token(u32);

        let handle = ResultHandle::ready(Ok(Arc::new(Token(4))));
        assert_eq!(*handle.wait().unwrap(), Token(4));
        assert_eq!(handle.try_get().unwrap().unwrap().0, 4);
    }

    #[test]
    fn test_dispatch_collects_in_order() {
        let dispatch = Dispatch::new(vec![ResultHandle::ready(Ok(1)), ResultHandle::ready(Err(SlotError::Abandoned)), ResultHandle::ready(Ok(3))]);
        assert_eq!(dispatch.len(), 3);
        let results = dispatch.wait_all();
        assert_eq!(results[0].as_ref().unwrap(), &1);
        assert!(results[1].is_err());
        assert_eq!(results[2].as_ref().unwrap(), &3);
        assert!(Dispatch::<i32>::default().is_empty());
    }
}
