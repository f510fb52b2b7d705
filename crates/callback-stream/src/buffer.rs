//! Shared FIFO of event records plus the run's completion flag.
//!
//! Queue and flag sit behind one mutex, so a consumer that sees the run as
//! finished with an empty queue has already drained every earlier append.

use std::collections::VecDeque;
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::Notify;
use tracing::debug;

use crate::event::EventRecord;

#[derive(Default)]
struct BufferState {
    queue: VecDeque<EventRecord>,
    finished: bool,
}

/// Consistent view taken by the consumer on each check.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum Snapshot {
    Event(EventRecord),
    Drained,
    Pending,
}

/// Unbounded event queue shared by one producer and one consumer.
///
/// `append` never blocks and never fails; there is no capacity limit.
#[derive(Default)]
pub struct EventBuffer {
    state: Mutex<BufferState>,
    changed: Condvar,
    notify: Notify,
}

impl EventBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, BufferState> {
        // A panicking hook must not wedge the stream for the other side.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Appends a record at the tail and wakes any waiting consumer.
    ///
    /// Returns the queue depth after the append.
    pub fn append(&self, record: EventRecord) -> usize {
        let depth = {
            let mut state = self.lock();
            state.queue.push_back(record);
            state.queue.len()
        };
        self.wake();
        depth
    }

    /// Removes and returns the oldest record, if any.
    pub fn pop_front(&self) -> Option<EventRecord> {
        self.lock().queue.pop_front()
    }

    /// Queue depth at the moment of the call.
    ///
    /// Advisory while a producer is running: pair it with `pop_front` only
    /// through the `Option` that `pop_front` returns, never as a check-then-act.
    pub fn len(&self) -> usize {
        self.lock().queue.len()
    }

    /// Advisory, like [`len`](Self::len).
    pub fn is_empty(&self) -> bool {
        self.lock().queue.is_empty()
    }

    /// Sets the completion flag. Later calls are no-ops.
    pub fn mark_finished(&self) {
        let first = {
            let mut state = self.lock();
            !std::mem::replace(&mut state.finished, true)
        };
        if !first {
            debug!("completion signal already set");
        }
        self.wake();
    }

    pub fn is_finished(&self) -> bool {
        self.lock().finished
    }

    /// Pops the head record, or reports whether the run is drained or still pending.
    pub(crate) fn snapshot(&self) -> Snapshot {
        let mut state = self.lock();
        match state.queue.pop_front() {
            Some(record) => Snapshot::Event(record),
            None if state.finished => Snapshot::Drained,
            None => Snapshot::Pending,
        }
    }

    /// Blocks the calling thread until a hook fires or `wait` elapses.
    ///
    /// Returns immediately if the queue is non-empty or the run is finished.
    pub(crate) fn wait_blocking(&self, wait: Duration) {
        let state = self.lock();
        if !state.queue.is_empty() || state.finished {
            return;
        }
        let _ = self
            .changed
            .wait_timeout(state, wait)
            .unwrap_or_else(PoisonError::into_inner);
    }

    /// Async counterpart of [`wait_blocking`](Self::wait_blocking).
    pub(crate) async fn wait_async(&self, wait: Duration) {
        let notified = self.notify.notified();
        tokio::pin!(notified);
        // Register before checking so a wake between check and await is kept.
        notified.as_mut().enable();
        {
            let state = self.lock();
            if !state.queue.is_empty() || state.finished {
                return;
            }
        }
        let _ = tokio::time::timeout(wait, notified).await;
    }

    fn wake(&self) {
        self.changed.notify_all();
        self.notify.notify_waiters();
    }
}

impl std::fmt::Debug for EventBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.lock();
        f.debug_struct("EventBuffer")
            .field("len", &state.queue.len())
            .field("finished", &state.finished)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::EventSource;
    use std::sync::Arc;
    use std::time::Instant;

    fn record(text: &str) -> EventRecord {
        EventRecord::new(text, EventSource::Tool)
    }

    #[test]
    fn pops_in_append_order() {
        let buffer = EventBuffer::new();
        assert_eq!(buffer.append(record("a")), 1);
        assert_eq!(buffer.append(record("b")), 2);
        assert_eq!(buffer.len(), 2);
        assert_eq!(buffer.pop_front(), Some(record("a")));
        assert_eq!(buffer.pop_front(), Some(record("b")));
        assert_eq!(buffer.pop_front(), None);
        assert!(buffer.is_empty());
    }

    #[test]
    fn snapshot_reports_drained_only_when_finished_and_empty() {
        let buffer = EventBuffer::new();
        assert_eq!(buffer.snapshot(), Snapshot::Pending);

        buffer.append(record("last"));
        buffer.mark_finished();
        assert!(buffer.is_finished());
        assert_eq!(buffer.snapshot(), Snapshot::Event(record("last")));
        assert_eq!(buffer.snapshot(), Snapshot::Drained);
    }

    #[test]
    fn mark_finished_is_idempotent() {
        let buffer = EventBuffer::new();
        buffer.mark_finished();
        buffer.mark_finished();
        assert!(buffer.is_finished());
        buffer.append(record("late"));
        assert_eq!(buffer.len(), 1);
    }

    #[test]
    fn append_after_poisoned_lock_still_works() {
        let buffer = Arc::new(EventBuffer::new());
        let poison = buffer.clone();
        let _ = std::thread::spawn(move || {
            let _guard = poison.state.lock().expect("lock");
            panic!("poison the buffer");
        })
        .join();
        buffer.append(record("after"));
        assert_eq!(buffer.pop_front(), Some(record("after")));
    }

    #[test]
    fn wait_blocking_returns_early_on_append() {
        let buffer = Arc::new(EventBuffer::new());
        let producer = buffer.clone();
        let handle = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(50));
            producer.append(record("wake"));
        });
        let started = Instant::now();
        while buffer.is_empty() && started.elapsed() < Duration::from_secs(5) {
            buffer.wait_blocking(Duration::from_secs(5));
        }
        assert!(started.elapsed() < Duration::from_secs(5));
        assert_eq!(buffer.pop_front(), Some(record("wake")));
        handle.join().expect("producer");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn wait_async_returns_early_on_finish() {
        let buffer = Arc::new(EventBuffer::new());
        let producer = buffer.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            producer.mark_finished();
        });
        let started = Instant::now();
        while !buffer.is_finished() && started.elapsed() < Duration::from_secs(5) {
            buffer.wait_async(Duration::from_secs(5)).await;
        }
        assert!(buffer.is_finished());
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn pop_front_alone_drains_under_a_live_producer() {
        let buffer = Arc::new(EventBuffer::new());
        let producer = buffer.clone();
        let handle = std::thread::spawn(move || {
            for i in 0..500 {
                producer.append(record(&format!("e{i}")));
            }
            producer.mark_finished();
        });

        let mut seen = Vec::new();
        loop {
            // `len` may already be stale here; only the popped `Option` decides.
            let _depth = buffer.len();
            match buffer.pop_front() {
                Some(next) => seen.push(next.text().to_owned()),
                None if buffer.is_finished() => {
                    let rest = std::iter::from_fn(|| buffer.pop_front());
                    seen.extend(rest.map(|next| next.text().to_owned()));
                    break;
                }
                None => std::thread::yield_now(),
            }
        }
        handle.join().expect("producer");

        let expected: Vec<String> = (0..500).map(|i| format!("e{i}")).collect();
        assert_eq!(seen, expected);
        assert!(buffer.is_empty());
    }
}
