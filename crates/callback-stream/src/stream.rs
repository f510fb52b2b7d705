use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::Stream;
use tracing::{debug, trace, warn};

use crate::buffer::Snapshot;
use crate::config::{StreamConfig, WaitStrategy};
use crate::errors::StreamError;
use crate::event::EventRecord;
use crate::session::SessionShared;

/// Result of one pull from an [`EventStream`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Pulled {
    /// The oldest pending record.
    Event(EventRecord),
    /// The pipeline finished and every record has been pulled.
    EndOfStream,
    /// Nothing arrived within the idle timeout. Fatal for the session.
    TimedOut {
        /// Time waited since the start of the pull.
        idle: Duration,
    },
}

impl Pulled {
    /// Whether this pull produced a record.
    pub fn is_event(&self) -> bool {
        matches!(self, Self::Event(_))
    }

    /// Whether the stream ended normally.
    pub fn is_end_of_stream(&self) -> bool {
        matches!(self, Self::EndOfStream)
    }

    /// Whether the pull gave up after the idle timeout.
    pub fn is_timed_out(&self) -> bool {
        matches!(self, Self::TimedOut { .. })
    }

    /// Returns the record if this pull produced one.
    pub fn into_event(self) -> Option<EventRecord> {
        match self {
            Self::Event(record) => Some(record),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug)]
enum Terminal {
    Ended,
    TimedOut { idle: Duration, reported: bool },
}

enum Step {
    Ready(Pulled),
    Wait(Duration),
}

/// Consumer half of a stream session.
///
/// Pulls records in exactly the order the hooks appended them. While the
/// buffer is empty and the pipeline is still running, a pull waits in
/// `pause`-sized steps; if no record or completion shows up within `timeout`
/// of the start of the pull, it reports [`Pulled::TimedOut`].
///
/// Both terminal outcomes latch: once a pull has returned end-of-stream or a
/// timeout, every later pull returns the same outcome, even if more records
/// are appended afterwards.
///
/// Use [`next_event`](Self::next_event) from a plain thread and
/// [`next_event_async`](Self::next_event_async) from a tokio task.
pub struct EventStream {
    shared: Arc<SessionShared>,
    config: StreamConfig,
    terminal: Option<Terminal>,
}

impl EventStream {
    pub(crate) fn new(shared: Arc<SessionShared>, config: StreamConfig) -> Self {
        Self {
            shared,
            config,
            terminal: None,
        }
    }

    pub fn session_id(&self) -> uuid::Uuid {
        self.shared.id
    }

    pub fn config(&self) -> &StreamConfig {
        &self.config
    }

    /// Whether a terminal outcome has already been returned.
    pub fn is_terminated(&self) -> bool {
        self.terminal.is_some()
    }

    /// Blocks the current thread until the next record, end-of-stream or timeout.
    pub fn next_event(&mut self) -> Pulled {
        let started = Instant::now();
        loop {
            match self.step(started) {
                Step::Ready(pulled) => return pulled,
                Step::Wait(pause) => match self.config.wait {
                    WaitStrategy::Poll => std::thread::sleep(pause),
                    WaitStrategy::Notify => self.shared.buffer.wait_blocking(pause),
                },
            }
        }
    }

    /// Async variant of [`next_event`](Self::next_event).
    ///
    /// Waiting yields to the runtime instead of parking the worker thread.
    pub async fn next_event_async(&mut self) -> Pulled {
        let started = Instant::now();
        loop {
            match self.step(started) {
                Step::Ready(pulled) => return pulled,
                Step::Wait(pause) => match self.config.wait {
                    WaitStrategy::Poll => tokio::time::sleep(pause).await,
                    WaitStrategy::Notify => self.shared.buffer.wait_async(pause).await,
                },
            }
        }
    }

    /// Drains the stream into a vector, or fails on idle timeout.
    pub fn collect_events(self) -> Result<Vec<EventRecord>, StreamError> {
        self.collect()
    }

    pub async fn collect_events_async(mut self) -> Result<Vec<EventRecord>, StreamError> {
        let mut records = Vec::new();
        while let Some(item) = self.next_item_async().await {
            records.push(item?);
        }
        Ok(records)
    }

    /// Adapts the consumer into a `futures::Stream`.
    ///
    /// Yields one `Err` on idle timeout, then ends.
    pub fn into_async_stream(self) -> impl Stream<Item = Result<EventRecord, StreamError>> {
        futures::stream::unfold(self, |mut stream| async move {
            let item = stream.next_item_async().await?;
            Some((item, stream))
        })
    }

    async fn next_item_async(&mut self) -> Option<Result<EventRecord, StreamError>> {
        let pulled = self.next_event_async().await;
        self.item_from(pulled)
    }

    fn item_from(&mut self, pulled: Pulled) -> Option<Result<EventRecord, StreamError>> {
        match pulled {
            Pulled::Event(record) => Some(Ok(record)),
            Pulled::EndOfStream => None,
            Pulled::TimedOut { idle } => match &mut self.terminal {
                Some(Terminal::TimedOut { reported, .. }) if !*reported => {
                    *reported = true;
                    Some(Err(StreamError::IdleTimeout {
                        idle,
                        timeout: self.config.timeout,
                    }))
                }
                _ => None,
            },
        }
    }

    fn step(&mut self, started: Instant) -> Step {
        match self.terminal {
            Some(Terminal::Ended) => return Step::Ready(Pulled::EndOfStream),
            Some(Terminal::TimedOut { idle, .. }) => return Step::Ready(Pulled::TimedOut { idle }),
            None => {}
        }

        match self.shared.buffer.snapshot() {
            Snapshot::Event(record) => {
                trace!(session_id = %self.shared.id, source = %record.source(), "event pulled");
                Step::Ready(Pulled::Event(record))
            }
            Snapshot::Drained => {
                debug!(session_id = %self.shared.id, session = %self.shared.name, "end of stream");
                self.terminal = Some(Terminal::Ended);
                Step::Ready(Pulled::EndOfStream)
            }
            Snapshot::Pending => {
                let idle = started.elapsed();
                if idle > self.config.timeout {
                    warn!(
                        session_id = %self.shared.id,
                        session = %self.shared.name,
                        ?idle,
                        timeout = ?self.config.timeout,
                        "event stream idle timeout"
                    );
                    self.terminal = Some(Terminal::TimedOut {
                        idle,
                        reported: false,
                    });
                    Step::Ready(Pulled::TimedOut { idle })
                } else {
                    Step::Wait(self.config.pause)
                }
            }
        }
    }
}

impl Iterator for EventStream {
    type Item = Result<EventRecord, StreamError>;

    /// Yields records until end-of-stream; a timeout is yielded once as `Err`.
    fn next(&mut self) -> Option<Self::Item> {
        let pulled = self.next_event();
        self.item_from(pulled)
    }
}

impl std::fmt::Debug for EventStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventStream")
            .field("session_id", &self.shared.id)
            .field("config", &self.config)
            .field("terminal", &self.terminal)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::EventSource;
    use crate::handler::PipelineCallbacks as _;
    use crate::session::{SessionConfig, StreamSession};
    use futures::StreamExt as _;

    fn fast(wait: WaitStrategy) -> SessionConfig {
        SessionConfig::named("test").stream(
            StreamConfig::default()
                .pause(Duration::from_millis(10))
                .timeout(Duration::from_millis(100))
                .wait_strategy(wait),
        )
    }

    #[test]
    fn yields_in_order_then_end_of_stream() {
        let (handler, mut stream) = StreamSession::open(fast(WaitStrategy::Poll))
            .expect("open")
            .into_parts();
        handler.on_step_action("a");
        handler.on_free_text("b");
        handler.on_pipeline_finish("c");

        let texts: Vec<String> = std::iter::from_fn(|| stream.next_event().into_event())
            .map(|record| record.text().to_owned())
            .collect();
        assert_eq!(texts, vec!["a", "b", "c"]);
        assert!(stream.is_terminated());
    }

    #[test]
    fn end_of_stream_latches_and_ignores_late_events() {
        let (handler, mut stream) = StreamSession::open(fast(WaitStrategy::Poll))
            .expect("open")
            .into_parts();
        handler.on_pipeline_finish("done");
        assert!(stream.next_event().is_event());
        assert!(stream.next_event().is_end_of_stream());

        handler.on_free_text("late");
        assert!(stream.next_event().is_end_of_stream());
        assert!(stream.next().is_none());
    }

    #[test]
    fn timeout_is_reported_once_through_iterator() {
        let (_handler, mut stream) = StreamSession::open(fast(WaitStrategy::Poll))
            .expect("open")
            .into_parts();
        match stream.next() {
            Some(Err(StreamError::IdleTimeout { idle, timeout })) => {
                assert!(idle > timeout);
                assert_eq!(timeout, Duration::from_millis(100));
            }
            other => panic!("expected timeout, got {other:?}"),
        }
        assert!(stream.next().is_none());
        assert!(stream.next_event().is_timed_out());
    }

    #[test]
    fn timeout_latches_even_if_events_arrive_later() {
        let (handler, mut stream) = StreamSession::open(fast(WaitStrategy::Notify))
            .expect("open")
            .into_parts();
        assert!(stream.next_event().is_timed_out());
        handler.on_step_action("too late");
        assert!(stream.next_event().is_timed_out());
    }

    #[test]
    fn idle_clock_rearms_on_every_pull() {
        let (handler, mut stream) = StreamSession::open(fast(WaitStrategy::Poll))
            .expect("open")
            .into_parts();
        let producer = std::thread::spawn(move || {
            for i in 0..5 {
                std::thread::sleep(Duration::from_millis(60));
                handler.on_step_action(&format!("step {i}"));
            }
            handler.on_pipeline_finish("done");
        });
        let records = stream.collect_events().expect("no timeout");
        producer.join().expect("producer");
        assert_eq!(records.len(), 6);
        assert_eq!(records[5].text(), "done");
    }

    #[test]
    fn collect_events_surfaces_timeout() {
        let (handler, stream) = StreamSession::open(fast(WaitStrategy::Poll))
            .expect("open")
            .into_parts();
        handler.on_stage_start("LLMChain");
        let err = stream.collect_events().expect_err("stalled producer");
        assert!(err.is_timeout());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn async_pull_sees_concurrent_appends() {
        for wait in [WaitStrategy::Poll, WaitStrategy::Notify] {
            let (handler, mut stream) = StreamSession::open(fast(wait)).expect("open").into_parts();
            let producer = tokio::task::spawn_blocking(move || {
                std::thread::sleep(Duration::from_millis(30));
                handler.on_free_text("hello");
                handler.on_pipeline_finish("bye");
            });
            let first = stream.next_event_async().await;
            assert_eq!(
                first,
                Pulled::Event(EventRecord::new("hello", EventSource::Generator))
            );
            assert!(stream.next_event_async().await.is_event());
            assert!(stream.next_event_async().await.is_end_of_stream());
            producer.await.expect("producer");
        }
    }

    #[tokio::test]
    async fn async_stream_adapter_ends_after_timeout_item() {
        let (handler, stream) = StreamSession::open(fast(WaitStrategy::Notify))
            .expect("open")
            .into_parts();
        handler.on_stage_end();
        let items: Vec<_> = stream.into_async_stream().collect().await;
        assert_eq!(items.len(), 2);
        assert!(matches!(&items[0], Ok(record) if record.source() == EventSource::Chain));
        assert!(matches!(&items[1], Err(err) if err.is_timeout()));
    }

    #[tokio::test]
    async fn collect_events_async_drains_finished_run() {
        let (handler, stream) = StreamSession::open(fast(WaitStrategy::Poll))
            .expect("open")
            .into_parts();
        handler.on_stage_start("Chain");
        handler.on_pipeline_finish("done");
        let records = stream.collect_events_async().await.expect("collect");
        assert_eq!(records.len(), 2);
    }
}
