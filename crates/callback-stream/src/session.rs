use std::sync::Arc;

use tracing::debug;

use crate::buffer::EventBuffer;
use crate::config::StreamConfig;
use crate::errors::StreamError;
use crate::handler::GeneratorHandler;
use crate::stream::EventStream;

/// Configuration used to open a `StreamSession`.
#[derive(Clone, Debug, Default)]
pub struct SessionConfig {
    /// Human-readable session name (shows up in logs).
    pub name: String,
    /// Consumer-side timing.
    pub stream: StreamConfig,
}

impl SessionConfig {
    /// Creates a named session config with default stream timing.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            stream: StreamConfig::default(),
        }
    }

    /// Replaces the stream timing.
    pub fn stream(mut self, stream: StreamConfig) -> Self {
        self.stream = stream;
        self
    }
}

/// State shared by the producer and consumer halves of one session.
pub(crate) struct SessionShared {
    pub(crate) id: uuid::Uuid,
    pub(crate) name: String,
    pub(crate) buffer: EventBuffer,
}

/// One pipeline run's worth of streaming state.
///
/// Opening a session creates a fresh buffer, completion flag and prefix
/// carry. The `GeneratorHandler` half goes to the pipeline engine; the
/// `EventStream` half goes to the reader. Nothing is reused across sessions,
/// so a stream that timed out needs a new session.
pub struct StreamSession {
    handler: GeneratorHandler,
    stream: EventStream,
}

impl StreamSession {
    /// Validates the config and opens a session.
    pub fn open(config: SessionConfig) -> Result<Self, StreamError> {
        config.stream.validate()?;
        Ok(Self::build(config))
    }

    /// Opens an unnamed session with default timing.
    pub fn with_defaults() -> Self {
        Self::build(SessionConfig::default())
    }

    fn build(config: SessionConfig) -> Self {
        let shared = Arc::new(SessionShared {
            id: uuid::Uuid::new_v4(),
            name: config.name,
            buffer: EventBuffer::new(),
        });
        debug!(
            session_id = %shared.id,
            session = %shared.name,
            pause = ?config.stream.pause,
            timeout = ?config.stream.timeout,
            wait = ?config.stream.wait,
            "stream session opened"
        );
        Self {
            handler: GeneratorHandler::new(shared.clone()),
            stream: EventStream::new(shared, config.stream),
        }
    }

    /// Session id, shared by both halves and attached to every log line.
    pub fn id(&self) -> uuid::Uuid {
        self.handler.session_id()
    }

    /// Returns a producer handle; all clones feed the same stream.
    pub fn handler(&self) -> GeneratorHandler {
        self.handler.clone()
    }

    /// Splits the session into its producer and consumer halves.
    pub fn into_parts(self) -> (GeneratorHandler, EventStream) {
        (self.handler, self.stream)
    }
}
