use std::time::Duration;

/// Errors surfaced by the consumer side of a stream session.
///
/// Hooks on the producer side never fail; the only runtime failure a caller
/// can observe is [`StreamError::IdleTimeout`], returned by the event stream.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StreamError {
    /// No event and no completion arrived within the configured idle timeout.
    #[error("event stream timed out after {idle:?} without a new event (timeout {timeout:?})")]
    IdleTimeout {
        /// Time spent waiting since the last successful pull.
        idle: Duration,
        /// Configured idle timeout.
        timeout: Duration,
    },
    /// Invalid stream configuration.
    #[error("config error: {0}")]
    Config(String),
}

impl StreamError {
    pub(crate) fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Returns `true` for the idle-timeout variant.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::IdleTimeout { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_message_names_both_durations() {
        let err = StreamError::IdleTimeout {
            idle: Duration::from_millis(5100),
            timeout: Duration::from_secs(5),
        };
        let message = err.to_string();
        assert!(message.contains("5.1s"));
        assert!(message.contains("timeout 5s"));
        assert!(err.is_timeout());
        assert!(!StreamError::config("bad").is_timeout());
    }
}
