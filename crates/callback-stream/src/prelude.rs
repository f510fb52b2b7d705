//! Common imports for typical stream usage.
//!
//! Brings the hook trait into scope along with the session and stream types,
//! so engine glue and readers need fewer import lines.
pub use crate::{
    EventRecord, EventSource, EventStream, GeneratorHandler, PipelineCallbacks, Pulled,
    SessionConfig, StreamConfig, StreamError, StreamSession, WaitStrategy,
};
