//! Turns a pipeline's lifecycle callbacks into a pull-based stream of tagged
//! text events.
//!
//! A pipeline engine runs synchronously and reports progress through hooks
//! (`PipelineCallbacks`). Opening a `StreamSession` gives two halves: the
//! `GeneratorHandler` the engine calls from its own thread, and the
//! `EventStream` a reader pulls from on another thread or task.
//!
//! # Usage
//!
//! ```no_run
//! use std::time::Duration;
//!
//! use callback_stream::prelude::*;
//!
//! # fn main() -> Result<(), StreamError> {
//! let session = StreamSession::open(
//!     SessionConfig::named("agent").stream(StreamConfig::default().timeout(Duration::from_secs(10))),
//! )?;
//! let (handler, stream) = session.into_parts();
//!
//! let engine = std::thread::spawn(move || {
//!     handler.on_stage_start("LLMChain");
//!     handler.on_free_text("Prompt after formatting");
//!     handler.on_stage_end();
//!     handler.on_pipeline_finish("Final Answer: 42");
//! });
//!
//! for record in stream {
//!     println!("{}", record?);
//! }
//! # let _ = engine.join();
//! # Ok(())
//! # }
//! ```

/// Shared FIFO buffer and completion flag.
pub mod buffer;
/// Single-slot prefix carried between hooks.
pub mod carry;
/// Stream timing configuration.
pub mod config;
/// Public error types.
pub mod errors;
/// Event records and source tags.
pub mod event;
/// Pipeline hook trait and the producer-side handler.
pub mod handler;
/// Tracing subscriber setup.
pub mod observability;
/// Common imports for typical usage.
pub mod prelude;
/// Session wiring.
pub mod session;
/// Consumer-side polling stream.
pub mod stream;

pub use buffer::EventBuffer;
pub use carry::PrefixCarry;
pub use config::{StreamConfig, WaitStrategy};
pub use errors::StreamError;
pub use event::{EventRecord, EventSource};
pub use handler::{GeneratorHandler, PipelineCallbacks};
pub use observability::{LogOutput, ObservabilityConfig, init_observability, init_with};
pub use session::{SessionConfig, StreamSession};
pub use stream::{EventStream, Pulled};
