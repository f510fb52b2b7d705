use std::sync::Arc;

use tracing::trace;

use crate::carry::PrefixCarry;
use crate::event::{EventRecord, EventSource};
use crate::session::SessionShared;

/// Lifecycle hooks a pipeline engine calls while it executes.
///
/// Implementations must return promptly: hooks run on the engine's thread
/// and are not allowed to block on the consumer or report errors back.
pub trait PipelineCallbacks: Send + Sync {
    /// The pipeline entered a named sub-stage.
    fn on_stage_start(&self, name: &str);

    /// The current sub-stage completed.
    fn on_stage_end(&self);

    /// An intermediate decision or action was taken.
    fn on_step_action(&self, log: &str);

    /// A step produced an observable result.
    ///
    /// `result_prefix` is prepended to `output`; `next_text_prefix` is kept
    /// for the following free-text events.
    fn on_step_result(
        &self,
        output: &str,
        result_prefix: Option<&str>,
        next_text_prefix: Option<&str>,
    );

    /// Free-form generated text arrived.
    fn on_free_text(&self, text: &str);

    /// The pipeline reached its terminal result.
    fn on_pipeline_finish(&self, log: &str);
}

/// Producer half of a stream session.
///
/// Each hook formats one record and appends it to the session buffer in call
/// order. Clones share the same buffer and prefix carry.
#[derive(Clone)]
pub struct GeneratorHandler {
    shared: Arc<SessionShared>,
    carry: Arc<PrefixCarry>,
}

impl GeneratorHandler {
    pub(crate) fn new(shared: Arc<SessionShared>) -> Self {
        Self {
            shared,
            carry: Arc::new(PrefixCarry::new()),
        }
    }

    /// Id of the session this handler feeds.
    pub fn session_id(&self) -> uuid::Uuid {
        self.shared.id
    }

    /// Number of records appended but not yet pulled.
    ///
    /// Advisory: the consumer may pull concurrently, so the value can be stale
    /// by the time it is read.
    pub fn pending(&self) -> usize {
        self.shared.buffer.len()
    }

    /// Whether the terminal hook has fired.
    pub fn is_finished(&self) -> bool {
        self.shared.buffer.is_finished()
    }

    /// Prefix currently waiting to be applied to free text.
    pub fn carried_prefix(&self) -> Option<String> {
        self.carry.get()
    }

    /// Stage-start hook for engines that pass serialized stage metadata.
    ///
    /// Reads the `"name"` field; anything else is reported as `unknown`.
    pub fn on_stage_start_serialized(&self, serialized: &serde_json::Value) {
        let name = serialized
            .get("name")
            .and_then(serde_json::Value::as_str)
            .unwrap_or("unknown");
        self.on_stage_start(name);
    }

    fn emit(&self, text: String, source: EventSource) {
        let depth = self.shared.buffer.append(EventRecord::new(text, source));
        trace!(session_id = %self.shared.id, source = %source, depth, "event appended");
    }
}

impl PipelineCallbacks for GeneratorHandler {
    fn on_stage_start(&self, name: &str) {
        self.emit(format!("Entering new {name} stage..."), EventSource::Chain);
    }

    fn on_stage_end(&self) {
        self.emit("Finished stage.".to_owned(), EventSource::Chain);
    }

    fn on_step_action(&self, log: &str) {
        self.emit(log.to_owned(), EventSource::Tool);
    }

    fn on_step_result(
        &self,
        output: &str,
        result_prefix: Option<&str>,
        next_text_prefix: Option<&str>,
    ) {
        let text = match result_prefix {
            Some(prefix) => format!("{prefix}{output}"),
            None => output.to_owned(),
        };
        self.emit(text, EventSource::Tool);
        self.carry.set(next_text_prefix.map(str::to_owned));
    }

    fn on_free_text(&self, text: &str) {
        self.emit(self.carry.apply(text), EventSource::Generator);
    }

    fn on_pipeline_finish(&self, log: &str) {
        self.emit(log.to_owned(), EventSource::Tool);
        self.shared.buffer.mark_finished();
        trace!(session_id = %self.shared.id, session = %self.shared.name, "pipeline finished");
    }
}

impl std::fmt::Debug for GeneratorHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeneratorHandler")
            .field("session_id", &self.shared.id)
            .field("buffer", &self.shared.buffer)
            .field("carry", &self.carry)
            .finish()
    }
}
