use std::fmt;

/// Classification of where an event originated in the pipeline.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, serde::Serialize, serde::Deserialize)]
pub enum EventSource {
    /// Entering or leaving a pipeline stage.
    #[serde(rename = "chain")]
    Chain,
    /// Step decisions, step results and the terminal result.
    #[serde(rename = "tool")]
    Tool,
    /// Free-form generated text.
    #[serde(rename = "llm")]
    Generator,
}

impl EventSource {
    /// Returns the short tag used when the record is printed or serialized.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Chain => "chain",
            Self::Tool => "tool",
            Self::Generator => "llm",
        }
    }
}

impl fmt::Display for EventSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// One tagged line of text relayed from the pipeline to the consumer.
///
/// Records are immutable once built; their position in the stream is decided
/// only by the order in which hooks appended them.
#[derive(Clone, Debug, Eq, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct EventRecord {
    text: String,
    source: EventSource,
}

impl EventRecord {
    /// Creates a record.
    pub fn new(text: impl Into<String>, source: EventSource) -> Self {
        Self {
            text: text.into(),
            source,
        }
    }

    /// Text as formatted by the hook that produced it.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Which kind of hook produced the record.
    pub fn source(&self) -> EventSource {
        self.source
    }

    /// Splits the record into its `(text, source)` pair.
    pub fn into_parts(self) -> (String, EventSource) {
        (self.text, self.source)
    }
}

impl fmt::Display for EventRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.source, self.text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_tags_serialize_as_short_names() {
        let record = EventRecord::new("hello", EventSource::Generator);
        let json = serde_json::to_value(&record).expect("serialize");
        assert_eq!(json, serde_json::json!({"text": "hello", "source": "llm"}));

        let tool: EventSource = serde_json::from_str("\"tool\"").expect("deserialize");
        assert_eq!(tool, EventSource::Tool);
    }

    #[test]
    fn display_prefixes_tag() {
        let record = EventRecord::new("Finished stage.", EventSource::Chain);
        assert_eq!(record.to_string(), "[chain] Finished stage.");
        assert_eq!(record.text(), "Finished stage.");
        assert_eq!(record.source(), EventSource::Chain);
        assert_eq!(
            record.into_parts(),
            ("Finished stage.".to_string(), EventSource::Chain)
        );
    }
}
