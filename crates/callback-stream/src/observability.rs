use std::path::PathBuf;

use once_cell::sync::OnceCell;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt as _;
use tracing_subscriber::util::SubscriberInitExt as _;

const ENABLED_ENV: &str = "CALLBACK_STREAM_OBSERVABILITY";
const LEVEL_ENV: &str = "CALLBACK_STREAM_LOG_LEVEL";
const JSON_PATH_ENV: &str = "CALLBACK_STREAM_JSON_LOG_PATH";

/// Filter used when neither `CALLBACK_STREAM_LOG_LEVEL` nor `RUST_LOG` is set:
/// this crate's session and timeout events, warnings from everything else.
pub const DEFAULT_FILTER: &str = "warn,callback_stream=info";

static INIT: OnceCell<()> = OnceCell::new();

/// Where log lines go.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LogOutput {
    /// Compact lines on stderr, kept apart from event text printed on stdout.
    Stderr,
    /// One JSON object per line, appended to the file.
    JsonFile(PathBuf),
}

/// Logging settings resolved from the environment.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ObservabilityConfig {
    /// `false` leaves the process without a subscriber.
    pub enabled: bool,
    /// `EnvFilter` directives.
    pub filter: String,
    /// Where log lines go.
    pub output: LogOutput,
}

impl ObservabilityConfig {
    /// Reads `CALLBACK_STREAM_OBSERVABILITY`, `CALLBACK_STREAM_LOG_LEVEL`,
    /// `RUST_LOG` and `CALLBACK_STREAM_JSON_LOG_PATH`.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        // Only an explicit "off" disables logging.
        let enabled = !lookup(ENABLED_ENV).is_some_and(|value| {
            matches!(value.trim().to_ascii_lowercase().as_str(), "0" | "false" | "off")
        });
        let filter = [LEVEL_ENV, EnvFilter::DEFAULT_ENV]
            .into_iter()
            .filter_map(&lookup)
            .find(|directives| EnvFilter::try_new(directives).is_ok())
            .unwrap_or_else(|| DEFAULT_FILTER.to_owned());
        let output = lookup(JSON_PATH_ENV)
            .filter(|path| !path.trim().is_empty())
            .map_or(LogOutput::Stderr, |path| LogOutput::JsonFile(path.into()));
        Self {
            enabled,
            filter,
            output,
        }
    }

    fn env_filter(&self) -> EnvFilter {
        EnvFilter::try_new(&self.filter).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
    }
}

/// Installs the global tracing subscriber once per process, configured from
/// the environment (see [`ObservabilityConfig::from_env`]).
///
/// Session ids and names are recorded as fields on every stream event, so a
/// JSONL log can be filtered per session.
pub fn init_observability() {
    init_with(ObservabilityConfig::from_env());
}

/// Like [`init_observability`] with explicit settings. Only the first call
/// in a process has any effect.
pub fn init_with(config: ObservabilityConfig) {
    INIT.get_or_init(|| {
        if !config.enabled {
            return;
        }
        let filter = config.env_filter();
        match &config.output {
            LogOutput::JsonFile(path) => {
                let dir = path
                    .parent()
                    .filter(|parent| !parent.as_os_str().is_empty())
                    .map_or_else(|| PathBuf::from("."), PathBuf::from);
                let _ = std::fs::create_dir_all(&dir);
                let file_name = path
                    .file_name()
                    .map_or_else(|| "callback-stream.jsonl".into(), |name| name.to_owned());
                let layer = tracing_subscriber::fmt::layer()
                    .json()
                    .with_target(false)
                    .with_writer(tracing_appender::rolling::never(dir, file_name));
                let _ = tracing_subscriber::registry().with(filter).with(layer).try_init();
            }
            LogOutput::Stderr => {
                let layer = tracing_subscriber::fmt::layer()
                    .compact()
                    .with_target(false)
                    .with_writer(std::io::stderr);
                let _ = tracing_subscriber::registry().with(filter).with(layer).try_init();
            }
        }
    });
}
