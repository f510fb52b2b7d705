//! Runs a scripted agent on a worker thread and prints its event stream.

mod agent;

use std::time::Duration;

use anyhow::Context as _;
use callback_stream::prelude::*;
use clap::{Parser, ValueEnum};

use crate::agent::AgentScript;

#[derive(Clone, Copy, Debug, ValueEnum)]
enum WaitArg {
    Poll,
    Notify,
}

impl From<WaitArg> for WaitStrategy {
    fn from(value: WaitArg) -> Self {
        match value {
            WaitArg::Poll => WaitStrategy::Poll,
            WaitArg::Notify => WaitStrategy::Notify,
        }
    }
}

/// Stream a scripted agent run as tagged text events
#[derive(Debug, Parser)]
#[command(name = "callback-stream-demo")]
struct Cli {
    /// Question the scripted agent answers
    #[arg(default_value = "LangChain")]
    question: String,

    /// Polling interval in seconds (defaults to CALLBACK_STREAM_PAUSE_SECS or 0.2)
    #[arg(long)]
    pause: Option<f64>,

    /// Idle timeout in seconds (defaults to CALLBACK_STREAM_TIMEOUT_SECS or 5)
    #[arg(long)]
    timeout: Option<f64>,

    /// How the reader waits for new events
    #[arg(long, value_enum)]
    wait: Option<WaitArg>,

    /// Delay between pipeline hooks in milliseconds
    #[arg(long, default_value_t = 250)]
    step_delay_ms: u64,

    /// Never fire the terminal hook, to show the idle timeout
    #[arg(long)]
    stall: bool,

    /// Print each event as a JSON object
    #[arg(long)]
    json: bool,
}

impl Cli {
    fn stream_config(&self) -> anyhow::Result<StreamConfig> {
        let mut config = StreamConfig::from_env()?;
        if let Some(secs) = self.pause {
            config = config.pause(secs_arg("--pause", secs)?);
        }
        if let Some(secs) = self.timeout {
            config = config.timeout(secs_arg("--timeout", secs)?);
        }
        if let Some(wait) = self.wait {
            config = config.wait_strategy(wait.into());
        }
        Ok(config)
    }
}

fn secs_arg(flag: &str, secs: f64) -> anyhow::Result<Duration> {
    Duration::try_from_secs_f64(secs).with_context(|| format!("{flag}: invalid duration {secs}"))
}

fn main() -> anyhow::Result<()> {
    callback_stream::init_observability();
    let cli = Cli::parse();

    let session =
        StreamSession::open(SessionConfig::named("demo").stream(cli.stream_config()?))?;
    tracing::info!(session_id = %session.id(), question = %cli.question, "starting scripted agent");
    let (handler, stream) = session.into_parts();

    let script = AgentScript::search_demo(cli.question.clone())
        .step_delay(Duration::from_millis(cli.step_delay_ms))
        .stall(cli.stall);
    let engine = std::thread::spawn(move || script.run(&handler));

    for record in stream {
        let record = record?;
        if cli.json {
            println!("{}", serde_json::to_string(&record)?);
        } else {
            println!("{record}");
        }
    }

    engine
        .join()
        .map_err(|_| anyhow::anyhow!("agent thread panicked"))?;
    Ok(())
}
