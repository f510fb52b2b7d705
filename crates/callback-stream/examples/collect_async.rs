use std::time::Duration;

use callback_stream::prelude::*;
use futures::StreamExt as _;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), StreamError> {
    let session = StreamSession::open(
        SessionConfig::named("collect")
            .stream(StreamConfig::default().timeout(Duration::from_secs(2))),
    )?;
    let (handler, stream) = session.into_parts();

    let engine = tokio::task::spawn_blocking(move || {
        handler.on_stage_start("AgentExecutor");
        handler.on_step_action("Looking it up");
        handler.on_step_result("42", Some("Observation: "), None);
        handler.on_pipeline_finish("Final Answer: 42");
    });

    let events = stream.into_async_stream();
    futures::pin_mut!(events);
    while let Some(record) = events.next().await {
        let record = record?;
        println!("{:>5} | {}", record.source(), record.text());
    }

    let _ = engine.await;
    Ok(())
}
