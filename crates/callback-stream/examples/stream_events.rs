use std::time::Duration;

use callback_stream::prelude::*;

fn main() -> Result<(), StreamError> {
    callback_stream::init_observability();

    let session = StreamSession::open(
        SessionConfig::named("stream").stream(
            StreamConfig::default()
                .pause(Duration::from_millis(50))
                .wait_strategy(WaitStrategy::Notify),
        ),
    )?;
    let (handler, stream) = session.into_parts();

    let engine = std::thread::spawn(move || {
        handler.on_stage_start("LLMChain");
        handler.on_free_text("Prompt after formatting");
        handler.on_stage_end();
        handler.on_step_action("I need to search for Rust\nAction: Search\nAction Input: Rust");
        std::thread::sleep(Duration::from_millis(300));
        handler.on_step_result(
            "Rust is a systems language.",
            Some("Observation: "),
            Some("Thought: "),
        );
        handler.on_free_text("I now know the final answer");
        handler.on_pipeline_finish("Final Answer: Rust is a systems language.");
    });

    for record in stream {
        println!("{}", record?);
    }

    let _ = engine.join();
    Ok(())
}
