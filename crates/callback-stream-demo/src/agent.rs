//! Scripted ReAct-style agent that drives the pipeline hooks.
//!
//! Stands in for a real pipeline engine: it walks a fixed list of LLM
//! responses, runs one fake tool per action, and reports every lifecycle
//! moment through `PipelineCallbacks`.

use std::time::Duration;

use callback_stream::PipelineCallbacks;
use tracing::debug;

/// One canned LLM turn.
#[derive(Clone, Debug)]
pub enum Turn {
    /// Call a tool and feed the observation back.
    Action {
        thought: String,
        tool: String,
        input: String,
    },
    /// Stop with a final answer.
    Finish { thought: String, answer: String },
}

impl Turn {
    fn log(&self) -> String {
        match self {
            Self::Action {
                thought,
                tool,
                input,
            } => format!("{thought}\nAction: {tool}\nAction Input: {input}"),
            Self::Finish { thought, answer } => format!("{thought}\nFinal Answer: {answer}"),
        }
    }
}

/// Options for one scripted run.
#[derive(Clone, Debug)]
pub struct AgentScript {
    pub question: String,
    pub turns: Vec<Turn>,
    /// Delay between hooks, to make the stream visibly incremental.
    pub step_delay: Duration,
    /// Skip the terminal hook so the reader hits its idle timeout.
    pub stall: bool,
}

impl AgentScript {
    /// The two-turn search-then-answer run used by the demo.
    pub fn search_demo(question: impl Into<String>) -> Self {
        let question = question.into();
        Self {
            turns: vec![
                Turn::Action {
                    thought: format!("I need to search for {question}"),
                    tool: "Search".into(),
                    input: question.clone(),
                },
                Turn::Finish {
                    thought: "I now know the final answer".into(),
                    answer: format!("{question} is a framework for building pipelines."),
                },
            ],
            question,
            step_delay: Duration::ZERO,
            stall: false,
        }
    }

    pub fn step_delay(mut self, delay: Duration) -> Self {
        self.step_delay = delay;
        self
    }

    pub fn stall(mut self, stall: bool) -> Self {
        self.stall = stall;
        self
    }

    /// Runs the script to completion on the calling thread.
    pub fn run(&self, callbacks: &dyn PipelineCallbacks) {
        let pause = || {
            if !self.step_delay.is_zero() {
                std::thread::sleep(self.step_delay);
            }
        };

        callbacks.on_stage_start("AgentExecutor");
        for (index, turn) in self.turns.iter().enumerate() {
            debug!(turn = index, "agent turn");
            callbacks.on_stage_start("LLMChain");
            pause();
            callbacks.on_free_text(&format!(
                "Prompt after formatting:\nQuestion: {}",
                self.question
            ));
            pause();
            callbacks.on_stage_end();

            match turn {
                Turn::Action { tool, input, .. } => {
                    callbacks.on_step_action(&turn.log());
                    pause();
                    let observation = run_tool(tool, input);
                    callbacks.on_step_result(&observation, Some("\nObservation: "), Some("Thought: "));
                    pause();
                }
                Turn::Finish { .. } => {
                    if self.stall {
                        debug!("stalling before the terminal hook");
                        return;
                    }
                    callbacks.on_pipeline_finish(&turn.log());
                    callbacks.on_stage_end();
                    return;
                }
            }
        }
    }
}

fn run_tool(tool: &str, input: &str) -> String {
    match tool {
        "Search" => format!("{input}: a library that chains model calls and tools together."),
        other => format!("{other} is not a valid tool."),
    }
}
