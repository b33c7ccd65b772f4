use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use civiqa_models::{
    AgentConfig, AnswerReport, ExecutionRecord, IterationRecord, RunTrace, StopReason, ToolCall,
    TRACE_SCHEMA_VERSION,
};
use civiqa_tools::ToolRegistry;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::AgentError;
use crate::extract::{contains_marker, extract_tool_call};
use crate::llm::LanguageModel;
use crate::prompts::{get_prompt_builder, synthesis_prompt, tool_use_reasoned, PromptBuilder};

/// Leading characters of model text kept in the per-iteration trace.
const EXCERPT_LEN: usize = 200;

/// Where one question's run currently stands. The driver advances through
/// these states one transition at a time; the transition rules live in
/// free functions below so each one can be exercised in isolation.
#[derive(Debug, Clone, PartialEq)]
pub enum RunState {
    /// Waiting for model text for the current iteration.
    AwaitingLlm,
    /// A call was extracted from the model text. Not yet checked against
    /// already-executed calls.
    HaveToolCall(ToolCall),
    /// The call passed the duplicate check and goes to the registry.
    ExecutingTool(ToolCall),
    /// The result is accumulated; decide whether to iterate again.
    HaveResult,
    /// Stop asking for tools and compose the final answer.
    Synthesizing(StopReason),
    /// The run produced its answer text.
    Done(StopReason),
}

/// Transition out of `AwaitingLlm` given the model's raw text.
///
/// No marker means the text is the answer. A marker that yields nothing
/// extractable means the model tried to call a tool and garbled it, so
/// the run falls back to synthesizing from whatever is accumulated.
fn next_after_text(text: &str) -> RunState {
    if !contains_marker(text) {
        return RunState::Done(StopReason::DirectAnswer);
    }
    match extract_tool_call(text) {
        Some(call) => RunState::HaveToolCall(call),
        None => RunState::Synthesizing(StopReason::ExtractionFailed),
    }
}

/// Transition out of `HaveToolCall`: execute fresh calls, stop on exact
/// repeats. Identity is the (name, key-sorted arguments) pair, so argument
/// order never defeats the check.
fn next_after_call(call: ToolCall, executed: &HashSet<(String, String)>) -> RunState {
    if executed.contains(&call.dedup_key()) {
        RunState::Synthesizing(StopReason::DuplicateCall)
    } else {
        RunState::ExecutingTool(call)
    }
}

/// Transition out of `HaveResult`: iterate again or force synthesis. The
/// call cap wins over the clock when both are exceeded. The clock check
/// here is the only timeout in the loop; a slow tool or model call is
/// never interrupted mid-flight.
fn next_after_result(executed: u32, cap: u32, elapsed: Duration, budget: Duration) -> RunState {
    if executed >= cap {
        RunState::Synthesizing(StopReason::MaxIterations)
    } else if elapsed > budget {
        RunState::Synthesizing(StopReason::Timeout)
    } else {
        RunState::AwaitingLlm
    }
}

fn stop_phrase(stop: StopReason) -> &'static str {
    match stop {
        StopReason::DirectAnswer => "the model answered directly",
        StopReason::MaxIterations => "the tool call limit was reached",
        StopReason::Timeout => "the time budget ran out",
        StopReason::DuplicateCall => "the model repeated a tool call",
        StopReason::ExtractionFailed => "the tool request could not be understood",
    }
}

/// Answer text when synthesis has nothing to work from.
fn no_data_answer(stop: StopReason) -> String {
    format!(
        "I could not retrieve any data for this question: {}.",
        stop_phrase(stop)
    )
}

fn excerpt(text: &str) -> String {
    let trimmed = text.trim();
    match trimmed.char_indices().nth(EXCERPT_LEN) {
        Some((idx, _)) => format!("{}...", &trimmed[..idx]),
        None => trimmed.to_string(),
    }
}

/// Drives the ask/extract/dispatch loop for one question at a time and
/// produces an [`AnswerReport`] with the full run trace.
pub struct Orchestrator {
    model: Arc<dyn LanguageModel>,
    registry: Arc<ToolRegistry>,
    config: AgentConfig,
    prompt: PromptBuilder,
}

impl Orchestrator {
    pub fn new(
        model: Arc<dyn LanguageModel>,
        registry: Arc<ToolRegistry>,
        config: AgentConfig,
    ) -> Self {
        let prompt = match get_prompt_builder(&config.prompt_variant) {
            Some(builder) => builder,
            None => {
                warn!(
                    variant = %config.prompt_variant,
                    "Unknown prompt variant, falling back to tool_use_reasoned"
                );
                tool_use_reasoned
            }
        };
        Self {
            model,
            registry,
            config,
            prompt,
        }
    }

    /// Run the loop for one question. Tool-level problems (unknown names,
    /// bad parameters, missing data) accumulate as formatted error results
    /// and never abort the run; only model failure is fatal.
    pub async fn answer_question(&self, question: &str) -> Result<AnswerReport, AgentError> {
        let start = Instant::now();
        let budget = Duration::from_secs(self.config.run_timeout_seconds);
        info!(model = %self.model.model_name(), "Answering question");

        let definitions = self.registry.all_tool_definitions();
        let mut results = Vec::new();
        let mut executed: HashSet<(String, String)> = HashSet::new();
        let mut executed_count: u32 = 0;
        let mut iterations: Vec<IterationRecord> = Vec::new();
        let mut record: Option<IterationRecord> = None;
        let mut answer = String::new();

        let mut state = RunState::AwaitingLlm;
        let stop = loop {
            state = match state {
                RunState::AwaitingLlm => {
                    let iteration = iterations.len() as u32 + 1;
                    let prompt = (self.prompt)(question, &definitions, &results);
                    let text = self.model.generate(&prompt).await?;
                    debug!(iteration, response_len = text.len(), "Model responded");

                    let mut rec = IterationRecord {
                        iteration,
                        model_excerpt: excerpt(&text),
                        tool_call: None,
                        execution: None,
                        reused_prior: false,
                    };
                    let next = next_after_text(&text);
                    match &next {
                        RunState::Done(_) => {
                            info!(iteration, "Model answered directly");
                            answer = text.trim().to_string();
                        }
                        RunState::Synthesizing(_) => {
                            warn!(iteration, "Tool marker present but no call extracted");
                        }
                        RunState::HaveToolCall(call) => {
                            rec.tool_call = Some(call.clone());
                        }
                        _ => {}
                    }
                    record = Some(rec);
                    next
                }

                RunState::HaveToolCall(call) => {
                    let next = next_after_call(call, &executed);
                    if let RunState::Synthesizing(StopReason::DuplicateCall) = next {
                        if let Some(rec) = record.as_mut() {
                            rec.reused_prior = true;
                        }
                        info!("Duplicate tool call, reusing the prior result");
                    }
                    next
                }

                RunState::ExecutingTool(call) => {
                    let tool_start = Instant::now();
                    let result = self.registry.dispatch(&call);
                    let elapsed_ms = tool_start.elapsed().as_millis() as u64;
                    executed.insert(call.dedup_key());
                    executed_count += 1;

                    match result.structured.error_text() {
                        Some(error) => {
                            warn!(tool = %call.name, %error, elapsed_ms, "Tool call failed")
                        }
                        None => info!(tool = %call.name, elapsed_ms, "Tool call succeeded"),
                    }
                    if let Some(rec) = record.as_mut() {
                        rec.execution = Some(ExecutionRecord {
                            tool_name: result.tool_name.clone(),
                            arguments: result.arguments.clone(),
                            error: result.structured.error_text(),
                            formatted: result.formatted.clone(),
                            elapsed_ms,
                        });
                    }
                    results.push(result);
                    RunState::HaveResult
                }

                RunState::HaveResult => {
                    if let Some(rec) = record.take() {
                        iterations.push(rec);
                    }
                    next_after_result(
                        executed_count,
                        self.config.max_tool_iterations,
                        start.elapsed(),
                        budget,
                    )
                }

                RunState::Synthesizing(stop) => {
                    if let Some(rec) = record.take() {
                        iterations.push(rec);
                    }
                    answer = self.synthesize(question, &results, stop).await?;
                    RunState::Done(stop)
                }

                RunState::Done(stop) => {
                    if let Some(rec) = record.take() {
                        iterations.push(rec);
                    }
                    break stop;
                }
            };
        };

        let processing_time_ms = start.elapsed().as_millis() as u64;
        info!(
            stop = ?stop,
            iterations = iterations.len(),
            tool_calls = executed_count,
            elapsed_ms = processing_time_ms,
            "Run complete"
        );

        Ok(AnswerReport {
            id: Uuid::new_v4(),
            schema_version: TRACE_SCHEMA_VERSION,
            question: question.to_string(),
            answer,
            answered_at: Utc::now(),
            trace: RunTrace {
                iterations,
                stop,
                timeout_truncated: stop == StopReason::Timeout,
                tool_calls_executed: executed_count,
            },
            processing_time_ms,
        })
    }

    /// One final model call over every accumulated result, in call order.
    /// With nothing accumulated there is nothing to synthesize, so the
    /// canned no-data answer goes out without a model round-trip.
    async fn synthesize(
        &self,
        question: &str,
        results: &[civiqa_models::ToolResult],
        stop: StopReason,
    ) -> Result<String, AgentError> {
        if results.is_empty() {
            return Ok(no_data_answer(stop));
        }
        debug!(results = results.len(), stop = ?stop, "Synthesizing final answer");
        let prompt = synthesis_prompt(question, results);
        let text = self.model.generate(&prompt).await?;
        Ok(text.trim().to_string())
    }
}
