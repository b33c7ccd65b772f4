//! Integration tests for the question-answering loop.
//!
//! Each test scripts the model's responses, runs `answer_question` against
//! a registry loaded with the fixture datasets, then checks the answer,
//! the stop reason, and the prompts the loop actually sent. No network:
//! `ScriptedModel` stands in for the live endpoint.

use std::sync::Arc;

use civiqa_agent::test_support::{fixture_registry, tool_call_line, ScriptedModel};
use civiqa_agent::Orchestrator;
use civiqa_models::{AgentConfig, AnswerReport, StopReason, TRACE_SCHEMA_VERSION};
use serde_json::json;

fn orchestrator(model: Arc<ScriptedModel>) -> Orchestrator {
    orchestrator_with(model, AgentConfig::default())
}

fn orchestrator_with(model: Arc<ScriptedModel>, config: AgentConfig) -> Orchestrator {
    Orchestrator::new(model, Arc::new(fixture_registry().unwrap()), config)
}

// ============================================================
// Scenario 1: Single-tool count question
// Model calls query_homicides_advanced for 2023, sees the result,
// answers directly.
// Expected: DirectAnswer, one execution, result text fed back
// ============================================================

#[tokio::test]
async fn scenario_single_tool_count() {
    let model = Arc::new(ScriptedModel::new([
        tool_call_line(
            "query_homicides_advanced",
            json!({"start_year": 2023, "end_year": 2023}),
        ),
        "There were 7 homicides recorded in 2023.".to_string(),
    ]));
    let orchestrator = orchestrator(model.clone());

    let report = orchestrator
        .answer_question("How many homicides were there in 2023?")
        .await
        .unwrap();

    println!("Scenario 1 (Single Tool): answer = {}", report.answer);

    assert_eq!(report.answer, "There were 7 homicides recorded in 2023.");
    assert_eq!(report.trace.stop, StopReason::DirectAnswer);
    assert_eq!(report.trace.tool_calls_executed, 1);
    assert_eq!(report.trace.iterations.len(), 2);

    let first = &report.trace.iterations[0];
    assert_eq!(
        first.tool_call.as_ref().unwrap().name,
        "query_homicides_advanced"
    );
    let execution = first.execution.as_ref().unwrap();
    assert!(execution.error.is_none());
    assert!(execution.formatted.contains("Total matches: 7"));
    assert!(report.trace.iterations[1].tool_call.is_none());

    // The second prompt must carry the first result back to the model.
    let prompts = model.prompts().await;
    assert_eq!(prompts.len(), 2);
    assert!(prompts[1].contains("You have already called"));
    assert!(prompts[1].contains("--- Tool Call 1: query_homicides_advanced ---"));
    assert!(prompts[1].contains("Total matches: 7"));
}

// ============================================================
// Scenario 2: Cross-domain question
// Homicide counts for Austin, then census population, then a
// combined answer.
// Expected: two executions, both results in the third prompt
// ============================================================

#[tokio::test]
async fn scenario_cross_domain_homicides_and_census() {
    let model = Arc::new(ScriptedModel::new([
        tool_call_line("query_homicides_advanced", json!({"community_area": 25})),
        tool_call_line(
            "query_census_demographics",
            json!({"community_area": "Austin", "metric": "population"}),
        ),
        "Austin recorded 5 homicides among 96,557 residents.".to_string(),
    ]));
    let orchestrator = orchestrator(model.clone());

    let report = orchestrator
        .answer_question("What is the homicide rate per capita in Austin?")
        .await
        .unwrap();

    println!("Scenario 2 (Cross Domain): answer = {}", report.answer);

    assert_eq!(report.trace.stop, StopReason::DirectAnswer);
    assert_eq!(report.trace.tool_calls_executed, 2);
    assert_eq!(report.trace.iterations.len(), 3);

    let prompts = model.prompts().await;
    assert_eq!(prompts.len(), 3);
    let first = prompts[2]
        .find("--- Tool Call 1: query_homicides_advanced ---")
        .unwrap();
    let second = prompts[2]
        .find("--- Tool Call 2: query_census_demographics ---")
        .unwrap();
    assert!(first < second);
    assert!(prompts[2].contains("Total matches:"));
    assert!(prompts[2].contains("Austin (population 96,557)"));
}

// ============================================================
// Scenario 3: Tool-happy model hits the call cap
// Four distinct calls in a row; the loop forces synthesis instead
// of asking for a fifth.
// Expected: MaxIterations, 4 executions, 5 model calls, last
// prompt is the synthesis prompt over all four results
// ============================================================

#[tokio::test]
async fn scenario_call_cap_forces_synthesis() {
    let model = Arc::new(ScriptedModel::new([
        tool_call_line("query_homicides_advanced", json!({"start_year": 2023})),
        tool_call_line("get_homicide_statistics", json!({})),
        tool_call_line("query_socioeconomic", json!({"metric": "hardship", "top_n": 3})),
        tool_call_line("query_census_demographics", json!({"top_n": 3})),
        "Combining all four datasets: homicides concentrate where hardship is highest."
            .to_string(),
    ]));
    let orchestrator = orchestrator(model.clone());

    let report = orchestrator
        .answer_question("How do homicides relate to hardship and population?")
        .await
        .unwrap();

    println!("Scenario 3 (Call Cap): stop = {:?}", report.trace.stop);

    assert_eq!(report.trace.stop, StopReason::MaxIterations);
    assert_eq!(report.trace.tool_calls_executed, 4);
    assert_eq!(report.trace.iterations.len(), 4);
    assert!(report.answer.starts_with("Combining all four datasets"));

    let prompts = model.prompts().await;
    assert_eq!(prompts.len(), 5);
    let synthesis = prompts.last().unwrap();
    assert!(synthesis.starts_with("Based on the following data from multiple tools:"));
    assert!(synthesis.contains("--- query_homicides_advanced ---"));
    assert!(synthesis.contains("--- get_homicide_statistics ---"));
    assert!(synthesis.contains("--- query_socioeconomic ---"));
    assert!(synthesis.contains("--- query_census_demographics ---"));
    assert!(synthesis
        .contains("Please answer the original question: \"How do homicides relate to hardship and population?\""));
}

// ============================================================
// Scenario 4: Hallucinated tool name
// query_weather does not exist; the error is fed back and the
// model recovers with a direct answer.
// Expected: run completes, execution recorded with error text
// ============================================================

#[tokio::test]
async fn scenario_unknown_tool_recovers() {
    let model = Arc::new(ScriptedModel::new([
        tool_call_line("query_weather", json!({"city": "Chicago"})),
        "I do not have weather data; I can only answer civic-data questions.".to_string(),
    ]));
    let orchestrator = orchestrator(model.clone());

    let report = orchestrator
        .answer_question("What is the weather in Chicago?")
        .await
        .unwrap();

    println!("Scenario 4 (Unknown Tool): answer = {}", report.answer);

    assert_eq!(report.trace.stop, StopReason::DirectAnswer);
    assert_eq!(report.trace.tool_calls_executed, 1);

    let execution = report.trace.iterations[0].execution.as_ref().unwrap();
    let error = execution.error.as_ref().unwrap();
    assert!(error.contains("Tool 'query_weather' not found"));
    assert!(execution.formatted.starts_with("Error:"));

    // The model sees the error text, not a silent drop.
    let prompts = model.prompts().await;
    assert!(prompts[1].contains("Error: Tool 'query_weather' not found"));
    assert!(prompts[1].contains("Available tools:"));
}

// ============================================================
// Scenario 5: Repeated call stops the loop
// The same call twice, argument order shuffled the second time.
// Expected: DuplicateCall, one execution, second iteration marked
// reused_prior, synthesis over the single result
// ============================================================

#[tokio::test]
async fn scenario_duplicate_call_is_not_re_executed() {
    let model = Arc::new(ScriptedModel::new([
        tool_call_line(
            "query_homicides_advanced",
            json!({"start_year": 2023, "end_year": 2023}),
        ),
        // Same arguments, different key order in the raw text.
        r#"TOOL_CALL: {"name": "query_homicides_advanced", "arguments": {"start_year": 2023, "end_year": 2023}}"#
            .to_string(),
        "In 2023 there were 7 homicides.".to_string(),
    ]));
    let orchestrator = orchestrator(model.clone());

    let report = orchestrator
        .answer_question("How many homicides in 2023?")
        .await
        .unwrap();

    println!("Scenario 5 (Duplicate Call): stop = {:?}", report.trace.stop);

    assert_eq!(report.trace.stop, StopReason::DuplicateCall);
    assert_eq!(report.trace.tool_calls_executed, 1);
    assert_eq!(report.trace.iterations.len(), 2);
    assert!(!report.trace.iterations[0].reused_prior);
    assert!(report.trace.iterations[1].reused_prior);
    assert!(report.trace.iterations[1].execution.is_none());
    assert_eq!(report.answer, "In 2023 there were 7 homicides.");

    // Two loop prompts plus the synthesis prompt.
    assert_eq!(model.calls().await, 3);
}

// ============================================================
// Scenario 6: Zero time budget
// One tool call executes, then the clock check trips before the
// next iteration.
// Expected: Timeout, timeout_truncated, synthesis over one result
// ============================================================

#[tokio::test]
async fn scenario_zero_budget_truncates_after_first_call() {
    let model = Arc::new(ScriptedModel::new([
        tool_call_line("get_homicide_statistics", json!({})),
        "Partial answer from statistics alone: 20 homicides on record.".to_string(),
    ]));
    let config = AgentConfig {
        run_timeout_seconds: 0,
        ..AgentConfig::default()
    };
    let orchestrator = orchestrator_with(model.clone(), config);

    let report = orchestrator
        .answer_question("Summarize homicide statistics.")
        .await
        .unwrap();

    println!("Scenario 6 (Zero Budget): stop = {:?}", report.trace.stop);

    assert_eq!(report.trace.stop, StopReason::Timeout);
    assert!(report.trace.timeout_truncated);
    assert_eq!(report.trace.tool_calls_executed, 1);
    assert!(report.answer.contains("20 homicides"));

    let prompts = model.prompts().await;
    assert_eq!(prompts.len(), 2);
    assert!(prompts[1].starts_with("Based on the following data from multiple tools:"));
    assert!(prompts[1].contains("Homicide Statistics"));
}

// ============================================================
// Scenario 7: Conceptual question needs no tools
// Expected: DirectAnswer on the first iteration; the prompt still
// catalogs every registered tool
// ============================================================

#[tokio::test]
async fn scenario_direct_answer_without_tools() {
    let model = Arc::new(ScriptedModel::new([
        "A community area is one of Chicago's 77 statistical divisions.".to_string(),
    ]));
    let orchestrator = orchestrator(model.clone());

    let report = orchestrator
        .answer_question("What is a community area?")
        .await
        .unwrap();

    println!("Scenario 7 (No Tools): answer = {}", report.answer);

    assert_eq!(report.trace.stop, StopReason::DirectAnswer);
    assert_eq!(report.trace.tool_calls_executed, 0);
    assert_eq!(model.calls().await, 1);

    let prompts = model.prompts().await;
    for tool in [
        "query_homicides_advanced",
        "search_by_location",
        "get_iucr_info",
        "get_homicide_statistics",
        "query_census_demographics",
        "query_socioeconomic",
        "query_property_values",
    ] {
        assert!(prompts[0].contains(tool), "catalog missing {tool}");
    }
    assert!(prompts[0].ends_with("User question: What is a community area?"));
}

// ============================================================
// Scenario 8: Missing required parameter, model corrects itself
// search_by_location without location fails; the error round-trips
// and the retry with the parameter succeeds.
// Expected: two executions, first with error, second clean
// ============================================================

#[tokio::test]
async fn scenario_missing_parameter_round_trip() {
    let model = Arc::new(ScriptedModel::new([
        tool_call_line("search_by_location", json!({})),
        tool_call_line("search_by_location", json!({"location": "STATE ST"})),
        "Two of the recorded homicides occurred on State Street blocks.".to_string(),
    ]));
    let orchestrator = orchestrator(model.clone());

    let report = orchestrator
        .answer_question("Were there homicides on State Street?")
        .await
        .unwrap();

    println!("Scenario 8 (Missing Parameter): answer = {}", report.answer);

    assert_eq!(report.trace.stop, StopReason::DirectAnswer);
    assert_eq!(report.trace.tool_calls_executed, 2);

    let first = report.trace.iterations[0].execution.as_ref().unwrap();
    assert!(first
        .error
        .as_ref()
        .unwrap()
        .contains("requires parameter 'location'"));
    let second = report.trace.iterations[1].execution.as_ref().unwrap();
    assert!(second.error.is_none());
    assert!(second.formatted.contains("Location Search: \"STATE ST\""));
    assert!(second.formatted.contains("Total matches: 2"));

    let prompts = model.prompts().await;
    assert!(prompts[1].contains("Error: Tool 'search_by_location' requires parameter 'location'"));
}

// ============================================================
// Verify the report structure is complete and round-trips
// ============================================================

#[tokio::test]
async fn report_structure_complete() {
    let model = Arc::new(ScriptedModel::new([
        tool_call_line("get_homicide_statistics", json!({})),
        "20 homicides on record between 2019 and 2023.".to_string(),
    ]));
    let orchestrator = orchestrator(model);

    let report = orchestrator
        .answer_question("How many homicides are on record?")
        .await
        .unwrap();

    assert_eq!(report.schema_version, TRACE_SCHEMA_VERSION);
    assert_eq!(report.question, "How many homicides are on record?");
    assert!(!report.answer.is_empty());
    assert!(!report.trace.iterations.is_empty());

    // The report should round-trip through JSON.
    let json = serde_json::to_string_pretty(&report).unwrap();
    let parsed: AnswerReport = serde_json::from_str(&json).unwrap();
    assert_eq!(report.id, parsed.id);
    assert_eq!(report.answer, parsed.answer);
    assert_eq!(report.trace.stop, parsed.trace.stop);
    assert_eq!(
        report.trace.tool_calls_executed,
        parsed.trace.tool_calls_executed
    );

    println!("Full AnswerReport JSON:\n{json}");
}
