//! Prompt builders for the tool-calling loop.
//!
//! Two registered variants share the same skeleton: tool catalog,
//! guideline list, marker-format contract, accumulated prior results, and
//! worked examples. `tool_use_reasoned` additionally asks the model to
//! state one sentence of reasoning before each call.

use civiqa_models::{ToolDefinition, ToolResult};

/// Signature shared by all registered prompt variants.
pub type PromptBuilder = fn(&str, &[ToolDefinition], &[ToolResult]) -> String;

/// One catalog line per tool: name, description, and a parameter summary
/// with "(required)" hints.
fn summarize_tool(def: &ToolDefinition) -> String {
    if def.params.is_empty() {
        return format!("- {}: {}", def.name, def.description);
    }
    let params: Vec<String> = def
        .params
        .iter()
        .map(|p| {
            if p.required {
                format!("{}: {} (required)", p.name, p.description)
            } else {
                format!("{}: {}", p.name, p.description)
            }
        })
        .collect();
    format!(
        "- {}: {}\n  Parameters: {}",
        def.name,
        def.description,
        params.join("; ")
    )
}

fn tool_catalog(definitions: &[ToolDefinition]) -> String {
    if definitions.is_empty() {
        return "- No tools available".to_string();
    }
    definitions
        .iter()
        .map(summarize_tool)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Accumulated results block for iterations after the first, ending with
/// the stop-or-continue instruction. Empty on the first iteration.
fn prior_results_section(prior: &[ToolResult]) -> String {
    if prior.is_empty() {
        return String::new();
    }
    let mut parts =
        vec!["You have already called the following tools and received these results:\n".to_string()];
    for (idx, result) in prior.iter().enumerate() {
        parts.push(format!("--- Tool Call {}: {} ---", idx + 1, result.tool_name));
        parts.push(result.formatted.clone());
        parts.push(String::new());
    }
    parts.push(
        "If you need additional data from a DIFFERENT tool, emit another TOOL_CALL.\n\
         If you have enough data to answer, respond directly and do NOT emit TOOL_CALL.\n\n"
            .to_string(),
    );
    parts.join("\n")
}

const MARKER_CONTRACT: &str =
    "When a tool is required respond ONLY with a JSON object prefixed by 'TOOL_CALL:' on the same line.\n\
     Format: TOOL_CALL: {\"name\": \"tool_name\", \"arguments\": {...}}";

pub fn tool_use_v1(question: &str, definitions: &[ToolDefinition], prior: &[ToolResult]) -> String {
    let guidelines = "\
- You can call tools iteratively: after each tool result you will be prompted again. Call another tool if more data is needed to fully answer the question.
- Use `query_homicides_advanced` for homicide counts, trends, rankings, or filtered views.
- Use `search_by_location` for questions about specific streets, blocks, or place types.
- Use `get_iucr_info` for IUCR code explanations or taxonomy questions.
- Use `query_census_demographics` for population, income, race, or age data for community areas.
- Use `query_socioeconomic` for poverty rates, unemployment, crowded housing, dependency, or hardship indices.
- Use `query_property_values` for home prices, sales volume, and property value trends (township-level data).
- For cross-domain questions (e.g., 'homicide rate per capita'), call multiple tools in sequence: first homicides, then census for population, then synthesize.
- Do NOT repeat a tool call with the same arguments; the data is already available in the prior results.
- Always include `start_year`/`end_year` when a user references a specific year for homicide queries.
- For 'which/what had the most' style questions set `group_by` to ward, district, community_area, or location as appropriate.
- Supply integers for numeric parameters and `true`/`false` for booleans.
- When you have enough data to answer, respond with your analysis and do NOT call another tool.";

    let examples = r#"- Question: "How many homicides in 2023?"
  TOOL_CALL: {"name": "query_homicides_advanced", "arguments": {"start_year": 2023, "end_year": 2023}}
- Question: "What is the population of Austin?"
  TOOL_CALL: {"name": "query_census_demographics", "arguments": {"community_area": "Austin", "metric": "population"}}
- Question: "Which areas have the highest hardship index?"
  TOOL_CALL: {"name": "query_socioeconomic", "arguments": {"metric": "hardship", "top_n": 5}}
- Question: "What are average home prices in Lincoln Park?"
  TOOL_CALL: {"name": "query_property_values", "arguments": {"community_area": "Lincoln Park", "metric": "avg_price"}}"#;

    format!(
        "You are a multi-domain data analyst for Chicago.\n\
         You have access to tools covering homicides, census demographics, \
         socioeconomic indicators, and property sales.\n\
         Use the provided tools to ground your answers in factual statistics.\n\n\
         Available tools:\n{tools}\n\n\
         Guidelines for tool usage:\n{guidelines}\n\n\
         {MARKER_CONTRACT}\n\n\
         {prior}Examples:\n{examples}\n\n\
         If no more tools are needed, answer the question directly using any data already provided.\n\n\
         User question: {question}",
        tools = tool_catalog(definitions),
        prior = prior_results_section(prior),
    )
}

pub fn tool_use_reasoned(
    question: &str,
    definitions: &[ToolDefinition],
    prior: &[ToolResult],
) -> String {
    let guidelines = "\
- You can call tools iteratively: after each tool result you will be prompted again. Call another tool only if you still need more data.
- State the reasoning for the chosen tool before the TOOL_CALL: line.
- Map user questions about homicide counts or rankings to `query_homicides_advanced`.
- Map street, block, or place questions to `search_by_location`.
- Map IUCR code questions to `get_iucr_info`.
- Map demographics/population questions to `query_census_demographics`.
- Map poverty/hardship/socioeconomic questions to `query_socioeconomic`.
- Map home price/property value questions to `query_property_values`.
- For cross-domain questions, call one tool at a time; you will get the result and can call another.
- Do NOT repeat a tool call with identical arguments.
- After executing tool(s), synthesize a clear answer by combining all results.
- Use `group_by` whenever the user asks for \"which\" entity had the most or for top-N rankings.";

    let examples = r#"- Reasoning: "Need filtered homicide stats for 2023."
  TOOL_CALL: {"name": "query_homicides_advanced", "arguments": {"start_year": 2023, "end_year": 2023}}
- Reasoning: "Need population to compute per-capita rate."
  TOOL_CALL: {"name": "query_census_demographics", "arguments": {"community_area": "Austin", "metric": "population"}}
- Reasoning: "User wants socioeconomic hardship ranking."
  TOOL_CALL: {"name": "query_socioeconomic", "arguments": {"metric": "hardship", "top_n": 5}}
- Reasoning: "User asks about property values in area."
  TOOL_CALL: {"name": "query_property_values", "arguments": {"community_area": "Lincoln Park", "metric": "avg_price"}}"#;

    format!(
        "You are an expert multi-domain data analyst for Chicago.\n\
         You have access to tools covering homicides, census demographics, \
         socioeconomic indicators, and property sales.\n\
         Before selecting a tool, briefly reflect on the user's goal and required parameters.\n\
         Keep the reflection concise (one sentence) then respond with the tool call if needed.\n\n\
         Available tools:\n{tools}\n\n\
         Reasoning and tool usage rules:\n{guidelines}\n\n\
         {MARKER_CONTRACT}\n\n\
         {prior}Examples:\n{examples}\n\n\
         If no more tools are needed, answer the question directly using any data already provided.\n\n\
         User question: {question}",
        tools = tool_catalog(definitions),
        prior = prior_results_section(prior),
    )
}

/// Look up a registered prompt variant by name.
pub fn get_prompt_builder(variant: &str) -> Option<PromptBuilder> {
    match variant {
        "tool_use_v1" => Some(tool_use_v1),
        "tool_use_reasoned" => Some(tool_use_reasoned),
        _ => None,
    }
}

/// Final-answer prompt combining every accumulated result in call order.
pub fn synthesis_prompt(question: &str, results: &[ToolResult]) -> String {
    let sections: Vec<String> = results
        .iter()
        .map(|r| format!("--- {} ---\n{}", r.tool_name, r.formatted))
        .collect();
    format!(
        "Based on the following data from multiple tools:\n\n\
         {data}\n\n\
         Please answer the original question: \"{question}\"\n\n\
         Provide a clear, informative answer combining all available data. \
         If some data is missing or approximate, note that.",
        data = sections.join("\n\n"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use civiqa_models::{ParamType, ToolOutcome, ToolParam};
    use serde_json::json;

    fn sample_definitions() -> Vec<ToolDefinition> {
        vec![
            ToolDefinition::new(
                "query_homicides_advanced",
                "Query homicide records",
                vec![
                    ToolParam::optional("start_year", ParamType::Integer, "First year"),
                    ToolParam::optional("group_by", ParamType::String, "Grouping column"),
                ],
            ),
            ToolDefinition::new(
                "search_by_location",
                "Search by street or place",
                vec![ToolParam::required(
                    "location",
                    ParamType::String,
                    "Street text",
                )],
            ),
        ]
    }

    fn sample_result(tool: &str, formatted: &str) -> ToolResult {
        ToolResult {
            tool_name: tool.to_string(),
            arguments: json!({}),
            structured: ToolOutcome::data(json!({})),
            formatted: formatted.to_string(),
        }
    }

    #[test]
    fn catalog_lists_parameters_with_required_hint() {
        let catalog = tool_catalog(&sample_definitions());
        assert!(catalog.contains("- query_homicides_advanced: Query homicide records"));
        assert!(catalog.contains("start_year: First year; group_by: Grouping column"));
        assert!(catalog.contains("location: Street text (required)"));
    }

    #[test]
    fn catalog_without_tools_says_so() {
        assert_eq!(tool_catalog(&[]), "- No tools available");
    }

    #[test]
    fn both_variants_contain_the_contract_and_question() {
        for builder in [tool_use_v1 as PromptBuilder, tool_use_reasoned] {
            let prompt = builder("How many homicides in 2023?", &sample_definitions(), &[]);
            assert!(prompt.contains("TOOL_CALL:"));
            assert!(prompt.contains("Available tools:"));
            assert!(prompt.contains("\"arguments\""));
            assert!(prompt.ends_with("User question: How many homicides in 2023?"));
        }
    }

    #[test]
    fn first_iteration_has_no_prior_results_block() {
        let prompt = tool_use_reasoned("q", &sample_definitions(), &[]);
        assert!(!prompt.contains("You have already called"));
    }

    #[test]
    fn later_iterations_include_prior_results_in_order() {
        let prior = vec![
            sample_result("query_homicides_advanced", "Total matches: 7"),
            sample_result("query_census_demographics", "Population: 96,557"),
        ];
        let prompt = tool_use_reasoned("q", &sample_definitions(), &prior);
        assert!(prompt.contains("You have already called"));
        let first = prompt
            .find("--- Tool Call 1: query_homicides_advanced ---")
            .unwrap();
        let second = prompt
            .find("--- Tool Call 2: query_census_demographics ---")
            .unwrap();
        assert!(first < second);
        assert!(prompt.contains("Total matches: 7"));
        assert!(prompt.contains("do NOT emit TOOL_CALL"));
    }

    #[test]
    fn reasoned_variant_asks_for_reflection() {
        let prompt = tool_use_reasoned("q", &sample_definitions(), &[]);
        assert!(prompt.contains("briefly reflect"));
        assert!(prompt.contains("- Reasoning:"));
    }

    #[test]
    fn v1_examples_are_question_style() {
        let prompt = tool_use_v1("q", &sample_definitions(), &[]);
        assert!(prompt.contains("- Question: \"How many homicides in 2023?\""));
        assert!(prompt.contains(r#"TOOL_CALL: {"name": "query_homicides_advanced""#));
    }

    #[test]
    fn variant_lookup() {
        assert!(get_prompt_builder("tool_use_v1").is_some());
        assert!(get_prompt_builder("tool_use_reasoned").is_some());
        assert!(get_prompt_builder("tool_use_v2").is_none());
    }

    #[test]
    fn synthesis_prompt_sections_and_question() {
        let results = vec![
            sample_result("query_homicides_advanced", "Total matches: 7"),
            sample_result("query_census_demographics", "Population: 96,557"),
        ];
        let prompt = synthesis_prompt("What is the homicide rate in Austin?", &results);
        assert!(prompt.starts_with("Based on the following data from multiple tools:"));
        assert!(prompt.contains("--- query_homicides_advanced ---\nTotal matches: 7"));
        assert!(prompt.contains("--- query_census_demographics ---\nPopulation: 96,557"));
        assert!(prompt.contains(
            "Please answer the original question: \"What is the homicide rate in Austin?\""
        ));
    }
}
