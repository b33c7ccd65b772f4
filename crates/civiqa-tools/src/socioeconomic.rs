//! Socioeconomic indicators domain over the 2008-2012 ACS hardship table:
//! seven indicators per community area, queried singly or as rankings.

use std::cmp::Ordering;
use std::sync::Arc;

use civiqa_models::{DomainId, ParamType, Record, ToolDefinition, ToolOutcome, ToolParam};
use serde_json::{json, Map, Value};

use crate::areas;
use crate::domain::{thousands, DataDomain, DatasetCell};
use crate::params;

const TOOL: &str = "query_socioeconomic";

const DATA_PERIOD: &str = "2008-2012 ACS estimates";

/// Metric name -> (source column, display label). The hardship index is a
/// published composite; it is read from the table as-is, never derived
/// from the other six columns.
const METRICS: [(&str, &str, &str); 7] = [
    ("income", "per_capita_income_", "Per Capita Income ($)"),
    ("poverty", "percent_households_below_poverty", "% Households Below Poverty"),
    ("unemployment", "percent_aged_16_unemployed", "% Unemployed (16+)"),
    ("education", "percent_aged_25_without_high_school_diploma", "% Without HS Diploma (25+)"),
    ("crowding", "percent_of_housing_crowded", "% Housing Crowded"),
    ("dependency", "percent_aged_under_18_or_over_64", "% Under 18 or Over 64"),
    ("hardship", "hardship_index", "Hardship Index (1-100)"),
];

pub struct SocioeconomicDomain {
    data: Arc<DatasetCell>,
}

impl SocioeconomicDomain {
    pub fn new(data: Arc<DatasetCell>) -> Self {
        Self { data }
    }

    fn query(&self, args: &Map<String, Value>) -> ToolOutcome {
        let area = match params::str_arg(TOOL, args, "community_area") {
            Ok(value) => value,
            Err(outcome) => return outcome,
        };
        let compare = match params::str_list_arg(TOOL, args, "compare_areas") {
            Ok(value) => value.unwrap_or_default(),
            Err(outcome) => return outcome,
        };
        let metric = match params::str_arg(TOOL, args, "metric") {
            Ok(value) => value.unwrap_or_else(|| "all".to_string()),
            Err(outcome) => return outcome,
        };
        let top_n = match params::count_arg(TOOL, args, "top_n", 10) {
            Ok(value) => value,
            Err(outcome) => return outcome,
        };
        let sort_order = match params::str_arg(TOOL, args, "sort_order") {
            Ok(value) => value.unwrap_or_else(|| "highest".to_string()),
            Err(outcome) => return outcome,
        };

        if metric != "all" && !METRICS.iter().any(|(name, _, _)| *name == metric) {
            let names: Vec<&str> = METRICS.iter().map(|(name, _, _)| *name).collect();
            return ToolOutcome::InvalidParameter {
                tool: TOOL.to_string(),
                parameter: "metric".to_string(),
                message: format!("expected all or one of {}; got \"{metric}\"", names.join(", ")),
            };
        }
        if sort_order != "highest" && sort_order != "lowest" {
            return ToolOutcome::InvalidParameter {
                tool: TOOL.to_string(),
                parameter: "sort_order".to_string(),
                message: format!("expected highest or lowest; got \"{sort_order}\""),
            };
        }

        let snapshot = self.data.get();
        if snapshot.is_empty() {
            return ToolOutcome::DataUnavailable {
                domain: DomainId::Socioeconomic.to_string(),
                message: "socioeconomic dataset not loaded".to_string(),
            };
        }

        // The table carries a citywide CHICAGO roll-up row; every query
        // works on the 77 real areas only.
        let rows: Vec<&Record> = snapshot
            .iter()
            .filter(|r| {
                r.get_str("community_area_name")
                    .is_some_and(|name| !name.eq_ignore_ascii_case("chicago"))
            })
            .collect();

        let mut requested: Vec<String> = Vec::new();
        if let Some(area) = area {
            requested.push(area);
        }
        requested.extend(compare);

        let mut result = json!({
            "data_period": DATA_PERIOD,
            "metric": metric,
            "total_areas": rows.len(),
        });

        if requested.is_empty() {
            result["ranking"] = ranking(&rows, &metric, &sort_order, top_n);
        } else {
            let mut queried = Vec::new();
            let mut area_data = Vec::new();
            for raw in &requested {
                let label = areas::canonical_or_title(raw);
                if queried.contains(&label) {
                    continue;
                }
                queried.push(label.clone());
                if let Some(record) = find_area(&rows, raw) {
                    area_data.push(area_profile(record, &label, &metric));
                }
            }
            result["areas_queried"] = json!(queried);
            result["areas_found"] = json!(area_data.len());
            result["area_data"] = json!(area_data);
        }

        ToolOutcome::data(result)
    }
}

impl DataDomain for SocioeconomicDomain {
    fn domain_id(&self) -> DomainId {
        DomainId::Socioeconomic
    }

    fn tool_definitions(&self) -> Vec<ToolDefinition> {
        vec![ToolDefinition::new(
            TOOL,
            "Query socioeconomic indicators for Chicago community areas: per capita \
             income, poverty, unemployment, education, housing crowding, age \
             dependency, and the composite hardship index. Name a community_area \
             for its profile, or omit it to rank areas by a metric.",
            vec![
                ToolParam::optional(
                    "community_area",
                    ParamType::String,
                    "Community area by name, number, or well-known nickname",
                ),
                ToolParam::optional(
                    "compare_areas",
                    ParamType::Array,
                    "Additional community areas to include alongside community_area",
                ),
                ToolParam::optional(
                    "metric",
                    ParamType::String,
                    "income, poverty, unemployment, education, crowding, dependency, \
                     hardship, or all (default all; rankings use hardship for all)",
                ),
                ToolParam::optional(
                    "top_n",
                    ParamType::Integer,
                    "Ranking size when no area is named (default 10)",
                ),
                ToolParam::optional(
                    "sort_order",
                    ParamType::String,
                    "highest (default) or lowest",
                ),
            ],
        )]
    }

    fn call_tool(&self, name: &str, arguments: &Map<String, Value>) -> ToolOutcome {
        match name {
            TOOL => self.query(arguments),
            other => ToolOutcome::UnknownTool {
                name: other.to_string(),
                available: self.tool_names(),
            },
        }
    }

    fn format_result(&self, outcome: &ToolOutcome) -> String {
        let value = match outcome {
            ToolOutcome::Data { value } => value,
            other => return other.error_text().unwrap_or_default(),
        };

        if let Some(ranking) = value.get("ranking") {
            let label = ranking["ranked_by"].as_str().unwrap_or("?");
            let order = ranking["sort_order"].as_str().unwrap_or("highest");
            let metric = metric_for_label(label);
            let mut lines = vec![format!("Socioeconomic Ranking: {label}, {order} first")];
            if let Some(items) = ranking["items"].as_array() {
                for (i, item) in items.iter().enumerate() {
                    let name = item["community_area"].as_str().unwrap_or("?");
                    let value = item["value"].as_f64().unwrap_or(0.0);
                    lines.push(format!(
                        "  {}. {}: {}",
                        i + 1,
                        name,
                        format_metric_value(metric, value)
                    ));
                }
            }
            return lines.join("\n");
        }

        let mut lines = vec![format!("Socioeconomic Indicators ({DATA_PERIOD})")];
        if let Some(area_data) = value["area_data"].as_array() {
            for area in area_data {
                let name = area["community_area"].as_str().unwrap_or("?");
                lines.push(String::new());
                lines.push(name.to_string());
                if let Some(indicators) = area["indicators"].as_object() {
                    for (metric, _, label) in METRICS {
                        if let Some(value) = indicators.get(label).and_then(Value::as_f64) {
                            lines.push(format!(
                                "  {label}: {}",
                                format_metric_value(metric, value)
                            ));
                        }
                    }
                }
            }
            if area_data.is_empty() {
                lines.push("No matching community areas.".to_string());
            }
        }
        lines.join("\n")
    }
}

fn metric_column(metric: &str) -> &'static str {
    METRICS
        .iter()
        .find(|(name, _, _)| *name == metric)
        .map(|(_, column, _)| *column)
        .unwrap_or("hardship_index")
}

fn metric_label(metric: &str) -> &'static str {
    METRICS
        .iter()
        .find(|(name, _, _)| *name == metric)
        .map(|(_, _, label)| *label)
        .unwrap_or("Hardship Index (1-100)")
}

fn metric_for_label(label: &str) -> &'static str {
    METRICS
        .iter()
        .find(|(_, _, l)| *l == label)
        .map(|(name, _, _)| *name)
        .unwrap_or("hardship")
}

fn format_metric_value(metric: &str, value: f64) -> String {
    match metric {
        "income" => format!("${}", thousands(value.round() as i64)),
        "hardship" => format!("{}", value.round() as i64),
        _ => format!("{value:.1}%"),
    }
}

fn find_area<'a>(rows: &[&'a Record], requested: &str) -> Option<&'a Record> {
    let wanted = requested.trim().to_lowercase();
    match areas::resolve_area(requested) {
        Some(number) => rows.iter().copied().find(|r| {
            r.get_i64("ca") == Some(number as i64)
                || r.get_str("community_area_name")
                    .is_some_and(|name| areas::area_name(number) == Some(name))
        }),
        None => rows.iter().copied().find(|r| {
            r.get_str("community_area_name")
                .is_some_and(|name| name.to_lowercase() == wanted)
        }),
    }
}

fn area_profile(record: &Record, label: &str, metric: &str) -> Value {
    let mut indicators = Map::new();
    for (name, column, display) in METRICS {
        if metric != "all" && metric != name {
            continue;
        }
        if let Some(value) = record.get_f64(column) {
            indicators.insert(display.to_string(), json!(value));
        }
    }
    json!({
        "community_area": label,
        "indicators": indicators,
    })
}

/// Rank all areas by one metric. `all` ranks by the hardship index, the
/// table's own composite ordering.
fn ranking(rows: &[&Record], metric: &str, sort_order: &str, top_n: usize) -> Value {
    let effective = if metric == "all" { "hardship" } else { metric };
    let column = metric_column(effective);

    let mut items: Vec<(String, f64)> = rows
        .iter()
        .filter_map(|r| {
            let name = r.get_str("community_area_name")?;
            let value = r.get_f64(column)?;
            Some((name.to_string(), value))
        })
        .collect();
    items.sort_by(|a, b| {
        let by_value = match sort_order {
            "lowest" => a.1.partial_cmp(&b.1),
            _ => b.1.partial_cmp(&a.1),
        };
        by_value.unwrap_or(Ordering::Equal).then_with(|| a.0.cmp(&b.0))
    });
    items.truncate(top_n);

    json!({
        "ranked_by": metric_label(effective),
        "sort_order": sort_order,
        "top_n": top_n,
        "items": items
            .into_iter()
            .map(|(name, value)| json!({"community_area": name, "value": value}))
            .collect::<Vec<_>>(),
    })
}
