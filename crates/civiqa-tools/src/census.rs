//! ACS demographics domain: per-area population, income, race, and age
//! profiles, plus citywide rankings when no area is named.

use std::collections::BTreeSet;
use std::sync::Arc;

use civiqa_models::{DomainId, ParamType, Record, ToolDefinition, ToolOutcome, ToolParam};
use serde_json::{json, Map, Value};

use crate::areas;
use crate::domain::{thousands, DataDomain, DatasetCell};
use crate::params;

const TOOL: &str = "query_census_demographics";

const METRICS: [&str; 5] = ["population", "income", "race", "age", "all"];

/// Income bucket columns in ascending bracket order, with display labels.
const INCOME_COLS: [(&str, &str); 5] = [
    ("under_25_000", "Under $25k"),
    ("_25_000_to_49_999", "$25k-$50k"),
    ("_50_000_to_74_999", "$50k-$75k"),
    ("_75_000_to_125_000", "$75k-$125k"),
    ("_125_000", "Over $125k"),
];

// Column names reproduce the portal export headers, misspellings included.
const RACE_COLS: [(&str, &str); 9] = [
    ("white", "White"),
    ("black_or_african_american", "Black or African American"),
    ("american_indian_or_alaska", "American Indian or Alaska Native"),
    ("asian", "Asian"),
    ("native_hawaiin_or_pacific", "Native Hawaiian or Pacific Islander"),
    ("other_race", "Other Race"),
    ("multiracial", "Two or More Races"),
    ("hispanic_or_latino", "Hispanic or Latino (any race)"),
    ("white_not_hispanic_or_latino", "White, not Hispanic or Latino"),
];

const AGE_BRACKETS: [(&str, &str); 6] = [
    ("0_to_17", "0-17"),
    ("18_to_24", "18-24"),
    ("25_to_34", "25-34"),
    ("35_to_49", "35-49"),
    ("50_to_64", "50-64"),
    ("65", "65+"),
];

pub struct CensusDomain {
    data: Arc<DatasetCell>,
}

impl CensusDomain {
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
        let year = match params::int_arg(TOOL, args, "year") {
            Ok(value) => value,
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

        if !METRICS.contains(&metric.as_str()) {
            return ToolOutcome::InvalidParameter {
                tool: TOOL.to_string(),
                parameter: "metric".to_string(),
                message: format!("expected one of {}; got \"{metric}\"", METRICS.join(", ")),
            };
        }

        let snapshot = self.data.get();
        if snapshot.is_empty() {
            return ToolOutcome::DataUnavailable {
                domain: DomainId::Census.to_string(),
                message: "census dataset not loaded".to_string(),
            };
        }

        let available: BTreeSet<i64> = snapshot
            .iter()
            .filter_map(|r| r.get_i64("acs_year"))
            .collect();
        let acs_year = match year {
            Some(requested) if !available.contains(&requested) => {
                let years: Vec<String> = available.iter().map(|y| y.to_string()).collect();
                return ToolOutcome::InvalidParameter {
                    tool: TOOL.to_string(),
                    parameter: "year".to_string(),
                    message: format!(
                        "no ACS data for {requested}; available: {}",
                        years.join(", ")
                    ),
                };
            }
            Some(requested) => requested,
            // Latest vintage when the caller does not pin one.
            None => match available.iter().next_back() {
                Some(latest) => *latest,
                None => {
                    return ToolOutcome::DataUnavailable {
                        domain: DomainId::Census.to_string(),
                        message: "census dataset has no usable acs_year column".to_string(),
                    }
                }
            },
        };

        let vintage: Vec<&Record> = snapshot
            .iter()
            .filter(|r| r.get_i64("acs_year") == Some(acs_year))
            .collect();

        let mut requested: Vec<String> = Vec::new();
        if let Some(area) = area {
            requested.push(area);
        }
        requested.extend(compare);

        let mut result = json!({
            "acs_year": acs_year,
            "metric": metric,
            "total_areas": vintage.len(),
        });

        if requested.is_empty() {
            result["ranking"] = ranking(&vintage, &metric, top_n);
        } else {
            let mut queried = Vec::new();
            let mut area_data = Vec::new();
            for raw in &requested {
                let label = areas::canonical_or_title(raw);
                if queried.contains(&label) {
                    continue;
                }
                queried.push(label.clone());
                if let Some(record) = find_area(&vintage, raw) {
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

impl DataDomain for CensusDomain {
    fn domain_id(&self) -> DomainId {
        DomainId::Census
    }

    fn tool_definitions(&self) -> Vec<ToolDefinition> {
        vec![ToolDefinition::new(
            TOOL,
            "Query ACS census demographics for Chicago community areas: population, \
             household income distribution, race/ethnicity, and age/gender profiles. \
             Name a community_area (and optionally compare_areas) for per-area \
             profiles, or omit it for a citywide ranking.",
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
                    "year",
                    ParamType::Integer,
                    "ACS vintage year (defaults to the latest available)",
                ),
                ToolParam::optional(
                    "metric",
                    ParamType::String,
                    "population, income, race, age, or all (default all)",
                ),
                ToolParam::optional(
                    "top_n",
                    ParamType::Integer,
                    "Ranking size when no area is named (default 10)",
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
        let acs_year = value["acs_year"].as_i64().unwrap_or(0);

        if let Some(ranking) = value.get("ranking") {
            let label = ranking["ranked_by"].as_str().unwrap_or("?");
            let mut lines = vec![format!("Census Ranking: {label} (ACS {acs_year})")];
            if let Some(items) = ranking["items"].as_array() {
                for (i, item) in items.iter().enumerate() {
                    let name = item["community_area"].as_str().unwrap_or("?");
                    let value = item["value"].as_i64().unwrap_or(0);
                    lines.push(format!("  {}. {}: {}", i + 1, name, thousands(value)));
                }
            }
            return lines.join("\n");
        }

        let mut lines = vec![format!("Census Demographics (ACS {acs_year})")];
        if let Some(area_data) = value["area_data"].as_array() {
            for area in area_data {
                lines.push(String::new());
                lines.push(format_area(area));
            }
            if area_data.is_empty() {
                let queried = value["areas_queried"]
                    .as_array()
                    .map(|names| {
                        names
                            .iter()
                            .filter_map(Value::as_str)
                            .collect::<Vec<_>>()
                            .join(", ")
                    })
                    .unwrap_or_default();
                lines.push(format!("No data for: {queried}"));
            }
        }
        lines.join("\n")
    }
}

fn find_area<'a>(vintage: &[&'a Record], requested: &str) -> Option<&'a Record> {
    let wanted = requested.trim().to_lowercase();
    match areas::resolve_area(requested) {
        Some(number) => vintage.iter().copied().find(|r| {
            r.get_i64("community_area_number") == Some(number as i64)
                || r.get_str("community_area")
                    .is_some_and(|name| areas::area_name(number) == Some(name))
        }),
        None => vintage
            .iter()
            .copied()
            .find(|r| {
                r.get_str("community_area")
                    .is_some_and(|name| name.to_lowercase() == wanted)
            }),
    }
}

fn area_profile(record: &Record, label: &str, metric: &str) -> Value {
    let mut profile = Map::new();
    profile.insert("community_area".into(), json!(label));
    profile.insert(
        "total_population".into(),
        json!(record.get_i64("total_population")),
    );

    let include = |section: &str| metric == "all" || metric == section;
    if include("income") {
        profile.insert("income_distribution".into(), column_map(record, &INCOME_COLS));
    }
    if include("race") {
        profile.insert("race_ethnicity".into(), column_map(record, &RACE_COLS));
    }
    if include("age") {
        let mut genders = Map::new();
        for gender in ["male", "female"] {
            let mut buckets = Map::new();
            for (suffix, label) in AGE_BRACKETS {
                if let Some(count) = record.get_i64(&format!("{gender}_{suffix}")) {
                    buckets.insert(label.to_string(), json!(count));
                }
            }
            genders.insert(gender.to_string(), Value::Object(buckets));
        }
        profile.insert("age_gender".into(), Value::Object(genders));
    }
    Value::Object(profile)
}

fn column_map(record: &Record, columns: &[(&str, &str)]) -> Value {
    let mut out = Map::new();
    for (column, label) in columns {
        if let Some(count) = record.get_i64(column) {
            out.insert(label.to_string(), json!(count));
        }
    }
    Value::Object(out)
}

fn ranking(vintage: &[&Record], metric: &str, top_n: usize) -> Value {
    let (column, label) = match metric {
        "income" => ("_125_000", "Households Over $125k"),
        _ => ("total_population", "Total Population"),
    };
    let mut items: Vec<(String, i64)> = vintage
        .iter()
        .filter_map(|r| {
            let name = r.get_str("community_area")?;
            let value = r.get_i64(column)?;
            Some((name.to_string(), value))
        })
        .collect();
    items.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    items.truncate(top_n);

    json!({
        "ranked_by": label,
        "top_n": top_n,
        "items": items
            .into_iter()
            .map(|(name, value)| json!({"community_area": name, "value": value}))
            .collect::<Vec<_>>(),
    })
}

fn format_area(area: &Value) -> String {
    let name = area["community_area"].as_str().unwrap_or("?");
    let population = area["total_population"].as_i64().unwrap_or(0);
    let mut lines = vec![format!("{name} (population {})", thousands(population))];

    if let Some(income) = area.get("income_distribution") {
        lines.push("  Income distribution:".to_string());
        push_labeled_counts(&mut lines, income, &INCOME_COLS);
    }
    if let Some(race) = area.get("race_ethnicity") {
        lines.push("  Race / ethnicity:".to_string());
        push_labeled_counts(&mut lines, race, &RACE_COLS);
    }
    if let Some(ages) = area.get("age_gender") {
        lines.push("  Age groups:".to_string());
        for gender in ["male", "female"] {
            if let Some(buckets) = ages.get(gender) {
                let summary: Vec<String> = AGE_BRACKETS
                    .iter()
                    .filter_map(|(_, label)| {
                        let count = buckets.get(*label)?.as_i64()?;
                        Some(format!("{label}: {}", thousands(count)))
                    })
                    .collect();
                let gender_label = match gender {
                    "male" => "Male",
                    _ => "Female",
                };
                lines.push(format!("    {gender_label}  {}", summary.join(" | ")));
            }
        }
    }
    lines.join("\n")
}

/// Prints the values of a label->count map in the fixed column order the
/// labels were defined in, not the map's alphabetical key order.
fn push_labeled_counts(lines: &mut Vec<String>, map: &Value, columns: &[(&str, &str)]) {
    for (_, label) in columns {
        if let Some(count) = map.get(*label).and_then(Value::as_i64) {
            lines.push(format!("    {label}: {}", thousands(count)));
        }
    }
}
