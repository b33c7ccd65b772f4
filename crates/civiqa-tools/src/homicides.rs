//! Homicide records domain: filtered counts, grouped breakdowns, location
//! search, and the IUCR code glossary.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;

use civiqa_models::{DomainId, ParamType, Record, ToolDefinition, ToolOutcome, ToolParam};
use serde_json::{json, Map, Value};

use crate::areas;
use crate::domain::{DataDomain, DatasetCell};
use crate::params;

/// IUCR homicide codes: (code, description, index offense).
const IUCR_CODES: [(&str, &str, bool); 4] = [
    ("0110", "First Degree Murder", true),
    ("0130", "Second Degree Murder", true),
    ("0141", "Involuntary Manslaughter", false),
    ("0142", "Reckless Homicide", false),
];

const GROUP_COLUMNS: [(&str, &str); 5] = [
    ("year", "year"),
    ("ward", "ward"),
    ("district", "district"),
    ("community_area", "community_area"),
    ("location", "location_description"),
];

pub struct HomicideDomain {
    data: Arc<DatasetCell>,
}

impl HomicideDomain {
    pub fn new(data: Arc<DatasetCell>) -> Self {
        Self { data }
    }

    fn unknown_tool(&self, name: &str) -> ToolOutcome {
        ToolOutcome::UnknownTool {
            name: name.to_string(),
            available: self.tool_names(),
        }
    }

    fn query_advanced(&self, args: &Map<String, Value>) -> ToolOutcome {
        const TOOL: &str = "query_homicides_advanced";

        let filters = match HomicideFilters::from_args(TOOL, args) {
            Ok(filters) => filters,
            Err(outcome) => return outcome,
        };
        let group_by = match params::str_arg(TOOL, args, "group_by") {
            Ok(value) => value,
            Err(outcome) => return outcome,
        };
        let top_n = match params::count_arg(TOOL, args, "top_n", 10) {
            Ok(value) => value,
            Err(outcome) => return outcome,
        };

        let group_column = match group_by.as_deref() {
            None => None,
            Some(requested) => {
                match GROUP_COLUMNS.iter().find(|(name, _)| *name == requested) {
                    Some((name, column)) => Some((*name, *column)),
                    None => {
                        return ToolOutcome::InvalidParameter {
                            tool: TOOL.to_string(),
                            parameter: "group_by".to_string(),
                            message: format!(
                                "expected one of year, ward, district, community_area, location; got \"{requested}\""
                            ),
                        }
                    }
                }
            }
        };

        let snapshot = self.data.get();
        if snapshot.is_empty() {
            return data_unavailable();
        }

        let matched: Vec<&Record> = snapshot.iter().filter(|r| filters.matches(r)).collect();
        let arrest_count = matched
            .iter()
            .filter(|r| r.get_bool("arrest") == Some(true))
            .count();
        let domestic_count = matched
            .iter()
            .filter(|r| r.get_bool("domestic") == Some(true))
            .count();

        let mut result = json!({
            "total_matches": matched.len(),
            "arrest_count": arrest_count,
            "domestic_count": domestic_count,
            "arrest_rate": percent(arrest_count, matched.len()),
            "year_range": year_range(&matched),
            "filters": filters.describe(),
        });

        if let Some((group_type, column)) = group_column {
            let groups = group_counts(&matched, column, top_n);
            result["primary_breakdown"] = json!({
                "type": group_type,
                "groups": groups
                    .into_iter()
                    .map(|(key, count)| json!({"key": key, "count": count}))
                    .collect::<Vec<_>>(),
            });
        }

        ToolOutcome::data(result)
    }

    fn search_by_location(&self, args: &Map<String, Value>) -> ToolOutcome {
        const TOOL: &str = "search_by_location";

        let location = match params::str_arg(TOOL, args, "location") {
            Ok(Some(value)) => value,
            Ok(None) => {
                return ToolOutcome::MissingParameter {
                    tool: TOOL.to_string(),
                    parameter: "location".to_string(),
                }
            }
            Err(outcome) => return outcome,
        };
        let limit = match params::count_arg(TOOL, args, "limit", 10) {
            Ok(value) => value,
            Err(outcome) => return outcome,
        };

        let snapshot = self.data.get();
        if snapshot.is_empty() {
            return data_unavailable();
        }

        let needle = location.to_lowercase();
        let matched: Vec<&Record> = snapshot
            .iter()
            .filter(|r| {
                let block = r.get_str("block").unwrap_or_default().to_lowercase();
                let place = r
                    .get_str("location_description")
                    .unwrap_or_default()
                    .to_lowercase();
                block.contains(&needle) || place.contains(&needle)
            })
            .collect();

        let records: Vec<Value> = matched
            .iter()
            .take(limit)
            .map(|r| {
                json!({
                    "year": r.get_i64("year"),
                    "block": r.get_str("block"),
                    "location_description": r.get_str("location_description"),
                    "arrest": r.get_bool("arrest"),
                })
            })
            .collect();

        ToolOutcome::data(json!({
            "query": location,
            "total_matches": matched.len(),
            "returned_records": records.len(),
            "records": records,
        }))
    }

    fn iucr_info(&self, args: &Map<String, Value>) -> ToolOutcome {
        const TOOL: &str = "get_iucr_info";

        let code = match params::str_arg(TOOL, args, "iucr_code") {
            Ok(value) => value,
            Err(outcome) => return outcome,
        };

        let known: Vec<Value> = IUCR_CODES
            .iter()
            .map(|(code, description, _)| json!({"code": code, "description": description}))
            .collect();

        match code {
            None => ToolOutcome::data(json!({
                "explanation": "IUCR (Illinois Uniform Crime Reporting) codes are four-digit \
                                offense classifications used by Chicago Police. Homicide records \
                                carry the codes listed under known_codes; 0110 and 0130 are \
                                index offenses reported to the FBI.",
                "known_codes": known,
            })),
            Some(code) => {
                let code = code.trim().to_string();
                match IUCR_CODES.iter().find(|(c, _, _)| *c == code) {
                    Some((code, description, index_offense)) => {
                        let cases = self
                            .data
                            .get()
                            .iter()
                            .filter(|r| r.get_str("iucr") == Some(code))
                            .count();
                        ToolOutcome::data(json!({
                            "iucr_code": code,
                            "description": description,
                            "index_offense": index_offense,
                            "total_cases": cases,
                        }))
                    }
                    None => ToolOutcome::data(json!({
                        "iucr_code": code,
                        "explanation": format!(
                            "'{code}' is not a homicide IUCR code in this dataset; see known_codes."
                        ),
                        "known_codes": known,
                    })),
                }
            }
        }
    }

    fn statistics(&self, args: &Map<String, Value>) -> ToolOutcome {
        const TOOL: &str = "get_homicide_statistics";

        let mut filters = HomicideFilters::default();
        filters.start_year = match params::int_arg(TOOL, args, "start_year") {
            Ok(value) => value,
            Err(outcome) => return outcome,
        };
        filters.end_year = match params::int_arg(TOOL, args, "end_year") {
            Ok(value) => value,
            Err(outcome) => return outcome,
        };

        let snapshot = self.data.get();
        if snapshot.is_empty() {
            return data_unavailable();
        }

        let matched: Vec<&Record> = snapshot.iter().filter(|r| filters.matches(r)).collect();
        let arrests = matched
            .iter()
            .filter(|r| r.get_bool("arrest") == Some(true))
            .count();
        let domestic = matched
            .iter()
            .filter(|r| r.get_bool("domestic") == Some(true))
            .count();

        let breakdown = |column: &str| -> Vec<Value> {
            group_counts(&matched, column, 5)
                .into_iter()
                .map(|(key, count)| json!({"key": key, "count": count}))
                .collect()
        };

        ToolOutcome::data(json!({
            "total_homicides": matched.len(),
            "year_range": year_range(&matched),
            "arrests_made": arrests,
            "arrest_rate": percent(arrests, matched.len()),
            "domestic_cases": domestic,
            "top_districts": breakdown("district"),
            "top_wards": breakdown("ward"),
        }))
    }
}

impl DataDomain for HomicideDomain {
    fn domain_id(&self) -> DomainId {
        DomainId::Homicides
    }

    fn tool_definitions(&self) -> Vec<ToolDefinition> {
        vec![
            ToolDefinition::new(
                "query_homicides_advanced",
                "Query Chicago homicide records with filters and grouping. Returns match \
                 counts, arrest and domestic breakdowns, and an optional grouped ranking. \
                 Use for questions like 'How many homicides in 2023?', 'Which ward had \
                 the most homicides?', or 'Homicides in district 7 without an arrest'.",
                vec![
                    ToolParam::optional("start_year", ParamType::Integer, "First year, inclusive"),
                    ToolParam::optional("end_year", ParamType::Integer, "Last year, inclusive"),
                    ToolParam::optional("ward", ParamType::Integer, "City ward number (1-50)"),
                    ToolParam::optional("district", ParamType::Integer, "Police district number"),
                    ToolParam::optional(
                        "community_area",
                        ParamType::Integer,
                        "Community area number (1-77)",
                    ),
                    ToolParam::optional(
                        "arrest_status",
                        ParamType::Boolean,
                        "true for cases with an arrest, false for cases without",
                    ),
                    ToolParam::optional("domestic", ParamType::Boolean, "Domestic incidents only"),
                    ToolParam::optional(
                        "location_type",
                        ParamType::String,
                        "Location description contains this text (case-insensitive)",
                    ),
                    ToolParam::optional(
                        "group_by",
                        ParamType::String,
                        "Break counts down by: year, ward, district, community_area, or location",
                    ),
                    ToolParam::optional(
                        "top_n",
                        ParamType::Integer,
                        "Number of groups to return (default 10)",
                    ),
                ],
            ),
            ToolDefinition::new(
                "search_by_location",
                "Search homicide records whose street block or location description \
                 contains the given text (case-insensitive). Returns the total match \
                 count plus sample records.",
                vec![
                    ToolParam::required(
                        "location",
                        ParamType::String,
                        "Street or place text, e.g. 'STATE ST' or 'apartment'",
                    ),
                    ToolParam::optional(
                        "limit",
                        ParamType::Integer,
                        "Max sample records to return (default 10)",
                    ),
                ],
            ),
            ToolDefinition::new(
                "get_iucr_info",
                "Explain IUCR offense codes. With iucr_code, returns that code's \
                 description and its case count in the dataset; without, returns a \
                 general explanation of the code system.",
                vec![ToolParam::optional(
                    "iucr_code",
                    ParamType::String,
                    "Four-digit IUCR code, e.g. '0110'",
                )],
            ),
            ToolDefinition::new(
                "get_homicide_statistics",
                "Overall homicide statistics: totals, year range, arrest and domestic \
                 counts, and the top districts and wards. Optionally restricted to a \
                 year range.",
                vec![
                    ToolParam::optional("start_year", ParamType::Integer, "First year, inclusive"),
                    ToolParam::optional("end_year", ParamType::Integer, "Last year, inclusive"),
                ],
            ),
        ]
    }

    fn call_tool(&self, name: &str, arguments: &Map<String, Value>) -> ToolOutcome {
        match name {
            "query_homicides_advanced" => self.query_advanced(arguments),
            "search_by_location" => self.search_by_location(arguments),
            "get_iucr_info" => self.iucr_info(arguments),
            "get_homicide_statistics" => self.statistics(arguments),
            other => self.unknown_tool(other),
        }
    }

    fn format_result(&self, outcome: &ToolOutcome) -> String {
        let value = match outcome {
            ToolOutcome::Data { value } => value,
            other => return other.error_text().unwrap_or_default(),
        };

        if value.get("total_homicides").is_some() {
            return format_statistics(value);
        }
        if value.get("query").is_some() {
            return format_search(value);
        }
        if value.get("iucr_code").is_some() || value.get("explanation").is_some() {
            return format_iucr(value);
        }
        if value.get("total_matches").is_some() {
            return format_query(value);
        }
        value.to_string()
    }
}

#[derive(Default)]
struct HomicideFilters {
    start_year: Option<i64>,
    end_year: Option<i64>,
    ward: Option<i64>,
    district: Option<i64>,
    community_area: Option<i64>,
    arrest_status: Option<bool>,
    domestic: Option<bool>,
    location_type: Option<String>,
}

impl HomicideFilters {
    fn from_args(tool: &str, args: &Map<String, Value>) -> Result<Self, ToolOutcome> {
        Ok(Self {
            start_year: params::int_arg(tool, args, "start_year")?,
            end_year: params::int_arg(tool, args, "end_year")?,
            ward: params::int_arg(tool, args, "ward")?,
            district: params::int_arg(tool, args, "district")?,
            community_area: params::int_arg(tool, args, "community_area")?,
            arrest_status: params::bool_arg(tool, args, "arrest_status")?,
            domestic: params::bool_arg(tool, args, "domestic")?,
            location_type: params::str_arg(tool, args, "location_type")?,
        })
    }

    /// All configured predicates must hold. A record missing the column a
    /// predicate needs does not match it.
    fn matches(&self, record: &Record) -> bool {
        if self.start_year.is_some() || self.end_year.is_some() {
            let Some(year) = record.get_i64("year") else {
                return false;
            };
            if self.start_year.is_some_and(|start| year < start) {
                return false;
            }
            if self.end_year.is_some_and(|end| year > end) {
                return false;
            }
        }
        if let Some(ward) = self.ward {
            if record.get_i64("ward") != Some(ward) {
                return false;
            }
        }
        if let Some(district) = self.district {
            if record.get_i64("district") != Some(district) {
                return false;
            }
        }
        if let Some(area) = self.community_area {
            if record.get_i64("community_area") != Some(area) {
                return false;
            }
        }
        if let Some(arrest) = self.arrest_status {
            if record.get_bool("arrest") != Some(arrest) {
                return false;
            }
        }
        if let Some(domestic) = self.domestic {
            if record.get_bool("domestic") != Some(domestic) {
                return false;
            }
        }
        if let Some(needle) = &self.location_type {
            let place = record
                .get_str("location_description")
                .unwrap_or_default()
                .to_lowercase();
            if !place.contains(&needle.to_lowercase()) {
                return false;
            }
        }
        true
    }

    /// Echo of the applied filters for the structured result.
    fn describe(&self) -> Map<String, Value> {
        let mut out = Map::new();
        if let Some(v) = self.start_year {
            out.insert("start_year".into(), json!(v));
        }
        if let Some(v) = self.end_year {
            out.insert("end_year".into(), json!(v));
        }
        if let Some(v) = self.ward {
            out.insert("ward".into(), json!(v));
        }
        if let Some(v) = self.district {
            out.insert("district".into(), json!(v));
        }
        if let Some(v) = self.community_area {
            out.insert("community_area".into(), json!(v));
        }
        if let Some(v) = self.arrest_status {
            out.insert("arrest_status".into(), json!(v));
        }
        if let Some(v) = self.domestic {
            out.insert("domestic".into(), json!(v));
        }
        if let Some(v) = &self.location_type {
            out.insert("location_type".into(), json!(v));
        }
        out
    }
}

fn data_unavailable() -> ToolOutcome {
    ToolOutcome::DataUnavailable {
        domain: DomainId::Homicides.to_string(),
        message: "homicide dataset not loaded".to_string(),
    }
}

/// Share of `part` in `whole` as a percentage with one decimal. Zero when
/// the denominator is zero.
fn percent(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        (part as f64 / whole as f64 * 1000.0).round() / 10.0
    }
}

fn year_range(rows: &[&Record]) -> Value {
    let years: Vec<i64> = rows.iter().filter_map(|r| r.get_i64("year")).collect();
    match (years.iter().min(), years.iter().max()) {
        (Some(first), Some(last)) => json!({"first": first, "last": last}),
        _ => Value::Null,
    }
}

/// Per-group counts over a column, sorted by count descending with ties
/// broken by ascending natural key order, truncated to `top_n`. Numeric
/// keys are normalized so "007" and "7" land in the same group.
fn group_counts(rows: &[&Record], column: &str, top_n: usize) -> Vec<(String, usize)> {
    let mut counts: HashMap<String, usize> = HashMap::new();
    for record in rows {
        let key = record
            .get_i64(column)
            .map(|n| n.to_string())
            .or_else(|| record.get_str(column).map(str::to_string));
        if let Some(key) = key {
            *counts.entry(key).or_default() += 1;
        }
    }
    let mut pairs: Vec<(String, usize)> = counts.into_iter().collect();
    pairs.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| natural_key_cmp(&a.0, &b.0)));
    pairs.truncate(top_n);
    pairs
}

fn natural_key_cmp(a: &str, b: &str) -> Ordering {
    match (a.parse::<i64>(), b.parse::<i64>()) {
        (Ok(x), Ok(y)) => x.cmp(&y),
        _ => a.cmp(b),
    }
}

fn format_year_range(value: &Value) -> String {
    match (value.get("first"), value.get("last")) {
        (Some(first), Some(last)) => format!(" (years {first}-{last})"),
        _ => String::new(),
    }
}

fn breakdown_label(group_type: &str, key: &str) -> String {
    match group_type {
        "ward" => format!("Ward {key}"),
        "district" => format!("District {key}"),
        "community_area" => match key.parse::<u32>().ok().and_then(areas::area_name) {
            Some(name) => format!("{name} ({key})"),
            None => format!("Area {key}"),
        },
        _ => key.to_string(),
    }
}

fn format_breakdown_lines(lines: &mut Vec<String>, group_type: &str, groups: &Value) {
    if let Some(groups) = groups.as_array() {
        for (i, group) in groups.iter().enumerate() {
            let key = group.get("key").and_then(Value::as_str).unwrap_or("?");
            let count = group.get("count").and_then(Value::as_u64).unwrap_or(0);
            lines.push(format!(
                "  {}. {}: {}",
                i + 1,
                breakdown_label(group_type, key),
                count
            ));
        }
    }
}

fn format_query(value: &Value) -> String {
    let total = value["total_matches"].as_u64().unwrap_or(0);
    let arrests = value["arrest_count"].as_u64().unwrap_or(0);
    let rate = value["arrest_rate"].as_f64().unwrap_or(0.0);
    let domestic = value["domestic_count"].as_u64().unwrap_or(0);

    let mut lines = vec![
        "Homicide Query Results".to_string(),
        format!(
            "Total matches: {total}{}",
            format_year_range(&value["year_range"])
        ),
        format!("Arrests: {arrests} ({rate:.1}%)"),
        format!("Domestic: {domestic}"),
    ];

    if let Some(breakdown) = value.get("primary_breakdown") {
        let group_type = breakdown["type"].as_str().unwrap_or("?");
        lines.push(format!("Breakdown by {group_type}:"));
        format_breakdown_lines(&mut lines, group_type, &breakdown["groups"]);
    }

    lines.join("\n")
}

fn format_statistics(value: &Value) -> String {
    let total = value["total_homicides"].as_u64().unwrap_or(0);
    let arrests = value["arrests_made"].as_u64().unwrap_or(0);
    let rate = value["arrest_rate"].as_f64().unwrap_or(0.0);
    let domestic = value["domestic_cases"].as_u64().unwrap_or(0);

    let mut lines = vec![
        "Homicide Statistics".to_string(),
        format!(
            "Total homicides: {total}{}",
            format_year_range(&value["year_range"])
        ),
        format!("Arrests made: {arrests} ({rate:.1}%)"),
        format!("Domestic cases: {domestic}"),
    ];
    lines.push("Top districts:".to_string());
    format_breakdown_lines(&mut lines, "district", &value["top_districts"]);
    lines.push("Top wards:".to_string());
    format_breakdown_lines(&mut lines, "ward", &value["top_wards"]);

    lines.join("\n")
}

fn format_search(value: &Value) -> String {
    let query = value["query"].as_str().unwrap_or("?");
    let total = value["total_matches"].as_u64().unwrap_or(0);
    let returned = value["returned_records"].as_u64().unwrap_or(0);

    let mut lines = vec![
        format!("Location Search: \"{query}\""),
        format!("Total matches: {total} (showing {returned})"),
    ];
    if let Some(records) = value["records"].as_array() {
        for record in records {
            let year = record
                .get("year")
                .and_then(Value::as_i64)
                .map(|y| y.to_string())
                .unwrap_or_else(|| "?".to_string());
            let block = record["block"].as_str().unwrap_or("?");
            let place = record["location_description"].as_str().unwrap_or("?");
            let arrest = match record["arrest"].as_bool() {
                Some(true) => "arrest",
                _ => "no arrest",
            };
            lines.push(format!("  - {year} | {block} | {place} | {arrest}"));
        }
    }
    lines.join("\n")
}

fn format_iucr(value: &Value) -> String {
    if let (Some(code), Some(description)) = (
        value.get("iucr_code").and_then(Value::as_str),
        value.get("description").and_then(Value::as_str),
    ) {
        let index = match value["index_offense"].as_bool() {
            Some(true) => "yes",
            _ => "no",
        };
        let cases = value["total_cases"].as_u64().unwrap_or(0);
        return format!(
            "IUCR {code}: {description}\nIndex offense: {index}\nCases in dataset: {cases}"
        );
    }

    let mut lines = Vec::new();
    if let Some(explanation) = value.get("explanation").and_then(Value::as_str) {
        lines.push(explanation.to_string());
    }
    if let Some(known) = value.get("known_codes").and_then(Value::as_array) {
        for entry in known {
            let code = entry["code"].as_str().unwrap_or("?");
            let description = entry["description"].as_str().unwrap_or("?");
            lines.push(format!("  {code}: {description}"));
        }
    }
    lines.join("\n")
}
