//! Property sales domain over Cook County assessor parcel sales, held as
//! township-year aggregates. Community areas map onto the eight city
//! townships, so answers are approximate at township granularity and the
//! results say so.

use std::collections::BTreeSet;
use std::sync::Arc;

use civiqa_models::{DomainId, ParamType, Record, ToolDefinition, ToolOutcome, ToolParam};
use serde_json::{json, Map, Value};

use crate::areas;
use crate::domain::{thousands, DataDomain, DatasetCell};
use crate::params;

const TOOL: &str = "query_property_values";

const DATA_SOURCE: &str = "Cook County Assessor Parcel Sales (residential, $10k+)";
const GRANULARITY: &str = "township (approximate community area mapping)";

const METRICS: [&str; 4] = ["avg_price", "sales_volume", "price_trend", "all"];

pub struct PropertyDomain {
    data: Arc<DatasetCell>,
}

impl PropertyDomain {
    pub fn new(data: Arc<DatasetCell>) -> Self {
        Self { data }
    }

    fn query(&self, args: &Map<String, Value>) -> ToolOutcome {
        let area = match params::str_arg(TOOL, args, "community_area") {
            Ok(value) => value,
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
        let top_n = match params::count_arg(TOOL, args, "top_n", 8) {
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

        let township = match &area {
            None => None,
            Some(raw) => match areas::resolve_township(raw) {
                Some(code) => Some(code),
                None => {
                    return ToolOutcome::InvalidParameter {
                        tool: TOOL.to_string(),
                        parameter: "community_area".to_string(),
                        message: format!(
                            "could not map \"{raw}\" to a community area or township"
                        ),
                    }
                }
            },
        };

        let snapshot = self.data.get();
        if snapshot.is_empty() {
            return ToolOutcome::DataUnavailable {
                domain: DomainId::PropertySales.to_string(),
                message: "property sales dataset not loaded".to_string(),
            };
        }

        let available: BTreeSet<i64> = snapshot
            .iter()
            .filter_map(|r| r.get_i64("year"))
            .collect();
        let target_year = match year {
            Some(requested) if !available.contains(&requested) => {
                let years: Vec<String> = available.iter().map(|y| y.to_string()).collect();
                return ToolOutcome::InvalidParameter {
                    tool: TOOL.to_string(),
                    parameter: "year".to_string(),
                    message: format!(
                        "no sales data for {requested}; available: {}",
                        years.join(", ")
                    ),
                };
            }
            Some(requested) => requested,
            None => match available.iter().next_back() {
                Some(latest) => *latest,
                None => {
                    return ToolOutcome::DataUnavailable {
                        domain: DomainId::PropertySales.to_string(),
                        message: "property sales dataset has no usable year column".to_string(),
                    }
                }
            },
        };

        let mut result = json!({
            "data_source": DATA_SOURCE,
            "granularity": GRANULARITY,
            "available_years": available.iter().collect::<Vec<_>>(),
            "year": target_year,
        });

        if metric == "price_trend" {
            result["trend"] = trend(&snapshot.rows, township);
            return ToolOutcome::data(result);
        }

        match township {
            Some(code) => {
                let area_data: Vec<Value> = snapshot
                    .iter()
                    .filter(|r| {
                        r.get_str("township_code") == Some(code)
                            && r.get_i64("year") == Some(target_year)
                    })
                    .map(township_snapshot)
                    .collect();
                result["areas_found"] = json!(area_data.len());
                result["area_data"] = json!(area_data);
            }
            None => {
                result["ranking"] = ranking(&snapshot.rows, target_year, &metric, top_n);
            }
        }

        ToolOutcome::data(result)
    }
}

impl DataDomain for PropertyDomain {
    fn domain_id(&self) -> DomainId {
        DomainId::PropertySales
    }

    fn tool_definitions(&self) -> Vec<ToolDefinition> {
        vec![ToolDefinition::new(
            TOOL,
            "Query residential property sale prices from Cook County assessor data, \
             aggregated by township (community areas map approximately onto \
             townships). Name a community_area for its township's prices, ask for \
             price_trend for year-over-year movement, or omit the area to rank \
             townships.",
            vec![
                ToolParam::optional(
                    "community_area",
                    ParamType::String,
                    "Community area name/number, or a township code (70-77)",
                ),
                ToolParam::optional(
                    "year",
                    ParamType::Integer,
                    "Sale year (defaults to the latest available)",
                ),
                ToolParam::optional(
                    "metric",
                    ParamType::String,
                    "avg_price, sales_volume, price_trend, or all (default all)",
                ),
                ToolParam::optional(
                    "top_n",
                    ParamType::Integer,
                    "Ranking size when no area is named (default 8)",
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
        let year = value["year"].as_i64().unwrap_or(0);

        if let Some(trend) = value.get("trend") {
            let mut lines = vec![format!(
                "Price Trend ({})",
                trend_scope(trend)
            )];
            if let Some(points) = trend["data_points"].as_array() {
                for point in points {
                    let y = point["year"].as_i64().unwrap_or(0);
                    let avg = point["avg_price"].as_f64().unwrap_or(0.0);
                    let sales = point["total_sales"].as_i64().unwrap_or(0);
                    lines.push(format!(
                        "  {y}: avg {} over {} sales",
                        money(avg),
                        thousands(sales)
                    ));
                }
            }
            lines.push(format!("Source: {DATA_SOURCE}"));
            return lines.join("\n");
        }

        if let Some(ranking) = value.get("ranking") {
            let label = ranking["ranked_by"].as_str().unwrap_or("?");
            let mut lines = vec![format!("Township Ranking: {label} ({year})")];
            if let Some(items) = ranking["items"].as_array() {
                for (i, item) in items.iter().enumerate() {
                    let label = item["label"].as_str().unwrap_or("?");
                    let value = item["value"].as_f64().unwrap_or(0.0);
                    let sales = item["sales_count"].as_i64().unwrap_or(0);
                    lines.push(format!(
                        "  {}. {}: {} ({} sales)",
                        i + 1,
                        label,
                        money(value),
                        thousands(sales)
                    ));
                }
            }
            lines.push(format!("Note: {GRANULARITY}"));
            return lines.join("\n");
        }

        let mut lines = vec![format!("Property Sales ({year})")];
        if let Some(area_data) = value["area_data"].as_array() {
            if area_data.is_empty() {
                lines.push("No sales data for that township and year.".to_string());
            }
            for area in area_data {
                let label = area["label"].as_str().unwrap_or("?");
                let avg = area["avg_price"].as_f64().unwrap_or(0.0);
                let min = area["min_price"].as_f64().unwrap_or(0.0);
                let max = area["max_price"].as_f64().unwrap_or(0.0);
                let sales = area["sales_count"].as_i64().unwrap_or(0);
                let volume = area["total_volume"].as_f64().unwrap_or(0.0);
                lines.push(label.to_string());
                lines.push(format!("  Average price: {}", money(avg)));
                lines.push(format!("  Range: {} to {}", money(min), money(max)));
                lines.push(format!(
                    "  Sales: {} (total volume {})",
                    thousands(sales),
                    money(volume)
                ));
            }
        }
        lines.push(format!("Source: {DATA_SOURCE}; granularity: {GRANULARITY}"));
        lines.join("\n")
    }
}

fn money(value: f64) -> String {
    let total_cents = (value * 100.0).round() as i64;
    let whole = total_cents / 100;
    let cents = (total_cents % 100).abs();
    format!("${}.{cents:02}", thousands(whole))
}

fn township_snapshot(record: &Record) -> Value {
    let code = record.get_str("township_code").unwrap_or_default();
    json!({
        "township_code": code,
        "label": areas::township_label(code),
        "avg_price": record.get_f64("avg_price"),
        "min_price": record.get_f64("min_price"),
        "max_price": record.get_f64("max_price"),
        "sales_count": record.get_i64("sales_count"),
        "total_volume": record.get_f64("total_volume"),
    })
}

fn ranking(rows: &[Record], year: i64, metric: &str, top_n: usize) -> Value {
    let (column, label) = match metric {
        "sales_volume" => ("total_volume", "Total Sales Volume"),
        _ => ("avg_price", "Average Sale Price"),
    };

    let mut items: Vec<(&str, f64, i64)> = rows
        .iter()
        .filter(|r| r.get_i64("year") == Some(year))
        .filter_map(|r| {
            let code = r.get_str("township_code")?;
            let value = r.get_f64(column)?;
            let sales = r.get_i64("sales_count").unwrap_or(0);
            Some((code, value, sales))
        })
        .collect();
    items.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.0.cmp(b.0))
    });
    items.truncate(top_n);

    json!({
        "ranked_by": label,
        "top_n": top_n,
        "items": items
            .into_iter()
            .map(|(code, value, sales)| {
                json!({
                    "township_code": code,
                    "label": areas::township_label(code),
                    "value": value,
                    "sales_count": sales,
                })
            })
            .collect::<Vec<_>>(),
    })
}

/// Year-over-year trend, citywide or narrowed to one township. Each data
/// point averages the per-township averages for that year and sums the
/// sale counts; years come back ascending.
fn trend(rows: &[Record], township: Option<&str>) -> Value {
    let scoped: Vec<&Record> = rows
        .iter()
        .filter(|r| match township {
            Some(code) => r.get_str("township_code") == Some(code),
            None => true,
        })
        .collect();

    let years: BTreeSet<i64> = scoped.iter().filter_map(|r| r.get_i64("year")).collect();
    let mut codes: BTreeSet<String> = BTreeSet::new();
    let mut points = Vec::new();
    for year in years {
        let mut prices = Vec::new();
        let mut sales = 0i64;
        for record in scoped.iter().filter(|r| r.get_i64("year") == Some(year)) {
            if let Some(price) = record.get_f64("avg_price") {
                prices.push(price);
            }
            sales += record.get_i64("sales_count").unwrap_or(0);
            if let Some(code) = record.get_str("township_code") {
                codes.insert(code.to_string());
            }
        }
        if prices.is_empty() {
            continue;
        }
        let mean = prices.iter().sum::<f64>() / prices.len() as f64;
        points.push(json!({
            "year": year,
            "avg_price": (mean * 100.0).round() / 100.0,
            "total_sales": sales,
        }));
    }

    json!({
        "townships": codes.iter().collect::<Vec<_>>(),
        "data_points": points,
    })
}

fn trend_scope(trend: &Value) -> String {
    match trend["townships"].as_array() {
        Some(codes) if codes.len() == 1 => codes[0]
            .as_str()
            .map(areas::township_label)
            .unwrap_or_else(|| "unknown township".to_string()),
        _ => "citywide, all townships".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::property_fixture;

    fn domain() -> PropertyDomain {
        PropertyDomain::new(Arc::new(DatasetCell::new(property_fixture())))
    }

    fn call(domain: &PropertyDomain, args: Value) -> Value {
        let args = args.as_object().cloned().unwrap_or_default();
        match domain.call_tool(TOOL, &args) {
            ToolOutcome::Data { value } => value,
            other => panic!("expected data, got {other:?}"),
        }
    }

    #[test]
    fn default_ranking_uses_latest_year_and_avg_price() {
        let result = call(&domain(), json!({}));
        assert_eq!(result["year"], 2023);
        assert_eq!(result["available_years"], json!([2021, 2022, 2023]));
        let ranking = &result["ranking"];
        assert_eq!(ranking["ranked_by"], "Average Sale Price");
        let items = ranking["items"].as_array().unwrap();
        assert_eq!(items.len(), 8);
        assert_eq!(items[0]["township_code"], "74");
        assert_eq!(items[0]["value"], 825000.5);
        assert!(items[0]["label"].as_str().unwrap().contains("North Chicago"));
        assert_eq!(items[7]["township_code"], "76");
    }

    #[test]
    fn sales_volume_ranking_differs_from_price_ranking() {
        let result = call(&domain(), json!({"metric": "sales_volume", "top_n": 2}));
        let items = result["ranking"]["items"].as_array().unwrap();
        // Jefferson moves nearly 2k sales a year; dollar volume beats the
        // pricier North Chicago townships.
        assert_eq!(items[0]["township_code"], "71");
        assert_eq!(items.len(), 2);
    }

    #[test]
    fn community_area_maps_to_township() {
        let result = call(&domain(), json!({"community_area": "Lincoln Park"}));
        assert_eq!(result["areas_found"], 1);
        let area = &result["area_data"][0];
        assert_eq!(area["township_code"], "74");
        assert_eq!(area["avg_price"], 825000.5);
        assert!(area["label"].as_str().unwrap().contains("Lincoln Park"));
    }

    #[test]
    fn township_code_is_accepted_directly() {
        let result = call(&domain(), json!({"community_area": "74", "year": 2021}));
        assert_eq!(result["area_data"][0]["township_code"], "74");
        assert_eq!(result["area_data"][0]["avg_price"], 728400.0);
    }

    #[test]
    fn unknown_year_lists_available_years() {
        let domain = domain();
        let args = json!({"year": 2019});
        let outcome = domain.call_tool(TOOL, args.as_object().unwrap());
        match outcome {
            ToolOutcome::InvalidParameter { parameter, message, .. } => {
                assert_eq!(parameter, "year");
                assert!(message.contains("2021") && message.contains("2023"));
            }
            other => panic!("expected InvalidParameter, got {other:?}"),
        }
    }

    #[test]
    fn unmappable_area_is_reported() {
        let domain = domain();
        let args = json!({"community_area": "Atlantis"});
        let outcome = domain.call_tool(TOOL, args.as_object().unwrap());
        match outcome {
            ToolOutcome::InvalidParameter { parameter, message, .. } => {
                assert_eq!(parameter, "community_area");
                assert!(message.contains("Atlantis"));
            }
            other => panic!("expected InvalidParameter, got {other:?}"),
        }
    }

    #[test]
    fn single_township_trend_rises() {
        let result = call(
            &domain(),
            json!({"community_area": "Near North Side", "metric": "price_trend"}),
        );
        let trend = &result["trend"];
        assert_eq!(trend["townships"], json!(["74"]));
        let points = trend["data_points"].as_array().unwrap();
        assert_eq!(points.len(), 3);
        assert_eq!(points[0]["year"], 2021);
        assert_eq!(points[2]["year"], 2023);
        let first = points[0]["avg_price"].as_f64().unwrap();
        let last = points[2]["avg_price"].as_f64().unwrap();
        assert!(last > first);
    }

    #[test]
    fn citywide_trend_sums_sales() {
        let result = call(&domain(), json!({"metric": "price_trend"}));
        let trend = &result["trend"];
        assert_eq!(trend["townships"].as_array().unwrap().len(), 8);
        let points = trend["data_points"].as_array().unwrap();
        assert_eq!(points[2]["year"], 2023);
        assert_eq!(points[2]["total_sales"], 7914);
        let avgs: Vec<f64> = points
            .iter()
            .map(|p| p["avg_price"].as_f64().unwrap())
            .collect();
        assert!(avgs[0] < avgs[1] && avgs[1] < avgs[2]);
    }

    #[test]
    fn invalid_metric_is_reported() {
        let domain = domain();
        let args = json!({"metric": "median"});
        let outcome = domain.call_tool(TOOL, args.as_object().unwrap());
        assert!(matches!(outcome, ToolOutcome::InvalidParameter { .. }));
    }

    #[test]
    fn empty_dataset_reports_unavailable() {
        let domain = PropertyDomain::new(Arc::new(DatasetCell::empty(DomainId::PropertySales)));
        let args = json!({});
        let outcome = domain.call_tool(TOOL, args.as_object().unwrap());
        assert!(matches!(outcome, ToolOutcome::DataUnavailable { .. }));
    }

    #[test]
    fn formatted_snapshot_styles_money() {
        let domain = domain();
        let args = json!({"community_area": "Lincoln Park"});
        let outcome = domain.call_tool(TOOL, args.as_object().unwrap());
        let text = domain.format_result(&outcome);
        assert!(text.contains("Average price: $825,000.50"), "got: {text}");
        assert!(text.contains("543"));
        assert!(text.contains("township (approximate community area mapping)"));
    }

    #[test]
    fn formatted_ranking_numbers_townships() {
        let domain = domain();
        let args = json!({"top_n": 3});
        let outcome = domain.call_tool(TOOL, args.as_object().unwrap());
        let text = domain.format_result(&outcome);
        assert!(text.contains("Township Ranking: Average Sale Price (2023)"));
        assert!(text.contains("1. North Chicago Township"));
    }

    #[test]
    fn formatted_trend_walks_years() {
        let domain = domain();
        let args = json!({"community_area": "74", "metric": "price_trend"});
        let outcome = domain.call_tool(TOOL, args.as_object().unwrap());
        let text = domain.format_result(&outcome);
        assert!(text.contains("Price Trend (North Chicago Township"));
        assert!(text.contains("2021: avg $728,400.00 over 511 sales"));
    }
}
