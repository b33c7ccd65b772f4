use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The data domains CIVIQA serves. Each owns exactly one dataset,
/// one snapshot slot in the cache, and its own query tools.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum DomainId {
    Homicides,
    Census,
    Socioeconomic,
    PropertySales,
}

impl DomainId {
    pub const ALL: [DomainId; 4] = [
        DomainId::Homicides,
        DomainId::Census,
        DomainId::Socioeconomic,
        DomainId::PropertySales,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DomainId::Homicides => "homicides",
            DomainId::Census => "census",
            DomainId::Socioeconomic => "socioeconomic",
            DomainId::PropertySales => "property_sales",
        }
    }
}

impl fmt::Display for DomainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DomainId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "homicides" => Ok(DomainId::Homicides),
            "census" => Ok(DomainId::Census),
            "socioeconomic" => Ok(DomainId::Socioeconomic),
            "property_sales" => Ok(DomainId::PropertySales),
            other => Err(format!("unknown domain: {other}")),
        }
    }
}

/// One dataset row: column name mapped to a JSON scalar.
///
/// Open-data portals frequently serialize numbers and booleans as strings,
/// so the typed accessors coerce from string form where the literal allows it.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct Record(pub BTreeMap<String, Value>);

impl Record {
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    pub fn set(&mut self, column: &str, value: impl Into<Value>) {
        self.0.insert(column.to_string(), value.into());
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.0.get(column)
    }

    pub fn get_str(&self, column: &str) -> Option<&str> {
        self.0.get(column).and_then(Value::as_str)
    }

    /// Integer read tolerant of `28`, `28.0`, and `"28"` forms.
    pub fn get_i64(&self, column: &str) -> Option<i64> {
        match self.0.get(column)? {
            Value::Number(n) => n
                .as_i64()
                .or_else(|| n.as_f64().map(|f| f as i64)),
            Value::String(s) => {
                let s = s.trim();
                s.parse::<i64>()
                    .ok()
                    .or_else(|| s.parse::<f64>().ok().map(|f| f as i64))
            }
            _ => None,
        }
    }

    pub fn get_f64(&self, column: &str) -> Option<f64> {
        match self.0.get(column)? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        }
    }

    /// Boolean read accepting JSON booleans and `"true"` / `"false"` strings.
    pub fn get_bool(&self, column: &str) -> Option<bool> {
        match self.0.get(column)? {
            Value::Bool(b) => Some(*b),
            Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
                "true" => Some(true),
                "false" => Some(false),
                _ => None,
            },
            _ => None,
        }
    }
}

impl FromIterator<(String, Value)> for Record {
    fn from_iter<T: IntoIterator<Item = (String, Value)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// An immutable snapshot of one domain's rows.
///
/// Query engines hold a Dataset behind an `Arc` and only ever see it
/// replaced wholesale; the fetch layer is the sole producer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Dataset {
    pub domain: DomainId,
    pub rows: Vec<Record>,
    pub fetched_at: DateTime<Utc>,
}

impl Dataset {
    pub fn new(domain: DomainId, rows: Vec<Record>) -> Self {
        Self {
            domain,
            rows,
            fetched_at: Utc::now(),
        }
    }

    pub fn empty(domain: DomainId) -> Self {
        Self::new(domain, Vec::new())
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Record> {
        self.rows.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(pairs: &[(&str, Value)]) -> Record {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn domain_id_roundtrip() {
        for domain in DomainId::ALL {
            let json = serde_json::to_string(&domain).unwrap();
            let parsed: DomainId = serde_json::from_str(&json).unwrap();
            assert_eq!(domain, parsed);
            assert_eq!(domain.as_str().parse::<DomainId>().unwrap(), domain);
        }
    }

    #[test]
    fn integer_coercion_from_string() {
        let r = row(&[("ward", json!("28")), ("district", json!(7))]);
        assert_eq!(r.get_i64("ward"), Some(28));
        assert_eq!(r.get_i64("district"), Some(7));
        assert_eq!(r.get_i64("missing"), None);
    }

    #[test]
    fn integer_coercion_from_float_string() {
        let r = row(&[("year", json!("2023.0"))]);
        assert_eq!(r.get_i64("year"), Some(2023));
    }

    #[test]
    fn boolean_coercion_from_string() {
        let r = row(&[
            ("arrest", json!("true")),
            ("domestic", json!(false)),
            ("flag", json!("FALSE")),
        ]);
        assert_eq!(r.get_bool("arrest"), Some(true));
        assert_eq!(r.get_bool("domestic"), Some(false));
        assert_eq!(r.get_bool("flag"), Some(false));
        assert_eq!(r.get_bool("missing"), None);
    }

    #[test]
    fn float_coercion() {
        let r = row(&[("avg_price", json!("350000.5"))]);
        assert_eq!(r.get_f64("avg_price"), Some(350000.5));
    }

    #[test]
    fn dataset_roundtrip() {
        let rows = vec![
            row(&[("year", json!("2023")), ("ward", json!("28"))]),
            row(&[("year", json!("2022")), ("ward", json!("6"))]),
        ];
        let dataset = Dataset::new(DomainId::Homicides, rows);

        let json = serde_json::to_string(&dataset).unwrap();
        let parsed: Dataset = serde_json::from_str(&json).unwrap();
        assert_eq!(dataset, parsed);
        assert_eq!(parsed.len(), 2);
    }
}
