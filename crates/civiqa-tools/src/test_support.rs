//! Hand-built fixture datasets for domain tests.
//!
//! Values mirror the string-typed shape of portal exports so tests also
//! exercise the coercing [`Record`] accessors. Distributions are small
//! enough to verify by hand; the comments next to each fixture record the
//! counts the tests assert.

use std::sync::Arc;

use civiqa_models::{Dataset, DomainId, Record};
use serde_json::Value;

/// One homicide record in portal shape: numeric columns as strings,
/// booleans as JSON booleans, districts zero-padded.
#[allow(clippy::too_many_arguments)]
pub fn homicide_row(
    case: &str,
    year: i64,
    ward: i64,
    district: &str,
    community_area: i64,
    arrest: bool,
    domestic: bool,
    block: &str,
    location: &str,
) -> Record {
    let mut r = Record::new();
    r.set("case_number", case);
    r.set("date", format!("{year}-06-15T00:00:00"));
    r.set("year", year.to_string());
    r.set("ward", ward.to_string());
    r.set("district", district);
    r.set("community_area", community_area.to_string());
    r.set("iucr", "0110");
    r.set("primary_type", "HOMICIDE");
    r.set("arrest", arrest);
    r.set("domestic", domestic);
    r.set("block", block);
    r.set("location_description", location);
    r
}

/// Twenty homicide rows with hand-verified distributions:
/// years 2019 x3, 2020 x3, 2021 x3, 2022 x4, 2023 x7;
/// arrests 6 (rows 2, 5, 8, 11, 15, 19), of which 2 fall in 2023;
/// domestic 6 (rows 2, 6, 9, 13, 15, 18);
/// districts 11 x5, 7 x4, then 5, 6, 10 at two each;
/// wards 28 x7, 6 x3, 16 x2;
/// "STATE ST" appears in two blocks, "STREET" in eleven locations.
pub fn homicide_fixture() -> Arc<Dataset> {
    let rows = vec![
        homicide_row("JC1001", 2019, 28, "011", 25, false, false, "1200 N MASON AVE", "STREET"),
        homicide_row("JC1002", 2019, 28, "011", 25, true, true, "5800 W CHICAGO AVE", "APARTMENT"),
        homicide_row("JC1003", 2019, 17, "006", 71, false, false, "8700 S ASHLAND AVE", "STREET"),
        homicide_row("JD2001", 2020, 6, "007", 68, false, false, "6300 S HALSTED ST", "STREET"),
        homicide_row("JD2002", 2020, 6, "007", 68, true, false, "6500 S GREEN ST", "RESIDENCE"),
        homicide_row("JD2003", 2020, 28, "011", 25, false, true, "4900 W MADISON ST", "SIDEWALK"),
        homicide_row("JE3001", 2021, 6, "006", 44, false, false, "7900 S STATE ST", "STREET"),
        homicide_row("JE3002", 2021, 16, "007", 67, true, false, "6700 S DAMEN AVE", "ALLEY"),
        homicide_row("JE3003", 2021, 28, "010", 26, false, true, "4200 W MONROE ST", "RESIDENCE"),
        homicide_row("JF4001", 2022, 21, "004", 49, false, false, "10900 S MICHIGAN AVE", "STREET"),
        homicide_row("JF4002", 2022, 28, "011", 25, true, false, "4400 W WILCOX ST", "STREET"),
        homicide_row("JF4003", 2022, 24, "010", 30, false, false, "2600 S KEDVALE AVE", "STREET"),
        homicide_row("JF4004", 2022, 9, "005", 53, false, true, "12000 S HALSTED ST", "GAS STATION"),
        homicide_row("JG5001", 2023, 28, "011", 25, false, false, "3900 W GRENSHAW ST", "STREET"),
        homicide_row("JG5002", 2023, 28, "012", 26, true, true, "4300 W MAYPOLE AVE", "APARTMENT"),
        homicide_row("JG5003", 2023, 5, "005", 49, false, false, "10500 S WENTWORTH AVE", "STREET"),
        homicide_row("JG5004", 2023, 20, "002", 40, false, false, "5600 S STATE ST", "STREET"),
        homicide_row("JG5005", 2023, 16, "007", 67, false, true, "6400 S HERMITAGE AVE", "RESIDENCE"),
        homicide_row("JG5006", 2023, 42, "018", 8, true, false, "300 W HUBBARD ST", "BAR OR TAVERN"),
        homicide_row("JG5007", 2023, 11, "009", 60, false, false, "3500 S MORGAN ST", "STREET"),
    ];
    Arc::new(Dataset::new(DomainId::Homicides, rows))
}

/// One ACS demographics record. Income buckets and headline race counts
/// are passed in; the minor race columns and the age/gender pyramid are
/// derived deterministically from the population.
pub fn census_row(
    name: &str,
    number: u32,
    acs_year: i64,
    population: i64,
    income: [i64; 5],
    race: (i64, i64, i64, i64),
) -> Record {
    let (white, black, asian, hispanic) = race;
    let mut r = Record::new();
    r.set("community_area", name);
    r.set("community_area_number", number.to_string());
    r.set("acs_year", acs_year.to_string());
    r.set("total_population", population.to_string());

    let income_cols = [
        "under_25_000",
        "_25_000_to_49_999",
        "_50_000_to_74_999",
        "_75_000_to_125_000",
        "_125_000",
    ];
    for (col, value) in income_cols.iter().zip(income) {
        r.set(col, value.to_string());
    }

    r.set("white", white.to_string());
    r.set("black_or_african_american", black.to_string());
    r.set("american_indian_or_alaska", (population / 500).to_string());
    r.set("asian", asian.to_string());
    r.set("native_hawaiin_or_pacific", (population / 1000).to_string());
    r.set("other_race", (population / 100).to_string());
    r.set("multiracial", (population / 50).to_string());
    r.set("hispanic_or_latino", hispanic.to_string());
    r.set(
        "white_not_hispanic_or_latino",
        (white - hispanic / 4).max(0).to_string(),
    );

    let male_total = population * 485 / 1000;
    for (gender, total) in [("male", male_total), ("female", population - male_total)] {
        let brackets = [
            ("0_to_17", 21),
            ("18_to_24", 10),
            ("25_to_34", 19),
            ("35_to_49", 20),
            ("50_to_64", 17),
        ];
        let mut assigned = 0;
        for (bracket, pct) in brackets {
            let count = total * pct / 100;
            assigned += count;
            r.set(&format!("{gender}_{bracket}"), count.to_string());
        }
        r.set(&format!("{gender}_65"), (total - assigned).to_string());
    }
    r
}

/// Six community areas across two ACS vintages (2018 and 2023).
/// 2023 population order: Near North Side 105481, Lake View 103050,
/// Austin 96557, Lincoln Park 70799, Hyde Park 29456, Englewood 24369.
/// Households over $125k (2023): Near North Side 28000, Lincoln Park
/// 24000, Lake View 22000.
pub fn census_fixture() -> Arc<Dataset> {
    let rows = vec![
        census_row("Austin", 25, 2018, 98514, [10100, 8600, 5400, 3900, 3600], (5000, 78800, 800, 10400)),
        census_row("Near North Side", 8, 2018, 88893, [5600, 6900, 8500, 10200, 23800], (63400, 8800, 9800, 6400)),
        census_row("Lake View", 6, 2018, 100470, [4800, 7900, 10100, 11800, 19400], (80100, 4400, 7300, 8600)),
        census_row("Englewood", 68, 2018, 26121, [4700, 2500, 1000, 600, 250], (350, 24800, 90, 550)),
        census_row("Hyde Park", 41, 2018, 25681, [2700, 2400, 2000, 2100, 2700], (11500, 8200, 3100, 2000)),
        census_row("Lincoln Park", 7, 2018, 67710, [3000, 4300, 5800, 8400, 20700], (54100, 3400, 4700, 4900)),
        census_row("Austin", 25, 2023, 96557, [9800, 8200, 5600, 4200, 4200], (4800, 76000, 900, 11000)),
        census_row("Near North Side", 8, 2023, 105481, [5200, 6800, 8900, 11000, 28000], (74000, 9500, 12000, 7200)),
        census_row("Lake View", 6, 2023, 103050, [4100, 7300, 9800, 12000, 22000], (81000, 4100, 7900, 8400)),
        census_row("Englewood", 68, 2023, 24369, [4300, 2400, 1100, 700, 300], (400, 23000, 100, 600)),
        census_row("Hyde Park", 41, 2023, 29456, [2900, 2500, 2100, 2300, 3200], (13000, 8900, 3600, 2300)),
        census_row("Lincoln Park", 7, 2023, 70799, [2800, 4100, 5600, 8900, 24000], (56000, 3500, 5200, 5100)),
    ];
    Arc::new(Dataset::new(DomainId::Census, rows))
}

#[allow(clippy::too_many_arguments)]
pub fn socioeconomic_row(
    name: &str,
    ca: Option<u32>,
    income: i64,
    poverty: f64,
    unemployment: f64,
    education: f64,
    crowding: f64,
    dependency: f64,
    hardship: Option<i64>,
) -> Record {
    let mut r = Record::new();
    r.set("community_area_name", name);
    match ca {
        Some(ca) => r.set("ca", ca.to_string()),
        None => r.set("ca", Value::Null),
    }
    r.set("per_capita_income_", income.to_string());
    r.set("percent_households_below_poverty", poverty.to_string());
    r.set("percent_aged_16_unemployed", unemployment.to_string());
    r.set("percent_aged_25_without_high_school_diploma", education.to_string());
    r.set("percent_of_housing_crowded", crowding.to_string());
    r.set("percent_aged_under_18_or_over_64", dependency.to_string());
    match hardship {
        Some(h) => r.set("hardship_index", h.to_string()),
        None => r.set("hardship_index", Value::Null),
    }
    r
}

/// Six community areas plus the citywide CHICAGO roll-up row, which every
/// query must skip. Hardship runs from Riverdale (98) down to Near North
/// Side (1); per-capita income inverts that order.
pub fn socioeconomic_fixture() -> Arc<Dataset> {
    let rows = vec![
        socioeconomic_row("Riverdale", Some(54), 8201, 56.5, 34.6, 27.5, 5.8, 51.5, Some(98)),
        socioeconomic_row("Fuller Park", Some(37), 10432, 51.2, 33.9, 26.6, 3.2, 44.9, Some(97)),
        socioeconomic_row("Englewood", Some(68), 11888, 46.6, 28.0, 28.5, 3.8, 42.5, Some(94)),
        socioeconomic_row("Near North Side", Some(8), 88669, 12.9, 7.0, 2.5, 1.9, 22.6, Some(1)),
        socioeconomic_row("Lincoln Park", Some(7), 71551, 12.3, 5.1, 4.3, 0.8, 21.5, Some(2)),
        socioeconomic_row("Loop", Some(32), 65526, 14.7, 5.7, 3.1, 1.5, 13.5, Some(3)),
        socioeconomic_row("CHICAGO", None, 28202, 19.7, 12.9, 19.5, 4.7, 33.5, None),
    ];
    Arc::new(Dataset::new(DomainId::Socioeconomic, rows))
}

/// One township-year sales aggregate in the shape the fetch layer
/// produces: prices as two-decimal strings, counts as integer strings.
pub fn property_row(code: &str, year: i64, avg_price: f64, sales_count: i64) -> Record {
    let mut r = Record::new();
    r.set("township_code", code);
    r.set("year", year.to_string());
    r.set("avg_price", format!("{avg_price:.2}"));
    r.set("min_price", format!("{:.2}", (avg_price * 0.3).max(10000.0)));
    r.set("max_price", format!("{:.2}", avg_price * 4.5));
    r.set("sales_count", sales_count.to_string());
    r.set("total_volume", format!("{:.2}", avg_price * sales_count as f64));
    r
}

/// All eight Cook County city townships across 2021-2023. Average prices
/// rise year over year everywhere; North Chicago (74) is highest each
/// year, South Chicago (76) lowest.
pub fn property_fixture() -> Arc<Dataset> {
    let rows = vec![
        property_row("70", 2021, 252300.00, 410),
        property_row("70", 2022, 268900.50, 436),
        property_row("70", 2023, 286500.25, 452),
        property_row("71", 2021, 305100.00, 1830),
        property_row("71", 2022, 322400.75, 1902),
        property_row("71", 2023, 342750.00, 1988),
        property_row("72", 2021, 174800.00, 1520),
        property_row("72", 2022, 186300.25, 1575),
        property_row("72", 2023, 198250.75, 1610),
        property_row("73", 2021, 549800.00, 905),
        property_row("73", 2022, 578400.50, 922),
        property_row("73", 2023, 612300.40, 948),
        property_row("74", 2021, 728400.00, 511),
        property_row("74", 2022, 771200.25, 529),
        property_row("74", 2023, 825000.50, 543),
        property_row("75", 2021, 352600.00, 284),
        property_row("75", 2022, 374100.80, 291),
        property_row("75", 2023, 398600.00, 307),
        property_row("76", 2021, 143200.00, 688),
        property_row("76", 2022, 152750.40, 701),
        property_row("76", 2023, 162480.60, 724),
        property_row("77", 2021, 258100.00, 1244),
        property_row("77", 2022, 273900.60, 1296),
        property_row("77", 2023, 291375.80, 1342),
    ];
    Arc::new(Dataset::new(DomainId::PropertySales, rows))
}
