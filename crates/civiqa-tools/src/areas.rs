//! Chicago geography lookups shared by the census, socioeconomic, and
//! property domains.
//!
//! Covers the 77 official community areas, common neighborhood aliases,
//! and the 8 Cook County assessor townships that partition the city.
//! Township membership is approximate: township boundaries predate the
//! community area system and do not align with it exactly.

/// The 77 community areas, indexed by their official number.
pub const AREAS: [(u32, &str); 77] = [
    (1, "Rogers Park"),
    (2, "West Ridge"),
    (3, "Uptown"),
    (4, "Lincoln Square"),
    (5, "North Center"),
    (6, "Lake View"),
    (7, "Lincoln Park"),
    (8, "Near North Side"),
    (9, "Edison Park"),
    (10, "Norwood Park"),
    (11, "Jefferson Park"),
    (12, "Forest Glen"),
    (13, "North Park"),
    (14, "Albany Park"),
    (15, "Portage Park"),
    (16, "Irving Park"),
    (17, "Dunning"),
    (18, "Montclare"),
    (19, "Belmont Cragin"),
    (20, "Hermosa"),
    (21, "Avondale"),
    (22, "Logan Square"),
    (23, "Humboldt Park"),
    (24, "West Town"),
    (25, "Austin"),
    (26, "West Garfield Park"),
    (27, "East Garfield Park"),
    (28, "Near West Side"),
    (29, "North Lawndale"),
    (30, "South Lawndale"),
    (31, "Lower West Side"),
    (32, "Loop"),
    (33, "Near South Side"),
    (34, "Armour Square"),
    (35, "Douglas"),
    (36, "Oakland"),
    (37, "Fuller Park"),
    (38, "Grand Boulevard"),
    (39, "Kenwood"),
    (40, "Washington Park"),
    (41, "Hyde Park"),
    (42, "Woodlawn"),
    (43, "South Shore"),
    (44, "Chatham"),
    (45, "Avalon Park"),
    (46, "South Chicago"),
    (47, "Burnside"),
    (48, "Calumet Heights"),
    (49, "Roseland"),
    (50, "Pullman"),
    (51, "South Deering"),
    (52, "East Side"),
    (53, "West Pullman"),
    (54, "Riverdale"),
    (55, "Hegewisch"),
    (56, "Garfield Ridge"),
    (57, "Archer Heights"),
    (58, "Brighton Park"),
    (59, "McKinley Park"),
    (60, "Bridgeport"),
    (61, "New City"),
    (62, "West Elsdon"),
    (63, "Gage Park"),
    (64, "Clearing"),
    (65, "West Lawn"),
    (66, "Chicago Lawn"),
    (67, "West Englewood"),
    (68, "Englewood"),
    (69, "Greater Grand Crossing"),
    (70, "Ashburn"),
    (71, "Auburn Gresham"),
    (72, "Beverly"),
    (73, "Washington Heights"),
    (74, "Mount Greenwood"),
    (75, "Morgan Park"),
    (76, "O'Hare"),
    (77, "Edgewater"),
];

/// Neighborhood names people actually use, mapped to the containing
/// community area.
const ALIASES: [(&str, u32); 20] = [
    ("the loop", 32),
    ("downtown", 32),
    ("ohare", 76),
    ("o hare", 76),
    ("bronzeville", 38),
    ("back of the yards", 61),
    ("wicker park", 24),
    ("ukrainian village", 24),
    ("bucktown", 22),
    ("pilsen", 31),
    ("little village", 30),
    ("chinatown", 34),
    ("andersonville", 77),
    ("wrigleyville", 6),
    ("boystown", 6),
    ("old town", 8),
    ("gold coast", 8),
    ("river north", 8),
    ("streeterville", 8),
    ("little italy", 28),
];

/// Cook County assessor townships: (code, name, member community areas).
pub const TOWNSHIPS: [(&str, &str, &[u32]); 8] = [
    ("70", "Hyde Park", &[36, 39, 41, 42, 43, 45, 46, 47, 48, 50, 51, 52, 54, 55]),
    ("71", "Jefferson", &[9, 10, 11, 12, 13, 14, 15, 16, 17, 18, 19, 20, 21, 22, 76]),
    (
        "72",
        "Lake",
        &[
            37, 38, 40, 44, 49, 53, 56, 57, 58, 59, 61, 62, 63, 64, 65, 66, 67, 68, 69, 70, 71,
            72, 73, 74, 75,
        ],
    ),
    ("73", "Lake View", &[3, 4, 5, 6, 77]),
    ("74", "North Chicago", &[7, 8]),
    ("75", "Rogers Park", &[1, 2]),
    ("76", "South Chicago", &[32, 33, 34, 35, 60]),
    ("77", "West Chicago", &[23, 24, 25, 26, 27, 28, 29, 30, 31]),
];

/// Canonical name for a community area number.
pub fn area_name(number: u32) -> Option<&'static str> {
    AREAS
        .iter()
        .find(|(n, _)| *n == number)
        .map(|(_, name)| *name)
}

/// Resolve free text (number, name, alias, or partial name) to a
/// community area number.
pub fn resolve_area(value: &str) -> Option<u32> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(number) = trimmed.parse::<u32>() {
        return (1..=77).contains(&number).then_some(number);
    }

    let lower = trimmed.to_lowercase();
    for (number, name) in &AREAS {
        if name.to_lowercase() == lower {
            return Some(*number);
        }
    }
    for (alias, number) in &ALIASES {
        if *alias == lower {
            return Some(*number);
        }
    }

    // Partial match in either direction ("Garfield" → West Garfield Park,
    // "Hyde Park neighborhood" → Hyde Park). First hit in area order wins.
    for (number, name) in &AREAS {
        let name_lower = name.to_lowercase();
        if name_lower.contains(&lower) || lower.contains(&name_lower) {
            return Some(*number);
        }
    }
    for (alias, number) in &ALIASES {
        if alias.contains(lower.as_str()) || lower.contains(alias) {
            return Some(*number);
        }
    }

    None
}

/// Resolved canonical name, or the input title-cased when nothing
/// matches. Unresolved names flow into filters and simply match zero
/// rows, mirroring how an unknown area behaves in the source data.
pub fn canonical_or_title(value: &str) -> String {
    match resolve_area(value).and_then(area_name) {
        Some(name) => name.to_string(),
        None => title_case(value),
    }
}

pub fn title_case(value: &str) -> String {
    value
        .trim()
        .split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => {
                    first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase()
                }
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Township code containing a community area.
pub fn township_for_area(number: u32) -> Option<&'static str> {
    TOWNSHIPS
        .iter()
        .find(|(_, _, members)| members.contains(&number))
        .map(|(code, _, _)| *code)
}

pub fn township_name(code: &str) -> Option<&'static str> {
    TOWNSHIPS
        .iter()
        .find(|(c, _, _)| *c == code)
        .map(|(_, name, _)| *name)
}

pub fn township_members(code: &str) -> &'static [u32] {
    TOWNSHIPS
        .iter()
        .find(|(c, _, _)| *c == code)
        .map(|(_, _, members)| *members)
        .unwrap_or(&[])
}

/// Display label for a township: its name plus a sample of member areas.
pub fn township_label(code: &str) -> String {
    let name = match township_name(code) {
        Some(name) => format!("{name} Township"),
        None => format!("Township {code}"),
    };
    let members = township_members(code);
    if members.is_empty() {
        return name;
    }
    let sample: Vec<&str> = members.iter().take(5).filter_map(|n| area_name(*n)).collect();
    let suffix = if members.len() > 5 {
        format!(" +{} more", members.len() - 5)
    } else {
        String::new()
    };
    format!("{name} (includes {}{suffix})", sample.join(", "))
}

/// Resolve free text to a township code, going through the community
/// area lookup when the text is not already a township code.
pub fn resolve_township(value: &str) -> Option<&'static str> {
    let trimmed = value.trim();
    if TOWNSHIPS.iter().any(|(code, _, _)| *code == trimmed) {
        return TOWNSHIPS
            .iter()
            .find(|(code, _, _)| *code == trimmed)
            .map(|(code, _, _)| *code);
    }
    resolve_area(trimmed).and_then(township_for_area)
}
