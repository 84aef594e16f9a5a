//! Country taxonomy.
//!
//! Three independent classifications are driven by ordered rule tables, each
//! evaluated top to bottom with the first match winning:
//!
//! * region: every country lands in exactly one [`Region`], `Asia` when no rule
//!   matches;
//! * breakdown group: region-scoped sub-grouping used by the regional analysis,
//!   absent when no rule for the country's region matches;
//! * display group: grouping for the country/region chart, falling back to the
//!   trimmed country name so every row is counted somewhere.
//!
//! All matching runs on the trimmed, lower-cased country.

use crate::models::Region;

use Label::{Fixed, TitleCase};
use Matcher::{Contains, Exact, OneOf, Prefix, Qualified};

const ANGLOPHONE_AFRICA: &[&str] = &["ghana", "nigeria", "south africa", "kenya"];
const ANGLOPHONE_OTHER: &[&str] = &[
    "united states",
    "canada",
    "united kingdom",
    "australia",
    "new zealand",
    "ireland",
    "singapore",
];
const FRANCOPHONE_AFRICA: &[&str] = &["senegal", "cote d'ivoire", "cameroon"];
const FRANCOPHONE_OTHER: &[&str] = &["france", "belgium", "switzerland", "canada (french)"];
const PALOP: &[&str] = &[
    "angola",
    "mozambique",
    "cape verde",
    "guinea-bissau",
    "sao tome and principe",
    "east timor",
];
const LATAM_COUNTRIES: &[&str] = &[
    "brazil",
    "mexico",
    "argentina",
    "colombia",
    "chile",
    "peru",
    "ecuador",
    "venezuela",
];
const SOUTH_ASIA: &[&str] = &["india", "pakistan", "sri lanka"];
const EAST_ASIA: &[&str] = &[
    "china",
    "japan",
    "korea",
    "thailand",
    "vietnam",
    "indonesia",
    "malaysia",
    "philippines",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Matcher {
    Exact(&'static str),
    Prefix(&'static str),
    /// Prefix followed by a non-blank remainder, as in `africa: togo`.
    Qualified(&'static str),
    /// Substring containment of any keyword.
    Contains(&'static [&'static str]),
    /// Equality with any listed name.
    OneOf(&'static [&'static str]),
}

impl Matcher {
    pub fn matches(&self, key: &str) -> bool {
        match self {
            Matcher::Exact(name) => key == *name,
            Matcher::Prefix(prefix) => key.starts_with(prefix),
            Matcher::Qualified(prefix) => key
                .strip_prefix(prefix)
                .is_some_and(|rest| !rest.trim().is_empty()),
            Matcher::Contains(keywords) => keywords.iter().any(|k| key.contains(k)),
            Matcher::OneOf(names) => names.iter().any(|n| *n == key),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Label {
    Fixed(&'static str),
    /// The lower-cased country with each space-separated word capitalized.
    TitleCase,
}

impl Label {
    fn render(&self, key: &str) -> String {
        match self {
            Label::Fixed(label) => (*label).to_string(),
            Label::TitleCase => title_case(key),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Rule<T> {
    pub matcher: Matcher,
    pub outcome: T,
}

const fn rule<T>(matcher: Matcher, outcome: T) -> Rule<T> {
    Rule { matcher, outcome }
}

#[derive(Debug, Clone, Copy)]
pub struct Scoped {
    pub region: Region,
    pub label: Label,
}

const fn scoped(region: Region, label: Label) -> Scoped {
    Scoped { region, label }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub region: Region,
    pub breakdown_group: Option<String>,
    pub display_group: String,
}

#[derive(Debug, Clone, Copy)]
pub struct Taxonomy {
    pub regions: &'static [Rule<Region>],
    pub fallback_region: Region,
    pub breakdown: &'static [Rule<Scoped>],
    pub display: &'static [Rule<Label>],
}

pub const STANDARD: Taxonomy = Taxonomy {
    regions: &[
        rule(Exact("latam"), Region::Latam),
        rule(Prefix("africa"), Region::Africa),
    ],
    fallback_region: Region::Asia,
    breakdown: &[
        rule(Contains(&["anglophone"]), scoped(Region::Africa, Fixed("Anglophone"))),
        rule(Contains(ANGLOPHONE_AFRICA), scoped(Region::Africa, Fixed("Anglophone"))),
        rule(Contains(&["francophone"]), scoped(Region::Africa, Fixed("Francophone"))),
        rule(Contains(FRANCOPHONE_AFRICA), scoped(Region::Africa, Fixed("Francophone"))),
        rule(Contains(&["palop"]), scoped(Region::Africa, Fixed("PALOP"))),
        rule(Contains(PALOP), scoped(Region::Africa, Fixed("PALOP"))),
        rule(Qualified("africa:"), scoped(Region::Africa, Fixed("Other Africa"))),
        rule(Exact("africa"), scoped(Region::Africa, Fixed("Africa"))),
        rule(Contains(&["latam", "spanish speaking"]), scoped(Region::Latam, Fixed("LATAM"))),
        rule(Contains(LATAM_COUNTRIES), scoped(Region::Latam, Fixed("LATAM"))),
        rule(Contains(SOUTH_ASIA), scoped(Region::Asia, TitleCase)),
        rule(Contains(EAST_ASIA), scoped(Region::Asia, Fixed("Others"))),
    ],
    display: &[
        rule(Exact("latam"), Fixed("Latam")),
        rule(Exact("sri lanka"), Fixed("Sri Lanka")),
        rule(Exact("india"), Fixed("India")),
        rule(Exact("pakistan"), Fixed("Pakistan")),
        rule(Exact("anglophone"), Fixed("Anglophone")),
        rule(Exact("francophone"), Fixed("Francophone")),
        rule(Exact("palop"), Fixed("PALOP")),
        rule(Prefix("africa:"), Fixed("Africa")),
        rule(OneOf(ANGLOPHONE_OTHER), Fixed("Anglophone")),
        rule(OneOf(ANGLOPHONE_AFRICA), Fixed("Anglophone")),
        rule(OneOf(FRANCOPHONE_OTHER), Fixed("Francophone")),
        rule(OneOf(FRANCOPHONE_AFRICA), Fixed("Francophone")),
        rule(OneOf(PALOP), Fixed("PALOP")),
        rule(OneOf(LATAM_COUNTRIES), Fixed("Latam")),
        rule(OneOf(EAST_ASIA), Fixed("Asia")),
    ],
};

impl Taxonomy {
    pub fn region(&self, country: &str) -> Region {
        let key = normalize(country);
        self.regions
            .iter()
            .find(|r| r.matcher.matches(&key))
            .map(|r| r.outcome)
            .unwrap_or(self.fallback_region)
    }

    pub fn breakdown_group(&self, country: &str, region: Region) -> Option<String> {
        let key = normalize(country);
        self.breakdown
            .iter()
            .filter(|r| r.outcome.region == region)
            .find(|r| r.matcher.matches(&key))
            .map(|r| r.outcome.label.render(&key))
    }

    pub fn display_group(&self, country: &str) -> String {
        let key = normalize(country);
        self.display
            .iter()
            .find(|r| r.matcher.matches(&key))
            .map(|r| r.outcome.render(&key))
            .unwrap_or_else(|| country.trim().to_string())
    }

    pub fn classify(&self, country: &str) -> Classification {
        let region = self.region(country);
        Classification {
            region,
            breakdown_group: self.breakdown_group(country, region),
            display_group: self.display_group(country),
        }
    }
}

pub fn classify_region(country: &str) -> Region {
    STANDARD.region(country)
}

pub fn classify_breakdown_group(country: &str, region: Region) -> Option<String> {
    STANDARD.breakdown_group(country, region)
}

pub fn classify_country_display_group(country: &str) -> String {
    STANDARD.display_group(country)
}

pub fn classify(country: &str) -> Classification {
    STANDARD.classify(country)
}

fn normalize(country: &str) -> String {
    country.trim().to_lowercase()
}

fn title_case(key: &str) -> String {
    key.split(' ')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}
