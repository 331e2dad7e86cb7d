//! Flyer descriptor inference from link text and URLs.
//!
//! Best-effort keyword and pattern matching; never fails. Fields that cannot
//! be found stay unset and the type falls back to `unknown`. The title is
//! always consulted first, the URL path only when the title has nothing.

use std::sync::LazyLock;

use chrono::{Datelike, Utc};
use regex::Regex;

use crate::models::{FlyerDescriptor, FlyerType, Month};

/// Type keywords, most specific first. "Reiseangebote" is a travel magazine,
/// not a weekly offer.
const TYPE_KEYWORDS: &[(&str, FlyerType)] = &[
    ("reise", FlyerType::TravelMagazine),
    ("garten", FlyerType::GardenBrochure),
    ("beilage", FlyerType::InlineFlyer),
    ("einleger", FlyerType::InlineFlyer),
    ("inline", FlyerType::InlineFlyer),
    ("angebot", FlyerType::WeeklyOffer),
    ("aktion", FlyerType::WeeklyOffer),
    ("wochen", FlyerType::WeeklyOffer),
];

/// German and English month names.
const MONTH_NAMES: &[(&str, Month)] = &[
    ("januar", Month::January),
    ("january", Month::January),
    ("februar", Month::February),
    ("february", Month::February),
    ("märz", Month::March),
    ("maerz", Month::March),
    ("march", Month::March),
    ("april", Month::April),
    ("mai", Month::May),
    ("may", Month::May),
    ("juni", Month::June),
    ("june", Month::June),
    ("juli", Month::July),
    ("july", Month::July),
    ("august", Month::August),
    ("september", Month::September),
    ("oktober", Month::October),
    ("october", Month::October),
    ("november", Month::November),
    ("dezember", Month::December),
    ("december", Month::December),
];

static WEEK_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)kw\s?\.?\s?(\d{1,2})(?:\D|$)").unwrap());

static MONTH_NAME_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    let names: Vec<&str> = MONTH_NAMES.iter().map(|(name, _)| *name).collect();
    Regex::new(&format!(r"(?i)\b({})\b", names.join("|"))).unwrap()
});

static NUMERIC_MONTH_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:^|\D)(0?[1-9]|1[0-2])[./-](\d{4})(?:\D|$)").unwrap());

static DIGIT_RUN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d+").unwrap());

/// Infers [`FlyerDescriptor`]s relative to a reference year.
#[derive(Debug, Clone, Copy)]
pub struct DescriptorParser {
    reference_year: i32,
}

impl Default for DescriptorParser {
    fn default() -> Self {
        Self::new(Utc::now().year())
    }
}

impl DescriptorParser {
    /// Years within `reference_year ± 1` are accepted.
    pub fn new(reference_year: i32) -> Self {
        Self { reference_year }
    }

    pub fn reference_year(&self) -> i32 {
        self.reference_year
    }

    /// Parse a descriptor from a link title and URL.
    pub fn parse(&self, title: &str, url: &str) -> FlyerDescriptor {
        let title = normalize(title);
        let path = normalize(&url_path(url));
        let sources = [title.as_str(), path.as_str()];

        let flyer_type = sources
            .iter()
            .find_map(|s| detect_type(s))
            .unwrap_or_default();
        let calendar_week = sources.iter().find_map(|s| detect_week(s));
        let month = if calendar_week.is_some() {
            // "KW 12/2025" must not read as December.
            sources.iter().find_map(|s| detect_month_name(s))
        } else {
            sources
                .iter()
                .find_map(|s| detect_month_name(s).or_else(|| detect_numeric_month(s)))
        };
        let year = sources.iter().find_map(|s| self.detect_year(s));

        FlyerDescriptor {
            flyer_type,
            calendar_week,
            month,
            year,
        }
    }

    fn detect_year(&self, text: &str) -> Option<i32> {
        DIGIT_RUN
            .find_iter(text)
            .filter(|m| m.as_str().len() == 4)
            .filter_map(|m| m.as_str().parse::<i32>().ok())
            .find(|year| (year - self.reference_year).abs() <= 1)
    }
}

fn detect_type(text: &str) -> Option<FlyerType> {
    let lower = text.to_lowercase();
    TYPE_KEYWORDS
        .iter()
        .find(|(keyword, _)| lower.contains(keyword))
        .map(|(_, flyer_type)| *flyer_type)
}

fn detect_week(text: &str) -> Option<u8> {
    WEEK_PATTERN
        .captures_iter(text)
        .filter_map(|caps| caps.get(1)?.as_str().parse::<u8>().ok())
        .find(|week| (1..=53).contains(week))
}

fn detect_month_name(text: &str) -> Option<Month> {
    let caps = MONTH_NAME_PATTERN.captures(text)?;
    let found = caps.get(1)?.as_str().to_lowercase();
    MONTH_NAMES
        .iter()
        .find(|(name, _)| *name == found)
        .map(|(_, month)| *month)
}

fn detect_numeric_month(text: &str) -> Option<Month> {
    let caps = NUMERIC_MONTH_PATTERN.captures(text)?;
    let n: u32 = caps.get(1)?.as_str().parse().ok()?;
    Month::from_number(n)
}

/// Underscores are word characters for `\b`, so treat them as spaces.
fn normalize(text: &str) -> String {
    text.replace('_', " ")
}

/// Path and query of a URL; hosts such as `prospekt.aldi-sued.de` would
/// otherwise look like keywords.
fn url_path(url: &str) -> String {
    match url::Url::parse(url) {
        Ok(parsed) => {
            let mut path = parsed.path().to_string();
            if let Some(query) = parsed.query() {
                path.push(' ');
                path.push_str(query);
            }
            path
        }
        Err(_) => url.to_string(),
    }
}
