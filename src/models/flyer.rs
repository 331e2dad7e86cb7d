//! Flyer models: the descriptor inferred from link text and the record
//! persisted for every downloaded flyer.

use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Category of a flyer, inferred from its link text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FlyerType {
    WeeklyOffer,
    TravelMagazine,
    GardenBrochure,
    InlineFlyer,
    #[default]
    Unknown,
}

impl FlyerType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::WeeklyOffer => "weekly-offer",
            Self::TravelMagazine => "travel-magazine",
            Self::GardenBrochure => "garden-brochure",
            Self::InlineFlyer => "inline-flyer",
            Self::Unknown => "unknown",
        }
    }

    /// Token used for this type in generated filenames.
    pub fn file_token(&self) -> &'static str {
        match self {
            Self::WeeklyOffer => "Wochenangebot",
            Self::TravelMagazine => "Reisemagazin",
            Self::GardenBrochure => "Gartenbroschuere",
            Self::InlineFlyer => "Beilage",
            Self::Unknown => "Prospekt",
        }
    }

    pub fn is_known(&self) -> bool {
        *self != Self::Unknown
    }
}

impl fmt::Display for FlyerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Calendar month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Month {
    January,
    February,
    March,
    April,
    May,
    June,
    July,
    August,
    September,
    October,
    November,
    December,
}

impl Month {
    pub const ALL: [Month; 12] = [
        Month::January,
        Month::February,
        Month::March,
        Month::April,
        Month::May,
        Month::June,
        Month::July,
        Month::August,
        Month::September,
        Month::October,
        Month::November,
        Month::December,
    ];

    /// Month from its 1-based number.
    pub fn from_number(n: u32) -> Option<Self> {
        if (1..=12).contains(&n) {
            Some(Self::ALL[(n - 1) as usize])
        } else {
            None
        }
    }

    /// German month name, as the retailer labels its flyers.
    pub fn german_name(&self) -> &'static str {
        match self {
            Self::January => "Januar",
            Self::February => "Februar",
            Self::March => "Maerz",
            Self::April => "April",
            Self::May => "Mai",
            Self::June => "Juni",
            Self::July => "Juli",
            Self::August => "August",
            Self::September => "September",
            Self::October => "Oktober",
            Self::November => "November",
            Self::December => "Dezember",
        }
    }
}

/// Structured fields inferred from a flyer's link text and URL.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlyerDescriptor {
    #[serde(rename = "type", default)]
    pub flyer_type: FlyerType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub calendar_week: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub month: Option<Month>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,
}

impl FlyerDescriptor {
    /// True when nothing beyond an unknown type was inferred.
    pub fn is_empty(&self) -> bool {
        !self.flyer_type.is_known()
            && self.calendar_week.is_none()
            && self.month.is_none()
            && self.year.is_none()
    }

    /// Whether this descriptor is specific enough for duplicate matching.
    ///
    /// Requires either a known type, or a year together with a calendar
    /// week or month. A week or month without a year names a recurring
    /// period, so it never matches on descriptor.
    pub fn is_matchable(&self) -> bool {
        let has_period = self.calendar_week.is_some() || self.month.is_some();
        if has_period && self.year.is_none() {
            return false;
        }
        self.flyer_type.is_known() || (self.year.is_some() && has_period)
    }

    /// Whether `other` agrees on every field populated in `self`.
    pub fn is_satisfied_by(&self, other: &FlyerDescriptor) -> bool {
        if self.flyer_type.is_known() && self.flyer_type != other.flyer_type {
            return false;
        }
        if self.calendar_week.is_some() && self.calendar_week != other.calendar_week {
            return false;
        }
        if self.month.is_some() && self.month != other.month {
            return false;
        }
        if self.year.is_some() && self.year != other.year {
            return false;
        }
        true
    }

    /// Period token for filenames: `KW17`, else the month name.
    pub fn period_token(&self) -> Option<String> {
        match (self.calendar_week, self.month) {
            (Some(week), _) => Some(format!("KW{:02}", week)),
            (None, Some(month)) => Some(month.german_name().to_string()),
            (None, None) => None,
        }
    }
}

/// A successfully downloaded flyer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlyerRecord {
    /// Flyer link as scraped from the listing page.
    pub url: String,
    /// Resolved PDF asset URL, when it differs from `url`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pdf_url: Option<String>,
    /// Raw link text.
    pub title: String,
    pub filename: String,
    pub filepath: PathBuf,
    /// SHA-256 of the downloaded bytes, hex encoded.
    pub content_hash: String,
    #[serde(default)]
    pub file_size: u64,
    pub downloaded_at: DateTime<Utc>,
    pub descriptor: FlyerDescriptor,
}

impl FlyerRecord {
    /// Compute SHA-256 hash of content.
    pub fn compute_hash(content: &[u8]) -> String {
        let mut hasher = Sha256::new();
        hasher.update(content);
        hex::encode(hasher.finalize())
    }
}
