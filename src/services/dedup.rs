//! Duplicate detection against previously downloaded flyers.
//!
//! The retailer republishes the same flyer under rotating URLs and
//! occasionally re-renders identical PDFs, so three checks are applied in
//! order: exact URL, content hash, then descriptor fields. The first match
//! wins.

use std::fmt;

use crate::models::{FlyerDescriptor, FlyerRecord};

/// Which check identified a duplicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DuplicateReason {
    Url,
    ContentHash,
    Descriptor,
}

impl DuplicateReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            DuplicateReason::Url => "url",
            DuplicateReason::ContentHash => "content_hash",
            DuplicateReason::Descriptor => "descriptor",
        }
    }
}

impl fmt::Display for DuplicateReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A stored record that a candidate duplicates.
#[derive(Debug, Clone, Copy)]
pub struct DuplicateMatch<'a> {
    pub reason: DuplicateReason,
    pub record: &'a FlyerRecord,
}

/// Find the first stored record the candidate duplicates.
///
/// `content_hash` is only known once the bytes have been fetched. Descriptor
/// matching is skipped for descriptors that are not specific enough
/// (see [`FlyerDescriptor::is_matchable`]); when several records match on
/// descriptor, the earliest stored one is returned.
pub fn find_duplicate<'a>(
    url: &str,
    descriptor: &FlyerDescriptor,
    content_hash: Option<&str>,
    records: &'a [FlyerRecord],
) -> Option<DuplicateMatch<'a>> {
    if let Some(record) = records.iter().find(|r| r.url == url) {
        return Some(DuplicateMatch {
            reason: DuplicateReason::Url,
            record,
        });
    }

    if let Some(hash) = content_hash {
        if let Some(record) = records.iter().find(|r| r.content_hash == hash) {
            return Some(DuplicateMatch {
                reason: DuplicateReason::ContentHash,
                record,
            });
        }
    }

    if descriptor.is_matchable() {
        if let Some(record) = records
            .iter()
            .find(|r| descriptor.is_satisfied_by(&r.descriptor))
        {
            return Some(DuplicateMatch {
                reason: DuplicateReason::Descriptor,
                record,
            });
        }
    }

    None
}

/// Whether the candidate is already represented in `records`.
pub fn is_duplicate(
    url: &str,
    descriptor: &FlyerDescriptor,
    content_hash: Option<&str>,
    records: &[FlyerRecord],
) -> bool {
    find_duplicate(url, descriptor, content_hash, records).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{FlyerType, Month};
    use crate::services::descriptor::DescriptorParser;
    use chrono::Utc;
    use std::path::PathBuf;

    fn record(url: &str, hash: &str, descriptor: FlyerDescriptor) -> FlyerRecord {
        FlyerRecord {
            url: url.to_string(),
            pdf_url: None,
            title: "stored".to_string(),
            filename: "Aldi_Sued_Prospekt.pdf".to_string(),
            filepath: PathBuf::from("/tmp/Aldi_Sued_Prospekt.pdf"),
            content_hash: hash.to_string(),
            file_size: 10,
            downloaded_at: Utc::now(),
            descriptor,
        }
    }

    fn weekly_kw17() -> FlyerDescriptor {
        FlyerDescriptor {
            flyer_type: FlyerType::WeeklyOffer,
            calendar_week: Some(17),
            month: None,
            year: Some(2025),
        }
    }

    #[test]
    fn test_same_url_is_duplicate_regardless_of_descriptor() {
        let records = vec![record("http://a/1.pdf", "aaa", weekly_kw17())];
        let other = FlyerDescriptor {
            flyer_type: FlyerType::GardenBrochure,
            ..Default::default()
        };
        let m = find_duplicate("http://a/1.pdf", &other, None, &records).unwrap();
        assert_eq!(m.reason, DuplicateReason::Url);
        assert!(is_duplicate(
            "http://a/1.pdf",
            &FlyerDescriptor::default(),
            None,
            &records
        ));
    }

    #[test]
    fn test_same_hash_different_url_is_duplicate() {
        let records = vec![record("http://a/1.pdf", "aaa", FlyerDescriptor::default())];
        let m = find_duplicate("http://a/2.pdf", &FlyerDescriptor::default(), Some("aaa"), &records)
            .unwrap();
        assert_eq!(m.reason, DuplicateReason::ContentHash);
    }

    #[test]
    fn test_hash_not_checked_before_fetch() {
        let records = vec![record("http://a/1.pdf", "aaa", FlyerDescriptor::default())];
        assert!(!is_duplicate(
            "http://a/2.pdf",
            &FlyerDescriptor::default(),
            None,
            &records
        ));
    }

    #[test]
    fn test_identical_descriptor_is_duplicate() {
        let records = vec![record("http://a/1.pdf", "aaa", weekly_kw17())];
        let m = find_duplicate("http://a/2.pdf", &weekly_kw17(), Some("bbb"), &records).unwrap();
        assert_eq!(m.reason, DuplicateReason::Descriptor);
    }

    #[test]
    fn test_different_week_is_not_duplicate() {
        let records = vec![record("http://a/1.pdf", "aaa", weekly_kw17())];
        let kw18 = FlyerDescriptor {
            calendar_week: Some(18),
            ..weekly_kw17()
        };
        assert!(!is_duplicate("http://a/2.pdf", &kw18, Some("bbb"), &records));
    }

    #[test]
    fn test_unknown_descriptor_never_matches_on_descriptor() {
        let records = vec![record("http://a/1.pdf", "aaa", FlyerDescriptor::default())];
        assert!(!is_duplicate(
            "http://a/2.pdf",
            &FlyerDescriptor::default(),
            Some("bbb"),
            &records
        ));
    }

    #[test]
    fn test_unknown_type_with_year_only_is_skipped() {
        let year_only = FlyerDescriptor {
            year: Some(2025),
            ..Default::default()
        };
        let records = vec![record("http://a/1.pdf", "aaa", year_only.clone())];
        assert!(!is_duplicate("http://a/2.pdf", &year_only, Some("bbb"), &records));
    }

    #[test]
    fn test_unknown_type_with_month_and_year_matches() {
        let monthly = FlyerDescriptor {
            month: Some(Month::June),
            year: Some(2025),
            ..Default::default()
        };
        let stored = FlyerDescriptor {
            flyer_type: FlyerType::TravelMagazine,
            ..monthly.clone()
        };
        let records = vec![record("http://a/1.pdf", "aaa", stored)];
        assert!(is_duplicate("http://a/2.pdf", &monthly, None, &records));
    }

    #[test]
    fn test_yearless_week_does_not_match_previous_year() {
        let last_year = DescriptorParser::new(2024).parse(
            "Wochenangebot KW17 2024",
            "https://prospekt.aldi-sued.de/kw17-2024/page1",
        );
        let records = vec![record("https://prospekt.aldi-sued.de/kw17-2024/page1", "aaa", last_year)];
        let candidate = DescriptorParser::new(2025)
            .parse("Wochenangebot KW17", "https://prospekt.aldi-sued.de/kw17/page1");
        assert_eq!(candidate.year, None);
        assert!(find_duplicate(
            "https://prospekt.aldi-sued.de/kw17/page1",
            &candidate,
            None,
            &records
        )
        .is_none());
        assert!(is_duplicate(
            "https://prospekt.aldi-sued.de/kw17/page1",
            &candidate,
            Some("aaa"),
            &records
        ));
    }

    #[test]
    fn test_first_stored_match_wins() {
        let records = vec![
            record("http://a/1.pdf", "aaa", weekly_kw17()),
            record("http://a/2.pdf", "bbb", weekly_kw17()),
        ];
        let candidate = FlyerDescriptor {
            flyer_type: FlyerType::WeeklyOffer,
            ..Default::default()
        };
        let m = find_duplicate("http://a/3.pdf", &candidate, None, &records).unwrap();
        assert_eq!(m.record.url, "http://a/1.pdf");
    }

    #[test]
    fn test_url_check_precedes_hash_check() {
        let records = vec![
            record("http://a/1.pdf", "zzz", FlyerDescriptor::default()),
            record("http://a/2.pdf", "aaa", FlyerDescriptor::default()),
        ];
        let m = find_duplicate("http://a/1.pdf", &FlyerDescriptor::default(), Some("aaa"), &records)
            .unwrap();
        assert_eq!(m.reason, DuplicateReason::Url);
        assert_eq!(m.record.url, "http://a/1.pdf");
    }

    #[test]
    fn test_empty_store_has_no_duplicates() {
        assert!(!is_duplicate("http://a/1.pdf", &weekly_kw17(), Some("aaa"), &[]));
    }
}
