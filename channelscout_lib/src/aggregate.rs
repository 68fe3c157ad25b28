//! Merging per-candidate results into one record per channel.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::contact::ContactInfo;
use crate::navigate::ExtractionResult;

/// Aggregated form of a channel, keyed by `channel_link`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChannelRecord {
    pub channel_link: String,
    pub contact_info: ContactInfo,
    pub country: String,
    pub subscribers: u64,
    pub videos: u64,
    pub views: u64,
    pub scraped_at: DateTime<Utc>,
}

impl ChannelRecord {
    pub fn from_result(result: &ExtractionResult, scraped_at: DateTime<Utc>) -> Self {
        Self {
            channel_link: result.channel_link.clone(),
            contact_info: result.contact_info.clone(),
            country: result.country.clone(),
            subscribers: result.subscribers,
            videos: result.videos,
            views: result.views,
            scraped_at,
        }
    }
}

pub fn aggregate(results: &[ExtractionResult]) -> BTreeMap<String, ChannelRecord> {
    aggregate_at(results, Utc::now())
}

/// Keep extracted results with a channel link, last one per link wins.
///
/// Skipped results never reach the map, whatever partial fields they carry.
pub fn aggregate_at(
    results: &[ExtractionResult],
    now: DateTime<Utc>,
) -> BTreeMap<String, ChannelRecord> {
    let mut records = BTreeMap::new();
    let mut overwrites = 0usize;

    for result in results {
        if !result.is_extracted() || result.channel_link.is_empty() {
            continue;
        }
        let record = ChannelRecord::from_result(result, now);
        if records.insert(result.channel_link.clone(), record).is_some() {
            overwrites += 1;
            tracing::debug!(
                "{} seen again via {}, replacing earlier record",
                result.channel_link,
                result.candidate
            );
        }
    }

    if overwrites > 0 {
        tracing::info!(
            "{} channels aggregated, {} duplicate visits overwritten",
            records.len(),
            overwrites
        );
    }
    records
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::navigate::{ExtractionStatus, NavState, SkipReason};
    use chrono::TimeZone;

    fn extracted(candidate: &str, link: &str, subscribers: u64) -> ExtractionResult {
        ExtractionResult {
            channel_link: link.to_string(),
            subscribers,
            stages: vec![NavState::SearchResult, NavState::Extracted],
            ..ExtractionResult::new(candidate)
        }
    }

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn duplicate_link_keeps_second_visit() {
        let mut first = extracted("v1", "youtube.com/@a", 100);
        first.contact_info = ContactInfo::Emails(vec!["a@a.com".into()]);
        first.country = "Россия".into();
        let second = extracted("v2", "youtube.com/@a", 200);

        let map = aggregate_at(&[first, second.clone()], fixed_now());
        assert_eq!(map.len(), 1);
        assert_eq!(map["youtube.com/@a"], ChannelRecord::from_result(&second, fixed_now()));
        assert_eq!(map["youtube.com/@a"].contact_info, ContactInfo::None);
    }

    #[test]
    fn skipped_and_keyless_results_are_dropped() {
        let mut skipped = extracted("v1", "youtube.com/@partial", 5);
        skipped.status = ExtractionStatus::Skipped(SkipReason::ShortsLinkMissing);
        let keyless = extracted("v2", "", 7);
        let ok = extracted("v3", "youtube.com/@ok", 9);

        let map = aggregate_at(&[skipped, keyless, ok], fixed_now());
        assert_eq!(map.keys().collect::<Vec<_>>(), vec!["youtube.com/@ok"]);
    }

    #[test]
    fn records_are_ordered_by_key_and_stamped() {
        let results = [
            extracted("v1", "youtube.com/@zeta", 1),
            extracted("v2", "youtube.com/@alpha", 2),
        ];
        let map = aggregate_at(&results, fixed_now());
        assert_eq!(
            map.keys().collect::<Vec<_>>(),
            vec!["youtube.com/@alpha", "youtube.com/@zeta"]
        );
        assert!(map.values().all(|r| r.scraped_at == fixed_now()));
    }

    #[test]
    fn empty_input_is_empty_map() {
        assert!(aggregate(&[]).is_empty());
    }
}
