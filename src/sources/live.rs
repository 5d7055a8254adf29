// src/sources/live.rs - Rate-limited, cursor-paginated live queries
use chrono::NaiveDate;
use log::{debug, warn};
use serde::Deserialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

use crate::models::core::{
    ContributionRecord, EarmarkMarkers, Location, Provenance, RecipientCandidate,
};
use crate::sources::{CoverageNote, DataSource, FetchResponse};
use crate::utils::env::EngineConfig;

/// What the live fetch is searching by.
#[derive(Debug, Clone)]
pub enum LiveQuery {
    Collector(String),
    ContributorName(String),
}

/// Pagination cursor as returned by the query service; echoed back
/// verbatim on the next page request.
#[derive(Debug, Clone, Deserialize)]
pub struct LiveCursor {
    pub last_index: Option<String>,
    pub last_contribution_receipt_date: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LivePagination {
    last_indexes: Option<LiveCursor>,
}

#[derive(Debug, Deserialize)]
struct LivePage {
    results: Vec<LiveWireRecord>,
    pagination: Option<LivePagination>,
}

/// One transaction as the query service serializes it. Converted (and
/// validated) into a ContributionRecord at this boundary; matching
/// logic never sees wire shapes.
#[derive(Debug, Deserialize)]
pub struct LiveWireRecord {
    pub sub_id: Option<String>,
    pub image_number: Option<String>,
    pub contributor_name: Option<String>,
    pub contribution_receipt_amount: Option<f64>,
    pub contribution_receipt_date: Option<String>,
    pub committee_id: Option<String>,
    pub committee_name: Option<String>,
    pub contributor_city: Option<String>,
    pub contributor_state: Option<String>,
    pub memo_code: Option<String>,
    pub memo_text: Option<String>,
    pub candidate_id: Option<String>,
    pub candidate_name: Option<String>,
}

pub fn wire_to_record(wire: LiveWireRecord) -> Option<ContributionRecord> {
    let record = ContributionRecord {
        contributor_name: wire.contributor_name.unwrap_or_default(),
        amount: wire.contribution_receipt_amount.unwrap_or(0.0),
        date: wire
            .contribution_receipt_date
            .as_deref()
            .and_then(|d| NaiveDate::parse_from_str(&d[..d.len().min(10)], "%Y-%m-%d").ok()),
        collector_id: wire.committee_id.unwrap_or_default(),
        collector_name: wire.committee_name.unwrap_or_default(),
        location: Location::new(
            wire.contributor_city.as_deref(),
            wire.contributor_state.as_deref(),
        ),
        recipient_candidate: match (wire.candidate_id, wire.candidate_name) {
            (Some(id), Some(name)) if !id.is_empty() => Some(RecipientCandidate { id, name }),
            _ => None,
        },
        earmark_markers: {
            let flag = wire.memo_code.as_deref() == Some("X");
            if flag || wire.memo_text.is_some() {
                Some(EarmarkMarkers {
                    flag,
                    text: wire.memo_text,
                })
            } else {
                None
            }
        },
        provenance: Provenance {
            record_id: wire.sub_id.unwrap_or_default(),
            source_document_ref: wire.image_number,
        },
    };
    record.is_wellformed().then_some(record)
}

/// Client for the live contribution query service. One instance is
/// shared process-wide so the minimum inter-call interval really is
/// process-wide, not per-request.
pub struct LiveContributionClient {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    min_interval: Duration,
    call_timeout: Duration,
    max_pages_per_period: u32,
    page_size: u32,
    last_call: Arc<Mutex<Option<Instant>>>,
}

impl LiveContributionClient {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: config.live_base_url.clone(),
            api_key: config.live_api_key.clone(),
            min_interval: config.min_call_interval,
            call_timeout: config.call_timeout,
            max_pages_per_period: config.max_pages_per_period,
            page_size: config.page_size,
            last_call: Arc::new(Mutex::new(None)),
        }
    }

    /// Enforce the minimum spacing between calls.
    async fn pace(&self) {
        let mut last = self.last_call.lock().await;
        if let Some(previous) = *last {
            let elapsed = previous.elapsed();
            if elapsed < self.min_interval {
                tokio::time::sleep(self.min_interval - elapsed).await;
            }
        }
        *last = Some(Instant::now());
    }

    async fn fetch_page(
        &self,
        query: &LiveQuery,
        cycle: i32,
        cursor: Option<&LiveCursor>,
    ) -> Result<LivePage, PageFailure> {
        self.pace().await;

        let url = format!("{}/schedules/schedule_a/", self.base_url);
        let mut params: Vec<(String, String)> = vec![
            ("two_year_transaction_period".to_string(), cycle.to_string()),
            ("per_page".to_string(), self.page_size.to_string()),
            ("sort".to_string(), "-contribution_receipt_date".to_string()),
        ];
        match query {
            LiveQuery::Collector(id) => params.push(("committee_id".to_string(), id.clone())),
            LiveQuery::ContributorName(name) => {
                params.push(("contributor_name".to_string(), name.clone()))
            }
        }
        if let Some(key) = &self.api_key {
            params.push(("api_key".to_string(), key.clone()));
        }
        if let Some(cursor) = cursor {
            if let Some(index) = &cursor.last_index {
                params.push(("last_index".to_string(), index.clone()));
            }
            if let Some(date) = &cursor.last_contribution_receipt_date {
                params.push(("last_contribution_receipt_date".to_string(), date.clone()));
            }
        }

        let request = self.http.get(&url).query(&params).send();
        let response = match tokio::time::timeout(self.call_timeout, request).await {
            Err(_) => return Err(PageFailure::Timeout),
            Ok(Err(e)) => {
                warn!("Live: request failed for cycle {}: {}", cycle, e);
                return Err(PageFailure::Timeout);
            }
            Ok(Ok(response)) => response,
        };

        match tokio::time::timeout(self.call_timeout, response.json::<LivePage>()).await {
            Err(_) => Err(PageFailure::Timeout),
            Ok(Err(e)) => {
                warn!("Live: undecodable page for cycle {}: {}", cycle, e);
                Err(PageFailure::Timeout)
            }
            Ok(Ok(page)) => Ok(page),
        }
    }

    /// Fetch every requested cycle, newest first, each cursor-paginated
    /// up to the per-period page cap. A timeout aborts the current
    /// chunk and returns whatever has been accumulated, flagged
    /// partial; callers treat that as "retry later", not "no data".
    pub async fn fetch(&self, query: &LiveQuery, cycles: &[i32]) -> FetchResponse {
        let mut records: Vec<ContributionRecord> = Vec::new();
        let mut coverage_years: Vec<i32> = Vec::new();
        let mut notes: Vec<CoverageNote> = Vec::new();
        let mut is_partial = false;

        'cycles: for &cycle in cycles {
            let mut cursor: Option<LiveCursor> = None;
            let mut pages_fetched: u32 = 0;
            loop {
                if pages_fetched >= self.max_pages_per_period {
                    debug!("Live: page cap reached for cycle {}", cycle);
                    notes.push(CoverageNote::PageCapReached { cycle });
                    is_partial = true;
                    break;
                }
                let page = match self.fetch_page(query, cycle, cursor.as_ref()).await {
                    Ok(page) => page,
                    Err(PageFailure::Timeout) => {
                        notes.push(CoverageNote::TimedOut { cycle });
                        is_partial = true;
                        break 'cycles;
                    }
                };
                pages_fetched += 1;

                let page_len = page.results.len();
                records.extend(page.results.into_iter().filter_map(wire_to_record));

                cursor = page.pagination.and_then(|p| p.last_indexes);
                let drained = page_len < self.page_size as usize
                    || cursor.as_ref().map_or(true, |c| c.last_index.is_none());
                if drained {
                    break;
                }
            }
            coverage_years.push(cycle);
        }

        coverage_years.sort_unstable();
        FetchResponse {
            records,
            coverage_years,
            source: DataSource::Live,
            is_partial,
            notes,
        }
    }
}

enum PageFailure {
    /// Covers both true timeouts and transport-level failures: in
    /// either case the answer is retry later, not "no data exists".
    Timeout,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wire(name: &str, sub_id: &str) -> LiveWireRecord {
        LiveWireRecord {
            sub_id: Some(sub_id.to_string()),
            image_number: Some("202401159591234567".to_string()),
            contributor_name: Some(name.to_string()),
            contribution_receipt_amount: Some(250.0),
            contribution_receipt_date: Some("2024-01-15".to_string()),
            committee_id: Some("C00401224".to_string()),
            committee_name: Some("ACTBLUE".to_string()),
            contributor_city: Some("Atlanta".to_string()),
            contributor_state: Some("GA".to_string()),
            memo_code: None,
            memo_text: None,
            candidate_id: None,
            candidate_name: None,
        }
    }

    #[test]
    fn wire_record_converts_with_parsed_date_and_location() {
        let record = wire_to_record(wire("MOSHE STERN", "SA-1")).unwrap();
        assert_eq!(record.contributor_name, "MOSHE STERN");
        assert_eq!(record.date, NaiveDate::from_ymd_opt(2024, 1, 15));
        assert_eq!(record.location.state.as_deref(), Some("GA"));
        assert_eq!(record.provenance.record_id, "SA-1");
        assert_eq!(
            record.provenance.source_document_ref.as_deref(),
            Some("202401159591234567")
        );
    }

    #[test]
    fn wire_record_without_required_fields_is_dropped() {
        let mut missing_name = wire("", "SA-2");
        missing_name.contributor_name = None;
        assert!(wire_to_record(missing_name).is_none());

        let mut missing_sub_id = wire("MOSHE STERN", "");
        missing_sub_id.sub_id = None;
        assert!(wire_to_record(missing_sub_id).is_none());
    }

    #[test]
    fn memo_code_x_sets_the_earmark_flag() {
        let mut earmarked = wire("MOSHE STERN", "SA-3");
        earmarked.memo_code = Some("X".to_string());
        earmarked.memo_text = Some("EARMARKED FOR FRIENDS OF SMITH".to_string());
        let record = wire_to_record(earmarked).unwrap();
        let markers = record.earmark_markers.unwrap();
        assert!(markers.flag);
        assert!(markers.text.unwrap().contains("EARMARKED"));
    }

    #[test]
    fn candidate_fields_become_recipient_candidate() {
        let mut with_candidate = wire("MOSHE STERN", "SA-4");
        with_candidate.candidate_id = Some("H8GA05274".to_string());
        with_candidate.candidate_name = Some("SMITH, JANE".to_string());
        let record = wire_to_record(with_candidate).unwrap();
        let candidate = record.recipient_candidate.unwrap();
        assert_eq!(candidate.id, "H8GA05274");
    }

    #[test]
    fn page_json_decodes_with_and_without_cursor() {
        let raw = r#"{
            "results": [{"sub_id": "1", "contributor_name": "A", "committee_id": "C1"}],
            "pagination": {"last_indexes": {"last_index": "999", "last_contribution_receipt_date": "2024-01-01"}}
        }"#;
        let page: LivePage = serde_json::from_str(raw).unwrap();
        assert_eq!(page.results.len(), 1);
        assert!(page.pagination.unwrap().last_indexes.unwrap().last_index.is_some());

        let drained = r#"{"results": [], "pagination": {"last_indexes": null}}"#;
        let page: LivePage = serde_json::from_str(drained).unwrap();
        assert!(page.pagination.unwrap().last_indexes.is_none());
    }
}
