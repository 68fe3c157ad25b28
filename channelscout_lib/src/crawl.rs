//! Search-page harvesting and sequential candidate processing.

use std::collections::BTreeMap;

use thiserror::Error;

use crate::aggregate::{aggregate, ChannelRecord};
use crate::driver::PageDriver;
use crate::layout::{LayoutError, PageLayout};
use crate::navigate::{bounded, open_with_retry, resolve, ExtractionResult, NavigationStateMachine};

/// Conditions that end a crawl before any candidate is processed.
#[derive(Error, Debug)]
pub enum CrawlError {
    #[error("search page {url} unavailable: {reason}")]
    SearchUnavailable { url: String, reason: String },
    #[error("no candidate links found for query '{0}'")]
    NoCandidates(String),
    #[error(transparent)]
    Layout(#[from] LayoutError),
}

/// Observes each finished candidate: `(done, total, result)`.
pub type ProgressFn<'a> = Box<dyn FnMut(usize, usize, &ExtractionResult) + Send + 'a>;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrawlReport {
    pub query: String,
    pub results: Vec<ExtractionResult>,
}

impl CrawlReport {
    pub fn extracted(&self) -> impl Iterator<Item = &ExtractionResult> {
        self.results.iter().filter(|r| r.is_extracted())
    }

    pub fn skipped(&self) -> impl Iterator<Item = &ExtractionResult> {
        self.results.iter().filter(|r| !r.is_extracted())
    }

    /// Number of skipped candidates per reason code.
    pub fn skip_tally(&self) -> BTreeMap<&'static str, usize> {
        let mut tally = BTreeMap::new();
        for reason in self.results.iter().filter_map(|r| r.skip_reason()) {
            *tally.entry(reason.kind()).or_insert(0) += 1;
        }
        tally
    }

    pub fn aggregate(&self) -> BTreeMap<String, ChannelRecord> {
        aggregate(&self.results)
    }
}

pub struct Crawler<'a, D: PageDriver + ?Sized> {
    driver: &'a mut D,
    layout: &'a PageLayout,
    machine: &'a NavigationStateMachine,
    max_candidates: Option<usize>,
    progress: Option<ProgressFn<'a>>,
}

impl<'a, D: PageDriver + ?Sized> Crawler<'a, D> {
    pub fn new(driver: &'a mut D, layout: &'a PageLayout, machine: &'a NavigationStateMachine) -> Self {
        Self {
            driver,
            layout,
            machine,
            max_candidates: None,
            progress: None,
        }
    }

    pub fn with_max_candidates(mut self, max: Option<usize>) -> Self {
        self.max_candidates = max;
        self
    }

    pub fn on_progress(mut self, progress: ProgressFn<'a>) -> Self {
        self.progress = Some(progress);
        self
    }

    pub async fn run(&mut self, query: &str, scroll_rounds: u32) -> Result<CrawlReport, CrawlError> {
        let candidates = self.collect_candidates(query, scroll_rounds).await?;
        let mut report = self.run_candidates(&candidates).await;
        report.query = query.to_string();
        Ok(report)
    }

    /// Open the search page, scroll `scroll_rounds` times and harvest the
    /// distinct thumbnail links in first-seen order.
    pub async fn collect_candidates(
        &mut self,
        query: &str,
        scroll_rounds: u32,
    ) -> Result<Vec<String>, CrawlError> {
        let search_url = self.layout.search_url_for(query)?.to_string();
        let step_timeout = self.machine.step_timeout();
        let pacing = *self.machine.pacing();

        tracing::info!("Opening search results for '{}'", query);
        open_with_retry(
            &mut *self.driver,
            &search_url,
            step_timeout,
            self.machine.retry(),
            "open_search",
        )
        .await
        .map_err(|e| CrawlError::SearchUnavailable {
            url: search_url.clone(),
            reason: e.to_string(),
        })?;
        pacing.search.wait().await;

        for round in 1..=scroll_rounds {
            if let Err(e) = bounded(step_timeout, "scroll", self.driver.scroll_to_bottom()).await {
                tracing::warn!("scroll {}/{} failed: {}, stopping early", round, scroll_rounds, e);
                break;
            }
            tracing::debug!("scroll {}/{}", round, scroll_rounds);
            pacing.scroll.wait().await;
        }

        let hrefs = bounded(
            step_timeout,
            "collect_links",
            self.driver
                .attributes(&self.layout.selectors.thumbnail_link, "href"),
        )
        .await
        .map_err(|e| CrawlError::SearchUnavailable {
            url: search_url.clone(),
            reason: e.to_string(),
        })?;

        let mut candidates: Vec<String> = Vec::new();
        for href in hrefs.iter().map(|h| h.trim()).filter(|h| !h.is_empty()) {
            let link = resolve(&search_url, href);
            if !candidates.contains(&link) {
                candidates.push(link);
            }
        }

        if candidates.is_empty() {
            return Err(CrawlError::NoCandidates(query.to_string()));
        }
        tracing::info!("Collected {} candidate links", candidates.len());

        if let Some(max) = self.max_candidates {
            if candidates.len() > max {
                tracing::info!("Limiting to first {} candidates", max);
                candidates.truncate(max);
            }
        }
        Ok(candidates)
    }

    /// Process every candidate in order. Never aborts on a single candidate.
    pub async fn run_candidates(&mut self, candidates: &[String]) -> CrawlReport {
        let total = candidates.len();
        let mut report = CrawlReport::default();

        for (i, candidate) in candidates.iter().enumerate() {
            let result = self.machine.process(&mut *self.driver, candidate).await;
            if let Some(progress) = self.progress.as_mut() {
                progress(i + 1, total, &result);
            }
            report.results.push(result);
        }

        let extracted = report.extracted().count();
        tracing::info!(
            "Processed {} candidates: {} extracted, {} skipped",
            total,
            extracted,
            total - extracted
        );
        for (kind, count) in report.skip_tally() {
            tracing::info!("  skipped ({}): {}", kind, count);
        }
        report
    }
}
