//! Per-candidate navigation: video page, optional shorts redirect, channel
//! about panel, field extraction.
//!
//! Each candidate yields an [`ExtractionResult`]. A failing stage never
//! propagates: it tags the result [`ExtractionStatus::Skipped`] with a
//! [`SkipReason`] and keeps whatever earlier stages gathered.

use std::fmt;
use std::future::Future;
use std::time::Duration;

use serde::Serialize;
use url::Url;

use crate::contact::{ContactCascade, ContactInfo};
use crate::driver::{DriverError, PageDriver};
use crate::fields::{ChannelFieldReader, FieldError};
use crate::layout::{LayoutError, PageLayout, Selectors};
use crate::pacing::{Pacing, RetryConfig};

pub const DEFAULT_STEP_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NavState {
    SearchResult,
    VideoPage,
    ShortsRedirect,
    ChannelAbout,
    Extracted,
}

impl fmt::Display for NavState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::SearchResult => "search_result",
            Self::VideoPage => "video_page",
            Self::ShortsRedirect => "shorts_redirect",
            Self::ChannelAbout => "channel_about",
            Self::Extracted => "extracted",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SkipReason {
    NavigationFailure { target: String },
    Timeout { step: String },
    MalformedPage { required: usize, found: usize },
    MissingField { field: String },
    ShortsLinkMissing,
    #[serde(rename = "driver_error")]
    Driver { message: String },
}

impl SkipReason {
    /// Stable reason code used in logs and tallies.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NavigationFailure { .. } => "navigation_failure",
            Self::Timeout { .. } => "timeout",
            Self::MalformedPage { .. } => "malformed_page",
            Self::MissingField { .. } => "missing_field",
            Self::ShortsLinkMissing => "shorts_link_missing",
            Self::Driver { .. } => "driver_error",
        }
    }

    /// Reason for a failed driver call made while reaching `target` during `step`.
    fn from_driver(err: DriverError, step: &str, target: &str) -> Self {
        match err {
            DriverError::Timeout(_) => Self::Timeout {
                step: step.to_string(),
            },
            DriverError::NoSuchElement(_) => Self::NavigationFailure {
                target: target.to_string(),
            },
            DriverError::Session(message) => Self::Driver { message },
        }
    }
}

impl From<FieldError> for SkipReason {
    fn from(e: FieldError) -> Self {
        match e {
            FieldError::MalformedPage { required, found } => Self::MalformedPage { required, found },
            FieldError::MissingField(field) => Self::MissingField { field },
        }
    }
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NavigationFailure { target } => write!(f, "navigation failure at {}", target),
            Self::Timeout { step } => write!(f, "timed out during {}", step),
            Self::MalformedPage { required, found } => write!(
                f,
                "malformed page: needed {} field cells, found {}",
                required, found
            ),
            Self::MissingField { field } => write!(f, "missing field {}", field),
            Self::ShortsLinkMissing => write!(f, "shorts page without a canonical video link"),
            Self::Driver { message } => write!(f, "driver error: {}", message),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "reason", rename_all = "snake_case")]
pub enum ExtractionStatus {
    Extracted,
    Skipped(SkipReason),
}

/// Outcome of one candidate. Skipped results keep partial fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExtractionResult {
    pub candidate: String,
    pub channel_link: String,
    pub contact_info: ContactInfo,
    pub country: String,
    pub subscribers: u64,
    pub videos: u64,
    pub views: u64,
    pub status: ExtractionStatus,
    pub stages: Vec<NavState>,
}

impl ExtractionResult {
    pub fn new(candidate: &str) -> Self {
        Self {
            candidate: candidate.to_string(),
            channel_link: String::new(),
            contact_info: ContactInfo::None,
            country: String::new(),
            subscribers: 0,
            videos: 0,
            views: 0,
            status: ExtractionStatus::Extracted,
            stages: Vec::new(),
        }
    }

    pub fn is_extracted(&self) -> bool {
        matches!(self.status, ExtractionStatus::Extracted)
    }

    pub fn skip_reason(&self) -> Option<&SkipReason> {
        match &self.status {
            ExtractionStatus::Skipped(reason) => Some(reason),
            ExtractionStatus::Extracted => None,
        }
    }

    /// Last stage reached, `search_result` for a candidate that never opened.
    pub fn last_stage(&self) -> NavState {
        self.stages.last().copied().unwrap_or(NavState::SearchResult)
    }
}

/// Drives one candidate link through the page sequence.
#[derive(Debug, Clone)]
pub struct NavigationStateMachine {
    selectors: Selectors,
    shorts_segment: String,
    reader: ChannelFieldReader,
    cascade: ContactCascade,
    pacing: Pacing,
    step_timeout: Duration,
    retry: RetryConfig,
}

impl NavigationStateMachine {
    pub fn new(
        layout: &PageLayout,
        reader: ChannelFieldReader,
        pacing: Pacing,
        step_timeout: Duration,
        retry: RetryConfig,
    ) -> Result<Self, LayoutError> {
        Ok(Self {
            selectors: layout.selectors.clone(),
            shorts_segment: layout.shorts_path_segment.clone(),
            reader,
            cascade: layout.contact_cascade()?,
            pacing,
            step_timeout,
            retry,
        })
    }

    pub fn pacing(&self) -> &Pacing {
        &self.pacing
    }

    pub fn step_timeout(&self) -> Duration {
        self.step_timeout
    }

    pub fn retry(&self) -> &RetryConfig {
        &self.retry
    }

    /// Process one candidate. Never fails: problems become a skipped result.
    pub async fn process<D>(&self, driver: &mut D, candidate: &str) -> ExtractionResult
    where
        D: PageDriver + ?Sized,
    {
        let mut result = ExtractionResult::new(candidate);
        result.stages.push(NavState::SearchResult);

        match self.drive(driver, &mut result).await {
            Ok(()) => {
                result.stages.push(NavState::Extracted);
                result.status = ExtractionStatus::Extracted;
                tracing::debug!("{} -> extracted {}", candidate, result.channel_link);
            }
            Err(reason) => {
                tracing::warn!(
                    "skipping {} at {} ({}): {}",
                    candidate,
                    result.last_stage(),
                    reason.kind(),
                    reason
                );
                result.status = ExtractionStatus::Skipped(reason);
            }
        }
        result
    }

    async fn drive<D>(&self, driver: &mut D, result: &mut ExtractionResult) -> Result<(), SkipReason>
    where
        D: PageDriver + ?Sized,
    {
        let sel = &self.selectors;
        let candidate = result.candidate.clone();

        open_with_retry(driver, &candidate, self.step_timeout, &self.retry, "open_candidate")
            .await
            .map_err(|e| SkipReason::from_driver(e, "open_candidate", &candidate))?;
        self.pacing.open.wait().await;
        result.stages.push(NavState::VideoPage);
        tracing::debug!("{} -> video page", candidate);

        let current = bounded(self.step_timeout, "current_url", driver.current_url())
            .await
            .map_err(|e| SkipReason::from_driver(e, "current_url", &candidate))?;
        if self.is_shorts(&current) {
            let href = match bounded(
                self.step_timeout,
                "shorts_link",
                driver.attribute(&sel.shorts_canonical_link, "href"),
            )
            .await
            {
                Ok(Some(href)) if !href.trim().is_empty() => href,
                Ok(_) | Err(DriverError::NoSuchElement(_)) => {
                    return Err(SkipReason::ShortsLinkMissing)
                }
                Err(e) => return Err(SkipReason::from_driver(e, "shorts_link", "shorts_link")),
            };
            let target = resolve(&current, href.trim());
            open_with_retry(driver, &target, self.step_timeout, &self.retry, "open_shorts_video")
                .await
                .map_err(|e| SkipReason::from_driver(e, "open_shorts_video", &target))?;
            bounded(self.step_timeout, "refresh", driver.refresh())
                .await
                .map_err(|e| SkipReason::from_driver(e, "refresh", &target))?;
            self.pacing.settle.wait().await;
            result.stages.push(NavState::ShortsRedirect);
            tracing::debug!("{} -> shorts redirect to {}", candidate, target);
        }

        if let Some(text) = self
            .contact_block(driver, &sel.video_description, "video_description")
            .await?
        {
            result.contact_info = self.cascade.extract(&[text]);
        }

        bounded(self.step_timeout, "click_channel_name", driver.click(&sel.channel_name))
            .await
            .map_err(|e| SkipReason::from_driver(e, "click_channel_name", "channel_name"))?;
        bounded(self.step_timeout, "refresh", driver.refresh())
            .await
            .map_err(|e| SkipReason::from_driver(e, "refresh", "channel_page"))?;
        self.pacing.settle.wait().await;
        bounded(self.step_timeout, "open_about", driver.click(&sel.about_opener))
            .await
            .map_err(|e| SkipReason::from_driver(e, "open_about", "about_opener"))?;
        result.stages.push(NavState::ChannelAbout);
        tracing::debug!("{} -> channel about", candidate);

        if result.contact_info.is_empty() {
            if let Some(text) = self
                .contact_block(driver, &sel.about_description, "about_description")
                .await?
            {
                result.contact_info = self.cascade.extract(&[text]);
            }
        }

        let cells = match bounded(
            self.step_timeout,
            "read_fields",
            driver.texts_within(&sel.about_fields_container, &sel.about_field_cell),
        )
        .await
        {
            Ok(cells) => cells,
            Err(DriverError::NoSuchElement(_)) => Vec::new(),
            Err(e) => return Err(SkipReason::from_driver(e, "read_fields", "about_fields")),
        };
        let fields = self.reader.read(&cells)?;
        let (subscribers, videos, views) = fields.counts();
        result.channel_link = fields.channel_link;
        result.country = fields.country;
        result.subscribers = subscribers;
        result.videos = videos;
        result.views = views;
        Ok(())
    }

    /// Text of an optional block. A missing block is `Ok(None)`.
    async fn contact_block<D>(
        &self,
        driver: &mut D,
        selector: &str,
        step: &str,
    ) -> Result<Option<String>, SkipReason>
    where
        D: PageDriver + ?Sized,
    {
        match bounded(self.step_timeout, step, driver.text(selector)).await {
            Ok(text) => Ok(Some(text)),
            Err(DriverError::NoSuchElement(_)) => {
                tracing::debug!("no {} block", step);
                Ok(None)
            }
            Err(e) => Err(SkipReason::from_driver(e, step, step)),
        }
    }

    fn is_shorts(&self, current_url: &str) -> bool {
        Url::parse(current_url)
            .ok()
            .and_then(|u| {
                u.path_segments()
                    .and_then(|mut segments| segments.next().map(|s| s == self.shorts_segment))
            })
            .unwrap_or(false)
    }
}

/// Run a driver call under a step timeout.
pub(crate) async fn bounded<T, F>(limit: Duration, step: &str, fut: F) -> Result<T, DriverError>
where
    F: Future<Output = Result<T, DriverError>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => Err(DriverError::Timeout(step.to_string())),
    }
}

/// Open `url`, retrying timeouts and session errors with backoff.
pub(crate) async fn open_with_retry<D>(
    driver: &mut D,
    url: &str,
    step_timeout: Duration,
    retry: &RetryConfig,
    step: &str,
) -> Result<(), DriverError>
where
    D: PageDriver + ?Sized,
{
    let mut attempt = 0usize;
    loop {
        match bounded(step_timeout, step, driver.open(url)).await {
            Ok(()) => return Ok(()),
            Err(err) => {
                attempt += 1;
                if attempt > retry.max_retries || err.is_no_such_element() {
                    return Err(err);
                }
                let delay = retry.delay_for_attempt(attempt);
                tracing::warn!(
                    "{} failed for {} (attempt {}/{}): {}, retrying in {:.1}s",
                    step,
                    url,
                    attempt,
                    retry.max_retries,
                    err,
                    delay.as_secs_f64()
                );
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
}

/// Resolve a possibly relative `href` against `base`.
pub(crate) fn resolve(base: &str, href: &str) -> String {
    Url::parse(base)
        .and_then(|b| b.join(href))
        .map(|u| u.to_string())
        .unwrap_or_else(|_| href.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn skip_reason_kinds_are_stable() {
        let reasons = [
            (SkipReason::NavigationFailure { target: "x".into() }, "navigation_failure"),
            (SkipReason::Timeout { step: "open".into() }, "timeout"),
            (SkipReason::MalformedPage { required: 20, found: 3 }, "malformed_page"),
            (SkipReason::MissingField { field: "channel_link".into() }, "missing_field"),
            (SkipReason::ShortsLinkMissing, "shorts_link_missing"),
            (SkipReason::Driver { message: "gone".into() }, "driver_error"),
        ];
        for (reason, kind) in reasons {
            assert_eq!(reason.kind(), kind);
        }
    }

    #[test]
    fn field_errors_become_skip_reasons() {
        assert_eq!(
            SkipReason::from(FieldError::MalformedPage { required: 20, found: 2 }),
            SkipReason::MalformedPage { required: 20, found: 2 }
        );
        assert_eq!(
            SkipReason::from(FieldError::MissingField("channel_link".into())),
            SkipReason::MissingField { field: "channel_link".into() }
        );
    }

    #[test]
    fn driver_errors_map_by_kind() {
        assert_eq!(
            SkipReason::from_driver(DriverError::Timeout("x".into()), "open_about", "about_opener"),
            SkipReason::Timeout { step: "open_about".into() }
        );
        assert_eq!(
            SkipReason::from_driver(DriverError::NoSuchElement("#a".into()), "open_about", "about_opener"),
            SkipReason::NavigationFailure { target: "about_opener".into() }
        );
        assert_eq!(
            SkipReason::from_driver(DriverError::Session("closed".into()), "s", "t"),
            SkipReason::Driver { message: "closed".into() }
        );
    }

    #[test]
    fn skip_reason_serializes_with_kind() {
        let json = serde_json::to_value(SkipReason::Driver { message: "m".into() }).unwrap();
        assert_eq!(json["kind"], "driver_error");
        let json = serde_json::to_value(SkipReason::ShortsLinkMissing).unwrap();
        assert_eq!(json["kind"], "shorts_link_missing");
    }

    #[test]
    fn resolve_relative_hrefs() {
        assert_eq!(
            resolve("https://www.youtube.com/results?search_query=a", "/watch?v=abc"),
            "https://www.youtube.com/watch?v=abc"
        );
        assert_eq!(
            resolve("https://www.youtube.com/shorts/xyz", "https://www.youtube.com/watch?v=xyz"),
            "https://www.youtube.com/watch?v=xyz"
        );
    }

    #[test]
    fn last_stage_defaults_to_search_result() {
        let r = ExtractionResult::new("https://example.test/v");
        assert_eq!(r.last_stage(), NavState::SearchResult);
        assert!(r.skip_reason().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn bounded_times_out_with_step_name() {
        let slow = async {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok::<_, DriverError>(())
        };
        let err = bounded(Duration::from_secs(1), "read_fields", slow).await.unwrap_err();
        assert_eq!(err, DriverError::Timeout("read_fields".into()));
    }
}
