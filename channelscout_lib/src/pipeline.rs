//! One scrape run: construct, run, export.

use std::collections::BTreeMap;

use crate::aggregate::ChannelRecord;
use crate::config::ScoutConfig;
use crate::crawl::{CrawlReport, Crawler, ProgressFn};
use crate::driver::{ChromePage, PageDriver};
use crate::error::ScoutError;
use crate::export::export_to_path;
use crate::layout::PageLayout;
use crate::navigate::NavigationStateMachine;

/// Owns the driver session for the lifetime of a run.
pub struct Pipeline<D: PageDriver> {
    config: ScoutConfig,
    layout: PageLayout,
    machine: NavigationStateMachine,
    driver: D,
}

impl<D: PageDriver> Pipeline<D> {
    /// Validates `config` and prepares the state machine for `layout`.
    pub fn new(mut config: ScoutConfig, layout: PageLayout, driver: D) -> Result<Self, ScoutError> {
        config.validate()?;
        let mut reader = layout.field_reader();
        if let Some(strategy) = config.field_strategy {
            reader = reader.with_strategy(strategy);
        }
        let machine = NavigationStateMachine::new(
            &layout,
            reader,
            config.pacing,
            config.step_timeout,
            config.retry,
        )?;
        Ok(Self {
            config,
            layout,
            machine,
            driver,
        })
    }

    pub fn config(&self) -> &ScoutConfig {
        &self.config
    }

    /// Crawl the configured query. Only search-page failures are errors.
    pub async fn run(&mut self, progress: Option<ProgressFn<'_>>) -> Result<CrawlReport, ScoutError> {
        tracing::info!(
            "Starting crawl for '{}' ({} scroll rounds)",
            self.config.query,
            self.config.scroll_rounds
        );
        let mut crawler = Crawler::new(&mut self.driver, &self.layout, &self.machine)
            .with_max_candidates(self.config.max_candidates);
        if let Some(progress) = progress {
            crawler = crawler.on_progress(progress);
        }
        let report = crawler
            .run(&self.config.query, self.config.scroll_rounds)
            .await?;
        Ok(report)
    }

    /// Aggregate `report` and write it to the configured output file.
    pub fn export(&self, report: &CrawlReport) -> Result<BTreeMap<String, ChannelRecord>, ScoutError> {
        let records = report.aggregate();
        export_to_path(&records, &self.config.output, self.config.export)?;
        Ok(records)
    }

    pub fn into_driver(self) -> D {
        self.driver
    }
}

impl Pipeline<ChromePage> {
    /// Launch or attach to Chrome per `config` and build the pipeline around it.
    pub async fn launch(mut config: ScoutConfig, layout: PageLayout) -> Result<Self, ScoutError> {
        config.validate()?;
        let driver = ChromePage::launch(&config.launch_options()).await?;
        Self::new(config, layout, driver)
    }

    pub async fn close(self) -> Result<(), ScoutError> {
        self.driver.close().await?;
        Ok(())
    }
}
