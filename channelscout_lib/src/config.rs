//! Run configuration assembled from defaults and `CHANNELSCOUT_*` environment variables.
//!
//! CLI flags are applied on top by the binary.

use std::path::PathBuf;
use std::time::Duration;

use crate::driver::LaunchOptions;
use crate::error::ScoutError;
use crate::export::ExportOptions;
use crate::fields::FieldStrategy;
use crate::navigate::DEFAULT_STEP_TIMEOUT;
use crate::pacing::{parsed_var, Pacing, RetryConfig};
use crate::validation::{
    validate_max_candidates, validate_query, validate_scroll_rounds, validate_step_timeout,
};

pub const DEFAULT_SCROLL_ROUNDS: u32 = 10;
pub const DEFAULT_OUTPUT: &str = "output.csv";

#[derive(Debug, Clone, PartialEq)]
pub struct ScoutConfig {
    pub query: String,
    pub scroll_rounds: u32,
    pub pacing: Pacing,
    pub step_timeout: Duration,
    pub retry: RetryConfig,
    pub max_candidates: Option<usize>,
    /// Overrides the layout profile's strategy when set.
    pub field_strategy: Option<FieldStrategy>,
    /// DevTools websocket of a running Chrome to attach to instead of launching one.
    pub browser_url: Option<String>,
    pub chrome_path: Option<PathBuf>,
    pub headless: bool,
    pub output: PathBuf,
    pub export: ExportOptions,
}

impl ScoutConfig {
    /// Built-in defaults only.
    pub fn new(query: &str) -> Self {
        Self {
            query: query.to_string(),
            scroll_rounds: DEFAULT_SCROLL_ROUNDS,
            pacing: Pacing::default(),
            step_timeout: DEFAULT_STEP_TIMEOUT,
            retry: RetryConfig::default(),
            max_candidates: None,
            field_strategy: None,
            browser_url: None,
            chrome_path: None,
            headless: false,
            output: PathBuf::from(DEFAULT_OUTPUT),
            export: ExportOptions::default(),
        }
    }

    /// Defaults overridden by the process environment, after loading `.env`
    /// when one exists.
    pub fn from_env(query: &str) -> Self {
        dotenvy::dotenv().ok();
        Self::from_lookup(query, |key| std::env::var(key).ok())
    }

    pub fn from_lookup<F: Fn(&str) -> Option<String>>(query: &str, lookup: F) -> Self {
        let mut config = Self::new(query);
        if let Some(url) = lookup("CHANNELSCOUT_BROWSER_URL").filter(|u| !u.trim().is_empty()) {
            config.browser_url = Some(url.trim().to_string());
        }
        if let Some(path) = lookup("CHANNELSCOUT_CHROME_PATH").filter(|p| !p.trim().is_empty()) {
            config.chrome_path = Some(PathBuf::from(path.trim()));
        }
        if let Some(raw) = lookup("CHANNELSCOUT_HEADLESS") {
            config.headless = parse_bool(&raw).unwrap_or(config.headless);
        }
        let timeout_secs = parsed_var(
            &lookup,
            "CHANNELSCOUT_STEP_TIMEOUT_SECS",
            config.step_timeout.as_secs(),
        );
        config.step_timeout = Duration::from_secs(timeout_secs);
        config.retry = RetryConfig::from_lookup(&lookup);
        config
    }

    /// Validate and normalize the user-facing values in place.
    pub fn validate(&mut self) -> Result<(), ScoutError> {
        self.query = validate_query(&self.query)?;
        validate_scroll_rounds(self.scroll_rounds)?;
        validate_step_timeout(self.step_timeout.as_secs())?;
        if let Some(max) = self.max_candidates {
            validate_max_candidates(max)?;
        }
        Ok(())
    }

    /// Browser settings for this run. DevTools requests share the step timeout.
    pub fn launch_options(&self) -> LaunchOptions {
        LaunchOptions {
            browser_url: self.browser_url.clone(),
            chrome_path: self.chrome_path.clone(),
            headless: self.headless,
            request_timeout: self.step_timeout,
        }
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
