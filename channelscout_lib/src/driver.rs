//! The page automation capability the crawler needs, and its Chrome adapter.
//!
//! Everything above this module talks to a [`PageDriver`] so the state
//! machine and the crawler can be driven by a scripted fake in tests.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::error::CdpError;
use chromiumoxide::{Element, Page};
use futures::StreamExt;
use tokio::task::JoinHandle;

use crate::user_agent::get_user_agent;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum DriverError {
    #[error("no element matches {0}")]
    NoSuchElement(String),
    #[error("timed out during {0}")]
    Timeout(String),
    #[error("browser session error: {0}")]
    Session(String),
}

impl DriverError {
    pub fn is_no_such_element(&self) -> bool {
        matches!(self, Self::NoSuchElement(_))
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }
}

impl From<CdpError> for DriverError {
    fn from(e: CdpError) -> Self {
        match e {
            CdpError::Timeout => Self::Timeout("browser request".to_string()),
            CdpError::NotFound => Self::NoSuchElement("element".to_string()),
            other => Self::Session(other.to_string()),
        }
    }
}

/// One browser tab, driven sequentially. Selectors are CSS.
#[async_trait]
pub trait PageDriver: Send {
    async fn open(&mut self, url: &str) -> Result<(), DriverError>;

    async fn current_url(&mut self) -> Result<String, DriverError>;

    async fn refresh(&mut self) -> Result<(), DriverError>;

    async fn scroll_to_bottom(&mut self) -> Result<(), DriverError>;

    /// `attr` of every element matching `selector`, skipping elements without it.
    async fn attributes(&mut self, selector: &str, attr: &str) -> Result<Vec<String>, DriverError>;

    /// `attr` of the first element matching `selector`.
    ///
    /// `Err(NoSuchElement)` when nothing matches, `Ok(None)` when the element
    /// has no such attribute.
    async fn attribute(&mut self, selector: &str, attr: &str) -> Result<Option<String>, DriverError>;

    async fn text(&mut self, selector: &str) -> Result<String, DriverError>;

    async fn click(&mut self, selector: &str) -> Result<(), DriverError>;

    /// Text of every `cell` inside the first element matching `container`.
    async fn texts_within(&mut self, container: &str, cell: &str) -> Result<Vec<String>, DriverError>;
}

/// How to get a browser for a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchOptions {
    /// DevTools websocket of an already running Chrome. When set, nothing is
    /// launched and the browser is left running on close.
    pub browser_url: Option<String>,
    /// Chrome binary to launch instead of the auto-detected one.
    pub chrome_path: Option<PathBuf>,
    pub headless: bool,
    /// Upper bound for a single DevTools request, page loads included.
    pub request_timeout: Duration,
}

impl Default for LaunchOptions {
    fn default() -> Self {
        Self {
            browser_url: None,
            chrome_path: None,
            headless: false,
            request_timeout: Duration::from_secs(30),
        }
    }
}

/// Extra Chrome flags for a launched browser.
fn chrome_args(user_agent: &str) -> Vec<String> {
    vec![
        "--no-sandbox".to_string(),
        "--disable-dev-shm-usage".to_string(),
        "--disable-blink-features=AutomationControlled".to_string(),
        "--lang=ru-RU".to_string(),
        format!("--user-agent={}", user_agent),
    ]
}

fn browser_config(options: &LaunchOptions) -> Result<BrowserConfig, DriverError> {
    let mut builder = BrowserConfig::builder()
        .window_size(1920, 1080)
        .request_timeout(options.request_timeout);
    if !options.headless {
        builder = builder.with_head();
    }
    if let Some(ref path) = options.chrome_path {
        builder = builder.chrome_executable(path);
    }
    for arg in chrome_args(get_user_agent()) {
        builder = builder.arg(arg);
    }
    builder
        .build()
        .map_err(|e| DriverError::Session(format!("browser config error: {}", e)))
}

/// [`PageDriver`] backed by a single Chrome tab over the DevTools protocol.
pub struct ChromePage {
    browser: Browser,
    page: Page,
    handler: JoinHandle<()>,
    owns_browser: bool,
}

impl ChromePage {
    /// Launch Chrome, or attach to `options.browser_url`, and open a blank tab.
    pub async fn launch(options: &LaunchOptions) -> Result<Self, DriverError> {
        let (browser, mut handler, owns_browser) = match options.browser_url {
            Some(ref url) => {
                let (browser, handler) = Browser::connect(url.clone()).await?;
                tracing::info!("Attached to browser at {}", url);
                (browser, handler, false)
            }
            None => {
                let (browser, handler) = Browser::launch(browser_config(options)?).await?;
                tracing::info!(
                    "Launched Chrome{}",
                    if options.headless { " (headless)" } else { "" }
                );
                (browser, handler, true)
            }
        };
        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    tracing::trace!("browser handler event error: {}", e);
                }
            }
        });
        let page = browser.new_page("about:blank").await?;
        Ok(Self {
            browser,
            page,
            handler,
            owns_browser,
        })
    }

    pub async fn close(mut self) -> Result<(), DriverError> {
        if let Err(e) = self.page.close().await {
            tracing::debug!("page close error: {}", e);
        }
        if self.owns_browser {
            self.browser.close().await?;
            if let Err(e) = self.browser.wait().await {
                tracing::debug!("browser exit error: {}", e);
            }
        }
        self.handler.abort();
        tracing::debug!("browser session closed");
        Ok(())
    }

    async fn first(&self, selector: &str) -> Result<Element, DriverError> {
        self.page
            .find_elements(selector)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| DriverError::NoSuchElement(selector.to_string()))
    }
}

#[async_trait]
impl PageDriver for ChromePage {
    async fn open(&mut self, url: &str) -> Result<(), DriverError> {
        self.page.goto(url).await?;
        Ok(())
    }

    async fn current_url(&mut self) -> Result<String, DriverError> {
        self.page
            .url()
            .await?
            .ok_or_else(|| DriverError::Session("page has no URL".to_string()))
    }

    async fn refresh(&mut self) -> Result<(), DriverError> {
        self.page.reload().await?;
        Ok(())
    }

    async fn scroll_to_bottom(&mut self) -> Result<(), DriverError> {
        self.page
            .evaluate("window.scrollTo(0, document.documentElement.scrollHeight)")
            .await?;
        Ok(())
    }

    async fn attributes(&mut self, selector: &str, attr: &str) -> Result<Vec<String>, DriverError> {
        let elements = self.page.find_elements(selector).await?;
        let mut values = Vec::with_capacity(elements.len());
        for element in &elements {
            if let Some(value) = element.attribute(attr).await? {
                values.push(value);
            }
        }
        Ok(values)
    }

    async fn attribute(&mut self, selector: &str, attr: &str) -> Result<Option<String>, DriverError> {
        let element = self.first(selector).await?;
        Ok(element.attribute(attr).await?)
    }

    async fn text(&mut self, selector: &str) -> Result<String, DriverError> {
        let element = self.first(selector).await?;
        Ok(element.inner_text().await?.unwrap_or_default())
    }

    async fn click(&mut self, selector: &str) -> Result<(), DriverError> {
        let element = self.first(selector).await?;
        element.click().await?;
        Ok(())
    }

    async fn texts_within(&mut self, container: &str, cell: &str) -> Result<Vec<String>, DriverError> {
        let parent = self.first(container).await?;
        let cells = parent.find_elements(cell).await?;
        let mut texts = Vec::with_capacity(cells.len());
        for element in &cells {
            texts.push(element.inner_text().await?.unwrap_or_default());
        }
        Ok(texts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cdp_errors_map_to_driver_errors() {
        let timeout: DriverError = CdpError::Timeout.into();
        assert!(timeout.is_timeout());

        let missing: DriverError = CdpError::NotFound.into();
        assert!(missing.is_no_such_element());

        let other: DriverError = CdpError::NoResponse.into();
        assert!(matches!(other, DriverError::Session(_)));
    }

    #[test]
    fn launch_args_carry_user_agent() {
        let args = chrome_args("TestAgent/1.0");
        assert!(args.contains(&"--user-agent=TestAgent/1.0".to_string()));
        assert!(args.iter().any(|a| a == "--no-sandbox"));
    }

    #[test]
    fn default_options_launch_a_visible_browser() {
        let options = LaunchOptions::default();
        assert!(options.browser_url.is_none());
        assert!(!options.headless);
        assert_eq!(options.request_timeout, Duration::from_secs(30));
    }
}
