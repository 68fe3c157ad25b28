//! Error types for the library layer.

use std::fmt;

use crate::crawl::CrawlError;
use crate::driver::DriverError;
use crate::export::ExportError;
use crate::layout::LayoutError;

/// Errors returned by the [`Pipeline`](crate::pipeline::Pipeline), wrapping the
/// module errors and adding input validation failures.
#[derive(Debug)]
pub enum ScoutError {
    /// The page layout profile could not be loaded or is invalid.
    Layout(LayoutError),
    /// The browser session could not be started or stopped.
    Driver(DriverError),
    /// The search page could not be harvested.
    Crawl(CrawlError),
    /// Writing the CSV output failed.
    Export(ExportError),
    /// User-provided input failed validation.
    InvalidInput(String),
}

impl fmt::Display for ScoutError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Layout(e) => write!(f, "Layout error: {}", e),
            Self::Driver(e) => write!(f, "Driver error: {}", e),
            Self::Crawl(e) => write!(f, "Crawl error: {}", e),
            Self::Export(e) => write!(f, "Export error: {}", e),
            Self::InvalidInput(msg) => write!(f, "Invalid input: {}", msg),
        }
    }
}

impl std::error::Error for ScoutError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Layout(e) => Some(e),
            Self::Driver(e) => Some(e),
            Self::Crawl(e) => Some(e),
            Self::Export(e) => Some(e),
            Self::InvalidInput(_) => None,
        }
    }
}

impl From<LayoutError> for ScoutError {
    fn from(e: LayoutError) -> Self {
        Self::Layout(e)
    }
}

impl From<DriverError> for ScoutError {
    fn from(e: DriverError) -> Self {
        Self::Driver(e)
    }
}

impl From<CrawlError> for ScoutError {
    fn from(e: CrawlError) -> Self {
        Self::Crawl(e)
    }
}

impl From<ExportError> for ScoutError {
    fn from(e: ExportError) -> Self {
        Self::Export(e)
    }
}
