//! Page layout profile: search URL, CSS selectors, field positions and labels.
//!
//! The default profile is embedded at compile time from
//! `seed_data/youtube_layout.yml`; a different file can be loaded at runtime
//! when the page markup changes.

use std::path::Path;

use serde::Deserialize;
use thiserror::Error;
use url::Url;

use crate::contact::{ContactCascade, DEFAULT_PROFILE_HOSTS};
use crate::fields::{ChannelFieldReader, FieldLabels, FieldPositions, FieldStrategy};

const DEFAULT_LAYOUT: &str = include_str!("../../seed_data/youtube_layout.yml");

#[derive(Error, Debug)]
pub enum LayoutError {
    #[error("Failed to parse layout YAML: {0}")]
    YamlParse(#[from] serde_yml::Error),
    #[error("Failed to read layout file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid layout: {0}")]
    Invalid(String),
}

#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Selectors {
    pub thumbnail_link: String,
    pub shorts_canonical_link: String,
    pub video_description: String,
    pub channel_name: String,
    pub about_opener: String,
    pub about_description: String,
    pub about_fields_container: String,
    pub about_field_cell: String,
}

#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct PageLayout {
    pub search_url: String,
    #[serde(default = "default_search_param")]
    pub search_param: String,
    #[serde(default = "default_shorts_segment")]
    pub shorts_path_segment: String,
    pub selectors: Selectors,
    #[serde(default)]
    pub field_strategy: FieldStrategy,
    #[serde(default)]
    pub positions: FieldPositions,
    pub labels: FieldLabels,
    #[serde(default = "default_profile_hosts")]
    pub profile_hosts: Vec<String>,
}

fn default_search_param() -> String {
    "search_query".to_string()
}

fn default_shorts_segment() -> String {
    "shorts".to_string()
}

fn default_profile_hosts() -> Vec<String> {
    DEFAULT_PROFILE_HOSTS.iter().map(|h| h.to_string()).collect()
}

impl PageLayout {
    /// Search results URL for `query`, with the query form-encoded.
    pub fn search_url_for(&self, query: &str) -> Result<Url, LayoutError> {
        let mut url = Url::parse(&self.search_url)
            .map_err(|e| LayoutError::Invalid(format!("search_url: {}", e)))?;
        url.query_pairs_mut().append_pair(&self.search_param, query);
        Ok(url)
    }

    pub fn field_reader(&self) -> ChannelFieldReader {
        ChannelFieldReader::new(self.field_strategy, self.positions, self.labels.clone())
    }

    pub fn contact_cascade(&self) -> Result<ContactCascade, LayoutError> {
        ContactCascade::with_profile_hosts(&self.profile_hosts)
            .map_err(|e| LayoutError::Invalid(format!("profile_hosts: {}", e)))
    }

    fn validate(&self) -> Result<(), LayoutError> {
        Url::parse(&self.search_url)
            .map_err(|e| LayoutError::Invalid(format!("search_url: {}", e)))?;
        if self.search_param.trim().is_empty() {
            return Err(LayoutError::Invalid("search_param is empty".to_string()));
        }
        let s = &self.selectors;
        for (name, value) in [
            ("thumbnail_link", &s.thumbnail_link),
            ("shorts_canonical_link", &s.shorts_canonical_link),
            ("video_description", &s.video_description),
            ("channel_name", &s.channel_name),
            ("about_opener", &s.about_opener),
            ("about_description", &s.about_description),
            ("about_fields_container", &s.about_fields_container),
            ("about_field_cell", &s.about_field_cell),
        ] {
            if value.trim().is_empty() {
                return Err(LayoutError::Invalid(format!("selector '{}' is empty", name)));
            }
        }
        let link = &self.labels.channel_link;
        if link.aliases.is_empty() && link.value_markers.is_empty() {
            return Err(LayoutError::Invalid(
                "labels.channel_link needs at least one alias or value marker".to_string(),
            ));
        }
        Ok(())
    }
}

/// Parse and validate a layout profile from YAML content.
pub fn parse_layout(yaml_content: &str) -> Result<PageLayout, LayoutError> {
    let layout: PageLayout = serde_yml::from_str(yaml_content)?;
    layout.validate()?;
    Ok(layout)
}

/// The layout profile embedded at compile time.
pub fn load_default_layout() -> Result<PageLayout, LayoutError> {
    parse_layout(DEFAULT_LAYOUT)
}

pub fn load_layout_file(path: &Path) -> Result<PageLayout, LayoutError> {
    let content = std::fs::read_to_string(path)?;
    parse_layout(&content)
}
