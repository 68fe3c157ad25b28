//! Reading channel metadata out of the about panel's rendered cells.
//!
//! The panel renders a flat list of table cells that alternate between a
//! label cell (often just an icon) and a value cell. Two strategies read it:
//!
//! - [`FieldStrategy::Positional`] indexes the flat list at fixed positions.
//!   Any layout change silently shifts every field.
//! - [`FieldStrategy::Labeled`] pairs the cells up and assigns each pair by
//!   its label text, or by markers in the value when the label is blank.
//!   A missing channel link is an explicit error.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::numeric::parse_count;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum FieldError {
    #[error("malformed page: needed {required} field cells, found {found}")]
    MalformedPage { required: usize, found: usize },
    #[error("required field '{0}' not found on the page")]
    MissingField(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum FieldStrategy {
    Positional,
    #[default]
    Labeled,
}

impl FromStr for FieldStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "positional" | "position" => Ok(Self::Positional),
            "labeled" | "labelled" | "label" => Ok(Self::Labeled),
            other => Err(format!(
                "unknown field strategy '{}'. Valid values: labeled, positional",
                other
            )),
        }
    }
}

/// Flat cell indexes for the positional strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldPositions {
    pub channel_link: usize,
    pub country: usize,
    pub subscribers: usize,
    pub videos: usize,
    pub views: usize,
}

impl Default for FieldPositions {
    fn default() -> Self {
        Self {
            channel_link: 9,
            country: 11,
            subscribers: 15,
            videos: 17,
            views: 19,
        }
    }
}

impl FieldPositions {
    pub fn max_index(&self) -> usize {
        [
            self.channel_link,
            self.country,
            self.subscribers,
            self.videos,
            self.views,
        ]
        .into_iter()
        .max()
        .unwrap_or(0)
    }
}

/// How one field is recognised by the labeled strategy.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldRule {
    /// Case-insensitive substrings of the label cell.
    #[serde(default)]
    pub aliases: Vec<String>,
    /// Case-insensitive substrings of the value cell, used when the label is blank.
    #[serde(default)]
    pub value_markers: Vec<String>,
    /// Claim the first blank-label value with no digits that nothing else claimed.
    #[serde(default)]
    pub unclaimed_text: bool,
    /// Values containing any of these never match `unclaimed_text`.
    #[serde(default)]
    pub value_excludes: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldLabels {
    pub channel_link: FieldRule,
    #[serde(default)]
    pub country: FieldRule,
    #[serde(default)]
    pub subscribers: FieldRule,
    #[serde(default)]
    pub videos: FieldRule,
    #[serde(default)]
    pub views: FieldRule,
}

/// Raw trimmed field values read from the about panel.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChannelFields {
    pub channel_link: String,
    pub country: String,
    pub subscribers_raw: String,
    pub videos_raw: String,
    pub views_raw: String,
}

impl ChannelFields {
    /// Subscriber, video and view counts parsed from the raw strings.
    pub fn counts(&self) -> (u64, u64, u64) {
        (
            parse_count(&self.subscribers_raw),
            parse_count(&self.videos_raw),
            parse_count(&self.views_raw),
        )
    }
}

#[derive(Debug, Clone)]
pub struct ChannelFieldReader {
    strategy: FieldStrategy,
    positions: FieldPositions,
    labels: FieldLabels,
}

impl ChannelFieldReader {
    pub fn new(strategy: FieldStrategy, positions: FieldPositions, labels: FieldLabels) -> Self {
        Self {
            strategy,
            positions,
            labels,
        }
    }

    pub fn positional(positions: FieldPositions) -> Self {
        Self::new(FieldStrategy::Positional, positions, FieldLabels::default())
    }

    pub fn labeled(labels: FieldLabels) -> Self {
        Self::new(FieldStrategy::Labeled, FieldPositions::default(), labels)
    }

    pub fn strategy(&self) -> FieldStrategy {
        self.strategy
    }

    pub fn with_strategy(mut self, strategy: FieldStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn read<S: AsRef<str>>(&self, cells: &[S]) -> Result<ChannelFields, FieldError> {
        match self.strategy {
            FieldStrategy::Positional => read_positional(cells, &self.positions),
            FieldStrategy::Labeled => read_labeled(cells, &self.labels),
        }
    }
}

fn read_positional<S: AsRef<str>>(
    cells: &[S],
    positions: &FieldPositions,
) -> Result<ChannelFields, FieldError> {
    let required = positions.max_index() + 1;
    if cells.len() < required {
        return Err(FieldError::MalformedPage {
            required,
            found: cells.len(),
        });
    }
    let at = |i: usize| cells[i].as_ref().trim().to_string();
    Ok(ChannelFields {
        channel_link: at(positions.channel_link),
        country: at(positions.country),
        subscribers_raw: at(positions.subscribers),
        videos_raw: at(positions.videos),
        views_raw: at(positions.views),
    })
}

fn read_labeled<S: AsRef<str>>(cells: &[S], labels: &FieldLabels) -> Result<ChannelFields, FieldError> {
    if cells.is_empty() || cells.len() % 2 != 0 {
        return Err(FieldError::MalformedPage {
            required: cells.len().max(1) + cells.len() % 2,
            found: cells.len(),
        });
    }

    let pairs: Vec<(String, String)> = cells
        .chunks(2)
        .map(|pair| {
            (
                pair[0].as_ref().trim().to_lowercase(),
                pair[1].as_ref().trim().to_string(),
            )
        })
        .collect();
    let mut claimed = vec![false; pairs.len()];

    // Channel link first so its URL can't be mistaken for another field's marker.
    let channel_link = claim(&pairs, &mut claimed, &labels.channel_link)
        .ok_or_else(|| FieldError::MissingField("channel_link".to_string()))?;
    let subscribers_raw = claim(&pairs, &mut claimed, &labels.subscribers).unwrap_or_default();
    let videos_raw = claim(&pairs, &mut claimed, &labels.videos).unwrap_or_default();
    let views_raw = claim(&pairs, &mut claimed, &labels.views).unwrap_or_default();
    let country = claim(&pairs, &mut claimed, &labels.country).unwrap_or_default();

    Ok(ChannelFields {
        channel_link,
        country,
        subscribers_raw,
        videos_raw,
        views_raw,
    })
}

fn claim(pairs: &[(String, String)], claimed: &mut [bool], rule: &FieldRule) -> Option<String> {
    let contains_any = |haystack: &str, needles: &[String]| {
        needles
            .iter()
            .any(|n| !n.is_empty() && haystack.contains(&n.to_lowercase()))
    };

    let by_label = pairs.iter().enumerate().position(|(i, (label, _))| {
        !claimed[i] && !label.is_empty() && contains_any(label, &rule.aliases)
    });
    let by_marker = || {
        pairs.iter().enumerate().position(|(i, (label, value))| {
            !claimed[i] && label.is_empty() && contains_any(&value.to_lowercase(), &rule.value_markers)
        })
    };
    let by_leftover = || {
        if !rule.unclaimed_text {
            return None;
        }
        pairs.iter().enumerate().position(|(i, (label, value))| {
            let lower = value.to_lowercase();
            !claimed[i]
                && label.is_empty()
                && !value.is_empty()
                && !value.chars().any(|c| c.is_ascii_digit())
                && !contains_any(&lower, &rule.value_excludes)
        })
    };

    let index = by_label.or_else(by_marker).or_else(by_leftover)?;
    claimed[index] = true;
    Some(pairs[index].1.clone())
}
