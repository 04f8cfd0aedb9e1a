//! Source dataset parsed from an uploaded archive export
//!
//! The export is a JavaScript file of the form
//! `window.YTD.tweets.part0 = [ {"tweet": {...}}, ... ]`. Everything after the
//! first `=` is the JSON payload; a file without `=` is read as bare JSON.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::error::ImportError;

/// Export parsing / storage errors
#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("Export file is not a valid tweet archive: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("Export file is not UTF-8: {0}")]
    Encoding(#[from] std::str::Utf8Error),

    #[error("Could not store export file: {0}")]
    Io(#[from] std::io::Error),
}

/// One importable record from the export
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateItem {
    /// Post body (`full_text` in the export)
    pub body_text: String,
    /// Creation time in export format (e.g., "Wed Oct 10 20:19:24 +0000 2018")
    pub created_at: String,
    /// Every other field of the exported record
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

impl CandidateItem {
    pub fn new(body_text: impl Into<String>, created_at: impl Into<String>) -> Self {
        Self {
            body_text: body_text.into(),
            created_at: created_at.into(),
            metadata: Map::new(),
        }
    }

    /// Body length in characters
    pub fn char_len(&self) -> usize {
        self.body_text.chars().count()
    }

    /// First `max_chars` characters of the body, for log lines
    pub fn summary(&self, max_chars: usize) -> String {
        let mut summary: String = self.body_text.chars().take(max_chars).collect();
        if self.char_len() > max_chars {
            summary.push_str("...");
        }
        summary
    }
}

#[derive(Deserialize)]
struct ExportEntry {
    tweet: ExportTweet,
}

#[derive(Deserialize)]
struct ExportTweet {
    full_text: String,
    created_at: String,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

/// Listing entry for the selection client
#[derive(Debug, Clone, Serialize)]
pub struct ItemPreview {
    pub index: usize,
    pub text: String,
    pub created_at: String,
}

/// Ordered, read-only sequence of candidate items
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SourceDataset {
    items: Vec<CandidateItem>,
}

impl SourceDataset {
    /// Parse an uploaded export file
    pub fn from_export(content: &str) -> Result<Self, DatasetError> {
        let payload = match content.find('=') {
            Some(pos) => &content[pos + 1..],
            None => content,
        };
        let payload = payload.trim().trim_end_matches(';');

        let entries: Vec<ExportEntry> = serde_json::from_str(payload)?;
        let items = entries
            .into_iter()
            .map(|entry| CandidateItem {
                body_text: entry.tweet.full_text,
                created_at: entry.tweet.created_at,
                metadata: entry.tweet.extra,
            })
            .collect();

        Ok(Self { items })
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, position: usize) -> Option<&CandidateItem> {
        self.items.get(position)
    }

    pub fn previews(&self) -> Vec<ItemPreview> {
        self.items
            .iter()
            .enumerate()
            .map(|(index, item)| ItemPreview {
                index,
                text: item.body_text.clone(),
                created_at: item.created_at.clone(),
            })
            .collect()
    }

    /// Dereference resolved positions, in order
    ///
    /// Fails on the first position outside `[0, len)`.
    pub fn select(&self, positions: &[i64]) -> Result<Vec<CandidateItem>, ImportError> {
        positions
            .iter()
            .map(|&position| {
                usize::try_from(position)
                    .ok()
                    .and_then(|index| self.items.get(index))
                    .cloned()
                    .ok_or_else(|| ImportError::InvalidPosition {
                        position: position.to_string(),
                        dataset_size: self.items.len(),
                    })
            })
            .collect()
    }
}
