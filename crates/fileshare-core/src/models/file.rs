//! Uploaded file metadata as listed by the files endpoint.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::utils::format::{format_date, format_file_size};

const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct FileRecord {
    pub id: String,
    pub original_name: String,
    pub file_size: u64,
    #[serde(default)]
    pub content_type: Option<String>,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    #[serde(default)]
    pub download_count: u64,
    #[serde(default, rename = "shareableURL")]
    pub shareable_url: Option<String>,
    #[serde(default, rename = "publicURL")]
    pub public_url: Option<String>,
}

impl FileRecord {
    pub fn content_type(&self) -> &str {
        self.content_type
            .as_deref()
            .filter(|s| !s.is_empty())
            .unwrap_or(DEFAULT_CONTENT_TYPE)
    }

    pub fn size_display(&self) -> String {
        format_file_size(self.file_size)
    }

    pub fn uploaded_display(&self) -> String {
        format_date(&self.created_at)
    }

    /// Whole days until expiry, rounded up.
    pub fn days_until_expiry(&self, now: DateTime<Utc>) -> i64 {
        let secs = (self.expires_at - now).num_seconds();
        // ceil division for positive values
        if secs > 0 {
            (secs + 86_399) / 86_400
        } else {
            secs / 86_400
        }
    }

    pub fn expiry_display(&self, now: DateTime<Utc>) -> String {
        match self.days_until_expiry(now) {
            d if d > 1 => format!("{} days", d),
            1 => "1 day".to_string(),
            _ => "Expired".to_string(),
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }

    /// Link to share (and encode as QR), preferring the short link.
    pub fn share_url(&self) -> Option<&str> {
        self.shareable_url
            .as_deref()
            .or(self.public_url.as_deref())
            .filter(|s| !s.is_empty())
    }
}
