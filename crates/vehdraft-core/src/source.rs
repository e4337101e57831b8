//! Client-visible status of the external adapters behind a lookup.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AdapterStatus {
    Pending,
    Success,
    Cached,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheStatus {
    Fresh,
    Stale,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceStatus {
    pub adapter_key: String,
    pub status: AdapterStatus,
    /// Only meaningful when `status` is [`AdapterStatus::Cached`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_status: Option<CacheStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl SourceStatus {
    /// A source is degraded when it failed or served a stale cache entry.
    #[must_use]
    pub fn is_degraded(&self) -> bool {
        match self.status {
            AdapterStatus::Failed => true,
            AdapterStatus::Cached => self.cache_status == Some(CacheStatus::Stale),
            AdapterStatus::Pending | AdapterStatus::Success => false,
        }
    }

    #[must_use]
    pub fn is_failed(&self) -> bool {
        self.status == AdapterStatus::Failed
    }
}

/// Degraded sources in their original order.
#[must_use]
pub fn degraded_sources(sources: &[SourceStatus]) -> Vec<SourceStatus> {
    sources.iter().filter(|s| s.is_degraded()).cloned().collect()
}
