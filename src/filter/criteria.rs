//! Filter criteria supplied by the caller.

use crate::utils::config::{validate_status_bucket, HUB_MARKER, SIGNALR_MARKER};
use crate::utils::error::ConfigError;

/// Which groups to keep
///
/// Every criterion is inactive by default; an empty criteria set keeps all groups.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterCriteria {
    /// Case-insensitive substring a group must contain
    pub identifier: Option<String>,

    /// Keep groups with either protocol marker
    pub filter_signalr: bool,

    /// Keep groups with the bare `[SignalR]` marker
    pub highlight_signalr: bool,

    /// Keep groups with the hub marker
    pub highlight_hub: bool,

    /// Enabled HTTP status hundred-buckets (100, 200, ... 500)
    pub status_buckets: Vec<u16>,

    /// Regroup by request/response correlation id
    pub request_response: bool,

    /// Keep only groups carrying profiler output
    pub profiler_only: bool,
}

impl FilterCriteria {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_identifier(mut self, identifier: impl Into<String>) -> Self {
        self.identifier = Some(identifier.into());
        self
    }

    /// Enable status buckets, rejecting anything that is not a hundred-bucket
    pub fn with_status_buckets(mut self, buckets: &[u16]) -> Result<Self, ConfigError> {
        for bucket in buckets {
            validate_status_bucket(*bucket)?;
        }
        self.status_buckets = buckets.to_vec();
        Ok(self)
    }

    pub fn with_request_response(mut self, enabled: bool) -> Self {
        self.request_response = enabled;
        self
    }

    pub fn with_profiler_only(mut self, enabled: bool) -> Self {
        self.profiler_only = enabled;
        self
    }

    /// Active identifier filter (an empty string is inactive)
    pub fn identifier(&self) -> Option<&str> {
        self.identifier.as_deref().filter(|id| !id.is_empty())
    }

    pub fn markers_active(&self) -> bool {
        self.filter_signalr || self.highlight_signalr || self.highlight_hub
    }

    /// Does one line satisfy the enabled marker modes
    pub fn line_matches_markers(&self, line: &str) -> bool {
        let has_signalr = line.contains(SIGNALR_MARKER);
        let has_hub = line.contains(HUB_MARKER);

        (self.filter_signalr && (has_signalr || has_hub))
            || (self.highlight_signalr && has_signalr)
            || (self.highlight_hub && has_hub)
    }

    pub fn is_empty(&self) -> bool {
        self.identifier().is_none()
            && !self.markers_active()
            && self.status_buckets.is_empty()
            && !self.request_response
            && !self.profiler_only
    }
}
