use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

use super::ranking::{FormatRanker, NegotiationRequest, MAX_CHANNELS, PACKED_BYTES_THRESHOLD};
use super::switch::{FormatSwitcher, DEFAULT_SWITCH_TIMEOUT};
use super::types::FormatDescriptor;

/// Negotiation policy and limits (persisted as JSON)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NegotiationConfig {
    /// Absolute deadline for a physical-format switch
    pub switch_timeout_ms: u64,
    /// Candidates with more channels are never selected
    pub max_channels: u32,
    /// Frame width targeted when `force_packed_bytes` is set
    pub packed_byte_threshold: u32,
    pub prefer_non_mixable: bool,
    pub force_packed_bytes: bool,
}

impl Default for NegotiationConfig {
    fn default() -> Self {
        Self {
            switch_timeout_ms: DEFAULT_SWITCH_TIMEOUT.as_millis() as u64,
            max_channels: MAX_CHANNELS,
            packed_byte_threshold: PACKED_BYTES_THRESHOLD,
            prefer_non_mixable: false,
            force_packed_bytes: false,
        }
    }
}

impl NegotiationConfig {
    /// Load from `path`, writing the defaults there first if it is missing
    pub fn load(path: &Path) -> Result<Self> {
        Self::ensure_config_file(path)?;

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: NegotiationConfig =
            serde_json::from_str(&content).context("Failed to parse config JSON")?;
        Ok(config)
    }

    pub fn ensure_config_file(path: &Path) -> Result<()> {
        if path.exists() {
            return Ok(());
        }

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).context("Failed to create config directory")?;
        }
        Self::default().save(path).context("Failed to write default config")
    }

    /// Write via a temporary file and rename
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;

        let temp_path = path.with_extension("tmp");
        fs::write(&temp_path, json).context("Failed to write temporary config file")?;
        fs::rename(&temp_path, path).context("Failed to atomically update config file")?;
        Ok(())
    }

    pub fn switch_timeout(&self) -> Duration {
        Duration::from_millis(self.switch_timeout_ms)
    }

    pub fn ranker(&self) -> FormatRanker {
        FormatRanker::new(self.max_channels, self.packed_byte_threshold)
    }

    pub fn switcher(&self) -> FormatSwitcher {
        FormatSwitcher::new(self.switch_timeout())
    }

    /// Negotiation request for `target` with the configured policy switches
    pub fn request(&self, target: FormatDescriptor) -> NegotiationRequest {
        NegotiationRequest::new(target)
            .prefer_non_mixable(self.prefer_non_mixable)
            .force_packed_bytes(self.force_packed_bytes)
    }
}
