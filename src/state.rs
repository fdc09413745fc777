use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use declarative::{ExecutionPlan, ResourceExt, SealKey, Snapshot};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::paths;

/// Format version written to new snapshot files
pub const STATE_VERSION: u32 = 1;

// ============================================================================
// State File
// ============================================================================

/// On-disk record of what the last apply realized
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct StateFile {
    pub version: u32,

    /// Incremented on every save
    pub serial: u64,

    /// Fingerprint of the descriptor that was last applied
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fingerprint: Option<String>,

    pub last_updated: DateTime<Utc>,

    #[serde(default)]
    pub snapshot: Snapshot,
}

impl Default for StateFile {
    fn default() -> Self {
        Self {
            version: STATE_VERSION,
            serial: 0,
            fingerprint: None,
            last_updated: Utc::now(),
            snapshot: Snapshot::default(),
        }
    }
}

impl StateFile {
    /// Load from the default location
    pub fn load() -> Result<Self> {
        Self::load_from(&paths::state_file()?)
    }

    /// Load from `path`, or return an empty state if the file doesn't exist
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::debug!("State file does not exist, using empty state");
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read state file: {}", path.display()))?;

        let state: Self = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse state file: {}", path.display()))?;

        log::debug!(
            "Loaded state serial {} ({} resources) from {}",
            state.serial,
            state.snapshot.len(),
            path.display()
        );
        Ok(state)
    }

    /// Save to the default location
    pub fn save(&mut self) -> Result<PathBuf> {
        let path = paths::state_file()?;
        self.save_to(&path)?;
        Ok(path)
    }

    /// Bump the serial and write to `path`
    ///
    /// Writes a sibling temp file first and renames it over the old one.
    pub fn save_to(&mut self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create state directory: {}", dir.display()))?;
        }

        self.serial += 1;
        self.last_updated = Utc::now();

        let content =
            serde_json::to_string_pretty(&self).context("Failed to serialize state to JSON")?;

        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, &content)
            .with_context(|| format!("Failed to write state file: {}", tmp.display()))?;
        fs::rename(&tmp, path)
            .with_context(|| format!("Failed to replace state file: {}", path.display()))?;

        log::debug!("Saved state serial {} to {}", self.serial, path.display());
        Ok(())
    }
}

/// Stable hash of a plan's declared (sealed) attributes
///
/// Unaffected by sensitive plaintext and by provider-computed values.
pub fn fingerprint(plan: &ExecutionPlan, key: &SealKey) -> String {
    let mut hasher = blake3::Hasher::new();
    for resource in plan.resources() {
        hasher.update(resource.id().as_bytes());
        hasher.update(&[0]);
        let attrs = serde_json::to_vec(&resource.sealed_attributes(key)).unwrap_or_default();
        hasher.update(&attrs);
        hasher.update(&[0]);
    }
    hasher.finalize().to_hex().to_string()
}

// ============================================================================
// Tests
// ============================================================================
