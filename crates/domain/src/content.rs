use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::scan::Scan;

/// Catalog key used when a scan has no entry of its own
pub const DEFAULT_CONTENT_KEY: &str = "default";

/// What to show (and for how long to run the chart recorders) for one badge
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentEntry {
    pub title: String,
    pub asset: String,
    #[serde(default)]
    pub start_offset_secs: f64,
    pub duration_secs: f64,
    #[serde(default = "default_layer")]
    pub layer: u8,
}

fn default_layer() -> u8 {
    5
}

impl ContentEntry {
    pub fn start_offset(&self) -> Duration {
        Duration::from_secs_f64(self.start_offset_secs.max(0.0))
    }

    pub fn duration(&self) -> Duration {
        Duration::from_secs_f64(self.duration_secs.max(0.0))
    }
}

/// Badge → content lookup table
pub trait ContentCatalog: Send + Sync {
    fn lookup(&self, key: &str) -> Option<ContentEntry>;

    /// Entry for a scan, falling back to the `default` entry
    fn resolve(&self, scan: &Scan) -> Option<ContentEntry> {
        self.lookup(scan.code()).or_else(|| self.lookup(DEFAULT_CONTENT_KEY))
    }
}
