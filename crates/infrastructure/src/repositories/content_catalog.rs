use std::collections::HashMap;

use domain::content::{ContentCatalog, ContentEntry};

/// Badge → content table loaded from the `content` config section
#[derive(Debug, Clone, Default)]
pub struct ConfigContentCatalog {
    entries: HashMap<String, ContentEntry>,
}

impl ConfigContentCatalog {
    pub fn new(entries: HashMap<String, ContentEntry>) -> Self {
        let entries = entries
            .into_iter()
            .filter_map(|(key, entry)| {
                if entry.asset.trim().is_empty() {
                    tracing::error!("Content entry '{}' has no asset. Skipping.", key);
                    return None;
                }
                Some((key, entry))
            })
            .collect();

        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl ContentCatalog for ConfigContentCatalog {
    fn lookup(&self, key: &str) -> Option<ContentEntry> {
        self.entries.get(key).cloned()
    }
}
