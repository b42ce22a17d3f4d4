// 💾 Persistence Collaborators
// Where the entry collection lives between runs

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

use crate::entry::Entry;

// ============================================================================
// TRAIT
// ============================================================================

/// Storage for the whole entry collection.
///
/// The store calls `load` once when it is constructed and `save` after
/// every mutation, always with the complete newest-first sequence.
/// Implementations must round-trip all five entry fields and the order.
pub trait Persistence {
    fn load(&self) -> Result<Vec<Entry>>;

    fn save(&mut self, entries: &[Entry]) -> Result<()>;
}

// ============================================================================
// JSON FILE
// ============================================================================

/// Entries kept as one pretty-printed JSON array on disk.
pub struct JsonFileStorage {
    path: PathBuf,
}

impl JsonFileStorage {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        JsonFileStorage {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Persistence for JsonFileStorage {
    fn load(&self) -> Result<Vec<Entry>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let content = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read entries file: {:?}", self.path))?;

        if content.trim().is_empty() {
            return Ok(Vec::new());
        }

        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse entries JSON: {:?}", self.path))
    }

    fn save(&mut self, entries: &[Entry]) -> Result<()> {
        let json = serde_json::to_string_pretty(entries)?;

        // Write next to the target, then rename over it
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json).with_context(|| format!("Failed to write {:?}", tmp))?;
        fs::rename(&tmp, &self.path)
            .with_context(|| format!("Failed to replace {:?}", self.path))?;

        log::debug!("saved {} entries to {:?}", entries.len(), self.path);
        Ok(())
    }
}

// ============================================================================
// IN-MEMORY
// ============================================================================

/// Keeps the last saved snapshot in memory. Counts writes so callers
/// can check that no-op operations really skipped persistence.
#[derive(Debug, Default, Clone)]
pub struct MemoryStorage {
    snapshot: Vec<Entry>,
    saves: usize,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with entries already "on disk"
    pub fn with_entries(entries: Vec<Entry>) -> Self {
        MemoryStorage {
            snapshot: entries,
            saves: 0,
        }
    }

    pub fn snapshot(&self) -> &[Entry] {
        &self.snapshot
    }

    pub fn saves(&self) -> usize {
        self.saves
    }
}

impl Persistence for MemoryStorage {
    fn load(&self) -> Result<Vec<Entry>> {
        Ok(self.snapshot.clone())
    }

    fn save(&mut self, entries: &[Entry]) -> Result<()> {
        self.snapshot = entries.to_vec();
        self.saves += 1;
        Ok(())
    }
}

// ============================================================================
// TESTS
// ============================================================================
