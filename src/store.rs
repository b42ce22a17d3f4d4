// 🗂️ Entry Store
// Owns the entry collection and mediates every mutation
//
// Every mutating operation follows the same pattern: build the next
// collection, hand it to the persistence collaborator, and only replace
// the in-memory collection once the save succeeded. Operations that turn
// out to be no-ops (blank text, unknown id) skip the write entirely.

use anyhow::anyhow;
use chrono::{DateTime, Utc};
use std::collections::HashSet;

use crate::category::{Category, Filter};
use crate::classifier;
use crate::entry::{self, Entry};
use crate::error::{StoreError, StoreResult};
use crate::export::{ExportRow, Transport};
use crate::persistence::Persistence;

// ============================================================================
// OUTCOMES
// ============================================================================

/// Result of a successful `export_and_clear` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportOutcome {
    /// Collection was empty; the transport was never called
    NothingToExport,
    /// Transport accepted this many rows and the collection was cleared
    Exported { count: usize },
}

// ============================================================================
// STORE
// ============================================================================

pub struct EntryStore<S: Persistence> {
    /// Newest first
    entries: Vec<Entry>,
    filter: Filter,
    storage: S,
}

impl<S: Persistence> EntryStore<S> {
    /// Load the collection once from storage and start with the `All` filter.
    ///
    /// Records with blank text or an id already seen earlier in the
    /// sequence are dropped; storage is rewritten on the next mutation.
    pub fn open(storage: S) -> StoreResult<Self> {
        let loaded = storage.load()?;
        let total = loaded.len();

        let mut seen = HashSet::new();
        let entries: Vec<Entry> = loaded
            .into_iter()
            .filter(|e| !e.text.trim().is_empty() && seen.insert(e.id))
            .collect();

        if entries.len() < total {
            log::warn!(
                "dropped {} blank or duplicate entries on load",
                total - entries.len()
            );
        }
        log::info!("loaded {} entries", entries.len());

        Ok(EntryStore {
            entries,
            filter: Filter::All,
            storage,
        })
    }

    // ========================================================================
    // READS
    // ========================================================================

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn get(&self, id: i64) -> Option<&Entry> {
        self.entries.iter().find(|e| e.id == id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn filter(&self) -> Filter {
        self.filter
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Entries matching the active filter, in collection order.
    /// Computed fresh on every call.
    pub fn visible(&self) -> impl Iterator<Item = &Entry> + '_ {
        let filter = self.filter;
        self.entries.iter().filter(move |e| filter.matches(e.category))
    }

    /// Per-category totals over the whole collection, in menu order
    pub fn counts(&self) -> Vec<(Category, usize)> {
        Category::ALL
            .iter()
            .map(|c| (*c, self.entries.iter().filter(|e| e.category == *c).count()))
            .collect()
    }

    // ========================================================================
    // MUTATIONS
    // ========================================================================

    /// Classify and prepend a new entry. Blank text creates nothing.
    pub fn add(&mut self, raw_text: &str) -> StoreResult<Option<Entry>> {
        self.add_at(raw_text, Utc::now())
    }

    fn add_at(&mut self, raw_text: &str, now: DateTime<Utc>) -> StoreResult<Option<Entry>> {
        let text = raw_text.trim();
        if text.is_empty() {
            return Ok(None);
        }

        let id = entry::next_id(now, &self.entries)
            .ok_or_else(|| anyhow!("entry id space exhausted"))?;
        let entry = Entry::new(id, text.to_string(), now);

        let mut next = Vec::with_capacity(self.entries.len() + 1);
        next.push(entry.clone());
        next.extend(self.entries.iter().cloned());
        self.commit(next)?;

        log::info!("added entry {} as {}", entry.id, entry.category);
        Ok(Some(entry))
    }

    /// Flip `completed`. Returns false (and writes nothing) for unknown ids.
    pub fn toggle(&mut self, id: i64) -> StoreResult<bool> {
        self.update(id, |entry| entry.completed = !entry.completed)
    }

    /// Remove one entry. Confirming with the user is the caller's job.
    pub fn delete(&mut self, id: i64) -> StoreResult<bool> {
        if self.get(id).is_none() {
            return Ok(false);
        }

        let next: Vec<Entry> = self.entries.iter().filter(|e| e.id != id).cloned().collect();
        self.commit(next)?;
        log::info!("deleted entry {}", id);
        Ok(true)
    }

    /// Replace the text and re-run the classifier.
    /// Blank text abandons the edit and leaves the entry untouched.
    pub fn edit(&mut self, id: i64, new_text: &str) -> StoreResult<bool> {
        let text = new_text.trim();
        if text.is_empty() {
            return Ok(false);
        }

        let category = classifier::classify(text);
        self.update(id, |entry| {
            entry.text = text.to_string();
            entry.category = category;
        })
    }

    /// Override the category without consulting the classifier.
    pub fn retype(&mut self, id: i64, category: &str) -> StoreResult<bool> {
        let category: Category = category.parse().map_err(StoreError::InvalidCategory)?;

        self.update(id, |entry| entry.category = category)
    }

    /// View state only, never persisted.
    pub fn set_filter(&mut self, filter: Filter) {
        self.filter = filter;
    }

    /// Drop every entry. Irreversible; confirm before calling.
    pub fn clear(&mut self) -> StoreResult<()> {
        self.commit(Vec::new())?;
        log::info!("cleared all entries");
        Ok(())
    }

    /// Hand every entry to `transport`; on success wipe the collection.
    ///
    /// The collection and storage are only touched after the transport
    /// returned `Ok`. A failing transport leaves both exactly as they were.
    pub async fn export_and_clear(&mut self, transport: &dyn Transport) -> StoreResult<ExportOutcome> {
        if self.entries.is_empty() {
            return Ok(ExportOutcome::NothingToExport);
        }

        let rows: Vec<ExportRow> = self.entries.iter().map(ExportRow::from_entry).collect();

        if let Err(e) = transport.send(&rows).await {
            log::warn!("export via {} failed: {:#}", transport.describe(), e);
            return Err(StoreError::ExportFailed(e));
        }

        self.commit(Vec::new())?;

        log::info!("exported {} entries via {}", rows.len(), transport.describe());
        Ok(ExportOutcome::Exported { count: rows.len() })
    }

    /// Apply `change` to a copy of entry `id` and commit the result.
    /// Returns false without writing when the id is unknown.
    fn update<F>(&mut self, id: i64, change: F) -> StoreResult<bool>
    where
        F: FnOnce(&mut Entry),
    {
        let Some(pos) = self.entries.iter().position(|e| e.id == id) else {
            return Ok(false);
        };

        let mut next = self.entries.clone();
        change(&mut next[pos]);
        self.commit(next)?;
        Ok(true)
    }

    /// Save `next`, then make it the in-memory collection.
    /// A failed save leaves memory untouched.
    fn commit(&mut self, next: Vec<Entry>) -> StoreResult<()> {
        self.storage.save(&next)?;
        self.entries = next;
        Ok(())
    }
}

// ============================================================================
// TESTS
// ============================================================================
