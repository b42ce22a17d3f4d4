// Thought Capture - Core Library
// Exposes all modules for use in CLI, TUI, API server, and tests

pub mod category;    // Closed category set + view filter
pub mod classifier;  // Keyword heuristics
pub mod entry;       // Entry record
pub mod error;       // Store error taxonomy
pub mod persistence; // Persistence trait, JSON + in-memory backends
pub mod db;          // SQLite backend
pub mod export;      // Export rows + transports
pub mod store;       // Entry lifecycle
pub mod notify;      // Stock user-facing messages
pub mod dictation;   // Voice-input capability
pub mod config;      // Environment configuration

// Re-export commonly used types
pub use category::{Category, Filter};
pub use classifier::{classify, explain, ClassificationResult, KeywordRule, RULES};
pub use entry::Entry;
pub use error::{StoreError, StoreResult};
pub use persistence::{JsonFileStorage, MemoryStorage, Persistence};
pub use db::{setup_database, SqliteStorage};
pub use export::{CsvTransport, ExportRow, Transport, WebhookTransport};
pub use store::{EntryStore, ExportOutcome};
pub use dictation::{Dictation, LineDictation};
pub use config::Config;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
