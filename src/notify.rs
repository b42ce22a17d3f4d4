//! Default user-facing messages for store outcomes.
//!
//! The store only returns values; surfaces that want the stock wording
//! (TUI status line, CLI output) render it through these helpers.

use crate::entry::Entry;
use crate::error::{StoreError, StoreResult};
use crate::store::ExportOutcome;

pub fn added(entry: &Entry) -> String {
    format!("Запись добавлена как {}", entry.category.label())
}

pub fn export_result(result: &StoreResult<ExportOutcome>) -> String {
    match result {
        Ok(ExportOutcome::NothingToExport) => "Нет данных для экспорта".to_string(),
        Ok(ExportOutcome::Exported { count }) => {
            format!("✅ Записи экспортированы и очищены! ({})", count)
        }
        Err(StoreError::ExportFailed(e)) => format!("Ошибка экспорта: {:#}", e),
        Err(e) => format!("Ошибка: {}", e),
    }
}
