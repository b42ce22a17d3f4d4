// 📤 Export Transports
// Export rows and the collaborators that deliver them

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::entry::Entry;

// ============================================================================
// EXPORT ROW
// ============================================================================

/// One exported entry: (category label, text, timestamp, status label).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportRow {
    pub category: String,
    pub text: String,
    pub timestamp: String,
    pub status: String,
}

impl ExportRow {
    pub fn from_entry(entry: &Entry) -> Self {
        ExportRow {
            category: entry.category.label().to_string(),
            text: entry.text.clone(),
            timestamp: entry.formatted_timestamp(),
            status: entry.status_label().to_string(),
        }
    }

    pub fn as_record(&self) -> [&str; 4] {
        [&self.category, &self.text, &self.timestamp, &self.status]
    }
}

// Serialized as a 4-element array, the shape spreadsheet webhooks append
impl Serialize for ExportRow {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.as_record().serialize(serializer)
    }
}

pub const CSV_HEADERS: [&str; 4] = ["Тип", "Текст", "Дата", "Статус"];

// ============================================================================
// TRANSPORT
// ============================================================================

/// Delivers exported rows somewhere outside the store.
///
/// Success is the absence of an error: `Ok(())` means the store will
/// clear every entry. Implementations that cannot confirm delivery
/// (fire-and-forget HTTP) still return `Ok(())` once the request went out.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, rows: &[ExportRow]) -> Result<()>;

    /// Short description for logs and notifications
    fn describe(&self) -> String;
}

// ============================================================================
// CSV FILE
// ============================================================================

/// Writes rows to a CSV file with a header line.
pub struct CsvTransport {
    path: PathBuf,
}

impl CsvTransport {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        CsvTransport {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// `dir/мои_мысли_YYYY-MM-DD.csv`
    pub fn dated_in<P: AsRef<Path>>(dir: P, date: NaiveDate) -> Self {
        let filename = format!("мои_мысли_{}.csv", date.format("%Y-%m-%d"));
        Self::new(dir.as_ref().join(filename))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Render rows as CSV text (header included)
pub fn rows_to_csv(rows: &[ExportRow]) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(CSV_HEADERS)?;
    for row in rows {
        writer.write_record(row.as_record())?;
    }
    writer
        .into_inner()
        .map_err(|e| anyhow::anyhow!("Failed to flush CSV writer: {}", e.error()))
}

#[async_trait]
impl Transport for CsvTransport {
    async fn send(&self, rows: &[ExportRow]) -> Result<()> {
        let bytes = rows_to_csv(rows)?;

        tokio::fs::write(&self.path, bytes)
            .await
            .with_context(|| format!("Failed to write CSV export: {:?}", self.path))?;

        log::info!("wrote {} rows to {:?}", rows.len(), self.path);
        Ok(())
    }

    fn describe(&self) -> String {
        format!("CSV {}", self.path.display())
    }
}

// ============================================================================
// HTTP WEBHOOK
// ============================================================================

/// POSTs rows as a JSON array of arrays (e.g. a spreadsheet web app).
///
/// The response status is not inspected. Any request that reaches the
/// server counts as delivered; only connection failures and timeouts fail.
pub struct WebhookTransport {
    url: String,
    client: reqwest::Client,
}

impl WebhookTransport {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(WebhookTransport {
            url: url.into(),
            client,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl Transport for WebhookTransport {
    async fn send(&self, rows: &[ExportRow]) -> Result<()> {
        log::info!("sending {} rows to {}", rows.len(), self.url);

        let response = self
            .client
            .post(&self.url)
            .json(rows)
            .send()
            .await
            .with_context(|| format!("Failed to reach {}", self.url))?;

        log::debug!("webhook answered {}", response.status());
        Ok(())
    }

    fn describe(&self) -> String {
        format!("webhook {}", self.url)
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn row(category: &str, text: &str) -> ExportRow {
        ExportRow {
            category: category.to_string(),
            text: text.to_string(),
            timestamp: "01.02.2024, 10:00:00".to_string(),
            status: "Активно".to_string(),
        }
    }

    #[test]
    fn test_row_from_entry() {
        let mut entry = Entry::new(
            1,
            "Купить молоко".to_string(),
            Utc.with_ymd_and_hms(2024, 2, 1, 10, 0, 0).unwrap(),
        );
        entry.completed = true;

        let row = ExportRow::from_entry(&entry);
        assert_eq!(row.category, "Покупка");
        assert_eq!(row.text, "Купить молоко");
        assert_eq!(row.status, "Завершено");
        assert_eq!(row.timestamp, entry.formatted_timestamp());
    }

    #[test]
    fn test_row_serializes_as_array() {
        let json = serde_json::to_string(&vec![row("Идея", "стартап")]).unwrap();
        assert_eq!(
            json,
            r#"[["Идея","стартап","01.02.2024, 10:00:00","Активно"]]"#
        );
    }

    #[test]
    fn test_csv_quotes_embedded_commas_and_quotes() {
        let bytes = rows_to_csv(&[row("Мысль", "сказал \"да\", потом ушёл")]).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        let mut lines = text.lines();

        assert_eq!(lines.next(), Some("Тип,Текст,Дата,Статус"));
        assert_eq!(
            lines.next(),
            Some("Мысль,\"сказал \"\"да\"\", потом ушёл\",\"01.02.2024, 10:00:00\",Активно")
        );
    }

    #[test]
    fn test_dated_filename() {
        let date = NaiveDate::from_ymd_opt(2024, 7, 9).unwrap();
        let transport = CsvTransport::dated_in("/tmp", date);
        assert_eq!(transport.path(), Path::new("/tmp/мои_мысли_2024-07-09.csv"));
    }

    #[tokio::test]
    async fn test_csv_transport_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let transport = CsvTransport::new(dir.path().join("out.csv"));

        transport.send(&[row("Задача", "a"), row("Покупка", "b")]).await.unwrap();

        let mut reader = csv::Reader::from_path(transport.path()).unwrap();
        let records: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
        assert_eq!(records.len(), 2);
        assert_eq!(&records[0][0], "Задача");
        assert_eq!(&records[1][1], "b");
    }

    #[tokio::test]
    async fn test_csv_transport_fails_on_missing_dir() {
        let dir = tempfile::tempdir().unwrap();
        let transport = CsvTransport::new(dir.path().join("missing").join("out.csv"));
        assert!(transport.send(&[row("Задача", "a")]).await.is_err());
    }

    #[tokio::test]
    async fn test_webhook_unreachable_fails() {
        // Port 9 on localhost: nothing listens, connection is refused
        let transport =
            WebhookTransport::new("http://127.0.0.1:9/hook", Duration::from_secs(2)).unwrap();
        assert!(transport.send(&[row("Задача", "a")]).await.is_err());
    }
}
