//! Append-only durable chat log.
//!
//! Every user-visible event is written as `[YYYY-MM-DD HH:MM:SS] <text>`
//! using local time. The sink never truncates or rotates its target.

use std::path::Path;
use std::pin::Pin;

use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::Mutex;

use crate::RouterError;

/// Format of the timestamp prefix.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

type Writer = Pin<Box<dyn AsyncWrite + Send>>;

/// The single writer handle for the chat log.
pub struct LogSink {
    writer: Mutex<Writer>,
}

impl LogSink {
    /// Opens (or creates) the log file in append mode.
    ///
    /// # Errors
    /// [`RouterError::LogOpen`] if the file cannot be opened. The server
    /// treats this as fatal since every event must be logged.
    pub async fn open(path: &Path) -> Result<Self, RouterError> {
        let file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .await
            .map_err(|source| RouterError::LogOpen {
                path: path.display().to_string(),
                source,
            })?;
        tracing::info!(path = %path.display(), "chat log opened");
        Ok(Self::from_writer(file))
    }

    /// Wraps any async writer, e.g. an in-memory buffer in tests.
    pub fn from_writer(writer: impl AsyncWrite + Send + 'static) -> Self {
        Self {
            writer: Mutex::new(Box::pin(writer)),
        }
    }

    /// Writes one timestamped entry and flushes it.
    ///
    /// # Errors
    /// [`RouterError::LogWrite`] on I/O failure.
    pub async fn try_append(&self, line: &str) -> Result<(), RouterError> {
        let entry = format!(
            "[{}] {}\n",
            chrono::Local::now().format(TIMESTAMP_FORMAT),
            line.trim_end_matches(['\r', '\n'])
        );
        let mut writer = self.writer.lock().await;
        writer
            .write_all(entry.as_bytes())
            .await
            .map_err(RouterError::LogWrite)?;
        writer.flush().await.map_err(RouterError::LogWrite)
    }

    /// Like [`try_append`](Self::try_append), but a failure is reported to
    /// the operator log and otherwise ignored so delivery carries on.
    pub async fn append(&self, line: &str) {
        if let Err(e) = self.try_append(line).await {
            tracing::error!(error = %e, line, "failed to write chat log");
        }
    }
}

impl std::fmt::Debug for LogSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogSink").finish_non_exhaustive()
    }
}
