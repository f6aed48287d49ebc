//! Optional JSON-lines log of blocked requests.
//!
//! One line per block with timestamp, client address, method, URL and the
//! status answered. The file is size-guarded: when it reaches the configured
//! limit it is renamed to a single `.1` backup and restarted. Log failures
//! never affect the verdict.

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Mutex;

use crate::RequestFacts;

pub struct BlockLog {
    inner: Mutex<LogFile>,
}

struct LogFile {
    path: PathBuf,
    file: File,
    max_bytes: Option<u64>,
}

impl BlockLog {
    pub fn open(path: &str, max_bytes: Option<u64>) -> std::io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            inner: Mutex::new(LogFile {
                path: PathBuf::from(path),
                file,
                max_bytes,
            }),
        })
    }

    pub fn record(&self, facts: &RequestFacts, status: u16, body_bytes: usize) {
        let line = serde_json::json!({
            "ts": chrono::Utc::now().to_rfc3339(),
            "clientAddress": facts.client_address,
            "method": facts.method,
            "url": facts.url,
            "status": status,
            "bodyBytes": body_bytes,
        });
        let Ok(mut guard) = self.inner.lock() else {
            return;
        };
        guard.rotate_if_needed();
        if let Err(e) = writeln!(guard.file, "{line}") {
            tracing::warn!(error = %e, "failed to write block log line");
        }
    }
}

impl LogFile {
    fn rotate_if_needed(&mut self) {
        let Some(limit) = self.max_bytes else {
            return;
        };
        let size = self.path.metadata().map(|m| m.len()).unwrap_or(0);
        if size < limit {
            return;
        }
        let backup = self.path.with_extension("1");
        let _ = fs::rename(&self.path, &backup);
        match OpenOptions::new().create(true).append(true).open(&self.path) {
            Ok(file) => self.file = file,
            Err(e) => tracing::warn!(error = %e, "failed to reopen block log after rotation"),
        }
    }
}
