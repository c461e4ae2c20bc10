//! Traceability log – one record per processed item.
//!
//! Every item that reaches its terminal state produces a [`TraceRecord`]
//! with its batch tag, the verdict it received and what physically happened
//! to it.  Records go to a [`TraceSink`]:
//!
//! - [`JsonLinesTraceLog`] appends newline-delimited JSON to a file.
//! - [`MemoryTraceLog`] keeps records in a shared `Vec` (tests, summaries).

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Utc};
use inspectline_types::{Decision, Item, ItemHandle};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failure writing a trace record.
#[derive(Debug, Error)]
pub enum TraceLogError {
    #[error("trace log I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("trace record encoding failed: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Final disposition of a processed item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TraceStatus {
    Accepted,
    Rejected,
}

impl From<Decision> for TraceStatus {
    fn from(decision: Decision) -> Self {
        match decision {
            Decision::Accept => TraceStatus::Accepted,
            Decision::Reject => TraceStatus::Rejected,
        }
    }
}

/// One line of the traceability log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceRecord {
    pub timestamp: DateTime<Utc>,
    /// Simulation tick on which the item was processed.
    pub tick: u64,
    pub item: ItemHandle,
    pub batch_tag: String,
    pub status: TraceStatus,
    pub action_details: String,
}

impl TraceRecord {
    /// Build the record for a processed item.  Returns `None` when the item
    /// never received a verdict.
    pub fn for_item(item: &Item, tick: u64) -> Option<Self> {
        let outcome = item.outcome?;
        let p = item.position;
        let action_details = match outcome {
            Decision::Accept => format!("conveyed to end of line at x={:.3}", p.x),
            Decision::Reject => format!("pushed off the line to y={:.3}", p.y),
        };
        Some(Self {
            timestamp: Utc::now(),
            tick,
            item: item.handle,
            batch_tag: item.batch_tag.clone(),
            status: outcome.into(),
            action_details,
        })
    }
}

/// Destination for trace records.
pub trait TraceSink: Send {
    fn record(&mut self, record: &TraceRecord) -> Result<(), TraceLogError>;
}

// ─────────────────────────────────────────────────────────────────────────────
// JSON-lines file
// ─────────────────────────────────────────────────────────────────────────────

/// Appends one JSON object per line to a file.
pub struct JsonLinesTraceLog {
    path: PathBuf,
    writer: BufWriter<File>,
}

impl JsonLinesTraceLog {
    /// Open `path` for appending, creating it (and missing parent
    /// directories) if needed.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, TraceLogError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(Self {
            path,
            writer: BufWriter::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TraceSink for JsonLinesTraceLog {
    fn record(&mut self, record: &TraceRecord) -> Result<(), TraceLogError> {
        serde_json::to_writer(&mut self.writer, record)?;
        self.writer.write_all(b"\n")?;
        // Records are rare; flush so a crash never loses one.
        self.writer.flush()?;
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// In-memory
// ─────────────────────────────────────────────────────────────────────────────

/// Keeps records in memory.  Clones share the same storage, so one clone can
/// be handed to the line loop while another is read back.
#[derive(Debug, Clone, Default)]
pub struct MemoryTraceLog {
    records: Arc<Mutex<Vec<TraceRecord>>>,
}

impl MemoryTraceLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of every record so far, in processing order.
    pub fn records(&self) -> Vec<TraceRecord> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl TraceSink for MemoryTraceLog {
    fn record(&mut self, record: &TraceRecord) -> Result<(), TraceLogError> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(record.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use inspectline_types::{ItemState, Quaternion, Vec3};

    fn processed(handle: u32, outcome: Option<Decision>, position: Vec3) -> Item {
        Item {
            handle: ItemHandle(handle),
            position,
            orientation: Quaternion::IDENTITY,
            state: ItemState::Processed,
            batch_tag: "B1".to_string(),
            outcome,
        }
    }

    #[test]
    fn record_reflects_outcome() {
        let accepted = processed(0, Some(Decision::Accept), Vec3::new(1.4, 0.0, 0.651));
        let rec = TraceRecord::for_item(&accepted, 42).unwrap();
        assert_eq!(rec.status, TraceStatus::Accepted);
        assert_eq!(rec.tick, 42);
        assert_eq!(rec.batch_tag, "B1");
        assert!(rec.action_details.contains("x=1.400"));

        let rejected = processed(1, Some(Decision::Reject), Vec3::new(0.0, -0.39, 0.651));
        let rec = TraceRecord::for_item(&rejected, 7).unwrap();
        assert_eq!(rec.status, TraceStatus::Rejected);
        assert!(rec.action_details.contains("y=-0.390"));
    }

    #[test]
    fn no_record_without_verdict() {
        let item = processed(0, None, Vec3::default());
        assert!(TraceRecord::for_item(&item, 0).is_none());
    }

    #[test]
    fn status_serializes_in_caps() {
        let json = serde_json::to_string(&TraceStatus::Rejected).unwrap();
        assert_eq!(json, "\"REJECTED\"");
    }

    #[test]
    fn json_lines_log_appends_one_line_per_record() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logs").join("trace.jsonl");

        let item = processed(3, Some(Decision::Accept), Vec3::new(1.4, 0.0, 0.651));
        let rec = TraceRecord::for_item(&item, 10).unwrap();
        {
            let mut log = JsonLinesTraceLog::open(&path).unwrap();
            assert_eq!(log.path(), path.as_path());
            log.record(&rec).unwrap();
            log.record(&rec).unwrap();
        }
        // Reopening appends rather than truncating.
        JsonLinesTraceLog::open(&path).unwrap().record(&rec).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        let parsed: TraceRecord = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(parsed, rec);
    }

    #[test]
    fn memory_log_clones_share_storage() {
        let log = MemoryTraceLog::new();
        let mut writer = log.clone();
        let item = processed(0, Some(Decision::Reject), Vec3::default());
        writer
            .record(&TraceRecord::for_item(&item, 1).unwrap())
            .unwrap();
        assert_eq!(log.records().len(), 1);
        assert_eq!(log.records()[0].item, ItemHandle(0));
    }
}
