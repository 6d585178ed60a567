use std::collections::BTreeMap;
use std::fs::File;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use fdl_store::{canonical, FileLock, Layout, SyncMode};
use fdl_types::{Event, EventType, ReceiptId, Timestamp};
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::LedgerResult;

/// The store's append-only event log.
///
/// Lines are canonical JSON [`Event`]s. Blank lines are tolerated. A line
/// that is not valid JSON (for example the torn tail of an interrupted
/// append) is skipped with a warning: it matches no `(receipt_id, type)`
/// pair and never blocks later appends.
#[derive(Clone, Debug)]
pub struct EventLog {
    path: PathBuf,
    sync_mode: SyncMode,
}

impl EventLog {
    /// The log at `events/events.v1.jsonl` under the layout's root.
    pub fn new(layout: &Layout, sync_mode: SyncMode) -> Self {
        Self::at(layout.events_path(), sync_mode)
    }

    /// A log at an explicit path.
    pub fn at(path: impl Into<PathBuf>, sync_mode: SyncMode) -> Self {
        Self {
            path: path.into(),
            sync_mode,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Record `event_type` for `receipt_id` unless the log already holds
    /// such an event.
    ///
    /// Returns `true` if a line was appended. The scan and the append run
    /// under one exclusive lock on the log file, released on every exit
    /// path. `ts` defaults to the current UTC time.
    pub fn append(
        &self,
        receipt_id: &ReceiptId,
        event_type: &EventType,
        refs: BTreeMap<String, String>,
        ts: Option<Timestamp>,
    ) -> LedgerResult<bool> {
        let lock = FileLock::acquire(&self.path)?;
        let text = read_text(lock.file())?;

        if contains_pair(&text, &self.path, receipt_id, event_type) {
            debug!(receipt_id = %receipt_id, event_type = %event_type, "event already recorded");
            return Ok(false);
        }
        if !text.is_empty() && !text.ends_with('\n') {
            // Terminate a torn last line so the new record starts on its own.
            let mut file = lock.file();
            file.write_all(b"\n")?;
        }

        let event = Event::new(
            ts.unwrap_or_else(Timestamp::now),
            event_type.clone(),
            receipt_id.clone(),
            refs,
        );
        canonical::append_line_to(lock.file(), &event, self.sync_mode)?;
        debug!(receipt_id = %receipt_id, event_type = %event_type, "appended event");
        Ok(true)
    }

    /// Whether an event of `event_type` exists for `receipt_id`.
    pub fn contains(&self, receipt_id: &ReceiptId, event_type: &EventType) -> LedgerResult<bool> {
        match self.open_for_read()? {
            Some(file) => Ok(contains_pair(
                &read_text(&file)?,
                &self.path,
                receipt_id,
                event_type,
            )),
            None => Ok(false),
        }
    }

    /// Every well-formed event, in log order. A missing log is empty.
    pub fn read_all(&self) -> LedgerResult<Vec<Event>> {
        let Some(file) = self.open_for_read()? else {
            return Ok(Vec::new());
        };
        let mut events = Vec::new();
        for (line_no, value) in parse_lines(&read_text(&file)?, &self.path) {
            match serde_json::from_value::<Event>(value) {
                Ok(event) => events.push(event),
                Err(e) => warn!(
                    path = %self.path.display(),
                    line = line_no,
                    error = %e,
                    "skipping event line with unexpected shape"
                ),
            }
        }
        Ok(events)
    }

    /// Events recorded for one receipt, in log order.
    pub fn events_for(&self, receipt_id: &ReceiptId) -> LedgerResult<Vec<Event>> {
        Ok(self
            .read_all()?
            .into_iter()
            .filter(|e| e.receipt_id == *receipt_id)
            .collect())
    }

    fn open_for_read(&self) -> LedgerResult<Option<File>> {
        match File::open(&self.path) {
            Ok(file) => Ok(Some(file)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

fn read_text(mut file: &File) -> io::Result<String> {
    let mut bytes = Vec::new();
    file.read_to_end(&mut bytes)?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Parse every non-blank line as JSON, with its 1-based line number.
/// Lines that fail to parse are logged and dropped.
fn parse_lines(text: &str, path: &Path) -> Vec<(usize, Value)> {
    let mut values = Vec::new();
    for (idx, line) in text.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        match serde_json::from_str::<Value>(trimmed) {
            Ok(value) => values.push((idx + 1, value)),
            Err(e) => warn!(
                path = %path.display(),
                line = idx + 1,
                error = %e,
                "skipping malformed event line"
            ),
        }
    }
    values
}

/// Matching is done on the raw `receipt_id`/`type` fields so that a line
/// with otherwise unexpected content still counts as a recorded event.
fn contains_pair(text: &str, path: &Path, receipt_id: &ReceiptId, event_type: &EventType) -> bool {
    parse_lines(text, path).iter().any(|(_, value)| {
        value.get("receipt_id").and_then(Value::as_str) == Some(receipt_id.as_str())
            && value.get("type").and_then(Value::as_str) == Some(event_type.as_str())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use fdl_crypto::ContentHasher;
    use std::fs;
    use std::sync::{Arc, Barrier};
    use std::thread;

    fn id(content: &[u8]) -> ReceiptId {
        ReceiptId::derive(&ContentHasher::hash(content))
    }

    fn refs(manifest: &str) -> BTreeMap<String, String> {
        BTreeMap::from([("manifest_path".to_string(), manifest.to_string())])
    }

    fn log_in(dir: &Path) -> EventLog {
        EventLog::new(&Layout::new(dir), SyncMode::OsDefault)
    }

    #[test]
    fn first_append_writes_canonical_line() {
        let dir = tempfile::tempdir().unwrap();
        let log = log_in(dir.path());
        let rid = id(b"a");
        let ts = Timestamp::parse("2024-05-01T10:00:00Z").unwrap();
        assert!(log
            .append(&rid, &EventType::ingested(), refs("receipts/x/manifest.v1.json"), Some(ts))
            .unwrap());

        let text = fs::read_to_string(dir.path().join("events/events.v1.jsonl")).unwrap();
        assert_eq!(
            text,
            format!(
                "{{\"receipt_id\":\"{rid}\",\"refs\":{{\"manifest_path\":\"receipts/x/manifest.v1.json\"}},\
                 \"schema\":\"financial-data-lab/event.v1\",\"ts\":\"2024-05-01T10:00:00Z\",\
                 \"type\":\"receipt.ingested\"}}\n"
            )
        );
    }

    #[test]
    fn repeated_append_is_a_no_op() {
        let dir = tempfile::tempdir().unwrap();
        let log = log_in(dir.path());
        let rid = id(b"a");
        assert!(log.append(&rid, &EventType::ingested(), refs("m1"), None).unwrap());
        assert!(!log.append(&rid, &EventType::ingested(), refs("m2"), None).unwrap());

        let events = log.read_all().unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].refs["manifest_path"], "m1");
    }

    #[test]
    fn distinct_types_and_receipts_each_append() {
        let dir = tempfile::tempdir().unwrap();
        let log = log_in(dir.path());
        let (a, b) = (id(b"a"), id(b"b"));
        assert!(log.append(&a, &EventType::ingested(), BTreeMap::new(), None).unwrap());
        assert!(log.append(&a, &EventType::ocr_observed(), BTreeMap::new(), None).unwrap());
        assert!(log.append(&b, &EventType::ingested(), BTreeMap::new(), None).unwrap());

        assert_eq!(log.read_all().unwrap().len(), 3);
        assert_eq!(log.events_for(&a).unwrap().len(), 2);
        assert!(log.contains(&b, &EventType::ingested()).unwrap());
        assert!(!log.contains(&b, &EventType::ocr_observed()).unwrap());
    }

    #[test]
    fn missing_log_reads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let log = log_in(dir.path());
        assert!(log.read_all().unwrap().is_empty());
        assert!(!log.contains(&id(b"a"), &EventType::ingested()).unwrap());
        assert!(!log.path().exists());
    }

    #[test]
    fn blank_and_malformed_lines_are_tolerated() {
        let dir = tempfile::tempdir().unwrap();
        let log = log_in(dir.path());
        let rid = id(b"a");
        fs::create_dir_all(log.path().parent().unwrap()).unwrap();
        fs::write(
            log.path(),
            format!("\n   \n{{\"receipt_id\":\"{rid}\",\"type\":\"receipt.ingested\"\n"),
        )
        .unwrap();

        // The torn line does not count as a recorded event.
        assert!(!log.contains(&rid, &EventType::ingested()).unwrap());
        assert!(log.append(&rid, &EventType::ingested(), BTreeMap::new(), None).unwrap());
        assert!(log.contains(&rid, &EventType::ingested()).unwrap());
        assert_eq!(log.read_all().unwrap().len(), 1);
    }

    #[test]
    fn torn_tail_without_newline_is_terminated() {
        let dir = tempfile::tempdir().unwrap();
        let log = log_in(dir.path());
        let rid = id(b"a");
        fs::create_dir_all(log.path().parent().unwrap()).unwrap();
        fs::write(log.path(), "{\"receipt_id\":\"rcpt_").unwrap();

        assert!(log.append(&rid, &EventType::ingested(), BTreeMap::new(), None).unwrap());
        let text = fs::read_to_string(log.path()).unwrap();
        assert_eq!(text.lines().count(), 2);
        assert_eq!(log.read_all().unwrap().len(), 1);
    }

    #[test]
    fn foreign_shaped_line_still_blocks_duplicates() {
        let dir = tempfile::tempdir().unwrap();
        let log = log_in(dir.path());
        let rid = id(b"a");
        fs::create_dir_all(log.path().parent().unwrap()).unwrap();
        fs::write(
            log.path(),
            format!("{{\"receipt_id\":\"{rid}\",\"type\":\"receipt.ingested\"}}\n"),
        )
        .unwrap();

        assert!(log.contains(&rid, &EventType::ingested()).unwrap());
        assert!(!log.append(&rid, &EventType::ingested(), BTreeMap::new(), None).unwrap());
        // Missing schema/ts: not a typed event.
        assert!(log.read_all().unwrap().is_empty());
    }

    #[test]
    fn concurrent_appends_record_one_event() {
        let dir = tempfile::tempdir().unwrap();
        let log = Arc::new(log_in(dir.path()));
        let rid = Arc::new(id(b"contended"));
        let barrier = Arc::new(Barrier::new(8));

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let log = Arc::clone(&log);
                let rid = Arc::clone(&rid);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    log.append(&rid, &EventType::ingested(), refs(&format!("m{i}")), None)
                        .unwrap()
                })
            })
            .collect();
        let appended = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|a| *a)
            .count();

        assert_eq!(appended, 1);
        let text = fs::read_to_string(log.path()).unwrap();
        assert_eq!(text.lines().count(), 1);
    }
}
