use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

#[derive(Debug, Clone)]
pub struct CaptureEntry {
    /// Host wall-clock receive time, unix milliseconds.
    pub received_ms: u64,
    pub status: LineStatus,
    pub line: String,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LineStatus {
    Accepted,
    Malformed,
}

/// Bounded history of received lines plus running counters.
pub struct CaptureLog {
    entries: VecDeque<CaptureEntry>,
    max_entries: usize,
    accepted: u64,
    malformed: u64,
}

pub type SharedCaptureLog = Arc<Mutex<CaptureLog>>;

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}

impl CaptureLog {
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(max_entries.min(4096)),
            max_entries,
            accepted: 0,
            malformed: 0,
        }
    }

    pub fn shared(max_entries: usize) -> SharedCaptureLog {
        Arc::new(Mutex::new(Self::new(max_entries)))
    }

    pub fn push(&mut self, status: LineStatus, line: String) -> u64 {
        let received_ms = now_ms();
        match status {
            LineStatus::Accepted => self.accepted += 1,
            LineStatus::Malformed => self.malformed += 1,
        }

        self.entries.push_back(CaptureEntry { received_ms, status, line });
        if self.entries.len() > self.max_entries {
            self.entries.pop_front();
        }
        received_ms
    }

    pub fn entries(&self) -> impl Iterator<Item = &CaptureEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn accepted(&self) -> u64 {
        self.accepted
    }

    pub fn malformed(&self) -> u64 {
        self.malformed
    }

    /// Drops the history; counters keep running.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Recent lines, one per row, optionally prefixed with `[HH:MM:SS.mmm]` (UTC).
    pub fn to_text(&self, show_timestamp: bool) -> String {
        let mut result = String::new();
        for entry in &self.entries {
            if show_timestamp {
                let millis = entry.received_ms % 1000;
                let secs = entry.received_ms / 1000;
                let hours = (secs / 3600) % 24;
                let minutes = (secs / 60) % 60;
                let seconds = secs % 60;
                result.push_str(&format!("[{hours:02}:{minutes:02}:{seconds:02}.{millis:03}] "));
            }
            if entry.status == LineStatus::Malformed {
                result.push_str("?? ");
            }
            result.push_str(entry.line.trim_end_matches(['\r', '\n']));
            result.push('\n');
        }
        result
    }
}
