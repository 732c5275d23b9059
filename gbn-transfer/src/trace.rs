//! Transmission log and event feed.
//!
//! The sender records every packet it hands to the channel adapter so an
//! external tool can plot the transfer timeline.  [`TransmissionLog`] is the
//! queryable record returned with the transfer report; [`TransmissionEvent`]
//! is the streamed form delivered through [`crate::sender::Sender::subscribe`].

use std::io::Write;
use std::time::Duration;

use serde::{Serialize, Serializer};

/// Offsets go out as fractional milliseconds.
fn as_millis<S: Serializer>(offset: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_f64(offset.as_secs_f64() * 1000.0)
}

/// One packet handed to the channel adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LogEntry {
    pub seq: i32,
    /// Time since the transfer started.
    #[serde(rename = "offset_ms", serialize_with = "as_millis")]
    pub offset: Duration,
    /// `true` when this sequence number had already been sent before.
    pub retransmission: bool,
}

/// Something observable that happened during a transfer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum TransmissionEvent {
    Sent(LogEntry),
    /// The retransmission timer fired; `[base, next_to_send)` will be resent.
    Timeout {
        base: usize,
        next_to_send: usize,
        #[serde(rename = "offset_ms", serialize_with = "as_millis")]
        offset: Duration,
    },
    /// An ACK advanced the window to `base`.
    Acked {
        ack: i32,
        base: usize,
        #[serde(rename = "offset_ms", serialize_with = "as_millis")]
        offset: Duration,
    },
}

/// Ordered record of every transmitted data packet.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct TransmissionLog {
    entries: Vec<LogEntry>,
}

impl TransmissionLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, entry: LogEntry) {
        self.entries.push(entry);
    }

    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    /// Entries marked as retransmissions, in send order.
    pub fn retransmissions(&self) -> impl Iterator<Item = &LogEntry> {
        self.entries.iter().filter(|e| e.retransmission)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Write the log as a JSON array of `{seq, offset_ms, retransmission}`.
    pub fn write_json<W: Write>(&self, w: W) -> serde_json::Result<()> {
        serde_json::to_writer_pretty(w, self)
    }
}
