//! Receive side: in-order delivery with an out-of-order buffer.
//!
//! [`ReorderBuffer`] is the pure state machine:
//!
//! - A packet with `seq == expected` is delivered, acknowledged with its own
//!   sequence number, and any now-contiguous buffered packets are drained
//!   behind it.
//! - A packet with `seq > expected` is stored and answered with a duplicate
//!   ACK for `expected - 1`, telling the sender a gap exists.
//! - A packet with `seq < expected` was already delivered; it is answered
//!   with `expected - 1` and otherwise ignored.
//!
//! [`Receiver`] drives the state machine from a [`LossyChannel`] until the
//! end-of-stream sentinel arrives, writing delivered payloads to a sink.

use std::collections::BTreeMap;
use std::path::Path;

use tokio::fs::File;
use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::channel::LossyChannel;
use crate::error::TransferError;
use crate::packet::{Frame, Packet};
use crate::transport::Transport;

// ---------------------------------------------------------------------------
// ReorderBuffer
// ---------------------------------------------------------------------------

/// What happened to one inbound packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// In order; delivered (possibly with buffered successors).
    Delivered,
    /// Ahead of a gap; held until the gap fills.
    Buffered,
    /// Already delivered earlier.
    Duplicate,
}

/// Result of [`ReorderBuffer::on_packet`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    /// Sequence number to acknowledge.
    pub ack: i32,
    pub disposition: Disposition,
    /// Payloads now ready for the sink, in sequence order.
    pub deliver: Vec<Vec<u8>>,
}

/// Receive-side state for one transfer.
#[derive(Debug, Default)]
pub struct ReorderBuffer {
    /// Next sequence number owed to the sink.
    expected: i64,
    /// Packets strictly beyond `expected`, keyed by sequence number.
    pending: BTreeMap<i64, Vec<u8>>,
}

impl ReorderBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn expected(&self) -> i64 {
        self.expected
    }

    /// Number of packets waiting behind a gap.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Process one data packet.
    pub fn on_packet(&mut self, seq: i32, payload: Vec<u8>) -> Outcome {
        let key = i64::from(seq);

        if key == self.expected {
            let mut deliver = vec![payload];
            self.expected += 1;
            while let Some(next) = self.pending.remove(&self.expected) {
                deliver.push(next);
                self.expected += 1;
            }
            Outcome {
                ack: seq,
                disposition: Disposition::Delivered,
                deliver,
            }
        } else if key > self.expected {
            self.pending.insert(key, payload);
            Outcome {
                ack: self.last_in_order(),
                disposition: Disposition::Buffered,
                deliver: Vec::new(),
            }
        } else {
            Outcome {
                ack: self.last_in_order(),
                disposition: Disposition::Duplicate,
                deliver: Vec::new(),
            }
        }
    }

    /// `expected - 1`: the most recent in-order sequence number (-1 before
    /// anything has been delivered).
    fn last_in_order(&self) -> i32 {
        // Sequence numbers come off a 32-bit field, so this always fits.
        i32::try_from(self.expected - 1).unwrap_or(i32::MAX)
    }
}

// ---------------------------------------------------------------------------
// Receiver
// ---------------------------------------------------------------------------

/// Counters for a completed receive.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReceiveReport {
    pub packets_delivered: u64,
    pub bytes_written: u64,
    pub duplicates: u64,
    /// Packets that arrived ahead of a gap.
    pub buffered: u64,
    pub acks_sent: u64,
    /// Frames too short to carry a header.
    pub malformed: u64,
}

/// Receiver engine: one loop, no internal concurrency.
#[derive(Debug)]
pub struct Receiver<T> {
    channel: LossyChannel<T>,
}

impl<T: Transport> Receiver<T> {
    pub fn new(channel: LossyChannel<T>) -> Self {
        Self { channel }
    }

    /// Create (truncating) `path` and receive the stream into it.
    pub async fn receive_file(&self, path: &Path) -> Result<ReceiveReport, TransferError> {
        let mut file = File::create(path)
            .await
            .map_err(|source| TransferError::Open {
                path: path.to_path_buf(),
                source,
            })?;
        let report = self.receive_into(&mut file).await?;
        file.sync_all().await.map_err(TransferError::File)?;
        Ok(report)
    }

    /// Receive until the end-of-stream sentinel, writing in-order payloads
    /// to `sink`.
    ///
    /// Each packet is acknowledged back to the address it came from; ACKs go
    /// through the lossy channel like any other send.
    pub async fn receive_into<W>(&self, sink: &mut W) -> Result<ReceiveReport, TransferError>
    where
        W: AsyncWrite + Unpin,
    {
        let mut state = ReorderBuffer::new();
        let mut report = ReceiveReport::default();

        loop {
            let (bytes, from) = self.channel.receive().await.map_err(TransferError::Transport)?;

            let packet = match Frame::decode(&bytes) {
                Ok(Frame::EndOfStream) => {
                    log::debug!("[receiver] ← end of stream");
                    break;
                }
                Ok(Frame::Packet(p)) => p,
                Err(e) => {
                    report.malformed += 1;
                    log::warn!("[receiver] discarding frame from {from}: {e}");
                    continue;
                }
            };

            let seq = packet.seq;
            let outcome = state.on_packet(seq, packet.payload);
            match outcome.disposition {
                Disposition::Delivered => log::debug!(
                    "[receiver] ← DATA seq={seq} in order; delivering {}",
                    outcome.deliver.len()
                ),
                Disposition::Buffered => {
                    report.buffered += 1;
                    log::debug!("[receiver] ← DATA seq={seq} out of order; buffering");
                }
                Disposition::Duplicate => {
                    report.duplicates += 1;
                    log::debug!("[receiver] ← DATA seq={seq} duplicate");
                }
            }

            for payload in &outcome.deliver {
                sink.write_all(payload).await.map_err(TransferError::File)?;
                report.packets_delivered += 1;
                report.bytes_written += payload.len() as u64;
            }

            let ack = Packet::ack(outcome.ack).encode();
            self.channel
                .transmit(&ack, from)
                .await
                .map_err(TransferError::Transport)?;
            report.acks_sent += 1;
            log::debug!("[receiver] → ACK {}", outcome.ack);
        }

        sink.flush().await.map_err(TransferError::File)?;
        log::info!(
            "[receiver] done: {} packets, {} bytes, {} duplicates",
            report.packets_delivered,
            report.bytes_written,
            report.duplicates
        );
        Ok(report)
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
