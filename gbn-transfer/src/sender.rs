//! Go-Back-N send side.
//!
//! [`SendWindow`] is the window state machine; it does no I/O.  [`Sender`]
//! drives it with two concurrent activities that share the window (and the
//! retransmission timer inside it) behind one `tokio::sync::Mutex`:
//!
//! - the **transmit loop** (the calling task) fills the window, starts the
//!   timer, waits for an ACK or a timeout, and on timeout goes back to `base`;
//! - the **ACK loop** (a spawned task) applies cumulative ACKs, stops the
//!   timer, and wakes the transmit loop through a `Notify`.
//!
//! # Sequence-number layout
//!
//! ```text
//!   base        next_to_send        base + window_size
//!    │               │                     │
//!  ──┼───────────────┼─────────────────────┼──────▶ seq space
//!    │<─ in flight ─▶│<──── sendable ─────▶│
//! ```
//!
//! A single timeout retransmits all of `[base, next_to_send)`, including
//! packets whose ACKs may still be on their way.

use std::ops::Range;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, Mutex, Notify};
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::channel::LossyChannel;
use crate::config::TransferConfig;
use crate::error::TransferError;
use crate::packet::{self, Packet};
use crate::source;
use crate::timer::RetransmitTimer;
use crate::trace::{LogEntry, TransmissionEvent, TransmissionLog};
use crate::transport::Transport;

// ---------------------------------------------------------------------------
// SendWindow
// ---------------------------------------------------------------------------

/// Window state for one transfer of `total` packets.
///
/// Invariant: `base <= next_to_send <= base + window_size`, and `base` never
/// decreases.
#[derive(Debug)]
pub struct SendWindow {
    /// Lowest unacknowledged sequence number.
    base: usize,
    /// Next sequence number to hand to the channel.
    next_to_send: usize,
    /// `min(max_window, total - base)`.
    window_size: usize,
    max_window: usize,
    total: usize,
    /// One past the highest sequence number ever sent.
    high_water: usize,
    timer: RetransmitTimer,
    /// Timeouts since `base` last moved.
    stalled_timeouts: u32,
}

impl SendWindow {
    /// A `max_window` of zero is treated as one.
    pub fn new(total: usize, max_window: usize, timeout: Duration) -> Self {
        let max_window = max_window.max(1);
        Self {
            base: 0,
            next_to_send: 0,
            window_size: max_window.min(total),
            max_window,
            total,
            high_water: 0,
            timer: RetransmitTimer::new(timeout),
            stalled_timeouts: 0,
        }
    }

    pub fn base(&self) -> usize {
        self.base
    }

    pub fn next_to_send(&self) -> usize {
        self.next_to_send
    }

    pub fn window_size(&self) -> usize {
        self.window_size
    }

    /// `true` once every packet has been acknowledged.
    pub fn is_complete(&self) -> bool {
        self.base >= self.total
    }

    pub fn timer(&self) -> &RetransmitTimer {
        &self.timer
    }

    pub fn timer_mut(&mut self) -> &mut RetransmitTimer {
        &mut self.timer
    }

    pub fn stalled_timeouts(&self) -> u32 {
        self.stalled_timeouts
    }

    /// Sequence number that may be sent now, if the window has room.
    pub fn next_sendable(&self) -> Option<usize> {
        (self.next_to_send < self.base + self.window_size).then_some(self.next_to_send)
    }

    /// Account for sending [`next_sendable`](Self::next_sendable).
    ///
    /// Returns `true` if that sequence number had been sent before.
    pub fn mark_sent(&mut self) -> bool {
        debug_assert!(self.next_sendable().is_some(), "mark_sent on a full window");
        let seq = self.next_to_send;
        self.next_to_send += 1;
        let retransmission = seq < self.high_water;
        self.high_water = self.high_water.max(self.next_to_send);
        retransmission
    }

    /// Apply a cumulative ACK.
    ///
    /// Accepted when `base <= ack` and `ack` names a packet that has been
    /// sent: `base` moves to `ack + 1` and the timer stops.  Stale,
    /// duplicate, or never-sent ACKs change nothing and return `false`.
    pub fn on_ack(&mut self, ack: i32) -> bool {
        let Ok(ack) = usize::try_from(ack) else {
            return false;
        };
        if ack < self.base || ack >= self.high_water {
            return false;
        }
        self.base = ack + 1;
        // An ACK can overtake a go-back; never resend below base.
        self.next_to_send = self.next_to_send.max(self.base);
        self.timer.stop();
        self.stalled_timeouts = 0;
        self.slide();
        true
    }

    /// Handle an expired timer: stop it and go back to `base`.
    ///
    /// Returns the range that will be retransmitted.
    pub fn on_timeout(&mut self) -> Range<usize> {
        self.timer.stop();
        self.stalled_timeouts += 1;
        let resend = self.base..self.next_to_send;
        self.next_to_send = self.base;
        resend
    }

    /// Recompute `window_size` from the current `base`.
    pub fn slide(&mut self) {
        self.window_size = self.max_window.min(self.total - self.base);
    }

    /// `base <= next_to_send <= base + window_size`.
    pub fn invariant_holds(&self) -> bool {
        self.base <= self.next_to_send && self.next_to_send <= self.base + self.window_size
    }
}

// ---------------------------------------------------------------------------
// Sender
// ---------------------------------------------------------------------------

/// Outcome of a completed transfer.
#[derive(Debug, Clone)]
pub struct SendReport {
    pub packets: usize,
    pub bytes: u64,
    pub timeouts: u32,
    pub elapsed: Duration,
    pub log: TransmissionLog,
}

impl SendReport {
    pub fn retransmissions(&self) -> usize {
        self.log.retransmissions().count()
    }
}

/// State shared by the transmit loop and the ACK loop.
struct Shared {
    window: Mutex<SendWindow>,
    /// Signalled whenever an ACK is accepted.
    acked: Notify,
}

type AckTask = JoinHandle<Result<(), TransferError>>;

/// Sender engine bound to one lossy channel.
pub struct Sender<T> {
    channel: Arc<LossyChannel<T>>,
    config: TransferConfig,
    events: Option<mpsc::UnboundedSender<TransmissionEvent>>,
}

impl<T: Transport> Sender<T> {
    /// Build a sender; fails if `config` is invalid.
    pub fn new(channel: LossyChannel<T>, config: TransferConfig) -> Result<Self, TransferError> {
        config.validate()?;
        Ok(Self {
            channel: Arc::new(channel),
            config,
            events: None,
        })
    }

    pub fn channel(&self) -> &LossyChannel<T> {
        &self.channel
    }

    /// Stream every send, timeout, and accepted ACK of later transfers.
    pub fn subscribe(&mut self) -> mpsc::UnboundedReceiver<TransmissionEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.events = Some(tx);
        rx
    }

    /// Read `path` in `chunk_size` pieces and transfer it.
    ///
    /// An unopenable file ends the call before anything is sent.
    pub async fn send_file(&self, path: &Path) -> Result<SendReport, TransferError> {
        let chunks = source::read_chunks(path, self.config.chunk_size).await?;
        self.send_chunks(chunks).await
    }

    /// Transfer `chunks` as packets `0..chunks.len()`, then send the
    /// end-of-stream sentinel.
    pub async fn send_chunks(&self, chunks: Vec<Vec<u8>>) -> Result<SendReport, TransferError> {
        let frames = chunks
            .iter()
            .enumerate()
            .map(|(seq, chunk)| packet::encode(seq as i64, chunk))
            .collect::<Result<Vec<_>, _>>()?;
        let bytes = chunks.iter().map(|c| c.len() as u64).sum();
        let total = frames.len();
        log::info!(
            "[sender] {total} packets ({bytes} bytes) to {}, window {}",
            self.config.receiver_addr,
            self.config.window_size
        );

        let started = Instant::now();
        let shared = Arc::new(Shared {
            window: Mutex::new(SendWindow::new(
                total,
                self.config.window_size,
                self.config.timeout,
            )),
            acked: Notify::new(),
        });

        let mut ack_task: AckTask = tokio::spawn(ack_loop(
            Arc::clone(&self.channel),
            Arc::clone(&shared),
            self.events.clone(),
            started,
        ));
        let outcome = self
            .transmit_loop(&frames, &shared, &mut ack_task, started)
            .await;
        ack_task.abort();
        let (log, timeouts) = outcome?;

        let sentinel = packet::end_of_stream_marker();
        for _ in 0..self.config.sentinel_copies {
            self.channel
                .transmit(&sentinel, self.config.receiver_addr)
                .await
                .map_err(TransferError::Transport)?;
        }

        let report = SendReport {
            packets: total,
            bytes,
            timeouts,
            elapsed: started.elapsed(),
            log,
        };
        log::info!(
            "[sender] done in {:?}: {} sends, {} retransmissions, {} timeouts",
            report.elapsed,
            report.log.len(),
            report.retransmissions(),
            report.timeouts
        );
        Ok(report)
    }

    async fn transmit_loop(
        &self,
        frames: &[Vec<u8>],
        shared: &Shared,
        ack_task: &mut AckTask,
        started: Instant,
    ) -> Result<(TransmissionLog, u32), TransferError> {
        let dest = self.config.receiver_addr;
        let mut log = TransmissionLog::new();
        let mut timeouts = 0u32;

        loop {
            let mut w = shared.window.lock().await;
            if w.is_complete() {
                break;
            }

            while let Some(seq) = w.next_sendable() {
                let retransmission = w.mark_sent();
                self.channel
                    .transmit(&frames[seq], dest)
                    .await
                    .map_err(TransferError::Transport)?;
                let entry = LogEntry {
                    seq: seq as i32,
                    offset: started.elapsed(),
                    retransmission,
                };
                log.record(entry);
                self.emit(TransmissionEvent::Sent(entry));
                log::debug!(
                    "[sender] → DATA seq={seq}{}",
                    if retransmission { " (retransmit)" } else { "" }
                );
            }

            if !w.timer().is_running() {
                w.timer_mut().start();
            }

            // Wait for an ACK to stop the timer or for it to expire.  The
            // lock is released while waiting so the ACK loop can run.
            while w.timer().is_running() && !w.timer().is_expired() {
                let deadline = w
                    .timer()
                    .deadline()
                    .map_or(Instant::now(), |d| d.min(Instant::now() + self.config.poll_interval));
                let notified = shared.acked.notified();
                drop(w);
                tokio::select! {
                    _ = notified => {}
                    _ = tokio::time::sleep_until(deadline) => {}
                }
                if ack_task.is_finished() {
                    return Err(ack_listener_failure(ack_task).await);
                }
                w = shared.window.lock().await;
            }

            // Re-read under the lock: an ACK may have stopped the timer after
            // it expired.
            if w.timer().is_expired() {
                let resend = w.on_timeout();
                timeouts += 1;
                log::debug!(
                    "[sender] timeout — going back to {} ({} packet(s))",
                    resend.start,
                    resend.len()
                );
                self.emit(TransmissionEvent::Timeout {
                    base: resend.start,
                    next_to_send: resend.end,
                    offset: started.elapsed(),
                });
                if let Some(max) = self.config.max_timeouts {
                    if w.stalled_timeouts() > max {
                        return Err(TransferError::RetriesExhausted {
                            base: w.base(),
                            timeouts: w.stalled_timeouts(),
                        });
                    }
                }
            } else {
                w.slide();
            }
        }

        Ok((log, timeouts))
    }

    fn emit(&self, event: TransmissionEvent) {
        if let Some(tx) = &self.events {
            let _ = tx.send(event);
        }
    }
}

/// Collect the reason the ACK task ended early.
async fn ack_listener_failure(task: &mut AckTask) -> TransferError {
    match task.await {
        Ok(Err(e)) => e,
        Ok(Ok(())) => TransferError::AckListener("exited".into()),
        Err(join) => TransferError::AckListener(join.to_string()),
    }
}

/// Receive ACKs for the lifetime of the transfer.
async fn ack_loop<T: Transport>(
    channel: Arc<LossyChannel<T>>,
    shared: Arc<Shared>,
    events: Option<mpsc::UnboundedSender<TransmissionEvent>>,
    started: Instant,
) -> Result<(), TransferError> {
    loop {
        let (bytes, from) = channel.receive().await.map_err(TransferError::Transport)?;
        let ack = match Packet::decode(&bytes) {
            Ok(p) => p.seq,
            Err(e) => {
                log::warn!("[sender] discarding frame from {from}: {e}");
                continue;
            }
        };

        let mut w = shared.window.lock().await;
        if w.on_ack(ack) {
            let base = w.base();
            drop(w);
            shared.acked.notify_one();
            log::debug!("[sender] ← ACK {ack}; base={base}");
            if let Some(tx) = &events {
                let _ = tx.send(TransmissionEvent::Acked {
                    ack,
                    base,
                    offset: started.elapsed(),
                });
            }
        } else {
            log::debug!("[sender] ← ACK {ack} ignored (base={})", w.base());
        }
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
