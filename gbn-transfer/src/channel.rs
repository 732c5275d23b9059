//! Lossy channel adapter.
//!
//! Real networks drop packets.  To exercise the reliability mechanisms
//! without depending on actual network conditions, [`LossyChannel`] wraps a
//! [`Transport`] and discards each outbound datagram independently with a
//! configured probability.  The caller is never told about a drop.
//!
//! Loss is applied on the send path only.  Because both the sender (data)
//! and the receiver (ACKs) send through their own adapter, each direction is
//! independently lossy.  Receives pass through unchanged.

use std::io;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::transport::Transport;

/// Counters describing what the adapter did with outbound frames.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChannelStats {
    /// Frames handed to [`LossyChannel::transmit`].
    pub offered: u64,
    /// Frames silently discarded.
    pub dropped: u64,
}

/// A fault-injecting wrapper around a [`Transport`].
#[derive(Debug)]
pub struct LossyChannel<T> {
    inner: T,
    drop_probability: f64,
    rng: Mutex<StdRng>,
    offered: AtomicU64,
    dropped: AtomicU64,
}

impl<T: Transport> LossyChannel<T> {
    /// Wrap `inner`, dropping each send with `drop_probability` (OS-seeded).
    pub fn new(inner: T, drop_probability: f64) -> Self {
        Self::with_rng(inner, drop_probability, StdRng::from_os_rng())
    }

    /// Like [`LossyChannel::new`] but with a reproducible drop sequence.
    pub fn with_seed(inner: T, drop_probability: f64, seed: u64) -> Self {
        Self::with_rng(inner, drop_probability, StdRng::seed_from_u64(seed))
    }

    fn with_rng(inner: T, drop_probability: f64, rng: StdRng) -> Self {
        Self {
            inner,
            drop_probability: drop_probability.clamp(0.0, 1.0),
            rng: Mutex::new(rng),
            offered: AtomicU64::new(0),
            dropped: AtomicU64::new(0),
        }
    }

    /// Forward `frame` to `dest`, or silently discard it.
    ///
    /// Only errors from the underlying transport are reported; a drop is
    /// `Ok(())`.
    pub async fn transmit(&self, frame: &[u8], dest: SocketAddr) -> io::Result<()> {
        self.offered.fetch_add(1, Ordering::Relaxed);
        if self.should_drop() {
            self.dropped.fetch_add(1, Ordering::Relaxed);
            log::trace!("[channel] dropped {} byte frame to {dest}", frame.len());
            return Ok(());
        }
        self.inner.send_to(frame, dest).await
    }

    /// Blocking receive from the underlying transport; no loss applied.
    pub async fn receive(&self) -> io::Result<(Vec<u8>, SocketAddr)> {
        self.inner.recv_from().await
    }

    pub fn stats(&self) -> ChannelStats {
        ChannelStats {
            offered: self.offered.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
        }
    }

    pub fn into_inner(self) -> T {
        self.inner
    }

    fn should_drop(&self) -> bool {
        if self.drop_probability <= 0.0 {
            return false;
        }
        // A poisoned RNG is still a valid RNG.
        let mut rng = self.rng.lock().unwrap_or_else(|e| e.into_inner());
        rng.random_bool(self.drop_probability)
    }
}
