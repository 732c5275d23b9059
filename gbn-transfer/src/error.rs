//! Transfer-level error type.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::config::ConfigError;
use crate::packet::PacketError;

/// Errors that end a transfer.
///
/// Channel loss never appears here: it is the condition the retransmission
/// timer exists to absorb.
#[derive(Debug, Error)]
pub enum TransferError {
    /// The input or output file could not be opened.  The engine never starts.
    #[error("unable to open {}: {source}", .path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    /// Reading the input or writing the reconstructed output failed.
    #[error("file I/O failed: {0}")]
    File(#[source] io::Error),
    /// The underlying datagram transport failed.
    #[error("transport error: {0}")]
    Transport(#[source] io::Error),
    #[error(transparent)]
    Packet(#[from] PacketError),
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
    /// `max_timeouts` consecutive timeouts passed without `base` moving.
    #[error("gave up after {timeouts} consecutive timeouts at base {base}")]
    RetriesExhausted { base: usize, timeouts: u32 },
    /// The ACK-listening task stopped unexpectedly.
    #[error("ack listener stopped: {0}")]
    AckListener(String),
}
