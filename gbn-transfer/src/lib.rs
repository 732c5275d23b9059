//! `gbn-transfer`: reliable file transfer over a lossy datagram channel
//! using Go-Back-N.
//!
//! # Architecture
//!
//! ```text
//!  ┌──────────────────────┐    data frames    ┌──────────────────────┐
//!  │ Sender               │──────────────────▶│ Receiver             │
//!  │  transmit loop ─┐    │                   │  ReorderBuffer       │
//!  │  ack loop ──────┤    │◀──────────────────│  (in-order delivery) │
//!  │   Mutex<SendWindow>  │   cumulative ACKs └──────────┬───────────┘
//!  └─────────┬────────────┘                              │
//!            │                                           │
//!  ┌─────────▼───────────────────────────────────────────▼───────────┐
//!  │                LossyChannel (drops sends at random)             │
//!  └─────────┬───────────────────────────────────────────┬───────────┘
//!            │ datagrams                                 │
//!  ┌─────────▼──────────┐                     ┌──────────▼──────────┐
//!  │ Transport (Socket / │                     │ Transport           │
//!  │ MemoryTransport)    │                     │                     │
//!  └─────────────────────┘                     └─────────────────────┘
//! ```
//!
//! Each module has a single responsibility:
//! - [`packet`]    — wire format (sequence number + payload, sentinel)
//! - [`transport`] — datagram boundary trait and in-memory link
//! - [`socket`]    — UDP implementation of [`transport::Transport`]
//! - [`channel`]   — probabilistic drop filter on the send path
//! - [`timer`]     — single cumulative retransmission timer
//! - [`sender`]    — sliding window and the two sender loops
//! - [`receiver`]  — expected-sequence tracking and out-of-order buffer
//! - [`trace`]     — transmission log and event feed
//! - [`source`]    — splitting input into fixed-size chunks
//! - [`config`]    — tunable parameters
//! - [`error`]     — transfer error type

pub mod channel;
pub mod config;
pub mod error;
pub mod packet;
pub mod receiver;
pub mod sender;
pub mod socket;
pub mod source;
pub mod timer;
pub mod trace;
pub mod transport;

pub use channel::LossyChannel;
pub use config::TransferConfig;
pub use error::TransferError;
pub use receiver::{ReceiveReport, Receiver};
pub use sender::{SendReport, Sender};
pub use socket::Socket;
pub use transport::{MemoryTransport, Transport};
