//! Entry point for `gbn-transfer`.
//!
//! Parses CLI arguments and dispatches into either **send** or **receive**
//! mode.  All protocol work is delegated to library modules; `main.rs` owns
//! only process setup (logging, argument parsing, socket binding).

use std::fs::File;
use std::io::{BufWriter, Write};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};

use gbn_transfer::{LossyChannel, Receiver, Sender, Socket, TransferConfig};

/// Go-Back-N file transfer over lossy UDP.
#[derive(Parser)]
#[command(author, version, about)]
struct Cli {
    #[command(subcommand)]
    mode: Mode,

    #[command(flatten)]
    protocol: ProtocolArgs,
}

#[derive(Subcommand)]
enum Mode {
    /// Send FILE to a waiting receiver.
    Send {
        file: PathBuf,
        /// Receiver address.
        #[arg(long, default_value = "127.0.0.1:8080")]
        to: SocketAddr,
        /// Local address to send from (port 0 = ephemeral).
        #[arg(long, default_value = "127.0.0.1:0")]
        bind: SocketAddr,
        /// Write the transmission log as JSON after the transfer.
        #[arg(long)]
        log_json: Option<PathBuf>,
    },
    /// Receive a stream into FILE (created or truncated).
    Receive {
        file: PathBuf,
        /// Local address to listen on.
        #[arg(long, default_value = "127.0.0.1:8080")]
        bind: SocketAddr,
    },
}

#[derive(Args)]
struct ProtocolArgs {
    /// Fraction of outbound datagrams to drop.
    #[arg(long, global = true, default_value_t = 1.0 / 9.0)]
    drop_probability: f64,
    /// Maximum packets in flight.
    #[arg(long, global = true, default_value_t = 4)]
    window: usize,
    /// Retransmission timeout in milliseconds.
    #[arg(long, global = true, default_value_t = 500)]
    timeout_ms: u64,
    /// Longest wait between timer checks, in milliseconds.
    #[arg(long, global = true, default_value_t = 50)]
    poll_ms: u64,
    /// Payload bytes per packet.
    #[arg(long, global = true, default_value_t = 512)]
    chunk_size: usize,
    /// Give up after this many timeouts in a row without progress.
    #[arg(long, global = true)]
    max_timeouts: Option<u32>,
    /// End-of-stream sentinels to send when finished.
    #[arg(long, global = true, default_value_t = 1)]
    sentinel_copies: u32,
}

impl ProtocolArgs {
    fn into_config(self, receiver_addr: SocketAddr) -> TransferConfig {
        TransferConfig {
            drop_probability: self.drop_probability,
            window_size: self.window,
            timeout: Duration::from_millis(self.timeout_ms),
            poll_interval: Duration::from_millis(self.poll_ms),
            chunk_size: self.chunk_size,
            receiver_addr,
            max_timeouts: self.max_timeouts,
            sentinel_copies: self.sentinel_copies,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    // Initialise env_logger; set RUST_LOG to control verbosity.
    env_logger::init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    match cli.mode {
        Mode::Send {
            file,
            to,
            bind,
            log_json,
        } => {
            let config = cli.protocol.into_config(to);
            let socket = Socket::bind(bind)
                .await
                .with_context(|| format!("binding {bind}"))?;
            log::info!("Sending {} from {}", file.display(), socket.local_addr);

            let channel = LossyChannel::new(socket, config.drop_probability);
            let sender = Sender::new(channel, config)?;
            let report = sender.send_file(&file).await?;
            println!(
                "sent {} packets ({} bytes) in {:?}; {} retransmissions after {} timeouts",
                report.packets,
                report.bytes,
                report.elapsed,
                report.retransmissions(),
                report.timeouts
            );

            if let Some(path) = log_json {
                let out = File::create(&path)
                    .with_context(|| format!("creating {}", path.display()))?;
                let mut out = BufWriter::new(out);
                report.log.write_json(&mut out)?;
                out.flush()?;
            }
        }
        Mode::Receive { file, bind } => {
            let config = cli.protocol.into_config(bind);
            config.validate()?;
            let socket = Socket::bind(bind)
                .await
                .with_context(|| format!("binding {bind}"))?;
            log::info!("Receiving into {} on {}", file.display(), socket.local_addr);

            let receiver = Receiver::new(LossyChannel::new(socket, config.drop_probability));
            let report = receiver.receive_file(&file).await?;
            println!(
                "received {} packets ({} bytes); {} duplicates, {} out of order",
                report.packets_delivered, report.bytes_written, report.duplicates, report.buffered
            );
        }
    }
    Ok(())
}
