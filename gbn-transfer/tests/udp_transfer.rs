//! Transfers over real UDP sockets on loopback.
//!
//! Each test binds both ends on OS-chosen loopback ports, runs the receiver
//! in a background task, and checks the reconstructed bytes.

use std::net::SocketAddr;
use std::time::Duration;

use gbn_transfer::{LossyChannel, Receiver, Sender, Socket, TransferConfig};

// ---------------------------------------------------------------------------
// Helper
// ---------------------------------------------------------------------------

async fn ephemeral() -> Socket {
    Socket::bind("127.0.0.1:0".parse::<SocketAddr>().unwrap())
        .await
        .expect("bind loopback socket")
}

async fn run(data: Vec<u8>, drop_probability: f64) -> Vec<u8> {
    let receiver_sock = ephemeral().await;
    let receiver_addr = receiver_sock.local_addr;
    let sender_sock = ephemeral().await;

    let receiver = Receiver::new(LossyChannel::with_seed(receiver_sock, drop_probability, 3));
    let receiving = tokio::spawn(async move {
        let mut out = Vec::new();
        receiver.receive_into(&mut out).await.expect("receive");
        out
    });

    let config = TransferConfig {
        drop_probability,
        window_size: 4,
        timeout: Duration::from_millis(100),
        poll_interval: Duration::from_millis(10),
        chunk_size: 512,
        receiver_addr,
        max_timeouts: Some(200),
        sentinel_copies: 10,
    };
    let sender = Sender::new(
        LossyChannel::with_seed(sender_sock, drop_probability, 4),
        config,
    )
    .expect("valid config");

    tokio::time::timeout(Duration::from_secs(30), async {
        let report = sender.send_chunks(split(&data, 512)).await.expect("send");
        assert_eq!(report.packets, data.len().div_ceil(512));
        receiving.await.expect("receiver task panicked")
    })
    .await
    .expect("transfer timed out")
}

fn split(data: &[u8], size: usize) -> Vec<Vec<u8>> {
    data.chunks(size).map(<[u8]>::to_vec).collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[tokio::test]
async fn loopback_transfer_without_loss() {
    let data: Vec<u8> = (0..20_000u32).map(|i| (i * 7 % 256) as u8).collect();
    assert_eq!(run(data.clone(), 0.0).await, data);
}

#[tokio::test]
async fn loopback_transfer_with_default_loss_rate() {
    let data: Vec<u8> = (0..8_000u32).map(|i| (i % 13) as u8).collect();
    let loss = TransferConfig::default().drop_probability;
    assert_eq!(run(data.clone(), loss).await, data);
}
