//! Datagram transport boundary.
//!
//! The protocol engines never touch a socket directly.  They talk to a
//! [`Transport`], which moves whole datagrams between addresses with no
//! delivery guarantee.  Two implementations exist:
//! - [`crate::socket::Socket`] — a real UDP socket.
//! - [`MemoryTransport`] — a connected in-process pair, used by tests and
//!   by anything that wants to run both roles in one process.

use std::future::Future;
use std::io;
use std::net::SocketAddr;

use tokio::sync::{mpsc, Mutex};

/// Fire-and-forget datagram I/O.
///
/// All methods take `&self` so one transport can be shared between the
/// sender's transmit loop and its ACK loop.
pub trait Transport: Send + Sync + 'static {
    /// Send one datagram to `dest`.
    fn send_to(
        &self,
        frame: &[u8],
        dest: SocketAddr,
    ) -> impl Future<Output = io::Result<()>> + Send;

    /// Block until the next datagram arrives; returns `(bytes, source)`.
    fn recv_from(&self) -> impl Future<Output = io::Result<(Vec<u8>, SocketAddr)>> + Send;

    /// Address this endpoint is reachable at.
    fn local_addr(&self) -> SocketAddr;
}

type Datagram = (Vec<u8>, SocketAddr);

/// One end of an in-memory datagram link.
///
/// Datagrams sent on one end arrive, in order, at the other end.  The
/// destination address is ignored (the link is point-to-point).  Sending to
/// a peer that has been dropped silently discards the datagram, the way UDP
/// discards a datagram sent to a closed port.
#[derive(Debug)]
pub struct MemoryTransport {
    local_addr: SocketAddr,
    peer_tx: mpsc::UnboundedSender<Datagram>,
    inbox: Mutex<mpsc::UnboundedReceiver<Datagram>>,
}

impl MemoryTransport {
    /// Create two connected endpoints reachable at `a` and `b`.
    pub fn pair(a: SocketAddr, b: SocketAddr) -> (Self, Self) {
        let (to_a, a_inbox) = mpsc::unbounded_channel();
        let (to_b, b_inbox) = mpsc::unbounded_channel();
        let left = Self {
            local_addr: a,
            peer_tx: to_b,
            inbox: Mutex::new(a_inbox),
        };
        let right = Self {
            local_addr: b,
            peer_tx: to_a,
            inbox: Mutex::new(b_inbox),
        };
        (left, right)
    }
}

impl Transport for MemoryTransport {
    async fn send_to(&self, frame: &[u8], _dest: SocketAddr) -> io::Result<()> {
        // A closed peer is not an error for a datagram sender.
        let _ = self.peer_tx.send((frame.to_vec(), self.local_addr));
        Ok(())
    }

    async fn recv_from(&self) -> io::Result<(Vec<u8>, SocketAddr)> {
        self.inbox.lock().await.recv().await.ok_or_else(|| {
            io::Error::new(io::ErrorKind::ConnectionAborted, "memory link closed")
        })
    }

    fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addrs() -> (SocketAddr, SocketAddr) {
        (
            "127.0.0.1:1000".parse().unwrap(),
            "127.0.0.1:2000".parse().unwrap(),
        )
    }

    #[tokio::test]
    async fn datagrams_cross_the_link_in_order() {
        let (a_addr, b_addr) = addrs();
        let (a, b) = MemoryTransport::pair(a_addr, b_addr);

        a.send_to(b"one", b_addr).await.unwrap();
        a.send_to(b"two", b_addr).await.unwrap();

        assert_eq!(b.recv_from().await.unwrap(), (b"one".to_vec(), a_addr));
        assert_eq!(b.recv_from().await.unwrap(), (b"two".to_vec(), a_addr));

        b.send_to(b"back", a_addr).await.unwrap();
        assert_eq!(a.recv_from().await.unwrap(), (b"back".to_vec(), b_addr));
    }

    #[tokio::test]
    async fn send_to_dropped_peer_is_silent() {
        let (a_addr, b_addr) = addrs();
        let (a, b) = MemoryTransport::pair(a_addr, b_addr);
        drop(b);
        assert!(a.send_to(b"lost", b_addr).await.is_ok());
    }

    #[tokio::test]
    async fn recv_after_peer_dropped_errors() {
        let (a_addr, b_addr) = addrs();
        let (a, b) = MemoryTransport::pair(a_addr, b_addr);
        drop(b);
        let err = a.recv_from().await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::ConnectionAborted);
    }
}
