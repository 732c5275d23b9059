//! Input chunking.
//!
//! The sender numbers one packet per chunk, so chunk boundaries must be
//! stable: every chunk except the last is exactly `chunk_size` bytes.

use std::path::Path;

use tokio::fs::File;
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::error::TransferError;

/// Read the next chunk of up to `chunk_size` bytes.
///
/// Returns `Ok(None)` at end of input.  Short reads from the underlying
/// reader are retried so only the final chunk can be short.
pub async fn read_chunk<R>(reader: &mut R, chunk_size: usize) -> std::io::Result<Option<Vec<u8>>>
where
    R: AsyncRead + Unpin,
{
    let mut buf = vec![0u8; chunk_size];
    let mut filled = 0;
    while filled < chunk_size {
        let n = reader.read(&mut buf[filled..]).await?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    if filled == 0 {
        return Ok(None);
    }
    buf.truncate(filled);
    Ok(Some(buf))
}

/// Split everything `reader` yields into chunks.
pub async fn read_all_chunks<R>(mut reader: R, chunk_size: usize) -> std::io::Result<Vec<Vec<u8>>>
where
    R: AsyncRead + Unpin,
{
    let mut chunks = Vec::new();
    while let Some(chunk) = read_chunk(&mut reader, chunk_size).await? {
        chunks.push(chunk);
    }
    Ok(chunks)
}

/// Open `path` and split it into chunks.
///
/// Failure to open is reported as [`TransferError::Open`].
pub async fn read_chunks(path: &Path, chunk_size: usize) -> Result<Vec<Vec<u8>>, TransferError> {
    let file = File::open(path).await.map_err(|source| TransferError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    read_all_chunks(file, chunk_size)
        .await
        .map_err(TransferError::File)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn last_chunk_may_be_short() {
        let data: Vec<u8> = (0..10).collect();
        let chunks = read_all_chunks(&data[..], 4).await.unwrap();
        assert_eq!(chunks, vec![vec![0, 1, 2, 3], vec![4, 5, 6, 7], vec![8, 9]]);
    }

    #[tokio::test]
    async fn exact_multiple_has_no_empty_tail() {
        let data = [7u8; 8];
        let chunks = read_all_chunks(&data[..], 4).await.unwrap();
        assert_eq!(chunks.len(), 2);
    }

    #[tokio::test]
    async fn empty_input_has_no_chunks() {
        let chunks = read_all_chunks(&[0u8; 0][..], 512).await.unwrap();
        assert!(chunks.is_empty());
    }

    #[tokio::test]
    async fn short_reads_are_coalesced() {
        let mut reader = Pieces::new(&[&b"abc"[..], &b"def"[..], &b"gh"[..]]);
        let first = read_chunk(&mut reader, 5).await.unwrap();
        assert_eq!(first.as_deref(), Some(&b"abcde"[..]));
        let second = read_chunk(&mut reader, 5).await.unwrap();
        assert_eq!(second.as_deref(), Some(&b"fgh"[..]));
        assert_eq!(read_chunk(&mut reader, 5).await.unwrap(), None);
    }

    #[tokio::test]
    async fn missing_file_is_an_open_error() {
        let path = std::env::temp_dir().join("gbn-transfer-does-not-exist.bin");
        let err = read_chunks(&path, 512).await.unwrap_err();
        assert!(matches!(err, TransferError::Open { .. }), "{err}");
    }

    /// A reader that returns at most one piece per `read` call.
    struct Pieces {
        pieces: std::collections::VecDeque<Vec<u8>>,
    }

    impl Pieces {
        fn new(pieces: &[&[u8]]) -> Self {
            Self {
                pieces: pieces.iter().map(|p| p.to_vec()).collect(),
            }
        }
    }

    impl AsyncRead for Pieces {
        fn poll_read(
            mut self: std::pin::Pin<&mut Self>,
            _cx: &mut std::task::Context<'_>,
            buf: &mut tokio::io::ReadBuf<'_>,
        ) -> std::task::Poll<std::io::Result<()>> {
            if let Some(mut piece) = self.pieces.pop_front() {
                let n = piece.len().min(buf.remaining());
                buf.put_slice(&piece[..n]);
                if n < piece.len() {
                    piece.drain(..n);
                    self.pieces.push_front(piece);
                }
            }
            std::task::Poll::Ready(Ok(()))
        }
    }
}
