use bytes::{Bytes, BytesMut};
use futures::StreamExt;

use crate::{ByteStream, Piece, TransferError, TransferResult};

/// Cuts a byte stream into fixed-size pieces.
///
/// Incoming buffers are coalesced or split as needed, so piece boundaries depend
/// only on the chunk size. Every piece is `chunk_size` long except the last,
/// which holds the remainder. An empty stream yields exactly one empty piece.
pub struct ChunkSplitter {
    source: ByteStream,
    chunk_size: usize,
    buffer: BytesMut,
    next_index: usize,
    exhausted: bool,
}

impl ChunkSplitter {
    pub fn new(source: ByteStream, chunk_size: usize) -> Self {
        let chunk_size = chunk_size.max(1);
        Self {
            source,
            chunk_size,
            buffer: BytesMut::new(),
            next_index: 0,
            exhausted: false,
        }
    }

    /// Start the splitter with bytes that were already read off `source`.
    pub fn with_prefix(source: ByteStream, chunk_size: usize, prefix: Bytes) -> Self {
        let mut splitter = Self::new(source, chunk_size);
        splitter.buffer.extend_from_slice(&prefix);
        splitter
    }

    /// Read the next piece. Returns `None` once the stream is exhausted.
    pub async fn next_piece(&mut self) -> TransferResult<Option<Piece>> {
        while !self.exhausted && self.buffer.len() < self.chunk_size {
            match self.source.next().await {
                Some(Ok(chunk)) => self.buffer.extend_from_slice(&chunk),
                Some(Err(e)) => return Err(TransferError::from_io(e)),
                None => self.exhausted = true,
            }
        }

        let data = if self.buffer.len() >= self.chunk_size {
            self.buffer.split_to(self.chunk_size).freeze()
        } else if !self.buffer.is_empty() {
            self.buffer.split().freeze()
        } else if self.next_index == 0 {
            // zero-byte file: one empty piece so the manifest has a handle
            Bytes::new()
        } else {
            return Ok(None);
        };

        let piece = Piece {
            index: self.next_index,
            data,
        };
        self.next_index += 1;
        Ok(Some(piece))
    }
}
