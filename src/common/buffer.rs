use tokio::io::{AsyncRead, AsyncReadExt};

use crate::error::InternalError;

/// Accumulates bytes from an `AsyncRead` so that frame parsers can wait for a
/// complete frame without losing the bytes that follow it.
pub(crate) struct ReadBuffer {
    buffer: Vec<u8>,
    begin: usize,
    end: usize,
}

impl ReadBuffer {
    pub(crate) fn new(capacity: usize) -> Self {
        ReadBuffer {
            buffer: vec![0; capacity],
            begin: 0,
            end: 0,
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.end - self.begin
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.begin == self.end
    }

    pub(crate) fn read(&mut self, count: usize) -> Result<&[u8], InternalError> {
        match self.buffer.get(self.begin..self.begin + count) {
            Some(bytes) if self.len() >= count => {
                self.begin += count;
                Ok(bytes)
            }
            _ => Err(InternalError::InsufficientBytesForRead(count, self.len())),
        }
    }

    pub(crate) fn read_u8(&mut self) -> Result<u8, InternalError> {
        match self.buffer.get(self.begin) {
            Some(byte) if !self.is_empty() => {
                let value = *byte;
                self.begin += 1;
                Ok(value)
            }
            _ => Err(InternalError::InsufficientBytesForRead(1, 0)),
        }
    }

    pub(crate) fn read_u16_be(&mut self) -> Result<u16, InternalError> {
        let high = self.read_u8()? as u16;
        let low = self.read_u8()? as u16;
        Ok((high << 8) | low)
    }

    pub(crate) async fn read_some<T: AsyncRead + Unpin>(
        &mut self,
        io: &mut T,
    ) -> Result<usize, std::io::Error> {
        // an empty buffer can rewind for the biggest possible read
        if self.is_empty() {
            self.begin = 0;
            self.end = 0;
        }

        // at capacity with a partial frame pending, shift it to the front
        if self.end == self.buffer.len() {
            let length = self.len();
            self.buffer.copy_within(self.begin..self.end, 0);
            self.begin = 0;
            self.end = length;
        }

        let count = io.read(&mut self.buffer[self.end..]).await?;
        if count == 0 {
            return Err(std::io::Error::from(std::io::ErrorKind::UnexpectedEof));
        }
        self.end += count;
        Ok(count)
    }
}
