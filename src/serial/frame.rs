use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt};

use crate::common::function::constants as fc;
use crate::constants::frame::{MAX_PDU_LENGTH, MAX_RTU_ADU_LENGTH};
use crate::error::{FrameError, RequestError};
use crate::types::UnitId;

/// Reads RTU request ADUs off a raw serial stream.
///
/// RTU frames carry no length prefix, so the expected frame length is derived
/// from the function code and payload header once enough bytes are present.
/// Bytes that arrive past the end of a frame, or that remain usable after a
/// parse failure, are carried in `last` across calls so the reader can
/// resynchronize on the next occurrence of this slave's unit id.
pub(crate) struct RtuRequestReader {
    unit_id: UnitId,
    read_timeout: Duration,
    last: Vec<u8>,
}

impl RtuRequestReader {
    pub(crate) fn new(unit_id: UnitId, read_timeout: Duration) -> Self {
        RtuRequestReader {
            unit_id,
            read_timeout,
            last: Vec::new(),
        }
    }

    /// a serial timeout aborts whatever partial frame was pending
    pub(crate) fn clear_residual(&mut self) {
        self.last.clear();
    }

    /// After a frame-level parse failure (e.g. a CRC mismatch), keep any
    /// suffix of the rejected bytes that still starts with our unit id so a
    /// frame embedded in the discarded bytes can be recovered.
    pub(crate) fn resync(&mut self, rejected: &[u8]) {
        if let Some(n) = find_from(self.unit_id.value, rejected, 1) {
            self.last.splice(0..0, rejected[n..].iter().copied());
        }
    }

    /// Read exactly one frame's worth of bytes.
    ///
    /// Length decisions are deferred until the header bytes that drive them
    /// have arrived. On an I/O error the bytes read so far move into `last`
    /// and the error is returned unchanged, so the caller can tell a timeout
    /// apart from a fatal port error.
    pub(crate) async fn read_request<R>(&mut self, io: &mut R) -> Result<Vec<u8>, RequestError>
    where
        R: AsyncRead + Unpin,
    {
        let mut buffer = vec![0; MAX_RTU_ADU_LENGTH + 3];
        let mut read = 0;

        if !self.last.is_empty() {
            if let Some(n) = find(self.unit_id.value, &self.last) {
                let carried = &self.last[n..];
                let count = carried.len().min(buffer.len());
                buffer[..count].copy_from_slice(&carried[..count]);
                read = count;
            }
            self.last.clear();
        }

        loop {
            let expected = match rtu_size_from_header(&buffer[..read]) {
                Ok(size) => size,
                Err(err) => {
                    // keep a later sync point, if any, for the next call
                    if let Some(n) = find_from(self.unit_id.value, &buffer[..read], 1) {
                        self.last = buffer[n..read].to_vec();
                    }
                    return Err(err.into());
                }
            };

            if read >= expected {
                if read > expected {
                    // the next frame started arriving together with this one
                    self.last.extend_from_slice(&buffer[expected..read]);
                }
                buffer.truncate(expected);
                return Ok(buffer);
            }

            let result = match tokio::time::timeout(self.read_timeout, io.read(&mut buffer[read..]))
                .await
            {
                Ok(result) => result,
                Err(_) => Err(std::io::Error::from(std::io::ErrorKind::TimedOut)),
            };

            match result {
                Ok(0) => {
                    self.last.extend_from_slice(&buffer[..read]);
                    return Err(std::io::Error::from(std::io::ErrorKind::UnexpectedEof).into());
                }
                Ok(count) => read += count,
                Err(err) => {
                    self.last.extend_from_slice(&buffer[..read]);
                    return Err(err.into());
                }
            }
        }
    }
}

/// Expected total RTU ADU size for the bytes received so far. Fewer than two
/// bytes cannot be sized yet, which reports as the maximum ("need more").
fn rtu_size_from_header(header: &[u8]) -> Result<usize, FrameError> {
    if header.len() < 2 {
        return Ok(MAX_PDU_LENGTH);
    }
    Ok(pdu_size_from_header(&header[1..])? + 3)
}

/// Expected PDU size based on the function code and, for the variable-length
/// functions, their byte-count field. The maximum means "need more bytes".
fn pdu_size_from_header(header: &[u8]) -> Result<usize, FrameError> {
    match header[0] {
        fc::READ_COILS
        | fc::READ_DISCRETE_INPUTS
        | fc::READ_HOLDING_REGISTERS
        | fc::READ_INPUT_REGISTERS
        | fc::WRITE_SINGLE_COIL
        | fc::WRITE_SINGLE_REGISTER => Ok(5),

        fc::WRITE_MULTIPLE_COILS | fc::WRITE_MULTIPLE_REGISTERS => match header.get(5) {
            Some(count) => Ok(*count as usize + 6),
            None => Ok(MAX_PDU_LENGTH),
        },

        fc::READ_EXCEPTION_STATUS
        | fc::GET_COMM_EVENT_COUNTER
        | fc::GET_COMM_EVENT_LOG
        | fc::REPORT_SERVER_ID => Ok(1),

        fc::READ_FIFO_QUEUE => Ok(3),

        fc::READ_DEVICE_IDENTIFICATION => Ok(4),

        fc::MASK_WRITE_REGISTER => Ok(7),

        fc::WRITE_FILE_RECORD => match header.get(1) {
            Some(count) => Ok(*count as usize + 2),
            None => Ok(MAX_PDU_LENGTH),
        },

        fc::READ_WRITE_MULTIPLE_REGISTERS => match header.get(9) {
            Some(count) => Ok(*count as usize + 10),
            None => Ok(MAX_PDU_LENGTH),
        },

        other => Err(FrameError::UnsupportedFunction(other)),
    }
}

/// position of the first occurrence of `x` in `data`
fn find(x: u8, data: &[u8]) -> Option<usize> {
    data.iter().position(|byte| *byte == x)
}

/// position of the first occurrence of `x` in `data` at or after `start`
fn find_from(x: u8, data: &[u8], start: usize) -> Option<usize> {
    if data.len() <= start {
        return None;
    }
    find(x, &data[start..]).map(|n| n + start)
}
