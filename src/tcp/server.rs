use chrono::Utc;
use tokio::io::AsyncRead;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tracing::Instrument;

use crate::common::buffer::ReadBuffer;
use crate::common::frame::{Frame, TcpFrame};
use crate::constants::frame::{MAX_MBAP_LENGTH_FIELD, MAX_TCP_ADU_LENGTH};
use crate::error::{FrameError, RequestError};
use crate::server::task::{response_writer, Request, ResponseWriter};
use crate::shutdown::ShutdownListener;

/// Accept connections until the close signal arrives, spawning one session
/// task per connection.
pub(crate) async fn accept_task(
    listener: TcpListener,
    tx: mpsc::Sender<Request>,
    mut shutdown: ShutdownListener,
) {
    let mut session_id = 0u64;
    loop {
        tokio::select! {
            _ = shutdown.received() => {
                tracing::info!("shutdown");
                return;
            }
            result = listener.accept() => {
                match result {
                    Ok((socket, remote)) => {
                        let session = SessionTask::new(socket, tx.clone(), shutdown.clone());
                        tokio::spawn(session.run().instrument(
                            tracing::info_span!("Session", "id" = session_id, "remote" = ?remote),
                        ));
                        session_id += 1;
                    }
                    Err(err) => {
                        tracing::warn!("unable to accept connection: {}", err);
                        return;
                    }
                }
            }
        }
    }
}

/// Reads MBAP frames off one connection and parks them on the dispatcher
/// queue. The loop exits on close signal, EOF, or a framing error.
struct SessionTask {
    io: tokio::net::tcp::OwnedReadHalf,
    writer: ResponseWriter,
    reader: MbapReader,
    tx: mpsc::Sender<Request>,
    shutdown: ShutdownListener,
}

impl SessionTask {
    fn new(socket: TcpStream, tx: mpsc::Sender<Request>, shutdown: ShutdownListener) -> Self {
        let (read_half, write_half) = socket.into_split();
        SessionTask {
            io: read_half,
            writer: response_writer(write_half),
            reader: MbapReader::new(),
            tx,
            shutdown,
        }
    }

    async fn run(mut self) {
        loop {
            tokio::select! {
                _ = self.shutdown.received() => return,
                result = self.reader.next_frame(&mut self.io) => {
                    let received_at = Utc::now();
                    match result {
                        Ok(frame) => {
                            let request = Request {
                                io: self.writer.clone(),
                                frame: Frame::Tcp(frame),
                                received_at,
                            };
                            if self.tx.send(request).await.is_err() {
                                return;
                            }
                        }
                        Err(RequestError::Io(err))
                            if err.kind() == std::io::ErrorKind::UnexpectedEof =>
                        {
                            tracing::debug!("connection closed by peer");
                            return;
                        }
                        Err(err) => {
                            tracing::warn!("closing connection: {}", err);
                            return;
                        }
                    }
                }
            }
        }
    }
}

#[derive(Clone, Copy)]
enum ParseState {
    Begin,
    /// transaction id, unit id, and the remaining ADU length (function code + data)
    Header(u16, u8, usize),
}

/// Incremental MBAP frame reader.
///
/// The length field drives the reads, so pipelined requests and maximum-size
/// ADUs work without assuming one ADU per socket read.
struct MbapReader {
    buffer: ReadBuffer,
    state: ParseState,
}

impl MbapReader {
    fn new() -> Self {
        MbapReader {
            buffer: ReadBuffer::new(MAX_TCP_ADU_LENGTH),
            state: ParseState::Begin,
        }
    }

    async fn next_frame<R>(&mut self, io: &mut R) -> Result<TcpFrame, RequestError>
    where
        R: AsyncRead + Unpin,
    {
        loop {
            if let Some(frame) = self.parse()? {
                return Ok(frame);
            }
            self.buffer.read_some(io).await?;
        }
    }

    /// advance the header/body state machine as far as the buffered bytes allow
    fn parse(&mut self) -> Result<Option<TcpFrame>, RequestError> {
        loop {
            match self.state {
                ParseState::Begin => {
                    if self.buffer.len() < 7 {
                        return Ok(None);
                    }

                    let transaction_id = self.buffer.read_u16_be()?;
                    let protocol_id = self.buffer.read_u16_be()?;
                    let length = self.buffer.read_u16_be()? as usize;
                    let device = self.buffer.read_u8()?;

                    if protocol_id != 0 {
                        return Err(FrameError::UnknownProtocolId(protocol_id).into());
                    }
                    if length < 2 {
                        return Err(FrameError::MbapLengthTooSmall(length).into());
                    }
                    if length > MAX_MBAP_LENGTH_FIELD {
                        return Err(
                            FrameError::MbapLengthTooBig(length, MAX_MBAP_LENGTH_FIELD).into()
                        );
                    }

                    // the unit id byte is already consumed; function code + data remain
                    self.state = ParseState::Header(transaction_id, device, length - 1);
                }
                ParseState::Header(transaction_id, device, remaining) => {
                    if self.buffer.len() < remaining {
                        return Ok(None);
                    }

                    let function = self.buffer.read_u8()?;
                    let data = self.buffer.read(remaining - 1)?.to_vec();
                    self.state = ParseState::Begin;

                    return Ok(Some(TcpFrame::request(
                        transaction_id,
                        device,
                        function,
                        data,
                    )));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::block_on;

    const READ_COILS_ADU: &[u8] = &[
        0x00, 0x01, 0x00, 0x00, 0x00, 0x06, 0xFF, 0x01, 0x00, 0x0A, 0x00, 0x09,
    ];

    fn mock(chunks: &[&[u8]]) -> tokio_test::io::Mock {
        let mut builder = tokio_test::io::Builder::new();
        for chunk in chunks {
            builder.read(chunk);
        }
        builder.build()
    }

    #[test]
    fn parses_a_complete_adu() {
        let mut reader = MbapReader::new();
        let mut io = mock(&[READ_COILS_ADU]);
        let frame = block_on(reader.next_frame(&mut io)).unwrap();
        assert_eq!(frame.transaction_id, 1);
        assert_eq!(frame.device, 0xFF);
        assert_eq!(frame.function, 0x01);
        assert_eq!(frame.data(), &[0x00, 0x0A, 0x00, 0x09]);
        assert_eq!(frame.bytes(), READ_COILS_ADU);
    }

    #[test]
    fn parses_pipelined_adus_from_one_read() {
        let mut stream = READ_COILS_ADU.to_vec();
        stream.extend_from_slice(READ_COILS_ADU);
        let mut reader = MbapReader::new();
        let mut io = mock(&[&stream]);
        let first = block_on(reader.next_frame(&mut io)).unwrap();
        let second = block_on(reader.next_frame(&mut io)).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn reassembles_adu_split_across_reads() {
        let (head, tail) = READ_COILS_ADU.split_at(5);
        let mut reader = MbapReader::new();
        let mut io = mock(&[head, tail]);
        let frame = block_on(reader.next_frame(&mut io)).unwrap();
        assert_eq!(frame.data(), &[0x00, 0x0A, 0x00, 0x09]);
    }

    #[test]
    fn rejects_bad_protocol_id() {
        let adu = [
            0x00, 0x01, 0xCA, 0xFE, 0x00, 0x06, 0xFF, 0x01, 0x00, 0x0A, 0x00, 0x09,
        ];
        let mut reader = MbapReader::new();
        let mut io = mock(&[&adu]);
        let err = block_on(reader.next_frame(&mut io)).unwrap_err();
        assert!(matches!(
            err,
            RequestError::Frame(FrameError::UnknownProtocolId(0xCAFE))
        ));
    }

    #[test]
    fn rejects_undersized_length_field() {
        let adu = [0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0xFF];
        let mut reader = MbapReader::new();
        let mut io = mock(&[&adu]);
        let err = block_on(reader.next_frame(&mut io)).unwrap_err();
        assert!(matches!(
            err,
            RequestError::Frame(FrameError::MbapLengthTooSmall(1))
        ));
    }

    #[test]
    fn surfaces_eof_while_waiting_for_a_frame() {
        let mut reader = MbapReader::new();
        let mut io = mock(&[&READ_COILS_ADU[..4]]);
        let err = block_on(reader.next_frame(&mut io)).unwrap_err();
        assert!(matches!(err, RequestError::Io(_)));
    }
}
