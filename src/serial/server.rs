use std::time::Duration;

use chrono::Utc;
use tokio::io::{AsyncRead, ReadHalf};
use tokio::sync::mpsc;
use tokio_serial::SerialStream;

use crate::common::frame::{Frame, RtuFrame};
use crate::error::{FrameError, RequestError};
use crate::serial::frame::RtuRequestReader;
use crate::serial::SerialSettings;
use crate::server::task::{response_writer, Request, ResponseWriter};
use crate::shutdown::ShutdownListener;
use crate::types::UnitId;

/// Reads RTU requests off one serial port and parks them on the dispatcher
/// queue.
///
/// Error triage: timeouts abort the pending partial frame and keep going,
/// unsupported function codes are skipped after resynchronization inside the
/// reader, anything else is fatal for this port. Frames addressed to another
/// unit id and frames with a bad CRC produce no response.
pub(crate) struct RtuServerTask<R> {
    unit_id: UnitId,
    reader: RtuRequestReader,
    io: R,
    writer: ResponseWriter,
    tx: mpsc::Sender<Request>,
    shutdown: ShutdownListener,
}

impl RtuServerTask<ReadHalf<SerialStream>> {
    pub(crate) fn new(
        unit_id: UnitId,
        port: SerialStream,
        settings: &SerialSettings,
        tx: mpsc::Sender<Request>,
        shutdown: ShutdownListener,
    ) -> Self {
        let (read_half, write_half) = tokio::io::split(port);
        Self::with_io(
            unit_id,
            settings.read_timeout,
            read_half,
            response_writer(write_half),
            tx,
            shutdown,
        )
    }
}

impl<R> RtuServerTask<R>
where
    R: AsyncRead + Unpin,
{
    pub(crate) fn with_io(
        unit_id: UnitId,
        read_timeout: Duration,
        io: R,
        writer: ResponseWriter,
        tx: mpsc::Sender<Request>,
        shutdown: ShutdownListener,
    ) -> Self {
        RtuServerTask {
            unit_id,
            reader: RtuRequestReader::new(unit_id, read_timeout),
            io,
            writer,
            tx,
            shutdown,
        }
    }

    pub(crate) async fn run(mut self) {
        loop {
            tokio::select! {
                _ = self.shutdown.received() => {
                    tracing::info!("shutdown");
                    return;
                }
                result = self.reader.read_request(&mut self.io) => {
                    let received_at = Utc::now();
                    match result {
                        Ok(adu) => match RtuFrame::new(&adu) {
                            Ok(frame) => {
                                if frame.device != self.unit_id.value {
                                    // addressed to another slave on the bus
                                    continue;
                                }
                                let request = Request {
                                    io: self.writer.clone(),
                                    frame: Frame::Rtu(frame),
                                    received_at,
                                };
                                if self.tx.send(request).await.is_err() {
                                    return;
                                }
                            }
                            Err(err) => {
                                tracing::warn!("bad serial frame: {}", err);
                                self.reader.resync(&adu);
                            }
                        },
                        Err(err) if err.is_timeout() => {
                            self.reader.clear_residual();
                        }
                        Err(RequestError::Frame(FrameError::UnsupportedFunction(function))) => {
                            tracing::warn!("skipping frame with unsupported function: {:#04X}", function);
                        }
                        Err(err) => {
                            tracing::warn!("serial port error: {}", err);
                            return;
                        }
                    }
                }
            }
        }
    }
}
