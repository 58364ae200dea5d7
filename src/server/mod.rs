use std::net::SocketAddr;
use std::sync::Arc;

use tokio::sync::{mpsc, Mutex};
use tracing::Instrument;

use crate::constants::queue;
use crate::error::{AlreadyRunning, InvalidUnitId};
use crate::serial::SerialSettings;
use crate::server::task::{Dispatcher, Request};
use crate::shutdown::ShutdownSignal;
use crate::types::UnitId;

mod database;
mod functions;
pub(crate) mod task;

pub use database::Database;
pub use functions::{
    read_coils, read_discrete_inputs, read_holding_registers, read_input_registers,
    write_multiple_coils, write_multiple_registers, write_single_coil, write_single_register,
    FunctionHandler, HandlerMap,
};

/// A Modbus slave serving the four in-memory tables over any number of TCP
/// listeners and serial ports.
///
/// Every transport feeds a single dispatcher task, so table access is
/// serialized without locking games. Dropping the server raises the same
/// close signal as [`Server::close`].
pub struct Server {
    unit_id: UnitId,
    tables: Arc<Mutex<Database>>,
    handlers: Option<HandlerMap>,
    observer: Option<mpsc::Sender<String>>,
    request_tx: Option<mpsc::Sender<Request>>,
    request_rx: Option<mpsc::Receiver<Request>>,
    shutdown: ShutdownSignal,
}

impl Server {
    /// Create a server for the given unit id with empty tables and the
    /// default handler registry. Unit id 0 is the broadcast address and is
    /// rejected.
    pub fn new(unit_id: UnitId) -> Result<Self, InvalidUnitId> {
        if unit_id.is_broadcast() {
            return Err(InvalidUnitId);
        }

        let (request_tx, request_rx) = mpsc::channel(queue::REQUEST_CAPACITY);

        Ok(Server {
            unit_id,
            tables: Arc::new(Mutex::new(Database::new())),
            handlers: Some(HandlerMap::new()),
            observer: None,
            request_tx: Some(request_tx),
            request_rx: Some(request_rx),
            shutdown: ShutdownSignal::new(),
        })
    }

    /// shared handle to the data tables
    pub fn database(&self) -> Arc<Mutex<Database>> {
        self.tables.clone()
    }

    /// Replace or add the handler for a Modbus function code.
    ///
    /// Fails once the server has started receiving requests, since the
    /// dispatcher treats the registry as read-only.
    pub fn register_function_handler(
        &mut self,
        function: u8,
        handler: FunctionHandler,
    ) -> Result<(), AlreadyRunning> {
        match self.handlers.as_mut() {
            Some(map) => {
                map.register(function, handler);
                Ok(())
            }
            None => Err(AlreadyRunning),
        }
    }

    /// Install the observation channel and return its receiving end. One
    /// textual record is emitted per accepted request; records are dropped
    /// rather than ever delaying dispatch. Must be called before the first
    /// listener starts.
    pub fn listen_requests(&mut self) -> Result<mpsc::Receiver<String>, AlreadyRunning> {
        if self.request_rx.is_none() {
            return Err(AlreadyRunning);
        }
        let (tx, rx) = mpsc::channel(queue::OBSERVATION_CAPACITY);
        self.observer = Some(tx);
        Ok(rx)
    }

    /// the dispatcher starts with the first listener
    fn ensure_dispatcher(&mut self) {
        if let Some(rx) = self.request_rx.take() {
            let handlers = self.handlers.take().unwrap_or_default();
            let dispatcher =
                Dispatcher::new(self.tables.clone(), handlers, rx, self.observer.take());
            tokio::spawn(
                dispatcher
                    .run()
                    .instrument(tracing::info_span!("Modbus-Dispatcher")),
            );
        }
    }

    fn request_sender(&self) -> Result<mpsc::Sender<Request>, std::io::Error> {
        match &self.request_tx {
            Some(tx) => Ok(tx.clone()),
            None => Err(std::io::Error::new(
                std::io::ErrorKind::NotConnected,
                "server is closed",
            )),
        }
    }

    /// Bind a TCP listener and start accepting connections. Returns the
    /// local address, which is useful when binding to port 0.
    pub async fn listen_tcp(&mut self, addr: SocketAddr) -> Result<SocketAddr, std::io::Error> {
        let tx = self.request_sender()?;
        let listener = tokio::net::TcpListener::bind(addr).await?;
        let local_addr = listener.local_addr()?;
        self.ensure_dispatcher();

        let task = crate::tcp::server::accept_task(listener, tx, self.shutdown.subscribe());
        tokio::spawn(task.instrument(
            tracing::info_span!("Modbus-Server-TCP", "listen" = ?local_addr),
        ));

        Ok(local_addr)
    }

    /// Open a serial port and start its RTU request loop. Frames addressed
    /// to other unit ids are dropped silently.
    pub fn listen_rtu(&mut self, settings: SerialSettings) -> Result<(), std::io::Error> {
        let tx = self.request_sender()?;
        let port = crate::serial::open(&settings)?;
        self.ensure_dispatcher();

        let path = settings.path.clone();
        let task = crate::serial::server::RtuServerTask::new(
            self.unit_id,
            port,
            &settings,
            tx,
            self.shutdown.subscribe(),
        );
        tokio::spawn(task.run().instrument(
            tracing::info_span!("Modbus-Server-RTU", "port" = ?path),
        ));

        Ok(())
    }

    /// Broadcast the close signal. Every transport loop observes it on its
    /// next iteration and releases its OS resource; the dispatcher stops once
    /// the last transport has stopped enqueuing.
    pub fn close(&mut self) {
        self.shutdown.signal();
        // dropping our queue handle lets the dispatcher drain and exit
        self.request_tx = None;
    }
}

impl Drop for Server {
    fn drop(&mut self) {
        self.close();
    }
}
