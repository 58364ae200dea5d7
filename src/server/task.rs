use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::{mpsc, Mutex};

use crate::common::frame::Frame;
use crate::common::function::name_of;
use crate::exception::ExceptionCode;
use crate::server::database::Database;
use crate::server::functions::HandlerMap;

/// Write half of the connection a request arrived on. The dispatcher only
/// ever writes to it; responses for one connection go out in arrival order
/// because a single dispatcher drains the queue.
pub(crate) type ResponseWriter = Arc<Mutex<Box<dyn AsyncWrite + Send + Unpin>>>;

pub(crate) fn response_writer<W>(io: W) -> ResponseWriter
where
    W: AsyncWrite + Send + Unpin + 'static,
{
    let boxed: Box<dyn AsyncWrite + Send + Unpin> = Box::new(io);
    Arc::new(Mutex::new(boxed))
}

/// A parsed request queued for the dispatcher
pub(crate) struct Request {
    pub(crate) io: ResponseWriter,
    pub(crate) frame: Frame,
    pub(crate) received_at: DateTime<Utc>,
}

/// Single consumer of the request queue.
///
/// All table access happens here, so handlers never observe a concurrent
/// mutation even though transports run independently.
pub(crate) struct Dispatcher {
    tables: Arc<Mutex<Database>>,
    handlers: HandlerMap,
    rx: mpsc::Receiver<Request>,
    observer: Option<mpsc::Sender<String>>,
}

impl Dispatcher {
    pub(crate) fn new(
        tables: Arc<Mutex<Database>>,
        handlers: HandlerMap,
        rx: mpsc::Receiver<Request>,
        observer: Option<mpsc::Sender<String>>,
    ) -> Self {
        Dispatcher {
            tables,
            handlers,
            rx,
            observer,
        }
    }

    pub(crate) async fn run(mut self) {
        while let Some(request) = self.rx.recv().await {
            if let Some(tx) = &self.observer {
                // observation must never block dispatch: a full channel drops the record
                let _ = tx.try_send(render_request(&request.frame, request.received_at));
            }

            let response = {
                let mut tables = self.tables.lock().await;
                execute(&mut tables, &self.handlers, &request.frame)
            };

            let bytes = response.bytes();
            if let Err(err) = request.io.lock().await.write_all(&bytes).await {
                tracing::warn!("unable to write response: {}", err);
            }
        }
        // the queue closes once every transport has stopped enqueuing
        tracing::info!("dispatcher stopped");
    }
}

/// Clone the request into a response template, run the registered handler,
/// and apply exception framing when the handler refuses the request.
pub(crate) fn execute(tables: &mut Database, handlers: &HandlerMap, frame: &Frame) -> Frame {
    let mut response = frame.clone();

    let outcome = match handlers.get(frame.function()) {
        Some(handler) => handler(tables, frame),
        None => Err(ExceptionCode::IllegalFunction),
    };

    match outcome {
        Ok(data) => response.set_data(data),
        Err(code) => response.set_exception(code),
    }

    response
}

fn render_request(frame: &Frame, received_at: DateTime<Utc>) -> String {
    format!(
        "{} device: {} function: {} data: {:02X?}",
        received_at.to_rfc3339(),
        frame.device(),
        name_of(frame.function()),
        frame.data()
    )
}
