use tokio::sync::watch;

/// One-shot close signal broadcast to every transport loop.
///
/// Dropping the signal has the same effect as raising it, so a server that
/// goes out of scope without an explicit close still stops its tasks.
pub(crate) struct ShutdownSignal {
    tx: watch::Sender<bool>,
}

impl ShutdownSignal {
    pub(crate) fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        ShutdownSignal { tx }
    }

    pub(crate) fn subscribe(&self) -> ShutdownListener {
        ShutdownListener {
            rx: self.tx.subscribe(),
        }
    }

    pub(crate) fn signal(&self) {
        let _ = self.tx.send(true);
    }
}

/// Receiving end of the close signal, one per transport loop.
#[derive(Clone)]
pub(crate) struct ShutdownListener {
    rx: watch::Receiver<bool>,
}

impl ShutdownListener {
    /// resolves once the close signal has been raised or the server dropped
    pub(crate) async fn received(&mut self) {
        let _ = self.rx.wait_for(|closed| *closed).await;
    }
}
