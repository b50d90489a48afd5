//! Stop signal shared by the listener and the visitor sweeper.

use std::future::Future;

use tokio::sync::broadcast;

/// Cloneable handle used to stop ipecho.
///
/// `main` hands one clone to the signal listener and one to
/// [`HttpServer::run`](crate::http::HttpServer::run), which subscribes the
/// sweeper and the graceful-shutdown future before serving. Firing it also
/// lets a server that failed on its own take the sweeper down with it.
#[derive(Clone)]
pub struct Shutdown {
    tx: broadcast::Sender<()>,
}

impl Shutdown {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(1);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.tx.subscribe()
    }

    /// Future that completes once `trigger` is called.
    ///
    /// Subscribes immediately, so a trigger that happens before the future
    /// is first polled is not missed.
    pub fn wait(&self) -> impl Future<Output = ()> + Send + 'static {
        let mut rx = self.subscribe();
        async move {
            let _ = rx.recv().await;
        }
    }

    /// Stop everything subscribed so far. Calling it again is harmless.
    pub fn trigger(&self) {
        let _ = self.tx.send(());
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}
