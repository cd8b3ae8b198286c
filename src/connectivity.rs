use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::cancel::CancelToken;
use crate::canvas::{CanvasTransport, RestParams, endpoints};
use crate::error::AppError;

/// Reports whether the remote API is currently reachable.
pub trait Connectivity: Send + Sync {
    fn is_online(&self) -> bool;

    fn observe_online(&self) -> watch::Receiver<bool>;
}

/// Connectivity state fed from outside through `set_online`.
pub struct ConnectivityMonitor {
    tx: watch::Sender<bool>,
}

impl ConnectivityMonitor {
    pub fn new(initially_online: bool) -> Self {
        let (tx, _rx) = watch::channel(initially_online);
        Self { tx }
    }

    pub fn set_online(&self, online: bool) {
        let changed = self.tx.send_if_modified(|current| {
            if *current == online {
                false
            } else {
                *current = online;
                true
            }
        });
        if changed {
            info!("connectivity changed: {}", if online { "online" } else { "offline" });
        }
    }
}

impl Connectivity for ConnectivityMonitor {
    fn is_online(&self) -> bool {
        *self.tx.borrow()
    }

    fn observe_online(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }
}

/// A server that answers at all, even with an auth or not-found error, is reachable.
pub async fn check_reachable(transport: &dyn CanvasTransport) -> bool {
    match transport.get(endpoints::CURRENT_USER, &RestParams::new(true)).await {
        Ok(_) | Err(AppError::Auth(_)) | Err(AppError::NotFound) => true,
        Err(e) => {
            debug!("connectivity check failed: {}", e);
            false
        }
    }
}

/// Checks the API every `interval` and publishes the result until cancelled.
pub fn spawn_checker(
    monitor: Arc<ConnectivityMonitor>,
    transport: Arc<dyn CanvasTransport>,
    interval: Duration,
    cancel: CancelToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!("starting connectivity check (interval: {:?})", interval);
        loop {
            monitor.set_online(check_reachable(&*transport).await);

            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(interval) => {}
            }
        }
        info!("connectivity check stopped");
    })
}
