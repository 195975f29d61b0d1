use std::fmt;
use std::future;
use std::io;
use std::sync::Arc;

use tokio::select;
use tokio::signal;
use tokio::sync::watch;
use tokio::time::{self, Duration};
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownReason {
    Signal(&'static str),
    Deadline(Duration),
}

impl fmt::Display for ShutdownReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShutdownReason::Signal(name) => write!(f, "received {name}"),
            ShutdownReason::Deadline(d) => {
                write!(f, "overall deadline of {} seconds elapsed", d.as_secs())
            }
        }
    }
}

/// Cancellation handle shared by every suspension point of a run.
#[derive(Debug, Clone)]
pub(crate) struct Shutdown {
    tx: Arc<watch::Sender<Option<ShutdownReason>>>,
    rx: watch::Receiver<Option<ShutdownReason>>,
}

impl Shutdown {
    /// A handle that is only tripped through [`Shutdown::request`].
    pub(crate) fn detached() -> Self {
        let (tx, rx) = watch::channel(None);
        Self {
            tx: Arc::new(tx),
            rx,
        }
    }

    /// A handle tripped by SIGINT, SIGTERM or once `deadline` has elapsed.
    pub(crate) fn with_deadline(deadline: Duration) -> Self {
        let shutdown = Self::detached();
        spawn_shutdown_listener(shutdown.clone(), deadline);
        shutdown
    }

    pub(crate) fn requested(&self) -> Option<ShutdownReason> {
        *self.rx.borrow()
    }

    /// Trips the handle. The first reason wins.
    pub(crate) fn request(&self, reason: ShutdownReason) {
        self.tx.send_if_modified(|current| {
            if current.is_none() {
                *current = Some(reason);
                true
            } else {
                false
            }
        });
    }

    /// Sleeps for `duration` unless shutdown is requested first.
    pub(crate) async fn sleep(&mut self, duration: Duration) -> Result<(), ShutdownReason> {
        if let Some(reason) = self.requested() {
            return Err(reason);
        }

        select! {
            _ = time::sleep(duration) => Ok(()),
            Ok(()) = self.rx.changed() => match self.requested() {
                Some(reason) => Err(reason),
                None => Ok(()),
            },
        }
    }
}

fn spawn_shutdown_listener(shutdown: Shutdown, deadline: Duration) {
    tokio::spawn(async move {
        let mut sigterm = signal::unix::signal(signal::unix::SignalKind::terminate()).ok();

        let term_future = async {
            if let Some(ref mut sigterm) = sigterm {
                sigterm.recv().await;
            } else {
                future::pending::<()>().await
            }
        };

        select! {
            _ = park_on_error("SIGINT", signal::ctrl_c()) => {
                info!("Received SIGINT.");
                shutdown.request(ShutdownReason::Signal("SIGINT"));
            }
            _ = term_future => {
                info!("Received SIGTERM.");
                shutdown.request(ShutdownReason::Signal("SIGTERM"));
            }
            _ = time::sleep(deadline) => {
                warn!("Overall deadline of {} seconds elapsed.", deadline.as_secs());
                shutdown.request(ShutdownReason::Deadline(deadline));
            }
        }
    });
}

/// Resolves when `listener` reports the signal. A listener that could not be
/// registered never resolves, so the other shutdown sources stay armed.
async fn park_on_error(name: &str, listener: impl Future<Output = io::Result<()>>) {
    if let Err(e) = listener.await {
        warn!("Failed to listen for {name}: {e}");
        future::pending::<()>().await
    }
}
