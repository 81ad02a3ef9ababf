//! Process stop signals.
//!
//! Signals are watched on a dedicated thread with its own small runtime.
//! The sampling thread can sit in a blocking serial read, and a watcher on
//! that thread would never be polled; the dedicated thread raises a shared
//! stop flag that the serial reader checks between timed-out reads.

use core::future::pending;
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use log::{debug, error, info};
use tokio::sync::oneshot;

use crate::scheduler::StopReason;

/// A running signal watcher.
pub struct SignalWatcher {
    stop: Arc<AtomicBool>,
    reason: oneshot::Receiver<StopReason>,
}

impl SignalWatcher {
    /// Install the handlers and start watching.
    pub fn spawn() -> io::Result<Self> {
        let stop = Arc::new(AtomicBool::new(false));
        let (tx, rx) = oneshot::channel();
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;

        let flag = Arc::clone(&stop);
        std::thread::Builder::new()
            .name("signals".into())
            .spawn(move || {
                let reason = runtime.block_on(shutdown_signal());
                flag.store(true, Ordering::SeqCst);
                if tx.send(reason).is_err() {
                    debug!("signals: run already finished");
                }
            })?;

        Ok(Self { stop, reason: rx })
    }

    /// Flag raised as soon as a stop signal arrives.
    pub fn stop_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.stop)
    }

    /// Resolve with the first stop signal.
    pub async fn stopped(self) -> StopReason {
        match self.reason.await {
            Ok(reason) => reason,
            Err(_) => {
                error!("signals: watcher thread exited without a signal");
                pending().await
            }
        }
    }
}

/// Resolve on the first Ctrl-C (SIGINT) or SIGTERM.
///
/// A handler that cannot be installed is logged and that signal is never
/// observed; the run itself carries on.
pub async fn shutdown_signal() -> StopReason {
    let interrupt = async {
        match tokio::signal::ctrl_c().await {
            Ok(()) => StopReason::Interrupt,
            Err(e) => {
                error!("signals: cannot listen for Ctrl-C: {}", e);
                pending().await
            }
        }
    };

    let reason = tokio::select! {
        reason = interrupt => reason,
        reason = terminate() => reason,
    };
    info!("signals: {:?} received", reason);
    reason
}

#[cfg(unix)]
async fn terminate() -> StopReason {
    use tokio::signal::unix::{signal, SignalKind};

    match signal(SignalKind::terminate()) {
        Ok(mut stream) => {
            stream.recv().await;
            StopReason::Terminate
        }
        Err(e) => {
            error!("signals: cannot listen for SIGTERM: {}", e);
            pending().await
        }
    }
}

#[cfg(not(unix))]
async fn terminate() -> StopReason {
    pending().await
}
