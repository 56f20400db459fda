use cfg_if::cfg_if;
use tokio_util::sync::CancellationToken;
use tracing::info;

cfg_if! {
    if #[cfg(windows)] {
        use tokio::signal::windows::*;
        use tokio::select;

        async fn raw_shutdown_signal() {
            let mut ctrl_c = ctrl_c().expect("Failed to attach Ctrl_C shutdown signal (windows)");
            let mut ctrl_close = ctrl_close().expect("Failed to attach Ctrl_close shutdown signal (windows)");
            let mut ctrl_shutdown = ctrl_shutdown().expect("Failed to attach Ctrl_shutdown shutdown signal (windows)");
            let mut ctrl_logoff = ctrl_logoff().expect("Failed to attach Ctrl_logoff shutdown signal (windows)");
            select! {
                _ = ctrl_c.recv() => (),
                _ = ctrl_close.recv() => (),
                _ = ctrl_shutdown.recv() => (),
                _ = ctrl_logoff.recv() => (),
            }
        }
    } else if #[cfg(unix)] {
        use tokio::signal::unix::*;
        use tokio::select;

        async fn unix_shutdown_signal(signal_kind: SignalKind) {
            let mut signal = signal(signal_kind).expect("Failed to listen to unix shutdown signal");
            signal.recv().await;
        }

        async fn raw_shutdown_signal() {
            select! {
                _ = unix_shutdown_signal(SignalKind::user_defined2()) => (),
                _ = unix_shutdown_signal(SignalKind::interrupt()) => (),
                _ = unix_shutdown_signal(SignalKind::pipe()) => (),
                _ = unix_shutdown_signal(SignalKind::terminate()) => (),
                _ = unix_shutdown_signal(SignalKind::hangup()) => (),
            };
        }
    } else {
        compile_error!("Your OS does not support shutdown signal ! Are you targeting wasm ?");
    }
}

/// Cooperative shutdown flag shared by every worker in a pool.
///
/// Clones observe the same underlying state: once any clone is triggered,
/// `is_triggered` returns true everywhere and every pending `triggered()`
/// future resolves. Workers check the flag between jobs, so an in-flight
/// job always finishes before its worker exits.
#[derive(Clone, Debug, Default)]
pub struct ShutdownSignal {
    token: CancellationToken,
}

impl ShutdownSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Trips the signal. Idempotent.
    pub fn trigger(&self) {
        self.token.cancel();
    }

    /// Non-blocking check, usable between units of work without polling a future.
    pub fn is_triggered(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Resolves once the signal has been triggered (immediately if it already was).
    pub async fn triggered(&self) {
        self.token.cancelled().await;
    }

    /// Spawns a background task that trips this signal when the process
    /// receives an OS termination signal. Must be called from within a
    /// tokio runtime.
    pub fn listen_os_signals(&self) {
        let signal = self.clone();
        tokio::spawn(async move {
            raw_shutdown_signal().await;
            info!("Shutdown signal detected. Attempting graceful shutdown...");
            signal.trigger();
        });
    }
}
