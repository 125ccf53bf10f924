//! Auto-stop timer for tap-started recordings.

use std::time::Duration;

use crossbeam_channel::{bounded, RecvTimeoutError, Sender};

/// One-shot timer that runs a callback unless cancelled first.
///
/// Dropping the timer cancels it.
pub(crate) struct AutoStopTimer {
    _cancel: Sender<()>,
}

impl AutoStopTimer {
    pub fn schedule<F>(after: Duration, on_fire: F) -> std::io::Result<Self>
    where
        F: FnOnce() + Send + 'static,
    {
        let (cancel_tx, cancel_rx) = bounded::<()>(1);
        std::thread::Builder::new()
            .name("crabcapture-auto-stop".to_string())
            .spawn(move || {
                if let Err(RecvTimeoutError::Timeout) = cancel_rx.recv_timeout(after) {
                    on_fire();
                }
            })?;
        Ok(Self { _cancel: cancel_tx })
    }

    pub fn cancel(self) {}
}
