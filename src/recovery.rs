//! Terminal recovery state, entered when no image can be booted.
//!
//! The device exposes its removable volume to a host so an operator can deposit a corrected staging
//! file, then idles until it is power-cycled. Nothing here ever returns.

use crate::{Error, watchdog::Watchdog};

/// Transport making the removable volume available to an external host, typically USB mass storage.
#[allow(async_fn_in_trait)]
pub trait RecoveryTransport {
    type Error;

    /// Expose the volume as writable mass storage.
    async fn expose(&mut self) -> Result<(), Self::Error>;

    /// Sleep for one idle period while the host works with the volume.
    async fn idle(&mut self, period_ms: u32);
}

impl<T: RecoveryTransport + ?Sized> RecoveryTransport for &mut T {
    type Error = T::Error;

    async fn expose(&mut self) -> Result<(), Self::Error> {
        T::expose(self).await
    }

    async fn idle(&mut self, period_ms: u32) {
        T::idle(self, period_ms).await
    }
}

/// Collaborators kept alive in recovery.
///
/// Flash access of the boot sequence has been given up by the time this exists.
pub struct RecoveryMode<T, W> {
    transport: T,
    watchdog: W,
    period_ms: u32,
}

impl<T: RecoveryTransport, W: Watchdog> RecoveryMode<T, W> {
    pub fn new(transport: T, watchdog: W, period_ms: u32) -> Self {
        Self {
            transport,
            watchdog,
            period_ms,
        }
    }

    /// Expose the volume and idle forever, reporting `reason` every period.
    pub async fn enter(mut self, reason: Error) -> ! {
        error!("{}! Entering recovery", reason);

        if self.transport.expose().await.is_err() {
            error!("Failed to expose volume for recovery");
        } else {
            info!("Volume exposed for recovery");
        }

        loop {
            error!("{}! Mass storage enabled for recovery upgrade", reason);
            self.watchdog.feed();
            self.transport.idle(self.period_ms).await;
        }
    }
}
