//! Boot strategies deciding which image to run, and the driver executing them.

use crate::{
    Error, LoadDescriptor,
    recovery::{RecoveryMode, RecoveryTransport},
    watchdog::Watchdog,
};

pub mod dual_bank;

pub use dual_bank::DualBank;

/// A boot strategy, injected into [`run`].
#[allow(async_fn_in_trait)]
pub trait Strategy {
    type Transport: RecoveryTransport;
    type Watchdog: Watchdog;

    /// Decide which image to boot and get it ready for execution.
    async fn boot(&mut self) -> Result<LoadDescriptor, Error>;

    /// Give up flash access and hand over what recovery needs.
    fn into_recovery(self) -> RecoveryMode<Self::Transport, Self::Watchdog>;
}

/// Run `strategy` once.
///
/// Returns the image to jump to, or enters recovery and never returns.
pub async fn run<S: Strategy>(mut strategy: S) -> LoadDescriptor {
    match strategy.boot().await {
        Ok(descriptor) => descriptor,
        Err(reason) => strategy.into_recovery().enter(reason).await,
    }
}
