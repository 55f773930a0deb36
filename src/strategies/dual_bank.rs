//! Strategy booting one of two banks, staging upgrades from removable storage into the inactive one.
//!
//! Every boot runs the same sequence:
//!
//! 1. Read the persisted [`BootState`].
//! 2. Stage a staging file, if any, into the inactive bank. Success requests an upgrade.
//! 3. Decide: a pending upgrade request trial-boots the inactive bank once, otherwise the active bank
//!    is booted and an unconfirmed trial is forgotten.
//! 4. Persist the state, only if it changed.
//! 5. Validate and load the chosen image, or hand over to recovery.
//!
//! Promoting a trial-booted bank to `active_slot` is left to the application.

use embedded_storage_async::nor_flash::NorFlash;

use crate::{
    BootState, Config, Error, ImageHeader, ImageValidator, LoadDescriptor, Slot, SlotMap,
    recovery::{RecoveryMode, RecoveryTransport},
    staging::{Stager, Volume},
    state::BootStateStore,
    strategies::Strategy,
    watchdog::Watchdog,
};

/// Logical phases of the boot sequence.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
enum Phase {
    Init,
    StagingCheck,
    DecideSlot,
    PersistIfChanged,
    ValidateAndLoad,
}

/// Outcome of the slot decision.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Decision {
    pub slot: Slot,
    /// `state` was mutated and must be persisted.
    pub changed: bool,
}

/// Decide which bank to boot, updating `state` accordingly.
///
/// A pending upgrade request takes precedence over resynchronizing `booted_slot`.
pub fn decide(state: &mut BootState) -> Decision {
    if state.upgrade_request {
        info!("FIRMWARE UPGRADE: booting inactive slot, clearing upgrade request");
        state.upgrade_request = false;
        state.booted_slot = state.inactive_slot();
        return Decision {
            slot: state.booted_slot,
            changed: true,
        };
    }

    info!("NORMAL BOOT: booting active slot");
    let changed = state.booted_slot != state.active_slot;
    if changed {
        info!(
            "Trial of slot {} was not confirmed, back to slot {}",
            state.booted_slot.id(),
            state.active_slot.id()
        );
        state.booted_slot = state.active_slot;
    }

    Decision {
        slot: state.active_slot,
        changed,
    }
}

const BANNERS: [&str; 2] = [
    "\n   ###  \n  #   # \n #     #\n #     #\n #     #\n  #   # \n   ###  \n",
    "\n   #  \n  ##  \n # #  \n   #  \n   #  \n   #  \n #####\n",
];

/// Dual-bank boot strategy over the board's collaborators.
pub struct DualBank<'a, S, F, V, W, IV, T> {
    /// Boot state partition.
    pub state: &'a mut S,
    /// Flash of bank 0 and bank 1.
    pub banks: &'a mut [F; 2],
    pub slots: SlotMap,
    pub volume: &'a mut V,
    pub watchdog: &'a mut W,
    pub validator: &'a mut IV,
    pub transport: &'a mut T,
    /// Staging block buffer, a multiple of the bank `WRITE_SIZE`.
    pub buffer: &'a mut [u8],
    pub config: Config,
}

impl<'a, S, F, V, W, IV, T> DualBank<'a, S, F, V, W, IV, T>
where
    S: NorFlash,
    F: NorFlash,
    V: Volume,
    W: Watchdog,
    IV: ImageValidator<F>,
    T: RecoveryTransport,
{
    /// Run phases up to and including persisting, returning the slot to boot.
    ///
    /// The state partition is opened and closed exactly once in here.
    async fn select(&mut self) -> Slot {
        trace!("Phase {:?}", Phase::Init);
        let mut store = match BootStateStore::open(&mut *self.state).await {
            Ok(store) => store,
            Err(e) => {
                error!("Failed to open boot state partition: {}", e);
                warn!("Skipping staging, booting the default slot");
                return BootState::INITIAL.active_slot;
            }
        };

        let slot = 'select: {
            let mut state = match store.read().await {
                Ok(state) => state,
                Err(e) => {
                    error!("Failed to read boot state: {}", e);
                    if e == Error::StorageCorrupt && store.erase().await.is_err() {
                        error!("Failed to repair boot state partition");
                    }
                    warn!("Skipping staging, booting the default slot");
                    break 'select BootState::INITIAL.active_slot;
                }
            };
            debug!("Boot state {:?}", state);

            trace!("Phase {:?}", Phase::StagingCheck);
            let inactive = state.inactive_slot();
            let outcome = Stager::new(&mut *self.volume, &mut *self.watchdog, self.config)
                .stage(inactive, &mut self.banks[inactive.index()], &mut *self.buffer)
                .await;
            match outcome.into_result() {
                Ok(_) => {
                    info!("Firmware installed from removable volume");
                    if state.upgrade_request {
                        warn!("Pending upgrade request is overwritten by the staged image");
                    }
                    state.upgrade_request = true;
                }
                Err(Error::NoImagePresent) => {}
                Err(e) => warn!("{}, slot {} is not trialed", e, inactive.id()),
            }

            trace!("Phase {:?}", Phase::DecideSlot);
            let decision = decide(&mut state);

            trace!("Phase {:?}", Phase::PersistIfChanged);
            if decision.changed {
                if let Err(e) = store.write(&state).await {
                    // The old record is still on flash, possibly with the upgrade request set.
                    error!("Failed to persist boot state: {}", e);
                    warn!("Booting active slot {} instead", state.active_slot.id());
                    break 'select state.active_slot;
                }
            }

            decision.slot
        };

        store.close();
        slot
    }

    async fn validate_and_load(&mut self, slot: Slot) -> Result<LoadDescriptor, Error> {
        trace!("Phase {:?}", Phase::ValidateAndLoad);
        let region = self.slots.region(slot);
        let flash = &mut self.banks[slot.index()];

        let header = ImageHeader::read(flash)
            .await
            .inspect_err(|_| error!("No image in slot {}", slot.id()))?;
        info!(
            "Image {}.{}.{}+{} in slot {}",
            header.version.major,
            header.version.minor,
            header.version.revision,
            header.version.build_num,
            slot.id()
        );

        self.validator
            .validate_and_load(slot, &header, flash)
            .await
            .inspect_err(|e| error!("Failed to validate and load slot {}: {}", slot.id(), e))?;

        Ok(LoadDescriptor {
            slot,
            region,
            header,
        })
    }
}

impl<'a, S, F, V, W, IV, T> Strategy for DualBank<'a, S, F, V, W, IV, T>
where
    S: NorFlash,
    F: NorFlash,
    V: Volume,
    W: Watchdog,
    IV: ImageValidator<F>,
    T: RecoveryTransport,
{
    type Transport = &'a mut T;
    type Watchdog = &'a mut W;

    async fn boot(&mut self) -> Result<LoadDescriptor, Error> {
        let slot = self.select().await;

        info!(
            " === Booting from slot {}, flash id {} ===",
            slot.id(),
            self.slots.region(slot).id
        );
        info!("{}", BANNERS[slot.index()]);

        self.validate_and_load(slot).await
    }

    fn into_recovery(self) -> RecoveryMode<&'a mut T, &'a mut W> {
        RecoveryMode::new(self.transport, self.watchdog, self.config.recovery_period_ms)
    }
}
