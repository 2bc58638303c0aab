//! Flash-backed configuration store.
//!
//! Owns all flash access. Loads the persisted trigger configuration at
//! startup and then serves `Load`/`Save`/`FactoryReset` commands from a
//! channel, using the `sequential-storage` map in the last two flash
//! sectors. A stored record must pass both its checksum and range
//! validation before it is adopted; anything else falls back to factory
//! defaults with the config error flag set.

use defmt::{error, info, warn, Format};
use embassy_rp::flash::{Async, Flash, ERASE_SIZE};
use embassy_rp::peripherals::FLASH;
use embassy_sync::{blocking_mutex::raw::CriticalSectionRawMutex, channel::Channel, signal::Signal};
use embassy_time::{Duration, Timer};
use sequential_storage::{
    cache::NoCache,
    map::{fetch_item, store_item, Key, SerializationError, Value},
};
use trigger_core::config::{TriggerConfig, SERIALIZED_LEN};
use trigger_core::ErrorFlags;

use crate::system::{config_store, status};

/// Total flash size of the target board.
pub const FLASH_SIZE: usize = 2048 * 1024;

/// Two sectors for wear leveling, matching the reservation in memory.x.
const STORAGE_SIZE: usize = ERASE_SIZE * 2;
const STORAGE_OFFSET: u32 = FLASH_SIZE as u32 - STORAGE_SIZE as u32;

static FLASH_COMMAND_CHANNEL: Channel<CriticalSectionRawMutex, FlashCommand, 3> = Channel::new();

/// Outcome of the most recent save request.
static SAVE_RESULT_SIGNAL: Signal<CriticalSectionRawMutex, bool> = Signal::new();

/// Raised once the startup load has adopted a configuration.
static CONFIG_READY_SIGNAL: Signal<CriticalSectionRawMutex, ()> = Signal::new();

/// Commands accepted by the flash config task
#[derive(Debug, Clone, Copy, Format, PartialEq, Eq)]
pub enum FlashCommand {
    /// Re-read the stored configuration and adopt it
    Load,
    /// Persist the active configuration
    Save,
    /// Persist factory defaults and reboot
    FactoryReset,
    /// Reboot without touching the stored configuration
    Restart,
}

/// Asks the flash task to persist the active configuration. Await
/// [`wait_save_result`] for the outcome.
pub async fn request_save() {
    FLASH_COMMAND_CHANNEL.send(FlashCommand::Save).await;
}

pub async fn wait_save_result() -> bool {
    SAVE_RESULT_SIGNAL.wait().await
}

/// Asks the flash task to restore factory defaults and reboot.
pub async fn request_factory_reset() {
    FLASH_COMMAND_CHANNEL.send(FlashCommand::FactoryReset).await;
}

/// Asks for a system reboot, leaving the stored configuration alone.
pub async fn request_restart() {
    FLASH_COMMAND_CHANNEL.send(FlashCommand::Restart).await;
}

/// Waits until the startup configuration load has completed.
pub async fn wait_config_ready() {
    CONFIG_READY_SIGNAL.wait().await;
}

/// Storage keys for sequential-storage
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
enum StorageKey {
    TriggerConfig = 0,
}

impl Key for StorageKey {
    fn serialize_into(&self, buffer: &mut [u8]) -> Result<usize, SerializationError> {
        if buffer.is_empty() {
            return Err(SerializationError::BufferTooSmall);
        }
        buffer[0] = *self as u8;
        Ok(1)
    }

    fn deserialize_from(buffer: &[u8]) -> Result<(Self, usize), SerializationError>
    where
        Self: Sized,
    {
        if buffer.is_empty() {
            return Err(SerializationError::BufferTooSmall);
        }
        match buffer[0] {
            0 => Ok((StorageKey::TriggerConfig, 1)),
            _ => Err(SerializationError::InvalidFormat),
        }
    }
}

/// Newtype so the storage traits can be implemented for the core's config.
struct StoredConfig(TriggerConfig);

impl Value<'_> for StoredConfig {
    fn serialize_into(&self, buffer: &mut [u8]) -> Result<usize, SerializationError> {
        if buffer.len() < SERIALIZED_LEN {
            return Err(SerializationError::BufferTooSmall);
        }
        buffer[..SERIALIZED_LEN].copy_from_slice(&self.0.to_bytes());
        Ok(SERIALIZED_LEN)
    }

    fn deserialize_from(buffer: &[u8]) -> Result<Self, SerializationError>
    where
        Self: Sized,
    {
        TriggerConfig::from_bytes(buffer)
            .map(StoredConfig)
            .ok_or(SerializationError::BufferTooSmall)
    }
}

/// Flash configuration task
#[embassy_executor::task]
pub async fn flash_config(mut flash: Flash<'static, FLASH, Async, FLASH_SIZE>) {
    info!("flash config task started");

    let flash_range = STORAGE_OFFSET..(STORAGE_OFFSET + STORAGE_SIZE as u32);
    let mut cache = NoCache::new();
    let mut data_buffer = [0u8; 128];

    load(&mut flash, &flash_range, &mut cache, &mut data_buffer).await;
    CONFIG_READY_SIGNAL.signal(());

    loop {
        match FLASH_COMMAND_CHANNEL.receive().await {
            FlashCommand::Load => {
                load(&mut flash, &flash_range, &mut cache, &mut data_buffer).await;
            }

            FlashCommand::Save => {
                let mut config = config_store::snapshot();
                let ok = match config.validate() {
                    Ok(()) => {
                        config.seal();
                        match store_item(
                            &mut flash,
                            flash_range.clone(),
                            &mut cache,
                            &mut data_buffer,
                            &StorageKey::TriggerConfig,
                            &StoredConfig(config),
                        )
                        .await
                        {
                            Ok(()) => {
                                config_store::adopt(config);
                                status::clear_error(ErrorFlags::CONFIG_ERROR).await;
                                info!("configuration saved");
                                true
                            }
                            Err(e) => {
                                error!("configuration save failed: {}", defmt::Debug2Format(&e));
                                status::set_error(ErrorFlags::CONFIG_ERROR).await;
                                false
                            }
                        }
                    }
                    Err(e) => {
                        warn!("refusing to save invalid configuration: {}", e);
                        false
                    }
                };
                SAVE_RESULT_SIGNAL.signal(ok);
            }

            FlashCommand::FactoryReset => {
                let mut defaults = TriggerConfig::factory_default();
                defaults.seal();
                match store_item(
                    &mut flash,
                    flash_range.clone(),
                    &mut cache,
                    &mut data_buffer,
                    &StorageKey::TriggerConfig,
                    &StoredConfig(defaults),
                )
                .await
                {
                    Ok(()) => {
                        info!("factory defaults stored, rebooting");
                        Timer::after(Duration::from_millis(100)).await;
                        cortex_m::peripheral::SCB::sys_reset();
                    }
                    Err(e) => {
                        error!("factory reset store failed: {}", defmt::Debug2Format(&e));
                        status::set_error(ErrorFlags::CONFIG_ERROR).await;
                    }
                }
            }

            FlashCommand::Restart => {
                info!("restart requested, rebooting");
                Timer::after(Duration::from_millis(100)).await;
                cortex_m::peripheral::SCB::sys_reset();
            }
        }
    }
}

/// Loads the stored configuration and adopts it, or falls back to factory
/// defaults. Only a record passing checksum AND range validation is ever
/// adopted; there is no partial apply.
async fn load(
    flash: &mut Flash<'static, FLASH, Async, FLASH_SIZE>,
    flash_range: &core::ops::Range<u32>,
    cache: &mut NoCache,
    data_buffer: &mut [u8],
) {
    match fetch_item::<StorageKey, StoredConfig, _>(
        flash,
        flash_range.clone(),
        cache,
        data_buffer,
        &StorageKey::TriggerConfig,
    )
    .await
    {
        Ok(Some(StoredConfig(stored))) => {
            if stored.checksum_ok() && stored.validate().is_ok() {
                config_store::adopt(stored);
                status::clear_error(ErrorFlags::CONFIG_ERROR).await;
                info!("stored configuration adopted");
            } else {
                warn!("stored configuration failed validation, using factory defaults");
                config_store::adopt(TriggerConfig::factory_default());
                status::set_error(ErrorFlags::CONFIG_ERROR).await;
            }
        }
        Ok(None) => {
            info!("no stored configuration, using factory defaults");
            config_store::adopt(TriggerConfig::factory_default());
        }
        Err(e) => {
            error!("configuration load failed: {}", defmt::Debug2Format(&e));
            config_store::adopt(TriggerConfig::factory_default());
            status::set_error(ErrorFlags::CONFIG_ERROR).await;
        }
    }
}
