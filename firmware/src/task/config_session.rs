//! Configuration session watcher.
//!
//! After the stored configuration is adopted, watches the configuration
//! UART for the startup window. Any byte opens a configuration session:
//! the config-mode flag is set, frame processing idles and health
//! monitoring is suspended until reset. A silent window enters running
//! mode. The wire protocol itself lives in the external tool; this task
//! only keeps the link drained while a session is open.

use defmt::info;
use embassy_rp::uart::{BufferedUart, Config as UartConfig};
use embassy_time::{with_timeout, Duration};
use embedded_io_async::Read;
use static_cell::StaticCell;

use crate::system::config_store;
use crate::system::event::{self, StatusEvent, SystemMode};
use crate::system::resources::{ConfigLinkResources, Irqs};
use crate::system::status::STATUS;
use crate::task::flash_config;

const CONFIG_LINK_BAUD: u32 = 115_200;

#[embassy_executor::task]
pub async fn config_session(r: ConfigLinkResources) {
    static TX_BUF: StaticCell<[u8; 64]> = StaticCell::new();
    static RX_BUF: StaticCell<[u8; 256]> = StaticCell::new();

    let mut config = UartConfig::default();
    config.baudrate = CONFIG_LINK_BAUD;
    let mut uart = BufferedUart::new(
        r.uart,
        Irqs,
        r.tx_pin,
        r.rx_pin,
        TX_BUF.init([0; 64]).as_mut_slice(),
        RX_BUF.init([0; 256]).as_mut_slice(),
        config,
    );

    flash_config::wait_config_ready().await;

    let timeout_ms = config_store::tuning().config_mode_timeout_ms;
    info!("watching configuration link for {} ms", timeout_ms);

    let mut byte = [0u8; 1];
    match with_timeout(Duration::from_millis(timeout_ms as u64), uart.read(&mut byte)).await {
        Ok(Ok(n)) if n > 0 => {
            info!("configuration session opened, frame processing suspended");
            STATUS.lock().await.config_mode_active = true;
            event::send(StatusEvent::ModeChanged(SystemMode::Config)).await;

            // Config mode persists until reset; keep the link drained for
            // the external tool.
            let mut scratch = [0u8; 64];
            loop {
                let _ = uart.read(&mut scratch).await;
            }
        }
        _ => {
            info!("no configuration activity, entering running mode");
            event::send(StatusEvent::ModeChanged(SystemMode::Running)).await;
        }
    }
}
