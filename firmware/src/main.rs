//! LiDAR trigger controller firmware entry point
//!
//! Brings up both cores: the acquisition loop runs on its own executor on
//! core 1, everything else on core 0.

#![no_std]
#![no_main]

use defmt::info;
use embassy_executor::{Executor, Spawner};
use embassy_rp::config::Config;
use embassy_rp::flash::Flash;
use embassy_rp::multicore::{spawn_core1, Stack};
use static_cell::StaticCell;
use system::resources::{
    AssignedResources, ConfigLinkResources, FlashResources, LidarResources, SelectorResources,
    StatusLedResources, TriggerOutResources,
};
use {defmt_rtt as _, panic_probe as _};

use crate::task::{
    acquire::acquire,
    config_session::config_session,
    flash_config::{flash_config, FLASH_SIZE},
    process::process,
    status_led::status_led,
    switch_monitor::switch_monitor,
};

/// System core modules
mod system;
/// Task implementations
mod task;

static mut CORE1_STACK: Stack<8192> = Stack::new();
static EXECUTOR1: StaticCell<Executor> = StaticCell::new();

/// Firmware entry point
#[embassy_executor::main]
async fn main(spawner: Spawner) {
    let p = embassy_rp::init(Config::default());
    info!("lidar trigger controller starting");

    let core1 = p.CORE1;
    let r = split_resources!(p);

    // The acquisition loop gets core 1 to itself so the high-rate stream
    // is never starved by processing or ancillary work.
    spawn_core1(
        core1,
        unsafe { &mut *core::ptr::addr_of_mut!(CORE1_STACK) },
        move || {
            let executor1 = EXECUTOR1.init(Executor::new());
            executor1.run(|spawner| spawner.spawn(acquire(r.lidar)).unwrap());
        },
    );

    let flash = Flash::new(r.flash.flash, r.flash.dma);
    spawner.spawn(flash_config(flash)).unwrap();
    spawner.spawn(process(r.trigger_out)).unwrap();
    spawner.spawn(switch_monitor(r.selector)).unwrap();
    spawner.spawn(config_session(r.config_link)).unwrap();
    spawner.spawn(status_led(r.status_led)).unwrap();
}
