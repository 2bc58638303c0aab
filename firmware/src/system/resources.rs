//! Hardware Resource Management
//!
//! Assigns pins and peripherals to the tasks that own them:
//! - LiDAR sensor: UART0 running the high-rate frame stream
//! - Configuration link: UART1 used by the external configuration tool
//! - Position selector: three active-low switch inputs plus a sense line
//! - Trigger output: active-low pulse line and the external enable line
//! - Status LED: on-board LED
//! - Flash: flash peripheral and its DMA channel for the config store

use assign_resources::assign_resources;
use embassy_rp::bind_interrupts;
use embassy_rp::peripherals::{self, UART0, UART1};
use embassy_rp::uart::BufferedInterruptHandler;

assign_resources! {
    /// TF-series LiDAR sensor on UART0
    lidar: LidarResources {
        uart: UART0,
        tx_pin: PIN_0,
        rx_pin: PIN_1,
    },
    /// Configuration tool link on UART1
    config_link: ConfigLinkResources {
        uart: UART1,
        tx_pin: PIN_8,
        rx_pin: PIN_9,
    },
    /// Distance position selector, active low, plus connection sense
    selector: SelectorResources {
        s1_pin: PIN_10,
        s2_pin: PIN_11,
        s4_pin: PIN_12,
        sense_pin: PIN_13,
    },
    /// Trigger pulse output (active low) and external enable line
    trigger_out: TriggerOutResources {
        pulse_pin: PIN_14,
        enable_pin: PIN_15,
    },
    /// On-board status LED
    status_led: StatusLedResources {
        led_pin: PIN_25,
    },
    /// Flash peripheral for the configuration store
    flash: FlashResources {
        flash: FLASH,
        dma: DMA_CH0,
    },
}

bind_interrupts!(pub struct Irqs {
    UART0_IRQ => BufferedInterruptHandler<UART0>;
    UART1_IRQ => BufferedInterruptHandler<UART1>;
});
