//! Status LED task.
//!
//! Consumer of the status event channel and the in-tree stand-in for the
//! external visualization collaborator. Blink rate encodes the system
//! mode; a trigger edge produces a burst flash. Per-frame readings arrive
//! on the same channel and are consumed without further rendering.

use defmt::info;
use embassy_futures::select::{select, Either};
use embassy_rp::gpio::{Level, Output};
use embassy_time::{Duration, Timer};

use crate::system::event::{self, StatusEvent, SystemMode};
use crate::system::resources::StatusLedResources;

const INIT_BLINK_INTERVAL: Duration = Duration::from_millis(250);
const RUNNING_BLINK_INTERVAL: Duration = Duration::from_millis(1000);
const CONFIG_BLINK_INTERVAL: Duration = Duration::from_millis(100);
const TRIGGER_BURST_INTERVAL: Duration = Duration::from_millis(30);

#[embassy_executor::task]
pub async fn status_led(r: StatusLedResources) {
    let mut led = Output::new(r.led_pin, Level::Low);
    let mut mode = SystemMode::Init;
    let mut led_on = false;

    loop {
        let interval = match mode {
            SystemMode::Init => INIT_BLINK_INTERVAL,
            SystemMode::Running => RUNNING_BLINK_INTERVAL,
            SystemMode::Config => CONFIG_BLINK_INTERVAL,
        };

        match select(Timer::after(interval), event::wait()).await {
            Either::First(_) => {
                led_on = !led_on;
                led.set_level(if led_on { Level::High } else { Level::Low });
            }
            Either::Second(StatusEvent::ModeChanged(new_mode)) => {
                info!("system mode: {}", new_mode);
                mode = new_mode;
            }
            Either::Second(StatusEvent::TriggerEdge) => {
                for _ in 0..6 {
                    led.toggle();
                    Timer::after(TRIGGER_BURST_INTERVAL).await;
                }
                led.set_low();
                led_on = false;
            }
            Either::Second(StatusEvent::Reading { .. }) | Either::Second(StatusEvent::Idle) => {}
        }
    }
}
