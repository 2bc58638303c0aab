//! Distance position selector monitor.
//!
//! Polls the three active-low position switches plus the connection sense
//! line every 10 ms and publishes the 3-bit code into the shared status.
//! With no switch block connected the code is 0 (closest threshold).

use defmt::info;
use embassy_rp::gpio::{Input, Pull};
use embassy_time::{Duration, Ticker};

use crate::system::resources::SelectorResources;
use crate::system::status::STATUS;

#[embassy_executor::task]
pub async fn switch_monitor(r: SelectorResources) {
    let s1 = Input::new(r.s1_pin, Pull::Up);
    let s2 = Input::new(r.s2_pin, Pull::Up);
    let s4 = Input::new(r.s4_pin, Pull::Up);
    let sense = Input::new(r.sense_pin, Pull::Up);

    let mut ticker = Ticker::every(Duration::from_millis(10));
    let mut last_code = 0xFFu8; // force the first publish

    loop {
        ticker.next().await;

        let code = if sense.is_low() {
            (s1.is_low() as u8) | ((s2.is_low() as u8) << 1) | ((s4.is_low() as u8) << 2)
        } else {
            0
        };

        if code != last_code {
            info!("selector position {}", code);
            STATUS.lock().await.switch_code = code;
            last_code = code;
        }
    }
}
