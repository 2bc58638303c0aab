//! Frame processing loop on core 0.
//!
//! Drains the shared queue on a 1 ms tick, runs the velocity estimator and
//! the trigger pipeline per frame, drives the active-low pulse line and
//! publishes readings to the status surface. In config mode frames are
//! discarded unprocessed and the output line is released.

use defmt::{debug, info};
use embassy_rp::gpio::{Level, Output};
use embassy_time::{Duration, Ticker};
use trigger_core::time::elapsed_ms;
use trigger_core::{
    ErrorFlags, FillLevel, SensorFrame, TriggerDecision, TriggerPipeline, VelocityEstimator,
};

use crate::system::clock::now_ms;
use crate::system::config_store;
use crate::system::event::{self, StatusEvent};
use crate::system::queue;
use crate::system::resources::TriggerOutResources;
use crate::system::status::STATUS;

/// Frames consumed per tick at most; bounds the per-pass latency.
const MAX_FRAMES_PER_PASS: u32 = 5;

/// Debug readings are logged at most once per this interval.
const DEBUG_REPORT_INTERVAL_MS: u32 = 150;

#[embassy_executor::task]
pub async fn process(r: TriggerOutResources) {
    // Pulse line is active low; idle is high. The external enable line is
    // driven to its enabled level for the lifetime of the system.
    let mut pulse = Output::new(r.pulse_pin, Level::High);
    let _enable = Output::new(r.enable_pin, Level::Low);

    let mut estimator = VelocityEstimator::new();
    let mut pipeline = TriggerPipeline::new();
    let mut ticker = Ticker::every(Duration::from_millis(1));
    let mut last_debug_ms = 0u32;
    let mut was_config_mode = false;

    STATUS.lock().await.processing_ready = true;
    info!("processing loop ready");

    loop {
        ticker.next().await;

        let (config_mode, switch_code) = {
            let s = STATUS.lock().await;
            (s.config_mode_active, s.switch_code)
        };

        if config_mode {
            queue::clear_frames();
            pulse.set_high();
            if !was_config_mode {
                event::try_send(StatusEvent::Idle);
                was_config_mode = true;
            }
            continue;
        }
        was_config_mode = false;

        let config = config_store::snapshot();
        let mut processed = 0u32;
        let mut fill = FillLevel::Normal;
        let mut last: Option<(SensorFrame, f32, TriggerDecision)> = None;

        while processed < MAX_FRAMES_PER_PASS {
            let (frame, level) = queue::pop_frame();
            let Some(frame) = frame else { break };
            fill = level;

            estimator.add_frame(frame);
            let velocity = estimator.calculate();
            let decision = pipeline.evaluate(
                frame.distance_cm,
                velocity,
                switch_code,
                &config,
                now_ms(),
            );

            pulse.set_level(if decision.output { Level::Low } else { Level::High });
            if decision.rising_edge {
                info!(
                    "trigger fired: {} cm at {} cm/s, position {}",
                    frame.distance_cm, velocity, switch_code
                );
                event::send(StatusEvent::TriggerEdge).await;
            }
            event::try_send(StatusEvent::Reading {
                distance_cm: frame.distance_cm,
                velocity,
                strength: frame.strength,
            });

            processed += 1;
            last = Some((frame, velocity, decision));
        }

        if let Some((frame, velocity, decision)) = last {
            {
                let mut s = STATUS.lock().await;
                s.frames_processed += processed;
                s.trigger_output = decision.output;
                s.velocity = velocity;
                s.distance_cm = frame.distance_cm;
                s.strength = frame.strength;
                s.debug_enabled = config.enable_debug;
                s.error_flags
                    .apply(ErrorFlags::VELOCITY_CALC_ERROR, estimator.degraded());
                if fill == FillLevel::Normal {
                    // Drained back under the warning threshold.
                    s.error_flags.clear(ErrorFlags::BUFFER_WARNING);
                    s.error_flags.clear(ErrorFlags::BUFFER_CRITICAL);
                    s.error_flags.clear(ErrorFlags::BUFFER_OVERFLOW);
                }
            }

            if config.enable_debug {
                let now = now_ms();
                if elapsed_ms(last_debug_ms, now) >= DEBUG_REPORT_INTERVAL_MS {
                    debug!(
                        "reading: {} cm, {} cm/s, strength {}, output {}",
                        frame.distance_cm, velocity, frame.strength, decision.output
                    );
                    last_debug_ms = now;
                }
            }
        }
    }
}
