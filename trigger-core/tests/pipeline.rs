//! End-to-end pipeline run with synthetic timestamps: raw sensor bytes
//! through the parser, the frame queue, the velocity estimator and the
//! trigger decision pipeline.

use trigger_core::framing::validate_measurement;
use trigger_core::{
    FeedOutcome, FrameParser, FrameQueue, SensorFrame, TriggerConfig, TriggerPipeline,
    VelocityEstimator,
};

/// Builds one well-formed 9-byte sensor frame.
fn frame_bytes(distance_cm: u16, strength: u16, temperature: u16) -> [u8; 9] {
    let d = distance_cm.to_le_bytes();
    let s = strength.to_le_bytes();
    let t = temperature.to_le_bytes();
    let mut buf = [0x59, 0x59, d[0], d[1], s[0], s[1], t[0], t[1], 0];
    let mut sum = 0u8;
    for &b in &buf[..8] {
        sum = sum.wrapping_add(b);
    }
    buf[8] = sum;
    buf
}

#[test]
fn approaching_target_fires_once_through_whole_pipeline() {
    let mut parser = FrameParser::new();
    let mut queue: FrameQueue<32> = FrameQueue::new();
    let mut estimator = VelocityEstimator::new();
    let mut pipeline = TriggerPipeline::new();

    // Factory defaults: switch position 0 gates at 50 cm with the
    // approach-only velocity band [-2200, -250] cm/s enabled.
    let config = TriggerConfig::factory_default();
    assert!(config.use_velocity_trigger);

    // A target approaching at -500 cm/s: frames every 4 ms, 2 cm closer
    // each frame, from 400 cm down to 10 cm.
    let mut engaged_at_ms = None;
    let mut edges = 0;
    let mut output_active = false;

    for k in 0..=195u32 {
        let t_us = k * 4_000;
        let distance = (400 - 2 * k) as u16;

        for &byte in &frame_bytes(distance, 900, 25) {
            if let FeedOutcome::Frame(m) = parser.feed(byte, t_us) {
                assert!(validate_measurement(&m, 200));
                let pushed = queue.push(SensorFrame {
                    distance_cm: m.distance_cm,
                    strength: m.strength,
                    temperature: m.temperature,
                    timestamp_us: t_us,
                    valid: true,
                });
                assert!(pushed, "queue must never fill while drained per frame");
            }
        }

        // Consumer keeps pace with the producer.
        while let Some(frame) = queue.pop() {
            estimator.add_frame(frame);
            let velocity = estimator.calculate();
            let decision =
                pipeline.evaluate(frame.distance_cm, velocity, 0, &config, t_us / 1_000);
            if decision.rising_edge {
                edges += 1;
                engaged_at_ms = Some(t_us / 1_000);
                // At engagement the target is inside both gates.
                assert!(frame.distance_cm <= 50);
                assert!((velocity + 500.0).abs() < 25.0, "velocity = {velocity}");
            }
            output_active = decision.output;
        }
    }

    assert_eq!(parser.frames_ok, 196);
    assert_eq!(edges, 1, "latch must engage exactly once");
    // Distance crosses the 50 cm gate at t = 700 ms; the 30 ms on-delay
    // puts the engagement at the first frame at or after 730 ms.
    assert_eq!(engaged_at_ms, Some(732));
    // The 3 s latch is still holding when the stream ends at 780 ms.
    assert!(output_active);
}

#[test]
fn receding_target_never_fires_with_velocity_gate() {
    let mut estimator = VelocityEstimator::new();
    let mut pipeline = TriggerPipeline::new();
    let config = TriggerConfig::factory_default();

    // Close but moving away at +500 cm/s: distance gate passes, velocity
    // gate (approach-only band) must veto.
    for k in 0..40u32 {
        let frame = SensorFrame {
            distance_cm: (10 + 2 * k) as u16,
            strength: 900,
            temperature: 25,
            timestamp_us: k * 4_000,
            valid: true,
        };
        estimator.add_frame(frame);
        let velocity = estimator.calculate();
        let decision = pipeline.evaluate(frame.distance_cm, velocity, 0, &config, k * 4);
        assert!(!decision.output);
    }
}
