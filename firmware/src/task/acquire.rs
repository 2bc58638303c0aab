//! Sensor acquisition loop, pinned to core 1.
//!
//! Owns the sensor UART end to end: bring-up to the 460 800 baud stream,
//! byte framing, validation, timestamping and pushing frames into the
//! shared queue. On communication loss it climbs the recovery ladder;
//! a full reinitialization returns to the bring-up sequence.

use defmt::{debug, info, warn};
use embassy_rp::peripherals::UART0;
use embassy_rp::uart::{BufferedUart, Config as UartConfig};
use embassy_time::{with_timeout, Duration, Timer};
use embedded_io_async::{Read, Write};
use static_cell::StaticCell;
use trigger_core::framing::{
    adaptive_timeout_us, validate_measurement, FeedOutcome, FrameParser,
    DEFAULT_FRAME_TIMEOUT_US, SYNC_FAILURE_LIMIT,
};
use trigger_core::recovery::{RecoveryAction, RecoveryLadder, COMM_TIMEOUT_MS};
use trigger_core::time::elapsed_ms;
use trigger_core::{ErrorFlags, FillLevel, SensorFrame};

use crate::system::clock::{now_ms, now_us};
use crate::system::config_store;
use crate::system::queue;
use crate::system::resources::{Irqs, LidarResources};
use crate::system::status::{self, STATUS};

/// Sensor factory-default baud rate used for the bring-up commands.
const INITIAL_BAUD: u32 = 115_200;
/// Stream baud rate after bring-up.
const STREAM_BAUD: u32 = 460_800;

/// Queue-overflow warnings are rate-limited to one per this interval.
const OVERFLOW_REPORT_INTERVAL_MS: u32 = 2_000;

// TF-series command frames (checksummed by the vendor protocol).
const CMD_SET_BAUD_460800: [u8; 8] = [0x5A, 0x08, 0x06, 0x00, 0x08, 0x07, 0x00, 0x77];
const CMD_SAVE_SETTINGS: [u8; 4] = [0x5A, 0x04, 0x11, 0x6F];
const CMD_STOP_OUTPUT: [u8; 5] = [0x5A, 0x05, 0x07, 0x00, 0x66];
const CMD_SAMPLE_RATE_1000: [u8; 6] = [0x5A, 0x06, 0x03, 0xE8, 0x03, 0x4E];
const CMD_ENABLE_OUTPUT: [u8; 5] = [0x5A, 0x05, 0x07, 0x01, 0x67];

/// Acquisition task: bring-up, then stream until a full reinit is needed.
#[embassy_executor::task]
pub async fn acquire(r: LidarResources) {
    static TX_BUF: StaticCell<[u8; 32]> = StaticCell::new();
    static RX_BUF: StaticCell<[u8; 1024]> = StaticCell::new();

    let mut config = UartConfig::default();
    config.baudrate = INITIAL_BAUD;
    let mut uart = BufferedUart::new(
        r.uart,
        Irqs,
        r.tx_pin,
        r.rx_pin,
        TX_BUF.init([0; 32]).as_mut_slice(),
        RX_BUF.init([0; 1024]).as_mut_slice(),
        config,
    );

    loop {
        info!("sensor bring-up starting");
        match bring_up(&mut uart).await {
            Ok(()) => {
                status::clear_error(ErrorFlags::SENSOR_INIT_FAILED).await;
                STATUS.lock().await.sensor_initialized = true;
                info!("sensor initialized, streaming at {} baud", STREAM_BAUD);
            }
            Err(e) => {
                warn!("sensor bring-up failed: {}", e);
                status::set_error(ErrorFlags::SENSOR_INIT_FAILED).await;
                Timer::after(Duration::from_secs(1)).await;
                continue;
            }
        }

        // Hold the stream until the processing side is ready to drain it.
        while !STATUS.lock().await.processing_ready {
            Timer::after(Duration::from_millis(10)).await;
        }

        run_stream(&mut uart).await;

        // Full reinitialization requested: restart the bring-up sequence.
        STATUS.lock().await.sensor_initialized = false;
    }
}

/// Commands the sensor from its power-on defaults into the high-rate
/// stream: switch to 460 800 baud, persist, reopen, stop output, set the
/// 1000 Hz sample rate, re-enable output, drain stale bytes.
async fn bring_up(
    uart: &mut BufferedUart<'static, UART0>,
) -> Result<(), embassy_rp::uart::Error> {
    uart.set_baudrate(INITIAL_BAUD);
    Timer::after(Duration::from_millis(100)).await;

    uart.write_all(&CMD_SET_BAUD_460800).await?;
    uart.flush().await?;
    Timer::after(Duration::from_millis(100)).await;
    uart.write_all(&CMD_SAVE_SETTINGS).await?;
    uart.flush().await?;
    Timer::after(Duration::from_millis(200)).await;

    uart.set_baudrate(STREAM_BAUD);
    Timer::after(Duration::from_millis(50)).await;

    uart.write_all(&CMD_STOP_OUTPUT).await?;
    uart.flush().await?;
    Timer::after(Duration::from_millis(50)).await;
    uart.write_all(&CMD_SAMPLE_RATE_1000).await?;
    uart.flush().await?;
    Timer::after(Duration::from_millis(50)).await;
    uart.write_all(&CMD_ENABLE_OUTPUT).await?;
    uart.flush().await?;
    Timer::after(Duration::from_millis(50)).await;

    drain(uart).await;
    Ok(())
}

/// Per-second observation window over the stream.
struct StreamWindow {
    started_ms: u32,
    received: u32,
    dropped: u32,
    corrupt: bool,
}

impl StreamWindow {
    fn restart(&mut self, now: u32) {
        self.started_ms = now;
        self.received = 0;
        self.dropped = 0;
        self.corrupt = false;
    }
}

/// Streams frames until the recovery ladder demands a full reinit.
async fn run_stream(uart: &mut BufferedUart<'static, UART0>) {
    let mut parser = FrameParser::new();
    let mut ladder = RecoveryLadder::new();
    let mut timeout_us = DEFAULT_FRAME_TIMEOUT_US;
    let mut last_good_ms = now_ms();
    let mut last_level = FillLevel::Normal;
    let mut last_overflow_report_ms: Option<u32> = None;
    let mut window = StreamWindow {
        started_ms: now_ms(),
        received: 0,
        dropped: 0,
        corrupt: false,
    };
    let mut buf = [0u8; 64];

    loop {
        // The read timeout keeps the watchdog and window bookkeeping
        // running even when the sensor goes quiet.
        match with_timeout(Duration::from_millis(25), uart.read(&mut buf)).await {
            Ok(Ok(n)) => {
                let now = now_us();
                let min_strength = config_store::tuning().min_strength;
                for &byte in &buf[..n] {
                    match parser.feed(byte, now) {
                        FeedOutcome::Pending => {}
                        FeedOutcome::ChecksumMismatch => window.corrupt = true,
                        FeedOutcome::Frame(m) => {
                            if !validate_measurement(&m, min_strength) {
                                window.corrupt = true;
                                continue;
                            }
                            let frame = SensorFrame {
                                distance_cm: m.distance_cm,
                                strength: m.strength,
                                temperature: m.temperature,
                                timestamp_us: now,
                                valid: true,
                            };
                            let (pushed, level) = queue::push_frame(frame);
                            if level != last_level {
                                status::apply_error(
                                    ErrorFlags::BUFFER_WARNING,
                                    !matches!(level, FillLevel::Normal),
                                )
                                .await;
                                status::apply_error(
                                    ErrorFlags::BUFFER_CRITICAL,
                                    matches!(level, FillLevel::Critical),
                                )
                                .await;
                                last_level = level;
                            }
                            if pushed {
                                window.received += 1;
                            } else {
                                window.dropped += 1;
                                let now = now_ms();
                                let due = last_overflow_report_ms
                                    .map_or(true, |t| elapsed_ms(t, now) >= OVERFLOW_REPORT_INTERVAL_MS);
                                if due {
                                    warn!("frame queue full, dropping frames");
                                    status::set_error(ErrorFlags::BUFFER_OVERFLOW).await;
                                    last_overflow_report_ms = Some(now);
                                }
                            }
                            last_good_ms = now_ms();
                            if ladder.record_good_frame() {
                                info!("sensor link recovered");
                                status::clear_error(ErrorFlags::COMM_TIMEOUT).await;
                            }
                        }
                    }
                }
            }
            Ok(Err(e)) => debug!("sensor uart read error: {}", e),
            Err(_) => {} // read timeout, fall through to the watchdog
        }

        if parser.poll_timeout(now_us(), timeout_us) {
            window.corrupt = true;
        }
        if parser.sync_failures >= SYNC_FAILURE_LIMIT {
            warn!("stream desynchronized, {} bytes without sync", parser.sync_failures);
            parser.sync_failures = 0;
        }

        let now = now_ms();
        if elapsed_ms(window.started_ms, now) >= 1_000 {
            let fps = parser.frames_ok;
            timeout_us = adaptive_timeout_us(fps);
            {
                let mut s = STATUS.lock().await;
                s.frames_received += window.received;
                s.dropped_frames += window.dropped;
                s.last_frame_ms = last_good_ms;
                s.error_flags.apply(
                    ErrorFlags::FRAME_CORRUPTION,
                    window.corrupt || parser.frames_bad > 0,
                );
            }
            debug!(
                "stream window: {} fps, {} bad, {} dropped, frame timeout {} us",
                fps, parser.frames_bad, window.dropped, timeout_us
            );
            parser.reset_window_counters();
            window.restart(now);
        }

        // Communication watchdog. A configuration session legitimately
        // silences the stream, so health monitoring is suspended there.
        if status::config_mode_active().await {
            last_good_ms = now;
        } else if elapsed_ms(last_good_ms, now) > COMM_TIMEOUT_MS {
            status::set_error(ErrorFlags::COMM_TIMEOUT).await;
            let delay = config_store::tuning().recovery_delay_ms;
            if let Some(action) = ladder.next_action(now, delay) {
                STATUS.lock().await.recovery_attempts += 1;
                match action {
                    RecoveryAction::FlushBuffers => {
                        warn!("no frames for {} ms, flushing buffers", COMM_TIMEOUT_MS);
                        queue::clear_frames();
                        drain(uart).await;
                        info!("link health check: {}", link_alive(uart).await);
                    }
                    RecoveryAction::SoftReset => {
                        warn!("buffer flush did not help, soft-resetting sensor link");
                        if let Err(e) = soft_reset(uart).await {
                            warn!("soft reset write failed: {}", e);
                        }
                    }
                    RecoveryAction::FullReinit => {
                        warn!("soft reset did not help, full sensor reinitialization");
                        queue::clear_frames();
                        return;
                    }
                }
            }
        }
    }
}

/// Re-applies the stream settings without a full bring-up.
async fn soft_reset(
    uart: &mut BufferedUart<'static, UART0>,
) -> Result<(), embassy_rp::uart::Error> {
    uart.set_baudrate(STREAM_BAUD);
    Timer::after(Duration::from_millis(50)).await;
    uart.write_all(&CMD_STOP_OUTPUT).await?;
    uart.flush().await?;
    Timer::after(Duration::from_millis(50)).await;
    uart.write_all(&CMD_ENABLE_OUTPUT).await?;
    uart.flush().await?;
    Timer::after(Duration::from_millis(50)).await;
    drain(uart).await;
    info!("link health check: {}", link_alive(uart).await);
    Ok(())
}

/// Discards buffered receive bytes until the line goes quiet.
async fn drain(uart: &mut BufferedUart<'static, UART0>) {
    let mut scratch = [0u8; 32];
    while let Ok(Ok(n)) = with_timeout(Duration::from_millis(5), uart.read(&mut scratch)).await {
        if n == 0 {
            break;
        }
    }
}

/// Passive health check: any byte within the window counts as alive.
async fn link_alive(uart: &mut BufferedUart<'static, UART0>) -> bool {
    let mut scratch = [0u8; 16];
    matches!(
        with_timeout(Duration::from_millis(100), uart.read(&mut scratch)).await,
        Ok(Ok(n)) if n > 0
    )
}
