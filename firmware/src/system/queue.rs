//! The inter-core frame queue.
//!
//! The acquisition loop on core 1 pushes, the processing loop on core 0
//! pops. The critical-section implementation is the RP2040 hardware
//! spinlock, so the blocking mutex is correct across both cores; every
//! operation under the lock is O(1).

use core::cell::RefCell;
use embassy_sync::blocking_mutex::{raw::CriticalSectionRawMutex, Mutex};
use trigger_core::{FillLevel, FrameQueue, SensorFrame};

/// Queue capacity sized for 1000 Hz operation.
pub const QUEUE_CAPACITY: usize = 32;

static FRAME_QUEUE: Mutex<CriticalSectionRawMutex, RefCell<FrameQueue<QUEUE_CAPACITY>>> =
    Mutex::new(RefCell::new(FrameQueue::new()));

/// Pushes one frame. Returns whether it fit and the fill level after the
/// attempt so the caller can map threshold crossings onto error flags
/// outside the critical section.
pub fn push_frame(frame: SensorFrame) -> (bool, FillLevel) {
    FRAME_QUEUE.lock(|q| {
        let mut q = q.borrow_mut();
        let pushed = q.push(frame);
        (pushed, q.fill_level())
    })
}

/// Pops the oldest frame together with the remaining fill level.
pub fn pop_frame() -> (Option<SensorFrame>, FillLevel) {
    FRAME_QUEUE.lock(|q| {
        let mut q = q.borrow_mut();
        let frame = q.pop();
        (frame, q.fill_level())
    })
}

/// Drops all queued frames (recovery flush, config mode discard).
pub fn clear_frames() {
    FRAME_QUEUE.lock(|q| q.borrow_mut().clear());
}

/// Highest fill count observed since startup.
pub fn high_water() -> usize {
    FRAME_QUEUE.lock(|q| q.borrow().high_water())
}
