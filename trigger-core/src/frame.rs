//! Sensor frames and the bounded inter-core frame queue.
//!
//! One `SensorFrame` is one validated ranging measurement. Frames are
//! produced by the acquisition loop, queued here, and consumed (copied) by
//! the processing loop; they are only ever overwritten in place inside the
//! queue slots and the velocity history ring, never individually freed.
//!
//! The queue itself carries no lock; the firmware wraps it in a
//! critical-section mutex so both cores see a consistent view. Exactly one
//! producer and one consumer touch it.

/// One validated ranging measurement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SensorFrame {
    /// Measured distance in centimeters.
    pub distance_cm: u16,
    /// Signal quality reported by the sensor.
    pub strength: u16,
    /// Sensor-internal temperature, diagnostic only.
    pub temperature: u16,
    /// Monotonic microsecond counter at receipt, wraparound-safe.
    pub timestamp_us: u32,
    /// Set once checksum and range validation passed.
    pub valid: bool,
}

impl SensorFrame {
    pub const EMPTY: Self = Self {
        distance_cm: 0,
        strength: 0,
        temperature: 0,
        timestamp_us: 0,
        valid: false,
    };
}

/// Queue fill classification relative to the warning/critical thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FillLevel {
    /// Below the warning threshold.
    Normal,
    /// At or above 3/4 of capacity.
    Warning,
    /// At or above 7/8 of capacity.
    Critical,
}

/// Bounded circular buffer of frames, capacity `N` (24 for 800 Hz builds,
/// 32 for 1000 Hz).
///
/// Invariants: `count <= N`; head and tail wrap modulo `N`; pop order is
/// FIFO. Push and pop are O(1) and the caller maps [`FillLevel`]
/// transitions onto the buffer warning/critical error flags outside the
/// critical section.
pub struct FrameQueue<const N: usize> {
    slots: [SensorFrame; N],
    head: usize,
    tail: usize,
    count: usize,
    high_water: usize,
}

impl<const N: usize> FrameQueue<N> {
    /// Warning threshold: 3/4 of capacity.
    pub const WARNING_THRESHOLD: usize = N * 3 / 4;
    /// Critical threshold: 7/8 of capacity.
    pub const CRITICAL_THRESHOLD: usize = N * 7 / 8;

    pub const fn new() -> Self {
        Self {
            slots: [SensorFrame::EMPTY; N],
            head: 0,
            tail: 0,
            count: 0,
            high_water: 0,
        }
    }

    /// Inserts at the head. Returns `false` when full; the caller must
    /// account for the dropped frame.
    pub fn push(&mut self, frame: SensorFrame) -> bool {
        if self.count >= N {
            return false;
        }
        self.slots[self.head] = frame;
        self.head = (self.head + 1) % N;
        self.count += 1;
        if self.count > self.high_water {
            self.high_water = self.count;
        }
        true
    }

    /// Removes the oldest frame, if any.
    pub fn pop(&mut self) -> Option<SensorFrame> {
        if self.count == 0 {
            return None;
        }
        let frame = self.slots[self.tail];
        self.tail = (self.tail + 1) % N;
        self.count -= 1;
        Some(frame)
    }

    /// Drops all queued frames (recovery buffer flush).
    pub fn clear(&mut self) {
        self.head = 0;
        self.tail = 0;
        self.count = 0;
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Highest fill count observed since startup.
    pub fn high_water(&self) -> usize {
        self.high_water
    }

    pub fn fill_level(&self) -> FillLevel {
        if self.count >= Self::CRITICAL_THRESHOLD {
            FillLevel::Critical
        } else if self.count >= Self::WARNING_THRESHOLD {
            FillLevel::Warning
        } else {
            FillLevel::Normal
        }
    }
}

impl<const N: usize> Default for FrameQueue<N> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(distance_cm: u16, timestamp_us: u32) -> SensorFrame {
        SensorFrame {
            distance_cm,
            strength: 1000,
            temperature: 0,
            timestamp_us,
            valid: true,
        }
    }

    #[test]
    fn fifo_order_preserved() {
        let mut q: FrameQueue<8> = FrameQueue::new();
        for i in 0..5u16 {
            assert!(q.push(frame(i, i as u32)));
        }
        for i in 0..5u16 {
            assert_eq!(q.pop().unwrap().distance_cm, i);
        }
        assert!(q.pop().is_none());
    }

    #[test]
    fn count_never_exceeds_capacity() {
        let mut q: FrameQueue<4> = FrameQueue::new();
        for i in 0..10u16 {
            q.push(frame(i, 0));
            assert!(q.len() <= 4);
        }
        assert!(!q.push(frame(99, 0)));
        assert_eq!(q.len(), 4);
        // Oldest four survive, in order.
        assert_eq!(q.pop().unwrap().distance_cm, 0);
        assert_eq!(q.pop().unwrap().distance_cm, 1);
    }

    #[test]
    fn wraps_across_slot_boundary() {
        let mut q: FrameQueue<4> = FrameQueue::new();
        // Interleave pushes and pops so head/tail cross the wrap point.
        for i in 0..20u16 {
            assert!(q.push(frame(i, 0)));
            assert_eq!(q.pop().unwrap().distance_cm, i);
        }
        assert!(q.is_empty());
    }

    #[test]
    fn fill_levels_at_documented_thresholds() {
        let mut q: FrameQueue<32> = FrameQueue::new();
        assert_eq!(FrameQueue::<32>::WARNING_THRESHOLD, 24);
        assert_eq!(FrameQueue::<32>::CRITICAL_THRESHOLD, 28);

        for i in 0..23 {
            q.push(frame(i, 0));
        }
        assert_eq!(q.fill_level(), FillLevel::Normal);
        q.push(frame(0, 0));
        assert_eq!(q.fill_level(), FillLevel::Warning);
        for _ in 0..4 {
            q.push(frame(0, 0));
        }
        assert_eq!(q.fill_level(), FillLevel::Critical);

        // Draining back under the warning threshold reports Normal so the
        // consumer clears both flags.
        while q.len() >= FrameQueue::<32>::WARNING_THRESHOLD {
            q.pop();
        }
        assert_eq!(q.fill_level(), FillLevel::Normal);
    }

    #[test]
    fn thresholds_for_800hz_capacity() {
        assert_eq!(FrameQueue::<24>::WARNING_THRESHOLD, 18);
        assert_eq!(FrameQueue::<24>::CRITICAL_THRESHOLD, 21);
    }

    #[test]
    fn high_water_tracks_peak_fill() {
        let mut q: FrameQueue<8> = FrameQueue::new();
        for i in 0..6u16 {
            q.push(frame(i, 0));
        }
        q.pop();
        q.pop();
        assert_eq!(q.high_water(), 6);
    }

    #[test]
    fn clear_empties_queue() {
        let mut q: FrameQueue<8> = FrameQueue::new();
        for i in 0..5u16 {
            q.push(frame(i, 0));
        }
        q.clear();
        assert!(q.is_empty());
        assert!(q.pop().is_none());
        // Still usable afterwards.
        assert!(q.push(frame(7, 0)));
        assert_eq!(q.pop().unwrap().distance_cm, 7);
    }
}
