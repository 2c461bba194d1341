//! Frame timing
//!
//! Tracks two things per frame: the host time spent between `begin` and
//! `end` (pass submission), and the interval between consecutive `begin`
//! calls, which includes presentation waits. FPS comes from the latter.

use super::ring_buffer::RingBuffer;
use std::time::{Duration, Instant};

pub struct FrameTimer {
    frame_start: Option<Instant>,
    work: RingBuffer<Duration>,
    intervals: RingBuffer<Duration>,
    frames: u64,
}

impl FrameTimer {
    pub fn new(capacity: usize) -> Self {
        Self {
            frame_start: None,
            work: RingBuffer::new(capacity),
            intervals: RingBuffer::new(capacity),
            frames: 0,
        }
    }

    pub fn begin(&mut self) {
        let now = Instant::now();
        if let Some(previous) = self.frame_start.replace(now) {
            self.intervals.push(now - previous);
        }
    }

    /// No-op unless `begin` was called first.
    pub fn end(&mut self) {
        if let Some(start) = self.frame_start {
            self.work.push(start.elapsed());
            self.frames += 1;
        }
    }

    pub fn fps(&self) -> f64 {
        let interval = self.intervals.average().as_secs_f64();
        if interval > 0.0 {
            1.0 / interval
        } else {
            0.0
        }
    }

    /// Average submission time per frame.
    pub fn frame_time_ms(&self) -> f64 {
        self.work.average().as_secs_f64() * 1000.0
    }

    pub fn frame_time_range_ms(&self) -> (f64, f64) {
        let (min, max) = self.work.min_max();
        (min.as_secs_f64() * 1000.0, max.as_secs_f64() * 1000.0)
    }

    pub fn frame_count(&self) -> u64 {
        self.frames
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn end_without_begin_is_ignored() {
        let mut timer = FrameTimer::new(4);
        timer.end();
        assert_eq!(timer.frame_count(), 0);
        assert_eq!(timer.fps(), 0.0);
    }

    #[test]
    fn fps_needs_two_frames() {
        let mut timer = FrameTimer::new(4);
        timer.begin();
        timer.end();
        assert_eq!(timer.frame_count(), 1);
        assert_eq!(timer.fps(), 0.0);

        std::thread::sleep(Duration::from_millis(2));
        timer.begin();
        timer.end();
        assert_eq!(timer.frame_count(), 2);
        assert!(timer.fps() > 0.0);
        let (min, max) = timer.frame_time_range_ms();
        assert!(min <= max);
    }
}
