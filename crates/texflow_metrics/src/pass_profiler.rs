//! Rolling per-pass timings
//!
//! Measures host-side submission time of each named pass. GPU execution
//! time is not observable here since ticks never wait on the device.

use super::ring_buffer::RingBuffer;
use std::time::Instant;

pub struct PassProfiler {
    window: usize,
    // Few passes per frame; a linear scan beats hashing.
    passes: Vec<(&'static str, RingBuffer<std::time::Duration>)>,
}

impl PassProfiler {
    pub fn new(window: usize) -> Self {
        Self {
            window,
            passes: Vec::new(),
        }
    }

    pub fn time<F, R>(&mut self, pass: &'static str, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        let start = Instant::now();
        let result = f();
        let elapsed = start.elapsed();

        match self.passes.iter_mut().find(|(name, _)| *name == pass) {
            Some((_, samples)) => samples.push(elapsed),
            None => {
                let mut samples = RingBuffer::new(self.window);
                samples.push(elapsed);
                self.passes.push((pass, samples));
            }
        }
        result
    }

    pub fn average_ms(&self, pass: &'static str) -> f64 {
        self.passes
            .iter()
            .find(|(name, _)| *name == pass)
            .map(|(_, samples)| samples.average().as_secs_f64() * 1000.0)
            .unwrap_or(0.0)
    }

    /// Pass names in first-seen order.
    pub fn passes(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.passes.iter().map(|(name, _)| *name)
    }

    pub fn reset(&mut self) {
        self.passes.clear();
    }
}
