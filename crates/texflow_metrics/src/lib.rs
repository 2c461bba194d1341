//! Texflow Metrics - frame and pass timing
//!
//! Instrumentation for the frame driver that completely vanishes in
//! production builds via feature flags.
//!
//! # Feature Flags
//!
//! - `metrics` - Enable metrics collection (default: disabled)
//!
//! # Usage
//!
//! ```ignore
//! use texflow_metrics::{FrameTimer, PassProfiler};
//!
//! let mut timer = FrameTimer::new(60); // Track last 60 frames
//! let mut passes = PassProfiler::new(60);
//! timer.begin();
//! passes.time("collision", || { /* submit pass */ });
//! timer.end();
//! println!("FPS: {:.1}", timer.fps());
//! ```
//!
//! Without the `metrics` feature every type below is a zero-sized stub.

#[cfg(feature = "metrics")]
mod frame_timer;
#[cfg(feature = "metrics")]
mod pass_profiler;
#[cfg(feature = "metrics")]
mod ring_buffer;

#[cfg(feature = "metrics")]
pub use frame_timer::FrameTimer;
#[cfg(feature = "metrics")]
pub use pass_profiler::PassProfiler;
#[cfg(feature = "metrics")]
pub use ring_buffer::RingBuffer;

// ============================================================================
// No-op stubs when metrics disabled
// ============================================================================

#[cfg(not(feature = "metrics"))]
pub struct FrameTimer;

#[cfg(not(feature = "metrics"))]
impl FrameTimer {
    pub fn new(_capacity: usize) -> Self { Self }
    pub fn begin(&mut self) {}
    pub fn end(&mut self) {}
    pub fn fps(&self) -> f64 { 0.0 }
    pub fn frame_time_ms(&self) -> f64 { 0.0 }
    pub fn frame_time_range_ms(&self) -> (f64, f64) { (0.0, 0.0) }
    pub fn frame_count(&self) -> u64 { 0 }
}

#[cfg(not(feature = "metrics"))]
pub struct RingBuffer<T>(std::marker::PhantomData<T>);

#[cfg(not(feature = "metrics"))]
impl<T> RingBuffer<T> {
    pub fn new(_capacity: usize) -> Self { Self(std::marker::PhantomData) }
    pub fn push(&mut self, _value: T) {}
    pub fn len(&self) -> usize { 0 }
    pub fn is_empty(&self) -> bool { true }
}

#[cfg(not(feature = "metrics"))]
pub struct PassProfiler;

#[cfg(not(feature = "metrics"))]
impl PassProfiler {
    pub fn new(_window: usize) -> Self { Self }
    pub fn time<F, R>(&mut self, _pass: &'static str, f: F) -> R where F: FnOnce() -> R { f() }
    pub fn average_ms(&self, _pass: &'static str) -> f64 { 0.0 }
    pub fn passes(&self) -> impl Iterator<Item = &'static str> { std::iter::empty() }
    pub fn reset(&mut self) {}
}

#[cfg(test)]
mod tests {
    #[test]
    fn test_compiles_with_or_without_metrics() {
        let mut timer = super::FrameTimer::new(60);
        let mut _buffer = super::RingBuffer::<std::time::Duration>::new(10);
        let mut profiler = super::PassProfiler::new(10);
        timer.begin();
        let value = profiler.time("update", || 7);
        timer.end();
        assert_eq!(value, 7);
    }
}
