//! Simulation clock
//!
//! Counts driver ticks and integration steps. Only advancing ticks move
//! simulated time forward.

use std::time::Duration;

pub struct SimulationClock {
    timestep: f32,
    tick_count: u64,
    step_count: u64,
}

impl SimulationClock {
    pub fn new(timestep: f32) -> Self {
        Self {
            timestep,
            tick_count: 0,
            step_count: 0,
        }
    }

    pub fn timestep(&self) -> f32 {
        self.timestep
    }

    /// Ticks that ran passes, whether or not they integrated.
    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    /// Ticks that integrated one timestep.
    pub fn step_count(&self) -> u64 {
        self.step_count
    }

    pub fn record_tick(&mut self, advanced: bool) {
        self.tick_count += 1;
        if advanced {
            self.step_count += 1;
        }
    }

    pub fn simulated_time(&self) -> Duration {
        Duration::from_secs_f64(self.step_count as f64 * f64::from(self.timestep))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_steps_advance_time() {
        let mut clock = SimulationClock::new(0.5);
        clock.record_tick(true);
        clock.record_tick(false);
        clock.record_tick(true);
        assert_eq!(clock.tick_count(), 3);
        assert_eq!(clock.step_count(), 2);
        assert_eq!(clock.simulated_time(), Duration::from_secs(1));
    }
}
