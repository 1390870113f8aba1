//! Runtime configuration of the chipset.

use crate::definitions::{cpu, timer};

/// Behaviour switches for instructions where interpreters disagree.
/// The defaults keep the behaviour of the reference interpreter.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Quirks {
    /// `8XY6` and `8XYE` store the shifted out bit in `VF`.
    pub shift_sets_flag: bool,
    /// The timers keep counting while `FX0A` is waiting for a key.
    pub timers_tick_while_blocked: bool,
}

/// Chipset configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    /// Successful instructions between two timer decrements. `0` is treated as `1`.
    pub cycles_per_timer_tick: u32,
    /// The rate at which the external clock calls for a step.
    pub cpu_hertz: u64,
    pub quirks: Quirks,
    /// Seeds the random number generator used by `CXNN`, the operating
    /// system generator is used without a seed.
    pub rng_seed: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cycles_per_timer_tick: timer::CYCLES_PER_TICK,
            cpu_hertz: cpu::HERTZ,
            quirks: Quirks::default(),
            rng_seed: None,
        }
    }
}

impl Config {
    pub fn with_cycles_per_timer_tick(mut self, cycles: u32) -> Self {
        self.cycles_per_timer_tick = cycles;
        self
    }

    pub fn with_cpu_hertz(mut self, hertz: u64) -> Self {
        self.cpu_hertz = hertz;
        self
    }

    pub fn with_quirks(mut self, quirks: Quirks) -> Self {
        self.quirks = quirks;
        self
    }

    pub fn with_rng_seed(mut self, seed: u64) -> Self {
        self.rng_seed = Some(seed);
        self
    }

    /// The time between two steps of the external clock.
    ///
    /// # Example
    /// ```rust
    /// # use chip::config::Config;
    /// # use std::time::Duration;
    /// let config = Config::default().with_cpu_hertz(500);
    /// assert_eq!(config.interval(), Duration::from_millis(2));
    /// ```
    pub fn interval(&self) -> std::time::Duration {
        std::time::Duration::from_micros(1_000_000 / self.cpu_hertz.max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.cycles_per_timer_tick, 10);
        assert_eq!(config.cpu_hertz, 360);
        assert!(!config.quirks.shift_sets_flag);
        assert!(!config.quirks.timers_tick_while_blocked);
        assert_eq!(config.rng_seed, None);
    }

    #[test]
    fn test_builder() {
        let quirks = Quirks {
            shift_sets_flag: true,
            ..Quirks::default()
        };
        let config = Config::default()
            .with_cycles_per_timer_tick(4)
            .with_quirks(quirks)
            .with_rng_seed(7);
        assert_eq!(config.cycles_per_timer_tick, 4);
        assert_eq!(config.quirks, quirks);
        assert_eq!(config.rng_seed, Some(7));
    }

    #[test]
    fn test_interval_never_divides_by_zero() {
        let config = Config::default().with_cpu_hertz(0);
        assert_eq!(config.interval(), std::time::Duration::from_secs(1));
    }
}
