//! Deterministic fault injection for simulated model calls.
//!
//! Simulates the ways a model call goes wrong in a reproducible way:
//! - Failures (backend returns an error)
//! - Panics (the iteration unit crashes)
//! - Delays (slow generation)

use cg_core::DeterministicRng;

/// Configuration for fault injection.
#[derive(Debug, Clone)]
pub struct FaultConfig {
    /// Probability that a call returns an error (0.0 to 1.0)
    pub failure_probability: f64,
    /// Probability that a call panics
    pub panic_probability: f64,
    /// Probability of injecting a delay
    pub delay_probability: f64,
    /// Maximum delay in milliseconds
    pub delay_ms_max: u64,
    /// Whether fault injection is enabled
    pub enabled: bool,
}

impl Default for FaultConfig {
    fn default() -> Self {
        Self {
            failure_probability: 0.1,
            panic_probability: 0.05,
            delay_probability: 0.1,
            delay_ms_max: 5,
            enabled: true,
        }
    }
}

impl FaultConfig {
    /// No faults - useful for baseline testing.
    #[must_use]
    pub fn none() -> Self {
        Self {
            failure_probability: 0.0,
            panic_probability: 0.0,
            delay_probability: 0.0,
            delay_ms_max: 0,
            enabled: false,
        }
    }

    /// Aggressive faults for stress testing.
    #[must_use]
    pub fn aggressive() -> Self {
        Self {
            failure_probability: 0.3,
            panic_probability: 0.1,
            delay_probability: 0.2,
            delay_ms_max: 10,
            enabled: true,
        }
    }
}

/// What the injector decided for one call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultDecision {
    /// Proceed normally
    Pass,
    /// Return an error
    Fail,
    /// Panic inside the call
    Panic,
}

/// Deterministic fault injector.
///
/// The same seed produces the same fault sequence.
pub struct FaultInjector {
    rng: DeterministicRng,
    config: FaultConfig,
    stats: FaultStats,
}

impl FaultInjector {
    /// Create a new fault injector with the given RNG and config.
    pub fn new(rng: DeterministicRng, config: FaultConfig) -> Self {
        debug_assert!(
            (0.0..=1.0).contains(&config.failure_probability),
            "Failure probability must be in [0.0, 1.0]"
        );
        debug_assert!(
            (0.0..=1.0).contains(&config.panic_probability),
            "Panic probability must be in [0.0, 1.0]"
        );
        debug_assert!(
            (0.0..=1.0).contains(&config.delay_probability),
            "Delay probability must be in [0.0, 1.0]"
        );

        Self {
            rng,
            config,
            stats: FaultStats::default(),
        }
    }

    /// Decide the fate of the next call.
    ///
    /// Panics take precedence over failures.
    pub fn decide(&mut self) -> FaultDecision {
        if !self.config.enabled {
            return FaultDecision::Pass;
        }

        if self.rng.gen_bool(self.config.panic_probability) {
            self.stats.panics_count += 1;
            return FaultDecision::Panic;
        }
        if self.rng.gen_bool(self.config.failure_probability) {
            self.stats.failures_count += 1;
            return FaultDecision::Fail;
        }
        FaultDecision::Pass
    }

    /// Get delay to inject (if any), in milliseconds.
    pub fn maybe_delay_ms(&mut self) -> Option<u64> {
        if !self.config.enabled || self.config.delay_ms_max == 0 {
            return None;
        }

        if self.rng.gen_bool(self.config.delay_probability) {
            self.stats.delays_count += 1;
            Some(self.rng.gen_range(1..=self.config.delay_ms_max))
        } else {
            None
        }
    }

    /// Get statistics about injected faults.
    #[must_use]
    pub fn stats(&self) -> FaultStats {
        self.stats
    }
}

/// Statistics about injected faults.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FaultStats {
    /// Number of failures injected
    pub failures_count: u64,
    /// Number of panics injected
    pub panics_count: u64,
    /// Number of delays injected
    pub delays_count: u64,
}
