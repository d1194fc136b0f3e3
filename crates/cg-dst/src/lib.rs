//! # cg-dst
//!
//! Deterministic simulation of model backends for the bridge-module code
//! generator.
//!
//! Real model calls are slow and non-deterministic. The backends here stand
//! in for them in tests: scripted replies for exact scenarios, seeded fault
//! injection for stress runs of the iteration loop. All behavior is
//! reproducible via a seed.
//!
//! ## Usage
//!
//! ```rust
//! use cg_core::DeterministicRng;
//! use cg_dst::{FaultConfig, FaultInjector, FaultyBackend, Reply, ScriptedBackend};
//!
//! // Fails once, then answers
//! let scripted = ScriptedBackend::new(
//!     "codellama",
//!     [Reply::fail("connection refused"), Reply::text("// A.swift\nclass A {}")],
//! );
//!
//! // Fails, panics and stalls at random, reproducibly
//! let injector = FaultInjector::new(DeterministicRng::new(42), FaultConfig::aggressive());
//! let faulty = FaultyBackend::new("codegemma", "// A.m\n@implementation A @end", injector);
//! ```
//!
//! ## Reproducibility
//!
//! To reproduce a failing stress test:
//! ```bash
//! CG_DST_SEED=12345 cargo test
//! ```

pub mod backend;
pub mod fault;

pub use backend::{FaultyBackend, Reply, ScriptedBackend};
pub use fault::{FaultConfig, FaultDecision, FaultInjector, FaultStats};

/// Get the simulation seed from `CG_DST_SEED` or generate a random one.
///
/// Prints the seed for reproduction.
#[must_use]
pub fn get_or_generate_seed() -> u64 {
    match std::env::var("CG_DST_SEED").ok().and_then(|s| s.parse().ok()) {
        Some(seed) => {
            println!("CG_DST_SEED={} (from environment)", seed);
            seed
        }
        None => {
            let seed = rand::random::<u64>();
            println!("CG_DST_SEED={} (randomly generated)", seed);
            seed
        }
    }
}
