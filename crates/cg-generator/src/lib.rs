//! # cg-generator
//!
//! Streaming code generation loop for React Native bridge modules.
//!
//! Each iteration asks a primary model for a Swift class built from two
//! randomly drawn algorithms, splits the answer into files, annotates them
//! for Objective-C interop and then asks a secondary model for the matching
//! bridge module. Failed or crashed iterations are retried until the
//! requested number has completed.
//!
//! # Usage
//!
//! ```bash
//! # Ten iterations against a local Ollama server
//! cargo run -p cg-generator --bin cg-generate
//!
//! # Fifty iterations into ./ios, reproducible algorithm draws
//! cargo run -p cg-generator --bin cg-generate -- --limit 50 --output ios --seed 42
//! ```
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐     ┌──────────────┐     ┌──────────────┐
//! │  Algorithm   │ ──> │   Prompt     │ ──> │   Primary    │
//! │   Catalog    │     │  Templates   │     │    Model     │
//! └──────────────┘     └──────────────┘     └──────┬───────┘
//!                                                  │ stream
//!                      ┌───────────────────────────┘
//!                      ▼
//!               ┌──────────────┐     ┌──────────────┐
//!               │  Response    │ ──> │    File      │
//!               │  Collector   │     │  Splitter    │
//!               └──────────────┘     └──────┬───────┘
//!                                           │ per file
//!     ┌─────────────────────────────────────┘
//!     ▼
//! ┌──────────────┐     ┌──────────────┐     ┌──────────────┐
//! │  Annotation  │ ──> │    Output    │ ──> │  Secondary   │ ──> split, write
//! │   Injector   │     │    Writer    │     │    Model     │
//! └──────────────┘     └──────────────┘     └──────────────┘
//! ```

pub mod client;
pub mod collector;
pub mod controller;
pub mod writer;

pub use client::{NdjsonDecoder, OllamaClient, OllamaConfig};
pub use collector::{collect, Completion, ConsoleMode, ResponseCollector, StreamState};
pub use controller::{
    run_unit, AttemptRecord, ControllerConfig, Fault, IterationController, IterationError,
    IterationOutcome, IterationPipeline, IterationReport, IterationState, RunSummary,
};
pub use writer::{OutputWriter, WriteError};
