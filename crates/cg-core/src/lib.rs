//! # cg-core
//!
//! Response parsing and prompt configuration for the bridge-module code
//! generator.
//!
//! A model answer is free-form text holding several source files. This crate
//! turns it into named files and prepares them for the React Native bridge:
//!
//! ```text
//! raw response ──> FileSplitter ──> [GeneratedFile] ──> AnnotationInjector
//!                   (markers,                            (@objc, @ReactMethod)
//!                    fences)
//! ```
//!
//! It also owns the inputs of each iteration: the algorithm catalog, seeded
//! pair sampling and the four prompt templates, plus the
//! [`CompletionBackend`] trait every model client implements.

pub mod annotate;
pub mod backend;
pub mod catalog;
pub mod config;
pub mod file;
pub mod random;
pub mod splitter;
pub mod template;

pub use annotate::{AnnotationInjector, AnnotationRules};
pub use backend::{BackendError, ChunkSink, CompletionBackend};
pub use catalog::{Algorithm, AlgorithmCatalog, AlgorithmPair};
pub use config::ConfigError;
pub use file::GeneratedFile;
pub use random::DeterministicRng;
pub use splitter::{
    ensure_named, find_filename_hint, strip_fences, FileSplitter, MarkerSpan, ParseError,
    SplitterConfig,
};
pub use template::{PromptContext, PromptSet, PromptTemplates, TemplateName};
