//! Algorithm catalog and random pair sampling.
//!
//! Each iteration asks for a bridge module combining two algorithms drawn
//! from the catalog. The catalog is a JSON array:
//!
//! ```json
//! [
//!   {"name": "Quick Sort", "description": "Divide and conquer sorting"},
//!   {"name": "Dijkstra", "description": "Shortest paths in weighted graphs"}
//! ]
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::config::{read_json, ConfigError};
use crate::random::DeterministicRng;

/// One catalog entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Algorithm {
    pub name: String,
    pub description: String,
}

impl Algorithm {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
        }
    }
}

/// Two algorithms parameterizing one iteration's prompts.
///
/// Drawn with replacement, so both may be the same entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlgorithmPair {
    pub first: Algorithm,
    pub second: Algorithm,
}

/// Non-empty, ordered collection of algorithms loaded once at startup.
#[derive(Debug, Clone)]
pub struct AlgorithmCatalog {
    algorithms: Vec<Algorithm>,
}

impl AlgorithmCatalog {
    /// Create a catalog; `label` identifies the source in errors.
    pub fn new(algorithms: Vec<Algorithm>, label: &str) -> Result<Self, ConfigError> {
        if algorithms.is_empty() {
            return Err(ConfigError::EmptyCatalog(label.to_string()));
        }
        Ok(Self { algorithms })
    }

    /// Load the catalog from a JSON file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let algorithms: Vec<Algorithm> = read_json(path)?;
        Self::new(algorithms, &path.display().to_string())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.algorithms.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.algorithms.is_empty()
    }

    #[must_use]
    pub fn algorithms(&self) -> &[Algorithm] {
        &self.algorithms
    }

    /// Draw two algorithms independently.
    pub fn sample_pair(&self, rng: &mut DeterministicRng) -> AlgorithmPair {
        debug_assert!(!self.algorithms.is_empty(), "Catalog must not be empty");

        let first = rng.gen_range(0..self.algorithms.len());
        let second = rng.gen_range(0..self.algorithms.len());
        AlgorithmPair {
            first: self.algorithms[first].clone(),
            second: self.algorithms[second].clone(),
        }
    }
}
