//! Named source files extracted from model output.

/// A single source file attributed to a name by an in-text marker.
///
/// `name` is a path relative to the output root. An empty `name` means the
/// splitter found no marker at all; such a record must never reach the
/// writer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedFile {
    /// Relative path taken from the marker line
    pub name: String,
    /// Text attributed to that file
    pub source: String,
}

impl GeneratedFile {
    /// Create a named file.
    pub fn new(name: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            source: source.into(),
        }
    }

    /// Create the record returned when no marker line was found.
    pub fn unnamed(source: impl Into<String>) -> Self {
        Self {
            name: String::new(),
            source: source.into(),
        }
    }

    /// Whether this record carries a usable file name.
    #[must_use]
    pub fn is_named(&self) -> bool {
        !self.name.is_empty()
    }
}
