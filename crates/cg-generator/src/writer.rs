//! Persisting generated files under the output directory.

use std::path::{Component, Path, PathBuf};

use tracing::info;

/// Content of the bridging header seeded at startup.
pub const BRIDGING_HEADER_CONTENT: &str = "// Use this file to import your target's public headers that you would like to expose to Swift.
#import \"React/RCTBridgeModule.h\"";

/// Writes files relative to a fixed root.
///
/// Parent directories are created as needed. Written content is not read
/// back.
#[derive(Debug, Clone)]
pub struct OutputWriter {
    root: PathBuf,
}

impl OutputWriter {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Map a generated file name to a path under the root.
    ///
    /// Absolute names and names with `..` components are rejected.
    pub fn resolve(&self, name: &str) -> Result<PathBuf, WriteError> {
        let relative = Path::new(name);
        let mut has_file_component = false;

        for component in relative.components() {
            match component {
                Component::Normal(_) => has_file_component = true,
                Component::CurDir => {}
                Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                    return Err(WriteError::OutsideRoot(name.to_string()));
                }
            }
        }

        if !has_file_component {
            return Err(WriteError::InvalidName(name.to_string()));
        }
        Ok(self.root.join(relative))
    }

    /// Write `content` to `name` under the root, returning the full path.
    pub async fn write(&self, name: &str, content: &str) -> Result<PathBuf, WriteError> {
        let path = self.resolve(name)?;

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| WriteError::Io {
                    path: parent.to_path_buf(),
                    source,
                })?;
        }
        tokio::fs::write(&path, content)
            .await
            .map_err(|source| WriteError::Io {
                path: path.clone(),
                source,
            })?;

        info!(file = %name, bytes = content.len(), "File written");
        Ok(path)
    }

    /// Create the root and seed `<project>-Bridging-Header.h`.
    ///
    /// An existing header is left untouched. Returns the path when the file
    /// was created.
    pub async fn bootstrap(&self, project: &str) -> Result<Option<PathBuf>, WriteError> {
        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(|source| WriteError::Io {
                path: self.root.clone(),
                source,
            })?;

        let path = self.root.join(format!("{project}-Bridging-Header.h"));
        let exists = tokio::fs::try_exists(&path)
            .await
            .map_err(|source| WriteError::Io {
                path: path.clone(),
                source,
            })?;
        if exists {
            return Ok(None);
        }

        tokio::fs::write(&path, BRIDGING_HEADER_CONTENT)
            .await
            .map_err(|source| WriteError::Io {
                path: path.clone(),
                source,
            })?;
        info!(file = %path.display(), "Bridging header created");
        Ok(Some(path))
    }
}

/// Output errors.
#[derive(Debug, thiserror::Error)]
pub enum WriteError {
    #[error("File name {0:?} points outside the output directory")]
    OutsideRoot(String),

    #[error("Invalid file name {0:?}")]
    InvalidName(String),

    #[error("Failed to write {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve() {
        let writer = OutputWriter::new("/out");

        assert_eq!(
            writer.resolve("ios/Cleaner.swift").unwrap(),
            PathBuf::from("/out/ios/Cleaner.swift")
        );
        assert_eq!(
            writer.resolve("./Cleaner.m").unwrap(),
            PathBuf::from("/out/./Cleaner.m")
        );
        assert!(matches!(
            writer.resolve("../escape.swift"),
            Err(WriteError::OutsideRoot(_))
        ));
        assert!(matches!(
            writer.resolve("/etc/passwd.h"),
            Err(WriteError::OutsideRoot(_))
        ));
        assert!(matches!(writer.resolve("."), Err(WriteError::InvalidName(_))));
    }

    #[tokio::test]
    async fn test_write_creates_directories() {
        let dir = tempfile::tempdir().unwrap();
        let writer = OutputWriter::new(dir.path());

        let path = writer
            .write("Sources/Cleaner/Cleaner.swift", "class Cleaner {}")
            .await
            .unwrap();

        assert!(path.starts_with(dir.path()));
        assert_eq!(std::fs::read_to_string(path).unwrap(), "class Cleaner {}");
    }

    #[tokio::test]
    async fn test_write_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let writer = OutputWriter::new(dir.path());

        writer.write("A.swift", "first").await.unwrap();
        writer.write("A.swift", "second").await.unwrap();

        let content = std::fs::read_to_string(dir.path().join("A.swift")).unwrap();
        assert_eq!(content, "second");
    }

    #[tokio::test]
    async fn test_bootstrap_once() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("output");
        let writer = OutputWriter::new(&root);

        let created = writer.bootstrap("CleanerApp").await.unwrap();
        let header = root.join("CleanerApp-Bridging-Header.h");
        assert_eq!(created, Some(header.clone()));
        assert!(std::fs::read_to_string(&header)
            .unwrap()
            .contains("React/RCTBridgeModule.h"));

        std::fs::write(&header, "// customized").unwrap();
        assert_eq!(writer.bootstrap("CleanerApp").await.unwrap(), None);
        assert_eq!(std::fs::read_to_string(&header).unwrap(), "// customized");
    }
}
