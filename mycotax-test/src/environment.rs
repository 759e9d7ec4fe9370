//! Test environment management
//!
//! Provides isolated test directories with automatic cleanup using RAII.

use anyhow::{Context, Result};
use flate2::write::GzEncoder;
use flate2::Compression;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Configuration for test environment
#[derive(Debug, Clone, Default)]
pub struct TestConfig {
    /// Keep the directory on disk after the test (for debugging)
    pub preserve: bool,
    /// Custom prefix for test directories
    pub prefix: Option<String>,
}

/// Isolated test environment with automatic cleanup
pub struct TestEnvironment {
    temp_dir: Option<TempDir>,
    root_path: PathBuf,
}

impl TestEnvironment {
    pub fn new() -> Result<Self> {
        Self::with_config(TestConfig::default())
    }

    pub fn with_config(config: TestConfig) -> Result<Self> {
        let prefix = config.prefix.as_deref().unwrap_or("mycotax-test");
        let temp_dir =
            TempDir::with_prefix(prefix).context("Failed to create temporary directory")?;
        let root_path = temp_dir.path().to_path_buf();

        std::fs::create_dir_all(root_path.join("sequences"))?;
        std::fs::create_dir_all(root_path.join("models"))?;

        let temp_dir = if config.preserve {
            // Dropping the handle without cleanup keeps the directory around
            let _ = temp_dir.into_path();
            None
        } else {
            Some(temp_dir)
        };

        Ok(Self {
            temp_dir,
            root_path,
        })
    }

    /// Get the root path of the test environment
    pub fn root(&self) -> &Path {
        &self.root_path
    }

    pub fn sequences_dir(&self) -> PathBuf {
        self.root_path.join("sequences")
    }

    /// Directory for a named model bundle (not created)
    pub fn model_dir(&self, name: &str) -> PathBuf {
        self.root_path.join("models").join(name)
    }

    /// Write `content` to `sequences/<name>` and return the path
    pub fn write_file(&self, name: &str, content: &str) -> Result<PathBuf> {
        let path = self.sequences_dir().join(name);
        std::fs::write(&path, content)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(path)
    }

    /// Same as [`write_file`](Self::write_file) but gzip compressed
    pub fn write_gz_file(&self, name: &str, content: &str) -> Result<PathBuf> {
        let path = self.sequences_dir().join(name);
        let mut encoder = GzEncoder::new(std::fs::File::create(&path)?, Compression::default());
        encoder.write_all(content.as_bytes())?;
        encoder.finish()?;
        Ok(path)
    }

    /// Whether the directory is removed on drop
    pub fn is_temporary(&self) -> bool {
        self.temp_dir.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_environment_cleanup() {
        let root = {
            let env = TestEnvironment::new().unwrap();
            assert!(env.sequences_dir().exists());
            env.root().to_path_buf()
        };
        assert!(!root.exists());
    }

    #[test]
    fn test_write_files() {
        let env = TestEnvironment::new().unwrap();
        let plain = env.write_file("a.fasta", ">a\nACGT\n").unwrap();
        let gz = env.write_gz_file("b.fasta.gz", ">b\nACGT\n").unwrap();
        assert_eq!(std::fs::read_to_string(plain).unwrap(), ">a\nACGT\n");
        assert!(std::fs::metadata(gz).unwrap().len() > 0);
    }
}
