use std::fs;
use std::path::{Path, PathBuf};

/// Scratch directory holding test documents and their output files.
pub struct TestContext {
    pub _temp_dir: tempfile::TempDir,
    pub test_root: PathBuf,
}

impl TestContext {
    pub fn new() -> Self {
        let temp_dir = tempfile::Builder::new()
            .prefix("clustertest-test-")
            .tempdir()
            .expect("Failed to create temp dir");
        let test_root = temp_dir.path().to_path_buf();
        Self {
            _temp_dir: temp_dir,
            test_root,
        }
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.test_root.join(name)
    }

    /// Writes a test document and returns its path.
    pub fn write_spec(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.path(name);
        fs::write(&path, contents).expect("Failed to write test document");
        path
    }

    pub fn read(&self, path: &Path) -> String {
        fs::read_to_string(path).expect("Failed to read file")
    }
}

impl Default for TestContext {
    fn default() -> Self {
        Self::new()
    }
}
