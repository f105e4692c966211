//! Test fixtures for process-level tests
//!
//! Provides a fake `xorriso`: a shell script written into a temp directory
//! that prints canned packet output. Every run records its arguments, one
//! per line, in `args` next to the script.

#![cfg(test)]

use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

pub struct FakeXorriso {
    dir: TempDir,
}

impl FakeXorriso {
    /// Create a fake binary running `body` under /bin/sh
    pub fn new(body: &str) -> Self {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let script = format!(
            "#!/bin/sh\nprintf '%s\\n' \"$@\" > \"$(dirname \"$0\")/args\"\n{}",
            body
        );

        let path = dir.path().join("xorriso");
        std::fs::write(&path, script).expect("Failed to write fake xorriso");
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755))
            .expect("Failed to make fake xorriso executable");

        Self { dir }
    }

    pub fn path(&self) -> PathBuf {
        self.dir.path().join("xorriso")
    }

    pub fn dir(&self) -> &Path {
        self.dir.path()
    }

    /// Arguments of the most recent run
    pub fn recorded_args(&self) -> Vec<String> {
        std::fs::read_to_string(self.dir.path().join("args"))
            .unwrap_or_default()
            .lines()
            .map(str::to_string)
            .collect()
    }
}
