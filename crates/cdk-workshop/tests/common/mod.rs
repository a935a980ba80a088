#![allow(deprecated)]

use assert_cmd::Command;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// An isolated working directory with its own HOME
pub struct TestProject {
    pub root: TempDir,
}

impl TestProject {
    pub fn new() -> Self {
        let root = tempfile::tempdir().unwrap();
        Self { root }
    }

    pub fn write_cdk_json(&self, content: &str) {
        fs::write(self.root.path().join("cdk.json"), content).unwrap();
    }

    pub fn path(&self) -> PathBuf {
        self.root.path().to_path_buf()
    }

    pub fn out_dir(&self) -> PathBuf {
        self.root.path().join("cdk.out")
    }

    /// Command running inside the project with a clean CDK environment
    pub fn command(&self) -> Command {
        let mut cmd = Command::cargo_bin("cdk-workshop").unwrap();
        cmd.current_dir(self.path())
            .env("HOME", self.path())
            .env_remove("CDK_JSON_PATH")
            .env_remove("CDK_DEFAULT_ACCOUNT")
            .env_remove("CDK_DEFAULT_REGION")
            .env_remove("CDK_OUTDIR")
            .env_remove("RUST_LOG")
            .env("NO_COLOR", "1");
        cmd
    }

    #[allow(dead_code)]
    pub fn read_json(&self, path: &Path) -> serde_json::Value {
        let content = fs::read_to_string(path).unwrap();
        serde_json::from_str(&content).unwrap()
    }
}
