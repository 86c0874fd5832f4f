//! Helpers writing stub plugins into a temporary directory

use std::path::PathBuf;
use std::time::Duration;

use check_multiple::config::Config;
use tempfile::TempDir;

/// A directory of stub plugins, removed on drop
pub struct Plugins {
    dir: TempDir,
}

impl Plugins {
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().unwrap(),
        }
    }

    /// Write a plugin script dispatching on its last argument
    ///
    /// Each case is `(parameter, shell body)`; unmatched parameters report
    /// UNKNOWN. Returns a base command running the script through `sh`, so
    /// the freshly written file is never executed directly.
    pub fn dispatcher(&self, name: &str, cases: &[(&str, &str)]) -> String {
        let mut script = String::from("#!/bin/sh\nfor last; do :; done\ncase \"$last\" in\n");
        for (parameter, body) in cases {
            script.push_str(&format!("  {parameter}) {body} ;;\n"));
        }
        script.push_str("  *) echo \"UNKNOWN: unexpected parameter $last\"; exit 3 ;;\nesac\n");

        let path = self.path(name);
        std::fs::write(&path, script).unwrap();
        format!("sh {}", path.display())
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }
}

/// Configuration with a short per-check timeout
pub fn config_with_timeout(timeout: Duration) -> Config {
    Config {
        timeout,
        ..Default::default()
    }
}

pub fn params(values: &[&str]) -> Vec<String> {
    values.iter().map(|value| value.to_string()).collect()
}
