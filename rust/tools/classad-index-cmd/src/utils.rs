//! Common utilities for classad-index-cmd

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;

/// Reads a JSON document from `path`, naming the file in every failure.
pub fn load_json<T: DeserializeOwned>(path: &str) -> Result<T> {
    let file = Path::new(path);
    anyhow::ensure!(file.exists(), "Input {path} does not exist");
    anyhow::ensure!(file.is_file(), "Input {path} is not a regular file");
    let text = fs::read_to_string(file).with_context(|| format!("Failed to read {path}"))?;
    serde_json::from_str(&text).with_context(|| format!("Failed to parse {path} as JSON"))
}
