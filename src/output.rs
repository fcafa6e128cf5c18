//! Run output delivery
//!
//! Results go to one of two places: an append-only key/value file when the
//! run is wrapped by CI (the `INKRYPT_OUTPUT` / `GITHUB_OUTPUT` step-output
//! convention), or pretty-printed JSON on stdout for a human at a terminal.
//! File values are wrapped in a heredoc with a fresh random delimiter per
//! value so embedded newlines cannot break the format.

use anyhow::{Context, Result};
use rand::distributions::Alphanumeric;
use rand::Rng;
use serde::Serialize;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;

/// Where this run's outputs land.
#[derive(Debug, Clone)]
pub enum OutputSink {
    /// Append `key<<delim / value / delim` blocks to a step-output file.
    KeyValueFile(PathBuf),
    /// Pretty-print the whole result object as JSON.
    Stdout,
}

impl OutputSink {
    /// Pick the sink from explicit configuration: a file path when one was
    /// provided (from `INKRYPT_OUTPUT`/`GITHUB_OUTPUT`), stdout otherwise.
    pub fn from_path(path: Option<PathBuf>) -> Self {
        match path {
            Some(path) => OutputSink::KeyValueFile(path),
            None => OutputSink::Stdout,
        }
    }

    /// Emit a result object. The object must serialize to a JSON map; each
    /// top-level entry becomes one output field.
    pub fn emit<T: Serialize>(&self, result: &T) -> Result<()> {
        let value = serde_json::to_value(result).context("Failed to serialize result")?;
        let map = value
            .as_object()
            .context("Result must serialize to a JSON object")?;

        match self {
            OutputSink::Stdout => {
                println!("{}", serde_json::to_string_pretty(&value)?);
            }
            OutputSink::KeyValueFile(path) => {
                let mut file = OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(path)
                    .with_context(|| format!("Failed to open output file {}", path.display()))?;
                for (key, val) in map {
                    let rendered = match val {
                        serde_json::Value::String(s) => s.clone(),
                        other => serde_json::to_string(other)?,
                    };
                    write!(file, "{}", heredoc_block(key, &rendered))?;
                }
            }
        }
        Ok(())
    }
}

/// Render one `key<<delim` block. The delimiter is random per value and
/// regenerated if it happens to appear in the value itself.
fn heredoc_block(key: &str, value: &str) -> String {
    let mut delimiter = random_delimiter();
    while value.contains(&delimiter) {
        delimiter = random_delimiter();
    }
    format!("{key}<<{delimiter}\n{value}\n{delimiter}\n")
}

fn random_delimiter() -> String {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(16)
        .map(char::from)
        .collect();
    format!("ink_{suffix}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[derive(Serialize)]
    struct Sample {
        domain: String,
        note: String,
        count: u32,
    }

    #[test]
    fn heredoc_block_contains_value_between_delimiters() {
        let block = heredoc_block("origin", "https://notes.example.com");
        let mut lines = block.lines();
        let first = lines.next().unwrap();
        assert!(first.starts_with("origin<<ink_"));
        assert_eq!(lines.next().unwrap(), "https://notes.example.com");
        let delim = first.split("<<").nth(1).unwrap();
        assert_eq!(block.lines().last().unwrap(), delim);
    }

    #[test]
    fn delimiters_differ_per_value() {
        let a = heredoc_block("k", "v");
        let b = heredoc_block("k", "v");
        assert_ne!(a, b);
    }

    #[test]
    fn multiline_values_survive() {
        let block = heredoc_block("msg", "line one\nline two");
        assert!(block.contains("line one\nline two\n"));
    }

    #[test]
    fn file_sink_appends_all_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.txt");
        let sink = OutputSink::KeyValueFile(path.clone());

        sink.emit(&Sample {
            domain: "notes.example.com".to_string(),
            note: "multi\nline".to_string(),
            count: 3,
        })
        .unwrap();

        let contents = fs::read_to_string(&path).unwrap();
        assert!(contents.contains("domain<<"));
        assert!(contents.contains("notes.example.com\n"));
        assert!(contents.contains("multi\nline\n"));
        assert!(contents.contains("count<<"));
        assert!(contents.contains("\n3\n"));
    }

    #[test]
    fn file_sink_appends_rather_than_truncates() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.txt");
        fs::write(&path, "existing<<d\nv\nd\n").unwrap();

        OutputSink::KeyValueFile(path.clone())
            .emit(&serde_json::json!({"k": "v"}))
            .unwrap();

        let contents = fs::read_to_string(&path).unwrap();
        assert!(contents.starts_with("existing<<d\n"));
        assert!(contents.contains("k<<"));
    }
}
