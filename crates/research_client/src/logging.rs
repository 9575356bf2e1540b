//! Diagnostic log sink.
//!
//! The terminal is owned by the transcript, so logs default to stderr at
//! `warn` and can be redirected to a file for anything chattier.

use std::fs::{File, OpenOptions};
use std::path::Path;
use std::sync::Mutex;

use tracing_subscriber::EnvFilter;

use crate::config::LoggingConfig;
use crate::error::ClientError;

pub fn parse_filter(filter: &str) -> Result<EnvFilter, ClientError> {
    EnvFilter::try_new(filter).map_err(|error| ClientError::LogFilter {
        filter: filter.to_string(),
        message: error.to_string(),
    })
}

pub fn open_log_file(path: &Path) -> Result<File, ClientError> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|source| ClientError::LogFile {
            path: path.to_path_buf(),
            source,
        })
}

/// Installs the global `tracing` subscriber. Call once at startup.
pub fn init_logging(config: &LoggingConfig) -> Result<(), ClientError> {
    let filter = parse_filter(&config.filter)?;
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false);

    let installed = match &config.file {
        Some(path) => {
            let file = open_log_file(path)?;
            builder
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .try_init()
        }
        None => builder.with_writer(std::io::stderr).try_init(),
    };

    installed.map_err(|error| ClientError::LoggingInit(error.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_file_is_created_and_appended() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("client.log");

        open_log_file(&path).expect("first open creates");
        open_log_file(&path).expect("second open appends");
        assert!(path.exists());
    }

    #[test]
    fn log_file_in_missing_directory_reports_path() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("missing").join("client.log");

        let error = open_log_file(&path).expect_err("parent does not exist");
        assert!(matches!(error, ClientError::LogFile { path: ref reported, .. } if reported == &path));
    }

    #[test]
    fn standard_filters_parse() {
        for filter in ["warn", "debug", "steer_research=trace,research_client=info"] {
            parse_filter(filter).expect("filter parses");
        }
    }
}
