// SPDX-License-Identifier: MIT
// Copyright 2025. Triad National Security, LLC.

pub mod actions;
pub mod charm;
pub mod commands;
pub mod config;
pub mod error;
pub mod git;
pub mod juju;
pub mod runner;
pub mod status;
pub mod storpool;
pub mod test_env;
pub mod topology;

use std::{
    fs::File,
    io::{self, Write},
    sync::{Arc, Mutex},
};

/// The charms this tool checks out, builds, and deploys.
pub const CHARM_NAMES: &[&str] = &[
    "charm-cinder-storpool",
    "charm-storpool-block",
    "charm-storpool-candleholder",
];

/// The application name a charm is deployed as: its repository name without "charm-".
pub fn short_name(charm: &str) -> &str {
    charm.strip_prefix("charm-").unwrap_or(charm)
}

pub fn short_names() -> Vec<String> {
    CHARM_NAMES.iter().map(|c| short_name(c).to_string()).collect()
}

pub fn default_config_path() -> String {
    match std::env::var("SPCHARMS_CONFIG") {
        Ok(conf) => conf,
        Err(_) => "/etc/storpool-charms/settings.toml".to_string(),
    }
}

pub fn default_basedir() -> String {
    match std::env::var("SPCHARMS_BASEDIR") {
        Ok(dir) => dir,
        Err(_) => ".".to_string(),
    }
}

pub fn default_baseurl() -> String {
    match std::env::var("SPCHARMS_BASEURL") {
        Ok(url) => url,
        Err(_) => "https://github.com/storpool".to_string(),
    }
}

pub fn default_series() -> String {
    match std::env::var("SPCHARMS_SERIES") {
        Ok(series) => series,
        Err(_) => "xenial".to_string(),
    }
}

/// An in-memory sink that tests can read back what the tool printed.
#[derive(Debug, Clone, Default)]
pub struct Buffer {
    inner: Arc<Mutex<Vec<u8>>>,
}

impl Buffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything written so far, decoded lossily.
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.inner.lock().unwrap()).into_owned()
    }

    pub fn lines(&self) -> Vec<String> {
        self.contents().lines().map(str::to_string).collect()
    }
}

/// Where user-facing progress messages and dry-run renderings go.
#[derive(Debug, Clone)]
pub enum LogStream {
    Stdout,
    File(Arc<File>),
    Buffer(Buffer),
}

impl LogStream {
    pub fn new_stdout() -> Self {
        LogStream::Stdout
    }

    pub fn new_file(file: File) -> Self {
        LogStream::File(Arc::new(file))
    }

    pub fn writeln(&self, data: &[u8]) -> io::Result<()> {
        match self {
            LogStream::Stdout => {
                let mut out = io::stdout().lock();
                out.write_all(data)?;
                out.write_all(b"\n")?;
                out.flush()
            }
            LogStream::File(file) => {
                let mut out: &File = file;
                out.write_all(data)?;
                out.write_all(b"\n")
            }
            LogStream::Buffer(buf) => {
                let mut inner = buf.inner.lock().unwrap();
                inner.extend_from_slice(data);
                inner.push(b'\n');
                Ok(())
            }
        }
    }
}
