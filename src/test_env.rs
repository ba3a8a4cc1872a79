// SPDX-License-Identifier: MIT
// Copyright 2025. Triad National Security, LLC.

//! Helpers shared by the unit tests and the integration tests under `tests/`.

use std::{
    cell::RefCell,
    collections::HashMap,
    path::{Path, PathBuf},
};

use crate::{
    error::CommandError,
    juju,
    runner::{Executor, Runner},
    status::RawStatus,
    storpool::HostResolver,
    topology::{self, AnnotatedStatus, RoleTable},
    Buffer, LogStream,
};

/// Given a relative `path` in the test directory, prepend the full path to the test
/// directory.
pub fn test_path(path: &str) -> PathBuf {
    PathBuf::from(std::env::var("CARGO_MANIFEST_DIR").unwrap())
        .join("tests")
        .join(path)
}

/// Read a status document from `tests/fixtures/`.
pub fn fixture_bytes(name: &str) -> Vec<u8> {
    let path = test_path(&format!("fixtures/{name}"));
    std::fs::read(&path).unwrap_or_else(|e| panic!("could not read {}: {e}", path.display()))
}

pub fn load_status(name: &str) -> RawStatus {
    juju::decode_status(&fixture_bytes(name)).unwrap()
}

pub fn load_annotated(name: &str) -> AnnotatedStatus {
    topology::classify(load_status(name), &RoleTable::default()).unwrap()
}

type Responder = Box<dyn Fn(&[String]) -> Result<Vec<u8>, CommandError>>;

/// An executor that records the commands it is asked to run and answers queries through a
/// caller-provided function.
pub struct RecordingExecutor {
    calls: RefCell<Vec<(Vec<String>, PathBuf)>>,
    responder: Responder,
}

impl std::fmt::Debug for RecordingExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordingExecutor")
            .field("calls", &self.calls)
            .finish()
    }
}

impl Default for RecordingExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordingExecutor {
    pub fn new() -> Self {
        Self::with_responder(|_| Ok(Vec::new()))
    }

    pub fn with_responder(
        responder: impl Fn(&[String]) -> Result<Vec<u8>, CommandError> + 'static,
    ) -> Self {
        RecordingExecutor {
            calls: RefCell::new(Vec::new()),
            responder: Box::new(responder),
        }
    }

    /// Every command run or queried so far, with the directory it ran in.
    pub fn calls(&self) -> Vec<(Vec<String>, PathBuf)> {
        self.calls.borrow().clone()
    }

    /// Just the commands, without their directories.
    pub fn commands(&self) -> Vec<Vec<String>> {
        self.calls.borrow().iter().map(|(cmd, _)| cmd.clone()).collect()
    }
}

impl Executor for RecordingExecutor {
    fn run(&self, cmd: &[String], cwd: &Path) -> Result<(), CommandError> {
        self.calls
            .borrow_mut()
            .push((cmd.to_vec(), cwd.to_path_buf()));
        (self.responder)(cmd).map(|_| ())
    }

    fn output(&self, cmd: &[String], cwd: &Path) -> Result<Vec<u8>, CommandError> {
        self.calls
            .borrow_mut()
            .push((cmd.to_vec(), cwd.to_path_buf()));
        (self.responder)(cmd)
    }
}

/// A runner around a `RecordingExecutor` that writes its messages into a buffer.
pub fn recording_runner(
    noop: bool,
    cwd: &Path,
    executor: RecordingExecutor,
) -> (Runner<RecordingExecutor>, Buffer) {
    let buf = Buffer::new();
    let runner = Runner::with_executor(
        noop,
        cwd.to_path_buf(),
        LogStream::Buffer(buf.clone()),
        executor,
    );
    (runner, buf)
}

/// Resolves hostnames from a fixed table.
#[derive(Debug, Default)]
pub struct StaticResolver {
    pub names: HashMap<String, String>,
}

impl StaticResolver {
    pub fn new(pairs: &[(&str, &str)]) -> Self {
        StaticResolver {
            names: pairs
                .iter()
                .map(|(host, name)| (host.to_string(), name.to_string()))
                .collect(),
        }
    }
}

impl HostResolver for StaticResolver {
    fn resolve(&self, host: &str) -> Result<String, CommandError> {
        self.names
            .get(host)
            .cloned()
            .ok_or_else(|| CommandError::Failed {
                command: format!("juju ssh {host} hostname"),
                status: "exit status: 1".to_string(),
            })
    }
}
