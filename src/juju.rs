// SPDX-License-Identifier: MIT
// Copyright 2025. Triad National Security, LLC.

//! Queries against the Juju controller.

use log::debug;

use crate::{
    error::CommandError,
    runner::{Executor, Runner},
    status::RawStatus,
    storpool::HostResolver,
};

const STATUS_COMMAND: &[&str] = &["juju", "status", "--format=json"];

fn status_command() -> Vec<String> {
    STATUS_COMMAND.iter().map(|s| s.to_string()).collect()
}

/// Decode the output of `juju status --format=json`.
pub fn decode_status(output: &[u8]) -> Result<RawStatus, CommandError> {
    let decode_err = |message: String| CommandError::Decode {
        command: STATUS_COMMAND.join(" "),
        message,
    };

    let text = std::str::from_utf8(output).map_err(|e| decode_err(e.to_string()))?;
    serde_json::from_str(text).map_err(|e| decode_err(e.to_string()))
}

/// Fetch the current status of the model.
pub fn get_status<E: Executor>(runner: &Runner<E>) -> Result<RawStatus, CommandError> {
    let output = runner.output(&status_command())?;
    let status = decode_status(&output)?;
    debug!(
        "juju status: {} applications, {} machines",
        status.applications.len(),
        status.machines.len()
    );
    Ok(status)
}

/// The StorPool charms, by application name, that are already present in the model.
pub fn installed_charms(status: &RawStatus, short_names: &[String]) -> Vec<String> {
    short_names
        .iter()
        .filter(|name| status.applications.contains_key(name.as_str()))
        .cloned()
        .collect()
}

/// Resolves a machine's hostname by asking the machine itself over `juju ssh`.
pub struct JujuSshResolver<'a, E: Executor> {
    runner: &'a Runner<E>,
}

impl<'a, E: Executor> JujuSshResolver<'a, E> {
    pub fn new(runner: &'a Runner<E>) -> Self {
        JujuSshResolver { runner }
    }
}

impl<E: Executor> HostResolver for JujuSshResolver<'_, E> {
    fn resolve(&self, host: &str) -> Result<String, CommandError> {
        let cmd: Vec<String> = ["juju", "ssh", host, "hostname"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let output = self.runner.output(&cmd)?;
        let text = String::from_utf8(output).map_err(|e| CommandError::Decode {
            command: cmd.join(" "),
            message: e.to_string(),
        })?;

        match text.lines().map(str::trim).find(|line| !line.is_empty()) {
            Some(line) => Ok(line.to_string()),
            None => Err(CommandError::Decode {
                command: cmd.join(" "),
                message: "no output".to_string(),
            }),
        }
    }
}
