// SPDX-License-Identifier: MIT
// Copyright 2025. Triad National Security, LLC.

//! runner.rs
//!
//! The one place where this tool touches the outside world: running commands, creating
//! directories, and changing the working directory. In no-operation mode every effect is
//! replaced by a line describing it, and nothing is executed or created.
//!
//! Read-only queries (`juju status`, `juju ssh <machine> hostname`) go through `output()` and
//! run in both modes, since the rest of the plan depends on their answers.

use std::{
    fs::{self, DirBuilder},
    io,
    os::unix::fs::DirBuilderExt,
    path::{Path, PathBuf},
    process::Command,
};

use log::debug;

use crate::{actions::Action, charm::BuildLayout, error::CommandError, LogStream};

/// Process execution, abstracted so that tests can record commands instead of running them.
pub trait Executor {
    /// Run a command to completion, failing if it cannot be started or exits unsuccessfully.
    fn run(&self, cmd: &[String], cwd: &Path) -> Result<(), CommandError>;

    /// Run a command and capture its standard output.
    fn output(&self, cmd: &[String], cwd: &Path) -> Result<Vec<u8>, CommandError>;
}

/// Runs commands on the local system.
#[derive(Debug, Default)]
pub struct SystemExecutor;

fn build_command(cmd: &[String], cwd: &Path) -> Result<Command, CommandError> {
    let Some((program, args)) = cmd.split_first() else {
        return Err(CommandError::Run {
            command: String::new(),
            source: io::Error::new(io::ErrorKind::InvalidInput, "empty command"),
        });
    };
    let mut command = Command::new(program);
    command.args(args).current_dir(cwd);
    Ok(command)
}

impl Executor for SystemExecutor {
    fn run(&self, cmd: &[String], cwd: &Path) -> Result<(), CommandError> {
        let status = build_command(cmd, cwd)?
            .status()
            .map_err(|e| CommandError::Run {
                command: cmd.join(" "),
                source: e,
            })?;

        if !status.success() {
            return Err(CommandError::Failed {
                command: cmd.join(" "),
                status: status.to_string(),
            });
        }
        Ok(())
    }

    fn output(&self, cmd: &[String], cwd: &Path) -> Result<Vec<u8>, CommandError> {
        let output = build_command(cmd, cwd)?
            .output()
            .map_err(|e| CommandError::Run {
                command: cmd.join(" "),
                source: e,
            })?;

        if !output.status.success() {
            debug!(
                "{} failed: {}",
                cmd.join(" "),
                String::from_utf8_lossy(&output.stderr)
            );
            return Err(CommandError::Failed {
                command: cmd.join(" "),
                status: output.status.to_string(),
            });
        }
        Ok(output.stdout)
    }
}

/// Performs (or, in no-operation mode, describes) the tool's side effects.
#[derive(Debug)]
pub struct Runner<E: Executor = SystemExecutor> {
    noop: bool,
    cwd: PathBuf,
    out: LogStream,
    executor: E,
}

impl Runner<SystemExecutor> {
    /// A runner for the local system, starting in the process's working directory and
    /// printing to stdout.
    pub fn new(noop: bool) -> Result<Self, CommandError> {
        let cwd = std::env::current_dir().map_err(CommandError::CurrentDir)?;
        Ok(Runner::with_executor(
            noop,
            cwd,
            LogStream::new_stdout(),
            SystemExecutor,
        ))
    }
}

impl<E: Executor> Runner<E> {
    pub fn with_executor(noop: bool, cwd: PathBuf, out: LogStream, executor: E) -> Self {
        Runner {
            noop,
            cwd,
            out,
            executor,
        }
    }

    pub fn noop(&self) -> bool {
        self.noop
    }

    /// The directory commands run in and relative paths are resolved against.
    pub fn cwd(&self) -> &Path {
        &self.cwd
    }

    pub fn executor(&self) -> &E {
        &self.executor
    }

    /// Print a progress message.
    pub fn msg(&self, text: &str) -> Result<(), CommandError> {
        self.out
            .writeln(text.as_bytes())
            .map_err(CommandError::Output)
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        self.cwd.join(path)
    }

    /// Either perform an effect or, in no-operation mode, print its rendering instead.
    fn perform(
        &self,
        rendering: impl FnOnce() -> String,
        effect: impl FnOnce() -> Result<(), CommandError>,
    ) -> Result<(), CommandError> {
        if self.noop {
            return self.msg(&rendering());
        }
        effect()
    }

    /// Run a command in the current directory.
    pub fn run(&self, cmd: &[String]) -> Result<(), CommandError> {
        debug!("run in {}: {}", self.cwd.display(), cmd.join(" "));
        self.perform(
            || format!("# {}", cmd.join(" ")),
            || self.executor.run(cmd, &self.cwd),
        )
    }

    /// Run the command an action renders to; in no-operation mode, print the command.
    pub fn run_action(&self, action: &Action, layout: &BuildLayout) -> Result<(), CommandError> {
        let cmd = action.command(layout);
        debug!("action: {cmd:?}");
        self.perform(|| cmd.join(" "), || self.executor.run(&cmd, &self.cwd))
    }

    /// Run a read-only command and return its standard output.
    pub fn output(&self, cmd: &[String]) -> Result<Vec<u8>, CommandError> {
        debug!("query in {}: {}", self.cwd.display(), cmd.join(" "));
        self.executor.output(cmd, &self.cwd)
    }

    /// Change into a directory. The new directory must exist unless nothing is being done.
    pub fn chdir(&mut self, dir: &Path) -> Result<(), CommandError> {
        let target = self.resolve(dir);
        self.perform(
            || format!("# chdir -- '{}'", dir.display()),
            || match fs::metadata(&target) {
                Ok(meta) if meta.is_dir() => Ok(()),
                Ok(_) => Err(CommandError::Chdir {
                    dir: target.clone(),
                    source: io::Error::new(io::ErrorKind::Other, "not a directory"),
                }),
                Err(e) => Err(CommandError::Chdir {
                    dir: target.clone(),
                    source: e,
                }),
            },
        )?;
        self.cwd = target;
        Ok(())
    }

    /// Create a single directory.
    pub fn mkdir(&self, dir: &Path) -> Result<(), CommandError> {
        let target = self.resolve(dir);
        self.perform(
            || format!("# mkdir -- '{}'", dir.display()),
            || {
                fs::create_dir(&target).map_err(|e| CommandError::Mkdir {
                    dir: target.clone(),
                    source: e,
                })
            },
        )
    }

    /// Create a directory and any missing parents with the given permissions. Unless
    /// `exist_ok`, the directory itself must not exist yet.
    pub fn makedirs(&self, dir: &Path, mode: u32, exist_ok: bool) -> Result<(), CommandError> {
        let target = self.resolve(dir);
        self.perform(
            || {
                format!(
                    "# makedirs '{}' mode {mode:04o} exist_ok {}",
                    dir.display(),
                    if exist_ok { "True" } else { "False" }
                )
            },
            || {
                if !exist_ok && target.exists() {
                    return Err(CommandError::Mkdir {
                        dir: target.clone(),
                        source: io::Error::new(io::ErrorKind::AlreadyExists, "already exists"),
                    });
                }
                DirBuilder::new()
                    .recursive(true)
                    .mode(mode)
                    .create(&target)
                    .map_err(|e| CommandError::Mkdir {
                        dir: target.clone(),
                        source: e,
                    })
            },
        )
    }
}
