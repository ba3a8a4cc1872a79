// SPDX-License-Identifier: MIT
// Copyright 2025. Triad National Security, LLC.

//! Error types for every layer of the tool.
//!
//! The kinds are kept apart so that a caller can tell "the cluster topology is wrong"
//! (`ClassificationError`), "the arguments or addressing are wrong" (`ConfigError`) and "the
//! cluster CLI itself is broken" (`CommandError`) from each other.

use std::path::PathBuf;

use thiserror::Error;

use crate::topology::Role;

#[derive(Debug, Error)]
pub enum ClassificationError {
    #[error("could not find a {role} charm")]
    RoleNotFound { role: Role },

    #[error("more than one {role} charm: {first} and {second}")]
    AmbiguousRole {
        role: Role,
        first: String,
        second: String,
    },

    #[error("machine {machine} used for both storage and compute")]
    ConflictingRoles { machine: String },

    #[error("unit {unit} refers to an unknown machine {machine}")]
    UnknownHost { unit: String, machine: String },

    #[error("duplicate machine or container {id}")]
    DuplicateHost { id: String },

    #[error("container {container} does not look like {parent}/lxd/<n>")]
    InvalidContainerId { parent: String, container: String },

    #[error("no machines found for the compute charm")]
    NoComputeHosts,
}

#[derive(Debug, Error)]
pub enum CommandError {
    #[error("Could not run the {command} command: {source}")]
    Run {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Could not run the {command} command: exited with {status}")]
    Failed { command: String, status: String },

    #[error("Could not decode the output of the {command} command: {message}")]
    Decode { command: String, message: String },

    #[error("Could not change into the {} directory: {source}", .dir.display())]
    Chdir {
        dir: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Could not create the {} directory: {source}", .dir.display())]
    Mkdir {
        dir: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Could not determine the current directory: {0}")]
    CurrentDir(#[source] std::io::Error),

    #[error("Could not write the output: {0}")]
    Output(#[source] std::io::Error),
}

impl CommandError {
    /// Returns the command (or directory operation) that failed.
    pub fn command(&self) -> String {
        match self {
            CommandError::Run { command, .. }
            | CommandError::Failed { command, .. }
            | CommandError::Decode { command, .. } => command.clone(),
            CommandError::Chdir { dir, .. } => format!("chdir {}", dir.display()),
            CommandError::Mkdir { dir, .. } => format!("mkdir {}", dir.display()),
            CommandError::CurrentDir(_) => "getcwd".to_string(),
            CommandError::Output(_) => "write".to_string(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("No StorPool space (-S) specified")]
    MissingSegment,

    #[error("Hostname \"{hostname}\" seen on both machines {first} and {second}")]
    DuplicateHostname {
        hostname: String,
        first: String,
        second: String,
    },

    #[error("Could not find any \"{segment}\" interfaces on {hostname} ({host}, {dns_name})")]
    NoInterfaces {
        segment: String,
        hostname: String,
        host: String,
        dns_name: String,
    },

    #[error("Could not obtain the hostname of machine {host}: {source}")]
    Resolve {
        host: String,
        #[source]
        source: CommandError,
    },

    #[error("machine {host} is not present in the status")]
    UnknownHost { host: String },

    #[error("No repository username:password (-A) specified")]
    MissingRepoAuth,

    #[error("Could not serialize the charm configuration: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("Could not check out the Git repository {name}: {source}")]
    Checkout {
        name: String,
        #[source]
        source: CommandError,
    },

    #[error("Could not update the Git repository {name}: {source}")]
    Pull {
        name: String,
        #[source]
        source: CommandError,
    },
}

#[derive(Debug, Error)]
pub enum BranchesError {
    #[error("Could not read the branches file {}: {source}", .fname.display())]
    Read {
        fname: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Could not parse the branches file {}: {source}", .fname.display())]
    Parse {
        fname: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Could not validate the branches file {}: {message}", .fname.display())]
    Validate { fname: PathBuf, message: String },
}

#[derive(Debug, Error)]
pub enum CharmError {
    #[error("Could not load the layer.yaml file from {name}: {message}")]
    LayerFile { name: String, message: String },

    #[error("Invalid value \"{include}\" in the {name} \"includes\" directive!")]
    InvalidInclude { name: String, include: String },

    #[error("Something named {} exists and it is not a directory!", .path.display())]
    NotADirectory { path: PathBuf },

    #[error("The {} directory does not seem to exist!", .dir.display())]
    MissingTree { dir: PathBuf },

    #[error(transparent)]
    Repo(#[from] RepoError),

    #[error(transparent)]
    Branches(#[from] BranchesError),

    #[error(transparent)]
    Command(#[from] CommandError),
}

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("Could not open config file \"{}\": {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Could not parse config file \"{}\": {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}
