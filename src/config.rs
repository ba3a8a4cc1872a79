// SPDX-License-Identifier: MIT
// Copyright 2025. Triad National Security, LLC.

use std::{
    collections::HashMap,
    path::{Path, PathBuf},
};

use log::debug;
use serde::{Deserialize, Serialize};

use crate::{
    error::{BranchesError, SettingsError},
    topology::RoleTable,
};

/// The name of the directory the charms tree is created in, under the base directory.
pub const DEFAULT_SUBDIR: &str = "storpool-charms";

/// The branch checked out for repositories not listed in the branches file.
pub const DEFAULT_BRANCH: &str = "master";

/// Settings is the model of the optional TOML settings file. Every field may be left out;
/// command-line options take precedence over whatever is set here.
///
/// ```toml
/// basedir = "/srv/charms"
/// series = "bionic"
/// space = "storpool"
///
/// [roles]
/// storage = ["cinder"]
/// compute = ["nova-compute", "nova-compute-kvm"]
/// ```
#[derive(Serialize, Deserialize, Debug, Default, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    pub basedir: Option<PathBuf>,
    pub subdir: Option<String>,
    pub baseurl: Option<String>,
    pub series: Option<String>,
    pub space: Option<String>,
    pub branches_file: Option<PathBuf>,
    pub roles: Option<RoleTable>,
}

impl Settings {
    /// Load the settings file. An explicitly named file must exist; the default one
    /// (`SPCHARMS_CONFIG` or `/etc/storpool-charms/settings.toml`) is optional.
    pub fn load(path: Option<&str>) -> Result<Self, SettingsError> {
        let (path, required) = match path {
            Some(p) => (PathBuf::from(p), true),
            None => (PathBuf::from(crate::default_config_path()), false),
        };

        if !required && !path.exists() {
            debug!("no settings file at {}, using defaults", path.display());
            return Ok(Settings::default());
        }

        let contents =
            std::fs::read_to_string(&path).map_err(|source| SettingsError::Read {
                path: path.clone(),
                source,
            })?;
        Self::parse(&path, &contents)
    }

    pub fn parse(path: &Path, contents: &str) -> Result<Self, SettingsError> {
        toml::from_str(contents).map_err(|source| SettingsError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// The runtime configuration of a single invocation.
#[derive(Debug, Clone)]
pub struct Config {
    /// The directory to create the charms tree in.
    pub basedir: PathBuf,
    pub subdir: String,
    /// The URL the charm, layer, and interface repositories live under.
    pub baseurl: String,
    /// A YAML file naming the branch to check out for each repository.
    pub branches_file: Option<PathBuf>,
    /// Only display what would be done.
    pub noop: bool,
    /// The series to build the charms for.
    pub series: String,
    /// The network space that carries StorPool traffic.
    pub space: Option<String>,
    /// The `username:password` for the StorPool package repository.
    pub repo_auth: Option<String>,
    pub roles: RoleTable,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            basedir: PathBuf::from(crate::default_basedir()),
            subdir: DEFAULT_SUBDIR.to_string(),
            baseurl: crate::default_baseurl(),
            branches_file: None,
            noop: false,
            series: crate::default_series(),
            space: None,
            repo_auth: None,
            roles: RoleTable::default(),
        }
    }
}

impl Config {
    /// Start from the defaults and apply whatever the settings file specifies.
    pub fn from_settings(settings: Settings) -> Self {
        let defaults = Config::default();
        Config {
            basedir: settings.basedir.unwrap_or(defaults.basedir),
            subdir: settings.subdir.unwrap_or(defaults.subdir),
            baseurl: settings.baseurl.unwrap_or(defaults.baseurl),
            branches_file: settings.branches_file,
            noop: false,
            series: settings.series.unwrap_or(defaults.series),
            space: settings.space,
            repo_auth: None,
            roles: settings.roles.unwrap_or(defaults.roles),
        }
    }

    /// The directory holding the `charms/`, `layers/`, and `interfaces/` trees.
    pub fn tree_dir(&self) -> PathBuf {
        self.basedir.join(&self.subdir)
    }

    /// `<basedir>/<subdir>` as the user would write it, for messages.
    pub fn tree_display(&self) -> String {
        format!("{}/{}", self.basedir.display(), self.subdir)
    }
}

/// Parse a YAML file of the form `branches: {repository: branch, ...}`.
pub fn parse_branches_file(path: &Path) -> Result<HashMap<String, String>, BranchesError> {
    let contents = std::fs::read_to_string(path).map_err(|source| BranchesError::Read {
        fname: path.to_path_buf(),
        source,
    })?;
    parse_branches(path, &contents)
}

fn parse_branches(path: &Path, contents: &str) -> Result<HashMap<String, String>, BranchesError> {
    let validate = |message: &str| BranchesError::Validate {
        fname: path.to_path_buf(),
        message: message.to_string(),
    };

    let data: serde_yaml::Value =
        serde_yaml::from_str(contents).map_err(|source| BranchesError::Parse {
            fname: path.to_path_buf(),
            source,
        })?;
    if !data.is_mapping() {
        return Err(validate("not a dictionary"));
    }
    let Some(listed) = data.get("branches") else {
        return Err(validate("no \"branches\" element"));
    };
    let Some(mapping) = listed.as_mapping() else {
        return Err(validate("\"branches\" not a dictionary"));
    };

    let mut branches = HashMap::new();
    for (name, branch) in mapping.iter() {
        match (name.as_str(), branch.as_str()) {
            (Some(name), Some(branch)) => {
                branches.insert(name.to_string(), branch.to_string());
            }
            _ => return Err(validate("\"branches\" not a string:string dictionary")),
        }
    }

    Ok(branches)
}
