// SPDX-License-Identifier: MIT
// Copyright 2025. Triad National Security, LLC.

//! actions.rs
//!
//! Deploying, upgrading, and removing the StorPool charms is planned as a list of `Action`s
//! first and only then carried out (or, in no-operation mode, printed) one by one.

use std::fmt;

use crate::{
    charm::BuildLayout,
    error::CommandError,
    runner::{Executor, Runner},
    topology::{AnnotatedStatus, Role},
};

pub const BLOCK_CHARM: &str = "storpool-block";
pub const CANDLEHOLDER_CHARM: &str = "storpool-candleholder";
pub const CINDER_CHARM: &str = "cinder-storpool";

/// A single step of a deployment plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Tell the user what is about to happen.
    Comment(String),
    /// Deploy a built charm, optionally onto specific machines.
    DeployCharm {
        name: String,
        to: Option<Vec<String>>,
    },
    UpgradeCharm {
        name: String,
    },
    UndeployCharm {
        name: String,
    },
    AddRelation {
        from: String,
        to: String,
    },
}

impl Action {
    pub fn comment(text: impl Into<String>) -> Self {
        Action::Comment(text.into())
    }

    pub fn deploy(name: &str, to: Option<Vec<String>>) -> Self {
        Action::DeployCharm {
            name: name.to_string(),
            to,
        }
    }

    pub fn relation(from: impl Into<String>, to: impl Into<String>) -> Self {
        Action::AddRelation {
            from: from.into(),
            to: to.into(),
        }
    }

    /// The command that carries out this action.
    pub fn command(&self, layout: &BuildLayout) -> Vec<String> {
        let mut cmd: Vec<String> = Vec::new();
        match self {
            Action::Comment(text) => {
                cmd.extend(["printf", "--", "%s"].map(String::from));
                cmd.push(text.clone());
            }
            Action::DeployCharm { name, to } => {
                cmd.extend(["juju", "deploy"].map(String::from));
                if let Some(to) = to {
                    cmd.push("-n".to_string());
                    cmd.push(to.len().to_string());
                    cmd.push("--to".to_string());
                    cmd.push(to.join(","));
                }
                cmd.push("--".to_string());
                cmd.push(layout.deploy_dir(name).display().to_string());
            }
            Action::UpgradeCharm { name } => {
                cmd.extend(["juju", "upgrade-charm", "--path"].map(String::from));
                cmd.push(layout.deploy_dir(name).display().to_string());
                cmd.push("--".to_string());
                cmd.push(name.clone());
            }
            Action::UndeployCharm { name } => {
                cmd.extend(["juju", "remove-application", "--"].map(String::from));
                cmd.push(name.clone());
            }
            Action::AddRelation { from, to } => {
                cmd.extend(["juju", "add-relation", "--"].map(String::from));
                cmd.push(from.clone());
                cmd.push(to.clone());
            }
        }
        cmd
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Comment(text) => write!(f, "comment {text:?}"),
            Action::DeployCharm { name, to: None } => write!(f, "deploy {name}"),
            Action::DeployCharm { name, to: Some(to) } => {
                write!(f, "deploy {name} to {}", to.join(","))
            }
            Action::UpgradeCharm { name } => write!(f, "upgrade {name}"),
            Action::UndeployCharm { name } => write!(f, "remove {name}"),
            Action::AddRelation { from, to } => write!(f, "relate {from} and {to}"),
        }
    }
}

/// Deploy the StorPool charms and relate them to the storage and compute applications.
///
/// The candleholder charm is only deployed when some machines carry storage units but no
/// compute units; otherwise the plan says so instead.
pub fn deploy_plan(status: &AnnotatedStatus, source_dir: &str) -> Vec<Action> {
    let compute = status.chosen_application(Role::Compute);
    let storage = status.chosen_application(Role::Storage);

    let mut actions = vec![
        Action::comment(format!("Deploying the {BLOCK_CHARM} charm")),
        Action::deploy(BLOCK_CHARM, None),
        Action::comment(format!(
            "Linking the {BLOCK_CHARM} charm with the {compute} charm"
        )),
        Action::relation(
            format!("{compute}:juju-info"),
            format!("{BLOCK_CHARM}:juju-info"),
        ),
    ];

    match &status.role_machines().candleholder {
        Some(machines) => actions.extend([
            Action::comment(format!(
                "Deploying the {CANDLEHOLDER_CHARM} charm to {}",
                machines.join(", ")
            )),
            Action::deploy(CANDLEHOLDER_CHARM, Some(machines.clone())),
            Action::comment(format!(
                "Linking the {CANDLEHOLDER_CHARM} charm with the {BLOCK_CHARM} charm"
            )),
            Action::relation(
                format!("{CANDLEHOLDER_CHARM}:juju-info"),
                format!("{BLOCK_CHARM}:juju-info"),
            ),
        ]),
        None => actions.push(Action::comment(format!(
            "Apparently Cinder and Nova are on the same machines; skipping the \
             {CANDLEHOLDER_CHARM} deployment"
        ))),
    }

    actions.extend([
        Action::comment(format!("Deploying the {CINDER_CHARM} charm")),
        Action::deploy(CINDER_CHARM, None),
        Action::comment(format!(
            "Linking the {CINDER_CHARM} charm with the {storage} charm"
        )),
        Action::relation(
            format!("{storage}:storage-backend"),
            format!("{CINDER_CHARM}:storage-backend"),
        ),
        Action::comment(format!(
            "Linking the {CINDER_CHARM} charm with the {BLOCK_CHARM} charm"
        )),
        Action::relation(
            format!("{BLOCK_CHARM}:storpool-presence"),
            format!("{CINDER_CHARM}:storpool-presence"),
        ),
        Action::comment(format!(
            "The StorPool charms were deployed from {source_dir}"
        )),
        Action::comment(""),
    ]);

    actions
}

/// Remove the named applications; Juju drops their relations along with them.
pub fn undeploy_plan(names: &[String]) -> Vec<Action> {
    let mut actions = Vec::new();
    for name in names {
        actions.push(Action::comment(format!(
            "Removing the {name} Juju application"
        )));
        actions.push(Action::UndeployCharm { name: name.clone() });
    }
    actions.push(Action::comment(format!(
        "Removed {} StorPool charms",
        names.len()
    )));
    actions.push(Action::comment(""));
    actions
}

/// Upgrade the named applications from their build directories.
pub fn upgrade_plan(names: &[String]) -> Vec<Action> {
    let mut actions = Vec::new();
    for name in names {
        actions.push(Action::comment(format!(
            "Upgrading the {name} Juju application"
        )));
        actions.push(Action::UpgradeCharm { name: name.clone() });
    }
    actions.push(Action::comment(format!(
        "Upgraded {} StorPool charms",
        names.len()
    )));
    actions.push(Action::comment(""));
    actions
}

/// Carry out a plan in order, stopping at the first failure.
pub fn run_plan<E: Executor>(
    runner: &Runner<E>,
    layout: &BuildLayout,
    actions: &[Action],
) -> Result<(), CommandError> {
    for action in actions {
        log::debug!("running action: {action}");
        runner.run_action(action, layout)?;
    }
    Ok(())
}
