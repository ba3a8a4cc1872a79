// SPDX-License-Identifier: MIT
// Copyright 2025. Triad National Security, LLC.

//! topology.rs
//!
//! Classify a raw Juju status: decide which application plays the storage role and which
//! plays the compute role, tag every machine and container with the role of the units it
//! carries, and partition the bare-metal machines into the compute group and the
//! "candleholder" group (machines that carry storage units but no compute units).
//!
//! The raw status is never modified; everything derived from it lives in the
//! `AnnotatedStatus` alongside it.

use std::{
    collections::{btree_map::Entry, BTreeMap, BTreeSet},
    fmt,
};

use log::debug;
use serde::{Deserialize, Serialize};

use crate::{
    error::ClassificationError,
    status::{self, Machine, RawStatus},
};

/// The two roles the StorPool charms care about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Storage,
    Compute,
}

impl Role {
    pub const ALL: [Role; 2] = [Role::Storage, Role::Compute];
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}",
            match self {
                Role::Storage => "storage",
                Role::Compute => "compute",
            }
        )
    }
}

/// The charm kinds that are recognized as backing each role.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct RoleTable {
    pub storage: Vec<String>,
    pub compute: Vec<String>,
}

pub const STORAGE_CHARMS: &[&str] = &["cinder"];

pub const COMPUTE_CHARMS: &[&str] = &["nova-compute", "nova-compute-kvm"];

impl Default for RoleTable {
    fn default() -> Self {
        RoleTable {
            storage: STORAGE_CHARMS.iter().map(|s| s.to_string()).collect(),
            compute: COMPUTE_CHARMS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl RoleTable {
    /// Get the role an application with the given charm kind plays, if any.
    pub fn role_of(&self, charm_kind: &str) -> Option<Role> {
        if self.storage.iter().any(|k| k == charm_kind) {
            Some(Role::Storage)
        } else if self.compute.iter().any(|k| k == charm_kind) {
            Some(Role::Compute)
        } else {
            None
        }
    }
}

/// Whether an id in the status refers to a machine or to a container inside one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostKind {
    Machine,
    Container { parent: String },
}

/// The final partition of the bare-metal machines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleMachines {
    /// Machines running the compute charm; never empty.
    pub compute: Vec<String>,
    /// Machines carrying storage units but no compute units; `None` rather than empty.
    pub candleholder: Option<Vec<String>>,
}

impl RoleMachines {
    /// All the machines in either group, deduplicated and sorted by their id string.
    pub fn all_hosts(&self) -> Vec<String> {
        let mut hosts: BTreeSet<&String> = self.compute.iter().collect();
        if let Some(candleholder) = &self.candleholder {
            hosts.extend(candleholder.iter());
        }
        hosts.into_iter().cloned().collect()
    }
}

/// A raw status together with the role assignments derived from it.
#[derive(Debug, Clone)]
pub struct AnnotatedStatus {
    raw: RawStatus,
    host_index: BTreeMap<String, HostKind>,
    applications_by_role: BTreeMap<Role, BTreeSet<String>>,
    host_roles: BTreeMap<String, Role>,
    tagged_hosts: BTreeMap<Role, BTreeSet<String>>,
    chosen_application: BTreeMap<Role, String>,
    hosts_by_role: BTreeMap<Role, BTreeSet<String>>,
    role_machines: RoleMachines,
}

impl AnnotatedStatus {
    pub fn raw(&self) -> &RawStatus {
        &self.raw
    }

    pub fn host_kind(&self, id: &str) -> Option<&HostKind> {
        self.host_index.get(id)
    }

    /// The bare-metal machine behind a machine or container id.
    pub fn bare_metal<'a>(&'a self, id: &'a str) -> Option<&'a str> {
        match self.host_index.get(id)? {
            HostKind::Machine => Some(id),
            HostKind::Container { parent } => Some(parent),
        }
    }

    pub fn machine(&self, id: &str) -> Option<&Machine> {
        self.raw.machines.get(id)
    }

    /// Every application whose charm kind belongs to `role`, with or without units.
    pub fn applications_by_role(&self, role: Role) -> impl Iterator<Item = &str> {
        self.applications_by_role
            .get(&role)
            .into_iter()
            .flatten()
            .map(String::as_str)
    }

    /// The role tag of a machine or container, if it carries any role-bearing units.
    pub fn host_role(&self, id: &str) -> Option<Role> {
        self.host_roles.get(id).copied()
    }

    /// The machines and containers that carry units of `role` directly.
    pub fn tagged_hosts(&self, role: Role) -> impl Iterator<Item = &str> {
        self.tagged_hosts
            .get(&role)
            .into_iter()
            .flatten()
            .map(String::as_str)
    }

    pub fn chosen_application(&self, role: Role) -> &str {
        // classify() refuses to build an AnnotatedStatus without both roles
        &self.chosen_application[&role]
    }

    /// The bare-metal machines carrying units of the chosen application for `role`.
    pub fn hosts_by_role(&self, role: Role) -> impl Iterator<Item = &str> {
        self.hosts_by_role
            .get(&role)
            .into_iter()
            .flatten()
            .map(String::as_str)
    }

    pub fn role_machines(&self) -> &RoleMachines {
        &self.role_machines
    }
}

/// Annotate a raw status with its storage and compute role assignments.
pub fn classify(raw: RawStatus, roles: &RoleTable) -> Result<AnnotatedStatus, ClassificationError> {
    let host_index = index_hosts(&raw)?;

    let mut applications_by_role: BTreeMap<Role, BTreeSet<String>> = BTreeMap::new();
    let mut host_roles: BTreeMap<String, Role> = BTreeMap::new();
    let mut tagged_hosts: BTreeMap<Role, BTreeSet<String>> = BTreeMap::new();

    for (name, app) in raw.applications.iter() {
        let role = roles.role_of(&app.charm_name);
        if let Some(role) = role {
            applications_by_role
                .entry(role)
                .or_default()
                .insert(name.clone());
        }

        for (uname, unit) in app.units.iter() {
            if !host_index.contains_key(&unit.machine) {
                return Err(ClassificationError::UnknownHost {
                    unit: uname.clone(),
                    machine: unit.machine.clone(),
                });
            }
            let Some(role) = role else {
                continue;
            };

            match host_roles.entry(unit.machine.clone()) {
                Entry::Occupied(entry) => {
                    if *entry.get() != role {
                        return Err(ClassificationError::ConflictingRoles {
                            machine: unit.machine.clone(),
                        });
                    }
                }
                Entry::Vacant(entry) => {
                    entry.insert(role);
                }
            }
            tagged_hosts
                .entry(role)
                .or_default()
                .insert(unit.machine.clone());
        }
    }

    let mut chosen_application = BTreeMap::new();
    let mut hosts_by_role = BTreeMap::new();
    for role in Role::ALL {
        let chosen = choose_application(&raw, roles, role)?;
        debug!("chose the {chosen} application for the {role} role");

        let hosts: BTreeSet<String> = raw.applications[chosen]
            .units
            .values()
            .map(|unit| match &host_index[&unit.machine] {
                HostKind::Machine => unit.machine.clone(),
                HostKind::Container { parent } => parent.clone(),
            })
            .collect();

        chosen_application.insert(role, chosen.to_string());
        hosts_by_role.insert(role, hosts);
    }

    let role_machines = partition(&hosts_by_role[&Role::Storage], &hosts_by_role[&Role::Compute])?;
    debug!("machine partition: {role_machines:?}");

    Ok(AnnotatedStatus {
        raw,
        host_index,
        applications_by_role,
        host_roles,
        tagged_hosts,
        chosen_application,
        hosts_by_role,
        role_machines,
    })
}

/// Build an index of every machine and container id, checking that ids are unique and that
/// every container id names its parent machine.
fn index_hosts(raw: &RawStatus) -> Result<BTreeMap<String, HostKind>, ClassificationError> {
    let mut index = BTreeMap::new();

    let mut insert = |id: &str, kind: HostKind| match index.entry(id.to_string()) {
        Entry::Occupied(_) => Err(ClassificationError::DuplicateHost { id: id.to_string() }),
        Entry::Vacant(entry) => {
            entry.insert(kind);
            Ok(())
        }
    };

    for (mid, machine) in raw.machines.iter() {
        insert(mid.as_str(), HostKind::Machine)?;

        for cid in machine.containers.keys() {
            match status::split_container_id(cid) {
                Some((parent, _)) if parent == mid => {}
                _ => {
                    return Err(ClassificationError::InvalidContainerId {
                        parent: mid.clone(),
                        container: cid.clone(),
                    })
                }
            }
            insert(
                cid.as_str(),
                HostKind::Container {
                    parent: mid.clone(),
                },
            )?;
        }
    }

    Ok(index)
}

/// Find the single application with at least one unit that plays `role`.
///
/// Applications without units are ignored; two distinct applications are an error even if
/// their charm kinds differ.
fn choose_application<'a>(
    raw: &'a RawStatus,
    roles: &RoleTable,
    role: Role,
) -> Result<&'a str, ClassificationError> {
    let mut found: Option<&str> = None;

    for (name, app) in raw.applications.iter() {
        if roles.role_of(&app.charm_name) != Some(role) || app.units.is_empty() {
            continue;
        }
        match found {
            None => found = Some(name.as_str()),
            Some(first) if first == name.as_str() => {}
            Some(first) => {
                return Err(ClassificationError::AmbiguousRole {
                    role,
                    first: first.to_string(),
                    second: name.clone(),
                })
            }
        }
    }

    found.ok_or(ClassificationError::RoleNotFound { role })
}

/// `candleholder = storage - compute`; the compute group is kept whole.
fn partition(
    storage: &BTreeSet<String>,
    compute: &BTreeSet<String>,
) -> Result<RoleMachines, ClassificationError> {
    let candleholder: Vec<String> = storage.difference(compute).cloned().collect();

    if compute.is_empty() {
        return Err(ClassificationError::NoComputeHosts);
    }

    Ok(RoleMachines {
        compute: compute.iter().cloned().collect(),
        candleholder: if candleholder.is_empty() {
            None
        } else {
            Some(candleholder)
        },
    })
}
