// SPDX-License-Identifier: MIT
// Copyright 2025. Triad National Security, LLC.

//! The model of the `juju status --format=json` document.
//!
//! Only the fields this tool looks at are required; everything else Juju reports is either
//! optional here or ignored. All mappings are `IndexMap`s so that the document order of
//! units and network interfaces is preserved.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub struct RawStatus {
    #[serde(default)]
    pub controller: Option<Controller>,
    #[serde(default)]
    pub applications: IndexMap<String, Application>,
    #[serde(default)]
    pub machines: IndexMap<String, Machine>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct Controller {
    #[serde(default)]
    pub timestamp: Option<String>,
}

/// The `current`/`since`/`message`/`version` block Juju attaches to agents and machines.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct ObjectStatus {
    #[serde(default)]
    pub current: Option<String>,
    #[serde(default)]
    pub since: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub struct Application {
    /// The charm kind, e.g. "cinder" or "nova-compute".
    pub charm_name: String,
    #[serde(default)]
    pub charm_rev: Option<i64>,
    #[serde(default)]
    pub series: Option<String>,
    #[serde(default)]
    pub units: IndexMap<String, Unit>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub struct Unit {
    /// The machine or container this unit runs on.
    pub machine: String,
    #[serde(default)]
    pub workload_status: Option<ObjectStatus>,
    #[serde(default)]
    pub juju_status: Option<ObjectStatus>,
    #[serde(default)]
    pub leader: Option<bool>,
    #[serde(default)]
    pub public_address: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub struct Interface {
    #[serde(default)]
    pub ip_addresses: Vec<String>,
    #[serde(default)]
    pub mac_address: Option<String>,
    #[serde(default)]
    pub gateway: Option<String>,
    /// The network space; interfaces without one are simply unclassified.
    #[serde(default)]
    pub space: Option<String>,
    #[serde(default)]
    pub is_up: Option<bool>,
}

/// A bare-metal machine. Machines exclusively own their containers.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub struct Machine {
    #[serde(default)]
    pub juju_status: Option<ObjectStatus>,
    #[serde(default)]
    pub machine_status: Option<ObjectStatus>,
    #[serde(default)]
    pub dns_name: Option<String>,
    #[serde(default)]
    pub ip_addresses: Vec<String>,
    #[serde(default)]
    pub instance_id: Option<String>,
    #[serde(default)]
    pub series: Option<String>,
    #[serde(default)]
    pub constraints: Option<String>,
    #[serde(default)]
    pub network_interfaces: IndexMap<String, Interface>,
    #[serde(default)]
    pub containers: IndexMap<String, Container>,
}

/// A container nested inside a machine; its parent is identified by its id prefix.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub struct Container {
    #[serde(default)]
    pub juju_status: Option<ObjectStatus>,
    #[serde(default)]
    pub machine_status: Option<ObjectStatus>,
    #[serde(default)]
    pub dns_name: Option<String>,
    #[serde(default)]
    pub ip_addresses: Vec<String>,
    #[serde(default)]
    pub instance_id: Option<String>,
    #[serde(default)]
    pub series: Option<String>,
    #[serde(default)]
    pub constraints: Option<String>,
    #[serde(default)]
    pub network_interfaces: IndexMap<String, Interface>,
}

impl Machine {
    /// Names of the interfaces in the given network space, in document order.
    pub fn interfaces_in_space(&self, space: &str) -> Vec<String> {
        self.network_interfaces
            .iter()
            .filter(|(_, iface)| iface.space.as_deref() == Some(space))
            .map(|(name, _)| name.clone())
            .collect()
    }
}

/// The marker that separates a parent machine id from the container number.
pub const CONTAINER_MARKER: &str = "/lxd/";

/// Split a container id of the form `<parent>/lxd/<n>` into its parent id and number.
pub fn split_container_id(id: &str) -> Option<(&str, u32)> {
    let (parent, num) = id.rsplit_once(CONTAINER_MARKER)?;
    if parent.is_empty() {
        return None;
    }
    let num = num.parse::<u32>().ok()?;
    Some((parent, num))
}
