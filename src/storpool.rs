// SPDX-License-Identifier: MIT
// Copyright 2025. Triad National Security, LLC.

//! storpool.rs
//!
//! Derive the StorPool configuration from a classified cluster: one section per bare-metal
//! machine with its node id and the interfaces in the StorPool network space, and the
//! settings for the two charms that consume that configuration.

use std::collections::HashMap;

use indexmap::IndexMap;
use log::{debug, info};
use serde::Serialize;

use crate::{
    error::{CommandError, ConfigError},
    status::CONTAINER_MARKER,
    topology::{AnnotatedStatus, Role},
};

/// The node id assigned to the first machine; the rest follow in order.
pub const BASE_OURID: u32 = 40;

pub const CLUSTER_NAME: &str = "Juju charms test cluster";
pub const CLUSTER_ID: &str = "a.a";
pub const EXPECTED_NODES: u32 = 3;
pub const NODE_NON_VOTING: u32 = 1;

pub const STORPOOL_VERSION: &str = "18.01";
pub const STORPOOL_OPENSTACK_VERSION: &str = "1.5.0-1~1ubuntu1";
pub const STORPOOL_TEMPLATE: &str = "hybrid-r3";

/// Looks up the hostname a machine reports for itself.
pub trait HostResolver {
    fn resolve(&self, host: &str) -> Result<String, CommandError>;
}

/// The configuration facts for one bare-metal machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigEntry {
    /// The StorPool node id (`SP_OURID`).
    pub ordinal: u32,
    /// The interfaces in the StorPool network space, in document order.
    pub interfaces: Vec<String>,
}

/// Build the per-machine configuration entries, keyed by hostname in node id order.
pub fn derive_config(
    status: &AnnotatedStatus,
    segment: Option<&str>,
    resolver: &impl HostResolver,
) -> Result<IndexMap<String, ConfigEntry>, ConfigError> {
    let segment = match segment {
        Some(s) if !s.is_empty() => s,
        _ => return Err(ConfigError::MissingSegment),
    };

    let mut res = IndexMap::new();
    let mut seen_hostnames: HashMap<String, String> = HashMap::new();

    for (idx, host) in status.role_machines().all_hosts().into_iter().enumerate() {
        let hostname = resolver
            .resolve(&host)
            .map_err(|source| ConfigError::Resolve {
                host: host.clone(),
                source,
            })?;
        if let Some(first) = seen_hostnames.get(&hostname) {
            return Err(ConfigError::DuplicateHostname {
                hostname,
                first: first.clone(),
                second: host,
            });
        }
        seen_hostnames.insert(hostname.clone(), host.clone());

        let machine = status
            .machine(&host)
            .ok_or_else(|| ConfigError::UnknownHost { host: host.clone() })?;
        let interfaces = machine.interfaces_in_space(segment);
        if interfaces.is_empty() {
            return Err(ConfigError::NoInterfaces {
                segment: segment.to_string(),
                hostname,
                host,
                dns_name: machine.dns_name.clone().unwrap_or_default(),
            });
        }

        let ordinal = BASE_OURID + idx as u32;
        debug!("machine {host} is {hostname}, node id {ordinal}, interfaces {interfaces:?}");
        res.insert(
            hostname,
            ConfigEntry {
                ordinal,
                interfaces,
            },
        );
    }

    Ok(res)
}

/// Render the StorPool configuration file for the given entries.
pub fn render_config(entries: &IndexMap<String, ConfigEntry>) -> String {
    let mut res = format!(
        "\n# Autogenerated StorPool test configuration\n\
         \n\
         SP_CLUSTER_NAME={CLUSTER_NAME}\n\
         SP_CLUSTER_ID={CLUSTER_ID}\n\
         \n\
         SP_EXPECTED_NODES={EXPECTED_NODES}\n\
         SP_NODE_NON_VOTING={NODE_NON_VOTING}\n"
    );

    for (name, entry) in entries.iter() {
        res.push_str(&format!(
            "\n[{name}]\nSP_OURID={}\nSP_IFACE={}\n",
            entry.ordinal,
            entry.interfaces.join(",")
        ));
    }

    res
}

/// Settings for the storpool-block charm. Fields are declared in the order they are
/// emitted.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct BlockSettings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bypassed_checks: Option<String>,
    pub handle_lxc: bool,
    pub storpool_conf: String,
    pub storpool_openstack_version: String,
    pub storpool_repo_url: String,
    pub storpool_version: String,
}

/// Settings for the cinder-storpool charm.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct CinderSettings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bypassed_checks: Option<String>,
    pub storpool_template: String,
}

/// The `juju deploy --config` document for both consuming charms.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct CharmSettings {
    #[serde(rename = "cinder-storpool")]
    pub cinder: CinderSettings,
    #[serde(rename = "storpool-block")]
    pub block: BlockSettings,
}

/// Build the charm settings from the classified status and the rendered configuration.
pub fn derive_charm_settings(
    status: &AnnotatedStatus,
    repo_auth: Option<&str>,
    config_text: &str,
    bypass: &[String],
) -> Result<CharmSettings, ConfigError> {
    let Some(repo_auth) = repo_auth else {
        return Err(ConfigError::MissingRepoAuth);
    };

    let handle_lxc = status
        .tagged_hosts(Role::Storage)
        .any(|host| host.contains(CONTAINER_MARKER));
    info!("storage units in containers: {handle_lxc}");

    let bypassed_checks = if bypass.is_empty() {
        None
    } else {
        let mut sorted = bypass.to_vec();
        sorted.sort();
        Some(sorted.join(","))
    };

    Ok(CharmSettings {
        cinder: CinderSettings {
            bypassed_checks: bypassed_checks.clone(),
            storpool_template: STORPOOL_TEMPLATE.to_string(),
        },
        block: BlockSettings {
            bypassed_checks,
            handle_lxc,
            storpool_conf: config_text.to_string(),
            storpool_openstack_version: STORPOOL_OPENSTACK_VERSION.to_string(),
            storpool_repo_url: format!("http://{repo_auth}@repo.storpool.com/storpool-maas/"),
            storpool_version: STORPOOL_VERSION.to_string(),
        },
    })
}

/// Serialize the charm settings as a YAML document.
pub fn charm_settings_yaml(settings: &CharmSettings) -> Result<String, ConfigError> {
    Ok(serde_yaml::to_string(settings)?)
}
