// SPDX-License-Identifier: MIT
// Copyright 2025. Triad National Security, LLC.

#[cfg(test)]
mod tests {
    use spcharms_lib::{
        error::ClassificationError,
        status::{Application, RawStatus, Unit},
        test_env::*,
        topology::{classify, HostKind, Role, RoleMachines, RoleTable},
    };

    fn unit(machine: &str) -> Unit {
        serde_json::from_value(serde_json::json!({ "machine": machine })).unwrap()
    }

    fn app(charm: &str, machines: &[&str]) -> Application {
        let mut app: Application =
            serde_json::from_value(serde_json::json!({ "charm-name": charm })).unwrap();
        for (idx, machine) in machines.iter().enumerate() {
            app.units.insert(format!("{charm}/{idx}"), unit(machine));
        }
        app
    }

    fn classify_default(raw: RawStatus) -> Result<spcharms_lib::topology::AnnotatedStatus, ClassificationError> {
        classify(raw, &RoleTable::default())
    }

    #[test]
    fn colocated_storage_and_compute() {
        let status = load_annotated("status_real.json");

        assert_eq!(status.chosen_application(Role::Storage), "something");
        assert_eq!(status.chosen_application(Role::Compute), "something-else");
        assert_eq!(
            status.role_machines(),
            &RoleMachines {
                compute: vec!["0".to_string(), "1".to_string()],
                candleholder: None,
            }
        );
        assert_eq!(
            status.tagged_hosts(Role::Storage).collect::<Vec<_>>(),
            vec!["0/lxd/1", "1/lxd/0"]
        );
        assert_eq!(
            status.tagged_hosts(Role::Compute).collect::<Vec<_>>(),
            vec!["0", "1"]
        );
        assert_eq!(
            status.hosts_by_role(Role::Storage).collect::<Vec<_>>(),
            vec!["0", "1"]
        );
    }

    #[test]
    fn storage_on_a_separate_machine() {
        let status = load_annotated("status_candleholder.json");

        assert_eq!(
            status.role_machines(),
            &RoleMachines {
                compute: vec!["0".to_string(), "1".to_string()],
                candleholder: Some(vec!["2".to_string()]),
            }
        );
        assert_eq!(
            status.tagged_hosts(Role::Storage).collect::<Vec<_>>(),
            vec!["0/lxd/1", "2/lxd/3"]
        );
        assert_eq!(status.role_machines().all_hosts(), vec!["0", "1", "2"]);
    }

    #[test]
    fn host_index_and_tags() {
        let status = load_annotated("status_real.json");

        assert_eq!(status.host_kind("3"), Some(&HostKind::Machine));
        assert_eq!(
            status.host_kind("2/lxd/3"),
            Some(&HostKind::Container {
                parent: "2".to_string()
            })
        );
        assert_eq!(status.host_kind("4"), None);
        assert_eq!(status.bare_metal("1/lxd/0"), Some("1"));

        assert_eq!(status.host_role("0/lxd/1"), Some(Role::Storage));
        assert_eq!(status.host_role("0"), Some(Role::Compute));
        assert_eq!(status.host_role("3"), None);

        // swift has no units and is not role-bearing anyway
        assert_eq!(
            status.applications_by_role(Role::Storage).collect::<Vec<_>>(),
            vec!["something"]
        );
    }

    #[test]
    fn raw_status_is_kept() {
        let raw = load_status("status_candleholder.json");
        let status = classify_default(raw.clone()).unwrap();
        assert_eq!(status.raw(), &raw);
    }

    #[test]
    fn second_storage_application_is_ambiguous() {
        let mut raw = load_status("status_real.json");
        raw.applications
            .insert("cinder-two".to_string(), app("cinder", &["3"]));

        match classify_default(raw) {
            Err(ClassificationError::AmbiguousRole {
                role,
                first,
                second,
            }) => {
                assert_eq!(role, Role::Storage);
                assert_eq!(first, "something");
                assert_eq!(second, "cinder-two");
            }
            other => panic!("unexpected result {other:?}"),
        }
    }

    #[test]
    fn different_compute_kinds_are_still_ambiguous() {
        let mut raw = load_status("status_real.json");
        raw.applications
            .insert("kvm".to_string(), app("nova-compute-kvm", &["3"]));

        assert!(matches!(
            classify_default(raw),
            Err(ClassificationError::AmbiguousRole {
                role: Role::Compute,
                ..
            })
        ));
    }

    #[test]
    fn applications_without_units_do_not_count() {
        let mut raw = load_status("status_real.json");
        raw.applications
            .insert("cinder-spare".to_string(), app("cinder", &[]));

        let status = classify_default(raw).unwrap();
        assert_eq!(status.chosen_application(Role::Storage), "something");
        assert_eq!(
            status.applications_by_role(Role::Storage).collect::<Vec<_>>(),
            vec!["cinder-spare", "something"]
        );
    }

    #[test]
    fn missing_role() {
        let mut raw = load_status("status_real.json");
        raw.applications.shift_remove("something-else");

        assert!(matches!(
            classify_default(raw),
            Err(ClassificationError::RoleNotFound {
                role: Role::Compute
            })
        ));

        let mut raw = load_status("status_real.json");
        raw.applications["something"].units.clear();
        let err = classify_default(raw).unwrap_err();
        assert_eq!(err.to_string(), "could not find a storage charm");
    }

    #[test]
    fn storage_and_compute_on_one_host() {
        let mut raw = load_status("status_real.json");
        raw.applications["something-else"]
            .units
            .insert("something-else/30".to_string(), unit("0/lxd/1"));

        match classify_default(raw) {
            Err(ClassificationError::ConflictingRoles { machine }) => {
                assert_eq!(machine, "0/lxd/1")
            }
            other => panic!("unexpected result {other:?}"),
        }
    }

    #[test]
    fn unit_on_unknown_machine() {
        let mut raw = load_status("status_real.json");
        raw.applications
            .insert("stray".to_string(), app("ubuntu", &["9"]));

        assert!(matches!(
            classify_default(raw),
            Err(ClassificationError::UnknownHost { machine, .. }) if machine == "9"
        ));
    }

    #[test]
    fn misnamed_container() {
        let mut raw = load_status("status_real.json");
        let container = raw.machines["1"].containers["1/lxd/0"].clone();
        raw.machines["3"]
            .containers
            .insert("1/lxd/5".to_string(), container);

        assert!(matches!(
            classify_default(raw),
            Err(ClassificationError::InvalidContainerId { parent, container })
                if parent == "3" && container == "1/lxd/5"
        ));
    }

    #[test]
    fn machine_named_like_a_container() {
        let mut raw = load_status("status_real.json");
        let machine = raw.machines["3"].clone();
        raw.machines.insert("1/lxd/0".to_string(), machine);

        match classify_default(raw) {
            Err(ClassificationError::DuplicateHost { id }) => assert_eq!(id, "1/lxd/0"),
            other => panic!("unexpected result {other:?}"),
        }
    }

    #[test]
    fn custom_role_table() {
        let roles = RoleTable {
            storage: vec!["cinder".to_string()],
            compute: vec!["swift".to_string()],
        };
        let mut raw = load_status("status_real.json");
        raw.applications["entirely-different"] = app("swift", &["3"]);

        let status = classify(raw, &roles).unwrap();
        assert_eq!(status.chosen_application(Role::Compute), "entirely-different");
        assert_eq!(status.role_machines().compute, vec!["3"]);
        assert_eq!(
            status.role_machines().candleholder,
            Some(vec!["0".to_string(), "1".to_string()])
        );
    }
}
