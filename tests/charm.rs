// SPDX-License-Identifier: MIT
// Copyright 2025. Triad National Security, LLC.

#[cfg(test)]
mod tests {
    use std::{
        fs,
        path::{Path, PathBuf},
    };

    use spcharms_lib::{
        charm::*,
        config::Config,
        error::CharmError,
        test_env::*,
    };

    fn write(path: &Path, contents: &str) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }

    /// A checked-out tree:
    ///
    /// charm-a includes layer:storpool-helper and interface:cinder-backend; the helper layer
    /// includes interface:storpool-presence; charm-b has no layer.yaml at all.
    fn make_tree(base: &Path) -> PathBuf {
        let tree = base.join("storpool-charms");
        write(
            &tree.join("charms/charm-a/layer.yaml"),
            "includes:\n  - layer:basic\n  - layer:storpool-helper\n  - interface:cinder-backend\n",
        );
        fs::create_dir_all(tree.join("charms/charm-b")).unwrap();
        write(&tree.join("charms/charm-b/tox.ini"), "[tox]\n");
        write(
            &tree.join("layers/layer-storpool-helper/layer.yaml"),
            "includes: ['layer:basic', 'interface:storpool-presence']\n",
        );
        fs::create_dir_all(tree.join("interfaces/interface-cinder-backend")).unwrap();
        fs::create_dir_all(tree.join("interfaces/interface-storpool-presence")).unwrap();
        tree
    }

    fn config_in(basedir: &Path, noop: bool) -> Config {
        Config {
            basedir: basedir.to_path_buf(),
            baseurl: "https://example.com/storpool".to_string(),
            noop,
            series: "xenial".to_string(),
            ..Config::default()
        }
    }

    #[test]
    fn layers_are_filtered() {
        let dir = tempfile::tempdir().unwrap();
        let tree = make_tree(dir.path());
        let (runner, _buf) =
            recording_runner(false, &tree.join("charms/charm-a"), RecordingExecutor::new());

        let found = parse_layers(&runner, &tree, "charm-a", true).unwrap();
        assert_eq!(
            found,
            vec![
                Element {
                    name: "storpool-helper".to_string(),
                    kind: ElementKind::Layer,
                    fname: "layer-storpool-helper".to_string(),
                    exists: true,
                },
                Element {
                    name: "cinder-backend".to_string(),
                    kind: ElementKind::Interface,
                    fname: "interface-cinder-backend".to_string(),
                    exists: true,
                },
            ]
        );
    }

    #[test]
    fn missing_layer_file() {
        let dir = tempfile::tempdir().unwrap();
        let (runner, _buf) = recording_runner(false, dir.path(), RecordingExecutor::new());

        assert!(parse_layers(&runner, dir.path(), "charm-x", false)
            .unwrap()
            .is_empty());
        assert!(matches!(
            parse_layers(&runner, dir.path(), "charm-x", true),
            Err(CharmError::LayerFile { name, .. }) if name == "charm-x"
        ));
    }

    #[test]
    fn invalid_include() {
        let dir = tempfile::tempdir().unwrap();
        write(
            &dir.path().join("layer.yaml"),
            "includes:\n  - layer:storpool_helper\n",
        );
        let (runner, _buf) = recording_runner(false, dir.path(), RecordingExecutor::new());

        let err = parse_layers(&runner, dir.path(), "charm-x", true).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid value \"layer:storpool_helper\" in the charm-x \"includes\" directive!"
        );
    }

    #[test]
    fn include_shadowed_by_file() {
        let dir = tempfile::tempdir().unwrap();
        write(&dir.path().join("charm/layer.yaml"), "includes: ['layer:storpool-x']\n");
        write(&dir.path().join("layers/layer-storpool-x"), "not a directory");
        let (runner, _buf) =
            recording_runner(false, &dir.path().join("charm"), RecordingExecutor::new());

        assert!(matches!(
            parse_layers(&runner, dir.path(), "charm", true),
            Err(CharmError::NotADirectory { .. })
        ));
    }

    #[test]
    fn noop_skips_layer_scan() {
        let (runner, buf) = recording_runner(true, Path::new("/nonexistent"), RecordingExecutor::new());
        assert!(parse_layers(&runner, Path::new("/nonexistent"), "charm-a", true)
            .unwrap()
            .is_empty());
        assert_eq!(
            buf.lines(),
            vec!["(would examine the \"layer.yaml\" file and process layers and interfaces recursively)"]
        );
    }

    #[test]
    fn noop_checkout() {
        let cfg = config_in(Path::new("/base"), true);
        let (mut runner, buf) = recording_runner(true, Path::new("/"), RecordingExecutor::new());

        let processed = checkout_all(&mut runner, &cfg, &["charm-a"]).unwrap();

        assert_eq!(processed, vec!["charms/charm-a"]);
        assert!(runner.executor().calls().is_empty());
        assert_eq!(
            buf.lines(),
            vec![
                "# chdir -- '/base'",
                "Recreating the storpool-charms/ tree",
                "# rm -rf -- storpool-charms",
                "# mkdir -- 'storpool-charms'",
                "# chdir -- 'storpool-charms'",
                "# mkdir -- 'layers'",
                "# mkdir -- 'interfaces'",
                "# mkdir -- 'charms'",
                "# chdir -- '/base/storpool-charms/charms'",
                "Checking out the charm-a charm",
                "Checking out https://example.com/storpool/charm-a.git branch master",
                "# git clone -b master -- https://example.com/storpool/charm-a.git",
                "# chdir -- '/base/storpool-charms/charms/charm-a'",
                "(would examine the \"layer.yaml\" file and process layers and interfaces recursively)",
                "# chdir -- '/base/storpool-charms/charms'",
                "No more layers or interfaces to process",
                "The StorPool charms were checked out into /base/storpool-charms",
                "",
            ]
        );
    }

    /// An executor whose `git clone` creates the repository in the tree, with a `layer.yaml`
    /// file for the charm and the helper layer.
    fn cloning_executor(tree: PathBuf) -> RecordingExecutor {
        RecordingExecutor::with_responder(move |cmd| {
            if cmd[..2] != ["git", "clone"] {
                return Ok(Vec::new());
            }
            let fname = cmd
                .last()
                .unwrap()
                .rsplit('/')
                .next()
                .unwrap()
                .trim_end_matches(".git");
            let parent = match fname.split('-').next().unwrap() {
                "charm" => "charms",
                "layer" => "layers",
                _ => "interfaces",
            };
            let dir = tree.join(parent).join(fname);
            fs::create_dir(&dir).unwrap();
            match fname {
                "charm-a" => write(
                    &dir.join("layer.yaml"),
                    "includes:\n  - layer:basic\n  - layer:storpool-helper\n  - interface:storpool-presence\n",
                ),
                "layer-storpool-helper" => write(
                    &dir.join("layer.yaml"),
                    "includes: ['interface:storpool-presence']\n",
                ),
                _ => {}
            }
            Ok(Vec::new())
        })
    }

    #[test]
    fn checkout_follows_includes() {
        let dir = tempfile::tempdir().unwrap();
        let tree = dir.path().join("storpool-charms");
        let cfg = config_in(dir.path(), false);
        let (mut runner, buf) =
            recording_runner(false, Path::new("/"), cloning_executor(tree.clone()));

        let processed = checkout_all(&mut runner, &cfg, &["charm-a"]).unwrap();

        assert_eq!(
            processed,
            vec![
                "charms/charm-a",
                "layers/layer-storpool-helper",
                "interfaces/interface-storpool-presence",
            ]
        );

        let clones: Vec<(String, PathBuf)> = runner
            .executor()
            .calls()
            .into_iter()
            .filter(|(cmd, _)| cmd[1] == "clone")
            .map(|(cmd, cwd)| (cmd.last().unwrap().clone(), cwd))
            .collect();
        assert_eq!(
            clones,
            vec![
                (
                    "https://example.com/storpool/charm-a.git".to_string(),
                    tree.join("charms")
                ),
                (
                    "https://example.com/storpool/layer-storpool-helper.git".to_string(),
                    tree.join("layers")
                ),
                (
                    "https://example.com/storpool/interface-storpool-presence.git".to_string(),
                    tree.join("interfaces")
                ),
            ]
        );

        let lines = buf.lines();
        assert!(lines.contains(&"Checking out the storpool-helper layer".to_string()));
        assert!(lines.contains(&"Checking out the storpool-presence interface".to_string()));
        assert_eq!(lines[lines.len() - 3], "No more layers or interfaces to process");
    }

    #[test]
    fn checkout_uses_branches_file() {
        let dir = tempfile::tempdir().unwrap();
        let branches = dir.path().join("branches.yaml");
        write(&branches, "branches:\n  charm-a: next\n");
        let cfg = Config {
            branches_file: Some(branches.clone()),
            ..config_in(Path::new("/base"), true)
        };
        let (mut runner, buf) = recording_runner(true, Path::new("/"), RecordingExecutor::new());

        checkout_all(&mut runner, &cfg, &["charm-a", "charm-b"]).unwrap();

        let lines = buf.lines();
        assert_eq!(
            lines[1],
            format!("Loading branches information from {}", branches.display())
        );
        assert!(lines.contains(&"# git clone -b next -- https://example.com/storpool/charm-a.git".to_string()));
        assert!(lines.contains(&"# git clone -b master -- https://example.com/storpool/charm-b.git".to_string()));
    }

    #[test]
    fn checkout_with_bad_branches_file() {
        let dir = tempfile::tempdir().unwrap();
        let branches = dir.path().join("branches.yaml");
        write(&branches, "- charm-a\n");
        let cfg = Config {
            branches_file: Some(branches),
            ..config_in(Path::new("/base"), true)
        };
        let (mut runner, _buf) = recording_runner(true, Path::new("/"), RecordingExecutor::new());

        assert!(matches!(
            checkout_all(&mut runner, &cfg, &["charm-a"]),
            Err(CharmError::Branches(_))
        ));
    }

    #[test]
    fn pull_walks_the_whole_tree() {
        let dir = tempfile::tempdir().unwrap();
        let tree = make_tree(dir.path());
        let cfg = config_in(dir.path(), false);
        let (mut runner, buf) = recording_runner(false, Path::new("/"), RecordingExecutor::new());

        let processed = pull_all(&mut runner, &cfg, &["charm-a", "charm-b"]).unwrap();

        assert_eq!(
            processed,
            vec![
                "charms/charm-a",
                "charms/charm-b",
                "layers/layer-storpool-helper",
                "interfaces/interface-cinder-backend",
                "interfaces/interface-storpool-presence",
            ]
        );
        let pulled: Vec<PathBuf> = runner
            .executor()
            .calls()
            .into_iter()
            .map(|(cmd, cwd)| {
                assert_eq!(cmd, vec!["git", "pull", "--ff-only"]);
                cwd
            })
            .collect();
        assert_eq!(
            pulled,
            processed.iter().map(|p| tree.join(p)).collect::<Vec<_>>()
        );

        let lines = buf.lines();
        assert_eq!(
            lines[0],
            format!("Updating the charms in the {} directory", tree.display())
        );
        assert!(lines.contains(&"Updating the storpool-helper layer".to_string()));
        assert!(lines.contains(&"Updating the storpool-presence interface".to_string()));
        assert_eq!(lines[lines.len() - 3], "No more layers or interfaces to process");
    }

    #[test]
    fn pull_needs_the_tree() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = config_in(dir.path(), false);
        let (mut runner, _buf) = recording_runner(false, Path::new("/"), RecordingExecutor::new());

        assert!(matches!(
            pull_all(&mut runner, &cfg, &["charm-a"]),
            Err(CharmError::MissingTree { .. })
        ));
    }

    #[test]
    fn tests_run_per_element() {
        let dir = tempfile::tempdir().unwrap();
        let tree = make_tree(dir.path());
        let cfg = config_in(dir.path(), false);
        let (mut runner, buf) = recording_runner(false, Path::new("/"), RecordingExecutor::new());

        let tested = test_all(&mut runner, &cfg, &["charm-a", "charm-b"]).unwrap();
        assert_eq!(
            tested,
            vec![
                "charms/charm-a",
                "charms/charm-b",
                "interfaces/interface-cinder-backend",
                "interfaces/interface-storpool-presence",
                "layers/layer-storpool-helper",
            ]
        );

        let calls = runner.executor().calls();
        assert_eq!(calls.len(), 11);
        assert_eq!(calls[0].0, vec!["flake8", "."]);
        assert_eq!(calls[0].1, tree.join("charms/charm-a"));
        assert_eq!(calls[2].0, vec!["tox", "-e", "pep8"]);
        assert_eq!(calls[3].0, vec!["tox", "-e", "ALL"]);
        assert_eq!(calls[4].0, vec!["rm", "-rf", ".tox/"]);
        assert_eq!(calls[4].1, tree.join("charms/charm-b"));

        assert!(buf
            .lines()
            .contains(&"Running the tox tests for 5 elements".to_string()));
    }

    #[test]
    fn noop_build() {
        let dir = tempfile::tempdir().unwrap();
        let tree = make_tree(dir.path());
        let cfg = config_in(dir.path(), true);
        let (mut runner, buf) = recording_runner(true, Path::new("/"), RecordingExecutor::new());

        let layout = build_all(&mut runner, &cfg, &["charm-storpool-block"]).unwrap();

        assert_eq!(layout, BuildLayout::new(&tree, "xenial"));
        assert!(runner.executor().calls().is_empty());
        let build_dir = tree.join("built/xenial/storpool-block");
        assert_eq!(
            buf.lines(),
            vec![
                format!("Building the charms in the {} directory", tree.display()),
                format!("# chdir -- '{}'", tree.display()),
                format!("# chdir -- '{}'", tree.join("charms").display()),
                "Building the charm-storpool-block charm".to_string(),
                "# chdir -- 'charm-storpool-block'".to_string(),
                "- recreating the build directory".to_string(),
                format!("# rm -rf -- {}", build_dir.display()),
                format!(
                    "# makedirs '{}' mode 0755 exist_ok False",
                    build_dir.display()
                ),
                "- building the charm".to_string(),
                format!(
                    "# env LAYER_PATH={} INTERFACE_PATH={} charm build -s xenial -n storpool-block -o {}",
                    tree.join("layers").display(),
                    tree.join("interfaces").display(),
                    build_dir.display()
                ),
                format!("# chdir -- '{}'", tree.join("charms").display()),
                format!("The StorPool charms were built in {}", tree.display()),
                String::new(),
            ]
        );
    }

    #[test]
    fn build_needs_the_tree_even_in_noop_mode() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = config_in(dir.path(), true);
        let (mut runner, _buf) = recording_runner(true, Path::new("/"), RecordingExecutor::new());

        assert!(matches!(
            build_all(&mut runner, &cfg, &["charm-storpool-block"]),
            Err(CharmError::MissingTree { .. })
        ));
    }
}
