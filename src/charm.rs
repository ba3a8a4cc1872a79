// SPDX-License-Identifier: MIT
// Copyright 2025. Triad National Security, LLC.

//! charm.rs
//!
//! The charms tree: `<basedir>/<subdir>/{charms,layers,interfaces}/`. The StorPool charms
//! are checked out under `charms/`; the layers and interfaces they include, transitively, are
//! discovered from each element's `layer.yaml` and live under `layers/` and `interfaces/`.

use std::{
    collections::{HashMap, HashSet},
    fmt,
    path::{Path, PathBuf},
    sync::OnceLock,
};

use indexmap::IndexMap;
use log::{debug, warn};
use regex::Regex;
use serde::Deserialize;

use crate::{
    config::{parse_branches_file, Config},
    error::{CharmError, CommandError},
    git,
    runner::{Executor, Runner},
    short_name,
};

/// Where built charms are placed and which series they are built for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildLayout {
    pub root: PathBuf,
    pub series: String,
}

impl BuildLayout {
    pub fn new(root: impl Into<PathBuf>, series: &str) -> Self {
        BuildLayout {
            root: root.into(),
            series: series.to_string(),
        }
    }

    /// `<root>/built/<series>/<name>`: the output directory of `charm build`.
    pub fn build_dir(&self, name: &str) -> PathBuf {
        self.root
            .join("built")
            .join(&self.series)
            .join(name)
    }

    /// `<build dir>/<series>/<name>`: the directory `charm build` leaves the charm in.
    pub fn deploy_dir(&self, name: &str) -> PathBuf {
        self.build_dir(name).join(&self.series).join(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementKind {
    Charm,
    Layer,
    Interface,
}

impl ElementKind {
    /// The directory elements of this kind live in, relative to the tree.
    pub fn dir_name(&self) -> &'static str {
        match self {
            ElementKind::Charm => "charms",
            ElementKind::Layer => "layers",
            ElementKind::Interface => "interfaces",
        }
    }
}

impl fmt::Display for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}",
            match self {
                ElementKind::Charm => "charm",
                ElementKind::Layer => "layer",
                ElementKind::Interface => "interface",
            }
        )
    }
}

/// One node of the charm dependency graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    pub name: String,
    pub kind: ElementKind,
    /// The repository and directory name, e.g. `layer-storpool-helper`.
    pub fname: String,
    /// Whether the directory was already present when the element was discovered.
    pub exists: bool,
}

impl Element {
    pub fn charm(name: &str) -> Self {
        Element {
            name: name.to_string(),
            kind: ElementKind::Charm,
            fname: name.to_string(),
            exists: true,
        }
    }

    /// The directory holding the element's parent, e.g. `<tree>/layers`.
    pub fn parent_dir(&self, tree: &Path) -> PathBuf {
        tree.join(self.kind.dir_name())
    }

    pub fn dir(&self, tree: &Path) -> PathBuf {
        self.parent_dir(tree).join(&self.fname)
    }

    /// The element's path relative to the tree, e.g. `layers/layer-storpool-helper`.
    pub fn tree_path(&self) -> String {
        format!("{}/{}", self.kind.dir_name(), self.fname)
    }
}

#[derive(Deserialize, Debug, Default)]
struct LayerFile {
    #[serde(default)]
    includes: Vec<String>,
}

fn include_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(?P<kind>layer|interface):(?P<name>[a-z][a-z-]*)$")
            .expect("the include pattern is valid")
    })
}

fn is_storpool_include(include: &str) -> bool {
    include.contains("storpool") || include == "interface:cinder-backend"
}

/// Examine the `layer.yaml` file in the runner's current directory and return the StorPool
/// layers and interfaces it includes. A missing file is only an error if `layers_required`.
pub fn parse_layers<E: Executor>(
    runner: &Runner<E>,
    tree: &Path,
    name: &str,
    layers_required: bool,
) -> Result<Vec<Element>, CharmError> {
    if runner.noop() {
        runner.msg(
            "(would examine the \"layer.yaml\" file and process layers and interfaces recursively)",
        )?;
        return Ok(Vec::new());
    }

    let fname = runner.cwd().join("layer.yaml");
    let contents = match std::fs::read_to_string(&fname) {
        Ok(contents) => contents,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound && !layers_required => {
            debug!("no layer.yaml in {}", runner.cwd().display());
            return Ok(Vec::new());
        }
        Err(e) => {
            return Err(CharmError::LayerFile {
                name: name.to_string(),
                message: e.to_string(),
            })
        }
    };
    let layer: LayerFile = serde_yaml::from_str(&contents).map_err(|e| CharmError::LayerFile {
        name: name.to_string(),
        message: e.to_string(),
    })?;

    let mut res = Vec::new();
    for include in layer.includes.iter().filter(|inc| is_storpool_include(inc)) {
        let Some(caps) = include_re().captures(include) else {
            return Err(CharmError::InvalidInclude {
                name: name.to_string(),
                include: include.clone(),
            });
        };
        let kind = match &caps["kind"] {
            "layer" => ElementKind::Layer,
            _ => ElementKind::Interface,
        };
        let elem_name = caps["name"].to_string();
        let mut elem = Element {
            fname: format!("{kind}-{elem_name}"),
            name: elem_name,
            kind,
            exists: false,
        };

        let dir = elem.dir(tree);
        elem.exists = dir.exists();
        if elem.exists && !dir.is_dir() {
            return Err(CharmError::NotADirectory { path: dir });
        }
        debug!("{name} includes {} (present: {})", elem.tree_path(), elem.exists);
        res.push(elem);
    }

    Ok(res)
}

/// Which of the discovered elements a walk descends into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalkMode {
    /// Only elements not yet present on disk; they are about to be cloned.
    Checkout,
    /// Only elements already present on disk.
    Update,
}

impl WalkMode {
    fn wants(&self, elem: &Element) -> bool {
        match self {
            WalkMode::Checkout => !elem.exists,
            WalkMode::Update => elem.exists,
        }
    }
}

/// Processes a single element of the tree, starting in the element's parent directory, and
/// returns the elements it depends on.
pub trait TreeVisitor {
    fn visit<E: Executor>(
        &mut self,
        runner: &mut Runner<E>,
        tree: &Path,
        elem: &Element,
    ) -> Result<Vec<Element>, CharmError>;
}

/// Visit the charms, then the layers and interfaces they include, recursively, each distinct
/// element once.
pub fn walk<E: Executor, V: TreeVisitor>(
    runner: &mut Runner<E>,
    tree: &Path,
    charm_names: &[&str],
    mode: WalkMode,
    visitor: &mut V,
) -> Result<(), CharmError> {
    runner.chdir(&tree.join(ElementKind::Charm.dir_name()))?;

    let mut to_process = Vec::new();
    for name in charm_names {
        to_process.extend(visitor.visit(runner, tree, &Element::charm(name))?);
    }

    let mut processed: HashSet<String> = HashSet::new();
    loop {
        if to_process.is_empty() {
            runner.msg("No more layers or interfaces to process")?;
            break;
        }

        let mut processing: IndexMap<String, Element> = IndexMap::new();
        for elem in to_process.drain(..) {
            if !processed.contains(&elem.fname) && mode.wants(&elem) {
                processing.insert(elem.fname.clone(), elem);
            }
        }

        for elem in processing.into_values() {
            runner.chdir(&elem.parent_dir(tree))?;
            to_process.extend(visitor.visit(runner, tree, &elem)?);
            processed.insert(elem.fname);
        }
    }

    Ok(())
}

fn cmd(parts: &[&str]) -> Vec<String> {
    parts.iter().map(|s| s.to_string()).collect()
}

fn enter_tree<E: Executor>(runner: &mut Runner<E>, dir: &Path) -> Result<(), CharmError> {
    runner.chdir(dir).map_err(|e| match e {
        CommandError::Chdir { dir, .. } => CharmError::MissingTree { dir },
        other => CharmError::Command(other),
    })
}

struct CheckoutVisitor<'a> {
    baseurl: &'a str,
    branches: &'a HashMap<String, String>,
    processed: Vec<String>,
}

impl TreeVisitor for CheckoutVisitor<'_> {
    fn visit<E: Executor>(
        &mut self,
        runner: &mut Runner<E>,
        tree: &Path,
        elem: &Element,
    ) -> Result<Vec<Element>, CharmError> {
        runner.msg(&format!("Checking out the {} {}", elem.name, elem.kind))?;
        git::checkout(runner, self.baseurl, self.branches, &elem.fname)?;
        runner.chdir(&elem.dir(tree))?;
        let found = parse_layers(
            runner,
            tree,
            &elem.fname,
            elem.kind == ElementKind::Charm,
        )?;
        runner.chdir(&elem.parent_dir(tree))?;
        self.processed.push(elem.tree_path());
        Ok(found)
    }
}

/// Recreate the charms tree and clone the charms and everything they include into it.
pub fn checkout_all<E: Executor>(
    runner: &mut Runner<E>,
    cfg: &Config,
    charm_names: &[&str],
) -> Result<Vec<String>, CharmError> {
    enter_tree(runner, &cfg.basedir)?;

    let branches = match &cfg.branches_file {
        Some(fname) => {
            runner.msg(&format!(
                "Loading branches information from {}",
                fname.display()
            ))?;
            parse_branches_file(fname)?
        }
        None => HashMap::new(),
    };

    runner.msg(&format!("Recreating the {}/ tree", cfg.subdir))?;
    runner.run(&cmd(&["rm", "-rf", "--", &cfg.subdir]))?;
    runner.mkdir(Path::new(&cfg.subdir))?;
    runner.chdir(Path::new(&cfg.subdir))?;
    let tree = runner.cwd().to_path_buf();
    for kind in [ElementKind::Layer, ElementKind::Interface, ElementKind::Charm] {
        runner.mkdir(Path::new(kind.dir_name()))?;
    }

    let mut visitor = CheckoutVisitor {
        baseurl: &cfg.baseurl,
        branches: &branches,
        processed: Vec::new(),
    };
    walk(runner, &tree, charm_names, WalkMode::Checkout, &mut visitor)?;

    runner.msg(&format!(
        "The StorPool charms were checked out into {}",
        cfg.tree_display()
    ))?;
    runner.msg("")?;
    Ok(visitor.processed)
}

struct PullVisitor {
    processed: Vec<String>,
}

impl TreeVisitor for PullVisitor {
    fn visit<E: Executor>(
        &mut self,
        runner: &mut Runner<E>,
        tree: &Path,
        elem: &Element,
    ) -> Result<Vec<Element>, CharmError> {
        runner.msg(&format!("Updating the {} {}", elem.name, elem.kind))?;
        runner.chdir(&elem.dir(tree))?;
        git::pull(runner, &elem.fname)?;
        let found = parse_layers(runner, tree, &elem.name, false)?;
        self.processed.push(elem.tree_path());
        runner.chdir(&elem.parent_dir(tree))?;
        Ok(found)
    }
}

/// Fast-forward every checked-out charm, layer, and interface.
pub fn pull_all<E: Executor>(
    runner: &mut Runner<E>,
    cfg: &Config,
    charm_names: &[&str],
) -> Result<Vec<String>, CharmError> {
    let tree_display = cfg.tree_display();
    runner.msg(&format!("Updating the charms in the {tree_display} directory"))?;
    enter_tree(runner, &cfg.tree_dir())?;
    let tree = runner.cwd().to_path_buf();

    let mut visitor = PullVisitor {
        processed: Vec::new(),
    };
    walk(runner, &tree, charm_names, WalkMode::Update, &mut visitor)?;

    runner.msg(&format!("The StorPool charms were updated in {tree_display}"))?;
    runner.msg("")?;
    Ok(visitor.processed)
}

struct ExamineVisitor {
    processed: Vec<String>,
}

impl TreeVisitor for ExamineVisitor {
    fn visit<E: Executor>(
        &mut self,
        runner: &mut Runner<E>,
        tree: &Path,
        elem: &Element,
    ) -> Result<Vec<Element>, CharmError> {
        runner.msg(&format!("Examining the {} {}", elem.name, elem.kind))?;
        runner.chdir(&elem.dir(tree))?;
        let found = parse_layers(runner, tree, &elem.name, false)?;
        self.processed.push(elem.tree_path());
        runner.chdir(&elem.parent_dir(tree))?;
        Ok(found)
    }
}

fn test_element<E: Executor>(runner: &Runner<E>) -> Result<(), CharmError> {
    if runner.cwd().join("tox.ini").is_file() {
        runner.msg("- running pep8/flake8 through tox")?;
        runner.run(&cmd(&["tox", "-e", "pep8"]))?;
        runner.msg("- running all the tox tests")?;
        runner.run(&cmd(&["tox", "-e", "ALL"]))?;
        // charm build picks up the tox environments otherwise
        runner.msg("- removing the .tox/ directory")?;
        runner.run(&cmd(&["rm", "-rf", ".tox/"]))?;
    } else {
        runner.msg("- no tox.ini file, running some tests by ourselves")?;
        runner.msg("- running flake8")?;
        runner.run(&cmd(&["flake8", "."]))?;
        runner.msg("- running pep8")?;
        runner.run(&cmd(&["pep8", "."]))?;
    }
    Ok(())
}

/// Run the tests of every charm, layer, and interface in the tree.
pub fn test_all<E: Executor>(
    runner: &mut Runner<E>,
    cfg: &Config,
    charm_names: &[&str],
) -> Result<Vec<String>, CharmError> {
    let tree_display = cfg.tree_display();
    runner.msg(&format!(
        "Running tox tests for the charms in the {tree_display} directory"
    ))?;
    enter_tree(runner, &cfg.tree_dir())?;
    let tree = runner.cwd().to_path_buf();

    let mut visitor = ExamineVisitor {
        processed: Vec::new(),
    };
    walk(runner, &tree, charm_names, WalkMode::Update, &mut visitor)?;

    let mut paths = visitor.processed;
    paths.sort();
    runner.msg(&format!("Running the tox tests for {} elements", paths.len()))?;
    for path in paths.iter() {
        runner.msg(&format!("\n===== Testing {path}\n"))?;
        runner.chdir(&tree.join(path))?;
        test_element(runner)?;
    }

    runner.msg(&format!("The StorPool charms were tested in {tree_display}"))?;
    runner.msg("")?;
    Ok(paths)
}

/// Build each charm into `<tree>/built/<series>/<short name>`.
pub fn build_all<E: Executor>(
    runner: &mut Runner<E>,
    cfg: &Config,
    charm_names: &[&str],
) -> Result<BuildLayout, CharmError> {
    let tree_display = cfg.tree_display();
    runner.msg(&format!("Building the charms in the {tree_display} directory"))?;

    // The build directories are derived from the tree's location, so it has to exist even
    // when nothing is being done.
    let tree_dir = runner.cwd().join(cfg.tree_dir());
    if !tree_dir.is_dir() {
        return Err(CharmError::MissingTree { dir: tree_dir });
    }
    enter_tree(runner, &tree_dir)?;
    let layout = BuildLayout::new(runner.cwd(), &cfg.series);
    let charms_dir = tree_dir.join(ElementKind::Charm.dir_name());
    runner.chdir(&charms_dir)?;

    let layer_path = format!("LAYER_PATH={}", tree_dir.join("layers").display());
    let interface_path = format!("INTERFACE_PATH={}", tree_dir.join("interfaces").display());
    for name in charm_names {
        runner.msg(&format!("Building the {name} charm"))?;
        runner.chdir(Path::new(name))?;

        let short = short_name(name);
        let build_dir = layout.build_dir(short);
        let build_dir_str = build_dir.display().to_string();
        runner.msg("- recreating the build directory")?;
        runner.run(&cmd(&["rm", "-rf", "--", &build_dir_str]))?;
        runner.makedirs(&build_dir, 0o755, false)?;

        runner.msg("- building the charm")?;
        runner.run(&cmd(&[
            "env",
            &layer_path,
            &interface_path,
            "charm",
            "build",
            "-s",
            &cfg.series,
            "-n",
            short,
            "-o",
            &build_dir_str,
        ]))?;
        if !runner.noop() && !layout.deploy_dir(short).is_dir() {
            warn!(
                "charm build did not leave {} in place",
                layout.deploy_dir(short).display()
            );
        }
        runner.chdir(&charms_dir)?;
    }

    runner.msg(&format!("The StorPool charms were built in {tree_display}"))?;
    runner.msg("")?;
    Ok(layout)
}
