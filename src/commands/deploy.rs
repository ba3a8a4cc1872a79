// SPDX-License-Identifier: MIT
// Copyright 2025. Triad National Security, LLC.

use std::path::PathBuf;

use crate::{
    actions::{self, Action},
    charm::BuildLayout,
    commands::{handled_error, Handle, HandledResult},
    config::Config,
    juju,
    runner::{Executor, Runner},
    short_names,
    status::RawStatus,
    topology,
};

/// The absolute path of the charms tree, which must already exist.
fn existing_tree<E: Executor>(cfg: &Config, runner: &Runner<E>) -> HandledResult<PathBuf> {
    let dir = runner.cwd().join(cfg.tree_dir());
    if !dir.is_dir() {
        eprintln!("The {} directory does not seem to exist!", cfg.tree_display());
        return handled_error();
    }
    Ok(dir)
}

fn current_status<E: Executor>(runner: &Runner<E>) -> HandledResult<RawStatus> {
    runner
        .msg("Obtaining the current Juju status")
        .handle_err(|e| eprintln!("{e}"))?;
    juju::get_status(runner).handle_err(|e| eprintln!("{e}"))
}

fn run_plan<E: Executor>(
    runner: &Runner<E>,
    layout: &BuildLayout,
    plan: &[Action],
) -> HandledResult<()> {
    actions::run_plan(runner, layout, plan).handle_err(|e| eprintln!("{e}"))
}

pub fn deploy<E: Executor>(cfg: &Config, runner: &mut Runner<E>) -> HandledResult<()> {
    runner
        .msg(&format!(
            "Deploying the charms from the {} directory",
            cfg.tree_display()
        ))
        .handle_err(|e| eprintln!("{e}"))?;
    let tree = existing_tree(cfg, runner)?;
    runner.chdir(&tree).handle_err(|e| eprintln!("{e}"))?;

    let status = current_status(runner)?;
    let found = juju::installed_charms(&status, &short_names());
    if !found.is_empty() {
        eprintln!(
            "Found some StorPool charms already installed: {}",
            found.join(", ")
        );
        return handled_error();
    }

    let annotated = topology::classify(status, &cfg.roles)
        .handle_err(|e| eprintln!("Could not examine the Juju status: {e}"))?;
    let plan = actions::deploy_plan(&annotated, &cfg.tree_display());
    run_plan(runner, &BuildLayout::new(tree, &cfg.series), &plan)
}

/// The StorPool charms present in the model; it is an error if there are none.
fn installed<E: Executor>(runner: &Runner<E>) -> HandledResult<Vec<String>> {
    let status = current_status(runner)?;
    let found = juju::installed_charms(&status, &short_names());
    if found.is_empty() {
        eprintln!("No StorPool charms are installed");
        return handled_error();
    }
    Ok(found)
}

pub fn undeploy<E: Executor>(cfg: &Config, runner: &mut Runner<E>) -> HandledResult<()> {
    let found = installed(runner)?;
    runner
        .msg(&format!("About to remove {} StorPool charms", found.len()))
        .handle_err(|e| eprintln!("{e}"))?;

    let layout = BuildLayout::new(runner.cwd().join(cfg.tree_dir()), &cfg.series);
    run_plan(runner, &layout, &actions::undeploy_plan(&found))
}

pub fn upgrade<E: Executor>(cfg: &Config, runner: &mut Runner<E>) -> HandledResult<()> {
    runner
        .msg(&format!(
            "Upgrading the charms from the {} directory",
            cfg.tree_display()
        ))
        .handle_err(|e| eprintln!("{e}"))?;
    let tree = existing_tree(cfg, runner)?;
    runner.chdir(&tree).handle_err(|e| eprintln!("{e}"))?;

    let found = installed(runner)?;
    runner
        .msg(&format!("About to upgrade {} StorPool charms", found.len()))
        .handle_err(|e| eprintln!("{e}"))?;
    run_plan(
        runner,
        &BuildLayout::new(tree, &cfg.series),
        &actions::upgrade_plan(&found),
    )
}
