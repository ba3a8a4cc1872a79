// SPDX-License-Identifier: MIT
// Copyright 2025. Triad National Security, LLC.

use clap::Args;

use crate::{
    commands::{handled_error, Handle, HandledResult},
    config::Config,
    error::ConfigError,
    juju::{self, JujuSshResolver},
    runner::{Executor, Runner},
    storpool,
    topology::{self, AnnotatedStatus},
};

#[derive(Args, Debug, Clone)]
pub struct GenerateCharmConfigArgs {
    /// A storpool-block/cinder-storpool check to bypass; may be repeated.
    #[arg(long = "bypass", value_name = "CHECK")]
    pub bypass: Vec<String>,
}

fn annotated_status<E: Executor>(cfg: &Config, runner: &Runner<E>) -> HandledResult<AnnotatedStatus> {
    let status = juju::get_status(runner).handle_err(|e| eprintln!("{e}"))?;
    topology::classify(status, &cfg.roles)
        .handle_err(|e| eprintln!("Could not examine the Juju status: {e}"))
}

fn storpool_config<E: Executor>(
    cfg: &Config,
    runner: &Runner<E>,
    status: &AnnotatedStatus,
) -> HandledResult<String> {
    let resolver = JujuSshResolver::new(runner);
    let entries = storpool::derive_config(status, cfg.space.as_deref(), &resolver)
        .handle_err(|e| eprintln!("{e}"))?;
    Ok(storpool::render_config(&entries))
}

pub fn generate_config<E: Executor>(cfg: &Config, runner: &mut Runner<E>) -> HandledResult<()> {
    let status = annotated_status(cfg, runner)?;
    let text = storpool_config(cfg, runner, &status)?;
    runner.msg(&text).handle_err(|e| eprintln!("{e}"))?;
    Ok(())
}

pub fn generate_charm_config<E: Executor>(
    cfg: &Config,
    runner: &mut Runner<E>,
    args: &GenerateCharmConfigArgs,
) -> HandledResult<()> {
    if cfg.repo_auth.is_none() {
        eprintln!("{}", ConfigError::MissingRepoAuth);
        return handled_error();
    }

    let status = annotated_status(cfg, runner)?;
    let text = storpool_config(cfg, runner, &status)?;
    let settings =
        storpool::derive_charm_settings(&status, cfg.repo_auth.as_deref(), &text, &args.bypass)
            .handle_err(|e| eprintln!("{e}"))?;
    let yaml = storpool::charm_settings_yaml(&settings).handle_err(|e| eprintln!("{e}"))?;
    runner.msg(&yaml).handle_err(|e| eprintln!("{e}"))?;
    Ok(())
}
