// SPDX-License-Identifier: MIT
// Copyright 2025. Triad National Security, LLC.

use crate::{
    charm,
    commands::{Handle, HandledResult},
    config::Config,
    runner::{Executor, Runner},
    CHARM_NAMES,
};

pub fn checkout<E: Executor>(cfg: &Config, runner: &mut Runner<E>) -> HandledResult<()> {
    let processed =
        charm::checkout_all(runner, cfg, CHARM_NAMES).handle_err(|e| eprintln!("{e}"))?;
    log::info!("checked out {} elements", processed.len());
    Ok(())
}

pub fn pull<E: Executor>(cfg: &Config, runner: &mut Runner<E>) -> HandledResult<()> {
    let processed = charm::pull_all(runner, cfg, CHARM_NAMES).handle_err(|e| eprintln!("{e}"))?;
    log::info!("updated {} elements", processed.len());
    Ok(())
}

pub fn test<E: Executor>(cfg: &Config, runner: &mut Runner<E>) -> HandledResult<()> {
    charm::test_all(runner, cfg, CHARM_NAMES).handle_err(|e| eprintln!("{e}"))?;
    Ok(())
}

pub fn build<E: Executor>(cfg: &Config, runner: &mut Runner<E>) -> HandledResult<()> {
    charm::build_all(runner, cfg, CHARM_NAMES).handle_err(|e| eprintln!("{e}"))?;
    Ok(())
}
