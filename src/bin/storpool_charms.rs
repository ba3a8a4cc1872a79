// SPDX-License-Identifier: MIT
// Copyright 2025. Triad National Security, LLC.

use clap::Parser;

use spcharms_lib::commands::{self, Cli};

/// The storpool-charms binary checks out, builds, and deploys the StorPool charms.
fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().filter_or("SPCHARMS_LOG", "warn"))
        .init();

    let args = Cli::parse();

    if commands::main(&args).is_err() {
        std::process::exit(1);
    }
}
