// SPDX-License-Identifier: MIT
// Copyright 2025. Triad National Security, LLC.

pub mod deploy;
pub mod generate;
pub mod tree;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use generate::GenerateCharmConfigArgs;

use crate::{
    config::{Config, Settings},
    runner::{Executor, Runner},
};

/// A `HandledError` represents an error that has already been handled. When you call a function
/// that returns a `HandledError` or `HandledResult`, you don't need to do anything with that error,
/// other than just be aware that it happened, and return it on to your caller.
///
/// `main()` has a special responsibility: since its "caller" is, in a certain sense, the operating
/// system, `main()` must return a nonzero exit status when it gets a `HandledError`.
///
/// The primary way to construct a `HandledError` is with the `handle_err()` function, which turns a
/// generic error into a `HandledError`, and also runs some caller-provided code to handle the
/// error. That provided code would normally report the error to stderr.
#[derive(Debug, PartialEq)]
pub struct HandledError {}

pub type HandledResult<T> = std::result::Result<T, HandledError>;

pub fn handled_error<T>() -> HandledResult<T> {
    HandledResult::Err(HandledError {})
}

pub trait Handle<T, F> {
    fn handle_err(self, handler: F) -> HandledResult<T>;
}

impl<T, E, F: FnOnce(E)> Handle<T, F> for std::result::Result<T, E> {
    /// Handle an error by running the provided `handler` code, giving it the error.
    ///
    /// Then, return a `HandledResult`, so that transitive callers of this function know that they
    /// do not need to do anything further to handle the error.
    fn handle_err(self, handler: F) -> HandledResult<T> {
        self.map_err(|e| {
            handler(e);
            HandledError {}
        })
    }
}

#[derive(Parser, Debug)]
#[command(name = "storpool-charms", version, about, long_about = None)]
pub struct Cli {
    /// The TOML settings file; defaults to $SPCHARMS_CONFIG or
    /// /etc/storpool-charms/settings.toml if present.
    #[arg(long, global = true)]
    pub config: Option<String>,

    /// No-operation mode, display what would be done.
    #[arg(short = 'N', long, global = true)]
    pub noop: bool,

    /// The base directory for the charms tree.
    #[arg(short = 'd', long, global = true)]
    pub basedir: Option<PathBuf>,

    /// The name of the series to build for.
    #[arg(short = 's', long, global = true)]
    pub series: Option<String>,

    /// The name of the StorPool network space.
    #[arg(short = 'S', long, global = true)]
    pub space: Option<String>,

    /// The base URL for the StorPool Git repositories.
    #[arg(short = 'U', long, global = true)]
    pub baseurl: Option<String>,

    /// The StorPool repository authentication data, as username:password.
    #[arg(short = 'A', long, global = true)]
    pub repo_auth: Option<String>,

    /// A YAML file listing the branches to check out.
    #[arg(short = 'B', long, global = true)]
    pub branches_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Check out the charms and the layers and interfaces they include.
    Checkout,
    /// Update an existing checkout.
    Pull,
    /// Run the tests of every checked-out charm, layer, and interface.
    Test,
    /// Build the charms.
    Build,
    /// Deploy the built charms and relate them to the storage and compute charms.
    Deploy,
    /// Remove the StorPool charms from the model.
    Undeploy,
    /// Upgrade the StorPool charms from their build directories.
    Upgrade,
    /// Print the StorPool configuration for the machines in the model.
    GenerateConfig,
    /// Print the YAML settings for the StorPool charms.
    GenerateCharmConfig(GenerateCharmConfigArgs),
}

impl Cli {
    /// Assemble the runtime configuration: built-in and environment defaults, then the settings
    /// file, then the command-line options.
    pub fn runtime_config(&self) -> HandledResult<Config> {
        let settings = Settings::load(self.config.as_deref()).handle_err(|e| eprintln!("{e}"))?;
        let mut cfg = Config::from_settings(settings);

        cfg.noop = self.noop;
        if let Some(basedir) = &self.basedir {
            cfg.basedir = basedir.clone();
        }
        if let Some(series) = &self.series {
            cfg.series = series.clone();
        }
        if let Some(space) = &self.space {
            cfg.space = Some(space.clone());
        }
        if let Some(baseurl) = &self.baseurl {
            cfg.baseurl = baseurl.clone();
        }
        if let Some(repo_auth) = &self.repo_auth {
            cfg.repo_auth = Some(repo_auth.clone());
        }
        if let Some(branches_file) = &self.branches_file {
            cfg.branches_file = Some(branches_file.clone());
        }

        log::debug!("runtime configuration: {cfg:?}");
        Ok(cfg)
    }
}

/// Run a single command with the given configuration and runner.
pub fn run<E: Executor>(
    cfg: &Config,
    runner: &mut Runner<E>,
    command: &Commands,
) -> HandledResult<()> {
    match command {
        Commands::Checkout => tree::checkout(cfg, runner),
        Commands::Pull => tree::pull(cfg, runner),
        Commands::Test => tree::test(cfg, runner),
        Commands::Build => tree::build(cfg, runner),
        Commands::Deploy => deploy::deploy(cfg, runner),
        Commands::Undeploy => deploy::undeploy(cfg, runner),
        Commands::Upgrade => deploy::upgrade(cfg, runner),
        Commands::GenerateConfig => generate::generate_config(cfg, runner),
        Commands::GenerateCharmConfig(args) => generate::generate_charm_config(cfg, runner, args),
    }
}

pub fn main(cli: &Cli) -> HandledResult<()> {
    let cfg = cli.runtime_config()?;
    let mut runner = Runner::new(cfg.noop).handle_err(|e| eprintln!("{e}"))?;
    run(&cfg, &mut runner, &cli.command)
}
