// SPDX-License-Identifier: MIT
// Copyright 2025. Triad National Security, LLC.

use std::collections::HashMap;

use crate::{
    config::DEFAULT_BRANCH,
    error::RepoError,
    runner::{Executor, Runner},
};

pub fn repo_url(baseurl: &str, name: &str) -> String {
    format!("{baseurl}/{name}.git")
}

/// Clone a single repository into the current directory, at the branch named for it in
/// `branches` or at the default branch.
pub fn checkout<E: Executor>(
    runner: &Runner<E>,
    baseurl: &str,
    branches: &HashMap<String, String>,
    name: &str,
) -> Result<(), RepoError> {
    let url = repo_url(baseurl, name);
    let branch = branches
        .get(name)
        .map(String::as_str)
        .unwrap_or(DEFAULT_BRANCH);
    let cmd: Vec<String> = ["git", "clone", "-b", branch, "--", url.as_str()]
        .iter()
        .map(|s| s.to_string())
        .collect();
    runner
        .msg(&format!("Checking out {url} branch {branch}"))
        .and_then(|()| runner.run(&cmd))
        .map_err(|source| RepoError::Checkout {
            name: name.to_string(),
            source,
        })
}

/// Fast-forward the repository in the current directory.
pub fn pull<E: Executor>(runner: &Runner<E>, name: &str) -> Result<(), RepoError> {
    let cmd: Vec<String> = ["git", "pull", "--ff-only"]
        .iter()
        .map(|s| s.to_string())
        .collect();
    runner.run(&cmd).map_err(|source| RepoError::Pull {
        name: name.to_string(),
        source,
    })
}
