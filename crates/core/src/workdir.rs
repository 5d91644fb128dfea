// Copyright 2025 urbench Contributors
// SPDX-License-Identifier: Apache-2.0

//! Versioned working-directory layout.
//!
//! The working directory holds checked-out benchmark sources, build trees,
//! downloaded data and saved results. A version marker guards against
//! reusing a directory written by an incompatible harness: on mismatch the
//! whole directory is wiped and recreated.

use crate::error::{Error, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Layout version of the working directory. Bump when the result layout changes.
pub const WORKDIR_VERSION: &str = "2.0";

/// Marker file holding the layout version.
pub const VERSION_FILE: &str = "BENCH_WORKDIR_VERSION";

/// Read the layout version of `dir`, if it has one.
pub fn read_version(dir: &Path) -> Option<String> {
    fs::read_to_string(dir.join(VERSION_FILE))
        .ok()
        .map(|v| v.trim().to_string())
}

/// Make sure `dir` is a working directory of layout `version`.
///
/// A missing directory is created. An existing directory with a different
/// version is wiped and recreated. A non-empty directory without a version
/// marker is refused, since it was not created by the harness.
pub fn prepare_workdir(dir: &Path, version: &str) -> Result<()> {
    if dir.exists() {
        match read_version(dir) {
            Some(found) if found == version => return Ok(()),
            Some(found) => {
                warn!(
                    dir = %dir.display(),
                    found = %found,
                    expected = %version,
                    "version mismatch, cleaning up benchmark directory"
                );
                fs::remove_dir_all(dir)?;
            }
            None if is_empty_dir(dir)? => {}
            None => {
                return Err(Error::Workdir(format!(
                    "the directory {} exists but is not a benchmark work directory",
                    dir.display()
                )));
            }
        }
    }

    fs::create_dir_all(dir)?;
    fs::write(dir.join(VERSION_FILE), version)?;
    info!(dir = %dir.display(), version, "prepared benchmark directory");
    Ok(())
}

fn is_empty_dir(dir: &Path) -> Result<bool> {
    Ok(fs::read_dir(dir)?.next().is_none())
}

/// Build directory `name` inside `dir`, wiped first when `rebuild` is set.
pub fn create_build_path(dir: &Path, name: &str, rebuild: bool) -> Result<PathBuf> {
    let build_path = dir.join(name);
    if rebuild && build_path.exists() {
        fs::remove_dir_all(&build_path)?;
    }
    fs::create_dir_all(&build_path)?;
    Ok(build_path)
}
